#![cfg(test)]
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use pnet::datalink::MacAddr;
use sniffr_common::config::Config;
use sniffr_common::events::MonitorEvent;
use sniffr_common::vendors::NoVendors;
use sniffr_core::capture::CaptureState;
use sniffr_core::monitor::NetworkMonitor;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::util::{self, Injectors, WAIT};

const SELF_MAC: MacAddr = MacAddr(0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff);
const PEER_MAC: MacAddr = MacAddr(0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x01);

struct Pipeline {
    monitor: NetworkMonitor,
    injectors: Injectors,
    events: UnboundedReceiver<MonitorEvent>,
    names: Vec<String>,
}

impl Pipeline {
    async fn start(config: Config) -> Self {
        let eth0 = util::ni("eth0", 1, Some(SELF_MAC), &[util::v4(10, 0, 0, 5, 24)]);
        let eth1 = util::ni("eth1", 2, Some(MacAddr::new(0x02, 0, 0, 0, 0, 1)), &[util::v4(192, 168, 1, 10, 24)]);
        let (opener, injectors) = util::dummy_opener();
        let (tx, mut events) = mpsc::unbounded_channel();

        let mut monitor = NetworkMonitor::new(config, Arc::new(tx), Arc::new(NoVendors)).with_opener(opener);
        monitor.initialize(vec![eth0, eth1]).unwrap();

        for _ in 0..2 {
            let event = util::next_matching(&mut events, WAIT, |e| matches!(e, MonitorEvent::ListeningChanged { .. })).await;
            assert!(matches!(event, Some(MonitorEvent::ListeningChanged { listening: true, .. })));
        }

        Pipeline {
            monitor,
            injectors,
            events,
            names: vec!["eth0".to_string(), "eth1".to_string()],
        }
    }

    fn stop(mut self) {
        for name in &self.names {
            self.monitor.stop_interface(name).unwrap();
            self.injectors.tick(name);
        }
        self.monitor.shutdown();
    }
}

fn slow_updates() -> Config {
    Config {
        update_interval: Duration::from_secs(60),
        ..Config::default()
    }
}

#[tokio::test]
async fn sessions_listen_on_every_interface() {
    let p = Pipeline::start(Config::default()).await;

    let statuses = p.monitor.interfaces();
    assert_eq!(statuses.len(), 2);
    assert!(statuses.iter().all(|s| s.state == CaptureState::Listening));
    assert_eq!(statuses[0].binding.cidr().as_deref(), Some("10.0.0.5/24"));

    p.stop();
}

#[tokio::test]
async fn self_and_foreign_traffic_never_reach_the_directory() {
    let mut p = Pipeline::start(Config::default()).await;

    p.injectors.send("eth0", util::frame(SELF_MAC, Ipv4Addr::new(10, 0, 0, 5)));
    p.injectors.send("eth0", util::frame(MacAddr::new(0xaa, 0, 0, 0, 0, 9), Ipv4Addr::new(172, 16, 0, 9)));
    p.injectors.send("eth0", util::frame(PEER_MAC, Ipv4Addr::new(10, 0, 0, 42)));

    let snapshot = util::next_snapshot(&mut p.events, WAIT).await.expect("directory update");
    assert_eq!(snapshot.len(), 1);
    let host = snapshot.get(&PEER_MAC).expect("peer entry");
    assert_eq!(host.ipv4, Ipv4Addr::new(10, 0, 0, 42));
    assert_eq!(host.interface, "eth0");
    assert_eq!(host.manufacturer_label(), "Unknown manufacturer");

    assert!(p.monitor.snapshot().unwrap().get(&SELF_MAC).is_none());
    p.stop();
}

#[tokio::test]
async fn subnet_is_judged_per_capturing_interface() {
    let mut p = Pipeline::start(Config::default()).await;
    let host = MacAddr::new(0x10, 0, 0, 0, 0, 0x55);

    p.injectors.send("eth0", util::frame(host, Ipv4Addr::new(192, 168, 1, 55)));
    p.injectors.send("eth1", util::frame(host, Ipv4Addr::new(192, 168, 1, 55)));

    let snapshot = util::next_snapshot(&mut p.events, WAIT).await.expect("directory update");
    let entry = snapshot.get(&host).expect("host seen on eth1");
    assert_eq!(entry.interface, "eth1");
    assert_eq!(snapshot.len(), 1);
    p.stop();
}

#[tokio::test]
async fn later_observation_overwrites_address() {
    let mut p = Pipeline::start(Config::default()).await;

    p.injectors.send("eth0", util::frame(PEER_MAC, Ipv4Addr::new(10, 0, 0, 42)));
    p.injectors.send("eth0", util::frame(PEER_MAC, Ipv4Addr::new(10, 0, 0, 77)));

    let deadline = tokio::time::Instant::now() + WAIT;
    loop {
        let snapshot = util::next_snapshot(&mut p.events, WAIT).await.expect("directory update");
        assert_eq!(snapshot.len(), 1);
        if snapshot.get(&PEER_MAC).map(|h| h.ipv4) == Some(Ipv4Addr::new(10, 0, 0, 77)) {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "latest address never published");
    }
    p.stop();
}

#[tokio::test]
async fn clear_publishes_exactly_one_empty_snapshot() {
    let mut p = Pipeline::start(slow_updates()).await;

    p.injectors.send("eth0", util::frame(PEER_MAC, Ipv4Addr::new(10, 0, 0, 42)));
    let first = util::next_snapshot(&mut p.events, WAIT).await.expect("first update");
    assert_eq!(first.len(), 1);

    p.monitor.clear_hosts().unwrap();

    let cleared = util::next_snapshot(&mut p.events, WAIT).await.expect("update after clear");
    assert!(cleared.is_empty());
    assert!(util::next_snapshot(&mut p.events, Duration::from_millis(300)).await.is_none());
    assert!(p.monitor.snapshot().unwrap().is_empty());
    p.stop();
}

#[tokio::test]
async fn burst_is_published_at_most_once_per_interval() {
    let mut p = Pipeline::start(slow_updates()).await;

    for i in 0..1000u32 {
        let [_, _, hi, lo] = i.to_be_bytes();
        let ip = Ipv4Addr::new(10, 0, 0, 10 + (i % 200) as u8);
        p.injectors.send("eth0", util::frame(MacAddr::new(0x02, 0, 0, 0, hi, lo), ip));
    }

    assert!(util::next_snapshot(&mut p.events, WAIT).await.is_some());

    let deadline = tokio::time::Instant::now() + WAIT;
    while p.monitor.snapshot().unwrap().len() < 1000 {
        assert!(tokio::time::Instant::now() < deadline, "burst was not fully aggregated");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert!(util::next_snapshot(&mut p.events, Duration::from_millis(300)).await.is_none());
    p.stop();
}

#[tokio::test]
async fn stopped_interface_signals_and_restarts() {
    let mut p = Pipeline::start(Config::default()).await;

    p.monitor.stop_interface("eth0").unwrap();
    p.injectors.tick("eth0");
    let event = util::next_matching(&mut p.events, WAIT, |e| matches!(e, MonitorEvent::ListeningChanged { .. })).await;
    match event {
        Some(MonitorEvent::ListeningChanged { interface, listening }) => {
            assert_eq!(interface, "eth0");
            assert!(!listening);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    p.monitor.start_interface("eth0").unwrap();
    p.injectors.send("eth0", util::frame(PEER_MAC, Ipv4Addr::new(10, 0, 0, 42)));
    let snapshot = util::next_snapshot(&mut p.events, WAIT).await.expect("capture resumed");
    assert!(snapshot.get(&PEER_MAC).is_some());
    p.stop();
}
