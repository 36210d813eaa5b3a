#![cfg(test)]
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sniffr_common::config::Config;
use sniffr_common::error::CaptureError;
use sniffr_common::events::MonitorEvent;
use sniffr_common::vendors::NoVendors;
use sniffr_core::capture::sweep::{EchoProber, ProberFactory};
use sniffr_core::monitor::NetworkMonitor;
use tokio::sync::mpsc;

use crate::util::{self, WAIT};

struct RecordingProber {
    targets: Arc<Mutex<Vec<Ipv4Addr>>>,
}

impl EchoProber for RecordingProber {
    fn probe(&mut self, target: Ipv4Addr) -> anyhow::Result<()> {
        self.targets.lock().unwrap().push(target);
        Ok(())
    }
}

fn recording_factory(targets: Arc<Mutex<Vec<Ipv4Addr>>>) -> ProberFactory {
    Arc::new(move || -> Result<Box<dyn EchoProber>, CaptureError> {
        Ok(Box::new(RecordingProber {
            targets: targets.clone(),
        }))
    })
}

#[tokio::test]
async fn sweep_probes_whole_subnet_and_completes() {
    let targets = Arc::new(Mutex::new(Vec::new()));
    let (opener, injectors) = util::dummy_opener();
    let (tx, mut events) = mpsc::unbounded_channel();
    let config = Config {
        sweep_probe_delay: Duration::ZERO,
        ..Config::default()
    };
    let mut monitor = NetworkMonitor::new(config, Arc::new(tx), Arc::new(NoVendors))
        .with_opener(opener)
        .with_prober(recording_factory(targets.clone()));
    monitor
        .initialize(vec![util::ni("eth0", 1, None, &[util::v4(10, 0, 0, 5, 30)])])
        .unwrap();

    monitor.sweep_subnet("eth0").unwrap();

    let mut progress = Vec::new();
    let completed = loop {
        match util::next_matching(&mut events, WAIT, |e| {
            matches!(e, MonitorEvent::SweepProgress { .. } | MonitorEvent::SweepCompleted { .. })
        })
        .await
        {
            Some(MonitorEvent::SweepProgress { percent, .. }) => progress.push(percent),
            Some(MonitorEvent::SweepCompleted { interface, cancelled }) => break (interface, cancelled),
            other => panic!("sweep did not complete: {other:?}"),
        }
    };

    assert_eq!(completed, ("eth0".to_string(), false));
    assert_eq!(progress.last().copied(), Some(100.0));
    assert_eq!(
        *targets.lock().unwrap(),
        (4..=7).map(|d| Ipv4Addr::new(10, 0, 0, d)).collect::<Vec<_>>()
    );

    monitor.stop_interface("eth0").unwrap();
    injectors.tick("eth0");
    monitor.shutdown();
}

#[tokio::test]
async fn sweep_needs_an_addressed_interface() {
    let (opener, injectors) = util::dummy_opener();
    let (tx, _events) = mpsc::unbounded_channel();
    let mut monitor = NetworkMonitor::new(Config::default(), Arc::new(tx), Arc::new(NoVendors)).with_opener(opener);
    monitor.initialize(vec![util::ni("tun0", 1, None, &[])]).unwrap();

    assert!(matches!(
        monitor.sweep_subnet("tun0"),
        Err(CaptureError::NoIpv4Address { .. })
    ));

    monitor.stop_interface("tun0").unwrap();
    injectors.tick("tun0");
    monitor.shutdown();
}
