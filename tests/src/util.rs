use std::collections::HashMap;
use std::io;
use std::net::Ipv4Addr;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pnet::datalink::{self, Channel, MacAddr, NetworkInterface, dummy};
use pnet::ipnetwork::{IpNetwork, Ipv4Network};
use pnet::packet::ethernet::{EtherTypes, MutableEthernetPacket};
use pnet::packet::ipv4::MutableIpv4Packet;
use sniffr_common::events::MonitorEvent;
use sniffr_common::network::host::DirectorySnapshot;
use sniffr_core::capture::channel::ChannelOpener;
use tokio::sync::mpsc::UnboundedReceiver;

pub const WAIT: Duration = Duration::from_secs(5);

const IFF_UP: u32 = 1;
const IFF_BROADCAST: u32 = 1 << 1;

pub type Inject = Sender<io::Result<Box<[u8]>>>;

pub fn ni(name: &str, index: u32, mac: Option<MacAddr>, ips: &[IpNetwork]) -> NetworkInterface {
    NetworkInterface {
        name: name.into(),
        description: "".into(),
        index,
        mac,
        ips: ips.to_vec(),
        flags: IFF_UP | IFF_BROADCAST,
    }
}

pub fn v4(a: u8, b: u8, c: u8, d: u8, p: u8) -> IpNetwork {
    IpNetwork::V4(Ipv4Network::new(Ipv4Addr::new(a, b, c, d), p).unwrap())
}

/// Ethernet + IPv4 header with the given sources.
pub fn frame(src: MacAddr, ip_src: Ipv4Addr) -> Box<[u8]> {
    let mut buffer = vec![0u8; 34];
    {
        let mut eth = MutableEthernetPacket::new(&mut buffer).unwrap();
        eth.set_source(src);
        eth.set_destination(MacAddr::broadcast());
        eth.set_ethertype(EtherTypes::Ipv4);
    }
    {
        let mut ip = MutableIpv4Packet::new(&mut buffer[14..]).unwrap();
        ip.set_version(4);
        ip.set_header_length(5);
        ip.set_total_length(20);
        ip.set_source(ip_src);
    }
    buffer.into_boxed_slice()
}

/// Inject handles of every dummy channel opened so far, by interface name.
#[derive(Clone, Default)]
pub struct Injectors {
    handles: Arc<Mutex<HashMap<String, Inject>>>,
}

impl Injectors {
    pub fn get(&self, name: &str) -> Inject {
        self.handles.lock().unwrap().get(name).cloned().expect("no channel opened for interface")
    }

    pub fn send(&self, name: &str, bytes: Box<[u8]>) {
        self.get(name).send(Ok(bytes)).unwrap();
    }

    /// Wakes a blocked receive so the loop can observe cancellation.
    pub fn tick(&self, name: &str) {
        let _ = self.get(name).send(Err(io::Error::from(io::ErrorKind::TimedOut)));
    }
}

pub fn dummy_opener() -> (ChannelOpener, Injectors) {
    let injectors = Injectors::default();
    let handles = injectors.handles.clone();
    let opener: ChannelOpener = Arc::new(move |intf: &NetworkInterface, _: datalink::Config| -> io::Result<Channel> {
        let mut cfg = dummy::Config::default();
        let inject = cfg.inject_handle().expect("fresh dummy config has an inject handle");
        handles.lock().unwrap().insert(intf.name.clone(), inject);
        dummy::channel(intf, cfg)
    });
    (opener, injectors)
}

/// Next event matching `pred`, skipping others, or `None` after `timeout`.
pub async fn next_matching<F>(rx: &mut UnboundedReceiver<MonitorEvent>, timeout: Duration, mut pred: F) -> Option<MonitorEvent>
where
    F: FnMut(&MonitorEvent) -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        match tokio::time::timeout_at(deadline, rx.recv()).await {
            Ok(Some(event)) if pred(&event) => return Some(event),
            Ok(Some(_)) => continue,
            Ok(None) | Err(_) => return None,
        }
    }
}

pub async fn next_snapshot(rx: &mut UnboundedReceiver<MonitorEvent>, timeout: Duration) -> Option<DirectorySnapshot> {
    match next_matching(rx, timeout, |e| matches!(e, MonitorEvent::DirectoryChanged(_))).await {
        Some(MonitorEvent::DirectoryChanged(snapshot)) => Some(snapshot),
        _ => None,
    }
}
