use pnet::datalink::NetworkInterface;
use pnet::ipnetwork::{IpNetwork, Ipv4Network};

pub trait NetworkInterfaceExtension {
    fn get_ipv4_nets(&self) -> Vec<Ipv4Network>;
    /// The IPv4 network the interface is bound to, if any.
    fn primary_ipv4_net(&self) -> Option<Ipv4Network>;
}

impl NetworkInterfaceExtension for NetworkInterface {
    fn get_ipv4_nets(&self) -> Vec<Ipv4Network> {
        self.ips
            .iter()
            .filter_map(|ip| {
                if let IpNetwork::V4(ipv4) = ip {
                    Some(*ipv4)
                } else {
                    None
                }
            })
            .collect()
    }

    fn primary_ipv4_net(&self) -> Option<Ipv4Network> {
        // Prefer a routable address; loopback-only devices still get theirs.
        let nets = self.get_ipv4_nets();
        nets.iter()
            .find(|net| !net.ip().is_loopback())
            .or_else(|| nets.first())
            .copied()
    }
}
