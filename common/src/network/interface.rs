use std::cmp::Ordering;
use std::fmt;
use std::net::Ipv4Addr;

use pnet::datalink::NetworkInterface;
use pnet::util::MacAddr;

use crate::network::filter::leading_one_bits;
use crate::utils::interface::NetworkInterfaceExtension;

/// Identity and addressing of one local network interface.
///
/// Built once at discovery time and never mutated afterwards; the capture
/// lifecycle of the device lives in its `CaptureSession`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceBinding {
    /// Device identifier handed to the capture layer (e.g. `eth0`).
    pub name: String,
    /// Human-readable description; the device name when the OS offers none.
    pub description: String,
    pub mac: Option<MacAddr>,
    /// Bound IPv4 address, if the interface has one.
    pub ipv4: Option<Ipv4Addr>,
    /// Subnet mask belonging to `ipv4`.
    pub netmask: Option<Ipv4Addr>,
}

impl InterfaceBinding {
    /// CIDR prefix length of the bound subnet, for display.
    pub fn prefix_len(&self) -> Option<u8> {
        self.netmask.map(leading_one_bits)
    }

    /// `a.b.c.d/n`, or `None` when the interface is unaddressed.
    pub fn cidr(&self) -> Option<String> {
        match (self.ipv4, self.prefix_len()) {
            (Some(ip), Some(prefix)) => Some(format!("{ip}/{prefix}")),
            (Some(ip), None) => Some(ip.to_string()),
            _ => None,
        }
    }

    pub fn has_ipv4(&self) -> bool {
        self.ipv4.is_some()
    }
}

impl From<&NetworkInterface> for InterfaceBinding {
    fn from(interface: &NetworkInterface) -> Self {
        let net = interface.primary_ipv4_net();
        let description = if interface.description.trim().is_empty() {
            interface.name.clone()
        } else {
            interface.description.clone()
        };

        Self {
            name: interface.name.clone(),
            description,
            mac: interface.mac,
            ipv4: net.map(|n| n.ip()),
            netmask: net.map(|n| n.mask()),
        }
    }
}

impl fmt::Display for InterfaceBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cidr() {
            Some(cidr) => write!(f, "{} ({})", self.name, cidr),
            None => write!(f, "{} (unaddressed)", self.name),
        }
    }
}

/// Enumerates every local interface the capture layer can see.
pub fn discover_bindings() -> Vec<(NetworkInterface, InterfaceBinding)> {
    pnet::datalink::interfaces()
        .into_iter()
        .map(|interface| {
            let binding = InterfaceBinding::from(&interface);
            (interface, binding)
        })
        .collect()
}

/// Ordering used for interface lists: addressed interfaces first, then by
/// description.
pub fn display_order(a: &InterfaceBinding, b: &InterfaceBinding) -> Ordering {
    match (a.has_ipv4(), b.has_ipv4()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.description.cmp(&b.description),
    }
}

pub fn sort_for_display(bindings: &mut [InterfaceBinding]) {
    bindings.sort_by(display_order);
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
