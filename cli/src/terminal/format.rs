use std::time::{Duration, SystemTime};

use colored::*;
use sniffr_common::network::host::ObservedHost;
use sniffr_common::network::interface::InterfaceBinding;

use crate::terminal::colors;

pub fn binding_to_key_value_pair(binding: &InterfaceBinding) -> Vec<(String, ColoredString)> {
    let mut pairs: Vec<(String, ColoredString)> = Vec::new();
    if binding.description != binding.name {
        pairs.push(("Desc".to_string(), binding.description.color(colors::TEXT_DEFAULT)));
    }
    match (binding.ipv4, binding.prefix_len()) {
        (Some(ip), Some(prefix)) => {
            let address: ColoredString = ip.to_string().color(colors::IPV4_ADDR);
            let prefix: ColoredString = prefix.to_string().color(colors::IPV4_PREFIX);
            pairs.push(("IPv4".to_string(), format!("{address}/{prefix}").color(colors::SEPARATOR)));
        }
        (Some(ip), None) => pairs.push(("IPv4".to_string(), ip.to_string().color(colors::IPV4_ADDR))),
        _ => pairs.push(("IPv4".to_string(), "unaddressed".color(colors::SEPARATOR))),
    }
    if let Some(mac_addr) = binding.mac {
        pairs.push(("MAC".to_string(), mac_addr.to_string().color(colors::MAC_ADDR)));
    }
    pairs
}

pub fn host_to_key_value_pair(host: &ObservedHost) -> Vec<(String, ColoredString)> {
    vec![
        ("IPv4".to_string(), host.ipv4.to_string().color(colors::IPV4_ADDR)),
        ("MAC".to_string(), host.mac.to_string().color(colors::MAC_ADDR)),
        ("Vendor".to_string(), host.manufacturer_label().color(colors::VENDOR)),
        ("Iface".to_string(), host.interface.color(colors::TEXT_DEFAULT)),
        ("Seen".to_string(), seen_ago(host.last_seen, SystemTime::now()).color(colors::SEPARATOR)),
    ]
}

/// Coarse age of a sighting, e.g. `4s ago`.
pub fn seen_ago(last_seen: SystemTime, now: SystemTime) -> String {
    let age: Duration = now.duration_since(last_seen).unwrap_or_default();
    match age.as_secs() {
        0 => "just now".to_string(),
        s if s < 60 => format!("{s}s ago"),
        s if s < 3600 => format!("{}m ago", s / 60),
        s => format!("{}h ago", s / 3600),
    }
}
