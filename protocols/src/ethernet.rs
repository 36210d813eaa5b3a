use std::net::Ipv4Addr;

use anyhow::Context;
use pnet::packet::Packet;
use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::packet::ipv4::Ipv4Packet;

/// Wraps raw bytes as an Ethernet frame.
pub fn get_packet_from_u8(bytes: &[u8]) -> anyhow::Result<EthernetPacket<'_>> {
    EthernetPacket::new(bytes).context("frame too short for an Ethernet header")
}

/// Software equivalent of the `ip` capture filter: admits IPv4 frames only.
pub fn is_ipv4_frame(bytes: &[u8]) -> bool {
    EthernetPacket::new(bytes)
        .map(|eth| eth.get_ethertype() == EtherTypes::Ipv4)
        .unwrap_or(false)
}

/// Source address of the IPv4 header carried by `eth`.
pub fn get_ipv4_source(eth: &EthernetPacket<'_>) -> anyhow::Result<Ipv4Addr> {
    anyhow::ensure!(
        eth.get_ethertype() == EtherTypes::Ipv4,
        "ethertype {} is not IPv4",
        eth.get_ethertype()
    );
    let ipv4 = Ipv4Packet::new(eth.payload()).context("payload too short for an IPv4 header")?;
    Ok(ipv4.get_source())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
