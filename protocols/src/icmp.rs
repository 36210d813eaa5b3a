use anyhow::Context;
use pnet::packet::Packet;
use pnet::packet::icmp::echo_request::MutableEchoRequestPacket;
use pnet::packet::icmp::{IcmpCode, IcmpPacket, IcmpTypes, checksum};

pub const ICMP_ECHO_HDR_LEN: usize = 8;
const ECHO_PAYLOAD: &[u8] = b"sniffr-sweep";

/// Builds an ICMPv4 echo request (header plus a short payload) with a valid
/// checksum, ready for a layer-4 transport channel.
pub fn create_echo_request(identifier: u16, sequence: u16) -> anyhow::Result<Vec<u8>> {
    let mut buffer = vec![0u8; ICMP_ECHO_HDR_LEN + ECHO_PAYLOAD.len()];
    {
        let mut echo = MutableEchoRequestPacket::new(&mut buffer).context("creating echo request packet")?;
        echo.set_icmp_type(IcmpTypes::EchoRequest);
        echo.set_icmp_code(IcmpCode(0));
        echo.set_identifier(identifier);
        echo.set_sequence_number(sequence);
        echo.set_payload(ECHO_PAYLOAD);
        echo.set_checksum(0);
    }
    let csum = {
        let icmp = IcmpPacket::new(&buffer).context("creating ICMP packet")?;
        checksum(&icmp)
    };
    let mut echo = MutableEchoRequestPacket::new(&mut buffer).context("creating echo request packet")?;
    echo.set_checksum(csum);
    Ok(echo.packet().to_vec())
}

/// Random identifier so concurrent sweeps do not share one.
pub fn random_identifier() -> u16 {
    rand::random()
}
