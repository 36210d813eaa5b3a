//! Best-effort ICMP ping sweep over an interface's subnet.
//!
//! Replies are never read; any host that answers shows up through the
//! ordinary capture path.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use pnet::packet::icmp::IcmpPacket;
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::transport::{self, TransportChannelType, TransportProtocol, TransportSender};
use sniffr_common::error::CaptureError;
use sniffr_common::network::range::Ipv4Range;
use sniffr_common::utils::cancel::CancelToken;
use sniffr_protocols::icmp;
use tracing::debug;

const TRANSPORT_BUFFER_SIZE: usize = 4096;
const CHANNEL_TYPE_ICMP: TransportChannelType =
    TransportChannelType::Layer4(TransportProtocol::Ipv4(IpNextHeaderProtocols::Icmp));

/// Sends one fire-and-forget echo probe to a target.
pub trait EchoProber: Send {
    fn probe(&mut self, target: Ipv4Addr) -> anyhow::Result<()>;
}

/// Creates a prober for each sweep run.
pub type ProberFactory = Arc<dyn Fn() -> Result<Box<dyn EchoProber>, CaptureError> + Send + Sync>;

pub fn icmp_prober_factory() -> ProberFactory {
    Arc::new(|| -> Result<Box<dyn EchoProber>, CaptureError> { Ok(Box::new(IcmpProber::open()?)) })
}

pub struct IcmpProber {
    tx: TransportSender,
    identifier: u16,
    sequence: u16,
}

impl IcmpProber {
    pub fn open() -> Result<Self, CaptureError> {
        let (tx, _rx) = transport::transport_channel(TRANSPORT_BUFFER_SIZE, CHANNEL_TYPE_ICMP)
            .map_err(|e| CaptureError::Probe(format!("opening ICMP channel: {e}")))?;
        Ok(Self {
            tx,
            identifier: icmp::random_identifier(),
            sequence: 0,
        })
    }
}

impl EchoProber for IcmpProber {
    fn probe(&mut self, target: Ipv4Addr) -> anyhow::Result<()> {
        self.sequence = self.sequence.wrapping_add(1);
        let bytes = icmp::create_echo_request(self.identifier, self.sequence)?;
        let packet = IcmpPacket::new(&bytes).context("wrapping echo request")?;
        self.tx
            .send_to(packet, IpAddr::V4(target))
            .with_context(|| format!("sending echo request to {target}"))?;
        Ok(())
    }
}

/// Probes every address of `range` in ascending order, reporting progress
/// in percent after each probe. Returns `false` if cancelled before the end.
pub fn run_sweep<F>(
    range: Ipv4Range,
    prober: &mut dyn EchoProber,
    cancel: &CancelToken,
    probe_delay: Duration,
    mut on_progress: F,
) -> bool
where
    F: FnMut(f32),
{
    let total = range.len();
    for (done, target) in (1u64..).zip(range.to_iter()) {
        if cancel.is_cancelled() {
            return false;
        }
        if let Err(e) = prober.probe(target) {
            debug!(ip = %target, "Echo probe failed: {e:#}");
        }
        on_progress(done as f32 * 100.0 / total as f32);
        if !probe_delay.is_zero() {
            thread::sleep(probe_delay);
        }
    }
    true
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
