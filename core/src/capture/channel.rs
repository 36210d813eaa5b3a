use std::io;
use std::sync::Arc;

use pnet::datalink::{self, Channel, DataLinkReceiver, DataLinkSender, NetworkInterface};
use sniffr_common::config::Config;
use sniffr_common::error::CaptureError;

/// Opens a datalink channel on an interface. Swapped for
/// `pnet::datalink::dummy::channel` in tests.
pub type ChannelOpener = Arc<dyn Fn(&NetworkInterface, datalink::Config) -> io::Result<Channel> + Send + Sync>;

pub fn system_opener() -> ChannelOpener {
    Arc::new(datalink::channel)
}

pub fn datalink_config(cfg: &Config) -> datalink::Config {
    datalink::Config {
        read_timeout: Some(cfg.receive_timeout),
        read_buffer_size: cfg.snapshot_len,
        promiscuous: cfg.promiscuous,
        ..Default::default()
    }
}

pub fn open_eth_channel<F>(
    intf: &NetworkInterface,
    cfg: &datalink::Config,
    channel_opener: F,
) -> Result<(Box<dyn DataLinkSender>, Box<dyn DataLinkReceiver>), CaptureError>
where
    F: FnOnce(&NetworkInterface, datalink::Config) -> io::Result<Channel>,
{
    let ch: Channel = channel_opener(intf, *cfg).map_err(|source| CaptureError::Open {
        interface: intf.name.clone(),
        source,
    })?;
    match ch {
        Channel::Ethernet(tx, rx) => Ok((tx, rx)),
        #[allow(unreachable_patterns)]
        _ => Err(CaptureError::NotEthernet {
            interface: intf.name.clone(),
        }),
    }
}

/// Read timeouts surface as `TimedOut` on Linux and `WouldBlock` elsewhere.
pub fn is_timeout(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
