//! Error types shared by the capture core.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to open interface {interface}: {source}")]
    Open {
        interface: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{interface} is not an Ethernet interface")]
    NotEthernet { interface: String },

    #[error("Failed to listen on {interface}: {source}")]
    Receive {
        interface: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{interface} has no IPv4 address and netmask")]
    NoIpv4Address { interface: String },

    #[error("A subnet sweep is already running on {interface}")]
    SweepInProgress { interface: String },

    #[error("Echo probe failed: {0}")]
    Probe(String),

    #[error("Unknown interface: {0}")]
    UnknownInterface(String),

    #[error("Host aggregator is not running")]
    AggregatorUnavailable,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CaptureError>;
