//! Frame parsing and probe construction for the capture core.

pub mod ethernet;
pub mod icmp;

pub use ethernet::{get_ipv4_source, get_packet_from_u8, is_ipv4_frame};
