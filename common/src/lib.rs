//! Shared model of the passive host-discovery tool: interface bindings,
//! observations, the host directory and the address filters applied to it.

pub mod config;
pub mod error;
pub mod events;
pub mod network;
pub mod utils;
pub mod vendors;
