use std::collections::{BTreeMap, HashMap, hash_map};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::SystemTime;

use pnet::util::MacAddr;

use crate::network::interface::InterfaceBinding;

/// Label used for hosts whose MAC prefix is not in the vendor table.
pub const UNKNOWN_MANUFACTURER: &str = "Unknown manufacturer";

/// One sighting of a host, produced by a capture loop for every accepted frame.
#[derive(Debug, Clone)]
pub struct Observation {
    pub source_mac: MacAddr,
    pub source_ip: Ipv4Addr,
    /// The interface the frame was captured on.
    pub interface: Arc<InterfaceBinding>,
    pub captured_at: SystemTime,
}

impl Observation {
    pub fn new(source_mac: MacAddr, source_ip: Ipv4Addr, interface: Arc<InterfaceBinding>) -> Self {
        Self {
            source_mac,
            source_ip,
            interface,
            captured_at: SystemTime::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedHost {
    pub mac: MacAddr,
    pub ipv4: Ipv4Addr,
    pub last_seen: SystemTime,
    /// Interface the latest sighting arrived on.
    pub interface: String,
    pub manufacturer: Option<String>,
}

impl ObservedHost {
    pub fn manufacturer_label(&self) -> &str {
        self.manufacturer.as_deref().unwrap_or(UNKNOWN_MANUFACTURER)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Updated,
}

/// Authoritative MAC → host map.
///
/// Entries are only ever added or overwritten; the only removal is a full
/// [`HostDirectory::clear`].
#[derive(Debug, Default)]
pub struct HostDirectory {
    hosts: HashMap<MacAddr, ObservedHost>,
}

impl HostDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `obs`, overwriting address, timestamp and interface of an
    /// existing entry. `label` is only consulted for MACs not seen before.
    pub fn upsert<F>(&mut self, obs: &Observation, label: F) -> Upsert
    where
        F: FnOnce(MacAddr) -> Option<String>,
    {
        match self.hosts.entry(obs.source_mac) {
            hash_map::Entry::Occupied(mut occupied_entry) => {
                let host = occupied_entry.get_mut();
                host.ipv4 = obs.source_ip;
                host.last_seen = obs.captured_at;
                host.interface.clone_from(&obs.interface.name);
                Upsert::Updated
            }
            hash_map::Entry::Vacant(vacant_entry) => {
                vacant_entry.insert(ObservedHost {
                    mac: obs.source_mac,
                    ipv4: obs.source_ip,
                    last_seen: obs.captured_at,
                    interface: obs.interface.name.clone(),
                    manufacturer: label(obs.source_mac),
                });
                Upsert::Inserted
            }
        }
    }

    pub fn get(&self, mac: &MacAddr) -> Option<&ObservedHost> {
        self.hosts.get(mac)
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn clear(&mut self) {
        self.hosts.clear();
    }

    /// Detached copy for readers outside the owning thread.
    pub fn snapshot(&self) -> DirectorySnapshot {
        DirectorySnapshot {
            hosts: self.hosts.iter().map(|(mac, host)| (*mac, host.clone())).collect(),
        }
    }
}

/// Immutable, MAC-ordered copy of the directory at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectorySnapshot {
    hosts: BTreeMap<MacAddr, ObservedHost>,
}

impl DirectorySnapshot {
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn get(&self, mac: &MacAddr) -> Option<&ObservedHost> {
        self.hosts.get(mac)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObservedHost> {
        self.hosts.values()
    }

    /// Hosts keyed by manufacturer label, each group sorted by MAC.
    pub fn group_by_manufacturer(&self) -> BTreeMap<String, Vec<ObservedHost>> {
        let mut groups: BTreeMap<String, Vec<ObservedHost>> = BTreeMap::new();
        for host in self.hosts.values() {
            groups
                .entry(host.manufacturer_label().to_string())
                .or_default()
                .push(host.clone());
        }
        groups
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
