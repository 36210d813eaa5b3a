//! The single consumer of the observation queue and sole writer of the
//! host directory.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use sniffr_common::config::Config;
use sniffr_common::events::EventSink;
use sniffr_common::network::filter::{self, Admission, UnaddressedPolicy};
use sniffr_common::network::host::{DirectorySnapshot, HostDirectory, Observation, Upsert};
use sniffr_common::utils::cancel::CancelToken;
use sniffr_common::vendors::VendorRepository;
use tracing::{debug, trace};

use crate::notifier::ChangeNotifier;
use crate::queue::ObservationQueue;

/// Requests serialized through the aggregator thread so they never race
/// with in-flight upserts.
#[derive(Debug)]
pub enum AggregatorCommand {
    Clear,
    Snapshot(Sender<DirectorySnapshot>),
}

/// What one [`HostAggregator::step`] did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    pub accepted: usize,
    pub discarded: usize,
    pub commands: usize,
    pub notified: bool,
}

impl StepReport {
    pub fn is_idle(&self) -> bool {
        self.accepted == 0 && self.discarded == 0 && self.commands == 0
    }
}

pub struct HostAggregator {
    queue: ObservationQueue,
    directory: HostDirectory,
    notifier: ChangeNotifier,
    vendors: Arc<dyn VendorRepository>,
    policy: UnaddressedPolicy,
    idle_sleep: Duration,
    commands: Receiver<AggregatorCommand>,
}

impl HostAggregator {
    pub fn new(
        config: &Config,
        queue: ObservationQueue,
        sink: Arc<dyn EventSink>,
        vendors: Arc<dyn VendorRepository>,
        commands: Receiver<AggregatorCommand>,
    ) -> Self {
        Self {
            queue,
            directory: HostDirectory::new(),
            notifier: ChangeNotifier::new(sink, config.update_interval),
            vendors,
            policy: config.unaddressed_policy,
            idle_sleep: config.idle_sleep(),
            commands,
        }
    }

    /// Polls until `cancel` fires, sleeping briefly whenever a poll finds
    /// nothing to do.
    pub fn run(&mut self, cancel: &CancelToken) {
        debug!(idle_sleep = ?self.idle_sleep, "Host aggregator started");
        while !cancel.is_cancelled() {
            if self.step(Instant::now()).is_idle() {
                thread::sleep(self.idle_sleep);
            }
        }
        debug!(hosts = self.directory.len(), "Host aggregator stopped");
    }

    /// One poll cycle: drain the queue, apply pending commands, then
    /// publish if the rate limit allows.
    pub fn step(&mut self, now: Instant) -> StepReport {
        let mut report = StepReport::default();

        for observation in self.queue.drain() {
            match self.ingest(&observation) {
                Admission::Accepted => report.accepted += 1,
                _ => report.discarded += 1,
            }
        }

        report.commands = self.handle_commands();

        let directory = &self.directory;
        report.notified = self.notifier.maybe_notify(now, || directory.snapshot());
        report
    }

    pub fn directory(&self) -> &HostDirectory {
        &self.directory
    }

    fn ingest(&mut self, observation: &Observation) -> Admission {
        let admission = filter::admit(&observation.interface, observation.source_ip, self.policy);
        match admission {
            Admission::SelfTraffic => {
                trace!(interface = %observation.interface.name, ip = %observation.source_ip, "Discarding own traffic");
            }
            Admission::ForeignSubnet => {
                trace!(interface = %observation.interface.name, ip = %observation.source_ip, "Discarding foreign-subnet traffic");
            }
            Admission::Accepted => {
                let vendors = &self.vendors;
                let outcome = self.directory.upsert(observation, |mac| vendors.get_vendor(mac));
                if outcome == Upsert::Inserted {
                    debug!(mac = %observation.source_mac, ip = %observation.source_ip, "New host");
                }
                self.notifier.mark_dirty();
            }
        }
        admission
    }

    fn handle_commands(&mut self) -> usize {
        let mut handled = 0;
        loop {
            match self.commands.try_recv() {
                Ok(AggregatorCommand::Clear) => {
                    debug!(hosts = self.directory.len(), "Clearing host directory");
                    self.notifier.clear(&mut self.directory);
                }
                Ok(AggregatorCommand::Snapshot(reply)) => {
                    // The requester may have given up waiting.
                    let _ = reply.send(self.directory.snapshot());
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
            handled += 1;
        }
        handled
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
