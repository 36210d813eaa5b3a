//! Orchestration of capture sessions and the host aggregator.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use pnet::datalink::NetworkInterface;
use rayon::prelude::*;
use sniffr_common::config::Config;
use sniffr_common::error::{CaptureError, Result};
use sniffr_common::events::{EventSink, MonitorEvent};
use sniffr_common::network::host::DirectorySnapshot;
use sniffr_common::network::interface::display_order;
use sniffr_common::utils::cancel::CancelToken;
use sniffr_common::vendors::VendorRepository;
use tracing::{debug, error, info, warn};

use crate::aggregator::{AggregatorCommand, HostAggregator};
use crate::capture::channel::{self, ChannelOpener};
use crate::capture::sweep::{self, ProberFactory};
use crate::capture::{CaptureSession, SessionContext, SessionStatus};
use crate::queue::ObservationQueue;

const SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(2);

struct AggregatorHandle {
    cancel: CancelToken,
    commands: Sender<AggregatorCommand>,
    worker: JoinHandle<()>,
}

pub struct NetworkMonitor {
    config: Config,
    sink: Arc<dyn EventSink>,
    vendors: Arc<dyn VendorRepository>,
    opener: ChannelOpener,
    prober: ProberFactory,
    queue: ObservationQueue,
    sessions: Vec<CaptureSession>,
    aggregator: Option<AggregatorHandle>,
    fault: Arc<Mutex<Option<String>>>,
}

impl NetworkMonitor {
    pub fn new(config: Config, sink: Arc<dyn EventSink>, vendors: Arc<dyn VendorRepository>) -> Self {
        Self {
            config,
            sink,
            vendors,
            opener: channel::system_opener(),
            prober: sweep::icmp_prober_factory(),
            queue: ObservationQueue::new(),
            sessions: Vec::new(),
            aggregator: None,
            fault: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_opener(mut self, opener: ChannelOpener) -> Self {
        self.opener = opener;
        self
    }

    pub fn with_prober(mut self, prober: ProberFactory) -> Self {
        self.prober = prober;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replaces all sessions with one per interface, starts them, and makes
    /// sure the aggregator is running. Interfaces that fail to open are
    /// recorded and skipped.
    pub fn initialize(&mut self, interfaces: Vec<NetworkInterface>) -> Result<()> {
        self.stop_sessions();

        let ctx = SessionContext {
            config: self.config.clone(),
            queue: self.queue.clone(),
            sink: self.sink.clone(),
            opener: self.opener.clone(),
            prober: self.prober.clone(),
        };
        self.sessions = interfaces
            .into_iter()
            .map(|intf| CaptureSession::new(intf, ctx.clone()))
            .collect();

        let failed = self
            .sessions
            .par_iter_mut()
            .map(|session| session.start())
            .filter(|result| result.is_err())
            .count();
        if failed > 0 {
            warn!("{failed} of {} interfaces could not be opened", self.sessions.len());
        }

        if !self.aggregator_running() {
            self.start_aggregator()?;
        }
        Ok(())
    }

    pub fn start_interface(&mut self, name: &str) -> Result<()> {
        self.session_mut(name)?.start()
    }

    pub fn stop_interface(&mut self, name: &str) -> Result<()> {
        self.session_mut(name)?.stop();
        Ok(())
    }

    pub fn sweep_subnet(&mut self, name: &str) -> Result<()> {
        self.session_mut(name)?.sweep_subnet()
    }

    pub fn cancel_sweep(&mut self, name: &str) -> Result<()> {
        self.session_mut(name)?.cancel_sweep();
        Ok(())
    }

    /// Session summaries, addressed interfaces first.
    pub fn interfaces(&self) -> Vec<SessionStatus> {
        let mut statuses: Vec<SessionStatus> = self.sessions.iter().map(CaptureSession::status).collect();
        statuses.sort_by(|a, b| display_order(&a.binding, &b.binding));
        statuses
    }

    /// Empties the directory on the aggregator thread; an empty snapshot is
    /// published right after.
    pub fn clear_hosts(&self) -> Result<()> {
        self.send_command(AggregatorCommand::Clear)
    }

    /// Copy of the directory as the aggregator currently sees it.
    pub fn snapshot(&self) -> Result<DirectorySnapshot> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.send_command(AggregatorCommand::Snapshot(reply_tx))?;
        reply_rx
            .recv_timeout(SNAPSHOT_TIMEOUT)
            .map_err(|_| CaptureError::AggregatorUnavailable)
    }

    pub fn aggregator_running(&self) -> bool {
        self.aggregator
            .as_ref()
            .is_some_and(|handle| !handle.worker.is_finished())
    }

    /// Reason the aggregator last stopped on a fault, if it did.
    pub fn aggregator_fault(&self) -> Option<String> {
        self.fault.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Stops the aggregator if it is still running and starts a fresh one.
    /// The host directory starts out empty again.
    pub fn restart_aggregator(&mut self) -> Result<()> {
        self.stop_aggregator();
        self.start_aggregator()
    }

    /// Cancels every worker and waits for all of them.
    pub fn shutdown(&mut self) {
        info!("Shutting down monitor");
        self.stop_sessions();
        self.stop_aggregator();
    }

    fn session_mut(&mut self, name: &str) -> Result<&mut CaptureSession> {
        self.sessions
            .iter_mut()
            .find(|session| session.name() == name)
            .ok_or_else(|| CaptureError::UnknownInterface(name.to_string()))
    }

    fn send_command(&self, command: AggregatorCommand) -> Result<()> {
        match &self.aggregator {
            Some(handle) if !handle.worker.is_finished() => handle
                .commands
                .send(command)
                .map_err(|_| CaptureError::AggregatorUnavailable),
            _ => Err(CaptureError::AggregatorUnavailable),
        }
    }

    fn start_aggregator(&mut self) -> Result<()> {
        let (commands, command_rx) = mpsc::channel();
        let cancel = CancelToken::new();
        let mut aggregator = HostAggregator::new(
            &self.config,
            self.queue.clone(),
            self.sink.clone(),
            self.vendors.clone(),
            command_rx,
        );

        let worker_cancel = cancel.clone();
        let sink = self.sink.clone();
        let fault = self.fault.clone();
        *fault.lock().unwrap_or_else(PoisonError::into_inner) = None;

        let worker = thread::Builder::new()
            .name("host-aggregator".to_string())
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| aggregator.run(&worker_cancel)));
                if let Err(payload) = outcome {
                    let reason = panic_message(payload.as_ref());
                    error!("Host aggregator stopped: {reason}");
                    *fault.lock().unwrap_or_else(PoisonError::into_inner) = Some(reason.clone());
                    sink.emit(MonitorEvent::AggregatorStopped { reason });
                }
            })?;

        self.aggregator = Some(AggregatorHandle {
            cancel,
            commands,
            worker,
        });
        Ok(())
    }

    fn stop_aggregator(&mut self) {
        if let Some(handle) = self.aggregator.take() {
            handle.cancel.cancel();
            if handle.worker.join().is_err() {
                error!("Host aggregator thread could not be joined");
            }
        }
    }

    fn stop_sessions(&mut self) {
        for session in &mut self.sessions {
            session.cancel_sweep();
            session.stop();
        }
        for session in &mut self.sessions {
            session.wait_sweep();
            session.wait();
        }
        if !self.sessions.is_empty() {
            debug!(count = self.sessions.len(), "Capture sessions stopped");
        }
    }
}

impl Drop for NetworkMonitor {
    fn drop(&mut self) {
        // Sessions cancel their own workers when dropped.
        self.stop_aggregator();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
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
