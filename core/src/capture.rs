//! Per-interface capture lifecycle.
//!
//! A [`CaptureSession`] owns one datalink receiver and the thread reading
//! from it, plus an optional subnet-sweep thread. Both are stopped
//! cooperatively through a [`CancelToken`]; the receive loop notices within
//! one receive timeout.

pub mod channel;
pub mod sweep;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use pnet::datalink::{DataLinkReceiver, NetworkInterface};
use sniffr_common::config::Config;
use sniffr_common::error::{CaptureError, Result};
use sniffr_common::events::{EventSink, MonitorEvent};
use sniffr_common::network::host::Observation;
use sniffr_common::network::interface::InterfaceBinding;
use sniffr_common::network::range::Ipv4Range;
use sniffr_common::utils::cancel::CancelToken;
use sniffr_protocols::ethernet;
use tracing::{debug, error, info, warn};

use crate::queue::ObservationQueue;
use channel::ChannelOpener;
use sweep::ProberFactory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Stopped,
    Starting,
    Listening,
}

/// Point-in-time view of a session for presentation.
#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub binding: InterfaceBinding,
    pub state: CaptureState,
    pub last_error: Option<String>,
    pub sweeping: bool,
}

/// Collaborators shared by every session of a monitor.
#[derive(Clone)]
pub struct SessionContext {
    pub config: Config,
    pub queue: ObservationQueue,
    pub sink: Arc<dyn EventSink>,
    pub opener: ChannelOpener,
    pub prober: ProberFactory,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<CaptureState>,
    last_error: Mutex<Option<String>>,
    sweeping: AtomicBool,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: Mutex::new(CaptureState::Stopped),
            last_error: Mutex::new(None),
            sweeping: AtomicBool::new(false),
        }
    }

    fn state(&self) -> CaptureState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: CaptureState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set_error(&self, error: Option<String>) {
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = error;
    }
}

pub struct CaptureSession {
    interface: NetworkInterface,
    binding: Arc<InterfaceBinding>,
    ctx: SessionContext,
    shared: Arc<Shared>,
    cancel: CancelToken,
    worker: Option<JoinHandle<()>>,
    sweep_cancel: CancelToken,
    sweeper: Option<JoinHandle<()>>,
}

impl CaptureSession {
    pub fn new(interface: NetworkInterface, ctx: SessionContext) -> Self {
        let binding = Arc::new(InterfaceBinding::from(&interface));
        Self {
            interface,
            binding,
            ctx,
            shared: Arc::new(Shared::new()),
            cancel: CancelToken::new(),
            worker: None,
            sweep_cancel: CancelToken::new(),
            sweeper: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.binding.name
    }

    pub fn binding(&self) -> &InterfaceBinding {
        &self.binding
    }

    pub fn state(&self) -> CaptureState {
        self.shared.state()
    }

    pub fn is_listening(&self) -> bool {
        self.state() == CaptureState::Listening
    }

    pub fn last_error(&self) -> Option<String> {
        self.shared.last_error()
    }

    pub fn is_sweeping(&self) -> bool {
        self.shared.sweeping.load(Ordering::Acquire)
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            binding: (*self.binding).clone(),
            state: self.state(),
            last_error: self.last_error(),
            sweeping: self.is_sweeping(),
        }
    }

    /// Opens the capture handle and spawns the receive loop.
    ///
    /// A failure is recorded as the session's error, signalled as
    /// "not listening", and returned; the session stays stopped and can be
    /// started again later.
    pub fn start(&mut self) -> Result<()> {
        if self.is_listening() && !self.cancel.is_cancelled() {
            return Ok(());
        }
        // A previous loop may still be finishing its last receive call.
        self.wait();

        self.shared.set_state(CaptureState::Starting);
        let dl_config = channel::datalink_config(&self.ctx.config);
        let rx = match channel::open_eth_channel(&self.interface, &dl_config, self.ctx.opener.as_ref()) {
            Ok((_tx, rx)) => rx,
            Err(e) => {
                self.fail(&e);
                return Err(e);
            }
        };

        let cancel = CancelToken::new();
        let receive_loop = ReceiveLoop {
            rx,
            binding: self.binding.clone(),
            queue: self.ctx.queue.clone(),
            sink: self.ctx.sink.clone(),
            shared: self.shared.clone(),
            cancel: cancel.clone(),
        };

        self.shared.set_error(None);
        self.shared.set_state(CaptureState::Listening);
        self.ctx.sink.emit(MonitorEvent::ListeningChanged {
            interface: self.binding.name.clone(),
            listening: true,
        });

        let spawned = thread::Builder::new()
            .name(format!("capture-{}", self.binding.name))
            .spawn(move || receive_loop.run());
        match spawned {
            Ok(handle) => {
                info!(interface = %self.binding, "Listening");
                self.cancel = cancel;
                self.worker = Some(handle);
                Ok(())
            }
            Err(e) => {
                let e = CaptureError::Io(e);
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Requests the receive loop to stop. It exits within one receive
    /// timeout and signals "not listening" itself. No-op when stopped.
    pub fn stop(&mut self) {
        if self.worker.is_none() || self.cancel.is_cancelled() {
            return;
        }
        debug!(interface = %self.binding.name, "Stopping capture");
        self.cancel.cancel();
    }

    /// Joins the receive thread, if any.
    pub fn wait(&mut self) {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                error!(interface = %self.binding.name, "Capture thread panicked");
                self.shared.set_state(CaptureState::Stopped);
            }
        }
    }

    /// Starts a ping sweep over the bound subnet on its own thread.
    pub fn sweep_subnet(&mut self) -> Result<()> {
        let (Some(addr), Some(mask)) = (self.binding.ipv4, self.binding.netmask) else {
            return Err(CaptureError::NoIpv4Address {
                interface: self.binding.name.clone(),
            });
        };
        if self.shared.sweeping.swap(true, Ordering::AcqRel) {
            return Err(CaptureError::SweepInProgress {
                interface: self.binding.name.clone(),
            });
        }
        self.wait_sweep();

        let mut prober = match (self.ctx.prober)() {
            Ok(prober) => prober,
            Err(e) => {
                self.shared.sweeping.store(false, Ordering::Release);
                return Err(e);
            }
        };

        let range = Ipv4Range::from_subnet(addr, mask);
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();
        let shared = self.shared.clone();
        let sink = self.ctx.sink.clone();
        let name = self.binding.name.clone();
        let delay = self.ctx.config.sweep_probe_delay;
        info!(interface = %name, from = %range.start_addr, to = %range.end_addr, "Starting subnet sweep");

        let spawned = thread::Builder::new().name(format!("sweep-{name}")).spawn(move || {
            let finished = sweep::run_sweep(range, prober.as_mut(), &worker_cancel, delay, |percent| {
                sink.emit(MonitorEvent::SweepProgress {
                    interface: name.clone(),
                    percent,
                });
            });
            shared.sweeping.store(false, Ordering::Release);
            debug!(interface = %name, cancelled = !finished, "Subnet sweep ended");
            sink.emit(MonitorEvent::SweepCompleted {
                interface: name,
                cancelled: !finished,
            });
        });

        match spawned {
            Ok(handle) => {
                self.sweep_cancel = cancel;
                self.sweeper = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.shared.sweeping.store(false, Ordering::Release);
                Err(CaptureError::Io(e))
            }
        }
    }

    pub fn cancel_sweep(&self) {
        if self.is_sweeping() {
            debug!(interface = %self.binding.name, "Cancelling subnet sweep");
        }
        self.sweep_cancel.cancel();
    }

    pub fn wait_sweep(&mut self) {
        if let Some(handle) = self.sweeper.take() {
            if handle.join().is_err() {
                warn!(interface = %self.binding.name, "Sweep thread panicked");
                self.shared.sweeping.store(false, Ordering::Release);
            }
        }
    }

    fn fail(&self, err: &CaptureError) {
        error!(interface = %self.binding.name, "{err}");
        self.shared.set_error(Some(err.to_string()));
        self.shared.set_state(CaptureState::Stopped);
        self.ctx.sink.emit(MonitorEvent::ListeningChanged {
            interface: self.binding.name.clone(),
            listening: false,
        });
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.sweep_cancel.cancel();
    }
}

struct ReceiveLoop {
    rx: Box<dyn DataLinkReceiver>,
    binding: Arc<InterfaceBinding>,
    queue: ObservationQueue,
    sink: Arc<dyn EventSink>,
    shared: Arc<Shared>,
    cancel: CancelToken,
}

impl ReceiveLoop {
    fn run(mut self) {
        if let Err(e) = self.receive() {
            error!(interface = %self.binding.name, "{e}");
            self.shared.set_error(Some(e.to_string()));
        }
        self.shared.set_state(CaptureState::Stopped);
        info!(interface = %self.binding.name, "Stopped listening");
        self.sink.emit(MonitorEvent::ListeningChanged {
            interface: self.binding.name.clone(),
            listening: false,
        });
    }

    fn receive(&mut self) -> Result<()> {
        while !self.cancel.is_cancelled() {
            match self.rx.next() {
                Ok(frame) => {
                    if let Some(observation) = observe(frame, &self.binding) {
                        self.queue.enqueue(observation);
                    }
                }
                Err(e) if channel::is_timeout(&e) => continue,
                Err(source) => {
                    return Err(CaptureError::Receive {
                        interface: self.binding.name.clone(),
                        source,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Turns one captured frame into an observation. Non-IPv4 and truncated
/// frames yield `None`.
pub fn observe(frame: &[u8], binding: &Arc<InterfaceBinding>) -> Option<Observation> {
    if !ethernet::is_ipv4_frame(frame) {
        return None;
    }
    let eth = ethernet::get_packet_from_u8(frame).ok()?;
    let source_ip = ethernet::get_ipv4_source(&eth).ok()?;
    Some(Observation::new(eth.get_source(), source_ip, binding.clone()))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
