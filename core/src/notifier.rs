use std::sync::Arc;
use std::time::{Duration, Instant};

use sniffr_common::events::{EventSink, MonitorEvent};
use sniffr_common::network::host::{DirectorySnapshot, HostDirectory};
use tracing::trace;

/// Rate limiter in front of the "directory changed" signal.
///
/// Owned by the aggregator thread; nothing else calls into it.
pub struct ChangeNotifier {
    sink: Arc<dyn EventSink>,
    update_interval: Duration,
    last_notify: Option<Instant>,
    dirty: bool,
}

impl ChangeNotifier {
    pub fn new(sink: Arc<dyn EventSink>, update_interval: Duration) -> Self {
        Self {
            sink,
            update_interval,
            last_notify: None,
            dirty: false,
        }
    }

    /// Records that the directory changed since the last emission.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    #[cfg(test)]
    fn is_pending(&self) -> bool {
        self.dirty
    }

    /// Emits a snapshot if something changed and the interval has elapsed.
    /// The snapshot is only taken when it is actually sent.
    pub fn maybe_notify<F>(&mut self, now: Instant, snapshot: F) -> bool
    where
        F: FnOnce() -> DirectorySnapshot,
    {
        if !self.dirty {
            return false;
        }
        let due = match self.last_notify {
            Some(last) => now.saturating_duration_since(last) >= self.update_interval,
            None => true,
        };
        if !due {
            return false;
        }

        let snapshot = snapshot();
        trace!(hosts = snapshot.len(), "Publishing directory snapshot");
        self.sink.emit(MonitorEvent::DirectoryChanged(snapshot));
        self.last_notify = Some(now);
        self.dirty = false;
        true
    }

    /// Empties `directory` and arms an immediate notification of the empty
    /// state, bypassing the rate limit once.
    pub fn clear(&mut self, directory: &mut HostDirectory) {
        directory.clear();
        self.last_notify = None;
        self.dirty = true;
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
