//! Signals published by the capture core to whoever presents them.

use tokio::sync::mpsc::UnboundedSender;

use crate::network::host::DirectorySnapshot;

#[derive(Debug, Clone)]
pub enum MonitorEvent {
    ListeningChanged { interface: String, listening: bool },
    DirectoryChanged(DirectorySnapshot),
    /// Sweep progress in percent, 0 to 100.
    SweepProgress { interface: String, percent: f32 },
    SweepCompleted { interface: String, cancelled: bool },
    AggregatorStopped { reason: String },
}

/// Receiver side of the core's signals.
///
/// `emit` is called from capture and aggregator threads; it must not block
/// and must not fail. Thread affinity of the consumer is the implementor's
/// concern.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: MonitorEvent);
}

impl EventSink for UnboundedSender<MonitorEvent> {
    fn emit(&self, event: MonitorEvent) {
        // A dropped receiver means nobody is watching anymore.
        let _ = self.send(event);
    }
}

/// Sink for callers that do not care about events.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: MonitorEvent) {}
}
