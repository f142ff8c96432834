use std::sync::RwLock;

/// A notification emitted while a transfer attempt runs.
#[derive(Debug, Clone)]
pub enum TransferEvent {
    /// One buffer landed on disk.
    Progress {
        /// Bytes just read from the stream.
        read: u64,
        /// Total bytes received across all attempts.
        received: u64,
        /// Total bytes expected, when the server declared a length.
        total: Option<u64>,
    },
    /// Smoothed throughput over the last whole-second window, in KiB/s.
    Speed { kib_per_sec: f64 },
    /// Failure detail; always followed by the terminal notification.
    Error { message: String },
    /// Terminal notification; exactly one per attempt.
    Completed { success: bool },
}

/// Callback invoked for every emitted event.
pub type EventCallback = Box<dyn Fn(&TransferEvent) + Send + Sync>;

/// Fire-and-forget broadcast to zero or more subscribers.
///
/// Delivery order equals emission order; callbacks run on the emitting task,
/// so they should return quickly. Nothing is retained across restarts.
#[derive(Default)]
pub struct EventSink {
    callbacks: RwLock<Vec<EventCallback>>,
}

impl EventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber.
    pub fn subscribe(&self, callback: EventCallback) {
        let mut callbacks = self.callbacks.write().unwrap();
        callbacks.push(callback);
    }

    /// Broadcasts `event` to all subscribers in registration order.
    pub fn emit(&self, event: &TransferEvent) {
        let callbacks = self.callbacks.read().unwrap();
        for callback in callbacks.iter() {
            callback(event);
        }
    }
}
