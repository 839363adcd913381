// Event Emitter Module
//
// Hand-off point for detected call ends. Owns the single-consumer channel
// to the external notifier/recorder collaborator — no global handle, the
// sender is injected at construction.

use crate::signal::CallEnded;
use std::sync::mpsc::Sender;
use tracing::{info, warn};

pub struct EventEmitter {
    sender: Sender<CallEnded>,
}

impl EventEmitter {
    pub fn new(sender: Sender<CallEnded>) -> Self {
        Self { sender }
    }

    /// Deliver a call-ended event to the consumer. The engine keeps no
    /// reference after emission; a disconnected consumer costs a warning,
    /// never an error.
    pub fn emit_call_ended(&self, event: CallEnded) {
        info!(
            channel = ?event.channel,
            duration_ms = event.duration_ms,
            source = %event.source_identity,
            "emitting call-ended"
        );
        if self.sender.send(event).is_err() {
            warn!("call-ended consumer disconnected, event dropped");
        }
    }
}
