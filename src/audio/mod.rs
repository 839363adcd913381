// Audio Mode Oracle
//
// Point-in-time query: is the device currently routing audio for live
// call communication? The tracker takes this as an injected handle so it
// can be swapped for a platform backend or pinned in tests.

use crate::types::AudioMode;
use std::sync::{Arc, Mutex};

/// Read access to the platform's live audio routing mode.
///
/// Implementations must be synchronous, side-effect-free and never block.
/// There is no error path: a probe that cannot answer reports
/// [`AudioMode::Other`].
pub trait AudioModeProbe: Send {
    fn current_mode(&self) -> AudioMode;
}

/// Probe for hosts without a live telephony audio stack.
pub struct UnavailableAudioMode;

impl AudioModeProbe for UnavailableAudioMode {
    fn current_mode(&self) -> AudioMode {
        AudioMode::Other
    }
}

/// Shared audio-mode cell.
///
/// One clone is handed to the tracker for reads, another to whatever
/// signal source observes routing changes (the feed, or a test driving a
/// scenario). Reads never block beyond the uncontended lock.
#[derive(Clone)]
pub struct SharedAudioMode {
    inner: Arc<Mutex<AudioMode>>,
}

impl SharedAudioMode {
    pub fn new(mode: AudioMode) -> Self {
        Self {
            inner: Arc::new(Mutex::new(mode)),
        }
    }

    pub fn set(&self, mode: AudioMode) {
        *self.inner.lock().unwrap() = mode;
    }
}

impl AudioModeProbe for SharedAudioMode {
    fn current_mode(&self) -> AudioMode {
        *self.inner.lock().unwrap()
    }
}
