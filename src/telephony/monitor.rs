// Telephony Call Monitor
//
// Tracks cellular call-state transitions and emits an end event with the
// measured duration. Registration is gated on an OS-level permission: an
// unregistered monitor ignores every signal and the host keeps running
// with reduced detection rather than failing.

use crate::signal::{CallEnded, PhoneState};
use crate::types::CallChannel;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Sessions at or below this duration are treated as noise (missed or
/// rejected calls bounce the state for well under a second).
const CELLULAR_MIN_DURATION_MS: u64 = 1000;

/// Read access to the phone-state permission.
///
/// The engine cannot request permissions itself; it only observes whether
/// the host granted them, at registration time and on every re-check.
pub trait PermissionProbe: Send {
    fn phone_state_granted(&self) -> bool;
}

/// Permission probe with a fixed answer.
pub struct StaticPermission(pub bool);

impl PermissionProbe for StaticPermission {
    fn phone_state_granted(&self) -> bool {
        self.0
    }
}

/// Permission probe whose answer can change after construction, for hosts
/// where the grant arrives later (and for tests exercising the re-check
/// path).
#[derive(Clone)]
pub struct SharedPermission {
    granted: Arc<AtomicBool>,
}

impl SharedPermission {
    pub fn new(granted: bool) -> Self {
        Self {
            granted: Arc::new(AtomicBool::new(granted)),
        }
    }

    pub fn set(&self, granted: bool) {
        self.granted.store(granted, Ordering::Relaxed);
    }
}

impl PermissionProbe for SharedPermission {
    fn phone_state_granted(&self) -> bool {
        self.granted.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallState {
    Idle,
    InCall { started_at: u64 },
}

/// Cellular call monitor: `Idle` / `InCall` with duration filtering.
pub struct TelephonyCallMonitor {
    registered: bool,
    state: CallState,
}

impl TelephonyCallMonitor {
    pub fn new() -> Self {
        Self {
            registered: false,
            state: CallState::Idle,
        }
    }

    /// Attempt registration against the current permission state.
    ///
    /// Never fails: without the permission the monitor simply stays
    /// inactive. Safe to call again at any time — re-registration does not
    /// reset in-flight call state.
    pub fn register(&mut self, permission_granted: bool) -> bool {
        if !permission_granted {
            warn!("phone-state permission unavailable, cellular monitor inactive");
            return self.registered;
        }
        if self.registered {
            debug!("cellular call monitor already registered");
        } else {
            self.registered = true;
            info!("cellular call monitor registered");
        }
        self.registered
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Process a raw call-state signal at `now_ms`.
    ///
    /// Returns the end event when a call longer than the minimum duration
    /// finishes; sub-second blips are dropped silently.
    pub fn handle_signal(&mut self, signal: PhoneState, now_ms: u64) -> Option<CallEnded> {
        if !self.registered {
            return None;
        }

        match (signal, self.state) {
            (PhoneState::Offhook, CallState::Idle) => {
                debug!("cellular call off-hook");
                self.state = CallState::InCall { started_at: now_ms };
                None
            }
            (PhoneState::Idle, CallState::InCall { started_at }) => {
                let duration_ms = now_ms.saturating_sub(started_at);
                self.state = CallState::Idle;
                if duration_ms > CELLULAR_MIN_DURATION_MS {
                    info!(duration_ms, "cellular call ended");
                    Some(CallEnded {
                        channel: CallChannel::Cellular,
                        duration_ms,
                        source_identity: String::new(),
                    })
                } else {
                    debug!(duration_ms, "cellular blip dropped");
                    None
                }
            }
            // Repeated off-hook keeps the original start; idle while idle
            // carries no information.
            (PhoneState::Offhook, CallState::InCall { .. }) => None,
            (PhoneState::Idle, CallState::Idle) => None,
        }
    }
}

impl Default for TelephonyCallMonitor {
    fn default() -> Self {
        Self::new()
    }
}
