// Engine Events
//
// Value types delivered onto the engine's single event channel, plus the
// output event handed to the external consumer.

use crate::types::CallChannel;
use serde::{Deserialize, Serialize};

/// Unified engine event.
///
/// Every input the engine reacts to arrives as one of these on a single
/// mpsc channel, so handlers never run concurrently.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Raw cellular call-state signal.
    Telephony(PhoneState),
    /// Foreground-surface transition or notification-change event.
    Ui(UiEvent),
    /// Request to re-attempt telephony registration (permission re-check).
    RecheckPermissions,
}

/// Cellular call-state as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhoneState {
    Offhook,
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiEventKind {
    WindowTransition,
    NotificationChange,
}

/// A single UI transition observed on the device.
///
/// `surface_identity` is empty when the event carries no surface (all
/// notification changes, and window events with no class name).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiEvent {
    pub kind: UiEventKind,
    pub app_identity: String,
    #[serde(default)]
    pub surface_identity: String,
}

/// Output event: a call was detected to have ended.
///
/// Handed by value to the external notifier; the engine keeps no reference
/// after emission. `source_identity` is empty for cellular calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallEnded {
    pub channel: CallChannel,
    pub duration_ms: u64,
    pub source_identity: String,
}

/// Current Unix timestamp in milliseconds.
pub fn now_millis() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}
