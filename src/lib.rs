//! callwatch: call-activity detection engine.
//!
//! Fuses three noisy, partial signals (a telephony call-state
//! notification, foreground-UI transition events, and a queryable
//! audio-routing mode) into a single debounced, duration-filtered
//! "call ended" event. Cellular and VoIP sessions are tracked by
//! independent state machines; everything runs on one serial event loop.

pub mod audio;
pub mod classify;
pub mod emit;
pub mod engine;
pub mod feed;
pub mod signal;
pub mod telephony;
pub mod timer;
pub mod types;
pub mod voip;

pub use audio::{AudioModeProbe, SharedAudioMode, UnavailableAudioMode};
pub use emit::EventEmitter;
pub use engine::{start_engine, DetectionEngine};
pub use feed::{start_signal_feed, FeedConfig};
pub use signal::{CallEnded, EngineEvent, PhoneState, UiEvent, UiEventKind};
pub use telephony::{PermissionProbe, StaticPermission, TelephonyCallMonitor};
pub use types::{AudioMode, CallChannel};
pub use voip::{VoipSessionTracker, VoipState};
