// VoIP Module - VoIP session lifecycle tracking

pub mod tracker;

pub use tracker::{VoipSession, VoipSessionTracker, VoipState};
