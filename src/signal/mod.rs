// Signal Module - Event types crossing module boundaries

pub mod events;

pub use events::{now_millis, CallEnded, EngineEvent, PhoneState, UiEvent, UiEventKind};
