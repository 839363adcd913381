// Classify Module - UI transition classification

pub mod screen;

pub use screen::{classify, is_call_screen, is_generic_container, is_monitored_app, Classification};
