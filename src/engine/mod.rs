// Engine Module - Serial event loop fusing all signal sources

pub mod core;

pub use core::{start_engine, DetectionEngine};
