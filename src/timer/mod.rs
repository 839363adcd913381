// Timer Module - Cooperative single-shot timers

pub mod scheduler;

pub use scheduler::{TimerFired, TimerHandle, TimerKind, TimerScheduler};
