// Detection Engine Loop
//
// Aggregates every input — telephony signals, UI transition events,
// permission re-checks and timer deadlines — onto one thread and makes
// the detection decisions. All mutable state lives behind this loop, so
// handlers never race and a timer firing always observes the state that
// scheduled it.

use crate::audio::AudioModeProbe;
use crate::classify;
use crate::emit::EventEmitter;
use crate::signal::{now_millis, EngineEvent, UiEvent, UiEventKind};
use crate::telephony::{PermissionProbe, TelephonyCallMonitor};
use crate::voip::VoipSessionTracker;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// The assembled detection engine: one telephony monitor, one VoIP
/// tracker, one outbound emitter.
pub struct DetectionEngine {
    telephony: TelephonyCallMonitor,
    voip: VoipSessionTracker,
    permissions: Box<dyn PermissionProbe>,
    emitter: EventEmitter,
}

impl DetectionEngine {
    /// Build the engine and attempt initial telephony registration
    /// against the injected permission probe.
    pub fn new(
        audio: Box<dyn AudioModeProbe>,
        permissions: Box<dyn PermissionProbe>,
        emitter: EventEmitter,
    ) -> Self {
        let mut telephony = TelephonyCallMonitor::new();
        telephony.register(permissions.phone_state_granted());

        Self {
            telephony,
            voip: VoipSessionTracker::new(audio),
            permissions,
            emitter,
        }
    }

    /// Process one input event at `now_ms`.
    pub fn handle_event(&mut self, event: EngineEvent, now_ms: u64) {
        match event {
            EngineEvent::Telephony(state) => {
                debug!(?state, "telephony signal");
                if let Some(ended) = self.telephony.handle_signal(state, now_ms) {
                    self.emitter.emit_call_ended(ended);
                }
            }
            EngineEvent::Ui(ui) => self.handle_ui_event(ui, now_ms),
            EngineEvent::RecheckPermissions => {
                info!("re-checking phone-state permission");
                self.telephony
                    .register(self.permissions.phone_state_granted());
            }
        }
    }

    fn handle_ui_event(&mut self, ui: UiEvent, now_ms: u64) {
        match ui.kind {
            UiEventKind::WindowTransition => {
                // Bare container transitions fire constantly and carry no
                // signal; they must never reach the classifier
                if classify::is_generic_container(&ui.surface_identity) {
                    return;
                }
                debug!(app = %ui.app_identity, surface = %ui.surface_identity, "screen transition");
                let c = classify::classify(&ui.app_identity, &ui.surface_identity);
                self.voip.handle_classification(&c, now_ms);
            }
            UiEventKind::NotificationChange => {
                // A notification change only matters during a live VoIP
                // session, where it may be the call-ended notification:
                // re-run detection for the session's own app
                if let Some(app) = self.voip.active_app() {
                    let app = app.to_string();
                    debug!(app = %app, "notification change during voip session");
                    let c = classify::classify(&app, "");
                    self.voip.handle_classification(&c, now_ms);
                }
            }
        }
    }

    /// Earliest outstanding timer deadline.
    pub fn next_deadline(&self) -> Option<u64> {
        self.voip.next_deadline()
    }

    /// Fire timers due at `now_ms` and emit any resulting end events.
    pub fn poll_timers(&mut self, now_ms: u64) {
        for ended in self.voip.poll_timers(now_ms) {
            self.emitter.emit_call_ended(ended);
        }
    }
}

/// Start the engine thread.
pub fn start_engine(
    event_receiver: Receiver<EngineEvent>,
    engine: DetectionEngine,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        run_engine(event_receiver, engine);
    })
}

fn run_engine(event_receiver: Receiver<EngineEvent>, mut engine: DetectionEngine) {
    info!("detection engine started");

    loop {
        engine.poll_timers(now_millis());

        // Wait for the next event, bounded by the earliest timer deadline
        // so due timers fire on this same thread
        let event = match engine.next_deadline() {
            None => match event_receiver.recv() {
                Ok(event) => event,
                Err(_) => break,
            },
            Some(deadline) => {
                let wait = Duration::from_millis(deadline.saturating_sub(now_millis()));
                match event_receiver.recv_timeout(wait) {
                    Ok(event) => event,
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        };

        engine.handle_event(event, now_millis());
    }

    info!("engine channel closed, shutting down");
}
