// VoIP Session Tracker
//
// The central state machine. Fuses classifier output, the audio-mode
// oracle and the monitored-app allowlist into a VoIP session lifecycle:
// Idle -> Active on corroborated call evidence, Active -> EndPending on a
// negative signal (debounced, because a bare screen change is not proof
// the call ended), EndPending -> Idle on finalize. A watchdog polls the
// audio mode while a session is live to catch calls whose end produces no
// further UI transitions at all.

use crate::audio::AudioModeProbe;
use crate::classify::{self, Classification};
use crate::signal::CallEnded;
use crate::timer::{TimerFired, TimerHandle, TimerKind, TimerScheduler};
use crate::types::{AudioMode, CallChannel};
use std::mem;
use tracing::{debug, info};

/// Sessions at or below this duration are accidental screen visits, not
/// real calls.
const VOIP_MIN_DURATION_MS: u64 = 3000;
/// Delay before a single negative signal is believed.
const END_DEBOUNCE_MS: u64 = 2000;
/// Re-check interval while audio is still in communication mode.
const END_DEBOUNCE_RETRY_MS: u64 = 2500;
/// Audio-mode poll period while a session is live.
const WATCHDOG_POLL_MS: u64 = 5000;

/// Live session data. Exists only while the tracker is `Active` or
/// `EndPending`; `started_at` survives end-cancellation unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoipSession {
    pub started_at: u64,
    pub source_app: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VoipState {
    #[default]
    Idle,
    Active(VoipSession),
    EndPending(VoipSession),
}

pub struct VoipSessionTracker {
    state: VoipState,
    timers: TimerScheduler,
    audio: Box<dyn AudioModeProbe>,
    debounce: Option<TimerHandle>,
    watchdog: Option<TimerHandle>,
}

impl VoipSessionTracker {
    pub fn new(audio: Box<dyn AudioModeProbe>) -> Self {
        Self {
            state: VoipState::Idle,
            timers: TimerScheduler::new(),
            audio,
            debounce: None,
            watchdog: None,
        }
    }

    pub fn state(&self) -> &VoipState {
        &self.state
    }

    /// App identity of the live session, if any.
    pub fn active_app(&self) -> Option<&str> {
        match &self.state {
            VoipState::Idle => None,
            VoipState::Active(session) | VoipState::EndPending(session) => {
                Some(&session.source_app)
            }
        }
    }

    /// Earliest outstanding timer deadline, for the engine loop's wait.
    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.next_deadline()
    }

    /// Fire every timer due at `now_ms`, returning any end events.
    pub fn poll_timers(&mut self, now_ms: u64) -> Vec<CallEnded> {
        let mut ended = Vec::new();
        for fired in self.timers.take_due(now_ms) {
            if let Some(event) = self.handle_timer(fired, now_ms) {
                ended.push(event);
            }
        }
        ended
    }

    /// Process a classification arriving from the UI event stream.
    ///
    /// Classifications never emit directly — ends are only ever finalized
    /// on the debounce path, so flicker cannot produce an event.
    pub fn handle_classification(&mut self, c: &Classification, now_ms: u64) {
        if self.start_condition(c) {
            self.confirm_active(c, now_ms);
        } else {
            self.begin_end_debounce(now_ms);
        }
    }

    /// A call screen is direct evidence; a monitored app needs the audio
    /// route to corroborate.
    fn start_condition(&self, c: &Classification) -> bool {
        c.is_call_screen
            || (c.is_monitored_app && self.audio.current_mode() == AudioMode::Communication)
    }

    fn confirm_active(&mut self, c: &Classification, now_ms: u64) {
        self.state = match mem::take(&mut self.state) {
            VoipState::Idle => {
                info!(app = %c.app_identity, "voip session started");
                self.start_watchdog(now_ms);
                VoipState::Active(VoipSession {
                    started_at: now_ms,
                    source_app: c.app_identity.clone(),
                })
            }
            VoipState::EndPending(session) => {
                if let Some(handle) = self.debounce.take() {
                    self.timers.cancel(handle);
                }
                debug!(app = %session.source_app, "pending end cancelled, session confirmed active");
                VoipState::Active(session)
            }
            VoipState::Active(session) => VoipState::Active(session),
        };
    }

    fn begin_end_debounce(&mut self, now_ms: u64) {
        self.state = match mem::take(&mut self.state) {
            VoipState::Idle => VoipState::Idle,
            VoipState::Active(session) => {
                debug!(app = %session.source_app, "call screen lost, debouncing end");
                self.debounce =
                    Some(self.timers.schedule(TimerKind::EndDebounce, END_DEBOUNCE_MS, now_ms));
                VoipState::EndPending(session)
            }
            // Already pending: the existing timer stands, repeated
            // negatives neither reset nor duplicate it
            VoipState::EndPending(session) => VoipState::EndPending(session),
        };
    }

    /// Process a timer firing. Stale firings (superseded or cancelled
    /// instances) are discarded here, so duplicate end detection cannot
    /// occur no matter how firings interleave.
    pub fn handle_timer(&mut self, fired: TimerFired, now_ms: u64) -> Option<CallEnded> {
        match fired.kind {
            TimerKind::EndDebounce => {
                if self.debounce.map(|h| h.matches(fired)) != Some(true) {
                    return None;
                }
                self.debounce = None;
                self.end_debounce_fired(now_ms)
            }
            TimerKind::Watchdog => {
                if self.watchdog.map(|h| h.matches(fired)) != Some(true) {
                    return None;
                }
                self.watchdog = None;
                self.watchdog_fired(now_ms);
                None
            }
        }
    }

    fn end_debounce_fired(&mut self, now_ms: u64) -> Option<CallEnded> {
        let session = match mem::take(&mut self.state) {
            VoipState::EndPending(session) => session,
            other => {
                self.state = other;
                return None;
            }
        };

        // The app may be showing a transient non-call screen mid-call:
        // while audio stays in communication mode for a monitored app,
        // keep waiting instead of finalizing.
        if self.audio.current_mode() == AudioMode::Communication
            && classify::is_monitored_app(&session.source_app)
        {
            debug!(app = %session.source_app, "audio still in communication, retrying end check");
            self.debounce = Some(self.timers.schedule(
                TimerKind::EndDebounce,
                END_DEBOUNCE_RETRY_MS,
                now_ms,
            ));
            self.state = VoipState::EndPending(session);
            return None;
        }

        self.finalize(session, now_ms)
    }

    /// End of session. Runs exactly once per session: both timer slots are
    /// invalidated and the state returns to `Idle` whether or not the
    /// duration check lets the event out.
    fn finalize(&mut self, session: VoipSession, now_ms: u64) -> Option<CallEnded> {
        if let Some(handle) = self.watchdog.take() {
            self.timers.cancel(handle);
        }

        let duration_ms = now_ms.saturating_sub(session.started_at);
        if duration_ms > VOIP_MIN_DURATION_MS {
            info!(app = %session.source_app, duration_ms, "voip call ended");
            Some(CallEnded {
                channel: CallChannel::Voip,
                duration_ms,
                source_identity: session.source_app,
            })
        } else {
            debug!(app = %session.source_app, duration_ms, "short voip session dropped");
            None
        }
    }

    fn start_watchdog(&mut self, now_ms: u64) {
        // Replace, never stack: the watchdog must not run concurrently
        // with itself
        if let Some(handle) = self.watchdog.take() {
            self.timers.cancel(handle);
        }
        self.watchdog = Some(self.timers.schedule(TimerKind::Watchdog, WATCHDOG_POLL_MS, now_ms));
    }

    /// Watchdog poll: compensates for missed or suppressed UI transition
    /// events by treating a lost communication route as a negative
    /// classification.
    fn watchdog_fired(&mut self, now_ms: u64) {
        if matches!(self.state, VoipState::Idle) {
            return;
        }
        if self.audio.current_mode() != AudioMode::Communication {
            debug!("watchdog: audio route left communication mode");
            self.begin_end_debounce(now_ms);
        }
        self.watchdog = Some(self.timers.schedule(TimerKind::Watchdog, WATCHDOG_POLL_MS, now_ms));
    }
}
