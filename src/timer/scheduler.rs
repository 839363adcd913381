// Timer Scheduler
//
// Cancellable single-shot delayed callbacks for the detection engine.
// This is a pure deadline table, not a thread: the engine's event loop
// asks for the next deadline, waits on its channel at most that long, and
// drains due timers back into the same loop. Firings are therefore
// ordinary events on the serial context and observe up-to-date state.
//
// One slot per kind. Scheduling a kind that is already outstanding
// replaces the slot and invalidates the previous handle; a firing whose
// sequence number no longer matches the live handle is stale and must be
// ignored by the consumer.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TimerKind {
    /// End-of-call debounce (and its mid-call retry).
    EndDebounce,
    /// Periodic audio-mode poll while a VoIP session is live.
    Watchdog,
}

/// Handle to an outstanding timer. Held by the component that scheduled
/// it; at most one live handle per kind exists at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle {
    kind: TimerKind,
    seq: u64,
}

impl TimerHandle {
    /// Does this firing belong to the scheduled instance behind the
    /// handle (same kind, same generation)?
    pub fn matches(&self, fired: TimerFired) -> bool {
        self.kind == fired.kind && self.seq == fired.seq
    }
}

/// A timer that reached its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub kind: TimerKind,
    pub seq: u64,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    deadline_ms: u64,
    seq: u64,
}

/// Single-shot timer table with one slot per [`TimerKind`].
pub struct TimerScheduler {
    debounce: Option<Slot>,
    watchdog: Option<Slot>,
    next_seq: u64,
}

impl TimerScheduler {
    pub fn new() -> Self {
        Self {
            debounce: None,
            watchdog: None,
            next_seq: 0,
        }
    }

    /// Schedule `kind` to fire `delay_ms` after `now_ms`.
    ///
    /// Any previous instance of the same kind is replaced; its handle goes
    /// stale and will no longer match firings.
    pub fn schedule(&mut self, kind: TimerKind, delay_ms: u64, now_ms: u64) -> TimerHandle {
        self.next_seq += 1;
        let seq = self.next_seq;
        *self.slot_mut(kind) = Some(Slot {
            deadline_ms: now_ms + delay_ms,
            seq,
        });
        TimerHandle { kind, seq }
    }

    /// Cancel the timer behind `handle`. A stale handle is a no-op, so a
    /// cancel racing a replacement cannot kill the newer instance.
    pub fn cancel(&mut self, handle: TimerHandle) {
        let slot = self.slot_mut(handle.kind);
        if slot.map(|s| s.seq) == Some(handle.seq) {
            *slot = None;
        }
    }

    pub fn is_scheduled(&self, kind: TimerKind) -> bool {
        self.slot(kind).is_some()
    }

    /// Earliest outstanding deadline, if any.
    pub fn next_deadline(&self) -> Option<u64> {
        [self.debounce, self.watchdog]
            .iter()
            .flatten()
            .map(|s| s.deadline_ms)
            .min()
    }

    /// Remove and return every timer due at `now_ms`, earliest deadline
    /// first (`EndDebounce` before `Watchdog` on ties).
    pub fn take_due(&mut self, now_ms: u64) -> Vec<TimerFired> {
        let mut due = Vec::new();
        for kind in [TimerKind::EndDebounce, TimerKind::Watchdog] {
            let slot = self.slot_mut(kind);
            if let Some(s) = *slot {
                if s.deadline_ms <= now_ms {
                    *slot = None;
                    due.push((s.deadline_ms, TimerFired { kind, seq: s.seq }));
                }
            }
        }
        due.sort_by_key(|(deadline, fired)| (*deadline, fired.kind));
        due.into_iter().map(|(_, fired)| fired).collect()
    }

    fn slot(&self, kind: TimerKind) -> &Option<Slot> {
        match kind {
            TimerKind::EndDebounce => &self.debounce,
            TimerKind::Watchdog => &self.watchdog,
        }
    }

    fn slot_mut(&mut self, kind: TimerKind) -> &mut Option<Slot> {
        match kind {
            TimerKind::EndDebounce => &mut self.debounce,
            TimerKind::Watchdog => &mut self.watchdog,
        }
    }
}

impl Default for TimerScheduler {
    fn default() -> Self {
        Self::new()
    }
}
