#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TimerKind {
    Difficulty,
    Spawn,
    Movement,
}

#[derive(Clone, Debug)]
struct IntervalTimer {
    kind: TimerKind,
    next_due_ms: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct Scheduler {
    now_ms: u64,
    timers: [IntervalTimer; 3],
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            timers: [
                IntervalTimer {
                    kind: TimerKind::Difficulty,
                    next_due_ms: None,
                },
                IntervalTimer {
                    kind: TimerKind::Spawn,
                    next_due_ms: None,
                },
                IntervalTimer {
                    kind: TimerKind::Movement,
                    next_due_ms: None,
                },
            ],
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.timer(kind).next_due_ms.is_some()
    }

    pub fn arm(&mut self, kind: TimerKind, period_ms: u64) {
        let due = self.now_ms.saturating_add(period_ms.max(1));
        self.timer_mut(kind).next_due_ms = Some(due);
    }

    pub fn rearm(&mut self, kind: TimerKind, period_ms: u64) {
        if self.is_armed(kind) {
            self.arm(kind, period_ms);
        }
    }

    pub fn cancel_all(&mut self) {
        for timer in &mut self.timers {
            timer.next_due_ms = None;
        }
    }

    /// Returns the earliest timer due at or before `until_ms` and moves the
    /// clock to its due time. Ties resolve in `TimerKind` order. The timer
    /// stays due until it is re-armed, so callers must `rearm` after handling.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<TimerKind> {
        let (due, kind) = self
            .timers
            .iter()
            .filter_map(|timer| timer.next_due_ms.map(|due| (due, timer.kind)))
            .filter(|(due, _)| *due <= until_ms)
            .min()?;
        self.now_ms = self.now_ms.max(due);
        self.timer_mut(kind).next_due_ms = Some(u64::MAX);
        Some(kind)
    }

    pub fn finish(&mut self, until_ms: u64) {
        self.now_ms = self.now_ms.max(until_ms);
    }

    fn timer(&self, kind: TimerKind) -> &IntervalTimer {
        &self.timers[kind as usize]
    }

    fn timer_mut(&mut self, kind: TimerKind) -> &mut IntervalTimer {
        &mut self.timers[kind as usize]
    }
}
