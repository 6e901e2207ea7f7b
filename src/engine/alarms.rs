//! One-shot alarms on the engine clock.
//!
//! Delayed side effects (tips, the end of a freeze, buzz reopening) are scheduled here
//! instead of spawning timers, so cancelling one is just removing it from the list.

/// Delayed actions the round engine schedules for itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alarm {
    /// Open the first buzz window after the question is shown.
    OpenBuzzWindow,
    /// Reveal the tip with the given index.
    ShowTip(usize),
    /// Resume the countdown paused by a freeze.
    FreezeEnds,
    /// Reopen buzzing after a wrong answer.
    ReopenBuzzWindow,
    /// Reveal the answer once nobody rewound in time.
    RewindGraceEnds,
}

#[derive(Debug, Clone)]
struct Pending {
    due_ms: u64,
    seq: u64,
    alarm: Alarm,
}

/// Ordered set of pending alarms.
#[derive(Debug, Clone, Default)]
pub struct AlarmSchedule {
    now_ms: u64,
    next_seq: u64,
    pending: Vec<Pending>,
}

impl AlarmSchedule {
    /// Create an empty schedule at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current engine clock.
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Schedule `alarm` to fire `delay_ms` from now.
    pub fn schedule(&mut self, delay_ms: u64, alarm: Alarm) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(Pending {
            due_ms: self.now_ms.saturating_add(delay_ms),
            seq,
            alarm,
        });
    }

    /// Drop every pending alarm matching `predicate`, returning how many were removed.
    pub fn cancel_where(&mut self, predicate: impl Fn(&Alarm) -> bool) -> usize {
        let before = self.pending.len();
        self.pending.retain(|pending| !predicate(&pending.alarm));
        before - self.pending.len()
    }

    /// Drop every pending occurrence of `alarm`.
    pub fn cancel(&mut self, alarm: Alarm) -> usize {
        self.cancel_where(|pending| *pending == alarm)
    }

    /// Drop every pending alarm.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Whether `alarm` is pending.
    pub fn is_scheduled(&self, alarm: Alarm) -> bool {
        self.pending.iter().any(|pending| pending.alarm == alarm)
    }

    /// Move the clock forward and return the alarms that came due, earliest first.
    pub fn advance(&mut self, delta_ms: u64) -> Vec<Alarm> {
        self.now_ms = self.now_ms.saturating_add(delta_ms);
        let now = self.now_ms;

        let mut due: Vec<Pending> = Vec::new();
        self.pending.retain(|pending| {
            if pending.due_ms <= now {
                due.push(pending.clone());
                false
            } else {
                true
            }
        });
        due.sort_by_key(|pending| (pending.due_ms, pending.seq));
        due.into_iter().map(|pending| pending.alarm).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alarms_fire_in_due_order() {
        let mut schedule = AlarmSchedule::new();
        schedule.schedule(300, Alarm::ReopenBuzzWindow);
        schedule.schedule(100, Alarm::ShowTip(0));
        schedule.schedule(100, Alarm::FreezeEnds);

        assert!(schedule.advance(99).is_empty());
        assert_eq!(
            schedule.advance(1),
            vec![Alarm::ShowTip(0), Alarm::FreezeEnds]
        );
        assert_eq!(schedule.advance(500), vec![Alarm::ReopenBuzzWindow]);
        assert!(schedule.advance(500).is_empty());
    }

    #[test]
    fn cancelled_alarms_never_fire() {
        let mut schedule = AlarmSchedule::new();
        schedule.schedule(10, Alarm::ShowTip(0));
        schedule.schedule(20, Alarm::ShowTip(1));
        schedule.schedule(20, Alarm::FreezeEnds);

        assert_eq!(
            schedule.cancel_where(|alarm| matches!(alarm, Alarm::ShowTip(_))),
            2
        );
        assert!(schedule.is_scheduled(Alarm::FreezeEnds));
        assert_eq!(schedule.advance(50), vec![Alarm::FreezeEnds]);
    }

    #[test]
    fn delays_are_relative_to_current_clock() {
        let mut schedule = AlarmSchedule::new();
        schedule.advance(1_000);
        schedule.schedule(50, Alarm::RewindGraceEnds);
        assert!(schedule.advance(49).is_empty());
        assert_eq!(schedule.advance(1), vec![Alarm::RewindGraceEnds]);
        assert_eq!(schedule.now_ms(), 1_050);
    }
}
