use std::time::Duration;

/// The timer-like producers a workout runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// one-shot confirmation that the user held position
    Stability,
    /// once per second while counting down
    Countdown,
    /// fixed-interval duration tick while active
    WorkoutTick,
}

#[derive(Debug, Clone)]
struct Scheduled {
    kind: TimerKind,
    due: Duration,
    period: Option<Duration>,
}

/// Scheduled-event queue on a logical clock.
///
/// Time only moves through [`TimerQueue::advance`]; due timers are then
/// drained one at a time with [`TimerQueue::pop_due`] so a handler that
/// cancels or schedules timers is seen by the next pop. At most one timer of
/// each kind is pending.
#[derive(Debug, Clone, Default)]
pub struct TimerQueue {
    now: Duration,
    pending: Vec<Scheduled>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Schedule a one-shot timer, replacing any pending timer of that kind.
    pub fn schedule_once(&mut self, kind: TimerKind, after: Duration) {
        self.insert(Scheduled {
            kind,
            due: self.now + after,
            period: None,
        });
    }

    /// Schedule a repeating timer whose first firing is one period from now.
    pub fn schedule_repeating(&mut self, kind: TimerKind, period: Duration) {
        let period = period.max(Duration::from_millis(1));
        self.insert(Scheduled {
            kind,
            due: self.now + period,
            period: Some(period),
        });
    }

    fn insert(&mut self, timer: Scheduled) {
        self.cancel(timer.kind);
        self.pending.push(timer);
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        self.pending.retain(|t| t.kind != kind);
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn is_scheduled(&self, kind: TimerKind) -> bool {
        self.pending.iter().any(|t| t.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn advance(&mut self, dt: Duration) {
        self.now += dt;
    }

    /// Remove and return the earliest timer due at or before the clock.
    /// Repeating timers are re-armed one period after their due time.
    pub fn pop_due(&mut self) -> Option<TimerKind> {
        let (idx, _) = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= self.now)
            .min_by_key(|(_, t)| t.due)?;

        let timer = self.pending.remove(idx);
        if let Some(period) = timer.period {
            self.pending.push(Scheduled {
                kind: timer.kind,
                due: timer.due + period,
                period: Some(period),
            });
        }
        Some(timer.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS_100: Duration = Duration::from_millis(100);

    #[test]
    fn one_shot_fires_once_when_due() {
        let mut q = TimerQueue::new();
        q.schedule_once(TimerKind::Stability, Duration::from_secs(1));

        for _ in 0..9 {
            q.advance(MS_100);
            assert_eq!(q.pop_due(), None);
        }
        q.advance(MS_100);
        assert_eq!(q.pop_due(), Some(TimerKind::Stability));
        assert_eq!(q.pop_due(), None);
        assert!(q.is_empty());
    }

    #[test]
    fn repeating_timer_catches_up_after_a_long_advance() {
        let mut q = TimerQueue::new();
        q.schedule_repeating(TimerKind::WorkoutTick, MS_100);
        q.advance(Duration::from_millis(350));

        let mut fired = 0;
        while let Some(kind) = q.pop_due() {
            assert_eq!(kind, TimerKind::WorkoutTick);
            fired += 1;
        }
        assert_eq!(fired, 3);
        assert!(q.is_scheduled(TimerKind::WorkoutTick));
    }

    #[test]
    fn cancel_removes_pending_timer() {
        let mut q = TimerQueue::new();
        q.schedule_once(TimerKind::Stability, MS_100);
        q.cancel(TimerKind::Stability);
        q.advance(Duration::from_secs(5));
        assert_eq!(q.pop_due(), None);
    }

    #[test]
    fn rescheduling_replaces_previous_timer() {
        let mut q = TimerQueue::new();
        q.schedule_once(TimerKind::Stability, MS_100);
        q.schedule_once(TimerKind::Stability, Duration::from_secs(1));
        q.advance(Duration::from_millis(500));
        assert_eq!(q.pop_due(), None);
        q.advance(Duration::from_millis(500));
        assert_eq!(q.pop_due(), Some(TimerKind::Stability));
    }

    #[test]
    fn earliest_due_fires_first() {
        let mut q = TimerQueue::new();
        q.schedule_repeating(TimerKind::Countdown, Duration::from_secs(1));
        q.schedule_once(TimerKind::Stability, Duration::from_millis(300));
        q.advance(Duration::from_secs(1));
        assert_eq!(q.pop_due(), Some(TimerKind::Stability));
        assert_eq!(q.pop_due(), Some(TimerKind::Countdown));
    }

    #[test]
    fn cancel_all_clears_everything() {
        let mut q = TimerQueue::new();
        q.schedule_once(TimerKind::Stability, MS_100);
        q.schedule_repeating(TimerKind::Countdown, MS_100);
        q.schedule_repeating(TimerKind::WorkoutTick, MS_100);
        q.cancel_all();
        q.advance(Duration::from_secs(10));
        assert_eq!(q.pop_due(), None);
    }
}
