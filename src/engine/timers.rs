use std::collections::HashMap;

use tokio::time::Instant;

/// Every deferred job the orchestrator can have pending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerKind {
    /// Re-synchronize after a burst of host mutations has gone quiet
    Debounce,
    /// Periodic sweep for structural elements the subscription missed
    Rescan,
    /// Full undo-then-reapply once a client-side navigation has settled
    NavigationSettle,
    CounterIncrement,
    /// Poll whether the tracked modal is still visible
    CrashWatchdog,
}

/// At most one pending deadline per [`TimerKind`].
///
/// Scheduling a kind that is already pending moves its deadline, which is exactly what the
/// debounce needs.
#[derive(Debug, Default)]
pub struct TimerQueue {
    deadlines: HashMap<TimerKind, Instant>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, kind: TimerKind, at: Instant) {
        self.deadlines.insert(kind, at);
    }

    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        self.deadlines.remove(&kind).is_some()
    }

    pub fn cancel_all(&mut self) {
        self.deadlines.clear();
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.deadlines.contains_key(&kind)
    }

    pub fn deadline(&self, kind: TimerKind) -> Option<Instant> {
        self.deadlines.get(&kind).copied()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    /// Remove and return every timer due at `now`, earliest first
    pub fn take_due(&mut self, now: Instant) -> Vec<TimerKind> {
        let mut due: Vec<(Instant, TimerKind)> = self
            .deadlines
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(&kind, &at)| (at, kind))
            .collect();
        due.sort();
        for (_, kind) in &due {
            self.deadlines.remove(kind);
        }
        due.into_iter().map(|(_, kind)| kind).collect()
    }

    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_reschedule_moves_deadline() {
        let start = Instant::now();
        let mut timers = TimerQueue::new();
        timers.schedule(TimerKind::Debounce, start + Duration::from_millis(100));
        timers.schedule(TimerKind::Debounce, start + Duration::from_millis(180));
        assert_eq!(timers.len(), 1);

        assert!(timers.take_due(start + Duration::from_millis(150)).is_empty());
        assert_eq!(
            timers.take_due(start + Duration::from_millis(180)),
            vec![TimerKind::Debounce]
        );
        assert!(timers.is_empty());
    }

    #[test]
    fn test_due_timers_fire_in_deadline_order() {
        let start = Instant::now();
        let mut timers = TimerQueue::new();
        timers.schedule(TimerKind::Rescan, start + Duration::from_millis(1000));
        timers.schedule(TimerKind::Debounce, start + Duration::from_millis(100));
        timers.schedule(TimerKind::NavigationSettle, start + Duration::from_millis(500));

        assert_eq!(timers.next_deadline(), Some(start + Duration::from_millis(100)));
        let due = timers.take_due(start + Duration::from_millis(1000));
        assert_eq!(
            due,
            vec![TimerKind::Debounce, TimerKind::NavigationSettle, TimerKind::Rescan]
        );
    }

    #[test]
    fn test_cancel_all() {
        let start = Instant::now();
        let mut timers = TimerQueue::new();
        timers.schedule(TimerKind::CounterIncrement, start);
        timers.schedule(TimerKind::CrashWatchdog, start);
        assert!(timers.cancel(TimerKind::CrashWatchdog));
        assert!(!timers.cancel(TimerKind::CrashWatchdog));
        timers.cancel_all();
        assert_eq!(timers.next_deadline(), None);
        assert!(timers.take_due(start).is_empty());
    }
}
