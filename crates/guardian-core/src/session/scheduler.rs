//! Timer scheduling for the session.
//!
//! Timers carry a [`TimerTask`] value instead of a callback.  When a timer is
//! due, the session pops it and runs the task against its own state, so no
//! timer ever holds a reference into the session.
//!
//! [`TimerQueue`] is a virtual clock: time only moves when the driver calls
//! [`Scheduler::advance_to`] (or pops a due timer).  The console binary feeds
//! it wall-clock readings; tests feed it exact values.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::domain::alert::{duration_to_millis, AlertId};
use crate::domain::Millis;
use crate::session::connection::ConnectionId;

/// Handle returned by [`Scheduler::schedule`], used to cancel the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// What to do when a timer fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerTask {
    /// Reopen the transport after `connection` was lost.
    Reconnect { connection: ConnectionId },
    /// Remove an alert whose TTL elapsed.
    AlertExpiry(AlertId),
    /// Issue the next backend poll of `PollTarget`.
    Poll(PollTarget),
}

/// Backend resources polled on an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollTarget {
    StatsSummary,
    Agents,
    RecentIncidents,
}

/// The timer capability the session is built on.
pub trait Scheduler {
    /// Current reading of the scheduler's clock.
    fn now(&self) -> Millis;

    /// Arms a one-shot timer that fires `delay` after [`now`](Self::now).
    fn schedule(&mut self, delay: Duration, task: TimerTask) -> TimerHandle;

    /// Disarms a timer.  Returns `false` if it already fired or was cancelled.
    fn cancel(&mut self, handle: TimerHandle) -> bool;

    /// Number of armed timers.
    fn pending(&self) -> usize;

    /// Deadline of the earliest armed timer.
    fn next_deadline(&self) -> Option<Millis>;

    /// Removes and returns the earliest timer whose deadline is `<= until`.
    ///
    /// The clock moves forward to that timer's deadline, so tasks scheduled
    /// while running it are measured from the moment it fired.
    fn pop_due(&mut self, until: Millis) -> Option<(TimerHandle, TimerTask)>;

    /// Moves the clock forward to `now`.  Never moves it backwards.
    fn advance_to(&mut self, now: Millis);
}

/// Deterministic in-memory [`Scheduler`].
///
/// Timers with equal deadlines fire in the order they were scheduled.
#[derive(Debug, Default)]
pub struct TimerQueue {
    now: Millis,
    next_id: u64,
    queue: BTreeMap<(Millis, u64), TimerTask>,
    deadlines: HashMap<TimerHandle, Millis>,
}

impl TimerQueue {
    /// A queue whose clock reads zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// A queue whose clock starts at `now`.
    pub fn starting_at(now: Millis) -> Self {
        Self {
            now,
            ..Self::default()
        }
    }
}

impl Scheduler for TimerQueue {
    fn now(&self) -> Millis {
        self.now
    }

    fn schedule(&mut self, delay: Duration, task: TimerTask) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        let deadline = self.now.saturating_add(duration_to_millis(delay));
        self.queue.insert((deadline, handle.0), task);
        self.deadlines.insert(handle, deadline);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.deadlines.remove(&handle) {
            Some(deadline) => self.queue.remove(&(deadline, handle.0)).is_some(),
            None => false,
        }
    }

    fn pending(&self) -> usize {
        self.queue.len()
    }

    fn next_deadline(&self) -> Option<Millis> {
        self.queue.keys().next().map(|(deadline, _)| *deadline)
    }

    fn pop_due(&mut self, until: Millis) -> Option<(TimerHandle, TimerTask)> {
        let (&(deadline, id), _) = self.queue.iter().next()?;
        if deadline > until {
            return None;
        }
        let task = self.queue.remove(&(deadline, id))?;
        let handle = TimerHandle(id);
        self.deadlines.remove(&handle);
        self.now = self.now.max(deadline);
        Some((handle, task))
    }

    fn advance_to(&mut self, now: Millis) {
        self.now = self.now.max(now);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn expiry(n: u64) -> TimerTask {
        TimerTask::AlertExpiry(AlertId::new(n))
    }

    #[test]
    fn test_pop_due_returns_timers_in_deadline_order() {
        // Arrange
        let mut timers = TimerQueue::new();
        timers.schedule(Duration::from_millis(300), expiry(3));
        timers.schedule(Duration::from_millis(100), expiry(1));
        timers.schedule(Duration::from_millis(200), expiry(2));

        // Act
        let mut fired = Vec::new();
        while let Some((_, task)) = timers.pop_due(1_000) {
            fired.push(task);
        }

        // Assert
        assert_eq!(fired, vec![expiry(1), expiry(2), expiry(3)]);
        assert_eq!(timers.now(), 300);
    }

    #[test]
    fn test_equal_deadlines_fire_in_scheduling_order() {
        let mut timers = TimerQueue::new();
        timers.schedule(Duration::from_millis(50), expiry(1));
        timers.schedule(Duration::from_millis(50), expiry(2));

        assert_eq!(timers.pop_due(50).map(|(_, t)| t), Some(expiry(1)));
        assert_eq!(timers.pop_due(50).map(|(_, t)| t), Some(expiry(2)));
    }

    #[test]
    fn test_timer_not_due_before_deadline() {
        let mut timers = TimerQueue::starting_at(1_000);
        timers.schedule(Duration::from_millis(10_000), expiry(1));

        assert!(timers.pop_due(10_999).is_none());
        assert_eq!(timers.next_deadline(), Some(11_000));
        assert!(timers.pop_due(11_000).is_some());
    }

    #[test]
    fn test_cancel_disarms_once() {
        // Arrange
        let mut timers = TimerQueue::new();
        let handle = timers.schedule(Duration::from_millis(10), expiry(1));

        // Act / Assert
        assert!(timers.cancel(handle));
        assert!(!timers.cancel(handle));
        assert_eq!(timers.pending(), 0);
        assert!(timers.pop_due(Millis::MAX).is_none());
    }

    #[test]
    fn test_cancel_after_fire_returns_false() {
        let mut timers = TimerQueue::new();
        let handle = timers.schedule(Duration::ZERO, expiry(1));
        assert!(timers.pop_due(0).is_some());
        assert!(!timers.cancel(handle));
    }

    #[test]
    fn test_clock_never_moves_backwards() {
        let mut timers = TimerQueue::starting_at(500);
        timers.advance_to(100);
        assert_eq!(timers.now(), 500);
        timers.advance_to(900);
        assert_eq!(timers.now(), 900);
    }
}
