//! Delayed callbacks, keyed by tick
//!
//! Everything that happens "N seconds later" (reference capture, session
//! creation, the once-a-second countdown, smoosher timing) is a timer that
//! fires at the start of a tick. Scheduling an event that is already pending
//! replaces it. Session-scoped timers remember the session epoch they were
//! scheduled in; the caller checks that epoch right before firing each one,
//! since an earlier timer in the same batch may end the session.

use std::collections::BTreeMap;

use super::state::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerEvent {
    /// Enroll a one-shot reference capture
    CaptureReference,
    /// Build the game session
    CreateSession,
    /// Countdown step, re-armed every second while a session exists
    SessionSecond,
    /// Drop a smoosher trigger into the game queue
    SpawnSmoosher,
    /// Smoosher has held at its floor long enough
    ShrinkGrow { id: EntityId },
    /// Smoosher's active time is over
    ShrinkExpire { id: EntityId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    pub due: u64,
    pub event: TimerEvent,
    /// Session epoch the timer belongs to, `None` when it outlives sessions
    pub epoch: Option<u64>,
}

impl Timer {
    /// Scheduled in a session epoch other than `epoch`
    pub fn is_stale(&self, epoch: u64) -> bool {
        self.epoch.is_some_and(|e| e != epoch)
    }
}

#[derive(Debug, Default)]
pub struct TimerWheel {
    /// Keyed by (due tick, insertion order)
    pending: BTreeMap<(u64, u64), Timer>,
    next_seq: u64,
}

impl TimerWheel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire `event` at tick `due`, replacing a pending timer for the same event
    pub fn schedule(&mut self, due: u64, event: TimerEvent, epoch: Option<u64>) {
        if self.cancel(event) {
            log::trace!("{event:?} rescheduled for tick {due}");
        }
        self.pending.insert((due, self.next_seq), Timer { due, event, epoch });
        self.next_seq += 1;
    }

    /// Returns true if a pending timer was removed
    pub fn cancel(&mut self, event: TimerEvent) -> bool {
        let before = self.pending.len();
        self.pending.retain(|_, t| t.event != event);
        self.pending.len() != before
    }

    /// Due tick of the pending timer for `event`
    pub fn due_at(&self, event: TimerEvent) -> Option<u64> {
        self.pending
            .values()
            .find(|t| t.event == event)
            .map(|t| t.due)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Remove and return the oldest timer due at or before `tick`
    pub fn pop_next_due(&mut self, tick: u64) -> Option<Timer> {
        let entry = self.pending.first_entry()?;
        if entry.key().0 > tick {
            return None;
        }
        Some(entry.remove())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pop_due(wheel: &mut TimerWheel, tick: u64) -> Vec<Timer> {
        std::iter::from_fn(|| wheel.pop_next_due(tick)).collect()
    }

    fn events(timers: Vec<Timer>) -> Vec<TimerEvent> {
        timers.into_iter().map(|t| t.event).collect()
    }

    #[test]
    fn test_fires_in_due_order() {
        let mut wheel = TimerWheel::new();
        wheel.schedule(10, TimerEvent::CreateSession, None);
        wheel.schedule(5, TimerEvent::CaptureReference, None);
        wheel.schedule(10, TimerEvent::SessionSecond, Some(0));

        assert!(pop_due(&mut wheel, 4).is_empty());
        assert_eq!(events(pop_due(&mut wheel, 5)), vec![TimerEvent::CaptureReference]);
        assert_eq!(
            events(pop_due(&mut wheel, 12)),
            vec![TimerEvent::CreateSession, TimerEvent::SessionSecond]
        );
        assert!(wheel.is_empty());
    }

    #[test]
    fn test_reschedule_supersedes() {
        let mut wheel = TimerWheel::new();
        wheel.schedule(30, TimerEvent::CaptureReference, None);
        wheel.schedule(60, TimerEvent::CaptureReference, None);
        assert_eq!(wheel.len(), 1);
        assert_eq!(wheel.due_at(TimerEvent::CaptureReference), Some(60));
        assert!(pop_due(&mut wheel, 30).is_empty());
        assert_eq!(events(pop_due(&mut wheel, 60)), vec![TimerEvent::CaptureReference]);
    }

    #[test]
    fn test_distinct_targets_do_not_supersede() {
        let mut wheel = TimerWheel::new();
        wheel.schedule(3, TimerEvent::ShrinkGrow { id: 1 }, Some(0));
        wheel.schedule(4, TimerEvent::ShrinkGrow { id: 2 }, Some(0));
        assert_eq!(wheel.len(), 2);
        assert!(wheel.cancel(TimerEvent::ShrinkGrow { id: 1 }));
        assert!(!wheel.cancel(TimerEvent::ShrinkGrow { id: 1 }));
        assert_eq!(wheel.len(), 1);
    }

    #[test]
    fn test_stale_epoch() {
        let mut wheel = TimerWheel::new();
        wheel.schedule(3, TimerEvent::ShrinkExpire { id: 9 }, Some(1));
        wheel.schedule(3, TimerEvent::CaptureReference, None);
        let due = pop_due(&mut wheel, 3);
        assert!(due[0].is_stale(2));
        assert!(!due[0].is_stale(1));
        assert!(!due[1].is_stale(2));
        assert!(wheel.is_empty());
    }

    #[test]
    fn test_pop_next_due_one_at_a_time() {
        let mut wheel = TimerWheel::new();
        wheel.schedule(5, TimerEvent::SessionSecond, None);
        wheel.schedule(5, TimerEvent::SpawnSmoosher, Some(0));
        wheel.schedule(9, TimerEvent::CaptureReference, None);

        assert!(wheel.pop_next_due(4).is_none());
        assert_eq!(wheel.pop_next_due(5).map(|t| t.event), Some(TimerEvent::SessionSecond));
        // Cancelling between pops stops the rest of the batch from firing
        assert!(wheel.cancel(TimerEvent::SpawnSmoosher));
        assert!(wheel.pop_next_due(5).is_none());
        assert_eq!(wheel.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_pop_due_never_returns_future(dues in prop::collection::vec(0u64..100, 1..20), now in 0u64..100) {
            let mut wheel = TimerWheel::new();
            for (i, &due) in dues.iter().enumerate() {
                wheel.schedule(due, TimerEvent::ShrinkGrow { id: i as EntityId }, None);
            }
            let fired = pop_due(&mut wheel, now);
            prop_assert_eq!(fired.len(), dues.iter().filter(|&&d| d <= now).count());
            prop_assert_eq!(wheel.len(), dues.iter().filter(|&&d| d > now).count());
        }
    }
}
