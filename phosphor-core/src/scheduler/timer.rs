//! Cooperative timer scheduler
//!
//! Keeps a fixed table of periodic and one-shot timers. The host loop calls
//! [`Timers::process`] once per iteration; every due timer's task runs
//! inline, and the returned delay tells the host how long it may sleep
//! before the next deadline.
//!
//! Timers are identified by a [`TimerId`], a (task, data) pair. Adding an
//! identity that is already present updates that entry instead of creating
//! a second one.

use heapless::Vec;

/// Maximum timers in the table
pub const MAX_TIMERS: usize = 32;

/// Timer identity
///
/// `task` names what runs, `data` distinguishes instances of the same task
/// (a widget index, a port number).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerId<T> {
    pub task: T,
    pub data: u32,
}

impl<T> TimerId<T> {
    pub const fn new(task: T, data: u32) -> Self {
        Self { task, data }
    }
}

/// One table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timer<T> {
    /// Identity
    pub id: TimerId<T>,
    /// Period in milliseconds
    pub interval_ms: u32,
    /// Deactivate after the first firing
    pub one_shot: bool,
    /// Next firing time (monotonic ms)
    pub deadline_ms: u64,
    /// Inactive entries are skipped and reclaimed on the next pass
    pub active: bool,
}

impl<T> Timer<T> {
    /// Deadline following the one just served at `now_ms`
    ///
    /// Advances from the previous deadline, not from `now_ms`, so late
    /// processing does not accumulate drift. Ticks missed entirely are
    /// skipped rather than fired in a burst.
    fn next_deadline(&self, now_ms: u64) -> u64 {
        if self.interval_ms == 0 {
            return now_ms;
        }

        let interval = self.interval_ms as u64;
        let next = self.deadline_ms + interval;
        if next > now_ms {
            return next;
        }

        let missed = (now_ms - self.deadline_ms) / interval;
        self.deadline_ms + (missed + 1) * interval
    }
}

/// Timer table errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerError {
    /// No free entry
    Full,
}

/// Failure reported by a scheduled task
///
/// Caught at the scheduler boundary: logged, counted, and the pass goes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskError {
    pub reason: &'static str,
}

impl TaskError {
    pub const fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// Work run when a timer fires
///
/// The task gets the scheduler itself so it can add or remove timers,
/// including its own. Such changes take effect from the next pass.
pub trait TimerTask<T> {
    fn run(&mut self, id: TimerId<T>, timers: &mut Timers<T>) -> Result<(), TaskError>;
}

impl<T, F> TimerTask<T> for F
where
    F: FnMut(TimerId<T>, &mut Timers<T>) -> Result<(), TaskError>,
{
    fn run(&mut self, id: TimerId<T>, timers: &mut Timers<T>) -> Result<(), TaskError> {
        self(id, timers)
    }
}

/// Timer table
#[derive(Debug)]
pub struct Timers<T> {
    timers: Vec<Timer<T>, MAX_TIMERS>,
    /// Set while a pass is running; entries must not move
    processing: bool,
    /// Time of the current (or last) pass
    pass_ms: u64,
    /// Task failures since creation
    failures: u32,
}

impl<T> Default for Timers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Timers<T> {
    /// Create an empty table
    pub const fn new() -> Self {
        Self {
            timers: Vec::new(),
            processing: false,
            pass_ms: 0,
            failures: 0,
        }
    }

    /// Number of active timers
    pub fn active_count(&self) -> usize {
        self.timers.iter().filter(|t| t.active).count()
    }

    /// Task failures caught so far
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Time passed to the current or most recent [`Timers::process`]
    pub fn pass_ms(&self) -> u64 {
        self.pass_ms
    }

    /// Drop every timer
    pub fn clear(&mut self) {
        self.timers.clear();
    }

    /// Time until the nearest active deadline
    ///
    /// Zero or negative means a timer is already due. `None` if no timer
    /// is active.
    pub fn next_delay(&self, now_ms: u64) -> Option<i64> {
        self.timers
            .iter()
            .filter(|t| t.active)
            .map(|t| t.deadline_ms as i64 - now_ms as i64)
            .min()
    }

    /// Reclaim inactive entries, keeping insertion order
    fn compact(&mut self) {
        self.timers.retain(|t| t.active);
    }
}

impl<T: Copy + Eq> Timers<T> {
    /// Add a timer, or update the entry that already has this identity
    ///
    /// The first firing is `interval_ms` after `now_ms`.
    pub fn add(
        &mut self,
        id: TimerId<T>,
        interval_ms: u32,
        one_shot: bool,
        now_ms: u64,
    ) -> Result<(), TimerError> {
        let deadline_ms = now_ms + interval_ms as u64;

        if let Some(timer) = self.timers.iter_mut().find(|t| t.id == id) {
            timer.interval_ms = interval_ms;
            timer.one_shot = one_shot;
            timer.deadline_ms = deadline_ms;
            timer.active = true;
            return Ok(());
        }

        if self.timers.is_full() && !self.processing {
            self.compact();
        }

        self.timers
            .push(Timer {
                id,
                interval_ms,
                one_shot,
                deadline_ms,
                active: true,
            })
            .map_err(|_| TimerError::Full)
    }

    /// Add a timer that fires after its same-interval peers
    ///
    /// The deadline is aligned to the latest deadline among active timers
    /// with the same interval, and the entry is placed after them in firing
    /// order, so it runs in the same pass once they are done. With no such
    /// peer this behaves like [`Timers::add`]. An existing entry with this
    /// identity is moved to the end of the table, except during a pass,
    /// where it is updated in place.
    pub fn add_late(
        &mut self,
        id: TimerId<T>,
        interval_ms: u32,
        one_shot: bool,
        now_ms: u64,
    ) -> Result<(), TimerError> {
        let aligned = self
            .timers
            .iter()
            .filter(|t| t.active && t.id != id && t.interval_ms == interval_ms)
            .map(|t| t.deadline_ms)
            .max();

        if !self.processing {
            if let Some(index) = self.timers.iter().position(|t| t.id == id) {
                self.timers.remove(index);
            }
        }
        self.add(id, interval_ms, one_shot, now_ms)?;

        if let Some(deadline_ms) = aligned {
            if let Some(timer) = self.timers.iter_mut().find(|t| t.id == id) {
                timer.deadline_ms = deadline_ms;
            }
        }
        Ok(())
    }

    /// Deactivate a timer
    ///
    /// Safe to call from inside the timer's own task: the running call
    /// completes and the timer is not fired again. Returns whether an
    /// active timer was found.
    pub fn remove(&mut self, id: TimerId<T>) -> bool {
        match self.timers.iter_mut().find(|t| t.active && t.id == id) {
            Some(timer) => {
                timer.active = false;
                true
            }
            None => false,
        }
    }

    /// Check whether a timer is active
    pub fn is_active(&self, id: TimerId<T>) -> bool {
        self.timers.iter().any(|t| t.active && t.id == id)
    }

    /// Look up an active timer
    pub fn get(&self, id: TimerId<T>) -> Option<&Timer<T>> {
        self.timers.iter().find(|t| t.active && t.id == id)
    }

    /// Run every due timer
    ///
    /// Due timers fire in insertion order. Repeating timers are rescheduled
    /// and one-shot timers deactivated before their task runs. A failing
    /// task is logged and does not stop the pass.
    ///
    /// Returns the delay until the next deadline (see [`Timers::next_delay`]).
    pub fn process<R>(&mut self, now_ms: u64, tasks: &mut R) -> Option<i64>
    where
        R: TimerTask<T> + ?Sized,
    {
        self.compact();
        self.processing = true;
        self.pass_ms = now_ms;

        // Entries added by tasks during this pass wait for the next one
        let count = self.timers.len();
        for index in 0..count {
            let Some(timer) = self.timers.get_mut(index) else {
                break;
            };
            if !timer.active || timer.deadline_ms > now_ms {
                continue;
            }

            if timer.one_shot {
                timer.active = false;
            } else {
                timer.deadline_ms = timer.next_deadline(now_ms);
            }
            let id = timer.id;

            if let Err(e) = tasks.run(id, self) {
                self.failures = self.failures.wrapping_add(1);
                warn!("timer task failed: {}", e.reason);
            }
        }

        self.processing = false;
        self.next_delay(now_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Task {
        Poll,
        Blink,
        Scroll,
    }

    const POLL: TimerId<Task> = TimerId::new(Task::Poll, 0);
    const BLINK: TimerId<Task> = TimerId::new(Task::Blink, 0);
    const SCROLL: TimerId<Task> = TimerId::new(Task::Scroll, 7);

    /// Records every firing
    struct Recorder {
        fired: Vec<TimerId<Task>, 64>,
    }

    impl Recorder {
        fn new() -> Self {
            Self { fired: Vec::new() }
        }
    }

    impl TimerTask<Task> for Recorder {
        fn run(&mut self, id: TimerId<Task>, _timers: &mut Timers<Task>) -> Result<(), TaskError> {
            let _ = self.fired.push(id);
            Ok(())
        }
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut timers = Timers::new();
        for _ in 0..5 {
            timers.add(POLL, 100, false, 0).unwrap();
        }
        assert_eq!(timers.active_count(), 1);

        // Same identity, different settings: updated in place
        timers.add(POLL, 250, true, 10).unwrap();
        assert_eq!(timers.active_count(), 1);
        let timer = timers.get(POLL).unwrap();
        assert_eq!(timer.interval_ms, 250);
        assert!(timer.one_shot);
        assert_eq!(timer.deadline_ms, 260);
    }

    #[test]
    fn test_data_distinguishes_identity() {
        let mut timers = Timers::new();
        timers.add(TimerId::new(Task::Scroll, 1), 100, false, 0).unwrap();
        timers.add(TimerId::new(Task::Scroll, 2), 100, false, 0).unwrap();
        assert_eq!(timers.active_count(), 2);
    }

    #[test]
    fn test_no_drift_with_irregular_processing() {
        let t0 = 1_000;
        let mut timers = Timers::new();
        let mut rec = Recorder::new();
        timers.add(POLL, 100, false, t0).unwrap();

        let mut served = [0u64; 3];
        for (i, now) in [t0 + 100, t0 + 205, t0 + 310].into_iter().enumerate() {
            served[i] = timers.get(POLL).unwrap().deadline_ms;
            timers.process(now, &mut rec);
        }

        assert_eq!(served, [t0 + 100, t0 + 200, t0 + 300]);
        assert_eq!(rec.fired.len(), 3);
        assert_eq!(timers.get(POLL).unwrap().deadline_ms, t0 + 400);
    }

    #[test]
    fn test_late_pass_skips_missed_ticks() {
        let mut timers = Timers::new();
        let mut rec = Recorder::new();
        timers.add(POLL, 100, false, 0).unwrap();

        // Three deadlines (100, 200, 300) elapsed: fire once, stay on grid
        let delay = timers.process(350, &mut rec);
        assert_eq!(rec.fired.len(), 1);
        assert_eq!(timers.get(POLL).unwrap().deadline_ms, 400);
        assert_eq!(delay, Some(50));
    }

    #[test]
    fn test_not_due_does_not_fire() {
        let mut timers = Timers::new();
        let mut rec = Recorder::new();
        timers.add(POLL, 100, false, 0).unwrap();

        let delay = timers.process(99, &mut rec);
        assert!(rec.fired.is_empty());
        assert_eq!(delay, Some(1));
    }

    #[test]
    fn test_one_shot_fires_once() {
        let mut timers = Timers::new();
        let mut rec = Recorder::new();
        timers.add(BLINK, 50, true, 0).unwrap();

        assert_eq!(timers.process(50, &mut rec), None);
        timers.process(100, &mut rec);
        timers.process(150, &mut rec);

        assert_eq!(rec.fired.as_slice(), &[BLINK]);
        assert!(!timers.is_active(BLINK));
    }

    #[test]
    fn test_fires_in_insertion_order() {
        let mut timers = Timers::new();
        let mut rec = Recorder::new();
        timers.add(SCROLL, 30, false, 0).unwrap();
        timers.add(POLL, 10, false, 0).unwrap();
        timers.add(BLINK, 20, false, 0).unwrap();

        timers.process(30, &mut rec);
        assert_eq!(rec.fired.as_slice(), &[SCROLL, POLL, BLINK]);
    }

    #[test]
    fn test_remove_from_own_task() {
        let mut timers = Timers::new();
        timers.add(POLL, 100, false, 0).unwrap();
        timers.add(BLINK, 100, false, 0).unwrap();

        let mut calls = 0;
        let mut task = |id: TimerId<Task>, timers: &mut Timers<Task>| -> Result<(), TaskError> {
            calls += 1;
            if id == POLL {
                assert!(timers.remove(POLL));
            }
            Ok(())
        };

        timers.process(100, &mut task);
        assert!(!timers.is_active(POLL));
        assert!(timers.is_active(BLINK));

        timers.process(200, &mut task);
        assert_eq!(calls, 3);
        assert_eq!(timers.active_count(), 1);
    }

    #[test]
    fn test_one_shot_can_rearm_itself() {
        let mut timers = Timers::new();
        let mut task = |id: TimerId<Task>, timers: &mut Timers<Task>| -> Result<(), TaskError> {
            timers.add(id, 40, true, timers.pass_ms()).map_err(|_| TaskError::new("full"))
        };
        timers.add(BLINK, 40, true, 0).unwrap();

        assert_eq!(timers.process(40, &mut task), Some(40));
        assert_eq!(timers.get(BLINK).unwrap().deadline_ms, 80);
    }

    #[test]
    fn test_failing_task_does_not_abort_pass() {
        let mut timers = Timers::new();
        timers.add(POLL, 10, false, 0).unwrap();
        timers.add(BLINK, 10, false, 0).unwrap();

        let mut ran: Vec<TimerId<Task>, 8> = Vec::new();
        let mut task = |id: TimerId<Task>, _: &mut Timers<Task>| -> Result<(), TaskError> {
            let _ = ran.push(id);
            if id == POLL {
                Err(TaskError::new("port gone"))
            } else {
                Ok(())
            }
        };

        timers.process(10, &mut task);
        assert_eq!(ran.as_slice(), &[POLL, BLINK]);
        assert_eq!(timers.failures(), 1);
        assert!(timers.is_active(POLL));
    }

    #[test]
    fn test_empty_table_has_no_delay() {
        let mut timers: Timers<Task> = Timers::new();
        let mut rec = Recorder::new();
        assert_eq!(timers.process(0, &mut rec), None);
    }

    #[test]
    fn test_overdue_delay_is_negative() {
        let mut timers = Timers::new();
        timers.add(POLL, 100, false, 0).unwrap();
        assert_eq!(timers.next_delay(130), Some(-30));
    }

    #[test]
    fn test_full_table_reclaims_inactive_entries() {
        let mut timers = Timers::new();
        for i in 0..MAX_TIMERS as u32 {
            timers.add(TimerId::new(Task::Scroll, i), 100, false, 0).unwrap();
        }
        assert_eq!(
            timers.add(TimerId::new(Task::Scroll, 99), 100, false, 0),
            Err(TimerError::Full)
        );

        assert!(timers.remove(TimerId::new(Task::Scroll, 3)));
        timers.add(TimerId::new(Task::Scroll, 99), 100, false, 0).unwrap();
        assert_eq!(timers.active_count(), MAX_TIMERS);
    }

    #[test]
    fn test_add_late_fires_after_peers() {
        let mut timers = Timers::new();
        let mut rec = Recorder::new();
        timers.add(POLL, 100, false, 0).unwrap();
        timers.add_late(SCROLL, 100, false, 40).unwrap();
        timers.add(BLINK, 100, false, 20).unwrap();

        // Aligned to POLL's phase, not 40 + 100
        assert_eq!(timers.get(SCROLL).unwrap().deadline_ms, 100);

        timers.process(120, &mut rec);
        assert_eq!(rec.fired.as_slice(), &[POLL, SCROLL, BLINK]);

        // Re-adding late moves it behind BLINK
        timers.add_late(SCROLL, 100, false, 120).unwrap();
        assert_eq!(timers.get(SCROLL).unwrap().deadline_ms, 220);
        timers.process(220, &mut rec);
        assert_eq!(&rec.fired[3..], &[POLL, BLINK, SCROLL]);
        assert_eq!(timers.active_count(), 3);
    }

    #[test]
    fn test_add_late_without_peers() {
        let mut timers = Timers::new();
        timers.add(POLL, 50, false, 0).unwrap();
        timers.add_late(BLINK, 100, true, 10).unwrap();
        assert_eq!(timers.get(BLINK).unwrap().deadline_ms, 110);
    }

    #[test]
    fn test_clear() {
        let mut timers = Timers::new();
        timers.add(POLL, 100, false, 0).unwrap();
        timers.clear();
        assert_eq!(timers.active_count(), 0);
        assert_eq!(timers.next_delay(0), None);
    }

    proptest! {
        #[test]
        fn prop_repeated_add_keeps_one_timer(
            repeats in 1usize..20,
            interval in 0u32..10_000,
            now in 0u64..1_000_000,
        ) {
            let mut timers = Timers::new();
            for i in 0..repeats {
                timers.add(POLL, interval, i % 2 == 0, now + i as u64).unwrap();
            }
            prop_assert_eq!(timers.active_count(), 1);
        }

        #[test]
        fn prop_deadlines_stay_on_grid(
            interval in 1u32..1_000,
            steps in proptest::collection::vec(0u64..3_000, 1..40),
        ) {
            let mut timers = Timers::new();
            let mut rec = Recorder::new();
            timers.add(POLL, interval, false, 0).unwrap();

            let mut now = 0;
            for step in steps {
                now += step;
                timers.process(now, &mut rec);
                let deadline = timers.get(POLL).unwrap().deadline_ms;
                prop_assert_eq!(deadline % interval as u64, 0);
                prop_assert!(deadline > now);
                prop_assert!(deadline <= now + interval as u64);
            }
        }
    }
}
