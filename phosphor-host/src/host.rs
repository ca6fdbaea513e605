//! Host wait loop
//!
//! Owns the scheduler and drives two kinds of work off it: the display's
//! periodic power poll, registered as a plain timer, and widget refreshes,
//! registered through the timer-group layer so widgets sharing a cadence
//! refresh back-to-back on one wakeup.
//!
//! Between passes the loop sleeps until the nearest deadline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};
use phosphor_core::scheduler::{
    GroupError, GroupTask, Grouped, Slot, TaskError, TimerError, TimerGroups, TimerId, Timers,
};
use phosphor_core::traits::{PowerSense, TextDisplay};
use phosphor_hal::Clock;

/// What a host timer does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostTask {
    /// Re-read the display's power-present line
    PowerCheck,
    /// Refresh the widget whose index is the timer data
    Widget,
}

/// Scheduler identity of the power poll
pub const POWER_CHECK: TimerId<Slot<HostTask>> = TimerId::new(Slot::Task(HostTask::PowerCheck), 0);

/// Renders widgets onto a display
pub trait WidgetSet<V> {
    /// Redraw widget `index`
    fn refresh(&mut self, index: u32, display: &mut V) -> Result<(), TaskError>;
}

impl<V, F> WidgetSet<V> for F
where
    F: FnMut(u32, &mut V) -> Result<(), TaskError>,
{
    fn refresh(&mut self, index: u32, display: &mut V) -> Result<(), TaskError> {
        self(index, display)
    }
}

/// Display and widgets, handed to the scheduler as its task set
struct Dispatch<V, W> {
    display: V,
    widgets: W,
}

impl<V, W> GroupTask<HostTask> for Dispatch<V, W>
where
    V: TextDisplay + PowerSense,
    W: WidgetSet<V>,
{
    fn run(
        &mut self,
        id: TimerId<HostTask>,
        _groups: &mut TimerGroups<HostTask>,
        _timers: &mut Timers<Slot<HostTask>>,
    ) -> Result<(), TaskError> {
        match id.task {
            HostTask::PowerCheck => {
                self.display.poll_power();
                Ok(())
            }
            HostTask::Widget => self.widgets.refresh(id.data, &mut self.display),
        }
    }
}

/// Scheduler, display and widgets in one place
pub struct DisplayHost<V, W> {
    timers: Timers<Slot<HostTask>>,
    tasks: Grouped<HostTask, Dispatch<V, W>>,
}

impl<V, W> DisplayHost<V, W>
where
    V: TextDisplay + PowerSense,
    W: WidgetSet<V>,
{
    pub fn new(display: V, widgets: W) -> Self {
        Self {
            timers: Timers::new(),
            tasks: Grouped::new(Dispatch { display, widgets }),
        }
    }

    /// Start polling the display's power
    pub fn attach(&mut self, now_ms: u64) -> Result<(), TimerError> {
        debug!("power poll every {} ms", V::POLL_INTERVAL_MS);
        self.timers
            .add(POWER_CHECK, V::POLL_INTERVAL_MS, false, now_ms)
    }

    /// Refresh widget `index` every `interval_ms` (once, if `one_shot`)
    ///
    /// Registering a widget again moves it to the new cadence.
    pub fn add_widget(
        &mut self,
        index: u32,
        interval_ms: u32,
        one_shot: bool,
        now_ms: u64,
    ) -> Result<(), GroupError> {
        self.tasks.groups.add_widget(
            &mut self.timers,
            Self::widget(index),
            interval_ms,
            one_shot,
            now_ms,
        )
    }

    /// Stop refreshing widget `index`
    pub fn remove_widget(&mut self, index: u32) -> Result<(), GroupError> {
        self.tasks
            .groups
            .remove_widget(&mut self.timers, Self::widget(index))
    }

    /// Run one scheduler pass
    ///
    /// Returns the delay until the next deadline, `None` once no timer is
    /// left.
    pub fn step(&mut self, now_ms: u64) -> Option<i64> {
        self.timers.process(now_ms, &mut self.tasks)
    }

    /// Loop until `keep_running` is cleared or nothing is scheduled
    pub fn run<C: Clock>(&mut self, clock: &C, keep_running: &AtomicBool) {
        info!("host loop started");
        while keep_running.load(Ordering::Relaxed) {
            let Some(delay) = self.step(clock.now_ms()) else {
                info!("no timers left");
                break;
            };
            if delay > 0 {
                thread::sleep(Duration::from_millis(delay as u64));
            }
        }

        let failures = self.timers.failures();
        if failures > 0 {
            warn!("{} task failure(s) while running", failures);
        }
        info!("host loop stopped");
    }

    /// Stop everything and give back the display and widgets
    pub fn shutdown(mut self) -> (V, W) {
        self.timers.remove(POWER_CHECK);
        self.tasks.groups.clear(&mut self.timers);
        self.timers.clear();

        let Dispatch { display, widgets } = self.tasks.tasks;
        (display, widgets)
    }

    pub fn display(&self) -> &V {
        &self.tasks.tasks.display
    }

    pub fn display_mut(&mut self) -> &mut V {
        &mut self.tasks.tasks.display
    }

    pub fn widgets(&self) -> &W {
        &self.tasks.tasks.widgets
    }

    /// Number of live scheduler entries (poll plus one per cadence)
    pub fn wakeups(&self) -> usize {
        self.timers.active_count()
    }

    /// Task failures caught so far
    pub fn failures(&self) -> u32 {
        self.timers.failures()
    }

    fn widget(index: u32) -> TimerId<HostTask> {
        TimerId::new(HostTask::Widget, index)
    }
}
