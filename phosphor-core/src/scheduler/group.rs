//! Timer groups
//!
//! Widgets that refresh at the same cadence are merged into a single
//! scheduler entry. When that entry fires, every member runs back-to-back
//! in registration order, so same-cadence widgets update together and the
//! host wakes once per distinct cadence instead of once per widget.
//!
//! Membership changes requested while a group is iterating (typically by
//! a member's own task) are queued and applied once the iteration is done.

use heapless::Vec;

use super::timer::{TaskError, TimerError, TimerId, TimerTask, Timers};

/// Maximum distinct cadences
pub const MAX_GROUPS: usize = 8;

/// Maximum members per group
pub const MAX_GROUP_MEMBERS: usize = 16;

/// Maximum membership changes queued during one iteration
pub const MAX_PENDING: usize = 8;

/// Group signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Cadence {
    pub interval_ms: u32,
    pub one_shot: bool,
}

impl Cadence {
    pub const fn new(interval_ms: u32, one_shot: bool) -> Self {
        Self {
            interval_ms,
            one_shot,
        }
    }
}

/// Scheduler-level task: either a plain task or a whole group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Slot<T> {
    Task(T),
    Group(Cadence),
}

/// Group table errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GroupError {
    /// No room for another cadence
    TooManyGroups,
    /// Group already has [`MAX_GROUP_MEMBERS`] members
    GroupFull,
    /// Too many changes queued during one iteration
    Backlog,
    /// Scheduler table is full
    Timer(TimerError),
}

impl From<TimerError> for GroupError {
    fn from(e: TimerError) -> Self {
        GroupError::Timer(e)
    }
}

/// Work run for one group member
pub trait GroupTask<T> {
    fn run(
        &mut self,
        id: TimerId<T>,
        groups: &mut TimerGroups<T>,
        timers: &mut Timers<Slot<T>>,
    ) -> Result<(), TaskError>;
}

#[derive(Debug, Clone)]
struct Group<T> {
    cadence: Cadence,
    members: Vec<TimerId<T>, MAX_GROUP_MEMBERS>,
}

#[derive(Debug, Clone, Copy)]
enum Pending<T> {
    Add(TimerId<T>, Cadence),
    Remove(TimerId<T>),
}

/// Group table
#[derive(Debug)]
pub struct TimerGroups<T> {
    groups: Vec<Group<T>, MAX_GROUPS>,
    pending: Vec<Pending<T>, MAX_PENDING>,
    /// A group is iterating; membership changes are queued
    busy: bool,
}

impl<T> Default for TimerGroups<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerGroups<T> {
    /// Create an empty group table
    pub const fn new() -> Self {
        Self {
            groups: Vec::new(),
            pending: Vec::new(),
            busy: false,
        }
    }

    /// Number of groups (one scheduler entry each)
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

impl<T: Copy + Eq> TimerGroups<T> {
    /// Scheduler identity of a group
    pub const fn timer_id(cadence: Cadence) -> TimerId<Slot<T>> {
        TimerId::new(Slot::Group(cadence), 0)
    }

    /// Members of the group with this cadence, in registration order
    pub fn members(&self, cadence: Cadence) -> &[TimerId<T>] {
        self.find(cadence)
            .map(|i| self.groups[i].members.as_slice())
            .unwrap_or(&[])
    }

    /// Cadence a widget is currently grouped under
    pub fn cadence_of(&self, id: TimerId<T>) -> Option<Cadence> {
        self.groups
            .iter()
            .find(|g| g.members.contains(&id))
            .map(|g| g.cadence)
    }

    /// Register a widget
    ///
    /// The widget joins the group for `(interval_ms, one_shot)`, creating
    /// the group and its scheduler entry if needed. A widget already
    /// grouped under another cadence moves. Re-adding with the same
    /// cadence is a no-op.
    pub fn add_widget(
        &mut self,
        timers: &mut Timers<Slot<T>>,
        id: TimerId<T>,
        interval_ms: u32,
        one_shot: bool,
        now_ms: u64,
    ) -> Result<(), GroupError> {
        let cadence = Cadence::new(interval_ms, one_shot);
        if self.busy {
            return self
                .pending
                .push(Pending::Add(id, cadence))
                .map_err(|_| GroupError::Backlog);
        }
        self.attach(timers, id, cadence, now_ms)
    }

    /// Unregister a widget
    ///
    /// Removing the last member of a group removes the group's scheduler
    /// entry. Unknown widgets are ignored.
    pub fn remove_widget(
        &mut self,
        timers: &mut Timers<Slot<T>>,
        id: TimerId<T>,
    ) -> Result<(), GroupError> {
        if self.busy {
            return self
                .pending
                .push(Pending::Remove(id))
                .map_err(|_| GroupError::Backlog);
        }
        self.detach(timers, id);
        Ok(())
    }

    /// Drop every group and its scheduler entry
    pub fn clear(&mut self, timers: &mut Timers<Slot<T>>) {
        for group in &self.groups {
            timers.remove(Self::timer_id(group.cadence));
        }
        self.groups.clear();
        self.pending.clear();
    }

    /// Run every member of the group for `cadence`
    ///
    /// Called when the group's scheduler entry fires. Each member runs even
    /// if an earlier one fails; the first failure is returned afterwards.
    pub fn process<R>(
        &mut self,
        cadence: Cadence,
        timers: &mut Timers<Slot<T>>,
        tasks: &mut R,
    ) -> Result<(), TaskError>
    where
        R: GroupTask<T> + ?Sized,
    {
        let Some(index) = self.find(cadence) else {
            return Ok(());
        };
        let members = self.groups[index].members.clone();

        self.busy = true;
        let mut result = Ok(());
        for id in members {
            if let Err(e) = tasks.run(id, self, timers) {
                warn!("group member failed: {}", e.reason);
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        self.busy = false;

        // The scheduler has already retired a one-shot entry
        if cadence.one_shot {
            if let Some(index) = self.find(cadence) {
                self.groups.swap_remove(index);
            }
        }

        let now_ms = timers.pass_ms();
        let pending = core::mem::take(&mut self.pending);
        for change in pending {
            let applied = match change {
                Pending::Add(id, cadence) => self.attach(timers, id, cadence, now_ms),
                Pending::Remove(id) => {
                    self.detach(timers, id);
                    Ok(())
                }
            };
            if let Err(e) = applied {
                warn!("deferred group change failed: {:?}", e);
            }
        }

        result
    }

    fn find(&self, cadence: Cadence) -> Option<usize> {
        self.groups.iter().position(|g| g.cadence == cadence)
    }

    fn attach(
        &mut self,
        timers: &mut Timers<Slot<T>>,
        id: TimerId<T>,
        cadence: Cadence,
        now_ms: u64,
    ) -> Result<(), GroupError> {
        let current = self.cadence_of(id);
        if current == Some(cadence) {
            return Ok(());
        }

        // Secure room in the target before leaving the current group, so a
        // failed move keeps the widget where it was
        match self.find(cadence) {
            Some(index) => {
                if self.groups[index].members.is_full() {
                    return Err(GroupError::GroupFull);
                }
            }
            None => {
                let frees_group = current.is_some_and(|c| self.members(c).len() == 1);
                if self.groups.is_full() && !frees_group {
                    return Err(GroupError::TooManyGroups);
                }
                // Group entries run after same-interval plain tasks
                timers.add_late(
                    Self::timer_id(cadence),
                    cadence.interval_ms,
                    cadence.one_shot,
                    now_ms,
                )?;
            }
        }

        self.detach(timers, id);
        let index = match self.find(cadence) {
            Some(index) => index,
            None => {
                // Capacity checked above
                let _ = self.groups.push(Group {
                    cadence,
                    members: Vec::new(),
                });
                self.groups.len() - 1
            }
        };
        let _ = self.groups[index].members.push(id);
        Ok(())
    }

    fn detach(&mut self, timers: &mut Timers<Slot<T>>, id: TimerId<T>) {
        let Some(index) = self.groups.iter().position(|g| g.members.contains(&id)) else {
            return;
        };

        let group = &mut self.groups[index];
        group.members.retain(|m| *m != id);
        if group.members.is_empty() {
            timers.remove(Self::timer_id(group.cadence));
            self.groups.swap_remove(index);
        }
    }
}

/// Scheduler task that dispatches plain tasks and whole groups
///
/// Plain [`Slot::Task`] entries and group members both run through the
/// same [`GroupTask`] implementation.
#[derive(Debug)]
pub struct Grouped<T, R> {
    pub groups: TimerGroups<T>,
    pub tasks: R,
}

impl<T, R> Grouped<T, R> {
    pub const fn new(tasks: R) -> Self {
        Self {
            groups: TimerGroups::new(),
            tasks,
        }
    }
}

impl<T, R> TimerTask<Slot<T>> for Grouped<T, R>
where
    T: Copy + Eq,
    R: GroupTask<T>,
{
    fn run(
        &mut self,
        id: TimerId<Slot<T>>,
        timers: &mut Timers<Slot<T>>,
    ) -> Result<(), TaskError> {
        match id.task {
            Slot::Group(cadence) => self.groups.process(cadence, timers, &mut self.tasks),
            Slot::Task(task) => {
                self.tasks
                    .run(TimerId::new(task, id.data), &mut self.groups, timers)
            }
        }
    }
}
