//! Cooperative priority scheduler for periodic tasks.
//!
//! Each task runs at most once per `pri_sched` call. Among the tasks that are
//! due, the highest priority runs first; equal priorities run in the order
//! they were added. A task that falls more than a period behind skips the
//! missed slots instead of running back to back.

use core::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use motorlab_traits::Clock;
use tracing::{debug, info, warn};

use crate::error::Result;

/// A periodic, non-blocking unit of work.
pub trait Task {
    fn name(&self) -> &str;

    /// One slice of work. Must not block.
    fn run_once(&mut self) -> Result<()>;

    /// A finished task is no longer scheduled.
    fn is_finished(&self) -> bool {
        false
    }

    /// Called once when the scheduler stops.
    fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Run statistics for one task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskProfile {
    pub runs: u64,
    pub errors: u64,
    /// Runs that started more than a full period late.
    pub late: u64,
    pub worst_us: u64,
    pub total_us: u64,
}

impl TaskProfile {
    pub fn mean_us(&self) -> u64 {
        self.total_us.checked_div(self.runs).unwrap_or(0)
    }
}

struct Slot {
    task: Box<dyn Task>,
    period: Duration,
    priority: u8,
    next_due: Instant,
    profile: TaskProfile,
}

pub struct Scheduler {
    slots: Vec<Slot>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("tasks", &self.slots.len())
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    pub fn new(clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            slots: Vec::new(),
            clock,
        }
    }

    /// Add a task; its first run is due immediately.
    pub fn add(&mut self, task: Box<dyn Task>, period_ms: u64, priority: u8) {
        let period = Duration::from_millis(period_ms.max(1));
        debug!(task = task.name(), period_ms, priority, "task added");
        self.slots.push(Slot {
            task,
            period,
            priority,
            next_due: self.clock.now(),
            profile: TaskProfile::default(),
        });
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Run the highest-priority due task, if any. Returns whether one ran.
    pub fn pri_sched(&mut self) -> bool {
        let now = self.clock.now();
        let mut chosen: Option<usize> = None;
        for (i, slot) in self.slots.iter().enumerate() {
            if slot.next_due > now || slot.task.is_finished() {
                continue;
            }
            // Strictly greater keeps the earliest-added task on ties.
            if chosen.is_none_or(|c| slot.priority > self.slots[c].priority) {
                chosen = Some(i);
            }
        }
        let Some(i) = chosen else {
            return false;
        };

        let slot = &mut self.slots[i];
        let started = Instant::now();
        let outcome = slot.task.run_once();
        let took_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);

        slot.profile.runs += 1;
        slot.profile.total_us = slot.profile.total_us.saturating_add(took_us);
        slot.profile.worst_us = slot.profile.worst_us.max(took_us);
        if let Err(e) = outcome {
            slot.profile.errors += 1;
            warn!(task = slot.task.name(), error = %e, "task run failed");
        }

        slot.next_due += slot.period;
        if slot.next_due <= now {
            slot.profile.late += 1;
            slot.next_due = now + slot.period;
        }
        true
    }

    fn all_finished(&self) -> bool {
        self.slots.iter().all(|s| s.task.is_finished())
    }

    /// Time until the earliest unfinished task is due.
    fn next_wait(&self) -> Option<Duration> {
        let now = self.clock.now();
        self.slots
            .iter()
            .filter(|s| !s.task.is_finished())
            .map(|s| s.next_due.saturating_duration_since(now))
            .min()
    }

    /// Schedule until `shutdown` is set or every task has finished, then
    /// call `shutdown` on each task.
    pub fn run_until(&mut self, shutdown: &AtomicBool) {
        info!(tasks = self.slots.len(), "scheduler started");
        loop {
            if shutdown.load(Ordering::Relaxed) {
                info!("shutdown requested");
                break;
            }
            if self.all_finished() {
                debug!("all tasks finished");
                break;
            }
            if !self.pri_sched()
                && let Some(wait) = self.next_wait()
            {
                self.clock.sleep(wait);
            }
        }
        for slot in &mut self.slots {
            if let Err(e) = slot.task.shutdown() {
                warn!(task = slot.task.name(), error = %e, "task shutdown failed");
            }
        }
        info!("scheduler stopped");
    }

    /// Profiles in insertion order.
    pub fn profiles(&self) -> Vec<(&str, &TaskProfile)> {
        self.slots
            .iter()
            .map(|s| (s.task.name(), &s.profile))
            .collect()
    }

    /// Printable per-task table.
    pub fn report(&self) -> ProfileReport<'_> {
        ProfileReport(self)
    }
}

pub struct ProfileReport<'a>(&'a Scheduler);

impl fmt::Display for ProfileReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<16} {:>4} {:>7} {:>8} {:>6} {:>6} {:>10} {:>10}",
            "TASK", "PRI", "PERIOD", "RUNS", "ERRS", "LATE", "MEAN_US", "WORST_US"
        )?;
        for s in &self.0.slots {
            writeln!(
                f,
                "{:<16} {:>4} {:>7} {:>8} {:>6} {:>6} {:>10} {:>10}",
                s.task.name(),
                s.priority,
                s.period.as_millis(),
                s.profile.runs,
                s.profile.errors,
                s.profile.late,
                s.profile.mean_us(),
                s.profile.worst_us
            )?;
        }
        Ok(())
    }
}
