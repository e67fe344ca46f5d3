//! Event Loop Implementation
//!
//! A single-threaded task queue driven by virtual time. Promise reactions are
//! queued here as microtasks and only run when the owner of the loop calls
//! [`EventLoop::flush`] or [`EventLoop::advance`], which makes every
//! asynchronous continuation deterministic under test.
//!
//! The loop is an explicit handle rather than process-wide state: clone it
//! into whatever needs to schedule work and every clone shares one queue.

use crate::error::{Error, QueueKind, Result};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, trace, warn};

/// A queued continuation
pub type Task = Box<dyn FnOnce()>;

/// Handle for a scheduled timer, used to cancel it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

struct Timer {
    id: u64,
    /// Virtual time in ms at which the timer fires
    fire_at: u64,
    task: Task,
}

/// Event loop configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EventLoopConfig {
    /// Maximum number of tasks a single flush or advance may run.
    /// Guards against continuations that keep rescheduling themselves.
    pub max_tasks_per_flush: usize,
}

impl Default for EventLoopConfig {
    fn default() -> Self {
        Self {
            max_tasks_per_flush: 10_000,
        }
    }
}

impl EventLoopConfig {
    /// Parse a configuration from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("Failed to parse event loop config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&source)
    }

    fn validate(&self) -> Result<()> {
        if self.max_tasks_per_flush == 0 {
            return Err(Error::config("maxTasksPerFlush must be greater than zero"));
        }
        Ok(())
    }
}

/// Result of a single `flush()` or `advance()` call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    /// Microtasks dequeued and run
    pub microtasks_processed: usize,
    /// Timers that fired
    pub timers_fired: usize,
    /// Virtual time when the run finished
    pub final_time: u64,
}

impl RunResult {
    /// Total number of tasks run
    pub fn tasks(&self) -> usize {
        self.microtasks_processed + self.timers_fired
    }
}

/// Runtime statistics for the event loop
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLoopStats {
    /// Total microtasks run across all flushes
    pub total_microtasks: u64,
    /// Total timers fired
    pub total_timers: u64,
    /// Number of completed flush/advance calls
    pub total_flushes: u64,
    /// Most tasks run by a single flush
    pub max_tasks_per_flush: u64,
    /// Total promises created on this loop
    pub total_promises_created: u64,
    /// Total promises settled (fulfilled or rejected)
    pub total_promises_settled: u64,
}

struct LoopState {
    microtasks: VecDeque<Task>,
    timers: Vec<Timer>,
    virtual_time: u64,
    next_timer_id: u64,
    config: EventLoopConfig,
    stats: EventLoopStats,
}

/// Where a run stops
#[derive(Clone, Copy)]
enum Until {
    /// Run every queued task, jumping virtual time to each timer
    Idle,
    /// Run tasks whose fire time is at or before the given virtual time
    Time(u64),
}

/// Shared handle to a virtual-clock event loop
///
/// Queued tasks commonly hold promises, and promises hold the loop, so a
/// loop dropped with work still queued leaks that work. Call
/// [`flush`](Self::flush) or [`clear`](Self::clear) before letting the last
/// handle go.
#[derive(Clone)]
pub struct EventLoop {
    state: Rc<RefCell<LoopState>>,
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.state.borrow();
        f.debug_struct("EventLoop")
            .field("virtual_time", &s.virtual_time)
            .field("microtasks", &s.microtasks.len())
            .field("timers", &s.timers.len())
            .field("config", &s.config)
            .finish()
    }
}

impl EventLoop {
    /// Create a new event loop with the default configuration
    pub fn new() -> Self {
        Self::with_config(EventLoopConfig::default())
    }

    /// Create a new event loop. A zero task budget is raised to 1.
    pub fn with_config(mut config: EventLoopConfig) -> Self {
        if config.max_tasks_per_flush == 0 {
            warn!("maxTasksPerFlush of 0 raised to 1");
            config.max_tasks_per_flush = 1;
        }
        Self {
            state: Rc::new(RefCell::new(LoopState {
                microtasks: VecDeque::new(),
                timers: Vec::new(),
                virtual_time: 0,
                next_timer_id: 1,
                config,
                stats: EventLoopStats::default(),
            })),
        }
    }

    /// Create a loop that owns all scheduling for a test. Nothing runs
    /// until the test flushes or advances it.
    pub fn install() -> Self {
        let event_loop = Self::new();
        debug!("virtual clock installed");
        event_loop
    }

    /// Whether two handles share one queue
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    /// Current configuration
    pub fn config(&self) -> EventLoopConfig {
        self.state.borrow().config.clone()
    }

    /// Current virtual time in milliseconds
    pub fn now(&self) -> u64 {
        self.state.borrow().virtual_time
    }

    /// Enqueue a microtask
    pub fn enqueue_microtask(&self, task: impl FnOnce() + 'static) {
        let mut s = self.state.borrow_mut();
        s.microtasks.push_back(Box::new(task));
        trace!(queued = s.microtasks.len(), "microtask enqueued");
    }

    /// Schedule a one-shot timer `delay` ms after the current virtual time
    pub fn set_timeout(&self, delay: u64, task: impl FnOnce() + 'static) -> TimerId {
        let mut s = self.state.borrow_mut();
        let id = s.next_timer_id;
        s.next_timer_id += 1;
        let fire_at = s.virtual_time.saturating_add(delay);
        s.timers.push(Timer {
            id,
            fire_at,
            task: Box::new(task),
        });
        trace!(id, fire_at, "timer scheduled");
        TimerId(id)
    }

    /// Cancel a timer. Returns `false` if it already fired or was cancelled.
    pub fn clear_timeout(&self, id: TimerId) -> bool {
        let removed = {
            let mut s = self.state.borrow_mut();
            s.timers
                .iter()
                .position(|t| t.id == id.0)
                .map(|idx| s.timers.remove(idx))
        };
        // The task is dropped here, outside the borrow.
        removed.is_some()
    }

    /// Number of queued microtasks
    pub fn pending_microtasks(&self) -> usize {
        self.state.borrow().microtasks.len()
    }

    /// Number of scheduled timers
    pub fn pending_timers(&self) -> usize {
        self.state.borrow().timers.len()
    }

    /// Check if the event loop has any pending work
    pub fn has_pending_work(&self) -> bool {
        let s = self.state.borrow();
        !s.microtasks.is_empty() || !s.timers.is_empty()
    }

    /// Run every queued continuation, including ones scheduled while
    /// flushing, until the loop is idle. Pending timers fire in order with
    /// virtual time jumping forward to each one. Flushing an idle loop is a
    /// no-op.
    pub fn flush(&self) -> Result<RunResult> {
        self.run(Until::Idle)
    }

    /// Move virtual time forward by `ms`, firing due timers in order and
    /// draining microtasks after each one.
    pub fn advance(&self, ms: u64) -> Result<RunResult> {
        let target = self.now().saturating_add(ms);
        let mut result = self.run(Until::Time(target))?;
        let mut s = self.state.borrow_mut();
        s.virtual_time = s.virtual_time.max(target);
        result.final_time = s.virtual_time;
        Ok(result)
    }

    /// Drop all queued work without running it. This also breaks the
    /// reference cycles between queued tasks and the loop.
    pub fn clear(&self) {
        let (microtasks, timers) = {
            let mut s = self.state.borrow_mut();
            (
                std::mem::take(&mut s.microtasks),
                std::mem::take(&mut s.timers),
            )
        };
        if !microtasks.is_empty() || !timers.is_empty() {
            debug!(
                microtasks = microtasks.len(),
                timers = timers.len(),
                "event loop cleared"
            );
        }
    }

    /// Statistics snapshot
    pub fn stats(&self) -> EventLoopStats {
        self.state.borrow().stats.clone()
    }

    /// Reset statistics counters
    pub fn reset_stats(&self) {
        self.state.borrow_mut().stats = EventLoopStats::default();
    }

    pub(crate) fn record_promise_created(&self) {
        self.state.borrow_mut().stats.total_promises_created += 1;
    }

    pub(crate) fn record_promise_settled(&self) {
        self.state.borrow_mut().stats.total_promises_settled += 1;
    }

    fn run(&self, until: Until) -> Result<RunResult> {
        let limit = self.state.borrow().config.max_tasks_per_flush;
        let mut result = RunResult::default();

        loop {
            if result.tasks() >= limit {
                if let Some(err) = self.budget_error(limit, until) {
                    warn!(%err, "flush aborted");
                    return Err(err);
                }
            }

            if let Some(task) = self.pop_microtask() {
                task();
                result.microtasks_processed += 1;
                continue;
            }

            if let Some(task) = self.pop_due_timer(until) {
                task();
                result.timers_fired += 1;
                continue;
            }

            break;
        }

        let mut s = self.state.borrow_mut();
        s.stats.total_microtasks += result.microtasks_processed as u64;
        s.stats.total_timers += result.timers_fired as u64;
        s.stats.total_flushes += 1;
        s.stats.max_tasks_per_flush = s.stats.max_tasks_per_flush.max(result.tasks() as u64);
        result.final_time = s.virtual_time;
        if result.tasks() > 0 {
            debug!(
                microtasks = result.microtasks_processed,
                timers = result.timers_fired,
                time = result.final_time,
                "event loop flushed"
            );
        }
        Ok(result)
    }

    fn budget_error(&self, limit: usize, until: Until) -> Option<Error> {
        let s = self.state.borrow();
        if !s.microtasks.is_empty() {
            return Some(Error::flush_limit(
                limit,
                s.microtasks.len(),
                QueueKind::Microtask,
            ));
        }
        let due = s
            .timers
            .iter()
            .filter(|t| match until {
                Until::Idle => true,
                Until::Time(deadline) => t.fire_at <= deadline,
            })
            .count();
        (due > 0).then(|| Error::flush_limit(limit, due, QueueKind::Timer))
    }

    fn pop_microtask(&self) -> Option<Task> {
        self.state.borrow_mut().microtasks.pop_front()
    }

    /// Remove the earliest due timer and move virtual time to its fire time.
    /// Timers with equal fire times run in scheduling order.
    fn pop_due_timer(&self, until: Until) -> Option<Task> {
        let mut s = self.state.borrow_mut();
        let idx = s
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| match until {
                Until::Idle => true,
                Until::Time(deadline) => t.fire_at <= deadline,
            })
            .min_by_key(|(_, t)| (t.fire_at, t.id))
            .map(|(i, _)| i)?;
        let timer = s.timers.remove(idx);
        s.virtual_time = s.virtual_time.max(timer.fire_at);
        trace!(id = timer.id, time = s.virtual_time, "timer fired");
        Some(timer.task)
    }
}
