//! A deterministic, single-threaded event loop.
//!
//! Work runs in a fixed order: the synchronous main program, then all pending
//! microtasks, then repeated passes of
//! `timers -> I/O callbacks -> immediates`, draining microtasks after every
//! single callback. Next-tick microtasks always drain before promise
//! reactions. Time is a logical tick counter, so the same sequence of
//! scheduling calls always produces the same execution order.

pub mod config;
pub mod error;
pub mod io;
mod queue;
pub mod scheduler;
pub mod task;

/// The scheduling surface callbacks and task sources talk to.
/// Implemented by [`LocalScheduler`]; kept as a trait so task sources can be
/// written against any loop.
pub trait Scheduler {
    /// Run `callback` in the first timers phase at or after `now() + delay_ticks`.
    /// A zero delay still waits for the next timers phase.
    fn schedule_timer(&self, delay_ticks: u64, callback: task::Callback)
    -> Result<TaskId, ScheduleError>;

    /// Run `callback` in the immediate phase, after this pass's I/O callbacks.
    fn schedule_immediate(&self, callback: task::Callback) -> Result<TaskId, ScheduleError>;

    /// Queue the completion of an external operation for the next I/O phase.
    fn schedule_io_callback(&self, callback: task::Callback) -> Result<TaskId, ScheduleError>;

    /// Schedule a microtask, run before any further phase work.
    fn schedule_microtask(
        &self,
        priority: MicrotaskPriority,
        callback: task::Callback,
    ) -> Result<(), ScheduleError>;

    /// Drop a task that has not run yet. Returns false if it already ran, was
    /// cancelled before, or was scheduled on a different loop.
    fn cancel(&self, id: TaskId) -> bool;

    /// Current logical tick.
    fn now(&self) -> u64;
}

pub use config::SchedulerConfig;
pub use error::{ScheduleError, SchedulerError};
pub use io::{Deferred, DeriveKey, Digest, IoOperation, KeyDerivationError, ReadFile};
pub use scheduler::{LocalScheduler, RunSummary, SchedulerState};
pub use task::{Callback, CallbackError, CallbackKind, MicrotaskPriority, TaskId, TaskKind, TaskResult};
