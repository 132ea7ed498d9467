use crate::scheduler::SchedulerState;
use crate::task::{CallbackError, CallbackKind};
use thiserror::Error;

/// Rejected `schedule_*` call. Queue state is left untouched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("timer delay of {delay} ticks exceeds the configured maximum of {max}")]
    DelayTooLarge { delay: u64, max: u64 },

    #[error("timer delay of {delay} ticks overflows the clock at tick {tick}")]
    DelayOverflow { tick: u64, delay: u64 },

    #[error("scheduler has terminated")]
    Terminated,
}

/// Fatal outcome of [`LocalScheduler::run`](crate::LocalScheduler::run).
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("unhandled error in {kind} callback: {source}")]
    UnhandledCallback {
        kind: CallbackKind,
        #[source]
        source: CallbackError,
    },

    #[error("event loop exceeded {limit} passes")]
    PassLimitExceeded { limit: u64 },

    #[error("scheduler cannot run from state {state:?}")]
    InvalidState { state: SchedulerState },
}

impl SchedulerError {
    /// Kind of the callback that brought the loop down, if any.
    pub fn callback_kind(&self) -> Option<CallbackKind> {
        match self {
            SchedulerError::UnhandledCallback { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
