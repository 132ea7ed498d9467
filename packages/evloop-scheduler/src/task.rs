use slotmap::new_key_type;
use std::fmt;

new_key_type! {
    pub(crate) struct TaskKey;
}

/// Handle to a scheduled timer, immediate or I/O callback.
/// Stays valid for `cancel` until the task has been dequeued, and only on the
/// scheduler that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId {
    scheduler: u64,
    key: TaskKey,
}

impl TaskId {
    pub(crate) fn new(scheduler: u64, key: TaskKey) -> Self {
        Self { scheduler, key }
    }

    /// The task's slot if this handle was issued by scheduler `owner`.
    pub(crate) fn key_for(self, owner: u64) -> Option<TaskKey> {
        (self.scheduler == owner).then_some(self.key)
    }
}

/// Error raised by a callback. Anything convertible into a boxed error works,
/// so callbacks can use `?` on io errors or return `Err("reason".into())`.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type TaskResult = Result<(), CallbackError>;

/// Every callback the loop runs is one-shot.
pub type Callback = Box<dyn FnOnce() -> TaskResult>;

/// Phase tasks. Microtasks are tracked separately, see [`MicrotaskPriority`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Timer,
    IoCallback,
    Immediate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MicrotaskPriority {
    /// Drained before any promise reaction.
    NextTick,
    PromiseReaction,
}

/// What was running when a callback was invoked (or failed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackKind {
    Main,
    NextTick,
    PromiseReaction,
    Timer,
    IoCallback,
    Immediate,
}

impl From<TaskKind> for CallbackKind {
    fn from(kind: TaskKind) -> Self {
        match kind {
            TaskKind::Timer => CallbackKind::Timer,
            TaskKind::IoCallback => CallbackKind::IoCallback,
            TaskKind::Immediate => CallbackKind::Immediate,
        }
    }
}

impl From<MicrotaskPriority> for CallbackKind {
    fn from(priority: MicrotaskPriority) -> Self {
        match priority {
            MicrotaskPriority::NextTick => CallbackKind::NextTick,
            MicrotaskPriority::PromiseReaction => CallbackKind::PromiseReaction,
        }
    }
}

impl fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallbackKind::Main => "main program",
            CallbackKind::NextTick => "next-tick microtask",
            CallbackKind::PromiseReaction => "promise reaction",
            CallbackKind::Timer => "timer",
            CallbackKind::IoCallback => "I/O callback",
            CallbackKind::Immediate => "immediate",
        };
        f.write_str(name)
    }
}

pub struct Task {
    pub kind: TaskKind,
    pub callback: Callback,
}

impl Task {
    pub fn new(kind: TaskKind, callback: Callback) -> Self {
        Self { kind, callback }
    }
}

pub struct Microtask {
    pub priority: MicrotaskPriority,
    // Insertion order; only used for tracing since each queue is FIFO anyway.
    pub seq: u64,
    pub callback: Callback,
}

impl Microtask {
    pub fn new(priority: MicrotaskPriority, seq: u64, callback: Callback) -> Self {
        Self {
            priority,
            seq,
            callback,
        }
    }
}
