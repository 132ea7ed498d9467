use crate::Scheduler;
use crate::config::SchedulerConfig;
use crate::error::{ScheduleError, SchedulerError};
use crate::io::IoOperation;
use crate::queue::{MicrotaskQueue, TaskQueue, TimerQueue};
use crate::task::{
    Callback, CallbackKind, Microtask, MicrotaskPriority, Task, TaskId, TaskKey, TaskKind,
    TaskResult,
};
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SCHEDULER_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    RunningMain,
    DrainingMicrotasks,
    TimersPhase,
    IoPhase,
    ImmediatePhase,
    Terminated,
}

/// What a finished `run` did.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub passes: u64,
    pub final_tick: u64,
    pub invocations: FxHashMap<CallbackKind, u64>,
}

impl RunSummary {
    pub fn invocations_of(&self, kind: CallbackKind) -> u64 {
        self.invocations.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_invocations(&self) -> u64 {
        self.invocations.values().sum()
    }
}

struct PendingIo {
    label: String,
    remaining_passes: u32,
    complete: Box<dyn FnOnce() -> Callback>,
}

/// Single-threaded event loop.
///
/// Share it with callbacks through an `Rc`: every method takes `&self` and no
/// internal borrow is held while user code runs, so callbacks can schedule
/// more work on the scheduler that is running them.
pub struct LocalScheduler {
    id: u64,
    config: SchedulerConfig,
    state: Cell<SchedulerState>,
    tick: Cell<u64>,
    sequence: Cell<u64>,
    passes: Cell<u64>,
    tasks: RefCell<SlotMap<TaskKey, Task>>,
    timers: TimerQueue,
    io_callbacks: TaskQueue,
    immediates: TaskQueue,
    next_ticks: MicrotaskQueue,
    promise_reactions: MicrotaskQueue,
    pending_io: RefCell<VecDeque<PendingIo>>,
    invocations: RefCell<FxHashMap<CallbackKind, u64>>,
}

impl Default for LocalScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalScheduler {
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        Self {
            id: NEXT_SCHEDULER_ID.fetch_add(1, Ordering::Relaxed),
            config,
            state: Cell::new(SchedulerState::Idle),
            tick: Cell::new(0),
            sequence: Cell::new(0),
            passes: Cell::new(0),
            tasks: RefCell::new(SlotMap::with_key()),
            timers: TimerQueue::new(),
            io_callbacks: TaskQueue::new(),
            immediates: TaskQueue::new(),
            next_ticks: MicrotaskQueue::new(),
            promise_reactions: MicrotaskQueue::new(),
            pending_io: RefCell::new(VecDeque::new()),
            invocations: RefCell::new(FxHashMap::default()),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn state(&self) -> SchedulerState {
        self.state.get()
    }

    /// Passes started so far.
    pub fn passes(&self) -> u64 {
        self.passes.get()
    }

    pub fn has_pending_work(&self) -> bool {
        !self.tasks.borrow().is_empty()
            || !self.pending_io.borrow().is_empty()
            || !self.next_ticks.is_empty()
            || !self.promise_reactions.is_empty()
    }

    pub fn next_tick(
        &self,
        callback: impl FnOnce() -> TaskResult + 'static,
    ) -> Result<(), ScheduleError> {
        self.schedule_microtask(MicrotaskPriority::NextTick, Box::new(callback))
    }

    pub fn queue_promise_reaction(
        &self,
        callback: impl FnOnce() -> TaskResult + 'static,
    ) -> Result<(), ScheduleError> {
        self.schedule_microtask(MicrotaskPriority::PromiseReaction, Box::new(callback))
    }

    pub fn set_timeout(
        &self,
        delay_ticks: u64,
        callback: impl FnOnce() -> TaskResult + 'static,
    ) -> Result<TaskId, ScheduleError> {
        self.schedule_timer(delay_ticks, Box::new(callback))
    }

    pub fn set_immediate(
        &self,
        callback: impl FnOnce() -> TaskResult + 'static,
    ) -> Result<TaskId, ScheduleError> {
        self.schedule_immediate(Box::new(callback))
    }

    /// Hands `op` to the outside world. It completes after the configured
    /// number of passes and `on_complete` then runs in the following I/O phase.
    pub fn submit_io<Op, F>(&self, op: Op, on_complete: F) -> Result<(), ScheduleError>
    where
        Op: IoOperation + 'static,
        Op::Output: 'static,
        F: FnOnce(Op::Output) -> TaskResult + 'static,
    {
        self.submit_io_after(self.config.io_latency(), op, on_complete)
    }

    /// Like [`submit_io`](Self::submit_io) with an explicit latency in passes
    /// (at least 1).
    pub fn submit_io_after<Op, F>(
        &self,
        latency_passes: u32,
        op: Op,
        on_complete: F,
    ) -> Result<(), ScheduleError>
    where
        Op: IoOperation + 'static,
        Op::Output: 'static,
        F: FnOnce(Op::Output) -> TaskResult + 'static,
    {
        self.ensure_accepting()?;

        let label = op.label().to_owned();
        let remaining_passes = latency_passes.max(1);
        tracing::trace!(%label, remaining_passes, "I/O operation submitted");

        let complete: Box<dyn FnOnce() -> Callback> = Box::new(move || {
            let output = op.perform();
            let callback: Callback = Box::new(move || on_complete(output));
            callback
        });
        self.pending_io.borrow_mut().push_back(PendingIo {
            label,
            remaining_passes,
            complete,
        });
        Ok(())
    }

    /// Performs `op` right here, blocking the loop until it is done.
    ///
    /// Nothing else (timers, I/O callbacks, microtasks) can make progress while
    /// it runs; prefer [`submit_io`](Self::submit_io).
    pub fn perform_blocking<Op: IoOperation>(&self, op: Op) -> Op::Output {
        let state = self.state.get();
        if !matches!(state, SchedulerState::Idle | SchedulerState::Terminated) {
            tracing::warn!(
                label = op.label(),
                ?state,
                "blocking operation on a running event loop"
            );
        }
        op.perform()
    }

    /// Runs `main` as the synchronous top-level program, then the event loop
    /// until no work is left.
    ///
    /// The scheduler is single use: afterwards it is `Terminated`, whether the
    /// loop drained or a callback failed.
    pub fn run<F>(&self, main: F) -> Result<RunSummary, SchedulerError>
    where
        F: FnOnce() -> TaskResult,
    {
        let state = self.state.get();
        if state != SchedulerState::Idle {
            return Err(SchedulerError::InvalidState { state });
        }

        tracing::info!("event loop starting");
        let outcome = self.run_to_completion(main);
        self.state.set(SchedulerState::Terminated);

        match outcome {
            Ok(()) => {
                let summary = self.summary();
                tracing::info!(
                    passes = summary.passes,
                    tick = summary.final_tick,
                    "event loop drained"
                );
                Ok(summary)
            }
            Err(err) => {
                tracing::error!(error = %err, "event loop terminated");
                self.discard_pending();
                Err(err)
            }
        }
    }

    fn run_to_completion<F>(&self, main: F) -> Result<(), SchedulerError>
    where
        F: FnOnce() -> TaskResult,
    {
        self.state.set(SchedulerState::RunningMain);
        self.invoke(CallbackKind::Main, main)?;
        self.drain_microtasks()?;

        while self.has_pending_work() {
            let pass = self.passes.get() + 1;
            if let Some(limit) = self.config.max_passes {
                if pass > limit {
                    return Err(SchedulerError::PassLimitExceeded { limit });
                }
            }
            self.passes.set(pass);
            tracing::debug!(pass, tick = self.tick.get(), "starting pass");

            self.run_timers_phase()?;
            self.run_queue_phase(SchedulerState::IoPhase, &self.io_callbacks)?;
            self.run_queue_phase(SchedulerState::ImmediatePhase, &self.immediates)?;
            self.complete_io()?;
            self.advance_clock();
        }

        Ok(())
    }

    fn run_timers_phase(&self) -> Result<(), SchedulerError> {
        self.state.set(SchedulerState::TimersPhase);
        let due = self.timers.take_due(self.tick.get());
        if !due.is_empty() {
            tracing::debug!(count = due.len(), "timers phase");
        }
        for key in due {
            self.run_task(key)?;
        }
        Ok(())
    }

    fn run_queue_phase(
        &self,
        phase: SchedulerState,
        queue: &TaskQueue,
    ) -> Result<(), SchedulerError> {
        self.state.set(phase);
        let batch = queue.take_batch();
        if !batch.is_empty() {
            tracing::debug!(?phase, count = batch.len(), "running phase");
        }
        for key in batch {
            self.run_task(key)?;
        }
        Ok(())
    }

    fn run_task(&self, key: TaskKey) -> Result<(), SchedulerError> {
        let task = self.tasks.borrow_mut().remove(key);
        let Some(task) = task else {
            tracing::trace!(?key, "skipping cancelled task");
            return Ok(());
        };
        self.invoke(task.kind.into(), task.callback)?;
        self.drain_microtasks()
    }

    fn drain_microtasks(&self) -> Result<(), SchedulerError> {
        if self.next_ticks.is_empty() && self.promise_reactions.is_empty() {
            return Ok(());
        }
        let resume = self.state.replace(SchedulerState::DrainingMicrotasks);
        let outcome = self.drain_microtask_queues();
        self.state.set(resume);
        outcome
    }

    fn drain_microtask_queues(&self) -> Result<(), SchedulerError> {
        loop {
            while let Some(task) = self.next_ticks.pop() {
                self.invoke_microtask(task)?;
            }
            while let Some(task) = self.promise_reactions.pop() {
                self.invoke_microtask(task)?;
            }
            // Promise reactions may have queued more next-ticks.
            if self.next_ticks.is_empty() {
                return Ok(());
            }
        }
    }

    fn invoke_microtask(&self, task: Microtask) -> Result<(), SchedulerError> {
        tracing::trace!(priority = ?task.priority, seq = task.seq, "microtask");
        self.invoke(task.priority.into(), task.callback)
    }

    fn invoke<F>(&self, kind: CallbackKind, callback: F) -> Result<(), SchedulerError>
    where
        F: FnOnce() -> TaskResult,
    {
        tracing::trace!(%kind, tick = self.tick.get(), "invoking callback");
        *self.invocations.borrow_mut().entry(kind).or_default() += 1;
        callback().map_err(|source| SchedulerError::UnhandledCallback { kind, source })
    }

    /// Counts down pending I/O and queues the callbacks of finished operations.
    fn complete_io(&self) -> Result<(), SchedulerError> {
        let finished = {
            let mut pending = self.pending_io.borrow_mut();
            for op in pending.iter_mut() {
                op.remaining_passes -= 1;
            }
            let (finished, waiting): (VecDeque<PendingIo>, VecDeque<PendingIo>) =
                pending.drain(..).partition(|op| op.remaining_passes == 0);
            *pending = waiting;
            finished
        };

        for op in finished {
            tracing::debug!(label = %op.label, "I/O operation completed");
            let callback = (op.complete)();
            let key = self
                .tasks
                .borrow_mut()
                .insert(Task::new(TaskKind::IoCallback, callback));
            self.io_callbacks.push(key);
        }
        // `perform` may have queued microtasks from outside any callback.
        self.drain_microtasks()
    }

    fn advance_clock(&self) {
        if !self.io_callbacks.is_empty()
            || !self.immediates.is_empty()
            || !self.pending_io.borrow().is_empty()
        {
            return;
        }

        let next_due = {
            let tasks = self.tasks.borrow();
            self.timers.next_due(|key| tasks.contains_key(key))
        };
        if let Some(due) = next_due {
            if due > self.tick.get() {
                tracing::debug!(from = self.tick.get(), to = due, "advancing clock");
                self.tick.set(due);
            }
        }
    }

    fn summary(&self) -> RunSummary {
        RunSummary {
            passes: self.passes.get(),
            final_tick: self.tick.get(),
            invocations: self.invocations.borrow().clone(),
        }
    }

    fn discard_pending(&self) {
        self.tasks.borrow_mut().clear();
        self.timers.clear();
        self.io_callbacks.clear();
        self.immediates.clear();
        self.next_ticks.clear();
        self.promise_reactions.clear();
        self.pending_io.borrow_mut().clear();
    }

    fn ensure_accepting(&self) -> Result<(), ScheduleError> {
        if self.state.get() == SchedulerState::Terminated {
            return Err(ScheduleError::Terminated);
        }
        Ok(())
    }

    fn next_sequence(&self) -> u64 {
        let seq = self.sequence.get();
        self.sequence.set(seq + 1);
        seq
    }

    fn insert_task(&self, kind: TaskKind, callback: Callback) -> TaskKey {
        self.tasks.borrow_mut().insert(Task::new(kind, callback))
    }
}

impl Scheduler for LocalScheduler {
    fn schedule_timer(&self, delay_ticks: u64, callback: Callback) -> Result<TaskId, ScheduleError> {
        self.ensure_accepting()?;
        let max = self.config.max_delay_ticks;
        if delay_ticks > max {
            return Err(ScheduleError::DelayTooLarge {
                delay: delay_ticks,
                max,
            });
        }
        let tick = self.tick.get();
        let due = tick
            .checked_add(delay_ticks)
            .ok_or(ScheduleError::DelayOverflow {
                tick,
                delay: delay_ticks,
            })?;

        let seq = self.next_sequence();
        let key = self.insert_task(TaskKind::Timer, callback);
        self.timers.push(due, seq, key);
        tracing::trace!(?key, due, seq, "timer scheduled");
        Ok(TaskId::new(self.id, key))
    }

    fn schedule_immediate(&self, callback: Callback) -> Result<TaskId, ScheduleError> {
        self.ensure_accepting()?;
        let key = self.insert_task(TaskKind::Immediate, callback);
        self.immediates.push(key);
        Ok(TaskId::new(self.id, key))
    }

    fn schedule_io_callback(&self, callback: Callback) -> Result<TaskId, ScheduleError> {
        self.ensure_accepting()?;
        let key = self.insert_task(TaskKind::IoCallback, callback);
        self.io_callbacks.push(key);
        Ok(TaskId::new(self.id, key))
    }

    fn schedule_microtask(
        &self,
        priority: MicrotaskPriority,
        callback: Callback,
    ) -> Result<(), ScheduleError> {
        self.ensure_accepting()?;
        let task = Microtask::new(priority, self.next_sequence(), callback);
        match priority {
            MicrotaskPriority::NextTick => self.next_ticks.push(task),
            MicrotaskPriority::PromiseReaction => self.promise_reactions.push(task),
        }
        Ok(())
    }

    fn cancel(&self, id: TaskId) -> bool {
        let Some(key) = id.key_for(self.id) else {
            tracing::trace!(?id, "task belongs to another scheduler");
            return false;
        };
        let cancelled = self.tasks.borrow_mut().remove(key).is_some();
        if cancelled {
            tracing::trace!(?id, "task cancelled");
        }
        cancelled
    }

    fn now(&self) -> u64 {
        self.tick.get()
    }
}
