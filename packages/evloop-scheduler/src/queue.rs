use crate::task::{Microtask, TaskKey};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

/// A FIFO queue of task handles.
/// Since LocalScheduler is single-threaded, we use RefCell<VecDeque>.
#[derive(Default)]
pub struct TaskQueue {
    queue: RefCell<VecDeque<TaskKey>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self {
            queue: RefCell::new(VecDeque::new()),
        }
    }

    pub fn push(&self, id: TaskKey) {
        self.queue.borrow_mut().push_back(id);
    }

    pub fn pop(&self) -> Option<TaskKey> {
        self.queue.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// Takes everything queued right now. Entries pushed while the batch is
    /// being processed land in the (now empty) queue and wait for the next pass.
    pub fn take_batch(&self) -> VecDeque<TaskKey> {
        std::mem::take(&mut *self.queue.borrow_mut())
    }

    pub fn clear(&self) {
        self.queue.borrow_mut().clear();
    }
}

/// FIFO of microtasks of a single priority.
#[derive(Default)]
pub struct MicrotaskQueue {
    queue: RefCell<VecDeque<Microtask>>,
}

impl MicrotaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, task: Microtask) {
        self.queue.borrow_mut().push_back(task);
    }

    // The borrow ends before the caller runs the task, so the task itself may
    // push more microtasks onto this queue.
    pub fn pop(&self) -> Option<Microtask> {
        self.queue.borrow_mut().pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.queue.borrow_mut().clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct TimerEntry {
    due: u64,
    seq: u64,
    id: TaskKey,
}

/// Min-heap of timers ordered by (due tick, insertion sequence).
#[derive(Default)]
pub struct TimerQueue {
    heap: RefCell<BinaryHeap<Reverse<TimerEntry>>>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, due: u64, seq: u64, id: TaskKey) {
        self.heap
            .borrow_mut()
            .push(Reverse(TimerEntry { due, seq, id }));
    }

    /// Removes and returns every timer due at or before `now`, in firing order.
    pub fn take_due(&self, now: u64) -> SmallVec<[TaskKey; 8]> {
        let mut heap = self.heap.borrow_mut();
        let mut due = SmallVec::new();
        while let Some(Reverse(entry)) = heap.peek() {
            if entry.due > now {
                break;
            }
            due.push(entry.id);
            heap.pop();
        }
        due
    }

    /// Earliest due tick among timers accepted by `is_live`. Entries rejected
    /// by it (cancelled timers) are dropped from the heap on the way.
    pub fn next_due(&self, is_live: impl Fn(TaskKey) -> bool) -> Option<u64> {
        let mut heap = self.heap.borrow_mut();
        while let Some(Reverse(entry)) = heap.peek() {
            if is_live(entry.id) {
                return Some(entry.due);
            }
            heap.pop();
        }
        None
    }

    pub fn len(&self) -> usize {
        self.heap.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.heap.borrow_mut().clear();
    }
}
