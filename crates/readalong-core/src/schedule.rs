//! Frame and timer callbacks as explicit, cancellable handles.
//!
//! Time is a `Duration` measured from an arbitrary origin (the front-end
//! uses process start, tests use synthetic values). The queue never fires
//! anything itself; the owner asks for due tasks and dispatches them.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Runs on the next display frame.
    Frame,
    /// Runs once after a delay.
    Timer,
}

#[derive(Debug, Clone, Copy)]
struct Task {
    id: TaskId,
    kind: TaskKind,
    due: Duration,
}

#[derive(Debug, Default)]
pub struct TaskQueue {
    next_id: u64,
    tasks: Vec<Task>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: TaskKind, due: Duration) -> TaskId {
        self.next_id += 1;
        let id = TaskId(self.next_id);
        self.tasks.push(Task { id, kind, due });
        id
    }

    pub fn request_frame(&mut self, now: Duration, frame: Duration) -> TaskId {
        self.push(TaskKind::Frame, now + frame)
    }

    pub fn set_timeout(&mut self, now: Duration, delay: Duration) -> TaskId {
        self.push(TaskKind::Timer, now + delay)
    }

    /// Remove a task so it never fires. Returns false if it already ran or
    /// was cancelled.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        self.tasks.len() != before
    }

    pub fn is_pending(&self, id: TaskId) -> bool {
        self.tasks.iter().any(|t| t.id == id)
    }

    pub fn pending(&self, kind: TaskKind) -> usize {
        self.tasks.iter().filter(|t| t.kind == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.tasks.iter().map(|t| t.due).min()
    }

    /// Remove and return every task due at `now`, earliest first.
    pub fn take_due(&mut self, now: Duration) -> Vec<(TaskId, TaskKind)> {
        let mut due: Vec<Task> = Vec::new();
        self.tasks.retain(|t| {
            if t.due <= now {
                due.push(*t);
                false
            } else {
                true
            }
        });
        due.sort_by_key(|t| (t.due, t.id));
        due.into_iter().map(|t| (t.id, t.kind)).collect()
    }
}
