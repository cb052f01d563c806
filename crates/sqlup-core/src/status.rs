//! Task execution status, shared with the orchestrator.
//!
//! The status is the only channel through which an orchestrator learns how a
//! task went. It lives in an atomic so a `StatusHandle` can observe the
//! in-flight `Pending` state while `execute` runs on another task.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TaskStatus {
    NotPrepared = 0,
    Prepared = 1,
    FailedToPrepare = 2,
    Pending = 3,
    Successful = 4,
    Failed = 5,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::NotPrepared => "not-prepared",
            TaskStatus::Prepared => "prepared",
            TaskStatus::FailedToPrepare => "failed-to-prepare",
            TaskStatus::Pending => "pending",
            TaskStatus::Successful => "successful",
            TaskStatus::Failed => "failed",
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => TaskStatus::NotPrepared,
            1 => TaskStatus::Prepared,
            2 => TaskStatus::FailedToPrepare,
            3 => TaskStatus::Pending,
            4 => TaskStatus::Successful,
            _ => TaskStatus::Failed,
        }
    }

    /// Terminal for the current run: the orchestrator never executes it again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Successful | TaskStatus::Failed | TaskStatus::FailedToPrepare
        )
    }

    /// Forward-only transitions. `Prepared` is reachable from `NotPrepared` only.
    ///
    /// `NotPrepared | FailedToPrepare -> Successful` is the no-op execute of a
    /// task with missing required fields.
    pub fn can_advance_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (NotPrepared, Prepared)
                | (NotPrepared, FailedToPrepare)
                | (NotPrepared, Failed)
                | (NotPrepared, Successful)
                | (Prepared, Pending)
                | (Prepared, Failed)
                | (Prepared, Successful)
                | (Pending, Successful)
                | (Pending, Failed)
                | (FailedToPrepare, Successful)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owned, writable status of one task.
#[derive(Debug)]
pub(crate) struct StatusCell(Arc<AtomicU8>);

impl StatusCell {
    pub(crate) fn new() -> Self {
        StatusCell(Arc::new(AtomicU8::new(TaskStatus::NotPrepared as u8)))
    }

    pub(crate) fn get(&self) -> TaskStatus {
        TaskStatus::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move to `next` if the state machine allows it. Returns false (and leaves
    /// the status untouched) for an illegal transition.
    pub(crate) fn advance(&self, next: TaskStatus) -> bool {
        let current = self.get();
        if current == next {
            return true;
        }
        if !current.can_advance_to(next) {
            tracing::warn!("refusing status transition {} -> {}", current, next);
            return false;
        }
        self.0.store(next as u8, Ordering::Release);
        true
    }

    pub(crate) fn handle(&self) -> StatusHandle {
        StatusHandle(Arc::clone(&self.0))
    }
}

/// Read-only view of a task's status, safe to poll from other threads.
#[derive(Debug, Clone)]
pub struct StatusHandle(Arc<AtomicU8>);

impl StatusHandle {
    pub fn get(&self) -> TaskStatus {
        TaskStatus::from_u8(self.0.load(Ordering::Acquire))
    }
}
