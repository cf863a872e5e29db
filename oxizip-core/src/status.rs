//! Shared progress and cancellation state for background operations.
//!
//! The engine itself is synchronous; a caller may run one whole operation on
//! a worker thread while polling a shared [`ProgressMonitor`]. At most one
//! mutating operation may run per monitor: starting a second one while the
//! state is [`TaskState::Busy`] is rejected. Cancellation is cooperative -
//! the copy loop checks the flag once per buffer and exits at the next
//! boundary. Pausing parks the worker on a condvar until resumed.

use crate::error::{Result, ZipError};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::sync::{Condvar, Mutex};

/// Coarse state of the operation attached to a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TaskState {
    /// No operation running; a new one may begin.
    Ready = 0,
    /// An operation is running; new operations are rejected.
    Busy = 1,
}

/// Terminal outcome of a background operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResult {
    /// The operation completed.
    Success,
    /// The operation was cancelled through the monitor.
    Cancelled,
    /// The operation failed; the message is the error's display form.
    Error(String),
}

/// Thread-safe progress/cancellation handle shared between a worker thread
/// and its caller.
#[derive(Debug)]
pub struct ProgressMonitor {
    state: AtomicU8,
    total_work: AtomicU64,
    work_completed: AtomicU64,
    cancel: AtomicBool,
    paused: Mutex<bool>,
    resume_signal: Condvar,
    current_entry: Mutex<Option<String>>,
    result: Mutex<Option<TaskResult>>,
}

impl ProgressMonitor {
    /// Create a monitor in the ready state.
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(TaskState::Ready as u8),
            total_work: AtomicU64::new(0),
            work_completed: AtomicU64::new(0),
            cancel: AtomicBool::new(false),
            paused: Mutex::new(false),
            resume_signal: Condvar::new(),
            current_entry: Mutex::new(None),
            result: Mutex::new(None),
        }
    }

    /// Current state.
    pub fn state(&self) -> TaskState {
        if self.state.load(Ordering::Acquire) == TaskState::Busy as u8 {
            TaskState::Busy
        } else {
            TaskState::Ready
        }
    }

    /// Claim the monitor for a new operation.
    ///
    /// Fails with `InvalidConfiguration` if an operation is already running.
    pub fn begin(&self) -> Result<()> {
        let previous = self.state.compare_exchange(
            TaskState::Ready as u8,
            TaskState::Busy as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        if previous.is_err() {
            return Err(ZipError::invalid_configuration(
                "another operation is already running on this archive",
            ));
        }
        self.total_work.store(0, Ordering::Release);
        self.work_completed.store(0, Ordering::Release);
        self.cancel.store(false, Ordering::Release);
        if let Ok(mut result) = self.result.lock() {
            *result = None;
        }
        Ok(())
    }

    /// Record the terminal result and release the monitor.
    pub fn finish(&self, outcome: TaskResult) {
        if let Ok(mut result) = self.result.lock() {
            *result = Some(outcome);
        }
        if let Ok(mut name) = self.current_entry.lock() {
            *name = None;
        }
        self.state.store(TaskState::Ready as u8, Ordering::Release);
    }

    /// Terminal result of the last operation, if one has finished.
    pub fn result(&self) -> Option<TaskResult> {
        self.result.lock().ok().and_then(|r| r.clone())
    }

    /// Set the expected total amount of work, in arbitrary units (bytes).
    pub fn set_total_work(&self, total: u64) {
        self.total_work.store(total, Ordering::Release);
    }

    /// Add to the completed-work counter.
    pub fn add_work_completed(&self, amount: u64) {
        self.work_completed.fetch_add(amount, Ordering::AcqRel);
    }

    /// Completed and total work counters, in that order.
    pub fn progress(&self) -> (u64, u64) {
        (
            self.work_completed.load(Ordering::Acquire),
            self.total_work.load(Ordering::Acquire),
        )
    }

    /// Name the entry currently being processed.
    pub fn set_current_entry(&self, name: &str) {
        if let Ok(mut entry) = self.current_entry.lock() {
            *entry = Some(name.to_string());
        }
    }

    /// Entry currently being processed, if any.
    pub fn current_entry(&self) -> Option<String> {
        self.current_entry.lock().ok().and_then(|e| e.clone())
    }

    /// Ask the running operation to stop at its next buffer boundary.
    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::Release);
        // A paused worker must wake up to observe the flag.
        self.resume_signal.notify_all();
    }

    /// Whether cancellation has been requested.
    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    /// Pause the running operation at its next checkpoint.
    pub fn pause(&self) {
        if let Ok(mut paused) = self.paused.lock() {
            *paused = true;
        }
    }

    /// Resume a paused operation.
    pub fn resume(&self) {
        if let Ok(mut paused) = self.paused.lock() {
            *paused = false;
        }
        self.resume_signal.notify_all();
    }

    /// Checkpoint called by copy loops: blocks while paused, then reports
    /// whether the operation should continue.
    ///
    /// Returns `Err(Cancelled)` if cancellation was requested, so callers can
    /// simply `?` it once per buffer.
    pub fn checkpoint(&self) -> Result<()> {
        if let Ok(mut paused) = self.paused.lock() {
            while *paused && !self.is_cancel_requested() {
                match self.resume_signal.wait(paused) {
                    Ok(guard) => paused = guard,
                    Err(_) => break,
                }
            }
        }
        if self.is_cancel_requested() {
            return Err(ZipError::Cancelled);
        }
        Ok(())
    }
}

impl Default for ProgressMonitor {
    fn default() -> Self {
        Self::new()
    }
}
