//! Per-kind background tasks.
//!
//! At most one task of each [`TaskKind`] runs at a time. Spawning a task
//! cancels the running task of the same kind and waits for its thread to
//! finish before the new thread starts. Tasks of different kinds run
//! concurrently; they share no mutable state.

use std::collections::HashMap;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use resynth_core::{CancellationToken, Result};

/// Category of a background operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Wave to note-model conversion.
    WaveConversion,
    /// Whole-instrument generation.
    InstrumentGeneration,
    /// Single-note generation.
    NoteGeneration,
    /// Audio rendering.
    AudioRendering,
}

/// Handle to a spawned task.
#[derive(Debug)]
pub struct TaskHandle<T> {
    kind: TaskKind,
    cancel: CancellationToken,
    thread: JoinHandle<Result<T>>,
}

impl<T> TaskHandle<T> {
    /// Kind the task was spawned as.
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the worker thread has finished.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the task and return its result.
    ///
    /// A cancelled task returns `Err(Error::Cancelled)`. A panic in the job
    /// is resumed on the calling thread.
    pub fn join(self) -> Result<T> {
        match self.thread.join() {
            Ok(result) => result,
            Err(payload) => std::panic::resume_unwind(payload),
        }
    }
}

struct Running {
    cancel: CancellationToken,
    // Disconnects when the worker thread exits.
    done: mpsc::Receiver<()>,
}

/// Serializes tasks per kind.
#[derive(Default)]
pub struct TaskScheduler {
    running: HashMap<TaskKind, Running>,
}

impl TaskScheduler {
    /// Scheduler with nothing running.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel and await the previous task of `kind`, then run `job` on a new
    /// thread with a fresh cancellation token.
    pub fn spawn<T, F>(&mut self, kind: TaskKind, job: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(&CancellationToken) -> Result<T> + Send + 'static,
    {
        self.cancel_and_wait(kind);

        let cancel = CancellationToken::new();
        let worker_cancel = cancel.clone();
        let (done_tx, done_rx) = mpsc::channel::<()>();
        let thread = thread::spawn(move || {
            let _done = done_tx;
            let result = job(&worker_cancel);
            match &result {
                Ok(_) => tracing::debug!(?kind, "task finished"),
                Err(e) if e.is_cancelled() => tracing::debug!(?kind, "task cancelled"),
                Err(e) => tracing::warn!(?kind, error = %e, "task failed"),
            }
            result
        });
        tracing::debug!(?kind, "task started");

        self.running.insert(
            kind,
            Running {
                cancel: cancel.clone(),
                done: done_rx,
            },
        );
        TaskHandle {
            kind,
            cancel,
            thread,
        }
    }

    /// Cancel the running task of `kind` without waiting.
    pub fn cancel(&mut self, kind: TaskKind) {
        if let Some(running) = self.running.remove(&kind) {
            running.cancel.cancel();
        }
    }

    /// Cancel every running task without waiting.
    pub fn cancel_all(&mut self) {
        for (_, running) in self.running.drain() {
            running.cancel.cancel();
        }
    }

    fn cancel_and_wait(&mut self, kind: TaskKind) {
        if let Some(running) = self.running.remove(&kind) {
            running.cancel.cancel();
            // Err means the sender was dropped, i.e. the thread is done.
            let _ = running.done.recv();
            tracing::debug!(?kind, "previous task stopped");
        }
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
