// SPDX-License-Identifier: GPL-3.0-only

//! Cancellable units of work with progress reporting.
//!
//! A task runs exactly once and terminates as succeeded, failed or
//! cancelled. Cancellation is cooperative: the flag is interpreted only at
//! the task's designated safe points. Progress is monotonic in step index
//! within one run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

/// Terminal failure of a task, carried across the bus.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{category}: {message}")]
pub struct TaskFailure {
    pub category: String,
    pub message: String,
}

impl TaskFailure {
    pub fn new(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            message: message.into(),
        }
    }
}

/// Lifecycle events observable by task subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    Started,
    ProgressChanged { step: u32, message: String },
    Stopped,
}

/// Terminal result of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Succeeded,
    Failed(TaskFailure),
    Cancelled,
}

/// Execution context handed to a running task.
pub struct TaskContext {
    cancelled: Arc<AtomicBool>,
    events: broadcast::Sender<TaskEvent>,
    last_step: AtomicU32,
}

impl TaskContext {
    /// Whether cancellation was requested. Tasks consult this at safe
    /// points, typically between subprocess invocations.
    pub fn check_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Report progress. Step indexes are monotonic; a stale index is lifted
    /// to the last reported one.
    pub fn progress_step(&self, step: u32, message: impl Into<String>) {
        let step = self.last_step.fetch_max(step, Ordering::SeqCst).max(step);
        // Subscribers may come and go; a closed channel is not an error.
        let _ = self.events.send(TaskEvent::ProgressChanged {
            step,
            message: message.into(),
        });
    }
}

/// A unit of work publishable on the bus.
#[async_trait]
pub trait InstallationTask: Send + Sync {
    fn name(&self) -> &str;

    /// Total number of steps, for progress display.
    fn steps(&self) -> u32 {
        1
    }

    async fn run(&self, context: &TaskContext) -> Result<(), TaskFailure>;
}

/// Holds one task through its single run.
pub struct TaskRunner {
    task: Arc<dyn InstallationTask>,
    cancelled: Arc<AtomicBool>,
    running: AtomicBool,
    started: AtomicBool,
    events: broadcast::Sender<TaskEvent>,
    outcome: std::sync::Mutex<Option<TaskOutcome>>,
}

impl TaskRunner {
    pub fn new(task: Arc<dyn InstallationTask>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            task,
            cancelled: Arc::new(AtomicBool::new(false)),
            running: AtomicBool::new(false),
            started: AtomicBool::new(false),
            events,
            outcome: std::sync::Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        self.task.name()
    }

    pub fn steps(&self) -> u32 {
        self.task.steps()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Request cooperative cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.events.subscribe()
    }

    pub fn outcome(&self) -> Option<TaskOutcome> {
        self.outcome.lock().expect("task outcome lock").clone()
    }

    /// Run the task to completion. Tasks are one-shot; a second start is
    /// rejected.
    pub async fn run(&self) -> Result<TaskOutcome, TaskFailure> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(TaskFailure::new(
                "task",
                format!("task {} has already run", self.task.name()),
            ));
        }

        self.running.store(true, Ordering::SeqCst);
        let _ = self.events.send(TaskEvent::Started);
        tracing::info!("task started: {}", self.task.name());

        let context = TaskContext {
            cancelled: self.cancelled.clone(),
            events: self.events.clone(),
            last_step: AtomicU32::new(0),
        };

        let result = self.task.run(&context).await;

        let outcome = if self.cancelled.load(Ordering::SeqCst) {
            TaskOutcome::Cancelled
        } else {
            match result {
                Ok(()) => TaskOutcome::Succeeded,
                Err(failure) => TaskOutcome::Failed(failure),
            }
        };

        self.running.store(false, Ordering::SeqCst);
        let _ = self.events.send(TaskEvent::Stopped);
        match &outcome {
            TaskOutcome::Succeeded => tracing::info!("task finished: {}", self.task.name()),
            TaskOutcome::Cancelled => tracing::info!("task cancelled: {}", self.task.name()),
            TaskOutcome::Failed(failure) => {
                tracing::error!("task failed: {}: {failure}", self.task.name())
            }
        }

        *self.outcome.lock().expect("task outcome lock") = Some(outcome.clone());
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StepTask;

    #[async_trait]
    impl InstallationTask for StepTask {
        fn name(&self) -> &str {
            "step-task"
        }

        fn steps(&self) -> u32 {
            3
        }

        async fn run(&self, context: &TaskContext) -> Result<(), TaskFailure> {
            for step in 1..=3 {
                if context.check_cancelled() {
                    return Ok(());
                }
                context.progress_step(step, format!("step {step}"));
            }
            Ok(())
        }
    }

    struct FailingTask;

    #[async_trait]
    impl InstallationTask for FailingTask {
        fn name(&self) -> &str {
            "failing-task"
        }

        async fn run(&self, _context: &TaskContext) -> Result<(), TaskFailure> {
            Err(TaskFailure::new("os", "tool exited 1"))
        }
    }

    #[tokio::test]
    async fn successful_run_emits_lifecycle() {
        let runner = TaskRunner::new(Arc::new(StepTask));
        let mut events = runner.subscribe();

        let outcome = runner.run().await.expect("run");
        assert_eq!(outcome, TaskOutcome::Succeeded);

        assert_eq!(events.recv().await.expect("event"), TaskEvent::Started);
        let mut last = 0;
        for _ in 0..3 {
            match events.recv().await.expect("event") {
                TaskEvent::ProgressChanged { step, .. } => {
                    assert!(step > last);
                    last = step;
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(events.recv().await.expect("event"), TaskEvent::Stopped);
    }

    #[tokio::test]
    async fn failure_is_terminal() {
        let runner = TaskRunner::new(Arc::new(FailingTask));
        let outcome = runner.run().await.expect("run");
        assert!(matches!(outcome, TaskOutcome::Failed(_)));
        assert_eq!(runner.outcome(), Some(outcome));
        assert!(!runner.is_running());
    }

    #[tokio::test]
    async fn tasks_are_one_shot() {
        let runner = TaskRunner::new(Arc::new(StepTask));
        runner.run().await.expect("first run");
        assert!(runner.run().await.is_err());
    }

    #[tokio::test]
    async fn cancellation_before_run_yields_cancelled() {
        let runner = TaskRunner::new(Arc::new(StepTask));
        runner.cancel();
        let outcome = runner.run().await.expect("run");
        assert_eq!(outcome, TaskOutcome::Cancelled);
    }
}
