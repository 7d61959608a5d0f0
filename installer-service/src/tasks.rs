// SPDX-License-Identifier: GPL-3.0-only

//! Task publication: every task gets its own object path with lifecycle
//! signals.

use std::sync::Arc;

use installer_dbus::task::{InstallationTask, TaskEvent, TaskRunner};
use zbus::interface;
use zbus::object_server::SignalEmitter;

/// One published task.
pub struct TaskHandler {
    runner: Arc<TaskRunner>,
}

#[interface(name = "org.fedoraproject.Anaconda.Task")]
impl TaskHandler {
    #[zbus(property)]
    fn name(&self) -> String {
        self.runner.name().to_string()
    }

    #[zbus(property)]
    fn steps(&self) -> u32 {
        self.runner.steps()
    }

    #[zbus(property)]
    fn is_running(&self) -> bool {
        self.runner.is_running()
    }

    #[zbus(property)]
    fn is_cancelled(&self) -> bool {
        self.runner.is_cancelled()
    }

    /// Start the one run of this task; completion arrives via signals.
    async fn start(&self) {
        let runner = self.runner.clone();
        tokio::spawn(async move {
            if let Err(error) = runner.run().await {
                tracing::error!("task could not run: {error}");
            }
        });
    }

    /// Cooperative cancellation; the task yields at its next safe point.
    async fn cancel(&self) {
        self.runner.cancel();
    }

    #[zbus(signal)]
    async fn started(emitter: &SignalEmitter<'_>) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn progress_changed(
        emitter: &SignalEmitter<'_>,
        step: u32,
        message: &str,
    ) -> zbus::Result<()>;

    #[zbus(signal)]
    async fn stopped(emitter: &SignalEmitter<'_>) -> zbus::Result<()>;
}

/// Serve a task at its own path and forward its lifecycle onto the bus.
pub async fn publish_task(
    connection: &zbus::Connection,
    path: String,
    task: Arc<dyn InstallationTask>,
) -> zbus::Result<Arc<TaskRunner>> {
    let runner = Arc::new(TaskRunner::new(task));
    let mut events = runner.subscribe();

    connection
        .object_server()
        .at(
            path.as_str(),
            TaskHandler {
                runner: runner.clone(),
            },
        )
        .await?;

    let signal_connection = connection.clone();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            let emitter = match SignalEmitter::new(&signal_connection, path.as_str()) {
                Ok(emitter) => emitter,
                Err(error) => {
                    tracing::error!("no signal emitter for {path}: {error}");
                    continue;
                }
            };
            let result = match &event {
                TaskEvent::Started => TaskHandler::started(&emitter).await,
                TaskEvent::ProgressChanged { step, message } => {
                    TaskHandler::progress_changed(&emitter, *step, message).await
                }
                TaskEvent::Stopped => TaskHandler::stopped(&emitter).await,
            };
            if let Err(error) = result {
                tracing::error!("cannot emit task signal at {path}: {error}");
            }
            if event == TaskEvent::Stopped {
                break;
            }
        }
    });

    Ok(runner)
}
