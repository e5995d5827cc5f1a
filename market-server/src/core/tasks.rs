//! 后台任务管理
//!
//! 预热任务和长期 worker 统一在这里注册，关闭时先发取消信号，
//! 再在宽限期内等待每个任务退出，超时则强制 abort。
//!
//! 通知 worker 可能正处在 webhook 重试的 sleep 中，宽限期保证
//! 进程不会因为一次慢请求而卡住关闭流程。

use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// 默认关闭宽限期
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// 任务类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// 启动预热，运行一次即结束
    Warmup,
    /// 长期运行，只应在取消后退出
    Worker,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskKind::Warmup => "warmup",
            TaskKind::Worker => "worker",
        })
    }
}

struct RegisteredTask {
    name: &'static str,
    kind: TaskKind,
    handle: JoinHandle<()>,
}

/// 后台任务注册表
///
/// ```ignore
/// let mut tasks = BackgroundTasks::new();
/// let shutdown = tasks.shutdown_token();
/// tasks.spawn("notification_worker", TaskKind::Worker, async move {
///     worker.run(rx, shutdown).await;
/// });
/// tasks.shutdown().await;
/// ```
pub struct BackgroundTasks {
    tasks: Vec<RegisteredTask>,
    shutdown: CancellationToken,
    grace: Duration,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::with_grace(DEFAULT_SHUTDOWN_GRACE)
    }

    pub fn with_grace(grace: Duration) -> Self {
        Self {
            tasks: Vec::new(),
            shutdown: CancellationToken::new(),
            grace,
        }
    }

    /// 任务内部监听的取消令牌
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// 注册并启动任务 (panic 被捕获并记录，不会拖垮 runtime)
    pub fn spawn<F>(&mut self, name: &'static str, kind: TaskKind, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let cancelled = self.shutdown.clone();
        let handle = tokio::spawn(async move {
            match AssertUnwindSafe(future).catch_unwind().await {
                Ok(()) if kind == TaskKind::Worker && !cancelled.is_cancelled() => {
                    tracing::warn!(task = name, kind = %kind, "Worker exited before shutdown");
                }
                Ok(()) => {
                    tracing::debug!(task = name, kind = %kind, "Task finished");
                }
                Err(panic) => {
                    tracing::error!(
                        task = name,
                        kind = %kind,
                        panic = %panic_message(panic.as_ref()),
                        "Background task panicked"
                    );
                }
            }
        });
        tracing::debug!(task = name, kind = %kind, "Background task started");
        self.tasks.push(RegisteredTask { name, kind, handle });
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn log_summary(&self) {
        let names: Vec<String> = self
            .tasks
            .iter()
            .map(|t| format!("{}({})", t.name, t.kind))
            .collect();
        tracing::info!(count = self.tasks.len(), tasks = %names.join(", "), "Background tasks running");
    }

    /// 取消所有任务，宽限期内等待退出，超时的任务被 abort
    pub async fn shutdown(self) {
        tracing::info!(count = self.tasks.len(), grace_ms = self.grace.as_millis() as u64, "Stopping background tasks");
        self.shutdown.cancel();

        let deadline = tokio::time::Instant::now() + self.grace;
        let mut aborted = 0;
        for mut task in self.tasks {
            match tokio::time::timeout_at(deadline, &mut task.handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) if e.is_cancelled() => {}
                Ok(Err(e)) => tracing::error!(task = task.name, error = ?e, "Task join failed"),
                Err(_) => {
                    tracing::warn!(task = task.name, "Task did not stop in time, aborting");
                    task.handle.abort();
                    aborted += 1;
                }
            }
        }

        tracing::info!(aborted, "Background tasks stopped");
    }
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
