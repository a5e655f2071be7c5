use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::FutureExt;
use tokio::task::JoinHandle;

use ai_optimizer_common::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub name: String,
    pub error: String,
}

/// `drain_all` 的结果；失败与 panic 只记录，不向上传播
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub completed: usize,
    pub failures: Vec<TaskFailure>,
}

struct TrackedTask {
    name: String,
    handle: JoinHandle<()>,
}

/// 两次 `drain_all` 之间最多保留的失败记录，超出时丢弃最早的
pub const MAX_RECORDED_FAILURES: usize = 64;

#[derive(Default)]
struct Inner {
    running: HashMap<u64, TrackedTask>,
    completed: usize,
    failures: VecDeque<TaskFailure>,
}

impl Inner {
    fn record(&mut self, failure: Option<TaskFailure>) {
        let Some(failure) = failure else {
            self.completed += 1;
            return;
        };
        if self.failures.len() == MAX_RECORDED_FAILURES {
            self.failures.pop_front();
        }
        self.failures.push_back(failure);
    }
}

/// 跟踪会话结束后仍在运行的后台任务（如自我反思），保证退出前被等待
///
/// 锁从不跨越 await 持有。
#[derive(Default)]
pub struct BackgroundTaskRegistry {
    next_id: AtomicU64,
    inner: Arc<Mutex<Inner>>,
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}

impl BackgroundTaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 启动任务；任务结束时自行从注册表中移除
    pub fn spawn<F>(&self, name: impl Into<String>, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let name = name.into();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let inner = Arc::clone(&self.inner);
        let task_name = name.clone();

        // 插入完成前任务无法拿到锁，自我移除不会早于插入
        let mut guard = lock(&self.inner);
        let handle = tokio::spawn(async move {
            let failure = match AssertUnwindSafe(task).catch_unwind().await {
                Ok(Ok(())) => {
                    log::debug!("background task '{}' finished", task_name);
                    None
                }
                Ok(Err(e)) => Some(e.to_string()),
                Err(payload) => Some(panic_message(payload)),
            };
            if let Some(error) = &failure {
                log::error!("background task '{}' failed: {}", task_name, error);
            }
            let mut inner = lock(&inner);
            inner.running.remove(&id);
            inner.record(failure.map(|error| TaskFailure {
                name: task_name,
                error,
            }));
        });
        guard.running.insert(id, TrackedTask { name, handle });
    }

    /// 等待所有任务（包括等待期间新登记的任务）结束
    pub async fn drain_all(&self) -> DrainReport {
        loop {
            let pending: Vec<TrackedTask> =
                lock(&self.inner).running.drain().map(|(_, t)| t).collect();
            if pending.is_empty() {
                break;
            }
            log::info!("waiting for {} background tasks", pending.len());
            for task in pending {
                if let Err(e) = task.handle.await {
                    log::error!("background task '{}' did not complete: {}", task.name, e);
                    lock(&self.inner).record(Some(TaskFailure {
                        name: task.name,
                        error: e.to_string(),
                    }));
                }
            }
        }

        let mut inner = lock(&self.inner);
        DrainReport {
            completed: std::mem::take(&mut inner.completed),
            failures: std::mem::take(&mut inner.failures).into(),
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).running.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
