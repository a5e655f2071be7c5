use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use ai_optimizer_executor::ProgressCb;

/// 单调递增的进度上报器：比已上报值更小的百分比会被抬到已上报值
pub struct ProgressReporter {
    sink: Option<ProgressCb>,
    last: AtomicU8,
}

impl ProgressReporter {
    pub fn new(sink: Option<ProgressCb>) -> Arc<Self> {
        Arc::new(Self {
            sink,
            last: AtomicU8::new(0),
        })
    }

    pub fn report(&self, percent: u8, message: &str) {
        let percent = percent.min(100);
        let previous = self.last.fetch_max(percent, Ordering::SeqCst);
        let effective = previous.max(percent);
        log::info!("[{:>3}%] {}", effective, message);
        if let Some(sink) = &self.sink {
            sink(effective, message);
        }
    }

    pub fn current(&self) -> u8 {
        self.last.load(Ordering::SeqCst)
    }

    /// 供下游组件（如动作执行器）使用的回调，同样受单调约束
    pub fn callback(self: &Arc<Self>) -> ProgressCb {
        let reporter = Arc::clone(self);
        Arc::new(move |percent, message| reporter.report(percent, message))
    }
}
