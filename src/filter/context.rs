//! Run-time services handed to `Filter::compute`: configuration, the shared
//! cancellation flag and an optional progress sink.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::StrataConfig;
use crate::error::{Result, StrataError};

/// A cloneable handle on one cancellation flag.
///
/// Every clone observes the same flag, so a pipeline can hand one to another
/// thread and cancel a running execute from there.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clears the flag. Pipelines never do this on their own.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub filter_index: usize,
    pub class_name: &'static str,
    pub completed: usize,
    pub total: usize,
    pub message: String,
}

pub struct ExecuteContext<'a> {
    config: Arc<StrataConfig>,
    cancel: CancelToken,
    progress: Option<&'a mut dyn FnMut(&ProgressEvent)>,
    filter_index: usize,
    class_name: &'static str,
}

impl Default for ExecuteContext<'_> {
    fn default() -> Self {
        Self::new(Arc::new(StrataConfig::default()), CancelToken::new())
    }
}

impl<'a> ExecuteContext<'a> {
    pub fn new(config: Arc<StrataConfig>, cancel: CancelToken) -> Self {
        Self {
            config,
            cancel,
            progress: None,
            filter_index: 0,
            class_name: "",
        }
    }

    pub fn with_progress(mut self, progress: &'a mut dyn FnMut(&ProgressEvent)) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn config(&self) -> &StrataConfig {
        &self.config
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn filter_index(&self) -> usize {
        self.filter_index
    }

    pub(crate) fn set_filter_index(&mut self, index: usize) {
        self.filter_index = index;
    }

    pub(crate) fn set_current_filter(&mut self, class_name: &'static str) {
        self.class_name = class_name;
    }

    /// Polls for cancellation and emits progress at the configured intervals.
    ///
    /// Call once per tuple (or per block) with the number of items processed so
    /// far. Returns `Err(Cancelled)` when the flag is seen.
    pub fn checkpoint(&mut self, completed: usize, total: usize) -> Result<()> {
        let poll = self.config.cancel_poll_interval.max(1);
        if completed % poll == 0 && self.cancel.is_cancelled() {
            return Err(StrataError::Cancelled);
        }
        let every = self.config.progress_interval.max(1);
        if completed % every == 0 {
            self.report(completed, total, "");
        }
        Ok(())
    }

    /// Sends one progress event if a sink is attached.
    pub fn report(&mut self, completed: usize, total: usize, message: &str) {
        if let Some(sink) = self.progress.as_mut() {
            let event = ProgressEvent {
                filter_index: self.filter_index,
                class_name: self.class_name,
                completed,
                total,
                message: message.to_string(),
            };
            sink(&event);
        }
    }
}
