// ====================================================================================
// ARCHITECTURAL OVERVIEW: The Pipeline
// ====================================================================================
//
// An ordered list of filters run strictly in sequence against one shared
// `DataContainerArray`.
//
//   preflight:  filter[0].preflight -> filter[1].preflight -> ...
//               Stops at the first negative code. Later filters would only report
//               missing inputs, since schema propagation stopped there.
//
//   execute:    [cancel?] -> filter[0].execute -> [cancel?] -> filter[1].execute ...
//               Halts on the first failed or cancelled filter. The registry is left
//               as the last completed filter left it.
//
// Preflight propagates schema into a scratch registry of its own (empty, or a
// shape-only copy of a base registry), never into the one execute runs on.
// ====================================================================================

use std::sync::Arc;
use std::time::Instant;

use crate::config::StrataConfig;
use crate::containers::DataContainerArray;
use crate::error::{codes, Result, StrataError};
use crate::filter::{CancelToken, ExecuteContext, Filter, FilterMessage, FilterPhase, ProgressEvent};
use crate::persistence::PipelineDocument;

#[cfg(test)]
mod pipeline_tests;

//==================================================================================
// 1. Status and Report
//==================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineStatus {
    #[default]
    Idle,
    Preflighted,
    Completed,
    Failed,
    Cancelled,
}

/// The filter that stopped a run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineFailure {
    pub index: usize,
    pub class_name: String,
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub index: usize,
    pub class_name: String,
    pub message: FilterMessage,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PipelineReport {
    pub status: PipelineStatus,
    /// The failing filter's code, or 0.
    pub error_code: i32,
    pub failure: Option<PipelineFailure>,
    /// Every message of every filter that ran, in order.
    pub log: Vec<LogEntry>,
    /// The code of each filter that ran, by position.
    pub filter_codes: Vec<i32>,
}

impl PipelineReport {
    pub fn is_success(&self) -> bool {
        matches!(
            self.status,
            PipelineStatus::Preflighted | PipelineStatus::Completed
        )
    }

    fn record(&mut self, index: usize, filter: &dyn Filter) {
        let state = filter.state();
        self.filter_codes.push(state.error_code());
        self.log.extend(state.messages().iter().map(|message| LogEntry {
            index,
            class_name: filter.class_name().to_string(),
            message: message.clone(),
        }));
    }

    fn fail(&mut self, status: PipelineStatus, failure: PipelineFailure) {
        self.status = status;
        self.error_code = failure.code;
        self.failure = Some(failure);
    }
}

fn failure_of(index: usize, filter: &dyn Filter) -> PipelineFailure {
    let state = filter.state();
    PipelineFailure {
        index,
        class_name: filter.class_name().to_string(),
        code: state.error_code(),
        message: state.error_message().unwrap_or_default().to_string(),
    }
}

//==================================================================================
// 2. The Pipeline
//==================================================================================

pub struct Pipeline {
    name: String,
    filters: Vec<Box<dyn Filter>>,
    config: Arc<StrataConfig>,
    cancel: CancelToken,
    status: PipelineStatus,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new("")
    }
}

impl Pipeline {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            filters: Vec::new(),
            config: Arc::new(StrataConfig::default()),
            cancel: CancelToken::new(),
            status: PipelineStatus::Idle,
        }
    }

    pub fn with_config(mut self, config: Arc<StrataConfig>) -> Self {
        self.config = config;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> PipelineStatus {
        self.status
    }

    pub fn config(&self) -> &Arc<StrataConfig> {
        &self.config
    }

    /// A handle on the cancellation flag; cancel from any thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    //==============================================================================
    // Filter List
    //==============================================================================

    pub fn push_back(&mut self, filter: Box<dyn Filter>) {
        self.filters.push(filter);
        self.status = PipelineStatus::Idle;
    }

    pub fn insert(&mut self, index: usize, filter: Box<dyn Filter>) -> Result<()> {
        if index > self.filters.len() {
            return Err(StrataError::IndexOutOfRange {
                index,
                len: self.filters.len(),
            });
        }
        self.filters.insert(index, filter);
        self.status = PipelineStatus::Idle;
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<Box<dyn Filter>> {
        if index >= self.filters.len() {
            return Err(StrataError::IndexOutOfRange {
                index,
                len: self.filters.len(),
            });
        }
        self.status = PipelineStatus::Idle;
        Ok(self.filters.remove(index))
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn filters(&self) -> &[Box<dyn Filter>] {
        &self.filters
    }

    pub fn filter_mut(&mut self, index: usize) -> Option<&mut Box<dyn Filter>> {
        self.filters.get_mut(index)
    }

    pub fn to_document(&self) -> PipelineDocument {
        PipelineDocument::from_pipeline(self)
    }

    //==============================================================================
    // Preflight
    //==============================================================================

    /// Preflights every filter in order against a new, empty registry and
    /// returns the propagated schema. Stops at the first negative code.
    ///
    /// Each call starts from scratch, so repeating it on an unmodified pipeline
    /// yields the same codes and the same schema.
    pub fn preflight(&mut self) -> (PipelineReport, DataContainerArray) {
        let mut dca = DataContainerArray::new();
        let report = self.preflight_into(&mut dca);
        (report, dca)
    }

    /// Like [`Pipeline::preflight`], starting from the structure of `base`.
    ///
    /// `base` is left untouched and none of its element data is copied.
    pub fn preflight_on(&mut self, base: &DataContainerArray) -> (PipelineReport, DataContainerArray) {
        let mut dca = base.schema_copy();
        let report = self.preflight_into(&mut dca);
        (report, dca)
    }

    fn preflight_into(&mut self, dca: &mut DataContainerArray) -> PipelineReport {
        let mut report = PipelineReport {
            status: PipelineStatus::Preflighted,
            ..PipelineReport::default()
        };
        for (index, filter) in self.filters.iter_mut().enumerate() {
            let code = filter.preflight(dca);
            report.record(index, filter.as_ref());
            if code < 0 {
                log::warn!(
                    "preflight of '{}' stopped at filter {} ({}) with code {}",
                    self.name,
                    index,
                    filter.class_name(),
                    code
                );
                report.fail(PipelineStatus::Failed, failure_of(index, filter.as_ref()));
                break;
            }
        }
        self.status = report.status;
        report
    }

    //==============================================================================
    // Execute
    //==============================================================================

    pub fn execute(&mut self, dca: &mut DataContainerArray) -> PipelineReport {
        let ctx = ExecuteContext::new(Arc::clone(&self.config), self.cancel.clone());
        self.run(dca, ctx)
    }

    /// Like [`Pipeline::execute`], sending progress events to `progress`.
    pub fn execute_with_progress(
        &mut self,
        dca: &mut DataContainerArray,
        progress: &mut dyn FnMut(&ProgressEvent),
    ) -> PipelineReport {
        let ctx = ExecuteContext::new(Arc::clone(&self.config), self.cancel.clone())
            .with_progress(progress);
        self.run(dca, ctx)
    }

    fn run(&mut self, dca: &mut DataContainerArray, mut ctx: ExecuteContext<'_>) -> PipelineReport {
        let started = Instant::now();
        let mut report = PipelineReport {
            status: PipelineStatus::Completed,
            ..PipelineReport::default()
        };
        for (index, filter) in self.filters.iter_mut().enumerate() {
            if self.cancel.is_cancelled() {
                log::info!("pipeline '{}' cancelled before filter {}", self.name, index);
                report.fail(
                    PipelineStatus::Cancelled,
                    PipelineFailure {
                        index,
                        class_name: filter.class_name().to_string(),
                        code: codes::CANCELLED,
                        message: StrataError::Cancelled.to_string(),
                    },
                );
                break;
            }

            ctx.set_filter_index(index);
            let code = filter.execute(dca, &mut ctx);
            report.record(index, filter.as_ref());
            if filter.state().phase() == FilterPhase::Cancelled {
                report.fail(PipelineStatus::Cancelled, failure_of(index, filter.as_ref()));
                break;
            }
            if code < 0 {
                log::warn!(
                    "pipeline '{}' halted at filter {} ({}) with code {}",
                    self.name,
                    index,
                    filter.class_name(),
                    code
                );
                report.fail(PipelineStatus::Failed, failure_of(index, filter.as_ref()));
                break;
            }
        }
        self.status = report.status;
        log::info!(
            "pipeline '{}' finished as {:?} in {:?}",
            self.name,
            report.status,
            started.elapsed()
        );
        crate::log_metric!(
            "event" = "pipeline_execute",
            "filters_run" = report.filter_codes.len(),
            "code" = report.error_code
        );
        report
    }
}
