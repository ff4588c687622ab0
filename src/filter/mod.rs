// ====================================================================================
// ARCHITECTURAL OVERVIEW: The Filter Contract
// ====================================================================================
//
// A filter is one unit of computation over the shared `DataContainerArray`. It
// exposes a single validation routine, `data_check`, run in one of two modes:
//
//   1. [preflight]  -> data_check(Mode::Preflight)
//         Resolves inputs, creates zero-length outputs. Never touches element data.
//
//   2. [execute]    -> data_check(Mode::Execute) -> compute()
//         Re-validates (so a filter is self-contained outside a pipeline),
//         creates fully sized outputs, then runs the per-tuple work.
//
// `data_check` records outputs in a `DataCheck` staging area. Staged outputs are
// only committed when no error was recorded, so a failing filter never leaves a
// half-built schema behind. If `compute` then fails, the commit is rolled back
// from its journal.
//
// Per-instance state machine:
//
//   Idle -> Preflighting -> Idle
//   Idle -> Executing -> Completed | Failed | Cancelled
// ====================================================================================

pub mod context;
pub mod data_check;
pub mod parameters;
pub mod registry;

use std::time::Instant;

use crate::containers::DataContainerArray;
use crate::error::{codes, Result, StrataError};

pub use context::{CancelToken, ExecuteContext, ProgressEvent};
pub use data_check::{CommitJournal, DataCheck, DataCheckReport};
pub use parameters::{ParameterReader, ParameterValue, ParameterWriter};
pub use registry::FilterRegistry;

//==================================================================================
// 1. Mode, Phase and Messages
//==================================================================================

/// Which pass `data_check` is serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Preflight,
    Execute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterPhase {
    #[default]
    Idle,
    Preflighting,
    Executing,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Error,
    Warning,
    Status,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterMessage {
    pub level: MessageLevel,
    pub code: i32,
    pub text: String,
}

//==================================================================================
// 2. Per-Instance State
//==================================================================================

/// The last outcome of a filter: phase, codes and the ordered message log.
///
/// Only the first error sets `error_code`; later errors from the same pass are
/// still logged so several problems surface at once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    phase: FilterPhase,
    error_code: i32,
    warning_code: i32,
    messages: Vec<FilterMessage>,
    errors: Vec<StrataError>,
}

impl FilterState {
    pub fn phase(&self) -> FilterPhase {
        self.phase
    }

    pub fn error_code(&self) -> i32 {
        self.error_code
    }

    pub fn warning_code(&self) -> i32 {
        self.warning_code
    }

    pub fn messages(&self) -> &[FilterMessage] {
        &self.messages
    }

    /// Every error recorded during the last pass, in order.
    pub fn errors(&self) -> &[StrataError] {
        &self.errors
    }

    /// The text of the first error message, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.level == MessageLevel::Error)
            .map(|m| m.text.as_str())
    }

    /// Starts a new pass, dropping everything from the previous one.
    pub fn begin(&mut self, phase: FilterPhase) {
        self.phase = phase;
        self.error_code = codes::NO_ERROR;
        self.warning_code = codes::NO_ERROR;
        self.messages.clear();
        self.errors.clear();
    }

    pub fn set_phase(&mut self, phase: FilterPhase) {
        self.phase = phase;
    }

    pub fn record_error(&mut self, err: StrataError) {
        let code = err.code();
        if self.error_code >= 0 {
            self.error_code = code;
        }
        self.messages.push(FilterMessage {
            level: MessageLevel::Error,
            code,
            text: err.to_string(),
        });
        self.errors.push(err);
    }

    pub fn record_warning(&mut self, code: i32, text: impl Into<String>) {
        if self.warning_code >= 0 {
            self.warning_code = code;
        }
        self.messages.push(FilterMessage {
            level: MessageLevel::Warning,
            code,
            text: text.into(),
        });
    }

    pub fn record_status(&mut self, text: impl Into<String>) {
        self.messages.push(FilterMessage {
            level: MessageLevel::Status,
            code: codes::NO_ERROR,
            text: text.into(),
        });
    }

    fn absorb(&mut self, report: DataCheckReport) {
        for (code, text) in report.warnings {
            self.record_warning(code, text);
        }
        for err in report.errors {
            self.record_error(err);
        }
    }
}

//==================================================================================
// 3. The Filter Trait
//==================================================================================

/// A unit of computation implementing the preflight/execute contract.
///
/// Implementors provide `data_check` and `compute`; `preflight` and `execute`
/// are provided and drive the state machine. A filter borrows the
/// `DataContainerArray` for one call only and must not retain it.
pub trait Filter: Send {
    /// Stable name used to rebuild the filter from a stored pipeline.
    fn class_name(&self) -> &'static str;

    fn human_label(&self) -> &'static str {
        self.class_name()
    }

    fn state(&self) -> &FilterState;

    fn state_mut(&mut self) -> &mut FilterState;

    /// Resolves every input and stages every output through `check`.
    fn data_check(&self, check: &mut DataCheck<'_>);

    /// The per-tuple work. Only called after a clean execute-mode `data_check`.
    fn compute(&mut self, dca: &mut DataContainerArray, ctx: &mut ExecuteContext<'_>) -> Result<()>;

    fn write_parameters(&self, writer: &mut ParameterWriter);

    /// Replays stored parameters; missing keys keep their current values.
    fn read_parameters(&mut self, reader: &ParameterReader);

    fn error_code(&self) -> i32 {
        self.state().error_code()
    }

    /// Validates against `dca` and propagates schema without touching element data.
    fn preflight(&mut self, dca: &mut DataContainerArray) -> i32 {
        self.state_mut().begin(FilterPhase::Preflighting);
        let report = {
            let mut check = DataCheck::new(dca, Mode::Preflight);
            self.data_check(&mut check);
            check.commit()
        };
        let state = self.state_mut();
        state.absorb(report);
        state.set_phase(FilterPhase::Idle);
        state.error_code()
    }

    /// Re-validates, creates sized outputs and runs `compute`.
    fn execute(&mut self, dca: &mut DataContainerArray, ctx: &mut ExecuteContext<'_>) -> i32 {
        let started = Instant::now();
        let class_name = self.class_name();
        self.state_mut().begin(FilterPhase::Executing);
        let (report, journal) = {
            let mut check = DataCheck::new(dca, Mode::Execute);
            self.data_check(&mut check);
            check.commit_journaled()
        };
        self.state_mut().absorb(report);
        if self.error_code() < 0 {
            self.state_mut().set_phase(FilterPhase::Failed);
            log::warn!("{} failed validation with code {}", class_name, self.error_code());
            return self.error_code();
        }

        ctx.set_current_filter(class_name);
        let outcome = self.compute(dca, ctx);
        let state = self.state_mut();
        match outcome {
            Ok(()) => {
                state.set_phase(FilterPhase::Completed);
                state.record_status("Complete");
            }
            Err(StrataError::Cancelled) => {
                state.record_error(StrataError::Cancelled);
                state.set_phase(FilterPhase::Cancelled);
            }
            Err(err) => {
                // A failed filter leaves no outputs behind; a cancelled one keeps its partial work.
                journal.rollback(dca);
                state.record_error(err);
                state.set_phase(FilterPhase::Failed);
            }
        }
        log::info!(
            "{} finished as {:?} in {:?}",
            class_name,
            state.phase(),
            started.elapsed()
        );
        crate::log_metric!(
            "event" = "filter_execute",
            "filter" = class_name,
            "code" = state.error_code()
        );
        state.error_code()
    }
}
