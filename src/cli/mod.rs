//! CLI utilities for ferro-txmap
//!
//! Formatting and exit-status helpers used by the `ferro-txmap` binary,
//! kept in the library so they can be unit tested.

pub mod format;

pub use format::{output_error_with_context, output_load_report, output_result, OutputFormat};

use crate::batch::PipelineSummary;
use crate::catalog::LoadReport;

/// Process exit status of a CLI run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Completed, or cancelled cleanly
    Success,
    /// A fatal error stopped the run
    Failure,
    /// Completed, but some transcripts or query rows were rejected
    Rejections,
}

impl ExitStatus {
    /// Exit status of a run that finished without a fatal error.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferro_txmap::cli::ExitStatus;
    /// use ferro_txmap::catalog::LoadReport;
    ///
    /// assert_eq!(ExitStatus::from_outcome(&LoadReport::default(), None), ExitStatus::Success);
    /// ```
    pub fn from_outcome(report: &LoadReport, summary: Option<&PipelineSummary>) -> Self {
        let rejected_rows = summary.is_some_and(PipelineSummary::has_rejections);
        if report.has_rejections() || rejected_rows {
            ExitStatus::Rejections
        } else {
            ExitStatus::Success
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Failure => 1,
            ExitStatus::Rejections => 2,
        }
    }
}
