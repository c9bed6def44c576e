//! Applier and progress traits
//!
//! These traits let the executor drive any platform client and any UI
//! without depending on either.

use crate::diff::ResourceChange;
use crate::plan::Operation;
use crate::resource::Resource;
use crate::result::ResourceResult;
use anyhow::Result;

/// Everything an applier needs to perform one operation
#[derive(Debug, Clone, Copy)]
pub struct ApplyRequest<'a> {
    pub operation: &'a Operation,
    /// Configured definition; `None` for deletes
    pub resource: Option<&'a Resource>,
    /// Diff record with the before/after payloads
    pub change: Option<&'a ResourceChange>,
}

/// What an applier reports back for an operation that did not error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The operation took full effect
    Applied { message: Option<String> },
    /// Only part of the operation took effect
    Partial { message: String },
}

/// Performs create/update/delete operations against a platform
///
/// Implementations must be callable from several worker threads at once;
/// operations in the same stage are dispatched concurrently.
pub trait Applier: Send + Sync {
    /// Perform one operation
    ///
    /// An `Err` is recorded as a failed result for this resource. It never
    /// aborts the run.
    fn apply(&self, request: &ApplyRequest<'_>) -> Result<ApplyOutcome>;
}

/// Progress callback for apply runs
pub trait ProgressCallback: Send {
    /// Called before a stage's operations are dispatched
    fn on_stage_start(&mut self, label: &str, count: usize);

    /// Called once per recorded outcome
    fn on_operation_complete(&mut self, result: &ResourceResult);

    /// Called after every operation of a stage has finished
    fn on_stage_complete(&mut self);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_stage_start(&mut self, _label: &str, _count: usize) {}
    fn on_operation_complete(&mut self, _result: &ResourceResult) {}
    fn on_stage_complete(&mut self) {}
}
