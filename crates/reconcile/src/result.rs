//! Execution results - per-resource outcomes and the run aggregate

use crate::types::{ChangeType, ExecutionStatus, OperationStatus, ResourceKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Outcome of one apply operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceResult {
    pub kind: ResourceKind,
    pub name: String,
    pub operation: ChangeType,
    pub status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub duration: Duration,
}

impl ResourceResult {
    fn new(
        kind: ResourceKind,
        name: impl Into<String>,
        operation: ChangeType,
        status: OperationStatus,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            operation,
            status,
            message: None,
            error: None,
            duration: Duration::ZERO,
        }
    }

    pub fn success(kind: ResourceKind, name: impl Into<String>, operation: ChangeType) -> Self {
        Self::new(kind, name, operation, OperationStatus::Success)
    }

    pub fn failed(
        kind: ResourceKind,
        name: impl Into<String>,
        operation: ChangeType,
        error: impl Into<String>,
    ) -> Self {
        let mut result = Self::new(kind, name, operation, OperationStatus::Failed);
        result.error = Some(error.into());
        result
    }

    pub fn skipped(
        kind: ResourceKind,
        name: impl Into<String>,
        operation: ChangeType,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(kind, name, operation, OperationStatus::Skipped).with_message(reason)
    }

    pub fn cancelled(kind: ResourceKind, name: impl Into<String>, operation: ChangeType) -> Self {
        Self::new(kind, name, operation, OperationStatus::Cancelled)
    }

    pub fn with_status(mut self, status: OperationStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// One-line rendering used in reports
    pub fn line(&self) -> String {
        let mut line = format!(
            "{} {} {}.{} ({})",
            self.status.symbol(),
            self.operation,
            self.kind,
            self.name,
            self.status
        );
        if let Some(detail) = self.error.as_ref().or(self.message.as_ref()) {
            line.push_str(": ");
            line.push_str(detail);
        }
        line
    }
}

/// Aggregate of every outcome recorded during one apply run
///
/// Append-only while running; [`finalize`](Self::finalize) derives the
/// overall status and stamps the completion time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    results: Vec<ResourceResult>,
    success_count: usize,
    failed_count: usize,
    skipped_count: usize,
    status: ExecutionStatus,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    duration: Option<Duration>,
}

impl ExecutionResult {
    /// Start a new run now
    pub fn new() -> Self {
        Self::started_at(Utc::now())
    }

    /// Start a run at an explicit time
    pub fn started_at(started_at: DateTime<Utc>) -> Self {
        Self {
            results: Vec::new(),
            success_count: 0,
            failed_count: 0,
            skipped_count: 0,
            status: ExecutionStatus::Running,
            started_at,
            completed_at: None,
            duration: None,
        }
    }

    /// Record one outcome
    ///
    /// A finalized result is immutable: the entry is dropped with a warning
    /// and `false` is returned.
    pub fn add_result(&mut self, result: ResourceResult) -> bool {
        if self.completed_at.is_some() {
            log::warn!(
                "Ignoring result for {}.{}: execution result already finalized",
                result.kind,
                result.name
            );
            return false;
        }
        match result.status {
            OperationStatus::Success => self.success_count += 1,
            s if s.is_failure() => self.failed_count += 1,
            s if s.is_skip() => self.skipped_count += 1,
            _ => {}
        }
        self.results.push(result);
        true
    }

    /// Derive the overall status and stamp the completion time
    ///
    /// Calling this again recomputes both from the same start time.
    pub fn finalize(&mut self) -> ExecutionStatus {
        self.finalize_at(Utc::now())
    }

    /// Finalize with an explicit completion time
    pub fn finalize_at(&mut self, completed_at: DateTime<Utc>) -> ExecutionStatus {
        self.status = if self.failed_count == 0 {
            ExecutionStatus::Success
        } else if self.success_count == 0 {
            ExecutionStatus::Failed
        } else {
            ExecutionStatus::Partial
        };
        self.completed_at = Some(completed_at);
        self.duration = Some((completed_at - self.started_at).to_std().unwrap_or_default());
        self.status
    }

    pub fn results(&self) -> &[ResourceResult] {
        &self.results
    }

    pub fn success_count(&self) -> usize {
        self.success_count
    }

    pub fn failed_count(&self) -> usize {
        self.failed_count
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped_count
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    pub fn is_finalized(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn started(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn completed(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Entries that did not succeed because of an error
    pub fn failures(&self) -> impl Iterator<Item = &ResourceResult> {
        self.results.iter().filter(|r| r.status.is_failure())
    }

    /// `name: error` pairs for every failed entry
    pub fn errors(&self) -> Vec<String> {
        self.failures()
            .map(|r| {
                format!(
                    "{}: {}",
                    r.name,
                    r.error.as_deref().unwrap_or("unknown error")
                )
            })
            .collect()
    }

    /// One-line summary of the run
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{}: {} succeeded, {} failed, {} skipped",
            self.status, self.success_count, self.failed_count, self.skipped_count
        );
        if let Some(duration) = self.duration {
            let _ = write!(line, " in {:.1}s", duration.as_secs_f64());
        }
        line
    }

    /// Markdown rendering: one line per resource, then the error list
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Execution Result");
        let _ = writeln!(out);
        let _ = writeln!(out, "**Status:** {}", self.status);
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", self.summary());

        let _ = writeln!(out);
        let _ = writeln!(out, "## Resources");
        let _ = writeln!(out);
        if self.results.is_empty() {
            let _ = writeln!(out, "_No operations were executed_");
        }
        for result in &self.results {
            let _ = writeln!(out, "- {}", result.line());
        }

        let errors = self.errors();
        if !errors.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "## Errors");
            let _ = writeln!(out);
            for error in errors {
                let _ = writeln!(out, "- {error}");
            }
        }

        out
    }
}

impl Default for ExecutionResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Mutex-guarded [`ExecutionResult`] for appends from worker threads
#[derive(Debug, Clone, Default)]
pub struct SharedExecutionResult {
    inner: Arc<Mutex<ExecutionResult>>,
}

impl SharedExecutionResult {
    pub fn new(result: ExecutionResult) -> Self {
        Self {
            inner: Arc::new(Mutex::new(result)),
        }
    }

    /// Record one outcome; a poisoned lock still accepts the entry
    pub fn add_result(&self, result: ResourceResult) -> bool {
        match self.inner.lock() {
            Ok(mut locked) => locked.add_result(result),
            Err(poisoned) => poisoned.into_inner().add_result(result),
        }
    }

    /// Run a closure against the current aggregate
    pub fn with<T>(&self, f: impl FnOnce(&ExecutionResult) -> T) -> T {
        match self.inner.lock() {
            Ok(locked) => f(&locked),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    /// Finalize and return the aggregate
    pub fn finalize(self) -> ExecutionResult {
        let mut result = match Arc::try_unwrap(self.inner) {
            Ok(mutex) => mutex.into_inner().unwrap_or_else(PoisonError::into_inner),
            Err(shared) => {
                // Another handle is still alive; finalize a snapshot
                let snapshot = match shared.lock() {
                    Ok(locked) => locked.clone(),
                    Err(poisoned) => poisoned.into_inner().clone(),
                };
                snapshot
            }
        };
        result.finalize();
        result
    }
}
