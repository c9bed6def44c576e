//! Execution engine - applies a plan stage by stage
//!
//! Stages run in order. Operations inside a stage run on a rayon pool and
//! append their outcome to a shared [`ExecutionResult`]. An operation whose
//! producer did not succeed is recorded as skipped instead of attempted.

use crate::context::{ApplyOutcome, ApplyRequest, Applier, ProgressCallback};
use crate::error::{Error, Result};
use crate::plan::{Operation, ReconciliationPlan};
use crate::resource::Resource;
use crate::result::{ExecutionResult, ResourceResult, SharedExecutionResult};
use crate::types::{OperationStatus, ResourceKind};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// Options for an apply run
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Record every operation as skipped without calling the applier
    pub dry_run: bool,
    /// Worker threads per stage
    pub jobs: usize,
    /// Cancel every later stage once a stage has a failure
    pub fail_fast: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 4,
            fail_fast: false,
        }
    }
}

type Key = (ResourceKind, String);

/// Execute a plan with the given applier
///
/// Per-resource failures never surface as an `Err`; they are recorded in the
/// returned result, whose status is already finalized.
///
/// # Errors
///
/// Returns an error only if the worker pool cannot be created.
pub fn execute<A, P>(
    plan: &ReconciliationPlan,
    applier: &A,
    opts: &ExecuteOptions,
    progress: &mut P,
) -> Result<ExecutionResult>
where
    A: Applier,
    P: ProgressCallback,
{
    let shared = SharedExecutionResult::new(ExecutionResult::new());
    let stages = plan.execution_order();
    if stages.is_empty() {
        return Ok(shared.finalize());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.jobs.max(1))
        .build()
        .map_err(|e| Error::ThreadPool(e.to_string()))?;

    let resources: HashMap<(ResourceKind, &str), &Resource> = plan
        .resources()
        .iter()
        .map(|r| ((r.kind(), r.name()), r))
        .collect();

    let mut blocked: HashSet<Key> = HashSet::new();
    let mut cancelled = false;

    for stage in &stages {
        log::info!(
            "Stage '{}': {} operations",
            stage.label,
            stage.operations.len()
        );
        progress.on_stage_start(&stage.label, stage.operations.len());

        let mut runnable: Vec<&Operation> = Vec::with_capacity(stage.operations.len());
        let mut recorded: Vec<ResourceResult> = Vec::new();

        for op in &stage.operations {
            if cancelled {
                recorded.push(ResourceResult::cancelled(op.kind, &op.name, op.change_type));
            } else if let Some((kind, name)) = op.blocked_by.iter().find(|b| blocked.contains(*b)) {
                recorded.push(ResourceResult::skipped(
                    op.kind,
                    &op.name,
                    op.change_type,
                    format!("upstream {kind}.{name} did not succeed"),
                ));
            } else if opts.dry_run {
                recorded.push(ResourceResult::skipped(
                    op.kind,
                    &op.name,
                    op.change_type,
                    "dry run",
                ));
            } else {
                runnable.push(op);
            }
        }

        for result in &recorded {
            shared.add_result(result.clone());
        }

        let applied: Vec<ResourceResult> = pool.install(|| {
            runnable
                .par_iter()
                .map(|op| {
                    let result = run_operation(plan, &resources, applier, op);
                    shared.add_result(result.clone());
                    result
                })
                .collect()
        });

        let mut stage_failed = false;
        for result in recorded.iter().chain(applied.iter()) {
            progress.on_operation_complete(result);
            if result.status.is_failure() {
                stage_failed = true;
            }
            let dry_run_skip = opts.dry_run && result.status == OperationStatus::Skipped;
            if result.status != OperationStatus::Success && !dry_run_skip {
                blocked.insert((result.kind, result.name.clone()));
            }
        }

        progress.on_stage_complete();

        if stage_failed && opts.fail_fast && !cancelled {
            log::warn!(
                "Stage '{}' failed; cancelling remaining stages",
                stage.label
            );
            cancelled = true;
        }
    }

    let result = shared.finalize();
    log::info!("{}", result.summary());
    Ok(result)
}

/// Apply a single operation, converting errors into a failed result
fn run_operation<A: Applier>(
    plan: &ReconciliationPlan,
    resources: &HashMap<(ResourceKind, &str), &Resource>,
    applier: &A,
    op: &Operation,
) -> ResourceResult {
    let request = ApplyRequest {
        operation: op,
        resource: resources.get(&(op.kind, op.name.as_str())).copied(),
        change: plan.diff().change(op.kind, &op.name),
    };

    log::debug!("{} {}.{}", op.change_type, op.kind, op.name);
    let started = Instant::now();
    let outcome = applier.apply(&request);
    let elapsed = started.elapsed();

    let result = match outcome {
        Ok(ApplyOutcome::Applied { message }) => {
            let result = ResourceResult::success(op.kind, &op.name, op.change_type);
            match message {
                Some(message) => result.with_message(message),
                None => result,
            }
        }
        Ok(ApplyOutcome::Partial { message }) => {
            ResourceResult::success(op.kind, &op.name, op.change_type)
                .with_status(OperationStatus::Partial)
                .with_message(message)
        }
        Err(e) => ResourceResult::failed(op.kind, &op.name, op.change_type, format!("{e:#}")),
    };

    log::debug!("{}", result.line());
    result.with_duration(elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NoProgress;
    use crate::resolver::DependencyResolver;
    use crate::state::State;
    use crate::types::{ChangeType, ExecutionStatus};
    use std::sync::Mutex;

    /// Applier that fails for a fixed set of names and records call order
    struct MockApplier {
        failing: HashSet<String>,
        calls: Mutex<Vec<String>>,
    }

    impl MockApplier {
        fn failing(names: &[&str]) -> Self {
            Self {
                failing: names.iter().map(|n| n.to_string()).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Applier for MockApplier {
        fn apply(&self, request: &ApplyRequest<'_>) -> anyhow::Result<ApplyOutcome> {
            let name = request.operation.name.clone();
            self.calls.lock().unwrap().push(name.clone());
            if self.failing.contains(&name) {
                anyhow::bail!("platform rejected {name}");
            }
            Ok(ApplyOutcome::Applied { message: None })
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        stages: Vec<String>,
        completed: usize,
    }

    impl ProgressCallback for RecordingProgress {
        fn on_stage_start(&mut self, label: &str, _count: usize) {
            self.stages.push(label.to_string());
        }
        fn on_operation_complete(&mut self, _result: &ResourceResult) {
            self.completed += 1;
        }
        fn on_stage_complete(&mut self) {}
    }

    fn pipeline() -> ReconciliationPlan {
        let resources = vec![
            Resource::dataset("raw"),
            Resource::dataset("clean"),
            Resource::dataset("report"),
            Resource::dataset("other"),
            Resource::recipe("prepare", ["raw"], ["clean"]),
            Resource::recipe("summarize", ["clean"], ["report"]),
            Resource::recipe("side", ["raw"], ["other"]),
        ];
        ReconciliationPlan::build(resources, &State::new(), &DependencyResolver::new()).unwrap()
    }

    fn status_of(result: &ExecutionResult, name: &str) -> OperationStatus {
        result
            .results()
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.status)
            .unwrap()
    }

    #[test]
    fn test_execute_empty_plan() {
        let plan =
            ReconciliationPlan::build(Vec::new(), &State::new(), &DependencyResolver::new())
                .unwrap();
        let applier = MockApplier::failing(&[]);
        let result =
            execute(&plan, &applier, &ExecuteOptions::default(), &mut NoProgress).unwrap();

        assert!(result.is_empty());
        assert_eq!(result.status(), ExecutionStatus::Success);
    }

    #[test]
    fn test_execute_all_succeed_in_order() {
        let plan = pipeline();
        let applier = MockApplier::failing(&[]);
        let mut progress = RecordingProgress::default();
        let result = execute(&plan, &applier, &ExecuteOptions::default(), &mut progress).unwrap();

        assert_eq!(result.status(), ExecutionStatus::Success);
        assert_eq!(result.success_count(), 7);
        assert_eq!(progress.completed, 7);
        assert_eq!(
            progress.stages,
            vec!["datasets", "recipes (level 0)", "recipes (level 1)"]
        );

        let calls = applier.calls();
        let pos = |n: &str| calls.iter().position(|c| c == n).unwrap();
        assert!(pos("clean") < pos("prepare"));
        assert!(pos("prepare") < pos("summarize"));
    }

    #[test]
    fn test_failed_producer_skips_consumer() {
        let plan = pipeline();
        let applier = MockApplier::failing(&["prepare"]);
        let result =
            execute(&plan, &applier, &ExecuteOptions::default(), &mut NoProgress).unwrap();

        assert_eq!(status_of(&result, "prepare"), OperationStatus::Failed);
        assert_eq!(status_of(&result, "summarize"), OperationStatus::Skipped);
        assert_eq!(status_of(&result, "side"), OperationStatus::Success);
        assert_eq!(result.status(), ExecutionStatus::Partial);
        assert!(!applier.calls().contains(&"summarize".to_string()));
        assert_eq!(
            result.errors(),
            vec!["prepare: platform rejected prepare".to_string()]
        );
    }

    #[test]
    fn test_failed_dataset_skips_readers() {
        let plan = pipeline();
        let applier = MockApplier::failing(&["raw"]);
        let result =
            execute(&plan, &applier, &ExecuteOptions::default(), &mut NoProgress).unwrap();

        assert_eq!(status_of(&result, "prepare"), OperationStatus::Skipped);
        assert_eq!(status_of(&result, "side"), OperationStatus::Skipped);
        assert_eq!(status_of(&result, "summarize"), OperationStatus::Skipped);
    }

    #[test]
    fn test_dry_run_never_calls_applier() {
        let plan = pipeline();
        let applier = MockApplier::failing(&[]);
        let opts = ExecuteOptions {
            dry_run: true,
            ..Default::default()
        };
        let result = execute(&plan, &applier, &opts, &mut NoProgress).unwrap();

        assert!(applier.calls().is_empty());
        assert_eq!(result.skipped_count(), 7);
        assert!(
            result
                .results()
                .iter()
                .all(|r| r.message.as_deref() == Some("dry run"))
        );
        assert_eq!(result.status(), ExecutionStatus::Success);
    }

    #[test]
    fn test_fail_fast_cancels_later_stages() {
        let plan = pipeline();
        let applier = MockApplier::failing(&["other"]);
        let opts = ExecuteOptions {
            fail_fast: true,
            ..Default::default()
        };
        let result = execute(&plan, &applier, &opts, &mut NoProgress).unwrap();

        assert_eq!(status_of(&result, "other"), OperationStatus::Failed);
        assert_eq!(status_of(&result, "prepare"), OperationStatus::Cancelled);
        assert_eq!(status_of(&result, "summarize"), OperationStatus::Cancelled);
        assert_eq!(result.status(), ExecutionStatus::Partial);
    }

    #[test]
    fn test_deletes_run_after_upserts() {
        let current = State::new()
            .with(ResourceKind::Dataset, "legacy")
            .with(ResourceKind::Recipe, "old_job");
        let plan = ReconciliationPlan::build(
            vec![Resource::dataset("fresh")],
            &current,
            &DependencyResolver::new(),
        )
        .unwrap();
        let applier = MockApplier::failing(&[]);
        let result =
            execute(&plan, &applier, &ExecuteOptions::default(), &mut NoProgress).unwrap();

        assert_eq!(applier.calls(), vec!["fresh", "old_job", "legacy"]);
        let ops: Vec<ChangeType> = result.results().iter().map(|r| r.operation).collect();
        assert_eq!(
            ops,
            vec![ChangeType::Create, ChangeType::Delete, ChangeType::Delete]
        );
    }
}
