//! Local applier - converges the state file instead of a remote platform

use anyhow::Result;
use reconcile::{ApplyOutcome, ApplyRequest, Applier, ChangeType, State};
use std::sync::{Mutex, PoisonError};

/// Applies operations to an in-memory copy of the recorded state
///
/// Only operations that succeed change the state, so the file written after
/// a partial run still describes what actually exists.
pub struct LocalApplier {
    state: Mutex<State>,
}

impl LocalApplier {
    pub fn new(current: State) -> Self {
        Self {
            state: Mutex::new(current),
        }
    }

    /// The state after every applied operation
    pub fn into_state(self) -> State {
        self.state.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Applier for LocalApplier {
    fn apply(&self, request: &ApplyRequest<'_>) -> Result<ApplyOutcome> {
        let op = request.operation;
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        match op.change_type {
            ChangeType::Create | ChangeType::Update => {
                let resource = request.resource.ok_or_else(|| {
                    anyhow::anyhow!("No configuration for {}.{}", op.kind, op.name)
                })?;
                let message = match (op.change_type, request.change) {
                    (ChangeType::Update, Some(change)) if !change.has_drift() => {
                        Some("in sync".to_string())
                    }
                    (ChangeType::Update, Some(change)) => {
                        Some(format!("changed {}", change.changed_keys().join(", ")))
                    }
                    _ => None,
                };
                state.insert(op.kind, op.name.clone(), Some(resource.details()));
                Ok(ApplyOutcome::Applied { message })
            }
            ChangeType::Delete => {
                if !state.remove(op.kind, &op.name) {
                    anyhow::bail!("{} '{}' is not recorded in state", op.kind, op.name);
                }
                Ok(ApplyOutcome::Applied { message: None })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::{
        DependencyResolver, ExecuteOptions, ExecutionStatus, NoProgress, ReconciliationPlan,
        Resource, ResourceKind, execute,
    };

    #[test]
    fn test_apply_converges_state() {
        let current = State::new()
            .with(ResourceKind::Dataset, "orders")
            .with(ResourceKind::Dataset, "legacy");
        let resources = vec![
            Resource::dataset("orders"),
            Resource::dataset("orders_clean"),
            Resource::recipe("clean", ["orders"], ["orders_clean"]),
        ];
        let desired = State::from_resources(&resources);
        let plan =
            ReconciliationPlan::build(resources, &current, &DependencyResolver::new()).unwrap();

        let applier = LocalApplier::new(current);
        let result =
            execute(&plan, &applier, &ExecuteOptions::default(), &mut NoProgress).unwrap();

        assert_eq!(result.status(), ExecutionStatus::Success);
        assert_eq!(applier.into_state(), desired);
    }

    #[test]
    fn test_second_apply_is_in_sync() {
        let resources = vec![Resource::dataset("orders")];
        let current = State::from_resources(&resources);
        let plan =
            ReconciliationPlan::build(resources, &current, &DependencyResolver::new()).unwrap();

        let applier = LocalApplier::new(current);
        let result =
            execute(&plan, &applier, &ExecuteOptions::default(), &mut NoProgress).unwrap();

        assert_eq!(result.results()[0].operation, ChangeType::Update);
        assert_eq!(result.results()[0].message.as_deref(), Some("in sync"));
    }

    #[test]
    fn test_delete_of_unrecorded_resource_fails() {
        let applier = LocalApplier::new(State::new());
        let current = State::new().with(ResourceKind::Scenario, "ghost");
        let plan =
            ReconciliationPlan::build(Vec::new(), &current, &DependencyResolver::new()).unwrap();

        let result =
            execute(&plan, &applier, &ExecuteOptions::default(), &mut NoProgress).unwrap();

        assert_eq!(result.status(), ExecutionStatus::Failed);
        assert_eq!(
            result.errors(),
            vec!["ghost: scenario 'ghost' is not recorded in state".to_string()]
        );
    }
}
