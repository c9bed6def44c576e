//! Reconciliation plans - a previewable snapshot of pending changes

use crate::diff::{Diff, DiffCounts, diff};
use crate::error::Result;
use crate::resolver::DependencyResolver;
use crate::resource::{DependencyNode, RecipeSpec, Resource};
use crate::state::State;
use crate::types::{ChangeType, ResourceKind};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::time::Duration;

/// A single create/update/delete to perform during an apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Operation {
    pub kind: ResourceKind,
    pub name: String,
    pub change_type: ChangeType,
    /// Resources that must succeed before this operation may run
    pub blocked_by: Vec<(ResourceKind, String)>,
}

impl Operation {
    fn new(kind: ResourceKind, name: &str, change_type: ChangeType) -> Self {
        Self {
            kind,
            name: name.to_string(),
            change_type,
            blocked_by: Vec::new(),
        }
    }
}

/// Operations that may run concurrently
///
/// Every operation in a stage must finish before the next stage starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stage {
    pub label: String,
    pub operations: Vec<Operation>,
}

/// An immutable preview of the changes needed to reach the configuration
#[derive(Debug, Clone)]
pub struct ReconciliationPlan {
    resources: Vec<Resource>,
    diff: Diff,
    recipe_groups: Vec<Vec<String>>,
    created_at: DateTime<Utc>,
    estimated_duration: Option<Duration>,
}

impl ReconciliationPlan {
    /// Plan the changes that take `current` to the configured `resources`
    ///
    /// # Errors
    ///
    /// Fails when the recipes cannot be ordered. No partial plan is returned.
    pub fn build(
        resources: Vec<Resource>,
        current: &State,
        resolver: &DependencyResolver,
    ) -> Result<Self> {
        let desired = State::from_resources(&resources);
        let changes = diff(current, &desired);
        Self::new(resources, changes, resolver)
    }

    /// Wrap an already computed diff
    pub fn new(resources: Vec<Resource>, diff: Diff, resolver: &DependencyResolver) -> Result<Self> {
        let recipes: Vec<&RecipeSpec> = resources.iter().filter_map(Resource::as_recipe).collect();
        let recipe_groups = resolver.execution_groups(&recipes)?;

        Ok(Self {
            resources,
            diff,
            recipe_groups,
            created_at: Utc::now(),
            estimated_duration: None,
        })
    }

    /// Attach a duration estimate
    pub fn with_estimate(mut self, duration: Duration) -> Self {
        self.estimated_duration = Some(duration);
        self
    }

    /// The configured resources this plan converges to
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn diff(&self) -> &Diff {
        &self.diff
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn estimated_duration(&self) -> Option<Duration> {
        self.estimated_duration
    }

    /// Recipe execution groups, by increasing level
    pub fn recipe_groups(&self) -> &[Vec<String>] {
        &self.recipe_groups
    }

    pub fn has_changes(&self) -> bool {
        !self.diff.is_empty()
    }

    pub fn counts(&self) -> DiffCounts {
        self.diff.counts()
    }

    /// Staged operations for an apply run
    ///
    /// Datasets are created first, then recipes level by level, then
    /// scenarios. Deletes run last in the opposite direction so nothing
    /// is removed while something that reads it still exists.
    pub fn execution_order(&self) -> Vec<Stage> {
        let mut stages = Vec::new();
        let upserts = |kind: ResourceKind| -> Vec<Operation> {
            let kd = self.diff.kind(kind);
            let mut ops: Vec<Operation> = kd
                .create
                .iter()
                .map(|n| Operation::new(kind, n, ChangeType::Create))
                .chain(
                    kd.update
                        .iter()
                        .map(|n| Operation::new(kind, n, ChangeType::Update)),
                )
                .collect();
            ops.sort_by(|a, b| a.name.cmp(&b.name));
            ops
        };

        push_stage(&mut stages, "datasets", upserts(ResourceKind::Dataset));

        let recipe_ops: BTreeMap<String, Operation> = upserts(ResourceKind::Recipe)
            .into_iter()
            .map(|op| (op.name.clone(), op))
            .collect();
        let blockers = self.recipe_blockers();

        for (level, group) in self.recipe_groups.iter().enumerate() {
            let ops = group
                .iter()
                .filter_map(|name| recipe_ops.get(name))
                .cloned()
                .map(|mut op| {
                    op.blocked_by = blockers.get(&op.name).cloned().unwrap_or_default();
                    op
                })
                .collect();
            push_stage(&mut stages, &format!("recipes (level {level})"), ops);
        }

        push_stage(&mut stages, "scenarios", upserts(ResourceKind::Scenario));

        for kind in [
            ResourceKind::Scenario,
            ResourceKind::Recipe,
            ResourceKind::Dataset,
        ] {
            let ops = self
                .diff
                .delete(kind)
                .iter()
                .map(|n| Operation::new(kind, n, ChangeType::Delete))
                .collect();
            push_stage(&mut stages, &format!("delete {}", kind.plural().to_lowercase()), ops);
        }

        stages
    }

    /// For each recipe, the datasets and producer recipes it reads from
    fn recipe_blockers(&self) -> BTreeMap<String, Vec<(ResourceKind, String)>> {
        let recipes: Vec<&RecipeSpec> = self.resources.iter().filter_map(Resource::as_recipe).collect();
        let datasets: BTreeSet<&str> = self
            .resources
            .iter()
            .filter(|r| r.kind() == ResourceKind::Dataset)
            .map(Resource::name)
            .collect();
        let graph = crate::graph::ResourceGraph::build(&recipes);

        recipes
            .iter()
            .map(|recipe| {
                let mut blockers: Vec<(ResourceKind, String)> = recipe
                    .inputs()
                    .iter()
                    .filter(|input| datasets.contains(input.as_str()))
                    .map(|input| (ResourceKind::Dataset, input.clone()))
                    .collect();
                blockers.extend(
                    graph
                        .producers(&recipe.name)
                        .into_iter()
                        .map(|p| (ResourceKind::Recipe, p.to_string())),
                );
                blockers.sort();
                blockers.dedup();
                (recipe.name.clone(), blockers)
            })
            .collect()
    }

    /// One-line summary of pending changes
    pub fn summary(&self) -> String {
        let counts = self.counts();
        if counts.total() == 0 {
            return "No changes. Project matches the configuration.".to_string();
        }
        format!(
            "Plan: {} to create, {} to update, {} to delete.",
            counts.create, counts.update, counts.delete
        )
    }

    /// Markdown rendering with one section per kind and a totals table
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Reconciliation Plan");
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Generated: {}",
            self.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        );

        for kind in ResourceKind::ALL {
            let _ = writeln!(out);
            let _ = writeln!(out, "## {}", kind.plural());
            let kd = self.diff.kind(kind);
            if kd.is_empty() {
                let _ = writeln!(out);
                let _ = writeln!(out, "_No changes_");
                continue;
            }

            for change_type in [ChangeType::Create, ChangeType::Update, ChangeType::Delete] {
                let names = kd.names(change_type);
                if names.is_empty() {
                    continue;
                }
                let _ = writeln!(out);
                let _ = writeln!(out, "### {}", capitalize(&change_type.to_string()));
                let _ = writeln!(out);
                for name in names {
                    let _ = writeln!(out, "- `{}` {}", change_type.symbol(), name);
                }
            }
        }

        let counts = self.counts();
        let _ = writeln!(out);
        let _ = writeln!(out, "## Totals");
        let _ = writeln!(out);
        let _ = writeln!(out, "| Change | Count |");
        let _ = writeln!(out, "|--------|-------|");
        let _ = writeln!(out, "| Create | {} |", counts.create);
        let _ = writeln!(out, "| Update | {} |", counts.update);
        let _ = writeln!(out, "| Delete | {} |", counts.delete);
        let _ = writeln!(out, "| **Total** | {} |", counts.total());

        if let Some(estimate) = self.estimated_duration {
            let _ = writeln!(out);
            let _ = writeln!(out, "Estimated duration: {}s", estimate.as_secs());
        }

        out
    }
}

fn push_stage(stages: &mut Vec<Stage>, label: &str, operations: Vec<Operation>) {
    if !operations.is_empty() {
        stages.push(Stage {
            label: label.to_string(),
            operations,
        });
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn project() -> Vec<Resource> {
        vec![
            Resource::dataset("raw"),
            Resource::dataset("clean"),
            Resource::dataset("report"),
            Resource::recipe("prepare", ["raw"], ["clean"]),
            Resource::recipe("summarize", ["clean"], ["report"]),
            Resource::scenario("nightly"),
        ]
    }

    #[test]
    fn test_fresh_project_creates_everything() {
        let plan =
            ReconciliationPlan::build(project(), &State::new(), &DependencyResolver::new()).unwrap();

        assert!(plan.has_changes());
        assert_eq!(plan.counts().create, 6);
        assert_eq!(plan.summary(), "Plan: 6 to create, 0 to update, 0 to delete.");
        assert_eq!(
            plan.recipe_groups(),
            &[vec!["prepare".to_string()], vec!["summarize".to_string()]]
        );
    }

    #[test]
    fn test_execution_order_stages() {
        let current = State::new()
            .with(ResourceKind::Dataset, "raw")
            .with(ResourceKind::Dataset, "legacy")
            .with(ResourceKind::Recipe, "old_job");
        let plan = ReconciliationPlan::build(project(), &current, &DependencyResolver::new()).unwrap();

        let order = plan.execution_order();
        let labels: Vec<&str> = order
            .iter()
            .map(|s| s.label.as_str())
            .collect();
        assert_eq!(
            labels,
            vec![
                "datasets",
                "recipes (level 0)",
                "recipes (level 1)",
                "scenarios",
                "delete recipes",
                "delete datasets",
            ]
        );

        let stages = plan.execution_order();
        let datasets = &stages[0].operations;
        assert_eq!(datasets.len(), 3);
        assert_eq!(datasets[2].name, "report");
        assert_eq!(datasets[1].change_type, ChangeType::Update);

        let summarize = &stages[2].operations[0];
        assert_eq!(
            summarize.blocked_by,
            vec![
                (ResourceKind::Dataset, "clean".to_string()),
                (ResourceKind::Recipe, "prepare".to_string()),
            ]
        );
    }

    #[test]
    fn test_cycle_aborts_planning() {
        let resources = vec![
            Resource::recipe("A", ["Y"], ["X"]),
            Resource::recipe("B", ["X"], ["Y"]),
        ];
        let err = ReconciliationPlan::build(resources, &State::new(), &DependencyResolver::new())
            .unwrap_err();
        assert!(matches!(err, Error::CircularDependency { .. }));
    }

    #[test]
    fn test_no_changes_summary() {
        let plan = ReconciliationPlan::build(Vec::new(), &State::new(), &DependencyResolver::new())
            .unwrap();
        assert!(!plan.has_changes());
        assert!(plan.execution_order().is_empty());
        assert!(plan.summary().starts_with("No changes"));
    }

    #[test]
    fn test_markdown_sections() {
        let current = State::new().with(ResourceKind::Dataset, "legacy");
        let plan = ReconciliationPlan::build(
            vec![Resource::dataset("orders")],
            &current,
            &DependencyResolver::new(),
        )
        .unwrap()
        .with_estimate(Duration::from_secs(30));

        let md = plan.to_markdown();
        assert!(md.contains("## Datasets"));
        assert!(md.contains("### Create\n\n- `+` orders"));
        assert!(md.contains("### Delete\n\n- `-` legacy"));
        assert!(md.contains("## Recipes\n\n_No changes_"));
        assert!(md.contains("| **Total** | 2 |"));
        assert!(md.contains("Estimated duration: 30s"));
    }
}
