//! # Reconcile
//!
//! Dependency resolution and state reconciliation for data-pipeline
//! project resources (datasets, recipes, scenarios).
//!
//! The crate computes; it never talks to a platform or touches disk.
//!
//! ## Core Concepts
//!
//! - **ResourceGraph**: producer/consumer edges inferred from recipe inputs and outputs
//! - **DependencyResolver**: deterministic execution order and parallel groups
//! - **State / diff**: set-based create/update/delete between two snapshots
//! - **ReconciliationPlan**: a previewable diff plus staged execution order
//! - **ExecutionResult**: per-resource outcomes aggregated into an overall status
//! - **Executor**: drives an [`Applier`] over a plan, stage by stage
//!
//! ## Example
//!
//! ```
//! use reconcile::{DependencyResolver, Resource};
//!
//! let resources = vec![
//!     Resource::recipe("A", Vec::<&str>::new(), vec!["X"]),
//!     Resource::recipe("B", vec!["X"], vec!["Y"]),
//!     Resource::recipe("C", vec!["X"], vec!["Z"]),
//! ];
//!
//! let resolver = DependencyResolver::new();
//! assert_eq!(resolver.resolve(&resources).unwrap(), vec!["A", "B", "C"]);
//! assert_eq!(
//!     resolver.execution_groups(&resources).unwrap(),
//!     vec![vec!["A"], vec!["B", "C"]]
//! );
//! ```
//!
//! ## Provider Traits
//!
//! - [`Applier`]: performs operations against the platform
//! - [`ProgressCallback`]: receives progress updates during an apply

pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
pub mod graph;
pub mod plan;
pub mod resolver;
pub mod resource;
pub mod result;
pub mod state;
pub mod types;

// Re-export main types at crate root
pub use context::{ApplyOutcome, ApplyRequest, Applier, NoProgress, ProgressCallback};
pub use diff::{Diff, DiffCounts, KindDiff, ResourceChange, diff};
pub use error::{Error, Result};
pub use executor::{ExecuteOptions, execute};
pub use graph::{NodeKey, OutputConflict, ResourceGraph};
pub use plan::{Operation, ReconciliationPlan, Stage};
pub use resolver::DependencyResolver;
pub use resource::{DatasetSpec, DependencyNode, RecipeSpec, Resource, ScenarioSpec};
pub use result::{ExecutionResult, ResourceResult, SharedExecutionResult};
pub use state::State;
pub use types::{ChangeType, Details, ExecutionStatus, OperationStatus, ResourceKind};
