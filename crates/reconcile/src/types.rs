//! Core types shared by the graph, diff, and result modules

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Arbitrary key/value properties recorded for one resource
pub type Details = BTreeMap<String, serde_json::Value>;

/// The three kinds of project resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Dataset,
    Recipe,
    Scenario,
}

impl ResourceKind {
    /// All kinds, in the order they are created during an apply
    pub const ALL: [ResourceKind; 3] = [Self::Dataset, Self::Recipe, Self::Scenario];

    /// Singular name, as used in configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dataset => "dataset",
            Self::Recipe => "recipe",
            Self::Scenario => "scenario",
        }
    }

    /// Plural heading used in rendered reports
    pub fn plural(&self) -> &'static str {
        match self {
            Self::Dataset => "Datasets",
            Self::Recipe => "Recipes",
            Self::Scenario => "Scenarios",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What needs to happen to a resource to reach the desired state
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Create,
    Update,
    Delete,
}

impl ChangeType {
    /// Diff-style marker
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Create => "+",
            Self::Update => "~",
            Self::Delete => "-",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => f.write_str("create"),
            Self::Update => f.write_str("update"),
            Self::Delete => f.write_str("delete"),
        }
    }
}

/// Outcome of a single apply operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Success,
    Failed,
    Cancelled,
    /// Operation ran but only part of it took effect
    Partial,
    /// Operation was not attempted (dry run or failed producer)
    Skipped,
}

impl OperationStatus {
    /// Status marker used in one-line result renders
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Success => "✓",
            Self::Failed => "✗",
            Self::Cancelled => "⊗",
            Self::Partial => "◐",
            Self::Skipped => "⊘",
        }
    }

    /// Whether this status counts towards the failed total
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Partial)
    }

    /// Whether this status counts towards the skipped total
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skipped | Self::Cancelled)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Failed => f.write_str("failed"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::Partial => f.write_str("partial"),
            Self::Skipped => f.write_str("skipped"),
        }
    }
}

/// Overall status of an apply run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// Run has not been finalized yet
    Running,
    Success,
    Failed,
    /// Mixed success and failure
    Partial,
}

impl ExecutionStatus {
    /// Check if the run finished without any failure
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => f.write_str("RUNNING"),
            Self::Success => f.write_str("SUCCESS"),
            Self::Failed => f.write_str("FAILED"),
            Self::Partial => f.write_str("PARTIAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serializes_lowercase() {
        let json = serde_json::to_string(&ResourceKind::Scenario).unwrap();
        assert_eq!(json, "\"scenario\"");
        let kind: ResourceKind = serde_json::from_str("\"recipe\"").unwrap();
        assert_eq!(kind, ResourceKind::Recipe);
    }

    #[test]
    fn test_status_classification() {
        assert!(OperationStatus::Failed.is_failure());
        assert!(OperationStatus::Partial.is_failure());
        assert!(!OperationStatus::Success.is_failure());
        assert!(OperationStatus::Cancelled.is_skip());
        assert!(OperationStatus::Skipped.is_skip());
        assert!(!OperationStatus::Failed.is_skip());
    }
}
