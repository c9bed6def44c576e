//! Point-in-time snapshots of project resources
//!
//! A [`State`] is either the current state observed on the platform or the
//! desired state derived from configuration. It records which names exist
//! for each kind and an optional property payload per resource.

use crate::resource::Resource;
use crate::types::{Details, ResourceKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Resource names partitioned by kind, plus per-resource details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    #[serde(default)]
    datasets: BTreeSet<String>,
    #[serde(default)]
    recipes: BTreeSet<String>,
    #[serde(default)]
    scenarios: BTreeSet<String>,
    #[serde(default)]
    details: BTreeMap<ResourceKind, BTreeMap<String, Details>>,
}

impl State {
    /// An empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Desired state for a list of configured resources
    pub fn from_resources(resources: &[Resource]) -> Self {
        resources.iter().fold(Self::new(), |state, resource| {
            state.with_details(resource.kind(), resource.name(), resource.details())
        })
    }

    /// Add a resource without any recorded details
    pub fn with(mut self, kind: ResourceKind, name: impl Into<String>) -> Self {
        self.insert(kind, name.into(), None);
        self
    }

    /// Add a resource together with its details
    pub fn with_details(
        mut self,
        kind: ResourceKind,
        name: impl Into<String>,
        details: Details,
    ) -> Self {
        self.insert(kind, name.into(), Some(details));
        self
    }

    /// Record a resource, replacing any details already stored for it
    pub fn insert(&mut self, kind: ResourceKind, name: String, details: Option<Details>) {
        match details {
            Some(details) => {
                self.details
                    .entry(kind)
                    .or_default()
                    .insert(name.clone(), details);
            }
            None => {
                if let Some(by_name) = self.details.get_mut(&kind) {
                    by_name.remove(&name);
                }
            }
        }
        self.names_mut(kind).insert(name);
    }

    /// Remove a resource and its details, returning whether it existed
    pub fn remove(&mut self, kind: ResourceKind, name: &str) -> bool {
        if let Some(by_name) = self.details.get_mut(&kind) {
            by_name.remove(name);
        }
        self.names_mut(kind).remove(name)
    }

    /// Names recorded for one kind
    pub fn names(&self, kind: ResourceKind) -> &BTreeSet<String> {
        match kind {
            ResourceKind::Dataset => &self.datasets,
            ResourceKind::Recipe => &self.recipes,
            ResourceKind::Scenario => &self.scenarios,
        }
    }

    fn names_mut(&mut self, kind: ResourceKind) -> &mut BTreeSet<String> {
        match kind {
            ResourceKind::Dataset => &mut self.datasets,
            ResourceKind::Recipe => &mut self.recipes,
            ResourceKind::Scenario => &mut self.scenarios,
        }
    }

    pub fn contains(&self, kind: ResourceKind, name: &str) -> bool {
        self.names(kind).contains(name)
    }

    /// Recorded details for a resource, if any
    pub fn details(&self, kind: ResourceKind, name: &str) -> Option<&Details> {
        self.details.get(&kind).and_then(|by_name| by_name.get(name))
    }

    /// Total number of resources across all kinds
    pub fn len(&self) -> usize {
        self.datasets.len() + self.recipes.len() + self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_resources_partitions_by_kind() {
        let state = State::from_resources(&[
            Resource::dataset("orders"),
            Resource::recipe("clean", ["orders"], ["orders_clean"]),
            Resource::scenario("nightly"),
        ]);

        assert_eq!(state.len(), 3);
        assert!(state.contains(ResourceKind::Dataset, "orders"));
        assert!(state.contains(ResourceKind::Recipe, "clean"));
        assert!(state.contains(ResourceKind::Scenario, "nightly"));
        assert!(!state.contains(ResourceKind::Dataset, "clean"));
        assert!(state.details(ResourceKind::Recipe, "clean").is_some());
    }

    #[test]
    fn test_same_name_different_kinds() {
        let state = State::new()
            .with(ResourceKind::Dataset, "orders")
            .with(ResourceKind::Scenario, "orders");

        assert_eq!(state.len(), 2);
        assert_eq!(state.names(ResourceKind::Dataset).len(), 1);
    }

    #[test]
    fn test_remove_clears_details() {
        let mut details = Details::new();
        details.insert("type".into(), serde_json::json!("sql"));
        let mut state = State::new().with_details(ResourceKind::Recipe, "r", details);

        assert!(state.remove(ResourceKind::Recipe, "r"));
        assert!(!state.remove(ResourceKind::Recipe, "r"));
        assert!(state.details(ResourceKind::Recipe, "r").is_none());
        assert!(state.is_empty());
    }

    #[test]
    fn test_json_roundtrip_keeps_details() {
        let state = State::from_resources(&[Resource::dataset("orders")]);
        let json = serde_json::to_string(&state).unwrap();
        let back: State = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
