//! Resource definitions for data-pipeline projects
//!
//! A project is made of three kinds of resource. Datasets hold data,
//! recipes transform input datasets into output datasets, and scenarios
//! schedule work. Only recipes declare data-flow relationships, so only
//! recipes produce edges in the dependency graph.

use crate::types::{Details, ResourceKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Anything that can be placed in a dependency graph
///
/// The graph only needs a name that is unique within its kind and the
/// declared data-flow relationships. Implementations return empty slices
/// when the node neither reads nor writes anything.
pub trait DependencyNode {
    /// Name of this node, unique within its kind
    fn name(&self) -> &str;

    fn kind(&self) -> ResourceKind;

    /// Names this node reads from
    fn inputs(&self) -> &[String];

    /// Names this node writes to
    fn outputs(&self) -> &[String];
}

/// A dataset definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSpec {
    pub name: String,
    /// Storage type (e.g. "filesystem", "snowflake", "managed")
    #[serde(rename = "type", default = "default_dataset_type")]
    pub dataset_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Details::is_empty")]
    pub params: Details,
}

fn default_dataset_type() -> String {
    "managed".to_string()
}

/// A recipe definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeSpec {
    pub name: String,
    /// Engine type (e.g. "python", "sql", "sync")
    #[serde(rename = "type")]
    pub recipe_type: String,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Details::is_empty")]
    pub params: Details,
}

/// A scenario definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Trigger expressions (cron schedules or dataset-change triggers)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<String>,
    /// Names of the recipes or datasets built by this scenario
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<String>,
}

fn default_active() -> bool {
    true
}

/// A managed project resource, one variant per kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Resource {
    Dataset(DatasetSpec),
    Recipe(RecipeSpec),
    Scenario(ScenarioSpec),
}

impl Resource {
    /// Create a managed dataset with no extra properties
    pub fn dataset(name: impl Into<String>) -> Self {
        Self::Dataset(DatasetSpec {
            name: name.into(),
            dataset_type: default_dataset_type(),
            connection: None,
            path: None,
            params: Details::new(),
        })
    }

    /// Create a python recipe reading `inputs` and writing `outputs`
    pub fn recipe<I, O, S>(name: impl Into<String>, inputs: I, outputs: O) -> Self
    where
        I: IntoIterator<Item = S>,
        O: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Recipe(RecipeSpec {
            name: name.into(),
            recipe_type: "python".to_string(),
            inputs: inputs.into_iter().map(Into::into).collect(),
            outputs: outputs.into_iter().map(Into::into).collect(),
            code: None,
            params: Details::new(),
        })
    }

    /// Create an active scenario with no triggers
    pub fn scenario(name: impl Into<String>) -> Self {
        Self::Scenario(ScenarioSpec {
            name: name.into(),
            active: true,
            triggers: Vec::new(),
            steps: Vec::new(),
        })
    }

    /// Unique name within this resource's kind
    pub fn name(&self) -> &str {
        match self {
            Self::Dataset(d) => &d.name,
            Self::Recipe(r) => &r.name,
            Self::Scenario(s) => &s.name,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Dataset(_) => ResourceKind::Dataset,
            Self::Recipe(_) => ResourceKind::Recipe,
            Self::Scenario(_) => ResourceKind::Scenario,
        }
    }

    /// The recipe definition, if this is a recipe
    pub fn as_recipe(&self) -> Option<&RecipeSpec> {
        match self {
            Self::Recipe(r) => Some(r),
            _ => None,
        }
    }

    /// Property payload recorded in a [`State`](crate::State)
    ///
    /// Every serialized field except the name.
    pub fn details(&self) -> Details {
        let value = match self {
            Self::Dataset(d) => serde_json::to_value(d),
            Self::Recipe(r) => serde_json::to_value(r),
            Self::Scenario(s) => serde_json::to_value(s),
        };

        match value {
            Ok(serde_json::Value::Object(map)) => {
                map.into_iter().filter(|(k, _)| k != "name").collect()
            }
            _ => Details::new(),
        }
    }
}

impl DependencyNode for Resource {
    fn name(&self) -> &str {
        Resource::name(self)
    }

    fn kind(&self) -> ResourceKind {
        Resource::kind(self)
    }

    fn inputs(&self) -> &[String] {
        match self {
            Self::Recipe(r) => &r.inputs,
            _ => &[],
        }
    }

    fn outputs(&self) -> &[String] {
        match self {
            Self::Recipe(r) => &r.outputs,
            _ => &[],
        }
    }
}

impl DependencyNode for RecipeSpec {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Recipe
    }

    fn inputs(&self) -> &[String] {
        &self.inputs
    }

    fn outputs(&self) -> &[String] {
        &self.outputs
    }
}

impl<T: DependencyNode + ?Sized> DependencyNode for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn kind(&self) -> ResourceKind {
        (**self).kind()
    }

    fn inputs(&self) -> &[String] {
        (**self).inputs()
    }

    fn outputs(&self) -> &[String] {
        (**self).outputs()
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind(), self.name())
    }
}
