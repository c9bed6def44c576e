//! Project configuration - the desired set of resources
//!
//! Loaded from `flowplan.toml` (or a `.json` file with the same shape):
//!
//! ```toml
//! [project]
//! key = "SALES"
//!
//! [[datasets]]
//! name = "orders"
//! type = "snowflake"
//! connection = "warehouse"
//!
//! [[recipes]]
//! name = "clean_orders"
//! type = "sql"
//! inputs = ["orders"]
//! outputs = ["orders_clean"]
//!
//! [[scenarios]]
//! name = "nightly"
//! triggers = ["cron: 0 2 * * *"]
//! steps = ["clean_orders"]
//! ```

use anyhow::{Context, Result};
use reconcile::{DatasetSpec, DependencyResolver, RecipeSpec, Resource, ResourceKind, ScenarioSpec};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::Path;
use thiserror::Error;

// ============================================================================
// Schema
// ============================================================================

/// The project configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub project: ProjectMeta,
    #[serde(default)]
    pub datasets: Vec<DatasetSpec>,
    #[serde(default)]
    pub recipes: Vec<RecipeSpec>,
    #[serde(default)]
    pub scenarios: Vec<ScenarioSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMeta {
    #[serde(default = "default_project_key")]
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Default for ProjectMeta {
    fn default() -> Self {
        Self {
            key: default_project_key(),
            description: None,
        }
    }
}

fn default_project_key() -> String {
    "default".to_string()
}

/// Supported configuration formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Pick a format from the file extension, defaulting to TOML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl ProjectConfig {
    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;
        let format = ConfigFormat::from_path(path);
        log::debug!("Loading {:?} config from {}", format, path.display());

        Self::parse(&content, format)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parse configuration text
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        match format {
            ConfigFormat::Toml => toml::from_str(content).context("Invalid TOML format"),
            ConfigFormat::Json => serde_json::from_str(content).context("Invalid JSON format"),
        }
    }

    /// All configured resources: datasets, then recipes, then scenarios
    pub fn resources(&self) -> Vec<Resource> {
        self.datasets
            .iter()
            .cloned()
            .map(Resource::Dataset)
            .chain(self.recipes.iter().cloned().map(Resource::Recipe))
            .chain(self.scenarios.iter().cloned().map(Resource::Scenario))
            .collect()
    }

    /// Total number of configured resources
    pub fn len(&self) -> usize {
        self.datasets.len() + self.recipes.len() + self.scenarios.len()
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Check names, references, output ownership, and ordering
    ///
    /// With `strict`, an output claimed by several recipes is an error
    /// instead of a warning.
    pub fn validate(&self, strict: bool) -> Validation {
        let mut validation = Validation::default();

        let names = [
            (
                ResourceKind::Dataset,
                self.datasets.iter().map(|d| d.name.as_str()).collect::<Vec<_>>(),
            ),
            (
                ResourceKind::Recipe,
                self.recipes.iter().map(|r| r.name.as_str()).collect(),
            ),
            (
                ResourceKind::Scenario,
                self.scenarios.iter().map(|s| s.name.as_str()).collect(),
            ),
        ];

        for (kind, list) in &names {
            let mut seen = HashSet::new();
            for name in list {
                if name.trim().is_empty() {
                    validation.errors.push(ConfigError::EmptyName { kind: *kind });
                } else if !seen.insert(*name) {
                    validation.errors.push(ConfigError::DuplicateName {
                        kind: *kind,
                        name: (*name).to_string(),
                    });
                }
            }
        }

        let datasets: BTreeSet<&str> = self.datasets.iter().map(|d| d.name.as_str()).collect();
        let mut claims: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

        for recipe in &self.recipes {
            for input in &recipe.inputs {
                if !datasets.contains(input.as_str()) {
                    validation.errors.push(ConfigError::UnknownInput {
                        recipe: recipe.name.clone(),
                        dataset: input.clone(),
                    });
                }
            }
            for output in &recipe.outputs {
                if !datasets.contains(output.as_str()) {
                    validation.errors.push(ConfigError::UnknownOutput {
                        recipe: recipe.name.clone(),
                        dataset: output.clone(),
                    });
                }
                claims.entry(output).or_default().push(&recipe.name);
            }
        }

        for (output, producers) in claims.into_iter().filter(|(_, p)| p.len() > 1) {
            let issue = ConfigError::SharedOutput {
                output: output.to_string(),
                producers: producers.iter().map(|p| (*p).to_string()).collect(),
            };
            if strict {
                validation.errors.push(issue);
            } else {
                validation.warnings.push(issue);
            }
        }

        let recipe_names: BTreeSet<&str> = self.recipes.iter().map(|r| r.name.as_str()).collect();
        for scenario in &self.scenarios {
            for step in &scenario.steps {
                if !recipe_names.contains(step.as_str()) && !datasets.contains(step.as_str()) {
                    validation.warnings.push(ConfigError::UnknownStep {
                        scenario: scenario.name.clone(),
                        step: step.clone(),
                    });
                }
            }
        }

        // Shared outputs were reported above; only cycles matter here
        if let Err(e) = DependencyResolver::new().resolve(&self.recipes) {
            validation.errors.push(ConfigError::Resolution(e));
        }

        validation
    }
}

// ============================================================================
// Validation Results
// ============================================================================

/// A problem found in the configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{kind} with an empty name")]
    EmptyName { kind: ResourceKind },

    #[error("duplicate {kind} name '{name}'")]
    DuplicateName { kind: ResourceKind, name: String },

    #[error("recipe '{recipe}' reads unknown dataset '{dataset}'")]
    UnknownInput { recipe: String, dataset: String },

    #[error("recipe '{recipe}' writes unknown dataset '{dataset}'")]
    UnknownOutput { recipe: String, dataset: String },

    #[error("dataset '{output}' is written by several recipes: {}", .producers.join(", "))]
    SharedOutput { output: String, producers: Vec<String> },

    #[error("scenario '{scenario}' references unknown step '{step}'")]
    UnknownStep { scenario: String, step: String },

    #[error(transparent)]
    Resolution(#[from] reconcile::Error),
}

/// Errors and warnings from [`ProjectConfig::validate`]
#[derive(Debug, Default)]
pub struct Validation {
    pub errors: Vec<ConfigError>,
    pub warnings: Vec<ConfigError>,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Convert into a single error listing every problem
    pub fn into_result(self) -> Result<Vec<ConfigError>> {
        if self.errors.is_empty() {
            return Ok(self.warnings);
        }
        let list: Vec<String> = self.errors.iter().map(|e| format!("  - {e}")).collect();
        anyhow::bail!(
            "Configuration has {} error(s):\n{}",
            self.errors.len(),
            list.join("\n")
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
