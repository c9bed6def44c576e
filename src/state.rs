//! Local state file
//!
//! Records which resources the last apply created, with the properties they
//! were created from. This is the "current" side of every plan.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reconcile::State;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Current on-disk format version
const STATE_VERSION: u32 = 1;

/// Contents of the state file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,
    /// Project key the state belongs to
    #[serde(default)]
    pub project: Option<String>,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub resources: State,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            project: None,
            last_updated: Utc::now(),
            resources: State::new(),
        }
    }
}

impl StateFile {
    /// Load state from disk, or return an empty state if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file {} does not exist, using empty state", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: StateFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        if state.version > STATE_VERSION {
            anyhow::bail!(
                "State file {} has version {}, newer than supported version {}",
                path.display(),
                state.version,
                STATE_VERSION
            );
        }

        log::debug!(
            "Loaded {} resources from {}",
            state.resources.len(),
            path.display()
        );
        Ok(state)
    }

    /// Save state to disk, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize state to JSON")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    /// Check that this state belongs to the given project
    pub fn check_project(&self, key: &str) -> Result<()> {
        match &self.project {
            Some(project) if project != key => anyhow::bail!(
                "State file belongs to project '{}', but the config is for '{}'",
                project,
                key
            ),
            _ => Ok(()),
        }
    }

    /// Replace the recorded resources and bump the timestamp
    pub fn update(&mut self, project: &str, resources: State) {
        self.project = Some(project.to_string());
        self.resources = resources;
        self.last_updated = Utc::now();
    }
}

// ============================================================================
// Tests
// ============================================================================
