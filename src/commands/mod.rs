pub mod apply;
pub mod graph;
pub mod plan;
pub mod validate;

use anyhow::Result;
use reconcile::DependencyResolver;

use crate::Context;
use crate::cli::ConfigArgs;
use crate::config::ProjectConfig;
use crate::ui;

/// A loaded and validated project
pub struct Project {
    pub config: ProjectConfig,
    pub resolver: DependencyResolver,
}

impl Project {
    /// Load the configuration and refuse to continue if it has errors
    ///
    /// Warnings are printed unless running quietly.
    pub fn load(ctx: &Context, args: &ConfigArgs) -> Result<Self> {
        let config = ProjectConfig::load(&args.config)?;
        let warnings = config.validate(args.strict).into_result()?;

        if !ctx.quiet {
            for warning in &warnings {
                ui::warn(&warning.to_string());
            }
        }

        let resolver = if args.strict {
            DependencyResolver::strict()
        } else {
            DependencyResolver::new()
        };

        Ok(Self { config, resolver })
    }

    pub fn key(&self) -> &str {
        &self.config.project.key
    }
}
