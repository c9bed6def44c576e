//! `flowplan validate` - check a project configuration

use anyhow::Result;
use colored::Colorize;

use crate::Context;
use crate::cli::ConfigArgs;
use crate::config::ProjectConfig;
use crate::ui;

pub fn run(ctx: &Context, args: &ConfigArgs) -> Result<()> {
    let config = ProjectConfig::load(&args.config)?;
    let validation = config.validate(args.strict);

    if !ctx.quiet {
        ui::header(&format!("Project {}", config.project.key));
        ui::kv("Config", &args.config.display().to_string());
        ui::kv("Datasets", &config.datasets.len().to_string());
        ui::kv("Recipes", &config.recipes.len().to_string());
        ui::kv("Scenarios", &config.scenarios.len().to_string());
        println!();
    }

    for warning in &validation.warnings {
        ui::warn(&warning.to_string());
    }
    for error in &validation.errors {
        ui::error(&error.to_string());
    }

    if validation.is_valid() {
        ui::success(&format!(
            "{} resources, {} warning(s)",
            config.len(),
            validation.warnings.len().to_string().yellow()
        ));
        Ok(())
    } else {
        anyhow::bail!(
            "{} found {} error(s)",
            args.config.display(),
            validation.errors.len()
        )
    }
}
