//! `flowplan apply` - converge the project to its configuration

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use reconcile::{ExecuteOptions, ReconciliationPlan, execute};

use super::Project;
use crate::Context;
use crate::applier::LocalApplier;
use crate::cli::ApplyArgs;
use crate::display;
use crate::progress::StageBars;
use crate::state::StateFile;

pub fn run(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let project = Project::load(ctx, &args.config)?;
    let state_path = &args.state.state;
    let mut state = StateFile::load(state_path)?;
    state.check_project(project.key())?;

    let plan = ReconciliationPlan::build(
        project.config.resources(),
        &state.resources,
        &project.resolver,
    )?;

    if !args.markdown {
        display::display_plan(&plan);
        display::display_stages(&plan);
    }

    if !plan.has_changes() {
        return Ok(());
    }

    if !args.yes && !args.dry_run && !confirm_proceed()? {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(());
    }

    let opts = ExecuteOptions {
        dry_run: args.dry_run,
        jobs: args.jobs,
        fail_fast: args.fail_fast,
    };
    let applier = LocalApplier::new(state.resources.clone());
    let mut progress = StageBars::new(ctx.quiet || args.markdown);
    let result = execute(&plan, &applier, &opts, &mut progress)?;

    if args.dry_run {
        if !args.markdown {
            println!();
            println!("  {} Dry run - no changes made", "ℹ".blue());
        }
    } else {
        state.update(project.key(), applier.into_state());
        state.save(state_path).with_context(|| {
            format!(
                "Applied changes but could not record them in {}",
                state_path.display()
            )
        })?;
    }

    if args.markdown {
        print!("{}", result.to_markdown());
    } else {
        display::display_result(&result);
    }

    if !result.status().is_success() {
        anyhow::bail!("Apply finished with status {}", result.status());
    }
    Ok(())
}

/// Confirm with user
fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    println!();
    let confirmed = Confirm::new()
        .with_prompt("Apply these changes?")
        .default(false)
        .interact()?;

    Ok(confirmed)
}
