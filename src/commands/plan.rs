//! `flowplan plan` - preview what apply would change

use anyhow::Result;
use reconcile::ReconciliationPlan;

use super::Project;
use crate::Context;
use crate::cli::PlanArgs;
use crate::display;
use crate::state::StateFile;

pub fn run(ctx: &Context, args: &PlanArgs) -> Result<()> {
    let project = Project::load(ctx, &args.config)?;
    let state = StateFile::load(&args.state.state)?;
    state.check_project(project.key())?;

    let plan = ReconciliationPlan::build(
        project.config.resources(),
        &state.resources,
        &project.resolver,
    )?;

    if args.markdown {
        print!("{}", plan.to_markdown());
        return Ok(());
    }

    display::display_plan(&plan);
    if !ctx.quiet {
        display::display_stages(&plan);
    }
    println!();
    println!("{}", plan.summary());
    Ok(())
}
