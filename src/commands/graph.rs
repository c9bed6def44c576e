//! `flowplan graph` and `flowplan deps` - inspect recipe dependencies

use anyhow::Result;
use colored::Colorize;

use super::Project;
use crate::Context;
use crate::cli::{DepsArgs, GraphArgs};
use crate::{display, ui};

pub fn run(ctx: &Context, args: &GraphArgs) -> Result<()> {
    let project = Project::load(ctx, &args.config)?;
    let recipes = &project.config.recipes;

    if recipes.is_empty() {
        ui::info("No recipes configured");
        return Ok(());
    }

    let order = project.resolver.resolve(recipes)?;
    if args.groups {
        let groups = project.resolver.execution_groups(recipes)?;
        display::display_order(&order, Some(groups.as_slice()));
    } else {
        display::display_order(&order, None);
    }

    if ctx.verbose > 0 {
        let graph = project.resolver.graph(recipes)?;
        ui::section("Edges");
        for name in graph.nodes() {
            for consumer in graph.dependents(name) {
                println!("  {} {} {}", name, "→".dimmed(), consumer);
            }
        }
        ui::kv("Edges", &graph.edge_count().to_string());
    }

    Ok(())
}

pub fn deps(ctx: &Context, args: &DepsArgs) -> Result<()> {
    let project = Project::load(ctx, &args.config)?;
    let recipes = &project.config.recipes;

    if !recipes.iter().any(|r| r.name == args.recipe) {
        anyhow::bail!("Unknown recipe '{}'", args.recipe);
    }

    let upstream = project.resolver.dependencies(&args.recipe, recipes);
    let graph = project.resolver.graph(recipes)?;
    let downstream = graph.dependents(&args.recipe);

    ui::header(&format!("Recipe {}", args.recipe));

    ui::section("Depends on");
    if upstream.is_empty() {
        ui::dim("(nothing)");
    }
    for name in &upstream {
        println!("  {} {}", "←".cyan(), name);
    }

    ui::section("Read by");
    if downstream.is_empty() {
        ui::dim("(nothing)");
    }
    for name in downstream {
        println!("  {} {}", "→".cyan(), name);
    }

    Ok(())
}
