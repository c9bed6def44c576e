use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "flowplan")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Plan and apply data-pipeline projects declaratively", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what apply would change
    Plan(PlanArgs),

    /// Converge the project to its configuration
    Apply(ApplyArgs),

    /// Show recipe execution order and parallel groups
    Graph(GraphArgs),

    /// Show every recipe a recipe transitively depends on
    Deps(DepsArgs),

    /// Check the project configuration
    Validate(ConfigArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Shared Arguments
// ============================================================================

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Project configuration file (.toml or .json)
    #[arg(short, long, env = "FLOWPLAN_CONFIG", default_value = "flowplan.toml")]
    pub config: PathBuf,

    /// Treat outputs claimed by several recipes as errors
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StateArgs {
    /// State file recording what the last apply created
    #[arg(long, env = "FLOWPLAN_STATE", default_value = ".flowplan/state.json")]
    pub state: PathBuf,
}

// ============================================================================
// Commands
// ============================================================================

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub state: StateArgs,

    /// Print the plan as Markdown
    #[arg(long)]
    pub markdown: bool,
}

#[derive(Args, Debug)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub state: StateArgs,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Record what would run without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Number of parallel jobs per stage
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,

    /// Cancel remaining stages after the first failure
    #[arg(long)]
    pub fail_fast: bool,

    /// Print the result as Markdown
    #[arg(long)]
    pub markdown: bool,
}

#[derive(Args, Debug)]
pub struct GraphArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Show parallel execution groups instead of a flat order
    #[arg(short, long)]
    pub groups: bool,
}

#[derive(Args, Debug)]
pub struct DepsArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Recipe to inspect
    pub recipe: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_apply_defaults() {
        let cli = Cli::try_parse_from(["flowplan", "apply"]).unwrap();
        let Command::Apply(args) = cli.command else {
            panic!("expected apply");
        };
        assert_eq!(args.jobs, 4);
        assert!(!args.yes && !args.dry_run && !args.fail_fast);
        assert_eq!(args.state.state, PathBuf::from(".flowplan/state.json"));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["flowplan", "graph", "--groups", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::Graph(GraphArgs { groups: true, .. })));
    }

    #[test]
    fn test_deps_requires_recipe() {
        assert!(Cli::try_parse_from(["flowplan", "deps"]).is_err());
        let cli = Cli::try_parse_from(["flowplan", "deps", "clean", "--strict"]).unwrap();
        let Command::Deps(args) = cli.command else {
            panic!("expected deps");
        };
        assert_eq!(args.recipe, "clean");
        assert!(args.config.strict);
    }
}
