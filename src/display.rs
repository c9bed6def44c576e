//! Terminal rendering for plans and execution results

use colored::{ColoredString, Colorize};
use reconcile::{
    ChangeType, ExecutionResult, ExecutionStatus, OperationStatus, ReconciliationPlan,
    ResourceKind,
};

use crate::ui;

fn change_symbol(change: ChangeType) -> ColoredString {
    match change {
        ChangeType::Create => change.symbol().green(),
        ChangeType::Update => change.symbol().yellow(),
        ChangeType::Delete => change.symbol().red(),
    }
}

fn status_symbol(status: OperationStatus) -> ColoredString {
    match status {
        OperationStatus::Success => status.symbol().green(),
        OperationStatus::Failed | OperationStatus::Partial => status.symbol().red(),
        OperationStatus::Skipped | OperationStatus::Cancelled => status.symbol().yellow(),
    }
}

/// Display the plan diff grouped by resource kind
pub fn display_plan(plan: &ReconciliationPlan) {
    let diff = plan.diff();
    if diff.is_empty() {
        println!();
        println!("  {} {}", "✓".green(), plan.summary());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Reconciliation Plan".bold()
    );
    println!("│");

    for kind in ResourceKind::ALL {
        let changes: Vec<_> = diff.changes_for(kind).collect();
        if changes.is_empty() {
            continue;
        }
        println!("│ {}", kind.plural().bold());

        for change in changes {
            let detail = match change.change_type {
                ChangeType::Create => "(will create)".to_string(),
                ChangeType::Delete => "(will remove)".to_string(),
                ChangeType::Update if change.has_drift() => {
                    format!("changed: {}", change.changed_keys().join(", "))
                }
                ChangeType::Update => "(in sync)".to_string(),
            };
            println!(
                "│   {} {:<30} {}",
                change_symbol(change.change_type),
                change.name,
                detail.dimmed()
            );
        }
        println!("│");
    }

    let counts = plan.counts();
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} to create, {} to update, {} to delete",
        counts.create.to_string().green(),
        counts.update.to_string().yellow(),
        counts.delete.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

/// Display the staged execution order of a plan
pub fn display_stages(plan: &ReconciliationPlan) {
    let stages = plan.execution_order();
    if stages.is_empty() {
        return;
    }

    ui::section("Execution order");
    for (i, stage) in stages.iter().enumerate() {
        println!(
            "  {} {} {}",
            format!("{}.", i + 1).dimmed(),
            stage.label.bold(),
            format!("({})", stage.operations.len()).dimmed()
        );
        for op in &stage.operations {
            println!("      {} {}", change_symbol(op.change_type), op.name);
        }
    }

    if let Some(estimate) = plan.estimated_duration() {
        println!();
        ui::kv("Estimated duration", &ui::format_duration(estimate));
    }
}

/// Display an execution result
pub fn display_result(result: &ExecutionResult) {
    ui::section("Results");
    for r in result.results() {
        let detail = r
            .error
            .as_deref()
            .or(r.message.as_deref())
            .map(|d| format!(" {}", d.dimmed()))
            .unwrap_or_default();
        println!(
            "  {} {:<8} {}.{}{}",
            status_symbol(r.status),
            r.operation.to_string(),
            r.kind,
            r.name,
            detail
        );
    }

    println!();
    let summary = result.summary();
    match result.status() {
        ExecutionStatus::Success => ui::success(&summary),
        ExecutionStatus::Partial => ui::warn(&summary),
        ExecutionStatus::Failed => ui::error(&summary),
        ExecutionStatus::Running => ui::info(&summary),
    }
}

/// Display recipe order, optionally as parallel groups
pub fn display_order(order: &[String], groups: Option<&[Vec<String>]>) {
    match groups {
        Some(groups) => {
            ui::header("Execution groups");
            for (level, group) in groups.iter().enumerate() {
                println!(
                    "  {} {}",
                    format!("level {level}:").cyan(),
                    group.join(", ")
                );
            }
        }
        None => {
            ui::header("Execution order");
            for (i, name) in order.iter().enumerate() {
                println!("  {} {}", format!("{:>3}.", i + 1).dimmed(), name);
            }
        }
    }
}
