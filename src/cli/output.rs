//! CLI output formatting

use crate::{
    core::ExecutionStatus,
    execution::{ExecutionEvent, RunReport},
};
use console::Emoji;
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "- ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Format an execution status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Idle => style("IDLE").dim().to_string(),
        ExecutionStatus::ResolvingFlags
        | ExecutionStatus::CycleChecking
        | ExecutionStatus::Listing
        | ExecutionStatus::RunningTargets => style("RUNNING").yellow().to_string(),
        ExecutionStatus::Done => style("DONE").green().to_string(),
        ExecutionStatus::Failed => style("FAILED").red().to_string(),
    }
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::RunStarted {
            execution_id,
            targets,
            dry_run,
        } => {
            let mode = if *dry_run { " (dry run)" } else { "" };
            format!(
                "{} Running {}{} ({})",
                ROCKET,
                style(targets.join(", ")).bold(),
                style(mode).yellow(),
                style(&execution_id.to_string()[..8]).dim()
            )
        }
        ExecutionEvent::StepStarted { step } => {
            format!("{} {}", SPINNER, style(step).cyan())
        }
        ExecutionEvent::StepSkipped { step } => {
            format!("{} {} {}", SKIP, style(step).dim(), style("(skipped)").dim())
        }
        ExecutionEvent::DependenciesSkipped { step } => format!(
            "{} {} {}",
            INFO,
            style(step).cyan(),
            style("(dependencies not run)").dim()
        ),
        ExecutionEvent::ActionPlanned { step, kind } => format!(
            "{} would run {} of {}",
            INFO,
            kind,
            style(step).cyan()
        ),
        ExecutionEvent::StepCompleted { step, duration } => format!(
            "{} {} {}",
            CHECK,
            style(step).green(),
            style(format!("({})", format_duration(*duration))).dim()
        ),
        ExecutionEvent::StepFailed { step, error } => {
            format!("{} {}: {}", CROSS, style(step).red(), style(error).dim())
        }
        ExecutionEvent::RunCompleted {
            execution_id,
            status,
        } => format!(
            "{} Run ({}) {}",
            INFO,
            style(&execution_id.to_string()[..8]).dim(),
            format_status(*status)
        ),
    }
}

/// One-line summary of a finished run
pub fn format_report(report: &RunReport) -> String {
    let verb = if report.dry_run { "would run" } else { "ran" };
    let mut line = format!(
        "{} {} {} {} in {}",
        CHECK,
        style(report.targets.join(", ")).bold(),
        verb,
        style(format!("{} steps", report.executed.len())).cyan(),
        format_duration(report.duration)
    );
    if !report.skipped.is_empty() {
        line.push_str(&format!(
            ", {}",
            style(format!("{} skipped", report.skipped.len())).dim()
        ));
    }
    line
}

/// Human-readable duration
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs == 0 {
        format!("{}ms", duration.as_millis())
    } else if secs < 60 {
        format!("{:.1}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
