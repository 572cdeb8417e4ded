//! Output formatting utilities.

use colored::*;
use evolution_engine::{EngineStatus, EnginePaths};
use evolution_executor::ExecutionOutcome;
use evolution_healing::MonitorOutcome;
use tabled::Tabled;

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable, colorized summary.
    Table,
    /// JSON format.
    Json,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Table
    }
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

#[derive(Tabled)]
struct CounterRow {
    metric: &'static str,
    today: u64,
}

pub fn print_status(status: &EngineStatus, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(status).unwrap_or_default()),
        OutputFormat::Table => {
            println!("scheduler:     {:?}", status.scheduler_state);
            println!("next tick in:  {}ms", status.next_tick_in_ms);
            println!("day:           {}", status.counters.last_reset_date);
            println!();

            let rows = vec![
                CounterRow { metric: "executions", today: status.counters.executions_today },
                CounterRow { metric: "daily limit", today: status.counters.daily_limit },
                CounterRow { metric: "successes", today: status.counters.successes_today },
                CounterRow { metric: "failures", today: status.counters.failures_today },
                CounterRow { metric: "rejections", today: status.counters.rejections_today },
                CounterRow { metric: "rollbacks", today: status.counters.rollbacks_today },
            ];
            println!("{}", tabled::Table::new(rows));
        }
    }
}

pub fn print_execution_outcome(outcome: &ExecutionOutcome) {
    let label = match outcome {
        ExecutionOutcome::Approved => "approved".green(),
        ExecutionOutcome::Deferred => "deferred".yellow(),
        ExecutionOutcome::Rejected => "rejected".red(),
        ExecutionOutcome::Escalated => "escalated".yellow(),
        ExecutionOutcome::BudgetExhausted => "budget-exhausted".red(),
    };
    println!("{} {}", "outcome:".bold(), label);
}

pub fn print_monitor_outcome(outcome: &MonitorOutcome) {
    match outcome {
        MonitorOutcome::InsufficientData => print_info("not enough post-application data to evaluate yet"),
        MonitorOutcome::Retained => print_success("application retained; metrics within tolerance"),
        MonitorOutcome::DegradedWithoutRollback(v) => {
            print_warning(&format!("degradation detected (severity {:.2}) but rollback was withheld", v.severity));
            for f in &v.factors {
                println!("  {:?}", f);
            }
        }
        MonitorOutcome::RolledBack(v) => {
            print_success(&format!("rolled back (severity {:.2})", v.severity));
            for f in &v.factors {
                println!("  {:?}", f);
            }
        }
        MonitorOutcome::ForcedRollback => print_success("rollback forced by operator request"),
    }
}

pub fn print_paths(paths: &EnginePaths, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "applicationLog": paths.application_log,
                "rollbackLog": paths.rollback_log,
                "latestBackup": paths.latest_backup,
            });
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
        }
        OutputFormat::Table => {
            println!("application log: {}", paths.application_log.display());
            println!("rollback log:    {}", paths.rollback_log.display());
            match &paths.latest_backup {
                Some(p) => println!("latest backup:   {}", p.display()),
                None => println!("latest backup:   {}", "none".dimmed()),
            }
        }
    }
}
