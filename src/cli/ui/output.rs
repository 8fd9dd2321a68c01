use console::style;
use std::path::Path;

use crate::pipeline::{RunReport, TopicOutcome};

/// Console output for command handlers
///
/// Results go to stdout, failures to stderr. Logs use stderr through tracing.
pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    pub fn path(&self, path: &Path) {
        println!("  {}", style(path.display()).cyan());
    }

    /// Summary of one pipeline run: produced paths, then problems
    pub fn run_report(&self, report: &RunReport) {
        if report.is_complete() {
            self.success(&format!(
                "Generated {} document(s) for {}",
                report.produced_paths.len(),
                report.source_url
            ));
        } else {
            self.warning(&format!(
                "Generated {} of {} document(s) for {}",
                report.produced_paths.len(),
                report.outcomes.len(),
                report.source_url
            ));
        }

        if let Some(plan) = &report.plan_path {
            println!("  {} {}", style("plan").dim(), plan.display());
        }
        for path in &report.produced_paths {
            self.path(path);
        }

        if let Some(err) = &report.plan_error {
            self.error(&format!("Plan not saved: {}", err));
        }
        for outcome in &report.outcomes {
            match outcome {
                TopicOutcome::Failed { title, reason } => {
                    self.error(&format!("{}: {}", title, reason));
                }
                TopicOutcome::Skipped { title } => {
                    println!("  {} {}", style("skipped").dim(), title);
                }
                TopicOutcome::Written { .. } => {}
            }
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
