//! Generate Command
//!
//! Clone a repository, plan its documentation and write one page per topic.
//!
//! Usage:
//!   docwriter generate [URL] [--output DIR] [--workdir DIR]
//!                      [--provider P] [--model M] [--fail-fast]

use std::future::Future;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tokio::runtime::Runtime;
use tracing::{info, warn};

use crate::cli::ui::Output;
use crate::cli::{CommandContext, ConfigOverrides};
use crate::constants::layout;
use crate::pipeline::{CancelToken, RunReport, TopicOutcome, check_source_url};
use crate::types::{DocError, Result};

/// Options for the generate command
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Repository URL; asked for on stdin when absent
    pub url: Option<String>,
    pub overrides: ConfigOverrides,
}

pub fn run(options: GenerateOptions) -> Result<()> {
    let url = match options.url {
        Some(url) => url,
        None => prompt_url(&mut io::stdin().lock(), &mut io::stdout())?,
    };
    let url = check_source_url(&url)?.to_string();

    let context = CommandContext::load_with(&options.overrides)?;
    let controller = context.controller()?;
    let output = Output::new();

    output.info(&format!(
        "Generating documentation for {} ({} / {})",
        url,
        context.config.llm.provider,
        context.config.llm.model.as_deref().unwrap_or("default model")
    ));

    let cancel = CancelToken::new();
    let rt = Runtime::new()?;
    let report = rt.block_on(async {
        tokio::spawn(watch_interrupts(
            tokio::signal::ctrl_c,
            cancel.clone(),
            || {
                std::process::exit(130);
            },
        ));
        controller.run_with_cancel(&url, &cancel).await
    })?;

    output.run_report(&report);
    outcome(&report)
}

/// First interrupt cancels the run cooperatively, a second one aborts.
async fn watch_interrupts<F, Fut, A>(mut next_signal: F, cancel: CancelToken, abort: A)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
    A: FnOnce(),
{
    if next_signal().await.is_err() {
        return;
    }
    warn!("Interrupted, finishing the current topic (press Ctrl-C again to abort)");
    cancel.cancel();

    if next_signal().await.is_ok() {
        warn!("Interrupted again, aborting");
        abort();
    }
}

/// Map an unfinished run to an error so the process exits non-zero
fn outcome(report: &RunReport) -> Result<()> {
    if report.cancelled {
        return Err(DocError::Cancelled);
    }
    if report.is_complete() {
        info!(run_id = %report.run_id, "Run complete");
        return Ok(());
    }

    let failed = report.failed_topics();
    if let Some(TopicOutcome::Failed { title, reason }) = failed.first() {
        return Err(DocError::generation(
            title.clone(),
            format!(
                "{} ({} of {} topic(s) failed)",
                reason,
                failed.len(),
                report.outcomes.len()
            ),
        ));
    }

    match &report.plan_error {
        Some(err) => Err(DocError::persistence(Path::new(layout::PLAN_FILE), err)),
        None => Ok(()),
    }
}

/// Ask for a repository URL until a non-empty line is entered
fn prompt_url<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<String> {
    loop {
        write!(out, "Repository URL: ")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(DocError::invalid_input("No repository URL given"));
        }

        let url = line.trim();
        if !url.is_empty() {
            return Ok(url.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::FlowState;
    use crate::types::RunId;
    use chrono::Utc;
    use std::path::PathBuf;

    fn report(outcomes: Vec<TopicOutcome>) -> RunReport {
        RunReport {
            run_id: RunId::generate(),
            source_url: "https://example.com/org/repo".into(),
            local_path: PathBuf::from("workdir/repo"),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            final_state: FlowState::Done,
            plan_path: Some(PathBuf::from("docs/plan.json")),
            plan_error: None,
            produced_paths: Vec::new(),
            outcomes,
            cancelled: false,
        }
    }

    #[test]
    fn test_prompt_skips_blank_lines() {
        let mut input = "\n  \n https://example.com/org/repo \n".as_bytes();
        let mut out = Vec::new();

        let url = prompt_url(&mut input, &mut out).unwrap();
        assert_eq!(url, "https://example.com/org/repo");
        let prompts = String::from_utf8(out).unwrap();
        assert_eq!(prompts.matches("Repository URL:").count(), 3);
    }

    #[test]
    fn test_prompt_eof() {
        let mut input = "".as_bytes();
        let err = prompt_url(&mut input, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, DocError::InvalidInput(_)));
    }

    #[test]
    fn test_outcome() {
        let written = TopicOutcome::Written {
            title: "Overview".into(),
            path: PathBuf::from("docs/overview.mdx"),
        };
        assert!(outcome(&report(vec![written.clone()])).is_ok());

        let failed = TopicOutcome::Failed {
            title: "API".into(),
            reason: "timeout".into(),
        };
        let err = outcome(&report(vec![written.clone(), failed])).unwrap_err();
        assert!(matches!(err, DocError::Generation { ref topic, .. } if topic == "API"));
        assert!(err.to_string().contains("timeout (1 of 2 topic(s) failed)"));

        let mut unsaved = report(vec![written.clone()]);
        unsaved.plan_path = None;
        unsaved.plan_error = Some("disk full".into());
        let err = outcome(&unsaved).unwrap_err();
        assert!(err.to_string().contains("plan.json"));

        let skipped = TopicOutcome::Skipped {
            title: "API".into(),
        };
        let mut cancelled = report(vec![written, skipped]);
        cancelled.cancelled = true;
        cancelled.final_state = FlowState::Failed;
        assert!(matches!(outcome(&cancelled), Err(DocError::Cancelled)));
    }

    fn signals(results: Vec<io::Result<()>>) -> impl FnMut() -> std::future::Ready<io::Result<()>> {
        let mut results = results.into_iter();
        move || {
            let next = results
                .next()
                .unwrap_or_else(|| Err(io::Error::other("no more signals")));
            std::future::ready(next)
        }
    }

    #[tokio::test]
    async fn test_second_interrupt_aborts() {
        let cancel = CancelToken::new();
        let mut aborted = false;
        watch_interrupts(signals(vec![Ok(()), Ok(())]), cancel.clone(), || {
            aborted = true
        })
        .await;
        assert!(cancel.is_cancelled());
        assert!(aborted);
    }

    #[tokio::test]
    async fn test_single_interrupt_only_cancels() {
        let cancel = CancelToken::new();
        let mut aborted = false;
        watch_interrupts(
            signals(vec![Ok(()), Err(io::Error::other("listener closed"))]),
            cancel.clone(),
            || aborted = true,
        )
        .await;
        assert!(cancel.is_cancelled());
        assert!(!aborted);
    }

    #[tokio::test]
    async fn test_listener_failure_leaves_run_alone() {
        let cancel = CancelToken::new();
        let mut aborted = false;
        watch_interrupts(
            signals(vec![Err(io::Error::other("no signal handler"))]),
            cancel.clone(),
            || aborted = true,
        )
        .await;
        assert!(!cancel.is_cancelled());
        assert!(!aborted);
    }
}
