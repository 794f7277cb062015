//! Submission command handlers. Submissions are never retried.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use boca_session::{Clarification, Document, RunSubmission, Session};

pub async fn run_submit_run_command(
    session: &Session,
    problem: String,
    language: String,
    source: PathBuf,
) -> Result<()> {
    let label = format!("problem {problem} ({})", source.display());
    let document = session
        .submit_run(RunSubmission::new(problem, language, source))
        .await
        .with_context(|| format!("Run submission for {label} failed"))?;
    check_accepted(&document)?;
    println!("submit-run: ok ({label})");
    Ok(())
}

pub async fn run_clarify_command(session: &Session, problem: String, message: String) -> Result<()> {
    let label = format!("problem {problem}");
    let document = session
        .submit_clarification(Clarification::new(problem, message))
        .await
        .with_context(|| format!("Clarification for {label} failed"))?;
    check_accepted(&document)?;
    println!("clarify: ok ({label})");
    Ok(())
}

fn check_accepted(document: &Document) -> Result<()> {
    if !document.is_session_active() {
        bail!(
            "The server answered with an expired session. Check the team page before submitting again."
        );
    }
    Ok(())
}
