//! Account command handlers: login, logout, and session status.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context, Result, bail};
use boca_session::{Credentials, Session};
use tracing::info;

pub async fn run_login_command(session: &Session, host: String, username: String) -> Result<()> {
    let password = read_password()?;
    let candidate = Credentials::new(host, username, password);

    session
        .login(&candidate)
        .await
        .with_context(|| format!("Login to {} failed", candidate.host))?;

    info!(host = %candidate.host, username = %candidate.username, "Logged in");
    println!("login: ok ({} at {})", candidate.username, candidate.host);
    Ok(())
}

pub async fn run_logout_command(session: &Session) -> Result<()> {
    if session.credentials().get()?.is_none() {
        println!("logout: ok (no stored credentials)");
        return Ok(());
    }
    session.logout().await.context("Logout failed")?;
    println!("logout: ok");
    Ok(())
}

pub async fn run_status_command(session: &Session) -> Result<()> {
    let state = session
        .state()
        .await
        .context("Failed to query session state")?;
    match session.credentials().get()? {
        Some(credentials) => println!(
            "status: {} ({} at {})",
            state.as_str(),
            credentials.username,
            credentials.host
        ),
        None => println!("status: {}", state.as_str()),
    }
    Ok(())
}

/// Reads one line from stdin, prompting on stderr when interactive.
fn read_password() -> Result<String> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        eprint!("Password: ");
        io::stderr().flush()?;
    }

    let mut line = String::new();
    let read = stdin
        .lock()
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;
    if read == 0 {
        bail!("No password on stdin. Pipe it in, e.g. `echo \"$PASS\" | boca login ...`");
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
