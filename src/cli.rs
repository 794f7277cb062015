//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Stay logged in to a BOCA contest server from the terminal.
///
/// Credentials and the session cookie jar are kept in an encrypted store;
/// expired sessions are renewed automatically.
#[derive(Parser, Debug)]
#[command(name = "boca")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: ~/.config/boca-session/config.toml)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Validate and store credentials; the password is read from stdin
    Login {
        /// Server host, optionally with :port
        #[arg(long)]
        host: String,
        /// Team login name
        #[arg(short, long)]
        username: String,
    },
    /// Log out on the server and forget stored credentials
    Logout,
    /// Show whether a session is stored and still alive
    Status,
    /// Print a page from the server, logging in as needed
    Fetch {
        /// Page path relative to /boca/ (e.g. team/problem.php)
        path: String,
    },
    /// Download a problem statement or submitted source
    Download {
        /// File URL, absolute or relative to /boca/
        url: String,
        /// Destination file name (joined to `download_dir` when relative)
        name: PathBuf,
    },
    /// Submit a solution for judging
    SubmitRun {
        /// Problem identifier
        #[arg(short, long)]
        problem: String,
        /// Language identifier
        #[arg(short, long)]
        language: String,
        /// Source file
        source: PathBuf,
    },
    /// Ask the judges a question
    Clarify {
        /// Problem identifier
        #[arg(short, long)]
        problem: String,
        /// Question text
        message: String,
    },
}
