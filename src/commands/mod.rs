//! CLI command handlers.

mod account;
mod pages;
mod submit;

pub use account::{run_login_command, run_logout_command, run_status_command};
pub use pages::{run_download_command, run_fetch_command};
pub use submit::{run_clarify_command, run_submit_run_command};
