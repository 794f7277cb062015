//! Page and file command handlers.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use boca_session::Session;
use tracing::debug;

pub async fn run_fetch_command(session: &Session, path: &str) -> Result<()> {
    let document = session
        .fetch_authenticated(path)
        .await
        .with_context(|| format!("Failed to fetch '{path}'"))?;
    if document.is_empty() {
        bail!("Not logged in. Run `boca login` first.");
    }
    println!("{}", document.html());
    Ok(())
}

pub async fn run_download_command(
    session: &Session,
    url: &str,
    name: &Path,
    download_dir: Option<&Path>,
) -> Result<()> {
    let destination = resolve_destination(name, download_dir);
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create download directory '{}'", parent.display())
        })?;
    }
    debug!(destination = %destination.display(), "resolved download destination");

    let bytes = session
        .download(url, &destination)
        .await
        .with_context(|| format!("Download of '{url}' failed"))?;
    println!("download: ok ({bytes} bytes saved to {})", destination.display());
    Ok(())
}

/// Relative names land in the configured download directory, if any.
fn resolve_destination(name: &Path, download_dir: Option<&Path>) -> PathBuf {
    match download_dir {
        Some(dir) if name.is_relative() => dir.join(name),
        _ => name.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_destination() {
        let dir = Path::new("/srv/contest");
        assert_eq!(
            resolve_destination(Path::new("A.pdf"), Some(dir)),
            PathBuf::from("/srv/contest/A.pdf")
        );
        assert_eq!(
            resolve_destination(Path::new("/tmp/A.pdf"), Some(dir)),
            PathBuf::from("/tmp/A.pdf")
        );
        assert_eq!(
            resolve_destination(Path::new("A.pdf"), None),
            PathBuf::from("A.pdf")
        );
    }
}
