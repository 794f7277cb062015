//! Configuration file loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// Directory under the user config dir holding config and secrets.
const APP_DIR_NAME: &str = "boca-session";

/// `key = value` file configuration for `boca` defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Encrypted secret store location.
    pub secrets_path: Option<PathBuf>,
    /// Directory downloads are saved into.
    pub download_dir: Option<PathBuf>,
    /// Default verbosity mode.
    pub verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    /// Validates config values.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("secrets_path", &self.secrets_path),
            ("download_dir", &self.download_dir),
        ] {
            if value.as_ref().is_some_and(|path| path.as_os_str().is_empty()) {
                bail!("Invalid config value for `{field}`: path must not be empty");
            }
        }
        Ok(())
    }
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    /// Log filter used when neither `RUST_LOG` nor a CLI flag decides.
    #[must_use]
    pub fn default_filter(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Default => "info",
            Self::Verbose => "debug",
            Self::Debug => "debug,boca_session=trace",
        }
    }
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/boca-session/config.toml`
/// 2. `$HOME/.config/boca-session/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join(APP_DIR_NAME)
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(APP_DIR_NAME)
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from `explicit` (which must exist) or from the default path
/// if a file is there.
pub fn load_config(explicit: Option<&Path>) -> Result<FileConfig> {
    if let Some(path) = explicit {
        return load_file_config(path);
    }
    match resolve_default_config_path() {
        Some(path) if path.exists() => load_file_config(&path),
        _ => Ok(FileConfig::default()),
    }
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let parsed = parse_string_literal(value)
            .with_context(|| format!("Invalid `{key}` value on line {}", line_index + 1))?;

        match key {
            "secrets_path" => cfg.secrets_path = Some(PathBuf::from(parsed)),
            "download_dir" => cfg.download_dir = Some(PathBuf::from(parsed)),
            "verbosity" => {
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(|| {
                    format!(
                        "Invalid `verbosity` value '{}' on line {}",
                        parsed,
                        line_index + 1
                    )
                })?);
            }
            unknown => {
                bail!(
                    "Unknown configuration key: '{}' on line {}",
                    unknown,
                    line_index + 1
                );
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        "debug" => Ok(VerbositySetting::Debug),
        _ => bail!("Expected one of: default, verbose, quiet, debug"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_all_fields() {
        let cfg = parse_config_str(
            r#"
# boca defaults
secrets_path = "/home/team/.boca/secrets.enc"
download_dir = "/home/team/problems" # statements land here
verbosity = "verbose"
"#,
        )
        .unwrap();
        assert_eq!(
            cfg.secrets_path,
            Some(PathBuf::from("/home/team/.boca/secrets.enc"))
        );
        assert_eq!(cfg.download_dir, Some(PathBuf::from("/home/team/problems")));
        assert_eq!(cfg.verbosity, Some(VerbositySetting::Verbose));
    }

    #[test]
    fn test_parse_config_empty_is_default() {
        assert_eq!(parse_config_str("\n# nothing\n").unwrap(), FileConfig::default());
    }

    #[test]
    fn test_parse_config_rejects_unknown_key() {
        let err = parse_config_str("concurrency = \"4\"").unwrap_err();
        assert!(err.to_string().contains("Unknown configuration key"));
    }

    #[test]
    fn test_parse_config_rejects_unquoted_value() {
        let err = parse_config_str("download_dir = /tmp").unwrap_err();
        assert!(format!("{err:#}").contains("double-quoted"));
    }

    #[test]
    fn test_parse_config_rejects_bad_verbosity_and_empty_path() {
        assert!(parse_config_str("verbosity = \"loud\"").is_err());
        assert!(parse_config_str("download_dir = \"\"").is_err());
    }

    #[test]
    fn test_hash_inside_string_is_not_a_comment() {
        let cfg = parse_config_str("download_dir = \"/tmp/a#b\"").unwrap();
        assert_eq!(cfg.download_dir, Some(PathBuf::from("/tmp/a#b")));
    }

    #[test]
    fn test_load_config_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "verbosity = \"quiet\"\n").unwrap();
        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.verbosity, Some(VerbositySetting::Quiet));

        assert!(load_config(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
