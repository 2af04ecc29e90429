//! Locating and reading the `gloss` TOML configuration.

use std::{
    fs,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info};

use gloss::{ConfigError, GlossError, config::AppConfig};

/// Looked up relative to the working directory.
const LOCAL_CONFIG: &str = "gloss/config.toml";

/// Loads the configuration the run should use.
///
/// An explicit `--config` path must exist. Otherwise the first existing file
/// among `gloss/config.toml` and the per-user config directory (for example
/// `~/.config/gloss/config.toml`) is read, and without either the defaults
/// apply.
///
/// # Errors
///
/// [`ConfigError::MissingFile`] for an explicit path that does not exist,
/// [`ConfigError::Parse`] for invalid TOML or unknown values, and I/O errors
/// from reading the file.
pub fn load_config(explicit_path: Option<impl AsRef<Path>>) -> Result<AppConfig, GlossError> {
    if let Some(path) = explicit_path {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::MissingFile(path.to_path_buf()).into());
        }
        info!(path = path.display().to_string(); "Reading configuration given on the command line");
        return read_config(path);
    }

    for (origin, candidate) in discovered_paths() {
        if candidate.is_file() {
            info!(origin = origin, path = candidate.display().to_string(); "Reading configuration");
            return read_config(&candidate);
        }
        debug!(origin = origin, path = candidate.display().to_string(); "No configuration here");
    }

    debug!("Using default configuration");
    Ok(AppConfig::default())
}

/// Implicit configuration locations, most specific first.
fn discovered_paths() -> Vec<(&'static str, PathBuf)> {
    let mut paths = vec![("local", PathBuf::from(LOCAL_CONFIG))];
    match ProjectDirs::from("com", "gloss", "gloss") {
        Some(dirs) => paths.push(("user", dirs.config_dir().join("config.toml"))),
        None => debug!("No home directory, skipping the user configuration"),
    }
    paths
}

fn read_config(path: &Path) -> Result<AppConfig, GlossError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

fn parse_config(content: &str) -> Result<AppConfig, GlossError> {
    toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()).into())
}

#[cfg(test)]
mod tests {
    use gloss::config::{ConstScope, OutputFormat};
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(
            r#"
[resolve]
const_scope = "package"

[output]
format = "json"
title = "Shop API"
"#,
        )
        .unwrap();

        assert_eq!(config.resolve().const_scope(), ConstScope::Package);
        assert_eq!(config.output().format(), OutputFormat::Json);
        assert_eq!(config.output().title(), Some("Shop API"));
    }

    #[test]
    fn test_build_target_keys() {
        let config = parse_config(
            r#"
[resolve]
goos = "windows"
tags = ["purego"]
"#,
        )
        .unwrap();

        let target = config.resolve().target();
        assert_eq!(target.goos(), "windows");
        assert_eq!(target.goarch(), "amd64");
        assert_eq!(target.tags(), &["purego".to_string()]);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = parse_config("[output]\nformat = \"markdown\"\n").unwrap();
        assert_eq!(config.resolve().const_scope(), ConstScope::File);
        assert_eq!(config.output().title(), None);

        let empty = parse_config("").unwrap();
        assert_eq!(empty.output().format(), OutputFormat::Markdown);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = parse_config("[resolve]\nconst_scope = \"module\"\n").unwrap_err();
        assert!(matches!(err, GlossError::Config(ConfigError::Parse(_))));
    }

    #[test]
    fn test_explicit_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gloss.toml");
        fs::write(&path, "[output]\ntitle = \"Docs\"\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.output().title(), Some("Docs"));

        let missing = load_config(Some(dir.path().join("missing.toml"))).unwrap_err();
        assert!(matches!(missing, GlossError::Config(ConfigError::MissingFile(_))));
    }
}
