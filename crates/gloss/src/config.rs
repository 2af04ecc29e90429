//! Configuration types for gloss runs.
//!
//! All types implement [`serde::Deserialize`] so they can be loaded from a
//! TOML file; missing sections and keys fall back to their defaults.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration combining resolver and output settings.
//! - [`ResolveConfig`] - Controls where constant groups are looked up and
//!   which build of each package is read.
//! - [`BuildTarget`] - Platform and tags evaluated against build constraints.
//! - [`OutputConfig`] - Controls the rendered format and title.
//!
//! # Example
//!
//! ```
//! # use gloss::config::{AppConfig, ConstScope, OutputFormat};
//! let config = AppConfig::default();
//! assert_eq!(config.resolve().const_scope(), ConstScope::File);
//! assert_eq!(config.output().format(), OutputFormat::Markdown);
//! ```

use std::{fmt, str::FromStr};

use serde::Deserialize;

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    resolve: ResolveConfig,

    #[serde(default)]
    output: OutputConfig,
}

impl AppConfig {
    pub fn new(resolve: ResolveConfig, output: OutputConfig) -> Self {
        Self { resolve, output }
    }

    pub fn resolve(&self) -> &ResolveConfig {
        &self.resolve
    }

    pub fn output(&self) -> &OutputConfig {
        &self.output
    }
}

/// Which declarations a constant group is collected from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstScope {
    /// Only the file declaring the group's type.
    #[default]
    File,
    /// Every file of the type's package, in sorted order.
    Package,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolveConfig {
    #[serde(default)]
    const_scope: ConstScope,

    #[serde(flatten)]
    target: BuildTarget,
}

impl ResolveConfig {
    pub fn new(const_scope: ConstScope) -> Self {
        Self {
            const_scope,
            target: BuildTarget::default(),
        }
    }

    pub fn with_target(mut self, target: BuildTarget) -> Self {
        self.target = target;
        self
    }

    pub fn const_scope(&self) -> ConstScope {
        self.const_scope
    }

    pub fn target(&self) -> &BuildTarget {
        &self.target
    }
}

/// The build whose files make up a package.
///
/// Files excluded by their name (`path_windows.go`) or by a `//go:build`
/// line are not read. Defaults to `linux/amd64` without extra tags.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BuildTarget {
    goos: String,
    goarch: String,
    /// Extra tags that hold, as passed to `go build -tags`.
    tags: Vec<String>,
}

impl Default for BuildTarget {
    fn default() -> Self {
        Self::new("linux", "amd64", Vec::new())
    }
}

impl BuildTarget {
    pub fn new(goos: impl Into<String>, goarch: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            goos: goos.into(),
            goarch: goarch.into(),
            tags,
        }
    }

    pub fn goos(&self) -> &str {
        &self.goos
    }

    pub fn goarch(&self) -> &str {
        &self.goarch
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

/// Rendered output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unknown output format `{other}`, expected `markdown` or `json`"
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Markdown => f.write_str("markdown"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    format: OutputFormat,

    /// Document title; the root symbol name when unset.
    #[serde(default)]
    title: Option<String>,
}

impl OutputConfig {
    pub fn new(format: OutputFormat, title: Option<String>) -> Self {
        Self { format, title }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("markdown".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert_eq!("MD".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!(matches!(
            "yaml".parse::<OutputFormat>(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_default_build_target() {
        let config = ResolveConfig::default();
        assert_eq!(config.target().goos(), "linux");
        assert_eq!(config.target().goarch(), "amd64");
        assert!(config.target().tags().is_empty());

        let windows = BuildTarget::new("windows", "arm64", vec!["purego".to_string()]);
        let config = ResolveConfig::new(ConstScope::Package).with_target(windows.clone());
        assert_eq!(config.target(), &windows);
        assert_eq!(config.const_scope(), ConstScope::Package);
    }

    #[test]
    fn test_output_config_accessors() {
        let output = OutputConfig::new(OutputFormat::Json, Some("API".to_string()));
        assert_eq!(output.format(), OutputFormat::Json);
        assert_eq!(output.title(), Some("API"));
        assert_eq!(OutputConfig::default().title(), None);
    }
}
