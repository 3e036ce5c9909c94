//! Precedence resolution for header settings.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (`--prefix`, `--header-comment`, `--srctree`)
//! 2. Environment (`CONFIG_`, `KCONFIG_HEADER_COMMENT`, `srctree`)
//! 3. Settings file (`--settings <file>`, else `<config dir>/kconfig-header/config.kdl`)
//! 4. Built-in defaults

use crate::Result;
use crate::config::schema::{HeaderSettings, default_settings_path};
use crate::header::DEFAULT_HEADER_COMMENT;
use crate::kconfig::DEFAULT_PREFIX;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Environment variable holding the symbol prefix.
pub const PREFIX_ENV: &str = "CONFIG_";
/// Environment variable holding the header comment.
pub const HEADER_COMMENT_ENV: &str = "KCONFIG_HEADER_COMMENT";
/// Environment variable holding the source tree for `source` statements.
pub const SRCTREE_ENV: &str = "srctree";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from CLI flag
    CliFlag,
    /// Value from environment variable
    EnvVar(String),
    /// Value from a settings file
    SettingsFile(PathBuf),
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::SettingsFile(path) => write!(f, "file:{}", path.display()),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

impl Serialize for ValueSource {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// CLI overrides for settings resolution.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub prefix: Option<String>,
    pub header_comment: Option<String>,
    pub srctree: Option<PathBuf>,
    /// Explicit settings file, replacing the default location
    pub settings_file: Option<PathBuf>,
}

impl SettingsOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_header_comment(mut self, comment: impl Into<String>) -> Self {
        self.header_comment = Some(comment.into());
        self
    }

    pub fn with_srctree(mut self, srctree: impl Into<PathBuf>) -> Self {
        self.srctree = Some(srctree.into());
        self
    }

    pub fn with_settings_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_file = Some(path.into());
        self
    }
}

/// Fully resolved settings with source tracking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSettings {
    pub prefix: Resolved<String>,
    pub header_comment: Resolved<String>,
    pub srctree: Resolved<PathBuf>,
}

impl ResolvedSettings {
    pub fn prefix(&self) -> &str {
        &self.prefix.value
    }

    pub fn header_comment(&self) -> &str {
        &self.header_comment.value
    }

    pub fn srctree(&self) -> &Path {
        &self.srctree.value
    }
}

/// Resolve settings from the process environment and the settings file.
///
/// `schema` is the top-level Kconfig file; its directory is the default
/// source tree.
pub fn resolve_settings(overrides: &SettingsOverrides, schema: &Path) -> Result<ResolvedSettings> {
    let settings_path = overrides.settings_file.clone().or_else(default_settings_path);
    let file = match &settings_path {
        Some(path) => HeaderSettings::load(path)?,
        None => HeaderSettings::new(),
    };
    if let (Some(path), false) = (&settings_path, file.is_empty()) {
        tracing::debug!(path = %path.display(), "loaded settings file");
    }

    Ok(resolve_settings_with(
        overrides,
        |name| std::env::var(name).ok(),
        &file,
        settings_path.as_deref(),
        schema,
    ))
}

/// Resolve settings against an explicit environment lookup and file.
pub fn resolve_settings_with(
    overrides: &SettingsOverrides,
    env: impl Fn(&str) -> Option<String>,
    file: &HeaderSettings,
    file_path: Option<&Path>,
    schema: &Path,
) -> ResolvedSettings {
    let env_value = |name: &str| env(name).filter(|v| !v.is_empty());
    let file_source =
        || ValueSource::SettingsFile(file_path.map(Path::to_path_buf).unwrap_or_default());

    let prefix = if let Some(ref prefix) = overrides.prefix {
        Resolved::new(prefix.clone(), ValueSource::CliFlag)
    } else if let Some(prefix) = env_value(PREFIX_ENV) {
        Resolved::new(prefix, ValueSource::EnvVar(PREFIX_ENV.to_string()))
    } else if let Some(ref prefix) = file.prefix {
        Resolved::new(prefix.clone(), file_source())
    } else {
        Resolved::new(DEFAULT_PREFIX.to_string(), ValueSource::Default)
    };

    let header_comment = if let Some(ref comment) = overrides.header_comment {
        Resolved::new(comment.clone(), ValueSource::CliFlag)
    } else if let Some(comment) = env_value(HEADER_COMMENT_ENV) {
        Resolved::new(comment, ValueSource::EnvVar(HEADER_COMMENT_ENV.to_string()))
    } else if let Some(ref comment) = file.header_comment {
        Resolved::new(comment.clone(), file_source())
    } else {
        Resolved::new(DEFAULT_HEADER_COMMENT.to_string(), ValueSource::Default)
    };

    let srctree = if let Some(ref dir) = overrides.srctree {
        Resolved::new(dir.clone(), ValueSource::CliFlag)
    } else if let Some(dir) = env_value(SRCTREE_ENV) {
        Resolved::new(PathBuf::from(dir), ValueSource::EnvVar(SRCTREE_ENV.to_string()))
    } else if let Some(ref dir) = file.srctree {
        Resolved::new(dir.clone(), file_source())
    } else {
        let dir = schema.parent().map(Path::to_path_buf).unwrap_or_default();
        Resolved::new(dir, ValueSource::Default)
    };

    ResolvedSettings {
        prefix,
        header_comment,
        srctree,
    }
}
