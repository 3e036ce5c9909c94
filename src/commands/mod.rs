//! Command implementations for the kconfig-header CLI.
//!
//! The single command, [`generate`], runs the whole pipeline: settings
//! resolution, schema load, values load, header emission.

use crate::config::{ResolvedSettings, SettingsOverrides, resolve_settings};
use crate::header::HeaderEmitter;
use crate::kconfig::{Kconfig, LoadOptions};
use crate::{Error, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait CommandResult {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

/// Inputs of a header generation run.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub schema: PathBuf,
    pub values: PathBuf,
    pub output: PathBuf,
    pub overrides: SettingsOverrides,
}

impl GenerateRequest {
    pub fn new(
        schema: impl Into<PathBuf>,
        values: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            schema: schema.into(),
            values: values.into(),
            output: output.into(),
            overrides: SettingsOverrides::default(),
        }
    }

    pub fn with_overrides(mut self, overrides: SettingsOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Outcome of a successful generation run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateResult {
    pub output: PathBuf,
    pub mainmenu: Option<String>,
    pub symbols_emitted: usize,
    pub values_assigned: usize,
    pub values_ignored: usize,
    pub settings: ResolvedSettings,
}

impl CommandResult for GenerateResult {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        format!("Configuration header written to {}.", self.output.display())
    }
}

/// Generate the configuration header described by `request`.
///
/// Both inputs are checked for existence before anything is parsed, and
/// the output file is only touched once the configuration has loaded.
pub fn generate(request: &GenerateRequest) -> Result<GenerateResult> {
    for input in [&request.schema, &request.values] {
        require_file(input)?;
    }

    let settings = resolve_settings(&request.overrides, &request.schema)?;
    tracing::debug!(
        prefix = %settings.prefix.value,
        prefix_source = %settings.prefix.source,
        srctree = %settings.srctree().display(),
        srctree_source = %settings.srctree.source,
        "settings resolved"
    );

    let options = LoadOptions {
        prefix: settings.prefix().to_string(),
        srctree: Some(settings.srctree().to_path_buf()),
    };
    let mut kconfig = Kconfig::load(&request.schema, &options)?;
    tracing::debug!(
        schema = %request.schema.display(),
        symbols = kconfig.schema().symbols.len(),
        "schema loaded"
    );

    let report = kconfig.load_values(&request.values)?;

    let emitter = HeaderEmitter::new(settings.prefix(), settings.header_comment());
    let symbols_emitted = emitter.emit(&kconfig, &request.output)?;
    tracing::debug!(
        output = %request.output.display(),
        macros = symbols_emitted,
        "header written"
    );

    Ok(GenerateResult {
        output: request.output.clone(),
        mainmenu: kconfig.mainmenu().map(str::to_string),
        symbols_emitted,
        values_assigned: report.assigned,
        values_ignored: report.ignored,
        settings,
    })
}

fn require_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::MissingFile(path.to_path_buf()))
    }
}
