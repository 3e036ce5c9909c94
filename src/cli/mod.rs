//! CLI argument definitions for kconfig-header.

use crate::commands::GenerateRequest;
use crate::config::SettingsOverrides;
use crate::{Error, Result};
use clap::Parser;
use std::path::PathBuf;

/// Usage line printed when positional arguments are missing.
pub const USAGE: &str = "kconfig-header: <Kconfig file> <.config file> <path to config.h>";

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("KH_GIT_COMMIT"),
    ", built ",
    env!("KH_BUILD_TIMESTAMP"),
    ")"
);

/// kconfig-header - Generate a C configuration header from Kconfig.
///
/// Loads the Kconfig schema and the `.config` values, resolves every symbol,
/// and writes one `#define` per symbol with a value.
#[derive(Parser, Debug)]
#[command(name = "kconfig-header")]
#[command(
    author,
    version,
    long_version = LONG_VERSION,
    about = "Generate a C configuration header from a Kconfig schema and a .config file",
    long_about = None
)]
pub struct Cli {
    /// Kconfig schema, .config values, output header path (extra arguments are ignored)
    #[arg(value_name = "PATHS")]
    pub paths: Vec<PathBuf>,

    /// Symbol prefix for .config entries and emitted macros
    #[arg(long)]
    pub prefix: Option<String>,

    /// Text written verbatim at the top of the header
    #[arg(long = "header-comment", value_name = "TEXT")]
    pub header_comment: Option<String>,

    /// Base directory for `source` statements in the schema
    #[arg(long, value_name = "DIR")]
    pub srctree: Option<PathBuf>,

    /// KDL settings file (default: <config dir>/kconfig-header/config.kdl)
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Output the result as JSON
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Build the generation request from the parsed arguments.
    ///
    /// Needs at least three positional paths; anything after the third is
    /// logged and dropped.
    pub fn request(&self) -> Result<GenerateRequest> {
        let [schema, values, output, extra @ ..] = self.paths.as_slice() else {
            return Err(Error::Usage(self.paths.len()));
        };
        if !extra.is_empty() {
            tracing::warn!(count = extra.len(), "ignoring extra arguments");
        }

        Ok(GenerateRequest::new(schema, values, output).with_overrides(self.overrides()))
    }

    fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            prefix: self.prefix.clone(),
            header_comment: self.header_comment.clone(),
            srctree: self.srctree.clone(),
            settings_file: self.settings.clone(),
        }
    }
}
