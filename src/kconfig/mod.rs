//! Kconfig configuration model.
//!
//! Loads a Kconfig schema, applies a `.config` file on top of it, and
//! resolves every defined symbol the way the Kconfig tools do: prompts and
//! dependencies decide visibility, visible symbols take user values, the
//! rest fall back to their first active default, `select` forces values up,
//! and int/hex values are kept inside their active range.
//!
//! ```no_run
//! use kconfig_header::kconfig::{Kconfig, LoadOptions};
//! use kconfig_header::model::ConfigurationModel;
//! use std::path::Path;
//!
//! let mut kconfig = Kconfig::load(Path::new("Kconfig"), &LoadOptions::default())?;
//! kconfig.load_values(Path::new(".config"))?;
//! for symbol in kconfig.symbols() {
//!     println!("{} = {:?}", symbol.name, symbol.value);
//! }
//! # Ok::<(), kconfig_header::Error>(())
//! ```

pub mod eval;
pub mod expr;
pub mod lexer;
pub mod parser;
pub mod values;

use crate::model::{ConfigurationModel, RangeBounds, Symbol, SymbolType, Tristate};
use crate::{Error, Result};
use eval::{Evaluator, UserValue, parse_hex};
use parser::Schema;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Prefix used in `.config` files (and header macros) unless overridden.
pub const DEFAULT_PREFIX: &str = "CONFIG_";

/// How to load a schema.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Symbol prefix used in values files.
    pub prefix: String,
    /// Base directory for `source` statements. Defaults to the directory of
    /// the top-level schema file.
    pub srctree: Option<PathBuf>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            srctree: None,
        }
    }
}

/// Summary of applying a values file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValuesReport {
    /// Assignments accepted.
    pub assigned: usize,
    /// Assignments skipped (unknown symbol or invalid value).
    pub ignored: usize,
}

/// A loaded Kconfig schema plus user values.
#[derive(Debug, Clone)]
pub struct Kconfig {
    schema: Schema,
    prefix: String,
    user: HashMap<String, UserValue>,
    next_seq: usize,
}

impl Kconfig {
    /// Parse the schema at `path`.
    pub fn load(path: &Path, options: &LoadOptions) -> Result<Self> {
        let srctree = match &options.srctree {
            Some(dir) => dir.clone(),
            None => path.parent().map(Path::to_path_buf).unwrap_or_default(),
        };
        let schema = parser::parse_file(path, &srctree)?;
        Ok(Self::from_schema(schema, &options.prefix))
    }

    /// Parse schema text held in memory. `origin` names it in diagnostics.
    pub fn parse_str(content: &str, origin: &Path, options: &LoadOptions) -> Result<Self> {
        let srctree = options.srctree.clone().unwrap_or_else(|| PathBuf::from("."));
        let schema = parser::parse_str(content, origin, &srctree)?;
        Ok(Self::from_schema(schema, &options.prefix))
    }

    fn from_schema(schema: Schema, prefix: &str) -> Self {
        Self {
            schema,
            prefix: prefix.to_string(),
            user: HashMap::new(),
            next_seq: 0,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Title from `mainmenu`, if the schema has one.
    pub fn mainmenu(&self) -> Option<&str> {
        self.schema.mainmenu.as_deref()
    }

    /// Read a `.config` file and apply its assignments.
    pub fn load_values(&mut self, path: &Path) -> Result<ValuesReport> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::ValuesLoad {
            path: path.to_path_buf(),
            line: 0,
            message: format!("cannot read values: {}", e),
        })?;
        self.apply_values(&content, path)
    }

    /// Apply `.config` text. Later assignments override earlier ones.
    pub fn apply_values(&mut self, content: &str, origin: &Path) -> Result<ValuesReport> {
        let mut report = ValuesReport::default();

        for assignment in values::parse_values(content, &self.prefix, origin)? {
            let Some(def) = self.schema.get(&assignment.name) else {
                tracing::warn!(
                    file = %origin.display(),
                    line = assignment.line,
                    "ignoring assignment to undefined symbol {}{}",
                    self.prefix,
                    assignment.name
                );
                report.ignored += 1;
                continue;
            };

            if let Err(reason) = check_value(def.kind, &assignment.value, assignment.quoted) {
                tracing::warn!(
                    file = %origin.display(),
                    line = assignment.line,
                    "ignoring {}{}: {}",
                    self.prefix,
                    assignment.name,
                    reason
                );
                report.ignored += 1;
                continue;
            }

            self.next_seq += 1;
            self.user.insert(
                assignment.name,
                UserValue {
                    value: assignment.value,
                    seq: self.next_seq,
                },
            );
            report.assigned += 1;
        }

        tracing::debug!(
            origin = %origin.display(),
            assigned = report.assigned,
            ignored = report.ignored,
            "values applied"
        );
        Ok(report)
    }
}

/// Check a values-file entry against the symbol's type.
fn check_value(kind: SymbolType, value: &str, quoted: bool) -> std::result::Result<(), String> {
    if quoted != (kind == SymbolType::String) {
        return Err(if quoted {
            format!("quoted value for {} symbol", kind)
        } else {
            "string value must be quoted".to_string()
        });
    }
    let ok = match kind {
        SymbolType::Bool => matches!(value, "y" | "n"),
        SymbolType::Tristate => Tristate::parse(value).is_some(),
        SymbolType::String => true,
        SymbolType::Int => value.parse::<i128>().is_ok(),
        SymbolType::Hex => parse_hex(value).is_some() && !value.starts_with('-'),
        SymbolType::Unknown => return Err("symbol has no type".to_string()),
    };
    if ok {
        Ok(())
    } else {
        Err(format!("'{}' is not a valid {} value", value, kind))
    }
}

impl ConfigurationModel for Kconfig {
    fn symbols(&self) -> Vec<Symbol> {
        let mut evaluator = Evaluator::new(&self.schema, &self.user);

        self.schema
            .symbols
            .iter()
            .enumerate()
            .map(|(index, def)| {
                let resolved = evaluator.resolve(index);
                let ranges = def
                    .ranges
                    .iter()
                    .map(|r| {
                        RangeBounds::new(
                            evaluator.operand_str(&r.low),
                            evaluator.operand_str(&r.high),
                        )
                    })
                    .collect();
                Symbol {
                    name: def.name.clone(),
                    kind: def.kind,
                    value: resolved.written.then_some(resolved.value),
                    ranges,
                    help: def.help.clone(),
                }
            })
            .collect()
    }
}
