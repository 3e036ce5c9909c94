//! kconfig-header - turn a resolved Kconfig configuration into a C header.
//!
//! This library provides the core functionality for the `kconfig-header` CLI:
//! loading a Kconfig schema and a `.config` file, resolving every symbol, and
//! emitting the result as guarded `#define` macros.

pub mod cli;
pub mod commands;
pub mod config;
pub mod header;
pub mod kconfig;
pub mod model;

use std::path::PathBuf;

/// Library-level error type for kconfig-header operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected 3 arguments (schema, values, output header), got {0}")]
    Usage(usize),

    #[error("Cannot find file {}", .0.display())]
    MissingFile(PathBuf),

    #[error("{}:{line}: {message}", path.display())]
    SchemaLoad {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("{}:{line}: {message}", path.display())]
    ValuesLoad {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Internal error while creating C header: unknown type \"{0}\"")]
    UnsupportedSymbolType(String),

    #[error("Invalid settings: {0}")]
    Settings(String),
}

/// Result type alias for kconfig-header operations.
pub type Result<T> = std::result::Result<T, Error>;
