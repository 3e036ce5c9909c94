//! KDL schema for the settings file.
//!
//! ```kdl
//! prefix "CONFIG_"
//! header-comment "/* Generated */\n"
//! srctree "/path/to/tree"
//! ```
//!
//! Every node is optional. Unknown nodes are ignored.

use crate::{Error, Result};
use kdl::KdlDocument;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Settings read from a KDL file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeaderSettings {
    /// Symbol prefix for values and macros
    pub prefix: Option<String>,
    /// Text written verbatim before the include guard
    pub header_comment: Option<String>,
    /// Base directory for `source` statements
    pub srctree: Option<PathBuf>,
}

impl HeaderSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse settings from a KDL document.
    ///
    /// Nodes whose first argument is not a string are rejected.
    pub fn from_kdl(doc: &KdlDocument) -> Result<Self> {
        Ok(Self {
            prefix: string_node(doc, "prefix")?,
            header_comment: string_node(doc, "header-comment")?,
            srctree: string_node(doc, "srctree")?.map(PathBuf::from),
        })
    }

    /// Parse settings from KDL text.
    pub fn parse(content: &str) -> Result<Self> {
        let doc: KdlDocument = content
            .parse()
            .map_err(|e| Error::Settings(format!("failed to parse KDL: {}", e)))?;
        Self::from_kdl(&doc)
    }

    /// Load settings from `path`. A missing file yields empty settings.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Settings(format!("failed to read {}: {}", path.display(), e)))?;

        Self::parse(&content)
            .map_err(|e| Error::Settings(format!("{}: {}", path.display(), settings_message(e))))
    }

    /// Whether no setting is present.
    pub fn is_empty(&self) -> bool {
        self.prefix.is_none() && self.header_comment.is_none() && self.srctree.is_none()
    }
}

/// Default settings file: `<config dir>/kconfig-header/config.kdl`.
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("kconfig-header").join("config.kdl"))
}

fn string_node(doc: &KdlDocument, name: &str) -> Result<Option<String>> {
    let Some(node) = doc.get(name) else {
        return Ok(None);
    };
    match node.entries().first().map(|entry| entry.value().as_string()) {
        Some(Some(s)) => Ok(Some(s.to_string())),
        _ => Err(Error::Settings(format!("'{}' expects a string argument", name))),
    }
}

fn settings_message(err: Error) -> String {
    match err {
        Error::Settings(message) => message,
        other => other.to_string(),
    }
}
