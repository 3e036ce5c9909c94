//! `.config` file reader.
//!
//! Recognized lines, for prefix `CONFIG_`:
//!
//! ```text
//! CONFIG_FOO=y
//! CONFIG_NAME="quoted \"string\""
//! CONFIG_BASE=0x1000
//! # CONFIG_BAR is not set
//! ```
//!
//! Other comment and blank lines are skipped. Lines that fit neither form
//! are reported as warnings and skipped.

use crate::{Error, Result};
use std::path::Path;

/// One `NAME=value` assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub name: String,
    /// Value with quotes and escapes removed.
    pub value: String,
    /// Whether the value was written as a quoted string.
    pub quoted: bool,
    pub line: usize,
}

/// Parse `.config` text. `origin` is only used in diagnostics.
pub fn parse_values(content: &str, prefix: &str, origin: &Path) -> Result<Vec<Assignment>> {
    let mut assignments = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim_end();

        if let Some(comment) = line.strip_prefix('#') {
            if let Some(name) = not_set_name(comment, prefix) {
                assignments.push(Assignment {
                    name: name.to_string(),
                    value: "n".to_string(),
                    quoted: false,
                    line: line_no,
                });
            }
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }

        let Some((name, value)) = line
            .strip_prefix(prefix)
            .and_then(|rest| rest.split_once('='))
            .filter(|(name, _)| is_symbol_name(name))
        else {
            tracing::warn!(
                file = %origin.display(),
                line = line_no,
                "ignoring malformed line '{}'",
                line
            );
            continue;
        };

        let (value, quoted) = if value.starts_with('"') {
            let unquoted = unquote(value).ok_or_else(|| Error::ValuesLoad {
                path: origin.to_path_buf(),
                line: line_no,
                message: format!("unterminated or malformed string value for {}{}", prefix, name),
            })?;
            (unquoted, true)
        } else {
            (value.to_string(), false)
        };

        assignments.push(Assignment {
            name: name.to_string(),
            value,
            quoted,
            line: line_no,
        });
    }

    Ok(assignments)
}

fn is_symbol_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `" CONFIG_FOO is not set"` yields `FOO`.
fn not_set_name<'a>(comment: &'a str, prefix: &str) -> Option<&'a str> {
    comment
        .trim_start()
        .strip_prefix(prefix)?
        .strip_suffix(" is not set")
        .filter(|name| is_symbol_name(name))
}

/// Strip the quotes from `"..."`, resolving backslash escapes. `None` when
/// the closing quote is missing or followed by anything.
fn unquote(value: &str) -> Option<String> {
    let mut chars = value.strip_prefix('"')?.chars();
    let mut out = String::new();
    loop {
        match chars.next()? {
            '\\' => out.push(chars.next()?),
            '"' => break,
            c => out.push(c),
        }
    }
    if chars.as_str().trim().is_empty() {
        Some(out)
    } else {
        None
    }
}
