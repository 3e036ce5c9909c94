//! C header emission.
//!
//! Renders a [`ConfigurationModel`] as object-like macros wrapped in a fixed
//! include guard:
//!
//! ```text
//! /* header comment */
//! #ifndef HV_KCONFIG
//! #define HV_KCONFIG
//! #define CONFIG_FOO 1
//! #define CONFIG_BAR "world"
//! #define CONFIG_BAZ 0xffU
//! #endif
//! ```
//!
//! The closing `#endif` carries no trailing newline.

use crate::model::{ConfigurationModel, RangeBounds, Symbol, SymbolType, Tristate};
use crate::{Error, Result};
use regex::Regex;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::OnceLock;

/// Include guard token. Fixed, not derived from the output file name.
pub const GUARD: &str = "HV_KCONFIG";

/// Header comment used when none is configured.
pub const DEFAULT_HEADER_COMMENT: &str = "/* Generated by kconfig-header */\n";

fn wide_int_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"64-bit\s+integer").expect("Invalid regex"))
}

/// Writes configuration headers with a given macro prefix and header comment.
#[derive(Debug, Clone)]
pub struct HeaderEmitter {
    prefix: String,
    header_comment: String,
}

impl HeaderEmitter {
    pub fn new(prefix: impl Into<String>, header_comment: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            header_comment: header_comment.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Create (or truncate) `path` and write the header for `model` into it.
    ///
    /// Returns the number of macros written. On error the file is left
    /// incomplete and must be discarded.
    pub fn emit(&self, model: &impl ConfigurationModel, path: &Path) -> Result<usize> {
        let file = File::create(path)?;
        let mut out = BufWriter::new(file);
        let count = self.write_to(model, &mut out)?;
        out.flush()?;
        Ok(count)
    }

    /// Render the header into a string.
    pub fn render(&self, model: &impl ConfigurationModel) -> Result<String> {
        let mut buf = Vec::new();
        self.write_to(model, &mut buf)?;
        // Every piece written is valid UTF-8.
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Write the header to any writer. Returns the number of macros written.
    pub fn write_to<W: Write>(
        &self,
        model: &impl ConfigurationModel,
        out: &mut W,
    ) -> Result<usize> {
        out.write_all(self.header_comment.as_bytes())?;
        write!(out, "#ifndef {GUARD}\n#define {GUARD}\n")?;

        let mut count = 0;
        for symbol in model.symbols() {
            if let Some(line) = self.macro_line(&symbol)? {
                writeln!(out, "{}", line)?;
                count += 1;
            }
        }

        write!(out, "#endif")?;
        tracing::debug!(macros = count, "header rendered");
        Ok(count)
    }

    /// The `#define` line for one symbol, or `None` when it emits nothing.
    pub fn macro_line(&self, symbol: &Symbol) -> Result<Option<String>> {
        let Some(value) = symbol.assigned_value() else {
            return Ok(None);
        };
        let name = &symbol.name;
        let prefix = &self.prefix;

        let line = match symbol.kind {
            // Anything other than n or m counts as enabled.
            SymbolType::Bool | SymbolType::Tristate => match Tristate::parse(value) {
                Some(Tristate::No) => return Ok(None),
                Some(Tristate::Module) => format!("#define {prefix}{name}_MODULE 1"),
                Some(Tristate::Yes) | None => format!("#define {prefix}{name} 1"),
            },
            SymbolType::String => format!("#define {prefix}{name} \"{}\"", escape(value)),
            SymbolType::Int => {
                let mut literal = value.to_string();
                if unsigned_range(symbol) {
                    literal.push('U');
                }
                if documents_wide_int(symbol) {
                    literal.push('L');
                }
                format!("#define {prefix}{name} {literal}")
            }
            SymbolType::Hex => {
                let mut literal = if has_hex_prefix(value) {
                    value.to_string()
                } else {
                    format!("0x{value}")
                };
                literal.push('U');
                if documents_wide_int(symbol) {
                    literal.push('L');
                }
                format!("#define {prefix}{name} {literal}")
            }
            SymbolType::Unknown => {
                return Err(Error::UnsupportedSymbolType(symbol.kind.to_string()));
            }
        };
        Ok(Some(line))
    }
}

impl Default for HeaderEmitter {
    fn default() -> Self {
        Self::new("CONFIG_", DEFAULT_HEADER_COMMENT)
    }
}

/// Escape a raw value for use inside a C string literal.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == '\\' || c == '"' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn has_hex_prefix(value: &str) -> bool {
    value.starts_with("0x") || value.starts_with("0X")
}

/// Whether the first declared range has two non-negative bounds.
fn unsigned_range(symbol: &Symbol) -> bool {
    let Some(RangeBounds { low, high }) = symbol.ranges.first() else {
        return false;
    };
    match (parse_bound(low), parse_bound(high)) {
        (Some(low), Some(high)) => low >= 0 && high >= 0,
        _ => {
            tracing::warn!(symbol = %symbol.name, %low, %high, "range bound is not an integer");
            false
        }
    }
}

fn parse_bound(s: &str) -> Option<i128> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return i128::from_str_radix(hex, 16).ok();
    }
    s.parse().ok()
}

fn documents_wide_int(symbol: &Symbol) -> bool {
    symbol
        .help
        .as_deref()
        .is_some_and(|help| wide_int_regex().is_match(help))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MemoryModel;

    fn emitter() -> HeaderEmitter {
        HeaderEmitter::new("CONFIG_", "/* test */\n")
    }

    fn line(symbol: Symbol) -> Option<String> {
        emitter().macro_line(&symbol).unwrap()
    }

    /// Standard C-string unescape for the subset of escapes we produce.
    fn c_unescape(s: &str) -> String {
        let mut out = String::new();
        let mut chars = s.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    // ==================== Bool / Tristate ====================

    #[test]
    fn test_bool_yes_emits_one() {
        let sym = Symbol::new("FOO", SymbolType::Bool).with_value("y");
        assert_eq!(line(sym).as_deref(), Some("#define CONFIG_FOO 1"));
    }

    #[test]
    fn test_bool_no_emits_nothing() {
        let sym = Symbol::new("FOO", SymbolType::Bool).with_value("n");
        assert_eq!(line(sym), None);
    }

    #[test]
    fn test_tristate_module_suffix() {
        let sym = Symbol::new("DRV", SymbolType::Tristate).with_value("m");
        assert_eq!(line(sym).as_deref(), Some("#define CONFIG_DRV_MODULE 1"));
    }

    #[test]
    fn test_bool_unusual_value_counts_as_enabled() {
        let sym = Symbol::new("FOO", SymbolType::Bool).with_value("1");
        assert_eq!(line(sym).as_deref(), Some("#define CONFIG_FOO 1"));
    }

    #[test]
    fn test_unassigned_symbols_are_skipped() {
        assert_eq!(line(Symbol::new("A", SymbolType::Bool)), None);
        assert_eq!(line(Symbol::new("B", SymbolType::String).with_value("")), None);
        assert_eq!(line(Symbol::new("C", SymbolType::Unknown)), None);
    }

    // ==================== String ====================

    #[test]
    fn test_string_is_quoted() {
        let sym = Symbol::new("BAR", SymbolType::String).with_value("world");
        assert_eq!(line(sym).as_deref(), Some("#define CONFIG_BAR \"world\""));
    }

    #[test]
    fn test_escape_backslash_and_quote() {
        assert_eq!(escape(r#"a\b"c"#), r#"a\\b\"c"#);
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_string_escape_round_trips() {
        for raw in [r#"C:\path\"quoted"\"#, r#"\\"#, r#""""#, "", r#"\n is not a newline"#] {
            let sym = Symbol::new("S", SymbolType::String).with_value(raw);
            let Some(line) = emitter().macro_line(&sym).unwrap() else {
                assert!(raw.is_empty());
                continue;
            };
            let literal = line
                .strip_prefix("#define CONFIG_S \"")
                .and_then(|l| l.strip_suffix('"'))
                .unwrap();
            assert_eq!(c_unescape(literal), raw);
        }
    }

    // ==================== Int ====================

    #[test]
    fn test_int_without_range_is_plain() {
        let sym = Symbol::new("N", SymbolType::Int).with_value("42");
        assert_eq!(line(sym).as_deref(), Some("#define CONFIG_N 42"));
    }

    #[test]
    fn test_int_non_negative_range_is_unsigned() {
        let sym = Symbol::new("N", SymbolType::Int)
            .with_value("42")
            .with_range("0", "100");
        assert_eq!(line(sym).as_deref(), Some("#define CONFIG_N 42U"));
    }

    #[test]
    fn test_int_negative_range_is_signed() {
        let sym = Symbol::new("N", SymbolType::Int)
            .with_value("-3")
            .with_range("-10", "10");
        assert_eq!(line(sym).as_deref(), Some("#define CONFIG_N -3"));
    }

    #[test]
    fn test_int_only_first_range_counts() {
        let sym = Symbol::new("N", SymbolType::Int)
            .with_value("5")
            .with_range("-1", "10")
            .with_range("0", "10");
        assert_eq!(line(sym).as_deref(), Some("#define CONFIG_N 5"));
    }

    #[test]
    fn test_int_unparsable_range_is_signed() {
        let sym = Symbol::new("N", SymbolType::Int)
            .with_value("5")
            .with_range("LOW", "10");
        assert_eq!(line(sym).as_deref(), Some("#define CONFIG_N 5"));
    }

    #[test]
    fn test_int_hex_bounds_are_accepted() {
        let sym = Symbol::new("N", SymbolType::Int)
            .with_value("5")
            .with_range("0x0", "0x10");
        assert_eq!(line(sym).as_deref(), Some("#define CONFIG_N 5U"));
    }

    #[test]
    fn test_int_bounds_beyond_i64_are_unsigned() {
        let sym = Symbol::new("N", SymbolType::Int)
            .with_value("5")
            .with_range("0", "0xffffffffffffffff");
        assert_eq!(line(sym).as_deref(), Some("#define CONFIG_N 5U"));
    }

    #[test]
    fn test_int_wide_help_appends_l() {
        let sym = Symbol::new("N", SymbolType::Int)
            .with_value("-7")
            .with_help("A signed 64-bit integer.");
        assert_eq!(line(sym).as_deref(), Some("#define CONFIG_N -7L"));
    }

    #[test]
    fn test_int_wide_help_across_newline_with_range() {
        let sym = Symbol::new("N", SymbolType::Int)
            .with_value("4096")
            .with_range("0", "65536")
            .with_help("Stored as a 64-bit\n   integer by the loader.");
        assert_eq!(line(sym).as_deref(), Some("#define CONFIG_N 4096UL"));
    }

    #[test]
    fn test_wide_help_match_is_case_sensitive() {
        let sym = Symbol::new("N", SymbolType::Int)
            .with_value("1")
            .with_help("64-BIT INTEGER");
        assert_eq!(line(sym).as_deref(), Some("#define CONFIG_N 1"));

        let sym = Symbol::new("N", SymbolType::Int)
            .with_value("1")
            .with_help("64-bitinteger");
        assert_eq!(line(sym).as_deref(), Some("#define CONFIG_N 1"));
    }

    // ==================== Hex ====================

    #[test]
    fn test_hex_adds_prefix_and_suffix() {
        let sym = Symbol::new("H", SymbolType::Hex).with_value("2a");
        assert_eq!(line(sym).as_deref(), Some("#define CONFIG_H 0x2aU"));
    }

    #[test]
    fn test_hex_keeps_existing_prefix() {
        let sym = Symbol::new("H", SymbolType::Hex).with_value("0x2a");
        assert_eq!(line(sym).as_deref(), Some("#define CONFIG_H 0x2aU"));

        let sym = Symbol::new("H", SymbolType::Hex).with_value("0X2A");
        assert_eq!(line(sym).as_deref(), Some("#define CONFIG_H 0X2AU"));
    }

    #[test]
    fn test_hex_is_unsigned_even_with_negative_range() {
        let sym = Symbol::new("H", SymbolType::Hex)
            .with_value("10")
            .with_range("-1", "0x100");
        assert_eq!(line(sym).as_deref(), Some("#define CONFIG_H 0x10U"));
    }

    #[test]
    fn test_hex_wide_help() {
        let sym = Symbol::new("H", SymbolType::Hex)
            .with_value("ffffffff00000000")
            .with_help("Physical base address, a 64-bit integer.");
        assert_eq!(
            line(sym).as_deref(),
            Some("#define CONFIG_H 0xffffffff00000000UL")
        );
    }

    // ==================== Unsupported ====================

    #[test]
    fn test_unknown_type_is_fatal() {
        let sym = Symbol::new("ODD", SymbolType::Unknown).with_value("1");
        let err = emitter().macro_line(&sym).unwrap_err();
        assert!(matches!(err, Error::UnsupportedSymbolType(ref t) if t == "unknown"));
        assert!(err.to_string().contains("unknown"));
    }

    // ==================== Whole header ====================

    #[test]
    fn test_render_layout() {
        let model = MemoryModel::new()
            .with(Symbol::new("FOO", SymbolType::Bool).with_value("y"))
            .with(Symbol::new("OFF", SymbolType::Bool).with_value("n"))
            .with(Symbol::new("BAR", SymbolType::String).with_value("world"))
            .with(Symbol::new("BAZ", SymbolType::Hex).with_value("ff"));

        let text = emitter().render(&model).unwrap();
        assert_eq!(
            text,
            "/* test */\n#ifndef HV_KCONFIG\n#define HV_KCONFIG\n\
             #define CONFIG_FOO 1\n#define CONFIG_BAR \"world\"\n#define CONFIG_BAZ 0xffU\n\
             #endif"
        );
    }

    #[test]
    fn test_render_empty_model() {
        let text = emitter().render(&MemoryModel::new()).unwrap();
        assert_eq!(text, "/* test */\n#ifndef HV_KCONFIG\n#define HV_KCONFIG\n#endif");
    }

    #[test]
    fn test_custom_prefix() {
        let model = MemoryModel::new().with(Symbol::new("FOO", SymbolType::Bool).with_value("y"));
        let text = HeaderEmitter::new("HV_", "").render(&model).unwrap();
        assert!(text.contains("#define HV_FOO 1\n"));
        assert!(text.starts_with("#ifndef HV_KCONFIG\n"));
    }

    #[test]
    fn test_emit_to_two_paths_is_identical() {
        let dir = tempfile::TempDir::new().unwrap();
        let model = MemoryModel::new()
            .with(Symbol::new("A", SymbolType::Tristate).with_value("m"))
            .with(Symbol::new("B", SymbolType::Int).with_value("3").with_range("0", "9"));

        let first = dir.path().join("a.h");
        let second = dir.path().join("b.h");
        assert_eq!(emitter().emit(&model, &first).unwrap(), 2);
        assert_eq!(emitter().emit(&model, &second).unwrap(), 2);

        let a = std::fs::read(&first).unwrap();
        let b = std::fs::read(&second).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_emit_truncates_existing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.h");
        std::fs::write(&path, "x".repeat(4096)).unwrap();

        emitter().emit(&MemoryModel::new(), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("#endif"));
        assert!(!text.contains('x'));
    }

    #[test]
    fn test_emit_aborts_on_unknown_type() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.h");
        let model = MemoryModel::new()
            .with(Symbol::new("OK", SymbolType::Bool).with_value("y"))
            .with(Symbol::new("ODD", SymbolType::Unknown).with_value("?"));

        let err = emitter().emit(&model, &path).unwrap_err();
        assert!(matches!(err, Error::UnsupportedSymbolType(_)));
    }

    #[test]
    fn test_emit_into_missing_directory_is_io_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("no/such/dir/config.h");
        let err = emitter().emit(&MemoryModel::new(), &path).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
