//! Resolved configuration data consumed by the header emitter.
//!
//! The emitter never evaluates the schema language. It only walks a
//! [`ConfigurationModel`], which hands out fully resolved [`Symbol`]s in
//! schema declaration order. The Kconfig loader in [`crate::kconfig`] is the
//! production implementation; [`MemoryModel`] serves synthetic symbol sets.

pub mod memory;

pub use memory::MemoryModel;

use std::fmt;

/// Declared type of a configuration symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolType {
    Bool,
    Tristate,
    String,
    Int,
    Hex,
    /// Defined without any type property.
    Unknown,
}

impl SymbolType {
    /// Parse a Kconfig type keyword.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bool" | "boolean" => Some(SymbolType::Bool),
            "tristate" => Some(SymbolType::Tristate),
            "string" => Some(SymbolType::String),
            "int" => Some(SymbolType::Int),
            "hex" => Some(SymbolType::Hex),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolType::Bool => "bool",
            SymbolType::Tristate => "tristate",
            SymbolType::String => "string",
            SymbolType::Int => "int",
            SymbolType::Hex => "hex",
            SymbolType::Unknown => "unknown",
        }
    }

    /// Whether values of this type take part in tristate logic.
    pub fn is_bool_or_tristate(&self) -> bool {
        matches!(self, SymbolType::Bool | SymbolType::Tristate)
    }

    /// Whether values of this type are numbers.
    pub fn is_int_or_hex(&self) -> bool {
        matches!(self, SymbolType::Int | SymbolType::Hex)
    }
}

impl fmt::Display for SymbolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Three-state value. Ordered `No < Module < Yes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Tristate {
    #[default]
    No,
    Module,
    Yes,
}

impl Tristate {
    /// Parse `n`, `m` or `y`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "n" => Some(Tristate::No),
            "m" => Some(Tristate::Module),
            "y" => Some(Tristate::Yes),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tristate::No => "n",
            Tristate::Module => "m",
            Tristate::Yes => "y",
        }
    }

    pub fn and(self, other: Tristate) -> Tristate {
        self.min(other)
    }

    pub fn or(self, other: Tristate) -> Tristate {
        self.max(other)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Tristate {
        match self {
            Tristate::No => Tristate::Yes,
            Tristate::Module => Tristate::Module,
            Tristate::Yes => Tristate::No,
        }
    }

    pub fn from_bool(b: bool) -> Tristate {
        if b { Tristate::Yes } else { Tristate::No }
    }
}

impl fmt::Display for Tristate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A declared `range` of an int or hex symbol, with both bounds resolved to
/// their string values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeBounds {
    pub low: String,
    pub high: String,
}

impl RangeBounds {
    pub fn new(low: impl Into<String>, high: impl Into<String>) -> Self {
        Self {
            low: low.into(),
            high: high.into(),
        }
    }
}

/// A fully resolved configuration symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolType,
    /// Normalized value. `None` when the symbol is not part of this
    /// configuration (disabled by dependencies or never assigned).
    pub value: Option<String>,
    /// Declared ranges, in declaration order, regardless of their conditions.
    pub ranges: Vec<RangeBounds>,
    /// Help text of the first definition.
    pub help: Option<String>,
}

impl Symbol {
    /// Create an unassigned symbol.
    pub fn new(name: impl Into<String>, kind: SymbolType) -> Self {
        Self {
            name: name.into(),
            kind,
            value: None,
            ranges: Vec::new(),
            help: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_range(mut self, low: impl Into<String>, high: impl Into<String>) -> Self {
        self.ranges.push(RangeBounds::new(low, high));
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// The normalized value, treating an empty string as unassigned.
    pub fn assigned_value(&self) -> Option<&str> {
        self.value.as_deref().filter(|v| !v.is_empty())
    }

    /// The value as a tristate, for bool and tristate symbols.
    pub fn tristate(&self) -> Option<Tristate> {
        if !self.kind.is_bool_or_tristate() {
            return None;
        }
        self.assigned_value().and_then(Tristate::parse)
    }
}

/// Read-only view over a loaded configuration.
pub trait ConfigurationModel {
    /// All defined symbols in declaration order, each name exactly once.
    fn symbols(&self) -> Vec<Symbol>;
}
