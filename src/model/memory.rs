//! In-memory configuration model.

use super::{ConfigurationModel, Symbol};

/// A configuration assembled directly from resolved symbols.
///
/// Useful for emitting headers from values computed elsewhere, and for
/// exercising the emitter without a schema on disk.
#[derive(Debug, Clone, Default)]
pub struct MemoryModel {
    symbols: Vec<Symbol>,
}

impl MemoryModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a symbol. A symbol with an existing name replaces it in place.
    pub fn push(&mut self, symbol: Symbol) {
        match self.symbols.iter_mut().find(|s| s.name == symbol.name) {
            Some(existing) => *existing = symbol,
            None => self.symbols.push(symbol),
        }
    }

    pub fn with(mut self, symbol: Symbol) -> Self {
        self.push(symbol);
        self
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl FromIterator<Symbol> for MemoryModel {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
        let mut model = MemoryModel::new();
        for symbol in iter {
            model.push(symbol);
        }
        model
    }
}

impl ConfigurationModel for MemoryModel {
    fn symbols(&self) -> Vec<Symbol> {
        self.symbols.clone()
    }
}
