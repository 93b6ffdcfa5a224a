use std::collections::HashMap;

use vmtranslator::Segment;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Static,
    Field,
    Argument,
    Local,
}

impl SymbolKind {
    pub fn segment(&self) -> Segment {
        match self {
            SymbolKind::Static => Segment::Static,
            SymbolKind::Field => Segment::This,
            SymbolKind::Argument => Segment::Argument,
            SymbolKind::Local => Segment::Local,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    /// Declared type name, e.g. `int` or `List`.
    pub ty: String,
    pub kind: SymbolKind,
    pub index: u16,
}

/// One scope of variables. Indices are dense per kind, in declaration order.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Symbol>,
    counts: HashMap<SymbolKind, u16>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to the next free index of `kind`. A redeclared name is
    /// rebound; the index it held stays allocated.
    pub fn define(&mut self, name: &str, ty: &str, kind: SymbolKind) -> &Symbol {
        let count = self.counts.entry(kind).or_insert(0);
        let index = *count;
        *count += 1;
        let symbol = Symbol {
            ty: ty.to_string(),
            kind,
            index,
        };
        self.symbols.insert(name.to_string(), symbol);
        &self.symbols[name]
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn count(&self, kind: SymbolKind) -> u16 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.symbols.clear();
        self.counts.clear();
    }
}
