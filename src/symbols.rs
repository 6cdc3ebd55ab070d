use std::collections::{BTreeMap, HashMap};

use tracing::trace;

use crate::config::ResolverPolicy;
use crate::image::{ordinal_name, Image};

/// An exported symbol of a loaded module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    name: Option<String>,
    ordinal: Option<u32>,
    address: u64,
}

impl Symbol {
    pub fn new(name: Option<String>, ordinal: Option<u32>, address: u64) -> Self {
        Self {
            name,
            ordinal,
            address,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn ordinal(&self) -> Option<u32> {
        self.ordinal
    }

    /// The run-time address of the symbol.
    pub fn address(&self) -> u64 {
        self.address
    }

    /// The symbol name, or `ordinal.<N>` for exports without one.
    pub fn canonical_name(&self) -> String {
        match (&self.name, self.ordinal) {
            (Some(name), _) => name.clone(),
            (None, Some(ordinal)) => ordinal_name(ordinal),
            (None, None) => format!("{:#x}", self.address),
        }
    }
}

/// Exported symbols of a single module, addressable by name, alias or ordinal.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    by_name: HashMap<String, usize>,
    by_ordinal: BTreeMap<u32, usize>,
}

impl SymbolTable {
    /// Build the table for the exports of a mapped image. Addresses are rebased onto the image
    /// base.
    pub fn from_image(image: &Image) -> Self {
        let mut table = Self::default();
        for export in &image.exports {
            table.insert(Symbol::new(
                export.name.clone(),
                export.ordinal,
                image.mapped_base.wrapping_add(export.rva),
            ));
        }

        table
    }

    /// Add a symbol. If its name or ordinal is already taken the earlier symbol keeps it.
    pub fn insert(&mut self, symbol: Symbol) {
        let index = self.symbols.len();
        if let Some(name) = &symbol.name {
            self.by_name.entry(name.clone()).or_insert(index);
        }

        if let Some(ordinal) = symbol.ordinal {
            self.by_ordinal.entry(ordinal).or_insert(index);
        }

        self.symbols.push(symbol);
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Symbols in export order.
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    pub fn get_by_ordinal(&self, ordinal: u32) -> Option<&Symbol> {
        self.by_ordinal
            .get(&ordinal)
            .map(|&index| &self.symbols[index])
    }

    /// Look up a symbol by name or alias. Keys of the form `ordinal.<N>` that are not names
    /// themselves are looked up by ordinal.
    pub fn get(&self, key: &str) -> Option<&Symbol> {
        self.index_of(key).map(|index| &self.symbols[index])
    }

    fn index_of(&self, key: &str) -> Option<usize> {
        self.by_name.get(key).copied().or_else(|| {
            let ordinal = key.strip_prefix("ordinal.")?.parse::<u32>().ok()?;
            if key != ordinal_name(ordinal) {
                return None;
            }

            self.by_ordinal.get(&ordinal).copied()
        })
    }

    /// Look up a symbol, retrying decorated variants of names ending in the mangling marker.
    /// A decorated match is remembered as an alias of `key`.
    pub fn resolve(&mut self, key: &str, policy: &ResolverPolicy) -> Option<&Symbol> {
        if let Some(index) = self.index_of(key) {
            return Some(&self.symbols[index]);
        }

        if !key.ends_with(policy.mangling_marker) {
            return None;
        }

        let index = policy
            .mangling_suffixes
            .iter()
            .find_map(|suffix| self.index_of(&format!("{key}{suffix}")))?;

        trace!(key, alias_of = ?self.symbols[index].name(), "adding mangled alias");
        self.by_name.insert(key.to_string(), index);
        Some(&self.symbols[index])
    }
}
