//! Symbol table
//!
//! Names of functions, values and module-scope variables are interned here.
//! Debug names (`OpName`) must not collide, so [`SymbolTable::new_symbol`]
//! hands out a fresh name when the requested one is taken.

use super::SymbolId;
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymbolTable {
    names: Vec<String>,
    #[serde(skip)]
    lookup: FxHashMap<String, SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `name`, returning the existing symbol if already registered.
    pub fn register(&mut self, name: &str) -> SymbolId {
        if let Some(&id) = self.lookup.get(name) {
            return id;
        }
        self.insert(name.to_string())
    }

    /// Register a name that differs from every existing symbol, appending a
    /// numeric suffix when `name` is taken.
    pub fn new_symbol(&mut self, name: &str) -> SymbolId {
        if !self.lookup.contains_key(name) {
            return self.insert(name.to_string());
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}_{}", name, n);
            if !self.lookup.contains_key(&candidate) {
                return self.insert(candidate);
            }
            n += 1;
        }
    }

    fn insert(&mut self, name: String) -> SymbolId {
        let id = SymbolId(self.names.len() as u32);
        self.lookup.insert(name.clone(), id);
        self.names.push(name);
        id
    }

    pub fn get(&self, name: &str) -> Option<SymbolId> {
        self.lookup.get(name).copied()
    }

    pub fn name(&self, id: SymbolId) -> &str {
        self.names.get(id.index()).map_or("<unknown>", String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub(crate) fn rebuild_lookup(&mut self) {
        self.lookup = self
            .names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), SymbolId(i as u32)))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_interns() {
        let mut symbols = SymbolTable::new();
        let a = symbols.register("main");
        let b = symbols.register("main");
        assert_eq!(a, b);
        assert_eq!(symbols.name(a), "main");
    }

    #[test]
    fn test_new_symbol_is_unique() {
        let mut symbols = SymbolTable::new();
        let x = symbols.new_symbol("x");
        let x1 = symbols.new_symbol("x");
        let x2 = symbols.new_symbol("x");
        assert_eq!(symbols.name(x), "x");
        assert_eq!(symbols.name(x1), "x_1");
        assert_eq!(symbols.name(x2), "x_2");
    }
}
