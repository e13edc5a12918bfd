//! Symbol signatures (C3): a name-to-type map plus convenience methods
//! the driver needs to snapshot and roll back when a method aborts.

use std::collections::BTreeMap;

use super::error::{ProverError, Result};
use super::types::Type;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Alphabet {
    symbols: BTreeMap<String, Type>,
}

impl Alphabet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: impl Into<String>, ty: Type) {
        self.symbols.insert(name.into(), ty);
    }

    pub fn query_type(&self, name: &str) -> Option<&Type> {
        self.symbols.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    pub fn get_all(&self) -> impl Iterator<Item = (&String, &Type)> {
        self.symbols.iter()
    }

    pub fn remove(&mut self, name: &str) -> Option<Type> {
        self.symbols.remove(name)
    }

    pub fn clear(&mut self) {
        self.symbols.clear();
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Looks up `name`'s type, or returns `ProverError::malformed` —
    /// `matchrule.cpp`'s `check_valid` calls this for every constant that
    /// occurs in a candidate rule.
    pub fn require(&self, name: &str) -> Result<&Type> {
        self.symbols
            .get(name)
            .ok_or_else(|| ProverError::malformed(format!("unknown constant: {name}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_and_query() {
        let mut alpha = Alphabet::new();
        alpha.declare("zero", Type::base("Nat"));
        assert_eq!(alpha.query_type("zero"), Some(&Type::base("Nat")));
        assert!(alpha.require("succ").is_err());
    }

    #[test]
    fn remove_and_clear() {
        let mut alpha = Alphabet::new();
        alpha.declare("a", Type::base("Nat"));
        alpha.declare("b", Type::base("Nat"));
        assert!(alpha.remove("a").is_some());
        assert_eq!(alpha.len(), 1);
        alpha.clear();
        assert!(alpha.is_empty());
    }
}
