use std::collections::HashMap;

use crate::session::path::DerivedId;

/// Alias allocator of one session.
///
/// Every distinct derived association gets `<prefix><n>`, with `n` counting
/// up from 1. Asking again for the same association returns the alias it was
/// given the first time.
#[derive(Debug, Clone)]
pub struct AliasBag {
    prefix: String,
    counter: usize,
    aliases: HashMap<DerivedId, String>,
}

impl AliasBag {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: 0,
            aliases: HashMap::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Register a caller-chosen alias for `derived`.
    pub fn set_alias(&mut self, derived: DerivedId, alias: impl Into<String>) {
        self.aliases.insert(derived, alias.into());
    }

    /// The alias of `derived`, allocating one on first use.
    pub fn alias(&mut self, derived: DerivedId) -> String {
        if let Some(alias) = self.aliases.get(&derived) {
            return alias.clone();
        }
        self.counter += 1;
        let alias = format!("{}{}", self.prefix, self.counter);
        self.aliases.insert(derived, alias.clone());
        alias
    }

    /// The alias of `derived` if one was already assigned.
    pub fn get(&self, derived: DerivedId) -> Option<&str> {
        self.aliases.get(&derived).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_is_stable() {
        let mut bag = AliasBag::new("t0_j");
        let a = DerivedId::new(0);
        let b = DerivedId::new(1);
        assert_eq!(bag.alias(a), "t0_j1");
        assert_eq!(bag.alias(b), "t0_j2");
        assert_eq!(bag.alias(a), "t0_j1");
        assert_eq!(bag.len(), 2);
    }

    #[test]
    fn test_preferred_alias_skips_counter() {
        let mut bag = AliasBag::new("t0_j");
        let a = DerivedId::new(0);
        bag.set_alias(a, "addr");
        assert_eq!(bag.alias(a), "addr");
        assert_eq!(bag.alias(DerivedId::new(1)), "t0_j1");
        assert_eq!(bag.get(a), Some("addr"));
    }
}
