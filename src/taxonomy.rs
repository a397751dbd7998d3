//! Tagwire Taxonomy Contract
//! An ordinal-to-name mapping selected per envelope by a 16-bit identifier.
//! The codec only consumes the contract; taxonomy storage lives elsewhere.

use std::collections::HashMap;

use crate::error::{WireError, WireResult};

/// A read-only ordinal-to-name mapping. Ordinals are restricted to 0-32767.
pub trait Taxonomy {
    /// The name for an ordinal, if the taxonomy defines one.
    fn name_for(&self, ordinal: i16) -> Option<&str>;

    /// The ordinal a name collapses to on the wire, if any.
    fn ordinal_for(&self, name: &str) -> Option<i16>;
}

/// Resolves a taxonomy identifier carried in an envelope header to a
/// taxonomy. Identifier 0 means "no taxonomy" and is never resolved.
pub trait TaxonomyResolver {
    fn resolve(&self, taxonomy_id: i16) -> Option<&dyn Taxonomy>;
}

/// In-memory taxonomy backed by a pair of hash maps.
#[derive(Debug, Clone, Default)]
pub struct MapTaxonomy {
    by_ordinal: HashMap<i16, String>,
    by_name: HashMap<String, i16>,
}

impl MapTaxonomy {
    pub fn new<I, S>(entries: I) -> WireResult<Self>
    where
        I: IntoIterator<Item = (i16, S)>,
        S: Into<String>,
    {
        let mut tax = MapTaxonomy::default();
        for (ordinal, name) in entries {
            if ordinal < 0 {
                return Err(WireError::invalid(format!(
                    "taxonomy ordinal out of range: {ordinal}"
                )));
            }
            let name = name.into();
            tax.by_name.insert(name.clone(), ordinal);
            tax.by_ordinal.insert(ordinal, name);
        }
        Ok(tax)
    }

    pub fn len(&self) -> usize {
        self.by_ordinal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_ordinal.is_empty()
    }
}

impl Taxonomy for MapTaxonomy {
    fn name_for(&self, ordinal: i16) -> Option<&str> {
        self.by_ordinal.get(&ordinal).map(String::as_str)
    }

    fn ordinal_for(&self, name: &str) -> Option<i16> {
        self.by_name.get(name).copied()
    }
}

/// In-memory resolver mapping taxonomy identifiers to [`MapTaxonomy`] values.
#[derive(Debug, Clone, Default)]
pub struct MapResolver {
    taxonomies: HashMap<i16, MapTaxonomy>,
}

impl MapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, taxonomy_id: i16, taxonomy: MapTaxonomy) -> &mut Self {
        self.taxonomies.insert(taxonomy_id, taxonomy);
        self
    }
}

impl TaxonomyResolver for MapResolver {
    fn resolve(&self, taxonomy_id: i16) -> Option<&dyn Taxonomy> {
        self.taxonomies
            .get(&taxonomy_id)
            .map(|t| t as &dyn Taxonomy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_taxonomy() {
        let tax = MapTaxonomy::new([(5, "Foo"), (9, "Bar")]).unwrap();
        assert_eq!(tax.name_for(5), Some("Foo"));
        assert_eq!(tax.ordinal_for("Bar"), Some(9));
        assert_eq!(tax.name_for(99), None);
        assert_eq!(tax.ordinal_for("Baz"), None);
    }

    #[test]
    fn test_negative_ordinal_rejected() {
        assert!(MapTaxonomy::new([(-1, "Foo")]).is_err());
    }

    #[test]
    fn test_resolver() {
        let mut resolver = MapResolver::new();
        resolver.insert(7, MapTaxonomy::new([(1, "name")]).unwrap());

        let tax = resolver.resolve(7).unwrap();
        assert_eq!(tax.name_for(1), Some("name"));
        assert!(resolver.resolve(8).is_none());
    }
}
