//! Build target catalog: human-readable target names mapped to remote ids.
//!
//! The catalog keeps the order in which targets appear in the config file,
//! so `supported_builds` lists them the way the operator wrote them.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

/// Ordered, immutable mapping from build target name to remote target id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildTargetCatalog {
    entries: Vec<(String, String)>,
}

impl BuildTargetCatalog {
    /// Build a catalog from `(name, id)` pairs.
    ///
    /// A repeated name keeps its first position and takes the last id.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut entries: Vec<(String, String)> = Vec::new();
        for (name, id) in pairs {
            let (name, id) = (name.into(), id.into());
            match entries.iter_mut().find(|(existing, _)| *existing == name) {
                Some(entry) => entry.1 = id,
                None => entries.push((name, id)),
            }
        }
        Self { entries }
    }

    /// Look up the remote id for a target name. Exact match only.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, id)| id.as_str())
    }

    /// Target names in catalog order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Names with upper-case letters. Chat input is lower-cased before the
    /// lookup, so these can never be matched from a command.
    pub fn unreachable_names(&self) -> impl Iterator<Item = &str> {
        self.names().filter(|name| name.chars().any(char::is_uppercase))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'de> Deserialize<'de> for BuildTargetCatalog {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CatalogVisitor;

        impl<'de> Visitor<'de> for CatalogVisitor {
            type Value = BuildTargetCatalog;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of build target names to build target ids")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut pairs = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, id)) = map.next_entry::<String, String>()? {
                    pairs.push((name, id));
                }
                Ok(BuildTargetCatalog::from_pairs(pairs))
            }
        }

        deserializer.deserialize_map(CatalogVisitor)
    }
}
