// ── Core identity types ──
//
// Every key the cache deals in is a string at heart. Wrapping each one
// in its own newtype keeps schema keys, entity ids and pagination keys
// from being swapped at call sites.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

macro_rules! string_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::convert::Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_owned()))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_key!(
    /// Identifier of one entity instance within its schema.
    EntityId
);

string_key!(
    /// Stable key naming one entity type's shape and relations.
    SchemaKey
);

string_key!(
    /// Identifier of the backend endpoint (cluster) a request targets.
    EndpointId
);

string_key!(
    /// Key of one distinct paged query.
    PaginationKey
);

string_key!(
    /// Declared edge between two schemas, formatted `"{parent}-{child}"`.
    RelationKey
);

/// Request parameters, sorted so that key derivation is order-independent.
pub type QueryParams = BTreeMap<String, String>;

impl RelationKey {
    /// Generate the relation key for a `parent -> child` edge.
    pub fn between(parent: &SchemaKey, child: &SchemaKey) -> Self {
        Self(format!("{parent}-{child}"))
    }
}

impl PaginationKey {
    /// Derive the key of a paged query from its base, relation path and
    /// parameters.
    ///
    /// Parameters always participate, so two queries that differ only in
    /// sort or filter never share a pagination state.
    pub fn derive(base: &str, relation_path: Option<&RelationKey>, params: &QueryParams) -> Self {
        let hash = params_hash(params);
        match relation_path {
            Some(relation) => Self(format!("{base}:{relation}:{hash}")),
            None => Self(format!("{base}:{hash}")),
        }
    }
}

/// Stable hash of a parameter set: hex of the first 16 bytes of the
/// SHA-256 over the canonical `k=v&k=v` form.
pub fn params_hash(params: &QueryParams) -> String {
    let mut hasher = Sha256::new();
    for (i, (key, value)) in params.iter().enumerate() {
        if i > 0 {
            hasher.update(b"&");
        }
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
    }
    let digest = hasher.finalize();
    hex::encode(&digest[..16])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn relation_key_format() {
        let key = RelationKey::between(&"application".into(), &"route".into());
        assert_eq!(key.as_str(), "application-route");
    }

    #[test]
    fn params_hash_ignores_insertion_order() {
        let mut a = QueryParams::new();
        a.insert("order".into(), "asc".into());
        a.insert("q".into(), "name:web".into());
        let mut b = QueryParams::new();
        b.insert("q".into(), "name:web".into());
        b.insert("order".into(), "asc".into());
        assert_eq!(params_hash(&a), params_hash(&b));
    }

    #[test]
    fn derived_keys_differ_by_params() {
        let asc = PaginationKey::derive("application", None, &params(&[("order", "asc")]));
        let desc = PaginationKey::derive("application", None, &params(&[("order", "desc")]));
        assert_ne!(asc, desc);
        assert!(asc.as_str().starts_with("application:"));
    }

    #[test]
    fn derived_keys_include_relation_path() {
        let rel = RelationKey::from("application-route");
        let key = PaginationKey::derive("route", Some(&rel), &QueryParams::new());
        assert!(key.as_str().starts_with("route:application-route:"));
    }

    #[test]
    fn ids_parse_and_display() {
        let id: EntityId = "app-1".parse().unwrap();
        assert_eq!(id.to_string(), "app-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"app-1\"");
    }
}
