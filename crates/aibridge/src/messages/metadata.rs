use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

/// Opaque, namespace-keyed extension data attached to messages, content
/// blocks, call options and responses.
///
/// Each entry is owned by exactly one vendor codec, keyed by its namespace
/// (`"anthropic"`, `"openai"`, ...). The core model and foreign codecs never
/// interpret entries; access goes through the typed [`get`](Self::get) and
/// [`insert`](Self::insert) accessors so a codec can round-trip its own
/// structured settings without the core model knowing their shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderMetadata(BTreeMap<String, Value>);

impl ProviderMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deserialize the entry for `namespace` into a typed view.
    ///
    /// Returns `None` when the namespace is absent or its value does not
    /// match `T` — a foreign codec's data is indistinguishable from no data.
    pub fn get<T: DeserializeOwned>(&self, namespace: &str) -> Option<T> {
        let value = self.0.get(namespace)?;
        serde_json::from_value(value.clone()).ok()
    }

    /// Store a typed value under `namespace`, replacing any previous entry.
    ///
    /// Serialization failures are swallowed: metadata is advisory and must
    /// never fail a call.
    pub fn insert<T: Serialize>(&mut self, namespace: &str, value: &T) {
        if let Ok(value) = serde_json::to_value(value) {
            self.0.insert(namespace.to_string(), value);
        }
    }

    pub fn contains(&self, namespace: &str) -> bool {
        self.0.contains_key(namespace)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Namespaces present in the bag, in sorted order.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<T: Serialize> FromIterator<(String, T)> for ProviderMetadata {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        let mut bag = Self::new();
        for (namespace, value) in iter {
            bag.insert(&namespace, &value);
        }
        bag
    }
}
