//! Storage trait definitions and document keys.

use std::fmt;

use crate::domain::PoolKind;
use crate::error::Result;

/// Which family of documents a key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Per-pool fairness history
    History,
    /// Per-scope exclusion cycles of the no-repeat modes
    Cycles,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::History => "history",
            Collection::Cycles => "cycles",
        }
    }
}

/// Address of one stored document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentKey {
    pub collection: Collection,
    pub kind: PoolKind,
    pub name: String,
}

impl DocumentKey {
    pub fn new(collection: Collection, kind: PoolKind, name: impl Into<String>) -> Self {
        Self {
            collection,
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.collection.as_str(), self.kind, self.name.escape_debug())
    }
}

/// Durable key/value storage of JSON documents.
///
/// Implementations must make `put` atomic: a reader sees either the previous
/// document or the new one, never a partial write.
pub trait DocumentStore: Send + Sync {
    /// Get a document, `None` if it was never written or has been removed.
    fn get(&self, key: &DocumentKey) -> Result<Option<serde_json::Value>>;

    /// Create or replace a document.
    fn put(&self, key: &DocumentKey, document: &serde_json::Value) -> Result<()>;

    /// Remove a document. Returns whether it existed.
    fn remove(&self, key: &DocumentKey) -> Result<bool>;

    /// Names of all documents of one kind in a collection.
    fn names(&self, collection: Collection, kind: PoolKind) -> Result<Vec<String>>;

    /// Write several documents as one unit: all of them land, or none does.
    ///
    /// The default writes them one by one and puts the previous documents back when a
    /// write fails. Backends with transactions should override it.
    fn put_many(&self, documents: &[(DocumentKey, serde_json::Value)]) -> Result<()> {
        let previous = documents
            .iter()
            .map(|(key, _)| self.get(key))
            .collect::<Result<Vec<_>>>()?;

        for (written, (key, document)) in documents.iter().enumerate() {
            if let Err(e) = self.put(key, document) {
                for ((key, _), old) in documents[..written].iter().zip(&previous[..written]).rev() {
                    let restored = match old {
                        Some(old) => self.put(key, old),
                        None => self.remove(key).map(|_| ()),
                    };
                    if let Err(restore_err) = restored {
                        log::error!("Could not roll back {}: {}", key, restore_err);
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FairDrawError;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Map-backed store that refuses to write one document name.
    #[derive(Default)]
    struct MemoryStore {
        documents: Mutex<HashMap<DocumentKey, serde_json::Value>>,
        refuse: Option<String>,
    }

    impl DocumentStore for MemoryStore {
        fn get(&self, key: &DocumentKey) -> Result<Option<serde_json::Value>> {
            Ok(self.documents.lock().unwrap().get(key).cloned())
        }

        fn put(&self, key: &DocumentKey, document: &serde_json::Value) -> Result<()> {
            if self.refuse.as_deref() == Some(key.name.as_str()) {
                return Err(FairDrawError::Persistence(format!("refusing {}", key)));
            }
            self.documents.lock().unwrap().insert(key.clone(), document.clone());
            Ok(())
        }

        fn remove(&self, key: &DocumentKey) -> Result<bool> {
            Ok(self.documents.lock().unwrap().remove(key).is_some())
        }

        fn names(&self, _collection: Collection, _kind: PoolKind) -> Result<Vec<String>> {
            Ok(self.documents.lock().unwrap().keys().map(|k| k.name.clone()).collect())
        }
    }

    #[test]
    fn test_put_many_rolls_back_on_failure() {
        let store = MemoryStore {
            refuse: Some("cycle".to_string()),
            ..Default::default()
        };
        let existing = DocumentKey::new(Collection::History, PoolKind::RollCall, "c");
        let fresh = DocumentKey::new(Collection::History, PoolKind::Lottery, "p");
        let refused = DocumentKey::new(Collection::Cycles, PoolKind::RollCall, "cycle");
        store.put(&existing, &json!({"total_rounds": 4})).unwrap();

        let result = store.put_many(&[
            (existing.clone(), json!({"total_rounds": 5})),
            (fresh.clone(), json!({"total_rounds": 1})),
            (refused, json!({})),
        ]);

        assert!(result.is_err());
        assert_eq!(store.get(&existing).unwrap(), Some(json!({"total_rounds": 4})));
        assert_eq!(store.get(&fresh).unwrap(), None);
    }

    #[test]
    fn test_collection_names() {
        assert_eq!(Collection::History.as_str(), "history");
        assert_eq!(Collection::Cycles.as_str(), "cycles");
    }

    #[test]
    fn test_key_display_escapes_separators() {
        let key = DocumentKey::new(Collection::Cycles, PoolKind::RollCall, "c1\u{1f}all\u{1f}F");
        assert_eq!(key.to_string(), "cycles/roll_call/c1\\u{1f}all\\u{1f}F");
    }
}
