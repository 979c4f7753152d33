//! One-JSON-file-per-document storage with atomic replace.
//!
//! Layout: `<base>/<collection>/<kind>/<sha256(name)>.json`. Pool names come from
//! users (class names, prize pool titles) so they are hashed rather than used as file
//! names; the real name is kept inside the file next to the document.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::traits::{Collection, DocumentKey, DocumentStore};
use crate::domain::PoolKind;
use crate::error::Result;

/// What is written to disk for each document.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    name: String,
    document: serde_json::Value,
}

/// File-backed document store.
#[derive(Debug)]
pub struct JsonFileStore {
    base_path: PathBuf,
}

impl JsonFileStore {
    /// Create a store rooted at the given directory.
    pub fn new(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn kind_dir(&self, collection: Collection, kind: PoolKind) -> PathBuf {
        self.base_path.join(collection.as_str()).join(kind.as_str())
    }

    fn document_path(&self, key: &DocumentKey) -> PathBuf {
        self.kind_dir(key.collection, key.kind)
            .join(format!("{}.json", file_stem(&key.name)))
    }

    fn read_envelope(path: &Path) -> Result<Option<Envelope>> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Hex SHA-256 of the document name.
fn file_stem(name: &str) -> String {
    hex::encode(Sha256::digest(name.as_bytes()))
}

/// Write `bytes` to `path` so that readers never observe a partial file.
///
/// The data goes to a sibling temp file first, is flushed to disk, and then
/// renamed over the target.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("document");
    let tmp_path = dir.join(format!(".{}.{}.{:08x}.tmp", file_name, std::process::id(), rand::random::<u32>()));

    let result = (|| -> Result<()> {
        let mut file = File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

impl DocumentStore for JsonFileStore {
    fn get(&self, key: &DocumentKey) -> Result<Option<serde_json::Value>> {
        let path = self.document_path(key);
        Ok(Self::read_envelope(&path)?.map(|envelope| envelope.document))
    }

    fn put(&self, key: &DocumentKey, document: &serde_json::Value) -> Result<()> {
        let envelope = Envelope {
            name: key.name.clone(),
            document: document.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&envelope)?;
        write_atomic(&self.document_path(key), &bytes)
    }

    fn remove(&self, key: &DocumentKey) -> Result<bool> {
        match fs::remove_file(self.document_path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn names(&self, collection: Collection, kind: PoolKind) -> Result<Vec<String>> {
        let dir = self.kind_dir(collection, kind);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read_envelope(&path) {
                Ok(Some(envelope)) => names.push(envelope.name),
                Ok(None) => {}
                Err(e) => log::warn!("Skipping unreadable document {}: {}", path.display(), e),
            }
        }
        names.sort();
        Ok(names)
    }
}
