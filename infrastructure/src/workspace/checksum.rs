//! Session-scoped content checksum store.
//!
//! Backs the optimistic-concurrency check in Edit: a full Read records the
//! hash of what the agent saw; Edit compares the file's current hash against
//! it and reports `EditConflict` on mismatch instead of silently clobbering
//! an external change.
//!
//! One instance per workspace session, shared by every file tool via `Arc`.
//! Entries are never expired — the session is the lifetime. (`clear` exists
//! for a session reset; no tool calls it.)

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Concurrency-safe absolute-path → content-hash map.
#[derive(Debug, Default)]
pub struct ChecksumStore {
    entries: RwLock<HashMap<PathBuf, String>>,
}

impl ChecksumStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash file content. Deterministic change detector — callers only ever
    /// compare outputs for equality.
    pub fn compute(bytes: &[u8]) -> String {
        format!("{:x}", Sha256::digest(bytes))
    }

    /// The hash recorded for `path`, if any Read or mutation stored one.
    pub fn get(&self, path: &Path) -> Option<String> {
        self.entries
            .read()
            .expect("checksum store lock poisoned")
            .get(path)
            .cloned()
    }

    /// Record the hash for `path`, replacing any previous entry.
    pub fn update(&self, path: &Path, hash: impl Into<String>) {
        self.entries
            .write()
            .expect("checksum store lock poisoned")
            .insert(path.to_path_buf(), hash.into());
    }

    /// Drop every entry. For session resets only.
    pub fn clear(&self) {
        self.entries
            .write()
            .expect("checksum store lock poisoned")
            .clear();
    }

    /// Number of tracked paths.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .expect("checksum store lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_compute_is_deterministic() {
        assert_eq!(
            ChecksumStore::compute(b"hello"),
            ChecksumStore::compute(b"hello")
        );
        assert_ne!(
            ChecksumStore::compute(b"hello"),
            ChecksumStore::compute(b"hello!")
        );
    }

    #[test]
    fn test_get_update_roundtrip() {
        let store = ChecksumStore::new();
        let path = Path::new("/work/a.txt");

        assert!(store.get(path).is_none());
        store.update(path, ChecksumStore::compute(b"v1"));
        assert_eq!(store.get(path), Some(ChecksumStore::compute(b"v1")));

        store.update(path, ChecksumStore::compute(b"v2"));
        assert_eq!(store.get(path), Some(ChecksumStore::compute(b"v2")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_concurrent_access() {
        let store = Arc::new(ChecksumStore::new());
        let mut handles = Vec::new();

        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                let path = PathBuf::from(format!("/work/file{i}.txt"));
                for round in 0..100 {
                    store.update(&path, format!("hash-{round}"));
                    assert!(store.get(&path).is_some());
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 8);
    }
}
