//! # SledStore — Persistent Module State
//!
//! sled-backed [`KvStore`]. The whole module keyspace lives in a single
//! named tree so that a commit is one atomic `Batch`: either every write of
//! a request lands on disk or none does.
//!
//! | Tree      | Key                        | Value            |
//! |-----------|----------------------------|------------------|
//! | `assetft` | prefix byte + components   | bincode payloads |
//! | `meta`    | key (UTF-8)                | raw bytes        |

use std::path::Path;

use sled::{Batch, Db, Tree};

use super::kv::{BatchOp, KvStore};
use super::StoreResult;

const MODULE_TREE: &str = "assetft";
const META_TREE: &str = "meta";

/// Persistent module store.
///
/// Cheap to clone: sled handles are reference counted and safe to share
/// across threads.
#[derive(Debug, Clone)]
pub struct SledStore {
    db: Db,
    module: Tree,
    meta: Tree,
}

impl SledStore {
    /// Open or create a store at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// A store that lives in memory and vanishes on drop. For tests.
    pub fn open_temporary() -> StoreResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let module = db.open_tree(MODULE_TREE)?;
        let meta = db.open_tree(META_TREE)?;
        Ok(Self { db, module, meta })
    }

    /// Reads a host-level metadata entry (not part of module state).
    pub fn get_meta(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.meta.get(key.as_bytes())?.map(|v| v.to_vec()))
    }

    pub fn set_meta(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        self.meta.insert(key.as_bytes(), value)?;
        Ok(())
    }

    /// Number of module entries on disk.
    pub fn len(&self) -> usize {
        self.module.len()
    }

    pub fn is_empty(&self) -> bool {
        self.module.is_empty()
    }

    /// Blocks until everything written so far is durable.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl KvStore for SledStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.module.get(key)?.map(|v| v.to_vec()))
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.module.insert(key, value)?;
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> StoreResult<()> {
        self.module.remove(key)?;
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> StoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut entries = Vec::new();
        for result in self.module.scan_prefix(prefix) {
            let (key, value) = result?;
            entries.push((key.to_vec(), value.to_vec()));
        }
        Ok(entries)
    }

    fn write_batch(&mut self, ops: Vec<BatchOp>) -> StoreResult<()> {
        let mut batch = Batch::default();
        for (key, value) in ops {
            match value {
                Some(v) => batch.insert(key, v),
                None => batch.remove(key),
            }
        }
        self.module.apply_batch(batch)?;
        self.db.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
