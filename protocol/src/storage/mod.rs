//! # Storage Module
//!
//! Everything the engine persists goes through one byte-oriented key-value
//! namespace. The host hands the engine a [`KvStore`] scoped to the current
//! state transition; the engine never opens databases itself.
//!
//! ## Architecture
//!
//! ```text
//! kv.rs            — KvStore trait, in-memory store, write-buffering overlay
//! sled_store.rs    — sled-backed KvStore for the node binary
//! keys.rs          — key layout (prefix byte + length-prefixed components)
//! balance_store.rs — per-kind (account, denom) -> amount ledgers
//! ```
//!
//! ## Transactional Scope
//!
//! ```text
//!   committed store (sled / memory)
//!          ▲  commit on Ok (one atomic batch)
//!          │
//!     CacheStore ◄── every read and write of one request
//!          │
//!      drop on Err → nothing reaches the parent
//! ```
//!
//! Values are bincode, like everything else that lands on disk.

pub mod balance_store;
pub mod keys;
pub mod kv;
pub mod sled_store;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub use balance_store::{FeatureBalanceStore, FeatureKind};
pub use kv::{CacheStore, KvStore, MemStore};
pub use sled_store::SledStore;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors raised by the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Value Codec
// ---------------------------------------------------------------------------

/// Encodes a value for storage.
pub fn encode<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Decodes a stored value.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Reads and decodes `key`, if present.
pub fn get_value<T: DeserializeOwned>(store: &dyn KvStore, key: &[u8]) -> StoreResult<Option<T>> {
    match store.get(key)? {
        Some(bytes) => Ok(Some(decode(&bytes)?)),
        None => Ok(None),
    }
}

/// Encodes and writes `value` under `key`.
pub fn set_value<T: Serialize>(store: &mut dyn KvStore, key: &[u8], value: &T) -> StoreResult<()> {
    let bytes = encode(value)?;
    store.set(key, &bytes)
}
