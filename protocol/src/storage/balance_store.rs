//! # Feature Balances
//!
//! Four auxiliary ledgers share one implementation: frozen, whitelisted,
//! DEX-locked and DEX-expected-to-receive amounts. Each maps
//! `(account, denom)` to a non-negative amount under its own key prefix.
//!
//! ```text
//!   prefix || lp(account) || denom  ->  bincode(u128)
//! ```
//!
//! A zero amount is never stored: setting zero deletes the entry, so
//! absence and zero are indistinguishable to readers. Iteration follows key
//! order, which is account-major, denom-minor.

use std::fmt;

use crate::config::{
    DEX_EXPECTED_TO_RECEIVE_BALANCES_KEY_PREFIX, DEX_LOCKED_BALANCES_KEY_PREFIX,
    FROZEN_BALANCES_KEY_PREFIX, WHITELISTED_BALANCES_KEY_PREFIX,
};
use crate::error::{FtError, FtResult};
use crate::types::{AccountCoin, Address, Amount, Coin};

use super::keys::{address_key, address_prefix, split_address_key};
use super::{decode, get_value, set_value, KvStore, StoreError};

/// Which auxiliary ledger a [`FeatureBalanceStore`] addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    Frozen,
    Whitelisted,
    DexLocked,
    DexExpectedToReceive,
}

impl FeatureKind {
    pub const ALL: [FeatureKind; 4] = [
        FeatureKind::Frozen,
        FeatureKind::Whitelisted,
        FeatureKind::DexLocked,
        FeatureKind::DexExpectedToReceive,
    ];

    pub fn prefix(&self) -> u8 {
        match self {
            FeatureKind::Frozen => FROZEN_BALANCES_KEY_PREFIX,
            FeatureKind::Whitelisted => WHITELISTED_BALANCES_KEY_PREFIX,
            FeatureKind::DexLocked => DEX_LOCKED_BALANCES_KEY_PREFIX,
            FeatureKind::DexExpectedToReceive => DEX_EXPECTED_TO_RECEIVE_BALANCES_KEY_PREFIX,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKind::Frozen => "frozen",
            FeatureKind::Whitelisted => "whitelisted",
            FeatureKind::DexLocked => "dex_locked",
            FeatureKind::DexExpectedToReceive => "dex_expected_to_receive",
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FeatureKind {
    type Err = FtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| FtError::InvalidInput(format!("unknown balance kind {s}")))
    }
}

// ---------------------------------------------------------------------------
// FeatureBalanceStore
// ---------------------------------------------------------------------------

/// Typed view over one feature ledger. Holds no state of its own; the
/// store is passed to every call so the same view works against any
/// overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureBalanceStore {
    kind: FeatureKind,
}

impl FeatureBalanceStore {
    pub const fn new(kind: FeatureKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> FeatureKind {
        self.kind
    }

    fn key(&self, account: &Address, denom: &str) -> FtResult<Vec<u8>> {
        address_key(self.kind.prefix(), account, denom.as_bytes())
    }

    /// Current amount, zero when absent.
    pub fn get(&self, store: &dyn KvStore, account: &Address, denom: &str) -> FtResult<Amount> {
        let key = self.key(account, denom)?;
        Ok(get_value::<Amount>(store, &key)?.unwrap_or(0))
    }

    /// Overwrites the amount. Zero deletes the entry.
    pub fn set(
        &self,
        store: &mut dyn KvStore,
        account: &Address,
        denom: &str,
        amount: Amount,
    ) -> FtResult<()> {
        let key = self.key(account, denom)?;
        if amount == 0 {
            store.delete(&key)?;
        } else {
            set_value(store, &key, &amount)?;
        }
        Ok(())
    }

    /// Adds `delta` and returns `(previous, new)`.
    pub fn add(
        &self,
        store: &mut dyn KvStore,
        account: &Address,
        denom: &str,
        delta: Amount,
    ) -> FtResult<(Amount, Amount)> {
        let previous = self.get(store, account, denom)?;
        let new = previous.checked_add(delta).ok_or_else(|| {
            FtError::InvalidInput(format!(
                "{} balance overflow for {account}: {previous} + {delta}{denom}",
                self.kind
            ))
        })?;
        self.set(store, account, denom, new)?;
        Ok((previous, new))
    }

    /// Subtracts `delta` and returns `(previous, new)`.
    ///
    /// Fails with `InsufficientFunds` rather than going below zero.
    pub fn sub(
        &self,
        store: &mut dyn KvStore,
        account: &Address,
        denom: &str,
        delta: Amount,
    ) -> FtResult<(Amount, Amount)> {
        let previous = self.get(store, account, denom)?;
        let new = previous.checked_sub(delta).ok_or_else(|| {
            FtError::InsufficientFunds(format!(
                "{} balance of {account} is {previous}{denom}, cannot subtract {delta}{denom}",
                self.kind
            ))
        })?;
        self.set(store, account, denom, new)?;
        Ok((previous, new))
    }

    /// Every non-zero balance of one account, ordered by denom.
    pub fn balances_of(&self, store: &dyn KvStore, account: &Address) -> FtResult<Vec<Coin>> {
        let prefix = address_prefix(self.kind.prefix(), account)?;
        store
            .scan_prefix(&prefix)?
            .into_iter()
            .map(|(key, value)| {
                let (_, denom) = parse_entry(&key)?;
                Ok(Coin::new(denom, decode::<Amount>(&value)?))
            })
            .collect()
    }

    /// Visits every entry in key order until the callback returns `true`.
    pub fn iterate_all<F>(&self, store: &dyn KvStore, mut callback: F) -> FtResult<()>
    where
        F: FnMut(AccountCoin) -> FtResult<bool>,
    {
        for (key, value) in store.scan_prefix(&[self.kind.prefix()])? {
            let (account, denom) = parse_entry(&key)?;
            let amount: Amount = decode(&value)?;
            let stop = callback(AccountCoin {
                account,
                coin: Coin::new(denom, amount),
            })?;
            if stop {
                break;
            }
        }
        Ok(())
    }

    /// One page of the ledger plus the total number of entries.
    pub fn page(
        &self,
        store: &dyn KvStore,
        offset: usize,
        limit: usize,
    ) -> FtResult<(Vec<AccountCoin>, usize)> {
        let entries = store.scan_prefix(&[self.kind.prefix()])?;
        let total = entries.len();
        let page = entries
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(key, value)| {
                let (account, denom) = parse_entry(&key)?;
                Ok(AccountCoin {
                    account,
                    coin: Coin::new(denom, decode::<Amount>(&value)?),
                })
            })
            .collect::<FtResult<Vec<_>>>()?;
        Ok((page, total))
    }
}

fn parse_entry(key: &[u8]) -> FtResult<(Address, String)> {
    let (account, tail) = split_address_key(key)?;
    let denom = String::from_utf8(tail)
        .map_err(|_| StoreError::Serialization("non-UTF-8 denom in balance key".into()))?;
    Ok((account, denom))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
