//! # Ledger Collaborator
//!
//! The engine never owns spendable balances. It reads and moves them through
//! the [`Ledger`] trait, which a host implements on top of its bank.
//!
//! [`KvLedger`] is the reference implementation. It keeps balances in the
//! same key-value namespace as the module state, under its own prefixes, so
//! a failed request rolls back ledger writes together with everything else.
//!
//! | Prefix | Key                         | Value                  |
//! |--------|-----------------------------|------------------------|
//! | `0x10` | `lp(account) \|\| denom`    | balance                |
//! | `0x11` | `denom`                     | total supply           |
//! | `0x12` | `denom`                     | `bincode(DenomMetadata)` |
//! | `0x13` | `lp(account) \|\| denom`    | vesting-locked amount  |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::Context;
use crate::error::{FtError, FtResult};
use crate::storage::keys::address_key;
use crate::storage::{get_value, set_value, KvStore};
use crate::types::{AccountCoin, Address, Amount, Coin};

const BALANCE_KEY_PREFIX: u8 = 0x10;
const SUPPLY_KEY_PREFIX: u8 = 0x11;
const METADATA_KEY_PREFIX: u8 = 0x12;
const VESTING_LOCKED_KEY_PREFIX: u8 = 0x13;

/// Display metadata the ledger keeps for every denom it knows about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenomMetadata {
    pub denom: String,
    pub symbol: String,
    pub description: String,
    pub precision: u32,
    pub uri: String,
    pub uri_hash: String,
}

/// Bank primitives consumed by the engine.
///
/// `send_coins` and `input_output_coins` are raw moves: they do not invoke
/// the transfer hook. Hooked transfers go through
/// [`FtKeeper::send`](crate::keeper::FtKeeper::send).
pub trait Ledger: Send + Sync {
    fn get_balance(&self, ctx: &Context<'_>, account: &Address, denom: &str) -> FtResult<Amount>;

    /// Amount locked by vesting or any other ledger-side lock.
    fn locked_coins(&self, ctx: &Context<'_>, account: &Address, denom: &str) -> FtResult<Amount>;

    fn send_coins(
        &self,
        ctx: &mut Context<'_>,
        from: &Address,
        to: &Address,
        coins: &[Coin],
    ) -> FtResult<()>;

    /// Multi-party move. Per denom, inputs and outputs must sum equally.
    fn input_output_coins(
        &self,
        ctx: &mut Context<'_>,
        inputs: &[AccountCoin],
        outputs: &[AccountCoin],
    ) -> FtResult<()>;

    fn mint_coins(&self, ctx: &mut Context<'_>, to: &Address, coin: &Coin) -> FtResult<()>;

    fn burn_coins(&self, ctx: &mut Context<'_>, from: &Address, coin: &Coin) -> FtResult<()>;

    fn get_denom_metadata(&self, ctx: &Context<'_>, denom: &str) -> FtResult<Option<DenomMetadata>>;

    fn set_denom_metadata(&self, ctx: &mut Context<'_>, metadata: DenomMetadata) -> FtResult<()>;

    fn total_supply(&self, ctx: &Context<'_>, denom: &str) -> FtResult<Amount>;
}

/// Checks that every denom balances between inputs and outputs.
pub fn validate_input_outputs(inputs: &[AccountCoin], outputs: &[AccountCoin]) -> FtResult<()> {
    if inputs.is_empty() {
        return Err(FtError::InvalidInput("no inputs to send transaction".into()));
    }
    if outputs.is_empty() {
        return Err(FtError::InvalidInput("no outputs to send transaction".into()));
    }

    let mut totals: BTreeMap<&str, (Amount, Amount)> = BTreeMap::new();
    for leg in inputs {
        let entry = totals.entry(leg.coin.denom.as_str()).or_default();
        entry.0 = entry
            .0
            .checked_add(leg.coin.amount)
            .ok_or_else(|| FtError::InvalidInput("input sum overflow".into()))?;
    }
    for leg in outputs {
        let entry = totals.entry(leg.coin.denom.as_str()).or_default();
        entry.1 = entry
            .1
            .checked_add(leg.coin.amount)
            .ok_or_else(|| FtError::InvalidInput("output sum overflow".into()))?;
    }

    for (denom, (sum_in, sum_out)) in totals {
        if sum_in != sum_out {
            return Err(FtError::InvalidInput(format!(
                "sum inputs {sum_in}{denom} != sum outputs {sum_out}{denom}"
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// KvLedger
// ---------------------------------------------------------------------------

/// Reference ledger over the request's key-value store.
#[derive(Debug, Clone, Copy, Default)]
pub struct KvLedger;

impl KvLedger {
    pub fn new() -> Self {
        Self
    }

    fn balance_key(account: &Address, denom: &str) -> FtResult<Vec<u8>> {
        address_key(BALANCE_KEY_PREFIX, account, denom.as_bytes())
    }

    fn supply_key(denom: &str) -> Vec<u8> {
        let mut key = vec![SUPPLY_KEY_PREFIX];
        key.extend_from_slice(denom.as_bytes());
        key
    }

    fn metadata_key(denom: &str) -> Vec<u8> {
        let mut key = vec![METADATA_KEY_PREFIX];
        key.extend_from_slice(denom.as_bytes());
        key
    }

    fn read_amount(store: &dyn KvStore, key: &[u8]) -> FtResult<Amount> {
        Ok(get_value::<Amount>(store, key)?.unwrap_or(0))
    }

    fn write_amount(store: &mut dyn KvStore, key: &[u8], amount: Amount) -> FtResult<()> {
        if amount == 0 {
            store.delete(key)?;
        } else {
            set_value(store, key, &amount)?;
        }
        Ok(())
    }

    fn add_balance(store: &mut dyn KvStore, account: &Address, coin: &Coin) -> FtResult<()> {
        let key = Self::balance_key(account, &coin.denom)?;
        let balance = Self::read_amount(store, &key)?;
        let new = balance
            .checked_add(coin.amount)
            .ok_or_else(|| FtError::InvalidInput(format!("balance overflow for {account}")))?;
        Self::write_amount(store, &key, new)
    }

    fn sub_balance(store: &mut dyn KvStore, account: &Address, coin: &Coin) -> FtResult<()> {
        let key = Self::balance_key(account, &coin.denom)?;
        let balance = Self::read_amount(store, &key)?;
        let new = balance.checked_sub(coin.amount).ok_or_else(|| {
            FtError::InsufficientFunds(format!(
                "spendable balance {balance}{} is smaller than {coin}",
                coin.denom
            ))
        })?;
        Self::write_amount(store, &key, new)
    }

    /// Sets the vesting-locked amount of an account. Stands in for the
    /// vesting module of a real chain.
    pub fn set_locked(
        &self,
        ctx: &mut Context<'_>,
        account: &Address,
        coin: &Coin,
    ) -> FtResult<()> {
        let key = address_key(VESTING_LOCKED_KEY_PREFIX, account, coin.denom.as_bytes())?;
        Self::write_amount(ctx.store_mut(), &key, coin.amount)
    }

    /// Sum of every account balance of `denom`. Used by conservation checks.
    pub fn sum_balances(&self, ctx: &Context<'_>, denom: &str) -> FtResult<Amount> {
        let mut total: Amount = 0;
        for (key, value) in ctx.store().scan_prefix(&[BALANCE_KEY_PREFIX])? {
            let (_, tail) = crate::storage::keys::split_address_key(&key)?;
            if tail == denom.as_bytes() {
                let amount: Amount = crate::storage::decode(&value)?;
                total = total
                    .checked_add(amount)
                    .ok_or_else(|| FtError::InvalidState("balance sum overflow".into()))?;
            }
        }
        Ok(total)
    }
}

impl Ledger for KvLedger {
    fn get_balance(&self, ctx: &Context<'_>, account: &Address, denom: &str) -> FtResult<Amount> {
        Self::read_amount(ctx.store(), &Self::balance_key(account, denom)?)
    }

    fn locked_coins(&self, ctx: &Context<'_>, account: &Address, denom: &str) -> FtResult<Amount> {
        let key = address_key(VESTING_LOCKED_KEY_PREFIX, account, denom.as_bytes())?;
        Self::read_amount(ctx.store(), &key)
    }

    fn send_coins(
        &self,
        ctx: &mut Context<'_>,
        from: &Address,
        to: &Address,
        coins: &[Coin],
    ) -> FtResult<()> {
        for coin in coins.iter().filter(|c| c.is_positive()) {
            Self::sub_balance(ctx.store_mut(), from, coin)?;
            Self::add_balance(ctx.store_mut(), to, coin)?;
            debug!(from = %from, to = %to, coin = %coin, "ledger send");
        }
        Ok(())
    }

    fn input_output_coins(
        &self,
        ctx: &mut Context<'_>,
        inputs: &[AccountCoin],
        outputs: &[AccountCoin],
    ) -> FtResult<()> {
        validate_input_outputs(inputs, outputs)?;
        for leg in inputs {
            Self::sub_balance(ctx.store_mut(), &leg.account, &leg.coin)?;
        }
        for leg in outputs {
            Self::add_balance(ctx.store_mut(), &leg.account, &leg.coin)?;
        }
        debug!(inputs = inputs.len(), outputs = outputs.len(), "ledger multi-send");
        Ok(())
    }

    fn mint_coins(&self, ctx: &mut Context<'_>, to: &Address, coin: &Coin) -> FtResult<()> {
        let key = Self::supply_key(&coin.denom);
        let supply = Self::read_amount(ctx.store(), &key)?;
        let new = supply
            .checked_add(coin.amount)
            .ok_or_else(|| FtError::InvalidInput(format!("supply overflow for {}", coin.denom)))?;
        Self::write_amount(ctx.store_mut(), &key, new)?;
        Self::add_balance(ctx.store_mut(), to, coin)
    }

    fn burn_coins(&self, ctx: &mut Context<'_>, from: &Address, coin: &Coin) -> FtResult<()> {
        Self::sub_balance(ctx.store_mut(), from, coin)?;
        let key = Self::supply_key(&coin.denom);
        let supply = Self::read_amount(ctx.store(), &key)?;
        let new = supply.checked_sub(coin.amount).ok_or_else(|| {
            FtError::InvalidState(format!("burning {coin} exceeds total supply {supply}"))
        })?;
        Self::write_amount(ctx.store_mut(), &key, new)
    }

    fn get_denom_metadata(&self, ctx: &Context<'_>, denom: &str) -> FtResult<Option<DenomMetadata>> {
        Ok(get_value(ctx.store(), &Self::metadata_key(denom))?)
    }

    fn set_denom_metadata(&self, ctx: &mut Context<'_>, metadata: DenomMetadata) -> FtResult<()> {
        let key = Self::metadata_key(&metadata.denom);
        set_value(ctx.store_mut(), &key, &metadata)?;
        Ok(())
    }

    fn total_supply(&self, ctx: &Context<'_>, denom: &str) -> FtResult<Amount> {
        Self::read_amount(ctx.store(), &Self::supply_key(denom))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
