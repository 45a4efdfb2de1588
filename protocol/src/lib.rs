// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # AssetFT Protocol — Core Library
//!
//! Balance-feature enforcement and fee splitting for issued fungible tokens.
//! Every transfer of an issued denom passes through one pre-commit hook
//! that charges burn and commission rates, then checks the frozen,
//! whitelisted, DEX-locked and vesting-locked ledgers before the bank moves
//! a single coin. Denoms may instead delegate that policy to an extension
//! contract.
//!
//! ## Architecture
//!
//! - **types** — Coins, denoms, definitions, DEX order intents, events.
//! - **storage** — Key-value contract, sled backend, feature-balance ledgers.
//! - **ledger** — The bank collaborator and a key-value reference ledger.
//! - **rates** — Burn/commission share calculation over squashed legs.
//! - **extension** — Runtime and host traits for extension contracts.
//! - **keeper** — The engine: issuance, gates, transfer hook, DEX reservations.
//! - **host** — Request execution with commit-or-discard semantics.
//! - **context** — Per-request store view, purpose markers and events.
//! - **config** — Key prefixes, validation limits, module parameters.
//! - **error** — The error taxonomy.
//!
//! ## Design Rules
//!
//! 1. Amounts are `u128`. Feature balances never go negative.
//! 2. The keeper holds no state. Everything flows through the [`Context`].
//! 3. A failed request leaves nothing behind: no writes, no events.
//! 4. Rates round up. The protocol never under-charges.

pub mod config;
pub mod context;
pub mod error;
pub mod extension;
pub mod host;
pub mod keeper;
pub mod ledger;
pub mod rates;
pub mod storage;
pub mod types;

pub use config::ModuleParams;
pub use context::{Context, TransferPurpose};
pub use error::{FtError, FtResult};
pub use extension::{ContractError, ExtensionHost, ExtensionRuntime, NoExtensions};
pub use host::Host;
pub use keeper::{FtKeeper, Leg};
pub use ledger::{KvLedger, Ledger};
pub use types::{AccountCoin, Address, Amount, Coin, Definition, Event, Feature, IssueSettings};
