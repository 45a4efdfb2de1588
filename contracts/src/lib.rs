// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # AssetFT Extension Contracts
//!
//! Contract code for denoms that delegate their transfer and order policy.
//! Nothing here runs in a sandbox: contracts are plain Rust values
//! registered with an [`InProcessRuntime`], which the engine calls through
//! its `ExtensionRuntime` seam.
//!
//! - **Runtime** — code registry, deterministic instance addresses,
//!   dispatch of `instantiate` and `sudo` to the right code.
//! - **Asset Extension** — the reference contract. It re-implements the
//!   freezing, whitelisting and smart-contract gates on its own and reacts
//!   to a handful of trigger amounts.
//!
//! ## Design Principles
//!
//! 1. Contract state lives in the engine's store, under the contract's own
//!    namespace. A runtime holds code, never state.
//! 2. A contract only touches the chain through the `ExtensionHost` it is
//!    handed for the duration of a call.
//! 3. Every refusal is a typed error, reported to the engine as a rejection.

pub mod asset_extension;
pub mod runtime;

pub use asset_extension::{AssetExtension, AssetExtensionError};
pub use runtime::{ContractEnv, ExtensionCode, InProcessRuntime};
