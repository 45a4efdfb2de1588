//! # Extension Runtime Contract
//!
//! Denoms with the `extension` feature delegate their transfer and order
//! policy to a contract. The engine does not run contracts itself: it calls
//! an [`ExtensionRuntime`] synchronously with a JSON message and hands the
//! contract an [`ExtensionHost`], a narrow privileged view over the same
//! uncommitted state the request is working on.
//!
//! ```text
//!   FtKeeper ──sudo(msg)──► ExtensionRuntime ──► contract code
//!       ▲                                            │
//!       └──────────── ExtensionHost calls ◄──────────┘
//! ```
//!
//! Every runtime or contract failure surfaces to the caller as
//! `FtError::ExtensionCallFailed`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::CONTRACT_STATE_KEY_PREFIX;
use crate::context::{Context, TransferPurpose};
use crate::error::{FtError, FtResult};
use crate::storage::keys::{address_prefix, contract_state_key};
use crate::types::{coin::amount_string, Address, Amount, Coin, Definition, DexOrder};

/// Sudo method invoked before a transfer of an extension denom.
pub const EXTENSION_TRANSFER_METHOD: &str = "extension_transfer";

/// Sudo method invoked after a DEX order of an extension denom is accepted.
pub const EXTENSION_PLACE_ORDER_METHOD: &str = "extension_place_order";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures raised by a runtime or by contract code.
#[derive(Debug, Error)]
pub enum ContractError {
    #[error("unknown code id {0}")]
    UnknownCode(u64),

    #[error("no contract at {0}")]
    UnknownContract(Address),

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The contract refused the operation.
    #[error("rejected: {0}")]
    Rejected(String),

    /// A host call made by the contract failed.
    #[error("host call failed: {0}")]
    Host(#[from] FtError),
}

impl From<ContractError> for FtError {
    fn from(e: ContractError) -> Self {
        FtError::ExtensionCallFailed(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// One receiving account of an extension transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecipient {
    pub account: Address,
    #[serde(with = "amount_string")]
    pub amount: Amount,
}

/// Request-level facts the contract cannot observe on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferContext {
    pub sender_is_smart_contract: bool,
    #[serde(default)]
    pub smart_contract_recipients: Vec<Address>,
    pub ibc_purpose: TransferPurpose,
}

/// Body of the `extension_transfer` sudo message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionTransferMsg {
    pub denom: String,
    pub sender: Address,
    pub recipients: Vec<TransferRecipient>,
    #[serde(with = "amount_string")]
    pub transfer_amount: Amount,
    #[serde(with = "amount_string")]
    pub commission_amount: Amount,
    #[serde(with = "amount_string")]
    pub burn_amount: Amount,
    pub context: TransferContext,
}

/// Body of the `extension_place_order` sudo message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionPlaceOrderMsg {
    pub order: DexOrder,
    pub spent: Coin,
    pub received: Coin,
}

/// Body of the instantiate message sent at issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionInstantiateMsg {
    pub denom: String,
    pub issuance_msg: serde_json::Value,
}

/// Optional reply to `extension_transfer`. Missing fields mean "charge".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferVerdict {
    pub ignore_burn_rate: bool,
    pub ignore_commission: bool,
}

impl TransferVerdict {
    /// Parses a contract reply. No reply is the default verdict.
    pub fn from_reply(reply: Option<serde_json::Value>) -> FtResult<Self> {
        match reply {
            None | Some(serde_json::Value::Null) => Ok(Self::default()),
            Some(value) => serde_json::from_value(value).map_err(|e| {
                FtError::ExtensionCallFailed(format!("malformed transfer verdict: {e}"))
            }),
        }
    }
}

/// Wraps a payload as `{ "<method>": payload }`.
pub fn sudo_message<T: Serialize>(method: &str, payload: &T) -> FtResult<serde_json::Value> {
    let body = serde_json::to_value(payload)
        .map_err(|e| FtError::InvalidState(format!("failed to encode {method} message: {e}")))?;
    let mut msg = serde_json::Map::new();
    msg.insert(method.to_string(), body);
    Ok(serde_json::Value::Object(msg))
}

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// Capabilities a contract gets while it runs. All calls act on the
/// request's uncommitted state.
pub trait ExtensionHost {
    fn definition(&self, ctx: &Context<'_>, denom: &str) -> FtResult<Definition>;

    fn balance(&self, ctx: &Context<'_>, account: &Address, denom: &str) -> FtResult<Amount>;

    /// Frozen amount, or the full balance while the denom is globally frozen.
    fn frozen_balance(&self, ctx: &Context<'_>, account: &Address, denom: &str) -> FtResult<Amount>;

    fn whitelisted_balance(&self, ctx: &Context<'_>, account: &Address, denom: &str)
        -> FtResult<Amount>;

    fn is_smart_contract(&self, ctx: &Context<'_>, account: &Address) -> FtResult<bool>;

    /// Moves coins out of the contract's own account without running the hook.
    fn send_from_contract(
        &self,
        ctx: &mut Context<'_>,
        contract: &Address,
        to: &Address,
        coin: &Coin,
    ) -> FtResult<()>;

    /// Mints with the contract's admin privileges.
    fn mint(&self, ctx: &mut Context<'_>, contract: &Address, to: &Address, coin: &Coin)
        -> FtResult<()>;

    /// Burns from the contract's own account.
    fn burn(&self, ctx: &mut Context<'_>, contract: &Address, coin: &Coin) -> FtResult<()>;

    fn state_get(&self, ctx: &Context<'_>, contract: &Address, key: &[u8])
        -> FtResult<Option<Vec<u8>>>;

    fn state_set(
        &self,
        ctx: &mut Context<'_>,
        contract: &Address,
        key: &[u8],
        value: &[u8],
    ) -> FtResult<()>;
}

/// Executes extension contracts.
pub trait ExtensionRuntime: Send + Sync {
    /// Creates a contract instance for `denom` and returns its address.
    fn instantiate(
        &self,
        ctx: &mut Context<'_>,
        host: &dyn ExtensionHost,
        code_id: u64,
        label: &str,
        msg: &ExtensionInstantiateMsg,
    ) -> Result<Address, ContractError>;

    /// Privileged call. `Ok(None)` is a successful call without a reply.
    fn sudo(
        &self,
        ctx: &mut Context<'_>,
        host: &dyn ExtensionHost,
        contract: &Address,
        msg: &serde_json::Value,
    ) -> Result<Option<serde_json::Value>, ContractError>;

    fn is_smart_contract(&self, ctx: &Context<'_>, account: &Address) -> FtResult<bool>;
}

/// Runtime for hosts without contract support: nothing is a contract and
/// every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExtensions;

impl ExtensionRuntime for NoExtensions {
    fn instantiate(
        &self,
        _ctx: &mut Context<'_>,
        _host: &dyn ExtensionHost,
        code_id: u64,
        _label: &str,
        _msg: &ExtensionInstantiateMsg,
    ) -> Result<Address, ContractError> {
        Err(ContractError::UnknownCode(code_id))
    }

    fn sudo(
        &self,
        _ctx: &mut Context<'_>,
        _host: &dyn ExtensionHost,
        contract: &Address,
        _msg: &serde_json::Value,
    ) -> Result<Option<serde_json::Value>, ContractError> {
        Err(ContractError::UnknownContract(contract.clone()))
    }

    fn is_smart_contract(&self, _ctx: &Context<'_>, _account: &Address) -> FtResult<bool> {
        Ok(false)
    }
}

// ---------------------------------------------------------------------------
// Contract state
// ---------------------------------------------------------------------------

/// Reads a private state slot of `contract`.
pub fn read_contract_state(
    ctx: &Context<'_>,
    contract: &Address,
    key: &[u8],
) -> FtResult<Option<Vec<u8>>> {
    let key = contract_state_key(contract, key)?;
    Ok(ctx.store().get(&key)?)
}

/// Writes a private state slot of `contract`.
pub fn write_contract_state(
    ctx: &mut Context<'_>,
    contract: &Address,
    key: &[u8],
    value: &[u8],
) -> FtResult<()> {
    let key = contract_state_key(contract, key)?;
    ctx.store_mut().set(&key, value)?;
    Ok(())
}

/// True if `contract` has any state at all.
pub fn has_contract_state(ctx: &Context<'_>, contract: &Address) -> FtResult<bool> {
    let prefix = address_prefix(CONTRACT_STATE_KEY_PREFIX, contract)?;
    Ok(!ctx.store().scan_prefix(&prefix)?.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemStore;

    #[test]
    fn verdict_defaults_when_reply_is_missing_or_partial() {
        assert_eq!(TransferVerdict::from_reply(None).unwrap(), TransferVerdict::default());
        let partial = serde_json::json!({ "ignore_burn_rate": true });
        let verdict = TransferVerdict::from_reply(Some(partial)).unwrap();
        assert!(verdict.ignore_burn_rate);
        assert!(!verdict.ignore_commission);
    }

    #[test]
    fn malformed_verdict_is_an_extension_failure() {
        let bad = serde_json::json!({ "ignore_burn_rate": "maybe" });
        assert!(matches!(
            TransferVerdict::from_reply(Some(bad)),
            Err(FtError::ExtensionCallFailed(_))
        ));
    }

    #[test]
    fn sudo_message_wraps_payload_under_method_name() {
        let msg = sudo_message(
            EXTENSION_PLACE_ORDER_METHOD,
            &serde_json::json!({ "order": 1 }),
        )
        .unwrap();
        assert_eq!(msg["extension_place_order"]["order"], 1);
    }

    #[test]
    fn contract_errors_map_to_extension_call_failed() {
        let err: FtError = ContractError::Rejected("no".into()).into();
        assert_eq!(err.code(), "extension_call_failed");
    }

    #[test]
    fn contract_state_is_namespaced_per_contract() {
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store);
        let a = Address::new("contract-a");
        let b = Address::new("contract-b");

        write_contract_state(&mut ctx, &a, b"k", b"v").unwrap();
        assert_eq!(read_contract_state(&ctx, &a, b"k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(read_contract_state(&ctx, &b, b"k").unwrap(), None);
        assert!(has_contract_state(&ctx, &a).unwrap());
        assert!(!has_contract_state(&ctx, &b).unwrap());
    }
}
