//! # Asset Extension Contract
//!
//! Reference policy for extension denoms. The engine skips its built-in
//! gates for these denoms, so the contract enforces them itself:
//!
//! - **Freezing**: a non-admin sender must keep its frozen amount.
//! - **Whitelisting**: a non-admin recipient must stay within its limit.
//! - **Smart contracts**: with `block_smart_contracts`, contracts other
//!   than the issuer and this instance cannot receive the denom.
//!
//! A few transfer amounts act as triggers, which makes every branch of the
//! engine's dispatcher reachable from a test:
//!
//! | Amount | Effect |
//! |--------|--------|
//! | 7      | transfer rejected |
//! | 49     | whitelisting skipped |
//! | 79     | freezing skipped |
//! | 105    | the amount is also minted to each recipient |
//! | 108    | burn rate waived |
//! | 109    | commission waived |
//!
//! Orders of quantity 7 are rejected; every other order id is recorded.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use assetft_protocol::extension::{
    read_contract_state, ExtensionInstantiateMsg, ExtensionPlaceOrderMsg, ExtensionTransferMsg,
    TransferVerdict,
};
use assetft_protocol::{Address, Amount, Coin, Context, ContractError, Definition, Feature, FtError, FtResult};

use crate::runtime::{ContractEnv, ExtensionCode};

pub const AMOUNT_DISALLOWED_TRIGGER: Amount = 7;
pub const AMOUNT_IGNORE_WHITELISTING_TRIGGER: Amount = 49;
pub const AMOUNT_IGNORE_FREEZING_TRIGGER: Amount = 79;
pub const AMOUNT_MINTING_TRIGGER: Amount = 105;
pub const AMOUNT_IGNORE_BURN_RATE_TRIGGER: Amount = 108;
pub const AMOUNT_IGNORE_COMMISSION_TRIGGER: Amount = 109;
pub const ORDER_QUANTITY_DISALLOWED_TRIGGER: Amount = 7;

const DENOM_KEY: &[u8] = b"denom";
const ISSUANCE_MSG_KEY: &[u8] = b"issuance_msg";
const LAST_ORDER_ID_KEY: &[u8] = b"last_order_id";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Reasons the contract refuses a transfer or an order.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssetExtensionError {
    #[error("{0} is not allowed")]
    AmountDisallowed(Amount),

    /// The sender would dip into its frozen amount.
    #[error("freezing: {account} cannot spend {amount}")]
    Frozen { account: Address, amount: Amount },

    /// The recipient would exceed its whitelisted limit.
    #[error("whitelisting: {account} would hold {after}, limit {limit}")]
    NotWhitelisted {
        account: Address,
        after: Amount,
        limit: Amount,
    },

    #[error("smart contract {0} is blocked")]
    SmartContractBlocked(Address),

    #[error("order quantity {0} is not allowed")]
    OrderDisallowed(Amount),

    /// The call names a denom this instance does not manage.
    #[error("instance manages {expected}, got {actual}")]
    WrongDenom { expected: String, actual: String },
}

impl From<AssetExtensionError> for ContractError {
    fn from(e: AssetExtensionError) -> Self {
        ContractError::Rejected(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Sudo messages this contract understands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum SudoMsg {
    ExtensionTransfer(ExtensionTransferMsg),
    ExtensionPlaceOrder(ExtensionPlaceOrderMsg),
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// The reference extension. Stateless as code; each instance keeps its
/// denom and last order id in its own state.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssetExtension;

impl AssetExtension {
    /// Id of the last order this instance accepted.
    pub fn last_order_id(ctx: &Context<'_>, contract: &Address) -> FtResult<Option<String>> {
        match read_contract_state(ctx, contract, LAST_ORDER_ID_KEY)? {
            None => Ok(None),
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| FtError::InvalidState(format!("corrupt last order id: {e}"))),
        }
    }

    fn managed_denom(env: &ContractEnv<'_, '_>, denom: &str) -> Result<(), ContractError> {
        let expected: String = env.load(DENOM_KEY)?.ok_or_else(|| {
            ContractError::Host(FtError::InvalidState(format!(
                "contract {} has no denom",
                env.address
            )))
        })?;
        if expected != denom {
            return Err(AssetExtensionError::WrongDenom {
                expected,
                actual: denom.to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn transfer(
        &self,
        env: &mut ContractEnv<'_, '_>,
        msg: &ExtensionTransferMsg,
    ) -> Result<TransferVerdict, ContractError> {
        Self::managed_denom(env, &msg.denom)?;
        let amount = msg.transfer_amount;
        if amount == AMOUNT_DISALLOWED_TRIGGER {
            return Err(AssetExtensionError::AmountDisallowed(amount).into());
        }

        let def = env.host.definition(&*env.ctx, &msg.denom)?;
        if def.is_feature_enabled(Feature::Freezing) && amount != AMOUNT_IGNORE_FREEZING_TRIGGER {
            check_freezing(env, &def, &msg.sender, amount)?;
        }
        if def.is_feature_enabled(Feature::Whitelisting)
            && amount != AMOUNT_IGNORE_WHITELISTING_TRIGGER
        {
            for recipient in &msg.recipients {
                check_whitelisting(env, &def, &recipient.account, recipient.amount)?;
            }
        }
        if def.is_feature_enabled(Feature::BlockSmartContracts) {
            for contract in &msg.context.smart_contract_recipients {
                if !def.is_issuer(contract) && contract != env.address {
                    return Err(AssetExtensionError::SmartContractBlocked(contract.clone()).into());
                }
            }
        }

        if amount == AMOUNT_MINTING_TRIGGER {
            for recipient in &msg.recipients {
                let coin = Coin::new(msg.denom.clone(), recipient.amount);
                debug!(contract = %env.address, recipient = %recipient.account, amount = %recipient.amount, "minting on trigger");
                env.host.mint(env.ctx, env.address, &recipient.account, &coin)?;
            }
        }

        Ok(TransferVerdict {
            ignore_burn_rate: amount == AMOUNT_IGNORE_BURN_RATE_TRIGGER,
            ignore_commission: amount == AMOUNT_IGNORE_COMMISSION_TRIGGER,
        })
    }

    fn place_order(
        &self,
        env: &mut ContractEnv<'_, '_>,
        msg: &ExtensionPlaceOrderMsg,
    ) -> Result<(), ContractError> {
        if msg.order.quantity == ORDER_QUANTITY_DISALLOWED_TRIGGER {
            return Err(AssetExtensionError::OrderDisallowed(msg.order.quantity).into());
        }
        debug!(contract = %env.address, order = %msg.order.id, "order recorded");
        env.save(LAST_ORDER_ID_KEY, &msg.order.id)
    }
}

/// Balance after the transfer must still cover the frozen amount.
fn check_freezing(
    env: &ContractEnv<'_, '_>,
    def: &Definition,
    sender: &Address,
    amount: Amount,
) -> Result<(), ContractError> {
    if def.is_admin(sender) {
        return Ok(());
    }
    let balance = env.host.balance(&*env.ctx, sender, &def.denom)?;
    let frozen = env.host.frozen_balance(&*env.ctx, sender, &def.denom)?;
    if balance.saturating_sub(frozen) < amount {
        return Err(AssetExtensionError::Frozen {
            account: sender.clone(),
            amount,
        }
        .into());
    }
    Ok(())
}

fn check_whitelisting(
    env: &ContractEnv<'_, '_>,
    def: &Definition,
    recipient: &Address,
    amount: Amount,
) -> Result<(), ContractError> {
    if def.is_admin(recipient) || recipient == env.address {
        return Ok(());
    }
    let balance = env.host.balance(&*env.ctx, recipient, &def.denom)?;
    let limit = env.host.whitelisted_balance(&*env.ctx, recipient, &def.denom)?;
    let after = balance.saturating_add(amount);
    if after > limit {
        return Err(AssetExtensionError::NotWhitelisted {
            account: recipient.clone(),
            after,
            limit,
        }
        .into());
    }
    Ok(())
}

impl ExtensionCode for AssetExtension {
    fn name(&self) -> &str {
        "asset-extension"
    }

    fn instantiate(
        &self,
        env: &mut ContractEnv<'_, '_>,
        msg: &ExtensionInstantiateMsg,
    ) -> Result<(), ContractError> {
        env.save(DENOM_KEY, &msg.denom)?;
        env.save(ISSUANCE_MSG_KEY, &msg.issuance_msg)
    }

    fn sudo(
        &self,
        env: &mut ContractEnv<'_, '_>,
        msg: &serde_json::Value,
    ) -> Result<Option<serde_json::Value>, ContractError> {
        let msg: SudoMsg = serde_json::from_value(msg.clone())
            .map_err(|e| ContractError::InvalidMessage(e.to_string()))?;
        match msg {
            SudoMsg::ExtensionTransfer(transfer) => {
                let verdict = self.transfer(env, &transfer)?;
                let reply = serde_json::to_value(verdict)
                    .map_err(|e| ContractError::InvalidMessage(e.to_string()))?;
                Ok(Some(reply))
            }
            SudoMsg::ExtensionPlaceOrder(order) => {
                self.place_order(env, &order)?;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sudo_messages_parse_by_method_name() {
        let raw = serde_json::json!({
            "extension_place_order": {
                "order": {
                    "creator": "maker",
                    "type": "limit",
                    "id": "o-1",
                    "sequence": 1,
                    "base_denom": "ua-issuer",
                    "quote_denom": "ucore",
                    "quantity": "10",
                    "side": "sell"
                },
                "spent": { "denom": "ua-issuer", "amount": "10" },
                "received": { "denom": "ucore", "amount": "10" }
            }
        });
        let msg: SudoMsg = serde_json::from_value(raw).unwrap();
        match msg {
            SudoMsg::ExtensionPlaceOrder(order) => assert_eq!(order.order.id, "o-1"),
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn unknown_methods_do_not_parse() {
        let raw = serde_json::json!({ "extension_unknown": {} });
        assert!(serde_json::from_value::<SudoMsg>(raw).is_err());
    }

    #[test]
    fn refusals_become_rejections() {
        let err: ContractError = AssetExtensionError::AmountDisallowed(7).into();
        assert_eq!(err.to_string(), "rejected: 7 is not allowed");
    }
}
