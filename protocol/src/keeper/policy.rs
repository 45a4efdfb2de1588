//! # Denom Policies
//!
//! Each denom is governed by exactly one policy, picked from its definition:
//!
//! ```text
//!   extension feature + contract ──► ExtensionPolicy { contract }
//!   anything else ─────────────────► BuiltinPolicy
//! ```
//!
//! Both implement [`PolicyDelegate`], one method per hook. The builtin
//! policy charges rates and runs the spend/receive gates itself. The
//! extension policy asks the contract first, charges what the verdict
//! leaves, and leaves gating to the contract.

use tracing::debug;

use crate::context::Context;
use crate::error::{FtError, FtResult};
use crate::extension::{
    sudo_message, ExtensionPlaceOrderMsg, ExtensionTransferMsg, TransferContext,
    TransferRecipient, TransferVerdict, EXTENSION_PLACE_ORDER_METHOD, EXTENSION_TRANSFER_METHOD,
};
use crate::rates::{calculate_rate_shares, AccountAmounts};
use crate::types::{Address, Amount, Coin, Definition, DexOrder};

use super::{FtKeeper, Leg};

/// Which side of an order a leg belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderLeg {
    /// The creator gives this coin away.
    Spend,
    /// The creator gets this coin. `reserved` is what is already expected
    /// from earlier orders.
    Receive { reserved: Amount },
}

/// Policy hooks of a denom.
pub trait PolicyDelegate {
    /// Runs before the ledger moves one denom's legs of a transfer.
    fn before_transfer(
        &self,
        keeper: &FtKeeper,
        ctx: &mut Context<'_>,
        def: &Definition,
        inputs: &AccountAmounts,
        outputs: &AccountAmounts,
    ) -> FtResult<()>;

    /// Validates one leg of a DEX order.
    fn check_order_leg(
        &self,
        keeper: &FtKeeper,
        ctx: &Context<'_>,
        def: &Definition,
        account: &Address,
        amount: Amount,
        leg: OrderLeg,
    ) -> FtResult<()>;

    /// Runs after a DEX order touching the denom has been applied.
    fn place_order(
        &self,
        keeper: &FtKeeper,
        ctx: &mut Context<'_>,
        order: &DexOrder,
        spent: &Coin,
        received: &Coin,
    ) -> FtResult<()>;
}

/// Policy selected for one denom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenomPolicy {
    Builtin(BuiltinPolicy),
    Extension(ExtensionPolicy),
}

impl DenomPolicy {
    pub fn of(def: &Definition) -> Self {
        match def.extension() {
            Some(contract) => DenomPolicy::Extension(ExtensionPolicy {
                contract: contract.clone(),
            }),
            None => DenomPolicy::Builtin(BuiltinPolicy),
        }
    }

    pub fn delegate(&self) -> &dyn PolicyDelegate {
        match self {
            DenomPolicy::Builtin(policy) => policy,
            DenomPolicy::Extension(policy) => policy,
        }
    }
}

// ---------------------------------------------------------------------------
// Builtin
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuiltinPolicy;

impl PolicyDelegate for BuiltinPolicy {
    fn before_transfer(
        &self,
        keeper: &FtKeeper,
        ctx: &mut Context<'_>,
        def: &Definition,
        inputs: &AccountAmounts,
        outputs: &AccountAmounts,
    ) -> FtResult<()> {
        let burn_shares = rate_shares(keeper, ctx, def, RateKind::Burn, inputs, outputs)?;
        let commission_shares =
            rate_shares(keeper, ctx, def, RateKind::Commission, inputs, outputs)?;

        for (sender, share) in &burn_shares {
            apply_burn_share(keeper, ctx, def, sender, *share)?;
        }
        for (sender, share) in &commission_shares {
            apply_commission_share(keeper, ctx, def, sender, *share)?;
        }

        for (account, amount) in inputs {
            keeper.check_spendable(ctx, def, account, *amount)?;
        }
        for (account, amount) in outputs {
            keeper.check_receivable(ctx, def, account, *amount)?;
        }
        Ok(())
    }

    fn check_order_leg(
        &self,
        keeper: &FtKeeper,
        ctx: &Context<'_>,
        def: &Definition,
        account: &Address,
        amount: Amount,
        leg: OrderLeg,
    ) -> FtResult<()> {
        match leg {
            OrderLeg::Spend => keeper
                .check_not_frozen(ctx, def, account, amount)
                .map_err(|e| match e {
                    FtError::InsufficientFunds(msg) => FtError::InsufficientSpendableBalance(msg),
                    other => other,
                }),
            OrderLeg::Receive { reserved } => {
                keeper.check_receivable_reserved(ctx, def, account, amount, reserved)
            }
        }
    }

    fn place_order(
        &self,
        _keeper: &FtKeeper,
        _ctx: &mut Context<'_>,
        _order: &DexOrder,
        _spent: &Coin,
        _received: &Coin,
    ) -> FtResult<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Extension
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionPolicy {
    contract: Address,
}

impl ExtensionPolicy {
    pub fn contract(&self) -> &Address {
        &self.contract
    }
}

impl PolicyDelegate for ExtensionPolicy {
    fn before_transfer(
        &self,
        keeper: &FtKeeper,
        ctx: &mut Context<'_>,
        def: &Definition,
        inputs: &AccountAmounts,
        outputs: &AccountAmounts,
    ) -> FtResult<()> {
        // Locks are ledger-level and bind every sender, contract or not.
        for (sender, amount) in inputs {
            keeper.check_not_locked(ctx, sender, &def.denom, *amount)?;
        }

        // Coins the contract routes to itself must not call it again.
        if outputs.len() == 1 && outputs.contains_key(&self.contract) {
            return Ok(());
        }

        let burn_shares = rate_shares(keeper, ctx, def, RateKind::Burn, inputs, outputs)?;
        let commission_shares =
            rate_shares(keeper, ctx, def, RateKind::Commission, inputs, outputs)?;

        let recipients: Vec<TransferRecipient> = outputs
            .iter()
            .map(|(account, amount)| TransferRecipient {
                account: account.clone(),
                amount: *amount,
            })
            .collect();
        let mut smart_contract_recipients = Vec::new();
        for account in outputs.keys() {
            if keeper.is_smart_contract(ctx, account)? {
                smart_contract_recipients.push(account.clone());
            }
        }

        for (sender, amount) in inputs {
            if def.is_issuer(sender) || *sender == self.contract {
                continue;
            }
            let burn_amount = burn_shares.get(sender).copied().unwrap_or(0);
            let commission_amount = commission_shares.get(sender).copied().unwrap_or(0);

            let msg = ExtensionTransferMsg {
                denom: def.denom.clone(),
                sender: sender.clone(),
                recipients: recipients.clone(),
                transfer_amount: *amount,
                commission_amount,
                burn_amount,
                context: TransferContext {
                    sender_is_smart_contract: keeper.is_smart_contract(ctx, sender)?,
                    smart_contract_recipients: smart_contract_recipients.clone(),
                    ibc_purpose: ctx.purpose(),
                },
            };
            let payload = sudo_message(EXTENSION_TRANSFER_METHOD, &msg)?;
            debug!(denom = %def.denom, sender = %sender, contract = %self.contract, "dispatching extension transfer");
            let reply = keeper.runtime().sudo(ctx, keeper, &self.contract, &payload)?;
            let verdict = TransferVerdict::from_reply(reply)?;

            if !verdict.ignore_burn_rate {
                apply_burn_share(keeper, ctx, def, sender, burn_amount)?;
            }
            if !verdict.ignore_commission {
                apply_commission_share(keeper, ctx, def, sender, commission_amount)?;
            }
        }
        Ok(())
    }

    fn check_order_leg(
        &self,
        _keeper: &FtKeeper,
        _ctx: &Context<'_>,
        _def: &Definition,
        _account: &Address,
        _amount: Amount,
        _leg: OrderLeg,
    ) -> FtResult<()> {
        Ok(())
    }

    fn place_order(
        &self,
        keeper: &FtKeeper,
        ctx: &mut Context<'_>,
        order: &DexOrder,
        spent: &Coin,
        received: &Coin,
    ) -> FtResult<()> {
        let msg = ExtensionPlaceOrderMsg {
            order: order.clone(),
            spent: spent.clone(),
            received: received.clone(),
        };
        let payload = sudo_message(EXTENSION_PLACE_ORDER_METHOD, &msg)?;
        debug!(order = %order.id, contract = %self.contract, "dispatching extension place order");
        keeper.runtime().sudo(ctx, keeper, &self.contract, &payload)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Rate application
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum RateKind {
    Burn,
    Commission,
}

/// Shares of one rate owed by each sender. Empty for rate-exempt purposes;
/// senders that are contracts are dropped.
fn rate_shares(
    keeper: &FtKeeper,
    ctx: &Context<'_>,
    def: &Definition,
    kind: RateKind,
    inputs: &AccountAmounts,
    outputs: &AccountAmounts,
) -> FtResult<AccountAmounts> {
    if ctx.purpose().is_rate_exempt() {
        return Ok(AccountAmounts::new());
    }
    let rate = match kind {
        RateKind::Burn => def.burn_rate,
        RateKind::Commission => def.send_commission_rate,
    };
    let mut shares = calculate_rate_shares(rate, &def.issuer, inputs, outputs)?;

    let mut contracts = Vec::new();
    for sender in shares.keys() {
        if keeper.is_smart_contract(ctx, sender)? {
            contracts.push(sender.clone());
        }
    }
    for sender in contracts {
        shares.remove(&sender);
    }
    Ok(shares)
}

fn apply_burn_share(
    keeper: &FtKeeper,
    ctx: &mut Context<'_>,
    def: &Definition,
    sender: &Address,
    share: Amount,
) -> FtResult<()> {
    if share == 0 {
        return Ok(());
    }
    debug!(denom = %def.denom, account = %sender, amount = %share, "burn share");
    keeper.burn_raw(ctx, sender, &Coin::new(def.denom.clone(), share))
}

/// Commission goes to the admin, or to the extension contract once the
/// admin is gone. With neither there is nobody to pay.
fn apply_commission_share(
    keeper: &FtKeeper,
    ctx: &mut Context<'_>,
    def: &Definition,
    sender: &Address,
    share: Amount,
) -> FtResult<()> {
    if share == 0 {
        return Ok(());
    }
    let recipient = match commission_recipient(def) {
        Some(recipient) => recipient,
        None => return Ok(()),
    };
    debug!(denom = %def.denom, account = %sender, recipient = %recipient, amount = %share, "commission share");
    keeper.move_coins(
        ctx,
        sender,
        &recipient,
        &[Coin::new(def.denom.clone(), share)],
        Leg::Internal,
    )
}

pub(crate) fn commission_recipient(def: &Definition) -> Option<Address> {
    def.admin.clone().or_else(|| def.extension_contract.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Feature;
    use rust_decimal::Decimal;

    fn def(features: Vec<Feature>, admin: Option<&str>, contract: Option<&str>) -> Definition {
        Definition {
            denom: "uabc-issuer".into(),
            issuer: Address::new("issuer"),
            admin: admin.map(Address::new),
            features,
            burn_rate: Decimal::ZERO,
            send_commission_rate: Decimal::ZERO,
            extension_contract: contract.map(Address::new),
            version: 1,
            uri: String::new(),
            uri_hash: String::new(),
        }
    }

    #[test]
    fn policy_follows_extension_feature_and_contract() {
        assert_eq!(
            DenomPolicy::of(&def(vec![], Some("issuer"), None)),
            DenomPolicy::Builtin(BuiltinPolicy)
        );
        let ext = DenomPolicy::of(&def(vec![Feature::Extension], Some("issuer"), Some("ext")));
        match ext {
            DenomPolicy::Extension(policy) => assert_eq!(policy.contract(), &Address::new("ext")),
            other => panic!("expected extension policy, got {other:?}"),
        }
        assert_eq!(
            DenomPolicy::of(&def(vec![], Some("issuer"), Some("ext"))),
            DenomPolicy::Builtin(BuiltinPolicy)
        );
    }

    #[test]
    fn commission_goes_to_admin_then_contract() {
        assert_eq!(
            commission_recipient(&def(vec![], Some("admin"), Some("ext"))),
            Some(Address::new("admin"))
        );
        assert_eq!(
            commission_recipient(&def(vec![], None, Some("ext"))),
            Some(Address::new("ext"))
        );
        assert_eq!(commission_recipient(&def(vec![], None, None)), None);
    }
}
