//! Spend and receive gates.
//!
//! Evaluated fresh for every leg, after rate shares have been taken, so the
//! balances they read already reflect burns and commissions of the same
//! request.
//!
//! ```text
//!   spend:   refund? ─► global freeze ─► incoming? ─► contract block ─► locks ─► frozen
//!   receive: outgoing? (ibc) ─► refund? ─► whitelist ─► contract block
//! ```

use tracing::debug;

use crate::context::{Context, TransferPurpose};
use crate::error::{FtError, FtResult};
use crate::types::{Address, Amount, Definition, Feature};

use super::{FtKeeper, DEX_LOCKED, FROZEN, WHITELISTED};

impl FtKeeper {
    /// Checks that `account` may spend `amount` of `def.denom`.
    pub fn check_spendable(
        &self,
        ctx: &Context<'_>,
        def: &Definition,
        account: &Address,
        amount: Amount,
    ) -> FtResult<()> {
        let purpose = ctx.purpose();
        if purpose.is_refund() {
            return Ok(());
        }

        if def.is_feature_enabled(Feature::Freezing) && self.is_globally_frozen(ctx, &def.denom)? {
            return Err(FtError::GloballyFrozen(def.denom.clone()));
        }

        if purpose == TransferPurpose::In {
            return Ok(());
        }

        if def.is_feature_enabled(Feature::BlockSmartContracts)
            && !def.has_admin_privileges(account)
            && ctx.is_triggered_by_contract()
        {
            return Err(FtError::Unauthorized(format!(
                "transfers of {} made by smart contracts are disabled",
                def.denom
            )));
        }

        self.check_not_locked(ctx, account, &def.denom, amount)?;
        self.check_not_frozen(ctx, def, account, amount)
    }

    /// Checks that `account` may receive `amount` of `def.denom`.
    pub fn check_receivable(
        &self,
        ctx: &Context<'_>,
        def: &Definition,
        account: &Address,
        amount: Amount,
    ) -> FtResult<()> {
        self.check_receivable_reserved(ctx, def, account, amount, 0)
    }

    /// Like [`check_receivable`](Self::check_receivable), counting `reserved`
    /// towards the whitelisted limit as if it had already arrived.
    pub(crate) fn check_receivable_reserved(
        &self,
        ctx: &Context<'_>,
        def: &Definition,
        account: &Address,
        amount: Amount,
        reserved: Amount,
    ) -> FtResult<()> {
        match ctx.purpose() {
            TransferPurpose::Out => {
                if !def.is_feature_enabled(Feature::Ibc) {
                    return Err(FtError::Unauthorized(format!(
                        "ibc transfers are disabled for {}",
                        def.denom
                    )));
                }
                return Ok(());
            }
            TransferPurpose::Ack | TransferPurpose::Timeout => return Ok(()),
            TransferPurpose::None | TransferPurpose::In => {}
        }

        let privileged = def.has_admin_privileges(account);

        if def.is_feature_enabled(Feature::Whitelisting) && !privileged {
            let limit = WHITELISTED.get(ctx.store(), account, &def.denom)?;
            let balance = self.ledger.get_balance(ctx, account, &def.denom)?;
            let after = balance
                .checked_add(amount)
                .and_then(|sum| sum.checked_add(reserved))
                .ok_or_else(|| FtError::InvalidInput(format!("balance overflow for {account}")))?;
            if after > limit {
                return Err(FtError::WhitelistedLimitExceeded {
                    account: account.to_string(),
                    denom: def.denom.clone(),
                    after,
                    limit,
                });
            }
        }

        if def.is_feature_enabled(Feature::BlockSmartContracts)
            && !privileged
            && self.runtime.is_smart_contract(ctx, account)?
        {
            return Err(FtError::Unauthorized(format!(
                "transfers of {} to smart contracts are disabled",
                def.denom
            )));
        }

        Ok(())
    }

    /// Fails unless `balance - dexLocked - vestingLocked >= amount`.
    pub(crate) fn check_not_locked(
        &self,
        ctx: &Context<'_>,
        account: &Address,
        denom: &str,
        amount: Amount,
    ) -> FtResult<()> {
        let available = self.dex_spendable(ctx, account, denom)?;
        if available < amount {
            return Err(FtError::InsufficientFunds(format!(
                "{amount}{denom} is not available, available {available}{denom}"
            )));
        }
        Ok(())
    }

    /// Fails unless `balance - frozen >= amount`. Privileged accounts are
    /// never frozen.
    pub(crate) fn check_not_frozen(
        &self,
        ctx: &Context<'_>,
        def: &Definition,
        account: &Address,
        amount: Amount,
    ) -> FtResult<()> {
        if !def.is_feature_enabled(Feature::Freezing) || def.has_admin_privileges(account) {
            return Ok(());
        }
        let balance = self.ledger.get_balance(ctx, account, &def.denom)?;
        let frozen = FROZEN.get(ctx.store(), account, &def.denom)?;
        let available = balance.saturating_sub(frozen);
        if available < amount {
            debug!(denom = %def.denom, account = %account, frozen = %frozen, "spend blocked by freeze");
            return Err(FtError::InsufficientFunds(format!(
                "{amount}{} is not available, available {available}{}",
                def.denom, def.denom
            )));
        }
        Ok(())
    }

    /// `balance - dexLocked - vestingLocked`, floored at zero.
    pub(crate) fn dex_spendable(
        &self,
        ctx: &Context<'_>,
        account: &Address,
        denom: &str,
    ) -> FtResult<Amount> {
        let balance = self.ledger.get_balance(ctx, account, denom)?;
        let dex_locked = DEX_LOCKED.get(ctx.store(), account, denom)?;
        let vesting_locked = self.ledger.locked_coins(ctx, account, denom)?;
        Ok(balance
            .saturating_sub(dex_locked)
            .saturating_sub(vesting_locked))
    }
}
