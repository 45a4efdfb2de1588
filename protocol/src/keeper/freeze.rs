//! Per-account and global freezing.
//!
//! Frozen amounts are a ceiling on what an account may spend, not a claim on
//! specific coins: an account may hold less than its frozen amount, in which
//! case everything it holds is frozen.

use tracing::{debug, info};

use crate::context::Context;
use crate::error::{FtError, FtResult};
use crate::types::{Address, Amount, Coin, Definition, Event, Feature};

use super::supply::require_positive;
use super::{FtKeeper, FROZEN};

impl FtKeeper {
    /// Adds `coin` to the frozen amount of `account`.
    pub fn freeze(
        &self,
        ctx: &mut Context<'_>,
        sender: &Address,
        account: &Address,
        coin: &Coin,
    ) -> FtResult<()> {
        require_positive(coin)?;
        let def = self.get_definition(ctx, &coin.denom)?;
        freezing_checks(&def, sender, account)?;
        let (previous, current) = FROZEN.add(ctx.store_mut(), account, &coin.denom, coin.amount)?;
        self.emit_frozen_change(ctx, account, &coin.denom, previous, current);
        Ok(())
    }

    /// Subtracts `coin` from the frozen amount of `account`.
    pub fn unfreeze(
        &self,
        ctx: &mut Context<'_>,
        sender: &Address,
        account: &Address,
        coin: &Coin,
    ) -> FtResult<()> {
        require_positive(coin)?;
        let def = self.get_definition(ctx, &coin.denom)?;
        freezing_checks(&def, sender, account)?;
        let (previous, current) = FROZEN.sub(ctx.store_mut(), account, &coin.denom, coin.amount)?;
        self.emit_frozen_change(ctx, account, &coin.denom, previous, current);
        Ok(())
    }

    /// Overwrites the frozen amount of `account`. Zero clears it.
    pub fn set_frozen(
        &self,
        ctx: &mut Context<'_>,
        sender: &Address,
        account: &Address,
        coin: &Coin,
    ) -> FtResult<()> {
        let def = self.get_definition(ctx, &coin.denom)?;
        freezing_checks(&def, sender, account)?;
        let previous = FROZEN.get(ctx.store(), account, &coin.denom)?;
        FROZEN.set(ctx.store_mut(), account, &coin.denom, coin.amount)?;
        self.emit_frozen_change(ctx, account, &coin.denom, previous, coin.amount);
        Ok(())
    }

    pub fn globally_freeze(&self, ctx: &mut Context<'_>, sender: &Address, denom: &str) -> FtResult<()> {
        self.change_global_freeze(ctx, sender, denom, true)
    }

    pub fn globally_unfreeze(
        &self,
        ctx: &mut Context<'_>,
        sender: &Address,
        denom: &str,
    ) -> FtResult<()> {
        self.change_global_freeze(ctx, sender, denom, false)
    }

    fn change_global_freeze(
        &self,
        ctx: &mut Context<'_>,
        sender: &Address,
        denom: &str,
        frozen: bool,
    ) -> FtResult<()> {
        let def = self.get_definition(ctx, denom)?;
        def.check_feature_allowed(sender, Feature::Freezing)?;
        self.set_global_freeze(ctx, denom, frozen)?;
        info!(denom = %denom, frozen, "global freeze changed");
        ctx.emit(Event::GlobalFreezeChanged {
            denom: denom.to_string(),
            frozen,
        });
        Ok(())
    }

    /// Frozen amount of `account`, or its whole balance while the denom is
    /// globally frozen.
    pub fn get_frozen_balance(
        &self,
        ctx: &Context<'_>,
        account: &Address,
        denom: &str,
    ) -> FtResult<Amount> {
        if self.is_globally_frozen(ctx, denom)? {
            return self.ledger.get_balance(ctx, account, denom);
        }
        FROZEN.get(ctx.store(), account, denom)
    }

    /// Stored frozen amounts of `account`, one coin per denom.
    pub fn get_frozen_balances(&self, ctx: &Context<'_>, account: &Address) -> FtResult<Vec<Coin>> {
        FROZEN.balances_of(ctx.store(), account)
    }

    /// What `account` can actually move:
    /// `min(balance - dexLocked - vestingLocked, balance - frozen)`, floored at zero.
    pub fn get_spendable_balance(
        &self,
        ctx: &Context<'_>,
        account: &Address,
        denom: &str,
    ) -> FtResult<Amount> {
        let balance = self.ledger.get_balance(ctx, account, denom)?;
        let not_locked = self.dex_spendable(ctx, account, denom)?;
        let frozen = self.get_frozen_balance(ctx, account, denom)?;
        Ok(not_locked.min(balance.saturating_sub(frozen)))
    }

    fn emit_frozen_change(
        &self,
        ctx: &mut Context<'_>,
        account: &Address,
        denom: &str,
        previous: Amount,
        current: Amount,
    ) {
        debug!(denom = %denom, account = %account, previous = %previous, current = %current, "frozen amount changed");
        ctx.emit(Event::FrozenAmountChanged {
            account: account.clone(),
            denom: denom.to_string(),
            previous_amount: previous,
            current_amount: current,
        });
    }
}

fn freezing_checks(def: &Definition, sender: &Address, account: &Address) -> FtResult<()> {
    if def.has_admin_privileges(account) {
        return Err(FtError::Unauthorized("admin's balance can't be frozen".into()));
    }
    def.check_feature_allowed(sender, Feature::Freezing)
}
