//! Whitelisted limits: the most a non-privileged account may hold.

use tracing::debug;

use crate::context::Context;
use crate::error::{FtError, FtResult};
use crate::types::{Address, Amount, Coin, Event, Feature};

use super::{FtKeeper, WHITELISTED};

impl FtKeeper {
    /// Sets the whitelisted limit of `account`. Zero removes it.
    pub fn set_whitelisted_balance(
        &self,
        ctx: &mut Context<'_>,
        sender: &Address,
        account: &Address,
        coin: &Coin,
    ) -> FtResult<()> {
        let def = self.get_definition(ctx, &coin.denom)?;
        if def.is_admin(account) {
            return Err(FtError::Unauthorized(
                "admin's balance can't be whitelisted".into(),
            ));
        }
        def.check_feature_allowed(sender, Feature::Whitelisting)?;

        let previous = WHITELISTED.get(ctx.store(), account, &coin.denom)?;
        WHITELISTED.set(ctx.store_mut(), account, &coin.denom, coin.amount)?;

        debug!(denom = %coin.denom, account = %account, previous = %previous, current = %coin.amount, "whitelisted amount changed");
        ctx.emit(Event::WhitelistedAmountChanged {
            account: account.clone(),
            denom: coin.denom.clone(),
            previous_amount: previous,
            current_amount: coin.amount,
        });
        Ok(())
    }

    pub fn get_whitelisted_balance(
        &self,
        ctx: &Context<'_>,
        account: &Address,
        denom: &str,
    ) -> FtResult<Amount> {
        WHITELISTED.get(ctx.store(), account, denom)
    }

    pub fn get_whitelisted_balances(
        &self,
        ctx: &Context<'_>,
        account: &Address,
    ) -> FtResult<Vec<Coin>> {
        WHITELISTED.balances_of(ctx.store(), account)
    }
}
