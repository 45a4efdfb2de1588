//! Supply changes: mint, burn and clawback.
//!
//! Mints and burns route through the module account so the ledger only ever
//! mints into, and burns from, an account it trusts.

use tracing::debug;

use crate::context::Context;
use crate::error::{FtError, FtResult};
use crate::types::{Address, Amount, Coin, Definition, Event, Feature};

use super::FtKeeper;

impl FtKeeper {
    /// Mints `coin` to `recipient` (the sender when `None`).
    pub fn mint(
        &self,
        ctx: &mut Context<'_>,
        sender: &Address,
        recipient: Option<&Address>,
        coin: &Coin,
    ) -> FtResult<()> {
        require_positive(coin)?;
        let def = self.get_definition(ctx, &coin.denom)?;
        def.check_feature_allowed(sender, Feature::Minting)?;
        let recipient = recipient.unwrap_or(sender);
        self.mint_if_receivable(ctx, &def, coin.amount, recipient)
    }

    /// Burns `coin` from the sender's own balance.
    pub fn burn(&self, ctx: &mut Context<'_>, sender: &Address, coin: &Coin) -> FtResult<()> {
        require_positive(coin)?;
        let def = self.get_definition(ctx, &coin.denom)?;
        def.check_feature_allowed(sender, Feature::Burning)?;
        if def.extension().is_none() {
            self.check_spendable(ctx, &def, sender, coin.amount)?;
        } else {
            self.check_not_locked(ctx, sender, &coin.denom, coin.amount)?;
        }
        self.burn_raw(ctx, sender, coin)
    }

    /// Takes `coin` away from `account` and hands it to the admin.
    pub fn clawback(
        &self,
        ctx: &mut Context<'_>,
        sender: &Address,
        account: &Address,
        coin: &Coin,
    ) -> FtResult<()> {
        require_positive(coin)?;
        if *account == self.params.module_account {
            return Err(FtError::Unauthorized(
                "claw back from the module account is prohibited".into(),
            ));
        }
        let def = self.get_definition(ctx, &coin.denom)?;
        def.check_feature_allowed(sender, Feature::Clawback)?;
        self.check_not_locked(ctx, account, &coin.denom, coin.amount)?;

        self.ledger
            .send_coins(ctx, account, sender, std::slice::from_ref(coin))?;

        debug!(denom = %coin.denom, account = %account, amount = %coin.amount, "clawback");
        ctx.emit(Event::AmountClawedBack {
            account: account.clone(),
            coin: coin.clone(),
        });
        Ok(())
    }

    pub(crate) fn mint_if_receivable(
        &self,
        ctx: &mut Context<'_>,
        def: &Definition,
        amount: Amount,
        recipient: &Address,
    ) -> FtResult<()> {
        if amount == 0 {
            return Ok(());
        }
        if def.extension().is_none() {
            self.check_receivable(ctx, def, recipient, amount)?;
        }
        let coin = Coin::new(def.denom.clone(), amount);
        let module = self.params.module_account.clone();
        self.ledger.mint_coins(ctx, &module, &coin)?;
        self.ledger
            .send_coins(ctx, &module, recipient, std::slice::from_ref(&coin))?;
        debug!(denom = %def.denom, recipient = %recipient, amount = %amount, "minted");
        Ok(())
    }

    /// Burns without any checks beyond the ledger's own balance check.
    pub(crate) fn burn_raw(
        &self,
        ctx: &mut Context<'_>,
        holder: &Address,
        coin: &Coin,
    ) -> FtResult<()> {
        let module = self.params.module_account.clone();
        self.ledger
            .send_coins(ctx, holder, &module, std::slice::from_ref(coin))?;
        self.ledger.burn_coins(ctx, &module, coin)?;
        debug!(denom = %coin.denom, holder = %holder, amount = %coin.amount, "burned");
        Ok(())
    }
}

pub(crate) fn require_positive(coin: &Coin) -> FtResult<()> {
    if coin.is_positive() {
        Ok(())
    } else {
        Err(FtError::InvalidInput(format!(
            "amount must be positive, got {coin}"
        )))
    }
}
