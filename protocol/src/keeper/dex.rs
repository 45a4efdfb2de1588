//! # DEX Reservations
//!
//! The order book lives elsewhere. This module keeps two ledgers on its
//! behalf and validates every order against the token rules before the DEX
//! accepts it:
//!
//! - **locked**: coins an open order may still spend. They stay in the
//!   account but no longer count as spendable.
//! - **expected to receive**: coins an open order may still bring in. Only
//!   tracked for denoms that cap holdings (whitelisting) or delegate policy
//!   (extension), because nobody else needs it.
//!
//! ```text
//!   execute_actions:
//!     check order amounts
//!       → increase locked → decrease locked
//!       → increase expected → decrease expected
//!       → sends
//!       → extension place_order (spent denom, then received denom)
//! ```

use tracing::debug;

use crate::context::Context;
use crate::error::{FtError, FtResult};
use crate::types::{Address, Amount, Coin, Definition, DexActions, DexOrder, Event, Feature};

use super::supply::require_positive;
use super::{DenomPolicy, FtKeeper, OrderLeg, DEX_EXPECTED_TO_RECEIVE, DEX_LOCKED};

impl FtKeeper {
    // -----------------------------------------------------------------------
    // Locked
    // -----------------------------------------------------------------------

    /// Reserves `coin` of `account` for an open order.
    pub fn increase_dex_locked(
        &self,
        ctx: &mut Context<'_>,
        account: &Address,
        coin: &Coin,
    ) -> FtResult<()> {
        require_positive(coin)?;
        let available = self.dex_spendable(ctx, account, &coin.denom)?;
        if available < coin.amount {
            return Err(FtError::InsufficientSpendableBalance(format!(
                "{} is not available for {account}, available {available}{}",
                coin, coin.denom
            )));
        }
        let (previous, current) =
            DEX_LOCKED.add(ctx.store_mut(), account, &coin.denom, coin.amount)?;
        debug!(denom = %coin.denom, account = %account, previous = %previous, current = %current, "DEX locked increased");
        ctx.emit(Event::DexLockedAmountChanged {
            account: account.clone(),
            denom: coin.denom.clone(),
            previous_amount: previous,
            current_amount: current,
        });
        Ok(())
    }

    /// Releases a reservation. Allowed while the account is frozen.
    pub fn decrease_dex_locked(
        &self,
        ctx: &mut Context<'_>,
        account: &Address,
        coin: &Coin,
    ) -> FtResult<()> {
        require_positive(coin)?;
        let (previous, current) =
            DEX_LOCKED.sub(ctx.store_mut(), account, &coin.denom, coin.amount)?;
        debug!(denom = %coin.denom, account = %account, previous = %previous, current = %current, "DEX locked decreased");
        ctx.emit(Event::DexLockedAmountChanged {
            account: account.clone(),
            denom: coin.denom.clone(),
            previous_amount: previous,
            current_amount: current,
        });
        Ok(())
    }

    pub fn get_dex_locked_balance(
        &self,
        ctx: &Context<'_>,
        account: &Address,
        denom: &str,
    ) -> FtResult<Amount> {
        DEX_LOCKED.get(ctx.store(), account, denom)
    }

    pub fn get_dex_locked_balances(&self, ctx: &Context<'_>, account: &Address) -> FtResult<Vec<Coin>> {
        DEX_LOCKED.balances_of(ctx.store(), account)
    }

    // -----------------------------------------------------------------------
    // Expected to receive
    // -----------------------------------------------------------------------

    pub fn increase_dex_expected_to_receive(
        &self,
        ctx: &mut Context<'_>,
        account: &Address,
        coin: &Coin,
    ) -> FtResult<()> {
        require_positive(coin)?;
        if !self.tracks_expected_to_receive(ctx, &coin.denom)? {
            return Ok(());
        }
        let (previous, current) =
            DEX_EXPECTED_TO_RECEIVE.add(ctx.store_mut(), account, &coin.denom, coin.amount)?;
        self.emit_expected_change(ctx, account, &coin.denom, previous, current);
        Ok(())
    }

    pub fn decrease_dex_expected_to_receive(
        &self,
        ctx: &mut Context<'_>,
        account: &Address,
        coin: &Coin,
    ) -> FtResult<()> {
        require_positive(coin)?;
        if !self.tracks_expected_to_receive(ctx, &coin.denom)? {
            return Ok(());
        }
        let (previous, current) =
            DEX_EXPECTED_TO_RECEIVE.sub(ctx.store_mut(), account, &coin.denom, coin.amount)?;
        self.emit_expected_change(ctx, account, &coin.denom, previous, current);
        Ok(())
    }

    pub fn get_dex_expected_to_receive_balance(
        &self,
        ctx: &Context<'_>,
        account: &Address,
        denom: &str,
    ) -> FtResult<Amount> {
        DEX_EXPECTED_TO_RECEIVE.get(ctx.store(), account, denom)
    }

    pub fn get_dex_expected_to_receive_balances(
        &self,
        ctx: &Context<'_>,
        account: &Address,
    ) -> FtResult<Vec<Coin>> {
        DEX_EXPECTED_TO_RECEIVE.balances_of(ctx.store(), account)
    }

    fn tracks_expected_to_receive(&self, ctx: &Context<'_>, denom: &str) -> FtResult<bool> {
        Ok(self.find_definition(ctx, denom)?.is_some_and(|def| {
            def.is_feature_enabled(Feature::Whitelisting)
                || def.is_feature_enabled(Feature::Extension)
        }))
    }

    fn emit_expected_change(
        &self,
        ctx: &mut Context<'_>,
        account: &Address,
        denom: &str,
        previous: Amount,
        current: Amount,
    ) {
        debug!(denom = %denom, account = %account, previous = %previous, current = %current, "DEX expected to receive changed");
        ctx.emit(Event::DexExpectedToReceiveAmountChanged {
            account: account.clone(),
            denom: denom.to_string(),
            previous_amount: previous,
            current_amount: current,
        });
    }

    // -----------------------------------------------------------------------
    // Order validation
    // -----------------------------------------------------------------------

    /// Validates that `order` may spend `spend` and receive `receive`.
    pub fn check_order_amounts(
        &self,
        ctx: &Context<'_>,
        order: &DexOrder,
        spend: &Coin,
        receive: &Coin,
    ) -> FtResult<()> {
        let creator = &order.creator;

        let available = self.dex_spendable(ctx, creator, &spend.denom)?;
        if available < spend.amount {
            return Err(FtError::InsufficientSpendableBalance(format!(
                "{} is not available for {creator}, available {available}{}",
                spend, spend.denom
            )));
        }

        if let Some(def) = self.find_definition(ctx, &spend.denom)? {
            self.dex_checks(ctx, &def, creator, &receive.denom)?;
            DenomPolicy::of(&def).delegate().check_order_leg(
                self,
                ctx,
                &def,
                creator,
                spend.amount,
                OrderLeg::Spend,
            )?;
        }

        if let Some(def) = self.find_definition(ctx, &receive.denom)? {
            self.dex_checks(ctx, &def, creator, &spend.denom)?;
            let reserved = DEX_EXPECTED_TO_RECEIVE.get(ctx.store(), creator, &receive.denom)?;
            DenomPolicy::of(&def).delegate().check_order_leg(
                self,
                ctx,
                &def,
                creator,
                receive.amount,
                OrderLeg::Receive { reserved },
            )?;
        }
        Ok(())
    }

    /// Token-level DEX rules shared by both legs of an order.
    fn dex_checks(
        &self,
        ctx: &Context<'_>,
        def: &Definition,
        account: &Address,
        counter_denom: &str,
    ) -> FtResult<()> {
        if def.is_feature_enabled(Feature::DexBlock) {
            return Err(FtError::Unauthorized(format!(
                "usage of {} is blocked on DEX",
                def.denom
            )));
        }

        let privileged = def.has_admin_privileges(account);
        if def.is_feature_enabled(Feature::BlockSmartContracts)
            && !privileged
            && ctx.is_triggered_by_contract()
        {
            return Err(FtError::Unauthorized(format!(
                "usage of {} on DEX by smart contracts is blocked",
                def.denom
            )));
        }

        if !privileged && self.is_globally_frozen(ctx, &def.denom)? {
            return Err(FtError::GloballyFrozen(def.denom.clone()));
        }

        if let Some(settings) = self.get_dex_settings(ctx, &def.denom)? {
            if !settings.whitelisted_denoms.is_empty()
                && !settings.whitelisted_denoms.iter().any(|d| d == counter_denom)
            {
                return Err(FtError::Unauthorized(format!(
                    "{counter_denom} is not whitelisted for {}",
                    def.denom
                )));
            }
        }
        Ok(())
    }

    /// Checks that `sender` may cancel every order of `denom`.
    pub fn validate_cancel_orders_by_denom(
        &self,
        ctx: &Context<'_>,
        sender: &Address,
        denom: &str,
    ) -> FtResult<()> {
        let def = self.get_definition(ctx, denom)?;
        if !def.is_admin(sender) {
            return Err(FtError::Unauthorized(format!(
                "only the admin of {denom} can cancel its orders"
            )));
        }
        def.check_feature_allowed(sender, Feature::DexOrderCancellation)
    }

    // -----------------------------------------------------------------------
    // Batched actions
    // -----------------------------------------------------------------------

    /// Applies everything the DEX wants for one order. The first failure
    /// aborts the batch.
    pub fn execute_dex_actions(&self, ctx: &mut Context<'_>, actions: &DexActions) -> FtResult<()> {
        self.check_order_amounts(
            ctx,
            &actions.order,
            &actions.creator_expected_to_spend,
            &actions.creator_expected_to_receive,
        )?;

        for item in &actions.increase_locked {
            self.increase_dex_locked(ctx, &item.account, &item.coin)?;
        }
        for item in &actions.decrease_locked {
            self.decrease_dex_locked(ctx, &item.account, &item.coin)?;
        }
        for item in &actions.increase_expected_to_receive {
            self.increase_dex_expected_to_receive(ctx, &item.account, &item.coin)?;
        }
        for item in &actions.decrease_expected_to_receive {
            self.decrease_dex_expected_to_receive(ctx, &item.account, &item.coin)?;
        }
        for send in &actions.send {
            self.ledger
                .send_coins(ctx, &send.from, &send.to, std::slice::from_ref(&send.coin))?;
        }

        let spent = &actions.creator_expected_to_spend;
        let received = &actions.creator_expected_to_receive;
        for denom in [&spent.denom, &received.denom] {
            if let Some(def) = self.find_definition(ctx, denom)? {
                DenomPolicy::of(&def)
                    .delegate()
                    .place_order(self, ctx, &actions.order, spent, received)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keeper::testutil::*;
    use crate::ledger::KvLedger;
    use crate::storage::MemStore;
    use crate::types::DexSettings;

    fn order(creator: &str, base: &str, quote: &str) -> DexOrder {
        DexOrder {
            creator: addr(creator),
            order_type: "limit".into(),
            id: "order-1".into(),
            sequence: 1,
            base_denom: base.into(),
            quote_denom: quote.into(),
            price: Some("1".into()),
            quantity: 10,
            side: "sell".into(),
        }
    }

    #[test]
    fn increase_locked_respects_vesting() {
        let keeper = keeper();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store);
        fund(&keeper, &mut ctx, "alice", Coin::new("ucore", 1000));
        KvLedger::new()
            .set_locked(&mut ctx, &addr("alice"), &Coin::new("ucore", 50))
            .unwrap();

        assert!(matches!(
            keeper.increase_dex_locked(&mut ctx, &addr("alice"), &Coin::new("ucore", 951)),
            Err(FtError::InsufficientSpendableBalance(_))
        ));
        keeper
            .increase_dex_locked(&mut ctx, &addr("alice"), &Coin::new("ucore", 950))
            .unwrap();
        assert_eq!(keeper.get_dex_locked_balance(&ctx, &addr("alice"), "ucore").unwrap(), 950);
    }

    #[test]
    fn decrease_locked_cannot_go_negative_and_ignores_freeze() {
        let keeper = keeper();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store);
        let denom = issue(&keeper, &mut ctx, &[Feature::Freezing], 1000);
        keeper
            .send(&mut ctx, &issuer(), &addr("alice"), &[Coin::new(&denom, 1000)])
            .unwrap();
        keeper
            .increase_dex_locked(&mut ctx, &addr("alice"), &Coin::new(&denom, 600))
            .unwrap();
        keeper.freeze(&mut ctx, &issuer(), &addr("alice"), &Coin::new(&denom, 1000)).unwrap();

        keeper
            .decrease_dex_locked(&mut ctx, &addr("alice"), &Coin::new(&denom, 400))
            .unwrap();
        assert_eq!(keeper.get_dex_locked_balance(&ctx, &addr("alice"), &denom).unwrap(), 200);
        assert!(matches!(
            keeper.decrease_dex_locked(&mut ctx, &addr("alice"), &Coin::new(&denom, 201)),
            Err(FtError::InsufficientFunds(_))
        ));
        assert!(matches!(
            keeper.decrease_dex_locked(&mut ctx, &addr("alice"), &Coin::new(&denom, 0)),
            Err(FtError::InvalidInput(_))
        ));
    }

    #[test]
    fn expected_to_receive_only_tracked_for_capped_denoms() {
        let keeper = keeper();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store);
        let capped = issue(&keeper, &mut ctx, &[Feature::Whitelisting], 0);

        keeper
            .increase_dex_expected_to_receive(&mut ctx, &addr("alice"), &Coin::new("ucore", 5))
            .unwrap();
        assert_eq!(
            keeper.get_dex_expected_to_receive_balance(&ctx, &addr("alice"), "ucore").unwrap(),
            0
        );

        keeper
            .increase_dex_expected_to_receive(&mut ctx, &addr("alice"), &Coin::new(&capped, 5))
            .unwrap();
        keeper
            .decrease_dex_expected_to_receive(&mut ctx, &addr("alice"), &Coin::new(&capped, 2))
            .unwrap();
        assert_eq!(
            keeper.get_dex_expected_to_receive_balance(&ctx, &addr("alice"), &capped).unwrap(),
            3
        );
    }

    #[test]
    fn whitelist_counts_pending_receipts() {
        let keeper = keeper();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store);
        let denom = issue(&keeper, &mut ctx, &[Feature::Whitelisting], 0);
        fund(&keeper, &mut ctx, "alice", Coin::new("ucore", 100));
        keeper
            .set_whitelisted_balance(&mut ctx, &issuer(), &addr("alice"), &Coin::new(&denom, 10))
            .unwrap();
        keeper
            .increase_dex_expected_to_receive(&mut ctx, &addr("alice"), &Coin::new(&denom, 6))
            .unwrap();

        let o = order("alice", &denom, "ucore");
        let err = keeper
            .check_order_amounts(&ctx, &o, &Coin::new("ucore", 5), &Coin::new(&denom, 5))
            .unwrap_err();
        assert!(matches!(err, FtError::WhitelistedLimitExceeded { after: 11, .. }));
        keeper
            .check_order_amounts(&ctx, &o, &Coin::new("ucore", 4), &Coin::new(&denom, 4))
            .unwrap();
    }

    #[test]
    fn dex_block_and_global_freeze_gate_orders() {
        let keeper = keeper();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store);
        let blocked = issue(&keeper, &mut ctx, &[Feature::DexBlock], 100);
        fund(&keeper, &mut ctx, "alice", Coin::new("ucore", 100));

        let o = order("alice", &blocked, "ucore");
        assert!(matches!(
            keeper.check_order_amounts(&ctx, &o, &Coin::new("ucore", 1), &Coin::new(&blocked, 1)),
            Err(FtError::Unauthorized(_))
        ));

        let mut s = settings(&[Feature::Freezing], 100);
        s.subunit = "ufrz".into();
        s.symbol = "FRZ".into();
        let frozen = keeper.issue(&mut ctx, s).unwrap();
        keeper
            .send(&mut ctx, &issuer(), &addr("alice"), &[Coin::new(&frozen, 50)])
            .unwrap();
        keeper.globally_freeze(&mut ctx, &issuer(), &frozen).unwrap();

        let o = order("alice", &frozen, "ucore");
        assert!(matches!(
            keeper.check_order_amounts(&ctx, &o, &Coin::new(&frozen, 1), &Coin::new("ucore", 1)),
            Err(FtError::GloballyFrozen(_))
        ));
        let admin_order = order("issuer", &frozen, "ucore");
        keeper
            .check_order_amounts(&ctx, &admin_order, &Coin::new(&frozen, 1), &Coin::new("ucore", 1))
            .unwrap();
    }

    #[test]
    fn dex_whitelisted_denoms_restrict_counterparts() {
        let keeper = keeper();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store);
        let mut s = settings(&[Feature::DexWhitelistedDenoms], 100);
        s.dex_settings = Some(DexSettings {
            unified_ref_amount: None,
            whitelisted_denoms: vec!["ucore".into()],
        });
        let denom = keeper.issue(&mut ctx, s).unwrap();
        keeper
            .send(&mut ctx, &issuer(), &addr("alice"), &[Coin::new(&denom, 50)])
            .unwrap();

        let ok = order("alice", &denom, "ucore");
        keeper
            .check_order_amounts(&ctx, &ok, &Coin::new(&denom, 10), &Coin::new("ucore", 10))
            .unwrap();
        let bad = order("alice", &denom, "uother");
        assert!(matches!(
            keeper.check_order_amounts(&ctx, &bad, &Coin::new(&denom, 10), &Coin::new("uother", 10)),
            Err(FtError::Unauthorized(_))
        ));
    }

    #[test]
    fn execute_actions_applies_in_order_and_aborts_on_error() {
        let keeper = keeper();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store);
        let denom = issue(&keeper, &mut ctx, &[Feature::Whitelisting], 0);
        fund(&keeper, &mut ctx, "alice", Coin::new("ucore", 100));
        keeper
            .set_whitelisted_balance(&mut ctx, &issuer(), &addr("alice"), &Coin::new(&denom, 100))
            .unwrap();

        let mut actions = DexActions::new(
            order("alice", &denom, "ucore"),
            Coin::new("ucore", 40),
            Coin::new(&denom, 40),
        );
        actions.add_increase_locked(addr("alice"), Coin::new("ucore", 40)).unwrap();
        actions
            .add_increase_expected_to_receive(addr("alice"), Coin::new(&denom, 40))
            .unwrap();
        keeper.execute_dex_actions(&mut ctx, &actions).unwrap();

        assert_eq!(keeper.get_dex_locked_balance(&ctx, &addr("alice"), "ucore").unwrap(), 40);
        assert_eq!(
            keeper.get_dex_expected_to_receive_balance(&ctx, &addr("alice"), &denom).unwrap(),
            40
        );

        let mut too_much = DexActions::new(
            order("alice", &denom, "ucore"),
            Coin::new("ucore", 61),
            Coin::new(&denom, 10),
        );
        too_much.add_increase_locked(addr("alice"), Coin::new("ucore", 61)).unwrap();
        assert!(matches!(
            keeper.execute_dex_actions(&mut ctx, &too_much),
            Err(FtError::InsufficientSpendableBalance(_))
        ));
    }

    #[test]
    fn cancel_orders_needs_admin_and_feature() {
        let keeper = keeper();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store);
        let denom = issue(&keeper, &mut ctx, &[Feature::DexOrderCancellation], 0);

        keeper
            .validate_cancel_orders_by_denom(&ctx, &issuer(), &denom)
            .unwrap();
        assert!(matches!(
            keeper.validate_cancel_orders_by_denom(&ctx, &addr("alice"), &denom),
            Err(FtError::Unauthorized(_))
        ));

        let mut s = settings(&[], 0);
        s.subunit = "uxyz".into();
        s.symbol = "XYZ".into();
        let plain = keeper.issue(&mut ctx, s).unwrap();
        assert!(matches!(
            keeper.validate_cancel_orders_by_denom(&ctx, &issuer(), &plain),
            Err(FtError::FeatureDisabled { .. })
        ));
    }
}
