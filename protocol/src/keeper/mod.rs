//! # Keeper
//!
//! [`FtKeeper`] is the engine. It owns no state: every call receives the
//! request [`Context`] and reads or writes through it, so the same keeper
//! serves any number of requests and any store overlay.
//!
//! ## Architecture
//!
//! ```text
//! definitions.rs    — issuance, definition/symbol/global-freeze/DEX-settings records
//! supply.rs         — mint, burn, clawback
//! freeze.rs         — per-account and global freezing, spendable balance
//! whitelist.rs      — whitelisted limits
//! admin.rs          — admin transfer/clear, DEX settings updates
//! gate.rs           — spend and receive gates
//! policy.rs         — builtin vs extension policy per denom
//! transfer.rs       — the pre-commit transfer hook and hooked sends
//! dex.rs            — DEX reservations and order validation
//! extension_host.rs — the capabilities handed to extension contracts
//! invariants.rs     — host-run consistency scan
//! queries.rs        — read-only views
//! ```
//!
//! ## Transfer pipeline
//!
//! ```text
//!   send / input_output_coins
//!          │
//!          ▼
//!   squash(inputs), squash(outputs)      denom → account → amount
//!          │
//!          ▼  per denom with a definition
//!   DenomPolicy::of(definition)
//!      ├── Builtin:   burn shares → commission shares (internal leg) → gates
//!      └── Extension: extension_transfer per sender → verdict → rates
//!          │
//!          ▼
//!   Ledger moves the coins
//! ```

pub mod admin;
pub mod definitions;
pub mod dex;
pub mod extension_host;
pub mod freeze;
pub mod gate;
pub mod invariants;
pub mod policy;
pub mod queries;
pub mod supply;
pub mod transfer;
pub mod whitelist;

use std::sync::Arc;

use crate::config::ModuleParams;
use crate::context::Context;
use crate::error::FtResult;
use crate::extension::ExtensionRuntime;
use crate::ledger::Ledger;
use crate::storage::{FeatureBalanceStore, FeatureKind};
use crate::types::{Address, Coin};

pub use admin::DexSettingsUpdate;
pub use invariants::{BrokenInvariant, InvariantReport};
pub use policy::{BuiltinPolicy, DenomPolicy, ExtensionPolicy, OrderLeg, PolicyDelegate};
pub use queries::{BalanceSummary, Page};

pub(crate) const FROZEN: FeatureBalanceStore = FeatureBalanceStore::new(FeatureKind::Frozen);
pub(crate) const WHITELISTED: FeatureBalanceStore =
    FeatureBalanceStore::new(FeatureKind::Whitelisted);
pub(crate) const DEX_LOCKED: FeatureBalanceStore = FeatureBalanceStore::new(FeatureKind::DexLocked);
pub(crate) const DEX_EXPECTED_TO_RECEIVE: FeatureBalanceStore =
    FeatureBalanceStore::new(FeatureKind::DexExpectedToReceive);

/// How a coin movement relates to the transfer hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    /// A user-level transfer. Runs the hook before the ledger moves coins.
    External,
    /// A movement the engine makes on its own behalf while a hook is already
    /// running (commission payouts). Never re-enters the hook.
    Internal,
}

/// The fungible-token engine.
#[derive(Clone)]
pub struct FtKeeper {
    ledger: Arc<dyn Ledger>,
    runtime: Arc<dyn ExtensionRuntime>,
    params: ModuleParams,
}

impl std::fmt::Debug for FtKeeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtKeeper")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl FtKeeper {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        runtime: Arc<dyn ExtensionRuntime>,
        params: ModuleParams,
    ) -> Self {
        Self {
            ledger,
            runtime,
            params,
        }
    }

    pub fn ledger(&self) -> &dyn Ledger {
        self.ledger.as_ref()
    }

    pub fn runtime(&self) -> &dyn ExtensionRuntime {
        self.runtime.as_ref()
    }

    pub fn params(&self) -> &ModuleParams {
        &self.params
    }

    /// Moves `coins` from `from` to `to`.
    pub fn move_coins(
        &self,
        ctx: &mut Context<'_>,
        from: &Address,
        to: &Address,
        coins: &[Coin],
        leg: Leg,
    ) -> FtResult<()> {
        if leg == Leg::External {
            self.before_send_coins(ctx, from, to, coins)?;
        }
        self.ledger.send_coins(ctx, from, to, coins)
    }

    /// True if `account` is a contract, either because it triggered the
    /// request or because the runtime knows it.
    pub(crate) fn is_smart_contract(&self, ctx: &Context<'_>, account: &Address) -> FtResult<bool> {
        if ctx.triggering_contract() == Some(account) {
            return Ok(true);
        }
        self.runtime.is_smart_contract(ctx, account)
    }
}

// ---------------------------------------------------------------------------
// Test fixtures
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::Arc;

    use rust_decimal::Decimal;

    use super::FtKeeper;
    use crate::config::ModuleParams;
    use crate::context::Context;
    use crate::extension::NoExtensions;
    use crate::ledger::{KvLedger, Ledger};
    use crate::types::{Address, Amount, Coin, Feature, IssueSettings};

    pub fn addr(s: &str) -> Address {
        Address::new(s)
    }

    pub fn issuer() -> Address {
        addr("issuer")
    }

    pub fn keeper() -> FtKeeper {
        FtKeeper::new(
            Arc::new(KvLedger::new()),
            Arc::new(NoExtensions),
            ModuleParams::default(),
        )
    }

    pub fn settings(features: &[Feature], initial_amount: Amount) -> IssueSettings {
        let mut settings = IssueSettings::new(issuer(), "ABC", "uabc", 6);
        settings.features = features.to_vec();
        settings.initial_amount = initial_amount;
        settings
    }

    /// Issues `uabc-issuer` with `features` and `initial_amount` minted to the issuer.
    pub fn issue(
        keeper: &FtKeeper,
        ctx: &mut Context<'_>,
        features: &[Feature],
        initial_amount: Amount,
    ) -> String {
        keeper
            .issue(ctx, settings(features, initial_amount))
            .expect("issuance succeeds")
    }

    pub fn issue_with_rates(
        keeper: &FtKeeper,
        ctx: &mut Context<'_>,
        features: &[Feature],
        initial_amount: Amount,
        burn_rate: &str,
        commission_rate: &str,
    ) -> String {
        let mut s = settings(features, initial_amount);
        s.burn_rate = burn_rate.parse::<Decimal>().expect("valid rate");
        s.send_commission_rate = commission_rate.parse::<Decimal>().expect("valid rate");
        keeper.issue(ctx, s).expect("issuance succeeds")
    }

    pub fn balance(keeper: &FtKeeper, ctx: &Context<'_>, account: &str, denom: &str) -> Amount {
        keeper
            .ledger()
            .get_balance(ctx, &addr(account), denom)
            .expect("balance readable")
    }

    /// Credits `account` directly through the ledger, bypassing the hook.
    pub fn fund(keeper: &FtKeeper, ctx: &mut Context<'_>, account: &str, coin: Coin) {
        keeper
            .ledger()
            .mint_coins(ctx, &addr(account), &coin)
            .expect("ledger mint succeeds");
    }
}
