//! # Scripted Scenarios
//!
//! A scenario is a TOML list of steps. Each step runs as its own request:
//! it commits on success and leaves nothing behind on failure, exactly as
//! a transaction would.
//!
//! ```toml
//! name = "freeze then transfer"
//!
//! [[step]]
//! action = "issue"
//! issuer = "alice"
//! symbol = "ABC"
//! subunit = "uabc"
//! precision = 6
//! initial_amount = "1000"
//! features = ["freezing"]
//!
//! [[step]]
//! action = "freeze"
//! sender = "alice"
//! account = "bob"
//! coin = { denom = "uabc-alice", amount = "10" }
//!
//! [[step]]
//! action = "send"
//! from = "bob"
//! to = "carol"
//! coins = [{ denom = "uabc-alice", amount = "1" }]
//! expect_error = "insufficient_funds"
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context as _, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use assetft_protocol::storage::KvStore;
use assetft_protocol::types::DexActions;
use assetft_protocol::{
    Address, Coin, Context, FtKeeper, FtResult, Host, IssueSettings, KvLedger, TransferPurpose,
};

/// A named list of steps.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "step", default)]
    pub steps: Vec<Step>,
}

/// One request plus what its outcome should be.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub purpose: TransferPurpose,
    /// Error code the step must fail with. `None` means it must succeed.
    #[serde(default)]
    pub expect_error: Option<String>,
    #[serde(flatten)]
    pub action: Action,
}

/// Every engine operation a scenario can invoke.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Credits coins straight into the ledger, e.g. native `ucore`.
    Fund { account: Address, coin: Coin },
    /// Sets a vesting lock on the ledger side.
    SetVestingLock { account: Address, coin: Coin },
    Issue(IssueSettings),
    Send {
        from: Address,
        to: Address,
        coins: Vec<Coin>,
    },
    Mint {
        sender: Address,
        #[serde(default)]
        recipient: Option<Address>,
        coin: Coin,
    },
    Burn { sender: Address, coin: Coin },
    Freeze {
        sender: Address,
        account: Address,
        coin: Coin,
    },
    Unfreeze {
        sender: Address,
        account: Address,
        coin: Coin,
    },
    SetFrozen {
        sender: Address,
        account: Address,
        coin: Coin,
    },
    GloballyFreeze { sender: Address, denom: String },
    GloballyUnfreeze { sender: Address, denom: String },
    SetWhitelisted {
        sender: Address,
        account: Address,
        coin: Coin,
    },
    Clawback {
        sender: Address,
        account: Address,
        coin: Coin,
    },
    TransferAdmin {
        sender: Address,
        new_admin: Address,
        denom: String,
    },
    ClearAdmin { sender: Address, denom: String },
    UpdateDexUnifiedRefAmount {
        sender: Address,
        denom: String,
        unified_ref_amount: Decimal,
    },
    UpdateDexWhitelistedDenoms {
        sender: Address,
        denom: String,
        whitelisted_denoms: Vec<String>,
    },
    Dex(DexActions),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Fund { .. } => "fund",
            Action::SetVestingLock { .. } => "set_vesting_lock",
            Action::Issue(_) => "issue",
            Action::Send { .. } => "send",
            Action::Mint { .. } => "mint",
            Action::Burn { .. } => "burn",
            Action::Freeze { .. } => "freeze",
            Action::Unfreeze { .. } => "unfreeze",
            Action::SetFrozen { .. } => "set_frozen",
            Action::GloballyFreeze { .. } => "globally_freeze",
            Action::GloballyUnfreeze { .. } => "globally_unfreeze",
            Action::SetWhitelisted { .. } => "set_whitelisted",
            Action::Clawback { .. } => "clawback",
            Action::TransferAdmin { .. } => "transfer_admin",
            Action::ClearAdmin { .. } => "clear_admin",
            Action::UpdateDexUnifiedRefAmount { .. } => "update_dex_unified_ref_amount",
            Action::UpdateDexWhitelistedDenoms { .. } => "update_dex_whitelisted_denoms",
            Action::Dex(_) => "dex",
        }
    }

    fn run(&self, ctx: &mut Context<'_>, keeper: &FtKeeper) -> FtResult<()> {
        match self {
            Action::Fund { account, coin } => keeper.ledger().mint_coins(ctx, account, coin),
            Action::SetVestingLock { account, coin } => {
                KvLedger::new().set_locked(ctx, account, coin)
            }
            Action::Issue(settings) => keeper.issue(ctx, settings.clone()).map(|_| ()),
            Action::Send { from, to, coins } => keeper.send(ctx, from, to, coins),
            Action::Mint {
                sender,
                recipient,
                coin,
            } => keeper.mint(ctx, sender, recipient.as_ref(), coin),
            Action::Burn { sender, coin } => keeper.burn(ctx, sender, coin),
            Action::Freeze {
                sender,
                account,
                coin,
            } => keeper.freeze(ctx, sender, account, coin),
            Action::Unfreeze {
                sender,
                account,
                coin,
            } => keeper.unfreeze(ctx, sender, account, coin),
            Action::SetFrozen {
                sender,
                account,
                coin,
            } => keeper.set_frozen(ctx, sender, account, coin),
            Action::GloballyFreeze { sender, denom } => keeper.globally_freeze(ctx, sender, denom),
            Action::GloballyUnfreeze { sender, denom } => {
                keeper.globally_unfreeze(ctx, sender, denom)
            }
            Action::SetWhitelisted {
                sender,
                account,
                coin,
            } => keeper.set_whitelisted_balance(ctx, sender, account, coin),
            Action::Clawback {
                sender,
                account,
                coin,
            } => keeper.clawback(ctx, sender, account, coin),
            Action::TransferAdmin {
                sender,
                new_admin,
                denom,
            } => keeper.transfer_admin(ctx, sender, new_admin, denom),
            Action::ClearAdmin { sender, denom } => keeper.clear_admin(ctx, sender, denom),
            Action::UpdateDexUnifiedRefAmount {
                sender,
                denom,
                unified_ref_amount,
            } => keeper.update_dex_unified_ref_amount(ctx, sender, denom, *unified_ref_amount),
            Action::UpdateDexWhitelistedDenoms {
                sender,
                denom,
                whitelisted_denoms,
            } => keeper.update_dex_whitelisted_denoms(ctx, sender, denom, whitelisted_denoms.clone()),
            Action::Dex(actions) => keeper.execute_dex_actions(ctx, actions),
        }
    }
}

/// What happened to one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub action: &'static str,
    /// Error code, `None` on success.
    pub error: Option<String>,
    /// Names of the events the step emitted.
    pub events: Vec<&'static str>,
    /// Whether the outcome matched `expect_error`.
    pub as_expected: bool,
}

/// Outcome of a whole scenario.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub steps: Vec<StepOutcome>,
}

impl ScenarioReport {
    pub fn mismatches(&self) -> usize {
        self.steps.iter().filter(|s| !s.as_expected).count()
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("invalid scenario {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("failed to parse scenario")
    }

    /// Runs every step. Stops at the first mismatch unless `keep_going`.
    pub fn apply<S: KvStore>(&self, host: &mut Host<S>, keep_going: bool) -> ScenarioReport {
        let mut report = ScenarioReport {
            name: self.name.clone(),
            steps: Vec::with_capacity(self.steps.len()),
        };

        for (index, step) in self.steps.iter().enumerate() {
            let result = host.execute(step.purpose, |ctx, keeper| step.action.run(ctx, keeper));
            let (error, events) = match result {
                Ok(((), events)) => (None, events.iter().map(|e| e.name()).collect()),
                Err(e) => (Some(e.code().to_string()), Vec::new()),
            };
            let as_expected = error == step.expect_error;
            if as_expected {
                info!(step = index, action = step.action.name(), error = ?error, "step applied");
            } else {
                warn!(
                    step = index,
                    action = step.action.name(),
                    error = ?error,
                    expected = ?step.expect_error,
                    "step outcome differs from expectation"
                );
            }
            report.steps.push(StepOutcome {
                index,
                action: step.action.name(),
                error,
                events,
                as_expected,
            });
            if !as_expected && !keep_going {
                break;
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assetft_protocol::storage::MemStore;
    use assetft_protocol::{ModuleParams, NoExtensions};

    use super::*;

    const SCRIPT: &str = r#"
        name = "freeze then transfer"

        [[step]]
        action = "issue"
        issuer = "alice"
        symbol = "ABC"
        subunit = "uabc"
        precision = 6
        initial_amount = "1000"
        features = ["freezing"]

        [[step]]
        action = "send"
        from = "alice"
        to = "bob"
        coins = [{ denom = "uabc-alice", amount = "100" }]

        [[step]]
        action = "freeze"
        sender = "alice"
        account = "bob"
        coin = { denom = "uabc-alice", amount = "60" }

        [[step]]
        action = "send"
        from = "bob"
        to = "carol"
        coins = [{ denom = "uabc-alice", amount = "41" }]
        expect_error = "insufficient_funds"

        [[step]]
        action = "send"
        from = "bob"
        to = "carol"
        coins = [{ denom = "uabc-alice", amount = "40" }]
    "#;

    fn host() -> Host<MemStore> {
        Host::with_kv_ledger(MemStore::new(), Arc::new(NoExtensions), ModuleParams::default())
    }

    #[test]
    fn scenario_parses_every_step() {
        let scenario = Scenario::from_toml(SCRIPT).unwrap();
        assert_eq!(scenario.name, "freeze then transfer");
        let names: Vec<_> = scenario.steps.iter().map(|s| s.action.name()).collect();
        assert_eq!(names, ["issue", "send", "freeze", "send", "send"]);
        assert_eq!(scenario.steps[3].expect_error.as_deref(), Some("insufficient_funds"));
        assert_eq!(scenario.steps[0].purpose, TransferPurpose::None);
    }

    #[test]
    fn scenario_runs_with_expected_failures() {
        let scenario = Scenario::from_toml(SCRIPT).unwrap();
        let mut host = host();
        let report = scenario.apply(&mut host, false);

        assert_eq!(report.steps.len(), 5);
        assert_eq!(report.mismatches(), 0);
        assert!(report.steps[0].events.contains(&"issued"));
        assert_eq!(report.steps[3].error.as_deref(), Some("insufficient_funds"));

        let carol = host
            .query(|ctx, keeper| {
                keeper
                    .ledger()
                    .get_balance(ctx, &Address::new("carol"), "uabc-alice")
            })
            .unwrap();
        assert_eq!(carol, 40);
    }

    #[test]
    fn unexpected_failure_stops_the_run() {
        let raw = r#"
            [[step]]
            action = "burn"
            sender = "nobody"
            coin = { denom = "uabc-alice", amount = "1" }

            [[step]]
            action = "fund"
            account = "bob"
            coin = { denom = "ucore", amount = "5" }
        "#;
        let scenario = Scenario::from_toml(raw).unwrap();

        let report = scenario.apply(&mut host(), false);
        assert_eq!(report.steps.len(), 1);
        assert_eq!(report.mismatches(), 1);

        let report = scenario.apply(&mut host(), true);
        assert_eq!(report.steps.len(), 2);
        assert!(report.steps[1].as_expected);
    }

    #[test]
    fn governance_updates_dex_settings_without_the_feature() {
        let raw = r#"
            [[step]]
            action = "issue"
            issuer = "alice"
            symbol = "ABC"
            subunit = "uabc"
            precision = 6

            [[step]]
            action = "update_dex_unified_ref_amount"
            sender = "alice"
            denom = "uabc-alice"
            unified_ref_amount = "150"
            expect_error = "feature_disabled"

            [[step]]
            action = "update_dex_unified_ref_amount"
            sender = "gov"
            denom = "uabc-alice"
            unified_ref_amount = "150"
        "#;
        let scenario = Scenario::from_toml(raw).unwrap();
        let mut host = host();
        let report = scenario.apply(&mut host, false);
        assert_eq!(report.mismatches(), 0);
        assert_eq!(report.steps[2].events, ["dex_settings_changed"]);
    }

    #[test]
    fn unknown_actions_are_rejected() {
        let raw = "[[step]]\naction = \"teleport\"\n";
        assert!(Scenario::from_toml(raw).is_err());
    }
}
