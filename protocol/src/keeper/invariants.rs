//! # Invariant Checker
//!
//! A full scan of module state, run by the host between blocks or on demand.
//! Nothing here is consulted on the transfer path.
//!
//! | Name            | Holds when                                                 |
//! |-----------------|------------------------------------------------------------|
//! | `freezing`      | every frozen amount belongs to a denom with `freezing`     |
//! | `whitelisting`  | every whitelisted amount belongs to a denom with `whitelisting` |
//! | `bank-metadata` | every definition has ledger metadata                       |
//! | `dex-locked`    | every DEX-locked amount is covered by the ledger balance   |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::context::Context;
use crate::error::FtResult;
use crate::types::{Definition, Feature};

use super::{FtKeeper, DEX_LOCKED, FROZEN, WHITELISTED};

pub const FREEZING_INVARIANT: &str = "freezing";
pub const WHITELISTING_INVARIANT: &str = "whitelisting";
pub const BANK_METADATA_INVARIANT: &str = "bank-metadata";
pub const DEX_LOCKED_INVARIANT: &str = "dex-locked";

/// One broken invariant with the number of offending entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokenInvariant {
    pub name: String,
    pub message: String,
    pub count: usize,
}

/// Outcome of a full scan.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InvariantReport {
    pub broken: Vec<BrokenInvariant>,
}

impl InvariantReport {
    pub fn is_ok(&self) -> bool {
        self.broken.is_empty()
    }

    fn record(&mut self, name: &str, offenders: Vec<String>) {
        if offenders.is_empty() {
            return;
        }
        let count = offenders.len();
        let message = offenders.join("; ");
        warn!(invariant = name, count, "invariant broken");
        self.broken.push(BrokenInvariant {
            name: name.to_string(),
            message,
            count,
        });
    }
}

impl FtKeeper {
    /// Scans every store and reports all broken invariants.
    pub fn check_invariants(&self, ctx: &Context<'_>) -> FtResult<InvariantReport> {
        let mut definitions: BTreeMap<String, Definition> = BTreeMap::new();
        self.iterate_definitions(ctx, |def| {
            definitions.insert(def.denom.clone(), def);
            Ok(false)
        })?;

        let mut report = InvariantReport::default();

        let has_feature = |denom: &str, feature: Feature| {
            definitions
                .get(denom)
                .is_some_and(|def| def.is_feature_enabled(feature))
        };

        let mut offenders = Vec::new();
        FROZEN.iterate_all(ctx.store(), |entry| {
            if !has_feature(&entry.coin.denom, Feature::Freezing) {
                offenders.push(format!(
                    "{} has frozen {} without the freezing feature",
                    entry.account, entry.coin
                ));
            }
            Ok(false)
        })?;
        report.record(FREEZING_INVARIANT, offenders);

        let mut offenders = Vec::new();
        WHITELISTED.iterate_all(ctx.store(), |entry| {
            if !has_feature(&entry.coin.denom, Feature::Whitelisting) {
                offenders.push(format!(
                    "{} has whitelisted {} without the whitelisting feature",
                    entry.account, entry.coin
                ));
            }
            Ok(false)
        })?;
        report.record(WHITELISTING_INVARIANT, offenders);

        let mut offenders = Vec::new();
        for denom in definitions.keys() {
            if self.ledger.get_denom_metadata(ctx, denom)?.is_none() {
                offenders.push(format!("{denom} has no denom metadata"));
            }
        }
        report.record(BANK_METADATA_INVARIANT, offenders);

        let mut offenders = Vec::new();
        DEX_LOCKED.iterate_all(ctx.store(), |entry| {
            let balance = self.ledger.get_balance(ctx, &entry.account, &entry.coin.denom)?;
            if entry.coin.amount > balance {
                offenders.push(format!(
                    "{} has locked {} but holds {balance}{}",
                    entry.account, entry.coin, entry.coin.denom
                ));
            }
            Ok(false)
        })?;
        report.record(DEX_LOCKED_INVARIANT, offenders);

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keeper::testutil::*;
    use crate::storage::MemStore;
    use crate::types::Coin;

    #[test]
    fn healthy_state_passes() {
        let keeper = keeper();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store);
        let denom = issue(&keeper, &mut ctx, &[Feature::Freezing, Feature::Whitelisting], 100);
        keeper
            .freeze(&mut ctx, &issuer(), &addr("alice"), &Coin::new(&denom, 5))
            .unwrap();
        keeper
            .set_whitelisted_balance(&mut ctx, &issuer(), &addr("alice"), &Coin::new(&denom, 5))
            .unwrap();
        keeper
            .increase_dex_locked(&mut ctx, &issuer(), &Coin::new(&denom, 100))
            .unwrap();

        assert!(keeper.check_invariants(&ctx).unwrap().is_ok());
    }

    #[test]
    fn stray_entries_are_counted() {
        let keeper = keeper();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store);
        let denom = issue(&keeper, &mut ctx, &[], 10);

        FROZEN.set(ctx.store_mut(), &addr("a"), &denom, 1).unwrap();
        FROZEN.set(ctx.store_mut(), &addr("b"), "uforeign", 1).unwrap();
        DEX_LOCKED.set(ctx.store_mut(), &addr("a"), &denom, 3).unwrap();

        let report = keeper.check_invariants(&ctx).unwrap();
        assert!(!report.is_ok());
        let freezing = report
            .broken
            .iter()
            .find(|b| b.name == FREEZING_INVARIANT)
            .unwrap();
        assert_eq!(freezing.count, 2);
        let locked = report
            .broken
            .iter()
            .find(|b| b.name == DEX_LOCKED_INVARIANT)
            .unwrap();
        assert_eq!(locked.count, 1);
        assert!(report.broken.iter().all(|b| b.name != WHITELISTING_INVARIANT));
        assert!(report.broken.iter().all(|b| b.name != BANK_METADATA_INVARIANT));
    }
}
