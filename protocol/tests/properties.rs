//! Property tests: supply conservation, feature-balance bookkeeping and
//! order independence of leg squashing.

use std::str::FromStr;
use std::sync::Arc;

use num_traits::ToPrimitive;
use proptest::prelude::*;
use rust_decimal::Decimal;

use assetft_protocol::rates::{calculate_rate_shares, squash, AccountAmounts};
use assetft_protocol::storage::MemStore;
use assetft_protocol::{
    AccountCoin, Address, Amount, Coin, Feature, Host, IssueSettings, KvLedger, ModuleParams,
    NoExtensions, TransferPurpose,
};

const ACCOUNTS: [&str; 4] = ["a", "b", "c", "d"];

fn addr(s: &str) -> Address {
    Address::new(s)
}

fn leg_strategy() -> impl Strategy<Value = AccountCoin> {
    (0..ACCOUNTS.len(), prop_oneof![Just("ux-i"), Just("uy-i")], 0u128..1_000)
        .prop_map(|(i, denom, amount)| AccountCoin {
            account: addr(ACCOUNTS[i]),
            coin: Coin::new(denom, amount),
        })
}

proptest! {
    #[test]
    fn squash_ignores_leg_order(legs in prop::collection::vec(leg_strategy(), 0..24), seed in any::<u64>()) {
        let mut shuffled = legs.clone();
        // Deterministic rotation plus reversal covers enough permutations.
        if !shuffled.is_empty() {
            let k = (seed as usize) % shuffled.len();
            shuffled.rotate_left(k);
            shuffled.reverse();
        }
        prop_assert_eq!(squash(&legs).unwrap(), squash(&shuffled).unwrap());
    }

    #[test]
    fn rate_shares_never_exceed_rate_plus_rounding(
        amounts in prop::collection::vec(1u128..1_000_000, 1..6),
        rate_bp in 0u32..=10_000,
    ) {
        let rate = Decimal::new(i64::from(rate_bp), 4);
        let issuer = addr("issuer");
        let mut inputs = AccountAmounts::new();
        for (i, amount) in amounts.iter().enumerate() {
            inputs.insert(addr(&format!("s{i}")), *amount);
        }
        let total: Amount = amounts.iter().sum();
        let mut outputs = AccountAmounts::new();
        outputs.insert(addr("r"), total);

        let shares = calculate_rate_shares(rate, &issuer, &inputs, &outputs).unwrap();
        let charged: Amount = shares.values().sum();
        let exact = rate * Decimal::from_str(&total.to_string()).unwrap();
        let floor = Amount::from(exact.floor().to_u64().unwrap());
        prop_assert!(charged >= floor);
        prop_assert!(charged <= floor + amounts.len() as Amount);
        for (account, share) in &shares {
            prop_assert!(*share <= inputs[account]);
        }
    }

    #[test]
    fn transfers_conserve_supply(
        transfers in prop::collection::vec((0..ACCOUNTS.len(), 0..ACCOUNTS.len(), 1u128..500), 1..20),
        burn_bp in 0u32..=2_500,
    ) {
        let mut host = Host::with_kv_ledger(
            MemStore::new(),
            Arc::new(NoExtensions),
            ModuleParams::default(),
        );
        let mut settings = IssueSettings::new(addr("issuer"), "PRP", "uprp", 6);
        settings.initial_amount = 10_000;
        settings.burn_rate = Decimal::new(i64::from(burn_bp), 4);
        settings.features = vec![Feature::Freezing];
        let (denom, _) = host
            .execute(TransferPurpose::None, |ctx, keeper| keeper.issue(ctx, settings))
            .unwrap();
        host.execute(TransferPurpose::None, |ctx, keeper| {
            for account in ACCOUNTS {
                keeper.send(ctx, &addr("issuer"), &addr(account), &[Coin::new(&denom, 2_000)])?;
            }
            Ok(())
        })
        .unwrap();

        for (from, to, amount) in transfers {
            // Failures are expected; a failed request must not disturb the sums.
            let _ = host.execute(TransferPurpose::None, |ctx, keeper| {
                keeper.send(ctx, &addr(ACCOUNTS[from]), &addr(ACCOUNTS[to]), &[Coin::new(&denom, amount)])
            });
        }

        let (supply, held) = host
            .query(|ctx, keeper| {
                Ok((keeper.ledger().total_supply(ctx, &denom)?, KvLedger::new().sum_balances(ctx, &denom)?))
            })
            .unwrap();
        prop_assert_eq!(supply, held);
        prop_assert!(supply <= 10_000);
    }

    #[test]
    fn frozen_ledger_tracks_a_model(ops in prop::collection::vec((any::<bool>(), 1u128..100), 1..40)) {
        let mut host = Host::with_kv_ledger(
            MemStore::new(),
            Arc::new(NoExtensions),
            ModuleParams::default(),
        );
        let mut settings = IssueSettings::new(addr("issuer"), "FRZ", "ufrz", 6);
        settings.features = vec![Feature::Freezing];
        let (denom, _) = host
            .execute(TransferPurpose::None, |ctx, keeper| keeper.issue(ctx, settings))
            .unwrap();

        let mut model: Amount = 0;
        for (freeze, amount) in ops {
            let coin = Coin::new(&denom, amount);
            let result = host.execute(TransferPurpose::None, |ctx, keeper| {
                if freeze {
                    keeper.freeze(ctx, &addr("issuer"), &addr("a"), &coin)
                } else {
                    keeper.unfreeze(ctx, &addr("issuer"), &addr("a"), &coin)
                }
            });
            match (freeze, model.checked_sub(amount)) {
                (true, _) => {
                    prop_assert!(result.is_ok());
                    model += amount;
                }
                (false, Some(rest)) => {
                    prop_assert!(result.is_ok());
                    model = rest;
                }
                (false, None) => prop_assert!(result.is_err()),
            }
        }

        let stored = host
            .query(|ctx, keeper| keeper.get_frozen_balance(ctx, &addr("a"), &denom))
            .unwrap();
        prop_assert_eq!(stored, model);
    }
}
