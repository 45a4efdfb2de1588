//! # Rate Shares
//!
//! Burn and commission charges of a (possibly batched) transfer are split
//! between the senders in proportion to what each put in:
//!
//! ```text
//!   chargeable = min(Σ non-issuer inputs, Σ non-issuer outputs)
//!   share(a)   = ⌈ rate · chargeable · a / Σ non-issuer inputs ⌉
//! ```
//!
//! The product is evaluated exactly over arbitrary-precision integers
//! (`rate = mantissa / 10^scale`), so the ceiling never depends on
//! intermediate decimal rounding. The issuer's own legs are excluded from
//! both sums and are never charged.

use std::collections::BTreeMap;

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use rust_decimal::Decimal;

use crate::error::{FtError, FtResult};
use crate::types::{AccountCoin, Address, Amount};

/// Per-account amounts of one denom.
pub type AccountAmounts = BTreeMap<Address, Amount>;

/// Legs grouped by denom, then squashed per account.
pub type Squashed = BTreeMap<String, AccountAmounts>;

/// Groups `legs` by denom and sums repeated accounts.
///
/// The result is independent of leg order. Zero-amount legs still create
/// their entry, so an account that appears only with zero is visible to the
/// gates.
pub fn squash(legs: &[AccountCoin]) -> FtResult<Squashed> {
    let mut grouped = Squashed::new();
    for leg in legs {
        let amount = grouped
            .entry(leg.coin.denom.clone())
            .or_default()
            .entry(leg.account.clone())
            .or_insert(0);
        *amount = amount.checked_add(leg.coin.amount).ok_or_else(|| {
            FtError::InvalidInput(format!(
                "amount overflow while grouping {} legs of {}",
                leg.coin.denom, leg.account
            ))
        })?;
    }
    Ok(grouped)
}

fn non_issuer_sum(amounts: &AccountAmounts, issuer: &Address) -> BigUint {
    amounts
        .iter()
        .filter(|(account, _)| *account != issuer)
        .fold(BigUint::zero(), |sum, (_, amount)| sum + BigUint::from(*amount))
}

/// Splits `rate` of a single denom's transfer between its non-issuer senders.
///
/// Returns only positive shares. An empty result means nothing is charged.
pub fn calculate_rate_shares(
    rate: Decimal,
    issuer: &Address,
    inputs: &AccountAmounts,
    outputs: &AccountAmounts,
) -> FtResult<AccountAmounts> {
    let mut shares = AccountAmounts::new();
    if rate <= Decimal::ZERO {
        return Ok(shares);
    }

    let input_sum = non_issuer_sum(inputs, issuer);
    let output_sum = non_issuer_sum(outputs, issuer);
    let chargeable = input_sum.clone().min(output_sum);
    if chargeable.is_zero() {
        return Ok(shares);
    }

    let mantissa = u128::try_from(rate.mantissa())
        .map_err(|_| FtError::InvalidState(format!("negative rate {rate}")))?;
    let numerator_base = BigUint::from(mantissa) * chargeable;
    let denominator = BigUint::from(10u32).pow(rate.scale()) * input_sum;

    for (account, amount) in inputs {
        if account == issuer || *amount == 0 {
            continue;
        }
        let numerator = &numerator_base * BigUint::from(*amount);
        let share = ceil_div(&numerator, &denominator);
        let share = share.to_u128().ok_or_else(|| {
            FtError::InvalidState(format!("rate share for {account} does not fit an amount"))
        })?;
        if share > 0 {
            shares.insert(account.clone(), share);
        }
    }

    Ok(shares)
}

fn ceil_div(numerator: &BigUint, denominator: &BigUint) -> BigUint {
    let quotient = numerator / denominator;
    if (&quotient * denominator) == *numerator {
        quotient
    } else {
        quotient + 1u32
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coin;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn amounts(entries: &[(&str, Amount)]) -> AccountAmounts {
        entries
            .iter()
            .map(|(a, v)| (Address::new(*a), *v))
            .collect()
    }

    fn issuer() -> Address {
        Address::new("issuer")
    }

    #[test]
    fn even_split_is_exact() {
        let shares = calculate_rate_shares(
            dec("0.1"),
            &issuer(),
            &amounts(&[("a", 400), ("b", 600)]),
            &amounts(&[("c", 1000)]),
        )
        .unwrap();
        assert_eq!(shares, amounts(&[("a", 40), ("b", 60)]));
    }

    #[test]
    fn fractional_shares_round_up() {
        let shares = calculate_rate_shares(
            dec("0.1"),
            &issuer(),
            &amounts(&[("a", 399), ("b", 602)]),
            &amounts(&[("c", 1001)]),
        )
        .unwrap();
        assert_eq!(shares, amounts(&[("a", 40), ("b", 61)]));
    }

    #[test]
    fn issuer_outputs_shrink_the_chargeable_amount() {
        let inputs = amounts(&[("a", 30000), ("b", 20000)]);
        let outputs = amounts(&[("c", 20000), ("issuer", 30000)]);

        let shares = calculate_rate_shares(dec("0.01"), &issuer(), &inputs, &outputs).unwrap();
        assert_eq!(shares, amounts(&[("a", 120), ("b", 80)]));

        let shares = calculate_rate_shares(dec("0.01001"), &issuer(), &inputs, &outputs).unwrap();
        assert_eq!(shares, amounts(&[("a", 121), ("b", 81)]));
    }

    #[test]
    fn issuer_is_never_charged() {
        let shares = calculate_rate_shares(
            dec("0.5"),
            &issuer(),
            &amounts(&[("issuer", 100)]),
            &amounts(&[("a", 100)]),
        )
        .unwrap();
        assert!(shares.is_empty());

        let shares = calculate_rate_shares(
            dec("0.5"),
            &issuer(),
            &amounts(&[("a", 100)]),
            &amounts(&[("issuer", 100)]),
        )
        .unwrap();
        assert!(shares.is_empty());
    }

    #[test]
    fn zero_rate_charges_nothing() {
        let shares = calculate_rate_shares(
            Decimal::ZERO,
            &issuer(),
            &amounts(&[("a", 100)]),
            &amounts(&[("b", 100)]),
        )
        .unwrap();
        assert!(shares.is_empty());
    }

    #[test]
    fn full_rate_on_max_amount_fits() {
        let shares = calculate_rate_shares(
            Decimal::ONE,
            &issuer(),
            &amounts(&[("a", u128::MAX)]),
            &amounts(&[("b", u128::MAX)]),
        )
        .unwrap();
        assert_eq!(shares, amounts(&[("a", u128::MAX)]));
    }

    #[test]
    fn single_send_rounds_up() {
        let shares = calculate_rate_shares(
            dec("0.25"),
            &issuer(),
            &amounts(&[("a", 101)]),
            &amounts(&[("b", 101)]),
        )
        .unwrap();
        assert_eq!(shares, amounts(&[("a", 26)]));
    }

    #[test]
    fn squash_groups_by_denom_then_account() {
        let legs = vec![
            AccountCoin { account: Address::new("a"), coin: Coin::new("ux", 5) },
            AccountCoin { account: Address::new("b"), coin: Coin::new("ux", 1) },
            AccountCoin { account: Address::new("a"), coin: Coin::new("uy", 2) },
            AccountCoin { account: Address::new("a"), coin: Coin::new("ux", 7) },
        ];
        let squashed = squash(&legs).unwrap();
        assert_eq!(squashed.len(), 2);
        assert_eq!(squashed["ux"], amounts(&[("a", 12), ("b", 1)]));
        assert_eq!(squashed["uy"], amounts(&[("a", 2)]));
    }

    #[test]
    fn squash_rejects_overflow() {
        let legs = vec![
            AccountCoin { account: Address::new("a"), coin: Coin::new("ux", u128::MAX) },
            AccountCoin { account: Address::new("a"), coin: Coin::new("ux", 1) },
        ];
        assert!(squash(&legs).is_err());
    }
}
