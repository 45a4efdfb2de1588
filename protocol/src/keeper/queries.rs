//! Read-only views for clients.

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::{FtError, FtResult};
use crate::storage::FeatureKind;
use crate::types::{coin::amount_string, AccountCoin, Address, Amount, TokenView};

use super::{FtKeeper, DEX_EXPECTED_TO_RECEIVE, DEX_LOCKED, FROZEN, WHITELISTED};

/// Largest page a query may ask for.
pub const MAX_PAGE_LIMIT: usize = 1000;

/// One page of results plus the total count across all pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
}

/// Every balance the module tracks for one (account, denom).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSummary {
    pub account: Address,
    pub denom: String,
    #[serde(with = "amount_string")]
    pub balance: Amount,
    #[serde(with = "amount_string")]
    pub spendable: Amount,
    #[serde(with = "amount_string")]
    pub frozen: Amount,
    #[serde(with = "amount_string")]
    pub whitelisted: Amount,
    #[serde(with = "amount_string")]
    pub dex_locked: Amount,
    #[serde(with = "amount_string")]
    pub dex_expected_to_receive: Amount,
    #[serde(with = "amount_string")]
    pub vesting_locked: Amount,
}

fn check_limit(limit: usize) -> FtResult<()> {
    if limit == 0 || limit > MAX_PAGE_LIMIT {
        return Err(FtError::InvalidInput(format!(
            "page limit must be in 1..={MAX_PAGE_LIMIT}, got {limit}"
        )));
    }
    Ok(())
}

impl FtKeeper {
    /// Definition, ledger metadata, global-freeze flag and DEX settings of
    /// one denom.
    pub fn token_view(&self, ctx: &Context<'_>, denom: &str) -> FtResult<TokenView> {
        let definition = self.get_definition(ctx, denom)?;
        let metadata = self
            .ledger
            .get_denom_metadata(ctx, denom)?
            .ok_or_else(|| FtError::NotFound(format!("denom metadata for {denom}")))?;
        Ok(TokenView {
            symbol: metadata.symbol,
            precision: metadata.precision,
            description: metadata.description,
            globally_frozen: self.is_globally_frozen(ctx, denom)?,
            dex_settings: self.get_dex_settings(ctx, denom)?,
            definition,
        })
    }

    /// Token views of every denom issued by `issuer`, in denom key order.
    pub fn tokens_by_issuer(
        &self,
        ctx: &Context<'_>,
        issuer: &Address,
        offset: usize,
        limit: usize,
    ) -> FtResult<Page<TokenView>> {
        check_limit(limit)?;
        let mut denoms = Vec::new();
        self.iterate_definitions(ctx, |def| {
            if def.is_issuer(issuer) {
                denoms.push(def.denom);
            }
            Ok(false)
        })?;
        let total = denoms.len();
        let items = denoms
            .iter()
            .skip(offset)
            .take(limit)
            .map(|denom| self.token_view(ctx, denom))
            .collect::<FtResult<Vec<_>>>()?;
        Ok(Page { items, total })
    }

    /// One page of a feature ledger across all accounts.
    pub fn feature_balances_page(
        &self,
        ctx: &Context<'_>,
        kind: FeatureKind,
        offset: usize,
        limit: usize,
    ) -> FtResult<Page<AccountCoin>> {
        check_limit(limit)?;
        let store = match kind {
            FeatureKind::Frozen => FROZEN,
            FeatureKind::Whitelisted => WHITELISTED,
            FeatureKind::DexLocked => DEX_LOCKED,
            FeatureKind::DexExpectedToReceive => DEX_EXPECTED_TO_RECEIVE,
        };
        let (items, total) = store.page(ctx.store(), offset, limit)?;
        Ok(Page { items, total })
    }

    /// Everything tracked for `account` in `denom`.
    pub fn balance_summary(
        &self,
        ctx: &Context<'_>,
        account: &Address,
        denom: &str,
    ) -> FtResult<BalanceSummary> {
        Ok(BalanceSummary {
            account: account.clone(),
            denom: denom.to_string(),
            balance: self.ledger.get_balance(ctx, account, denom)?,
            spendable: self.get_spendable_balance(ctx, account, denom)?,
            frozen: self.get_frozen_balance(ctx, account, denom)?,
            whitelisted: self.get_whitelisted_balance(ctx, account, denom)?,
            dex_locked: self.get_dex_locked_balance(ctx, account, denom)?,
            dex_expected_to_receive: self.get_dex_expected_to_receive_balance(ctx, account, denom)?,
            vesting_locked: self.ledger.locked_coins(ctx, account, denom)?,
        })
    }
}
