//! The engine as seen from inside an extension contract.
//!
//! Sends made here are raw ledger moves: the contract is already running
//! inside the transfer hook, and re-entering it would dispatch the contract
//! again.

use tracing::trace;

use crate::context::Context;
use crate::error::FtResult;
use crate::extension::{read_contract_state, write_contract_state, ExtensionHost};
use crate::types::{Address, Amount, Coin, Definition};

use super::FtKeeper;

impl ExtensionHost for FtKeeper {
    fn definition(&self, ctx: &Context<'_>, denom: &str) -> FtResult<Definition> {
        self.get_definition(ctx, denom)
    }

    fn balance(&self, ctx: &Context<'_>, account: &Address, denom: &str) -> FtResult<Amount> {
        self.ledger.get_balance(ctx, account, denom)
    }

    fn frozen_balance(&self, ctx: &Context<'_>, account: &Address, denom: &str) -> FtResult<Amount> {
        self.get_frozen_balance(ctx, account, denom)
    }

    fn whitelisted_balance(
        &self,
        ctx: &Context<'_>,
        account: &Address,
        denom: &str,
    ) -> FtResult<Amount> {
        self.get_whitelisted_balance(ctx, account, denom)
    }

    fn is_smart_contract(&self, ctx: &Context<'_>, account: &Address) -> FtResult<bool> {
        FtKeeper::is_smart_contract(self, ctx, account)
    }

    fn send_from_contract(
        &self,
        ctx: &mut Context<'_>,
        contract: &Address,
        to: &Address,
        coin: &Coin,
    ) -> FtResult<()> {
        trace!(contract = %contract, to = %to, coin = %coin, "contract send");
        self.ledger
            .send_coins(ctx, contract, to, std::slice::from_ref(coin))
    }

    fn mint(
        &self,
        ctx: &mut Context<'_>,
        contract: &Address,
        to: &Address,
        coin: &Coin,
    ) -> FtResult<()> {
        FtKeeper::mint(self, ctx, contract, Some(to), coin)
    }

    fn burn(&self, ctx: &mut Context<'_>, contract: &Address, coin: &Coin) -> FtResult<()> {
        FtKeeper::burn(self, ctx, contract, coin)
    }

    fn state_get(
        &self,
        ctx: &Context<'_>,
        contract: &Address,
        key: &[u8],
    ) -> FtResult<Option<Vec<u8>>> {
        read_contract_state(ctx, contract, key)
    }

    fn state_set(
        &self,
        ctx: &mut Context<'_>,
        contract: &Address,
        key: &[u8],
        value: &[u8],
    ) -> FtResult<()> {
        write_contract_state(ctx, contract, key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FtError;
    use crate::keeper::testutil::*;
    use crate::storage::MemStore;
    use crate::types::Feature;

    #[test]
    fn host_reads_feature_balances() {
        let keeper = keeper();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store);
        let denom = issue(&keeper, &mut ctx, &[Feature::Freezing, Feature::Whitelisting], 100);
        keeper
            .set_whitelisted_balance(&mut ctx, &issuer(), &addr("alice"), &Coin::new(&denom, 70))
            .unwrap();
        keeper
            .send(&mut ctx, &issuer(), &addr("alice"), &[Coin::new(&denom, 40)])
            .unwrap();
        keeper
            .freeze(&mut ctx, &issuer(), &addr("alice"), &Coin::new(&denom, 15))
            .unwrap();

        let host: &dyn ExtensionHost = &keeper;
        assert_eq!(host.balance(&ctx, &addr("alice"), &denom).unwrap(), 40);
        assert_eq!(host.frozen_balance(&ctx, &addr("alice"), &denom).unwrap(), 15);
        assert_eq!(host.whitelisted_balance(&ctx, &addr("alice"), &denom).unwrap(), 70);
        assert_eq!(host.definition(&ctx, &denom).unwrap().denom, denom);
    }

    #[test]
    fn contract_sends_bypass_the_hook() {
        let keeper = keeper();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store);
        let denom = issue_with_rates(&keeper, &mut ctx, &[], 100, "0.5", "0");
        keeper
            .send(&mut ctx, &issuer(), &addr("contract"), &[Coin::new(&denom, 10)])
            .unwrap();

        let host: &dyn ExtensionHost = &keeper;
        host.send_from_contract(&mut ctx, &addr("contract"), &addr("bob"), &Coin::new(&denom, 10))
            .unwrap();
        assert_eq!(balance(&keeper, &ctx, "bob", &denom), 10);
        assert_eq!(balance(&keeper, &ctx, "contract", &denom), 0);
    }

    #[test]
    fn host_mint_needs_privileges() {
        let keeper = keeper();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store);
        let denom = issue(&keeper, &mut ctx, &[Feature::Minting], 0);

        let host: &dyn ExtensionHost = &keeper;
        assert!(matches!(
            host.mint(&mut ctx, &addr("stranger"), &addr("bob"), &Coin::new(&denom, 5)),
            Err(FtError::Unauthorized(_))
        ));
        host.mint(&mut ctx, &issuer(), &addr("bob"), &Coin::new(&denom, 5))
            .unwrap();
        assert_eq!(balance(&keeper, &ctx, "bob", &denom), 5);
    }

    #[test]
    fn state_round_trips() {
        let keeper = keeper();
        let mut store = MemStore::new();
        let mut ctx = Context::new(&mut store);
        let host: &dyn ExtensionHost = &keeper;
        host.state_set(&mut ctx, &addr("c"), b"k", b"v").unwrap();
        assert_eq!(host.state_get(&ctx, &addr("c"), b"k").unwrap(), Some(b"v".to_vec()));
    }
}
