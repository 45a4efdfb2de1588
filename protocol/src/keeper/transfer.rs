//! The pre-commit transfer hook and hooked sends.
//!
//! The ledger calls [`FtKeeper::before_send_coins`] or
//! [`FtKeeper::before_input_output_coins`] before it moves anything. Both
//! reduce to the same batched form: legs grouped per denom and squashed per
//! account, then handed to the denom's policy. Denoms without a definition
//! pass through untouched.

use tracing::trace;

use crate::context::Context;
use crate::error::FtResult;
use crate::ledger::validate_input_outputs;
use crate::rates::{squash, AccountAmounts};
use crate::types::{AccountCoin, Address, Coin};

use super::{DenomPolicy, FtKeeper, Leg};

impl FtKeeper {
    /// Hook for a single-sender, single-recipient transfer.
    pub fn before_send_coins(
        &self,
        ctx: &mut Context<'_>,
        from: &Address,
        to: &Address,
        coins: &[Coin],
    ) -> FtResult<()> {
        let inputs: Vec<AccountCoin> = coins
            .iter()
            .map(|coin| AccountCoin {
                account: from.clone(),
                coin: coin.clone(),
            })
            .collect();
        let outputs: Vec<AccountCoin> = coins
            .iter()
            .map(|coin| AccountCoin {
                account: to.clone(),
                coin: coin.clone(),
            })
            .collect();
        self.before_input_output_coins(ctx, &inputs, &outputs)
    }

    /// Hook for a batched transfer.
    pub fn before_input_output_coins(
        &self,
        ctx: &mut Context<'_>,
        inputs: &[AccountCoin],
        outputs: &[AccountCoin],
    ) -> FtResult<()> {
        let mut squashed_inputs = squash(inputs)?;
        let mut squashed_outputs = squash(outputs)?;

        let mut denoms: Vec<String> = squashed_inputs.keys().cloned().collect();
        for denom in squashed_outputs.keys() {
            if !squashed_inputs.contains_key(denom) {
                denoms.push(denom.clone());
            }
        }
        denoms.sort();

        for denom in denoms {
            let def = match self.find_definition(ctx, &denom)? {
                Some(def) => def,
                None => {
                    trace!(denom = %denom, "no definition, skipping");
                    continue;
                }
            };
            let denom_inputs: AccountAmounts = squashed_inputs.remove(&denom).unwrap_or_default();
            let denom_outputs: AccountAmounts =
                squashed_outputs.remove(&denom).unwrap_or_default();

            DenomPolicy::of(&def).delegate().before_transfer(
                self,
                ctx,
                &def,
                &denom_inputs,
                &denom_outputs,
            )?;
        }
        Ok(())
    }

    /// Hooked single transfer.
    pub fn send(
        &self,
        ctx: &mut Context<'_>,
        from: &Address,
        to: &Address,
        coins: &[Coin],
    ) -> FtResult<()> {
        self.move_coins(ctx, from, to, coins, Leg::External)
    }

    /// Hooked batched transfer. Per denom, inputs and outputs must balance.
    pub fn input_output_coins(
        &self,
        ctx: &mut Context<'_>,
        inputs: &[AccountCoin],
        outputs: &[AccountCoin],
    ) -> FtResult<()> {
        validate_input_outputs(inputs, outputs)?;
        self.before_input_output_coins(ctx, inputs, outputs)?;
        self.ledger.input_output_coins(ctx, inputs, outputs)
    }
}
