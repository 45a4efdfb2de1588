//! Order intents and batched reservation actions exchanged with the DEX.

use serde::{Deserialize, Serialize};

use crate::error::{FtError, FtResult};

use super::{coin::amount_string, AccountCoin, Address, Amount, Coin};

/// An order as seen by the token module. Only used for validation and as
/// the payload forwarded to extension contracts; it never moves funds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DexOrder {
    pub creator: Address,
    #[serde(rename = "type")]
    pub order_type: String,
    pub id: String,
    pub sequence: u64,
    pub base_denom: String,
    pub quote_denom: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(with = "amount_string")]
    pub quantity: Amount,
    pub side: String,
}

/// A coin moved from one account to another as part of order settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinToSend {
    pub from: Address,
    pub to: Address,
    pub coin: Coin,
}

/// Everything the DEX wants applied for one order, in one atomic batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DexActions {
    pub order: DexOrder,
    pub creator_expected_to_spend: Coin,
    pub creator_expected_to_receive: Coin,
    pub increase_locked: Vec<AccountCoin>,
    pub decrease_locked: Vec<AccountCoin>,
    pub increase_expected_to_receive: Vec<AccountCoin>,
    pub decrease_expected_to_receive: Vec<AccountCoin>,
    pub send: Vec<CoinToSend>,
}

impl DexActions {
    pub fn new(order: DexOrder, expected_to_spend: Coin, expected_to_receive: Coin) -> Self {
        Self {
            order,
            creator_expected_to_spend: expected_to_spend,
            creator_expected_to_receive: expected_to_receive,
            increase_locked: Vec::new(),
            decrease_locked: Vec::new(),
            increase_expected_to_receive: Vec::new(),
            decrease_expected_to_receive: Vec::new(),
            send: Vec::new(),
        }
    }

    pub fn add_increase_locked(&mut self, account: Address, coin: Coin) -> FtResult<()> {
        merge_account_coin(&mut self.increase_locked, account, coin)
    }

    pub fn add_decrease_locked(&mut self, account: Address, coin: Coin) -> FtResult<()> {
        merge_account_coin(&mut self.decrease_locked, account, coin)
    }

    pub fn add_increase_expected_to_receive(&mut self, account: Address, coin: Coin) -> FtResult<()> {
        merge_account_coin(&mut self.increase_expected_to_receive, account, coin)
    }

    pub fn add_decrease_expected_to_receive(&mut self, account: Address, coin: Coin) -> FtResult<()> {
        merge_account_coin(&mut self.decrease_expected_to_receive, account, coin)
    }

    /// Sends between the same pair in the same denom are merged.
    pub fn add_send(&mut self, from: Address, to: Address, coin: Coin) -> FtResult<()> {
        if let Some(existing) = self
            .send
            .iter_mut()
            .find(|s| s.from == from && s.to == to && s.coin.denom == coin.denom)
        {
            existing.coin.amount = checked_merge(existing.coin.amount, coin.amount)?;
            return Ok(());
        }
        self.send.push(CoinToSend { from, to, coin });
        Ok(())
    }
}

fn merge_account_coin(list: &mut Vec<AccountCoin>, account: Address, coin: Coin) -> FtResult<()> {
    if let Some(existing) = list
        .iter_mut()
        .find(|ac| ac.account == account && ac.coin.denom == coin.denom)
    {
        existing.coin.amount = checked_merge(existing.coin.amount, coin.amount)?;
        return Ok(());
    }
    list.push(AccountCoin { account, coin });
    Ok(())
}

fn checked_merge(current: Amount, extra: Amount) -> FtResult<Amount> {
    current
        .checked_add(extra)
        .ok_or_else(|| FtError::InvalidInput(format!("action amount overflow: {current} + {extra}")))
}
