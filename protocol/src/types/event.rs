//! Typed events emitted by state mutations.
//!
//! Events accumulate on the request context and are only handed to the host
//! when the request commits.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{coin::amount_string, Address, Amount, Coin, DexSettings, Feature};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Issued {
        denom: String,
        issuer: Address,
        symbol: String,
        subunit: String,
        precision: u32,
        #[serde(with = "amount_string")]
        initial_amount: Amount,
        features: Vec<Feature>,
        burn_rate: Decimal,
        send_commission_rate: Decimal,
        extension_contract: Option<Address>,
    },
    FrozenAmountChanged {
        account: Address,
        denom: String,
        #[serde(with = "amount_string")]
        previous_amount: Amount,
        #[serde(with = "amount_string")]
        current_amount: Amount,
    },
    WhitelistedAmountChanged {
        account: Address,
        denom: String,
        #[serde(with = "amount_string")]
        previous_amount: Amount,
        #[serde(with = "amount_string")]
        current_amount: Amount,
    },
    DexLockedAmountChanged {
        account: Address,
        denom: String,
        #[serde(with = "amount_string")]
        previous_amount: Amount,
        #[serde(with = "amount_string")]
        current_amount: Amount,
    },
    DexExpectedToReceiveAmountChanged {
        account: Address,
        denom: String,
        #[serde(with = "amount_string")]
        previous_amount: Amount,
        #[serde(with = "amount_string")]
        current_amount: Amount,
    },
    AmountClawedBack {
        account: Address,
        coin: Coin,
    },
    AdminTransferred {
        denom: String,
        previous_admin: Option<Address>,
        current_admin: Address,
    },
    AdminCleared {
        denom: String,
        previous_admin: Option<Address>,
    },
    DexSettingsChanged {
        denom: String,
        previous_settings: Option<DexSettings>,
        new_settings: DexSettings,
    },
    GlobalFreezeChanged {
        denom: String,
        frozen: bool,
    },
}

impl Event {
    /// Snake-case event name, as used in the serialized `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Event::Issued { .. } => "issued",
            Event::FrozenAmountChanged { .. } => "frozen_amount_changed",
            Event::WhitelistedAmountChanged { .. } => "whitelisted_amount_changed",
            Event::DexLockedAmountChanged { .. } => "dex_locked_amount_changed",
            Event::DexExpectedToReceiveAmountChanged { .. } => {
                "dex_expected_to_receive_amount_changed"
            }
            Event::AmountClawedBack { .. } => "amount_clawed_back",
            Event::AdminTransferred { .. } => "admin_transferred",
            Event::AdminCleared { .. } => "admin_cleared",
            Event::DexSettingsChanged { .. } => "dex_settings_changed",
            Event::GlobalFreezeChanged { .. } => "global_freeze_changed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_matches_name() {
        let event = Event::FrozenAmountChanged {
            account: Address::new("alice"),
            denom: "ufoo-i".into(),
            previous_amount: 0,
            current_amount: 10,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.name());
        assert_eq!(json["current_amount"], "10");
    }
}
