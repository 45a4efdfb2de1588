//! Domain types shared by every component: coins, denoms, definitions,
//! DEX order intents and events.

pub mod coin;
pub mod definition;
pub mod denom;
pub mod dex;
pub mod event;

pub use coin::{AccountCoin, Address, Amount, Coin};
pub use definition::{
    validate_dex_settings, validate_dex_settings_access, validate_features, validate_precision,
    validate_rate, Definition, DexSettings, ExtensionIssueSettings, Feature, IssueSettings,
    TokenView,
};
pub use denom::{build_denom, deconstruct_denom, validate_address, validate_subunit, validate_symbol};
pub use dex::{CoinToSend, DexActions, DexOrder};
pub use event::Event;
