//! # Module Configuration & Constants
//!
//! Every magic number of the fungible-token engine lives here: store key
//! prefixes, validation patterns, precision limits. The runtime-tunable
//! part ([`ModuleParams`]) is a plain serde struct so hosts can load it from
//! TOML next to the rest of their configuration.
//!
//! Key prefixes are part of the persisted state contract. Changing one after
//! state has been written orphans every record stored under the old byte.

use serde::{Deserialize, Serialize};

use crate::types::{Address, Coin};

// ---------------------------------------------------------------------------
// Module Identity
// ---------------------------------------------------------------------------

/// Name of the module. Used as the default module account and in log targets.
pub const MODULE_NAME: &str = "assetft";

/// Version stamped on every definition produced by this build.
pub const CURRENT_TOKEN_VERSION: u32 = 1;

/// Crate version, for host banners.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// Store Key Prefixes
// ---------------------------------------------------------------------------

/// `0x01 || lp(issuer) || subunit` -> bincode(Definition)
pub const TOKEN_KEY_PREFIX: u8 = 0x01;

/// `0x02 || lp(issuer) || lowercase(symbol)` -> marker
pub const SYMBOL_KEY_PREFIX: u8 = 0x02;

/// `0x03 || lp(account) || denom` -> frozen amount
pub const FROZEN_BALANCES_KEY_PREFIX: u8 = 0x03;

/// `0x04 || denom` -> marker while globally frozen
pub const GLOBAL_FREEZE_KEY_PREFIX: u8 = 0x04;

/// `0x05 || lp(account) || denom` -> whitelisted limit
pub const WHITELISTED_BALANCES_KEY_PREFIX: u8 = 0x05;

/// `0x06 || lp(account) || denom` -> DEX-locked amount
pub const DEX_LOCKED_BALANCES_KEY_PREFIX: u8 = 0x06;

/// `0x07 || lp(account) || denom` -> DEX expected-to-receive amount
pub const DEX_EXPECTED_TO_RECEIVE_BALANCES_KEY_PREFIX: u8 = 0x07;

/// `0x08 || denom` -> bincode(DexSettings)
pub const DEX_SETTINGS_KEY_PREFIX: u8 = 0x08;

/// `0x09 || lp(contract) || key` -> extension contract private state
pub const CONTRACT_STATE_KEY_PREFIX: u8 = 0x09;

/// Value written for boolean markers (symbol registration, global freeze).
pub const STORE_TRUE: &[u8] = &[0x01];

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Separator between subunit and issuer inside a denom.
pub const DENOM_SEPARATOR: char = '-';

/// Subunit pattern. 51 characters max so that `{subunit}-{issuer}` stays
/// comfortably below the ledger's 127 character denom limit.
pub const SUBUNIT_PATTERN: &str = r"^[a-z][a-z0-9/:._]{0,50}$";

/// Symbol pattern.
pub const SYMBOL_PATTERN: &str = r"^[a-zA-Z][a-zA-Z0-9/:._-]{2,127}$";

/// Subunits starting with this prefix would collide with bridged denoms.
pub const IBC_DENOM_PREFIX: &str = "ibc";

/// Base denominations of the host chain. Never issuable.
pub const RESERVED_SUBUNITS: &[&str] = &[
    "core",
    "ucore",
    "testcore",
    "utestcore",
    "devcore",
    "udevcore",
];

/// Maximum decimal precision a token may declare.
pub const MAX_PRECISION: u32 = 20;

/// Burn and commission rates may carry at most this many decimal places.
pub const MAX_RATE_DECIMAL_PLACES: u32 = 4;

/// Upper bound on an address, in bytes. Keys length-prefix accounts with a
/// single byte.
pub const MAX_ADDRESS_LENGTH: usize = 255;

// ---------------------------------------------------------------------------
// Module Parameters
// ---------------------------------------------------------------------------

/// Runtime parameters of the module.
///
/// ```toml
/// authority = "gov"
/// module_account = "assetft"
/// issue_fee = { denom = "ucore", amount = "10000000" }
/// extra_reserved_subunits = ["uusd"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleParams {
    /// Governance authority. May update DEX settings of any denom.
    pub authority: Address,
    /// Account that mints and burns route through.
    pub module_account: Address,
    /// Fee burned from the issuer on every issuance.
    pub issue_fee: Option<Coin>,
    /// Subunits reserved on top of [`RESERVED_SUBUNITS`].
    pub extra_reserved_subunits: Vec<String>,
}

impl Default for ModuleParams {
    fn default() -> Self {
        Self {
            authority: Address::new("gov"),
            module_account: Address::new(MODULE_NAME),
            issue_fee: None,
            extra_reserved_subunits: Vec::new(),
        }
    }
}

impl ModuleParams {
    /// Returns `true` if `subunit` (case-insensitive) is reserved.
    pub fn is_reserved_subunit(&self, subunit: &str) -> bool {
        let lower = subunit.to_lowercase();
        RESERVED_SUBUNITS.iter().any(|r| *r == lower)
            || self
                .extra_reserved_subunits
                .iter()
                .any(|r| r.to_lowercase() == lower)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_prefixes_are_distinct() {
        let prefixes = [
            TOKEN_KEY_PREFIX,
            SYMBOL_KEY_PREFIX,
            FROZEN_BALANCES_KEY_PREFIX,
            GLOBAL_FREEZE_KEY_PREFIX,
            WHITELISTED_BALANCES_KEY_PREFIX,
            DEX_LOCKED_BALANCES_KEY_PREFIX,
            DEX_EXPECTED_TO_RECEIVE_BALANCES_KEY_PREFIX,
            DEX_SETTINGS_KEY_PREFIX,
            CONTRACT_STATE_KEY_PREFIX,
        ];
        let mut sorted = prefixes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), prefixes.len());
    }

    #[test]
    fn reserved_subunits_are_case_insensitive() {
        let params = ModuleParams {
            extra_reserved_subunits: vec!["UUSD".into()],
            ..Default::default()
        };
        assert!(params.is_reserved_subunit("UCORE"));
        assert!(params.is_reserved_subunit("uusd"));
        assert!(!params.is_reserved_subunit("ueur"));
    }

    #[test]
    fn params_deserialize_from_toml() {
        let raw = r#"
            authority = "council"
            issue_fee = { denom = "ucore", amount = "250" }
        "#;
        let params: ModuleParams = toml::from_str(raw).expect("valid params");
        assert_eq!(params.authority.as_str(), "council");
        assert_eq!(params.module_account.as_str(), MODULE_NAME);
        assert_eq!(params.issue_fee, Some(Coin::new("ucore", 250)));
    }
}
