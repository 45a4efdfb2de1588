//! # Token Definitions
//!
//! The per-denom policy record, the feature set it is built from, and the
//! settings structs accepted at issuance. Validation of every user-supplied
//! knob lives next to the type it constrains.
//!
//! ## Privileges
//!
//! ```text
//!   admin ──────────────┐
//!                       ├── has_admin_privileges ── may use any enabled feature
//!   extension contract ─┘                           (and always burn)
//!
//!   everybody else ──────────────────────────────── may burn, if burning enabled
//! ```

use std::collections::BTreeSet;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{MAX_PRECISION, MAX_RATE_DECIMAL_PLACES};
use crate::error::{FtError, FtResult};

use super::{coin::amount_string, Address, Amount};

// ---------------------------------------------------------------------------
// Features
// ---------------------------------------------------------------------------

/// Opt-in capabilities of a denom. Fixed at issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Minting,
    Burning,
    Freezing,
    Whitelisting,
    Ibc,
    BlockSmartContracts,
    Clawback,
    Extension,
    DexBlock,
    DexWhitelistedDenoms,
    DexOrderCancellation,
    DexUnifiedRefAmountChange,
}

impl Feature {
    pub const ALL: [Feature; 12] = [
        Feature::Minting,
        Feature::Burning,
        Feature::Freezing,
        Feature::Whitelisting,
        Feature::Ibc,
        Feature::BlockSmartContracts,
        Feature::Clawback,
        Feature::Extension,
        Feature::DexBlock,
        Feature::DexWhitelistedDenoms,
        Feature::DexOrderCancellation,
        Feature::DexUnifiedRefAmountChange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Minting => "minting",
            Feature::Burning => "burning",
            Feature::Freezing => "freezing",
            Feature::Whitelisting => "whitelisting",
            Feature::Ibc => "ibc",
            Feature::BlockSmartContracts => "block_smart_contracts",
            Feature::Clawback => "clawback",
            Feature::Extension => "extension",
            Feature::DexBlock => "dex_block",
            Feature::DexWhitelistedDenoms => "dex_whitelisted_denoms",
            Feature::DexOrderCancellation => "dex_order_cancellation",
            Feature::DexUnifiedRefAmountChange => "dex_unified_ref_amount_change",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Feature {
    type Err = FtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| FtError::InvalidInput(format!("unknown feature {s}")))
    }
}

/// Rejects duplicates and mutually exclusive combinations.
pub fn validate_features(features: &[Feature]) -> FtResult<()> {
    let mut seen = BTreeSet::new();
    for f in features {
        if !seen.insert(*f) {
            return Err(FtError::InvalidInput(format!("duplicated feature {f}")));
        }
    }

    if seen.contains(&Feature::Extension) && seen.contains(&Feature::BlockSmartContracts) {
        return Err(FtError::InvalidInput(
            "extension and block_smart_contracts features cannot be enabled together".into(),
        ));
    }

    if seen.contains(&Feature::DexBlock) {
        for dex_setting in [
            Feature::DexWhitelistedDenoms,
            Feature::DexOrderCancellation,
            Feature::DexUnifiedRefAmountChange,
        ] {
            if seen.contains(&dex_setting) {
                return Err(FtError::InvalidInput(format!(
                    "dex_block feature cannot be enabled together with {dex_setting}"
                )));
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Rates & precision
// ---------------------------------------------------------------------------

/// A rate must lie in `[0, 1]` and carry at most four decimal places.
pub fn validate_rate(name: &str, rate: Decimal) -> FtResult<()> {
    if rate.is_sign_negative() && !rate.is_zero() {
        return Err(FtError::InvalidInput(format!("{name} must not be negative")));
    }
    if rate > Decimal::ONE {
        return Err(FtError::InvalidInput(format!(
            "{name} must be between 0 and 1, got {rate}"
        )));
    }
    if rate.normalize().scale() > MAX_RATE_DECIMAL_PLACES {
        return Err(FtError::InvalidInput(format!(
            "{name} must have at most {MAX_RATE_DECIMAL_PLACES} decimal places, got {rate}"
        )));
    }
    Ok(())
}

pub fn validate_precision(precision: u32) -> FtResult<()> {
    if precision > MAX_PRECISION {
        return Err(FtError::InvalidInput(format!(
            "precision must be between 0 and {MAX_PRECISION}, got {precision}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Definition
// ---------------------------------------------------------------------------

/// Persisted policy record of one denom.
///
/// The global-freeze flag and DEX settings are deliberately *not* fields:
/// they are separate keyed entries so that toggling them never rewrites the
/// definition. [`TokenView`] stitches everything back together for queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definition {
    pub denom: String,
    pub issuer: Address,
    /// `None` once the admin has been cleared.
    pub admin: Option<Address>,
    pub features: Vec<Feature>,
    pub burn_rate: Decimal,
    pub send_commission_rate: Decimal,
    pub extension_contract: Option<Address>,
    pub version: u32,
    pub uri: String,
    pub uri_hash: String,
}

impl Definition {
    pub fn is_feature_enabled(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    pub fn is_issuer(&self, addr: &Address) -> bool {
        &self.issuer == addr
    }

    pub fn is_admin(&self, addr: &Address) -> bool {
        self.admin.as_ref() == Some(addr)
    }

    pub fn is_extension_contract(&self, addr: &Address) -> bool {
        self.extension_contract.as_ref() == Some(addr)
    }

    /// Admin, or the extension contract acting on behalf of the denom.
    pub fn has_admin_privileges(&self, addr: &Address) -> bool {
        self.is_admin(addr) || self.is_extension_contract(addr)
    }

    /// The extension contract address, if the denom delegates its policy.
    pub fn extension(&self) -> Option<&Address> {
        if self.is_feature_enabled(Feature::Extension) {
            self.extension_contract.as_ref()
        } else {
            None
        }
    }

    pub fn is_feature_allowed(&self, addr: &Address, feature: Feature) -> bool {
        if self.has_admin_privileges(addr) {
            return feature == Feature::Burning || self.is_feature_enabled(feature);
        }
        feature == Feature::Burning && self.is_feature_enabled(Feature::Burning)
    }

    /// Like [`is_feature_allowed`](Self::is_feature_allowed) but says why not.
    pub fn check_feature_allowed(&self, addr: &Address, feature: Feature) -> FtResult<()> {
        if self.is_feature_allowed(addr, feature) {
            return Ok(());
        }
        if !self.has_admin_privileges(addr) && self.is_feature_enabled(feature) {
            return Err(FtError::Unauthorized(format!(
                "address {addr} is unauthorized to perform the {feature} related operations"
            )));
        }
        Err(FtError::FeatureDisabled {
            denom: self.denom.clone(),
            feature,
        })
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Everything needed to issue a new denom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSettings {
    pub issuer: Address,
    pub symbol: String,
    pub subunit: String,
    pub precision: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub uri_hash: String,
    #[serde(with = "amount_string", default)]
    pub initial_amount: Amount,
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub burn_rate: Decimal,
    #[serde(default)]
    pub send_commission_rate: Decimal,
    #[serde(default)]
    pub extension_settings: Option<ExtensionIssueSettings>,
    #[serde(default)]
    pub dex_settings: Option<DexSettings>,
}

impl IssueSettings {
    /// Minimal settings: no features, zero rates, nothing minted.
    pub fn new(issuer: Address, symbol: &str, subunit: &str, precision: u32) -> Self {
        Self {
            issuer,
            symbol: symbol.to_string(),
            subunit: subunit.to_string(),
            precision,
            description: String::new(),
            uri: String::new(),
            uri_hash: String::new(),
            initial_amount: 0,
            features: Vec::new(),
            burn_rate: Decimal::ZERO,
            send_commission_rate: Decimal::ZERO,
            extension_settings: None,
            dex_settings: None,
        }
    }
}

/// How to instantiate the extension contract of a new denom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionIssueSettings {
    pub code_id: u64,
    pub label: String,
    /// Opaque JSON forwarded to the contract on instantiation.
    #[serde(default)]
    pub issuance_msg: serde_json::Value,
}

/// DEX-facing settings of a denom. Stored under their own key.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DexSettings {
    /// Order-book reference amount used for tick/lot sizing by the DEX.
    #[serde(default)]
    pub unified_ref_amount: Option<Decimal>,
    /// When non-empty, the only denoms this one may be traded against.
    #[serde(default)]
    pub whitelisted_denoms: Vec<String>,
}

/// Stand-alone validation, independent of any definition.
pub fn validate_dex_settings(settings: &DexSettings) -> FtResult<()> {
    if let Some(amount) = settings.unified_ref_amount {
        if amount <= Decimal::ZERO {
            return Err(FtError::InvalidInput(format!(
                "unified ref amount must be positive, got {amount}"
            )));
        }
    }

    let mut seen = BTreeSet::new();
    for denom in &settings.whitelisted_denoms {
        if denom.is_empty() || denom.chars().any(char::is_whitespace) {
            return Err(FtError::InvalidInput(format!(
                "invalid whitelisted denom {denom:?}"
            )));
        }
        if !seen.insert(denom) {
            return Err(FtError::InvalidInput(format!(
                "duplicated whitelisted denom {denom}"
            )));
        }
    }
    Ok(())
}

/// Every non-default setting needs its matching feature.
pub fn validate_dex_settings_access(settings: &DexSettings, def: &Definition) -> FtResult<()> {
    if settings.unified_ref_amount.is_some()
        && !def.is_feature_enabled(Feature::DexUnifiedRefAmountChange)
    {
        return Err(FtError::FeatureDisabled {
            denom: def.denom.clone(),
            feature: Feature::DexUnifiedRefAmountChange,
        });
    }
    if !settings.whitelisted_denoms.is_empty()
        && !def.is_feature_enabled(Feature::DexWhitelistedDenoms)
    {
        return Err(FtError::FeatureDisabled {
            denom: def.denom.clone(),
            feature: Feature::DexWhitelistedDenoms,
        });
    }
    Ok(())
}

/// Query-side composite of a definition and its satellite records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenView {
    pub definition: Definition,
    pub symbol: String,
    pub precision: u32,
    pub description: String,
    pub globally_frozen: bool,
    pub dex_settings: Option<DexSettings>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn def(features: Vec<Feature>) -> Definition {
        Definition {
            denom: "ufoo-issuer".into(),
            issuer: Address::new("issuer"),
            admin: Some(Address::new("issuer")),
            features,
            burn_rate: Decimal::ZERO,
            send_commission_rate: Decimal::ZERO,
            extension_contract: None,
            version: 1,
            uri: String::new(),
            uri_hash: String::new(),
        }
    }

    #[test]
    fn feature_names_round_trip_through_from_str() {
        for f in Feature::ALL {
            assert_eq!(Feature::from_str(f.as_str()).unwrap(), f);
        }
        assert!(Feature::from_str("teleport").is_err());
    }

    #[test]
    fn feature_combinations() {
        assert!(validate_features(&[Feature::Minting, Feature::Freezing]).is_ok());
        assert!(validate_features(&[Feature::Minting, Feature::Minting]).is_err());
        assert!(validate_features(&[Feature::Extension, Feature::BlockSmartContracts]).is_err());
        assert!(validate_features(&[Feature::DexBlock, Feature::DexOrderCancellation]).is_err());
        assert!(validate_features(&[Feature::DexBlock, Feature::Freezing]).is_ok());
    }

    #[test]
    fn rate_bounds() {
        assert!(validate_rate("burn rate", Decimal::ZERO).is_ok());
        assert!(validate_rate("burn rate", Decimal::ONE).is_ok());
        assert!(validate_rate("burn rate", Decimal::from_str("0.1234").unwrap()).is_ok());
        assert!(validate_rate("burn rate", Decimal::from_str("0.12340000").unwrap()).is_ok());

        assert!(validate_rate("burn rate", Decimal::from_str("0.12345").unwrap()).is_err());
        assert!(validate_rate("burn rate", Decimal::from_str("1.0001").unwrap()).is_err());
        assert!(validate_rate("burn rate", Decimal::from_str("-0.1").unwrap()).is_err());
    }

    #[test]
    fn admin_may_use_enabled_features_and_always_burn() {
        let d = def(vec![Feature::Freezing]);
        let admin = Address::new("issuer");
        assert!(d.is_feature_allowed(&admin, Feature::Freezing));
        assert!(d.is_feature_allowed(&admin, Feature::Burning));
        assert!(!d.is_feature_allowed(&admin, Feature::Minting));
    }

    #[test]
    fn non_admin_may_only_burn_when_enabled() {
        let holder = Address::new("holder");
        assert!(!def(vec![]).is_feature_allowed(&holder, Feature::Burning));
        assert!(def(vec![Feature::Burning]).is_feature_allowed(&holder, Feature::Burning));
        assert!(!def(vec![Feature::Freezing]).is_feature_allowed(&holder, Feature::Freezing));
    }

    #[test]
    fn check_feature_allowed_distinguishes_disabled_from_unauthorized() {
        let d = def(vec![Feature::Freezing]);
        let holder = Address::new("holder");
        let admin = Address::new("issuer");

        assert!(matches!(
            d.check_feature_allowed(&holder, Feature::Freezing),
            Err(FtError::Unauthorized(_))
        ));
        assert!(matches!(
            d.check_feature_allowed(&admin, Feature::Minting),
            Err(FtError::FeatureDisabled { feature: Feature::Minting, .. })
        ));
    }

    #[test]
    fn extension_contract_shares_admin_privileges() {
        let mut d = def(vec![Feature::Extension, Feature::Minting]);
        d.admin = None;
        d.extension_contract = Some(Address::new("ext"));
        assert!(d.has_admin_privileges(&Address::new("ext")));
        assert!(d.is_feature_allowed(&Address::new("ext"), Feature::Minting));
        assert_eq!(d.extension(), Some(&Address::new("ext")));
    }

    #[test]
    fn dex_settings_validation() {
        assert!(validate_dex_settings(&DexSettings::default()).is_ok());
        assert!(validate_dex_settings(&DexSettings {
            unified_ref_amount: Some(Decimal::ZERO),
            whitelisted_denoms: vec![],
        })
        .is_err());
        assert!(validate_dex_settings(&DexSettings {
            unified_ref_amount: None,
            whitelisted_denoms: vec!["a".into(), "a".into()],
        })
        .is_err());
    }

    #[test]
    fn dex_settings_need_matching_features() {
        let settings = DexSettings {
            unified_ref_amount: Some(Decimal::ONE),
            whitelisted_denoms: vec![],
        };
        assert!(validate_dex_settings_access(&settings, &def(vec![])).is_err());
        assert!(validate_dex_settings_access(
            &settings,
            &def(vec![Feature::DexUnifiedRefAmountChange])
        )
        .is_ok());
    }
}
