//! Admin lifecycle and DEX settings updates.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::context::Context;
use crate::error::{FtError, FtResult};
use crate::types::{validate_address, validate_dex_settings, Address, Event, Feature};

use super::FtKeeper;

/// Partial DEX settings change. `None` fields keep their current value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DexSettingsUpdate {
    #[serde(default)]
    pub unified_ref_amount: Option<Decimal>,
    #[serde(default)]
    pub whitelisted_denoms: Option<Vec<String>>,
}

impl FtKeeper {
    /// Hands the admin role of `denom` to `new_admin`.
    pub fn transfer_admin(
        &self,
        ctx: &mut Context<'_>,
        sender: &Address,
        new_admin: &Address,
        denom: &str,
    ) -> FtResult<()> {
        validate_address(new_admin)?;
        let mut def = self.get_definition(ctx, denom)?;
        if !def.is_admin(sender) {
            return Err(FtError::Unauthorized(format!(
                "only the admin of {denom} can transfer the admin role"
            )));
        }

        let previous_admin = def.admin.replace(new_admin.clone());
        self.set_definition(ctx, &def)?;

        info!(denom = %denom, new_admin = %new_admin, "admin transferred");
        ctx.emit(Event::AdminTransferred {
            denom: denom.to_string(),
            previous_admin,
            current_admin: new_admin.clone(),
        });
        Ok(())
    }

    /// Removes the admin of `denom` for good.
    ///
    /// Without an extension there is nobody left to receive commission, so
    /// the commission rate drops to zero.
    pub fn clear_admin(&self, ctx: &mut Context<'_>, sender: &Address, denom: &str) -> FtResult<()> {
        let mut def = self.get_definition(ctx, denom)?;
        if !def.is_admin(sender) {
            return Err(FtError::Unauthorized(format!(
                "only the admin of {denom} can clear the admin role"
            )));
        }

        let previous_admin = def.admin.take();
        if !def.is_feature_enabled(Feature::Extension) {
            def.send_commission_rate = Decimal::ZERO;
        }
        self.set_definition(ctx, &def)?;

        info!(denom = %denom, "admin cleared");
        ctx.emit(Event::AdminCleared {
            denom: denom.to_string(),
            previous_admin,
        });
        Ok(())
    }

    pub fn update_dex_unified_ref_amount(
        &self,
        ctx: &mut Context<'_>,
        sender: &Address,
        denom: &str,
        unified_ref_amount: Decimal,
    ) -> FtResult<()> {
        self.update_dex_settings(
            ctx,
            sender,
            denom,
            DexSettingsUpdate {
                unified_ref_amount: Some(unified_ref_amount),
                whitelisted_denoms: None,
            },
        )
    }

    pub fn update_dex_whitelisted_denoms(
        &self,
        ctx: &mut Context<'_>,
        sender: &Address,
        denom: &str,
        whitelisted_denoms: Vec<String>,
    ) -> FtResult<()> {
        self.update_dex_settings(
            ctx,
            sender,
            denom,
            DexSettingsUpdate {
                unified_ref_amount: None,
                whitelisted_denoms: Some(whitelisted_denoms),
            },
        )
    }

    /// Merges `update` into the stored settings of `denom`.
    ///
    /// The governance authority may change anything. The admin may change a
    /// field only when the denom has the matching feature.
    pub fn update_dex_settings(
        &self,
        ctx: &mut Context<'_>,
        sender: &Address,
        denom: &str,
        update: DexSettingsUpdate,
    ) -> FtResult<()> {
        let def = self.get_definition(ctx, denom)?;

        if *sender != self.params.authority {
            if !def.is_admin(sender) {
                return Err(FtError::Unauthorized(format!(
                    "only the admin of {denom} or the governance authority can update DEX settings"
                )));
            }
            if update.unified_ref_amount.is_some() {
                require_feature(&def.denom, &def.features, Feature::DexUnifiedRefAmountChange)?;
            }
            if update.whitelisted_denoms.is_some() {
                require_feature(&def.denom, &def.features, Feature::DexWhitelistedDenoms)?;
            }
        }

        let previous = self.get_dex_settings(ctx, denom)?;
        let mut merged = previous.clone().unwrap_or_default();
        if let Some(amount) = update.unified_ref_amount {
            merged.unified_ref_amount = Some(amount);
        }
        if let Some(denoms) = update.whitelisted_denoms {
            merged.whitelisted_denoms = denoms;
        }
        validate_dex_settings(&merged)?;

        self.set_dex_settings(ctx, denom, &merged)?;
        info!(denom = %denom, sender = %sender, "DEX settings changed");
        ctx.emit(Event::DexSettingsChanged {
            denom: denom.to_string(),
            previous_settings: previous,
            new_settings: merged,
        });
        Ok(())
    }
}

fn require_feature(denom: &str, features: &[Feature], feature: Feature) -> FtResult<()> {
    if features.contains(&feature) {
        Ok(())
    } else {
        Err(FtError::FeatureDisabled {
            denom: denom.to_string(),
            feature,
        })
    }
}
