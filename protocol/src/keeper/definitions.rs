//! Issuance and the per-denom records: definitions, symbol registrations,
//! the global-freeze flag and DEX settings.

use rust_decimal::Decimal;
use tracing::info;

use crate::config::{CURRENT_TOKEN_VERSION, STORE_TRUE, TOKEN_KEY_PREFIX};
use crate::context::Context;
use crate::error::{FtError, FtResult};
use crate::extension::ExtensionInstantiateMsg;
use crate::ledger::DenomMetadata;
use crate::storage::keys::{dex_settings_key, global_freeze_key, symbol_key, token_key};
use crate::storage::{decode, get_value, set_value};
use crate::types::{
    build_denom, deconstruct_denom, validate_address, validate_dex_settings,
    validate_dex_settings_access, validate_features, validate_precision, validate_rate,
    validate_subunit, validate_symbol, Address, Definition, DexSettings, Event, Feature,
    IssueSettings,
};

use super::FtKeeper;

impl FtKeeper {
    // -----------------------------------------------------------------------
    // Issuance
    // -----------------------------------------------------------------------

    /// Creates a new denom and returns it.
    pub fn issue(&self, ctx: &mut Context<'_>, settings: IssueSettings) -> FtResult<String> {
        validate_address(&settings.issuer)?;
        validate_subunit(&settings.subunit, &self.params)?;
        validate_precision(settings.precision)?;
        validate_features(&settings.features)?;
        validate_rate("burn rate", settings.burn_rate)?;
        validate_rate("send commission rate", settings.send_commission_rate)?;
        validate_symbol(&settings.symbol, &self.params)?;
        if let Some(dex_settings) = &settings.dex_settings {
            validate_dex_settings(dex_settings)?;
        }

        let extension_enabled = settings.features.contains(&Feature::Extension);
        if extension_enabled && settings.extension_settings.is_none() {
            return Err(FtError::InvalidInput(
                "extension settings must be provided when the extension feature is enabled".into(),
            ));
        }
        if !extension_enabled && settings.extension_settings.is_some() {
            return Err(FtError::InvalidInput(
                "extension settings are only accepted with the extension feature".into(),
            ));
        }

        let denom = build_denom(&settings.subunit, &settings.issuer);
        if self.ledger.get_denom_metadata(ctx, &denom)?.is_some()
            || self.find_definition(ctx, &denom)?.is_some()
        {
            return Err(FtError::InvalidInput(format!(
                "subunit {} already registered for the address {}",
                settings.subunit, settings.issuer
            )));
        }
        if self.is_symbol_registered(ctx, &settings.issuer, &settings.symbol)? {
            return Err(FtError::InvalidInput(format!(
                "duplicate symbol {}",
                settings.symbol
            )));
        }

        self.burn_issue_fee(ctx, &settings.issuer)?;
        self.register_symbol(ctx, &settings.issuer, &settings.symbol)?;

        let mut definition = Definition {
            denom: denom.clone(),
            issuer: settings.issuer.clone(),
            admin: Some(settings.issuer.clone()),
            features: settings.features.clone(),
            burn_rate: settings.burn_rate.normalize(),
            send_commission_rate: settings.send_commission_rate.normalize(),
            extension_contract: None,
            version: CURRENT_TOKEN_VERSION,
            uri: settings.uri.clone(),
            uri_hash: settings.uri_hash.clone(),
        };

        if let Some(dex_settings) = &settings.dex_settings {
            validate_dex_settings_access(dex_settings, &definition)
                .map_err(|e| FtError::InvalidInput(e.to_string()))?;
        }

        if let Some(extension) = &settings.extension_settings {
            let issuance_msg = if extension.issuance_msg.is_null() {
                serde_json::json!({})
            } else {
                extension.issuance_msg.clone()
            };
            let msg = ExtensionInstantiateMsg {
                denom: denom.clone(),
                issuance_msg,
            };
            let contract = self
                .runtime
                .instantiate(ctx, self, extension.code_id, &extension.label, &msg)
                .map_err(FtError::from)?;
            definition.extension_contract = Some(contract);
        }

        self.ledger.set_denom_metadata(
            ctx,
            DenomMetadata {
                denom: denom.clone(),
                symbol: settings.symbol.clone(),
                description: settings.description.clone(),
                precision: settings.precision,
                uri: settings.uri.clone(),
                uri_hash: settings.uri_hash.clone(),
            },
        )?;
        self.set_definition(ctx, &definition)?;
        if let Some(dex_settings) = &settings.dex_settings {
            self.set_dex_settings(ctx, &denom, dex_settings)?;
        }

        self.mint_if_receivable(ctx, &definition, settings.initial_amount, &settings.issuer)?;

        info!(
            denom = %denom,
            issuer = %settings.issuer,
            initial_amount = %settings.initial_amount,
            "token issued"
        );
        ctx.emit(Event::Issued {
            denom: denom.clone(),
            issuer: settings.issuer,
            symbol: settings.symbol,
            subunit: settings.subunit.to_lowercase(),
            precision: settings.precision,
            initial_amount: settings.initial_amount,
            features: definition.features,
            burn_rate: definition.burn_rate,
            send_commission_rate: definition.send_commission_rate,
            extension_contract: definition.extension_contract,
        });

        Ok(denom)
    }

    fn burn_issue_fee(&self, ctx: &mut Context<'_>, issuer: &Address) -> FtResult<()> {
        let fee = match &self.params.issue_fee {
            Some(fee) if fee.is_positive() => fee.clone(),
            _ => return Ok(()),
        };
        self.burn_raw(ctx, issuer, &fee).map_err(|e| match e {
            FtError::InsufficientFunds(msg) => {
                FtError::InsufficientFunds(format!("issue fee {fee} cannot be paid: {msg}"))
            }
            other => other,
        })
    }

    // -----------------------------------------------------------------------
    // Definitions
    // -----------------------------------------------------------------------

    /// Loads the definition of `denom`.
    ///
    /// Returns `None` for denoms that are not ours: unknown, or not of the
    /// `subunit-issuer` shape at all.
    pub fn find_definition(&self, ctx: &Context<'_>, denom: &str) -> FtResult<Option<Definition>> {
        let (subunit, issuer) = match deconstruct_denom(denom) {
            Ok(parts) => parts,
            Err(_) => return Ok(None),
        };
        let key = token_key(&issuer, &subunit)?;
        Ok(get_value(ctx.store(), &key)?)
    }

    pub fn get_definition(&self, ctx: &Context<'_>, denom: &str) -> FtResult<Definition> {
        self.find_definition(ctx, denom)?
            .ok_or_else(|| FtError::NotFound(format!("token definition for {denom}")))
    }

    pub fn set_definition(&self, ctx: &mut Context<'_>, definition: &Definition) -> FtResult<()> {
        let (subunit, issuer) = deconstruct_denom(&definition.denom)?;
        let key = token_key(&issuer, &subunit)?;
        set_value(ctx.store_mut(), &key, definition)?;
        Ok(())
    }

    /// Visits every definition in key order until the callback returns `true`.
    pub fn iterate_definitions<F>(&self, ctx: &Context<'_>, mut callback: F) -> FtResult<()>
    where
        F: FnMut(Definition) -> FtResult<bool>,
    {
        for (_, value) in ctx.store().scan_prefix(&[TOKEN_KEY_PREFIX])? {
            let definition: Definition = decode(&value)?;
            if callback(definition)? {
                break;
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Symbols
    // -----------------------------------------------------------------------

    pub fn is_symbol_registered(
        &self,
        ctx: &Context<'_>,
        issuer: &Address,
        symbol: &str,
    ) -> FtResult<bool> {
        let key = symbol_key(issuer, symbol)?;
        Ok(ctx.store().get(&key)?.is_some())
    }

    fn register_symbol(&self, ctx: &mut Context<'_>, issuer: &Address, symbol: &str) -> FtResult<()> {
        let key = symbol_key(issuer, symbol)?;
        ctx.store_mut().set(&key, STORE_TRUE)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Global freeze flag
    // -----------------------------------------------------------------------

    pub fn is_globally_frozen(&self, ctx: &Context<'_>, denom: &str) -> FtResult<bool> {
        Ok(ctx.store().get(&global_freeze_key(denom))?.is_some())
    }

    pub(crate) fn set_global_freeze(
        &self,
        ctx: &mut Context<'_>,
        denom: &str,
        frozen: bool,
    ) -> FtResult<()> {
        let key = global_freeze_key(denom);
        if frozen {
            ctx.store_mut().set(&key, STORE_TRUE)?;
        } else {
            ctx.store_mut().delete(&key)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // DEX settings
    // -----------------------------------------------------------------------

    pub fn get_dex_settings(&self, ctx: &Context<'_>, denom: &str) -> FtResult<Option<DexSettings>> {
        Ok(get_value(ctx.store(), &dex_settings_key(denom))?)
    }

    pub(crate) fn set_dex_settings(
        &self,
        ctx: &mut Context<'_>,
        denom: &str,
        settings: &DexSettings,
    ) -> FtResult<()> {
        set_value(ctx.store_mut(), &dex_settings_key(denom), settings)?;
        Ok(())
    }

    /// Reference amount the DEX should use for `denom`. `None` means the DEX
    /// falls back to its own default.
    pub fn unified_ref_amount(&self, ctx: &Context<'_>, denom: &str) -> FtResult<Option<Decimal>> {
        Ok(self
            .get_dex_settings(ctx, denom)?
            .and_then(|settings| settings.unified_ref_amount))
    }
}
