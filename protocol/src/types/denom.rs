//! Denom construction and subunit/symbol validation.
//!
//! A denom is `lowercase(subunit) + "-" + issuer`. Embedding the issuer makes
//! denoms globally unique without a registry round-trip and lets any
//! component recover the issuer from the denom alone.

use regex::Regex;

use crate::config::{
    ModuleParams, DENOM_SEPARATOR, IBC_DENOM_PREFIX, MAX_ADDRESS_LENGTH, SUBUNIT_PATTERN,
    SYMBOL_PATTERN,
};
use crate::error::{FtError, FtResult};

use super::Address;

/// Builds the denom for `subunit` issued by `issuer`.
pub fn build_denom(subunit: &str, issuer: &Address) -> String {
    format!("{}{}{}", subunit.to_lowercase(), DENOM_SEPARATOR, issuer)
}

/// Splits a denom into `(subunit, issuer)`.
///
/// Fails with `InvalidInput` for anything that could not have been produced
/// by [`build_denom`]. Callers treat that as "not one of ours".
pub fn deconstruct_denom(denom: &str) -> FtResult<(String, Address)> {
    let mut parts = denom.split(DENOM_SEPARATOR);
    let (subunit, issuer) = match (parts.next(), parts.next(), parts.next()) {
        (Some(s), Some(i), None) => (s, i),
        _ => {
            return Err(FtError::InvalidInput(format!(
                "denom {denom} must match format [subunit]-[issuer-address]"
            )))
        }
    };

    let issuer = Address::new(issuer);
    validate_address(&issuer)
        .map_err(|e| FtError::InvalidInput(format!("invalid issuer in denom {denom}: {e}")))?;
    match_pattern(SUBUNIT_PATTERN, subunit)
        .map_err(|_| FtError::InvalidInput(format!("invalid subunit in denom {denom}")))?;

    Ok((subunit.to_string(), issuer))
}

/// Checks an address is usable as a key component and inside a denom.
pub fn validate_address(addr: &Address) -> FtResult<()> {
    if addr.is_empty() {
        return Err(FtError::InvalidInput("address must not be empty".into()));
    }
    if addr.as_bytes().len() > MAX_ADDRESS_LENGTH {
        return Err(FtError::InvalidInput(format!(
            "address longer than {MAX_ADDRESS_LENGTH} bytes"
        )));
    }
    if addr
        .as_str()
        .chars()
        .any(|c| c == DENOM_SEPARATOR || c.is_whitespace())
    {
        return Err(FtError::InvalidInput(format!(
            "address {addr} contains a forbidden character"
        )));
    }
    Ok(())
}

/// Validates a subunit against the pattern, the ibc prefix and the reserved list.
pub fn validate_subunit(subunit: &str, params: &ModuleParams) -> FtResult<()> {
    if params.is_reserved_subunit(subunit) {
        return Err(FtError::InvalidInput(format!(
            "{subunit} is a reserved subunit"
        )));
    }
    if subunit.to_lowercase().starts_with(IBC_DENOM_PREFIX) {
        return Err(FtError::InvalidInput(
            "subunit cannot start with ibc".into(),
        ));
    }
    match_pattern(SUBUNIT_PATTERN, subunit)
}

/// Validates a symbol. Symbols share the reserved list with subunits.
pub fn validate_symbol(symbol: &str, params: &ModuleParams) -> FtResult<()> {
    if params.is_reserved_subunit(symbol) {
        return Err(FtError::InvalidInput(format!("{symbol} is a reserved symbol")));
    }
    match_pattern(SYMBOL_PATTERN, symbol)
}

fn match_pattern(pattern: &str, value: &str) -> FtResult<()> {
    let re = Regex::new(pattern)
        .map_err(|e| FtError::InvalidState(format!("bad validation pattern {pattern}: {e}")))?;
    if re.is_match(value) {
        Ok(())
    } else {
        Err(FtError::InvalidInput(format!(
            "{value:?} must match regex format '{pattern}'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ModuleParams {
        ModuleParams::default()
    }

    #[test]
    fn build_and_deconstruct_denom() {
        let issuer = Address::new("core1issuer");
        let denom = build_denom("UFoo", &issuer);
        assert_eq!(denom, "ufoo-core1issuer");

        let (subunit, back) = deconstruct_denom(&denom).unwrap();
        assert_eq!(subunit, "ufoo");
        assert_eq!(back, issuer);
    }

    #[test]
    fn foreign_denoms_do_not_deconstruct() {
        assert!(deconstruct_denom("ucore").is_err());
        assert!(deconstruct_denom("a-b-c").is_err());
        assert!(deconstruct_denom("ibc/ABCDEF").is_err());
        assert!(deconstruct_denom("9abc-issuer").is_err());
    }

    #[test]
    fn subunit_rules() {
        let p = params();
        assert!(validate_subunit("ufoo", &p).is_ok());
        assert!(validate_subunit("a", &p).is_ok());
        assert!(validate_subunit("u/foo:bar.baz_1", &p).is_ok());

        assert!(validate_subunit("ucore", &p).is_err());
        assert!(validate_subunit("UCORE", &p).is_err());
        assert!(validate_subunit("ibcfoo", &p).is_err());
        assert!(validate_subunit("Ufoo", &p).is_err());
        assert!(validate_subunit("1foo", &p).is_err());
        assert!(validate_subunit("", &p).is_err());
        assert!(validate_subunit(&"a".repeat(52), &p).is_err());
        assert!(validate_subunit(&"a".repeat(51), &p).is_ok());
    }

    #[test]
    fn symbol_rules() {
        let p = params();
        assert!(validate_symbol("FOO", &p).is_ok());
        assert!(validate_symbol("Foo-1.x", &p).is_ok());

        assert!(validate_symbol("FO", &p).is_err());
        assert!(validate_symbol("1FOO", &p).is_err());
        assert!(validate_symbol("core", &p).is_err());
        assert!(validate_symbol("FOO BAR", &p).is_err());
    }

    #[test]
    fn address_rules() {
        assert!(validate_address(&Address::new("alice")).is_ok());
        assert!(validate_address(&Address::new("")).is_err());
        assert!(validate_address(&Address::new("al-ice")).is_err());
        assert!(validate_address(&Address::new("al ice")).is_err());
        assert!(validate_address(&Address::new("a".repeat(256))).is_err());
    }
}
