//! Store key layout.
//!
//! Every key starts with a one-byte prefix from [`crate::config`]. Variable
//! length components that are followed by another component are written as
//! `lp(x)`: one length byte, then the bytes. This keeps prefix scans for a
//! single account exact (`alice` never matches `alice2`).

use crate::config::{
    CONTRACT_STATE_KEY_PREFIX, DEX_SETTINGS_KEY_PREFIX, GLOBAL_FREEZE_KEY_PREFIX,
    MAX_ADDRESS_LENGTH, SYMBOL_KEY_PREFIX, TOKEN_KEY_PREFIX,
};
use crate::error::{FtError, FtResult};
use crate::types::Address;

use super::StoreError;

/// Appends `lp(bytes)` to `key`.
fn push_length_prefixed(key: &mut Vec<u8>, bytes: &[u8]) -> FtResult<()> {
    let len = u8::try_from(bytes.len()).map_err(|_| {
        FtError::InvalidInput(format!(
            "key component longer than {MAX_ADDRESS_LENGTH} bytes"
        ))
    })?;
    key.push(len);
    key.extend_from_slice(bytes);
    Ok(())
}

/// `prefix || lp(addr) || tail`
pub fn address_key(prefix: u8, addr: &Address, tail: &[u8]) -> FtResult<Vec<u8>> {
    let mut key = Vec::with_capacity(2 + addr.as_bytes().len() + tail.len());
    key.push(prefix);
    push_length_prefixed(&mut key, addr.as_bytes())?;
    key.extend_from_slice(tail);
    Ok(key)
}

/// `prefix || lp(addr)`, the scan prefix for everything one address owns.
pub fn address_prefix(prefix: u8, addr: &Address) -> FtResult<Vec<u8>> {
    address_key(prefix, addr, &[])
}

/// Splits a key produced by [`address_key`] into `(address, tail)`.
pub fn split_address_key(key: &[u8]) -> Result<(Address, Vec<u8>), StoreError> {
    let malformed = || StoreError::Serialization(format!("malformed key {}", hex::encode(key)));

    let (&len, rest) = key.get(1..).and_then(<[u8]>::split_first).ok_or_else(malformed)?;
    let len = usize::from(len);
    if rest.len() < len {
        return Err(malformed());
    }
    let (addr, tail) = rest.split_at(len);
    let addr = std::str::from_utf8(addr).map_err(|_| malformed())?;
    Ok((Address::new(addr), tail.to_vec()))
}

/// Token definition key: `0x01 || lp(issuer) || subunit`.
pub fn token_key(issuer: &Address, subunit: &str) -> FtResult<Vec<u8>> {
    address_key(TOKEN_KEY_PREFIX, issuer, subunit.as_bytes())
}

/// Symbol registration key: `0x02 || lp(issuer) || lowercase(symbol)`.
pub fn symbol_key(issuer: &Address, symbol: &str) -> FtResult<Vec<u8>> {
    address_key(SYMBOL_KEY_PREFIX, issuer, symbol.to_lowercase().as_bytes())
}

pub fn global_freeze_key(denom: &str) -> Vec<u8> {
    prefixed(GLOBAL_FREEZE_KEY_PREFIX, denom.as_bytes())
}

pub fn dex_settings_key(denom: &str) -> Vec<u8> {
    prefixed(DEX_SETTINGS_KEY_PREFIX, denom.as_bytes())
}

/// Private state slot of an extension contract.
pub fn contract_state_key(contract: &Address, key: &[u8]) -> FtResult<Vec<u8>> {
    address_key(CONTRACT_STATE_KEY_PREFIX, contract, key)
}

fn prefixed(prefix: u8, tail: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + tail.len());
    key.push(prefix);
    key.extend_from_slice(tail);
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FROZEN_BALANCES_KEY_PREFIX;

    #[test]
    fn address_key_round_trips() {
        let alice = Address::new("alice");
        let key = address_key(FROZEN_BALANCES_KEY_PREFIX, &alice, b"ufoo-issuer").unwrap();
        assert_eq!(key[0], FROZEN_BALANCES_KEY_PREFIX);
        assert_eq!(key[1], 5);

        let (addr, tail) = split_address_key(&key).unwrap();
        assert_eq!(addr, alice);
        assert_eq!(tail, b"ufoo-issuer");
    }

    #[test]
    fn account_prefix_does_not_match_longer_accounts() {
        let short = address_prefix(FROZEN_BALANCES_KEY_PREFIX, &Address::new("alice")).unwrap();
        let long =
            address_key(FROZEN_BALANCES_KEY_PREFIX, &Address::new("alice2"), b"ufoo-x").unwrap();
        assert!(!long.starts_with(&short));
    }

    #[test]
    fn overlong_components_are_rejected() {
        let addr = Address::new("a".repeat(256));
        assert!(address_key(FROZEN_BALANCES_KEY_PREFIX, &addr, b"").is_err());
    }

    #[test]
    fn truncated_keys_fail_to_split() {
        assert!(split_address_key(&[FROZEN_BALANCES_KEY_PREFIX]).is_err());
        assert!(split_address_key(&[FROZEN_BALANCES_KEY_PREFIX, 9, b'a']).is_err());
    }

    #[test]
    fn symbol_keys_are_case_insensitive() {
        let issuer = Address::new("issuer");
        assert_eq!(
            symbol_key(&issuer, "FOO").unwrap(),
            symbol_key(&issuer, "foo").unwrap()
        );
    }
}
