//! # In-Process Extension Runtime
//!
//! Keeps a registry of contract codes and runs them synchronously inside the
//! engine's request. Instances are addressed deterministically:
//!
//! ```text
//!   address = "ext" || hex(blake3(code_id_be || denom || 0x00 || label)[..20])
//! ```
//!
//! The registry of instances (address → code id) is itself contract state:
//! the runtime writes the code id under a reserved key in the new
//! contract's namespace, so an instance exists exactly when that key does,
//! and it rolls back with the rest of a failed request.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use assetft_protocol::extension::{read_contract_state, ExtensionInstantiateMsg};
use assetft_protocol::{
    Address, Context, ContractError, ExtensionHost, ExtensionRuntime, FtError, FtResult,
};

/// Reserved state key holding an instance's code id.
pub const CODE_ID_KEY: &[u8] = b"__code_id";

const ADDRESS_PREFIX: &str = "ext";
const ADDRESS_HASH_BYTES: usize = 20;

// ---------------------------------------------------------------------------
// Contract code
// ---------------------------------------------------------------------------

/// Everything a contract may use during one call.
pub struct ContractEnv<'a, 'c> {
    pub ctx: &'a mut Context<'c>,
    pub host: &'a dyn ExtensionHost,
    /// The instance being called.
    pub address: &'a Address,
}

impl ContractEnv<'_, '_> {
    /// Reads a JSON value from the instance's state.
    pub fn load<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>, ContractError> {
        match self.host.state_get(&*self.ctx, self.address, key)? {
            None => Ok(None),
            Some(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|e| {
                ContractError::Host(FtError::InvalidState(format!(
                    "corrupt state of contract {}: {e}",
                    self.address
                )))
            }),
        }
    }

    /// Writes a JSON value into the instance's state.
    pub fn save<T: Serialize>(&mut self, key: &[u8], value: &T) -> Result<(), ContractError> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| ContractError::Host(FtError::InvalidState(e.to_string())))?;
        self.host.state_set(self.ctx, self.address, key, &bytes)?;
        Ok(())
    }
}

/// Code that can be stored in the runtime and instantiated per denom.
pub trait ExtensionCode: Send + Sync {
    fn name(&self) -> &str;

    fn instantiate(
        &self,
        env: &mut ContractEnv<'_, '_>,
        msg: &ExtensionInstantiateMsg,
    ) -> Result<(), ContractError>;

    /// Privileged entry point for the engine's hooks.
    fn sudo(
        &self,
        env: &mut ContractEnv<'_, '_>,
        msg: &serde_json::Value,
    ) -> Result<Option<serde_json::Value>, ContractError>;
}

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

/// Runs registered [`ExtensionCode`] in-process.
#[derive(Default)]
pub struct InProcessRuntime {
    codes: RwLock<BTreeMap<u64, Arc<dyn ExtensionCode>>>,
}

impl InProcessRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `code` and returns its id. Ids start at 1.
    pub fn store_code(&self, code: Arc<dyn ExtensionCode>) -> u64 {
        let mut codes = self.codes.write();
        let code_id = codes.keys().next_back().map_or(1, |last| last + 1);
        info!(code_id, name = code.name(), "stored contract code");
        codes.insert(code_id, code);
        code_id
    }

    pub fn code_count(&self) -> usize {
        self.codes.read().len()
    }

    fn code(&self, code_id: u64) -> Result<Arc<dyn ExtensionCode>, ContractError> {
        self.codes
            .read()
            .get(&code_id)
            .cloned()
            .ok_or(ContractError::UnknownCode(code_id))
    }

    /// Deterministic address of the instance of `code_id` for `denom`.
    pub fn contract_address(code_id: u64, denom: &str, label: &str) -> Address {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&code_id.to_be_bytes());
        hasher.update(denom.as_bytes());
        hasher.update(&[0]);
        hasher.update(label.as_bytes());
        let hash = hasher.finalize();
        Address::new(format!(
            "{ADDRESS_PREFIX}{}",
            hex::encode(&hash.as_bytes()[..ADDRESS_HASH_BYTES])
        ))
    }

    /// Code id of the instance at `contract`, if there is one.
    pub fn code_id_of(ctx: &Context<'_>, contract: &Address) -> FtResult<Option<u64>> {
        let bytes = match read_contract_state(ctx, contract, CODE_ID_KEY)? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };
        let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
            FtError::InvalidState(format!("malformed code id stored for {contract}"))
        })?;
        Ok(Some(u64::from_be_bytes(raw)))
    }
}

impl ExtensionRuntime for InProcessRuntime {
    fn instantiate(
        &self,
        ctx: &mut Context<'_>,
        host: &dyn ExtensionHost,
        code_id: u64,
        label: &str,
        msg: &ExtensionInstantiateMsg,
    ) -> Result<Address, ContractError> {
        let code = self.code(code_id)?;
        let address = Self::contract_address(code_id, &msg.denom, label);
        if Self::code_id_of(ctx, &address)?.is_some() {
            return Err(ContractError::Rejected(format!(
                "contract {address} already instantiated"
            )));
        }

        host.state_set(ctx, &address, CODE_ID_KEY, &code_id.to_be_bytes())?;
        let mut env = ContractEnv {
            ctx,
            host,
            address: &address,
        };
        code.instantiate(&mut env, msg)?;

        info!(code_id, denom = %msg.denom, contract = %address, "instantiated extension");
        Ok(address)
    }

    fn sudo(
        &self,
        ctx: &mut Context<'_>,
        host: &dyn ExtensionHost,
        contract: &Address,
        msg: &serde_json::Value,
    ) -> Result<Option<serde_json::Value>, ContractError> {
        let code_id = Self::code_id_of(ctx, contract)?
            .ok_or_else(|| ContractError::UnknownContract(contract.clone()))?;
        let code = self.code(code_id)?;
        debug!(code_id, contract = %contract, "sudo");

        let mut env = ContractEnv {
            ctx,
            host,
            address: contract,
        };
        code.sudo(&mut env, msg)
    }

    fn is_smart_contract(&self, ctx: &Context<'_>, account: &Address) -> FtResult<bool> {
        Ok(Self::code_id_of(ctx, account)?.is_some())
    }
}
