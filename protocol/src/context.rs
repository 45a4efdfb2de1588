//! Per-request execution context.
//!
//! A [`Context`] is the only thing that flows through every engine call. It
//! carries the store view of the current state transition, the purpose
//! markers set by whoever initiated the transfer, and the events produced so
//! far. Dropping a context without committing its store discards all of it.

use serde::{Deserialize, Serialize};

use crate::storage::KvStore;
use crate::types::{Address, Event};

/// Why a transfer is happening, as far as cross-chain transport is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferPurpose {
    /// Ordinary local transfer.
    #[default]
    None,
    /// Funds leaving towards the escrow of an outgoing IBC transfer.
    Out,
    /// Funds arriving from the escrow of an incoming IBC transfer.
    In,
    /// Refund after the counterparty rejected an outgoing transfer.
    Ack,
    /// Refund after an outgoing transfer timed out.
    Timeout,
}

impl TransferPurpose {
    /// Cross-chain legs, in either direction, are never charged rates.
    pub fn is_rate_exempt(&self) -> bool {
        !matches!(self, TransferPurpose::None)
    }

    /// Refunds bypass spend and receive gates entirely.
    pub fn is_refund(&self) -> bool {
        matches!(self, TransferPurpose::Ack | TransferPurpose::Timeout)
    }
}

/// Execution context of one request.
pub struct Context<'a> {
    store: &'a mut dyn KvStore,
    purpose: TransferPurpose,
    triggering_contract: Option<Address>,
    events: Vec<Event>,
}

impl<'a> Context<'a> {
    pub fn new(store: &'a mut dyn KvStore) -> Self {
        Self {
            store,
            purpose: TransferPurpose::None,
            triggering_contract: None,
            events: Vec::new(),
        }
    }

    pub fn with_purpose(mut self, purpose: TransferPurpose) -> Self {
        self.purpose = purpose;
        self
    }

    /// Marks the request as initiated by a smart contract.
    pub fn with_triggering_contract(mut self, contract: Address) -> Self {
        self.triggering_contract = Some(contract);
        self
    }

    pub fn store(&self) -> &dyn KvStore {
        &*self.store
    }

    pub fn store_mut(&mut self) -> &mut dyn KvStore {
        &mut *self.store
    }

    pub fn purpose(&self) -> TransferPurpose {
        self.purpose
    }

    pub fn set_purpose(&mut self, purpose: TransferPurpose) {
        self.purpose = purpose;
    }

    pub fn triggering_contract(&self) -> Option<&Address> {
        self.triggering_contract.as_ref()
    }

    pub fn is_triggered_by_contract(&self) -> bool {
        self.triggering_contract.is_some()
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}
