//! # Host Harness
//!
//! The smallest thing that behaves like a chain around the engine: it owns
//! the committed store and a keeper, and runs every request inside its own
//! write-buffering overlay.
//!
//! ```text
//!   execute(purpose, f)
//!     │
//!     ├── CacheStore over the committed store
//!     ├── Context { purpose, triggering contract }
//!     ├── f(ctx, keeper)
//!     │     Ok  → commit overlay (one batch), return events
//!     │     Err → drop overlay, nothing persisted
//! ```

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::ModuleParams;
use crate::context::{Context, TransferPurpose};
use crate::error::FtResult;
use crate::extension::ExtensionRuntime;
use crate::keeper::FtKeeper;
use crate::ledger::KvLedger;
use crate::storage::{CacheStore, KvStore};
use crate::types::{Address, Event};

/// Committed state plus the engine that mutates it.
pub struct Host<S: KvStore> {
    store: S,
    keeper: FtKeeper,
}

impl<S: KvStore> Host<S> {
    pub fn new(store: S, keeper: FtKeeper) -> Self {
        Self { store, keeper }
    }

    /// A host whose ledger lives in the same store as the module state.
    pub fn with_kv_ledger(
        store: S,
        runtime: Arc<dyn ExtensionRuntime>,
        params: ModuleParams,
    ) -> Self {
        let keeper = FtKeeper::new(Arc::new(KvLedger::new()), runtime, params);
        Self::new(store, keeper)
    }

    pub fn keeper(&self) -> &FtKeeper {
        &self.keeper
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Runs one request. Commits on `Ok`, discards on `Err`.
    pub fn execute<T, F>(&mut self, purpose: TransferPurpose, f: F) -> FtResult<(T, Vec<Event>)>
    where
        F: FnOnce(&mut Context<'_>, &FtKeeper) -> FtResult<T>,
    {
        self.execute_with(purpose, None, f)
    }

    /// Like [`execute`](Self::execute), for requests a contract initiated.
    pub fn execute_with<T, F>(
        &mut self,
        purpose: TransferPurpose,
        triggering_contract: Option<Address>,
        f: F,
    ) -> FtResult<(T, Vec<Event>)>
    where
        F: FnOnce(&mut Context<'_>, &FtKeeper) -> FtResult<T>,
    {
        let mut cache = CacheStore::new(&mut self.store);
        let outcome = {
            let mut ctx = Context::new(&mut cache).with_purpose(purpose);
            if let Some(contract) = triggering_contract {
                ctx = ctx.with_triggering_contract(contract);
            }
            f(&mut ctx, &self.keeper).map(|value| (value, ctx.take_events()))
        };

        match outcome {
            Ok((value, events)) => {
                debug!(writes = cache.pending(), events = events.len(), "committing request");
                cache.commit()?;
                Ok((value, events))
            }
            Err(e) => {
                warn!(error = %e, code = e.code(), "request failed, discarding writes");
                Err(e)
            }
        }
    }

    /// Runs a read-only closure. Any writes it makes are discarded.
    pub fn query<T, F>(&mut self, f: F) -> FtResult<T>
    where
        F: FnOnce(&Context<'_>, &FtKeeper) -> FtResult<T>,
    {
        let mut cache = CacheStore::new(&mut self.store);
        let ctx = Context::new(&mut cache);
        f(&ctx, &self.keeper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FtError;
    use crate::extension::NoExtensions;
    use crate::storage::{MemStore, SledStore};
    use crate::types::{Coin, Feature, IssueSettings};

    fn host<S: KvStore>(store: S) -> Host<S> {
        Host::with_kv_ledger(store, Arc::new(NoExtensions), ModuleParams::default())
    }

    fn settings() -> IssueSettings {
        let mut s = IssueSettings::new(Address::new("issuer"), "ABC", "uabc", 6);
        s.features = vec![Feature::Freezing];
        s.initial_amount = 100;
        s
    }

    #[test]
    fn successful_requests_commit_and_return_events() {
        let mut host = host(MemStore::new());
        let (denom, events) = host
            .execute(TransferPurpose::None, |ctx, keeper| keeper.issue(ctx, settings()))
            .unwrap();
        assert_eq!(denom, "uabc-issuer");
        assert!(events.iter().any(|e| e.name() == "issued"));

        let supply = host
            .query(|ctx, keeper| keeper.ledger().total_supply(ctx, &denom))
            .unwrap();
        assert_eq!(supply, 100);
    }

    #[test]
    fn failed_requests_leave_no_trace() {
        let mut host = host(MemStore::new());
        let (denom, _) = host
            .execute(TransferPurpose::None, |ctx, keeper| keeper.issue(ctx, settings()))
            .unwrap();
        let before = host.store().len();

        let err = host
            .execute(TransferPurpose::None, |ctx, keeper| {
                keeper.freeze(ctx, &Address::new("issuer"), &Address::new("alice"), &Coin::new(&denom, 5))?;
                keeper.send(ctx, &Address::new("nobody"), &Address::new("alice"), &[Coin::new(&denom, 1)])
            })
            .unwrap_err();
        assert!(matches!(err, FtError::InsufficientFunds(_)));
        assert_eq!(host.store().len(), before);

        let frozen = host
            .query(|ctx, keeper| keeper.get_frozen_balance(ctx, &Address::new("alice"), &denom))
            .unwrap();
        assert_eq!(frozen, 0);
    }

    #[test]
    fn sled_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let denom = {
            let mut host = host(SledStore::open(dir.path()).unwrap());
            let (denom, _) = host
                .execute(TransferPurpose::None, |ctx, keeper| keeper.issue(ctx, settings()))
                .unwrap();
            denom
        };

        let mut host = host(SledStore::open(dir.path()).unwrap());
        let def = host
            .query(|ctx, keeper| keeper.get_definition(ctx, &denom))
            .unwrap();
        assert!(def.is_feature_enabled(Feature::Freezing));
    }
}
