use crate::engine::engine_pragmas::EnginePragmas;
use crate::{Error, Result};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// Coordinates access across threads sharing one engine instance (§5): a
/// process-wide catalog lock that write transactions take shared and that
/// checkpoint/rebuild take exclusive, plus one write lock per collection
/// name so two write transactions on different collections never block
/// each other. Every wait is bounded by the header's `timeout` pragma.
pub(crate) struct LockService {
    pragma: EnginePragmas,
    catalog: Arc<RwLock<()>>,
    collections: Mutex<HashMap<String, Arc<RwLock<()>>>>,
    transactions_open: Mutex<usize>,
}

impl LockService {
    pub fn new(pragma: EnginePragmas) -> Self {
        LockService {
            pragma,
            catalog: Arc::new(RwLock::new(())),
            collections: Mutex::new(HashMap::new()),
            transactions_open: Mutex::new(0),
        }
    }

    fn collection_lock(&self, collection: &str) -> Arc<RwLock<()>> {
        self.collections
            .lock()
            .entry(collection.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    /// Takes the catalog lock exclusively, for checkpoint/rebuild that must
    /// run with no reader or writer active anywhere in the engine.
    pub fn enter_exclusive(&self) -> Result<ExclusiveScope> {
        let Some(guard) = self.catalog.try_write_for(self.pragma.timeout()) else {
            return Err(Error::timeout());
        };
        // The guard borrows `self.catalog` for a lifetime this method's
        // return type can't carry. Keep the lock held by forgetting the
        // guard instead of dropping it, and release it manually from the
        // scope's own `Drop` via the matching owned `Arc`.
        std::mem::forget(guard);

        Ok(ExclusiveScope { catalog: self.catalog.clone() })
    }

    /// Takes the catalog lock shared, then `collection`'s write lock
    /// exclusively: a write transaction against `collection` blocks
    /// checkpoint/rebuild but not writes against any other collection.
    pub fn enter_lock(&self, collection: &str) -> Result<CollectionLockScope> {
        let Some(catalog_guard) = self.catalog.try_read_for(self.pragma.timeout()) else {
            return Err(Error::timeout());
        };
        std::mem::forget(catalog_guard);

        let lock = self.collection_lock(collection);
        let Some(collection_guard) = lock.try_write_for(self.pragma.timeout()) else {
            unsafe { self.catalog.force_unlock_read() };
            return Err(Error::timeout());
        };
        std::mem::forget(collection_guard);

        Ok(CollectionLockScope {
            catalog: self.catalog.clone(),
            collection: lock,
        })
    }

    /// Marks a thread as having an open transaction. Used by the monitor to
    /// know when the last transaction on a thread has released its locks.
    pub fn enter_transaction(&self) {
        *self.transactions_open.lock() += 1;
    }

    pub fn exit_transaction(&self) {
        let mut open = self.transactions_open.lock();
        *open = open.saturating_sub(1);
    }
}

/// Held for the duration of a checkpoint/rebuild. Releases the catalog
/// lock on drop.
pub(crate) struct ExclusiveScope {
    catalog: Arc<RwLock<()>>,
}

impl Drop for ExclusiveScope {
    fn drop(&mut self) {
        unsafe { self.catalog.force_unlock_write() };
    }
}

/// Held for the duration of a write transaction against one collection.
/// Releases both the collection write lock and the shared catalog lock on
/// drop.
pub(crate) struct CollectionLockScope {
    catalog: Arc<RwLock<()>>,
    collection: Arc<RwLock<()>>,
}

impl Drop for CollectionLockScope {
    fn drop(&mut self) {
        unsafe {
            self.collection.force_unlock_write();
            self.catalog.force_unlock_read();
        }
    }
}
