use crate::engine::disk::DiskService;
use crate::engine::lock_service::LockService;
use crate::engine::transaction_service::TransactionService;
use crate::engine::wal_index_service::WalIndexService;
use crate::engine::{HeaderPage, MAX_OPEN_TRANSACTIONS, MAX_TRANSACTION_SIZE};
use crate::utils::Shared;
use crate::{Error, Result};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub(crate) struct TransactionMonitorShared {
    pub free_pages: u32,
    pub initial_size: u32,
}

pub(crate) struct TransactionMonitor {
    header: Shared<HeaderPage>,
    locker: Rc<LockService>,
    disk: Rc<DiskService>,
    wal_index: Rc<WalIndexService>,

    shared: Rc<RefCell<TransactionMonitorShared>>,
    transactions: RefCell<HashMap<u32, TransactionService>>,
    slot_id: std::cell::Cell<Option<u32>>, // thread local
}

impl TransactionMonitor {
    pub fn new(
        header: Shared<HeaderPage>,
        locker: Rc<LockService>,
        disk: Rc<DiskService>,
        wal_index: Rc<WalIndexService>,
    ) -> Self {
        Self {
            header,
            locker,
            disk,
            wal_index,
            shared: Rc::new(RefCell::new(TransactionMonitorShared {
                free_pages: MAX_TRANSACTION_SIZE,
                initial_size: MAX_TRANSACTION_SIZE / MAX_OPEN_TRANSACTIONS as u32,
            })),
            transactions: RefCell::new(HashMap::new()),
            slot_id: std::cell::Cell::new(None),
        }
    }

    /// Returns the transaction id for the thread's active transaction,
    /// creating a new one if there isn't one yet, plus whether it was just
    /// created.
    pub fn get_or_create_transaction(&self, query_only: bool) -> Result<(u32, bool)> {
        if let Some(slot_id) = self.slot_id.get() {
            return Ok((slot_id, false));
        }

        if self.transactions.borrow().len() >= MAX_OPEN_TRANSACTIONS {
            return Err(Error::transaction_limit());
        }

        let initial_size = self.get_initial_size();
        let already_lock = self
            .transactions
            .borrow()
            .values()
            .any(|x| x.thread_id() == std::thread::current().id());

        let transaction = TransactionService::new(
            self.header.clone(),
            self.locker.clone(),
            self.disk.clone(),
            self.wal_index.clone(),
            initial_size,
            self.shared.clone(),
            query_only,
        );

        let transaction_id = transaction.transaction_id();
        self.transactions.borrow_mut().insert(transaction_id, transaction);

        if !already_lock {
            self.locker.enter_transaction();
            // return page when error occurs
        }

        if !query_only {
            self.slot_id.set(Some(transaction_id));
        }

        Ok((transaction_id, true))
    }

    pub fn with_transaction<R>(
        &self,
        transaction_id: u32,
        f: impl FnOnce(&mut TransactionService) -> R,
    ) -> R {
        let mut transactions = self.transactions.borrow_mut();
        let transaction = transactions
            .get_mut(&transaction_id)
            .expect("transaction not found");
        f(transaction)
    }

    pub fn get_transaction(&self) -> Option<u32> {
        self.slot_id.get()
    }

    pub fn release_transaction(&self, transaction_id: u32) -> Result<()> {
        let keep_locked;
        let transaction;

        {
            let mut shared = self.shared.borrow_mut();
            transaction = self
                .transactions
                .borrow_mut()
                .remove(&transaction_id)
                .expect("the transaction not exists");
            shared.free_pages += transaction.max_transaction_size();
            keep_locked = self
                .transactions
                .borrow()
                .values()
                .any(|x| x.thread_id() == std::thread::current().id());
        }

        if !keep_locked {
            self.locker.exit_transaction();
        }

        if !transaction.query_only() && self.slot_id.get() == Some(transaction_id) {
            self.slot_id.set(None);
        }

        Ok(())
    }

    pub fn get_thread_transaction(&self) -> Option<u32> {
        if let Some(slot_id) = self.slot_id.get() {
            Some(slot_id)
        } else {
            self.transactions
                .borrow()
                .values()
                .find(|x| x.thread_id() == std::thread::current().id())
                .map(|x| x.transaction_id())
        }
    }

    fn get_initial_size(&self) -> u32 {
        let mut shared = self.shared.borrow_mut();

        if shared.free_pages >= shared.initial_size {
            shared.free_pages -= shared.initial_size;
            shared.initial_size
        } else {
            let mut sum = 0;

            // if there is no available pages, reduce all open transactions
            for trans in self.transactions.borrow_mut().values_mut() {
                let reduce = trans.max_transaction_size() / shared.initial_size;

                trans.set_max_transaction_size(trans.max_transaction_size() - reduce);

                sum += reduce;
            }

            sum
        }
    }

    pub fn disk(&self) -> &Rc<DiskService> {
        &self.disk
    }

    pub fn locker(&self) -> &Rc<LockService> {
        &self.locker
    }
}
