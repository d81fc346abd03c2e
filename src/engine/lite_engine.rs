mod collection;
mod delete;
mod index;
mod insert;
mod query;
mod sequence;
mod transaction;
mod update;
mod upsert;

pub use insert::BsonAutoId;
pub use query::Order;

use crate::bson;
use crate::engine::crypto::EncryptionService;
use crate::engine::disk::DiskService;
use crate::engine::lock_service::LockService;
use crate::engine::pages::HeaderPage;
use crate::engine::sort_disk::SortDisk;
use crate::engine::transaction_monitor::TransactionMonitor;
use crate::engine::transaction_service::{LockMode, TransactionService};
use crate::engine::wal_index_service::WalIndexService;
use crate::engine::{CONTAINER_SORT_SIZE, FileOrigin, PageAddress, StreamFactory};
use crate::utils::{CaseInsensitiveString, Collation, Shared};
use crate::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

pub struct LiteSettings {
    pub data_stream: Box<dyn StreamFactory>,
    pub log_stream: Box<dyn StreamFactory>,
    pub temp_stream: Box<dyn StreamFactory>,
    pub auto_build: bool,
    pub collation: Option<Collation>,
    pub password: Option<String>,
}

pub struct LiteEngine {
    locker: Rc<LockService>,
    disk: Rc<DiskService>,
    wal_index: Rc<WalIndexService>,
    header: Shared<HeaderPage>,
    monitor: Rc<TransactionMonitor>,
    sort_disk: Rc<SortDisk>,
    sequences: Mutex<HashMap<CaseInsensitiveString, i64>>,
}

impl LiteEngine {
    pub fn new(settings: LiteSettings) -> Result<Self> {
        let disk = DiskService::new(
            settings.data_stream,
            settings.log_stream,
            settings.collation,
            settings.password.as_deref(),
        )?;

        let header_buffer = disk
            .read_full(FileOrigin::Data)?
            .next()
            .transpose()?
            .expect("no header page");

        let header = HeaderPage::load(header_buffer)?;

        if header.is_encrypted() {
            let password = settings.password.as_deref().ok_or_else(Error::encrypted_no_password)?;
            let encryption = EncryptionService::new(password, header.encryption_salt());
            disk.set_encryption(Arc::new(encryption));
        }

        let mut header = header;

        if header.buffer().buffer()[HeaderPage::P_INVALID_DATAFILE_STATE] != 0 && settings.auto_build {
            todo!("rebuild when invalid");
        }

        if let Some(collation) = settings.collation {
            if header.pragmas().collation() != collation {
                return Err(Error::collation_not_match());
            }
        }

        let locker = LockService::new(**header.pragmas());

        // no services are passed; they are passed when needed
        let wal_index = WalIndexService::new();

        if disk.get_file_length(FileOrigin::Log) > 0 {
            wal_index.restore_index(&mut header, &disk)?;
        }

        let sort_disk = SortDisk::new(settings.temp_stream, CONTAINER_SORT_SIZE);
        let sort_disk = Rc::new(sort_disk);

        let header = Shared::new(header);
        let locker = Rc::new(locker);
        let disk = Rc::new(disk);
        let wal_index = Rc::new(wal_index);
        let monitor = TransactionMonitor::new(
            Shared::clone(&header),
            Rc::clone(&locker),
            Rc::clone(&disk),
            Rc::clone(&wal_index),
        );
        let monitor = Rc::new(monitor);

        debug_log!(ENGINE: "initialization completed");

        Ok(Self {
            locker,
            disk,
            wal_index,
            header,
            monitor,
            sort_disk,
            sequences: Mutex::new(HashMap::new()),
        })
    }

    pub fn soft_close(&mut self) -> Result<()> {
        self.wal_index.checkpoint(&self.disk, &self.locker)?;

        Ok(())
    }

    /// Flushes every confirmed WAL page into the data area (§6 `checkpoint`).
    pub fn checkpoint(&self) -> Result<()> {
        self.wal_index.checkpoint(&self.disk, &self.locker)
    }

    /// Runs `f` against the calling thread's transaction, creating one (and
    /// committing/rolling it back on exit) if none is already open -- the
    /// synchronous equivalent of the teacher's `with_transaction` facade, now
    /// routed through `TransactionMonitor`'s thread-local slot instead of an
    /// owned `Future`.
    pub(crate) fn auto_transaction<R>(
        &self,
        query_only: bool,
        f: impl FnOnce(&mut TransactionService) -> Result<R>,
    ) -> Result<R> {
        let (transaction_id, created) = self.monitor.get_or_create_transaction(query_only)?;

        let result = self.monitor.with_transaction(transaction_id, f);

        if created {
            let finish = self.monitor.with_transaction(transaction_id, |transaction| {
                if result.is_ok() {
                    transaction.commit()
                } else {
                    transaction.rollback()
                }
            });
            self.monitor.release_transaction(transaction_id)?;
            finish?;
        }

        result
    }
}
