use crate::Result;
use crate::engine::crypto::EncryptionService;
use crate::engine::disk::disk_reader::DiskReader;
use crate::engine::disk::memory_cache::MemoryCache;
use crate::engine::disk::stream_pool::StreamPool;
use crate::engine::pages::HeaderPage;
use crate::engine::{FileOrigin, PageBuffer, PAGE_SIZE};
use crate::utils::Collation;
use parking_lot::RwLock;
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::Arc;

/// Owns the two streams backing a database (the data area and the WAL log
/// area) plus the shared page cache sitting in front of them (§4.2-§4.3).
/// All I/O here is synchronous on the calling thread.
pub(crate) struct DiskService {
    cache: MemoryCache,
    data_pool: StreamPool,
    log_pool: StreamPool,
    encryption: RwLock<Option<Arc<EncryptionService>>>,
}

impl DiskService {
    /// Opens (or creates) the data and log streams. When the data stream
    /// does not yet exist, a blank header page stamped with `collation` is
    /// written as page 0 before returning.
    pub fn new(
        data_factory: Box<dyn crate::engine::StreamFactory>,
        log_factory: Box<dyn crate::engine::StreamFactory>,
        collation: Option<Collation>,
        password: Option<&str>,
    ) -> Result<Self> {
        let is_new = !data_factory.exists();

        let data_pool = StreamPool::new(data_factory);
        let log_pool = StreamPool::new(log_factory);
        let cache = MemoryCache::new();
        let disk = Self { cache, data_pool, log_pool, encryption: RwLock::new(None) };

        if is_new {
            let mut header = HeaderPage::new(Box::new(PageBuffer::new(0)), collation.unwrap_or_default());

            if let Some(password) = password {
                let salt = EncryptionService::random_salt();
                header.set_encryption(salt);
                disk.set_encryption(Arc::new(EncryptionService::new(password, salt)));
            }

            let page = header.update_buffer();
            let bytes = *page.buffer();

            let mut writer = disk.data_pool.writeable()?;
            writer.set_len(PAGE_SIZE as u64)?;
            writer.seek(SeekFrom::Start(0))?;
            writer.write_all(&bytes)?;
            writer.sync_data()?;
        }

        Ok(disk)
    }

    /// Activates page encryption for every subsequent read/write. Set
    /// once, right after `open` derives the key from the header's salt
    /// and the caller's password.
    pub fn set_encryption(&self, encryption: Arc<EncryptionService>) {
        *self.encryption.write() = Some(encryption);
    }

    fn encryption(&self) -> Option<Arc<EncryptionService>> {
        self.encryption.read().clone()
    }

    pub fn get_reader(&self) -> DiskReader<'_> {
        DiskReader::new(&self.cache, &self.data_pool, &self.log_pool, self.encryption())
    }

    pub fn cache(&self) -> &MemoryCache {
        &self.cache
    }

    pub fn cache_mut_clear(&self) {
        self.cache.clear();
    }

    pub fn new_page(&self) -> Box<PageBuffer> {
        self.cache.new_page()
    }

    pub fn max_items_count(&self) -> u32 {
        crate::engine::MAX_ITEMS_COUNT
    }

    fn pool(&self, origin: FileOrigin) -> &StreamPool {
        match origin {
            FileOrigin::Data => &self.data_pool,
            FileOrigin::Log => &self.log_pool,
        }
    }

    pub fn get_file_length(&self, origin: FileOrigin) -> u64 {
        self.pool(origin).factory().len().unwrap_or(0)
    }

    pub fn set_length(&self, len: u64, origin: FileOrigin) -> Result<()> {
        self.pool(origin).writeable()?.set_len(len)
    }

    /// Reads every page of `origin`'s stream from offset zero through the
    /// end of the stream, in order.
    pub fn read_full(&self, origin: FileOrigin) -> Result<impl Iterator<Item = Result<Box<PageBuffer>>> + '_> {
        let len = self.get_file_length(origin);
        let page_count = (len / PAGE_SIZE as u64) as usize;
        let mut stream = self.pool(origin).rent()?;
        stream.seek(SeekFrom::Start(0))?;
        let encryption = self.encryption();

        Ok((0..page_count).map(move |i| {
            let mut buffer = Box::new(PageBuffer::new(0));
            buffer.set_position((i * PAGE_SIZE) as u64);
            stream.read_exact(buffer.buffer_mut())?;
            crate::engine::crypto::maybe_decrypt(buffer.buffer_mut(), encryption.as_deref())?;
            Ok(buffer)
        }))
    }

    /// Appends `buffers` sequentially to the end of the log area, in
    /// order, stamping each with its resulting log position.
    pub fn write_log_disk(&self, buffers: Vec<Box<PageBuffer>>) -> Result<usize> {
        let count = buffers.len();
        if count == 0 {
            return Ok(0);
        }

        let encryption = self.encryption();
        let mut writer = self.pool(FileOrigin::Log).writeable()?;
        let mut position = writer.seek(SeekFrom::End(0))?;

        for mut buffer in buffers {
            buffer.set_position_origin(position, FileOrigin::Log);
            let on_disk = crate::engine::crypto::maybe_encrypt(buffer.buffer(), encryption.as_deref());
            writer.write_all(&on_disk)?;
            position += PAGE_SIZE as u64;
        }

        writer.sync_data()?;

        Ok(count)
    }

    /// Writes `buffers` directly into the data area at their own page
    /// position (used by checkpoint to flush confirmed WAL pages home).
    pub fn write_data_disk(&self, buffers: &[Box<PageBuffer>]) -> Result<()> {
        let encryption = self.encryption();
        let mut writer = self.pool(FileOrigin::Data).writeable()?;

        for buffer in buffers {
            let on_disk = crate::engine::crypto::maybe_encrypt(buffer.buffer(), encryption.as_deref());
            writer.seek(SeekFrom::Start(buffer.position()))?;
            writer.write_all(&on_disk)?;
        }

        writer.sync_data()?;
        Ok(())
    }

    /// Releases pages that a transaction read but never modified. Their
    /// content is already correct in the shared cache, so there is
    /// nothing further to persist.
    pub fn discard_clean_pages(&self, _buffers: &[&PageBuffer]) {}

    /// Releases writable copies of pages a transaction modified but is
    /// rolling back; their content must not leak into the shared
    /// readable cache.
    pub fn discard_dirty_pages(&self, _buffers: &[&PageBuffer]) {}
}
