use crate::Result;
use crate::engine::crypto::EncryptionService;
use crate::engine::disk::memory_cache::MemoryCache;
use crate::engine::disk::stream_pool::{StreamGuard, StreamPool};
use crate::engine::{FileOrigin, FileStream, PageBuffer};
use std::io::{Seek, SeekFrom};
use std::rc::Rc;
use std::sync::Arc;

pub(crate) struct DiskReader<'a> {
    cache: &'a MemoryCache,
    streams: StreamHolder<'a>,
    encryption: Option<Arc<EncryptionService>>,
}

struct StreamHolder<'a> {
    data_pool: &'a StreamPool,
    log_pool: &'a StreamPool,
    data_stream: Option<StreamGuard<'a>>,
    log_stream: Option<StreamGuard<'a>>,
}

impl StreamHolder<'_> {
    fn get_stream(&mut self, origin: FileOrigin) -> Result<&mut dyn FileStream> {
        fn inner<'a, 'b>(
            pool: &'b StreamPool,
            cell: &'a mut Option<StreamGuard<'b>>,
        ) -> Result<&'a mut dyn FileStream> {
            if cell.is_none() {
                *cell = Some(pool.rent()?);
            }
            Ok(&mut **cell.as_mut().unwrap())
        }

        match origin {
            FileOrigin::Data => inner(self.data_pool, &mut self.data_stream),
            FileOrigin::Log => inner(self.log_pool, &mut self.log_stream),
        }
    }
}

impl<'a> DiskReader<'a> {
    pub fn new(
        cache: &'a MemoryCache,
        data_pool: &'a StreamPool,
        log_pool: &'a StreamPool,
        encryption: Option<Arc<EncryptionService>>,
    ) -> Self {
        DiskReader {
            cache,
            streams: StreamHolder {
                data_pool,
                log_pool,
                data_stream: None,
                log_stream: None,
            },
            encryption,
        }
    }

    #[allow(dead_code)]
    pub fn read_page(&mut self, position: u64, origin: FileOrigin) -> Result<Rc<PageBuffer>> {
        let encryption = self.encryption.as_deref();
        let stream = self.streams.get_stream(origin)?;
        self.cache
            .get_readable_page(position, origin, |pos, buf| Self::read_stream(stream, pos, buf, encryption))
    }

    pub fn read_writable_page(
        &mut self,
        position: u64,
        origin: FileOrigin,
    ) -> Result<Box<PageBuffer>> {
        let encryption = self.encryption.as_deref();
        let stream = self.streams.get_stream(origin)?;
        self.cache
            .get_writable_page(position, origin, |pos, buf| Self::read_stream(stream, pos, buf, encryption))
    }

    pub fn new_page(&mut self) -> Box<PageBuffer> {
        self.cache.new_page()
    }

    fn read_stream(
        stream: &mut dyn FileStream,
        position: u64,
        buf: &mut crate::engine::PageBufferArray,
        encryption: Option<&EncryptionService>,
    ) -> Result<()> {
        stream.seek(SeekFrom::Start(position))?;
        std::io::Read::read_exact(stream, buf)?;
        crate::engine::crypto::maybe_decrypt(buf, encryption)?;
        Ok(())
    }
}
