mod disk_reader;
mod disk_service;
mod memory_cache;
mod stream_pool;

pub(crate) use disk_reader::DiskReader;
pub(crate) use disk_service::DiskService;
pub(crate) use stream_pool::{StreamGuard, StreamPool};
