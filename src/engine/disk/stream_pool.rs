use crate::Result;
use crate::engine::{FileStream, StreamFactory};
use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};

/// A small pool of read-only streams plus the single writable stream for
/// one file (data area or log area). Readers are rented out of a slab and
/// returned on drop; the writable stream is lazily opened once and shared
/// behind a mutex (§5: only one writer is ever active at a time).
pub(crate) struct StreamPool {
    readers: Mutex<Vec<Box<dyn FileStream>>>,
    writable: Mutex<Option<Box<dyn FileStream>>>,
    factory: Box<dyn StreamFactory>,
}

pub(crate) struct StreamGuard<'a> {
    pool: &'a StreamPool,
    stream: Option<Box<dyn FileStream>>,
}

impl Deref for StreamGuard<'_> {
    type Target = dyn FileStream;

    fn deref(&self) -> &Self::Target {
        self.stream.as_deref().unwrap()
    }
}

impl DerefMut for StreamGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.stream.as_deref_mut().unwrap()
    }
}

impl Drop for StreamGuard<'_> {
    fn drop(&mut self) {
        if let Some(stream) = self.stream.take() {
            self.pool.readers.lock().push(stream);
        }
    }
}

pub(crate) struct WriteableScope<'a> {
    inner: parking_lot::MutexGuard<'a, Option<Box<dyn FileStream>>>,
}

impl Deref for WriteableScope<'_> {
    type Target = dyn FileStream;

    fn deref(&self) -> &Self::Target {
        self.inner.as_deref().unwrap()
    }
}

impl DerefMut for WriteableScope<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner.as_deref_mut().unwrap()
    }
}

impl StreamPool {
    pub(crate) fn new(factory: Box<dyn StreamFactory>) -> Self {
        Self {
            readers: Mutex::new(Vec::new()),
            writable: Mutex::new(None),
            factory,
        }
    }

    pub fn rent(&self) -> Result<StreamGuard> {
        let stream = match self.readers.lock().pop() {
            Some(stream) => stream,
            None => self.factory.get_stream(false)?,
        };

        Ok(StreamGuard {
            pool: self,
            stream: Some(stream),
        })
    }

    pub fn factory(&self) -> &dyn StreamFactory {
        self.factory.as_ref()
    }

    pub fn writeable(&self) -> Result<WriteableScope> {
        let mut guard = self.writable.lock();
        if guard.is_none() {
            *guard = Some(self.factory.get_stream(true)?);
        }
        Ok(WriteableScope { inner: guard })
    }

    pub fn writeable_mut(&mut self) -> Result<&mut dyn FileStream> {
        if self.writable.get_mut().is_none() {
            *self.writable.get_mut() = Some(self.factory.get_stream(true)?);
        }
        Ok(self.writable.get_mut().as_deref_mut().unwrap())
    }
}
