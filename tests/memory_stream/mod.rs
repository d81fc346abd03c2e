use docbase_engine::engine::FileStream;
use std::cmp::max;
use std::io;
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::{Arc, Mutex};

pub(crate) struct MemoryStream {
    buffer: Arc<Mutex<Vec<u8>>>,
    position: usize,
}

pub(crate) struct MemoryStreamFactory {
    buffer: Mutex<Option<Arc<Mutex<Vec<u8>>>>>,
}

impl MemoryStreamFactory {
    pub fn with_data(buffer: Arc<Mutex<Vec<u8>>>) -> Self {
        Self { buffer: Mutex::new(Some(buffer)) }
    }

    pub fn absent() -> Self {
        Self { buffer: Mutex::new(None) }
    }
}

impl docbase_engine::engine::StreamFactory for MemoryStreamFactory {
    fn get_stream(&self, writable: bool) -> docbase_engine::Result<Box<dyn FileStream>> {
        let mut buffer = self.buffer.lock().unwrap();
        if !writable && buffer.is_none() {
            return Err(io::Error::from(io::ErrorKind::NotFound).into());
        }
        let buffer = buffer.get_or_insert_with(|| Arc::new(Mutex::new(Vec::new()))).clone();

        Ok(Box::new(MemoryStream { buffer, position: 0 }) as Box<dyn FileStream>)
    }

    fn exists(&self) -> bool {
        self.buffer.lock().unwrap().is_some()
    }

    fn len(&self) -> docbase_engine::Result<u64> {
        Ok(self.buffer.lock().unwrap().as_ref().map(|x| x.lock().unwrap().len() as u64).unwrap_or(0))
    }

    fn delete(&self) -> docbase_engine::Result<()> {
        *self.buffer.lock().unwrap() = None;
        Ok(())
    }
}

impl FileStream for MemoryStream {
    fn set_len(&mut self, len: u64) -> docbase_engine::Result<()> {
        self.buffer.lock().unwrap().resize(len as usize, 0);
        Ok(())
    }

    fn sync_data(&mut self) -> docbase_engine::Result<()> {
        Ok(())
    }
}

impl Read for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let buffer = self.buffer.lock().unwrap();
        let (_, mut to_read) = buffer.split_at(self.position);
        let read = to_read.read(buf)?;
        self.position += read;
        Ok(read)
    }
}

impl Write for MemoryStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut buffer = self.buffer.lock().unwrap();
        let write_end = self.position.checked_add(buf.len()).ok_or(io::ErrorKind::InvalidInput)?;
        let new_len = max(write_end, buffer.len());
        buffer.resize(new_len, 0u8);
        buffer[self.position..][..buf.len()].copy_from_slice(buf);
        self.position += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemoryStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match pos {
            SeekFrom::Start(p) => {
                self.position = p.try_into().map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
                Ok(p)
            }
            SeekFrom::End(d) => {
                let base = self.buffer.lock().unwrap().len();
                let d: isize = d.try_into().map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
                self.position = base.checked_add_signed(d).ok_or(io::ErrorKind::InvalidInput)?;
                Ok(self.position as u64)
            }
            SeekFrom::Current(d) => {
                let base = self.position;
                let d: isize = d.try_into().map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
                self.position = base.checked_add_signed(d).ok_or(io::ErrorKind::InvalidInput)?;
                Ok(self.position as u64)
            }
        }
    }
}
