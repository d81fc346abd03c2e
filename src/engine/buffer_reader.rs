use crate::engine::page_address::PageAddress;
use crate::Result;
use crate::utils::BufferSlice;
use std::borrow::Cow;

/// Either a single page's worth of bytes, or several non-contiguous
/// fragments that should read back as one logical byte stream (a document
/// stored across a data block chain, §4.4).
enum ReaderSource<'a> {
    Single(&'a BufferSlice),
    Fragmented(Vec<&'a BufferSlice>),
}

impl ReaderSource<'_> {
    fn read_bytes(&self, position: usize, length: usize) -> Cow<[u8]> {
        match self {
            ReaderSource::Single(slice) => Cow::Borrowed(slice.read_bytes(position, length)),
            ReaderSource::Fragmented(parts) => {
                let mut out = Vec::with_capacity(length);
                let mut skip = position;
                let mut remaining = length;

                for part in parts {
                    if remaining == 0 {
                        break;
                    }

                    let part_len = part.len();
                    if skip >= part_len {
                        skip -= part_len;
                        continue;
                    }

                    let take = (part_len - skip).min(remaining);
                    out.extend_from_slice(part.read_bytes(skip, take));
                    remaining -= take;
                    skip = 0;
                }

                Cow::Owned(out)
            }
        }
    }
}

pub(crate) struct BufferReader<'a> {
    source: ReaderSource<'a>,
    position: usize,
}

impl<'a> BufferReader<'a> {
    pub fn single(slice: &'a BufferSlice) -> BufferReader<'a> {
        BufferReader { source: ReaderSource::Single(slice), position: 0 }
    }

    /// Builds a reader over several buffers read back to back, as if they
    /// were one contiguous slice.
    pub fn fragmented(parts: Vec<&'a BufferSlice>) -> BufferReader<'a> {
        BufferReader { source: ReaderSource::Fragmented(parts), position: 0 }
    }

    pub fn read_document(&mut self) -> Result<bson::Document> {
        let length = self.read_bytes(4);
        let length = i32::from_le_bytes(length.as_ref().try_into().unwrap()) as usize;
        let document_bin = self.source.read_bytes(self.position, length);
        self.position += length;
        let mut cursor = std::io::Cursor::new(document_bin.as_ref());
        Ok(bson::Document::parse_document(&mut cursor)?)
    }

    pub fn skip(&mut self, bytes: usize) {
        self.position += bytes;
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

impl BufferReader<'_> {
    fn read_bytes(&mut self, length: usize) -> Cow<[u8]> {
        let bytes = self.source.read_bytes(self.position, length);
        self.position += length;
        bytes
    }

    fn read<T, const S: usize>(&mut self, f: impl Fn([u8; S]) -> T) -> T {
        let array = self.read_bytes(S);
        f(array.as_ref().try_into().unwrap())
    }

    pub fn read_i32(&mut self) -> i32 {
        self.read(i32::from_le_bytes)
    }

    pub fn read_u32(&mut self) -> u32 {
        self.read(u32::from_le_bytes)
    }

    pub fn read_u16(&mut self) -> u16 {
        self.read(u16::from_le_bytes)
    }

    pub fn read_u8(&mut self) -> u8 {
        self.read(u8::from_le_bytes)
    }

    pub fn read_i8(&mut self) -> i8 {
        self.read(i8::from_le_bytes)
    }

    pub fn read_i64(&mut self) -> i64 {
        self.read(i64::from_le_bytes)
    }

    pub fn read_u64(&mut self) -> u64 {
        self.read(u64::from_le_bytes)
    }

    pub fn read_f64(&mut self) -> f64 {
        self.read(f64::from_le_bytes)
    }

    pub fn read_bool(&mut self) -> bool {
        self.read_u8() != 0
    }

    /// Reads a null-terminated string, returning `None` if its bytes are not
    /// valid UTF-8 (a corrupt page, never something a writer here produces).
    pub fn read_cstring(&mut self) -> Option<String> {
        let mut bytes = Vec::new();
        loop {
            let byte = self.read_u8();
            if byte == 0 {
                break;
            }
            bytes.push(byte);
        }
        String::from_utf8(bytes).ok()
    }

    pub fn read_page_address(&mut self) -> PageAddress {
        let page_id = self.read_u32();
        let slot = self.read_u8();
        PageAddress::new(page_id, slot)
    }
}
