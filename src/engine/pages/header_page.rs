use crate::bson;
use crate::engine::buffer_reader::BufferReader;
use crate::engine::buffer_writer::BufferWriter;
use crate::engine::engine_pragmas::EnginePragmas;
use crate::engine::pages::PageType;
use crate::engine::pages::base_page::BasePage;
use crate::engine::{DirtyFlag, PageBuffer};
use crate::{Error, Result};
use std::ops::{Deref, DerefMut};
use std::sync::Mutex as StdMutex;
use std::sync::atomic::Ordering::Relaxed;
use std::sync::atomic::{AtomicU32, AtomicU64};
use std::sync::Arc;

const HEADER_INFO: &[u8] = b"** This is a LiteDB file **";
const FILE_VERSION: u8 = 8;

const P_HEADER_INFO: usize = 32; // 32-58 (27 bytes)
const P_FILE_VERSION: usize = 59; // 59-59 (1 byte)
const P_FREE_EMPTY_PAGE_ID: usize = 60; // 60-63 (4 bytes)
const P_LAST_PAGE_ID: usize = 64; // 64-67 (4 bytes)
const P_CREATION_TIME: usize = 68; // 68-75 (8 bytes)

//const P_PRAGMAS: usize = 76; // 76-108 (pragma fields end at byte 108)
const P_IS_ENCRYPTED: usize = 109; // 109-109 (1 byte)
const P_ENCRYPTION_SALT: usize = 110; // 110-125 (16 bytes)
const P_INVALID_DATAFILE_STATE: usize = 191; // 191-191 (1 byte)

const P_COLLECTIONS: usize = 192; // 192-8159 (8064 bytes)
const COLLECTIONS_SIZE: usize = 8000; // 250 blocks with 32 bytes each

/// The single header page of a data file. Access to it is serialized by
/// `LockService`'s exclusive/collection locks rather than an internal
/// mutex: there is never more than one writer in flight on a thread at a
/// time (§5).
pub(crate) struct HeaderPage {
    base: BasePage,
    creation_time: AtomicU64,
    pragmas: Arc<EnginePragmas>,
    // RustChange: we use mutex for safety, upstream may have concurrent issue
    collections: StdMutex<bson::Document>,
    last_page_id: AtomicU32,
    free_empty_page_list: AtomicU32,
    encrypted: bool,
    encryption_salt: [u8; crate::engine::crypto::SALT_SIZE],

    collections_changed: DirtyFlag,
}

impl HeaderPage {
    pub const P_INVALID_DATAFILE_STATE: usize = P_INVALID_DATAFILE_STATE;

    pub(crate) fn new(buffer: Box<PageBuffer>, collation: crate::utils::Collation) -> Self {
        let mut header = HeaderPage {
            base: BasePage::new(buffer, 0, PageType::Header),

            creation_time: bson::DateTime::now().ticks().into(),
            free_empty_page_list: 0.into(),
            last_page_id: 0.into(),
            pragmas: Arc::new(EnginePragmas { collation, ..EnginePragmas::default() }),
            collections: StdMutex::new(bson::Document::new()),
            encrypted: false,
            encryption_salt: [0; crate::engine::crypto::SALT_SIZE],

            collections_changed: DirtyFlag::new(),
        };

        let buffer = header.base.buffer_mut();
        buffer.write_bytes(P_HEADER_INFO, HEADER_INFO);
        buffer.write_byte(P_FILE_VERSION, FILE_VERSION);
        buffer.write_date_time(
            P_CREATION_TIME,
            bson::DateTime::from_ticks(header.creation_time.load(Relaxed)).unwrap(),
        );

        header
    }

    pub fn load(buffer: Box<PageBuffer>) -> Result<Self> {
        let mut header = HeaderPage {
            base: BasePage::load(buffer)?,

            creation_time: bson::DateTime::now().ticks().into(),
            free_empty_page_list: 0.into(),
            last_page_id: 0.into(),
            pragmas: Arc::new(EnginePragmas::default()),
            collections: StdMutex::new(bson::Document::new()),
            encrypted: false,
            encryption_salt: [0; crate::engine::crypto::SALT_SIZE],

            collections_changed: DirtyFlag::new(),
        };

        header.load_header_page()?;

        Ok(header)
    }

    // instead of recreating, reload header page
    pub fn reload_fully(&mut self) -> Result<()> {
        self.base.reload_fully()?;
        self.load_header_page()?;
        Ok(())
    }

    fn load_header_page(&mut self) -> Result<()> {
        let buffer = self.base.buffer();
        let info = buffer.read_bytes(P_HEADER_INFO, HEADER_INFO.len());
        let version = buffer.read_byte(P_FILE_VERSION);

        if info != HEADER_INFO || version != FILE_VERSION {
            return Err(Error::invalid_database());
        }

        self.creation_time
            .store(buffer.read_date_time(P_CREATION_TIME)?.ticks(), Relaxed);

        self.free_empty_page_list
            .store(buffer.read_u32(P_FREE_EMPTY_PAGE_ID), Relaxed);
        self.last_page_id
            .store(buffer.read_u32(P_LAST_PAGE_ID), Relaxed);

        self.pragmas.read(buffer)?;

        self.encrypted = buffer.read_bool(P_IS_ENCRYPTED);
        self.encryption_salt
            .copy_from_slice(buffer.read_bytes(P_ENCRYPTION_SALT, self.encryption_salt.len()));

        let area = buffer.slice(P_COLLECTIONS, COLLECTIONS_SIZE);
        *self.collections.lock().unwrap() = BufferReader::single(area).read_document()?;

        Ok(())
    }
}

impl HeaderPage {
    pub fn update_buffer(&mut self) -> &PageBuffer {
        self.update_buffer_impl();
        self.base.buffer()
    }

    fn update_buffer_impl(&mut self) {
        let free_empty_page_list = self.free_empty_page_list.load(Relaxed);
        let last_page_id = self.last_page_id.load(Relaxed);
        let pragmas = self.pragmas.clone();
        let changed = self.collections_changed.is_set();

        let buffer = self.base.buffer_mut();
        buffer.write_u32(P_FREE_EMPTY_PAGE_ID, free_empty_page_list);
        buffer.write_u32(P_LAST_PAGE_ID, last_page_id);
        pragmas.update_buffer(buffer);

        buffer.write_bool(P_IS_ENCRYPTED, self.encrypted);
        buffer.write_bytes(P_ENCRYPTION_SALT, &self.encryption_salt);

        if changed {
            let area = buffer.slice_mut(P_COLLECTIONS, COLLECTIONS_SIZE);

            let mut writer = BufferWriter::single(area);
            writer.write_document(&self.collections.lock().unwrap());

            self.collections_changed.reset()
        }

        self.base.update_buffer();
    }
}

impl HeaderPage {
    pub fn pragmas(&self) -> &Arc<EnginePragmas> {
        &self.pragmas
    }

    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    pub fn encryption_salt(&self) -> [u8; crate::engine::crypto::SALT_SIZE] {
        self.encryption_salt
    }

    /// Stamps the file as encrypted with `salt`. Only meaningful on a
    /// freshly created file: `COLLATION`-like, this cannot change without
    /// a `rebuild`.
    pub fn set_encryption(&mut self, salt: [u8; crate::engine::crypto::SALT_SIZE]) {
        self.encrypted = true;
        self.encryption_salt = salt;
    }

    pub fn free_empty_page_list(&self) -> u32 {
        self.free_empty_page_list.load(Relaxed)
    }

    pub fn last_page_id(&self) -> u32 {
        self.last_page_id.load(Relaxed)
    }

    pub fn set_free_empty_page_list(&mut self, page_id: u32) {
        self.free_empty_page_list.store(page_id, Relaxed);
    }

    pub fn set_last_page_id(&mut self, page_id: u32) {
        self.last_page_id.store(page_id, Relaxed);
    }

    pub fn get_collection_page_id(&self, collection: &str) -> u32 {
        (self.collections.lock().unwrap())
            .try_get(collection)
            .map(|x| x.as_i32().unwrap() as u32)
            .unwrap_or(u32::MAX)
    }

    pub fn collection_names(&self) -> Vec<String> {
        (self.collections.lock().unwrap())
            .iter()
            .map(|x| x.0.to_string())
            .collect()
    }

    pub fn get_available_collection_space(&self) -> usize {
        COLLECTIONS_SIZE - self.collections.lock().unwrap().get_serialized_value_len()
            - 1 // for int32 type (0x10)
            - 1 // for new CString ('\0')
            - 4 // for PageID (int32)
            - 8 // reserved
    }

    pub fn insert_collection(&mut self, collection: &str, page_id: u32) {
        self.collections
            .lock()
            .unwrap()
            .insert(collection.to_string(), page_id as i32);
        self.collections_changed.set();
    }

    pub fn delete_collection(&mut self, collection: &str) {
        self.collections.lock().unwrap().remove(collection);
        self.collections_changed.set();
    }

    pub fn rename_collection(&mut self, old_name: &str, new_name: &str) {
        let mut collections = self.collections.lock().unwrap();
        let page_id = collections.remove(old_name).unwrap();
        collections.insert(new_name.to_string(), page_id);
        self.collections_changed.set();
    }

    /// Snapshots the header's serialized form; callers restore it with
    /// [`HeaderPage::restore`] if a speculative page allocation needs to be
    /// rolled back (e.g. `return_new_pages`).
    pub fn save_point(&mut self) -> Box<PageBuffer> {
        self.update_buffer_impl();

        let mut save_point = Box::new(PageBuffer::new(0));
        *save_point.buffer_mut() = *self.base.buffer().buffer();
        save_point
    }

    pub fn restore(&mut self, save_point: &PageBuffer) -> Result<()> {
        *self.base.buffer_mut().buffer_mut() = *save_point.buffer();
        self.load_header_page()
    }
}

impl Deref for HeaderPage {
    type Target = BasePage;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

impl DerefMut for HeaderPage {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.base
    }
}

impl AsMut<BasePage> for HeaderPage {
    fn as_mut(&mut self) -> &mut BasePage {
        &mut self.base
    }
}
