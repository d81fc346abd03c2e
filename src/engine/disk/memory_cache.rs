use crate::engine::*;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::rc::Rc;
// Difference between original MemoryCache.cs
// - Reference counter is with Rc instead of ShareCounter
// - Writable page is represented as Box<PageBuffer>

pub(crate) struct MemoryCache {
    readable: Mutex<HashMap<PositionOrigin, Rc<PageBuffer>>>,
    free_page_cache: FreePageCache,
}

impl MemoryCache {
    pub fn new() -> Self {
        MemoryCache {
            readable: Mutex::new(HashMap::new()),
            free_page_cache: FreePageCache::new(),
        }
    }

    pub fn get_readable_page(
        &self,
        position: u64,
        origin: FileOrigin,
        factory: impl FnOnce(u64, &mut PageBufferArray) -> Result<()>,
    ) -> Result<Rc<PageBuffer>> {
        let key = PositionOrigin::new(position, origin);
        if let Some(existing) = self.readable.lock().get(&key) {
            existing.update_time();
            return Ok(existing.clone());
        }

        // we ensured the page is not read by other thread(s) so read and write
        let mut page = self.free_page_cache.get_free_page();

        let as_mut = Rc::get_mut(&mut page).unwrap();
        as_mut.set_position_origin(position, origin);
        factory(position, as_mut.buffer_mut())?;

        self.readable.lock().insert(key, page.clone());

        page.update_time();
        Ok(page)
    }

    pub fn get_writable_page(
        &self,
        position: u64,
        origin: FileOrigin,
        factory: impl FnOnce(u64, &mut PageBufferArray) -> Result<()>,
    ) -> Result<Box<PageBuffer>> {
        let key = PositionOrigin::new(position, origin);
        let mut new_page = self.free_page_cache.new_page(position, origin);

        if let Some(readable) = self.readable.lock().get(&key) {
            *new_page.buffer_mut() = *readable.buffer();
        } else {
            factory(position, new_page.as_mut().buffer_mut())?;
        }

        Ok(new_page)
    }

    pub fn new_page(&self) -> Box<PageBuffer> {
        self.free_page_cache
            .new_page(i64::MAX as u64, FileOrigin::Data)
    }

    pub fn try_move_to_readable(
        &self,
        page: Box<PageBuffer>,
    ) -> std::result::Result<Rc<PageBuffer>, Box<PageBuffer>> {
        debug_assert!(page.position() != u64::MAX);
        debug_assert!(page.origin().is_some());

        let key = PositionOrigin::new(page.position(), page.origin().unwrap());

        match self.readable.lock().entry(key) {
            Entry::Occupied(_) => {
                // there already is. failed to make readable
                Err(page)
            }
            Entry::Vacant(v) => Ok(v.insert(Rc::new(*page)).clone()),
        }
    }

    pub(crate) fn move_to_readable(&self, page: Box<PageBuffer>) -> Rc<PageBuffer> {
        debug_assert!(page.position() != u64::MAX);
        debug_assert!(page.origin().is_some());

        let origin = page.origin().unwrap();
        let key = PositionOrigin::new(page.position(), origin);

        match self.readable.lock().entry(key) {
            Entry::Occupied(mut o) => {
                debug_assert_eq!(o.get().origin(), Some(origin), "origin must be same");

                *Rc::get_mut(o.get_mut())
                    .expect("user must ensure this page is not in use when marked as read only")
                    .buffer_mut() = *page.buffer();

                o.get().clone()
            }
            Entry::Vacant(v) => v.insert(Rc::new(*page)).clone(),
        }
    }

    pub fn pages_in_use(&self) -> usize {
        self.readable
            .lock()
            .values()
            .map(|x| Rc::strong_count(x) - 1)
            .sum()
    }

    pub(crate) fn clear(&self) {
        assert_eq!(self.pages_in_use(), 0, "all pages must be released");
        self.readable.lock().clear();
    }
}

struct FreePageCache {}

impl FreePageCache {
    fn new() -> Self {
        FreePageCache {}
    }

    fn get_free_page(&self) -> Rc<PageBuffer> {
        // NO free page cache
        Rc::new(PageBuffer::new(0))
    }

    fn new_page(&self, position: u64, origin: FileOrigin) -> Box<PageBuffer> {
        let mut buffer = Box::new(PageBuffer::new(0));
        buffer.set_position_origin(position, origin);
        buffer
    }
}
