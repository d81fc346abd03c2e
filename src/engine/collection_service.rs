use crate::engine::CollectionPage;
use crate::engine::index_service::IndexService;
use crate::engine::pages::HeaderPage;
use crate::engine::snapshot::Snapshot;
use crate::utils::StrExtension;
use crate::{Error, Result};

pub(crate) struct CollectionService<'snapshot> {
    snapshot: &'snapshot mut Snapshot,
}

impl<'snapshot> CollectionService<'snapshot> {
    pub fn new(snapshot: &'snapshot mut Snapshot) -> Self {
        Self { snapshot }
    }

    pub fn check_name(name: &str, header: &HeaderPage) -> Result<()> {
        if name.len() > header.get_available_collection_space() {
            return Err(Error::name_length_header_space(name));
        }
        if !name.is_word() {
            return Err(Error::invalid_collection_name(name));
        }
        if name.starts_with("$") {
            return Err(Error::invalid_collection_name(name));
        }

        Ok(())
    }

    pub fn get(
        &mut self,
        name: &str,
        add_if_not_exists: bool,
    ) -> Result<(bool, Option<&mut CollectionPage>)> {
        let page_id = self.snapshot.header().borrow().get_collection_page_id(name);

        if page_id != u32::MAX {
            let page = self.snapshot.get_page::<CollectionPage>(page_id, false)?;
            Ok((false, Some(page)))
        } else if add_if_not_exists {
            Ok((true, Some(self.add(name)?)))
        } else {
            Ok((false, None))
        }
    }

    /// Creates a new, empty collection: a fresh `CollectionPage`, its `_id`
    /// entry in the catalog's index list, and the skip list backing it.
    pub fn add(&mut self, name: &str) -> Result<&mut CollectionPage> {
        Self::check_name(name, &self.snapshot.header().borrow())?;

        let page = self.snapshot.new_page::<CollectionPage>()?;
        let page_id = page.page_id();

        self.snapshot.trans_pages().borrow_mut().on_commit({
            let name = name.to_string();
            move |h| h.insert_collection(&name, page_id)
        });

        let collation = self.snapshot.header().borrow().pragmas().collation();
        let max_items_count = self.snapshot.disk().max_items_count();

        let collection_page = self.snapshot.get_page::<CollectionPage>(page_id, false)?;
        collection_page.insert_collection_index("_id", "$._id", true)?;
        let slot = collection_page
            .get_collection_index("_id")
            .expect("just inserted")
            .slot();

        let mut indexer = IndexService::new(self.snapshot, collation, max_items_count);
        let (head, tail, free_index_page_list) = indexer.create_index(slot)?;

        let collection_page = self.snapshot.get_page::<CollectionPage>(page_id, false)?;
        let id_index = collection_page
            .get_collection_index_mut("_id")
            .expect("just inserted");
        id_index.set_head(head);
        id_index.set_tail(tail);
        id_index.set_free_index_page_list(free_index_page_list);

        self.snapshot.get_page::<CollectionPage>(page_id, false)
    }
}
