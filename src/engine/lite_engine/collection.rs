// implements operations defined in Collection.cs

use super::*;
use crate::engine::data_service::DataService;
use crate::engine::index_service::IndexService;
use crate::utils::Order;

impl LiteEngine {
    pub fn get_collection_names(&self) -> Vec<String> {
        self.header.borrow().collection_names()
    }

    /// Deletes every document and every index (including the primary key)
    /// belonging to `name`, then removes it from the header catalog.
    ///
    /// The collection page itself is not reclaimed: `Snapshot`'s page
    /// allocator only frees Data/Index pages, not Collection pages, so the
    /// now-orphaned page stays allocated until the file is rebuilt.
    pub fn drop_collection(&self, name: &str) -> Result<bool> {
        self.auto_transaction(false, |transaction| {
            let snapshot = transaction.create_snapshot(LockMode::Write, name, false)?;
            if snapshot.collection_page().is_none() {
                return Ok(false);
            }

            let collation = snapshot.header().borrow().pragmas().collation();
            let max_items_count = snapshot.disk().max_items_count();

            debug_log!(COMMAND: "drop collection `{name}`");

            let pk = snapshot.collection_page().expect("collection must exist").pk_index();
            let (pk_head, pk_tail) = (pk.head(), pk.tail());

            let data_blocks = IndexService::new(snapshot, collation, max_items_count)
                .find_all(pk_head, pk_tail, Order::Ascending)?
                .into_iter()
                .map(|node| node.data_block())
                .collect::<Vec<_>>();

            for data_block in data_blocks {
                DataService::new(snapshot, max_items_count).delete(data_block)?;
            }

            let index_specs = snapshot
                .collection_page()
                .expect("collection must exist")
                .get_collection_indexes()
                .map(|index| (index.head(), index.tail(), index.free_index_page_list()))
                .collect::<Vec<_>>();

            for (head, tail, free_index_page_list) in index_specs {
                IndexService::new(snapshot, collation, max_items_count)
                    .drop_index(head, tail, free_index_page_list)?;
            }

            let name = name.to_string();
            snapshot.trans_pages().borrow_mut().on_commit(move |header| {
                header.delete_collection(&name);
            });

            Ok(true)
        })
    }
}
