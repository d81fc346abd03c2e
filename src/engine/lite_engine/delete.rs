// implements operations defined in Delete.cs

use super::*;
use crate::engine::data_service::DataService;
use crate::engine::index_service::IndexService;
use crate::engine::key_selector::get_index_keys;
use crate::engine::snapshot::Snapshot;
use crate::utils::Order;

impl LiteEngine {
    pub fn delete(&self, collection: &str, ids: &[bson::Value]) -> Result<usize> {
        self.auto_transaction(false, |transaction| {
            let snapshot = transaction.create_snapshot(LockMode::Write, collection, false)?;
            if snapshot.collection_page().is_none() {
                return Ok(0);
            }

            let collation = snapshot.header().borrow().pragmas().collation();
            let max_items_count = snapshot.disk().max_items_count();

            debug_log!(COMMAND: "delete `{collection}`");

            let mut count = 0;

            for id in ids {
                if Self::delete_document(snapshot, collation, max_items_count, id)? {
                    count += 1;
                }
            }

            Ok(count)
        })
    }

    /// Removes every index entry and data block belonging to the document
    /// whose `_id` is `id`. Returns whether the document existed.
    pub(super) fn delete_document(
        snapshot: &mut Snapshot,
        collation: Collation,
        max_items_count: u32,
        id: &bson::Value,
    ) -> Result<bool> {
        let pk = snapshot.collection_page().expect("collection must exist").pk_index();
        let (pk_head, pk_tail) = (pk.head(), pk.tail());

        let mut indexer = IndexService::new(snapshot, collation, max_items_count);
        let Some(pk_node) = indexer.find(pk_head, pk_tail, id, false, Order::Ascending)? else {
            return Ok(false);
        };
        let data_block = pk_node.data_block();

        let blocks = DataService::new(snapshot, max_items_count).read(data_block)?;
        let parts = blocks.iter().map(|x| x.buffer()).collect::<Vec<_>>();
        let old_doc = crate::engine::BufferReader::fragmented(parts).read_document()?;
        drop(blocks);
        let old_value = bson::Value::Document(old_doc);

        let index_specs = snapshot
            .collection_page()
            .expect("collection must exist")
            .get_collection_indexes()
            .map(|index| (index.name().to_string(), index.key_selector(), index.head(), index.tail()))
            .collect::<Vec<_>>();

        for (name, selector, head, tail) in index_specs {
            for key in get_index_keys(&selector, &old_value) {
                let mut free_index_page_list = snapshot
                    .collection_page()
                    .and_then(|c| c.get_collection_index(&name))
                    .expect("index must exist")
                    .free_index_page_list();

                let mut indexer = IndexService::new(snapshot, collation, max_items_count);
                if let Some(position) = indexer.find_exact(head, tail, key, data_block, Order::Ascending)? {
                    indexer.delete_node(position, &mut free_index_page_list)?;
                }

                snapshot
                    .collection_page_mut()
                    .and_then(|c| c.get_collection_index_mut(&name))
                    .expect("index must exist")
                    .set_free_index_page_list(free_index_page_list);
            }
        }

        DataService::new(snapshot, max_items_count).delete(data_block)?;

        Ok(true)
    }
}
