// implements operations defined in Update.cs

use super::*;
use crate::engine::data_service::DataService;
use crate::engine::index_service::IndexService;
use crate::engine::key_selector::get_index_keys;
use crate::engine::snapshot::Snapshot;
use crate::utils::Order;

impl LiteEngine {
    pub fn update(&self, collection: &str, docs: Vec<bson::Document>) -> Result<usize> {
        self.auto_transaction(false, |transaction| {
            let snapshot = transaction.create_snapshot(LockMode::Write, collection, false)?;
            if snapshot.collection_page().is_none() {
                return Ok(0);
            }

            let collation = snapshot.header().borrow().pragmas().collation();
            let max_items_count = snapshot.disk().max_items_count();

            debug_log!(COMMAND: "update `{collection}`");

            let mut count = 0;

            for doc in docs {
                if Self::update_document(snapshot, collation, max_items_count, doc)?.is_none() {
                    count += 1;
                }
            }

            transaction.safe_point()?;

            Ok(count)
        })
    }

    /// Overwrites the data block for `doc`'s `_id` and re-derives every
    /// non-pk index entry from the old and new document content (the old
    /// content has to be read before `DataService::update` overwrites it).
    /// Unlike the old/new key diff this replaces, every index entry is
    /// unconditionally dropped and re-added rather than reused when a key
    /// is unchanged -- see DESIGN.md. Returns `doc` back when no document
    /// with that `_id` exists (so `upsert` can fall through to insert),
    /// or `None` once the update has been applied.
    pub(super) fn update_document(
        snapshot: &mut Snapshot,
        collation: Collation,
        max_items_count: u32,
        doc: bson::Document,
    ) -> Result<Option<bson::Document>> {
        let id = doc
            .try_get("_id")
            .cloned()
            .unwrap_or(bson::Value::Null);

        if matches!(
            id,
            bson::Value::Null | bson::Value::MinValue | bson::Value::MaxValue
        ) {
            return Err(Error::invalid_data_type("_id", &id));
        }

        let pk = snapshot.collection_page().expect("collection must exist").pk_index();
        let (pk_head, pk_tail) = (pk.head(), pk.tail());

        let mut indexer = IndexService::new(snapshot, collation, max_items_count);
        let Some(pk_node) = indexer.find(pk_head, pk_tail, &id, false, Order::Ascending)? else {
            return Ok(Some(doc));
        };
        let data_block = pk_node.data_block();

        let blocks = DataService::new(snapshot, max_items_count).read(data_block)?;
        let parts = blocks.iter().map(|x| x.buffer()).collect::<Vec<_>>();
        let old_doc = crate::engine::BufferReader::fragmented(parts).read_document()?;
        drop(blocks);
        let old_value = bson::Value::Document(old_doc);

        DataService::new(snapshot, max_items_count).update(data_block, &doc)?;
        let new_value = bson::Value::Document(doc);

        let index_specs = snapshot
            .collection_page()
            .expect("collection must exist")
            .get_collection_indexes()
            .filter(|index| index.name() != "_id")
            .map(|index| {
                (
                    index.name().to_string(),
                    index.key_selector(),
                    index.unique(),
                    index.slot(),
                    index.head(),
                    index.tail(),
                )
            })
            .collect::<Vec<_>>();

        for (name, selector, unique, slot, head, tail) in index_specs {
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

            for key in get_index_keys(&selector, &new_value) {
                let key = key.clone();

                let free_index_page_list = snapshot
                    .collection_page()
                    .and_then(|c| c.get_collection_index(&name))
                    .expect("index must exist")
                    .free_index_page_list();

                let mut indexer = IndexService::new(snapshot, collation, max_items_count);
                let (_, free_index_page_list) =
                    indexer.add_node(&name, slot, head, free_index_page_list, unique, key, data_block)?;

                snapshot
                    .collection_page_mut()
                    .and_then(|c| c.get_collection_index_mut(&name))
                    .expect("index must exist")
                    .set_free_index_page_list(free_index_page_list);
            }
        }

        Ok(None)
    }
}
