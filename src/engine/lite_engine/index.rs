// implements operations defined in Index.cs

use super::*;
use crate::engine::data_service::DataService;
use crate::engine::index_service::IndexService;
use crate::engine::key_selector::{PathSelector, get_index_keys};
use crate::engine::snapshot::Snapshot;
use crate::engine::{BufferReader, INDEX_NAME_MAX_LENGTH};
use crate::utils::{Order, StrExtension};

impl LiteEngine {
    /// # Panics
    /// Panics if `name` is empty, starts with `$`, isn't a valid identifier,
    /// or is too long; or if `unique` is requested over a path that can
    /// yield more than one key per document.
    pub fn ensure_index(
        &self,
        collection: &str,
        name: &str,
        expression: &str,
        unique: bool,
    ) -> Result<bool> {
        assert!(
            !name.is_empty() && name.is_word() && !name.starts_with('$') && name.len() < INDEX_NAME_MAX_LENGTH,
            "invalid index name"
        );

        let selector = PathSelector::parse(expression);
        assert!(
            selector.is_scalar() || !unique,
            "scalar expression is needed for unique index"
        );

        if name == "_id" {
            return Ok(false); // always exists
        }

        self.auto_transaction(false, |transaction| {
            let snapshot = transaction.create_snapshot(LockMode::Write, collection, true)?;
            let collation = snapshot.header().borrow().pragmas().collation();
            let max_items_count = snapshot.disk().max_items_count();

            debug_log!(COMMAND: "ensure index `{name}` on `{collection}`");

            if let Some(current) = snapshot
                .collection_page()
                .and_then(|c| c.get_collection_index(name))
            {
                return if current.expression() != expression {
                    Err(Error::index_already_exists(name))
                } else {
                    Ok(false)
                };
            }

            let slot = snapshot
                .collection_page_mut()
                .expect("collection must exist")
                .insert_collection_index(name, expression, unique)?
                .slot();

            let (head, tail, free_index_page_list) =
                IndexService::new(snapshot, collation, max_items_count).create_index(slot)?;

            {
                let index = snapshot
                    .collection_page_mut()
                    .expect("collection must exist")
                    .get_collection_index_mut(name)
                    .expect("index just inserted");
                index.set_head(head);
                index.set_tail(tail);
                index.set_free_index_page_list(free_index_page_list);
            }

            Self::backfill_index(snapshot, collation, max_items_count, name, &selector, slot, head, unique)?;

            transaction.safe_point()?;

            Ok(true)
        })
    }

    /// Walks every existing document (via the pk index) and adds the
    /// matching entries to a freshly created index.
    fn backfill_index(
        snapshot: &mut Snapshot,
        collation: Collation,
        max_items_count: u32,
        name: &str,
        selector: &PathSelector,
        slot: u8,
        head: PageAddress,
        unique: bool,
    ) -> Result<()> {
        let pk = snapshot.collection_page().expect("collection must exist").pk_index();
        let (pk_head, pk_tail) = (pk.head(), pk.tail());

        let pk_nodes = IndexService::new(snapshot, collation, max_items_count)
            .find_all(pk_head, pk_tail, Order::Ascending)?;

        for pk_node in pk_nodes {
            let data_block = pk_node.data_block();

            let blocks = DataService::new(snapshot, max_items_count).read(data_block)?;
            let parts = blocks.iter().map(|x| x.buffer()).collect::<Vec<_>>();
            let doc = BufferReader::fragmented(parts).read_document()?;
            drop(blocks);
            let doc_value = bson::Value::Document(doc);

            for key in get_index_keys(selector, &doc_value) {
                let key = key.clone();

                let free_index_page_list = snapshot
                    .collection_page()
                    .and_then(|c| c.get_collection_index(name))
                    .expect("index must exist")
                    .free_index_page_list();

                let mut indexer = IndexService::new(snapshot, collation, max_items_count);
                let (_, free_index_page_list) =
                    indexer.add_node(name, slot, head, free_index_page_list, unique, key, data_block)?;

                snapshot
                    .collection_page_mut()
                    .and_then(|c| c.get_collection_index_mut(name))
                    .expect("index must exist")
                    .set_free_index_page_list(free_index_page_list);
            }
        }

        Ok(())
    }

    pub fn drop_index(&self, collection: &str, name: &str) -> Result<bool> {
        if name == "_id" {
            return Err(Error::drop_id_index());
        }

        self.auto_transaction(false, |transaction| {
            let snapshot = transaction.create_snapshot(LockMode::Write, collection, false)?;
            if snapshot.collection_page().is_none() {
                return Ok(false);
            }

            let collation = snapshot.header().borrow().pragmas().collation();
            let max_items_count = snapshot.disk().max_items_count();

            debug_log!(COMMAND: "drop index `{name}` on `{collection}`");

            let Some((head, tail, free_index_page_list)) = snapshot
                .collection_page()
                .and_then(|c| c.get_collection_index(name))
                .map(|i| (i.head(), i.tail(), i.free_index_page_list()))
            else {
                return Ok(false);
            };

            IndexService::new(snapshot, collation, max_items_count).drop_index(head, tail, free_index_page_list)?;

            snapshot
                .collection_page_mut()
                .expect("collection must exist")
                .delete_collection_index(name);

            Ok(true)
        })
    }
}
