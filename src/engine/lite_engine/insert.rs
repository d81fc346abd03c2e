// implements operations defined in Insert.cs

use super::*;
use crate::engine::data_service::DataService;
use crate::engine::index_service::IndexService;
use crate::engine::key_selector::get_index_keys;
use crate::engine::snapshot::Snapshot;
use std::fmt;

#[derive(Debug, Copy, Clone)]
pub enum BsonAutoId {
    #[cfg(feature = "sequential-index")]
    Int32 = 2,
    #[cfg(feature = "sequential-index")]
    Int64 = 3,
    ObjectId = 10,
    Guid = 11,
}

impl fmt::Display for BsonAutoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "sequential-index")]
            BsonAutoId::Int32 => write!(f, "Int32"),
            #[cfg(feature = "sequential-index")]
            BsonAutoId::Int64 => write!(f, "Int64"),
            BsonAutoId::ObjectId => write!(f, "ObjectId"),
            BsonAutoId::Guid => write!(f, "Guid"),
        }
    }
}

impl LiteEngine {
    pub fn insert(
        &self,
        collection: &str,
        docs: Vec<bson::Document>,
        auto_id: BsonAutoId,
    ) -> Result<usize> {
        self.auto_transaction(false, |transaction| {
            let snapshot = transaction.create_snapshot(LockMode::Write, collection, true)?;
            let collation = snapshot.header().borrow().pragmas().collation();
            let max_items_count = snapshot.disk().max_items_count();

            debug_log!(COMMAND: "insert `{collection}`");

            let mut count = 0;
            for doc in docs {
                Self::insert_document(
                    snapshot,
                    collation,
                    max_items_count,
                    #[cfg(feature = "sequential-index")]
                    &self.sequences,
                    #[cfg(feature = "sequential-index")]
                    collection,
                    doc,
                    auto_id,
                )?;
                count += 1;
            }

            transaction.safe_point()?;

            Ok(count)
        })
    }

    /// Inserts `doc` into every index the collection defines, assigning an
    /// `_id` via `auto_id` when the document doesn't carry one, and chaining
    /// every index entry produced for this document from its primary-key
    /// node (see `IndexService::link_chain`).
    pub(super) fn insert_document(
        snapshot: &mut Snapshot,
        collation: Collation,
        max_items_count: u32,
        #[cfg(feature = "sequential-index")] sequences: &Mutex<HashMap<CaseInsensitiveString, i64>>,
        #[cfg(feature = "sequential-index")] collection: &str,
        mut doc: bson::Document,
        auto_id: BsonAutoId,
    ) -> Result<()> {
        let id = if let Some(id) = doc.try_get("_id") {
            let id = id.clone();
            #[cfg(feature = "sequential-index")]
            if let Some(int_id) = id.to_i64() {
                Self::set_sequence(sequences, collection, snapshot, collation, max_items_count, int_id)?;
            }
            id
        } else {
            let id = match auto_id {
                BsonAutoId::ObjectId => bson::Value::ObjectId(bson::ObjectId::new()),
                BsonAutoId::Guid => bson::Value::Guid(bson::Guid::new()),
                #[cfg(feature = "sequential-index")]
                _ => Self::get_sequence(sequences, collection, snapshot, collation, max_items_count, auto_id)?,
            };
            doc.insert("_id".into(), id.clone());
            id
        };

        if matches!(
            id,
            bson::Value::Null | bson::Value::MinValue | bson::Value::MaxValue
        ) {
            return Err(Error::invalid_data_type("_id", &id));
        }

        let data_block = DataService::new(snapshot, max_items_count).insert(&doc)?;
        let doc_value = bson::Value::Document(doc);

        let index_specs = snapshot
            .collection_page()
            .expect("collection must exist")
            .get_collection_indexes()
            .map(|index| {
                (
                    index.name().to_string(),
                    index.key_selector(),
                    index.unique(),
                    index.slot(),
                    index.head(),
                )
            })
            .collect::<Vec<_>>();

        let mut last: Option<PageAddress> = None;

        for (name, selector, unique, slot, head) in index_specs {
            for key in get_index_keys(&selector, &doc_value) {
                let key = key.clone();

                let free_index_page_list = snapshot
                    .collection_page()
                    .and_then(|c| c.get_collection_index(&name))
                    .expect("index must exist")
                    .free_index_page_list();

                let mut indexer = IndexService::new(snapshot, collation, max_items_count);
                let (position, free_index_page_list) =
                    indexer.add_node(&name, slot, head, free_index_page_list, unique, key, data_block)?;

                if let Some(prev) = last {
                    indexer.link_chain(prev, position)?;
                }
                last = Some(position);

                snapshot
                    .collection_page_mut()
                    .and_then(|c| c.get_collection_index_mut(&name))
                    .expect("index must exist")
                    .set_free_index_page_list(free_index_page_list);
            }
        }

        Ok(())
    }
}
