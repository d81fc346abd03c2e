// implements operations defined in Upsert.cs

use super::*;
use crate::engine::lite_engine::insert::BsonAutoId;

impl LiteEngine {
    pub fn upsert(
        &self,
        collection: &str,
        docs: Vec<bson::Document>,
        auto_id: BsonAutoId,
    ) -> Result<usize> {
        self.auto_transaction(false, |transaction| {
            let snapshot = transaction.create_snapshot(LockMode::Write, collection, true)?;
            let collation = snapshot.header().borrow().pragmas().collation();
            let max_items_count = snapshot.disk().max_items_count();

            debug_log!(COMMAND: "upsert `{collection}`");

            let mut count = 0;

            for doc in docs {
                // first try to update (if `_id` is present and found), otherwise insert
                let has_id = !matches!(
                    doc.try_get("_id").cloned().unwrap_or(bson::Value::Null),
                    bson::Value::Null
                );

                let doc_to_insert = if has_id {
                    Self::update_document(snapshot, collation, max_items_count, doc)?
                } else {
                    Some(doc)
                };

                if let Some(doc) = doc_to_insert {
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
            }

            transaction.safe_point()?;

            // returns how many documents were inserted
            Ok(count)
        })
    }
}
