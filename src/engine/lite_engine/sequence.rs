// implements operations defined in Sequence.cs

use super::*;
use crate::engine::index_service::IndexService;
use crate::engine::lite_engine::insert::BsonAutoId;
use crate::engine::snapshot::Snapshot;
use crate::utils::CaseInsensitiveString;
use std::cmp::max;
use std::collections::hash_map::Entry;

impl LiteEngine {
    pub(super) fn get_sequence(
        sequences: &Mutex<HashMap<CaseInsensitiveString, i64>>,
        collection: &str,
        snapshot: &mut Snapshot,
        collation: Collation,
        max_items_count: u32,
        auto_id: BsonAutoId,
    ) -> Result<bson::Value> {
        let mut sequences = sequences.lock();

        let next = match sequences.entry(CaseInsensitiveString(collection.into())) {
            Entry::Occupied(mut entry) => {
                let id = *entry.get() + 1;
                entry.insert(id);
                id
            }
            Entry::Vacant(entry) => {
                let last_id = Self::get_last_id(snapshot, collation, max_items_count)?;

                let new_id = if matches!(last_id, bson::Value::MinValue) {
                    1
                } else {
                    let last_id = last_id
                        .to_i64()
                        .ok_or_else(|| Error::bad_auto_id(auto_id, collection, last_id))?;
                    last_id.wrapping_add(1)
                };

                *entry.insert(new_id)
            }
        };

        match auto_id {
            BsonAutoId::Int32 => Ok(bson::Value::Int32((next & 0xFFFFFFFF) as u32 as i32)),
            _ => Ok(bson::Value::Int64(next)),
        }
    }

    pub(super) fn set_sequence(
        sequences: &Mutex<HashMap<CaseInsensitiveString, i64>>,
        collection: &str,
        snapshot: &mut Snapshot,
        collation: Collation,
        max_items_count: u32,
        new_id: i64,
    ) -> Result<()> {
        match sequences
            .lock()
            .entry(CaseInsensitiveString(collection.into()))
        {
            Entry::Vacant(entry) => {
                let last_id = Self::get_last_id(snapshot, collation, max_items_count)?;

                entry.insert(if let Some(last_id) = last_id.to_i64() {
                    max(last_id, new_id)
                } else {
                    new_id
                });
            }
            Entry::Occupied(mut entry) => {
                entry.insert(max(*entry.get(), new_id));
            }
        };
        Ok(())
    }

    fn get_last_id(
        snapshot: &mut Snapshot,
        collation: Collation,
        max_items_count: u32,
    ) -> Result<bson::Value> {
        let pk = snapshot.collection_page().expect("collection must exist").pk_index();
        let (head, tail) = (pk.head(), pk.tail());

        let mut indexer = IndexService::new(snapshot, collation, max_items_count);
        let tail_node = indexer.get_node(tail)?;
        let prev = tail_node.get_prev(0);

        if prev == head {
            Ok(bson::Value::MinValue)
        } else {
            let last_node = indexer.get_node(prev)?;
            Ok(last_node.key().clone())
        }
    }
}
