// implements operations defined in Query.cs

use super::*;
use crate::engine::BufferReader;
use crate::engine::data_service::DataService;
use crate::engine::index_node::IndexNode;
use crate::engine::index_service::IndexService;
use crate::utils::Order as InternalOrder;
use std::cmp::Ordering;

#[derive(Debug, Copy, Clone)]
pub enum Order {
    Ascending = 1,
    Descending = -1,
}

impl Order {
    fn to_internal(self) -> InternalOrder {
        match self {
            Order::Ascending => InternalOrder::Ascending,
            Order::Descending => InternalOrder::Descending,
        }
    }
}

fn is_edge(key: &bson::Value) -> bool {
    matches!(key, bson::Value::MinValue | bson::Value::MaxValue)
}

fn get_node_opt(indexer: &mut IndexService<'_>, address: PageAddress) -> Result<Option<IndexNode>> {
    if address.is_empty() {
        Ok(None)
    } else {
        Ok(Some(indexer.get_node(address)?))
    }
}

impl LiteEngine {
    /// Collects every document whose `index`'s key falls in
    /// `[min_inclusive, max_inclusive]`, walked in `order`. `MinValue`/
    /// `MaxValue` bounds mean "from the very start/end" (used by `get_all`).
    ///
    /// The skip-list walk and the document reads can't share a `Snapshot`
    /// borrow at once (`IndexService`/`DataService` each need it whole), so
    /// this collects every matching `data_block` address first, drops the
    /// `IndexService`, then reads the documents back.
    fn find_range_by_index(
        &self,
        collection: &str,
        index: &str,
        min_inclusive: &bson::Value,
        max_inclusive: &bson::Value,
        order: Order,
    ) -> Result<Vec<bson::Document>> {
        let collation = self.header.borrow().pragmas().collation();
        if max_inclusive.compare_to(min_inclusive, &collation).is_lt() {
            return Ok(Vec::new());
        }

        self.auto_transaction(true, |transaction| {
            let snapshot = transaction.create_snapshot(LockMode::Read, collection, false)?;
            if snapshot.collection_page().is_none() {
                return Ok(Vec::new());
            }

            let collation = snapshot.header().borrow().pragmas().collation();
            let max_items_count = snapshot.disk().max_items_count();

            let (head, tail) = {
                let idx = snapshot
                    .collection_page()
                    .and_then(|c| c.get_collection_index(index))
                    .ok_or_else(|| Error::no_index(index))?;
                (idx.head(), idx.tail())
            };

            let (start, end) = match order {
                Order::Ascending => (min_inclusive, max_inclusive),
                Order::Descending => (max_inclusive, min_inclusive),
            };
            let internal_order = order.to_internal();

            let mut data_blocks = Vec::new();

            {
                let mut indexer = IndexService::new(snapshot, collation, max_items_count);

                let first = match start {
                    bson::Value::MinValue => Some(indexer.get_node(head)?),
                    bson::Value::MaxValue => Some(indexer.get_node(tail)?),
                    start => indexer.find(head, tail, start, true, internal_order)?,
                };

                // rewind to the first node sharing `start`'s key, in case
                // `find` landed in the middle of a run of duplicates
                let first = if let Some(node) = first {
                    let mut cur = node;
                    loop {
                        let prev_address = cur.get_next_prev(0, internal_order.opposite());
                        let Some(prev) = get_node_opt(&mut indexer, prev_address)? else {
                            break;
                        };
                        if is_edge(prev.key()) || prev.key().compare_to(start, &collation) != Ordering::Equal {
                            break;
                        }
                        cur = prev;
                    }
                    Some(cur)
                } else {
                    None
                };

                let mut node = first;

                // every node equal to `start`
                while let Some(cur) = node {
                    if cur.key().compare_to(start, &collation) != Ordering::Equal {
                        break;
                    }

                    if !is_edge(cur.key()) {
                        data_blocks.push(cur.data_block());
                    }

                    let next_address = cur.get_next_prev(0, internal_order);
                    node = get_node_opt(&mut indexer, next_address)?;
                }

                // continue forward until past `end`
                while let Some(cur) = node {
                    let diff = cur.key().compare_to(end, &collation);
                    let past_end = match order {
                        Order::Ascending => diff.is_gt(),
                        Order::Descending => diff.is_lt(),
                    };

                    if is_edge(cur.key()) || past_end {
                        break;
                    }

                    data_blocks.push(cur.data_block());

                    let next_address = cur.get_next_prev(0, internal_order);
                    node = get_node_opt(&mut indexer, next_address)?;
                }
            }

            let mut results = Vec::with_capacity(data_blocks.len());
            for data_block in data_blocks {
                let blocks = DataService::new(snapshot, max_items_count).read(data_block)?;
                let parts = blocks.iter().map(|x| x.buffer()).collect::<Vec<_>>();
                results.push(BufferReader::fragmented(parts).read_document()?);
            }

            Ok(results)
        })
    }

    pub fn get_all(&self, collection: &str) -> Result<Vec<bson::Document>> {
        self.find_range_by_index(
            collection,
            "_id",
            &bson::Value::MinValue,
            &bson::Value::MaxValue,
            Order::Ascending,
        )
    }

    pub fn get_range_indexed(
        &self,
        collection: &str,
        index: &str,
        min_inclusive: &bson::Value,
        max_inclusive: &bson::Value,
        order: Order,
    ) -> Result<Vec<bson::Document>> {
        self.find_range_by_index(collection, index, min_inclusive, max_inclusive, order)
    }

    pub fn get_by_index(
        &self,
        collection: &str,
        index: &str,
        find: &bson::Value,
    ) -> Result<Vec<bson::Document>> {
        self.find_range_by_index(collection, index, find, find, Order::Ascending)
    }
}
