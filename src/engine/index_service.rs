use crate::Error;
use crate::Result;
use crate::bson;
use crate::engine::index_node::{IndexNode, IndexNodeMut};
use crate::engine::pages::IndexPage;
use crate::engine::snapshot::Snapshot;
use crate::engine::utils::{PartialBorrower, PartialRefMut};
use crate::engine::{MAX_LEVEL_LENGTH, PageAddress};
use crate::utils::{Collation, Order};
use rand::Rng;

/// Builds and walks the per-collection skip lists backing every index
/// (including `_id`). Constructed fresh for a single operation against a
/// `&mut Snapshot` and dropped afterwards -- see `IndexService`'s entry in
/// `DESIGN.md` for why it never outlives one call.
pub(crate) struct IndexService<'snapshot> {
    nodes: PartialIndexNodeAccessorMut<'snapshot>,
    collation: Collation,
    #[allow(dead_code)]
    max_item_count: u32,
}

impl<'snapshot> IndexService<'snapshot> {
    pub fn new(snapshot: &'snapshot mut Snapshot, collation: Collation, max_item_count: u32) -> Self {
        Self {
            nodes: PartialIndexNodeAccessorMut::new(snapshot),
            collation,
            max_item_count,
        }
    }

    pub fn collation(&self) -> &Collation {
        &self.collation
    }

    fn snapshot_mut(&mut self) -> &mut Snapshot {
        self.nodes.snapshot_mut()
    }

    pub fn get_node(&mut self, address: PageAddress) -> Result<IndexNode> {
        self.snapshot_mut()
            .get_page::<IndexPage>(address.page_id(), false)?
            .get_index_node(address.index())
    }

    fn compare(&self, a: &bson::Value, b: &bson::Value) -> std::cmp::Ordering {
        a.compare_to(b, &self.collation)
    }

    fn is_sentinel(key: &bson::Value) -> bool {
        matches!(key, bson::Value::MinValue | bson::Value::MaxValue)
    }

    /// Creates a brand new index: allocates its first page and links a
    /// `MinValue`/`MaxValue` sentinel pair across every skip-list level, so
    /// later inserts never need to special-case an empty list. Returns the
    /// new head/tail addresses and the page id to track as the index's
    /// free-index-page list.
    pub fn create_index(
        &mut self,
        slot: u8,
    ) -> Result<(PageAddress, PageAddress, u32)> {
        let (length, _) = IndexNode::get_node_length(MAX_LEVEL_LENGTH as u8, &bson::Value::MinValue);

        let index_page = self.snapshot_mut().new_page::<IndexPage>()?;

        let head = index_page.insert_index_node(
            slot,
            MAX_LEVEL_LENGTH as u8,
            bson::Value::MinValue,
            PageAddress::EMPTY,
            length,
        );
        let head_position = head.position();
        drop(head);

        let tail = index_page.insert_index_node(
            slot,
            MAX_LEVEL_LENGTH as u8,
            bson::Value::MaxValue,
            PageAddress::EMPTY,
            length,
        );
        let tail_position = tail.position();
        drop(tail);

        for level in 0..MAX_LEVEL_LENGTH as u8 {
            index_page
                .get_index_node_mut(head_position.index())?
                .set_next(level, tail_position);
            index_page
                .get_index_node_mut(tail_position.index())?
                .set_prev(level, head_position);
        }

        index_page.set_page_list_slot(0);
        let page_id = index_page.page_id();

        Ok((head_position, tail_position, page_id))
    }

    /// Removes every real node between `head` and `tail` and frees their
    /// pages, walking the level-0 chain (guaranteed to visit every node
    /// exactly once, unlike the higher skip-list levels).
    pub fn drop_index(
        &mut self,
        head: PageAddress,
        tail: PageAddress,
        free_index_page_list: u32,
    ) -> Result<()> {
        let mut free_index_page_list = free_index_page_list;
        let mut address = self.get_node(head)?.get_next(0);

        while address != tail {
            let next = self.get_node(address)?.get_next(0);

            self.snapshot_mut()
                .get_page::<IndexPage>(address.page_id(), false)?
                .delete_index_node(address.index());
            self.snapshot_mut()
                .add_or_remove_free_index_list(address.page_id(), &mut free_index_page_list)?;

            address = next;
        }

        self.snapshot_mut()
            .get_page::<IndexPage>(head.page_id(), false)?
            .delete_index_node(head.index());
        self.snapshot_mut()
            .add_or_remove_free_index_list(head.page_id(), &mut free_index_page_list)?;

        if tail.page_id() != head.page_id() {
            self.snapshot_mut()
                .get_page::<IndexPage>(tail.page_id(), false)?
                .delete_index_node(tail.index());
            self.snapshot_mut()
                .add_or_remove_free_index_list(tail.page_id(), &mut free_index_page_list)?;
        }

        Ok(())
    }

    /// Finds the node matching `value` while walking from `head`/`tail` in
    /// `order`. With `sibling`, returns the first node past the search point
    /// regardless of an exact match (used to enumerate duplicates); without
    /// it, returns `None` unless the key matches exactly.
    pub fn find(
        &mut self,
        head: PageAddress,
        tail: PageAddress,
        value: &bson::Value,
        sibling: bool,
        order: Order,
    ) -> Result<Option<IndexNode>> {
        let start = match order {
            Order::Ascending => head,
            Order::Descending => tail,
        };

        let mut cur = self.get_node(start)?;

        for level in (0..MAX_LEVEL_LENGTH as u8).rev() {
            loop {
                let next_address = cur.get_next_prev(level, order);
                let next = self.get_node(next_address)?;

                let keep_going = if Self::is_sentinel(next.key()) {
                    false
                } else {
                    let diff = self.compare(next.key(), value);
                    match order {
                        Order::Ascending => diff.is_lt() || (!sibling && diff.is_eq() && level > 0),
                        Order::Descending => diff.is_gt() || (!sibling && diff.is_eq() && level > 0),
                    }
                };

                if keep_going {
                    cur = next;
                } else {
                    break;
                }
            }
        }

        let candidate_address = cur.get_next_prev(0, order);
        let candidate = self.get_node(candidate_address)?;

        if Self::is_sentinel(candidate.key()) {
            return Ok(None);
        }

        if sibling || self.compare(candidate.key(), value).is_eq() {
            Ok(Some(candidate))
        } else {
            Ok(None)
        }
    }

    /// Returns every real (non-sentinel) node between `head` and `tail`,
    /// walked in `order`.
    pub fn find_all(
        &mut self,
        head: PageAddress,
        tail: PageAddress,
        order: Order,
    ) -> Result<Vec<IndexNode>> {
        let mut result = Vec::new();

        let start = match order {
            Order::Ascending => head,
            Order::Descending => tail,
        };

        let mut node = self.get_node(start)?;

        loop {
            let next_address = node.get_next_prev(0, order);
            let next = self.get_node(next_address)?;

            if Self::is_sentinel(next.key()) {
                break;
            }

            result.push(next);
            node = self.get_node(next_address)?;
        }

        Ok(result)
    }

    /// Like `find`, but also requires the match to point at `data_block`,
    /// walking forward past same-key duplicates in a non-unique index until
    /// the owning document's own entry turns up (or the key run ends).
    pub fn find_exact(
        &mut self,
        head: PageAddress,
        tail: PageAddress,
        value: &bson::Value,
        data_block: PageAddress,
        order: Order,
    ) -> Result<Option<PageAddress>> {
        let Some(mut node) = self.find(head, tail, value, true, order)? else {
            return Ok(None);
        };

        loop {
            if self.compare(node.key(), value).is_ne() {
                return Ok(None);
            }
            if node.data_block() == data_block {
                return Ok(Some(node.position()));
            }
            let next = node.get_next_prev(0, order);
            node = self.get_node(next)?;
        }
    }

    /// Sets the cross-index chain pointer used to walk every index entry a
    /// single document owns, starting from its primary-key node.
    pub fn link_chain(&mut self, prev: PageAddress, next: PageAddress) -> Result<()> {
        self.nodes.get_node_mut(prev)?.set_next_node(next);
        Ok(())
    }

    /// Unlinks a node from every skip-list level it participates in, deletes
    /// its slot and returns its page to `free_index_page_list` if now empty.
    pub fn delete_node(&mut self, address: PageAddress, free_index_page_list: &mut u32) -> Result<()> {
        let node = self.get_node(address)?;
        let levels = node.levels();
        let prevs: Vec<PageAddress> = (0..levels).map(|l| node.get_prev(l)).collect();
        let nexts: Vec<PageAddress> = (0..levels).map(|l| node.get_next(l)).collect();
        drop(node);

        for level in 0..levels {
            let prev = prevs[level as usize];
            let next = nexts[level as usize];
            self.nodes.get_node_mut(prev)?.set_next(level, next);
            self.nodes.get_node_mut(next)?.set_prev(level, prev);
        }

        self.snapshot_mut()
            .get_page::<IndexPage>(address.page_id(), false)?
            .delete_index_node(address.index());
        self.snapshot_mut()
            .add_or_remove_free_index_list(address.page_id(), free_index_page_list)?;

        Ok(())
    }

    /// Determines how many skip-list levels a freshly inserted node should
    /// span: a classic coin-flip ladder capped at `MAX_LEVEL_LENGTH`.
    fn random_levels() -> u8 {
        let mut levels = 1u8;
        let mut rng = rand::rng();

        while levels < MAX_LEVEL_LENGTH as u8 && rng.random_bool(0.5) {
            levels += 1;
        }

        levels
    }

    /// Inserts `key` pointing at `data_block` into the skip list rooted at
    /// `head`, linking the new node at every level it spans. Returns the new
    /// node's address and the (possibly unchanged) free-index-page list head
    /// for the caller to persist back onto the `CollectionIndex`.
    #[allow(clippy::too_many_arguments)]
    pub fn add_node(
        &mut self,
        index_name: &str,
        slot: u8,
        head: PageAddress,
        free_index_page_list: u32,
        unique: bool,
        key: bson::Value,
        data_block: PageAddress,
    ) -> Result<(PageAddress, u32)> {
        if unique {
            if let Some(existing) = self.find(head, PageAddress::EMPTY, &key, false, Order::Ascending)? {
                let _ = existing;
                return Err(Error::index_duplicate_key(index_name, &key));
            }
        }

        let levels = Self::random_levels();
        let (length, _) = IndexNode::get_node_length(levels, &key);
        let search_key = key.clone();

        let new_node = self
            .nodes
            .insert_node(slot, levels, key, data_block, length, free_index_page_list)?;
        let new_position = new_node.position();
        drop(new_node);

        let mut free_index_page_list = free_index_page_list;
        self.snapshot_mut()
            .add_or_remove_free_index_list(new_position.page_id(), &mut free_index_page_list)?;

        let mut cur = self.get_node(head)?;

        for level in (0..MAX_LEVEL_LENGTH as u8).rev() {
            loop {
                let next_address = cur.get_next(level);
                let next = self.get_node(next_address)?;

                let keep_going = if Self::is_sentinel(next.key()) {
                    false
                } else {
                    self.compare(next.key(), &search_key).is_le()
                };

                if keep_going {
                    cur = next;
                } else {
                    break;
                }
            }

            if level < levels {
                let left = cur.position();
                let right = cur.get_next(level);

                self.nodes.get_node_mut(left)?.set_next(level, new_position);
                {
                    let mut new_node = self.nodes.get_node_mut(new_position)?;
                    new_node.set_prev(level, left);
                    new_node.set_next(level, right);
                }
                self.nodes.get_node_mut(right)?.set_prev(level, new_position);
            }
        }

        Ok((new_position, free_index_page_list))
    }
}

pub(crate) struct PartialIndexNodeAccessorMut<'snapshot> {
    inner: PartialBorrower<&'snapshot mut Snapshot, PageAddress>,
}

type IndexNodeMutRef<'snapshot> = PartialRefMut<IndexNodeMut<'snapshot>, PageAddress>;

impl<'snapshot> PartialIndexNodeAccessorMut<'snapshot> {
    pub(crate) fn new(snapshot: &'snapshot mut Snapshot) -> Self {
        Self {
            inner: PartialBorrower::new(snapshot),
        }
    }

    fn snapshot_mut(&mut self) -> &mut Snapshot {
        &mut **self.inner.target_mut()
    }

    fn get_node_mut(&mut self, address: PageAddress) -> Result<IndexNodeMutRef<'snapshot>> {
        unsafe {
            self.inner
                .try_get_borrow::<_, _, Error>(address, |snapshot: &mut &mut Snapshot, address| {
                    Ok(snapshot
                        .get_page::<IndexPage>(address.page_id(), false)?
                        .get_index_node_mut(address.index())?)
                })
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn insert_node(
        &mut self,
        slot: u8,
        levels: u8,
        key: bson::Value,
        data_block: PageAddress,
        length: usize,
        free_index_page_list: u32,
    ) -> Result<IndexNodeMutRef<'snapshot>> {
        unsafe {
            self.inner.try_create_borrow(
                move |snapshot: &mut &mut Snapshot| {
                    let page = snapshot.get_free_index_page(length, free_index_page_list)?;
                    Ok(page.insert_index_node(slot, levels, key, data_block, length))
                },
                |n| n.position(),
            )
        }
    }
}
