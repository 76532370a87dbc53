use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use gamebank_protocol::block::SignedBlock;
use gamebank_protocol::error::ChainError;
use gamebank_protocol::types::BlockId;

/// One reversible block in the tree.
#[derive(Clone)]
pub struct ForkItem {
    pub block: SignedBlock,
    pub id: BlockId,
    pub previous: BlockId,
    pub num: u32,
}

/// In-memory DAG of candidate blocks. Items are addressed by block id, with
/// a non-unique by-number index; "previous" links are ids into the same map
/// rather than owning references. Orphans whose parent has not arrived wait
/// in a separate unlinked pool.
pub struct ForkTree {
    items: HashMap<BlockId, ForkItem>,
    by_num: BTreeMap<u32, Vec<BlockId>>,
    unlinked: HashMap<BlockId, SignedBlock>,
    unlinked_by_prev: HashMap<BlockId, Vec<BlockId>>,
    head: Option<BlockId>,
}

impl Default for ForkTree {
    fn default() -> Self {
        ForkTree {
            items: HashMap::new(),
            by_num: BTreeMap::new(),
            unlinked: HashMap::new(),
            unlinked_by_prev: HashMap::new(),
            head: None,
        }
    }
}

impl ForkTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn head(&self) -> Option<&ForkItem> {
        self.head.as_ref().and_then(|id| self.items.get(id))
    }

    pub fn fetch_block(&self, id: &BlockId) -> Option<&ForkItem> {
        self.items.get(id)
    }

    pub fn fetch_blocks_by_number(&self, num: u32) -> Vec<&ForkItem> {
        self.by_num
            .get(&num)
            .map(|ids| ids.iter().filter_map(|id| self.items.get(id)).collect())
            .unwrap_or_default()
    }

    /// Seed the tree with its first (trusted) block, e.g. after replay.
    pub fn start_block(&mut self, block: SignedBlock) {
        self.reset();
        let item = make_item(block);
        self.head = Some(item.id);
        self.index_insert(item);
    }

    pub fn reset(&mut self) {
        self.items.clear();
        self.by_num.clear();
        self.unlinked.clear();
        self.unlinked_by_prev.clear();
        self.head = None;
    }

    fn index_insert(&mut self, item: ForkItem) {
        self.by_num.entry(item.num).or_default().push(item.id);
        self.items.insert(item.id, item);
    }

    fn index_remove(&mut self, id: &BlockId) -> Option<ForkItem> {
        let item = self.items.remove(id)?;
        if let Some(ids) = self.by_num.get_mut(&item.num) {
            ids.retain(|i| i != id);
            if ids.is_empty() {
                self.by_num.remove(&item.num);
            }
        }
        Some(item)
    }

    /// Insert a block. Returns the (possibly unchanged) head item id on
    /// success; `UnlinkableBlock` when the parent is unknown, in which case
    /// the block is parked in the unlinked pool.
    pub fn push_block(&mut self, block: SignedBlock) -> Result<BlockId, ChainError> {
        let item = make_item(block);
        if self.items.contains_key(&item.id) {
            return Ok(self.head.expect("nonempty tree has a head"));
        }
        if self.items.is_empty() {
            self.head = Some(item.id);
            self.index_insert(item);
            return Ok(self.head.unwrap());
        }
        // first blocks carry a null parent and always link at the root level
        if !self.items.contains_key(&item.previous) && !item.previous.is_null() {
            debug!(id = %item.id, previous = %item.previous, "parking unlinkable block");
            self.unlinked_by_prev
                .entry(item.previous)
                .or_default()
                .push(item.id);
            let id = item.id;
            self.unlinked.insert(id, item.block);
            return Err(ChainError::UnlinkableBlock(format!(
                "block {id} has unknown parent"
            )));
        }
        self.link(item);
        Ok(self.head.unwrap())
    }

    /// Insert a linked item, adopt any orphans waiting on it, and advance
    /// the head when a longer chain appears.
    fn link(&mut self, item: ForkItem) {
        let head_num = self.head().map(|h| h.num).unwrap_or(0);
        if item.num > head_num {
            self.head = Some(item.id);
        }
        let id = item.id;
        self.index_insert(item);

        if let Some(children) = self.unlinked_by_prev.remove(&id) {
            for child_id in children {
                if let Some(block) = self.unlinked.remove(&child_id) {
                    self.link(make_item(block));
                }
            }
        }
    }

    /// Point the head at a known item (used when re-adopting a branch).
    pub fn set_head(&mut self, id: &BlockId) -> bool {
        if self.items.contains_key(id) {
            self.head = Some(*id);
            true
        } else {
            false
        }
    }

    /// Step the head back to its parent without removing the item. Returns
    /// the new head id when the parent is still in the tree.
    pub fn pop_head(&mut self) -> Option<BlockId> {
        let head = self.head()?;
        let previous = head.previous;
        self.head = self.items.contains_key(&previous).then_some(previous);
        self.head
    }

    /// Remove one item (e.g. after it failed to apply). The head is
    /// recomputed as the highest-numbered remaining item.
    pub fn remove(&mut self, id: &BlockId) {
        self.index_remove(id);
        if self.head == Some(*id) {
            self.head = self
                .by_num
                .iter()
                .next_back()
                .and_then(|(_, ids)| ids.last().copied());
        }
    }

    /// Drop items whose number is at or below `head − max_size`.
    pub fn set_max_size(&mut self, max_size: u32) {
        let Some(head) = self.head() else { return };
        let cutoff = head.num.saturating_sub(max_size);
        let stale: Vec<BlockId> = self
            .by_num
            .range(..=cutoff)
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect();
        for id in stale {
            self.index_remove(&id);
        }
        self.unlinked.retain(|_, b| b.block_num() > cutoff);
        self.unlinked_by_prev.retain(|_, children| {
            children.retain(|c| c.block_num() > cutoff);
            !children.is_empty()
        });
    }

    /// Walk both items back to their lowest common ancestor. Returns the two
    /// branches ordered tip-first, excluding the ancestor itself: the first
    /// vector descends from `first`, the second from `second`.
    pub fn fetch_branch_from(
        &self,
        first: &BlockId,
        second: &BlockId,
    ) -> Result<(Vec<SignedBlock>, Vec<SignedBlock>), ChainError> {
        let mut first_branch = Vec::new();
        let mut second_branch = Vec::new();
        let mut walk_first = self.require(first)?;
        let mut walk_second = self.require(second)?;

        while walk_first.num > walk_second.num {
            first_branch.push(walk_first.block.clone());
            walk_first = self.require(&walk_first.previous)?;
        }
        while walk_second.num > walk_first.num {
            second_branch.push(walk_second.block.clone());
            walk_second = self.require(&walk_second.previous)?;
        }
        while walk_first.id != walk_second.id {
            first_branch.push(walk_first.block.clone());
            second_branch.push(walk_second.block.clone());
            walk_first = self.require(&walk_first.previous)?;
            walk_second = self.require(&walk_second.previous)?;
        }
        Ok((first_branch, second_branch))
    }

    /// Descend `previous` links from the head until reaching `num`.
    pub fn walk_main_branch_to_num(&self, num: u32) -> Option<&ForkItem> {
        let mut current = self.head()?;
        if num > current.num {
            return None;
        }
        while current.num > num {
            current = self.items.get(&current.previous)?;
        }
        Some(current)
    }

    /// The block at `num` on the main branch, if still in the tree.
    pub fn fetch_block_on_main_branch_by_number(&self, num: u32) -> Option<SignedBlock> {
        self.walk_main_branch_to_num(num).map(|i| i.block.clone())
    }

    fn require(&self, id: &BlockId) -> Result<&ForkItem, ChainError> {
        self.items
            .get(id)
            .ok_or_else(|| ChainError::Fork(format!("block {id} left the fork tree mid-walk")))
    }
}

fn make_item(block: SignedBlock) -> ForkItem {
    ForkItem {
        id: block.id(),
        previous: block.previous(),
        num: block.block_num(),
        block,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamebank_protocol::block::{BlockHeader, SignedBlockHeader};
    use gamebank_protocol::types::{Ripemd, Signature};

    fn make_block(previous: BlockId, slot: i64, witness: &str) -> SignedBlock {
        SignedBlock {
            signed_header: SignedBlockHeader {
                header: BlockHeader {
                    previous,
                    timestamp: slot * 3,
                    witness: witness.into(),
                    transaction_merkle_root: Ripemd::default(),
                    extensions: vec![],
                },
                witness_signature: Signature([0u8; 65]),
            },
            transactions: vec![],
        }
    }

    #[test]
    fn head_follows_longest_chain() {
        let mut tree = ForkTree::new();
        let root = make_block(BlockId::default(), 1, "a");
        let root_id = root.id();
        tree.push_block(root).unwrap();

        let a1 = make_block(root_id, 2, "a");
        let a1_id = a1.id();
        tree.push_block(a1).unwrap();
        assert_eq!(tree.head().unwrap().id, a1_id);

        // shorter sibling does not displace the head
        let b1 = make_block(root_id, 3, "b");
        let b1_id = b1.id();
        tree.push_block(b1).unwrap();
        assert_eq!(tree.head().unwrap().id, a1_id);

        // but a longer branch does
        let b2 = make_block(b1_id, 4, "b");
        let b2_id = b2.id();
        tree.push_block(b2).unwrap();
        assert_eq!(tree.head().unwrap().id, b2_id);
    }

    #[test]
    fn unlinkable_blocks_wait_for_their_parent() {
        let mut tree = ForkTree::new();
        let root = make_block(BlockId::default(), 1, "a");
        let root_id = root.id();
        tree.push_block(root).unwrap();

        let a1 = make_block(root_id, 2, "a");
        let a2 = make_block(a1.id(), 3, "a");
        let a2_id = a2.id();

        assert!(matches!(
            tree.push_block(a2),
            Err(ChainError::UnlinkableBlock(_))
        ));
        // arrival of the parent links the orphan and advances the head
        tree.push_block(a1).unwrap();
        assert_eq!(tree.head().unwrap().id, a2_id);
    }

    #[test]
    fn branches_meet_at_the_fork_point() {
        let mut tree = ForkTree::new();
        let root = make_block(BlockId::default(), 1, "a");
        let root_id = root.id();
        tree.push_block(root).unwrap();

        let a1 = make_block(root_id, 2, "a");
        let a1_id = a1.id();
        let a2 = make_block(a1_id, 3, "a");
        let a2_id = a2.id();
        let b1 = make_block(root_id, 4, "b");
        let b1_id = b1.id();
        let b2 = make_block(b1_id, 5, "b");
        let b3 = make_block(b2.id(), 6, "b");
        let b3_id = b3.id();

        for b in [a1, a2, b1, b2, b3] {
            let _ = tree.push_block(b);
        }

        let (new_branch, old_branch) = tree.fetch_branch_from(&b3_id, &a2_id).unwrap();
        assert_eq!(new_branch.len(), 3);
        assert_eq!(old_branch.len(), 2);
        assert_eq!(new_branch[0].id(), b3_id);
        assert_eq!(old_branch[0].id(), a2_id);
        // neither branch contains the common ancestor
        assert!(new_branch.iter().all(|b| b.id() != root_id));
        assert!(old_branch.iter().all(|b| b.id() != root_id));
    }

    #[test]
    fn pruning_respects_max_size() {
        let mut tree = ForkTree::new();
        let mut prev = BlockId::default();
        let mut ids = Vec::new();
        for slot in 1..=10 {
            let b = make_block(prev, slot, "a");
            prev = b.id();
            ids.push(b.id());
            let _ = tree.push_block(b);
        }
        tree.set_max_size(3);
        // head is 10; blocks numbered ≤ 7 are gone
        assert!(tree.fetch_block(&ids[5]).is_none());
        assert!(tree.fetch_block(&ids[8]).is_some());
    }

    #[test]
    fn walk_main_branch() {
        let mut tree = ForkTree::new();
        let mut prev = BlockId::default();
        for slot in 1..=5 {
            let b = make_block(prev, slot, "a");
            prev = b.id();
            let _ = tree.push_block(b);
        }
        assert_eq!(
            tree.fetch_block_on_main_branch_by_number(3).unwrap().block_num(),
            3
        );
        assert!(tree.fetch_block_on_main_branch_by_number(6).is_none());
    }
}
