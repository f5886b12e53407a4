use crate::MAX_BLOCKS;

const BITMAP_WORDS: usize = (MAX_BLOCKS + 63) / 64;

#[derive(Debug, PartialEq)]
pub enum State {
    Free,
    Used,
}

/// Tracks which data blocks are in use, one bit per block.
#[derive(Debug, Clone, Copy)]
pub struct Bitmap {
    bitmap: [u64; BITMAP_WORDS],
    /// The number of blocks tracked. Bits at or beyond `cap` are never handed out.
    cap: usize,
}

impl Bitmap {
    pub fn new(cap: usize) -> Self {
        assert!(cap <= BITMAP_WORDS * 64);
        Self {
            bitmap: [0; BITMAP_WORDS],
            cap,
        }
    }

    pub fn get(&self, blocknr: usize) -> State {
        assert!(blocknr < self.cap);
        // Grab the u64 containing the significant bit.
        let outer_offset = self.bitmap[blocknr / 64];

        let inner_offset = blocknr % 64;
        let mask = 0b01_u64 << inner_offset;
        match (outer_offset & mask) >> inner_offset {
            0 => State::Free,
            1 => State::Used,
            _ => unreachable!("Block state returned a non 0 or 1 value. This likely indicates an error with bitmasking"),
        }
    }

    pub fn set_reserved(&mut self, blocknr: usize) {
        assert!(blocknr < self.cap);
        let mask = 0b01_u64 << (blocknr % 64);
        self.bitmap[blocknr / 64] |= mask;
    }

    pub fn set_free(&mut self, blocknr: usize) {
        assert!(blocknr < self.cap);
        let mask = 0b01_u64 << (blocknr % 64);
        self.bitmap[blocknr / 64] &= !mask;
    }

    /// Free block numbers in ascending order.
    pub fn free(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.cap).filter(move |&i| self.get(i) == State::Free)
    }
}

/// Index of a data block within the data region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(usize);

impl BlockId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Index of a link node. Only the allocator hands these out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NodeId(usize);

#[derive(Debug, Default, Clone, Copy)]
struct LinkNode {
    /// Unset iff the node is free.
    block: Option<BlockId>,
    next: Option<NodeId>,
}

impl LinkNode {
    fn is_free(&self) -> bool {
        self.block.is_none()
    }
}

/// Ownership token for one file's chain of nodes.
///
/// Not `Clone`: the only way to give nodes back is [`Allocator::free_chain`], which
/// consumes it, so a chain cannot be walked after it has been released.
#[derive(Debug)]
pub(crate) struct Chain {
    head: NodeId,
    len: usize,
}

impl Chain {
    /// Number of nodes (and so blocks) in the chain.
    pub fn len(&self) -> usize {
        self.len
    }
}

/// A chain under construction. Turned into a [`Chain`] by [`ChainBuilder::finish`].
#[derive(Debug, Default)]
pub(crate) struct ChainBuilder {
    head: Option<NodeId>,
    tail: Option<NodeId>,
    len: usize,
}

impl ChainBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `None` for an empty chain.
    pub fn finish(self) -> Option<Chain> {
        let len = self.len;
        self.head.map(|head| Chain { head, len })
    }
}

/// Free-block bitmap plus the fixed pool of link nodes.
pub(crate) struct Allocator {
    blocks: Bitmap,
    nodes: [LinkNode; MAX_BLOCKS],
}

impl Allocator {
    pub fn new() -> Self {
        Self {
            blocks: Bitmap::new(MAX_BLOCKS),
            nodes: [LinkNode::default(); MAX_BLOCKS],
        }
    }

    /// First free node. The node is claimed once a block is assigned to it.
    pub fn allocate_node(&self) -> Option<NodeId> {
        self.nodes.iter().position(LinkNode::is_free).map(NodeId)
    }

    /// Marks the first free block as used and returns it.
    pub fn allocate_block(&mut self) -> Option<BlockId> {
        let blocknr = self.blocks.free().next()?;
        self.blocks.set_reserved(blocknr);
        Some(BlockId(blocknr))
    }

    pub fn free_blocks(&self) -> usize {
        self.blocks.free().count()
    }

    #[cfg(test)]
    pub fn is_block_free(&self, block: BlockId) -> bool {
        self.blocks.get(block.0) == State::Free
    }

    /// Claims a node and a block and links them at the end of `chain`.
    /// Returns `None` without changing anything if either pool is exhausted.
    pub fn append(&mut self, chain: &mut ChainBuilder) -> Option<BlockId> {
        let node = self.allocate_node()?;
        let block = self.allocate_block()?;
        self.nodes[node.0] = LinkNode {
            block: Some(block),
            next: None,
        };
        match chain.tail {
            Some(tail) => self.nodes[tail.0].next = Some(node),
            None => chain.head = Some(node),
        }
        chain.tail = Some(node);
        chain.len += 1;
        Some(block)
    }

    /// Returns every block and node of `chain` to the pool.
    pub fn free_chain(&mut self, chain: Chain) {
        let mut cursor = Some(chain.head);
        while let Some(node) = cursor {
            let LinkNode { block, next } = std::mem::take(&mut self.nodes[node.0]);
            if let Some(block) = block {
                self.blocks.set_free(block.0);
            }
            cursor = next;
        }
    }

    /// Blocks of `chain` in link order.
    pub fn chain_blocks<'a>(&'a self, chain: &Chain) -> ChainBlocks<'a> {
        ChainBlocks {
            nodes: &self.nodes,
            cursor: Some(chain.head),
        }
    }

    /// Checks that every used block is referenced by exactly one live node.
    #[cfg(test)]
    pub fn assert_consistent(&self) {
        for blocknr in 0..MAX_BLOCKS {
            let refs = self
                .nodes
                .iter()
                .filter(|n| n.block == Some(BlockId(blocknr)))
                .count();
            match self.blocks.get(blocknr) {
                State::Used => assert_eq!(refs, 1, "block {} has {} owners", blocknr, refs),
                State::Free => assert_eq!(refs, 0, "free block {} is referenced", blocknr),
            }
        }
    }
}

pub(crate) struct ChainBlocks<'a> {
    nodes: &'a [LinkNode],
    cursor: Option<NodeId>,
}

impl Iterator for ChainBlocks<'_> {
    type Item = BlockId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.nodes[self.cursor?.0];
        self.cursor = node.next;
        node.block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_of(alloc: &mut Allocator, n: usize) -> Chain {
        let mut builder = ChainBuilder::new();
        for _ in 0..n {
            alloc.append(&mut builder).unwrap();
        }
        builder.finish().unwrap()
    }

    #[test]
    fn can_read_and_write_values_to_bitmap() {
        let mut bmp = Bitmap::new(MAX_BLOCKS);

        bmp.set_reserved(2);

        assert_eq!(bmp.get(0), State::Free);
        assert_eq!(bmp.get(2), State::Used);
    }

    #[test]
    fn can_toggle_block_between_free_and_used() {
        let mut bmp = Bitmap::new(MAX_BLOCKS);
        bmp.set_reserved(3);
        bmp.set_reserved(4);

        bmp.set_free(3);
        assert_eq!(bmp.get(3), State::Free);
        // Neighbouring bits survive.
        assert_eq!(bmp.get(4), State::Used);
    }

    #[test]
    fn free_iterates_in_ascending_order() {
        let mut bmp = Bitmap::new(4);
        bmp.set_reserved(1);
        assert_eq!(bmp.free().collect::<Vec<_>>(), vec![0, 2, 3]);
    }

    #[test]
    fn blocks_are_handed_out_lowest_first_until_exhausted() {
        let mut alloc = Allocator::new();
        for i in 0..MAX_BLOCKS {
            assert_eq!(alloc.allocate_block(), Some(BlockId(i)));
        }
        assert_eq!(alloc.allocate_block(), None);
        assert_eq!(alloc.free_blocks(), 0);
    }

    #[test]
    fn chain_links_blocks_in_append_order() {
        let mut alloc = Allocator::new();
        let chain = chain_of(&mut alloc, 3);

        assert_eq!(chain.len(), 3);
        let blocks: Vec<_> = alloc.chain_blocks(&chain).map(BlockId::index).collect();
        assert_eq!(blocks, vec![0, 1, 2]);
        assert_eq!(alloc.free_blocks(), MAX_BLOCKS - 3);
        alloc.assert_consistent();
    }

    #[test]
    fn freeing_a_chain_leaves_other_chains_alone() {
        let mut alloc = Allocator::new();
        let first = chain_of(&mut alloc, 2);
        let second = chain_of(&mut alloc, 4);

        alloc.free_chain(first);

        assert!(alloc.is_block_free(BlockId(0)));
        assert!(alloc.is_block_free(BlockId(1)));
        let blocks: Vec<_> = alloc.chain_blocks(&second).map(BlockId::index).collect();
        assert_eq!(blocks, vec![2, 3, 4, 5]);
        assert_eq!(alloc.free_blocks(), MAX_BLOCKS - 4);
        alloc.assert_consistent();
    }

    #[test]
    fn freed_nodes_and_blocks_are_reused() {
        let mut alloc = Allocator::new();
        let full = chain_of(&mut alloc, MAX_BLOCKS);
        assert!(alloc.append(&mut ChainBuilder::new()).is_none());

        alloc.free_chain(full);
        assert_eq!(alloc.free_blocks(), MAX_BLOCKS);
        assert!(alloc.allocate_node().is_some());
        let again = chain_of(&mut alloc, MAX_BLOCKS);
        assert_eq!(again.len(), MAX_BLOCKS);
        alloc.assert_consistent();
    }

    #[test]
    fn empty_builder_finishes_to_none() {
        assert!(ChainBuilder::new().finish().is_none());
    }
}
