//! A binary merkle tree of 32-byte SHA-256 nodes addressed by generalized
//! index.
//!
//! Empty parts of a tree are represented by a single [`Node::Leaf`] holding
//! the hash of an all-zero subtree of the right depth, so a tree with a large
//! capacity but few entries stays small in memory.

use ethereum_types::H256;
use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::multiproof::{required_indices, Multiproof};

/// Deepest subtree for which a zero hash is precomputed.
pub const MAX_ZERO_DEPTH: usize = 64;

static ZERO_HASHES: Lazy<[H256; MAX_ZERO_DEPTH + 1]> = Lazy::new(|| {
    let mut hashes = [H256::zero(); MAX_ZERO_DEPTH + 1];
    for depth in 1..=MAX_ZERO_DEPTH {
        hashes[depth] = hash_pair(&hashes[depth - 1], &hashes[depth - 1]);
    }

    hashes
});

/// The output type of tree operations.
pub type TreeResult<T> = Result<T, TreeError>;

/// Errors that may occur while building or querying a tree.
#[derive(Clone, Debug, Eq, Error, Hash, PartialEq)]
pub enum TreeError {
    /// Generalized index `0` does not address any node.
    #[error("Generalized index {0} is invalid")]
    InvalidIndex(usize),

    /// The path to the index goes through a leaf.
    #[error("No node at generalized index {0}")]
    NodeNotFound(usize),

    /// More bottom nodes than the subtree can hold.
    #[error("Can not merkleize {count} nodes into a subtree of {limit} leaves")]
    TooManyLeaves {
        /// Number of nodes supplied.
        count: usize,
        /// Capacity of the subtree.
        limit: usize,
    },

    /// The code tree layout only supports one chunk size.
    #[error("Unsupported chunk size {0}")]
    UnsupportedChunkSize(usize),

    /// The code length does not fit in the metadata field.
    #[error("Code of {0} bytes exceeds the maximum code length")]
    CodeTooLong(usize),
}

/// A node of a merkle tree.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Node {
    /// A node without children. Either an actual leaf value or the hash of a
    /// subtree that is not expanded.
    Leaf(H256),

    /// A node with two children.
    Branch {
        /// Left child (even generalized index).
        left: Box<Node>,
        /// Right child (odd generalized index).
        right: Box<Node>,
        /// Cached `sha256(left || right)`.
        hash: H256,
    },
}

impl Node {
    /// Creates a leaf node.
    pub const fn leaf(value: H256) -> Self {
        Self::Leaf(value)
    }

    /// Creates a branch node and computes its hash.
    pub fn branch(left: Node, right: Node) -> Self {
        let hash = hash_pair(&left.hash(), &right.hash());
        Self::Branch {
            left: Box::new(left),
            right: Box::new(right),
            hash,
        }
    }

    /// Creates a leaf standing for an all-zero subtree of the given depth.
    ///
    /// # Panics
    /// Panics if `depth` is larger than [`MAX_ZERO_DEPTH`].
    pub fn zero(depth: usize) -> Self {
        Self::Leaf(ZERO_HASHES[depth])
    }

    /// Hash of the node.
    pub fn hash(&self) -> H256 {
        match self {
            Node::Leaf(h) => *h,
            Node::Branch { hash, .. } => *hash,
        }
    }

    /// Returns the node at generalized index `gindex`, where `1` is `self`.
    pub fn get(&self, gindex: usize) -> TreeResult<&Node> {
        if gindex == 0 {
            return Err(TreeError::InvalidIndex(gindex));
        }

        let depth = gindex.ilog2();
        let mut curr = self;

        for shift in (0..depth).rev() {
            curr = match curr {
                Node::Branch { left, right, .. } => match (gindex >> shift) & 1 {
                    0 => left.as_ref(),
                    _ => right.as_ref(),
                },
                Node::Leaf(_) => return Err(TreeError::NodeNotFound(gindex)),
            };
        }

        Ok(curr)
    }

    /// Creates a multiproof for the nodes at `indices`.
    ///
    /// The proof's leaves are the hashes of the requested nodes in the order
    /// given. Its helper hashes are those of the siblings needed to recompute
    /// the root, ordered by descending generalized index.
    pub fn prove_multi(&self, indices: &[usize]) -> TreeResult<Multiproof> {
        let leaves = indices
            .iter()
            .map(|g| self.get(*g).map(Node::hash))
            .collect::<TreeResult<Vec<_>>>()?;

        let hashes = required_indices(indices)
            .into_iter()
            .map(|g| self.get(g).map(Node::hash))
            .collect::<TreeResult<Vec<_>>>()?;

        Ok(Multiproof {
            indices: indices.to_vec(),
            leaves,
            hashes,
        })
    }
}

/// Builds a subtree `depth` levels high over `nodes`, padding on the right
/// with zero subtrees.
pub fn merkleize(mut nodes: Vec<Node>, depth: usize) -> TreeResult<Node> {
    let limit = 1 << depth;
    if nodes.len() > limit {
        return Err(TreeError::TooManyLeaves {
            count: nodes.len(),
            limit,
        });
    }

    if nodes.is_empty() {
        return Ok(Node::zero(depth));
    }

    for level in 0..depth {
        if nodes.len() % 2 == 1 {
            nodes.push(Node::zero(level));
        }

        let mut children = nodes.into_iter();
        let mut parents = Vec::with_capacity(children.len() / 2);
        while let (Some(left), Some(right)) = (children.next(), children.next()) {
            parents.push(Node::branch(left, right));
        }

        nodes = parents;
    }

    debug_assert_eq!(nodes.len(), 1);
    nodes.pop().ok_or(TreeError::NodeNotFound(1))
}

/// Hash of an all-zero subtree of the given depth, if precomputed.
pub fn zero_hash(depth: usize) -> Option<H256> {
    ZERO_HASHES.get(depth).copied()
}

/// Depth of the all-zero subtree hashing to `hash`, if any.
pub fn zero_hash_depth(hash: &H256) -> Option<usize> {
    ZERO_HASHES.iter().position(|z| z == hash)
}

pub(crate) fn hash_pair(left: &H256, right: &H256) -> H256 {
    let mut hasher = Sha256::new();
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());

    H256::from_slice(&hasher.finalize())
}

/// Encodes `v` as an SSZ `uint` leaf (little endian, zero padded).
pub(crate) fn leaf_from_u64(v: u64) -> H256 {
    let mut bytes = [0; 32];
    bytes[..8].copy_from_slice(&v.to_le_bytes());

    H256::from(bytes)
}

#[cfg(test)]
mod tests {
    use ethereum_types::H256;
    use hex_literal::hex;

    use super::{hash_pair, leaf_from_u64, merkleize, zero_hash, zero_hash_depth, Node, TreeError};

    fn leaf(v: u64) -> Node {
        Node::leaf(leaf_from_u64(v))
    }

    #[test]
    fn zero_hashes_match_known_values() {
        assert_eq!(zero_hash(0), Some(H256::zero()));
        assert_eq!(
            zero_hash(1),
            Some(H256::from(hex!(
                "f5a5fd42d16a20302798ef6ed309979b43003d2320d9f0e8ea9831a92759fb4b"
            )))
        );
        assert_eq!(
            zero_hash(2),
            Some(H256::from(hex!(
                "db56114e00fdd4c1f85c892bf35ac9a89289aaecb1ebd0a96cde606a748b5d71"
            )))
        );
    }

    #[test]
    fn zero_hash_depth_inverts_zero_hash() {
        for depth in [0, 1, 10, 64] {
            let h = zero_hash(depth).unwrap();
            assert_eq!(zero_hash_depth(&h), Some(depth));
        }

        assert_eq!(zero_hash_depth(&leaf_from_u64(1)), None);
        assert_eq!(zero_hash(65), None);
    }

    #[test]
    fn leaf_encoding_is_little_endian() {
        let l = leaf_from_u64(0x0102);
        assert_eq!(l.as_bytes()[0], 0x02);
        assert_eq!(l.as_bytes()[1], 0x01);
        assert!(l.as_bytes()[2..].iter().all(|b| *b == 0));
    }

    #[test]
    fn merkleize_pads_with_zero_subtrees() {
        let root = merkleize(vec![leaf(1), leaf(2), leaf(3)], 2).unwrap();
        let expected = hash_pair(
            &hash_pair(&leaf_from_u64(1), &leaf_from_u64(2)),
            &hash_pair(&leaf_from_u64(3), &H256::zero()),
        );

        assert_eq!(root.hash(), expected);
    }

    #[test]
    fn merkleize_empty_is_zero_subtree() {
        let root = merkleize(vec![], 10).unwrap();

        assert_eq!(root.hash(), zero_hash(10).unwrap());
        assert!(matches!(root, Node::Leaf(_)));
    }

    #[test]
    fn merkleize_rejects_overflowing_input() {
        let res = merkleize(vec![leaf(1), leaf(2), leaf(3)], 1);

        assert_eq!(
            res,
            Err(TreeError::TooManyLeaves { count: 3, limit: 2 })
        );
    }

    #[test]
    fn sparse_and_full_trees_hash_identically() {
        let sparse = merkleize(vec![leaf(7)], 3).unwrap();
        let full = merkleize(
            std::iter::once(leaf(7))
                .chain(std::iter::repeat_with(|| leaf(0)).take(7))
                .collect(),
            3,
        )
        .unwrap();

        assert_eq!(sparse.hash(), full.hash());
    }

    #[test]
    fn get_follows_generalized_indices() {
        let root = merkleize((1..=4).map(leaf).collect(), 2).unwrap();

        assert_eq!(root.get(1).unwrap().hash(), root.hash());
        assert_eq!(root.get(4).unwrap().hash(), leaf_from_u64(1));
        assert_eq!(root.get(5).unwrap().hash(), leaf_from_u64(2));
        assert_eq!(root.get(6).unwrap().hash(), leaf_from_u64(3));
        assert_eq!(root.get(7).unwrap().hash(), leaf_from_u64(4));
        assert_eq!(
            root.get(3).unwrap().hash(),
            hash_pair(&leaf_from_u64(3), &leaf_from_u64(4))
        );
    }

    #[test]
    fn get_errors_on_zero_and_past_leaves() {
        let root = merkleize(vec![leaf(1)], 1).unwrap();

        assert_eq!(root.get(0), Err(TreeError::InvalidIndex(0)));
        assert_eq!(root.get(4), Err(TreeError::NodeNotFound(4)));
    }
}
