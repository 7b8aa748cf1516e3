//! Multiproofs over several generalized indices of a [`Node`] tree, their
//! compressed form and its RLP encoding.
//!
//! A [`Multiproof`] carries the hashes of the proven nodes ("leaves") plus
//! the hashes of every other node needed to recompute the root ("helpers").
//! Code tries are mostly empty, so many helpers are hashes of all-zero
//! subtrees. [`CompressedMultiproof`] replaces those with a one-byte level
//! marker.
//!
//! [`Node`]: crate::tree::Node

use std::collections::{BTreeSet, BinaryHeap, HashMap};

use bytes::Bytes;
use ethereum_types::H256;
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use thiserror::Error;

use crate::tree::{hash_pair, zero_hash, zero_hash_depth};

/// The output type of multiproof operations.
pub type MultiproofResult<T> = Result<T, MultiproofError>;

/// Errors that may occur when decompressing, verifying or decoding a
/// multiproof.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum MultiproofError {
    /// An elided hash has no matching entry in the zero levels.
    #[error("Elided hash {0} has no zero level")]
    MissingZeroLevel(usize),

    /// A zero level for which no zero hash exists.
    #[error("Unknown zero level {0}")]
    UnknownZeroLevel(u8),

    /// A leaf or hash that is not 32 bytes long.
    #[error("Node {index} is {len} bytes long, expected 32")]
    MalformedNode {
        /// Position of the entry in its list.
        index: usize,
        /// Actual length of the entry.
        len: usize,
    },

    /// A node needed to climb to the root is neither proven nor derivable.
    #[error("Missing node at generalized index {0}")]
    MissingNode(usize),

    /// The number of leaves does not match the number of indices.
    #[error("Proof has {indices} indices but {leaves} leaves")]
    LengthMismatch {
        /// Number of indices.
        indices: usize,
        /// Number of leaves.
        leaves: usize,
    },

    /// The number of helper hashes does not match what the indices require.
    #[error("Proof requires {expected} helper hashes but has {actual}")]
    HashCountMismatch {
        /// Number of helpers the indices require.
        expected: usize,
        /// Number of helpers present.
        actual: usize,
    },

    /// The RLP payload could not be decoded.
    #[error("Failed to decode proof: {0}")]
    Decode(#[from] DecoderError),
}

/// A proof for several nodes of a tree at once.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Multiproof {
    /// Generalized indices of the proven nodes.
    pub indices: Vec<usize>,
    /// Hashes of the proven nodes, in the order of `indices`.
    pub leaves: Vec<H256>,
    /// Helper hashes, ordered by descending generalized index (see
    /// [`required_indices`]).
    pub hashes: Vec<H256>,
}

/// A [`Multiproof`] with zero-subtree helper hashes elided.
///
/// An elided hash is stored as an empty entry in `hashes` and its subtree
/// depth is pushed onto `zero_levels`, so the two are matched up in order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CompressedMultiproof {
    /// Generalized indices of the proven nodes.
    pub indices: Vec<usize>,
    /// Proven node values.
    pub leaves: Vec<Vec<u8>>,
    /// Helper hashes, empty where a zero hash was elided.
    pub hashes: Vec<Vec<u8>>,
    /// Depths of the elided zero subtrees.
    pub zero_levels: Vec<u8>,
}

/// Returns the generalized indices of the helper nodes needed to prove
/// `leaf_indices`, ordered by descending index.
///
/// Those are the siblings of every node on the paths from the leaves to the
/// root, except the ones that are themselves on a path or proven.
pub fn required_indices(leaf_indices: &[usize]) -> Vec<usize> {
    let leaves: BTreeSet<_> = leaf_indices.iter().copied().collect();
    let mut siblings = BTreeSet::new();
    let mut on_path = BTreeSet::new();

    for leaf in leaf_indices {
        let mut curr = *leaf;
        while curr > 1 {
            siblings.insert(curr ^ 1);
            curr /= 2;
            on_path.insert(curr);
        }
    }

    siblings
        .into_iter()
        .rev()
        .filter(|g| !on_path.contains(g) && !leaves.contains(g))
        .collect()
}

impl Multiproof {
    /// Elides every helper hash that is the hash of an all-zero subtree.
    ///
    /// Leaves are kept as they are.
    pub fn compress(&self) -> CompressedMultiproof {
        let mut hashes = Vec::with_capacity(self.hashes.len());
        let mut zero_levels = Vec::new();

        for h in self.hashes.iter() {
            match zero_hash_depth(h) {
                Some(depth) => {
                    zero_levels.push(depth as u8);
                    hashes.push(Vec::new());
                }
                None => hashes.push(h.as_bytes().to_vec()),
            }
        }

        CompressedMultiproof {
            indices: self.indices.clone(),
            leaves: self.leaves.iter().map(|l| l.as_bytes().to_vec()).collect(),
            hashes,
            zero_levels,
        }
    }

    /// Recomputes the root from the proof and compares it with `root`.
    ///
    /// Returns `Ok(false)` if the proof is well formed but for another root.
    pub fn verify(&self, root: H256) -> MultiproofResult<bool> {
        if self.indices.len() != self.leaves.len() {
            return Err(MultiproofError::LengthMismatch {
                indices: self.indices.len(),
                leaves: self.leaves.len(),
            });
        }

        let helpers = required_indices(&self.indices);
        if helpers.len() != self.hashes.len() {
            return Err(MultiproofError::HashCountMismatch {
                expected: helpers.len(),
                actual: self.hashes.len(),
            });
        }

        let mut nodes: HashMap<usize, H256> = self
            .indices
            .iter()
            .copied()
            .zip(self.leaves.iter().copied())
            .chain(helpers.into_iter().zip(self.hashes.iter().copied()))
            .collect();

        // Children always have a larger index than their parent, so popping
        // the largest index first guarantees that a node's sibling is known
        // (or can never be) by the time the node is reached.
        let mut pending: BinaryHeap<usize> = nodes.keys().copied().collect();
        while let Some(g) = pending.pop() {
            if g <= 1 || nodes.contains_key(&(g / 2)) {
                continue;
            }

            let sibling = g ^ 1;
            let sibling_hash = *nodes
                .get(&sibling)
                .ok_or(MultiproofError::MissingNode(sibling))?;
            let own_hash = nodes[&g];

            let parent_hash = match g % 2 {
                0 => hash_pair(&own_hash, &sibling_hash),
                _ => hash_pair(&sibling_hash, &own_hash),
            };

            nodes.insert(g / 2, parent_hash);
            pending.push(g / 2);
        }

        Ok(nodes.get(&1) == Some(&root))
    }
}

impl CompressedMultiproof {
    /// Restores the elided zero hashes.
    pub fn decompress(&self) -> MultiproofResult<Multiproof> {
        let mut zero_levels = self.zero_levels.iter();

        let hashes = self
            .hashes
            .iter()
            .enumerate()
            .map(|(i, h)| match h.is_empty() {
                true => {
                    let level = *zero_levels
                        .next()
                        .ok_or(MultiproofError::MissingZeroLevel(i))?;
                    zero_hash(level as usize).ok_or(MultiproofError::UnknownZeroLevel(level))
                }
                false => node_from_bytes(i, h),
            })
            .collect::<MultiproofResult<Vec<_>>>()?;

        let leaves = self
            .leaves
            .iter()
            .enumerate()
            .map(|(i, l)| node_from_bytes(i, l))
            .collect::<MultiproofResult<Vec<_>>>()?;

        Ok(Multiproof {
            indices: self.indices.clone(),
            leaves,
            hashes,
        })
    }
}

fn node_from_bytes(index: usize, bytes: &[u8]) -> MultiproofResult<H256> {
    match bytes.len() {
        32 => Ok(H256::from_slice(bytes)),
        len => Err(MultiproofError::MalformedNode { index, len }),
    }
}

impl Encodable for CompressedMultiproof {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(4);

        s.begin_list(self.indices.len());
        for i in self.indices.iter() {
            s.append(&(*i as u64));
        }

        s.begin_list(self.leaves.len());
        for l in self.leaves.iter() {
            s.append(l);
        }

        s.begin_list(self.hashes.len());
        for h in self.hashes.iter() {
            s.append(h);
        }

        s.begin_list(self.zero_levels.len());
        for z in self.zero_levels.iter() {
            s.append(z);
        }
    }
}

impl Decodable for CompressedMultiproof {
    fn decode(rlp: &Rlp<'_>) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 4 {
            return Err(DecoderError::RlpIncorrectListLen);
        }

        let indices = rlp
            .at(0)?
            .as_list::<u64>()?
            .into_iter()
            .map(|i| i as usize)
            .collect();
        let leaves = rlp.list_at::<Vec<u8>>(1)?;
        let hashes = rlp.list_at::<Vec<u8>>(2)?;
        let zero_levels = rlp.list_at::<u8>(3)?;

        Ok(Self {
            indices,
            leaves,
            hashes,
            zero_levels,
        })
    }
}

/// Encodes a compressed multiproof for transport or storage.
pub fn serialize_proof(proof: &CompressedMultiproof) -> Bytes {
    rlp::encode(proof).freeze()
}

/// Decodes a compressed multiproof produced by [`serialize_proof`].
pub fn deserialize_proof(bytes: &[u8]) -> MultiproofResult<CompressedMultiproof> {
    Ok(rlp::decode(bytes)?)
}
