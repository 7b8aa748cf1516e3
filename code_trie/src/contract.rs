//! Tracking of the code chunks a contract execution touched, and proving
//! them.

use std::collections::BTreeSet;

use bytes::Bytes;
use ethereum_types::H256;
use log::{debug, trace};
use thiserror::Error;

use crate::{
    chunk::{chunkify, Chunk},
    code_tree::{chunk_code_index, chunk_fio_index, code_tree_from_chunks},
    constants::{CHUNK_SIZE, METADATA_INDICES},
    multiproof::CompressedMultiproof,
    proof_stats::ProofStats,
    tree::{Node, TreeError},
};

/// The output type of contract operations.
pub type ContractResult<T> = Result<T, ContractError>;

/// Errors that may occur while tracking or proving a contract's code.
#[derive(Clone, Debug, Eq, Error, Hash, PartialEq)]
pub enum ContractError {
    /// A program counter (or range end) outside of the bytecode.
    #[error("PC {pc} to touch exceeds bytecode length {code_len}")]
    OutOfRange {
        /// The offending program counter.
        pc: usize,
        /// Length of the contract's code.
        code_len: usize,
    },

    /// A range whose start is not before its end.
    #[error("Invalid range to touch: from {from} to {to}")]
    InvalidRange {
        /// Start of the range.
        from: usize,
        /// End of the range.
        to: usize,
    },

    /// Building the code trie or proving it failed.
    #[error("Failed to construct code proof: {0}")]
    ProofConstructionFailed(#[from] TreeError),
}

/// A contract's code along with the chunks of it touched so far.
#[derive(Clone, Debug)]
pub struct Contract {
    code: Bytes,
    chunks: Vec<Chunk>,

    /// Invariant: every index is `< chunks.len()`.
    touched_chunks: BTreeSet<usize>,
}

impl Contract {
    /// Chunks `code` and creates a contract with no touched chunks.
    pub fn new<C: Into<Bytes>>(code: C) -> Self {
        let code = code.into();
        let chunks = chunkify(&code, CHUNK_SIZE);

        Self {
            code,
            chunks,
            touched_chunks: BTreeSet::new(),
        }
    }

    /// The contract's bytecode.
    pub const fn code(&self) -> &Bytes {
        &self.code
    }

    /// The chunks of the bytecode.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Indices of the touched chunks, in ascending order.
    pub fn touched_chunks(&self) -> impl Iterator<Item = usize> + '_ {
        self.touched_chunks.iter().copied()
    }

    /// Length of the bytecode.
    pub fn code_size(&self) -> usize {
        self.code.len()
    }

    /// Marks the chunk containing `pc` as touched.
    pub fn touch_pc(&mut self, pc: usize) -> ContractResult<()> {
        if pc >= self.code.len() {
            return Err(ContractError::OutOfRange {
                pc,
                code_len: self.code.len(),
            });
        }

        let chunk_idx = pc / CHUNK_SIZE;
        trace!("Touching chunk {} (pc: {})", chunk_idx, pc);
        self.touched_chunks.insert(chunk_idx);

        Ok(())
    }

    /// Marks every chunk from the one containing `from` up to and including
    /// the one containing `to` as touched.
    ///
    /// Note that `to` itself is treated as touched, so a range ending exactly
    /// on a chunk boundary also touches the chunk starting there.
    pub fn touch_range(&mut self, from: usize, to: usize) -> ContractResult<()> {
        if from >= to {
            return Err(ContractError::InvalidRange { from, to });
        }
        if to >= self.code.len() {
            return Err(ContractError::OutOfRange {
                pc: to,
                code_len: self.code.len(),
            });
        }

        let chunk_range = from / CHUNK_SIZE..=to / CHUNK_SIZE;
        trace!("Touching chunks {:?} (pcs: {}..={})", chunk_range, from, to);
        self.touched_chunks.extend(chunk_range);

        Ok(())
    }

    /// Generalized indices requested by [`Self::prove`]: the metadata fields
    /// followed by both children of every touched chunk.
    pub fn proof_indices(&self) -> Vec<usize> {
        METADATA_INDICES
            .into_iter()
            .chain(
                self.touched_chunks
                    .iter()
                    .flat_map(|k| [chunk_fio_index(*k), chunk_code_index(*k)]),
            )
            .collect()
    }

    /// Root of the contract's code trie.
    pub fn code_root(&self) -> ContractResult<H256> {
        Ok(self.code_tree()?.hash())
    }

    /// Builds the code trie and creates a compressed multiproof of the
    /// metadata and the touched chunks.
    pub fn prove(&self) -> ContractResult<CompressedMultiproof> {
        let tree = self.code_tree()?;
        let indices = self.proof_indices();

        debug!(
            "Proving {} of {} chunks ({} indices) of a {} byte contract",
            self.touched_chunks.len(),
            self.chunks.len(),
            indices.len(),
            self.code.len()
        );

        Ok(tree.prove_multi(&indices)?.compress())
    }

    /// Estimated wire size of the compressed proof in bytes.
    pub fn proof_size(&self) -> ContractResult<usize> {
        Ok(self.proof_stats()?.sum())
    }

    /// Estimated wire size of the compressed proof, broken down by category.
    pub fn proof_stats(&self) -> ContractResult<ProofStats> {
        Ok(ProofStats::from(&self.prove()?))
    }

    fn code_tree(&self) -> ContractResult<Node> {
        Ok(code_tree_from_chunks(&self.code, &self.chunks)?)
    }
}
