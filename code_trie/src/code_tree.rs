//! Merkleization of a contract's code into its code trie.
//!
//! ```text
//! root (1)
//! ├── metadata (2)
//! │   ├── version      (8)
//! │   ├── code hash    (9)
//! │   ├── code length  (10)
//! │   └── padding      (11)
//! └── chunk list (3)
//!     ├── chunk data (6)
//!     │   └── chunk k  (6144 + k)
//!     │       ├── fio  ((6144 + k) * 2)
//!     │       └── code ((6144 + k) * 2 + 1)
//!     └── chunk count (7)
//! ```
//!
//! The chunk list holds at most [`MAX_CHUNKS`] chunks. A chunk's code leaf is
//! its bytes right-padded with zeros to 32 bytes.

use bytes::Bytes;
use ethereum_types::H256;
use keccak_hash::keccak;

use crate::{
    chunk::{chunkify, Chunk},
    constants::{
        BASE_CHUNK_TREE_INDEX, CHUNK_LIST_DEPTH, CHUNK_SIZE, CODE_TRIE_VERSION, MAX_CHUNKS,
        METADATA_DEPTH,
    },
    tree::{leaf_from_u64, merkleize, Node, TreeError, TreeResult},
};

/// Generalized index of the node of chunk `chunk_idx`.
pub const fn chunk_node_index(chunk_idx: usize) -> usize {
    BASE_CHUNK_TREE_INDEX + chunk_idx
}

/// Generalized index of the first usable offset leaf of chunk `chunk_idx`.
pub const fn chunk_fio_index(chunk_idx: usize) -> usize {
    chunk_node_index(chunk_idx) * 2
}

/// Generalized index of the code leaf of chunk `chunk_idx`.
pub const fn chunk_code_index(chunk_idx: usize) -> usize {
    chunk_node_index(chunk_idx) * 2 + 1
}

/// Chunks `code` and builds its code trie.
///
/// Only [`CHUNK_SIZE`] is supported since a chunk's code has to fit in one
/// leaf.
pub fn build_code_tree(code: &Bytes, chunk_size: usize) -> TreeResult<Node> {
    if chunk_size != CHUNK_SIZE {
        return Err(TreeError::UnsupportedChunkSize(chunk_size));
    }

    code_tree_from_chunks(code, &chunkify(code, chunk_size))
}

/// Builds the code trie of `code` from its already computed chunks.
pub(crate) fn code_tree_from_chunks(code: &[u8], chunks: &[Chunk]) -> TreeResult<Node> {
    if chunks.len() > MAX_CHUNKS {
        return Err(TreeError::TooManyLeaves {
            count: chunks.len(),
            limit: MAX_CHUNKS,
        });
    }

    let metadata = metadata_node(code)?;

    let chunk_nodes = chunks.iter().map(chunk_node).collect::<TreeResult<_>>()?;
    let chunk_list = Node::branch(
        merkleize(chunk_nodes, CHUNK_LIST_DEPTH)?,
        Node::leaf(leaf_from_u64(chunks.len() as u64)),
    );

    Ok(Node::branch(metadata, chunk_list))
}

fn metadata_node(code: &[u8]) -> TreeResult<Node> {
    let code_len = u16::try_from(code.len()).map_err(|_| TreeError::CodeTooLong(code.len()))?;

    merkleize(
        vec![
            Node::leaf(leaf_from_u64(CODE_TRIE_VERSION)),
            Node::leaf(keccak(code)),
            Node::leaf(leaf_from_u64(code_len.into())),
        ],
        METADATA_DEPTH,
    )
}

fn chunk_node(chunk: &Chunk) -> TreeResult<Node> {
    if chunk.len() > CHUNK_SIZE {
        return Err(TreeError::UnsupportedChunkSize(chunk.len()));
    }

    let mut code = [0; 32];
    code[..chunk.len()].copy_from_slice(chunk.code());

    Ok(Node::branch(
        Node::leaf(leaf_from_u64(chunk.fio() as u64)),
        Node::leaf(H256::from(code)),
    ))
}
