//! Protocol constants of the code trie layout.
//!
//! All generalized indices below follow the SSZ convention: the root has
//! index `1` and the children of node `g` are `2g` and `2g + 1`.

/// Size in bytes of a code chunk. Each chunk's code is stored in a single
/// 32-byte leaf.
pub const CHUNK_SIZE: usize = 32;

/// Version written into the metadata container.
pub const CODE_TRIE_VERSION: u64 = 0;

/// Number of levels of the metadata container subtree (3 fields padded to 4).
pub const METADATA_DEPTH: usize = 2;

/// Maximum number of chunks the chunk list can hold.
pub const MAX_CHUNKS: usize = 1 << CHUNK_LIST_DEPTH;

/// Number of levels between the chunk list's data root and the chunk nodes.
pub const CHUNK_LIST_DEPTH: usize = 10;

/// Generalized index of the chunk list's data root.
pub const CHUNK_LIST_DATA_INDEX: usize = 6;

/// Generalized index of the chunk count mixed into the chunk list.
pub const CHUNK_LIST_LENGTH_INDEX: usize = 7;

/// Generalized index of the metadata `version` field.
pub const METADATA_VERSION_INDEX: usize = 8;

/// Generalized index of the metadata `code_hash` field.
pub const METADATA_CODE_HASH_INDEX: usize = 9;

/// Generalized index of the metadata `code_length` field.
pub const METADATA_CODE_LENGTH_INDEX: usize = 10;

/// Indices included in every code proof regardless of which chunks were
/// touched: the chunk count followed by the metadata fields.
pub const METADATA_INDICES: [usize; 4] = [
    CHUNK_LIST_LENGTH_INDEX,
    METADATA_VERSION_INDEX,
    METADATA_CODE_HASH_INDEX,
    METADATA_CODE_LENGTH_INDEX,
];

/// Generalized index of the node of the first chunk. Chunk `k` lives at
/// `BASE_CHUNK_TREE_INDEX + k`.
pub const BASE_CHUNK_TREE_INDEX: usize = 6144;

/// Bytes charged per proof index (indices fit in a `u16`).
pub const INDEX_BYTES: usize = 2;

/// Bytes charged per zero level marker (levels fit in a `u8`).
pub const ZERO_LEVEL_BYTES: usize = 1;
