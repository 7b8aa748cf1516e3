//! Splitting of contract bytecode into fixed-size chunks.
//!
//! Besides its bytes, every chunk records its *first usable offset* (FIO):
//! the number of leading bytes that are immediate data of a `PUSHn` started
//! in an earlier chunk. A verifier holding only some chunks needs it to know
//! where the first instruction of a chunk begins.

use std::fmt::{self, Display};

use bytes::Bytes;

const PUSH1: u8 = 0x60;
const PUSH32: u8 = 0x7f;

/// A fixed-size segment of contract bytecode.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Chunk {
    fio: usize,
    code: Bytes,
}

impl Chunk {
    /// Offset of the first byte in the chunk that is not push data.
    ///
    /// Equal to the chunk length when the whole chunk is push data.
    pub const fn fio(&self) -> usize {
        self.fio
    }

    /// The code bytes of the chunk. Only the last chunk of a contract may be
    /// shorter than the chunk size.
    pub const fn code(&self) -> &Bytes {
        &self.code
    }

    /// Number of code bytes in the chunk.
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// Returns `true` if the chunk holds no code.
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}

impl Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Chunk {{ fio: {}, code: 0x", self.fio)?;
        for b in self.code.iter() {
            write!(f, "{:02x}", b)?;
        }
        write!(f, " }}")
    }
}

/// Number of immediate bytes following `opcode`.
const fn push_size(opcode: u8) -> usize {
    match opcode {
        PUSH1..=PUSH32 => (opcode - PUSH1) as usize + 1,
        _ => 0,
    }
}

/// Splits `code` into `ceil(code.len() / chunk_size)` chunks and computes the
/// first usable offset of each one.
///
/// The chunks share the underlying buffer of `code`, no bytes are copied.
///
/// # Panics
/// Panics if `chunk_size` is `0`.
pub fn chunkify(code: &Bytes, chunk_size: usize) -> Vec<Chunk> {
    assert!(chunk_size > 0, "Chunk size must be non-zero!");

    let mut chunks = Vec::with_capacity(code.len().div_ceil(chunk_size));

    // Offset of the next byte that starts an instruction.
    let mut next_instr: usize = 0;

    for start in (0..code.len()).step_by(chunk_size) {
        let end = (start + chunk_size).min(code.len());
        let fio = next_instr.saturating_sub(start).min(end - start);

        while next_instr < end {
            next_instr += 1 + push_size(code[next_instr]);
        }

        chunks.push(Chunk {
            fio,
            code: code.slice(start..end),
        });
    }

    chunks
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use hex_literal::hex;

    use super::{chunkify, push_size};
    use crate::{constants::CHUNK_SIZE, testing_utils::code_with_push32_at};

    #[test]
    fn push_sizes_cover_push1_to_push32() {
        assert_eq!(push_size(0x5f), 0);
        assert_eq!(push_size(0x60), 1);
        assert_eq!(push_size(0x7f), 32);
        assert_eq!(push_size(0x80), 0);
    }

    #[test]
    fn empty_code_has_no_chunks() {
        assert!(chunkify(&Bytes::new(), CHUNK_SIZE).is_empty());
    }

    #[test]
    fn chunk_count_rounds_up() {
        let code = Bytes::from(vec![0; 65]);
        let chunks = chunkify(&code, CHUNK_SIZE);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 32);
        assert_eq!(chunks[1].len(), 32);
        assert_eq!(chunks[2].len(), 1);
    }

    #[test]
    fn chunks_reassemble_to_code() {
        let code = Bytes::copy_from_slice(&hex!(
            "608060405234801561001057600080fd5b50610150806100206000396000f3fe608060405234"
        ));
        let chunks = chunkify(&code, CHUNK_SIZE);
        let reassembled: Vec<u8> = chunks.iter().flat_map(|c| c.code().to_vec()).collect();

        assert_eq!(reassembled, code.to_vec());
    }

    #[test]
    fn push_data_inside_chunk_does_not_affect_next_fio() {
        // PUSH1 0x80 PUSH1 0x40 MSTORE
        let code = Bytes::copy_from_slice(&hex!("6080604052"));
        let chunks = chunkify(&code, CHUNK_SIZE);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].fio(), 0);
    }

    #[test]
    fn push_data_spilling_into_next_chunk_sets_fio() {
        let code = code_with_push32_at(30, 64);
        let chunks = chunkify(&code, CHUNK_SIZE);

        assert_eq!(chunks[0].fio(), 0);
        assert_eq!(chunks[1].fio(), 31);
    }

    #[test]
    fn push_data_covering_whole_chunk_caps_fio_at_chunk_len() {
        let code = code_with_push32_at(31, 70);
        let chunks = chunkify(&code, CHUNK_SIZE);

        assert_eq!(chunks[1].fio(), 32);
        assert_eq!(chunks[2].fio(), 0);
    }

    #[test]
    fn fio_of_short_last_chunk_is_capped_at_its_len() {
        let code = code_with_push32_at(31, 40);
        let chunks = chunkify(&code, CHUNK_SIZE);

        assert_eq!(chunks[1].len(), 8);
        assert_eq!(chunks[1].fio(), 8);
    }

    #[test]
    fn other_chunk_sizes_are_supported() {
        // PUSH2 0x0102 STOP
        let code = Bytes::copy_from_slice(&hex!("61010200"));
        let chunks = chunkify(&code, 2);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].fio(), 1);
    }

    #[test]
    #[should_panic]
    fn zero_chunk_size_panics() {
        chunkify(&Bytes::from_static(&[0]), 0);
    }
}
