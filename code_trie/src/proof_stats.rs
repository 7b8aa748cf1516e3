//! Byte-cost breakdown of compressed code proofs.

use std::{
    fmt::{self, Display},
    iter::Sum,
    ops::AddAssign,
};

use serde::{Deserialize, Serialize};

use crate::{
    constants::{INDEX_BYTES, ZERO_LEVEL_BYTES},
    multiproof::CompressedMultiproof,
};

/// Estimated wire size of one or more compressed multiproofs, split by the
/// part of the proof the bytes are spent on.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct ProofStats {
    /// Bytes spent on generalized indices.
    pub indices: usize,
    /// Bytes spent on zero level markers.
    pub zero_levels: usize,
    /// Bytes spent on helper hashes.
    pub hashes: usize,
    /// Bytes spent on proven leaf values.
    pub leaves: usize,
}

impl ProofStats {
    /// Adds the counters of `other` to `self`.
    pub fn add(&mut self, other: &ProofStats) {
        self.indices += other.indices;
        self.zero_levels += other.zero_levels;
        self.hashes += other.hashes;
        self.leaves += other.leaves;
    }

    /// Total number of bytes.
    pub const fn sum(&self) -> usize {
        self.indices + self.zero_levels + self.hashes + self.leaves
    }
}

impl From<&CompressedMultiproof> for ProofStats {
    fn from(p: &CompressedMultiproof) -> Self {
        Self {
            indices: p.indices.len() * INDEX_BYTES,
            zero_levels: p.zero_levels.len() * ZERO_LEVEL_BYTES,
            hashes: p.hashes.iter().map(Vec::len).sum(),
            leaves: p.leaves.iter().map(Vec::len).sum(),
        }
    }
}

impl AddAssign<&ProofStats> for ProofStats {
    fn add_assign(&mut self, rhs: &ProofStats) {
        self.add(rhs);
    }
}

impl Sum for ProofStats {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |mut acc, s| {
            acc += &s;
            acc
        })
    }
}

impl Display for ProofStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.sum();

        Self::write_category(f, "Indices", self.indices, total)?;
        Self::write_category(f, "Zero levels", self.zero_levels, total)?;
        Self::write_category(f, "Hashes", self.hashes, total)?;
        Self::write_category(f, "Leaves", self.leaves, total)?;
        writeln!(f, "Total: {}", total)
    }
}

impl ProofStats {
    fn write_category(
        f: &mut fmt::Formatter<'_>,
        name: &str,
        bytes: usize,
        total: usize,
    ) -> fmt::Result {
        let perc = match total {
            0 => 0.0,
            _ => (bytes as f32 / total as f32) * 100.0,
        };
        writeln!(f, "{}: {} ({:.2}%)", name, bytes, perc)
    }
}
