//! A deduplicated set of the contracts touched while executing a block.

use std::{
    collections::{hash_map::Entry, HashMap},
    fmt::{self, Display},
    sync::Arc,
};

use ethereum_types::H256;
use log::{debug, trace};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::{
    contract::{Contract, ContractResult},
    proof_stats::ProofStats,
};

/// A handle to a contract in a [`ContractBag`]. Every handle obtained for
/// the same code refers to the same contract.
pub type ContractRef = Arc<RwLock<Contract>>;

/// A [`ContractBag`] shared between the threads executing a block.
pub type SharedContractBag = Arc<Mutex<ContractBag>>;

/// Contracts keyed by the keccak hash of their code.
#[derive(Debug, Default)]
pub struct ContractBag {
    contracts: HashMap<H256, ContractRef>,
}

impl ContractBag {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the contract registered under `code_hash`, creating it from
    /// `code` on first access.
    ///
    /// `code` is ignored once the hash is registered and is not checked
    /// against `code_hash`. Touches through any returned handle are visible
    /// through all of them.
    pub fn get(&mut self, code_hash: H256, code: &[u8]) -> ContractRef {
        match self.contracts.entry(code_hash) {
            Entry::Occupied(e) => e.get().clone(),
            Entry::Vacant(e) => {
                trace!(
                    "Adding contract {:x} ({} bytes) to bag",
                    code_hash,
                    code.len()
                );
                e.insert(Arc::new(RwLock::new(Contract::new(code.to_vec()))))
                    .clone()
            }
        }
    }

    /// Whether a contract with this code hash is in the bag.
    pub fn contains(&self, code_hash: &H256) -> bool {
        self.contracts.contains_key(code_hash)
    }

    /// Number of distinct contracts.
    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    /// Whether no contract was added yet.
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// Iterates over the contracts and their code hashes, in no particular
    /// order.
    pub fn iter(&self) -> impl Iterator<Item = (&H256, &ContractRef)> {
        self.contracts.iter()
    }

    /// Total estimated size of the proofs of all contracts.
    pub fn proof_size(&self) -> ContractResult<usize> {
        self.contracts
            .values()
            .map(|c| c.read().proof_size())
            .sum()
    }

    /// Total length of the code of all contracts.
    pub fn code_size(&self) -> usize {
        self.contracts.values().map(|c| c.read().code_size()).sum()
    }

    /// Aggregates the proof and code sizes of every contract.
    ///
    /// Fails on the first contract that cannot be proven.
    pub fn stats(&self) -> ContractResult<CMStats> {
        let mut stats = CMStats {
            num_contracts: self.contracts.len(),
            ..Default::default()
        };

        for contract in self.contracts.values() {
            let contract = contract.read();
            let proof_stats = contract.proof_stats()?;

            stats.proof_size += proof_stats.sum();
            stats.code_size += contract.code_size();
            stats.proof_stats += &proof_stats;
        }

        debug!(
            "Bag of {} contracts: {} bytes of proofs for {} bytes of code",
            stats.num_contracts, stats.proof_size, stats.code_size
        );

        Ok(stats)
    }
}

/// Code and proof sizes of all contracts of a [`ContractBag`].
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct CMStats {
    /// Number of distinct contracts.
    pub num_contracts: usize,
    /// Total estimated proof size in bytes.
    pub proof_size: usize,
    /// Total code length in bytes.
    pub code_size: usize,
    /// Breakdown of `proof_size`.
    pub proof_stats: ProofStats,
}

impl Display for CMStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Contracts: {}", self.num_contracts)?;
        writeln!(f, "Code size: {}", self.code_size)?;
        writeln!(f, "Proof size: {}", self.proof_size)?;
        write!(f, "{}", self.proof_stats)
    }
}
