//! Utilities for sizing witnesses of contract code committed to an SSZ code
//! trie.
//!
//! A contract's bytecode is split into 32-byte chunks which are merkleized
//! together with a small metadata container (see [`code_tree`] for the exact
//! layout). While a transaction executes, the tracer records which chunks were
//! read through [`Contract::touch_pc`][contract::Contract::touch_pc] and
//! [`Contract::touch_range`][contract::Contract::touch_range]. Afterwards the
//! touched chunks are translated into generalized tree indices and proven
//! with a single compressed multiproof, whose size is what a stateless client
//! would have to download for the code.
//!
//! [`ContractBag`][contract_bag::ContractBag] deduplicates contracts by code
//! hash over a block and aggregates their proof sizes into
//! [`CMStats`][contract_bag::CMStats].

#![deny(rustdoc::broken_intra_doc_links)]
#![deny(missing_debug_implementations)]
#![deny(missing_docs)]

pub mod chunk;
pub mod code_tree;
pub mod constants;
pub mod contract;
pub mod contract_bag;
pub mod multiproof;
pub mod proof_stats;
pub mod tree;

#[cfg(test)]
pub(crate) mod testing_utils;
