use bytes::Bytes;
pub use keccak_hash::keccak as k;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// A transaction trace: the code it ran and the PCs it executed, with
/// `(from, to)` ranges for `CODECOPY`-style reads.
pub struct Txn {
    pub code: Bytes,
    pub pcs: Vec<usize>,
    pub ranges: Vec<(usize, usize)>,
}

/// Random contracts, some of which are called more than once.
pub fn block(seed: u64, num_txns: usize, num_contracts: usize) -> Vec<Txn> {
    let mut rng = StdRng::seed_from_u64(seed);
    let codes: Vec<Bytes> = (0..num_contracts)
        .map(|_| {
            let len = rng.gen_range(64..8192);
            (0..len).map(|_| rng.gen::<u8>()).collect::<Vec<_>>().into()
        })
        .collect();

    (0..num_txns)
        .map(|_| {
            let code = codes[rng.gen_range(0..codes.len())].clone();
            let pcs = (0..rng.gen_range(1..64))
                .map(|_| rng.gen_range(0..code.len()))
                .collect();
            let ranges = (0..rng.gen_range(0..3))
                .map(|_| {
                    let from = rng.gen_range(0..code.len() - 1);
                    (from, rng.gen_range(from + 1..code.len()))
                })
                .collect();

            Txn { code, pcs, ranges }
        })
        .collect()
}
