//! Benchmarks aggregating the code proof sizes of a block's worth of
//! contracts, each touched at random.

use code_trie::contract_bag::ContractBag;
use criterion::{criterion_group, criterion_main, Criterion};
use keccak_hash::keccak;
use rand::{rngs::StdRng, Rng, SeedableRng};

fn touched_bag(num_contracts: usize, touches: usize) -> ContractBag {
    let mut rng = StdRng::seed_from_u64(0);
    let mut bag = ContractBag::new();

    for _ in 0..num_contracts {
        let code: Vec<u8> = (0..rng.gen_range(1024..24576)).map(|_| rng.gen()).collect();
        let contract = bag.get(keccak(&code), &code);
        let mut contract = contract.write();
        for _ in 0..touches {
            contract.touch_pc(rng.gen_range(0..code.len())).unwrap();
        }
    }

    bag
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("Bag stats");

    for num_contracts in [1, 16, 128] {
        let bag = touched_bag(num_contracts, 64);
        group.bench_function(format!("{num_contracts} contracts"), |b| {
            b.iter(|| bag.stats().unwrap())
        });
    }

    group.finish()
}

criterion_group!(
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = criterion_benchmark);
criterion_main!(benches);
