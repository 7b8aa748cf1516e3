use bytes::Bytes;
use rand::{rngs::StdRng, Rng, SeedableRng};

pub(crate) fn common_setup() {
    // Try init since multiple tests calling `init` will cause an error.
    let _ = pretty_env_logger::try_init();
}

/// Code made only of `STOP`s, so every chunk has a FIO of `0`.
pub(crate) fn stop_code(len: usize) -> Bytes {
    vec![0; len].into()
}

/// `STOP`s with a single `PUSH32` at `offset`.
pub(crate) fn code_with_push32_at(offset: usize, len: usize) -> Bytes {
    let mut code = vec![0; len];
    code[offset] = 0x7f;

    code.into()
}

/// Random bytes, so about an eighth of them are `PUSHn` opcodes.
pub(crate) fn random_code(len: usize, seed: u64) -> Bytes {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen::<u8>()).collect::<Vec<_>>().into()
}
