use ahash::RandomState;

/// Hash state seeded with constants.
///
/// ahash is built without `runtime-rng`, so `RandomState` cannot be
/// constructed through `Default`. Fixed seeds also keep hashing deterministic
/// across runs.
pub const HASH_RANDOM_STATE: RandomState = RandomState::with_seeds(0, 0, 0, 0);
