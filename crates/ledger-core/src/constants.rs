pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
/// Weakest proof-of-work a chain accepts; lower requests are raised to this.
pub const MIN_DIFFICULTY: u32 = 3;
/// A digest has no more hex characters than this, so no target can ask for more.
pub const MAX_DIFFICULTY: u32 = HASH_HEX_SIZE as u32;
pub const GENESIS_INDEX: u64 = 0;
pub const GENESIS_PREVIOUS_HASH: &str = "0";
pub const GENESIS_INFO: &str = "Genesis Block";
