use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// The transaction payload could not be rendered into canonical bytes.
    #[error("failed to serialize block payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("block index {found} does not follow the chain tip (expected {expected})")]
    NonContiguousIndex { expected: u64, found: u64 },

    /// A bounded mining run gave up. The block was not appended and may be retried.
    #[error("no nonce satisfied the target within {attempts} attempts")]
    NonceSpaceExhausted { attempts: u64 },

    #[error("a chain needs at least a genesis block")]
    EmptyChain,

    #[error("chain lock poisoned by a panicked writer")]
    LockPoisoned,
}

/// Why a chain failed validation. `position` is the offset into the block list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainViolation {
    #[error("block at position {position} has a stored hash that does not match its contents")]
    HashMismatch { position: usize },

    #[error("block at position {position} does not reference its predecessor's hash")]
    BrokenLink { position: usize },

    #[error("block at position {position} could not be re-hashed")]
    Unhashable { position: usize },
}
