//! Proof-of-work search.
//!
//! A block's target is `difficulty` leading zero hex characters, i.e. zero
//! nibbles at the front of the raw digest. Every search hashes a prefix that
//! is fixed for the block and only varies the trailing nonce.

use crate::{
    block::{hash_with_nonce, Block},
    constants::MAX_DIFFICULTY,
    error::{LedgerError, Result},
    Hash,
};
use rayon::prelude::*;
use sha2::Sha256;
use tracing::info;

/// How a chain searches for nonces when it appends a block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MiningStrategy {
    /// One thread, nonces counted up from the block's current nonce.
    #[default]
    Sequential,
    /// Nonce space split across the rayon pool; first hit wins.
    Parallel,
    /// Sequential, giving up after `max_attempts` hashes.
    Bounded { max_attempts: u64 },
}

impl MiningStrategy {
    pub fn mine(self, block: Block, difficulty: u32) -> Result<Block> {
        match self {
            MiningStrategy::Sequential => mine(block, difficulty),
            MiningStrategy::Parallel => mine_parallel(block, difficulty),
            MiningStrategy::Bounded { max_attempts } => mine_bounded(block, difficulty, max_attempts),
        }
    }
}

pub fn count_leading_zero_nibbles(hash: &[u8]) -> u32 {
    let mut total = 0u32;
    for b in hash {
        if *b == 0 {
            total += 2;
        } else {
            if *b < 0x10 {
                total += 1;
            }
            break;
        }
    }
    total
}

pub fn meets_target(hash: &Hash, difficulty: u32) -> bool {
    count_leading_zero_nibbles(hash) >= difficulty.min(MAX_DIFFICULTY)
}

/// Mine the block by trying nonces upward from its current one until the
/// hash has at least `difficulty` leading zero hex characters.
///
/// The current nonce is tried first, so an already-sealed block comes back as is.
pub fn mine(block: Block, difficulty: u32) -> Result<Block> {
    mine_bounded(block, difficulty, u64::MAX)
}

/// Like [`mine`], but fails with [`LedgerError::NonceSpaceExhausted`] after
/// `max_attempts` hashes. The caller keeps nothing from a failed run.
pub fn mine_bounded(block: Block, difficulty: u32, max_attempts: u64) -> Result<Block> {
    let prefix = block.prefix_hasher()?;
    match search(&prefix, block.nonce(), difficulty, max_attempts) {
        Some((nonce, hash, attempts)) => {
            info!(
                index = block.index(),
                nonce,
                attempts,
                hash = %hex::encode(hash),
                "block mined"
            );
            Ok(block.with_seal(nonce, &hash))
        }
        None => Err(LedgerError::NonceSpaceExhausted {
            attempts: max_attempts,
        }),
    }
}

/// Mine the block by searching nonces in parallel.
///
/// Workers only read the shared prefix hasher, so the winning nonce is
/// whichever one any worker finds first, not necessarily the smallest.
pub fn mine_parallel(block: Block, difficulty: u32) -> Result<Block> {
    let prefix = block.prefix_hasher()?;
    let start = block.nonce();

    let found = (start..u64::MAX)
        .into_par_iter()
        .find_any(|nonce| meets_target(&hash_with_nonce(&prefix, *nonce), difficulty));

    match found {
        Some(nonce) => {
            let hash = hash_with_nonce(&prefix, nonce);
            info!(
                index = block.index(),
                nonce,
                hash = %hex::encode(hash),
                "block mined in parallel"
            );
            Ok(block.with_seal(nonce, &hash))
        }
        None => Err(LedgerError::NonceSpaceExhausted {
            attempts: u64::MAX - start,
        }),
    }
}

/// Returns `(nonce, hash, attempts)` for the first satisfying nonce.
fn search(prefix: &Sha256, start: u64, difficulty: u32, max_attempts: u64) -> Option<(u64, Hash, u64)> {
    let mut nonce = start;
    let mut attempts = 0u64;
    while attempts < max_attempts {
        let hash = hash_with_nonce(prefix, nonce);
        attempts += 1;
        if meets_target(&hash, difficulty) {
            return Some((nonce, hash, attempts));
        }
        nonce = nonce.wrapping_add(1);
    }
    None
}
