use crate::{
    error::{LedgerError, Result},
    timestamp_now, Block, Chain, Transaction,
};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// A chain that several producer threads can append to.
///
/// Mining runs without holding the lock. A block is only committed if the tip
/// it was mined against is still the tip; otherwise it is relinked and mined again.
#[derive(Clone, Debug)]
pub struct SharedChain {
    inner: Arc<RwLock<Chain>>,
}

impl SharedChain {
    pub fn new(chain: Chain) -> Self {
        Self {
            inner: Arc::new(RwLock::new(chain)),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Chain>> {
        self.inner.read().map_err(|_| LedgerError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Chain>> {
        self.inner.write().map_err(|_| LedgerError::LockPoisoned)
    }

    /// Mine `transactions` into the next block and append it. Returns the
    /// committed block.
    pub fn append(&self, transactions: Vec<Transaction>) -> Result<Block> {
        let timestamp = timestamp_now();
        let mut retries = 0u32;
        loop {
            let (candidate, difficulty, strategy) = {
                let chain = self.read()?;
                let latest = chain.latest_block();
                let candidate = Block::new(
                    latest.index() + 1,
                    timestamp.clone(),
                    transactions.clone(),
                    latest.hash(),
                )?;
                (candidate, chain.difficulty(), chain.strategy())
            };

            let mined = strategy.mine(candidate, difficulty)?;

            let mut chain = self.write()?;
            if chain.latest_block().hash() == mined.previous_hash() {
                chain.push_mined(mined.clone());
                return Ok(mined);
            }
            retries += 1;
            debug!(index = mined.index(), retries, "tip moved while mining, retrying");
        }
    }

    /// Validates under the read lock, so no append can land mid-scan.
    pub fn is_chain_valid(&self) -> Result<bool> {
        Ok(self.read()?.is_chain_valid())
    }

    pub fn latest_block(&self) -> Result<Block> {
        Ok(self.read()?.latest_block().clone())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    pub fn snapshot(&self) -> Result<Chain> {
        Ok(self.read()?.clone())
    }
}
