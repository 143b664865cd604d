use crate::{
    constants::{MAX_DIFFICULTY, MIN_DIFFICULTY},
    error::{ChainViolation, LedgerError, Result},
    pow::MiningStrategy,
    timestamp_now, Block, Transaction,
};
use serde::Serialize;
use tracing::{debug, warn};

/// In-memory, append-only sequence of blocks rooted at a genesis block.
#[derive(Clone, Debug, Serialize)]
pub struct Chain {
    difficulty: u32,
    blocks: Vec<Block>,
    #[serde(skip)]
    strategy: MiningStrategy,
}

impl Chain {
    /// Start a chain holding only a fresh genesis block.
    ///
    /// `difficulty` is raised to [`MIN_DIFFICULTY`] and capped at [`MAX_DIFFICULTY`].
    pub fn new(difficulty: u32) -> Self {
        let chain = Self {
            difficulty: clamp_difficulty(difficulty),
            blocks: vec![genesis_block()],
            strategy: MiningStrategy::default(),
        };
        debug!(
            requested = difficulty,
            difficulty = chain.difficulty,
            "chain created"
        );
        chain
    }

    /// Rebuild a chain from existing blocks. Nothing is verified here;
    /// call [`Chain::validate`] to find out whether the blocks hold together.
    pub fn from_blocks(blocks: Vec<Block>, difficulty: u32) -> Result<Self> {
        if blocks.is_empty() {
            return Err(LedgerError::EmptyChain);
        }
        Ok(Self {
            difficulty: clamp_difficulty(difficulty),
            blocks,
            strategy: MiningStrategy::default(),
        })
    }

    pub fn with_strategy(mut self, strategy: MiningStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn latest_block(&self) -> &Block {
        self.blocks
            .last()
            .expect("chain always holds its genesis block")
    }

    /// Link `candidate` to the current tip, mine it and append it.
    ///
    /// The candidate's index must be exactly one past the tip's. Its
    /// previous hash and nonce are overwritten. On error the chain is unchanged.
    pub fn add_block(&mut self, candidate: Block) -> Result<()> {
        let latest = self.latest_block();
        let expected = latest.index() + 1;
        if candidate.index() != expected {
            return Err(LedgerError::NonContiguousIndex {
                expected,
                found: candidate.index(),
            });
        }
        let linked = candidate.relink(latest.hash())?;
        let mined = self.strategy.mine(linked, self.difficulty)?;
        self.push_mined(mined);
        Ok(())
    }

    /// Build the next block for `transactions`, stamped with the current time.
    pub fn candidate(&self, transactions: Vec<Transaction>) -> Result<Block> {
        let latest = self.latest_block();
        Block::new(
            latest.index() + 1,
            timestamp_now(),
            transactions,
            latest.hash(),
        )
    }

    pub(crate) fn push_mined(&mut self, block: Block) {
        debug!(
            index = block.index(),
            nonce = block.nonce(),
            height = self.blocks.len(),
            "block appended"
        );
        self.blocks.push(block);
    }

    /// Check every block against its stored hash and its predecessor.
    ///
    /// Stops at the first violation. The genesis block is only checked for
    /// self-consistency since it has no predecessor.
    pub fn validate(&self) -> std::result::Result<(), ChainViolation> {
        if let Some(genesis) = self.blocks.first() {
            check_hash(0, genesis)?;
        }
        for (offset, pair) in self.blocks.windows(2).enumerate() {
            let position = offset + 1;
            let (previous, current) = (&pair[0], &pair[1]);
            check_hash(position, current)?;
            if current.previous_hash() != previous.hash() {
                return Err(ChainViolation::BrokenLink { position });
            }
        }
        Ok(())
    }

    pub fn is_chain_valid(&self) -> bool {
        match self.validate() {
            Ok(()) => true,
            Err(violation) => {
                warn!(%violation, "chain failed validation");
                false
            }
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Never true once constructed: the genesis block is always present.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn strategy(&self) -> MiningStrategy {
        self.strategy
    }
}

/// A genesis block stamped with the current time. It is never mined.
pub fn genesis_block() -> Block {
    Block::genesis(timestamp_now())
}

fn clamp_difficulty(difficulty: u32) -> u32 {
    difficulty.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
}

fn check_hash(position: usize, block: &Block) -> std::result::Result<(), ChainViolation> {
    match block.has_valid_hash() {
        Ok(true) => Ok(()),
        Ok(false) => Err(ChainViolation::HashMismatch { position }),
        Err(_) => Err(ChainViolation::Unhashable { position }),
    }
}
