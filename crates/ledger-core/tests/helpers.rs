#![allow(dead_code)]

use ledger_core::{Block, Chain, Transaction};

pub fn transfer(from: &str, to: &str, amount: u64) -> Transaction {
    Transaction::transfer(from, to, amount)
}

/// The three sample blocks every demo run mines, in order.
pub fn sample_payloads() -> Vec<Vec<Transaction>> {
    vec![
        vec![transfer("Alice", "Bob", 50), transfer("John", "Karen", 30)],
        vec![transfer("Charlie", "Dana", 75)],
        vec![transfer("Eve", "Frank", 20), transfer("Gina", "Hank", 10)],
    ]
}

pub fn unmined(index: u64, transactions: Vec<Transaction>) -> Block {
    Block::new(index, ledger_core::timestamp_now(), transactions, "").expect("build block")
}

/// A difficulty-3 chain with the sample payloads appended.
pub fn sample_chain() -> Chain {
    let mut chain = Chain::new(3);
    for (i, txs) in sample_payloads().into_iter().enumerate() {
        chain
            .add_block(unmined(i as u64 + 1, txs))
            .expect("append block");
    }
    chain
}

/// Swap the block at `position` for `replacement`, keeping the rest untouched.
pub fn replace_block(chain: Chain, position: usize, replacement: Block) -> Chain {
    let difficulty = chain.difficulty();
    let mut blocks = chain.into_blocks();
    blocks[position] = replacement;
    Chain::from_blocks(blocks, difficulty).expect("rebuild chain")
}

/// Same block, different transactions, stale hash.
pub fn with_transactions(block: &Block, transactions: Vec<Transaction>) -> Block {
    Block::from_parts(
        block.index(),
        block.timestamp(),
        transactions,
        block.previous_hash(),
        block.nonce(),
        block.hash(),
    )
}
