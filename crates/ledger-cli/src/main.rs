use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use ledger_core::{timestamp_now, Block, Chain, MiningStrategy, Transaction};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "Drive the proof-of-work ledger: mine blocks, validate, tamper")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mine three sample blocks, print the chain, then tamper with block #1
    Demo {
        #[command(flatten)]
        mining: MiningArgs,
        /// Amount written into block #1's first transaction when tampering
        #[arg(long, default_value_t = 9999)]
        tamper_amount: u64,
        /// Print the chain as single-line JSON
        #[arg(long)]
        compact: bool,
    },
    /// Mine a single transfer on top of a fresh genesis block
    Mine {
        #[command(flatten)]
        mining: MiningArgs,
        /// Sender
        #[arg(long)]
        from: String,
        /// Recipient
        #[arg(long)]
        to: String,
        /// Amount
        #[arg(long)]
        amount: u64,
    },
}

#[derive(Args, Debug)]
struct MiningArgs {
    /// Leading zero hex characters required; values below 3 are raised to 3
    #[arg(long, default_value_t = 3)]
    difficulty: u32,
    /// Nonce search strategy
    #[arg(long, value_enum, default_value_t = Strategy::Sequential)]
    strategy: Strategy,
    /// Attempt budget per block for the bounded strategy
    #[arg(long, default_value_t = 10_000_000)]
    max_attempts: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Strategy {
    Sequential,
    Parallel,
    Bounded,
}

impl MiningArgs {
    fn chain(&self) -> Chain {
        let strategy = match self.strategy {
            Strategy::Sequential => MiningStrategy::Sequential,
            Strategy::Parallel => MiningStrategy::Parallel,
            Strategy::Bounded => MiningStrategy::Bounded {
                max_attempts: self.max_attempts,
            },
        };
        Chain::new(self.difficulty).with_strategy(strategy)
    }
}

fn sample_payloads() -> Vec<Vec<Transaction>> {
    vec![
        vec![
            Transaction::transfer("Alice", "Bob", 50),
            Transaction::transfer("John", "Karen", 30),
        ],
        vec![Transaction::transfer("Charlie", "Dana", 75)],
        vec![
            Transaction::transfer("Eve", "Frank", 20),
            Transaction::transfer("Gina", "Hank", 10),
        ],
    ]
}

/// Rewrite the first transfer in block #1 while keeping its mined hash.
fn tamper(chain: Chain, amount: u64) -> Result<Chain> {
    let difficulty = chain.difficulty();
    let mut blocks = chain.into_blocks();
    let target = blocks.get(1).context("chain has no block #1 to tamper with")?;

    let mut txs = target.transactions().to_vec();
    match txs.first_mut() {
        Some(Transaction::Transfer { amount: a, .. }) => *a = amount,
        _ => bail!("block #1 does not start with a transfer to tamper with"),
    }
    let forged = Block::from_parts(
        target.index(),
        target.timestamp(),
        txs,
        target.previous_hash(),
        target.nonce(),
        target.hash(),
    );
    blocks[1] = forged;
    Ok(Chain::from_blocks(blocks, difficulty)?)
}

fn run_demo(mining: &MiningArgs, tamper_amount: u64, compact: bool) -> Result<()> {
    let mut chain = mining.chain();
    info!(difficulty = chain.difficulty(), "starting demo");

    for (i, txs) in sample_payloads().into_iter().enumerate() {
        let index = i as u64 + 1;
        println!("Mining block #{index}...");
        chain.add_block(Block::new(index, timestamp_now(), txs, "")?)?;
        let tip = chain.latest_block();
        println!("  hash:  {}", tip.hash());
        println!("  nonce: {}", tip.nonce());
    }

    let rendered = if compact {
        serde_json::to_string(&chain)?
    } else {
        serde_json::to_string_pretty(&chain)?
    };
    println!("\nFull chain:\n{rendered}");
    println!("\nIs chain valid? {}", chain.is_chain_valid());

    println!("\nTampering with block #1...");
    let chain = tamper(chain, tamper_amount)?;
    println!("Is chain valid after tamper? {}", chain.is_chain_valid());
    if let Err(violation) = chain.validate() {
        println!("  {violation}");
    }
    Ok(())
}

fn run_mine(mining: &MiningArgs, from: String, to: String, amount: u64) -> Result<()> {
    let mut chain = mining.chain();
    let candidate = chain.candidate(vec![Transaction::transfer(from, to, amount)])?;
    chain.add_block(candidate)?;
    println!("{}", serde_json::to_string_pretty(chain.latest_block())?);
    Ok(())
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Demo {
            mining,
            tamper_amount,
            compact,
        } => run_demo(&mining, tamper_amount, compact)?,
        Command::Mine {
            mining,
            from,
            to,
            amount,
        } => run_mine(&mining, from, to, amount)?,
    }
    Ok(())
}
