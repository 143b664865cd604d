use crate::{
    canonical_bytes,
    constants::{GENESIS_INDEX, GENESIS_INFO, GENESIS_PREVIOUS_HASH},
    error::Result,
    pow, transactions_bytes, Hash, Transaction,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};

/// One position in the chain.
///
/// A block is immutable once built: `hash` is derived from the other five
/// fields at construction, and the only ways to get a different nonce or
/// predecessor are [`Block::mine`] and [`Block::relink`], which return a new
/// value. [`Block::from_parts`] is the escape hatch for blocks whose stored
/// hash came from somewhere else and has to be checked rather than trusted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    index: u64,
    timestamp: String,
    transactions: Vec<Transaction>,
    previous_hash: String,
    nonce: u64,
    hash: String,
}

impl Block {
    /// Build an unmined block with nonce 0 and a freshly computed hash.
    pub fn new(
        index: u64,
        timestamp: impl Into<String>,
        transactions: Vec<Transaction>,
        previous_hash: impl Into<String>,
    ) -> Result<Self> {
        Self::sealed(index, timestamp.into(), transactions, previous_hash.into(), 0)
    }

    /// Assemble a block from stored parts without recomputing anything.
    pub fn from_parts(
        index: u64,
        timestamp: impl Into<String>,
        transactions: Vec<Transaction>,
        previous_hash: impl Into<String>,
        nonce: u64,
        hash: impl Into<String>,
    ) -> Self {
        Self {
            index,
            timestamp: timestamp.into(),
            transactions,
            previous_hash: previous_hash.into(),
            nonce,
            hash: hash.into(),
        }
    }

    /// The fixed first block: index 0, a single info record, previous hash
    /// [`GENESIS_PREVIOUS_HASH`], nonce 0. Its payload is known up front, so
    /// hashing it cannot fail.
    pub fn genesis(timestamp: impl Into<String>) -> Self {
        let timestamp = timestamp.into();
        let payload = canonical_bytes(&json!([{ "info": GENESIS_INFO }]));
        let prefix = prefix_hasher_for(GENESIS_INDEX, &timestamp, &payload, GENESIS_PREVIOUS_HASH);
        Self {
            index: GENESIS_INDEX,
            timestamp,
            transactions: vec![Transaction::info(GENESIS_INFO)],
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
            nonce: 0,
            hash: hex::encode(hash_with_nonce(&prefix, 0)),
        }
    }

    fn sealed(
        index: u64,
        timestamp: String,
        transactions: Vec<Transaction>,
        previous_hash: String,
        nonce: u64,
    ) -> Result<Self> {
        let mut block = Self {
            index,
            timestamp,
            transactions,
            previous_hash,
            nonce,
            hash: String::new(),
        };
        block.hash = block.calculate_hash()?;
        Ok(block)
    }

    /// Hex SHA-256 of (index, timestamp, transactions, previous_hash, nonce).
    pub fn calculate_hash(&self) -> Result<String> {
        let prefix = self.prefix_hasher()?;
        Ok(hex::encode(hash_with_nonce(&prefix, self.nonce)))
    }

    /// A hasher already fed with every field except the nonce.
    ///
    /// Layout: index (u64 LE), then timestamp, transactions JSON and
    /// previous hash, each preceded by its length as u64 LE.
    pub(crate) fn prefix_hasher(&self) -> Result<Sha256> {
        let txs = transactions_bytes(&self.transactions)?;
        Ok(prefix_hasher_for(
            self.index,
            &self.timestamp,
            &txs,
            &self.previous_hash,
        ))
    }

    /// Whether the stored hash still matches the block's contents.
    pub fn has_valid_hash(&self) -> Result<bool> {
        Ok(self.hash == self.calculate_hash()?)
    }

    /// Whether the stored hash starts with `difficulty` zero hex characters.
    pub fn meets_difficulty(&self, difficulty: u32) -> bool {
        let difficulty = difficulty as usize;
        self.hash.len() >= difficulty && self.hash.bytes().take(difficulty).all(|c| c == b'0')
    }

    /// Search for a nonce whose hash meets `difficulty` and return the sealed block.
    pub fn mine(self, difficulty: u32) -> Result<Self> {
        pow::mine(self, difficulty)
    }

    /// Point this block at a new predecessor. Resets the nonce and rehashes.
    pub fn relink(self, previous_hash: impl Into<String>) -> Result<Self> {
        Self::sealed(
            self.index,
            self.timestamp,
            self.transactions,
            previous_hash.into(),
            0,
        )
    }

    pub(crate) fn with_seal(mut self, nonce: u64, hash: &Hash) -> Self {
        self.nonce = nonce;
        self.hash = hex::encode(hash);
        self
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }
}

fn prefix_hasher_for(index: u64, timestamp: &str, txs: &[u8], previous_hash: &str) -> Sha256 {
    let mut hasher = Sha256::new();
    hasher.update(index.to_le_bytes());
    update_len_prefixed(&mut hasher, timestamp.as_bytes());
    update_len_prefixed(&mut hasher, txs);
    update_len_prefixed(&mut hasher, previous_hash.as_bytes());
    hasher
}

fn update_len_prefixed(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

/// Finish a clone of `prefix` with `nonce`. The prefix itself is left untouched.
pub(crate) fn hash_with_nonce(prefix: &Sha256, nonce: u64) -> Hash {
    let digest = prefix.clone().chain_update(nonce.to_le_bytes()).finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{constants::HASH_HEX_SIZE, sha256};

    fn sample() -> Block {
        Block::new(
            1,
            "1600000000000",
            vec![
                Transaction::transfer("Alice", "Bob", 50),
                Transaction::transfer("John", "Karen", 30),
            ],
            "0",
        )
        .unwrap()
    }

    #[test]
    fn new_block_starts_at_nonce_zero_with_hash() {
        let block = sample();
        assert_eq!(block.nonce(), 0);
        assert_eq!(block.hash().len(), HASH_HEX_SIZE);
        assert_eq!(block.hash(), block.calculate_hash().unwrap());
        assert!(block.has_valid_hash().unwrap());
    }

    #[test]
    fn hash_matches_manual_preimage() {
        let block = sample();
        let txs = transactions_bytes(block.transactions()).unwrap();
        let mut preimage = Vec::new();
        preimage.extend_from_slice(&1u64.to_le_bytes());
        preimage.extend_from_slice(&13u64.to_le_bytes());
        preimage.extend_from_slice(b"1600000000000");
        preimage.extend_from_slice(&(txs.len() as u64).to_le_bytes());
        preimage.extend_from_slice(&txs);
        preimage.extend_from_slice(&1u64.to_le_bytes());
        preimage.extend_from_slice(b"0");
        preimage.extend_from_slice(&0u64.to_le_bytes());
        assert_eq!(block.hash(), hex::encode(sha256(&preimage)));
    }

    #[test]
    fn hash_is_deterministic() {
        let block = sample();
        let first = block.calculate_hash().unwrap();
        let second = block.calculate_hash().unwrap();
        assert_eq!(first, second);
        assert_eq!(sample().hash(), block.hash());
    }

    #[test]
    fn hash_changes_with_each_field() {
        let base = sample();
        let variants = [
            Block::new(2, "1600000000000", base.transactions().to_vec(), "0").unwrap(),
            Block::new(1, "1600000000001", base.transactions().to_vec(), "0").unwrap(),
            Block::new(1, "1600000000000", vec![Transaction::transfer("Alice", "Bob", 9999)], "0")
                .unwrap(),
            Block::new(1, "1600000000000", base.transactions().to_vec(), "1").unwrap(),
        ];
        for variant in &variants {
            assert_ne!(variant.hash(), base.hash());
        }
        let bumped = Block::from_parts(
            base.index(),
            base.timestamp(),
            base.transactions().to_vec(),
            base.previous_hash(),
            1,
            base.hash(),
        );
        assert_ne!(bumped.calculate_hash().unwrap(), base.hash());
    }

    #[test]
    fn field_boundaries_are_unambiguous() {
        // Plain concatenation would render both of these as "12" + "3".
        let a = Block::new(0, "12", vec![], "3").unwrap();
        let b = Block::new(0, "1", vec![], "23").unwrap();
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn genesis_hash_matches_general_path() {
        let genesis = Block::genesis("1600000000000");
        let rebuilt = Block::new(
            GENESIS_INDEX,
            "1600000000000",
            vec![Transaction::info(GENESIS_INFO)],
            GENESIS_PREVIOUS_HASH,
        )
        .unwrap();
        assert_eq!(genesis, rebuilt);
        assert!(genesis.has_valid_hash().unwrap());
    }

    #[test]
    fn transfer_and_equivalent_record_hash_alike() {
        let mut fields = std::collections::BTreeMap::new();
        fields.insert("from".to_string(), json!("Alice"));
        fields.insert("to".to_string(), json!("Bob"));
        fields.insert("amount".to_string(), json!(50));
        let as_record = Block::new(1, "t", vec![Transaction::Record(fields)], "p").unwrap();
        let as_transfer =
            Block::new(1, "t", vec![Transaction::transfer("Alice", "Bob", 50)], "p").unwrap();
        assert_eq!(as_record.hash(), as_transfer.hash());
    }

    #[test]
    fn from_parts_keeps_stale_hash() {
        let block = sample();
        let tampered = Block::from_parts(
            block.index(),
            block.timestamp(),
            vec![
                Transaction::transfer("Alice", "Bob", 9999),
                Transaction::transfer("John", "Karen", 30),
            ],
            block.previous_hash(),
            block.nonce(),
            block.hash(),
        );
        assert_eq!(tampered.hash(), block.hash());
        assert!(!tampered.has_valid_hash().unwrap());
    }

    #[test]
    fn mine_meets_difficulty() {
        let mined = sample().mine(3).unwrap();
        assert!(mined.hash().starts_with("000"));
        assert!(mined.meets_difficulty(3));
        assert!(mined.has_valid_hash().unwrap());
    }

    #[test]
    fn relink_rehashes_and_resets_nonce() {
        let mined = sample().mine(2).unwrap();
        let relinked = mined.clone().relink("abc").unwrap();
        assert_eq!(relinked.previous_hash(), "abc");
        assert_eq!(relinked.nonce(), 0);
        assert_ne!(relinked.hash(), mined.hash());
        assert!(relinked.has_valid_hash().unwrap());
    }

    #[test]
    fn meets_difficulty_examples() {
        let block = Block::from_parts(0, "t", vec![], "0", 0, "000abc");
        assert!(block.meets_difficulty(0));
        assert!(block.meets_difficulty(3));
        assert!(!block.meets_difficulty(4));
        let short = Block::from_parts(0, "t", vec![], "0", 0, "00");
        assert!(!short.meets_difficulty(3));
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let block = Block::from_parts(
            1,
            "t",
            vec![Transaction::transfer("Alice", "Bob", 50)],
            "prev",
            7,
            "h",
        );
        let json = serde_json::to_string(&block).unwrap();
        assert_eq!(
            json,
            r#"{"index":1,"timestamp":"t","transactions":[{"from":"Alice","to":"Bob","amount":50}],"previousHash":"prev","nonce":7,"hash":"h"}"#
        );
        let back: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(back, block);
    }
}
