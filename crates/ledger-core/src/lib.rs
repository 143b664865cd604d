use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

pub mod block;
pub mod chain;
pub mod constants;
pub mod error;
pub mod pow;
pub mod shared;

pub use block::Block;
pub use chain::Chain;
pub use error::{ChainViolation, LedgerError, Result};
pub use pow::MiningStrategy;
pub use shared::SharedChain;

pub type Hash = [u8; 32];

/// One payload record carried by a block.
///
/// The core never interprets these. They only have to serialize the same way
/// every time, which is why free-form records are kept in a `BTreeMap`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged, deny_unknown_fields)]
pub enum Transaction {
    Transfer {
        from: String,
        to: String,
        amount: u64,
    },
    /// Marker record, e.g. the genesis block's `{"info": "Genesis Block"}`.
    Info { info: String },
    Record(BTreeMap<String, Value>),
}

impl Transaction {
    pub fn transfer(from: impl Into<String>, to: impl Into<String>, amount: u64) -> Self {
        Self::Transfer {
            from: from.into(),
            to: to.into(),
            amount,
        }
    }

    pub fn info(info: impl Into<String>) -> Self {
        Self::Info { info: info.into() }
    }
}

/// Canonical byte form of a transaction list, as fed into block digests.
///
/// Goes through `serde_json::Value`, whose objects keep their keys sorted, so a
/// `Transfer` and a `Record` with the same fields produce the same bytes.
pub fn transactions_bytes(txs: &[Transaction]) -> Result<Vec<u8>> {
    Ok(canonical_bytes(&serde_json::to_value(txs)?))
}

/// Compact JSON rendering of an already-built value. Cannot fail.
pub(crate) fn canonical_bytes(value: &Value) -> Vec<u8> {
    value.to_string().into_bytes()
}

pub fn sha256(bytes: &[u8]) -> Hash {
    let digest = Sha256::digest(bytes);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..]);
    out
}

/// Milliseconds since the Unix epoch, rendered as a string.
pub fn timestamp_now() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
        .to_string()
}
