use crate::error::{ChainError, IntegrityFault, Result};
use sha2::{Digest, Sha256};

use super::validation::{check_link, verify_chain};

pub type Sha256Hash = [u8; 32];

/// Previous-hash marker carried by the genesis block.
pub const ZERO_HASH: Sha256Hash = [0u8; 32];

/// Version byte prefixed to every digest input. Bump it whenever the field
/// order or encoding below changes.
pub const DIGEST_FORMAT_VERSION: u8 = 1;

/// Fixed genesis timestamp (2023-01-01T00:00:00Z) so every node derives the same H0.
pub const GENESIS_TIMESTAMP: u64 = 1672531200000;
pub const GENESIS_DATA: &str = "genesis";

/// Serde adapter storing a `Sha256Hash` as a 64-character lowercase hex string.
pub mod hex_hash {
    use super::Sha256Hash;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(hash: &Sha256Hash, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Sha256Hash, D::Error> {
        let s = String::deserialize(deserializer)?;
        let mut hash = [0u8; 32];
        hex::decode_to_slice(&s, &mut hash).map_err(serde::de::Error::custom)?;
        Ok(hash)
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Block {
    pub index: u64,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub data: String,
    pub miner_id: String,
    /// Not covered by the digest.
    pub reward: f64,
    #[serde(with = "hex_hash")]
    pub prev_hash: Sha256Hash,
    #[serde(with = "hex_hash")]
    pub hash: Sha256Hash,
}

impl Block {
    /// Build a block and seal it with its digest.
    pub fn new(
        index: u64,
        timestamp: u64,
        data: String,
        miner_id: String,
        reward: f64,
        prev_hash: Sha256Hash,
    ) -> Self {
        let mut block = Block {
            index,
            timestamp,
            data,
            miner_id,
            reward,
            prev_hash,
            hash: ZERO_HASH,
        };
        block.hash = block.digest();
        block
    }

    /// The deterministic genesis block every ledger starts from.
    pub fn genesis() -> Self {
        Block::new(
            0,
            GENESIS_TIMESTAMP,
            GENESIS_DATA.to_string(),
            String::new(),
            0.0,
            ZERO_HASH,
        )
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.prev_hash == ZERO_HASH
    }

    /// SHA-256 over the canonical encoding of
    /// (version, index, timestamp, data, prev_hash, miner_id).
    ///
    /// Integers are little-endian u64; strings carry a u64 length prefix so
    /// adjacent fields can never run into each other.
    pub fn digest(&self) -> Sha256Hash {
        let mut hasher = Sha256::new();
        hasher.update([DIGEST_FORMAT_VERSION]);
        hasher.update(self.index.to_le_bytes());
        hasher.update(self.timestamp.to_le_bytes());
        hasher.update((self.data.len() as u64).to_le_bytes());
        hasher.update(self.data.as_bytes());
        hasher.update(self.prev_hash);
        hasher.update((self.miner_id.len() as u64).to_le_bytes());
        hasher.update(self.miner_id.as_bytes());
        hasher.finalize().into()
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    pub fn prev_hash_hex(&self) -> String {
        hex::encode(self.prev_hash)
    }
}

fn validate_reward(reward: f64) -> Result<()> {
    if !reward.is_finite() || reward < 0.0 {
        return Err(ChainError::InvalidReward(format!(
            "reward must be a finite, non-negative amount, got {}",
            reward
        )));
    }
    Ok(())
}

/// Derive the successor of `prev`. Pure: nothing is committed anywhere, the
/// caller decides whether the returned block becomes the new tip.
pub fn append(
    prev: Option<&Block>,
    data: impl Into<String>,
    miner_id: impl Into<String>,
    reward: f64,
) -> Result<Block> {
    let prev = prev.ok_or(ChainError::EmptyChain)?;
    validate_reward(reward)?;

    let timestamp = chrono::Utc::now().timestamp_millis() as u64;
    Ok(Block::new(
        prev.index + 1,
        timestamp,
        data.into(),
        miner_id.into(),
        reward,
        prev.hash,
    ))
}

/// Owned, append-only block sequence.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    blocks: Vec<Block>,
}

impl Ledger {
    /// Create an empty ledger. `next_block` fails until a genesis block is committed.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_genesis() -> Self {
        Ledger {
            blocks: vec![Block::genesis()],
        }
    }

    /// Adopt blocks loaded from a store, verifying them first.
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self> {
        verify_chain(&blocks)?;
        Ok(Ledger { blocks })
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn last(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn get(&self, index: u64) -> Option<&Block> {
        self.blocks.get(usize::try_from(index).ok()?)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Compute a block extending the current tip without committing it.
    pub fn next_block(
        &self,
        data: impl Into<String>,
        miner_id: impl Into<String>,
        reward: f64,
    ) -> Result<Block> {
        append(self.last(), data, miner_id, reward)
    }

    /// Push `block` as the new tip. A block computed against a stale tip is
    /// rejected, so two racing appends can never fork the sequence.
    pub fn commit(&mut self, block: Block) -> Result<()> {
        match self.blocks.last() {
            Some(tip) => check_link(self.blocks.len() as u64, tip, &block)?,
            None => {
                if block.index != 0 {
                    return Err(ChainError::ChainIntegrity {
                        index: 0,
                        fault: IntegrityFault::IndexGap,
                    });
                }
            }
        }
        self.blocks.push(block);
        Ok(())
    }

    pub fn verify(&self) -> Result<()> {
        verify_chain(&self.blocks)
    }

    pub fn is_valid(&self) -> bool {
        self.verify().is_ok()
    }
}
