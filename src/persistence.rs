//! Database persistence layer for govchain
//!
//! The store only mirrors state computed by the core. Nothing here derives
//! digests or decides votes; loaded data is verified by the caller.

use crate::blockchain::{Block, Sha256Hash};
use crate::error::ChainError;
use crate::governance::{Proposal, ProposalId};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Abstraction for persistence backends. Blocks are keyed by index and must
/// come back in ascending order; proposals are keyed by id.
pub trait Persistence: Send + Sync {
    fn load_blocks(&self) -> Result<Vec<Block>, ChainError>;
    /// Insert a new block. An index that is already stored is an error, never an overwrite.
    fn save_block(&self, block: &Block) -> Result<(), ChainError>;
    fn load_proposals(&self) -> Result<Vec<Proposal>, ChainError>;
    /// Insert or update a proposal by id.
    fn save_proposal(&self, proposal: &Proposal) -> Result<(), ChainError>;
}

fn blob_to_hash(column: &str, bytes: Vec<u8>) -> Result<Sha256Hash, ChainError> {
    bytes.try_into().map_err(|b: Vec<u8>| {
        ChainError::DatabaseError(format!(
            "Column {} holds {} bytes, expected 32",
            column,
            b.len()
        ))
    })
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &str) -> Result<Self, ChainError> {
        let conn = Connection::open(path)
            .map_err(|e| ChainError::DatabaseError(format!("Failed to open database: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS blocks (
                block_index INTEGER PRIMARY KEY,
                timestamp INTEGER NOT NULL,
                data TEXT NOT NULL,
                miner_id TEXT NOT NULL,
                reward REAL NOT NULL,
                prev_hash BLOB NOT NULL,
                hash BLOB NOT NULL
            )",
            [],
        )
        .map_err(|e| ChainError::DatabaseError(format!("Failed to create blocks table: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS proposals (
                id TEXT PRIMARY KEY,
                text TEXT NOT NULL,
                voter TEXT NOT NULL,
                approved INTEGER NOT NULL,
                timestamp INTEGER NOT NULL
            )",
            [],
        )
        .map_err(|e| {
            ChainError::DatabaseError(format!("Failed to create proposals table: {}", e))
        })?;

        Ok(Database { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> Result<Self, ChainError> {
        Self::open(":memory:")
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, ChainError> {
        self.conn
            .lock()
            .map_err(|_| ChainError::DatabaseError("Mutex poisoned".to_string()))
    }

    pub fn save_block(&self, block: &Block) -> Result<(), ChainError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO blocks (block_index, timestamp, data, miner_id, reward, prev_hash, hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                block.index as i64,
                block.timestamp as i64,
                block.data,
                block.miner_id,
                block.reward,
                block.prev_hash.to_vec(),
                block.hash.to_vec(),
            ],
        )
        .map_err(|e| {
            ChainError::DatabaseError(format!("Failed to save block {}: {}", block.index, e))
        })?;

        Ok(())
    }

    pub fn load_blocks(&self) -> Result<Vec<Block>, ChainError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT block_index, timestamp, data, miner_id, reward, prev_hash, hash
                 FROM blocks ORDER BY block_index ASC",
            )
            .map_err(|e| ChainError::DatabaseError(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                let index: i64 = row.get(0)?;
                let timestamp: i64 = row.get(1)?;
                let data: String = row.get(2)?;
                let miner_id: String = row.get(3)?;
                let reward: f64 = row.get(4)?;
                let prev_hash: Vec<u8> = row.get(5)?;
                let hash: Vec<u8> = row.get(6)?;
                Ok((index, timestamp, data, miner_id, reward, prev_hash, hash))
            })
            .map_err(|e| ChainError::DatabaseError(format!("Failed to query blocks: {}", e)))?;

        let mut blocks = Vec::new();
        for row in rows {
            let (index, timestamp, data, miner_id, reward, prev_hash, hash) = row
                .map_err(|e| ChainError::DatabaseError(format!("Failed to load block: {}", e)))?;

            blocks.push(Block {
                index: index as u64,
                timestamp: timestamp as u64,
                data,
                miner_id,
                reward,
                prev_hash: blob_to_hash("prev_hash", prev_hash)?,
                hash: blob_to_hash("hash", hash)?,
            });
        }

        Ok(blocks)
    }

    pub fn save_proposal(&self, proposal: &Proposal) -> Result<(), ChainError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO proposals (id, text, voter, approved, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET voter = excluded.voter, approved = excluded.approved",
            params![
                proposal.id.as_str(),
                proposal.text,
                proposal.voter,
                proposal.approved,
                proposal.timestamp as i64,
            ],
        )
        .map_err(|e| {
            ChainError::DatabaseError(format!("Failed to save proposal {}: {}", proposal.id, e))
        })?;

        Ok(())
    }

    pub fn load_proposals(&self) -> Result<Vec<Proposal>, ChainError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, text, voter, approved, timestamp FROM proposals ORDER BY timestamp ASC, id ASC")
            .map_err(|e| ChainError::DatabaseError(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let timestamp: i64 = row.get(4)?;
                Ok(Proposal {
                    id: ProposalId::from(id),
                    text: row.get(1)?,
                    voter: row.get(2)?,
                    approved: row.get(3)?,
                    timestamp: timestamp as u64,
                })
            })
            .map_err(|e| ChainError::DatabaseError(format!("Failed to query proposals: {}", e)))?;

        let mut proposals = Vec::new();
        for row in rows {
            proposals.push(
                row.map_err(|e| ChainError::DatabaseError(format!("Failed to load proposal: {}", e)))?,
            );
        }
        Ok(proposals)
    }
}

impl Persistence for Database {
    fn load_blocks(&self) -> Result<Vec<Block>, ChainError> {
        Database::load_blocks(self)
    }

    fn save_block(&self, block: &Block) -> Result<(), ChainError> {
        Database::save_block(self, block)
    }

    fn load_proposals(&self) -> Result<Vec<Proposal>, ChainError> {
        Database::load_proposals(self)
    }

    fn save_proposal(&self, proposal: &Proposal) -> Result<(), ChainError> {
        Database::save_proposal(self, proposal)
    }
}

/// Simple in-memory persistence implementation useful for tests and ephemeral runs.
#[derive(Clone, Default)]
pub struct InMemoryPersistence {
    pub blocks: Arc<Mutex<Vec<Block>>>,
    pub proposals: Arc<Mutex<HashMap<ProposalId, Proposal>>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Persistence for InMemoryPersistence {
    fn load_blocks(&self) -> Result<Vec<Block>, ChainError> {
        let blocks = self.blocks.lock().map_err(|_| ChainError::DatabaseError("Mutex poisoned".to_string()))?;
        let mut sorted = blocks.clone();
        sorted.sort_by_key(|b| b.index);
        Ok(sorted)
    }

    fn save_block(&self, block: &Block) -> Result<(), ChainError> {
        let mut blocks = self.blocks.lock().map_err(|_| ChainError::DatabaseError("Mutex poisoned".to_string()))?;
        if blocks.iter().any(|b| b.index == block.index) {
            return Err(ChainError::DatabaseError(format!(
                "Block {} already stored",
                block.index
            )));
        }
        blocks.push(block.clone());
        Ok(())
    }

    fn load_proposals(&self) -> Result<Vec<Proposal>, ChainError> {
        let proposals = self.proposals.lock().map_err(|_| ChainError::DatabaseError("Mutex poisoned".to_string()))?;
        Ok(proposals.values().cloned().collect())
    }

    fn save_proposal(&self, proposal: &Proposal) -> Result<(), ChainError> {
        let mut proposals = self.proposals.lock().map_err(|_| ChainError::DatabaseError("Mutex poisoned".to_string()))?;
        proposals.insert(proposal.id.clone(), proposal.clone());
        Ok(())
    }
}
