//! Node service: ties the ledger and governance core to a persistence backend.
//!
//! The core always decides first; the store is written afterwards and a
//! failed write never rolls back what the core already accepted. Blocks the
//! store rejected are kept in order and written before any newer block, so
//! the store never holds a chain with a hole in it.

use crate::blockchain::{Block, Ledger};
use crate::error::{ChainError, Result};
use crate::governance::{GovernanceLedger, Proposal, ProposalId};
use crate::persistence::Persistence;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum NodeState {
    Ready,
    /// Running, but at least one write to the store has failed.
    Degraded,
}

/// Result of a core operation together with whether the store accepted it.
#[derive(Debug, Clone)]
pub struct Committed<T> {
    pub value: T,
    pub persisted: bool,
}

pub struct Node {
    persistence: Arc<dyn Persistence>,
    ledger: RwLock<Ledger>,
    /// Committed blocks the store has not accepted yet, lowest index first.
    /// Only touched while the ledger write guard is held.
    unsaved: parking_lot::Mutex<VecDeque<Block>>,
    governance: GovernanceLedger,
    state: RwLock<NodeState>,
}

impl Node {
    /// Load and verify persisted state. An empty store is seeded with the
    /// genesis block; a store whose chain fails verification aborts startup.
    pub fn open(persistence: Arc<dyn Persistence>) -> Result<Self> {
        let blocks = persistence.load_blocks()?;
        let mut state = NodeState::Ready;
        let mut unsaved = VecDeque::new();

        let ledger = if blocks.is_empty() {
            let ledger = Ledger::with_genesis();
            if let Some(genesis) = ledger.last() {
                info!(hash = %genesis.hash_hex(), "Seeding empty store with genesis block");
                if let Err(e) = persistence.save_block(genesis) {
                    warn!("Failed to persist genesis block: {}", e);
                    state = NodeState::Degraded;
                    unsaved.push_back(genesis.clone());
                }
            }
            ledger
        } else {
            Ledger::from_blocks(blocks).map_err(|e| {
                error!("Refusing to start: stored chain failed verification: {}", e);
                e
            })?
        };

        let proposals = persistence.load_proposals()?;
        let governance = GovernanceLedger::from_proposals(proposals);

        info!(
            height = ledger.len(),
            proposals = governance.len(),
            "Node loaded"
        );

        Ok(Self {
            persistence,
            ledger: RwLock::new(ledger),
            unsaved: parking_lot::Mutex::new(unsaved),
            governance,
            state: RwLock::new(state),
        })
    }

    async fn record_persist(&self, what: &str, outcome: Result<()>) -> bool {
        match outcome {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to persist {}: {}", what, e);
                *self.state.write().await = NodeState::Degraded;
                false
            }
        }
    }

    /// Write queued blocks to the store in index order, stopping at the first
    /// failure so a later block is never stored ahead of an earlier one.
    /// Returns the error that stopped the flush, if any.
    fn flush_unsaved(&self) -> Option<ChainError> {
        let mut unsaved = self.unsaved.lock();
        while let Some(block) = unsaved.front() {
            if let Err(e) = self.persistence.save_block(block) {
                return Some(ChainError::DatabaseError(format!(
                    "block {} ({} queued): {}",
                    block.index,
                    unsaved.len(),
                    e
                )));
            }
            unsaved.pop_front();
        }
        None
    }

    /// Append a block on top of the current tip.
    ///
    /// Reading the tip, sealing the new block, committing it and handing it to
    /// the store all happen under one write guard, so concurrent callers are
    /// serialized and each sees the tip left by the previous one. The new
    /// block joins the back of the unsaved queue and counts as persisted only
    /// once everything ahead of it has been written too.
    pub async fn append_block(
        &self,
        data: impl Into<String>,
        miner_id: impl Into<String>,
        reward: f64,
    ) -> Result<Committed<Block>> {
        let mut ledger = self.ledger.write().await;
        let block = ledger.next_block(data, miner_id, reward)?;
        ledger.commit(block.clone())?;

        info!(
            index = block.index,
            hash = %block.hash_hex(),
            miner = %block.miner_id,
            "ledger.append"
        );

        self.unsaved.lock().push_back(block.clone());
        let outcome = match self.flush_unsaved() {
            Some(e) => Err(e),
            None => Ok(()),
        };
        let persisted = self
            .record_persist(&format!("block {}", block.index), outcome)
            .await;
        drop(ledger);
        Ok(Committed { value: block, persisted })
    }

    pub async fn propose(&self, text: impl Into<String>) -> Result<Committed<Proposal>> {
        let proposal = self.governance.propose(text)?;
        info!(id = %proposal.id, "governance.propose");

        let outcome = self.persistence.save_proposal(&proposal);
        let persisted = self
            .record_persist(&format!("proposal {}", proposal.id), outcome)
            .await;
        Ok(Committed { value: proposal, persisted })
    }

    pub async fn cast_vote(
        &self,
        id: &ProposalId,
        voter: &str,
        approve: bool,
    ) -> Result<Committed<Proposal>> {
        let proposal = self.governance.cast_vote(id, voter, approve)?;
        info!(id = %proposal.id, voter = %proposal.voter, approved = proposal.approved, "governance.vote");

        let outcome = self.persistence.save_proposal(&proposal);
        let persisted = self
            .record_persist(&format!("vote on {}", proposal.id), outcome)
            .await;
        Ok(Committed { value: proposal, persisted })
    }

    /// Number of committed blocks still waiting to be written to the store.
    pub fn unsaved_blocks(&self) -> usize {
        self.unsaved.lock().len()
    }

    pub async fn blocks(&self) -> Vec<Block> {
        self.ledger.read().await.blocks().to_vec()
    }

    pub async fn block(&self, index: u64) -> Option<Block> {
        self.ledger.read().await.get(index).cloned()
    }

    pub async fn height(&self) -> usize {
        self.ledger.read().await.len()
    }

    pub async fn verify(&self) -> Result<()> {
        self.ledger.read().await.verify()
    }

    pub fn governance(&self) -> &GovernanceLedger {
        &self.governance
    }

    pub fn proposal(&self, id: &ProposalId) -> Result<Proposal> {
        self.governance
            .get(id)
            .ok_or_else(|| ChainError::ProposalNotFound(id.to_string()))
    }

    pub async fn state(&self) -> NodeState {
        *self.state.read().await
    }
}
