use crate::error::{ChainError, Result};
use parking_lot::RwLock;
use std::collections::HashMap;

use super::types::{Proposal, ProposalId};

/// Owns every known proposal and enforces the one-vote rule.
///
/// All access goes through a single lock, so the "is it still undecided?"
/// check and the decision write in [`GovernanceLedger::cast_vote`] are one
/// indivisible step for any given proposal id.
#[derive(Debug, Default)]
pub struct GovernanceLedger {
    proposals: RwLock<HashMap<ProposalId, Proposal>>,
}

impl GovernanceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the ledger from proposals loaded out of a store.
    pub fn from_proposals(proposals: impl IntoIterator<Item = Proposal>) -> Self {
        let proposals = proposals.into_iter().map(|p| (p.id.clone(), p)).collect();
        GovernanceLedger {
            proposals: RwLock::new(proposals),
        }
    }

    /// Open a new, undecided proposal.
    pub fn propose(&self, text: impl Into<String>) -> Result<Proposal> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ChainError::InvalidProposal(
                "proposal text cannot be empty".to_string(),
            ));
        }

        let mut proposals = self.proposals.write();
        let mut proposal = Proposal::new(text);
        while proposals.contains_key(&proposal.id) {
            proposal.id = ProposalId::generate();
        }
        proposals.insert(proposal.id.clone(), proposal.clone());
        Ok(proposal)
    }

    /// Record the deciding vote on `id`. Exactly one call per proposal can
    /// succeed; every later call fails with `AlreadyDecided` and changes nothing.
    pub fn cast_vote(&self, id: &ProposalId, voter: &str, approve: bool) -> Result<Proposal> {
        let mut proposals = self.proposals.write();
        let proposal = proposals
            .get_mut(id)
            .ok_or_else(|| ChainError::ProposalNotFound(id.to_string()))?;

        if proposal.is_decided() {
            return Err(ChainError::AlreadyDecided(id.to_string()));
        }
        if voter.trim().is_empty() {
            return Err(ChainError::InvalidVote("voter id cannot be empty".to_string()));
        }

        proposal.voter = voter.to_string();
        proposal.approved = approve;
        Ok(proposal.clone())
    }

    pub fn get(&self, id: &ProposalId) -> Option<Proposal> {
        self.proposals.read().get(id).cloned()
    }

    /// All proposals, oldest first.
    pub fn list(&self) -> Vec<Proposal> {
        let mut all: Vec<Proposal> = self.proposals.read().values().cloned().collect();
        all.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        all
    }

    pub fn len(&self) -> usize {
        self.proposals.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.proposals.read().is_empty()
    }
}
