/// Proposal types for the governance sub-ledger
use std::fmt;

/// Number of random bytes in a proposal id (rendered as 24 hex characters).
pub const PROPOSAL_ID_BYTES: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ProposalId(String);

impl ProposalId {
    pub fn generate() -> Self {
        let bytes: [u8; PROPOSAL_ID_BYTES] = rand::random();
        ProposalId(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ProposalId {
    fn from(id: String) -> Self {
        ProposalId(id)
    }
}

impl From<&str> for ProposalId {
    fn from(id: &str) -> Self {
        ProposalId(id.to_string())
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Undecided,
    Decided,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub text: String,
    /// Empty until the deciding vote has been cast.
    pub voter: String,
    pub approved: bool,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl Proposal {
    pub fn new(text: String) -> Self {
        Proposal {
            id: ProposalId::generate(),
            text,
            voter: String::new(),
            approved: false,
            timestamp: chrono::Utc::now().timestamp_millis() as u64,
        }
    }

    pub fn is_decided(&self) -> bool {
        !self.voter.is_empty()
    }

    pub fn status(&self) -> ProposalStatus {
        if self.is_decided() {
            ProposalStatus::Decided
        } else {
            ProposalStatus::Undecided
        }
    }
}
