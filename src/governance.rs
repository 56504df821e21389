//! Governance sub-ledger: proposals decided by a single recorded vote

pub mod ledger;
pub mod types;

pub use ledger::*;
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChainError;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_propose_starts_undecided() {
        let gov = GovernanceLedger::new();
        let proposal = gov.propose("Increase reward").unwrap();

        assert_eq!(proposal.text, "Increase reward");
        assert_eq!(proposal.voter, "");
        assert!(!proposal.approved);
        assert_eq!(proposal.status(), ProposalStatus::Undecided);
        assert_eq!(proposal.id.as_str().len(), PROPOSAL_ID_BYTES * 2);
        assert_eq!(gov.get(&proposal.id), Some(proposal));
    }

    #[test]
    fn test_propose_assigns_unique_ids() {
        let gov = GovernanceLedger::new();
        let a = gov.propose("a").unwrap();
        let b = gov.propose("b").unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(gov.len(), 2);
    }

    #[test]
    fn test_propose_rejects_blank_text() {
        let gov = GovernanceLedger::new();
        assert!(matches!(gov.propose("   "), Err(ChainError::InvalidProposal(_))));
        assert!(gov.is_empty());
    }

    #[test]
    fn test_first_vote_wins() {
        let gov = GovernanceLedger::new();
        let proposal = gov.propose("Increase reward").unwrap();

        let decided = gov.cast_vote(&proposal.id, "bob", true).unwrap();
        assert_eq!(decided.voter, "bob");
        assert!(decided.approved);
        assert_eq!(decided.status(), ProposalStatus::Decided);

        let err = gov.cast_vote(&proposal.id, "carol", false).unwrap_err();
        assert_eq!(err, ChainError::AlreadyDecided(proposal.id.to_string()));

        let stored = gov.get(&proposal.id).unwrap();
        assert_eq!(stored.voter, "bob");
        assert!(stored.approved);
    }

    #[test]
    fn test_vote_on_unknown_proposal() {
        let gov = GovernanceLedger::new();
        let known = gov.propose("known").unwrap();
        let missing = ProposalId::from("0123456789abcdef01234567");

        let err = gov.cast_vote(&missing, "bob", true).unwrap_err();
        assert!(matches!(err, ChainError::ProposalNotFound(_)));
        assert_eq!(gov.get(&known.id).unwrap().voter, "");
        assert_eq!(gov.len(), 1);
    }

    #[test]
    fn test_blank_voter_leaves_proposal_open() {
        let gov = GovernanceLedger::new();
        let proposal = gov.propose("p").unwrap();

        assert!(matches!(
            gov.cast_vote(&proposal.id, "", true),
            Err(ChainError::InvalidVote(_))
        ));
        assert!(!gov.get(&proposal.id).unwrap().is_decided());
        assert!(gov.cast_vote(&proposal.id, "dave", false).is_ok());
    }

    #[test]
    fn test_concurrent_votes_have_single_winner() {
        let gov = Arc::new(GovernanceLedger::new());
        let proposal = gov.propose("race").unwrap();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let gov = Arc::clone(&gov);
                let id = proposal.id.clone();
                thread::spawn(move || gov.cast_vote(&id, &format!("voter{}", i), i % 2 == 0))
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1);
        assert!(results
            .iter()
            .filter(|r| r.is_err())
            .all(|r| matches!(r, Err(ChainError::AlreadyDecided(_)))));

        let stored = gov.get(&proposal.id).unwrap();
        assert_eq!(&stored, winners[0]);
    }

    #[test]
    fn test_from_proposals_preserves_decisions() {
        let mut decided = Proposal::new("old".to_string());
        decided.voter = "erin".to_string();
        decided.approved = true;
        let open = Proposal::new("new".to_string());

        let gov = GovernanceLedger::from_proposals(vec![decided.clone(), open.clone()]);
        assert_eq!(gov.len(), 2);
        assert!(matches!(
            gov.cast_vote(&decided.id, "frank", false),
            Err(ChainError::AlreadyDecided(_))
        ));
        assert!(gov.cast_vote(&open.id, "frank", false).is_ok());
    }

    #[test]
    fn test_list_is_ordered_by_creation() {
        let mut first = Proposal::new("first".to_string());
        first.timestamp = 1;
        let mut second = Proposal::new("second".to_string());
        second.timestamp = 2;

        let gov = GovernanceLedger::from_proposals(vec![second, first]);
        let texts: Vec<_> = gov.list().into_iter().map(|p| p.text).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }
}
