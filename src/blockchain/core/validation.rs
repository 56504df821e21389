use crate::error::{ChainError, IntegrityFault, Result};

use super::chain::Block;

fn fault(index: u64, fault: IntegrityFault) -> ChainError {
    ChainError::ChainIntegrity { index, fault }
}

/// Check that `block`, sitting at `position`, correctly extends `prev`.
///
/// Order matters for diagnostics: a wrong `prev_hash` is a broken link, any
/// other field change surfaces as a digest mismatch, and only a block whose
/// hash is self-consistent can be reported as an index gap.
pub fn check_link(position: u64, prev: &Block, block: &Block) -> Result<()> {
    if block.prev_hash != prev.hash {
        return Err(fault(position, IntegrityFault::BrokenLink));
    }
    if block.hash != block.digest() {
        return Err(fault(position, IntegrityFault::DigestMismatch));
    }
    if block.index != prev.index + 1 {
        return Err(fault(position, IntegrityFault::IndexGap));
    }
    Ok(())
}

/// Walk the whole sequence and stop at the first fault.
///
/// The genesis block has no predecessor, so only its index is checked; every
/// later block must link to and be sealed over its own fields.
pub fn verify_chain(blocks: &[Block]) -> Result<()> {
    if let Some(first) = blocks.first() {
        if first.index != 0 {
            return Err(fault(0, IntegrityFault::IndexGap));
        }
    }

    for (i, pair) in blocks.windows(2).enumerate() {
        check_link(i as u64 + 1, &pair[0], &pair[1])?;
    }
    Ok(())
}

pub fn is_valid_chain(blocks: &[Block]) -> bool {
    verify_chain(blocks).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{append, Block};

    fn build_chain(len: usize) -> Vec<Block> {
        let mut blocks = vec![Block::genesis()];
        for i in 1..len {
            let next = append(blocks.last(), format!("tx{}", i), format!("miner{}", i), i as f64).unwrap();
            blocks.push(next);
        }
        blocks
    }

    fn assert_fault(blocks: &[Block], index: u64, expected: IntegrityFault) {
        assert_eq!(
            verify_chain(blocks),
            Err(ChainError::ChainIntegrity { index, fault: expected })
        );
        assert!(!is_valid_chain(blocks));
    }

    #[test]
    fn test_appended_chain_verifies() {
        let blocks = build_chain(8);
        assert!(is_valid_chain(&blocks));
        assert!(is_valid_chain(&blocks[..1]));
        assert!(is_valid_chain(&[]));
    }

    #[test]
    fn test_tampered_data_detected() {
        let mut blocks = build_chain(5);
        blocks[3].data = "forged".to_string();
        assert_fault(&blocks, 3, IntegrityFault::DigestMismatch);
    }

    #[test]
    fn test_tampered_miner_detected() {
        let mut blocks = build_chain(5);
        blocks[2].miner_id = "mallory".to_string();
        assert_fault(&blocks, 2, IntegrityFault::DigestMismatch);
    }

    #[test]
    fn test_tampered_index_detected() {
        let mut blocks = build_chain(5);
        blocks[4].index = 40;
        assert_fault(&blocks, 4, IntegrityFault::DigestMismatch);
    }

    #[test]
    fn test_tampered_prev_hash_detected() {
        let mut blocks = build_chain(5);
        blocks[1].prev_hash = [9u8; 32];
        assert_fault(&blocks, 1, IntegrityFault::BrokenLink);
    }

    #[test]
    fn test_resealed_block_breaks_successor_link() {
        let mut blocks = build_chain(5);
        blocks[2].data = "forged".to_string();
        blocks[2].hash = blocks[2].digest();
        assert_fault(&blocks, 3, IntegrityFault::BrokenLink);
    }

    #[test]
    fn test_resealed_index_reports_gap() {
        let mut blocks = build_chain(3);
        blocks[2].index = 7;
        blocks[2].hash = blocks[2].digest();
        assert_fault(&blocks, 2, IntegrityFault::IndexGap);
    }

    #[test]
    fn test_reward_change_is_not_detected() {
        let mut blocks = build_chain(3);
        blocks[1].reward = 1_000_000.0;
        assert!(is_valid_chain(&blocks));
    }

    #[test]
    fn test_chain_must_start_at_genesis_index() {
        let blocks = build_chain(4);
        assert_fault(&blocks[1..], 0, IntegrityFault::IndexGap);
    }
}
