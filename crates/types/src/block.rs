//! Block header view consumed by the SMR.

use crate::legacy::{old_qc_to_new, ConsensusStorage, LegacyError};
use crate::{Address, ProposalId, QuorumCert};
use sbor::prelude::*;

/// The parts of a ledger block the SMR reads.
///
/// Block ids double as proposal ids and heights double as views.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct BlockInfo {
    /// Block id.
    pub id: ProposalId,

    /// Id of the parent block.
    pub pre_hash: ProposalId,

    /// Height in the chain (genesis = 0).
    pub height: u64,

    /// Account that produced the block.
    pub proposer: Address,

    /// Unix timestamp (seconds) when the block was produced.
    pub timestamp: i64,

    /// Encoded [`ConsensusStorage`].
    pub consensus_storage: Vec<u8>,
}

impl BlockInfo {
    /// Check if this is the genesis block.
    pub fn is_genesis(&self) -> bool {
        self.height == 0
    }

    /// Justification certificate stored in the block, if any.
    pub fn justify_qc(&self) -> Result<Option<QuorumCert>, LegacyError> {
        let storage = ConsensusStorage::decode(&self.consensus_storage)?;
        storage.justify.as_ref().map(old_qc_to_new).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legacy::new_to_old_qc;
    use crate::VoteInfo;

    fn block(storage: Vec<u8>) -> BlockInfo {
        BlockInfo {
            id: ProposalId::new(vec![2]),
            pre_hash: ProposalId::new(vec![1]),
            height: 2,
            proposer: Address::new("p"),
            timestamp: 0,
            consensus_storage: storage,
        }
    }

    #[test]
    fn test_justify_qc_absent() {
        assert_eq!(block(vec![]).justify_qc().unwrap(), None);
        assert!(!block(vec![]).is_genesis());
    }

    #[test]
    fn test_justify_qc_from_storage() {
        let qc = QuorumCert::unsigned(VoteInfo::new(
            ProposalId::new(vec![1]),
            1,
            ProposalId::new(vec![0]),
            0,
        ));
        let storage = ConsensusStorage {
            justify: Some(new_to_old_qc(&qc).unwrap()),
            cur_term: 0,
            cur_block_num: 2,
        };
        let justify = block(storage.encode().unwrap()).justify_qc().unwrap().unwrap();
        assert_eq!(justify.vote_info, qc.vote_info);
    }
}
