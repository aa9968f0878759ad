//! Vote message sent to the leader of the next view.

use crate::codec::{decode_err, encode_err, non_empty, CodecError, ConsensusMessage};
use crate::MessageKind;
use chainbft_types::{LedgerCommitInfo, QuorumCert, QuorumCertSign, VoteInfo};
use sbor::prelude::*;

/// A single validator's vote.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct VoteMsg {
    /// Encoded [`VoteInfo`].
    pub vote_info: Vec<u8>,

    /// Encoded [`LedgerCommitInfo`].
    pub ledger_commit_info: Vec<u8>,

    /// The voter's signature. Exactly one entry on a well-formed vote.
    pub signature: Vec<QuorumCertSign>,
}

impl VoteMsg {
    /// Build a vote message from its logical parts.
    pub fn new(
        vote_info: &VoteInfo,
        ledger_commit_info: &LedgerCommitInfo,
        sign: QuorumCertSign,
    ) -> Result<Self, CodecError> {
        Ok(Self {
            vote_info: basic_encode(vote_info).map_err(encode_err)?,
            ledger_commit_info: basic_encode(ledger_commit_info).map_err(encode_err)?,
            signature: vec![sign],
        })
    }

    /// Reassemble the single-signature certificate this vote represents.
    pub fn to_quorum_cert(&self) -> Result<QuorumCert, CodecError> {
        let vote_info: VoteInfo = basic_decode(non_empty(&self.vote_info)?).map_err(decode_err)?;
        let ledger_commit_info: LedgerCommitInfo =
            basic_decode(non_empty(&self.ledger_commit_info)?).map_err(decode_err)?;
        Ok(QuorumCert::new(
            vote_info,
            ledger_commit_info,
            self.signature.clone(),
        ))
    }
}

impl ConsensusMessage for VoteMsg {
    const KIND: MessageKind = MessageKind::Vote;

    fn encode(&self) -> Result<Vec<u8>, CodecError> {
        basic_encode(self).map_err(encode_err)
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        basic_decode(non_empty(bytes)?).map_err(decode_err)
    }
}
