//! Domain-separated signing messages.
//!
//! Every signature the SMR produces covers one of the messages built here.
//! The digest handed to a [`CryptoClient`](crate::CryptoClient) is the BLAKE3
//! hash of the message, so a vote signature can never be replayed as a
//! proposal signature (or the other way round).
//!
//! | Tag | Purpose |
//! |-----|---------|
//! | `chainbft_proposal:` | Leader signature over a proposal |
//! | `chainbft_vote:` | Validator vote over a `VoteInfo` |

use crate::{Hash, ProposalId, VoteInfo};

/// Domain tag for proposal signatures.
///
/// Format: `chainbft_proposal:` || view || id_len || id || timestamp || hash(justify_qc)
pub const DOMAIN_PROPOSAL: &[u8] = b"chainbft_proposal:";

/// Domain tag for vote signatures.
///
/// Format: `chainbft_vote:` || vote_info canonical bytes
pub const DOMAIN_VOTE: &[u8] = b"chainbft_vote:";

/// Build the signing message for a proposal.
pub fn proposal_message(
    view: u64,
    proposal_id: &ProposalId,
    timestamp: i64,
    justify_qc: &[u8],
) -> Vec<u8> {
    let mut message = Vec::with_capacity(DOMAIN_PROPOSAL.len() + 56 + proposal_id.0.len());
    message.extend_from_slice(DOMAIN_PROPOSAL);
    message.extend_from_slice(&view.to_le_bytes());
    push_len_prefixed(&mut message, proposal_id.as_bytes());
    message.extend_from_slice(&timestamp.to_le_bytes());
    message.extend_from_slice(Hash::from_bytes(justify_qc).as_bytes());
    message
}

/// Build the signing message for a vote.
pub fn vote_message(vote_info: &VoteInfo) -> Vec<u8> {
    let body = vote_info.canonical_bytes();
    let mut message = Vec::with_capacity(DOMAIN_VOTE.len() + body.len());
    message.extend_from_slice(DOMAIN_VOTE);
    message.extend_from_slice(&body);
    message
}

/// Digest actually signed for a proposal.
pub fn proposal_digest(
    view: u64,
    proposal_id: &ProposalId,
    timestamp: i64,
    justify_qc: &[u8],
) -> Hash {
    Hash::from_bytes(&proposal_message(view, proposal_id, timestamp, justify_qc))
}

/// Digest actually signed for a vote.
pub fn vote_digest(vote_info: &VoteInfo) -> Hash {
    Hash::from_bytes(&vote_message(vote_info))
}

pub(crate) fn push_len_prefixed(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    buf.extend_from_slice(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote(id: u8, view: u64) -> VoteInfo {
        VoteInfo::new(
            ProposalId::new(vec![id]),
            view,
            ProposalId::new(vec![id - 1]),
            view - 1,
        )
    }

    #[test]
    fn test_domains_are_separated() {
        let id = ProposalId::new(vec![1]);
        let proposal = proposal_digest(1, &id, 0, &[]);
        let vote_hash = vote_digest(&vote(1, 1));
        assert_ne!(proposal, vote_hash);
        assert!(proposal_message(1, &id, 0, &[]).starts_with(DOMAIN_PROPOSAL));
        assert!(vote_message(&vote(1, 1)).starts_with(DOMAIN_VOTE));
    }

    #[test]
    fn test_proposal_digest_covers_every_field() {
        let id = ProposalId::new(vec![7]);
        let base = proposal_digest(3, &id, 100, b"qc");
        assert_ne!(base, proposal_digest(4, &id, 100, b"qc"));
        assert_ne!(base, proposal_digest(3, &ProposalId::new(vec![8]), 100, b"qc"));
        assert_ne!(base, proposal_digest(3, &id, 101, b"qc"));
        assert_ne!(base, proposal_digest(3, &id, 100, b"other"));
    }

    #[test]
    fn test_vote_digest_covers_parent() {
        let a = vote(5, 5);
        let mut b = a.clone();
        b.parent_view = 1;
        assert_ne!(vote_digest(&a), vote_digest(&b));
    }
}
