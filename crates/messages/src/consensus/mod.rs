//! Messages exchanged by the replication protocol.

mod proposal;
mod vote;

pub use proposal::ProposalMsg;
pub use vote::VoteMsg;
