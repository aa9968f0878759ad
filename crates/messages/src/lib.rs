//! Network messages for the replication protocol.

mod codec;
pub mod consensus;
mod envelope;

pub use codec::{CodecError, ConsensusMessage};
pub use consensus::{ProposalMsg, VoteMsg};
pub use envelope::{MessageHeader, MessageKind, NetworkMessage};
