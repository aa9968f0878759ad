//! Actions returned by the synchronous SMR.

use chainbft_messages::{MessageKind, NetworkMessage};
use chainbft_types::Address;

/// Side effects the SMR asks its runner to perform.
///
/// The SMR itself performs no I/O. Every handler returns the actions it
/// wants executed and the runner dispatches them without awaiting delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Send a message to the listed validators. Best-effort.
    Send {
        message: NetworkMessage,
        targets: Vec<Address>,
    },
}

impl Action {
    /// Get a human-readable name for this action.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::Send { message, .. } => match message.kind() {
                MessageKind::Proposal => "SendProposal",
                MessageKind::Vote => "SendVote",
            },
        }
    }

    /// Addresses the action is directed at.
    pub fn targets(&self) -> &[Address] {
        match self {
            Action::Send { targets, .. } => targets,
        }
    }
}
