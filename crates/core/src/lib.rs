//! Collaborator contracts for the chained-BFT SMR.
//!
//! The SMR is a synchronous state machine: it consults a [`LedgerRely`] and a
//! [`ProposerElection`] directly and returns [`Action`]s for its runner, which
//! delivers them through a [`Network`].

mod action;
mod election;
mod ledger;
mod network;

pub use action::Action;
pub use election::ProposerElection;
pub use ledger::{ConsensusConf, LedgerError, LedgerRely, SnapshotReader};
pub use network::{Network, NetworkError, SubscriptionId};
