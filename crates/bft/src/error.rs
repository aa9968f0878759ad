//! Error types for the replication engine.

use crate::config::ConfigError;
use chainbft_core::LedgerError;
use chainbft_messages::CodecError;
use chainbft_types::{Address, CryptoError, LegacyError, ProposalId};
use thiserror::Error;

/// Structural errors from the pending tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// The certificate is missing, has no proposal id, or names an unknown node.
    #[error("No valid QC")]
    NoValidQc,

    /// The certificate has no parent id.
    #[error("No valid parent proposal id")]
    NoValidParentId,
}

/// Pacemaker errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacemakerError {
    #[error("Cannot advance view without a QC")]
    NilQc,
}

/// Reasons the safety rules reject a vote or proposal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SafetyError {
    #[error("Vote carries no signatures")]
    NoSigns,

    #[error("Signer {0} is not a validator")]
    SignerNotValidator(Address),

    #[error("Invalid signature from {address}: {reason}")]
    InvalidSignature { address: Address, reason: String },

    #[error("Round {round} is too far behind latest voted round {latest}")]
    RoundTooOld { round: u64, latest: u64 },

    #[error("Parent view {parent_view} is too far behind preferred round {preferred}")]
    ParentTooOld { parent_view: u64, preferred: u64 },

    #[error("Proposal view {view} is too far behind latest voted round {latest}")]
    ProposalTooOld { view: u64, latest: u64 },

    #[error("Justify validator set is empty")]
    EmptyValidators,

    #[error("Justify parent has no proposal id")]
    EmptyParentId,

    /// The justify target is neither in the tree nor near its root.
    #[error("Invalid justify target {id} at view {view}")]
    InvalidJustify { id: ProposalId, view: u64 },

    #[error("Insufficient votes: {have} of {total}")]
    InsufficientVotes { have: usize, total: usize },

    #[error("Pacemaker target {pending} is too far behind local view {local}")]
    PacemakerTooLow { pending: u64, local: u64 },
}

/// Errors returned by the SMR.
#[derive(Debug, Error)]
pub enum SmrError {
    #[error("New proposal at view {view} is behind locked view {locked_view}")]
    TooLowNewProposal { view: u64, locked_view: u64 },

    #[error("No highQC in the pending tree")]
    EmptyHighQc,

    #[error("Proposal {0} already handled")]
    SameProposalNotify(ProposalId),

    /// Duplicate proposal id from a different proposer.
    #[error("Proposal {id} already received from {known}, now from {claimed}")]
    ProposerMismatch {
        id: ProposalId,
        known: Address,
        claimed: Address,
    },

    #[error("Justify target {0} is not in the pending tree")]
    EmptyTarget(ProposalId),

    #[error("No votes collected for justify target {0}")]
    JustifyVotesEmpty(ProposalId),

    #[error("Local ledger at {ledger_state} is too far behind proposal view {view}")]
    OutdatedLedger { ledger_state: u64, view: u64 },

    #[error("Safety rules refused to vote for {0}")]
    VoteProposal(ProposalId),

    #[error("No leader for view {0}")]
    EmptyLeader(u64),

    #[error("Validator set is empty")]
    EmptyValidators,

    #[error("Proposal carries no signature")]
    MissingProposalSign,

    #[error("Vote info hash does not match ledger commit info")]
    InvalidVoteInfoHash,

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Pacemaker(#[from] PacemakerError),

    #[error(transparent)]
    Safety(#[from] SafetyError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Legacy QC error: {0}")]
    Legacy(#[from] LegacyError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}
