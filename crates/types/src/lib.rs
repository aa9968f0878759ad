//! Core types for the chained-BFT replication engine.
//!
//! Identifiers, digests, key material, quorum certificates and the legacy
//! consensus-storage layout shared by every other crate in the workspace.

mod block;
mod crypto;
mod hash;
mod identifiers;
pub mod legacy;
mod quorum_cert;
pub mod signing;

pub use block::BlockInfo;
pub use crypto::{
    CryptoClient, CryptoError, Ed25519Client, KeyPair, PublicKey, Signature, CURVE_ED25519,
};
pub use hash::{Hash, HexError};
pub use identifiers::{Address, ProposalId};
pub use legacy::{new_to_old_qc, old_qc_to_new, ConsensusStorage, LegacyError};
pub use quorum_cert::{LedgerCommitInfo, QuorumCert, QuorumCertSign, VoteInfo};
