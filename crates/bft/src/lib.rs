//! Chained-HotStuff replication state machine.
//!
//! This crate provides a synchronous SMR that orders block proposals among a
//! rotating validator set and decides when a chain may be committed.
//!
//! # Architecture
//!
//! - [`QcPendingTree`]: uncommitted proposals, orphans and the 3-chain pointers
//! - [`Pacemaker`]: monotonic view counter
//! - [`SafetyRules`]: voting rules and Byzantine thresholds, tolerant of
//!   bounded ledger rollback
//! - [`Smr`]: the orchestrator, returning `Action`s for its runner
//!
//! All I/O is performed by the runner via returned `Action`s.

mod config;
mod crypto;
mod error;
mod pacemaker;
mod qc_tree;
mod safety_rules;
mod smr;

pub use config::{ConfigError, SmrConfig};
pub use crypto::SmrCrypto;
pub use error::{PacemakerError, SafetyError, SmrError, TreeError};
pub use pacemaker::{DefaultPacemaker, Pacemaker};
pub use qc_tree::{block_qc, ProposalNode, QcPendingTree};
pub use safety_rules::{cal_votes_threshold, DefaultSafetyRules, SafetyRules};
pub use smr::{LocalProposal, ResetOutcome, Smr};
