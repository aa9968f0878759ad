//! Test helpers for the chained-BFT engine.
//!
//! Deterministic validator keys, a round-robin [`ProposerElection`], an
//! in-memory [`LedgerRely`] and a loopback [`Network`] that lets several
//! SMR instances talk inside one process.
//!
//! [`ProposerElection`]: chainbft_core::ProposerElection
//! [`LedgerRely`]: chainbft_core::LedgerRely
//! [`Network`]: chainbft_core::Network

mod election;
mod keys;
mod ledger;
mod network;

pub use election::RoundRobinElection;
pub use keys::{validator_address, validator_key, validator_keys, TestValidators};
pub use ledger::{MemLedger, MemSnapshot};
pub use network::{LoopbackHub, LoopbackNetwork};
