//! Domain-specific identifier types.

use sbor::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque proposal identifier (the id of the block being proposed).
#[derive(
    Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, BasicSbor, Serialize, Deserialize,
)]
#[sbor(transparent)]
#[serde(transparent)]
pub struct ProposalId(pub Vec<u8>);

impl ProposalId {
    /// Create a proposal id from raw bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// The empty id. Never a valid proposal.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Whether this id carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the bytes as a slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for ProposalId {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Debug for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProposalId({})", self)
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.len() > 8 {
            write!(f, "{}..", hex::encode(&self.0[..8]))
        } else {
            write!(f, "{}", hex::encode(&self.0))
        }
    }
}

/// Validator account address, derived from the validator's public key.
#[derive(
    Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, BasicSbor, Serialize, Deserialize,
)]
#[sbor(transparent)]
#[serde(transparent)]
pub struct Address(pub String);

impl Address {
    /// Create an address from any string-like value.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Get the address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the address is empty (no leader, unset signer).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
