//! Ledger contract consumed by the SMR.

use chainbft_types::{BlockInfo, ProposalId};
use thiserror::Error;

/// Errors reported by a [`LedgerRely`].
///
/// The SMR treats `NotFound` as "ancestor unavailable", never as fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Block not found: {0}")]
    NotFound(String),

    #[error("Ledger backend error: {0}")]
    Backend(String),
}

/// Consensus configuration stored in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConsensusConf {
    /// Name of the consensus implementation active at `start_height`.
    pub consensus_type: String,

    /// Height from which this configuration applies.
    pub start_height: u64,

    /// Raw TOML fragment with SMR tuning, if the chain defines one.
    pub smr: Option<String>,
}

/// Read access to a snapshot of ledger state.
pub trait SnapshotReader: Send + Sync {
    /// Read `key` from `bucket`. `Ok(None)` when the key is absent.
    fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>, LedgerError>;
}

/// Ledger queries the SMR needs.
pub trait LedgerRely: Send + Sync {
    fn query_block_header(&self, id: &ProposalId) -> Result<BlockInfo, LedgerError>;

    fn query_block_header_by_height(&self, height: u64) -> Result<BlockInfo, LedgerError>;

    /// The block at the tip of the ledger.
    fn get_tip_block(&self) -> Result<BlockInfo, LedgerError>;

    /// Header of the tip block.
    fn query_tip_block_header(&self) -> Result<BlockInfo, LedgerError>;

    fn get_consensus_conf(&self) -> Result<ConsensusConf, LedgerError>;

    /// Snapshot of the state after block `id`.
    fn create_snapshot(&self, id: &ProposalId) -> Result<Box<dyn SnapshotReader>, LedgerError>;

    /// Snapshot of the state at the tip.
    fn get_tip_snapshot_reader(&self) -> Result<Box<dyn SnapshotReader>, LedgerError>;
}
