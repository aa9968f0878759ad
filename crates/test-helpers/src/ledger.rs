//! In-memory ledger.

use chainbft_core::{ConsensusConf, LedgerError, LedgerRely, SnapshotReader};
use chainbft_types::{
    new_to_old_qc, Address, BlockInfo, ConsensusStorage, LegacyError, ProposalId, QuorumCert,
};
use parking_lot::RwLock;
use std::collections::HashMap;

type StateKey = (String, Vec<u8>);

/// A linear chain of blocks plus a flat key/value state.
///
/// Block ids are the big-endian height bytes prefixed with `0xB0`, so a test
/// can name any block by height. The genesis block is height 0.
#[derive(Debug)]
pub struct MemLedger {
    blocks: RwLock<Vec<BlockInfo>>,
    state: RwLock<HashMap<StateKey, Vec<u8>>>,
    conf: RwLock<ConsensusConf>,
}

impl Default for MemLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemLedger {
    /// Ledger holding only the genesis block.
    pub fn new() -> Self {
        let genesis = BlockInfo {
            id: Self::block_id(0),
            pre_hash: ProposalId::empty(),
            height: 0,
            proposer: Address::new("genesis"),
            timestamp: 0,
            consensus_storage: Vec::new(),
        };
        Self {
            blocks: RwLock::new(vec![genesis]),
            state: RwLock::new(HashMap::new()),
            conf: RwLock::new(ConsensusConf {
                consensus_type: "chainbft".to_string(),
                start_height: 1,
                smr: None,
            }),
        }
    }

    /// Id of the block at `height`.
    pub fn block_id(height: u64) -> ProposalId {
        let mut bytes = vec![0xB0];
        bytes.extend_from_slice(&height.to_be_bytes());
        ProposalId::new(bytes)
    }

    /// Append a block on top of the tip, embedding `justify` in its storage.
    pub fn append(
        &self,
        proposer: Address,
        justify: Option<&QuorumCert>,
    ) -> Result<BlockInfo, LegacyError> {
        let mut blocks = self.blocks.write();
        let (pre_hash, height) = match blocks.last() {
            Some(tip) => (tip.id.clone(), tip.height + 1),
            None => (ProposalId::empty(), 0),
        };
        let storage = ConsensusStorage {
            justify: justify.map(new_to_old_qc).transpose()?,
            cur_term: 0,
            cur_block_num: height,
        };
        let block = BlockInfo {
            id: Self::block_id(height),
            pre_hash,
            height,
            proposer,
            timestamp: height as i64,
            consensus_storage: storage.encode()?,
        };
        blocks.push(block.clone());
        Ok(block)
    }

    /// Append `n` blocks without justifications.
    pub fn extend(&self, n: usize, proposer: &Address) -> Result<(), LegacyError> {
        for _ in 0..n {
            self.append(proposer.clone(), None)?;
        }
        Ok(())
    }

    /// Drop every block above `height`.
    pub fn truncate(&self, height: u64) {
        self.blocks.write().retain(|b| b.height <= height);
    }

    pub fn tip_height(&self) -> u64 {
        self.blocks.read().last().map(|b| b.height).unwrap_or_default()
    }

    pub fn put_state(&self, bucket: &str, key: &[u8], value: Vec<u8>) {
        self.state
            .write()
            .insert((bucket.to_string(), key.to_vec()), value);
    }

    pub fn set_consensus_conf(&self, conf: ConsensusConf) {
        *self.conf.write() = conf;
    }

    fn snapshot(&self) -> MemSnapshot {
        MemSnapshot {
            entries: self.state.read().clone(),
        }
    }
}

impl LedgerRely for MemLedger {
    fn query_block_header(&self, id: &ProposalId) -> Result<BlockInfo, LedgerError> {
        self.blocks
            .read()
            .iter()
            .find(|b| b.id == *id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))
    }

    fn query_block_header_by_height(&self, height: u64) -> Result<BlockInfo, LedgerError> {
        self.blocks
            .read()
            .iter()
            .find(|b| b.height == height)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("height {}", height)))
    }

    fn get_tip_block(&self) -> Result<BlockInfo, LedgerError> {
        self.blocks
            .read()
            .last()
            .cloned()
            .ok_or_else(|| LedgerError::NotFound("tip".to_string()))
    }

    fn query_tip_block_header(&self) -> Result<BlockInfo, LedgerError> {
        self.get_tip_block()
    }

    fn get_consensus_conf(&self) -> Result<ConsensusConf, LedgerError> {
        Ok(self.conf.read().clone())
    }

    fn create_snapshot(&self, id: &ProposalId) -> Result<Box<dyn SnapshotReader>, LedgerError> {
        self.query_block_header(id)?;
        Ok(Box::new(self.snapshot()))
    }

    fn get_tip_snapshot_reader(&self) -> Result<Box<dyn SnapshotReader>, LedgerError> {
        Ok(Box::new(self.snapshot()))
    }
}

/// Point-in-time copy of the ledger state.
#[derive(Debug, Clone, Default)]
pub struct MemSnapshot {
    entries: HashMap<StateKey, Vec<u8>>,
}

impl SnapshotReader for MemSnapshot {
    fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>, LedgerError> {
        Ok(self.entries.get(&(bucket.to_string(), key.to_vec())).cloned())
    }
}
