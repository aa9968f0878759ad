//! Pending quorum-certificate tree.
//!
//! Holds every proposal that has not yet been committed, the orphan pool for
//! proposals whose parent has not arrived, and the four rolling pointers of
//! the 3-chain commit rule:
//!
//! ```text
//! commitQC <- lockedQC <- genericQC <- highQC
//! ```
//!
//! Nodes live in an arena keyed by proposal id. Children are stored as ids
//! and every pointer is an id looked up in the arena, so there are no
//! ownership cycles and readers get cloned snapshots.
//!
//! All operations take the internal lock once. Read-only queries may run
//! concurrently with the SMR's serialized mutation path.

use crate::error::TreeError;
use chainbft_core::{LedgerError, LedgerRely};
use chainbft_types::{BlockInfo, ProposalId, QuorumCert, VoteInfo};
use indexmap::IndexSet;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, info, trace};

/// A proposal in the pending tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalNode {
    pub qc: QuorumCert,
    pub sons: Vec<ProposalId>,
}

impl ProposalNode {
    fn new(qc: QuorumCert) -> Self {
        Self {
            qc,
            sons: Vec::new(),
        }
    }

    fn id(&self) -> &ProposalId {
        self.qc.proposal_id()
    }

    fn view(&self) -> u64 {
        self.qc.proposal_view()
    }
}

/// Unsigned certificate describing a ledger block.
pub fn block_qc(block: &BlockInfo) -> QuorumCert {
    QuorumCert::unsigned(VoteInfo::new(
        block.id.clone(),
        block.height,
        block.pre_hash.clone(),
        block.height.saturating_sub(1),
    ))
}

struct TreeState {
    genesis: QuorumCert,

    /// Nodes reachable from `root`.
    nodes: HashMap<ProposalId, ProposalNode>,

    /// Every node waiting for an ancestor, including nested ones.
    orphans: HashMap<ProposalId, ProposalNode>,

    /// Roots of orphan subtrees, in arrival order.
    orphan_roots: IndexSet<ProposalId>,

    root: ProposalId,
    high_qc: Option<ProposalId>,
    generic_qc: Option<ProposalId>,
    locked_qc: Option<ProposalId>,
    commit_qc: Option<ProposalId>,
}

impl TreeState {
    fn contains(&self, id: &ProposalId) -> bool {
        self.nodes.contains_key(id) || self.orphans.contains_key(id)
    }

    fn view_of(&self, id: &Option<ProposalId>) -> Option<u64> {
        id.as_ref()
            .and_then(|id| self.nodes.get(id))
            .map(ProposalNode::view)
    }

    fn qc_of(&self, id: &Option<ProposalId>) -> Option<QuorumCert> {
        id.as_ref()
            .and_then(|id| self.nodes.get(id))
            .map(|n| n.qc.clone())
    }

    fn root_view(&self) -> u64 {
        self.nodes.get(&self.root).map(ProposalNode::view).unwrap_or(0)
    }

    /// Parent of an attached node, if it is attached too.
    fn parent_of(&self, id: &ProposalId) -> Option<ProposalId> {
        let node = self.nodes.get(id)?;
        let parent = node.qc.parent_id();
        (parent != id && self.nodes.contains_key(parent)).then(|| parent.clone())
    }

    fn update_qcs(&mut self, id: &ProposalId) {
        let generic = self.parent_of(id);
        let locked = generic.as_ref().and_then(|g| self.parent_of(g));
        let commit = locked.as_ref().and_then(|l| self.parent_of(l));

        if self.high_qc.as_ref() != Some(id) {
            info!(
                high_qc = %id,
                view = self.nodes.get(id).map(ProposalNode::view),
                "HighQC updated"
            );
        }
        self.high_qc = Some(id.clone());
        self.generic_qc = generic;
        self.locked_qc = locked;
        self.commit_qc = commit;
    }

    fn update_high_qc(&mut self, id: &ProposalId) -> bool {
        let Some(view) = self.nodes.get(id).map(ProposalNode::view) else {
            return false;
        };
        match self.view_of(&self.high_qc) {
            Some(high_view) if view < high_view => {
                trace!(id = %id, view, high_view, "Refusing to move highQC backward");
                false
            }
            _ => {
                self.update_qcs(id);
                true
            }
        }
    }

    /// Move orphan subtrees whose root names `parent` under it.
    ///
    /// Returns the ids that became attached to the main tree.
    fn adopt_orphans(&mut self, parent: &ProposalId) -> Vec<ProposalId> {
        let waiting: Vec<ProposalId> = self
            .orphan_roots
            .iter()
            .filter(|id| {
                self.orphans
                    .get(*id)
                    .is_some_and(|n| n.qc.parent_id() == parent)
            })
            .cloned()
            .collect();
        if waiting.is_empty() {
            return Vec::new();
        }

        let attached = self.nodes.contains_key(parent);
        let mut moved = Vec::new();
        for id in waiting {
            self.orphan_roots.shift_remove(&id);
            if let Some(node) = self.nodes.get_mut(parent) {
                node.sons.push(id.clone());
            } else if let Some(node) = self.orphans.get_mut(parent) {
                node.sons.push(id.clone());
            }
            debug!(orphan = %id, parent = %parent, attached, "Adopted orphan");
            if attached {
                moved.extend(self.promote_subtree(&id));
            }
        }
        moved
    }

    /// Move an orphan subtree into the main arena.
    fn promote_subtree(&mut self, id: &ProposalId) -> Vec<ProposalId> {
        let mut moved = Vec::new();
        let mut queue = VecDeque::from([id.clone()]);
        while let Some(next) = queue.pop_front() {
            if let Some(node) = self.orphans.remove(&next) {
                queue.extend(node.sons.iter().cloned());
                self.nodes.insert(next.clone(), node);
                moved.push(next);
            }
        }
        moved
    }

    /// Collect the ids of a subtree in `arena`.
    fn subtree(arena: &HashMap<ProposalId, ProposalNode>, id: &ProposalId) -> Vec<ProposalId> {
        let mut out = Vec::new();
        let mut stack = vec![id.clone()];
        while let Some(next) = stack.pop() {
            if let Some(node) = arena.get(&next) {
                stack.extend(node.sons.iter().cloned());
                out.push(next);
            }
        }
        out
    }

    /// Drop orphan subtrees whose root is at or below the tree root's view.
    fn evict_stale_orphans(&mut self) {
        let root_view = self.root_view();
        let stale: Vec<ProposalId> = self
            .orphan_roots
            .iter()
            .filter(|id| self.orphans.get(*id).is_some_and(|n| n.view() <= root_view))
            .cloned()
            .collect();
        for id in stale {
            self.orphan_roots.shift_remove(&id);
            for evicted in Self::subtree(&self.orphans, &id) {
                self.orphans.remove(&evicted);
            }
            debug!(orphan = %id, root_view, "Evicted stale orphan subtree");
        }
    }

    fn insert_orphan(&mut self, node: ProposalNode) {
        self.evict_stale_orphans();

        let id = node.id().clone();
        let root_view = self.root_view();
        if node.view() <= root_view {
            debug!(id = %id, view = node.view(), root_view, "Dropping stale orphan");
            return;
        }

        let parent = node.qc.parent_id().clone();
        self.orphans.insert(id.clone(), node);
        if let Some(parent_node) = self.orphans.get_mut(&parent) {
            parent_node.sons.push(id.clone());
            debug!(id = %id, parent = %parent, "Grafted onto orphan subtree");
        } else {
            self.orphan_roots.insert(id.clone());
            debug!(id = %id, parent = %parent, "Parked orphan");
        }
        self.adopt_orphans(&id);
    }
}

/// Tree of pending proposals with the 3-chain commit pointers.
pub struct QcPendingTree {
    state: RwLock<TreeState>,
}

impl std::fmt::Debug for QcPendingTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.state.read();
        f.debug_struct("QcPendingTree")
            .field("root", &s.root)
            .field("high_qc", &s.high_qc)
            .field("nodes", &s.nodes.len())
            .field("orphans", &s.orphans.len())
            .finish()
    }
}

impl QcPendingTree {
    /// Single-node tree rooted at `root`, which is also the highQC.
    pub fn new(genesis: QuorumCert, root: QuorumCert) -> Self {
        let root_id = root.proposal_id().clone();
        let mut nodes = HashMap::new();
        nodes.insert(root_id.clone(), ProposalNode::new(root));
        Self {
            state: RwLock::new(TreeState {
                genesis,
                nodes,
                orphans: HashMap::new(),
                orphan_roots: IndexSet::new(),
                root: root_id.clone(),
                high_qc: Some(root_id),
                generic_qc: None,
                locked_qc: None,
                commit_qc: None,
            }),
        }
    }

    /// Bootstrap from ledger state.
    ///
    /// Near the start of the chain the tree is a single node at the tip.
    /// Otherwise the last three blocks below the tip are rebuilt as a chain
    /// `root <- genericQC <- highQC`; the ledger must guarantee they are an
    /// uninterrupted ancestor chain.
    pub fn init_qc_tree(start_height: u64, ledger: &dyn LedgerRely) -> Result<Self, LedgerError> {
        let genesis_block = ledger.query_block_header_by_height(start_height.saturating_sub(1))?;
        let genesis = block_qc(&genesis_block);
        let tip = ledger.query_tip_block_header()?;

        if tip.height < start_height.saturating_add(3) {
            info!(
                start_height,
                tip_height = tip.height,
                "Initialized single-node QC tree"
            );
            return Ok(Self::new(genesis, block_qc(&tip)));
        }

        let high = ledger.query_block_header_by_height(tip.height - 1)?;
        let generic = ledger.query_block_header_by_height(tip.height - 2)?;
        let root = ledger.query_block_header_by_height(tip.height - 3)?;

        let tree = Self::new(genesis, block_qc(&root));
        {
            let mut s = tree.state.write();
            for (parent, block) in [(&root, &generic), (&generic, &high)] {
                if let Some(p) = s.nodes.get_mut(&parent.id) {
                    p.sons.push(block.id.clone());
                }
                s.nodes
                    .insert(block.id.clone(), ProposalNode::new(block_qc(block)));
            }
            s.update_qcs(&high.id);
        }
        info!(
            start_height,
            root = root.height,
            high_qc = high.height,
            "Rebuilt QC tree from ledger"
        );
        Ok(tree)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Mutation
    // ═══════════════════════════════════════════════════════════════════════

    /// Insert a proposal node.
    ///
    /// Attaches under its parent when present (adopting any orphans waiting
    /// on it), otherwise parks it in the orphan pool. Duplicates are a no-op.
    /// When the newest attached node's parent is not behind the highQC, the
    /// pointers move to that parent.
    pub fn update_qc_status(&self, qc: QuorumCert) -> Result<(), TreeError> {
        if qc.proposal_id().is_empty() {
            return Err(TreeError::NoValidQc);
        }
        if qc.parent_id().is_empty() || qc.parent_id() == qc.proposal_id() {
            return Err(TreeError::NoValidParentId);
        }

        let mut s = self.state.write();
        let id = qc.proposal_id().clone();
        if s.contains(&id) {
            trace!(id = %id, "Node already in tree");
            return Ok(());
        }

        let parent = qc.parent_id().clone();
        let node = ProposalNode::new(qc);
        let Some(parent_node) = s.nodes.get_mut(&parent) else {
            s.insert_orphan(node);
            return Ok(());
        };

        parent_node.sons.push(id.clone());
        s.nodes.insert(id.clone(), node);
        let mut attached = vec![id.clone()];
        attached.extend(s.adopt_orphans(&id));

        let newest = attached
            .iter()
            .filter_map(|a| s.nodes.get(a))
            .max_by_key(|n| n.view())
            .map(|n| (n.qc.parent_id().clone(), n.qc.parent_view()));
        if let Some((parent_id, parent_view)) = newest {
            let high_view = s.view_of(&s.high_qc);
            if high_view.map_or(true, |h| parent_view >= h) && s.nodes.contains_key(&parent_id) {
                s.update_qcs(&parent_id);
            }
        }
        Ok(())
    }

    /// Move highQC to `id` unless that would move it backward in view.
    pub fn update_high_qc(&self, id: &ProposalId) -> bool {
        self.state.write().update_high_qc(id)
    }

    /// Move highQC to `id` regardless of view. Used for rollback recovery.
    pub fn enforce_update_high_qc(&self, id: &ProposalId) -> Result<(), TreeError> {
        let mut s = self.state.write();
        if !s.nodes.contains_key(id) {
            return Err(TreeError::NoValidQc);
        }
        info!(id = %id, "Forcing highQC");
        s.update_qcs(id);
        Ok(())
    }

    /// Advance the root to the great-grandparent of `id` and prune everything
    /// that does not descend from it.
    ///
    /// Returns whether the root moved.
    pub fn update_commit(&self, id: &ProposalId) -> bool {
        let mut s = self.state.write();
        let Some(p1) = s.parent_of(id) else {
            return false;
        };
        let Some(p2) = s.parent_of(&p1) else {
            return false;
        };
        let Some(p3) = s.parent_of(&p2) else {
            return false;
        };

        let new_root_view = s.nodes.get(&p3).map(ProposalNode::view).unwrap_or(0);
        let old_root_view = s.root_view();
        if new_root_view <= old_root_view {
            return false;
        }

        let keep: HashSet<ProposalId> = TreeState::subtree(&s.nodes, &p3).into_iter().collect();
        let before = s.nodes.len();
        s.nodes.retain(|k, _| keep.contains(k));
        s.root = p3.clone();
        s.evict_stale_orphans();

        let anchor = match &s.high_qc {
            Some(high) if s.nodes.contains_key(high) => high.clone(),
            _ => p3.clone(),
        };
        s.update_qcs(&anchor);

        info!(
            root = %p3,
            root_view = new_root_view,
            pruned = before - s.nodes.len(),
            "Advanced tree root"
        );
        true
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════════

    /// Look up an attached node.
    pub fn query_node(&self, id: &ProposalId) -> Option<ProposalNode> {
        self.state.read().nodes.get(id).cloned()
    }

    /// Whether `id` is attached to the tree.
    pub fn contains(&self, id: &ProposalId) -> bool {
        self.state.read().nodes.contains_key(id)
    }

    /// Children of an attached node.
    pub fn sons(&self, id: &ProposalId) -> Vec<ProposalId> {
        self.state
            .read()
            .nodes
            .get(id)
            .map(|n| n.sons.clone())
            .unwrap_or_default()
    }

    pub fn genesis_qc(&self) -> QuorumCert {
        self.state.read().genesis.clone()
    }

    pub fn root_qc(&self) -> QuorumCert {
        let s = self.state.read();
        s.nodes
            .get(&s.root)
            .map(|n| n.qc.clone())
            .unwrap_or_default()
    }

    pub fn high_qc(&self) -> Option<QuorumCert> {
        let s = self.state.read();
        s.qc_of(&s.high_qc)
    }

    pub fn generic_qc(&self) -> Option<QuorumCert> {
        let s = self.state.read();
        s.qc_of(&s.generic_qc)
    }

    pub fn locked_qc(&self) -> Option<QuorumCert> {
        let s = self.state.read();
        s.qc_of(&s.locked_qc)
    }

    pub fn commit_qc(&self) -> Option<QuorumCert> {
        let s = self.state.read();
        s.qc_of(&s.commit_qc)
    }

    /// Number of nodes in the orphan pool.
    pub fn orphan_count(&self) -> usize {
        self.state.read().orphans.len()
    }

    /// Number of attached nodes.
    pub fn len(&self) -> usize {
        self.state.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn pid(n: u64) -> ProposalId {
        ProposalId::new(n.to_be_bytes().to_vec())
    }

    fn qc(id: u64, view: u64, parent: u64, parent_view: u64) -> QuorumCert {
        QuorumCert::unsigned(VoteInfo::new(pid(id), view, pid(parent), parent_view))
    }

    /// Ids double as views.
    fn chain_qc(id: u64, parent: u64) -> QuorumCert {
        qc(id, id, parent, parent)
    }

    fn tree_at_zero() -> QcPendingTree {
        let genesis = QuorumCert::unsigned(VoteInfo::new(pid(0), 0, ProposalId::empty(), 0));
        QcPendingTree::new(genesis.clone(), genesis)
    }

    #[test]
    fn test_rejects_malformed_qc() {
        let tree = tree_at_zero();
        let no_id = QuorumCert::unsigned(VoteInfo::new(ProposalId::empty(), 1, pid(0), 0));
        assert_eq!(tree.update_qc_status(no_id), Err(TreeError::NoValidQc));

        let no_parent = QuorumCert::unsigned(VoteInfo::new(pid(1), 1, ProposalId::empty(), 0));
        assert_eq!(
            tree.update_qc_status(no_parent),
            Err(TreeError::NoValidParentId)
        );
    }

    #[test]
    fn test_self_parent_rejected() {
        let tree = tree_at_zero();
        assert_eq!(
            tree.update_qc_status(qc(9, 2, 9, 1)),
            Err(TreeError::NoValidParentId)
        );
        assert_eq!(tree.orphan_count(), 0);

        for i in 1..=6 {
            tree.update_qc_status(chain_qc(i, i - 1)).unwrap();
        }
        assert!(tree.update_commit(&pid(6)));
        assert_eq!(tree.root_qc().proposal_id(), &pid(3));

        tree.update_qc_status(qc(70, 8, 69, 7)).unwrap();
        assert_eq!(tree.orphan_count(), 1);
    }

    #[test]
    fn test_duplicate_insert_is_noop() {
        let tree = tree_at_zero();
        tree.update_qc_status(chain_qc(1, 0)).unwrap();
        tree.update_qc_status(chain_qc(1, 0)).unwrap();
        assert_eq!(tree.sons(&pid(0)), vec![pid(1)]);
        assert_eq!(tree.len(), 2);
    }

    #[traced_test]
    #[test]
    fn test_commit_rule() {
        let tree = tree_at_zero();
        for i in 1..=3 {
            tree.update_qc_status(chain_qc(i, i - 1)).unwrap();
        }
        assert!(tree.update_high_qc(&pid(3)));

        assert_eq!(tree.high_qc().unwrap().proposal_id(), &pid(3));
        assert_eq!(tree.generic_qc().unwrap().proposal_id(), &pid(2));
        assert_eq!(tree.locked_qc().unwrap().proposal_id(), &pid(1));
        assert_eq!(tree.commit_qc().unwrap().proposal_id(), &pid(0));
    }

    #[test]
    fn test_insert_moves_high_qc_to_parent() {
        let tree = tree_at_zero();
        tree.update_qc_status(chain_qc(1, 0)).unwrap();
        assert_eq!(tree.high_qc().unwrap().proposal_id(), &pid(0));
        tree.update_qc_status(chain_qc(2, 1)).unwrap();
        assert_eq!(tree.high_qc().unwrap().proposal_id(), &pid(1));
        assert_eq!(tree.generic_qc().unwrap().proposal_id(), &pid(0));
        assert!(tree.locked_qc().is_none());
    }

    #[test]
    fn test_high_qc_is_monotonic() {
        let tree = tree_at_zero();
        for i in 1..=3 {
            tree.update_qc_status(chain_qc(i, i - 1)).unwrap();
        }
        assert!(tree.update_high_qc(&pid(3)));
        assert!(!tree.update_high_qc(&pid(1)));
        assert_eq!(tree.high_qc().unwrap().proposal_id(), &pid(3));
        assert!(!tree.update_high_qc(&pid(99)));
    }

    #[test]
    fn test_enforce_update_high_qc() {
        let tree = tree_at_zero();
        for i in 1..=3 {
            tree.update_qc_status(chain_qc(i, i - 1)).unwrap();
        }
        tree.update_high_qc(&pid(3));
        tree.enforce_update_high_qc(&pid(1)).unwrap();
        assert_eq!(tree.high_qc().unwrap().proposal_id(), &pid(1));
        assert_eq!(tree.generic_qc().unwrap().proposal_id(), &pid(0));
        assert!(tree.locked_qc().is_none());
        assert_eq!(
            tree.enforce_update_high_qc(&pid(42)),
            Err(TreeError::NoValidQc)
        );
    }

    #[traced_test]
    #[test]
    fn test_root_pruning() {
        let tree = tree_at_zero();
        for i in 1..=4 {
            tree.update_qc_status(chain_qc(i, i - 1)).unwrap();
        }
        // Sibling branch off the old root.
        tree.update_qc_status(qc(11, 1, 0, 0)).unwrap();
        assert!(tree.query_node(&pid(11)).is_some());

        assert!(tree.update_commit(&pid(4)));
        assert_eq!(tree.root_qc().proposal_id(), &pid(1));
        assert_eq!(tree.root_qc().proposal_view(), 1);
        assert!(tree.query_node(&pid(11)).is_none());
        assert!(tree.query_node(&pid(0)).is_none());
        assert!(tree.query_node(&pid(4)).is_some());

        // A second commit for the same ancestor leaves the root alone.
        assert!(!tree.update_commit(&pid(4)));
    }

    #[test]
    fn test_update_commit_needs_three_ancestors() {
        let tree = tree_at_zero();
        for i in 1..=2 {
            tree.update_qc_status(chain_qc(i, i - 1)).unwrap();
        }
        assert!(!tree.update_commit(&pid(2)));
        assert!(!tree.update_commit(&pid(77)));
        assert_eq!(tree.root_qc().proposal_id(), &pid(0));
    }

    #[test]
    fn test_update_commit_repairs_pruned_high_qc() {
        let tree = tree_at_zero();
        for i in 1..=4 {
            tree.update_qc_status(chain_qc(i, i - 1)).unwrap();
        }
        tree.update_qc_status(qc(11, 1, 0, 0)).unwrap();
        tree.enforce_update_high_qc(&pid(11)).unwrap();

        assert!(tree.update_commit(&pid(4)));
        assert_eq!(tree.high_qc().unwrap().proposal_id(), &pid(1));
        assert!(tree.generic_qc().is_none());
    }

    #[traced_test]
    #[test]
    fn test_orphans_converge() {
        let tree = tree_at_zero();

        tree.update_qc_status(chain_qc(40, 35)).unwrap();
        tree.update_qc_status(chain_qc(30, 10)).unwrap();
        assert_eq!(tree.orphan_count(), 2);

        tree.update_qc_status(chain_qc(35, 30)).unwrap();
        assert_eq!(tree.orphan_count(), 3);
        assert!(!tree.contains(&pid(35)));

        tree.update_qc_status(chain_qc(10, 0)).unwrap();
        assert_eq!(tree.orphan_count(), 0);

        assert_eq!(tree.sons(&pid(0)), vec![pid(10)]);
        assert_eq!(tree.sons(&pid(10)), vec![pid(30)]);
        assert_eq!(tree.sons(&pid(30)), vec![pid(35)]);
        assert_eq!(tree.sons(&pid(35)), vec![pid(40)]);
        assert_eq!(tree.high_qc().unwrap().proposal_id(), &pid(35));
        assert_eq!(tree.commit_qc().unwrap().proposal_id(), &pid(0));
    }

    #[test]
    fn test_orphan_order_does_not_change_shape() {
        let causal = tree_at_zero();
        for (id, parent) in [(10, 0), (30, 10), (35, 30), (40, 35)] {
            causal.update_qc_status(chain_qc(id, parent)).unwrap();
        }
        let permuted = tree_at_zero();
        for (id, parent) in [(35, 30), (40, 35), (10, 0), (30, 10)] {
            permuted.update_qc_status(chain_qc(id, parent)).unwrap();
        }
        for id in [0, 10, 30, 35, 40] {
            assert_eq!(causal.sons(&pid(id)), permuted.sons(&pid(id)));
        }
        assert_eq!(permuted.orphan_count(), 0);
        assert_eq!(
            causal.high_qc().unwrap().proposal_id(),
            permuted.high_qc().unwrap().proposal_id()
        );
    }

    #[test]
    fn test_stale_orphans_evicted() {
        let tree = tree_at_zero();
        for i in 1..=4 {
            tree.update_qc_status(chain_qc(i, i - 1)).unwrap();
        }
        // Parent 50 never arrives; view 2 ends up below the new root.
        tree.update_qc_status(qc(60, 2, 50, 1)).unwrap();
        assert_eq!(tree.orphan_count(), 1);

        tree.update_qc_status(chain_qc(5, 4)).unwrap();
        assert!(tree.update_commit(&pid(5)));
        assert_eq!(tree.root_qc().proposal_id(), &pid(2));
        assert_eq!(tree.orphan_count(), 0);

        // Inserting a stale orphan is dropped outright.
        tree.update_qc_status(qc(61, 1, 51, 0)).unwrap();
        assert_eq!(tree.orphan_count(), 0);
    }
}
