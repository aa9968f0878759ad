//! Voting and acceptance rules.
//!
//! Strict Chained-HotStuff requires exact round adjacency. Chains built on
//! this engine may re-mine a height, so every comparison here allows a
//! bounded lag instead: `strict_window` for votes and pacemaker targets,
//! `permissive_window` for proposals and justify targets.

use crate::config::SmrConfig;
use crate::crypto::SmrCrypto;
use crate::error::SafetyError;
use crate::qc_tree::QcPendingTree;
use chainbft_types::{Address, ProposalId, QuorumCert};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Whether `have` collected votes plus the leader's own reach quorum among `total`.
///
/// With `f = (total - 1) / 3` tolerated faults, tiny sets (`f == 0`) need
/// every validator; larger sets need `total - f`.
pub fn cal_votes_threshold(have: usize, total: usize) -> bool {
    if total == 0 {
        return false;
    }
    let f = (total - 1) / 3;
    if f == 0 {
        have + 1 >= total
    } else {
        have + 1 >= total - f
    }
}

/// `true` when `value` lies more than `window` behind `reference`.
fn behind_window(value: u64, reference: u64, window: u64) -> bool {
    reference
        .checked_sub(window)
        .is_some_and(|floor| value < floor)
}

/// Safety rules consulted by the SMR.
pub trait SafetyRules: Send + Sync {
    /// `preferred_round = max(preferred_round, round - 1)`.
    fn update_preferred_round(&mut self, round: u64);

    /// Decide whether to vote for `id` at `round` extending `parent`.
    fn vote_proposal(&mut self, id: &ProposalId, round: u64, parent: &QuorumCert) -> bool;

    /// Validate a single received vote.
    fn check_vote(
        &self,
        qc: &QuorumCert,
        logid: &str,
        validators: &[Address],
    ) -> Result<(), SafetyError>;

    /// Validate a proposal and the certificate justifying its parent.
    fn check_proposal(
        &self,
        proposal: &QuorumCert,
        parent: &QuorumCert,
        justify_validators: &[Address],
        tree: &QcPendingTree,
    ) -> Result<(), SafetyError>;

    fn cal_votes_threshold(&self, have: usize, total: usize) -> bool {
        cal_votes_threshold(have, total)
    }

    /// Reject pacemaker targets far behind the local view.
    fn check_pacemaker(&self, pending: u64, local: u64) -> Result<(), SafetyError>;

    fn latest_round(&self) -> u64;

    fn preferred_round(&self) -> u64;
}

/// Safety rules with configurable rollback windows.
pub struct DefaultSafetyRules {
    latest_round: u64,
    preferred_round: u64,
    strict_window: u64,
    permissive_window: u64,
    crypto: Arc<SmrCrypto>,
}

impl DefaultSafetyRules {
    pub fn new(config: &SmrConfig, crypto: Arc<SmrCrypto>) -> Self {
        Self {
            latest_round: 0,
            preferred_round: 0,
            strict_window: config.strict_window,
            permissive_window: config.permissive_window,
            crypto,
        }
    }

    /// Count distinct validators with a valid signature over `qc`'s vote.
    fn count_valid_signs(&self, qc: &QuorumCert, validators: &[Address]) -> usize {
        let mut seen = HashSet::new();
        for sign in &qc.sign_infos {
            if !validators.contains(&sign.address) || seen.contains(&sign.address) {
                continue;
            }
            match self.crypto.verify_vote_sign(&qc.vote_info, sign) {
                Ok(()) => {
                    seen.insert(sign.address.clone());
                }
                Err(e) => {
                    warn!(
                        signer = %sign.address,
                        proposal = %qc.proposal_id(),
                        error = %e,
                        "Invalid signature in justify QC"
                    );
                }
            }
        }
        seen.len()
    }
}

impl SafetyRules for DefaultSafetyRules {
    fn update_preferred_round(&mut self, round: u64) {
        self.preferred_round = self.preferred_round.max(round.saturating_sub(1));
    }

    fn vote_proposal(&mut self, id: &ProposalId, round: u64, parent: &QuorumCert) -> bool {
        if behind_window(round, self.latest_round, self.strict_window) {
            debug!(
                proposal = %id,
                round,
                latest_round = self.latest_round,
                "Refusing to vote: round too old"
            );
            return false;
        }
        if behind_window(
            parent.proposal_view(),
            self.preferred_round,
            self.strict_window,
        ) {
            debug!(
                proposal = %id,
                parent_view = parent.proposal_view(),
                preferred_round = self.preferred_round,
                "Refusing to vote: parent too old"
            );
            return false;
        }
        self.latest_round = self.latest_round.max(round);
        true
    }

    fn check_vote(
        &self,
        qc: &QuorumCert,
        logid: &str,
        validators: &[Address],
    ) -> Result<(), SafetyError> {
        let sign = qc.sign_infos.first().ok_or(SafetyError::NoSigns)?;
        if !validators.contains(&sign.address) {
            debug!(logid, signer = %sign.address, "Vote from non-validator");
            return Err(SafetyError::SignerNotValidator(sign.address.clone()));
        }
        if let Err(e) = self.crypto.verify_vote_sign(&qc.vote_info, sign) {
            warn!(logid, signer = %sign.address, error = %e, "Invalid vote signature");
            return Err(SafetyError::InvalidSignature {
                address: sign.address.clone(),
                reason: e.to_string(),
            });
        }
        if behind_window(qc.proposal_view(), self.latest_round, self.strict_window) {
            return Err(SafetyError::RoundTooOld {
                round: qc.proposal_view(),
                latest: self.latest_round,
            });
        }
        if behind_window(qc.parent_view(), self.preferred_round, self.strict_window) {
            return Err(SafetyError::ParentTooOld {
                parent_view: qc.parent_view(),
                preferred: self.preferred_round,
            });
        }
        Ok(())
    }

    fn check_proposal(
        &self,
        proposal: &QuorumCert,
        parent: &QuorumCert,
        justify_validators: &[Address],
        tree: &QcPendingTree,
    ) -> Result<(), SafetyError> {
        if behind_window(
            proposal.proposal_view(),
            self.latest_round,
            self.permissive_window,
        ) {
            return Err(SafetyError::ProposalTooOld {
                view: proposal.proposal_view(),
                latest: self.latest_round,
            });
        }
        if justify_validators.is_empty() {
            return Err(SafetyError::EmptyValidators);
        }
        if parent.proposal_id().is_empty() {
            return Err(SafetyError::EmptyParentId);
        }

        if !tree.contains(parent.proposal_id()) {
            let root = tree.root_qc();
            let view = parent.proposal_view();
            let upper = root.proposal_view().saturating_add(self.permissive_window);
            if view < root.parent_view() || view > upper {
                debug!(
                    parent = %parent.proposal_id(),
                    view,
                    root_view = root.proposal_view(),
                    "Justify target outside tolerated range"
                );
                return Err(SafetyError::InvalidJustify {
                    id: parent.proposal_id().clone(),
                    view,
                });
            }
        }

        let have = self.count_valid_signs(parent, justify_validators);
        if !cal_votes_threshold(have, justify_validators.len()) {
            return Err(SafetyError::InsufficientVotes {
                have,
                total: justify_validators.len(),
            });
        }
        Ok(())
    }

    fn check_pacemaker(&self, pending: u64, local: u64) -> Result<(), SafetyError> {
        if local
            .checked_sub(self.strict_window)
            .is_some_and(|floor| pending <= floor)
        {
            return Err(SafetyError::PacemakerTooLow { pending, local });
        }
        Ok(())
    }

    fn latest_round(&self) -> u64 {
        self.latest_round
    }

    fn preferred_round(&self) -> u64 {
        self.preferred_round
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainbft_types::{Ed25519Client, KeyPair, LedgerCommitInfo, VoteInfo};
    use tracing_test::traced_test;

    fn crypto(seed: u8) -> Arc<SmrCrypto> {
        Arc::new(SmrCrypto::new(
            Arc::new(Ed25519Client),
            KeyPair::from_seed(&[seed; 32]),
        ))
    }

    fn rules() -> DefaultSafetyRules {
        DefaultSafetyRules::new(&SmrConfig::default(), crypto(1))
    }

    fn pid(n: u8) -> ProposalId {
        ProposalId::new(vec![n])
    }

    fn vote_info(id: u8, view: u64, parent: u8, parent_view: u64) -> VoteInfo {
        VoteInfo::new(pid(id), view, pid(parent), parent_view)
    }

    fn signed_qc(info: VoteInfo, signers: &[u8]) -> QuorumCert {
        let signs = signers
            .iter()
            .map(|s| crypto(*s).sign_vote(&info).unwrap())
            .collect();
        QuorumCert::new(info.clone(), LedgerCommitInfo::for_vote(&info), signs)
    }

    fn validators(seeds: &[u8]) -> Vec<Address> {
        seeds.iter().map(|s| crypto(*s).address().clone()).collect()
    }

    fn tree() -> QcPendingTree {
        let root = QuorumCert::unsigned(vote_info(0, 0, 255, 0));
        QcPendingTree::new(root.clone(), root)
    }

    #[test]
    fn test_votes_threshold() {
        assert!(cal_votes_threshold(2, 3));
        assert!(!cal_votes_threshold(1, 3));
        assert!(cal_votes_threshold(2, 4));
        assert!(!cal_votes_threshold(1, 4));
        assert!(cal_votes_threshold(0, 1));
        assert!(!cal_votes_threshold(0, 0));
        assert!(cal_votes_threshold(4, 7));
        assert!(!cal_votes_threshold(3, 7));
        for total in 1..20 {
            let mut reached = false;
            for have in 0..=total {
                let ok = cal_votes_threshold(have, total);
                assert!(!reached || ok, "threshold not monotonic at {have}/{total}");
                reached |= ok;
            }
            assert!(reached);
        }
    }

    #[test]
    fn test_update_preferred_round() {
        let mut r = rules();
        r.update_preferred_round(5);
        assert_eq!(r.preferred_round(), 4);
        r.update_preferred_round(2);
        assert_eq!(r.preferred_round(), 4);
        r.update_preferred_round(0);
        assert_eq!(r.preferred_round(), 4);
    }

    #[test]
    fn test_vote_proposal_windows() {
        let mut r = rules();
        let parent = QuorumCert::unsigned(vote_info(9, 9, 8, 8));
        assert!(r.vote_proposal(&pid(10), 10, &parent));
        assert_eq!(r.latest_round(), 10);

        // Re-mined height inside the window still gets a vote.
        assert!(r.vote_proposal(&pid(20), 7, &parent));
        assert_eq!(r.latest_round(), 10);
        assert!(!r.vote_proposal(&pid(21), 6, &parent));

        r.update_preferred_round(9);
        let stale_parent = QuorumCert::unsigned(vote_info(4, 4, 3, 3));
        assert!(!r.vote_proposal(&pid(22), 11, &stale_parent));
    }

    #[traced_test]
    #[test]
    fn test_check_vote_rejects_non_validator() {
        let r = rules();
        let qc = signed_qc(vote_info(1, 1, 0, 0), &[9]);
        assert!(matches!(
            r.check_vote(&qc, "t", &validators(&[1, 2, 3])),
            Err(SafetyError::SignerNotValidator(_))
        ));
        assert!(r.check_vote(&qc, "t", &validators(&[9])).is_ok());
    }

    #[test]
    fn test_check_vote_rejects_bad_signature_and_empty() {
        let r = rules();
        let mut qc = signed_qc(vote_info(1, 1, 0, 0), &[2]);
        qc.vote_info.proposal_view = 5;
        assert!(matches!(
            r.check_vote(&qc, "t", &validators(&[2])),
            Err(SafetyError::InvalidSignature { .. })
        ));

        let empty = QuorumCert::unsigned(vote_info(1, 1, 0, 0));
        assert_eq!(
            r.check_vote(&empty, "t", &validators(&[2])),
            Err(SafetyError::NoSigns)
        );
    }

    #[test]
    fn test_check_vote_round_window() {
        let mut r = rules();
        let parent = QuorumCert::unsigned(vote_info(9, 9, 8, 8));
        r.vote_proposal(&pid(10), 10, &parent);
        let old = signed_qc(vote_info(6, 6, 5, 5), &[2]);
        assert!(matches!(
            r.check_vote(&old, "t", &validators(&[2])),
            Err(SafetyError::RoundTooOld { .. })
        ));
        let recent = signed_qc(vote_info(7, 7, 6, 6), &[2]);
        assert!(r.check_vote(&recent, "t", &validators(&[2])).is_ok());
    }

    #[test]
    fn test_check_proposal_quorum() {
        let r = rules();
        let tree = tree();
        let vals = validators(&[1, 2, 3]);
        let proposal = QuorumCert::unsigned(vote_info(2, 2, 1, 1));

        // Parent outside the tree but within the tolerated window.
        let parent = signed_qc(vote_info(1, 1, 0, 0), &[2, 3]);
        assert!(r.check_proposal(&proposal, &parent, &vals, &tree).is_ok());

        let weak = signed_qc(vote_info(1, 1, 0, 0), &[2]);
        assert_eq!(
            r.check_proposal(&proposal, &weak, &vals, &tree),
            Err(SafetyError::InsufficientVotes { have: 1, total: 3 })
        );

        // Duplicate and outsider signatures do not count.
        let mut padded = weak.clone();
        padded.sign_infos.push(weak.sign_infos[0].clone());
        padded
            .sign_infos
            .push(crypto(7).sign_vote(&padded.vote_info).unwrap());
        assert!(matches!(
            r.check_proposal(&proposal, &padded, &vals, &tree),
            Err(SafetyError::InsufficientVotes { have: 1, .. })
        ));
    }

    #[test]
    fn test_check_proposal_rejections() {
        let r = rules();
        let tree = tree();
        let vals = validators(&[1, 2, 3]);
        let proposal = QuorumCert::unsigned(vote_info(2, 2, 1, 1));
        let parent = signed_qc(vote_info(1, 1, 0, 0), &[2, 3]);

        assert_eq!(
            r.check_proposal(&proposal, &parent, &[], &tree),
            Err(SafetyError::EmptyValidators)
        );

        let no_id = QuorumCert::unsigned(VoteInfo::new(ProposalId::empty(), 1, pid(0), 0));
        assert_eq!(
            r.check_proposal(&proposal, &no_id, &vals, &tree),
            Err(SafetyError::EmptyParentId)
        );

        let far = signed_qc(vote_info(50, 50, 49, 49), &[2, 3]);
        assert!(matches!(
            r.check_proposal(&proposal, &far, &vals, &tree),
            Err(SafetyError::InvalidJustify { view: 50, .. })
        ));
    }

    #[test]
    fn test_check_proposal_too_old() {
        let mut r = rules();
        let parent = QuorumCert::unsigned(vote_info(19, 19, 18, 18));
        r.vote_proposal(&pid(20), 20, &parent);
        let old = QuorumCert::unsigned(vote_info(12, 13, 11, 12));
        let justify = signed_qc(vote_info(11, 12, 10, 11), &[2, 3]);
        assert!(matches!(
            r.check_proposal(&old, &justify, &validators(&[1, 2, 3]), &tree()),
            Err(SafetyError::ProposalTooOld { view: 13, latest: 20 })
        ));
    }

    #[test]
    fn test_check_pacemaker() {
        let r = rules();
        assert!(r.check_pacemaker(0, 2).is_ok());
        assert!(r.check_pacemaker(2, 5).is_err());
        assert!(r.check_pacemaker(3, 5).is_ok());
        assert!(r.check_pacemaker(10, 5).is_ok());
    }
}
