//! Three-validator runs of the proposal/vote protocol.
//!
//! Messages are delivered in the order they were sent, one at a time, so
//! every run is deterministic.

mod fixtures;

use chainbft_messages::ProposalMsg;
use fixtures::{pid, Cluster};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

// ============================================================================
// Certification
// ============================================================================

#[test]
fn test_first_proposal_is_certified_by_next_leader() {
    init_tracing();
    let mut cluster = Cluster::new(3);

    cluster.propose(0, 1, pid(1), pid(0));
    cluster.pump();

    assert!(cluster.errors.is_empty(), "{:?}", cluster.errors);
    assert_eq!(cluster.high_qc(1), pid(1));
    assert_eq!(cluster.nodes[1].current_view(), 2);
    assert_eq!(cluster.nodes[1].votes(&pid(1)).len(), 2);

    // The other replica voted but has not seen a certificate.
    assert_eq!(cluster.nodes[2].current_view(), 1);
    assert_eq!(cluster.high_qc(2), pid(0));
    assert!(cluster.nodes[2].qc_tree().contains(&pid(1)));
}

#[test]
fn test_competing_children_of_certified_parent() {
    init_tracing();
    let mut cluster = Cluster::new(3);

    cluster.propose(0, 1, pid(1), pid(0));
    cluster.pump();

    // B extends the certified proposal; C collects the votes.
    cluster.propose(1, 2, pid(2), pid(1));
    cluster.pump();
    assert!(cluster.errors.is_empty(), "{:?}", cluster.errors);
    assert_eq!(cluster.high_qc(0), pid(1));
    assert_eq!(cluster.high_qc(1), pid(1));
    assert_eq!(cluster.high_qc(2), pid(2));
    assert_eq!(cluster.nodes[2].current_view(), 3);

    // A learns the certificate for 1 from B's proposal and forks at view 2.
    let justify = {
        let node = cluster.nodes[1]
            .qc_tree()
            .query_node(&pid(1))
            .expect("certified node");
        let mut qc = node.qc;
        for sign in cluster.nodes[1].votes(&pid(1)) {
            qc.add_sign(sign.clone());
        }
        assert_eq!(qc.sign_infos.len(), 2);
        qc
    };
    for node in &mut cluster.nodes {
        node.update_justify_qc_status(&justify).unwrap();
    }
    cluster.propose(0, 2, pid(3), pid(1));
    cluster.pump();
    assert!(cluster.errors.is_empty(), "{:?}", cluster.errors);

    // Both forks hang off the certified parent.
    for node in [0, 1] {
        assert_eq!(
            cluster.nodes[node].qc_tree().sons(&pid(1)),
            vec![pid(2), pid(3)]
        );
    }
    // C certifies the later fork: equal view moves highQC forward.
    assert_eq!(cluster.high_qc(2), pid(3));
    assert!(cluster.nodes[2].qc_tree().sons(&pid(3)).is_empty());
}

// ============================================================================
// Steady state
// ============================================================================

#[test]
fn test_rotating_leaders_commit_and_prune() {
    init_tracing();
    let mut cluster = Cluster::new(3);

    for view in 1..=7u64 {
        let leader = cluster.leader(view);
        cluster.propose(leader, view, pid(view), pid(view - 1));
        cluster.pump();
        cluster.ledger_follow(view, leader);
        cluster.pump();
        assert!(
            cluster.errors.is_empty(),
            "view {}: {:?}",
            view,
            cluster.errors
        );
    }

    for (index, node) in cluster.nodes.iter().enumerate() {
        assert_eq!(node.ledger_state(), 7, "node {}", index);
        assert_eq!(node.root_qc().proposal_id(), &pid(4), "node {}", index);
        assert!(!node.qc_tree().contains(&pid(3)));
        assert!(node.current_view() >= 8);
    }

    // The leader of view 8 holds the certificate for 7.
    let next = cluster.leader(8);
    assert_eq!(cluster.high_qc(next), pid(7));
    let validators = cluster.addresses();
    let actions = cluster.nodes[next]
        .process_proposal(8, pid(8), pid(7), &validators)
        .unwrap();
    let chainbft_core::Action::Send { message, targets } = &actions[0];
    assert_eq!(targets.len(), 2);
    let proposal: ProposalMsg = message.decode_payload().unwrap();
    assert_eq!(proposal.justify().unwrap().sign_infos.len(), 2);
}

#[test]
fn test_ledger_lag_blocks_voting() {
    init_tracing();
    let mut cluster = Cluster::new(3);

    // Without the ledger following, views run ahead of the local ledger.
    for view in 1..=4u64 {
        let leader = cluster.leader(view);
        cluster.propose(leader, view, pid(view), pid(view - 1));
        cluster.pump();
    }

    assert!(cluster.errors.iter().any(|(_, e)| matches!(
        e,
        chainbft_bft::SmrError::OutdatedLedger { view: 4, .. }
    )));
    assert!(!cluster.nodes[1].qc_tree().contains(&pid(4)));
}
