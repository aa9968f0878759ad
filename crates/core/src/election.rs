//! Proposer election contract.

use chainbft_types::Address;

/// Decides who leads a view and who may vote in it.
///
/// Scheduling policies (round-robin, time-sliced, proof-of-work) live above
/// the SMR and plug in through this trait.
pub trait ProposerElection: Send + Sync {
    /// Leader of `view`, or `None` if the policy cannot name one yet.
    fn get_leader(&self, view: u64) -> Option<Address>;

    /// Validator set for the era containing `view`.
    fn get_validators(&self, view: u64) -> Vec<Address>;
}
