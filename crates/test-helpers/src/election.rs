//! Round-robin proposer election over a fixed validator set.

use chainbft_core::ProposerElection;
use chainbft_types::Address;

/// View `v` is led by `validators[(v - 1) % n]`; view 0 maps to the first.
#[derive(Debug, Clone)]
pub struct RoundRobinElection {
    validators: Vec<Address>,
}

impl RoundRobinElection {
    pub fn new(validators: Vec<Address>) -> Self {
        Self { validators }
    }
}

impl ProposerElection for RoundRobinElection {
    fn get_leader(&self, view: u64) -> Option<Address> {
        if self.validators.is_empty() {
            return None;
        }
        let index = view.saturating_sub(1) % self.validators.len() as u64;
        self.validators.get(index as usize).cloned()
    }

    fn get_validators(&self, _view: u64) -> Vec<Address> {
        self.validators.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leader_rotation() {
        let v: Vec<Address> = ["a", "b", "c"].into_iter().map(Address::new).collect();
        let election = RoundRobinElection::new(v.clone());
        assert_eq!(election.get_leader(1), Some(v[0].clone()));
        assert_eq!(election.get_leader(2), Some(v[1].clone()));
        assert_eq!(election.get_leader(4), Some(v[0].clone()));
        assert_eq!(election.get_leader(0), Some(v[0].clone()));
        assert_eq!(election.get_validators(7), v);
    }

    #[test]
    fn test_empty_set_has_no_leader() {
        let election = RoundRobinElection::new(vec![]);
        assert_eq!(election.get_leader(1), None);
        assert!(election.get_validators(1).is_empty());
    }
}
