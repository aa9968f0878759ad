//! Deterministic validator keys.

use chainbft_types::{Address, CryptoClient, Ed25519Client, KeyPair};

/// Key for validator `index`, seeded from `index + 1` so it is never all zeros.
pub fn validator_key(index: usize) -> KeyPair {
    let seed = (index as u8).wrapping_add(1);
    KeyPair::from_seed(&[seed; 32])
}

/// Keys for validators `0..n`.
pub fn validator_keys(n: usize) -> Vec<KeyPair> {
    (0..n).map(validator_key).collect()
}

/// Address the bundled Ed25519 client derives for `key`.
pub fn validator_address(key: &KeyPair) -> Address {
    Ed25519Client.address_from_public_key(&key.public_key())
}

/// A fixed validator set with keys and addresses in the same order.
#[derive(Debug, Clone)]
pub struct TestValidators {
    pub keys: Vec<KeyPair>,
    pub addresses: Vec<Address>,
}

impl TestValidators {
    pub fn new(n: usize) -> Self {
        let keys = validator_keys(n);
        let addresses = keys.iter().map(validator_address).collect();
        Self { keys, addresses }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_deterministic_and_distinct() {
        let a = TestValidators::new(3);
        let b = TestValidators::new(3);
        assert_eq!(a.addresses, b.addresses);
        assert_ne!(a.addresses[0], a.addresses[1]);
        assert_ne!(a.addresses[1], a.addresses[2]);
        assert_eq!(a.addresses[0].as_str().len(), 40);
    }
}
