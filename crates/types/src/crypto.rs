//! Key pairs, signatures and the crypto client used by the SMR.
//!
//! The SMR never touches curve code directly: it signs and verifies through a
//! [`CryptoClient`], so deployments can swap the signature scheme without
//! touching consensus. [`Ed25519Client`] is the bundled implementation.

use crate::{Address, Hash};
use sbor::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Curve name carried in JSON-encoded public keys.
pub const CURVE_ED25519: &str = "Ed25519";

/// Number of digest bytes kept when deriving an address from a public key.
const ADDRESS_BYTES: usize = 20;

/// A signing key pair.
#[derive(Clone)]
pub struct KeyPair(ed25519_dalek::SigningKey);

impl KeyPair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self(ed25519_dalek::SigningKey::generate(&mut csprng))
    }

    /// Derive a keypair from a seed (for testing/simulation).
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(seed))
    }

    /// Get the public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.verifying_key().to_bytes())
    }

    fn signing_key(&self) -> &ed25519_dalek::SigningKey {
        &self.0
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPair({:?})", self.public_key())
    }
}

/// A public key for signature verification.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, BasicSbor)]
#[sbor(transparent)]
pub struct PublicKey(pub [u8; 32]);

impl PublicKey {
    /// Get the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}..)", &hex::encode(self.0)[..16])
    }
}

/// A detached signature.
#[derive(Clone, PartialEq, Eq, BasicSbor)]
#[sbor(transparent)]
pub struct Signature(pub Vec<u8>);

impl Signature {
    /// Get signature as byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether the signature carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = hex::encode(&self.0);
        write!(f, "Signature({}..)", &hex[..hex.len().min(16)])
    }
}

/// JSON layout of a public key as carried in signatures on the wire.
#[derive(Debug, Serialize, Deserialize)]
struct JsonPublicKey {
    curve: String,
    key: String,
}

/// Errors raised by a [`CryptoClient`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    /// Public key JSON could not be parsed.
    #[error("Malformed public key JSON: {0}")]
    MalformedPublicKey(String),

    /// The public key names a curve this client does not implement.
    #[error("Unsupported curve: {0}")]
    UnsupportedCurve(String),

    /// Signature bytes have the wrong shape.
    #[error("Malformed signature")]
    MalformedSignature,

    /// Signature did not verify against the digest.
    #[error("Signature verification failed")]
    VerificationFailed,

    /// The signer address does not belong to the supplied public key.
    #[error("Address {address} does not match public key")]
    AddressMismatch {
        /// The claimed address.
        address: Address,
    },
}

/// Signing backend consumed by the SMR.
pub trait CryptoClient: Send + Sync {
    /// Sign a digest with the given key.
    fn sign(&self, key: &KeyPair, digest: &Hash) -> Result<Signature, CryptoError>;

    /// Verify a signature over a digest.
    fn verify(
        &self,
        public_key: &PublicKey,
        signature: &Signature,
        digest: &Hash,
    ) -> Result<(), CryptoError>;

    /// Derive the account address for a public key.
    fn address_from_public_key(&self, public_key: &PublicKey) -> Address;

    /// Parse a JSON-encoded public key.
    fn public_key_from_json(&self, json: &str) -> Result<PublicKey, CryptoError>;

    /// Encode a public key as JSON.
    fn public_key_to_json(&self, public_key: &PublicKey) -> String;
}

/// Ed25519 implementation of [`CryptoClient`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Client;

impl CryptoClient for Ed25519Client {
    fn sign(&self, key: &KeyPair, digest: &Hash) -> Result<Signature, CryptoError> {
        use ed25519_dalek::Signer;
        let sig = key.signing_key().sign(digest.as_bytes());
        Ok(Signature(sig.to_bytes().to_vec()))
    }

    fn verify(
        &self,
        public_key: &PublicKey,
        signature: &Signature,
        digest: &Hash,
    ) -> Result<(), CryptoError> {
        use ed25519_dalek::Verifier;
        let pk = ed25519_dalek::VerifyingKey::from_bytes(public_key.as_bytes())
            .map_err(|e| CryptoError::MalformedPublicKey(e.to_string()))?;
        let sig_array: [u8; 64] = signature
            .as_bytes()
            .try_into()
            .map_err(|_| CryptoError::MalformedSignature)?;
        let sig = ed25519_dalek::Signature::from_bytes(&sig_array);
        pk.verify(digest.as_bytes(), &sig)
            .map_err(|_| CryptoError::VerificationFailed)
    }

    fn address_from_public_key(&self, public_key: &PublicKey) -> Address {
        let digest = Hash::from_bytes(public_key.as_bytes());
        Address(hex::encode(&digest.as_bytes()[..ADDRESS_BYTES]))
    }

    fn public_key_from_json(&self, json: &str) -> Result<PublicKey, CryptoError> {
        let parsed: JsonPublicKey = serde_json::from_str(json)
            .map_err(|e| CryptoError::MalformedPublicKey(e.to_string()))?;
        if parsed.curve != CURVE_ED25519 {
            return Err(CryptoError::UnsupportedCurve(parsed.curve));
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(&parsed.key, &mut bytes)
            .map_err(|e| CryptoError::MalformedPublicKey(e.to_string()))?;
        Ok(PublicKey(bytes))
    }

    fn public_key_to_json(&self, public_key: &PublicKey) -> String {
        let json = JsonPublicKey {
            curve: CURVE_ED25519.to_string(),
            key: hex::encode(public_key.as_bytes()),
        };
        // A struct of two strings always serializes.
        serde_json::to_string(&json).unwrap_or_default()
    }
}
