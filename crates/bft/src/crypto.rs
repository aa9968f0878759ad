//! Signing wrapper binding the local key to a crypto client.

use chainbft_types::{
    signing, Address, CryptoClient, CryptoError, Hash, KeyPair, ProposalId, QuorumCertSign,
    Signature, VoteInfo,
};
use std::sync::Arc;

/// Signs and verifies SMR messages on behalf of the local validator.
pub struct SmrCrypto {
    client: Arc<dyn CryptoClient>,
    key: KeyPair,
    address: Address,
    public_key_json: String,
}

impl std::fmt::Debug for SmrCrypto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmrCrypto")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl SmrCrypto {
    pub fn new(client: Arc<dyn CryptoClient>, key: KeyPair) -> Self {
        let public_key = key.public_key();
        let address = client.address_from_public_key(&public_key);
        let public_key_json = client.public_key_to_json(&public_key);
        Self {
            client,
            key,
            address,
            public_key_json,
        }
    }

    /// Address of the local validator.
    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn sign_proposal(
        &self,
        view: u64,
        proposal_id: &ProposalId,
        timestamp: i64,
        justify_qc: &[u8],
    ) -> Result<QuorumCertSign, CryptoError> {
        self.sign_digest(&signing::proposal_digest(
            view,
            proposal_id,
            timestamp,
            justify_qc,
        ))
    }

    pub fn verify_proposal(
        &self,
        view: u64,
        proposal_id: &ProposalId,
        timestamp: i64,
        justify_qc: &[u8],
        sign: &QuorumCertSign,
    ) -> Result<(), CryptoError> {
        let digest = signing::proposal_digest(view, proposal_id, timestamp, justify_qc);
        self.verify_digest(&digest, sign)
    }

    pub fn sign_vote(&self, vote_info: &VoteInfo) -> Result<QuorumCertSign, CryptoError> {
        self.sign_digest(&signing::vote_digest(vote_info))
    }

    /// Verify one signature over `vote_info`.
    pub fn verify_vote_sign(
        &self,
        vote_info: &VoteInfo,
        sign: &QuorumCertSign,
    ) -> Result<(), CryptoError> {
        self.verify_digest(&signing::vote_digest(vote_info), sign)
    }

    fn sign_digest(&self, digest: &Hash) -> Result<QuorumCertSign, CryptoError> {
        let signature = self.client.sign(&self.key, digest)?;
        Ok(QuorumCertSign {
            address: self.address.clone(),
            public_key: self.public_key_json.clone(),
            sign: signature.0,
        })
    }

    fn verify_digest(&self, digest: &Hash, sign: &QuorumCertSign) -> Result<(), CryptoError> {
        let public_key = self.client.public_key_from_json(&sign.public_key)?;
        if self.client.address_from_public_key(&public_key) != sign.address {
            return Err(CryptoError::AddressMismatch {
                address: sign.address.clone(),
            });
        }
        self.client
            .verify(&public_key, &Signature(sign.sign.clone()), digest)
    }
}
