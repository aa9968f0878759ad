//! Envelope carried by the network collaborator.

use crate::codec::{decode_err, encode_err, non_empty, CodecError, ConsensusMessage};
use chainbft_types::Address;
use sbor::prelude::*;

/// Message kinds the SMR subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, BasicSbor)]
pub enum MessageKind {
    Proposal,
    Vote,
}

impl MessageKind {
    /// Stable name used in logs and subscriptions.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Proposal => "chainbft.proposal",
            MessageKind::Vote => "chainbft.vote",
        }
    }
}

/// Routing metadata for a message.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct MessageHeader {
    pub kind: MessageKind,

    /// Correlation id propagated into logs on the receiving side.
    pub logid: String,

    /// Sender address.
    pub from: Address,
}

/// A typed payload plus its header.
#[derive(Debug, Clone, PartialEq, Eq, BasicSbor)]
pub struct NetworkMessage {
    pub header: MessageHeader,
    pub payload: Vec<u8>,
}

impl NetworkMessage {
    /// Wrap a consensus message.
    pub fn new<M: ConsensusMessage>(
        message: &M,
        logid: impl Into<String>,
        from: Address,
    ) -> Result<Self, CodecError> {
        Ok(Self {
            header: MessageHeader {
                kind: M::KIND,
                logid: logid.into(),
                from,
            },
            payload: message.encode()?,
        })
    }

    pub fn kind(&self) -> MessageKind {
        self.header.kind
    }

    /// Decode the payload as `M`, checking the announced kind first.
    pub fn decode_payload<M: ConsensusMessage>(&self) -> Result<M, CodecError> {
        if self.header.kind != M::KIND {
            return Err(CodecError::UnexpectedKind {
                expected: M::KIND,
                actual: self.header.kind,
            });
        }
        M::decode(&self.payload)
    }

    /// Encode the whole envelope for transports that move raw bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        basic_encode(self).map_err(encode_err)
    }

    /// Decode an envelope produced by [`NetworkMessage::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        basic_decode(non_empty(bytes)?).map_err(decode_err)
    }
}
