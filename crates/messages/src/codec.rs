//! Payload encoding for consensus messages.
//!
//! # Wire Format
//!
//! Payloads are plain SBOR. The message kind travels in the envelope header,
//! not in the payload, so the receiver decodes with the type the header names.

use crate::MessageKind;
use thiserror::Error;

/// Errors that can occur during message encoding/decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Message too short")]
    MessageTooShort,

    #[error("SBOR decode error: {0}")]
    SborDecode(String),

    #[error("SBOR encode error: {0}")]
    SborEncode(String),

    /// The envelope announces a different kind than the caller expected.
    #[error("Expected {expected:?} payload, envelope carries {actual:?}")]
    UnexpectedKind {
        expected: MessageKind,
        actual: MessageKind,
    },
}

/// A message that can travel as an envelope payload.
pub trait ConsensusMessage: Sized {
    /// Kind announced in the envelope header.
    const KIND: MessageKind;

    /// SBOR-encode the message.
    fn encode(&self) -> Result<Vec<u8>, CodecError>;

    /// SBOR-decode the message.
    fn decode(bytes: &[u8]) -> Result<Self, CodecError>;
}

pub(crate) fn encode_err(e: sbor::EncodeError) -> CodecError {
    CodecError::SborEncode(format!("{:?}", e))
}

pub(crate) fn decode_err(e: sbor::DecodeError) -> CodecError {
    CodecError::SborDecode(format!("{:?}", e))
}

/// Reject empty buffers before handing them to the decoder.
pub(crate) fn non_empty(bytes: &[u8]) -> Result<&[u8], CodecError> {
    if bytes.is_empty() {
        Err(CodecError::MessageTooShort)
    } else {
        Ok(bytes)
    }
}
