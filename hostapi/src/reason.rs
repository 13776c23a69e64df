//! Reason payload types and their canonical serialization.
//!
//! The reason is the causal context of one contract invocation. It is
//! encoded once per context into compact JSON with a fixed field order:
//!
//! ```text
//! {"kind":"transfer","sender":[0,1,2,3],"details":{"sender":[0,1,2,3],"amount":100000}}
//! ```
//!
//! `sender` is omitted when absent or empty. `details` is a closed set of
//! variants keyed by `kind`; unknown kinds are rejected in both directions.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::EncodingError;

/// `kind` value for a token transfer activation.
pub const KIND_TRANSFER: &str = "transfer";

fn is_absent(sender: &Option<Vec<i8>>) -> bool {
    sender.as_ref().map_or(true, Vec::is_empty)
}

/// Details of a transfer that activated the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferActivation {
    #[serde(default, skip_serializing_if = "is_absent")]
    pub sender: Option<Vec<i8>>,
    pub amount: u64,
}

/// Kind-specific details of a reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ReasonDetails {
    Transfer(TransferActivation),
}

impl ReasonDetails {
    /// The `kind` string this variant must be paired with.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transfer(_) => KIND_TRANSFER,
        }
    }
}

/// The structured input handed to a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReasonPayload {
    pub kind: String,
    #[serde(skip_serializing_if = "is_absent")]
    pub sender: Option<Vec<i8>>,
    pub details: ReasonDetails,
}

impl ReasonPayload {
    /// Build a `transfer` reason. `kind` is derived from the details.
    pub fn transfer(sender: Option<Vec<i8>>, activation: TransferActivation) -> Self {
        Self {
            kind: KIND_TRANSFER.to_string(),
            sender,
            details: ReasonDetails::Transfer(activation),
        }
    }

    /// Check that `kind` is known and agrees with `details`.
    pub fn validate(&self) -> Result<(), EncodingError> {
        let expected = match self.kind.as_str() {
            KIND_TRANSFER => KIND_TRANSFER,
            _ => return Err(EncodingError::UnknownKind(self.kind.clone())),
        };
        if expected != self.details.kind() {
            return Err(EncodingError::KindMismatch {
                kind: self.kind.clone(),
                details: self.details.kind(),
            });
        }
        Ok(())
    }
}

/// Immutable bytes of an encoded reason.
///
/// Cloning shares the same buffer, so every instance built from one
/// context sees byte-identical input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedReason(Arc<[u8]>);

impl SerializedReason {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for SerializedReason {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes.into())
    }
}

impl fmt::Display for SerializedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

/// Encode a reason into its canonical byte form.
pub fn encode(payload: &ReasonPayload) -> Result<SerializedReason, EncodingError> {
    payload.validate()?;
    let bytes = serde_json::to_vec(payload)?;
    Ok(SerializedReason::from(bytes))
}

#[derive(Deserialize)]
struct RawReason {
    kind: String,
    #[serde(default)]
    sender: Option<Vec<i8>>,
    details: serde_json::Value,
}

/// Decode canonical bytes back into a reason.
///
/// An absent and an empty `sender` both decode to `None`.
pub fn decode(bytes: &[u8]) -> Result<ReasonPayload, EncodingError> {
    let raw: RawReason = serde_json::from_slice(bytes)?;
    let details = match raw.kind.as_str() {
        KIND_TRANSFER => ReasonDetails::Transfer(serde_json::from_value(raw.details)?),
        _ => return Err(EncodingError::UnknownKind(raw.kind)),
    };
    let sender = raw.sender.filter(|s| !s.is_empty());
    Ok(ReasonPayload {
        kind: raw.kind,
        sender,
        details,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOLDEN: &str =
        r#"{"kind":"transfer","sender":[0,1,2,3],"details":{"sender":[0,1,2,3],"amount":100000}}"#;

    fn sample() -> ReasonPayload {
        ReasonPayload::transfer(
            Some(vec![0, 1, 2, 3]),
            TransferActivation {
                sender: Some(vec![0, 1, 2, 3]),
                amount: 100_000,
            },
        )
    }

    #[test]
    fn test_golden_bytes() {
        let encoded = encode(&sample()).unwrap();
        assert_eq!(encoded.as_bytes(), GOLDEN.as_bytes());
        assert_eq!(encoded.len(), GOLDEN.len());
    }

    #[test]
    fn test_encode_is_deterministic() {
        let a = encode(&sample()).unwrap();
        let b = encode(&sample()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_decode_recovers_payload() {
        let decoded = decode(GOLDEN.as_bytes()).unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn test_absent_sender_is_omitted() {
        let payload = ReasonPayload::transfer(
            None,
            TransferActivation {
                sender: Some(vec![]),
                amount: 7,
            },
        );
        let encoded = encode(&payload).unwrap();
        assert_eq!(
            encoded.as_bytes(),
            br#"{"kind":"transfer","details":{"amount":7}}"#
        );
    }

    #[test]
    fn test_negative_sender_bytes() {
        let payload = ReasonPayload::transfer(
            Some(vec![-128, -1, 127]),
            TransferActivation {
                sender: None,
                amount: u64::MAX,
            },
        );
        let encoded = encode(&payload).unwrap();
        assert_eq!(
            encoded.to_string(),
            r#"{"kind":"transfer","sender":[-128,-1,127],"details":{"amount":18446744073709551615}}"#
        );
        assert_eq!(decode(encoded.as_bytes()).unwrap(), payload);
    }

    #[test]
    fn test_encode_rejects_unknown_kind() {
        let mut payload = sample();
        payload.kind = "stake".into();
        assert!(matches!(
            encode(&payload),
            Err(EncodingError::UnknownKind(k)) if k == "stake"
        ));
    }

    #[test]
    fn test_decode_rejects_unknown_kind() {
        let err = decode(br#"{"kind":"stake","details":{}}"#).unwrap_err();
        assert!(matches!(err, EncodingError::UnknownKind(_)));
    }

    #[test]
    fn test_decode_rejects_wrong_details_shape() {
        let err = decode(br#"{"kind":"transfer","details":{"amount":"lots"}}"#).unwrap_err();
        assert!(matches!(err, EncodingError::Json(_)));
    }

    #[test]
    fn test_serialized_reason_clone_shares_bytes() {
        let a = encode(&sample()).unwrap();
        let b = a.clone();
        assert_eq!(a.as_bytes().as_ptr(), b.as_bytes().as_ptr());
    }
}
