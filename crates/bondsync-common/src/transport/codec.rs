use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::protocol::document::{BondValues, Snapshot};
use crate::protocol::error::{BondsyncError, Result};

/// Content type of every MessagePack body the server produces.
pub const MSGPACK_CONTENT_TYPE: &str = "application/x-msgpack";

/// URL-safe base64 that accepts segments with or without `=` padding.
const URL_SEGMENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// MessagePack codec for viewer-facing payloads and cache files.
///
/// Structs are always encoded as maps keyed by field name so that clients
/// written in other languages can decode them without knowing field order.
///
/// # Example
///
/// ```
/// use bondsync_common::transport::MsgPackCodec;
/// use bondsync_common::StateResponse;
///
/// let response = StateResponse {
///     patches: vec![],
///     ids_of_cells_that_ran: vec!["c1".to_string()],
/// };
///
/// let encoded = MsgPackCodec::encode(&response).unwrap();
/// let decoded: StateResponse = MsgPackCodec::decode(&encoded).unwrap();
/// assert_eq!(response, decoded);
/// ```
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encodes any serializable value.
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// Decodes a value; any malformed input is a deserialization failure.
    pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
        rmp_serde::from_slice(data).map_err(|e| BondsyncError::Deserialization(e.to_string()))
    }

    /// Decodes a bond update body: a map from bond name to new value.
    pub fn decode_bonds(data: &[u8]) -> Result<BondValues> {
        Self::decode(data)
    }

    pub fn encode_snapshot(snapshot: &Snapshot) -> Result<Vec<u8>> {
        Self::encode(snapshot)
    }

    pub fn decode_snapshot(data: &[u8]) -> Result<Snapshot> {
        Self::decode(data)
    }

    /// Decodes the base64 body segment of an idempotent state request URL.
    pub fn decode_url_segment(segment: &str) -> Result<Vec<u8>> {
        URL_SEGMENT
            .decode(segment)
            .map_err(|e| BondsyncError::Deserialization(format!("invalid base64 segment: {}", e)))
    }

    /// Encodes a body so it can be sent as a URL segment.
    pub fn encode_url_segment(data: &[u8]) -> String {
        URL_SEGMENT.encode(data)
    }
}
