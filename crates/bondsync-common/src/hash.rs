//! Document identity.
//!
//! A document is identified by the SHA-256 digest of its raw source bytes,
//! encoded as URL-safe base64 with padding. The same string names the
//! registry slot, the cache file and the URL path segment.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use sha2::{Digest, Sha256};

/// Computes the content hash of a document's source.
pub fn document_hash(source: &[u8]) -> String {
    URL_SAFE.encode(Sha256::digest(source))
}
