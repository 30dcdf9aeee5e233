//! bondsync transport layer
//!
//! Two encodings meet in this repository:
//!
//! - **Viewer side**: MessagePack bodies (bond values in, patches and bond
//!   connections out) handled by [`MsgPackCodec`]
//! - **Engine side**: JSON-RPC 2.0 over HTTP, with response parsing in
//!   [`HttpTransport`]

pub mod codec;
pub mod http;

pub use codec::{MsgPackCodec, MSGPACK_CONTENT_TYPE};
pub use http::HttpTransport;
