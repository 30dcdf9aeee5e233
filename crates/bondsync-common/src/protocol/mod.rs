pub mod document;
pub mod error;
pub mod jsonrpc;
pub mod patch;


pub use document::{BondConnections, BondValues, CellId, Snapshot};
pub use error::{BondsyncError, Result};
pub use jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use patch::{PatchOp, PathSegment, StateResponse};
