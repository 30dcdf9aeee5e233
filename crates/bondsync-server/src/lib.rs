//! bondsync server
//!
//! Serves live reactive documents to many viewers at once. Each document is
//! run once by an external engine; viewers then send bond (input) updates
//! and receive a patch describing only the cells that re-ran.

pub mod bond_update;
pub mod cache;
pub mod config;
pub mod document;
pub mod http_router;
pub mod http_server;
pub mod response;
pub mod server;
pub mod session;
pub mod startup;

pub use bond_update::{BondPayload, BondUpdateHandler};
pub use cache::CacheStore;
pub use config::{ServerConfig, SnapshotLayout};
pub use document::Document;
pub use http_router::{build_router, AppState};
pub use http_server::HttpServer;
pub use server::BondServer;
pub use session::{NotebookSession, RunningSession, SessionRegistry, SessionState};
pub use startup::{shutdown_running, StartupDriver, StartupReport};
