//! # bondsync CLI Entry Point
//!
//! ## Usage
//!
//! ```bash
//! # Serve two documents, run by an engine listening on port 1234
//! bondsync serve --engine http://127.0.0.1:1234 docs/intro.jl docs/sliders.jl
//!
//! # Serve frozen snapshots only, reusing the cache across restarts
//! bondsync serve --engine http://127.0.0.1:1234 --no-keep-running \
//!   --cache-dir .bondsync-cache docs/intro.jl
//!
//! # Print the hash a document is served under
//! bondsync hash docs/sliders.jl
//! ```

use anyhow::Result;
use argh::FromArgs;
use bondsync_cli::launcher;
use bondsync_server::ServerConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(FromArgs)]
/// bondsync - live reactive document sync server
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Serve(ServeArgs),
    Hash(HashArgs),
}

// Every document is opened in the engine once at startup. With the default
// settings it then stays alive and answers bond updates; with
// `--no-keep-running` its snapshot is frozen and the engine instance is
// released.
#[derive(FromArgs)]
#[argh(subcommand, name = "serve")]
/// serve documents to live viewers
struct ServeArgs {
    /// base URL of the execution engine
    ///
    /// Must include the http:// prefix (e.g., http://127.0.0.1:1234).
    #[argh(option, long = "engine")]
    engine: String,

    /// address to bind the HTTP server to
    #[argh(option, short = 'b', default = "\"127.0.0.1:2345\".into()")]
    bind: String,

    /// directory for cached snapshots, one file per document hash
    #[argh(option, long = "cache-dir")]
    cache_dir: Option<PathBuf>,

    /// directory of a static export, served for every other path
    #[argh(option, long = "static-dir")]
    static_dir: Option<PathBuf>,

    /// release engine instances after the first run
    ///
    /// Bond updates are then rejected, and cached snapshots are used
    /// instead of running documents.
    #[argh(switch, long = "no-keep-running")]
    no_keep_running: bool,

    /// do not write fresh snapshots to the cache directory
    #[argh(switch, long = "no-store-cache")]
    no_store_cache: bool,

    /// delay added to every bond update, in milliseconds
    #[argh(option, long = "simulated-lag-ms", default = "0")]
    simulated_lag_ms: u64,

    /// document files to serve
    #[argh(positional)]
    documents: Vec<PathBuf>,
}

impl ServeArgs {
    fn config(&self) -> Result<ServerConfig> {
        let bind: SocketAddr = self
            .bind
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid bind address {}: {}", self.bind, e))?;

        let mut config = ServerConfig::default()
            .with_bind(bind)
            .with_keep_running(!self.no_keep_running)
            .with_store_cache(!self.no_store_cache)
            .with_simulated_lag(Duration::from_millis(self.simulated_lag_ms));
        if let Some(dir) = &self.cache_dir {
            config = config.with_cache_dir(dir);
        }
        if let Some(dir) = &self.static_dir {
            config = config.with_static_dir(dir);
        }
        Ok(config)
    }
}

#[derive(FromArgs)]
#[argh(subcommand, name = "hash")]
/// print the hash of a document file
struct HashArgs {
    /// document file
    #[argh(positional)]
    path: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    match cli.command {
        Commands::Serve(args) => {
            // Set default log level to INFO, but allow RUST_LOG env var to override
            let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
            tracing_subscriber::fmt().with_env_filter(env_filter).init();

            let config = args.config()?;
            tracing::info!("Binding to: {}", config.bind);
            launcher::serve(config, &args.engine, &args.documents).await
        }
        Commands::Hash(args) => {
            // No logging: output is meant for scripts
            let bytes = tokio::fs::read(&args.path)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", args.path.display(), e))?;
            println!("{}", bondsync_common::document_hash(&bytes));
            Ok(())
        }
    }
}
