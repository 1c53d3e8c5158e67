//! # Delta Core
//!
//! Node binary and library for the delta consensus engine.
//!
//! The library wires every consensus component into a single [`Node`]
//! backed by local collaborators: an in-memory DFS and a broadcaster that
//! only logs. It is the embedding used by the `deltacore` binary and by
//! integration tests.
//!
//! ## Components
//!
//! - [`Node`] - owns the mempool, the consensus driver and the chain head
//! - [`InMemoryDfs`] - content-addressed store keyed by content hash
//! - [`LoggingBroadcaster`] - broadcast sink for a node without peers
//!
//! ## Example
//!
//! ```rust,no_run
//! use deltacore::{Node, NodeOptions};
//! use deltacore_config::Config;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(Path::new("deltacore.toml"))?;
//!     let node = Node::new(config, NodeOptions::generate())?;
//!     node.run().await
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod local;
pub mod logging;
pub mod node;

pub use local::{InMemoryDfs, LoggingBroadcaster};
pub use logging::{init_tracing, LogFormat};
pub use node::{parse_peer_id, Node, NodeOptions, NodeStatus};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "deltacore.toml";
