//! # metis-server: HTTP boundary for the Metis access engine
//!
//! Exposes projects (containers) and their analyses (items) over HTTP,
//! with every protected route gated by a session and, for analyses, by the
//! access evaluator in `metis-rbac`.
//!
//! ## Architecture
//!
//! The server uses `mio` for non-blocking I/O with a poll-based event loop,
//! no async runtime.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                       metis-server                        │
//! │  ┌────────────┐   ┌─────────────┐   ┌──────────────────┐  │
//! │  │  Listener  │ → │ Connections │ → │  RequestHandler  │  │
//! │  │   (TCP)    │   │ (mio poll)  │   │ (auth → evaluate │  │
//! │  │            │   │             │   │   → store)       │  │
//! │  └────────────┘   └─────────────┘   └──────────────────┘  │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use metis_directory::SqliteDirectory;
//! use metis_server::{AuthService, RequestHandler, Server, ServerConfig, SessionConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(SqliteDirectory::open(".metis/metis.sqlite3")?);
//! let auth = AuthService::new(SessionConfig::new("change-me"));
//! let handler = RequestHandler::new(store, auth);
//!
//! let config = ServerConfig::new(([127, 0, 0, 1], 3000));
//! let mut server = Server::new(config, handler)?.with_signal_handling()?;
//! server.run()?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
mod config;
mod connection;
mod error;
mod handler;
pub mod http;
mod server;

pub use auth::{AuthService, Claims, SessionConfig};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::RequestHandler;
pub use http::{HttpRequest, HttpResponse, Limits};
pub use server::{Server, ShutdownHandle};
