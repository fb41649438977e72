//! Front-desk backend for a small clinic.
//!
//! Patient registration, family insurance cards, vital signs and billing,
//! stored in a local SQLite database or forwarded to a remote database
//! service. The library is shared by the server binary and the end-to-end
//! tests.

pub mod config;
pub mod normalize;
pub mod persistence;
pub mod reconcile;
pub mod records;
pub mod server;

pub use persistence::{Persistence, RemotePersistence, SqlitePersistence, StorageError};
pub use reconcile::Reconciler;
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig};
