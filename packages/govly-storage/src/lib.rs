//! Postgres and Qdrant persistence.
//!
//! Postgres keeps the relational side: chunk hashes for idempotent indexing,
//! form records with their cached schemas, and user profiles. Qdrant keeps
//! the chunk vectors. Query construction for vector search lives with the
//! service, this crate only owns connections, schema, and row access.

pub mod chunks;
pub mod db;
pub mod forms;
pub mod models;
pub mod profiles;
pub mod qdrant;
pub mod schema;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
