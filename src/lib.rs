//! vecbase: an in-memory vector database.
//!
//! Text chunks with dense embeddings are organized into libraries →
//! documents → chunks. Each library owns a pluggable similarity index
//! (linear scan, KD-tree, or LSH) that answers cosine k-NN queries with
//! optional metadata filtering. The store is safe under concurrent mutation
//! and persists itself as a single JSON snapshot.

pub mod config;
pub mod constants;
pub mod error;
pub mod filter;
pub mod index;
pub mod logging;
pub mod models;
pub mod server;
pub mod services;
pub mod snapshot;
pub mod store;

pub use error::{Error, Result};
pub use models::{Chunk, Document, IndexType, Library};
pub use services::Services;
pub use store::{Store, StoreOptions};
