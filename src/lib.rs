//! Finance back-office
//!
//! CRUD and bulk ingest for vendors, brands, projects, influencer payout
//! accounts and income tables, backed by a PostgREST store.

pub mod cli;
pub mod client;
pub mod collections;
pub mod etl;
pub mod ingest;
pub mod server;
pub mod settings;
pub mod storage;
pub mod store;
pub mod transform;

// Re-exports for convenience
pub use client::{Auth, AuthType, PostgrestClient};
pub use collections::{CollectionCatalog, CollectionSpec};
pub use etl::{Extractor, IdentityTransformer, Loader, Pipeline, Transformer};
pub use ingest::{BatchResult, BulkConfig, BulkIngest, IngestTarget};
pub use store::{ConstraintClassifier, MemoryStore, Record, Store, StoreError};
