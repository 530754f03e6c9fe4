//! # artcat-store: Artifact Catalog Backends
//!
//! Implements the [`ArtifactCatalog`] contract twice:
//!
//! - [`MemoryCatalog`]: in-process tables behind a single `RwLock`. Used
//!   for tests, tooling and as a reference for backend behaviour.
//! - [`SqliteCatalog`]: the durable `artifact` table via SQLx, with the
//!   schema applied from embedded migrations.
//!
//! Both backends delegate every ingest decision to
//! [`artcat_core::plan_ingest()`]; they only differ in how they read its
//! inputs and apply its result atomically.
//!
//! ## Concurrency
//!
//! Ingests serialize per catalog handle. Lookups never wait on the ingest
//! serialization point and only ever observe committed state.
//!
//! ## Crate Policy
//!
//! - The catalog is always an explicitly passed handle; there is no global
//!   instance.
//! - No business decisions here: integrity rules live in `artcat-core`.

pub mod catalog;
pub mod config;
pub mod memory;
pub mod sqlite;

pub use catalog::{ArtifactCatalog, NameListing};
pub use config::{CatalogConfig, ConfigError};
pub use memory::MemoryCatalog;
pub use sqlite::SqliteCatalog;
