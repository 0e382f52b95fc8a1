//! # ifreg: HTTP Interface Registry
//!
//! ifreg keeps the catalogue of HTTP interfaces a platform exposes: what each
//! one is called, where it lives, which method it takes, whether it is
//! currently published, and how often it has been invoked.
//!
//! ## Architecture
//!
//! ```text
//! Transport → InterfaceRegistry → { Lifecycle, Analytics, Bulk, Idempotency } → InterfaceStore
//! ```
//!
//! ### Record Store
//! The [`store`] module defines [`store::InterfaceStore`], the only path to
//! the canonical records, with an in-memory and a file-backed implementation.
//!
//! ### Components
//! - Lifecycle ([`lifecycle`]): `Disabled ⇄ Online`, idempotent in both directions
//! - Query engine ([`query`]): filters, sort specifications and pagination
//! - Invocation analytics ([`analytics`]): call counters and top-N ranking
//! - Bulk operations ([`bulk`]): per-item outcomes, bounded concurrency
//! - Request tokens ([`idempotency`]): safe retries of `add`
//! - Caller grants ([`user_interface`]): per-caller call quotas on one interface
//!
//! ### Façade
//! [`service::InterfaceRegistry`] validates input, serializes mutations of the
//! same record and bounds every store call with a timeout. Results travel to
//! clients in the [`envelope::ApiResponse`] shape; failures carry a stable
//! [`error::ErrorKind`].

pub mod analytics;
pub mod bulk;
pub mod config;
pub mod envelope;
pub mod error;
pub mod idempotency;
pub mod lifecycle;
mod locks;
pub mod model;
pub mod query;
pub mod service;
pub mod store;
pub mod user_interface;

// Re-exports
pub use config::{RegistryConfig, StorageConfig};
pub use envelope::ApiResponse;
pub use error::*;
pub use model::*;
pub use service::InterfaceRegistry;
