// SimpleFIN Reconcile - Core Library
// Idempotent import of SimpleFIN account exports into a durable local store.
// Exposes all modules for use in the CLI, the API server, and tests.

pub mod cancel;
pub mod config;
pub mod db;
pub mod decoder;
pub mod entities;
pub mod error;
pub mod identity;
pub mod reconciliation;
pub mod report;

// Re-export commonly used types
pub use cancel::Cancellation;
pub use config::{Config, ImportConfig, LoggingConfig, MissingIdentityPolicy, StoreConfig};
pub use db::{Event, Keyed, Record, ReconciliationStore, StoreEntry, UpsertOutcome};
pub use decoder::{decode, decode_reader, ImportSnapshot};
pub use entities::{Account, EntityKind, Holding, Organization, Reconcilable, Transaction};
pub use error::{ImportError, Result};
pub use identity::{account_key, holding_key, organization_key, transaction_key, NaturalKey};
pub use reconciliation::{EntityCounts, EntityFailure, ImportOrchestrator, ImportReport};
pub use report::render;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
