//! Database repositories for data access layer
//!
//! Settings are the only persisted entity: upload tickets are stateless and stored
//! objects live in the blob store.
//
// Settings repository trait and Postgres implementation
pub mod settings;
//
// In-memory implementation for development and tests
pub mod memory;
//
// Transaction utilities
pub mod transaction;

pub use memory::InMemorySettingsRepository;
pub use settings::{PgSettingsRepository, SettingsCommit, SettingsRepository};
