//! Brandmark API Library
//!
//! HTTP surface of the direct upload protocol: ticket issuance, logo finalization,
//! settings, and the capability routes of the filesystem gateway.

mod api_doc;
pub mod constants;
mod handlers;
pub mod services;
pub mod setup;
mod telemetry;

// Public modules
pub mod auth;
pub mod error;
pub mod state;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use services::{FinalizationCommitter, FinalizeOutcome, TicketIssuer};
