//! Protocol services. Handlers stay thin and these can be tested without HTTP.

pub mod finalization;
pub mod ticket_issuer;

pub use finalization::{FinalizationCommitter, FinalizeOutcome};
pub use ticket_issuer::TicketIssuer;
