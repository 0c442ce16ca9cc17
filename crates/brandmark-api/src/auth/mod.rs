//! Authentication: HS256 bearer tokens resolved into a session context.

pub mod jwt;
pub mod middleware;
pub mod models;

pub use jwt::{JwtClaims, JwtService};
pub use models::AuthSession;
