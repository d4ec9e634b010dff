//! Repository traits and their PostgreSQL implementations.
//!
//! The traits are the substitutable persistence seam of the subsystem:
//! any backend offering atomic conditional update-and-fetch, expiry-based
//! deletion, and indexed hash lookup can stand in for the `Pg*` types.

pub mod blacklist;
pub mod refresh_token;
pub mod staff;

pub use blacklist::{BlacklistRepository, PgBlacklistRepository};
pub use refresh_token::{PgRefreshTokenRepository, RefreshTokenRepository};
pub use staff::{PgStaffRepository, StaffRepository};
