//! Persisted credential records: refresh tokens, blacklist entries,
//! and revocation reasons.

pub mod blacklist;
pub mod reason;
pub mod refresh;

pub use blacklist::{BlacklistEntry, BlacklistKind, NewBlacklistEntry};
pub use reason::RevocationReason;
pub use refresh::{IpCreationCount, NewRefreshToken, PrincipalRevocationCount, RefreshTokenRecord};
