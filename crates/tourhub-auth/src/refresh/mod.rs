//! Opaque refresh credentials with atomic rotation.

pub mod store;

pub use store::{IssuedRefreshToken, RefreshTokenStore};
