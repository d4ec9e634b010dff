//! # tourhub-entity
//!
//! Persisted domain types for TourHub: the staff principal and its
//! role/status/permission enums, refresh-token records, blacklist
//! entries, and revocation reasons.

pub mod device;
pub mod principal;
pub mod staff;
pub mod token;

pub use device::DeviceInfo;
pub use principal::PrincipalType;
pub use staff::{Permission, Staff, StaffRole, StaffStatus};
