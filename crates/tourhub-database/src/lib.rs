//! # tourhub-database
//!
//! PostgreSQL connection pool, migration runner, and the repository
//! layer for TourHub. Repository traits define the substitutable
//! persistence seam; the `Pg*` types are the production implementations
//! and the only place SQL lives.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
