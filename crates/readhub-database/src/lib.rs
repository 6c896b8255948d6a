//! # readhub-database
//!
//! PostgreSQL connection management, migrations, repository traits, and
//! the concrete Postgres repository implementations for the ReadHub user
//! service.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
