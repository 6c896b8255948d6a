//! # readhub-core
//!
//! Core crate for the ReadHub user service. Contains the unified error
//! system, configuration schemas, the cache provider trait, and the
//! best-effort write outcome type.
//!
//! This crate has **no** internal dependencies on other ReadHub crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;

pub use error::{AppError, ErrorKind};
pub use result::{AppResult, SoftWrite};
