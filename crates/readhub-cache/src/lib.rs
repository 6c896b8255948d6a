//! # readhub-cache
//!
//! Cache providers for the ReadHub user service: a Redis backend for
//! deployment and an in-memory backend for development and tests, both
//! behind the [`readhub_core::traits::CacheProvider`] trait. The
//! [`provider::CacheManager`] wraps the selected backend and bounds every
//! operation with a timeout.

#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub mod keys;
pub mod provider;

pub use provider::CacheManager;
