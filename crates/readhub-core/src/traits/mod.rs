//! Core trait definitions shared across ReadHub crates.

pub mod cache;

pub use cache::CacheProvider;
