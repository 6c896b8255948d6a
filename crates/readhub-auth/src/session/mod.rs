//! Two-tier session storage and login serialization.

pub mod locks;
pub mod store;

pub use locks::LoginLockRegistry;
pub use store::SessionStore;
