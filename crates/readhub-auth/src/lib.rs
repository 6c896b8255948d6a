//! # readhub-auth
//!
//! Authentication and session lifecycle management for the ReadHub user
//! service.
//!
//! ## Modules
//!
//! - `password` — Argon2id password hashing and verification
//! - `token` — signed token minting and parsing with a uniqueness nonce
//! - `session` — the two-tier session store and the per-username login
//!   lock registry
//! - `audit` — best-effort login audit recording
//! - `service` — the orchestrator composing the above into the public
//!   register / login / logout / refresh / validate operations

pub mod audit;
pub mod password;
pub mod service;
pub mod session;
pub mod token;

pub use audit::LoginAuditLog;
pub use password::PasswordHasher;
pub use service::{
    AuthService, ChangePasswordRequest, LoginRequest, LoginResponse, RegisterRequest,
};
pub use session::{LoginLockRegistry, SessionStore};
pub use token::{Claims, TokenCodec};
