//! User entity and DTOs.

pub mod model;

pub use model::{CreateUser, UpdateProfile, User, UserProfile};
