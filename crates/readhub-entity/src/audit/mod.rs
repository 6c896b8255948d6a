//! Login audit entities.

pub mod model;

pub use model::CreateLoginAudit;
