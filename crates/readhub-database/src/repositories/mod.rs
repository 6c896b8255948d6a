//! Repository traits and their Postgres implementations.
//!
//! The traits are the capability seams injected into the auth layer; the
//! `Pg*` structs are the production implementations. Tests substitute
//! in-memory doubles.

pub mod login_log;
pub mod session;
pub mod user;

pub use login_log::{LoginLogRepository, PgLoginLogRepository};
pub use session::{PgSessionRepository, SessionRepository};
pub use user::{PgUserRepository, UserRepository};

use readhub_core::error::{AppError, ErrorKind};

/// Map a sqlx error to an [`AppError`], turning unique-constraint
/// violations into the given `kind` so callers can detect collisions.
pub(crate) fn map_sqlx_error(e: sqlx::Error, context: &str, unique_kind: ErrorKind) -> AppError {
    let is_unique = matches!(
        &e,
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505")
    );
    if is_unique {
        AppError::with_source(unique_kind, format!("{context}: unique violation"), e)
    } else {
        AppError::with_source(ErrorKind::Database, context.to_string(), e)
    }
}
