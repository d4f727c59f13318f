//! Mapping of sqlx failures onto the unified error kinds.

use filetree_core::error::{AppError, ErrorKind};

/// SQLSTATE codes raised when a mutation cannot complete atomically:
/// serialization failure, deadlock, lock timeout, and the unique, check,
/// and foreign-key violations.
const CONSISTENCY_CODES: &[&str] = &["40001", "40P01", "55P03", "23505", "23514", "23503"];

/// Convert a sqlx error into an [`AppError`] with `context` as the message.
///
/// Anything that is neither a missing row nor a consistency failure is
/// treated as a transient storage failure and therefore retryable.
pub fn db_error(context: &str, err: sqlx::Error) -> AppError {
    let kind = match &err {
        sqlx::Error::RowNotFound => ErrorKind::NotFound,
        sqlx::Error::Database(db_err) => match db_err.code() {
            Some(code) if CONSISTENCY_CODES.contains(&code.as_ref()) => ErrorKind::Consistency,
            _ => ErrorKind::Storage,
        },
        _ => ErrorKind::Storage,
    };
    AppError::with_source(kind, format!("{context}: {err}"), err)
}
