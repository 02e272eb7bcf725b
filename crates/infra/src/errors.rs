//! Conversions from external infrastructure errors into domain errors.

use regiodedupe_domain::DedupeError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub DedupeError);

impl From<InfraError> for DedupeError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<DedupeError> for InfraError {
    fn from(value: DedupeError) -> Self {
        InfraError(value)
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        let mapped = match value {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => DedupeError::Database("database is busy".to_string()),
                    (ErrorCode::DatabaseLocked, _) => DedupeError::Database("database is locked".to_string()),
                    (ErrorCode::ConstraintViolation, 2067) => DedupeError::Conflict("unique constraint violation".to_string()),
                    (ErrorCode::ConstraintViolation, 787) => DedupeError::Database("foreign key constraint violation".to_string()),
                    _ => DedupeError::Database(format!("sqlite failure {:?} (code {}): {message}", err.code, err.extended_code)),
                }
            }
            RE::QueryReturnedNoRows => DedupeError::NotFound("no rows returned by query".to_string()),
            RE::FromSqlConversionFailure(_, _, cause) => DedupeError::Database(format!("failed to convert sqlite value: {cause}")),
            RE::InvalidColumnType(_, _, ty) => DedupeError::Database(format!("invalid column type: {ty}")),
            RE::Utf8Error(_) => DedupeError::Database("invalid UTF-8 returned from sqlite".to_string()),
            RE::InvalidQuery => DedupeError::Database("invalid SQL query".to_string()),
            other => DedupeError::Database(other.to_string()),
        };
        InfraError(mapped)
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        let mapped = if value.is_timeout() {
            DedupeError::Unavailable("HTTP request timed out".to_string())
        } else if value.is_connect() {
            DedupeError::Unavailable("HTTP connection failure".to_string())
        } else if let Some(status) = value.status() {
            let code = status.as_u16();
            let message = format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));
            match code {
                429 | 500..=599 => DedupeError::Unavailable(message),
                400..=499 => DedupeError::InvalidInput(message),
                _ => DedupeError::Network(message),
            }
        } else {
            DedupeError::Network(value.to_string())
        };
        InfraError(mapped)
    }
}

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(DedupeError::Database(format!("connection pool error: {value}")))
    }
}

/// Stable label for `error`, suitable for structured log fields.
#[inline]
#[must_use]
pub fn error_label(error: &DedupeError) -> &'static str {
    match error {
        DedupeError::Database(_) => "database",
        DedupeError::Config(_) => "config",
        DedupeError::Network(_) => "network",
        DedupeError::NotFound(_) => "not_found",
        DedupeError::InvalidInput(_) => "invalid_input",
        DedupeError::Conflict(_) => "conflict",
        DedupeError::Unavailable(_) => "unavailable",
        DedupeError::Internal(_) => "internal",
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::ffi::{Error as FfiError, ErrorCode};
    use rusqlite::Error as SqlError;

    use super::*;

    #[test]
    fn sqlite_busy_maps_to_database_error() {
        let err = SqlError::SqliteFailure(FfiError { code: ErrorCode::DatabaseBusy, extended_code: 5 }, Some("database is locked".into()));
        let mapped: DedupeError = InfraError::from(err).into();
        match mapped {
            DedupeError::Database(msg) => assert!(msg.contains("busy") || msg.contains("locked")),
            other => panic!("expected database error, got {other:?}"),
        }
    }

    #[test]
    fn sqlite_unique_violation_maps_to_conflict() {
        let err = SqlError::SqliteFailure(FfiError { code: ErrorCode::ConstraintViolation, extended_code: 2067 }, Some("UNIQUE".into()));
        let mapped: DedupeError = InfraError::from(err).into();
        assert!(matches!(mapped, DedupeError::Conflict(_)));
    }
}
