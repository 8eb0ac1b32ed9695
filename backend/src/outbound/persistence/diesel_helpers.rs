//! Shared helpers for the Diesel repository implementations.
//!
//! Each repository owns its port error type, so the helpers here classify
//! Diesel failures into a small neutral shape that the repositories then
//! translate with their own constructors.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::{debug, warn};

use super::models::CorruptRow;
use super::pool::PoolError;

/// Neutral classification of a failed Diesel operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DieselFailure {
    /// The connection dropped mid-operation.
    Connection(&'static str),
    /// Any other failure; reported as a query error.
    Query(&'static str),
    /// A unique index rejected the write. Holds the constraint name, or the
    /// server message when the driver did not report one.
    UniqueViolation(String),
    /// A foreign key rejected the write.
    ForeignKeyViolation(String),
}

impl DieselFailure {
    /// Whether a constraint violation names the given index or constraint.
    pub(crate) fn names(&self, constraint: &str) -> bool {
        match self {
            Self::UniqueViolation(name) | Self::ForeignKeyViolation(name) => {
                name.contains(constraint)
            }
            Self::Connection(_) | Self::Query(_) => false,
        }
    }
}

/// Extract a readable message from a pool error.
pub(crate) fn pool_error_message(error: PoolError) -> String {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    }
}

/// Classify a Diesel error and emit debug context.
pub(crate) fn classify_diesel_error(error: DieselError) -> DieselFailure {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => DieselFailure::Query("record not found"),
        DieselError::QueryBuilderError(_) => DieselFailure::Query("database query error"),
        DieselError::DatabaseError(kind, info) => {
            let constraint = || {
                info.constraint_name()
                    .map_or_else(|| info.message().to_owned(), str::to_owned)
            };
            match kind {
                DatabaseErrorKind::UniqueViolation => {
                    DieselFailure::UniqueViolation(constraint())
                }
                DatabaseErrorKind::ForeignKeyViolation => {
                    DieselFailure::ForeignKeyViolation(constraint())
                }
                DatabaseErrorKind::ClosedConnection => {
                    DieselFailure::Connection("database connection error")
                }
                _ => DieselFailure::Query("database error"),
            }
        }
        _ => DieselFailure::Query("database error"),
    }
}

/// Log a constraint violation no repository knows how to name.
pub(crate) fn unrecognised_violation(failure: &DieselFailure) -> &'static str {
    warn!(?failure, "unrecognised constraint violation");
    "constraint violation"
}

/// Report a stored row that no longer passes domain validation.
pub(crate) fn corrupt_row_message(error: CorruptRow) -> String {
    warn!(%error, "stored row failed domain validation");
    error.to_string()
}

/// Convert every row, stopping at the first corrupt one.
pub(crate) fn collect_rows<R, T, E>(
    rows: Vec<R>,
    convert: impl Fn(R) -> Result<T, CorruptRow>,
    query: impl Fn(String) -> E,
) -> Result<Vec<T>, E> {
    rows.into_iter()
        .map(convert)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| query(corrupt_row_message(err)))
}
