//! Shared Diesel error classification for the persistence adapters.
//!
//! Each adapter turns a [`StoreFailure`] into its own port error, so the
//! logging and variant matching live in one place.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use crate::domain::ports::{IdentityLookupError, LearningStoreError, SubscriptionLookupError};

use super::pool::PoolError;

/// Storage failure reduced to what the ports distinguish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StoreFailure {
    Connection(String),
    Query(String),
    /// A unique index rejected a write; carries the constraint name.
    UniqueViolation(String),
}

impl From<PoolError> for StoreFailure {
    fn from(error: PoolError) -> Self {
        match error {
            PoolError::Open { message } | PoolError::Checkout { message } => {
                Self::Connection(message)
            }
        }
    }
}

impl From<DieselError> for StoreFailure {
    fn from(error: DieselError) -> Self {
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
            DieselError::NotFound => Self::Query("record not found".to_owned()),
            DieselError::QueryBuilderError(_) => Self::Query("database query error".to_owned()),
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                Self::UniqueViolation(
                    info.constraint_name()
                        .unwrap_or("unique constraint")
                        .to_owned(),
                )
            }
            DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
                Self::Connection("database connection error".to_owned())
            }
            _ => Self::Query("database error".to_owned()),
        }
    }
}

impl From<StoreFailure> for LearningStoreError {
    fn from(failure: StoreFailure) -> Self {
        match failure {
            StoreFailure::Connection(message) => Self::connection(message),
            StoreFailure::Query(message) => Self::query(message),
            StoreFailure::UniqueViolation(constraint) => Self::unique_violation(constraint),
        }
    }
}

impl From<StoreFailure> for IdentityLookupError {
    fn from(failure: StoreFailure) -> Self {
        match failure {
            StoreFailure::Connection(message) => Self::connection(message),
            StoreFailure::Query(message) | StoreFailure::UniqueViolation(message) => {
                Self::query(message)
            }
        }
    }
}

impl From<StoreFailure> for SubscriptionLookupError {
    fn from(failure: StoreFailure) -> Self {
        match failure {
            StoreFailure::Connection(message) => Self::connection(message),
            StoreFailure::Query(message) | StoreFailure::UniqueViolation(message) => {
                Self::query(message)
            }
        }
    }
}

/// Map a Diesel error straight into a learning store error.
pub(crate) fn store_error(error: DieselError) -> LearningStoreError {
    StoreFailure::from(error).into()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn pool_failures_are_connection_failures() {
        let failure = StoreFailure::from(PoolError::checkout("timed out"));
        assert_eq!(failure, StoreFailure::Connection("timed out".to_owned()));
        assert!(matches!(
            LearningStoreError::from(failure),
            LearningStoreError::Connection { .. }
        ));
    }

    #[rstest]
    #[case(DieselError::NotFound)]
    #[case(DieselError::RollbackTransaction)]
    fn other_diesel_errors_are_query_failures(#[case] error: DieselError) {
        assert!(matches!(StoreFailure::from(error), StoreFailure::Query(_)));
    }

    #[rstest]
    fn unique_violations_stay_distinct_only_for_the_store() {
        let failure = StoreFailure::UniqueViolation("certificates_enrollment_id_key".to_owned());
        assert!(matches!(
            LearningStoreError::from(failure.clone()),
            LearningStoreError::UniqueViolation { .. }
        ));
        assert!(matches!(
            IdentityLookupError::from(failure),
            IdentityLookupError::Query { .. }
        ));
    }
}
