//! Repository error model.

use crate::calc::aggregate::AggregateError;
use crate::dao::DaoError;
use crate::db::DbError;
use crate::model::RowId;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Caller-facing classification of a failed repository operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed request, e.g. updating a dish without an id.
    InvalidArgument,
    /// Target dish does not exist.
    NotFound,
    /// The store rejected or failed a statement (constraint, I/O, panic).
    StoreWriteFailure,
    /// Products could not be aggregated into dish nutrition.
    InvalidAggregateInput,
    /// Operation was cancelled before the worker started it.
    Cancelled,
    /// The worker has stopped and cannot take work.
    WorkerUnavailable,
}

impl ErrorKind {
    /// Stable code used in log lines.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::NotFound => "NOT_FOUND",
            Self::StoreWriteFailure => "STORE_WRITE_FAILURE",
            Self::InvalidAggregateInput => "INVALID_AGGREGATE_INPUT",
            Self::Cancelled => "CANCELLED",
            Self::WorkerUnavailable => "WORKER_UNAVAILABLE",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of one repository operation.
#[derive(Debug)]
pub enum RepoError {
    InvalidArgument(String),
    DishNotFound(RowId),
    Aggregate(AggregateError),
    Store(DaoError),
    /// Store could not be opened or migrated.
    Bootstrap(DbError),
    /// The operation panicked on the worker; payload is sanitized.
    OperationPanicked(String),
    Cancelled,
    WorkerUnavailable,
}

impl RepoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::DishNotFound(_) => ErrorKind::NotFound,
            Self::Aggregate(_) => ErrorKind::InvalidAggregateInput,
            Self::Store(_) | Self::Bootstrap(_) | Self::OperationPanicked(_) => {
                ErrorKind::StoreWriteFailure
            }
            Self::Cancelled => ErrorKind::Cancelled,
            Self::WorkerUnavailable => ErrorKind::WorkerUnavailable,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::DishNotFound(id) => write!(f, "dish not found: {id}"),
            Self::Aggregate(err) => write!(f, "cannot compute dish nutrition: {err}"),
            Self::Store(err) => write!(f, "dish store failure: {err}"),
            Self::Bootstrap(err) => write!(f, "dish store bootstrap failed: {err}"),
            Self::OperationPanicked(payload) => write!(f, "operation panicked: {payload}"),
            Self::Cancelled => write!(f, "operation cancelled before it started"),
            Self::WorkerUnavailable => write!(f, "dish repository worker is not running"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Aggregate(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Bootstrap(err) => Some(err),
            Self::InvalidArgument(_)
            | Self::DishNotFound(_)
            | Self::OperationPanicked(_)
            | Self::Cancelled
            | Self::WorkerUnavailable => None,
        }
    }
}

impl From<AggregateError> for RepoError {
    fn from(value: AggregateError) -> Self {
        Self::Aggregate(value)
    }
}

impl From<DaoError> for RepoError {
    fn from(value: DaoError) -> Self {
        Self::Store(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Bootstrap(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Store(DaoError::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, RepoError};
    use crate::calc::aggregate::AggregateError;

    #[test]
    fn kinds_follow_variants() {
        assert_eq!(RepoError::DishNotFound(4).kind(), ErrorKind::NotFound);
        assert_eq!(
            RepoError::from(AggregateError::ZeroTotalMass).kind(),
            ErrorKind::InvalidAggregateInput
        );
        assert_eq!(
            RepoError::OperationPanicked("boom".to_string()).kind(),
            ErrorKind::StoreWriteFailure
        );
        assert_eq!(
            RepoError::from(rusqlite::Error::QueryReturnedNoRows).kind(),
            ErrorKind::StoreWriteFailure
        );
    }

    #[test]
    fn kind_codes_are_stable() {
        assert_eq!(ErrorKind::NotFound.as_str(), "NOT_FOUND");
        assert_eq!(
            ErrorKind::InvalidAggregateInput.to_string(),
            "INVALID_AGGREGATE_INPUT"
        );
    }
}
