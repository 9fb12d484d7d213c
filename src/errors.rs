//! # Error Handling
//!
//! Three error families surface from this crate:
//!
//! - [`ConfigError`]: a [`QueryConfiguration`](crate::models::QueryConfiguration) was
//!   rejected at construction time. Converts into [`QueryError::Config`] so handlers can
//!   use `?` on both.
//! - [`InvalidFieldPath`]: a dotted path did not resolve against entity metadata. In the
//!   default lenient mode the engine logs and skips such paths; in strict mode they are
//!   returned wrapped in [`QueryError::InvalidFieldPath`].
//! - [`QueryError`]: returned by [`QueryEngine`](crate::QueryEngine) when a query cannot be
//!   built or the data query fails.
//!
//! `QueryError` implements axum's `IntoResponse`. Database errors are logged with
//! `tracing` and replaced by a generic message so that SQL and driver details never
//! reach the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;
use std::fmt;

/// Rejection raised while building a `QueryConfiguration`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The entity identifier is empty or contains characters outside `[A-Za-z0-9_]`
    InvalidEntity { entity: String },
    /// Page numbers start at 1
    InvalidPage { page: u64 },
    /// Page size must be at least 1 and at most the configured ceiling
    InvalidPageSize { page_size: u64, max: u64 },
    /// Sort direction given directly to the configuration was not `asc` or `desc`
    InvalidSortDirection { direction: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEntity { entity } => write!(f, "invalid entity identifier '{entity}'"),
            Self::InvalidPage { page } => write!(f, "page must be >= 1, got {page}"),
            Self::InvalidPageSize { page_size, max } => {
                write!(f, "page size must be between 1 and {max}, got {page_size}")
            }
            Self::InvalidSortDirection { direction } => {
                write!(f, "sort direction must be 'asc' or 'desc', got '{direction}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Why a field path failed to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathErrorKind {
    /// The path (or one of its segments) is empty
    Empty,
    /// The segment is neither a field nor a relation of the entity reached so far
    UnknownSegment { segment: String, entity: String },
    /// A non-final segment is a scalar field, so nothing can be traversed through it
    NotARelation { segment: String, entity: String },
    /// The final segment is a relation; paths must end on a scalar field
    EndsOnRelation { segment: String, entity: String },
    /// The relation points at an entity the metadata provider does not know
    UnknownTarget { relation: String, target: String },
    /// The join alias derived from the path is the root alias
    ReservedAlias { alias: String },
    /// Another relation path in the same query already produced this join alias
    AliasCollision { alias: String, claimed_by: String },
    /// Sorting needs one value per row; the path crosses a one-to-many relation
    SortThroughToMany { relation: String },
}

/// A dotted field path that does not resolve against entity metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidFieldPath {
    pub path: String,
    pub kind: PathErrorKind,
}

impl InvalidFieldPath {
    pub(crate) fn new(path: &str, kind: PathErrorKind) -> Self {
        Self {
            path: path.to_string(),
            kind,
        }
    }
}

impl fmt::Display for InvalidFieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = &self.path;
        match &self.kind {
            PathErrorKind::Empty => write!(f, "invalid field path '{path}': empty segment"),
            PathErrorKind::UnknownSegment { segment, entity } => write!(
                f,
                "invalid field path '{path}': '{segment}' is not a field or relation of {entity}"
            ),
            PathErrorKind::NotARelation { segment, entity } => write!(
                f,
                "invalid field path '{path}': '{segment}' on {entity} is not a relation"
            ),
            PathErrorKind::EndsOnRelation { segment, entity } => write!(
                f,
                "invalid field path '{path}': '{segment}' on {entity} is a relation, expected a field"
            ),
            PathErrorKind::UnknownTarget { relation, target } => write!(
                f,
                "invalid field path '{path}': relation '{relation}' targets unknown entity {target}"
            ),
            PathErrorKind::ReservedAlias { alias } => write!(
                f,
                "invalid field path '{path}': join alias '{alias}' is reserved for the queried entity"
            ),
            PathErrorKind::AliasCollision { alias, claimed_by } => write!(
                f,
                "invalid field path '{path}': join alias '{alias}' is already used by '{claimed_by}'"
            ),
            PathErrorKind::SortThroughToMany { relation } => write!(
                f,
                "invalid field path '{path}': cannot sort through one-to-many relation '{relation}'"
            ),
        }
    }
}

impl std::error::Error for InvalidFieldPath {}

/// Error returned by the query engine.
#[derive(Debug)]
pub enum QueryError {
    /// The request could not be turned into a valid configuration
    Config(ConfigError),
    /// The configured entity is not known to the metadata provider
    UnknownEntity { entity: String },
    /// A filter, search or sort path failed to resolve while running in strict mode
    InvalidFieldPath(InvalidFieldPath),
    /// The data query failed; never retried
    Execution(DbErr),
}

impl QueryError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Config(_) | Self::UnknownEntity { .. } | Self::InvalidFieldPath(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Execution(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to send to clients
    fn user_message(&self) -> String {
        match self {
            Self::Config(err) => err.to_string(),
            Self::UnknownEntity { entity } => format!("Unknown entity '{entity}'"),
            Self::InvalidFieldPath(err) => err.to_string(),
            Self::Execution(_) => "A database error occurred".to_string(),
        }
    }

    fn log_internal(&self) {
        match self {
            Self::Execution(internal) => {
                tracing::error!(error = ?internal, "Query execution failed");
            }
            _ => {
                tracing::debug!(
                    error = %self.user_message(),
                    status = %self.status_code(),
                    "Query rejected"
                );
            }
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Execution(err) => write!(f, "query execution failed: {err}"),
            _ => write!(f, "{}", self.user_message()),
        }
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::InvalidFieldPath(err) => Some(err),
            Self::Execution(err) => Some(err),
            Self::UnknownEntity { .. } => None,
        }
    }
}

impl From<DbErr> for QueryError {
    fn from(err: DbErr) -> Self {
        Self::Execution(err)
    }
}

impl From<ConfigError> for QueryError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<InvalidFieldPath> for QueryError {
    fn from(err: InvalidFieldPath) -> Self {
        Self::InvalidFieldPath(err)
    }
}

/// Error body sent to clients
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        self.log_internal();
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.user_message(),
        };
        (status, Json(body)).into_response()
    }
}
