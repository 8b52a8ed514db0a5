//! Errors raised while extracting and resolving entities.

use thiserror::Error;

use crate::metadata::SourceError;

pub type ExtractResult<T> = Result<T, ExtractError>;

pub type ResolveResult<T> = Result<T, ResolveError>;

/// Errors that abort row extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The scan did not return a column the table declares, not even after
    /// stripping identifier quotes.
    #[error("cannot read column '{column}' of table {table}")]
    ColumnUnreadable { table: String, column: String },
}

/// Errors that abort reference resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{entity}: required reference {foreign_key} has no match for {target}")]
    UnresolvedRequired {
        entity: String,
        foreign_key: String,
        target: String,
    },
}
