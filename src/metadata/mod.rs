//! Driver connectivity boundary.
//!
//! This module defines the traits through which the core talks to a database
//! and the raw rows a driver reports. Nothing here interprets the metadata;
//! the schema builder turns it into a [`crate::schema::Schema`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  MetadataSource (describe)        │  RowSource (scan)           │
//! │  - list_tables()                  │  - scan() -> RowCursor      │
//! │  - get_columns()                  │    (batched, fetch_size)    │
//! │  - get_primary_key()              │                             │
//! │  - get_imported_keys()            │                             │
//! │  - get_vendor_metadata()          │                             │
//! └─────────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  SqliteSource (rusqlite)                        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use fixgraph::metadata::{MetadataSource, SqliteSource};
//!
//! let source = SqliteSource::open("./fixtures.db")?;
//! let tables = source.list_tables("main")?;
//! let columns = source.get_columns(&tables[0])?;
//! ```

mod error;
mod source;
pub mod sqlite;
mod types;

pub use error::{SourceError, SourceResult};
pub use source::{MetadataSource, RowCursor, RowSource};
pub use sqlite::SqliteSource;
pub use types::*;
