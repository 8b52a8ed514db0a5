//! # fixgraph
//!
//! Dependency-ordered test fixtures from an existing relational database.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        Driver (MetadataSource / RowSource)               │
//! │        metadata::SqliteSource                            │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [schema builder, foreign keys]
//! ┌─────────────────────────────────────────────────────────┐
//! │   Schema (tables, columns, foreign keys as an arena)     │
//! │   + join-table simplifications                           │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [extract]
//! ┌─────────────────────────────────────────────────────────┐
//! │   EntitySet (one entity per row, placeholder refs)       │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [resolve]
//! ┌─────────────────────────────────────────────────────────┐
//! │   EntitySet (resolved refs)                              │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [sort + inclusion]
//! ┌─────────────────────────────────────────────────────────┐
//! │   FixturePlan (creation order, stand-ins, drops)         │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Naming, type mapping, value rendering and inclusion decisions are injected
//! through the traits in [`strategy`] and [`plan::InclusionDecider`].

pub mod config;
pub mod entity;
pub mod metadata;
pub mod pipeline;
pub mod plan;
pub mod schema;
pub mod strategy;

pub use entity::{Entity, EntityId, EntitySet};
pub use pipeline::{Pipeline, PipelineError, PipelineResult};
pub use plan::{FixturePlan, Inclusion, InclusionDecider};
pub use schema::{Schema, SchemaBuilder};
