//! Injected strategies.
//!
//! The core depends only on these narrow traits; the defaults here are used
//! when the caller does not provide its own.

pub mod naming;
pub mod render;
pub mod types;

pub use naming::{InflectorNaming, NamingStrategy};
pub use render::{LiteralRenderer, RenderedValue, ValueRenderer};
pub use types::{SqlTypeMapper, TypeMapper};

/// The strategy set used by row extraction.
#[derive(Clone, Copy)]
pub struct Strategies<'a> {
    pub naming: &'a dyn NamingStrategy,
    pub types: &'a dyn TypeMapper,
    pub values: &'a dyn ValueRenderer,
}

impl<'a> Strategies<'a> {
    pub fn new(
        naming: &'a dyn NamingStrategy,
        types: &'a dyn TypeMapper,
        values: &'a dyn ValueRenderer,
    ) -> Self {
        Self {
            naming,
            types,
            values,
        }
    }
}
