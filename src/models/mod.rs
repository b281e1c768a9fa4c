//! Core data models: the spec catalog, compositions and seasons.

mod catalog;
mod composition;
mod season;
mod spec;

pub use catalog::*;
pub use composition::*;
pub use season::*;
pub use spec::*;
