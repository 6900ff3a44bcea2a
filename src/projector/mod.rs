//! Projectors: logical column-routing specs and their bound forms.

mod multi;
mod single;

pub use multi::{BoundMultiSourceProjector, MultiSourceProjector, SourceAttribute};
pub use single::{BoundSingleSourceProjector, SingleSourceProjector};
