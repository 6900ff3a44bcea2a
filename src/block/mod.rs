//! Columnar storage: owning blocks, borrowed views, and string arenas.

mod arena;
mod column;
mod view;

pub use arena::StringArena;
pub use column::{Column, ColumnView, ValueBuffer, ValuesRef};
pub use view::{Block, View};

pub(crate) use column::FixedWidthValue;
