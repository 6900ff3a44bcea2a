//! supersonic - columnar, vectorized expression and projection core.
//!
//! A library for evaluating relational expressions over in-memory column
//! blocks in batches. Hosts compose logical projectors and expressions, bind
//! them against concrete schemas, and repeatedly feed input [`View`]s to a
//! [`BoundExpressionTree`], receiving output views that live in the tree's
//! arena until the next evaluation.
//!
//! The crate covers the schema and block model, single- and multi-source
//! projectors, the bound expression tree, and the typed error discipline
//! that threads through binding and evaluation. Operators such as sort and
//! aggregation are host concerns; the [`config`] module defines the records
//! they consume.

pub mod allocator;
pub mod bitmap;
pub mod block;
pub mod config;
pub mod error;
pub mod expression;
pub mod projector;
pub mod schema;
pub mod types;

pub use allocator::{Allocator, BoundedAllocator, HeapAllocator};
pub use bitmap::Bitmap;
pub use block::{Block, Column, ColumnView, StringArena, View};
pub use config::{
    ColumnOrder, DedupStrategy, Distinctness, ExtendedSortSpecification, SortKey,
};
pub use error::{Error, ErrorCode, Result};
pub use expression::{
    ArithmeticOp, BoundExpression, BoundExpressionTree, ComparisonOp, Expression,
    DEFAULT_MAX_ROW_COUNT,
};
pub use projector::{
    BoundMultiSourceProjector, BoundSingleSourceProjector, MultiSourceProjector,
    SingleSourceProjector, SourceAttribute,
};
pub use schema::{Attribute, TupleSchema};
pub use types::{DataType, Nullability, Value};
