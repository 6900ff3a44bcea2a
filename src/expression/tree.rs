//! The bound expression tree: root evaluator plus the output arena.

use std::sync::Arc;

use crate::allocator::Allocator;
use crate::block::{Block, View};
use crate::error::Result;
use crate::expression::{BoundExpression, Expression};
use crate::schema::TupleSchema;

/// Default batch capacity for expression trees (rows per batch).
pub const DEFAULT_MAX_ROW_COUNT: usize = 2048;

/// A root bound expression together with the output block its results are
/// materialized into, sized for a fixed batch capacity.
///
/// The output buffers are reused across `evaluate` calls; a returned view is
/// valid until the next call. Trees are not safe for concurrent evaluation;
/// independent trees may run on independent threads.
#[derive(Debug)]
pub struct BoundExpressionTree {
    root: Box<dyn BoundExpression>,
    output: Block,
    max_row_count: usize,
}

impl BoundExpressionTree {
    /// Wraps a bound root expression, pre-allocating the output arena for
    /// `max_row_count` rows under the root's result schema.
    ///
    /// # Errors
    ///
    /// Returns `MEMORY_EXCEEDED` if the allocator refuses the arena.
    pub fn create(
        root: Box<dyn BoundExpression>,
        allocator: &Arc<dyn Allocator>,
        max_row_count: usize,
    ) -> Result<Self> {
        let output = Block::new(
            root.result_schema().clone(),
            Arc::clone(allocator),
            max_row_count,
        )?;
        Ok(BoundExpressionTree {
            root,
            output,
            max_row_count,
        })
    }

    /// Binds `expression` against `schema` and wraps it in a tree.
    ///
    /// # Errors
    ///
    /// Returns any binding failure, or `MEMORY_EXCEEDED` for the arena.
    pub fn bind(
        expression: &Expression,
        schema: &TupleSchema,
        allocator: &Arc<dyn Allocator>,
        max_row_count: usize,
    ) -> Result<Self> {
        let root = expression.bind(schema, allocator, max_row_count)?;
        Self::create(root, allocator, max_row_count)
    }

    /// Returns the schema of the produced views.
    #[must_use]
    pub fn result_schema(&self) -> &TupleSchema {
        self.output.schema()
    }

    /// Returns the batch capacity the tree was built for.
    #[must_use]
    pub fn max_row_count(&self) -> usize {
        self.max_row_count
    }

    /// Returns the set of input attribute names the tree reads.
    #[must_use]
    pub fn referred_attribute_names(&self) -> std::collections::BTreeSet<String> {
        self.root.referred_attribute_names()
    }

    /// Evaluates the tree over `input`, returning a view over the prefix
    /// `[0, input.row_count())` of the output arena. Output rows are in
    /// input order.
    ///
    /// # Errors
    ///
    /// Returns a runtime evaluation failure.
    ///
    /// # Panics
    ///
    /// Panics if `input.row_count()` exceeds the batch capacity; that is a
    /// contract violation, not a runtime failure.
    pub fn evaluate<'a>(&'a mut self, input: &View<'a>) -> Result<View<'a>> {
        assert!(
            input.row_count() <= self.max_row_count,
            "batch of {} rows exceeds the tree's capacity of {}",
            input.row_count(),
            self.max_row_count
        );
        let result = self.root.evaluate(input, None)?;
        self.output.copy_from_view(&result);
        drop(result);
        let output: &'a Block = &self.output;
        Ok(output.view())
    }
}
