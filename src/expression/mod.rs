//! Expressions: logical specs, bound vectorized evaluators, and the
//! expression tree that owns the output arena.
//!
//! Unbound expressions form a closed sum type with a single `bind`
//! dispatcher. Bound expressions stay behind a trait because new kinds
//! (arithmetic variants, case, host-defined functions) are an extension
//! point.

mod compute;
mod projecting;
mod tree;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::allocator::Allocator;
use crate::bitmap::Bitmap;
use crate::block::View;
use crate::error::Result;
use crate::projector::MultiSourceProjector;
use crate::schema::TupleSchema;
use crate::types::Value;

pub use compute::{bound_arithmetic, bound_comparison, bound_is_null, bound_literal};
pub use projecting::{
    bound_alias, bound_attribute_at, bound_compound, bound_named_attribute, bound_projection,
    bound_rename_compound,
};
pub use tree::{BoundExpressionTree, DEFAULT_MAX_ROW_COUNT};

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl ArithmeticOp {
    /// Returns the symbol of this operator.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Subtract => "-",
            ArithmeticOp::Multiply => "*",
            ArithmeticOp::Divide => "/",
        }
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    /// Equal (=).
    Eq,
    /// Not equal (<>).
    Neq,
    /// Less than (<).
    Lt,
    /// Less than or equal (<=).
    Lte,
    /// Greater than (>).
    Gt,
    /// Greater than or equal (>=).
    Gte,
}

impl ComparisonOp {
    /// Returns the symbol of this operator.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Neq => "<>",
            ComparisonOp::Lt => "<",
            ComparisonOp::Lte => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Gte => ">=",
        }
    }
}

/// A bound expression: a vectorized evaluator with a fixed result schema.
///
/// Bound expressions are immutable in structure; `evaluate` only touches
/// internal output buffers. They do not own the tree-level output arena.
pub trait BoundExpression: fmt::Debug {
    /// Returns the schema of the produced columns.
    fn result_schema(&self) -> &TupleSchema;

    /// Adds the names of all input attributes this expression reads into
    /// `names`. Composite kinds recurse into every child, including children
    /// whose outputs are never surfaced.
    fn collect_referred_attribute_names(&self, names: &mut BTreeSet<String>);

    /// Returns the set of input attribute names this expression reads.
    fn referred_attribute_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_referred_attribute_names(&mut names);
        names
    }

    /// Evaluates over `input`, producing a view with the same row count.
    ///
    /// The returned view aliases either the input or this expression's
    /// internal buffers and must be consumed before the next call. Rows
    /// marked in `skip` carry cleared null bits and unspecified values, and
    /// never raise value errors.
    ///
    /// # Errors
    ///
    /// Returns a runtime failure; structural problems surface at bind time,
    /// never here.
    fn evaluate<'a>(&'a mut self, input: &View<'a>, skip: Option<&'a Bitmap>)
        -> Result<View<'a>>;
}

/// Logical description of an expression over one input schema.
///
/// Binding resolves names and types against a concrete schema, allocates the
/// evaluator's output buffers for a batch capacity, and produces a
/// [`BoundExpression`].
#[derive(Debug, Clone)]
pub enum Expression {
    /// References the input attribute at a position.
    AttributeAt(usize),
    /// References an input attribute by name.
    NamedAttribute(String),
    /// Renames the single output attribute of the child.
    Alias {
        /// The replacement name.
        alias: String,
        /// The renamed expression; must produce exactly one attribute.
        child: Box<Expression>,
    },
    /// Runs the children and gates their outputs through a multi-source
    /// projector whose sources are the child result schemas.
    Projection {
        /// Source expressions, one per projector source.
        children: Vec<Expression>,
        /// Routing of child outputs into the result.
        projector: MultiSourceProjector,
    },
    /// Concatenates the children's outputs without reprojecting.
    Compound(Vec<Expression>),
    /// Concatenates the children's outputs, then renames them.
    RenameCompound {
        /// Replacement names, one per concatenated output attribute.
        aliases: Vec<String>,
        /// The concatenated expressions.
        children: Vec<Expression>,
    },
    /// A constant column.
    Literal(Value),
    /// A binary arithmetic expression over numeric operands.
    Arithmetic {
        /// The operator.
        op: ArithmeticOp,
        /// Left operand; must produce exactly one attribute.
        lhs: Box<Expression>,
        /// Right operand; must produce exactly one attribute.
        rhs: Box<Expression>,
    },
    /// A binary comparison producing BOOL.
    Comparison {
        /// The operator.
        op: ComparisonOp,
        /// Left operand; must produce exactly one attribute.
        lhs: Box<Expression>,
        /// Right operand; must produce exactly one attribute.
        rhs: Box<Expression>,
    },
    /// NULL test producing NOT_NULLABLE BOOL.
    IsNull {
        /// The tested expression; must produce exactly one attribute.
        child: Box<Expression>,
        /// Inverts the test (IS NOT NULL).
        negated: bool,
    },
}

impl Expression {
    /// References the input attribute at `position`.
    #[must_use]
    pub fn attribute_at(position: usize) -> Self {
        Expression::AttributeAt(position)
    }

    /// References the input attribute named `name`.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Expression::NamedAttribute(name.into())
    }

    /// Renames the single output of `child` to `alias`.
    #[must_use]
    pub fn alias(alias: impl Into<String>, child: Expression) -> Self {
        Expression::Alias {
            alias: alias.into(),
            child: Box::new(child),
        }
    }

    /// Projects the outputs of `children` through `projector`.
    #[must_use]
    pub fn projection(children: Vec<Expression>, projector: MultiSourceProjector) -> Self {
        Expression::Projection {
            children,
            projector,
        }
    }

    /// Concatenates the outputs of `children`.
    #[must_use]
    pub fn compound(children: Vec<Expression>) -> Self {
        Expression::Compound(children)
    }

    /// Concatenates the outputs of `children` and renames them to `aliases`.
    #[must_use]
    pub fn rename_compound<S: Into<String>>(
        aliases: impl IntoIterator<Item = S>,
        children: Vec<Expression>,
    ) -> Self {
        Expression::RenameCompound {
            aliases: aliases.into_iter().map(Into::into).collect(),
            children,
        }
    }

    /// A constant column holding `value`.
    #[must_use]
    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Literal(value.into())
    }

    /// `lhs + rhs`.
    #[must_use]
    pub fn add(lhs: Expression, rhs: Expression) -> Self {
        Self::arithmetic(ArithmeticOp::Add, lhs, rhs)
    }

    /// `lhs - rhs`.
    #[must_use]
    pub fn subtract(lhs: Expression, rhs: Expression) -> Self {
        Self::arithmetic(ArithmeticOp::Subtract, lhs, rhs)
    }

    /// `lhs * rhs`.
    #[must_use]
    pub fn multiply(lhs: Expression, rhs: Expression) -> Self {
        Self::arithmetic(ArithmeticOp::Multiply, lhs, rhs)
    }

    /// `lhs / rhs`; a zero divisor yields NULL.
    #[must_use]
    pub fn divide(lhs: Expression, rhs: Expression) -> Self {
        Self::arithmetic(ArithmeticOp::Divide, lhs, rhs)
    }

    /// A binary arithmetic expression.
    #[must_use]
    pub fn arithmetic(op: ArithmeticOp, lhs: Expression, rhs: Expression) -> Self {
        Expression::Arithmetic {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// A binary comparison.
    #[must_use]
    pub fn comparison(op: ComparisonOp, lhs: Expression, rhs: Expression) -> Self {
        Expression::Comparison {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// `child IS NULL`.
    #[must_use]
    pub fn is_null(child: Expression) -> Self {
        Expression::IsNull {
            child: Box::new(child),
            negated: false,
        }
    }

    /// `child IS NOT NULL`.
    #[must_use]
    pub fn is_not_null(child: Expression) -> Self {
        Expression::IsNull {
            child: Box::new(child),
            negated: true,
        }
    }

    /// Resolves this expression against a concrete input schema, allocating
    /// evaluator buffers for batches of up to `max_row_count` rows.
    ///
    /// Binding is pure and deterministic; it may be done from any thread.
    ///
    /// # Errors
    ///
    /// Returns structural binding errors (`ATTRIBUTE_MISSING`,
    /// `ATTRIBUTE_EXISTS`, `ATTRIBUTE_COUNT_MISMATCH`, `TYPE_MISMATCH`) or
    /// `MEMORY_EXCEEDED` from the allocator, annotated with this
    /// expression's rendering.
    pub fn bind(
        &self,
        schema: &TupleSchema,
        allocator: &Arc<dyn Allocator>,
        max_row_count: usize,
    ) -> Result<Box<dyn BoundExpression>> {
        self.bind_internal(schema, allocator, max_row_count)
            .map_err(|e| e.with_context(&self.to_string()))
    }

    fn bind_internal(
        &self,
        schema: &TupleSchema,
        allocator: &Arc<dyn Allocator>,
        max_row_count: usize,
    ) -> Result<Box<dyn BoundExpression>> {
        match self {
            Expression::AttributeAt(position) => bound_attribute_at(schema, *position),
            Expression::NamedAttribute(name) => bound_named_attribute(schema, name),
            Expression::Alias { alias, child } => {
                let bound = child.bind(schema, allocator, max_row_count)?;
                bound_alias(alias, bound)
            }
            Expression::Projection {
                children,
                projector,
            } => {
                let bound_children = Self::bind_all(children, schema, allocator, max_row_count)?;
                let schemas: Vec<TupleSchema> = bound_children
                    .iter()
                    .map(|child| child.result_schema().clone())
                    .collect();
                let bound_projector = projector.bind(&schemas)?;
                bound_projection(bound_projector, bound_children)
            }
            Expression::Compound(children) => {
                let bound_children = Self::bind_all(children, schema, allocator, max_row_count)?;
                bound_compound(bound_children)
            }
            Expression::RenameCompound { aliases, children } => {
                let bound_children = Self::bind_all(children, schema, allocator, max_row_count)?;
                bound_rename_compound(aliases, bound_children)
            }
            Expression::Literal(value) => bound_literal(value.clone(), allocator, max_row_count),
            Expression::Arithmetic { op, lhs, rhs } => {
                let lhs = lhs.bind(schema, allocator, max_row_count)?;
                let rhs = rhs.bind(schema, allocator, max_row_count)?;
                bound_arithmetic(*op, lhs, rhs, allocator, max_row_count)
            }
            Expression::Comparison { op, lhs, rhs } => {
                let lhs = lhs.bind(schema, allocator, max_row_count)?;
                let rhs = rhs.bind(schema, allocator, max_row_count)?;
                bound_comparison(*op, lhs, rhs, allocator, max_row_count)
            }
            Expression::IsNull { child, negated } => {
                let bound = child.bind(schema, allocator, max_row_count)?;
                bound_is_null(bound, *negated, allocator, max_row_count)
            }
        }
    }

    fn bind_all(
        children: &[Expression],
        schema: &TupleSchema,
        allocator: &Arc<dyn Allocator>,
        max_row_count: usize,
    ) -> Result<Vec<Box<dyn BoundExpression>>> {
        children
            .iter()
            .map(|child| child.bind(schema, allocator, max_row_count))
            .collect()
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, children: &[Expression]) -> fmt::Result {
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{child}")?;
            }
            Ok(())
        }

        match self {
            Expression::AttributeAt(position) => write!(f, "AttributeAt({position})"),
            Expression::NamedAttribute(name) => f.write_str(name),
            Expression::Alias { alias, child } => write!(f, "{child} AS {alias}"),
            Expression::Projection {
                children,
                projector,
            } => {
                f.write_str("PROJECT(")?;
                write!(f, "{projector}")?;
                f.write_str(" FROM (")?;
                join(f, children)?;
                f.write_str("))")
            }
            Expression::Compound(children) => {
                f.write_str("(")?;
                join(f, children)?;
                f.write_str(")")
            }
            Expression::RenameCompound { aliases, children } => {
                f.write_str("(")?;
                join(f, children)?;
                write!(f, ") RENAME AS ({})", aliases.join(", "))
            }
            Expression::Literal(value) => write!(f, "CONST_{}", value.data_type()),
            Expression::Arithmetic { op, lhs, rhs } => {
                write!(f, "({lhs} {} {rhs})", op.symbol())
            }
            Expression::Comparison { op, lhs, rhs } => {
                write!(f, "({lhs} {} {rhs})", op.symbol())
            }
            Expression::IsNull { child, negated } => {
                if *negated {
                    write!(f, "IS_NOT_NULL({child})")
                } else {
                    write!(f, "IS_NULL({child})")
                }
            }
        }
    }
}
