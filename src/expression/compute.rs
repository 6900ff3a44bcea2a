//! Compute expression kinds: literals, arithmetic, comparisons and NULL
//! tests. Unlike the projecting kinds these write into their own output
//! blocks, pre-allocated at bind time for the configured batch capacity.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::allocator::Allocator;
use crate::bitmap::Bitmap;
use crate::block::{Block, ColumnView, FixedWidthValue, ValueBuffer, View};
use crate::error::{Error, ErrorCode, Result};
use crate::expression::{ArithmeticOp, BoundExpression, ComparisonOp};
use crate::schema::{Attribute, TupleSchema};
use crate::types::{DataType, Nullability, Value};

fn single_attribute(expression: &dyn BoundExpression) -> Result<&Attribute> {
    let schema = expression.result_schema();
    if schema.attribute_count() != 1 {
        return Err(Error::new(
            ErrorCode::AttributeCountMismatch,
            format!(
                "scalar operand must produce exactly one attribute, got {}: {schema}",
                schema.attribute_count()
            ),
        ));
    }
    Ok(schema.attribute(0))
}

fn skipped(skip: Option<&Bitmap>, row: usize) -> bool {
    skip.is_some_and(|bitmap| bitmap.get(row))
}

/// A constant column, pre-materialized for the batch capacity at bind time.
#[derive(Debug)]
struct BoundLiteral {
    output: Block,
}

impl BoundExpression for BoundLiteral {
    fn result_schema(&self) -> &TupleSchema {
        self.output.schema()
    }

    fn collect_referred_attribute_names(&self, _names: &mut BTreeSet<String>) {}

    fn evaluate<'a>(
        &'a mut self,
        input: &View<'a>,
        _skip: Option<&'a Bitmap>,
    ) -> Result<View<'a>> {
        let this: &'a Self = self;
        Ok(this.output.view().subrange(0, input.row_count()))
    }
}

/// Binds a constant column holding `value`.
///
/// NULL literals produce a nullable NULL_TYPE column; any other value
/// produces a NOT_NULLABLE column of the value's type.
///
/// # Errors
///
/// Returns `MEMORY_EXCEEDED` if the allocator refuses the output buffer.
pub fn bound_literal(
    value: Value,
    allocator: &Arc<dyn Allocator>,
    max_row_count: usize,
) -> Result<Box<dyn BoundExpression>> {
    let nullability = if value.is_null() {
        Nullability::Nullable
    } else {
        Nullability::NotNullable
    };
    let schema = TupleSchema::from_attributes(vec![Attribute::new(
        "CONST",
        value.data_type(),
        nullability,
    )])?;
    let mut output = Block::new(schema, Arc::clone(allocator), max_row_count)?;
    for _ in 0..max_row_count {
        output.append_row(std::slice::from_ref(&value))?;
    }
    Ok(Box::new(BoundLiteral { output }))
}

/// NULL test; reads only the child's null vector.
#[derive(Debug)]
struct BoundIsNull {
    child: Box<dyn BoundExpression>,
    negated: bool,
    output: Block,
}

impl BoundExpression for BoundIsNull {
    fn result_schema(&self) -> &TupleSchema {
        self.output.schema()
    }

    fn collect_referred_attribute_names(&self, names: &mut BTreeSet<String>) {
        self.child.collect_referred_attribute_names(names);
    }

    fn evaluate<'a>(
        &'a mut self,
        input: &View<'a>,
        skip: Option<&'a Bitmap>,
    ) -> Result<View<'a>> {
        let negated = self.negated;
        let view = self.child.evaluate(input, skip)?;
        let n = view.row_count();
        let column = *view.column(0);
        self.output.reset();
        {
            let (buffer, _, _) = self.output.column_mut(0).parts_mut();
            let values = <bool as FixedWidthValue>::buffer_mut(buffer);
            for row in 0..n {
                values.push(column.is_null(row) != negated);
            }
        }
        self.output.set_row_count(n);
        let output: &'a Block = &self.output;
        Ok(output.view())
    }
}

/// Binds a NULL test over `child`.
///
/// # Errors
///
/// Returns `ATTRIBUTE_COUNT_MISMATCH` if the child is not single-column, or
/// `MEMORY_EXCEEDED` from the allocator.
pub fn bound_is_null(
    child: Box<dyn BoundExpression>,
    negated: bool,
    allocator: &Arc<dyn Allocator>,
    max_row_count: usize,
) -> Result<Box<dyn BoundExpression>> {
    let operand = single_attribute(child.as_ref())?;
    let name = if negated {
        format!("IS_NOT_NULL({})", operand.name())
    } else {
        format!("IS_NULL({})", operand.name())
    };
    let schema = TupleSchema::from_attributes(vec![Attribute::new(
        name,
        DataType::Bool,
        Nullability::NotNullable,
    )])?;
    let output = Block::new(schema, Arc::clone(allocator), max_row_count)?;
    Ok(Box::new(BoundIsNull {
        child,
        negated,
        output,
    }))
}

/// Per-type arithmetic primitives. Integer types wrap; division reports a
/// zero divisor as `None`, which evaluation turns into NULL.
trait ArithmeticKernel: FixedWidthValue + Default {
    fn add(a: Self, b: Self) -> Self;
    fn sub(a: Self, b: Self) -> Self;
    fn mul(a: Self, b: Self) -> Self;
    fn div(a: Self, b: Self) -> Option<Self>;
}

macro_rules! impl_integer_kernel {
    ($type:ty) => {
        impl ArithmeticKernel for $type {
            fn add(a: Self, b: Self) -> Self {
                a.wrapping_add(b)
            }
            fn sub(a: Self, b: Self) -> Self {
                a.wrapping_sub(b)
            }
            fn mul(a: Self, b: Self) -> Self {
                a.wrapping_mul(b)
            }
            fn div(a: Self, b: Self) -> Option<Self> {
                if b == 0 {
                    None
                } else {
                    Some(a.wrapping_div(b))
                }
            }
        }
    };
}

macro_rules! impl_float_kernel {
    ($type:ty) => {
        impl ArithmeticKernel for $type {
            fn add(a: Self, b: Self) -> Self {
                a + b
            }
            fn sub(a: Self, b: Self) -> Self {
                a - b
            }
            fn mul(a: Self, b: Self) -> Self {
                a * b
            }
            fn div(a: Self, b: Self) -> Option<Self> {
                if b == 0.0 {
                    None
                } else {
                    Some(a / b)
                }
            }
        }
    };
}

impl_integer_kernel!(i32);
impl_integer_kernel!(i64);
impl_integer_kernel!(u32);
impl_integer_kernel!(u64);
impl_float_kernel!(f32);
impl_float_kernel!(f64);

fn eval_arithmetic<T: ArithmeticKernel>(
    op: ArithmeticOp,
    n: usize,
    lhs: ColumnView<'_>,
    rhs: ColumnView<'_>,
    buffer: &mut ValueBuffer,
    nulls: Option<&mut Bitmap>,
    skip: Option<&Bitmap>,
) {
    let left = lhs.window::<T>(n);
    let right = rhs.window::<T>(n);
    let out = T::buffer_mut(buffer);
    match op {
        ArithmeticOp::Add => {
            for row in 0..n {
                out.push(T::add(left[row], right[row]));
            }
        }
        ArithmeticOp::Subtract => {
            for row in 0..n {
                out.push(T::sub(left[row], right[row]));
            }
        }
        ArithmeticOp::Multiply => {
            for row in 0..n {
                out.push(T::mul(left[row], right[row]));
            }
        }
        ArithmeticOp::Divide => {
            let nulls = nulls.expect("division output without null vector");
            for row in 0..n {
                let (value, divisor_null) = match T::div(left[row], right[row]) {
                    Some(value) => (value, false),
                    None => (T::default(), true),
                };
                out.push(value);
                let is_null = divisor_null || lhs.is_null(row) || rhs.is_null(row);
                nulls.assign(row, is_null && !skipped(skip, row));
            }
            return;
        }
    }
    if let Some(nulls) = nulls {
        for row in 0..n {
            let is_null = lhs.is_null(row) || rhs.is_null(row);
            nulls.assign(row, is_null && !skipped(skip, row));
        }
    }
}

/// Binary arithmetic over same-typed numeric operands.
#[derive(Debug)]
struct BoundArithmetic {
    op: ArithmeticOp,
    operand_type: DataType,
    lhs: Box<dyn BoundExpression>,
    rhs: Box<dyn BoundExpression>,
    output: Block,
}

impl BoundExpression for BoundArithmetic {
    fn result_schema(&self) -> &TupleSchema {
        self.output.schema()
    }

    fn collect_referred_attribute_names(&self, names: &mut BTreeSet<String>) {
        self.lhs.collect_referred_attribute_names(names);
        self.rhs.collect_referred_attribute_names(names);
    }

    fn evaluate<'a>(
        &'a mut self,
        input: &View<'a>,
        skip: Option<&'a Bitmap>,
    ) -> Result<View<'a>> {
        let op = self.op;
        let operand_type = self.operand_type;
        let n = input.row_count();
        let left_view = self.lhs.evaluate(input, skip)?;
        let right_view = self.rhs.evaluate(input, skip)?;
        let left = *left_view.column(0);
        let right = *right_view.column(0);
        self.output.reset();
        {
            let (buffer, nulls, _) = self.output.column_mut(0).parts_mut();
            match operand_type {
                DataType::Int32 => eval_arithmetic::<i32>(op, n, left, right, buffer, nulls, skip),
                DataType::Int64 => eval_arithmetic::<i64>(op, n, left, right, buffer, nulls, skip),
                DataType::UInt32 => eval_arithmetic::<u32>(op, n, left, right, buffer, nulls, skip),
                DataType::UInt64 => eval_arithmetic::<u64>(op, n, left, right, buffer, nulls, skip),
                DataType::Float => eval_arithmetic::<f32>(op, n, left, right, buffer, nulls, skip),
                DataType::Double => eval_arithmetic::<f64>(op, n, left, right, buffer, nulls, skip),
                other => unreachable!("non-numeric arithmetic operand type {other}"),
            }
        }
        self.output.set_row_count(n);
        let output: &'a Block = &self.output;
        Ok(output.view())
    }
}

/// Binds `lhs op rhs` over numeric operands of one shared type.
///
/// There is no implicit coercion; mixed-type operands fail to bind. The
/// result of a division is always nullable (a zero divisor yields NULL);
/// other results are nullable iff an operand is.
///
/// # Errors
///
/// Returns `ATTRIBUTE_COUNT_MISMATCH` for multi-column operands,
/// `TYPE_MISMATCH` for non-numeric or differing operand types, or
/// `MEMORY_EXCEEDED` from the allocator.
pub fn bound_arithmetic(
    op: ArithmeticOp,
    lhs: Box<dyn BoundExpression>,
    rhs: Box<dyn BoundExpression>,
    allocator: &Arc<dyn Allocator>,
    max_row_count: usize,
) -> Result<Box<dyn BoundExpression>> {
    let left = single_attribute(lhs.as_ref())?;
    let right = single_attribute(rhs.as_ref())?;
    if left.data_type() != right.data_type() {
        return Err(Error::new(
            ErrorCode::TypeMismatch,
            format!(
                "arithmetic operand types differ: {} vs {}",
                left.data_type(),
                right.data_type()
            ),
        ));
    }
    if !left.data_type().is_numeric() {
        return Err(Error::new(
            ErrorCode::TypeMismatch,
            format!("arithmetic requires numeric operands, got {}", left.data_type()),
        ));
    }
    let nullability = if op == ArithmeticOp::Divide {
        Nullability::Nullable
    } else {
        left.nullability().or(right.nullability())
    };
    let name = format!("{} {} {}", left.name(), op.symbol(), right.name());
    let operand_type = left.data_type();
    let schema =
        TupleSchema::from_attributes(vec![Attribute::new(name, operand_type, nullability)])?;
    let output = Block::new(schema, Arc::clone(allocator), max_row_count)?;
    Ok(Box::new(BoundArithmetic {
        op,
        operand_type,
        lhs,
        rhs,
        output,
    }))
}

fn compare<T: PartialOrd>(op: ComparisonOp, a: T, b: T) -> bool {
    match op {
        ComparisonOp::Eq => a == b,
        ComparisonOp::Neq => a != b,
        ComparisonOp::Lt => a < b,
        ComparisonOp::Lte => a <= b,
        ComparisonOp::Gt => a > b,
        ComparisonOp::Gte => a >= b,
    }
}

fn eval_comparison<T: FixedWidthValue + PartialOrd>(
    op: ComparisonOp,
    n: usize,
    lhs: ColumnView<'_>,
    rhs: ColumnView<'_>,
    out: &mut Vec<bool>,
) {
    let left = lhs.window::<T>(n);
    let right = rhs.window::<T>(n);
    for row in 0..n {
        out.push(compare(op, left[row], right[row]));
    }
}

fn eval_bytes_comparison(
    op: ComparisonOp,
    n: usize,
    lhs: ColumnView<'_>,
    rhs: ColumnView<'_>,
    out: &mut Vec<bool>,
) {
    for row in 0..n {
        out.push(compare(op, lhs.bytes_at(row), rhs.bytes_at(row)));
    }
}

/// Binary comparison over same-typed orderable operands, producing BOOL.
#[derive(Debug)]
struct BoundComparison {
    op: ComparisonOp,
    operand_type: DataType,
    lhs: Box<dyn BoundExpression>,
    rhs: Box<dyn BoundExpression>,
    output: Block,
}

impl BoundExpression for BoundComparison {
    fn result_schema(&self) -> &TupleSchema {
        self.output.schema()
    }

    fn collect_referred_attribute_names(&self, names: &mut BTreeSet<String>) {
        self.lhs.collect_referred_attribute_names(names);
        self.rhs.collect_referred_attribute_names(names);
    }

    fn evaluate<'a>(
        &'a mut self,
        input: &View<'a>,
        skip: Option<&'a Bitmap>,
    ) -> Result<View<'a>> {
        let op = self.op;
        let operand_type = self.operand_type;
        let n = input.row_count();
        let left_view = self.lhs.evaluate(input, skip)?;
        let right_view = self.rhs.evaluate(input, skip)?;
        let left = *left_view.column(0);
        let right = *right_view.column(0);
        self.output.reset();
        {
            let (buffer, nulls, _) = self.output.column_mut(0).parts_mut();
            let out = <bool as FixedWidthValue>::buffer_mut(buffer);
            match operand_type {
                DataType::Int32 | DataType::Date => eval_comparison::<i32>(op, n, left, right, out),
                DataType::Int64 | DataType::Datetime => {
                    eval_comparison::<i64>(op, n, left, right, out);
                }
                DataType::UInt32 => eval_comparison::<u32>(op, n, left, right, out),
                DataType::UInt64 => eval_comparison::<u64>(op, n, left, right, out),
                DataType::Float => eval_comparison::<f32>(op, n, left, right, out),
                DataType::Double => eval_comparison::<f64>(op, n, left, right, out),
                DataType::Bool => eval_comparison::<bool>(op, n, left, right, out),
                DataType::String | DataType::Binary => {
                    eval_bytes_comparison(op, n, left, right, out);
                }
                other => unreachable!("non-orderable comparison operand type {other}"),
            }
            if let Some(nulls) = nulls {
                for row in 0..n {
                    let is_null = left.is_null(row) || right.is_null(row);
                    nulls.assign(row, is_null && !skipped(skip, row));
                }
            }
        }
        self.output.set_row_count(n);
        let output: &'a Block = &self.output;
        Ok(output.view())
    }
}

/// Binds `lhs op rhs` over orderable operands of one shared type.
///
/// # Errors
///
/// Returns `ATTRIBUTE_COUNT_MISMATCH` for multi-column operands,
/// `TYPE_MISMATCH` for non-orderable or differing operand types, or
/// `MEMORY_EXCEEDED` from the allocator.
pub fn bound_comparison(
    op: ComparisonOp,
    lhs: Box<dyn BoundExpression>,
    rhs: Box<dyn BoundExpression>,
    allocator: &Arc<dyn Allocator>,
    max_row_count: usize,
) -> Result<Box<dyn BoundExpression>> {
    let left = single_attribute(lhs.as_ref())?;
    let right = single_attribute(rhs.as_ref())?;
    if left.data_type() != right.data_type() {
        return Err(Error::new(
            ErrorCode::TypeMismatch,
            format!(
                "comparison operand types differ: {} vs {}",
                left.data_type(),
                right.data_type()
            ),
        ));
    }
    if !left.data_type().is_orderable() {
        return Err(Error::new(
            ErrorCode::TypeMismatch,
            format!("comparison requires orderable operands, got {}", left.data_type()),
        ));
    }
    let nullability = left.nullability().or(right.nullability());
    let name = format!("{} {} {}", left.name(), op.symbol(), right.name());
    let operand_type = left.data_type();
    let schema =
        TupleSchema::from_attributes(vec![Attribute::new(name, DataType::Bool, nullability)])?;
    let output = Block::new(schema, Arc::clone(allocator), max_row_count)?;
    Ok(Box::new(BoundComparison {
        op,
        operand_type,
        lhs,
        rhs,
        output,
    }))
}
