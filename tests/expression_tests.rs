//! Contract tests for bound expressions and expression trees.
//!
//! These tests verify the evaluation contracts over a fixed five-row block:
//! - Attribute references, aliases, projections and compounds route columns
//! - referred_attribute_names is the transitive union over all children
//! - Evaluation preserves the input row count, including zero-row batches
//! - Null propagation is strict; a zero divisor yields NULL
//! - Skip-listed rows carry cleared null bits and raise no errors

use std::collections::BTreeSet;
use std::sync::Arc;

use supersonic::{
    expression::{bound_named_attribute, bound_projection},
    Allocator, Attribute, Block, BoundExpressionTree, BoundMultiSourceProjector, BoundedAllocator,
    ComparisonOp, DataType, ErrorCode, Expression, HeapAllocator, Nullability, TupleSchema, Value,
    View,
};

fn allocator() -> Arc<dyn Allocator> {
    HeapAllocator::new()
}

fn test_schema() -> TupleSchema {
    TupleSchema::from_attributes(vec![
        Attribute::new("col0", DataType::String, Nullability::Nullable),
        Attribute::new("col1", DataType::Int32, Nullability::Nullable),
        Attribute::new("col2", DataType::Double, Nullability::Nullable),
        Attribute::new("col3", DataType::Int32, Nullability::Nullable),
    ])
    .unwrap()
}

/// The five-row fixture block; `_` denotes NULL.
///
/// Row | col0 | col1 | col2 | col3
///  0  | "1"  | 12   | 5.1  | 22
///  1  | "2"  | 13   | 6.2  | 23
///  2  | "3"  | 14   | 7.3  | 23
///  3  | "4"  | _    | 8.4  | 24
///  4  | _    | 16   | _    | 26
fn test_block() -> Block {
    let mut block = Block::new(test_schema(), HeapAllocator::new(), 10).unwrap();
    let rows: Vec<Vec<Value>> = vec![
        vec![
            Value::from("1"),
            Value::Int32(12),
            Value::Double(5.1),
            Value::Int32(22),
        ],
        vec![
            Value::from("2"),
            Value::Int32(13),
            Value::Double(6.2),
            Value::Int32(23),
        ],
        vec![
            Value::from("3"),
            Value::Int32(14),
            Value::Double(7.3),
            Value::Int32(23),
        ],
        vec![
            Value::from("4"),
            Value::Null,
            Value::Double(8.4),
            Value::Int32(24),
        ],
        vec![
            Value::Null,
            Value::Int32(16),
            Value::Null,
            Value::Int32(26),
        ],
    ];
    for row in &rows {
        block.append_row(row).unwrap();
    }
    block
}

fn names(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(ToString::to_string).collect()
}

fn column_values(view: &View<'_>, column: usize) -> Vec<Value> {
    (0..view.row_count())
        .map(|row| view.column(column).value_at(row))
        .collect()
}

#[test]
fn test_attribute_at() {
    // S1: AttributeAt(2) projects col2 and refers to it by name.
    let block = test_block();
    let expression = Expression::attribute_at(2);
    let allocator = allocator();
    let mut tree =
        BoundExpressionTree::bind(&expression, block.schema(), &allocator, 10).unwrap();
    assert_eq!(tree.referred_attribute_names(), names(&["col2"]));

    let view = block.view();
    let result = tree.evaluate(&view).unwrap();
    assert_eq!(result.column_count(), 1);
    assert_eq!(
        column_values(&result, 0),
        vec![
            Value::Double(5.1),
            Value::Double(6.2),
            Value::Double(7.3),
            Value::Double(8.4),
            Value::Null,
        ]
    );
}

#[test]
fn test_named_attribute() {
    // S2: NamedAttribute("col3") projects col3.
    let block = test_block();
    let allocator = allocator();
    let mut tree = BoundExpressionTree::bind(
        &Expression::named("col3"),
        block.schema(),
        &allocator,
        10,
    )
    .unwrap();
    assert_eq!(tree.referred_attribute_names(), names(&["col3"]));

    let view = block.view();
    let result = tree.evaluate(&view).unwrap();
    assert_eq!(result.column_count(), 1);
    assert_eq!(
        column_values(&result, 0),
        vec![
            Value::Int32(22),
            Value::Int32(23),
            Value::Int32(23),
            Value::Int32(24),
            Value::Int32(26),
        ]
    );
}

#[test]
fn test_alias() {
    // S3: Alias renames the single output and keeps the values.
    let block = test_block();
    let expression = Expression::alias("Brand New Name", Expression::named("col3"));
    let allocator = allocator();
    let mut tree =
        BoundExpressionTree::bind(&expression, block.schema(), &allocator, 10).unwrap();
    assert_eq!(tree.referred_attribute_names(), names(&["col3"]));
    assert_eq!(
        tree.result_schema().attribute(0).name(),
        "Brand New Name"
    );

    let view = block.view();
    let result = tree.evaluate(&view).unwrap();
    assert_eq!(result.column_count(), 1);
    assert_eq!(result.column(0).value_at(1), Value::Int32(23));
}

#[test]
fn test_projection_with_duplication() {
    // S4: a multi-source projection may surface the same child repeatedly.
    let block = test_block();
    let schema = block.schema();

    let children = vec![
        bound_named_attribute(schema, "col0").unwrap(),
        bound_named_attribute(schema, "col1").unwrap(),
        bound_named_attribute(schema, "col2").unwrap(),
        bound_named_attribute(schema, "col3").unwrap(),
    ];
    let schemas: Vec<TupleSchema> = children
        .iter()
        .map(|child| child.result_schema().clone())
        .collect();
    let mut projector = BoundMultiSourceProjector::new(schemas);
    projector.add(3, 0);
    projector.add(0, 0);
    projector.add(1, 0);
    projector.add(3, 0);
    projector.add(1, 0);

    let mut projection = bound_projection(projector, children).unwrap();
    assert_eq!(
        projection.referred_attribute_names(),
        names(&["col0", "col1", "col2", "col3"])
    );
    assert_eq!(projection.result_schema().attribute_count(), 5);

    let view = block.view();
    let result = projection.evaluate(&view, None).unwrap();
    assert_eq!(result.column_count(), 5);
    let row2: Vec<Value> = (0..5).map(|c| result.column(c).value_at(2)).collect();
    assert_eq!(
        row2,
        vec![
            Value::Int32(23),
            Value::from("3"),
            Value::Int32(14),
            Value::Int32(23),
            Value::Int32(14),
        ]
    );
}

#[test]
fn test_partial_projection_refers_to_all_children() {
    // S5: children contribute their referred names even when the projector
    // never surfaces their outputs.
    let block = test_block();
    let expression = Expression::projection(
        vec![
            Expression::compound(vec![Expression::named("col0"), Expression::named("col1")]),
            Expression::compound(vec![Expression::named("col2"), Expression::named("col3")]),
        ],
        supersonic::MultiSourceProjector::new()
            .add(0, supersonic::SingleSourceProjector::attribute_at(1))
            .add(1, supersonic::SingleSourceProjector::attribute_at(0)),
    );
    let allocator = allocator();
    let mut tree =
        BoundExpressionTree::bind(&expression, block.schema(), &allocator, 10).unwrap();

    assert_eq!(
        tree.referred_attribute_names(),
        names(&["col0", "col1", "col2", "col3"])
    );
    assert_eq!(tree.result_schema().attribute_count(), 2);
    assert_eq!(tree.result_schema().attribute(0).name(), "col1");
    assert_eq!(tree.result_schema().attribute(1).name(), "col2");

    let view = block.view();
    let result = tree.evaluate(&view).unwrap();
    assert_eq!(result.column(0).value_at(0), Value::Int32(12));
    assert_eq!(result.column(1).value_at(0), Value::Double(5.1));
}

#[test]
fn test_compound_duplicate_rejected() {
    // S6: a compound producing the same name twice fails to bind.
    let block = test_block();
    let expression =
        Expression::compound(vec![Expression::named("col1"), Expression::named("col1")]);
    let allocator = allocator();
    let err = expression.bind(block.schema(), &allocator, 10).unwrap_err();
    assert_eq!(err.code(), ErrorCode::AttributeExists);
}

#[test]
fn test_rename_compound() {
    let block = test_block();
    let expression = Expression::rename_compound(
        ["left", "right"],
        vec![Expression::named("col1"), Expression::named("col3")],
    );
    let allocator = allocator();
    let mut tree =
        BoundExpressionTree::bind(&expression, block.schema(), &allocator, 10).unwrap();
    assert_eq!(tree.result_schema().attribute(0).name(), "left");
    assert_eq!(tree.result_schema().attribute(1).name(), "right");

    let view = block.view();
    let result = tree.evaluate(&view).unwrap();
    assert_eq!(result.column(1).value_at(4), Value::Int32(26));
}

#[test]
fn test_evaluation_preserves_row_count() {
    // Width preservation: output row count equals input row count for any
    // batch within capacity, including the empty batch.
    let block = test_block();
    let allocator = allocator();
    let mut tree = BoundExpressionTree::bind(
        &Expression::add(Expression::named("col1"), Expression::named("col3")),
        block.schema(),
        &allocator,
        10,
    )
    .unwrap();

    let view = block.view();
    for count in [0, 1, 3, 5] {
        let narrowed = view.subrange(0, count);
        let result = tree.evaluate(&narrowed).unwrap();
        assert_eq!(result.row_count(), count);
    }
}

#[test]
fn test_zero_row_result_matches_schema() {
    let block = test_block();
    let allocator = allocator();
    let mut tree = BoundExpressionTree::bind(
        &Expression::named("col0"),
        block.schema(),
        &allocator,
        10,
    )
    .unwrap();
    let view = block.view();
    let empty = view.subrange(0, 0);
    let result = tree.evaluate(&empty).unwrap();
    assert_eq!(result.row_count(), 0);
    assert_eq!(result.column_count(), 1);
    assert_eq!(result.schema().attribute(0).name(), "col0");
}

#[test]
#[should_panic(expected = "exceeds the tree's capacity")]
fn test_oversize_batch_is_a_contract_violation() {
    let block = test_block();
    let allocator = allocator();
    let mut tree = BoundExpressionTree::bind(
        &Expression::named("col0"),
        block.schema(),
        &allocator,
        2,
    )
    .unwrap();
    let view = block.view();
    let _ = tree.evaluate(&view);
}

#[test]
fn test_arithmetic_null_propagation() {
    // Strict null propagation: a NULL operand nulls the output row.
    let block = test_block();
    let allocator = allocator();
    let mut tree = BoundExpressionTree::bind(
        &Expression::add(Expression::named("col1"), Expression::named("col3")),
        block.schema(),
        &allocator,
        10,
    )
    .unwrap();

    let view = block.view();
    let result = tree.evaluate(&view).unwrap();
    assert_eq!(
        column_values(&result, 0),
        vec![
            Value::Int32(34),
            Value::Int32(36),
            Value::Int32(37),
            Value::Null,
            Value::Int32(42),
        ]
    );
}

#[test]
fn test_division_by_zero_yields_null() {
    let block = test_block();
    let allocator = allocator();
    let mut tree = BoundExpressionTree::bind(
        &Expression::divide(Expression::named("col1"), Expression::literal(0)),
        block.schema(),
        &allocator,
        10,
    )
    .unwrap();

    let view = block.view();
    let result = tree.evaluate(&view).unwrap();
    assert!(result.schema().attribute(0).is_nullable());
    assert!((0..5).all(|row| result.column(0).is_null(row)));
}

#[test]
fn test_division_values() {
    let block = test_block();
    let allocator = allocator();
    let mut tree = BoundExpressionTree::bind(
        &Expression::divide(Expression::named("col3"), Expression::literal(2)),
        block.schema(),
        &allocator,
        10,
    )
    .unwrap();

    let view = block.view();
    let result = tree.evaluate(&view).unwrap();
    assert_eq!(
        column_values(&result, 0),
        vec![
            Value::Int32(11),
            Value::Int32(11),
            Value::Int32(11),
            Value::Int32(12),
            Value::Int32(13),
        ]
    );
}

#[test]
fn test_arithmetic_type_mismatch_rejected() {
    // No implicit coercion: INT32 + DOUBLE fails at bind time.
    let block = test_block();
    let allocator = allocator();
    let err = Expression::add(Expression::named("col1"), Expression::named("col2"))
        .bind(block.schema(), &allocator, 10)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::TypeMismatch);
}

#[test]
fn test_comparison() {
    let block = test_block();
    let allocator = allocator();
    let mut tree = BoundExpressionTree::bind(
        &Expression::comparison(
            ComparisonOp::Lt,
            Expression::named("col1"),
            Expression::named("col3"),
        ),
        block.schema(),
        &allocator,
        10,
    )
    .unwrap();

    let view = block.view();
    let result = tree.evaluate(&view).unwrap();
    assert_eq!(result.schema().attribute(0).data_type(), DataType::Bool);
    assert_eq!(
        column_values(&result, 0),
        vec![
            Value::Bool(true),
            Value::Bool(true),
            Value::Bool(true),
            Value::Null,
            Value::Bool(true),
        ]
    );
}

#[test]
fn test_string_comparison() {
    let block = test_block();
    let allocator = allocator();
    let mut tree = BoundExpressionTree::bind(
        &Expression::comparison(
            ComparisonOp::Eq,
            Expression::named("col0"),
            Expression::literal("2"),
        ),
        block.schema(),
        &allocator,
        10,
    )
    .unwrap();

    let view = block.view();
    let result = tree.evaluate(&view).unwrap();
    assert_eq!(
        column_values(&result, 0),
        vec![
            Value::Bool(false),
            Value::Bool(true),
            Value::Bool(false),
            Value::Bool(false),
            Value::Null,
        ]
    );
}

#[test]
fn test_is_null() {
    let block = test_block();
    let allocator = allocator();
    let mut tree = BoundExpressionTree::bind(
        &Expression::is_null(Expression::named("col1")),
        block.schema(),
        &allocator,
        10,
    )
    .unwrap();
    assert!(!tree.result_schema().attribute(0).is_nullable());

    let view = block.view();
    let result = tree.evaluate(&view).unwrap();
    assert_eq!(
        column_values(&result, 0),
        vec![
            Value::Bool(false),
            Value::Bool(false),
            Value::Bool(false),
            Value::Bool(true),
            Value::Bool(false),
        ]
    );
}

#[test]
fn test_literal_column() {
    let block = test_block();
    let allocator = allocator();
    let mut tree = BoundExpressionTree::bind(
        &Expression::literal(7),
        block.schema(),
        &allocator,
        10,
    )
    .unwrap();
    assert!(tree.referred_attribute_names().is_empty());

    let view = block.view();
    let result = tree.evaluate(&view).unwrap();
    assert_eq!(result.row_count(), 5);
    assert!((0..5).all(|row| result.column(0).value_at(row) == Value::Int32(7)));
}

#[test]
fn test_skip_vector_clears_nulls_and_raises_no_errors() {
    // Skip-listed rows: null bits cleared, values unspecified, no errors
    // even for a zero divisor.
    let block = test_block();
    let allocator = allocator();
    let mut bound = Expression::divide(Expression::named("col1"), Expression::literal(0))
        .bind(block.schema(), &allocator, 10)
        .unwrap();

    let mut skip = supersonic::Bitmap::new(5);
    skip.set(0);
    skip.set(2);

    let view = block.view();
    let result = bound.evaluate(&view, Some(&skip)).unwrap();
    assert!(!result.column(0).is_null(0));
    assert!(result.column(0).is_null(1));
    assert!(!result.column(0).is_null(2));
    assert!(result.column(0).is_null(3));
    assert!(result.column(0).is_null(4));
}

#[test]
fn test_referred_names_closure_over_composites() {
    // The referred set is the union over a child-walk to leaf references,
    // and every referred name resolves in the schema the expression bound
    // against.
    let block = test_block();
    let expression = Expression::alias(
        "sum_lt",
        Expression::comparison(
            ComparisonOp::Lte,
            Expression::add(Expression::named("col1"), Expression::named("col3")),
            Expression::named("col3"),
        ),
    );
    let allocator = allocator();
    let tree =
        BoundExpressionTree::bind(&expression, block.schema(), &allocator, 10).unwrap();
    let referred = tree.referred_attribute_names();
    assert_eq!(referred, names(&["col1", "col3"]));
    for name in &referred {
        assert!(block.schema().lookup_position(name).is_some());
    }
}

#[test]
fn test_tree_arena_is_reused_across_evaluations() {
    // Across calls the tree holds no state except the overwritten arena.
    let block = test_block();
    let allocator = allocator();
    let mut tree = BoundExpressionTree::bind(
        &Expression::named("col3"),
        block.schema(),
        &allocator,
        10,
    )
    .unwrap();

    let view = block.view();
    {
        let first = tree.evaluate(&view.subrange(0, 2)).unwrap();
        assert_eq!(first.row_count(), 2);
    }
    let second = tree.evaluate(&view.subrange(2, 3)).unwrap();
    assert_eq!(second.row_count(), 3);
    assert_eq!(second.column(0).value_at(0), Value::Int32(23));
    assert_eq!(second.column(0).value_at(2), Value::Int32(26));
}

#[test]
fn test_bounded_allocator_fails_bind() {
    // Resource errors surface through the error channel, never an abort.
    let block = test_block();
    let bounded: Arc<dyn Allocator> = BoundedAllocator::new(16);
    let err = Expression::add(Expression::named("col1"), Expression::named("col3"))
        .bind(block.schema(), &bounded, 1024)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::MemoryExceeded);
}

#[test]
fn test_bind_error_names_the_expression() {
    let block = test_block();
    let allocator = allocator();
    let err = Expression::add(Expression::named("col1"), Expression::named("missing"))
        .bind(block.schema(), &allocator, 10)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::AttributeMissing);
    assert!(
        err.message().contains("(col1 + missing)"),
        "message should include the enclosing expression: {}",
        err.message()
    );
}
