//! Contract tests for single- and multi-source projectors.
//!
//! These tests verify the binding contracts:
//! - Bound projections preserve type and nullability, renaming only
//! - Missing names, out-of-range positions and duplicate result names are
//!   rejected with the documented error codes
//! - The reverse index of a multi-source projector is consistent
//! - Decomposition is observationally equivalent to direct projection

use supersonic::{
    Attribute, Block, BoundMultiSourceProjector, DataType, ErrorCode, HeapAllocator, Nullability,
    SingleSourceProjector, TupleSchema, Value, View,
};

/// Creates a two-column schema: a0 INT64 NOT_NULLABLE, a1 STRING NULLABLE.
fn schema_a() -> TupleSchema {
    TupleSchema::from_attributes(vec![
        Attribute::new("a0", DataType::Int64, Nullability::NotNullable),
        Attribute::new("a1", DataType::String, Nullability::Nullable),
    ])
    .unwrap()
}

/// Creates a two-column schema: b0 INT32 NULLABLE, b1 DOUBLE NULLABLE.
fn schema_b() -> TupleSchema {
    TupleSchema::from_attributes(vec![
        Attribute::new("b0", DataType::Int32, Nullability::Nullable),
        Attribute::new("b1", DataType::Double, Nullability::Nullable),
    ])
    .unwrap()
}

fn block_a() -> Block {
    let mut block = Block::new(schema_a(), HeapAllocator::new(), 4).unwrap();
    block
        .append_row(&[Value::Int64(1), Value::from("x")])
        .unwrap();
    block.append_row(&[Value::Int64(2), Value::Null]).unwrap();
    block
        .append_row(&[Value::Int64(3), Value::from("z")])
        .unwrap();
    block
}

fn block_b() -> Block {
    let mut block = Block::new(schema_b(), HeapAllocator::new(), 4).unwrap();
    block
        .append_row(&[Value::Int32(10), Value::Double(0.5)])
        .unwrap();
    block.append_row(&[Value::Null, Value::Double(1.5)]).unwrap();
    block
        .append_row(&[Value::Int32(30), Value::Double(2.5)])
        .unwrap();
    block
}

fn assert_views_equal(left: &View<'_>, right: &View<'_>) {
    assert_eq!(left.row_count(), right.row_count());
    assert_eq!(left.column_count(), right.column_count());
    for column in 0..left.column_count() {
        for row in 0..left.row_count() {
            assert_eq!(
                left.column(column).value_at(row),
                right.column(column).value_at(row),
                "value mismatch at column {column}, row {row}"
            );
        }
    }
}

#[test]
fn test_bound_projection_preserves_type_and_nullability() {
    // Contract: result attributes equal source attributes up to the name.
    let schema = schema_a();
    let bound = SingleSourceProjector::renamed(
        ["renamed0", "renamed1"],
        SingleSourceProjector::all_attributes(),
    )
    .bind(&schema)
    .unwrap();

    for i in 0..bound.result_schema().attribute_count() {
        let source = schema.attribute(bound.source_attribute_position(i));
        let result = bound.result_schema().attribute(i);
        assert_eq!(source.data_type(), result.data_type());
        assert_eq!(source.nullability(), result.nullability());
    }
    assert_eq!(bound.result_schema().attribute(0).name(), "renamed0");
    assert_eq!(bound.result_schema().attribute(1).name(), "renamed1");
}

#[test]
fn test_named_attribute_missing_rejected() {
    // Contract: resolving an absent name fails with ATTRIBUTE_MISSING.
    let err = SingleSourceProjector::named_attribute("nope")
        .bind(&schema_a())
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::AttributeMissing);
    assert!(err.message().contains("nope"), "message: {}", err.message());
}

#[test]
fn test_positioned_attribute_boundary() {
    // Contract: AttributeAt(i) binds iff i < schema width, otherwise
    // ATTRIBUTE_COUNT_MISMATCH.
    let schema = schema_a();
    assert!(SingleSourceProjector::attribute_at(1).bind(&schema).is_ok());
    let err = SingleSourceProjector::attribute_at(2)
        .bind(&schema)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::AttributeCountMismatch);
}

#[test]
fn test_compound_duplicate_name_rejected() {
    // Contract: two children producing the same result name fail with
    // ATTRIBUTE_EXISTS.
    let err = SingleSourceProjector::named_attributes(["a1", "a1"])
        .bind(&schema_a())
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::AttributeExists);
}

#[test]
fn test_renaming_count_mismatch_rejected() {
    let err = SingleSourceProjector::renamed(["only_one"], SingleSourceProjector::all_attributes())
        .bind(&schema_a())
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::AttributeCountMismatch);
}

#[test]
#[should_panic(expected = "isn't unique")]
fn test_duplicate_aliases_are_a_contract_violation() {
    let _ = SingleSourceProjector::renamed(
        ["same", "same"],
        SingleSourceProjector::all_attributes(),
    );
}

#[test]
fn test_all_attributes_is_identity() {
    // Contract: AllAttributes with no prefix binds to an identity projector.
    let schema = schema_a();
    let bound = SingleSourceProjector::all_attributes()
        .bind(&schema)
        .unwrap();
    assert_eq!(bound.result_schema(), &schema);
    for i in 0..schema.attribute_count() {
        assert_eq!(bound.source_attribute_position(i), i);
    }
}

#[test]
fn test_all_attributes_prefixed() {
    let bound = SingleSourceProjector::all_attributes_prefixed("left.")
        .bind(&schema_a())
        .unwrap();
    assert_eq!(bound.result_schema().attribute(0).name(), "left.a0");
    assert_eq!(bound.result_schema().attribute(1).name(), "left.a1");
}

#[test]
fn test_binding_is_deterministic() {
    // Contract: re-binding the same projector against the same schema
    // yields an equal bound projector.
    let projector = SingleSourceProjector::named_attributes(["a1", "a0"]);
    let first = projector.bind(&schema_a()).unwrap();
    let second = projector.bind(&schema_a()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_project_view_routes_columns() {
    let block = block_a();
    let bound = SingleSourceProjector::named_attributes(["a1", "a0"])
        .bind(block.schema())
        .unwrap();
    let view = block.view();
    let projected = bound.project_view(&view);

    assert_eq!(projected.row_count(), 3);
    assert_eq!(projected.column(0).value_at(0), Value::from("x"));
    assert_eq!(projected.column(0).value_at(1), Value::Null);
    assert_eq!(projected.column(1).i64_values(), &[1, 2, 3]);
}

#[test]
fn test_reverse_index_consistency() {
    // Contract: IsAttributeProjected, NumberOfProjectionsForAttribute and
    // ProjectedAttributePositions agree for every source attribute.
    let mut projector = BoundMultiSourceProjector::new(vec![schema_a(), schema_b()]);
    projector.add(0, 1);
    projector.add(1, 0);
    projector.add(0, 1);

    for (source, position) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
        let positions: Vec<usize> = projector
            .projected_attribute_positions(source, position)
            .collect();
        let count = projector.number_of_projections_for_attribute(source, position);
        assert_eq!(projector.is_attribute_projected(source, position), count > 0);
        assert_eq!(positions.len(), count);
    }

    // (0, 1) was projected twice, in insertion order.
    let positions: Vec<usize> = projector.projected_attribute_positions(0, 1).collect();
    assert_eq!(positions, vec![0, 2]);
    assert_eq!(projector.number_of_projections_for_attribute(0, 0), 0);
    assert!(!projector.is_attribute_projected(1, 1));
}

#[test]
fn test_add_as_rejects_duplicate_names() {
    let mut projector = BoundMultiSourceProjector::new(vec![schema_a()]);
    assert!(projector.add_as(0, 0, Some("out")));
    assert!(!projector.add_as(0, 1, Some("out")));
    assert_eq!(projector.result_schema().attribute_count(), 1);
}

#[test]
fn test_raw_add_permits_repeated_projections() {
    // The raw add path accepts the same source attribute several times.
    let mut projector = BoundMultiSourceProjector::new(vec![schema_a()]);
    projector.add(0, 0);
    projector.add(0, 0);
    assert_eq!(projector.result_schema().attribute_count(), 2);
    assert_eq!(projector.source_attribute_position(0), 0);
    assert_eq!(projector.source_attribute_position(1), 0);
}

#[test]
fn test_single_source_slice_preserves_names_and_order() {
    let mut projector = BoundMultiSourceProjector::new(vec![schema_a(), schema_b()]);
    assert!(projector.add_as(0, 1, Some("first")));
    assert!(projector.add_as(1, 0, Some("middle")));
    assert!(projector.add_as(0, 0, Some("last")));

    let slice = projector.single_source_projector(0);
    assert_eq!(slice.result_schema().attribute_count(), 2);
    assert_eq!(slice.result_schema().attribute(0).name(), "first");
    assert_eq!(slice.result_schema().attribute(1).name(), "last");
    assert_eq!(slice.source_attribute_position(0), 1);
    assert_eq!(slice.source_attribute_position(1), 0);
}

#[test]
fn test_decompose_nth_dedups_and_rewrites() {
    let mut projector = BoundMultiSourceProjector::new(vec![schema_a(), schema_b()]);
    projector.add(0, 1);
    projector.add(1, 0);
    projector.add(0, 1);
    projector.add(0, 0);

    let (outer, inner) = projector.decompose_nth(0);

    // Inner selects each projected position of source 0 once, in
    // first-appearance order.
    assert_eq!(inner.result_schema().attribute_count(), 2);
    assert_eq!(inner.source_attribute_position(0), 1);
    assert_eq!(inner.source_attribute_position(1), 0);

    // Outer keeps the original result schema and points into inner space.
    assert_eq!(outer.result_schema(), projector.result_schema());
    assert_eq!(outer.source_schema(0), inner.result_schema());
    assert_eq!(outer.source_index(0), 0);
    assert_eq!(outer.source_attribute_position(0), 0);
    assert_eq!(outer.source_index(1), 1);
    assert_eq!(outer.source_attribute_position(1), 0);
    assert_eq!(outer.source_attribute_position(2), 0);
    assert_eq!(outer.source_attribute_position(3), 1);
}

#[test]
fn test_decompose_nth_is_observationally_equivalent() {
    // Contract: applying the projector equals applying the inner projector
    // to the decomposed source and then the outer projector.
    let block_a = block_a();
    let block_b = block_b();
    let mut projector =
        BoundMultiSourceProjector::new(vec![block_a.schema().clone(), block_b.schema().clone()]);
    projector.add(0, 1);
    projector.add(1, 1);
    projector.add(0, 1);
    projector.add(0, 0);
    projector.add(1, 0);

    let (outer, inner) = projector.decompose_nth(0);

    let views = [block_a.view(), block_b.view()];
    let direct = projector.project_views(&views);

    let intermediate = inner.project_view(&views[0]);
    let substituted = [intermediate, views[1].clone()];
    let composed = outer.project_views(&substituted);

    assert_views_equal(&direct, &composed);
}

#[test]
fn test_multi_source_bind_appends_in_order() {
    let projector = supersonic::MultiSourceProjector::new()
        .add(1, SingleSourceProjector::named_attribute("b1"))
        .add(0, SingleSourceProjector::all_attributes());
    let bound = projector.bind(&[schema_a(), schema_b()]).unwrap();

    let names: Vec<&str> = bound
        .result_schema()
        .attributes()
        .iter()
        .map(Attribute::name)
        .collect();
    assert_eq!(names, vec!["b1", "a0", "a1"]);
    assert_eq!(bound.source_index(0), 1);
    assert_eq!(bound.source_index(1), 0);
}

#[test]
fn test_multi_source_bind_duplicate_rejected() {
    let projector = supersonic::MultiSourceProjector::new()
        .add(0, SingleSourceProjector::named_attribute("a0"))
        .add(0, SingleSourceProjector::named_attribute("a0"));
    let err = projector.bind(&[schema_a()]).unwrap_err();
    assert_eq!(err.code(), ErrorCode::AttributeExists);
}

#[test]
fn test_multi_source_bind_bad_source_index() {
    let projector = supersonic::MultiSourceProjector::new()
        .add(2, SingleSourceProjector::all_attributes());
    let err = projector.bind(&[schema_a(), schema_b()]).unwrap_err();
    assert_eq!(err.code(), ErrorCode::AttributeCountMismatch);
}

#[test]
fn test_bind_error_is_self_locating() {
    // Contract: failures carry the rendering of the failing spec.
    let projector = SingleSourceProjector::named_attributes(["a0", "missing"]);
    let err = projector.bind(&schema_a()).unwrap_err();
    assert!(
        err.message().contains("missing"),
        "message should name the failing spec: {}",
        err.message()
    );
    assert!(
        err.message().contains("a0"),
        "message should include the enclosing compound: {}",
        err.message()
    );
}
