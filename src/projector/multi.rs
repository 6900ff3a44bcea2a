//! Multi-source projectors: mappings from several input schemas to one
//! result schema, with a reverse index used by operators to route columns.

use std::collections::HashMap;
use std::fmt;

use crate::block::View;
use crate::error::{Error, ErrorCode, Result};
use crate::projector::single::{BoundSingleSourceProjector, SingleSourceProjector};
use crate::schema::TupleSchema;

/// Identifies one input column of a multi-source projector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceAttribute {
    /// Index of the source schema.
    pub source_index: usize,
    /// Attribute position within that schema.
    pub position: usize,
}

impl SourceAttribute {
    /// Creates a source attribute reference.
    #[must_use]
    pub fn new(source_index: usize, position: usize) -> Self {
        SourceAttribute {
            source_index,
            position,
        }
    }
}

/// Logical description of a projection over several sources: an ordered list
/// of (source index, single-source projector) pairs.
#[derive(Debug, Clone, Default)]
pub struct MultiSourceProjector {
    children: Vec<(usize, SingleSourceProjector)>,
}

impl MultiSourceProjector {
    /// Creates an empty projector.
    #[must_use]
    pub fn new() -> Self {
        MultiSourceProjector::default()
    }

    /// Appends a child projector resolving against source `source_index`.
    #[must_use]
    pub fn add(mut self, source_index: usize, projector: SingleSourceProjector) -> Self {
        self.children.push((source_index, projector));
        self
    }

    /// Resolves this projector against concrete source schemas, iterating
    /// the pairs in order and appending each child's produced attributes.
    ///
    /// # Errors
    ///
    /// Returns `ATTRIBUTE_COUNT_MISMATCH` if a pair names a source index out
    /// of range, `ATTRIBUTE_EXISTS` on a duplicate result name, or any child
    /// bind failure.
    pub fn bind(&self, source_schemas: &[TupleSchema]) -> Result<BoundMultiSourceProjector> {
        self.bind_internal(source_schemas)
            .map_err(|e| e.with_context(&self.to_string()))
    }

    fn bind_internal(&self, source_schemas: &[TupleSchema]) -> Result<BoundMultiSourceProjector> {
        let mut projector = BoundMultiSourceProjector::new(source_schemas.to_vec());
        for (source_index, child) in &self.children {
            if *source_index >= source_schemas.len() {
                return Err(Error::new(
                    ErrorCode::AttributeCountMismatch,
                    format!(
                        "source index {source_index} out of range ({} sources)",
                        source_schemas.len()
                    ),
                ));
            }
            let component = child.bind(&source_schemas[*source_index])?;
            for j in 0..component.result_schema().attribute_count() {
                let name = component.result_schema().attribute(j).name();
                if !projector.add_as(
                    *source_index,
                    component.source_attribute_position(j),
                    Some(name),
                ) {
                    return Err(Error::new(
                        ErrorCode::AttributeExists,
                        format!(
                            "duplicate attribute name \"{name}\" in result schema: {}",
                            projector.result_schema()
                        ),
                    ));
                }
            }
        }
        Ok(projector)
    }
}

impl fmt::Display for MultiSourceProjector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (source_index, child)) in self.children.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{source_index}: {child}")?;
        }
        Ok(())
    }
}

/// A multi-source projector resolved against concrete schemas.
///
/// Owns the source schemas, the result schema, the projection map, and a
/// reverse multimap from source attributes to result positions (in insertion
/// order). An attribute may be projected zero, one, or many times.
#[derive(Debug, Clone)]
pub struct BoundMultiSourceProjector {
    source_schemas: Vec<TupleSchema>,
    result_schema: TupleSchema,
    projection: Vec<SourceAttribute>,
    reverse: HashMap<SourceAttribute, Vec<usize>>,
}

impl BoundMultiSourceProjector {
    /// Creates an empty projector over `source_schemas`.
    #[must_use]
    pub fn new(source_schemas: Vec<TupleSchema>) -> Self {
        BoundMultiSourceProjector {
            source_schemas,
            result_schema: TupleSchema::new(),
            projection: Vec::new(),
            reverse: HashMap::new(),
        }
    }

    /// Appends one output attribute under the source attribute's own name.
    ///
    /// This raw path accepts repeated projections of the same attribute, and
    /// hence repeated result names; operators that need unique names go
    /// through [`BoundMultiSourceProjector::add_as`] or a rename.
    ///
    /// # Panics
    ///
    /// Panics if `source_index` or `position` is out of range.
    pub fn add(&mut self, source_index: usize, position: usize) {
        let name = self.source_schemas[source_index]
            .attribute(position)
            .name()
            .to_string();
        self.push_projection(source_index, position, &name);
    }

    /// Appends one output attribute under `alias` (or the source name when
    /// `alias` is `None`). Returns false on a duplicate result name.
    ///
    /// # Panics
    ///
    /// Panics if `source_index` or `position` is out of range.
    pub fn add_as(&mut self, source_index: usize, position: usize, alias: Option<&str>) -> bool {
        assert!(source_index < self.source_count());
        let source_attribute = self.source_schemas[source_index].attribute(position);
        let name = alias.unwrap_or_else(|| source_attribute.name()).to_string();
        let attribute = source_attribute.renamed(&name);
        if !self.result_schema.add_attribute(attribute) {
            return false;
        }
        let projected = SourceAttribute::new(source_index, position);
        self.reverse
            .entry(projected)
            .or_default()
            .push(self.projection.len());
        self.projection.push(projected);
        true
    }

    /// Raw append with an explicit result name and no duplicate check.
    pub(crate) fn push_projection(&mut self, source_index: usize, position: usize, alias: &str) {
        assert!(source_index < self.source_count());
        let attribute = self.source_schemas[source_index]
            .attribute(position)
            .renamed(alias);
        self.result_schema.add_attribute_allow_duplicates(attribute);
        let projected = SourceAttribute::new(source_index, position);
        self.reverse
            .entry(projected)
            .or_default()
            .push(self.projection.len());
        self.projection.push(projected);
    }

    /// Returns the number of sources.
    #[must_use]
    pub fn source_count(&self) -> usize {
        self.source_schemas.len()
    }

    /// Returns the schema of source `source_index`.
    #[must_use]
    pub fn source_schema(&self, source_index: usize) -> &TupleSchema {
        &self.source_schemas[source_index]
    }

    /// Returns the result schema.
    #[must_use]
    pub fn result_schema(&self) -> &TupleSchema {
        &self.result_schema
    }

    /// Returns the source index feeding result attribute `result_position`.
    #[must_use]
    pub fn source_index(&self, result_position: usize) -> usize {
        self.projection[result_position].source_index
    }

    /// Returns the source position feeding result attribute
    /// `result_position`.
    #[must_use]
    pub fn source_attribute_position(&self, result_position: usize) -> usize {
        self.projection[result_position].position
    }

    /// Returns the result positions fed by `(source_index, position)`, in
    /// the order those projections were appended.
    pub fn projected_attribute_positions(
        &self,
        source_index: usize,
        position: usize,
    ) -> impl Iterator<Item = usize> + '_ {
        self.reverse
            .get(&SourceAttribute::new(source_index, position))
            .map_or(&[] as &[usize], Vec::as_slice)
            .iter()
            .copied()
    }

    /// Returns whether `(source_index, position)` feeds any result
    /// attribute.
    #[must_use]
    pub fn is_attribute_projected(&self, source_index: usize, position: usize) -> bool {
        self.reverse
            .contains_key(&SourceAttribute::new(source_index, position))
    }

    /// Returns how many result attributes `(source_index, position)` feeds.
    #[must_use]
    pub fn number_of_projections_for_attribute(
        &self,
        source_index: usize,
        position: usize,
    ) -> usize {
        self.reverse
            .get(&SourceAttribute::new(source_index, position))
            .map_or(0, Vec::len)
    }

    /// Returns the slice of this projector's outputs that come from
    /// `source_index`, as a single-source projector preserving result names
    /// and order.
    #[must_use]
    pub fn single_source_projector(&self, source_index: usize) -> BoundSingleSourceProjector {
        let mut result =
            BoundSingleSourceProjector::new(self.source_schemas[source_index].clone());
        for i in 0..self.result_schema.attribute_count() {
            if self.source_index(i) == source_index {
                result.push_projection(
                    self.source_attribute_position(i),
                    self.result_schema.attribute(i).name(),
                );
            }
        }
        result
    }

    /// Factors the projection on `source_index` into an inner single-source
    /// projector and an outer multi-source projector.
    ///
    /// The inner projector selects each projected position of that source
    /// once, in first-appearance order. The outer projector keeps the result
    /// schema of `self`, passes entries for other sources through unchanged,
    /// and rewrites entries for `source_index` to index into the inner
    /// result schema (which it also carries as its `source_index`-th source
    /// schema). Applying inner then outer is observationally equivalent to
    /// applying `self`.
    ///
    /// # Panics
    ///
    /// Panics if `source_index` is out of range.
    #[must_use]
    pub fn decompose_nth(
        &self,
        source_index: usize,
    ) -> (BoundMultiSourceProjector, BoundSingleSourceProjector) {
        assert!(source_index < self.source_count());
        let mut inner =
            BoundSingleSourceProjector::new(self.source_schemas[source_index].clone());
        let mut uniqualizer: HashMap<usize, usize> = HashMap::new();
        for i in 0..self.result_schema.attribute_count() {
            if self.source_index(i) == source_index {
                let position = self.source_attribute_position(i);
                if !uniqualizer.contains_key(&position) {
                    uniqualizer.insert(position, inner.result_schema().attribute_count());
                    let name = self.source_schemas[source_index]
                        .attribute(position)
                        .name()
                        .to_string();
                    inner.push_projection(position, &name);
                }
            }
        }

        let mut schemas = self.source_schemas.clone();
        schemas[source_index] = inner.result_schema().clone();
        let mut outer = BoundMultiSourceProjector::new(schemas);
        for i in 0..self.result_schema.attribute_count() {
            let alias = self.result_schema.attribute(i).name().to_string();
            let position = self.source_attribute_position(i);
            if self.source_index(i) == source_index {
                outer.push_projection(source_index, uniqualizer[&position], &alias);
            } else {
                outer.push_projection(self.source_index(i), position, &alias);
            }
        }
        (outer, inner)
    }

    /// Routes the projected columns out of `sources`, one view per source
    /// schema, all with the same row count. Pure column routing.
    #[must_use]
    pub fn project_views<'a>(&'a self, sources: &[View<'a>]) -> View<'a> {
        assert_eq!(sources.len(), self.source_count());
        let row_count = sources.first().map_or(0, View::row_count);
        debug_assert!(sources.iter().all(|view| view.row_count() == row_count));
        let columns = self
            .projection
            .iter()
            .enumerate()
            .map(|(i, projected)| {
                sources[projected.source_index]
                    .column(projected.position)
                    .with_attribute(self.result_schema.attribute(i))
            })
            .collect();
        View::new(&self.result_schema, columns, row_count)
    }
}
