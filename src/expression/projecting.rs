//! Projecting expression kinds: attribute references, aliases, projections
//! and compounds. These route columns between views and never copy data.

use std::collections::BTreeSet;

use crate::bitmap::Bitmap;
use crate::block::View;
use crate::error::{Error, ErrorCode, Result};
use crate::expression::BoundExpression;
use crate::projector::{BoundMultiSourceProjector, SingleSourceProjector};
use crate::schema::TupleSchema;

/// A bound single-source projection: attribute references and their
/// compounds reduce to this.
#[derive(Debug)]
struct BoundProjecting {
    projector: crate::projector::BoundSingleSourceProjector,
    referred: BTreeSet<String>,
}

impl BoundExpression for BoundProjecting {
    fn result_schema(&self) -> &TupleSchema {
        self.projector.result_schema()
    }

    fn collect_referred_attribute_names(&self, names: &mut BTreeSet<String>) {
        names.extend(self.referred.iter().cloned());
    }

    fn evaluate<'a>(
        &'a mut self,
        input: &View<'a>,
        _skip: Option<&'a Bitmap>,
    ) -> Result<View<'a>> {
        let this: &'a Self = self;
        Ok(this.projector.project_view(input))
    }
}

fn from_single_projector(
    projector: SingleSourceProjector,
    schema: &TupleSchema,
) -> Result<Box<dyn BoundExpression>> {
    let bound = projector.bind(schema)?;
    let referred = (0..bound.result_schema().attribute_count())
        .map(|i| {
            schema
                .attribute(bound.source_attribute_position(i))
                .name()
                .to_string()
        })
        .collect();
    Ok(Box::new(BoundProjecting {
        projector: bound,
        referred,
    }))
}

/// Binds a reference to the attribute at `position`.
///
/// # Errors
///
/// Returns `ATTRIBUTE_COUNT_MISMATCH` if `position` is out of range.
pub fn bound_attribute_at(
    schema: &TupleSchema,
    position: usize,
) -> Result<Box<dyn BoundExpression>> {
    from_single_projector(SingleSourceProjector::attribute_at(position), schema)
}

/// Binds a reference to the attribute named `name`.
///
/// # Errors
///
/// Returns `ATTRIBUTE_MISSING` if no such attribute exists.
pub fn bound_named_attribute(
    schema: &TupleSchema,
    name: &str,
) -> Result<Box<dyn BoundExpression>> {
    from_single_projector(SingleSourceProjector::named_attribute(name), schema)
}

/// Renames the outputs of a child expression; covers both single-attribute
/// aliases and rename-compounds.
#[derive(Debug)]
struct BoundRename {
    child: Box<dyn BoundExpression>,
    result_schema: TupleSchema,
}

impl BoundExpression for BoundRename {
    fn result_schema(&self) -> &TupleSchema {
        &self.result_schema
    }

    fn collect_referred_attribute_names(&self, names: &mut BTreeSet<String>) {
        self.child.collect_referred_attribute_names(names);
    }

    fn evaluate<'a>(
        &'a mut self,
        input: &View<'a>,
        skip: Option<&'a Bitmap>,
    ) -> Result<View<'a>> {
        let schema: &'a TupleSchema = &self.result_schema;
        let view = self.child.evaluate(input, skip)?;
        let columns = (0..view.column_count())
            .map(|i| view.column(i).with_attribute(schema.attribute(i)))
            .collect();
        Ok(View::new(schema, columns, view.row_count()))
    }
}

fn renamed_schema(child_schema: &TupleSchema, aliases: &[String]) -> Result<TupleSchema> {
    if aliases.len() != child_schema.attribute_count() {
        return Err(Error::new(
            ErrorCode::AttributeCountMismatch,
            format!(
                "number of aliases ({}) does not match the attribute count \
                 in source schema ({}): {child_schema}",
                aliases.len(),
                child_schema.attribute_count()
            ),
        ));
    }
    let attributes = child_schema
        .attributes()
        .iter()
        .zip(aliases)
        .map(|(attribute, alias)| attribute.renamed(alias))
        .collect();
    TupleSchema::from_attributes(attributes)
}

/// Renames the single output attribute of `child` to `alias`.
///
/// # Errors
///
/// Returns `ATTRIBUTE_COUNT_MISMATCH` if the child produces more than one
/// attribute.
pub fn bound_alias(
    alias: &str,
    child: Box<dyn BoundExpression>,
) -> Result<Box<dyn BoundExpression>> {
    let result_schema = renamed_schema(child.result_schema(), &[alias.to_string()])?;
    Ok(Box::new(BoundRename {
        child,
        result_schema,
    }))
}

/// Concatenation of child outputs, without reprojecting.
#[derive(Debug)]
struct BoundCompound {
    children: Vec<Box<dyn BoundExpression>>,
    result_schema: TupleSchema,
}

impl BoundExpression for BoundCompound {
    fn result_schema(&self) -> &TupleSchema {
        &self.result_schema
    }

    fn collect_referred_attribute_names(&self, names: &mut BTreeSet<String>) {
        for child in &self.children {
            child.collect_referred_attribute_names(names);
        }
    }

    fn evaluate<'a>(
        &'a mut self,
        input: &View<'a>,
        skip: Option<&'a Bitmap>,
    ) -> Result<View<'a>> {
        let schema: &'a TupleSchema = &self.result_schema;
        let mut columns = Vec::with_capacity(schema.attribute_count());
        let mut next = 0;
        for child in self.children.iter_mut() {
            let view = child.evaluate(input, skip)?;
            for i in 0..view.column_count() {
                columns.push(view.column(i).with_attribute(schema.attribute(next)));
                next += 1;
            }
        }
        Ok(View::new(schema, columns, input.row_count()))
    }
}

/// Concatenates the outputs of `children` into one row of columns.
///
/// # Errors
///
/// Returns `ATTRIBUTE_EXISTS` if two children produce the same output name.
pub fn bound_compound(
    children: Vec<Box<dyn BoundExpression>>,
) -> Result<Box<dyn BoundExpression>> {
    let mut result_schema = TupleSchema::new();
    for child in &children {
        for attribute in child.result_schema().attributes() {
            if !result_schema.add_attribute(attribute.clone()) {
                return Err(Error::new(
                    ErrorCode::AttributeExists,
                    format!(
                        "duplicate attribute name \"{}\" in result schema: {result_schema}",
                        attribute.name()
                    ),
                ));
            }
        }
    }
    Ok(Box::new(BoundCompound {
        children,
        result_schema,
    }))
}

/// Concatenates the outputs of `children`, then renames them to `aliases`.
///
/// # Errors
///
/// Returns `ATTRIBUTE_EXISTS` on duplicate child output names, or
/// `ATTRIBUTE_COUNT_MISMATCH` if the alias count does not match.
pub fn bound_rename_compound(
    aliases: &[String],
    children: Vec<Box<dyn BoundExpression>>,
) -> Result<Box<dyn BoundExpression>> {
    let compound = bound_compound(children)?;
    let result_schema = renamed_schema(compound.result_schema(), aliases)?;
    Ok(Box::new(BoundRename {
        child: compound,
        result_schema,
    }))
}

/// Child outputs gated through a bound multi-source projector.
#[derive(Debug)]
struct BoundProjection {
    projector: BoundMultiSourceProjector,
    children: Vec<Box<dyn BoundExpression>>,
}

impl BoundExpression for BoundProjection {
    fn result_schema(&self) -> &TupleSchema {
        self.projector.result_schema()
    }

    fn collect_referred_attribute_names(&self, names: &mut BTreeSet<String>) {
        // Every child contributes, surfaced by the projector or not.
        for child in &self.children {
            child.collect_referred_attribute_names(names);
        }
    }

    fn evaluate<'a>(
        &'a mut self,
        input: &View<'a>,
        skip: Option<&'a Bitmap>,
    ) -> Result<View<'a>> {
        let projector: &'a BoundMultiSourceProjector = &self.projector;
        let mut views = Vec::with_capacity(self.children.len());
        for child in self.children.iter_mut() {
            views.push(child.evaluate(input, skip)?);
        }
        Ok(projector.project_views(&views))
    }
}

/// Gates the outputs of `children` through `projector`, whose sources must
/// be the children's result schemas in order.
///
/// # Errors
///
/// Returns `ATTRIBUTE_COUNT_MISMATCH` if the child count does not match the
/// projector's source count.
pub fn bound_projection(
    projector: BoundMultiSourceProjector,
    children: Vec<Box<dyn BoundExpression>>,
) -> Result<Box<dyn BoundExpression>> {
    if projector.source_count() != children.len() {
        return Err(Error::new(
            ErrorCode::AttributeCountMismatch,
            format!(
                "projector expects {} sources, got {} child expressions",
                projector.source_count(),
                children.len()
            ),
        ));
    }
    debug_assert!((0..children.len())
        .all(|i| projector.source_schema(i) == children[i].result_schema()));
    Ok(Box::new(BoundProjection {
        projector,
        children,
    }))
}
