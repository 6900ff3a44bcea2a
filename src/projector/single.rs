//! Single-source projectors: name-to-position mappings over one schema.

use std::collections::HashSet;
use std::fmt;

use crate::block::View;
use crate::error::{Error, ErrorCode, Result};
use crate::schema::TupleSchema;

/// Logical description of how to derive a result schema from one input
/// schema. Binding against a concrete schema produces a
/// [`BoundSingleSourceProjector`].
///
/// The variants form a closed set; `bind` is the single dispatcher.
#[derive(Debug, Clone)]
pub enum SingleSourceProjector {
    /// Projects the attribute at a position; fails with
    /// `ATTRIBUTE_COUNT_MISMATCH` when out of range.
    AttributeAt(usize),
    /// Projects an attribute by name; fails with `ATTRIBUTE_MISSING` when
    /// absent.
    NamedAttribute(String),
    /// Projects every input attribute, optionally prefixing the names.
    AllAttributes {
        /// Prefix prepended to every result name, if any.
        prefix: Option<String>,
    },
    /// Concatenates the children's results in order; fails with
    /// `ATTRIBUTE_EXISTS` on a duplicate result name.
    Compound(Vec<SingleSourceProjector>),
    /// Binds the child, then replaces the result names. The alias list must
    /// be internally unique (contract violation otherwise) and its length
    /// must match the child's result width (`ATTRIBUTE_COUNT_MISMATCH`).
    Renaming {
        /// Replacement names, one per child result attribute.
        aliases: Vec<String>,
        /// The projector whose outputs get renamed.
        child: Box<SingleSourceProjector>,
    },
}

impl SingleSourceProjector {
    /// Projects the attribute at `position`.
    #[must_use]
    pub fn attribute_at(position: usize) -> Self {
        SingleSourceProjector::AttributeAt(position)
    }

    /// Projects the attribute named `name`.
    #[must_use]
    pub fn named_attribute(name: impl Into<String>) -> Self {
        SingleSourceProjector::NamedAttribute(name.into())
    }

    /// Projects the attributes at `positions`, in order.
    #[must_use]
    pub fn attributes_at(positions: impl IntoIterator<Item = usize>) -> Self {
        SingleSourceProjector::Compound(
            positions
                .into_iter()
                .map(SingleSourceProjector::AttributeAt)
                .collect(),
        )
    }

    /// Projects the attributes named in `names`, in order.
    #[must_use]
    pub fn named_attributes<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        SingleSourceProjector::Compound(
            names
                .into_iter()
                .map(|name| SingleSourceProjector::NamedAttribute(name.into()))
                .collect(),
        )
    }

    /// Projects every input attribute under its own name.
    #[must_use]
    pub fn all_attributes() -> Self {
        SingleSourceProjector::AllAttributes { prefix: None }
    }

    /// Projects every input attribute with `prefix` prepended to the names.
    #[must_use]
    pub fn all_attributes_prefixed(prefix: impl Into<String>) -> Self {
        SingleSourceProjector::AllAttributes {
            prefix: Some(prefix.into()),
        }
    }

    /// Renames the child's outputs to `aliases`.
    ///
    /// # Panics
    ///
    /// Panics if the alias list contains duplicates; that is a programming
    /// error, not a bind failure.
    #[must_use]
    pub fn renamed<S: Into<String>>(
        aliases: impl IntoIterator<Item = S>,
        child: SingleSourceProjector,
    ) -> Self {
        let aliases: Vec<String> = aliases.into_iter().map(Into::into).collect();
        let unique: HashSet<&str> = aliases.iter().map(String::as_str).collect();
        assert_eq!(
            unique.len(),
            aliases.len(),
            "the provided list of aliases isn't unique: {}",
            aliases.join(", ")
        );
        SingleSourceProjector::Renaming {
            aliases,
            child: Box::new(child),
        }
    }

    /// Resolves this projector against a concrete source schema.
    ///
    /// Binding is deterministic and side-effect-free; re-binding the same
    /// projector against the same schema yields an equal bound projector.
    ///
    /// # Errors
    ///
    /// Returns the structural binding errors documented on each variant,
    /// annotated with this projector's rendering.
    pub fn bind(&self, source_schema: &TupleSchema) -> Result<BoundSingleSourceProjector> {
        self.bind_internal(source_schema)
            .map_err(|e| e.with_context(&self.to_string()))
    }

    fn bind_internal(&self, source_schema: &TupleSchema) -> Result<BoundSingleSourceProjector> {
        match self {
            SingleSourceProjector::AttributeAt(position) => {
                if *position >= source_schema.attribute_count() {
                    return Err(Error::new(
                        ErrorCode::AttributeCountMismatch,
                        format!(
                            "source schema has too few attributes ({} vs {position})",
                            source_schema.attribute_count()
                        ),
                    ));
                }
                let mut projector = BoundSingleSourceProjector::new(source_schema.clone());
                let added = projector.add(*position);
                debug_assert!(added);
                Ok(projector)
            }
            SingleSourceProjector::NamedAttribute(name) => {
                let Some(position) = source_schema.lookup_position(name) else {
                    return Err(Error::new(
                        ErrorCode::AttributeMissing,
                        format!("no attribute '{name}' in the schema: {source_schema}"),
                    ));
                };
                let mut projector = BoundSingleSourceProjector::new(source_schema.clone());
                let added = projector.add(position);
                debug_assert!(added);
                Ok(projector)
            }
            SingleSourceProjector::AllAttributes { prefix } => {
                let mut projector = BoundSingleSourceProjector::new(source_schema.clone());
                for position in 0..source_schema.attribute_count() {
                    let added = match prefix {
                        None => projector.add(position),
                        Some(prefix) => {
                            let name =
                                format!("{prefix}{}", source_schema.attribute(position).name());
                            projector.add_as(position, &name)
                        }
                    };
                    debug_assert!(added);
                }
                Ok(projector)
            }
            SingleSourceProjector::Compound(children) => {
                let mut projector = BoundSingleSourceProjector::new(source_schema.clone());
                for child in children {
                    let component = child.bind(source_schema)?;
                    for j in 0..component.result_schema().attribute_count() {
                        let name = component.result_schema().attribute(j).name();
                        if !projector.add_as(component.source_attribute_position(j), name) {
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
            SingleSourceProjector::Renaming { aliases, child } => {
                let bound = child.bind(source_schema)?;
                let intermediate = bound.result_schema();
                if aliases.len() != intermediate.attribute_count() {
                    return Err(Error::new(
                        ErrorCode::AttributeCountMismatch,
                        format!(
                            "number of aliases ({}) does not match the attribute count \
                             in source schema ({}): {intermediate}",
                            aliases.len(),
                            intermediate.attribute_count()
                        ),
                    ));
                }
                let unique: HashSet<&str> = aliases.iter().map(String::as_str).collect();
                assert_eq!(
                    unique.len(),
                    aliases.len(),
                    "the provided list of aliases isn't unique: {}",
                    aliases.join(", ")
                );
                let mut projector = BoundSingleSourceProjector::new(source_schema.clone());
                for (j, alias) in aliases.iter().enumerate() {
                    let added = projector.add_as(bound.source_attribute_position(j), alias);
                    debug_assert!(added);
                }
                Ok(projector)
            }
        }
    }
}

impl fmt::Display for SingleSourceProjector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SingleSourceProjector::AttributeAt(position) => write!(f, "AttributeAt({position})"),
            SingleSourceProjector::NamedAttribute(name) => f.write_str(name),
            SingleSourceProjector::AllAttributes { prefix } => {
                write!(f, "{}*", prefix.as_deref().unwrap_or(""))
            }
            SingleSourceProjector::Compound(children) => {
                f.write_str("(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{child}")?;
                }
                f.write_str(")")
            }
            SingleSourceProjector::Renaming { aliases, child } => {
                write!(f, "({child}) RENAME AS ({})", aliases.join(", "))
            }
        }
    }
}

/// A single-source projector resolved against a concrete schema.
///
/// Owns the source schema, the result schema, and the position map. For
/// every result attribute, type and nullability equal those of the source
/// attribute it projects; only the name may differ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundSingleSourceProjector {
    source_schema: TupleSchema,
    result_schema: TupleSchema,
    projection: Vec<usize>,
}

impl BoundSingleSourceProjector {
    /// Creates an empty projector over `source_schema`.
    #[must_use]
    pub fn new(source_schema: TupleSchema) -> Self {
        BoundSingleSourceProjector {
            source_schema,
            result_schema: TupleSchema::new(),
            projection: Vec::new(),
        }
    }

    /// Appends the source attribute at `position` under its own name.
    /// Returns false on a duplicate result name.
    pub fn add(&mut self, position: usize) -> bool {
        let name = self.source_schema.attribute(position).name().to_string();
        self.add_as(position, &name)
    }

    /// Appends the source attribute at `position` under `alias`. Returns
    /// false on a duplicate result name.
    pub fn add_as(&mut self, position: usize, alias: &str) -> bool {
        assert!(position < self.source_schema.attribute_count());
        let attribute = self.source_schema.attribute(position).renamed(alias);
        if !self.result_schema.add_attribute(attribute) {
            return false;
        }
        self.projection.push(position);
        true
    }

    /// Appends without the duplicate-name check; used when slicing bound
    /// multi-source projectors whose raw-built result schemas may repeat
    /// names.
    pub(crate) fn push_projection(&mut self, position: usize, alias: &str) {
        assert!(position < self.source_schema.attribute_count());
        let attribute = self.source_schema.attribute(position).renamed(alias);
        self.result_schema.add_attribute_allow_duplicates(attribute);
        self.projection.push(position);
    }

    /// Returns the source schema.
    #[must_use]
    pub fn source_schema(&self) -> &TupleSchema {
        &self.source_schema
    }

    /// Returns the result schema.
    #[must_use]
    pub fn result_schema(&self) -> &TupleSchema {
        &self.result_schema
    }

    /// Returns the source position feeding result attribute `result_position`.
    #[must_use]
    pub fn source_attribute_position(&self, result_position: usize) -> usize {
        self.projection[result_position]
    }

    /// Routes the projected columns out of `input`, which must match the
    /// source schema. Pure column routing; no data is copied.
    #[must_use]
    pub fn project_view<'a>(&'a self, input: &View<'a>) -> View<'a> {
        debug_assert_eq!(input.column_count(), self.source_schema.attribute_count());
        let columns = self
            .projection
            .iter()
            .enumerate()
            .map(|(i, &position)| {
                input
                    .column(position)
                    .with_attribute(self.result_schema.attribute(i))
            })
            .collect();
        View::new(&self.result_schema, columns, input.row_count())
    }
}
