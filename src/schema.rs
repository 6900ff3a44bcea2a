//! Attribute and tuple schema definitions.

use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, ErrorCode, Result};
use crate::types::{DataType, Nullability};

/// A named, typed, possibly-nullable column slot in a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    name: String,
    data_type: DataType,
    nullability: Nullability,
}

impl Attribute {
    /// Creates a new attribute.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType, nullability: Nullability) -> Self {
        Attribute {
            name: name.into(),
            data_type,
            nullability,
        }
    }

    /// Returns the attribute name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the data type.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Returns the nullability.
    #[must_use]
    pub fn nullability(&self) -> Nullability {
        self.nullability
    }

    /// Returns true if the attribute is nullable.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.nullability.is_nullable()
    }

    /// Returns a copy of this attribute carrying a different name.
    #[must_use]
    pub fn renamed(&self, name: impl Into<String>) -> Attribute {
        Attribute {
            name: name.into(),
            data_type: self.data_type,
            nullability: self.nullability,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.name, self.data_type, self.nullability)
    }
}

/// An ordered sequence of attributes with a name index.
///
/// Lookup by name is O(1) average. Two schemas are equal iff their attribute
/// sequences are pointwise equal; the name index is derived state.
#[derive(Debug, Clone, Default)]
pub struct TupleSchema {
    attributes: Vec<Attribute>,
    name_index: HashMap<String, usize>,
}

impl TupleSchema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        TupleSchema::default()
    }

    /// Builds a schema from a list of attributes.
    ///
    /// # Errors
    ///
    /// Returns `ATTRIBUTE_EXISTS` if two attributes share a name.
    pub fn from_attributes(attributes: Vec<Attribute>) -> Result<Self> {
        let mut schema = TupleSchema::new();
        for attribute in attributes {
            let name = attribute.name().to_string();
            if !schema.add_attribute(attribute) {
                return Err(Error::new(
                    ErrorCode::AttributeExists,
                    format!("duplicate attribute name \"{name}\" in schema: {schema}"),
                ));
            }
        }
        Ok(schema)
    }

    /// Appends an attribute. Returns false (and leaves the schema unchanged)
    /// if the name is already taken.
    pub fn add_attribute(&mut self, attribute: Attribute) -> bool {
        if self.name_index.contains_key(attribute.name()) {
            return false;
        }
        self.name_index
            .insert(attribute.name().to_string(), self.attributes.len());
        self.attributes.push(attribute);
        true
    }

    /// Appends an attribute without the duplicate-name check.
    ///
    /// Result schemas of bound multi-source projectors built through the raw
    /// `add` path may carry repeated names; lookups resolve to the first
    /// occurrence.
    pub(crate) fn add_attribute_allow_duplicates(&mut self, attribute: Attribute) {
        self.name_index
            .entry(attribute.name().to_string())
            .or_insert(self.attributes.len());
        self.attributes.push(attribute);
    }

    /// Returns the number of attributes.
    #[must_use]
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// Returns true if the schema has no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Returns the attribute at the given position.
    ///
    /// # Panics
    ///
    /// Panics if `position` is out of range; positional access is a caller
    /// contract.
    #[must_use]
    pub fn attribute(&self, position: usize) -> &Attribute {
        &self.attributes[position]
    }

    /// Returns all attributes in order.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Finds the position of an attribute by name.
    #[must_use]
    pub fn lookup_position(&self, name: &str) -> Option<usize> {
        self.name_index.get(name).copied()
    }
}

impl PartialEq for TupleSchema {
    fn eq(&self, other: &Self) -> bool {
        self.attributes == other.attributes
    }
}

impl Eq for TupleSchema {}

impl fmt::Display for TupleSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, attribute) in self.attributes.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{attribute}")?;
        }
        Ok(())
    }
}
