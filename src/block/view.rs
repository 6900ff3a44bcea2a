//! Owning blocks and borrowed views.

use std::sync::Arc;

use crate::allocator::Allocator;
use crate::block::column::{Column, ColumnView};
use crate::error::{Error, ErrorCode, Result};
use crate::schema::TupleSchema;
use crate::types::Value;

/// Owned columnar storage for a fixed number of rows under a schema.
///
/// A block owns the values buffers, null vectors and string arenas for all
/// its columns, and meters its buffer reservation through the allocator it
/// was created with.
#[derive(Debug)]
pub struct Block {
    schema: TupleSchema,
    columns: Vec<Column>,
    row_capacity: usize,
    row_count: usize,
    allocator: Arc<dyn Allocator>,
    reserved_bytes: usize,
}

impl Block {
    /// Allocates a block for up to `row_capacity` rows under `schema`.
    ///
    /// # Errors
    ///
    /// Returns `MEMORY_EXCEEDED` if the allocator refuses the reservation.
    pub fn new(
        schema: TupleSchema,
        allocator: Arc<dyn Allocator>,
        row_capacity: usize,
    ) -> Result<Self> {
        let reserved_bytes = Self::estimated_bytes(&schema, row_capacity);
        allocator.reserve(reserved_bytes)?;
        let columns = schema
            .attributes()
            .iter()
            .map(|attribute| Column::new(attribute.clone(), row_capacity))
            .collect();
        Ok(Block {
            schema,
            columns,
            row_capacity,
            row_count: 0,
            allocator,
            reserved_bytes,
        })
    }

    fn estimated_bytes(schema: &TupleSchema, row_capacity: usize) -> usize {
        schema
            .attributes()
            .iter()
            .map(|attribute| {
                let values = attribute.data_type().physical_width() * row_capacity;
                let nulls = if attribute.is_nullable() {
                    row_capacity.div_ceil(8)
                } else {
                    0
                };
                values + nulls
            })
            .sum()
    }

    /// Returns the schema.
    #[must_use]
    pub fn schema(&self) -> &TupleSchema {
        &self.schema
    }

    /// Returns the number of rows stored.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Returns the number of rows the block was sized for.
    #[must_use]
    pub fn row_capacity(&self) -> usize {
        self.row_capacity
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the column at `position`.
    #[must_use]
    pub fn column(&self, position: usize) -> &Column {
        &self.columns[position]
    }

    /// Appends one row of values, mainly for building test inputs.
    ///
    /// # Errors
    ///
    /// Returns `ATTRIBUTE_COUNT_MISMATCH` if the value count does not match
    /// the schema width, or `TYPE_MISMATCH` on a value of the wrong type.
    ///
    /// # Panics
    ///
    /// Panics when appending past `row_capacity`; sizing is a caller
    /// contract.
    pub fn append_row(&mut self, values: &[Value]) -> Result<()> {
        if values.len() != self.schema.attribute_count() {
            return Err(Error::new(
                ErrorCode::AttributeCountMismatch,
                format!(
                    "row width {} does not match schema width {}: {}",
                    values.len(),
                    self.schema.attribute_count(),
                    self.schema
                ),
            ));
        }
        assert!(
            self.row_count < self.row_capacity,
            "block capacity {} exceeded",
            self.row_capacity
        );
        for (column, value) in self.columns.iter_mut().zip(values) {
            column.push(value)?;
        }
        self.row_count += 1;
        Ok(())
    }

    /// Returns a view over all rows.
    #[must_use]
    pub fn view(&self) -> View<'_> {
        let columns = self
            .columns
            .iter()
            .map(|column| column.view(0, self.row_count))
            .collect();
        View {
            schema: &self.schema,
            columns,
            row_count: self.row_count,
        }
    }

    /// Discards all rows, keeping buffers and capacity.
    pub(crate) fn reset(&mut self) {
        for column in &mut self.columns {
            column.reset();
        }
        self.row_count = 0;
    }

    /// Mutable access to the column at `position`, for vectorized writers.
    pub(crate) fn column_mut(&mut self, position: usize) -> &mut Column {
        &mut self.columns[position]
    }

    /// Declares the number of rows now present in every column.
    pub(crate) fn set_row_count(&mut self, row_count: usize) {
        debug_assert!(self
            .columns
            .iter()
            .all(|column| column.len() == row_count));
        self.row_count = row_count;
    }

    /// Copies the contents of `view` into this block, replacing any rows.
    ///
    /// The view's schema must match this block's schema up to attribute
    /// names, and must fit within the capacity.
    pub(crate) fn copy_from_view(&mut self, view: &View<'_>) {
        debug_assert_eq!(self.schema.attribute_count(), view.column_count());
        assert!(
            view.row_count() <= self.row_capacity,
            "view of {} rows copied into block of capacity {}",
            view.row_count(),
            self.row_capacity
        );
        self.reset();
        let row_count = view.row_count();
        for (position, column) in self.columns.iter_mut().enumerate() {
            column.extend_from_view(view.column(position), row_count);
        }
        self.row_count = row_count;
    }
}

impl Drop for Block {
    fn drop(&mut self) {
        self.allocator.release(self.reserved_bytes);
    }
}

/// A non-owning window over a row range of columnar data.
///
/// Views alias the backing storage; the lifetime parameter ties every view
/// to the block (or expression arena) it was taken from.
#[derive(Debug, Clone)]
pub struct View<'a> {
    schema: &'a TupleSchema,
    columns: Vec<ColumnView<'a>>,
    row_count: usize,
}

impl<'a> View<'a> {
    /// Assembles a view from parts; all columns must cover `row_count` rows.
    #[must_use]
    pub fn new(schema: &'a TupleSchema, columns: Vec<ColumnView<'a>>, row_count: usize) -> Self {
        debug_assert_eq!(schema.attribute_count(), columns.len());
        debug_assert!(columns
            .iter()
            .all(|column| column.row_count() == row_count));
        View {
            schema,
            columns,
            row_count,
        }
    }

    /// Returns the schema of the viewed data.
    #[must_use]
    pub fn schema(&self) -> &'a TupleSchema {
        self.schema
    }

    /// Returns the number of rows in the window.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the column view at `position`.
    #[must_use]
    pub fn column(&self, position: usize) -> &ColumnView<'a> {
        &self.columns[position]
    }

    /// Returns the column view for a named attribute.
    #[must_use]
    pub fn column_by_name(&self, name: &str) -> Option<&ColumnView<'a>> {
        self.schema
            .lookup_position(name)
            .map(|position| &self.columns[position])
    }

    /// Narrows the view to `count` rows starting at `offset`. Columns of the
    /// returned view alias the same storage.
    #[must_use]
    pub fn subrange(&self, offset: usize, count: usize) -> View<'a> {
        assert!(
            offset + count <= self.row_count,
            "subrange [{offset}, {}) out of range {}",
            offset + count,
            self.row_count
        );
        View {
            schema: self.schema,
            columns: self
                .columns
                .iter()
                .map(|column| column.narrowed(offset, count))
                .collect(),
            row_count: count,
        }
    }
}
