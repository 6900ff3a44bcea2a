//! Owned columns and borrowed column views.

use crate::bitmap::Bitmap;
use crate::block::arena::StringArena;
use crate::error::{Error, ErrorCode, Result};
use crate::schema::Attribute;
use crate::types::{DataType, Value};

/// Typed values buffer; one variant per physical representation.
///
/// DATE and ENUM tags share the 32-bit buffers, DATETIME shares the 64-bit
/// one, and variable-length types store `(offset, length)` arena slots.
/// NULL_TYPE columns carry a dummy 32-bit buffer that is never read.
#[derive(Debug, Clone)]
pub enum ValueBuffer {
    /// 32-bit signed values (INT32, DATE, ENUM, DATA_TYPE, NULL_TYPE).
    Int32(Vec<i32>),
    /// 64-bit signed values (INT64, DATETIME).
    Int64(Vec<i64>),
    /// 32-bit unsigned values.
    UInt32(Vec<u32>),
    /// 64-bit unsigned values.
    UInt64(Vec<u64>),
    /// 32-bit floating point values.
    Float(Vec<f32>),
    /// 64-bit floating point values.
    Double(Vec<f64>),
    /// Boolean values.
    Bool(Vec<bool>),
    /// Arena slots for STRING and BINARY values.
    VarLen(Vec<(u32, u32)>),
}

impl ValueBuffer {
    /// Creates an empty buffer of the physical representation of `data_type`,
    /// with room for `capacity` values.
    #[must_use]
    pub fn for_type(data_type: DataType, capacity: usize) -> Self {
        match data_type {
            DataType::String | DataType::Binary => {
                ValueBuffer::VarLen(Vec::with_capacity(capacity))
            }
            DataType::Int64 | DataType::Datetime => ValueBuffer::Int64(Vec::with_capacity(capacity)),
            DataType::UInt32 => ValueBuffer::UInt32(Vec::with_capacity(capacity)),
            DataType::UInt64 => ValueBuffer::UInt64(Vec::with_capacity(capacity)),
            DataType::Float => ValueBuffer::Float(Vec::with_capacity(capacity)),
            DataType::Double => ValueBuffer::Double(Vec::with_capacity(capacity)),
            DataType::Bool => ValueBuffer::Bool(Vec::with_capacity(capacity)),
            DataType::Int32
            | DataType::Date
            | DataType::Enum
            | DataType::DataType
            | DataType::NullType => ValueBuffer::Int32(Vec::with_capacity(capacity)),
        }
    }

    /// Returns the number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            ValueBuffer::Int32(v) => v.len(),
            ValueBuffer::Int64(v) => v.len(),
            ValueBuffer::UInt32(v) => v.len(),
            ValueBuffer::UInt64(v) => v.len(),
            ValueBuffer::Float(v) => v.len(),
            ValueBuffer::Double(v) => v.len(),
            ValueBuffer::Bool(v) => v.len(),
            ValueBuffer::VarLen(v) => v.len(),
        }
    }

    /// Returns true if the buffer holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discards all values, keeping the capacity.
    pub fn clear(&mut self) {
        match self {
            ValueBuffer::Int32(v) => v.clear(),
            ValueBuffer::Int64(v) => v.clear(),
            ValueBuffer::UInt32(v) => v.clear(),
            ValueBuffer::UInt64(v) => v.clear(),
            ValueBuffer::Float(v) => v.clear(),
            ValueBuffer::Double(v) => v.clear(),
            ValueBuffer::Bool(v) => v.clear(),
            ValueBuffer::VarLen(v) => v.clear(),
        }
    }

    fn push_placeholder(&mut self) {
        match self {
            ValueBuffer::Int32(v) => v.push(0),
            ValueBuffer::Int64(v) => v.push(0),
            ValueBuffer::UInt32(v) => v.push(0),
            ValueBuffer::UInt64(v) => v.push(0),
            ValueBuffer::Float(v) => v.push(0.0),
            ValueBuffer::Double(v) => v.push(0.0),
            ValueBuffer::Bool(v) => v.push(false),
            ValueBuffer::VarLen(v) => v.push((0, 0)),
        }
    }
}

/// Borrowed typed slices over a [`ValueBuffer`].
#[derive(Debug, Clone, Copy)]
pub enum ValuesRef<'a> {
    /// 32-bit signed values.
    Int32(&'a [i32]),
    /// 64-bit signed values.
    Int64(&'a [i64]),
    /// 32-bit unsigned values.
    UInt32(&'a [u32]),
    /// 64-bit unsigned values.
    UInt64(&'a [u64]),
    /// 32-bit floating point values.
    Float(&'a [f32]),
    /// 64-bit floating point values.
    Double(&'a [f64]),
    /// Boolean values.
    Bool(&'a [bool]),
    /// Arena slots.
    VarLen(&'a [(u32, u32)]),
}

impl ValueBuffer {
    fn as_ref(&self) -> ValuesRef<'_> {
        match self {
            ValueBuffer::Int32(v) => ValuesRef::Int32(v),
            ValueBuffer::Int64(v) => ValuesRef::Int64(v),
            ValueBuffer::UInt32(v) => ValuesRef::UInt32(v),
            ValueBuffer::UInt64(v) => ValuesRef::UInt64(v),
            ValueBuffer::Float(v) => ValuesRef::Float(v),
            ValueBuffer::Double(v) => ValuesRef::Double(v),
            ValueBuffer::Bool(v) => ValuesRef::Bool(v),
            ValueBuffer::VarLen(v) => ValuesRef::VarLen(v),
        }
    }
}

/// Statically typed access to fixed-width buffers; implemented for every
/// physical representation. Mismatches are bind-time bugs, hence panics.
pub(crate) trait FixedWidthValue: Copy + 'static {
    fn slice<'a>(values: ValuesRef<'a>) -> &'a [Self];
    fn buffer_mut(buffer: &mut ValueBuffer) -> &mut Vec<Self>;
}

macro_rules! impl_fixed_width {
    ($type:ty, $variant:ident) => {
        impl FixedWidthValue for $type {
            fn slice<'a>(values: ValuesRef<'a>) -> &'a [Self] {
                match values {
                    ValuesRef::$variant(slice) => slice,
                    other => panic!(
                        "buffer type mismatch: expected {}, got {other:?}",
                        stringify!($variant)
                    ),
                }
            }

            fn buffer_mut(buffer: &mut ValueBuffer) -> &mut Vec<Self> {
                match buffer {
                    ValueBuffer::$variant(vec) => vec,
                    other => panic!(
                        "buffer type mismatch: expected {}, got {other:?}",
                        stringify!($variant)
                    ),
                }
            }
        }
    };
}

impl_fixed_width!(i32, Int32);
impl_fixed_width!(i64, Int64);
impl_fixed_width!(u32, UInt32);
impl_fixed_width!(u64, UInt64);
impl_fixed_width!(f32, Float);
impl_fixed_width!(f64, Double);
impl_fixed_width!(bool, Bool);

/// Owned storage for one attribute: a typed values buffer, a null vector if
/// the attribute is nullable, and an arena for variable-length values.
#[derive(Debug, Clone)]
pub struct Column {
    attribute: Attribute,
    values: ValueBuffer,
    nulls: Option<Bitmap>,
    arena: Option<StringArena>,
}

impl Column {
    /// Creates an empty column for `attribute` sized for `capacity` rows.
    #[must_use]
    pub fn new(attribute: Attribute, capacity: usize) -> Self {
        let values = ValueBuffer::for_type(attribute.data_type(), capacity);
        let nulls = attribute.is_nullable().then(|| Bitmap::new(capacity));
        let arena = attribute
            .data_type()
            .is_variable_length()
            .then(StringArena::new);
        Column {
            attribute,
            values,
            nulls,
            arena,
        }
    }

    /// Returns the attribute this column stores.
    #[must_use]
    pub fn attribute(&self) -> &Attribute {
        &self.attribute
    }

    /// Returns the number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the column holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Appends one value.
    ///
    /// # Errors
    ///
    /// Returns `TYPE_MISMATCH` if the value does not match the attribute
    /// type, or if a NULL is appended to a NOT_NULLABLE attribute.
    pub fn push(&mut self, value: &Value) -> Result<()> {
        let index = self.values.len();
        if value.is_null() {
            let Some(nulls) = self.nulls.as_mut() else {
                return Err(Error::new(
                    ErrorCode::TypeMismatch,
                    format!("NULL appended to NOT_NULLABLE attribute {}", self.attribute),
                ));
            };
            self.values.push_placeholder();
            if index >= nulls.len() {
                nulls.resize(index + 1);
            }
            nulls.set(index);
            return Ok(());
        }

        match (&mut self.values, value) {
            (ValueBuffer::Int32(v), Value::Int32(x))
                if self.attribute.data_type() == DataType::Int32 =>
            {
                v.push(*x);
            }
            (ValueBuffer::Int32(v), Value::Date(x)) if self.attribute.data_type() == DataType::Date => {
                v.push(*x);
            }
            (ValueBuffer::Int32(v), Value::Enum(x)) if self.attribute.data_type() == DataType::Enum => {
                v.push(*x);
            }
            (ValueBuffer::Int32(v), Value::Type(x))
                if self.attribute.data_type() == DataType::DataType =>
            {
                v.push(x.tag());
            }
            (ValueBuffer::Int64(v), Value::Int64(x))
                if self.attribute.data_type() == DataType::Int64 =>
            {
                v.push(*x);
            }
            (ValueBuffer::Int64(v), Value::Datetime(x))
                if self.attribute.data_type() == DataType::Datetime =>
            {
                v.push(*x);
            }
            (ValueBuffer::UInt32(v), Value::UInt32(x)) => v.push(*x),
            (ValueBuffer::UInt64(v), Value::UInt64(x)) => v.push(*x),
            (ValueBuffer::Float(v), Value::Float(x)) => v.push(*x),
            (ValueBuffer::Double(v), Value::Double(x)) => v.push(*x),
            (ValueBuffer::Bool(v), Value::Bool(x)) => v.push(*x),
            (ValueBuffer::VarLen(v), Value::Str(x))
                if self.attribute.data_type() == DataType::String =>
            {
                let slot = self
                    .arena
                    .as_mut()
                    .expect("string column without arena")
                    .add(x.as_bytes());
                v.push(slot);
            }
            (ValueBuffer::VarLen(v), Value::Binary(x))
                if self.attribute.data_type() == DataType::Binary =>
            {
                let slot = self
                    .arena
                    .as_mut()
                    .expect("binary column without arena")
                    .add(x);
                v.push(slot);
            }
            (_, value) => {
                return Err(Error::new(
                    ErrorCode::TypeMismatch,
                    format!(
                        "cannot append {} value to attribute {}",
                        value.data_type(),
                        self.attribute
                    ),
                ));
            }
        }
        if let Some(nulls) = self.nulls.as_mut() {
            if index >= nulls.len() {
                nulls.resize(index + 1);
            }
            nulls.clear(index);
        }
        Ok(())
    }

    /// Bulk-appends `row_count` rows from `source`, which must carry the same
    /// data type and may only carry nulls if this column is nullable.
    pub(crate) fn extend_from_view(&mut self, source: &ColumnView<'_>, row_count: usize) {
        debug_assert_eq!(
            self.attribute.data_type(),
            source.attribute().data_type(),
            "column copy across data types"
        );
        let base = self.values.len();
        let arena = self.arena.as_mut();
        match &mut self.values {
            ValueBuffer::Int32(dst) => dst.extend_from_slice(source.window::<i32>(row_count)),
            ValueBuffer::Int64(dst) => dst.extend_from_slice(source.window::<i64>(row_count)),
            ValueBuffer::UInt32(dst) => dst.extend_from_slice(source.window::<u32>(row_count)),
            ValueBuffer::UInt64(dst) => dst.extend_from_slice(source.window::<u64>(row_count)),
            ValueBuffer::Float(dst) => dst.extend_from_slice(source.window::<f32>(row_count)),
            ValueBuffer::Double(dst) => dst.extend_from_slice(source.window::<f64>(row_count)),
            ValueBuffer::Bool(dst) => dst.extend_from_slice(source.window::<bool>(row_count)),
            ValueBuffer::VarLen(dst) => {
                // Re-add bytes so the slots point into this column's arena.
                let arena = arena.expect("variable-length column without arena");
                for row in 0..row_count {
                    dst.push(arena.add(source.bytes_at(row)));
                }
            }
        }
        if let Some(nulls) = self.nulls.as_mut() {
            if base + row_count > nulls.len() {
                nulls.resize(base + row_count);
            }
            for row in 0..row_count {
                nulls.assign(base + row, source.is_null(row));
            }
        } else {
            debug_assert!(
                source.nulls.is_none() || (0..row_count).all(|row| !source.is_null(row)),
                "null values copied into NOT_NULLABLE column"
            );
        }
    }

    /// Discards all values, keeping buffers and capacity.
    pub(crate) fn reset(&mut self) {
        self.values.clear();
        if let Some(nulls) = self.nulls.as_mut() {
            nulls.fill(false);
        }
        if let Some(arena) = self.arena.as_mut() {
            arena.clear();
        }
    }

    /// Mutable access to the buffer, null vector and arena at once, for
    /// vectorized writers.
    pub(crate) fn parts_mut(
        &mut self,
    ) -> (&mut ValueBuffer, Option<&mut Bitmap>, Option<&mut StringArena>) {
        (
            &mut self.values,
            self.nulls.as_mut(),
            self.arena.as_mut(),
        )
    }

    /// Returns a view over rows `[offset, offset + row_count)`.
    #[must_use]
    pub fn view(&self, offset: usize, row_count: usize) -> ColumnView<'_> {
        debug_assert!(offset + row_count <= self.values.len());
        ColumnView {
            attribute: &self.attribute,
            values: self.values.as_ref(),
            nulls: self.nulls.as_ref(),
            arena: self.arena.as_ref(),
            offset,
            row_count,
        }
    }
}

/// Borrowed window over a column: typed values, nulls, and a row range.
///
/// Copying a view never copies data; views become invalid when the backing
/// block is dropped, which the lifetime parameter enforces.
#[derive(Debug, Clone, Copy)]
pub struct ColumnView<'a> {
    attribute: &'a Attribute,
    values: ValuesRef<'a>,
    nulls: Option<&'a Bitmap>,
    arena: Option<&'a StringArena>,
    offset: usize,
    row_count: usize,
}

impl<'a> ColumnView<'a> {
    /// Returns the attribute of this column.
    #[must_use]
    pub fn attribute(&self) -> &'a Attribute {
        self.attribute
    }

    /// Returns the data type of this column.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.attribute.data_type()
    }

    /// Returns the number of rows in the window.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Returns whether the value at `row` is NULL. Columns of NOT_NULLABLE
    /// attributes report all rows as non-null.
    #[must_use]
    pub fn is_null(&self, row: usize) -> bool {
        debug_assert!(row < self.row_count);
        self.nulls.is_some_and(|nulls| nulls.get(self.offset + row))
    }

    pub(crate) fn window<T: FixedWidthValue>(&self, row_count: usize) -> &'a [T] {
        debug_assert!(row_count <= self.row_count);
        &T::slice(self.values)[self.offset..self.offset + row_count]
    }

    /// The i32 values window (INT32, DATE, ENUM, DATA_TYPE columns).
    #[must_use]
    pub fn i32_values(&self) -> &'a [i32] {
        self.window::<i32>(self.row_count)
    }

    /// The i64 values window (INT64, DATETIME columns).
    #[must_use]
    pub fn i64_values(&self) -> &'a [i64] {
        self.window::<i64>(self.row_count)
    }

    /// The u32 values window.
    #[must_use]
    pub fn u32_values(&self) -> &'a [u32] {
        self.window::<u32>(self.row_count)
    }

    /// The u64 values window.
    #[must_use]
    pub fn u64_values(&self) -> &'a [u64] {
        self.window::<u64>(self.row_count)
    }

    /// The f32 values window.
    #[must_use]
    pub fn f32_values(&self) -> &'a [f32] {
        self.window::<f32>(self.row_count)
    }

    /// The f64 values window.
    #[must_use]
    pub fn f64_values(&self) -> &'a [f64] {
        self.window::<f64>(self.row_count)
    }

    /// The bool values window.
    #[must_use]
    pub fn bool_values(&self) -> &'a [bool] {
        self.window::<bool>(self.row_count)
    }

    /// The arena slots window of a variable-length column.
    #[must_use]
    pub fn slots(&self) -> &'a [(u32, u32)] {
        match self.values {
            ValuesRef::VarLen(slots) => &slots[self.offset..self.offset + self.row_count],
            other => panic!("buffer type mismatch: expected VarLen, got {other:?}"),
        }
    }

    /// Returns the bytes of a variable-length value.
    #[must_use]
    pub fn bytes_at(&self, row: usize) -> &'a [u8] {
        let (offset, length) = self.slots()[row];
        self.arena
            .expect("variable-length column without arena")
            .get(offset, length)
    }

    /// Returns the string value at `row`.
    ///
    /// # Panics
    ///
    /// Panics if the stored bytes are not valid UTF-8; STRING columns only
    /// ever store UTF-8.
    #[must_use]
    pub fn string_at(&self, row: usize) -> &'a str {
        std::str::from_utf8(self.bytes_at(row)).expect("invalid UTF-8 in STRING column")
    }

    /// Materializes the value at `row`, mainly for tests and diagnostics.
    #[must_use]
    pub fn value_at(&self, row: usize) -> Value {
        if self.is_null(row) {
            return Value::Null;
        }
        match self.data_type() {
            DataType::Int32 => Value::Int32(self.i32_values()[row]),
            DataType::Date => Value::Date(self.i32_values()[row]),
            DataType::Enum => Value::Enum(self.i32_values()[row]),
            DataType::DataType => Value::Type(
                DataType::from_tag(self.i32_values()[row]).expect("invalid type tag in column"),
            ),
            DataType::NullType => Value::Null,
            DataType::Int64 => Value::Int64(self.i64_values()[row]),
            DataType::Datetime => Value::Datetime(self.i64_values()[row]),
            DataType::UInt32 => Value::UInt32(self.u32_values()[row]),
            DataType::UInt64 => Value::UInt64(self.u64_values()[row]),
            DataType::Float => Value::Float(self.f32_values()[row]),
            DataType::Double => Value::Double(self.f64_values()[row]),
            DataType::Bool => Value::Bool(self.bool_values()[row]),
            DataType::String => Value::Str(self.string_at(row).to_string()),
            DataType::Binary => Value::Binary(self.bytes_at(row).to_vec()),
        }
    }

    /// Returns a copy of this view carrying a different attribute; used by
    /// projectors and aliases, which may only change the name.
    #[must_use]
    pub fn with_attribute(&self, attribute: &'a Attribute) -> ColumnView<'a> {
        debug_assert_eq!(attribute.data_type(), self.attribute.data_type());
        ColumnView { attribute, ..*self }
    }

    /// Narrows the window to `count` rows starting at `offset`.
    #[must_use]
    pub fn narrowed(&self, offset: usize, count: usize) -> ColumnView<'a> {
        debug_assert!(offset + count <= self.row_count);
        ColumnView {
            offset: self.offset + offset,
            row_count: count,
            ..*self
        }
    }
}
