//! The in-memory table model shared by the reader and the writer.

use derive_more::derive::{Constructor, Deref, Index, IntoIterator};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{DataType, StorageKind};
use crate::value::Value;

/// Version word written by default
pub const DEFAULT_VERSION: u16 = 0x0001;

/// Where a column keeps its value, together with the stored constant
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Storage {
    /// Name only, every row reads the type's zero value
    Zero,
    /// Stored once in the schema and shared by every row
    Constant(Value),
    /// Stored in every row record
    PerRow,
    /// Stored in every row record; the schema constant is kept for round trips
    PerRowWithConstantName(Value),
}

impl Storage {
    pub fn kind(&self) -> StorageKind {
        match self {
            Storage::Zero => StorageKind::Zero,
            Storage::Constant(_) => StorageKind::Constant,
            Storage::PerRow => StorageKind::PerRow,
            Storage::PerRowWithConstantName(_) => StorageKind::PerRowWithConstantName,
        }
    }

    /// The value held in the schema record, if any
    pub fn constant(&self) -> Option<&Value> {
        match self {
            Storage::Constant(v) | Storage::PerRowWithConstantName(v) => Some(v),
            Storage::Zero | Storage::PerRow => None,
        }
    }
}

/// A column schema record
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Column {
    name: String,
    data_type: DataType,
    storage: Storage,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType, storage: Storage) -> Column {
        Column {
            name: name.into(),
            data_type,
            storage,
        }
    }

    /// A column storing one value per row
    pub fn per_row(name: impl Into<String>, data_type: DataType) -> Column {
        Column::new(name, data_type, Storage::PerRow)
    }

    /// A column storing `value` once for every row, typed after the value
    pub fn constant(name: impl Into<String>, value: impl Into<Value>) -> Column {
        let value = value.into();
        Column::new(name, value.data_type(), Storage::Constant(value))
    }

    /// A name-only column
    pub fn zero(name: impl Into<String>, data_type: DataType) -> Column {
        Column::new(name, data_type, Storage::Zero)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn kind(&self) -> StorageKind {
        self.storage.kind()
    }

    /// The value every row must hold, for columns that do not store rows
    fn fixed_value(&self) -> Option<Value> {
        match &self.storage {
            Storage::Zero => Some(self.data_type.zero()),
            Storage::Constant(v) => Some(v.clone()),
            Storage::PerRow | Storage::PerRowWithConstantName(_) => None,
        }
    }
}

/// Byte position of every per-row column inside a row record
///
/// Derived from the schema, computed once and shared by every row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowLayout {
    offsets: Vec<Option<usize>>,
    stride: usize,
}

impl RowLayout {
    pub fn new(columns: &[Column]) -> RowLayout {
        let mut stride = 0;
        let offsets = columns
            .iter()
            .map(|column| {
                column.kind().is_per_row().then(|| {
                    let offset = stride;
                    stride += column.data_type().width();
                    offset
                })
            })
            .collect();

        RowLayout { offsets, stride }
    }

    /// Bytes in one row record
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Offset of a column inside the row record, `None` when it is not stored per row
    pub fn offset(&self, column: usize) -> Option<usize> {
        self.offsets.get(column).copied().flatten()
    }
}

/// One cell per column, in column order
#[derive(Debug, Clone, PartialEq, Default, Constructor, Deref, Index, IntoIterator)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
#[into_iterator(owned, ref)]
pub struct Row(Vec<Value>);

impl From<Vec<Value>> for Row {
    fn from(value: Vec<Value>) -> Self {
        Row(value)
    }
}

/// A decoded @UTF table
///
/// ```
/// use cri_utf::{Column, DataType, TableBuilder, Value};
///
/// let table = TableBuilder::new("Cue")
///     .column(Column::per_row("CueName", DataType::String))
///     .column(Column::constant("Volume", 100u16))
///     .row(vec![Value::from("cue_01"), Value::from(100u16)])
///     .build()?;
///
/// let bytes = cri_utf::encode(&table)?;
/// let decoded = cri_utf::decode(&bytes, 0)?;
/// assert_eq!(decoded.get(0, "CueName"), Some(&Value::from("cue_01")));
/// assert_eq!(decoded, table);
/// # Ok::<(), cri_utf::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Table {
    name: String,
    version: u16,
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl Table {
    pub(crate) fn from_parts(name: String, version: u16, columns: Vec<Column>, rows: Vec<Row>) -> Table {
        Table {
            name,
            version,
            columns,
            rows,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Index of the first column called `name`
    ///
    /// Duplicate column names are allowed, the earliest one in schema order wins.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// Cell at `row` in the first column called `column`
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let column = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// Iterates over the values of the first column called `column`
    pub fn column_values<'t>(&'t self, column: &str) -> Option<impl Iterator<Item = &'t Value> + 't> {
        let index = self.column_index(column)?;
        Some(self.rows.iter().map(move |r| &r[index]))
    }

    pub fn layout(&self) -> RowLayout {
        RowLayout::new(&self.columns)
    }

    /// Checks that every row has one correctly typed cell per column and that
    /// rows agree with constant and zero columns.
    pub fn validate(&self) -> Result<()> {
        for column in &self.columns {
            if let Some(constant) = column.storage().constant() {
                check_type(column, constant)?;
            }
        }

        let fixed = self
            .columns
            .iter()
            .map(Column::fixed_value)
            .collect::<Vec<_>>();

        for (index, row) in self.rows.iter().enumerate() {
            if row.len() != self.columns.len() {
                return Err(Error::RowLengthMismatch {
                    row: index,
                    expected: self.columns.len(),
                    found: row.len(),
                });
            }

            for ((column, cell), fixed) in self.columns.iter().zip(row.iter()).zip(&fixed) {
                check_type(column, cell)?;
                if fixed.as_ref().is_some_and(|v| v != cell) {
                    return Err(Error::ConstantMismatch {
                        column: column.name().to_owned(),
                        row: index,
                    });
                }
            }
        }

        Ok(())
    }
}

fn check_type(column: &Column, value: &Value) -> Result<()> {
    if value.data_type() != column.data_type() {
        return Err(Error::ColumnWidthMismatch {
            column: column.name().to_owned(),
            expected: column.data_type(),
            found: value.data_type(),
        });
    }
    Ok(())
}

/// Incremental construction of a [`Table`]
///
/// Rows carry one cell per column, including constant and zero columns.
/// [`TableBuilder::build`] validates the result.
#[derive(Debug, Clone)]
pub struct TableBuilder {
    name: String,
    version: u16,
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl TableBuilder {
    pub fn new(name: impl Into<String>) -> TableBuilder {
        TableBuilder {
            name: name.into(),
            version: DEFAULT_VERSION,
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn version(mut self, version: u16) -> TableBuilder {
        self.version = version;
        self
    }

    pub fn column(mut self, column: Column) -> TableBuilder {
        self.columns.push(column);
        self
    }

    pub fn row(mut self, cells: impl Into<Row>) -> TableBuilder {
        self.rows.push(cells.into());
        self
    }

    pub fn build(self) -> Result<Table> {
        let table = Table::from_parts(self.name, self.version, self.columns, self.rows);
        table.validate()?;
        Ok(table)
    }
}

impl From<Table> for TableBuilder {
    fn from(value: Table) -> Self {
        TableBuilder {
            name: value.name,
            version: value.version,
            columns: value.columns,
            rows: value.rows,
        }
    }
}
