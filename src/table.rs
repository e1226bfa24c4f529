//! Column-oriented tables.
//!
//! A [`Table`] is an ordered set of named, equal-length columns. Filtering
//! never mutates a table; it produces a new one holding the selected rows.

pub mod column;
pub mod io;
pub mod mask;

pub use column::{Column, ColumnData, DataType};
pub use io::{read_csv, read_table, write_csv, write_table};
pub use mask::Mask;

use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building, filtering, reading or writing tables
#[derive(Error, Debug)]
pub enum TableError {
    #[error("Column '{0}' appears more than once")]
    DuplicateColumn(String),

    #[error("Column '{column}' has {actual} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("Mask has {actual} entries but the table has {expected} rows")]
    MaskLength { expected: usize, actual: usize },

    #[error("Input file not found: {0}")]
    NotFound(PathBuf),

    #[error("Unsupported table format: '{0}'. Only .csv is supported")]
    UnsupportedFormat(String),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("CSV error")]
    Csv(#[from] csv::Error),
}

/// Result type for table operations
pub type TableResult<T> = Result<T, TableError>;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    index: HashMap<String, usize>,
    num_rows: usize,
}

impl Table {
    /// Build a table. Column names must be unique and all columns the same length.
    pub fn new(columns: Vec<Column>) -> TableResult<Self> {
        let num_rows = columns.first().map(Column::len).unwrap_or(0);
        let mut index = HashMap::with_capacity(columns.len());

        for (i, column) in columns.iter().enumerate() {
            if index.insert(column.name.clone(), i).is_some() {
                return Err(TableError::DuplicateColumn(column.name.clone()));
            }
            if column.len() != num_rows {
                return Err(TableError::LengthMismatch {
                    column: column.name.clone(),
                    expected: num_rows,
                    actual: column.len(),
                });
            }
        }

        Ok(Self {
            columns,
            index,
            num_rows,
        })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index.get(name).map(|&i| &self.columns[i])
    }

    pub fn contains_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// New table with only the rows selected by `mask`, same columns in the same order
    pub fn filter(&self, mask: &Mask) -> TableResult<Table> {
        if mask.len() != self.num_rows {
            return Err(TableError::MaskLength {
                expected: self.num_rows,
                actual: mask.len(),
            });
        }

        let columns = self
            .columns
            .iter()
            .map(|c| Column::new(c.name.clone(), c.data.select(mask.as_slice())))
            .collect();

        Ok(Table {
            columns,
            index: self.index.clone(),
            num_rows: mask.count_selected(),
        })
    }
}
