use crate::runtime::error::{EvalError, EvalResult};
use crate::runtime::value::{ColumnValue, Value};
use std::rc::Rc;

/// An ordered sequence of named, equal-length columns. The engine only ever
/// reads from a table; producing a result always builds a new one.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    columns: Vec<(String, Rc<Vec<Value>>)>,
}

impl Table {
    pub fn new(columns: Vec<(String, Vec<Value>)>) -> EvalResult<Table> {
        let mut table = Table {
            columns: Vec::with_capacity(columns.len()),
        };
        for (name, values) in columns {
            table.insert_column(name, values)?;
        }
        Ok(table)
    }

    fn insert_column(&mut self, name: String, values: Vec<Value>) -> EvalResult<()> {
        if self.columns.iter().any(|(existing, _)| *existing == name) {
            return Err(EvalError::DuplicateColumn { name });
        }
        if !self.columns.is_empty() && values.len() != self.row_count() {
            return Err(EvalError::LengthMismatch {
                name,
                len: values.len(),
                expected: self.row_count(),
            });
        }
        self.columns.push((name, Rc::new(values)));
        Ok(())
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |(_, values)| values.len())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|(existing, _)| existing == name)
    }

    pub fn column(&self, name: &str) -> Option<ColumnValue> {
        self.columns
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(existing, values)| ColumnValue {
                name: Some(existing.clone()),
                values: values.clone(),
            })
    }

    pub fn column_at(&self, index: usize) -> Option<(&str, ColumnValue)> {
        self.columns.get(index).map(|(name, values)| {
            (
                name.as_str(),
                ColumnValue {
                    name: Some(name.clone()),
                    values: values.clone(),
                },
            )
        })
    }

    /// Returns a new table with `name` bound to `values`, replacing the
    /// column of the same name if present, appending otherwise. The
    /// receiver is untouched.
    pub fn with_column(&self, name: &str, values: Vec<Value>) -> EvalResult<Table> {
        if !self.columns.is_empty() && values.len() != self.row_count() {
            return Err(EvalError::LengthMismatch {
                name: name.to_string(),
                len: values.len(),
                expected: self.row_count(),
            });
        }
        let mut columns = self.columns.clone();
        let shared = Rc::new(values);
        if let Some(slot) = columns.iter_mut().find(|(existing, _)| existing == name) {
            slot.1 = shared;
        } else {
            columns.push((name.to_string(), shared));
        }
        Ok(Table { columns })
    }

    /// Partitions row indices by the key columns' per-row values, in
    /// first-appearance order.
    pub fn group_by(&self, keys: &[String]) -> EvalResult<Vec<RowGroup>> {
        let mut key_columns = Vec::with_capacity(keys.len());
        for key in keys {
            let column = self.column(key).ok_or_else(|| EvalError::MissingColumn {
                name: key.clone(),
            })?;
            key_columns.push(column);
        }

        let mut groups: Vec<RowGroup> = Vec::new();
        for row in 0..self.row_count() {
            let key: Vec<Value> = key_columns
                .iter()
                .map(|column| column.values[row].clone())
                .collect();
            if let Some(group) = groups.iter_mut().find(|group| group.key == key) {
                group.rows.push(row);
            } else {
                groups.push(RowGroup {
                    key,
                    rows: vec![row],
                });
            }
        }
        Ok(groups)
    }
}

/// One partition of a grouped table: the key values shared by every row
/// in the partition, plus the row indices it covers.
#[derive(Clone, Debug, PartialEq)]
pub struct RowGroup {
    pub key: Vec<Value>,
    pub rows: Vec<usize>,
}
