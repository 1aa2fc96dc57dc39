use crate::runtime::error::{EvalError, EvalResult};
use crate::runtime::table::Table;
use crate::runtime::value::ColumnValue;
use std::fmt;
use std::ops::Range;
use std::rc::Rc;

pub type ColumnPredicate = Rc<dyn Fn(&ColumnValue) -> bool>;

/// A description of which columns to use, resolved against a table's
/// current column order into a concrete, deduplicated name list.
#[derive(Clone)]
pub enum SelectionSpec {
    ByName(String),
    ByPosition(usize),
    ByRange(Range<usize>),
    ByPredicate(ColumnPredicate),
    /// Strict: every requested name must exist.
    All(Vec<String>),
    /// Permissive: absent names are silently dropped.
    Any(Vec<String>),
    Union(Vec<SelectionSpec>),
    Complement(Box<SelectionSpec>),
}

impl SelectionSpec {
    pub fn name(name: impl Into<String>) -> SelectionSpec {
        SelectionSpec::ByName(name.into())
    }

    pub fn predicate<F>(f: F) -> SelectionSpec
    where
        F: Fn(&ColumnValue) -> bool + 'static,
    {
        SelectionSpec::ByPredicate(Rc::new(f))
    }

    pub fn all<I, S>(names: I) -> SelectionSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SelectionSpec::All(names.into_iter().map(Into::into).collect())
    }

    pub fn any<I, S>(names: I) -> SelectionSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SelectionSpec::Any(names.into_iter().map(Into::into).collect())
    }
}

impl fmt::Debug for SelectionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionSpec::ByName(name) => f.debug_tuple("ByName").field(name).finish(),
            SelectionSpec::ByPosition(index) => f.debug_tuple("ByPosition").field(index).finish(),
            SelectionSpec::ByRange(range) => f.debug_tuple("ByRange").field(range).finish(),
            SelectionSpec::ByPredicate(_) => write!(f, "ByPredicate(..)"),
            SelectionSpec::All(names) => f.debug_tuple("All").field(names).finish(),
            SelectionSpec::Any(names) => f.debug_tuple("Any").field(names).finish(),
            SelectionSpec::Union(specs) => f.debug_tuple("Union").field(specs).finish(),
            SelectionSpec::Complement(spec) => f.debug_tuple("Complement").field(spec).finish(),
        }
    }
}

/// Resolves a selection against the table's column order. The result is an
/// ordered set: duplicates collapse to their first occurrence. `Any` is
/// the only combinator that swallows an absent name; everything else
/// fails fast.
pub fn resolve_selection(spec: &SelectionSpec, table: &Table) -> EvalResult<Vec<String>> {
    let mut resolved = resolve(spec, table)?;
    dedup_in_place(&mut resolved);
    Ok(resolved)
}

fn resolve(spec: &SelectionSpec, table: &Table) -> EvalResult<Vec<String>> {
    match spec {
        SelectionSpec::ByName(name) => {
            if table.has_column(name) {
                Ok(vec![name.clone()])
            } else {
                Err(EvalError::MissingColumn { name: name.clone() })
            }
        }
        SelectionSpec::ByPosition(index) => match table.column_at(*index) {
            Some((name, _)) => Ok(vec![name.to_string()]),
            None => Err(EvalError::IndexOutOfRange {
                index: *index,
                width: table.width(),
            }),
        },
        SelectionSpec::ByRange(range) => {
            if range.start > range.end || range.end > table.width() {
                return Err(EvalError::IndexOutOfRange {
                    index: range.end.saturating_sub(1).max(range.start),
                    width: table.width(),
                });
            }
            Ok(table.column_names()[range.clone()].to_vec())
        }
        SelectionSpec::ByPredicate(predicate) => {
            let mut kept = Vec::new();
            for index in 0..table.width() {
                if let Some((name, column)) = table.column_at(index) {
                    if predicate(&column) {
                        kept.push(name.to_string());
                    }
                }
            }
            Ok(kept)
        }
        SelectionSpec::All(names) => {
            for name in names {
                if !table.has_column(name) {
                    return Err(EvalError::MissingColumn { name: name.clone() });
                }
            }
            Ok(names.clone())
        }
        SelectionSpec::Any(names) => Ok(names
            .iter()
            .filter(|name| table.has_column(name))
            .cloned()
            .collect()),
        SelectionSpec::Union(specs) => {
            let mut combined = Vec::new();
            for child in specs {
                combined.extend(resolve(child, table)?);
            }
            Ok(combined)
        }
        SelectionSpec::Complement(child) => {
            let excluded = resolve(child, table)?;
            Ok(table
                .column_names()
                .into_iter()
                .filter(|name| !excluded.contains(name))
                .collect())
        }
    }
}

fn dedup_in_place(names: &mut Vec<String>) {
    let mut seen = Vec::with_capacity(names.len());
    names.retain(|name| {
        if seen.iter().any(|kept: &String| kept == name) {
            false
        } else {
            seen.push(name.clone());
            true
        }
    });
}
