use crate::runtime::table::{RowGroup, Table};
use crate::runtime::value::{ColumnValue, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub type EnvRef = Rc<Env>;

/// An ordinary lexical scope, chained to its parent. Scopes are shared by
/// reference so a captured expression can keep its defining scope alive
/// past the frame that created it.
#[derive(Debug)]
pub struct Env {
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<EnvRef>,
}

impl Env {
    pub fn root() -> EnvRef {
        Rc::new(Env {
            bindings: RefCell::new(HashMap::new()),
            parent: None,
        })
    }

    pub fn child(parent: &EnvRef) -> EnvRef {
        Rc::new(Env {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(parent.clone()),
        })
    }

    pub fn bind(&self, name: impl Into<String>, value: Value) {
        self.bindings.borrow_mut().insert(name.into(), value);
    }

    /// Walks the parent chain.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.bindings.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.lookup(name))
    }
}

/// A read-only view over a table's columns, optionally restricted to one
/// group's rows. Lookup materializes the (sub)column under its declared
/// name.
#[derive(Clone, Debug)]
pub struct DataScope {
    table: Rc<Table>,
    rows: Option<Rc<Vec<usize>>>,
}

impl DataScope {
    pub fn new(table: Rc<Table>) -> Self {
        Self { table, rows: None }
    }

    pub fn for_group(table: Rc<Table>, group: &RowGroup) -> Self {
        Self {
            table,
            rows: Some(Rc::new(group.rows.clone())),
        }
    }

    pub fn row_count(&self) -> usize {
        match &self.rows {
            Some(rows) => rows.len(),
            None => self.table.row_count(),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<ColumnValue> {
        let column = self.table.column(name)?;
        match &self.rows {
            None => Some(column),
            Some(rows) => {
                let values: Vec<Value> = rows
                    .iter()
                    .map(|&row| column.values[row].clone())
                    .collect();
                Some(ColumnValue::new(Some(name.to_string()), values))
            }
        }
    }
}

/// The ordered scope stack an expression is evaluated against: the data
/// scope (when a data context is active) is consulted before enclosing
/// environments, unless a pronoun pins the lookup.
#[derive(Clone)]
pub struct ScopeStack {
    pub data: Option<DataScope>,
    pub env: EnvRef,
}

impl ScopeStack {
    pub fn new(data: DataScope, env: EnvRef) -> Self {
        Self {
            data: Some(data),
            env,
        }
    }

    pub fn env_only(env: EnvRef) -> Self {
        Self { data: None, env }
    }
}
