pub mod embrace;
pub mod error;
pub mod eval;
pub mod names;
pub mod quosure;
pub mod scope;
pub mod select;
pub mod table;
pub mod value;
pub mod verbs;

pub use error::{EvalError, EvalResult};
pub use eval::evaluate;
pub use quosure::Quosure;
pub use scope::{DataScope, Env, EnvRef, ScopeStack};
pub use table::Table;
pub use value::Value;
