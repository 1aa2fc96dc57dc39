use crate::language::ast::Expr;
use crate::runtime::error::{EvalError, EvalResult};
use crate::runtime::scope::EnvRef;
use std::fmt;

/// An unevaluated expression paired with the scope it was written in.
/// Capturing records "what was written" and "where it came from"; the
/// expression only resolves against that scope when the resolver later
/// forces it, however deep inside a callee that happens.
#[derive(Clone)]
pub struct Quosure {
    expr: Box<Expr>,
    scope: EnvRef,
}

impl Quosure {
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn scope(&self) -> &EnvRef {
        &self.scope
    }

    pub fn source_text(&self) -> String {
        self.expr.source_text()
    }
}

impl fmt::Debug for Quosure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Quosure")
            .field("expr", &self.expr)
            .finish()
    }
}

/// Scope identity is deliberately ignored: two quosures are structurally
/// equal when their expressions are.
impl PartialEq for Quosure {
    fn eq(&self, other: &Quosure) -> bool {
        self.expr == other.expr
    }
}

/// Captures a caller-supplied expression without evaluating it. The scope
/// must be the caller's enclosing scope at the call site, not the callee's.
pub fn capture(expr: Expr, scope: &EnvRef) -> Quosure {
    Quosure {
        expr: Box::new(expr),
        scope: scope.clone(),
    }
}

/// Capture for an optional parameter: the supplied expression wins, then
/// the default; with neither the capture itself fails.
pub fn capture_opt(
    name: &str,
    supplied: Option<Expr>,
    default: Option<Expr>,
    scope: &EnvRef,
) -> EvalResult<Quosure> {
    match supplied.or(default) {
        Some(expr) => Ok(capture(expr, scope)),
        None => Err(EvalError::MissingArgument {
            name: name.to_string(),
        }),
    }
}

/// Captures a variadic parameter: every expression in order, all sharing
/// the caller's scope.
pub fn capture_all(exprs: Vec<Expr>, scope: &EnvRef) -> Vec<Quosure> {
    exprs.into_iter().map(|expr| capture(expr, scope)).collect()
}
