use crate::language::ast::{Expr, LiteralValue, Pronoun, TemplateSegment};
use crate::runtime::error::{EvalError, EvalResult};
use crate::runtime::scope::{Env, EnvRef, ScopeStack};
use crate::runtime::value::{broadcast2, ColumnValue, FunctionValue, Value};

/// Evaluates an expression against the scope stack. Identifier leaves
/// resolve in this order unless a pronoun pins them:
///
/// 1. the data scope, when one is active;
/// 2. the scope recorded on the quosure the leaf was spliced from;
/// 3. the callee's own enclosing scope.
///
/// A data column therefore shadows a same-named enclosing binding; only an
/// explicit `.env$` pronoun reaches past it. That precedence is the
/// documented contract, hazard included.
pub fn evaluate(expr: &Expr, stack: &ScopeStack) -> EvalResult<Value> {
    eval_expr(expr, stack, &stack.env)
}

fn eval_expr(expr: &Expr, stack: &ScopeStack, active_env: &EnvRef) -> EvalResult<Value> {
    match expr {
        Expr::Literal(literal) => Ok(literal_value(literal)),
        Expr::Identifier { name, pronoun } => {
            resolve_identifier(name, *pronoun, stack, active_env)
        }
        Expr::Splice(quosure) => eval_expr(quosure.expr(), stack, quosure.scope()),
        Expr::Call { func, args } => {
            let function = lookup_function(func, stack, active_env)?;
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval_expr(arg, stack, active_env)?);
            }
            (function.f)(&values)
        }
        Expr::StringTemplate(segments) => {
            let mut out = String::new();
            for segment in segments {
                match segment {
                    TemplateSegment::Text(text) => out.push_str(text),
                    TemplateSegment::Spliced(quosure) => {
                        let value = eval_expr(quosure.expr(), stack, quosure.scope())?;
                        out.push_str(&value.to_string());
                    }
                    TemplateSegment::Placeholder(name) => {
                        return Err(EvalError::Unsupported {
                            message: format!("unbound placeholder `{{{}}}` in string template", name),
                        });
                    }
                }
            }
            Ok(Value::Str(out))
        }
    }
}

fn literal_value(literal: &LiteralValue) -> Value {
    match literal {
        LiteralValue::Int(v) => Value::Int(*v),
        LiteralValue::Float(v) => Value::Float(*v),
        LiteralValue::Bool(v) => Value::Bool(*v),
        LiteralValue::Str(v) => Value::Str(v.clone()),
    }
}

fn resolve_identifier(
    name: &str,
    pronoun: Pronoun,
    stack: &ScopeStack,
    active_env: &EnvRef,
) -> EvalResult<Value> {
    match pronoun {
        Pronoun::Data => match stack.data.as_ref().and_then(|data| data.lookup(name)) {
            Some(column) => Ok(Value::Column(column)),
            None => Err(EvalError::UnknownDataVariable {
                name: name.to_string(),
            }),
        },
        Pronoun::Env => lookup_env(name, stack, active_env).ok_or_else(|| {
            EvalError::UnknownEnvVariable {
                name: name.to_string(),
            }
        }),
        Pronoun::Default => {
            if let Some(column) = stack.data.as_ref().and_then(|data| data.lookup(name)) {
                return Ok(Value::Column(column));
            }
            lookup_env(name, stack, active_env).ok_or_else(|| EvalError::UnresolvedIdentifier {
                name: name.to_string(),
            })
        }
    }
}

/// The active env is the quosure's scope inside a splice, the callee's
/// otherwise; the callee's chain is the final fallback either way.
fn lookup_env(name: &str, stack: &ScopeStack, active_env: &EnvRef) -> Option<Value> {
    if let Some(value) = active_env.lookup(name) {
        return Some(value);
    }
    if !std::rc::Rc::ptr_eq(active_env, &stack.env) {
        return stack.env.lookup(name);
    }
    None
}

/// Function references never resolve through the data scope; a column
/// sharing a function's name cannot shadow it.
fn lookup_function(name: &str, stack: &ScopeStack, active_env: &EnvRef) -> EvalResult<FunctionValue> {
    match lookup_env(name, stack, active_env) {
        Some(Value::Function(function)) => Ok(function),
        Some(other) => Err(EvalError::TypeMismatch {
            message: format!("`{}` is bound to a {}, not a function", name, other.type_name()),
        }),
        None => Err(EvalError::UnresolvedIdentifier {
            name: name.to_string(),
        }),
    }
}

/// A root scope with the builtin functions bound. Caller scopes chain off
/// this so function lookup works everywhere.
pub fn builtins() -> EnvRef {
    let env = Env::root();
    let entries: &[(&str, fn(&[Value]) -> EvalResult<Value>)] = &[
        ("+", builtin_add),
        ("-", builtin_sub),
        ("*", builtin_mul),
        ("/", builtin_div),
        ("==", builtin_eq),
        ("<", builtin_lt),
        (">", builtin_gt),
        ("mean", builtin_mean),
        ("sum", builtin_sum),
        ("min", builtin_min),
        ("max", builtin_max),
        ("length", builtin_length),
    ];
    for (name, f) in entries {
        env.bind(*name, Value::Function(FunctionValue::new(*name, *f)));
    }
    env
}

fn expect_arity(name: &str, args: &[Value], expected: usize) -> EvalResult<()> {
    if args.len() != expected {
        return Err(EvalError::ArityMismatch {
            name: name.to_string(),
            expected,
            received: args.len(),
        });
    }
    Ok(())
}

fn numeric_binop(
    name: &str,
    args: &[Value],
    int_op: fn(i64, i64) -> i64,
    float_op: fn(f64, f64) -> f64,
) -> EvalResult<Value> {
    expect_arity(name, args, 2)?;
    broadcast2(&args[0], &args[1], |a, b| match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(int_op(*x, *y))),
        _ => Ok(Value::Float(float_op(a.as_f64()?, b.as_f64()?))),
    })
}

fn builtin_add(args: &[Value]) -> EvalResult<Value> {
    numeric_binop("+", args, |a, b| a + b, |a, b| a + b)
}

fn builtin_sub(args: &[Value]) -> EvalResult<Value> {
    numeric_binop("-", args, |a, b| a - b, |a, b| a - b)
}

fn builtin_mul(args: &[Value]) -> EvalResult<Value> {
    numeric_binop("*", args, |a, b| a * b, |a, b| a * b)
}

// Division always produces a float; integer truncation would be a quiet
// data error in summary arithmetic.
fn builtin_div(args: &[Value]) -> EvalResult<Value> {
    expect_arity("/", args, 2)?;
    broadcast2(&args[0], &args[1], |a, b| {
        Ok(Value::Float(a.as_f64()? / b.as_f64()?))
    })
}

fn builtin_eq(args: &[Value]) -> EvalResult<Value> {
    expect_arity("==", args, 2)?;
    broadcast2(&args[0], &args[1], |a, b| Ok(Value::Bool(a == b)))
}

fn builtin_lt(args: &[Value]) -> EvalResult<Value> {
    expect_arity("<", args, 2)?;
    broadcast2(&args[0], &args[1], |a, b| {
        Ok(Value::Bool(a.as_f64()? < b.as_f64()?))
    })
}

fn builtin_gt(args: &[Value]) -> EvalResult<Value> {
    expect_arity(">", args, 2)?;
    broadcast2(&args[0], &args[1], |a, b| {
        Ok(Value::Bool(a.as_f64()? > b.as_f64()?))
    })
}

fn column_argument<'a>(name: &str, args: &'a [Value]) -> EvalResult<&'a ColumnValue> {
    expect_arity(name, args, 1)?;
    match &args[0] {
        Value::Column(column) => Ok(column),
        other => Err(EvalError::TypeMismatch {
            message: format!("`{}` expects a column, found {}", name, other.type_name()),
        }),
    }
}

fn builtin_mean(args: &[Value]) -> EvalResult<Value> {
    let column = column_argument("mean", args)?;
    if column.is_empty() {
        return Err(EvalError::TypeMismatch {
            message: "`mean` of an empty column".to_string(),
        });
    }
    let mut total = 0.0;
    for value in column.values.iter() {
        total += value.as_f64()?;
    }
    Ok(Value::Float(total / column.len() as f64))
}

fn builtin_sum(args: &[Value]) -> EvalResult<Value> {
    let column = column_argument("sum", args)?;
    let all_ints = column.values.iter().all(|v| matches!(v, Value::Int(_)));
    if all_ints {
        let mut total = 0i64;
        for value in column.values.iter() {
            if let Value::Int(v) = value {
                total += v;
            }
        }
        Ok(Value::Int(total))
    } else {
        let mut total = 0.0;
        for value in column.values.iter() {
            total += value.as_f64()?;
        }
        Ok(Value::Float(total))
    }
}

fn numeric_fold(
    name: &str,
    args: &[Value],
    pick: fn(f64, f64) -> f64,
) -> EvalResult<Value> {
    let column = column_argument(name, args)?;
    let mut best: Option<f64> = None;
    for value in column.values.iter() {
        let v = value.as_f64()?;
        best = Some(match best {
            Some(current) => pick(current, v),
            None => v,
        });
    }
    match best {
        Some(v) => Ok(Value::Float(v)),
        None => Err(EvalError::TypeMismatch {
            message: format!("`{}` of an empty column", name),
        }),
    }
}

fn builtin_min(args: &[Value]) -> EvalResult<Value> {
    numeric_fold("min", args, f64::min)
}

fn builtin_max(args: &[Value]) -> EvalResult<Value> {
    numeric_fold("max", args, f64::max)
}

fn builtin_length(args: &[Value]) -> EvalResult<Value> {
    expect_arity("length", args, 1)?;
    match &args[0] {
        Value::Column(column) => Ok(Value::Int(column.len() as i64)),
        _ => Ok(Value::Int(1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::parser::parse_expr;
    use crate::runtime::embrace::embrace;
    use crate::runtime::quosure::capture;
    use crate::runtime::scope::DataScope;
    use crate::runtime::table::Table;
    use std::rc::Rc;

    fn gapminder() -> Rc<Table> {
        Rc::new(
            Table::new(vec![
                (
                    "year".to_string(),
                    vec![Value::Int(2007), Value::Int(2007)],
                ),
                ("pop".to_string(), vec![Value::Int(200), Value::Int(300)]),
            ])
            .expect("table"),
        )
    }

    fn stack_over(table: Rc<Table>) -> ScopeStack {
        let env = Env::child(&builtins());
        env.bind("n", Value::Int(5));
        ScopeStack::new(DataScope::new(table), env)
    }

    #[test]
    fn data_column_resolves_ahead_of_enclosing_binding() {
        let table = Rc::new(
            Table::new(vec![("n".to_string(), vec![Value::Int(1), Value::Int(2)])])
                .expect("table"),
        );
        let stack = stack_over(table);
        let value = evaluate(&parse_expr("n").expect("parse"), &stack).expect("eval");
        assert_eq!(
            value,
            Value::Column(ColumnValue::new(None, vec![Value::Int(1), Value::Int(2)]))
        );
    }

    #[test]
    fn env_pronoun_reaches_past_a_shadowing_column() {
        let table = Rc::new(
            Table::new(vec![("n".to_string(), vec![Value::Int(1), Value::Int(2)])])
                .expect("table"),
        );
        let stack = stack_over(table);
        let value = evaluate(&parse_expr(".env$n").expect("parse"), &stack).expect("eval");
        assert_eq!(value, Value::Int(5));
    }

    #[test]
    fn data_pronoun_fails_on_missing_column() {
        let stack = stack_over(gapminder());
        let err = evaluate(&parse_expr(".data$gdp").expect("parse"), &stack)
            .expect_err("should fail");
        assert!(matches!(err, EvalError::UnknownDataVariable { name } if name == "gdp"));
    }

    #[test]
    fn env_pronoun_fails_on_missing_binding() {
        let stack = stack_over(gapminder());
        let err = evaluate(&parse_expr(".env$gdp").expect("parse"), &stack)
            .expect_err("should fail");
        assert!(matches!(err, EvalError::UnknownEnvVariable { name } if name == "gdp"));
    }

    #[test]
    fn unresolved_identifier_names_the_leaf() {
        let stack = stack_over(gapminder());
        let err = evaluate(&parse_expr("gdp + 1").expect("parse"), &stack)
            .expect_err("should fail");
        assert!(matches!(err, EvalError::UnresolvedIdentifier { name } if name == "gdp"));
    }

    #[test]
    fn calls_vectorize_over_columns() {
        let stack = stack_over(gapminder());
        let value = evaluate(&parse_expr("pop + n").expect("parse"), &stack).expect("eval");
        assert_eq!(
            value,
            Value::Column(ColumnValue::new(
                None,
                vec![Value::Int(205), Value::Int(305)]
            ))
        );
    }

    #[test]
    fn aggregates_reduce_columns_to_scalars() {
        let stack = stack_over(gapminder());
        let value = evaluate(&parse_expr("mean(pop) + n").expect("parse"), &stack).expect("eval");
        assert_eq!(value, Value::Float(255.0));
    }

    #[test]
    fn splice_resolves_under_the_quosure_scope() {
        // The caller binds `x`; the callee's scope does not. Tunneling the
        // quosure through the callee must still find the caller's `x`.
        let caller = Env::child(&builtins());
        caller.bind("x", Value::Int(41));
        let quosure = capture(parse_expr("x + 1").expect("parse"), &caller);

        let callee = Env::child(&builtins());
        let stack = ScopeStack::new(DataScope::new(gapminder()), callee);
        let body = embrace(&parse_expr("arg").expect("parse"), "arg", &quosure);
        assert_eq!(evaluate(&body, &stack).expect("eval"), Value::Int(42));
    }

    #[test]
    fn splice_tunnels_through_nested_wrappers() {
        let caller = Env::child(&builtins());
        caller.bind("x", Value::Int(7));
        let quosure = capture(parse_expr("x").expect("parse"), &caller);

        // Three layers of embrace, each into a fresh callee template.
        let mut body = embrace(&parse_expr("inner").expect("parse"), "inner", &quosure);
        for placeholder in ["mid", "outer"] {
            let wrapped = capture(body, &Env::child(&builtins()));
            body = embrace(
                &parse_expr(placeholder).expect("parse"),
                placeholder,
                &wrapped,
            );
        }
        let stack = ScopeStack::env_only(Env::child(&builtins()));
        assert_eq!(evaluate(&body, &stack).expect("eval"), Value::Int(7));
    }

    #[test]
    fn embrace_round_trips_evaluation() {
        let caller = Env::child(&builtins());
        caller.bind("n", Value::Int(3));
        let expr = parse_expr("n * 2").expect("parse");
        let direct = evaluate(&expr, &ScopeStack::env_only(caller.clone())).expect("direct");

        let quosure = capture(expr, &caller);
        let body = embrace(&parse_expr("arg").expect("parse"), "arg", &quosure);
        let callee = Env::child(&builtins());
        let via_embrace = evaluate(&body, &ScopeStack::env_only(callee)).expect("embraced");
        assert_eq!(direct, via_embrace);
    }

    #[test]
    fn function_names_are_not_shadowed_by_columns() {
        let table = Rc::new(
            Table::new(vec![(
                "mean".to_string(),
                vec![Value::Int(1), Value::Int(2)],
            )])
            .expect("table"),
        );
        let stack = stack_over(table);
        // `mean(...)` must still call the builtin even though a column
        // named `mean` exists; the bare identifier still resolves to it.
        let value = evaluate(&parse_expr("mean(mean)").expect("parse"), &stack).expect("eval");
        assert_eq!(value, Value::Float(1.5));
    }

    #[test]
    fn calling_a_non_function_is_a_type_mismatch() {
        let env = Env::child(&builtins());
        env.bind("five", Value::Int(5));
        let stack = ScopeStack::env_only(env);
        let err = evaluate(&parse_expr("five(1)").expect("parse"), &stack)
            .expect_err("should fail");
        assert!(matches!(err, EvalError::TypeMismatch { .. }));
    }

    #[test]
    fn string_template_renders_spliced_values() {
        let caller = Env::child(&builtins());
        caller.bind("who", Value::Str("world".to_string()));
        let quosure = capture(Expr::ident("who"), &caller);
        let template = Expr::StringTemplate(vec![
            TemplateSegment::Text("hello ".to_string()),
            TemplateSegment::Spliced(quosure),
        ]);
        let stack = ScopeStack::env_only(Env::child(&builtins()));
        assert_eq!(
            evaluate(&template, &stack).expect("eval"),
            Value::Str("hello world".to_string())
        );
    }

    #[test]
    fn string_template_with_unbound_placeholder_fails() {
        let template = Expr::StringTemplate(vec![TemplateSegment::Placeholder("x".to_string())]);
        let stack = ScopeStack::env_only(builtins());
        let err = evaluate(&template, &stack).expect_err("should fail");
        assert!(matches!(err, EvalError::Unsupported { .. }));
    }

    #[test]
    fn aggregates_reject_empty_columns() {
        let table = Rc::new(
            Table::new(vec![("pop".to_string(), Vec::new())]).expect("table"),
        );
        let stack = stack_over(table);
        for source in ["mean(pop)", "min(pop)", "max(pop)"] {
            let err = evaluate(&parse_expr(source).expect("parse"), &stack)
                .expect_err("should fail");
            assert!(matches!(err, EvalError::TypeMismatch { .. }));
        }
    }

    #[test]
    fn arity_errors_name_the_function() {
        let stack = stack_over(gapminder());
        let err = evaluate(&parse_expr("mean(pop, pop)").expect("parse"), &stack)
            .expect_err("should fail");
        assert!(matches!(
            err,
            EvalError::ArityMismatch { name, expected: 1, received: 2 } if name == "mean"
        ));
    }
}
