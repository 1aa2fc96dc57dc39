use crate::language::ast::Expr;
use crate::runtime::error::{EvalError, EvalResult};
use crate::runtime::eval::evaluate;
use crate::runtime::scope::{DataScope, EnvRef, ScopeStack};
use crate::runtime::select::{resolve_selection, SelectionSpec};
use crate::runtime::table::Table;
use crate::runtime::value::Value;
use std::rc::Rc;

/// Evaluates each output expression once per group (once overall when
/// `group_keys` is empty) and assembles a table with one row per group:
/// the key columns first, then the outputs. Groups are independent and
/// reassembled in first-appearance order.
pub fn summarise(
    table: &Rc<Table>,
    group_keys: &[String],
    outputs: &[(String, Expr)],
    env: &EnvRef,
) -> EvalResult<Table> {
    if group_keys.is_empty() {
        let stack = ScopeStack::new(DataScope::new(table.clone()), env.clone());
        let mut columns = Vec::with_capacity(outputs.len());
        for (name, expr) in outputs {
            let value = summary_value(name, evaluate(expr, &stack)?)?;
            columns.push((name.clone(), vec![value]));
        }
        return Table::new(columns);
    }

    let groups = table.group_by(group_keys)?;
    let mut key_columns: Vec<(String, Vec<Value>)> = group_keys
        .iter()
        .map(|key| (key.clone(), Vec::with_capacity(groups.len())))
        .collect();
    let mut output_columns: Vec<(String, Vec<Value>)> = outputs
        .iter()
        .map(|(name, _)| (name.clone(), Vec::with_capacity(groups.len())))
        .collect();

    for group in &groups {
        for (slot, value) in key_columns.iter_mut().zip(group.key.iter()) {
            slot.1.push(value.clone());
        }
        let stack = ScopeStack::new(DataScope::for_group(table.clone(), group), env.clone());
        for (slot, (name, expr)) in output_columns.iter_mut().zip(outputs.iter()) {
            let value = summary_value(name, evaluate(expr, &stack)?)?;
            slot.1.push(value);
        }
    }

    key_columns.extend(output_columns);
    Table::new(key_columns)
}

fn summary_value(name: &str, value: Value) -> EvalResult<Value> {
    match value {
        Value::Column(column) => {
            if column.len() == 1 {
                Ok(column.values[0].clone())
            } else {
                Err(EvalError::TypeMismatch {
                    message: format!(
                        "summary `{}` must reduce to a single value, produced {}",
                        name,
                        column.len()
                    ),
                })
            }
        }
        scalar => Ok(scalar),
    }
}

/// Evaluates `expr` over the whole table and returns a new table with the
/// result bound to `name` (scalars broadcast to the row count).
pub fn mutate(table: &Rc<Table>, name: &str, expr: &Expr, env: &EnvRef) -> EvalResult<Table> {
    let stack = ScopeStack::new(DataScope::new(table.clone()), env.clone());
    let values = match evaluate(expr, &stack)? {
        Value::Column(column) => column.values.as_ref().clone(),
        scalar => vec![scalar; table.row_count()],
    };
    table.with_column(name, values)
}

/// Resolves a selection and returns a new table holding exactly those
/// columns, in resolved order.
pub fn project(table: &Table, spec: &SelectionSpec) -> EvalResult<Table> {
    let names = resolve_selection(spec, table)?;
    let mut columns = Vec::with_capacity(names.len());
    for name in names {
        let column = table
            .column(&name)
            .ok_or_else(|| EvalError::MissingColumn { name: name.clone() })?;
        columns.push((name, column.values.as_ref().clone()));
    }
    Table::new(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::parser::parse_expr;
    use crate::runtime::embrace::{embrace, embrace_spread};
    use crate::runtime::eval::builtins;
    use crate::runtime::names::{build_names, NameTemplate};
    use crate::runtime::quosure::{capture_all, Quosure};
    use crate::runtime::scope::Env;

    fn gapminder() -> Rc<Table> {
        Rc::new(
            Table::new(vec![
                (
                    "year".to_string(),
                    vec![
                        Value::Int(2007),
                        Value::Int(2007),
                        Value::Int(1952),
                        Value::Int(1952),
                    ],
                ),
                (
                    "pop".to_string(),
                    vec![
                        Value::Int(200),
                        Value::Int(300),
                        Value::Int(50),
                        Value::Int(70),
                    ],
                ),
            ])
            .expect("table"),
        )
    }

    fn caller_env() -> EnvRef {
        let env = Env::child(&builtins());
        env.bind("n", Value::Int(5));
        env
    }

    #[test]
    fn grouped_summary_mixes_columns_and_enclosing_bindings() {
        let table = gapminder();
        let env = caller_env();
        let outputs = vec![(
            "shifted".to_string(),
            parse_expr("mean(pop) + n").expect("parse"),
        )];
        let result =
            summarise(&table, &["year".to_string()], &outputs, &env).expect("summarise");
        assert_eq!(result.column_names(), vec!["year", "shifted"]);
        assert_eq!(
            result.column("year").expect("year").values.as_ref(),
            &vec![Value::Int(2007), Value::Int(1952)]
        );
        assert_eq!(
            result.column("shifted").expect("shifted").values.as_ref(),
            &vec![Value::Float(255.0), Value::Float(65.0)]
        );
    }

    #[test]
    fn same_named_column_shadows_the_enclosing_binding() {
        // The table gains its own `n` column; without a pronoun the column
        // wins, with `.env$n` the enclosing binding wins.
        let table = Rc::new(
            gapminder()
                .with_column(
                    "n",
                    vec![
                        Value::Int(100),
                        Value::Int(100),
                        Value::Int(100),
                        Value::Int(100),
                    ],
                )
                .expect("with_column"),
        );
        let env = caller_env();

        let shadowed = vec![(
            "out".to_string(),
            parse_expr("mean(pop) + mean(n)").expect("parse"),
        )];
        let result =
            summarise(&table, &["year".to_string()], &shadowed, &env).expect("summarise");
        assert_eq!(
            result.column("out").expect("out").values.as_ref(),
            &vec![Value::Float(350.0), Value::Float(160.0)]
        );

        let forced = vec![(
            "out".to_string(),
            parse_expr("mean(pop) + .env$n").expect("parse"),
        )];
        let result = summarise(&table, &["year".to_string()], &forced, &env).expect("summarise");
        assert_eq!(
            result.column("out").expect("out").values.as_ref(),
            &vec![Value::Float(255.0), Value::Float(65.0)]
        );
    }

    #[test]
    fn ungrouped_summary_produces_one_row() {
        let table = gapminder();
        let env = caller_env();
        let outputs = vec![("total".to_string(), parse_expr("sum(pop)").expect("parse"))];
        let result = summarise(&table, &[], &outputs, &env).expect("summarise");
        assert_eq!(result.row_count(), 1);
        assert_eq!(
            result.column("total").expect("total").values.as_ref(),
            &vec![Value::Int(620)]
        );
    }

    #[test]
    fn summary_rejects_multi_row_results() {
        let table = gapminder();
        let env = caller_env();
        let outputs = vec![("bad".to_string(), parse_expr("pop + 1").expect("parse"))];
        let err = summarise(&table, &[], &outputs, &env).expect_err("should fail");
        assert!(matches!(err, EvalError::TypeMismatch { .. }));
    }

    #[test]
    fn mutate_appends_a_broadcast_column() {
        let table = gapminder();
        let env = caller_env();
        let result = mutate(&table, "grown", &parse_expr("pop * 2").expect("parse"), &env)
            .expect("mutate");
        assert_eq!(
            result.column("grown").expect("grown").values.as_ref(),
            &vec![
                Value::Int(400),
                Value::Int(600),
                Value::Int(100),
                Value::Int(140),
            ]
        );
        // Scalars broadcast over every row.
        let result = mutate(&table, "n", &parse_expr(".env$n").expect("parse"), &env)
            .expect("mutate");
        assert_eq!(
            result.column("n").expect("n").values.as_ref(),
            &vec![Value::Int(5); 4]
        );
    }

    #[test]
    fn project_keeps_resolved_order() {
        let table = gapminder();
        let spec = SelectionSpec::all(["pop", "year"]);
        let result = project(&table, &spec).expect("project");
        assert_eq!(result.column_names(), vec!["pop", "year"]);
        assert_eq!(result.row_count(), 4);
    }

    /// The full function-author workflow: capture caller expressions,
    /// embrace them into a body template, synthesize result names, then
    /// run the grouped summary.
    fn summarise_means(
        table: &Rc<Table>,
        group: &str,
        measures: Vec<Expr>,
        caller: &EnvRef,
    ) -> EvalResult<Table> {
        let quosures = capture_all(measures, caller);
        let template = NameTemplate::parse("mean_{var}")?;
        let stack = ScopeStack::new(DataScope::new(table.clone()), caller.clone());
        let names = build_names(&template, &quosures, &stack)?;
        let outputs: Vec<(String, Expr)> = names
            .into_iter()
            .zip(quosures.iter())
            .map(|(name, quosure): (String, &Quosure)| {
                let body = embrace(
                    &parse_expr("mean(measure)").expect("parse"),
                    "measure",
                    quosure,
                );
                (name, body)
            })
            .collect();
        summarise(table, &[group.to_string()], &outputs, caller)
    }

    #[test]
    fn captured_measures_tunnel_into_grouped_summaries() {
        let table = gapminder();
        let caller = caller_env();
        let result = summarise_means(
            &table,
            "year",
            vec![parse_expr("pop").expect("parse")],
            &caller,
        )
        .expect("summarise");
        assert_eq!(result.column_names(), vec!["year", "mean_pop"]);
        assert_eq!(
            result.column("mean_pop").expect("mean_pop").values.as_ref(),
            &vec![Value::Float(250.0), Value::Float(60.0)]
        );
    }

    #[test]
    fn spread_placeholder_feeds_variadic_calls() {
        let table = gapminder();
        let caller = caller_env();
        let quosures = capture_all(
            vec![
                parse_expr("pop").expect("parse"),
                parse_expr("pop").expect("parse"),
            ],
            &caller,
        );
        let body = embrace_spread(&parse_expr("sum(dots)").expect("parse"), "dots", &quosures);
        // Two columns into a one-column sum: the arity error surfaces at
        // evaluation, not at substitution.
        let body = body.expect("spread");
        let stack = ScopeStack::new(DataScope::new(table), caller);
        let err = evaluate(&body, &stack).expect_err("should fail");
        assert!(matches!(err, EvalError::ArityMismatch { .. }));
    }
}
