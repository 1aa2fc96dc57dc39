use datamask::diagnostics::{emit_syntax_error, report_eval_error};
use datamask::language::parser::parse_expr;
use datamask::runtime::eval::builtins;
use datamask::runtime::scope::{DataScope, Env, ScopeStack};
use datamask::runtime::table::Table;
use datamask::runtime::value::Value;
use datamask::runtime::evaluate;
use std::env;
use std::process::ExitCode;
use std::rc::Rc;

fn demo_table() -> Table {
    let table = Table::new(vec![
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
        (
            "lifeExp".to_string(),
            vec![
                Value::Float(71.2),
                Value::Float(68.9),
                Value::Float(43.1),
                Value::Float(39.5),
            ],
        ),
    ]);
    match table {
        Ok(table) => table,
        Err(err) => {
            report_eval_error(&err);
            std::process::exit(1);
        }
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        eprintln!("Usage: datamask '<expression>'");
        eprintln!("Columns: year, pop, lifeExp. Enclosing bindings: n = 5.");
        eprintln!("Example: datamask 'mean(pop) + .env$n'");
        return ExitCode::FAILURE;
    }

    let source = &args[1];
    let expr = match parse_expr(source) {
        Ok(expr) => expr,
        Err(err) => {
            emit_syntax_error("<argument>", source, err);
            return ExitCode::FAILURE;
        }
    };

    let table = Rc::new(demo_table());
    let env = Env::child(&builtins());
    env.bind("n", Value::Int(5));
    let stack = ScopeStack::new(DataScope::new(table), env);

    match evaluate(&expr, &stack) {
        Ok(value) => {
            println!("{}", value);
            ExitCode::SUCCESS
        }
        Err(err) => {
            report_eval_error(&err);
            ExitCode::FAILURE
        }
    }
}
