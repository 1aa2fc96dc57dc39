use crate::runtime::quosure::Quosure;
use std::fmt;

/// Which scope an identifier is forced to resolve against. `Default`
/// follows the stack order (data first, then enclosing environments);
/// the pronouns pin resolution to a single scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pronoun {
    Default,
    Data,
    Env,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LiteralValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

/// One segment of a string template: literal text, an unbound placeholder
/// awaiting substitution, or a quosure spliced in by the embrace engine.
#[derive(Clone, Debug, PartialEq)]
pub enum TemplateSegment {
    Text(String),
    Placeholder(String),
    Spliced(Quosure),
}

/// The expression tree everything else operates on. Immutable once built.
///
/// `Splice` never comes out of the parser; it is produced by the embrace
/// engine and carries the scope a substituted subtree must resolve under.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Identifier { name: String, pronoun: Pronoun },
    Literal(LiteralValue),
    Call { func: String, args: Vec<Expr> },
    StringTemplate(Vec<TemplateSegment>),
    Splice(Quosure),
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Expr {
        Expr::Identifier {
            name: name.into(),
            pronoun: Pronoun::Default,
        }
    }

    pub fn data_pronoun(name: impl Into<String>) -> Expr {
        Expr::Identifier {
            name: name.into(),
            pronoun: Pronoun::Data,
        }
    }

    pub fn env_pronoun(name: impl Into<String>) -> Expr {
        Expr::Identifier {
            name: name.into(),
            pronoun: Pronoun::Env,
        }
    }

    pub fn int(value: i64) -> Expr {
        Expr::Literal(LiteralValue::Int(value))
    }

    pub fn float(value: f64) -> Expr {
        Expr::Literal(LiteralValue::Float(value))
    }

    pub fn str(value: impl Into<String>) -> Expr {
        Expr::Literal(LiteralValue::Str(value.into()))
    }

    pub fn call(func: impl Into<String>, args: Vec<Expr>) -> Expr {
        Expr::Call {
            func: func.into(),
            args,
        }
    }

    /// The written form of the expression, used by the dynamic name
    /// builder and for display. Infix operators are rendered back as
    /// infix, parenthesized where precedence demands it.
    pub fn source_text(&self) -> String {
        self.render(0)
    }

    fn render(&self, parent_prec: u8) -> String {
        match self {
            Expr::Identifier { name, pronoun } => match pronoun {
                Pronoun::Default => name.clone(),
                Pronoun::Data => format!(".data${}", name),
                Pronoun::Env => format!(".env${}", name),
            },
            Expr::Literal(value) => match value {
                LiteralValue::Int(v) => v.to_string(),
                LiteralValue::Float(v) => v.to_string(),
                LiteralValue::Bool(v) => v.to_string(),
                LiteralValue::Str(v) => format!("\"{}\"", v),
            },
            Expr::Call { func, args } => {
                if let Some(prec) = infix_precedence(func) {
                    if args.len() == 2 {
                        let rendered = format!(
                            "{} {} {}",
                            args[0].render(prec),
                            func,
                            args[1].render(prec + 1)
                        );
                        return if prec < parent_prec {
                            format!("({})", rendered)
                        } else {
                            rendered
                        };
                    }
                }
                let rendered: Vec<String> = args.iter().map(|arg| arg.render(0)).collect();
                format!("{}({})", func, rendered.join(", "))
            }
            Expr::StringTemplate(segments) => {
                let mut out = String::from("\"");
                for segment in segments {
                    match segment {
                        TemplateSegment::Text(text) => out.push_str(text),
                        TemplateSegment::Placeholder(name) => {
                            out.push('{');
                            out.push_str(name);
                            out.push('}');
                        }
                        TemplateSegment::Spliced(quosure) => {
                            out.push('{');
                            out.push_str(&quosure.source_text());
                            out.push('}');
                        }
                    }
                }
                out.push('"');
                out
            }
            Expr::Splice(quosure) => quosure.expr().render(parent_prec),
        }
    }
}

fn infix_precedence(func: &str) -> Option<u8> {
    match func {
        "==" | "<" | ">" | "<=" | ">=" => Some(1),
        "+" | "-" => Some(2),
        "*" | "/" => Some(3),
        _ => None,
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source_text())
    }
}
