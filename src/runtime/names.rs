use crate::language::ast::Expr;
use crate::runtime::error::{EvalError, EvalResult};
use crate::runtime::eval::evaluate;
use crate::runtime::quosure::Quosure;
use crate::runtime::scope::ScopeStack;
use crate::runtime::value::Value;

/// How a placeholder turns its quosure into text: the expression as the
/// caller wrote it, or the declared name of the column it evaluates to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameMode {
    SourceText,
    ColumnName,
}

#[derive(Clone, Debug, PartialEq)]
enum NameSegment {
    Text(String),
    Placeholder(String),
}

/// A `"mean_{var}"`-style template for synthesized result identifiers.
/// Doubled braces escape a literal brace.
#[derive(Clone, Debug, PartialEq)]
pub struct NameTemplate {
    segments: Vec<NameSegment>,
    mode: NameMode,
}

impl NameTemplate {
    pub fn parse(template: &str) -> EvalResult<NameTemplate> {
        Self::parse_with_mode(template, NameMode::SourceText)
    }

    pub fn parse_resolved(template: &str) -> EvalResult<NameTemplate> {
        Self::parse_with_mode(template, NameMode::ColumnName)
    }

    fn parse_with_mode(template: &str, mode: NameMode) -> EvalResult<NameTemplate> {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut chars = template.chars().peekable();
        while let Some(ch) = chars.next() {
            match ch {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    text.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    text.push('}');
                }
                '{' => {
                    if !text.is_empty() {
                        segments.push(NameSegment::Text(std::mem::take(&mut text)));
                    }
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(inner) => name.push(inner),
                            None => {
                                return Err(EvalError::Unsupported {
                                    message: format!(
                                        "unclosed placeholder in name template `{}`",
                                        template
                                    ),
                                });
                            }
                        }
                    }
                    if name.is_empty() {
                        return Err(EvalError::Unsupported {
                            message: format!("empty placeholder in name template `{}`", template),
                        });
                    }
                    segments.push(NameSegment::Placeholder(name));
                }
                '}' => {
                    return Err(EvalError::Unsupported {
                        message: format!("stray `}}` in name template `{}`", template),
                    });
                }
                other => text.push(other),
            }
        }
        if !text.is_empty() {
            segments.push(NameSegment::Text(text));
        }
        Ok(NameTemplate { segments, mode })
    }

    fn placeholder_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|segment| matches!(segment, NameSegment::Placeholder(_)))
            .count()
    }
}

/// Produces one identifier from a template holding exactly one placeholder.
pub fn build_name(
    template: &NameTemplate,
    quosure: &Quosure,
    stack: &ScopeStack,
) -> EvalResult<String> {
    if template.placeholder_count() != 1 {
        return Err(EvalError::Unsupported {
            message: format!(
                "name template must contain exactly one placeholder, found {}",
                template.placeholder_count()
            ),
        });
    }
    let mut out = String::new();
    for segment in &template.segments {
        match segment {
            NameSegment::Text(text) => out.push_str(text),
            NameSegment::Placeholder(_) => out.push_str(&placeholder_text(template, quosure, stack)?),
        }
    }
    Ok(out)
}

/// Applies the template independently to each quosure of a spread list,
/// one output name per element, in input order.
pub fn build_names(
    template: &NameTemplate,
    quosures: &[Quosure],
    stack: &ScopeStack,
) -> EvalResult<Vec<String>> {
    quosures
        .iter()
        .map(|quosure| build_name(template, quosure, stack))
        .collect()
}

fn placeholder_text(
    template: &NameTemplate,
    quosure: &Quosure,
    stack: &ScopeStack,
) -> EvalResult<String> {
    match template.mode {
        NameMode::SourceText => Ok(quosure.source_text()),
        NameMode::ColumnName => {
            let value = evaluate(&Expr::Splice(quosure.clone()), stack)?;
            match value {
                Value::Column(column) => column.name.ok_or_else(|| EvalError::TypeMismatch {
                    message: format!(
                        "`{}` evaluates to a derived column with no declared name",
                        quosure.source_text()
                    ),
                }),
                other => Err(EvalError::TypeMismatch {
                    message: format!(
                        "`{}` evaluates to a {}, not a column",
                        quosure.source_text(),
                        other.type_name()
                    ),
                }),
            }
        }
    }
}
