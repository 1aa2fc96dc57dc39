use crate::language::ast::{Expr, Pronoun, TemplateSegment};
use crate::runtime::error::{EvalError, EvalResult};
use crate::runtime::quosure::Quosure;

/// Replaces every bare occurrence of `placeholder` in `template` with the
/// quosure, tagged as a `Splice` so the resolver evaluates the subtree
/// under the quosure's recorded scope. The rewrite is structural; the same
/// quosure lands at every occurrence. Pronoun-qualified identifiers are
/// never placeholders.
pub fn embrace(template: &Expr, placeholder: &str, quosure: &Quosure) -> Expr {
    match template {
        Expr::Identifier {
            name,
            pronoun: Pronoun::Default,
        } if name == placeholder => Expr::Splice(quosure.clone()),
        Expr::Identifier { .. } | Expr::Literal(_) | Expr::Splice(_) => template.clone(),
        Expr::Call { func, args } => Expr::Call {
            func: func.clone(),
            args: args
                .iter()
                .map(|arg| embrace(arg, placeholder, quosure))
                .collect(),
        },
        Expr::StringTemplate(segments) => Expr::StringTemplate(
            segments
                .iter()
                .map(|segment| match segment {
                    TemplateSegment::Placeholder(name) if name == placeholder => {
                        TemplateSegment::Spliced(quosure.clone())
                    }
                    other => other.clone(),
                })
                .collect(),
        ),
    }
}

/// Splices a variadic list of quosures into the single call-argument
/// position holding `placeholder`. The placeholder must sit directly in an
/// argument list (a list substitutes a list), and at most one site may
/// consume the list.
pub fn embrace_spread(
    template: &Expr,
    placeholder: &str,
    quosures: &[Quosure],
) -> EvalResult<Expr> {
    let mut sites = 0usize;
    let rewritten = spread_rewrite(template, placeholder, quosures, &mut sites)?;
    Ok(rewritten)
}

fn spread_rewrite(
    expr: &Expr,
    placeholder: &str,
    quosures: &[Quosure],
    sites: &mut usize,
) -> EvalResult<Expr> {
    match expr {
        Expr::Identifier {
            name,
            pronoun: Pronoun::Default,
        } if name == placeholder => {
            // Reached only when the placeholder is not directly a call
            // argument; those are expanded by the Call arm below.
            Err(EvalError::Unsupported {
                message: format!(
                    "spread placeholder `{}` must appear directly in a call argument list",
                    placeholder
                ),
            })
        }
        Expr::Identifier { .. } | Expr::Literal(_) | Expr::Splice(_) => Ok(expr.clone()),
        Expr::Call { func, args } => {
            let mut rewritten = Vec::with_capacity(args.len());
            for arg in args {
                if let Expr::Identifier {
                    name,
                    pronoun: Pronoun::Default,
                } = arg
                {
                    if name == placeholder {
                        *sites += 1;
                        if *sites > 1 {
                            return Err(EvalError::Unsupported {
                                message: format!(
                                    "spread placeholder `{}` consumed at more than one site",
                                    placeholder
                                ),
                            });
                        }
                        rewritten
                            .extend(quosures.iter().map(|quosure| Expr::Splice(quosure.clone())));
                        continue;
                    }
                }
                rewritten.push(spread_rewrite(arg, placeholder, quosures, sites)?);
            }
            Ok(Expr::Call {
                func: func.clone(),
                args: rewritten,
            })
        }
        Expr::StringTemplate(segments) => {
            for segment in segments {
                if matches!(segment, TemplateSegment::Placeholder(name) if name == placeholder) {
                    return Err(EvalError::Unsupported {
                        message: format!(
                            "spread placeholder `{}` cannot appear in a string template",
                            placeholder
                        ),
                    });
                }
            }
            Ok(expr.clone())
        }
    }
}
