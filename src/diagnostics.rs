use crate::language::errors::SyntaxError;
use crate::runtime::error::EvalError;
use miette::{Diagnostic, NamedSource, Report, SourceSpan};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
pub struct SyntaxDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("here")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
    message: String,
}

impl SyntaxDiagnostic {
    pub fn from_error(src: NamedSource<String>, err: SyntaxError) -> Self {
        Self {
            src,
            span: err.to_source_span(),
            help: err.help.clone(),
            message: err.message,
        }
    }
}

pub fn emit_syntax_error(name: &str, source: &str, err: SyntaxError) {
    let src = NamedSource::new(name, source.to_string());
    let diagnostic = SyntaxDiagnostic::from_error(src, err);
    eprintln!("{:?}", Report::new(diagnostic));
}

pub fn report_eval_error(error: &EvalError) {
    eprintln!("Evaluation error: {}", error);
}
