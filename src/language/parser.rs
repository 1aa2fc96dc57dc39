use crate::language::{
    ast::{Expr, LiteralValue, Pronoun},
    errors::SyntaxError,
    lexer::tokenize,
    span::Span,
    token::{Token, TokenKind},
};

/// Parses a single expression. Binary operators are desugared into `Call`
/// nodes so the evaluator has one code path for function application.
pub fn parse_expr(source: &str) -> Result<Expr, SyntaxError> {
    let tokens = tokenize(source)?;
    let mut parser = ExprParser {
        tokens: &tokens,
        pos: 0,
        end: source.len(),
    };
    let expr = parser.expression()?;
    if let Some(token) = parser.peek() {
        return Err(SyntaxError::new(
            format!("Unexpected {} after expression", token.kind.describe()),
            token.span,
        ));
    }
    Ok(expr)
}

struct ExprParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    end: usize,
}

impl<'a> ExprParser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn end_span(&self) -> Span {
        Span::new(self.end, self.end)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Span, SyntaxError> {
        match self.peek().cloned() {
            Some(token) if token.kind == kind => {
                self.pos += 1;
                Ok(token.span)
            }
            Some(token) => Err(SyntaxError::new(
                format!("Expected {} but found {}", what, token.kind.describe()),
                token.span,
            )),
            None => Err(SyntaxError::new(
                format!("Expected {} but the expression ended", what),
                self.end_span(),
            )),
        }
    }

    fn expression(&mut self) -> Result<Expr, SyntaxError> {
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.additive()?;
        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::EqEq) => "==",
                Some(TokenKind::Lt) => "<",
                Some(TokenKind::Gt) => ">",
                _ => break,
            };
            self.pos += 1;
            let rhs = self.additive()?;
            lhs = Expr::call(op, vec![lhs, rhs]);
        }
        Ok(lhs)
    }

    fn additive(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Plus) => "+",
                Some(TokenKind::Minus) => "-",
                _ => break,
            };
            self.pos += 1;
            let rhs = self.multiplicative()?;
            lhs = Expr::call(op, vec![lhs, rhs]);
        }
        Ok(lhs)
    }

    fn multiplicative(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.primary()?;
        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Star) => "*",
                Some(TokenKind::Slash) => "/",
                _ => break,
            };
            self.pos += 1;
            let rhs = self.primary()?;
            lhs = Expr::call(op, vec![lhs, rhs]);
        }
        Ok(lhs)
    }

    fn primary(&mut self) -> Result<Expr, SyntaxError> {
        let token = match self.peek().cloned() {
            Some(token) => {
                self.pos += 1;
                token
            }
            None => {
                return Err(SyntaxError::new(
                    "Expected an expression but the input ended",
                    self.end_span(),
                ));
            }
        };
        match token.kind {
            TokenKind::Integer(value) => Ok(Expr::Literal(LiteralValue::Int(value))),
            TokenKind::Float(value) => Ok(Expr::Literal(LiteralValue::Float(value))),
            TokenKind::Str(value) => Ok(Expr::Literal(LiteralValue::Str(value))),
            TokenKind::True => Ok(Expr::Literal(LiteralValue::Bool(true))),
            TokenKind::False => Ok(Expr::Literal(LiteralValue::Bool(false))),
            TokenKind::Minus => self.negative_literal(token.span),
            TokenKind::Identifier(name) => {
                if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::LParen)) {
                    self.pos += 1;
                    let args = self.call_arguments()?;
                    Ok(Expr::call(name, args))
                } else {
                    Ok(Expr::ident(name))
                }
            }
            TokenKind::DataKw => self.pronoun_access(Pronoun::Data, token.span),
            TokenKind::EnvKw => self.pronoun_access(Pronoun::Env, token.span),
            TokenKind::LParen => {
                let expr = self.expression()?;
                self.expect(TokenKind::RParen, "`)`")?;
                Ok(expr)
            }
            other => Err(SyntaxError::new(
                format!("Unexpected {}", other.describe()),
                token.span,
            )),
        }
    }

    fn negative_literal(&mut self, minus_span: Span) -> Result<Expr, SyntaxError> {
        match self.bump().cloned() {
            Some(Token {
                kind: TokenKind::Integer(value),
                ..
            }) => Ok(Expr::Literal(LiteralValue::Int(-value))),
            Some(Token {
                kind: TokenKind::Float(value),
                ..
            }) => Ok(Expr::Literal(LiteralValue::Float(-value))),
            Some(token) => Err(SyntaxError::new(
                format!("Expected a number after `-` but found {}", token.kind.describe()),
                token.span,
            )),
            None => Err(SyntaxError::new(
                "Expected a number after `-`",
                minus_span,
            )),
        }
    }

    fn pronoun_access(&mut self, pronoun: Pronoun, start: Span) -> Result<Expr, SyntaxError> {
        let keyword = match pronoun {
            Pronoun::Data => ".data",
            _ => ".env",
        };
        self.expect(TokenKind::Dollar, "`$`").map_err(|err| {
            err.with_help(format!("write `{}$column` to force the lookup", keyword))
        })?;
        match self.bump().cloned() {
            Some(Token {
                kind: TokenKind::Identifier(name),
                ..
            }) => Ok(Expr::Identifier { name, pronoun }),
            Some(token) => Err(SyntaxError::new(
                format!(
                    "Expected a name after `{}$` but found {}",
                    keyword,
                    token.kind.describe()
                ),
                token.span,
            )),
            None => Err(SyntaxError::new(
                format!("Expected a name after `{}$`", keyword),
                start,
            )),
        }
    }

    fn call_arguments(&mut self) -> Result<Vec<Expr>, SyntaxError> {
        let mut args = Vec::new();
        if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::RParen)) {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            match self.peek().map(|t| t.kind.clone()) {
                Some(TokenKind::Comma) => {
                    self.pos += 1;
                }
                Some(TokenKind::RParen) => {
                    self.pos += 1;
                    return Ok(args);
                }
                Some(kind) => {
                    let span = self.peek().map(|t| t.span).unwrap_or_else(|| self.end_span());
                    return Err(SyntaxError::new(
                        format!("Expected `,` or `)` but found {}", kind.describe()),
                        span,
                    ));
                }
                None => {
                    return Err(SyntaxError::new(
                        "Unclosed call: expected `,` or `)`",
                        self.end_span(),
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_call_and_operator_precedence() {
        let expr = parse_expr("mean(pop) + n * 2").expect("parse");
        assert_eq!(
            expr,
            Expr::call(
                "+",
                vec![
                    Expr::call("mean", vec![Expr::ident("pop")]),
                    Expr::call("*", vec![Expr::ident("n"), Expr::int(2)]),
                ]
            )
        );
    }

    #[test]
    fn parses_pronoun_access() {
        let expr = parse_expr(".data$pop + .env$n").expect("parse");
        assert_eq!(
            expr,
            Expr::call("+", vec![Expr::data_pronoun("pop"), Expr::env_pronoun("n")])
        );
    }

    #[test]
    fn parses_comparisons_below_arithmetic() {
        let expr = parse_expr("pop + 1 > 100").expect("parse");
        assert_eq!(
            expr,
            Expr::call(
                ">",
                vec![
                    Expr::call("+", vec![Expr::ident("pop"), Expr::int(1)]),
                    Expr::int(100),
                ]
            )
        );
    }

    #[test]
    fn parses_parenthesized_groups() {
        let expr = parse_expr("(a + b) * c").expect("parse");
        assert_eq!(
            expr,
            Expr::call(
                "*",
                vec![
                    Expr::call("+", vec![Expr::ident("a"), Expr::ident("b")]),
                    Expr::ident("c"),
                ]
            )
        );
    }

    #[test]
    fn parse_round_trips_through_source_text() {
        for source in ["mean(pop) + n", "(a + b) * c", ".env$n - 1", "f(x, y, 2.5)"] {
            let expr = parse_expr(source).expect("parse");
            assert_eq!(expr.source_text(), source);
            assert_eq!(parse_expr(&expr.source_text()).expect("reparse"), expr);
        }
    }

    #[test]
    fn reports_missing_dollar_after_pronoun() {
        let err = parse_expr(".data pop").expect_err("should fail");
        assert!(err.message.contains("Expected `$`"));
        assert!(err.help.is_some());
    }

    #[test]
    fn reports_trailing_tokens() {
        let err = parse_expr("a b").expect_err("should fail");
        assert!(err.message.contains("after expression"));
        assert_eq!(err.span.start, 2);
    }
}
