use crate::language::{
    errors::SyntaxError,
    span::Span,
    token::{Token, TokenKind},
};
use nom::{
    IResult, Parser as NomParser,
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::{alpha1, alphanumeric1, char, digit1},
    combinator::{map, map_res, opt, recognize},
    multi::many0_count,
    sequence::{delimited, pair, preceded},
};

fn lex_identifier(input: &str) -> IResult<&str, TokenKind> {
    let (input, ident) = recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ))
    .parse(input)?;
    let kind = match ident {
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        _ => TokenKind::Identifier(ident.to_string()),
    };
    Ok((input, kind))
}

fn lex_number(input: &str) -> IResult<&str, TokenKind> {
    map_res(
        recognize(pair(digit1, opt(pair(char('.'), digit1)))),
        |text: &str| {
            if text.contains('.') {
                text.parse::<f64>()
                    .map(TokenKind::Float)
                    .map_err(|err| err.to_string())
            } else {
                text.parse::<i64>()
                    .map(TokenKind::Integer)
                    .map_err(|err| err.to_string())
            }
        },
    )
    .parse(input)
}

fn lex_string(input: &str) -> IResult<&str, TokenKind> {
    let (input, text) = delimited(char('"'), opt(is_not("\"")), char('"')).parse(input)?;
    Ok((input, TokenKind::Str(text.unwrap_or("").to_string())))
}

fn lex_pronoun(input: &str) -> IResult<&str, TokenKind> {
    preceded(
        char('.'),
        alt((
            map(tag("data"), |_| TokenKind::DataKw),
            map(tag("env"), |_| TokenKind::EnvKw),
        )),
    )
    .parse(input)
}

fn lex_punctuation(input: &str) -> IResult<&str, TokenKind> {
    alt((
        map(char('$'), |_| TokenKind::Dollar),
        map(tag("=="), |_| TokenKind::EqEq),
        map(char('<'), |_| TokenKind::Lt),
        map(char('>'), |_| TokenKind::Gt),
        map(char('+'), |_| TokenKind::Plus),
        map(char('-'), |_| TokenKind::Minus),
        map(char('*'), |_| TokenKind::Star),
        map(char('/'), |_| TokenKind::Slash),
        map(char(','), |_| TokenKind::Comma),
        map(char('('), |_| TokenKind::LParen),
        map(char(')'), |_| TokenKind::RParen),
    ))
    .parse(input)
}

fn lex_token(input: &str) -> IResult<&str, TokenKind> {
    alt((
        lex_pronoun,
        lex_identifier,
        lex_number,
        lex_string,
        lex_punctuation,
    ))
    .parse(input)
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut tokens = Vec::new();
    let mut rest = source;
    let mut offset = 0usize;

    while !rest.is_empty() {
        let trimmed = rest.trim_start();
        offset += rest.len() - trimmed.len();
        rest = trimmed;
        if rest.is_empty() {
            break;
        }
        match lex_token(rest) {
            Ok((remaining, kind)) => {
                let consumed = rest.len() - remaining.len();
                tokens.push(Token {
                    kind,
                    span: Span::new(offset, offset + consumed),
                });
                offset += consumed;
                rest = remaining;
            }
            Err(_) => {
                let unexpected = rest.chars().next().unwrap_or(' ');
                return Err(SyntaxError::new(
                    format!("Unexpected character `{}`", unexpected),
                    Span::new(offset, offset + unexpected.len_utf8()),
                ));
            }
        }
    }

    Ok(tokens)
}
