use chumsky::prelude::*;

use crate::{error::ParseError, prelude::*, term::Term};

#[derive(PartialEq, Eq, Hash, Clone, derive_more::Display, Debug)]
pub enum Token {
    #[display(fmt = "(")]
    LParen,
    #[display(fmt = ")")]
    RParen,
    #[display(fmt = "λ")]
    Lambda,
    #[display(fmt = ".")]
    Dot,
    #[display(fmt = ":")]
    Colon,
    #[display(fmt = "{_0}")]
    Identifier(Identifier),
}

/// A parsed input line.
#[derive(PartialEq, Eq, Clone, derive_more::Display, Debug)]
pub enum Statement {
    #[display(fmt = "{_0}")]
    Expression(Term),
    #[display(fmt = "{_0}: {_1}")]
    Definition(Identifier, Term),
}

pub trait SimpleParser<I: Clone + std::hash::Hash, O>:
    Parser<I, O, Error = Error<I>> + Clone
{
    #[allow(clippy::type_complexity)]
    fn spanned(self) -> chumsky::combinator::MapWithSpan<Self, fn(O, Span) -> Spanned<O>, O>
    where
        Self: Sized,
        I: std::cmp::Eq,
    {
        self.map_with_span(|value, span| Spanned { span, value })
    }
}
impl<I: Clone + std::hash::Hash, O, T> SimpleParser<I, O> for T where
    T: Parser<I, O, Error = Error<I>> + Clone
{
}

fn is_identifier_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')' | 'λ' | '\\' | '.' | ':' | '#')
}

pub fn lexer() -> impl SimpleParser<char, Vec<Spanned<Token>>> {
    let symbols = choice((
        just('(').to(Token::LParen),
        just(')').to(Token::RParen),
        just('.').to(Token::Dot),
        just(':').to(Token::Colon),
        one_of("λ\\").to(Token::Lambda),
    ));
    let word = filter(|c: &char| is_identifier_char(*c))
        .repeated()
        .at_least(1)
        .collect::<String>()
        .map(|word| {
            if word == "lambda" {
                Token::Lambda
            } else {
                Token::Identifier(word.into())
            }
        });
    // `# ...` runs to the end of the line
    let comment = just('#')
        .then(filter(|c: &char| *c != '\n').repeated())
        .to(None::<Spanned<Token>>);
    let token = choice((symbols, word)).spanned().map(Some);
    choice((comment, token))
        .padded()
        .repeated()
        .then_ignore(end())
        .map(|tokens: Vec<Option<Spanned<Token>>>| tokens.into_iter().flatten().collect::<Vec<_>>())
}

fn expression_parser() -> impl SimpleParser<Token, Term> {
    recursive(|expr: Recursive<_, Term, _>| {
        let identifier = select! { Token::Identifier(name) => name };

        // x
        let variable = identifier.map(Term::Var).labelled("variable");

        // (λx.t)
        let abstraction = just(Token::Lambda)
            .ignore_then(identifier.or_not())
            .then(just(Token::Dot).or_not())
            .then(expr.clone().or_not())
            .delimited_by(just(Token::LParen), just(Token::RParen))
            .validate(|((param, dot), body), span, emit| {
                let missing = match (&param, &dot, &body) {
                    (None, _, _) => Some("abstraction is missing a parameter"),
                    (_, None, _) => Some("abstraction is missing `.` after its parameter"),
                    (_, _, None) => Some("abstraction is missing a body"),
                    _ => None,
                };
                if let Some(message) = missing {
                    emit(Error::custom(span, message));
                }
                Term::Abs(
                    param.unwrap_or_else(|| "_".into()),
                    body.unwrap_or_else(|| Term::var("_")).into(),
                )
            })
            .labelled("abstraction");

        // (t t ...)
        let group = expr
            .repeated()
            .delimited_by(just(Token::LParen), just(Token::RParen))
            .validate(|terms, span, emit| {
                let mut terms = terms.into_iter();
                match terms.next() {
                    Some(head) => terms.fold(head, |lhs, rhs| Term::app(lhs, rhs)),
                    None => {
                        emit(Error::custom(span, "empty parenthesized group"));
                        Term::var("_")
                    }
                }
            })
            .labelled("application");

        choice((variable, abstraction, group))
    })
    .labelled("expression")
}

fn definition_parser() -> impl SimpleParser<Token, (Identifier, Term)> {
    select! { Token::Identifier(name) => name }
        .then_ignore(just(Token::Colon))
        .then(expression_parser())
}

fn statement_parser() -> impl SimpleParser<Token, Statement> {
    choice((
        definition_parser().map(|(name, term)| Statement::Definition(name, term)),
        expression_parser().map(Statement::Expression),
    ))
}

/// Parentheses deeper than this are rejected before parsing, since the
/// recursive descent would otherwise run out of stack.
pub const MAX_NESTING: usize = 1000;

fn check_nesting(tokens: &[Spanned<Token>]) -> Result<(), ParseError> {
    let mut depth = 0usize;
    for token in tokens {
        match token.value() {
            Token::LParen => {
                depth += 1;
                if depth > MAX_NESTING {
                    return Err(ParseError::new("expression nested too deeply", token.span()));
                }
            }
            Token::RParen => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

fn parse_full<T>(s: &str, parser: impl SimpleParser<Token, T>) -> Result<T, ParseError> {
    let len = s.chars().count();
    let eoi = Span {
        start: len,
        end: len + 1,
    };
    let tokens = lexer()
        .parse(s)
        .map_err(|es| first_error(es.into_iter().map(|e| e.map(|c| c.to_string())), &eoi))?;
    check_nesting(&tokens)?;
    parser
        .then_ignore(end())
        .parse(chumsky::Stream::from_iter(
            eoi.clone(),
            tokens
                .into_iter()
                .map(|Spanned { span, value }| (value, span)),
        ))
        .map_err(|es| first_error(es.into_iter().map(|e| e.map(|t| t.to_string())), &eoi))
}

fn first_error(mut errors: impl Iterator<Item = Error<String>>, eoi: &Span) -> ParseError {
    errors
        .next()
        .map(ParseError::from)
        .unwrap_or_else(|| ParseError::new("malformed input", eoi.clone()))
}

pub fn parse_expression(s: &str) -> Result<Term, ParseError> {
    parse_full(s, expression_parser())
}

pub fn parse_definition(s: &str) -> Result<(Identifier, Term), ParseError> {
    parse_full(s, definition_parser())
}

pub fn parse_statement(s: &str) -> Result<Statement, ParseError> {
    parse_full(s, statement_parser())
}
