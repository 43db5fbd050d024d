use crate::tokens::{Lexer, SpecialChar, Token, ESCAPES};
use crate::types::{self, Expression, MapError};
use regex::Regex;
use std::fmt;

pub type Result<T = Expression> = std::result::Result<T, ParseError>;

#[derive(Debug)]
pub enum ParseError {
    /// Nothing but whitespace and comments. Callers typically ignore this.
    EmptyInput,
    Unbalanced(&'static str),
    UnexpectedCharacter(String),
    UnexpectedToken(char),
    BadEscape { escape: char, literal: String },
    BadInteger(String),
    BadMap(MapError),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::EmptyInput => write!(f, "empty input"),
            ParseError::Unbalanced(what) => write!(f, "unbalanced {}", what),
            ParseError::UnexpectedCharacter(c) => write!(f, "unexpected character '{}'", c),
            ParseError::UnexpectedToken(c) => write!(f, "unexpected '{}'", c),
            ParseError::BadEscape { escape, literal } => {
                write!(f, "unknown escape \\{} in string literal {}", escape, literal)
            }
            ParseError::BadInteger(s) => write!(f, "integer literal {} out of range", s),
            ParseError::BadMap(e) => write!(f, "bad hash-map literal: {}", e),
        }
    }
}

/// Reads the first form in `input`. Anything after it is ignored.
pub fn read_str(input: &str) -> Result {
    let mut lexer = Lexer::new(input);
    if lexer.is_at_end() {
        return Err(ParseError::EmptyInput);
    }
    read_form(&mut lexer)
}

pub fn read_form(lexer: &mut Lexer) -> Result {
    use SpecialChar::*;
    match lexer.peek()? {
        None => Err(ParseError::Unbalanced("input")),
        Some(Token::SpecialChar(OpenRoundBracket)) => {
            lexer.next()?;
            read_list(lexer, CloseRoundBracket).map(Expression::wrap_list)
        }
        Some(Token::SpecialChar(OpenSquareBracket)) => {
            lexer.next()?;
            read_list(lexer, CloseSquareBracket).map(Expression::wrap_vector)
        }
        Some(Token::SpecialChar(OpenBraceBracket)) => {
            lexer.next()?;
            let entries = read_list(lexer, CloseBraceBracket)?;
            types::build_map(entries).map_err(ParseError::BadMap)
        }
        Some(Token::SpecialChar(c)) if c.is_closing() => {
            Err(ParseError::UnexpectedToken(c.as_char()))
        }
        Some(_) => read_atom(lexer),
    }
}

fn read_list(lexer: &mut Lexer, close: SpecialChar) -> Result<Vec<Expression>> {
    let mut elements = Vec::new();
    loop {
        match lexer.peek()? {
            None => return Err(ParseError::Unbalanced("brackets")),
            Some(Token::SpecialChar(c)) if c == close => {
                lexer.next()?;
                break;
            }
            Some(_) => elements.push(read_form(lexer)?),
        }
    }
    Ok(elements)
}

/// Reads the form after a reader macro sigil and wraps it as `(name form)`.
fn expand_reader_macro(lexer: &mut Lexer, name: &str) -> Result {
    let form = read_form(lexer)?;
    Ok(Expression::wrap_list(vec![Expression::new_symbol(name), form]))
}

/// Replaces each escape in the body of a string literal with the character it stands for.
fn unescape(body: &str) -> Result<String> {
    let mut output = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            output.push(c);
            continue;
        }
        let escape = chars
            .next()
            .ok_or(ParseError::Unbalanced("string literal"))?;
        match ESCAPES.get_by_left(&escape) {
            Some(&unescaped) => output.push(unescaped),
            None => {
                return Err(ParseError::BadEscape {
                    escape,
                    literal: format!("\"{}\"", body),
                })
            }
        }
    }
    Ok(output)
}

fn read_atom(lexer: &mut Lexer) -> Result {
    use SpecialChar::*;
    lazy_static! {
        static ref INTEGER_RE: Regex = Regex::new(r"^[-+]?\d+$").unwrap();
    }
    let token = lexer.next()?.ok_or(ParseError::Unbalanced("input"))?;
    match token {
        Token::StringLiteral(body) => unescape(body).map(Expression::String),
        Token::SpliceUnquote => expand_reader_macro(lexer, "splice-unquote"),
        Token::SpecialChar(Quote) => expand_reader_macro(lexer, "quote"),
        Token::SpecialChar(Backtick) => expand_reader_macro(lexer, "quasiquote"),
        Token::SpecialChar(Tilde) => expand_reader_macro(lexer, "unquote"),
        Token::SpecialChar(AtSign) => expand_reader_macro(lexer, "deref"),
        Token::SpecialChar(Caret) => {
            let meta = read_form(lexer)?;
            let value = read_form(lexer)?;
            Ok(Expression::wrap_list(vec![
                Expression::new_symbol("with-meta"),
                value,
                meta,
            ]))
        }
        Token::SpecialChar(c) => Err(ParseError::UnexpectedToken(c.as_char())),
        Token::PlainChars(chars) => match chars {
            "nil" => Ok(Expression::Nil),
            "true" => Ok(Expression::Bool(true)),
            "false" => Ok(Expression::Bool(false)),
            _ if chars.starts_with(':') => Ok(Expression::new_keyword(chars)),
            _ if INTEGER_RE.is_match(chars) => chars
                .parse()
                .map(Expression::Integer)
                .map_err(|_| ParseError::BadInteger(chars.to_string())),
            _ => Ok(Expression::new_symbol(chars)),
        },
    }
}
