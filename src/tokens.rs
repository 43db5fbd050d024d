//! Splits source text into tokens on demand.

use crate::reader::ParseError;
use bimap::BiMap;
use regex::Regex;

#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum SpecialChar {
    OpenSquareBracket,
    CloseSquareBracket,
    OpenBraceBracket,
    CloseBraceBracket,
    OpenRoundBracket,
    CloseRoundBracket,
    Quote,
    Backtick,
    Tilde,
    Caret,
    AtSign,
}

impl SpecialChar {
    pub fn is_closing(self) -> bool {
        use SpecialChar::*;
        matches!(
            self,
            CloseSquareBracket | CloseBraceBracket | CloseRoundBracket
        )
    }

    pub fn as_char(self) -> char {
        use SpecialChar::*;
        match self {
            OpenSquareBracket => '[',
            CloseSquareBracket => ']',
            OpenBraceBracket => '{',
            CloseBraceBracket => '}',
            OpenRoundBracket => '(',
            CloseRoundBracket => ')',
            Quote => '\'',
            Backtick => '`',
            Tilde => '~',
            Caret => '^',
            AtSign => '@',
        }
    }
}

#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum Token<'a> {
    SpliceUnquote,
    SpecialChar(SpecialChar),
    /// The text between the quotes, escapes still in place.
    StringLiteral(&'a str),
    PlainChars(&'a str),
}

lazy_static! {
    /// The letter after a backslash in a string literal, paired with the character it stands for.
    pub(crate) static ref ESCAPES: BiMap<char, char> = {
        let mut escapes = BiMap::new();
        escapes.insert('\\', '\\');
        escapes.insert('"', '"');
        escapes.insert('n', '\n');
        escapes
    };
    static ref TRIVIA_RE: Regex = Regex::new(
        r#"(?x)
            ^(?:
                [\s,]+                       # whitespace or commas
                |;[^\n]*                     # comments run to the end of the line
            )+
        "#
    )
    .unwrap();
    static ref TOKEN_RE: Regex = Regex::new(
        r#"(?x)
            ^(?:
                ~@                           # literal splice-unquote
                |[\[\]{}()'`~^@]             # single special characters
                |"(?:                        # string literal. its contents include:
                    \\.                      #    escapes
                    |[^\\"]                  #    anything which isn't a backslash or a quote
                  )*
                  "?                         #    possibly missing a closing quote
                |[^\s\[\]{}('"`,;)]+         # one or more plain characters
            )
        "#
    )
    .unwrap();
}

fn create_token(captured: &str) -> Result<Token, ParseError> {
    use SpecialChar::*;
    let bytes = captured.as_bytes();
    let first_char = bytes
        .first()
        .ok_or_else(|| ParseError::UnexpectedCharacter(String::new()))?;
    match first_char {
        b'~' => match bytes.get(1) {
            Some(b'@') => Ok(Token::SpliceUnquote),
            _ => Ok(Token::SpecialChar(Tilde)),
        },
        b'[' => Ok(Token::SpecialChar(OpenSquareBracket)),
        b'{' => Ok(Token::SpecialChar(OpenBraceBracket)),
        b'(' => Ok(Token::SpecialChar(OpenRoundBracket)),
        b']' => Ok(Token::SpecialChar(CloseSquareBracket)),
        b'}' => Ok(Token::SpecialChar(CloseBraceBracket)),
        b')' => Ok(Token::SpecialChar(CloseRoundBracket)),
        b'\'' => Ok(Token::SpecialChar(Quote)),
        b'`' => Ok(Token::SpecialChar(Backtick)),
        b'^' => Ok(Token::SpecialChar(Caret)),
        b'@' => Ok(Token::SpecialChar(AtSign)),
        b'"' => tokenize_string_literal(captured),
        _ => Ok(Token::PlainChars(captured)),
    }
}

fn tokenize_string_literal(captured: &str) -> Result<Token, ParseError> {
    let bytes = captured.as_bytes();
    if bytes.len() == 1 || bytes[bytes.len() - 1] != b'"' {
        return Err(ParseError::Unbalanced("string literal"));
    }

    // A closing quote preceded by an odd run of backslashes is itself escaped.
    let trailing_backslashes = bytes
        .iter()
        .rev()
        .skip(1)
        .take_while(|&&byte| byte == b'\\')
        .count();
    if trailing_backslashes % 2 == 1 {
        return Err(ParseError::Unbalanced("string literal"));
    }

    // Quotes are ASCII, so slicing them off keeps us on char boundaries.
    Ok(Token::StringLiteral(&captured[1..captured.len() - 1]))
}

/// A lazy token stream over one piece of input with single-token lookahead.
pub struct Lexer<'a> {
    remaining: &'a str,
    peeked: Option<Token<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            remaining: input,
            peeked: None,
        }
    }

    fn skip_trivia(&mut self) {
        if let Some(m) = TRIVIA_RE.find(self.remaining) {
            self.remaining = &self.remaining[m.end()..];
        }
    }

    fn scan(&mut self) -> Result<Option<Token<'a>>, ParseError> {
        self.skip_trivia();
        if self.remaining.is_empty() {
            return Ok(None);
        }
        let remaining = self.remaining;
        let m = TOKEN_RE.find(remaining).ok_or_else(|| {
            ParseError::UnexpectedCharacter(remaining.chars().take(1).collect())
        })?;
        self.remaining = &remaining[m.end()..];
        let token = create_token(m.as_str())?;
        log::trace!("token {:?}", token);
        Ok(Some(token))
    }

    /// Looks at the next token without consuming it.
    pub fn peek(&mut self) -> Result<Option<Token<'a>>, ParseError> {
        if self.peeked.is_none() {
            self.peeked = self.scan()?;
        }
        Ok(self.peeked)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Option<Token<'a>>, ParseError> {
        match self.peeked.take() {
            Some(token) => Ok(Some(token)),
            None => self.scan(),
        }
    }

    pub fn is_at_end(&mut self) -> bool {
        if self.peeked.is_some() {
            return false;
        }
        self.skip_trivia();
        self.remaining.is_empty()
    }
}
