//! Lexer for jobsh command lines.
//!
//! Converts a line into a stream of tokens using the logos lexer generator.
//! Blanks are kept as tokens so the parser can glue adjacent pieces
//! (`foo"bar"'baz'`) into a single word, the way POSIX shells do.
//!
//! # Token Categories
//!
//! - **Operators**: `|`, `&`, `<`, `>`
//! - **Words**: bare text, `\x` escapes, `'single'` and `"double"` quoted strings
//! - **Blanks**: runs of spaces, tabs, and newlines

use logos::{Logos, Span};
use std::fmt;

/// A token with its span in the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub token: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(token: T, span: Span) -> Self {
        Self { token, span }
    }
}

/// Lexer error types.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LexerError {
    #[default]
    UnexpectedCharacter,
    UnterminatedString,
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexerError::UnexpectedCharacter => write!(f, "unexpected character"),
            LexerError::UnterminatedString => write!(f, "unterminated string"),
        }
    }
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(error = LexerError)]
pub enum Token {
    #[regex(r"[ \t\r\n]+")]
    Blank,

    #[token("|")]
    Pipe,

    #[token("&")]
    Amp,

    #[token("<")]
    Lt,

    #[token(">")]
    Gt,

    /// Unquoted text.
    #[regex(r#"[^ \t\r\n|&<>"'\\]+"#, |lex| lex.slice().to_string())]
    Word(String),

    /// Backslash-escaped character outside quotes; value is the character.
    #[regex(r"\\.", |lex| lex.slice()[1..].to_string())]
    Escaped(String),

    /// `'...'`: taken literally, no escapes.
    #[regex(r"'[^']*'?", lex_single_quoted)]
    SingleQuoted(String),

    /// `"..."`: `\"` and `\\` are unescaped, other backslashes kept.
    #[regex(r#""([^"\\]|\\.)*"?"#, lex_double_quoted)]
    DoubleQuoted(String),
}

impl Token {
    /// Whether this token contributes text to a word.
    pub fn is_word_piece(&self) -> bool {
        matches!(
            self,
            Token::Word(_) | Token::Escaped(_) | Token::SingleQuoted(_) | Token::DoubleQuoted(_)
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Blank => write!(f, "BLANK"),
            Token::Pipe => write!(f, "PIPE"),
            Token::Amp => write!(f, "AMP"),
            Token::Lt => write!(f, "LT"),
            Token::Gt => write!(f, "GT"),
            Token::Word(s) => write!(f, "WORD({})", s),
            Token::Escaped(s) => write!(f, "ESCAPED({})", s),
            Token::SingleQuoted(s) => write!(f, "SQUOTE({})", s),
            Token::DoubleQuoted(s) => write!(f, "DQUOTE({})", s),
        }
    }
}

fn lex_single_quoted(lex: &mut logos::Lexer<Token>) -> Result<String, LexerError> {
    let s = lex.slice();
    if s.len() < 2 || !s.ends_with('\'') {
        return Err(LexerError::UnterminatedString);
    }
    Ok(s[1..s.len() - 1].to_string())
}

fn lex_double_quoted(lex: &mut logos::Lexer<Token>) -> Result<String, LexerError> {
    let mut chars = lex.slice()[1..].chars();
    let mut out = String::new();
    while let Some(c) = chars.next() {
        match c {
            '"' => return Ok(out),
            '\\' => match chars.next() {
                Some(esc @ ('"' | '\\')) => out.push(esc),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => break,
            },
            _ => out.push(c),
        }
    }
    Err(LexerError::UnterminatedString)
}

/// Tokenize a command line.
pub fn tokenize(source: &str) -> Result<Vec<Spanned<Token>>, Vec<Spanned<LexerError>>> {
    let lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    for (result, span) in lexer.spanned() {
        match result {
            Ok(token) => tokens.push(Spanned::new(token, span)),
            Err(err) => errors.push(Spanned::new(err, span)),
        }
    }

    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}
