//! Lexical tokens shared by all three dialects.

use std::fmt;

/// Token kinds recognized by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Colon,
    Comma,
    Semicolon,
    Equals,
    /// Double-quoted literal; the value holds the decoded content.
    String,
    /// The `@access` directive.
    AtAccess,
    Keyword,
    Ident,
    Int,
    /// Bare path made of alphanumerics and `_ - . / \ :`.
    Path,
    /// `#` line comment, skipped by the parser.
    Comment,
    Eof,
}

impl TokenKind {
    /// Kind for a single-character symbol, if `ch` is one.
    pub fn symbol(ch: char) -> Option<Self> {
        match ch {
            '{' => Some(Self::LeftBrace),
            '}' => Some(Self::RightBrace),
            '[' => Some(Self::LeftBracket),
            ']' => Some(Self::RightBracket),
            ':' => Some(Self::Colon),
            ',' => Some(Self::Comma),
            ';' => Some(Self::Semicolon),
            '=' => Some(Self::Equals),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::LeftBrace => "{",
            Self::RightBrace => "}",
            Self::LeftBracket => "[",
            Self::RightBracket => "]",
            Self::Colon => ":",
            Self::Comma => ",",
            Self::Semicolon => ";",
            Self::Equals => "=",
            Self::String => "STRING",
            Self::AtAccess => "AT_ACCESS",
            Self::Keyword => "KEYWORD",
            Self::Ident => "IDENT",
            Self::Int => "INT",
            Self::Path => "PATH",
            Self::Comment => "COMMENT",
            Self::Eof => "EOF",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A token with its source text and 1-based position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind,
            value: value.into(),
            line,
            column,
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}
