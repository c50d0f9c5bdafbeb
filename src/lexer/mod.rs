//! Handwritten lexer shared by the task, worker and agent dialects.
//!
//! The lexer knows nothing about dialects: it produces the same token stream
//! for every file and leaves vocabulary restrictions to the parser. Comments
//! are emitted as [`TokenKind::Comment`] tokens so tooling can see them; the
//! parser skips them.

use crate::error::{PsykerError, Result, SourceSpan};
use crate::token::{Token, TokenKind};
use std::path::Path;
use tracing::debug;


/// Single words promoted to [`TokenKind::Keyword`].
pub const KEYWORDS: &[&str] = &[
    "task", "agent", "worker", "allow", "use", "count", "sandbox", "cwd", "agents", "workers",
];

/// Dotted operation names promoted to [`TokenKind::Keyword`].
pub const DOTTED_KEYWORDS: &[&str] = &["fs.open", "fs.create", "exec.ps", "exec.cmd"];

/// Words that may start a dotted keyword.
const DOTTED_BASES: &[&str] = &["fs", "exec"];

/// Tokenize source text. The returned sequence always ends with an EOF token.
pub fn tokenize(source: &str, path: Option<&Path>) -> Result<Vec<Token>> {
    Lexer::new(source, path).tokenize()
}

/// Read a file as UTF-8 and tokenize it.
pub fn tokenize_file(path: &Path) -> Result<Vec<Token>> {
    let source = std::fs::read_to_string(path).map_err(|e| {
        PsykerError::general(format!(
            "failed to read source file '{}': {}",
            path.display(),
            e
        ))
        .with_hint("Check that the file exists and is UTF-8 text.")
    })?;
    let tokens = tokenize(&source, Some(path))?;
    debug!(path = %path.display(), tokens = tokens.len(), "tokenized source file");
    Ok(tokens)
}

struct Lexer<'a> {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    path: Option<&'a Path>,
}

impl<'a> Lexer<'a> {
    fn new(source: &str, path: Option<&'a Path>) -> Self {
        Self {
            input: source.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            path,
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.current() {
            match ch {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance();
                }
                '#' => tokens.push(self.lex_comment()),
                '"' => tokens.push(self.lex_string()?),
                '@' => tokens.push(self.lex_directive()?),
                c if TokenKind::symbol(c).is_some() => {
                    if let Some(kind) = TokenKind::symbol(c) {
                        tokens.push(Token::new(kind, c.to_string(), self.line, self.column));
                    }
                    self.advance();
                }
                c if is_ident_start(c) => tokens.push(self.lex_word()?),
                c if c.is_ascii_digit() => tokens.push(self.lex_number()),
                c if is_path_start(c) => {
                    let (line, column) = (self.line, self.column);
                    let value = self.consume_path(String::new());
                    tokens.push(Token::new(TokenKind::Path, value, line, column));
                }
                other => {
                    return Err(PsykerError::syntax(format!("Unexpected character '{}'", other))
                        .at(self.span_here())
                        .with_hint("Check token spelling and punctuation."));
                }
            }
        }

        tokens.push(Token::new(TokenKind::Eof, "", self.line, self.column));
        Ok(tokens)
    }

    fn lex_comment(&mut self) -> Token {
        let (line, column) = (self.line, self.column);
        let mut content = String::new();
        while let Some(ch) = self.current() {
            if ch == '\n' {
                break;
            }
            content.push(self.advance());
        }
        Token::new(TokenKind::Comment, content, line, column)
    }

    fn lex_string(&mut self) -> Result<Token> {
        let (line, column) = (self.line, self.column);
        let start = SourceSpan::new(self.path, line, column);
        self.advance(); // opening quote

        let mut value = String::new();
        loop {
            match self.current() {
                None => return Err(unterminated_string(start)),
                Some('\n') => return Err(newline_in_string(start)),
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.current() {
                        None => return Err(unterminated_string(start)),
                        Some('\n') => return Err(newline_in_string(start)),
                        Some(escaped @ ('"' | '\\')) => {
                            value.push(escaped);
                            self.advance();
                        }
                        Some(other) => {
                            // Not an escape we know: keep the backslash so
                            // Windows paths and shell commands survive.
                            value.push('\\');
                            value.push(other);
                            self.advance();
                        }
                    }
                }
                Some(_) => value.push(self.advance()),
            }
        }

        Ok(Token::new(TokenKind::String, value, line, column))
    }

    fn lex_directive(&mut self) -> Result<Token> {
        let (line, column) = (self.line, self.column);
        let mut value = String::new();
        value.push(self.advance());
        while self
            .current()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '-')
        {
            value.push(self.advance());
        }

        if value == "@access" {
            return Ok(Token::new(TokenKind::AtAccess, value, line, column));
        }

        Err(PsykerError::syntax(format!("Unknown directive '{}'", value))
            .at(SourceSpan::new(self.path, line, column))
            .with_hint("Use @access."))
    }

    fn lex_word(&mut self) -> Result<Token> {
        let (line, column) = (self.line, self.column);
        let mut value = String::new();
        while self.current().is_some_and(is_ident_part) {
            value.push(self.advance());
        }

        if self.current() == Some('.') && DOTTED_BASES.contains(&value.as_str()) {
            value.push(self.advance());
            if !self.current().is_some_and(is_ident_start) {
                return Err(PsykerError::syntax(format!("Invalid dotted keyword '{}'", value))
                    .at(SourceSpan::new(self.path, line, column))
                    .with_hint("Expected operation name after '.'."));
            }
            while self.current().is_some_and(is_ident_part) {
                value.push(self.advance());
            }
            let kind = if DOTTED_KEYWORDS.contains(&value.as_str()) {
                TokenKind::Keyword
            } else {
                TokenKind::Ident
            };
            return Ok(Token::new(kind, value, line, column));
        }

        if matches!(self.current(), Some('/' | '\\' | '.')) {
            let value = self.consume_path(value);
            return Ok(Token::new(TokenKind::Path, value, line, column));
        }

        let kind = if KEYWORDS.contains(&value.as_str()) {
            TokenKind::Keyword
        } else {
            TokenKind::Ident
        };
        Ok(Token::new(kind, value, line, column))
    }

    fn lex_number(&mut self) -> Token {
        let (line, column) = (self.line, self.column);
        let mut value = String::new();
        while self.current().is_some_and(|c| c.is_ascii_digit()) {
            value.push(self.advance());
        }

        if self.current().is_some_and(|c| c != ':' && is_path_part(c)) {
            let value = self.consume_path(value);
            return Token::new(TokenKind::Path, value, line, column);
        }

        Token::new(TokenKind::Int, value, line, column)
    }

    fn consume_path(&mut self, mut value: String) -> String {
        while self.current().is_some_and(is_path_part) {
            value.push(self.advance());
        }
        value
    }

    fn span_here(&self) -> SourceSpan {
        SourceSpan::new(self.path, self.line, self.column)
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn advance(&mut self) -> char {
        let ch = self.input[self.position];
        self.position += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        ch
    }
}

fn unterminated_string(span: SourceSpan) -> PsykerError {
    PsykerError::syntax("Unterminated string literal")
        .at(span)
        .with_hint("Close the string with a double quote.")
}

fn newline_in_string(span: SourceSpan) -> PsykerError {
    PsykerError::syntax("Newline in string literal")
        .at(span)
        .with_hint("Strings cannot contain raw newlines.")
}

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic()
}

fn is_ident_part(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '-'
}

fn is_path_start(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.' | '/' | '\\' | ':')
}

fn is_path_part(ch: char) -> bool {
    is_path_start(ch)
}
