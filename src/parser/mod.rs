//! Dialect-aware recursive descent parser.
//!
//! One parser serves all three dialects. It looks one token ahead, skipping
//! comment tokens, and consults the dialect's [`Grammar`] at every definition
//! header and statement start so a construct from the wrong file type fails
//! with a `DialectError` at the first foreign keyword.

mod dialect;

pub use dialect::{Dialect, Grammar};

use crate::ast::{
    AccessBlock, AgentDef, AgentDocument, AgentUse, Capability, Document, TaskDef, TaskDocument,
    TaskStmt, WorkerAllow, WorkerDef, WorkerDocument,
};
use crate::error::{PsykerError, Result, SourceSpan};
use crate::lexer;
use crate::token::{Token, TokenKind};
use std::path::Path;
use tracing::debug;


/// Parse an already tokenized file in the given dialect.
pub fn parse(tokens: Vec<Token>, dialect: Dialect, path: Option<&Path>) -> Result<Document> {
    Parser::new(tokens, path).parse(dialect)
}

/// Tokenize and parse source text.
pub fn parse_source(source: &str, dialect: Dialect, path: Option<&Path>) -> Result<Document> {
    let tokens = lexer::tokenize(source, path)?;
    parse(tokens, dialect, path)
}

/// Select the dialect from the file extension, then read and parse the file.
///
/// The extension is checked before the file is opened, so an unsupported
/// file fails with a `DialectError` even if it does not exist.
pub fn parse_path(path: &Path) -> Result<Document> {
    let dialect = Dialect::from_path(path)?;
    let tokens = lexer::tokenize_file(path)?;
    let document = parse(tokens, dialect, Some(path))?;
    debug!(
        path = %path.display(),
        %dialect,
        names = ?document.declared_names(),
        "parsed document"
    );
    Ok(document)
}

/// Recursive descent parser over a token sequence.
pub struct Parser<'a> {
    tokens: Vec<Token>,
    index: usize,
    path: Option<&'a Path>,
}

impl<'a> Parser<'a> {
    pub fn new(mut tokens: Vec<Token>, path: Option<&'a Path>) -> Self {
        if !tokens.last().is_some_and(|t| t.is(TokenKind::Eof)) {
            let (line, column) = tokens.last().map_or((1, 1), |t| (t.line, t.column));
            tokens.push(Token::new(TokenKind::Eof, "", line, column));
        }
        Self {
            tokens,
            index: 0,
            path,
        }
    }

    pub fn parse(mut self, dialect: Dialect) -> Result<Document> {
        match dialect {
            Dialect::Task => self.parse_task_file().map(Document::Tasks),
            Dialect::Worker => self.parse_worker_file().map(Document::Worker),
            Dialect::Agent => self.parse_agent_file().map(Document::Agent),
        }
    }

    /// `([@access {...}] task <ident> { stmt* })*`
    pub fn parse_task_file(&mut self) -> Result<TaskDocument> {
        let mut tasks = Vec::new();
        while !self.peek().is(TokenKind::Eof) {
            self.reject_foreign(Dialect::Task, false)?;
            tasks.push(self.parse_task_def()?);
        }
        Ok(TaskDocument { tasks })
    }

    /// Exactly one `worker <ident> { ... }` followed by end of file.
    pub fn parse_worker_file(&mut self) -> Result<WorkerDocument> {
        self.reject_foreign(Dialect::Worker, false)?;
        let worker = self.parse_worker_def()?;
        self.expect_end(Dialect::Worker)?;
        Ok(WorkerDocument { worker })
    }

    /// Exactly one `agent <ident> { ... }` followed by end of file.
    pub fn parse_agent_file(&mut self) -> Result<AgentDocument> {
        self.reject_foreign(Dialect::Agent, false)?;
        let agent = self.parse_agent_def()?;
        self.expect_end(Dialect::Agent)?;
        Ok(AgentDocument { agent })
    }

    fn parse_task_def(&mut self) -> Result<TaskDef> {
        let access = if self.match_kind(TokenKind::AtAccess) {
            let block = self.parse_access_block()?;
            self.reject_foreign(Dialect::Task, false)?;
            Some(block)
        } else {
            None
        };

        self.expect_keyword("task")?;
        let name = self.expect_ident()?;
        self.expect(TokenKind::LeftBrace)?;

        let mut statements = Vec::new();
        while !self.match_kind(TokenKind::RightBrace) {
            self.expect_not_end(TokenKind::RightBrace)?;
            self.reject_foreign(Dialect::Task, true)?;
            statements.push(self.parse_task_stmt()?);
        }

        Ok(TaskDef {
            name: name.value,
            access,
            statements,
            source_path: self.path.map(Path::to_path_buf),
        })
    }

    /// `{ [agents|workers : [ident, ...]] [, <other field>] }`
    fn parse_access_block(&mut self) -> Result<AccessBlock> {
        self.expect(TokenKind::LeftBrace)?;
        let mut access = AccessBlock::default();
        let mut seen: Option<String> = None;

        if !self.peek().is(TokenKind::RightBrace) {
            loop {
                let field = self.expect_keyword_any(&["agents", "workers"])?;
                if seen.as_deref() == Some(field.value.as_str()) {
                    return Err(PsykerError::syntax(format!(
                        "Duplicate access field '{}'",
                        field.value
                    ))
                    .at(self.span_of(&field))
                    .with_hint("Provide each access field once."));
                }
                self.expect(TokenKind::Colon)?;
                let names = self.parse_ident_list()?;
                if field.value == "agents" {
                    access.agents = names;
                } else {
                    access.workers = names;
                }

                if seen.is_some() || !self.match_kind(TokenKind::Comma) {
                    break;
                }
                seen = Some(field.value);
            }
        }

        self.expect(TokenKind::RightBrace)?;
        Ok(access)
    }

    fn parse_ident_list(&mut self) -> Result<Vec<String>> {
        self.expect(TokenKind::LeftBracket)?;
        let mut names = Vec::new();
        if !self.peek().is(TokenKind::RightBracket) {
            names.push(self.expect_ident()?.value);
            while self.match_kind(TokenKind::Comma) {
                names.push(self.expect_ident()?.value);
            }
        }
        self.expect(TokenKind::RightBracket)?;
        Ok(names)
    }

    fn parse_task_stmt(&mut self) -> Result<TaskStmt> {
        let op_names: Vec<&str> = Capability::ALL.iter().map(|c| c.as_str()).collect();
        let op_token = self.expect_keyword_any(&op_names)?;
        let op = self.capability_of(&op_token)?;
        let arg = self.expect_path_or_string()?;
        self.expect(TokenKind::Semicolon)?;

        Ok(TaskStmt {
            op,
            arg: arg.value,
            line: op_token.line,
            column: op_token.column,
        })
    }

    fn parse_worker_def(&mut self) -> Result<WorkerDef> {
        self.expect_keyword("worker")?;
        let name = self.expect_ident()?;
        self.expect(TokenKind::LeftBrace)?;

        let mut worker = WorkerDef {
            name: name.value,
            sandbox: None,
            cwd: None,
            allows: Vec::new(),
            source_path: self.path.map(Path::to_path_buf),
        };

        while !self.match_kind(TokenKind::RightBrace) {
            self.expect_not_end(TokenKind::RightBrace)?;
            self.reject_foreign(Dialect::Worker, true)?;

            let token = self.peek().clone();
            match (token.kind, token.value.as_str()) {
                (TokenKind::Keyword, "sandbox") => {
                    self.advance();
                    worker.sandbox = Some(self.expect_path_or_string()?.value);
                    self.expect(TokenKind::Semicolon)?;
                }
                (TokenKind::Keyword, "cwd") => {
                    self.advance();
                    worker.cwd = Some(self.expect_path_or_string()?.value);
                    self.expect(TokenKind::Semicolon)?;
                }
                (TokenKind::Keyword, "allow") => {
                    self.advance();
                    worker.allows.push(self.parse_allow()?);
                }
                _ => {
                    return Err(PsykerError::syntax(format!(
                        "Unexpected token '{}' in worker definition",
                        describe(&token)
                    ))
                    .at(self.span_of(&token))
                    .with_hint("Expected sandbox, cwd, or allow statement."));
                }
            }
        }

        Ok(worker)
    }

    /// `allow <capability> [<arg>];` with the `allow` keyword already consumed.
    fn parse_allow(&mut self) -> Result<WorkerAllow> {
        let token = self.peek().clone();
        // Unknown dotted names such as `net.http` lex as IDENT or PATH.
        if !matches!(
            token.kind,
            TokenKind::Keyword | TokenKind::Ident | TokenKind::Path
        ) {
            return Err(PsykerError::syntax(format!(
                "Expected capability, got '{}'",
                describe(&token)
            ))
            .at(self.span_of(&token))
            .with_hint("Use fs.open, fs.create, exec.ps, or exec.cmd."));
        }
        let capability = self.capability_of(&token)?;
        self.advance();

        let arg = if matches!(
            self.peek().kind,
            TokenKind::Path | TokenKind::String | TokenKind::Ident
        ) {
            Some(self.advance().value)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon)?;

        Ok(WorkerAllow {
            capability,
            arg,
            line: token.line,
            column: token.column,
        })
    }

    fn parse_agent_def(&mut self) -> Result<AgentDef> {
        self.expect_keyword("agent")?;
        let name = self.expect_ident()?;
        self.expect(TokenKind::LeftBrace)?;

        let mut uses = Vec::new();
        while !self.match_kind(TokenKind::RightBrace) {
            self.expect_not_end(TokenKind::RightBrace)?;
            self.reject_foreign(Dialect::Agent, true)?;
            uses.push(self.parse_agent_use()?);
        }

        Ok(AgentDef {
            name: name.value,
            uses,
            source_path: self.path.map(Path::to_path_buf),
        })
    }

    /// `use worker <ident> count = <int>;`
    fn parse_agent_use(&mut self) -> Result<AgentUse> {
        self.expect_keyword("use")?;
        self.expect_keyword("worker")?;
        let worker = self.expect_ident()?;
        self.expect_keyword("count")?;
        self.expect(TokenKind::Equals)?;
        let count_token = self.expect(TokenKind::Int)?;
        let count = count_token.value.parse::<u32>().map_err(|_| {
            PsykerError::syntax(format!("Worker count '{}' is too large", count_token.value))
                .at(self.span_of(&count_token))
                .with_hint("Use a smaller worker count.")
        })?;
        self.expect(TokenKind::Semicolon)?;

        Ok(AgentUse {
            worker_name: worker.value,
            count,
            line: worker.line,
            column: worker.column,
        })
    }

    fn capability_of(&self, token: &Token) -> Result<Capability> {
        Capability::from_name(&token.value).ok_or_else(|| {
            PsykerError::syntax(format!("Unknown capability '{}'", token.value))
                .at(self.span_of(token))
                .with_hint("Use fs.open, fs.create, exec.ps, or exec.cmd.")
        })
    }

    /// Fail with a `DialectError` if the next token is a keyword owned by
    /// another dialect.
    fn reject_foreign(&self, dialect: Dialect, in_body: bool) -> Result<()> {
        let token = self.peek();
        if !matches!(token.kind, TokenKind::Keyword | TokenKind::AtAccess) {
            return Ok(());
        }
        let grammar = dialect.grammar();
        if !grammar.is_foreign(&token.value) {
            return Ok(());
        }

        let hint = if in_body {
            grammar.body_hint
        } else {
            "Use the correct file extension for this construct."
        };
        Err(PsykerError::dialect(format!(
            "'{}' is not allowed in {}",
            token.value,
            dialect.label()
        ))
        .at(self.span_of(token))
        .with_hint(hint))
    }

    fn expect_end(&self, dialect: Dialect) -> Result<()> {
        let token = self.peek();
        if token.is(TokenKind::Eof) {
            return Ok(());
        }
        Err(PsykerError::syntax(format!(
            "Expected end of file after {} definition, got '{}'",
            dialect,
            describe(token)
        ))
        .at(self.span_of(token))
        .with_hint(format!(
            "{} hold exactly one definition.",
            capitalize(dialect.label())
        )))
    }

    /// Inside a block, running out of tokens means the closing symbol is missing.
    fn expect_not_end(&self, closing: TokenKind) -> Result<()> {
        if self.peek().is(TokenKind::Eof) {
            return Err(self.expected(
                &format!("'{}'", closing.name()),
                "Check punctuation and delimiters.",
            ));
        }
        Ok(())
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.peek().is(kind) {
            return Ok(self.advance());
        }
        let expected = match kind {
            TokenKind::Int => "integer".to_string(),
            _ => format!("'{}'", kind.name()),
        };
        Err(self.expected(&expected, "Check punctuation and delimiters."))
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<Token> {
        let token = self.peek();
        if token.is(TokenKind::Keyword) && token.value == keyword {
            return Ok(self.advance());
        }
        Err(self.expected(&format!("keyword '{}'", keyword), "Check dialect grammar."))
    }

    fn expect_keyword_any(&mut self, keywords: &[&str]) -> Result<Token> {
        let token = self.peek();
        if token.is(TokenKind::Keyword) && keywords.contains(&token.value.as_str()) {
            return Ok(self.advance());
        }

        let mut sorted = keywords.to_vec();
        sorted.sort_unstable();
        Err(PsykerError::syntax(format!(
            "Expected one of: {}. Got '{}'.",
            sorted.join(", "),
            describe(token)
        ))
        .at(self.span_of(token))
        .with_hint("Check the allowed statement keyword."))
    }

    fn expect_ident(&mut self) -> Result<Token> {
        if self.peek().is(TokenKind::Ident) {
            return Ok(self.advance());
        }
        Err(self.expected("identifier", "Use an identifier name."))
    }

    /// A bare path, a quoted string, or a single word used as a relative path.
    fn expect_path_or_string(&mut self) -> Result<Token> {
        if matches!(
            self.peek().kind,
            TokenKind::Path | TokenKind::String | TokenKind::Ident
        ) {
            return Ok(self.advance());
        }
        Err(self.expected("path or string", "Use a bare path or a quoted string."))
    }

    fn expected(&self, expected: &str, hint: &str) -> PsykerError {
        let token = self.peek();
        PsykerError::syntax(format!("Expected {}, got '{}'", expected, describe(token)))
            .at(self.span_of(token))
            .with_hint(hint)
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.peek().is(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_comments(&mut self) {
        while self.tokens[self.index].is(TokenKind::Comment) {
            self.index += 1;
        }
    }

    fn peek(&self) -> &Token {
        let mut index = self.index;
        while self.tokens[index].is(TokenKind::Comment) {
            index += 1;
        }
        &self.tokens[index]
    }

    /// Consume the next non-comment token. The trailing EOF is never consumed.
    fn advance(&mut self) -> Token {
        self.skip_comments();
        let token = self.tokens[self.index].clone();
        if !token.is(TokenKind::Eof) {
            self.index += 1;
        }
        token
    }

    fn span_of(&self, token: &Token) -> SourceSpan {
        SourceSpan::new(self.path, token.line, token.column)
    }
}

fn describe(token: &Token) -> &str {
    if token.is(TokenKind::Eof) {
        "end of file"
    } else {
        &token.value
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
