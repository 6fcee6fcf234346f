//! novac-par - Parser (Syntactic Analyzer)
//!
//! A hand-written recursive-descent parser over the pre-fetched token vector
//! with a current-index cursor. Expressions use precedence climbing in
//! fourteen strata (see `expr.rs`); statements, declarations, patterns,
//! types, and JSX live in their own modules.
//!
//! Error strategy: on a mismatch the parser appends a diagnostic and calls
//! [`Parser::synchronize`], which skips tokens until a statement-starting
//! keyword or the token after a semicolon. Failed productions yield
//! `Expr::Invalid` / `Stmt::Invalid` placeholders so one parse can report
//! many errors and still hand a structurally valid tree downstream.

pub mod ast;
pub mod expr;
pub mod items;
pub mod jsx;
pub mod pattern;
pub mod stmt;
pub mod types;

#[cfg(test)]
mod edge_cases;

pub use ast::{Ast, Program};

use novac_lex::{Lexer, Token, TokenKind};
use novac_util::{Handler, SourceLocation, Symbol};

use ast::{Expr, ExprId, PatId, Pattern, Stmt, StmtId, TypeAnn, TypeId};

/// The parser. Construct with [`Parser::new`], then call
/// [`Parser::parse_program`] once.
pub struct Parser<'src> {
    source: &'src str,
    file: Symbol,
    pub(crate) tokens: Vec<Token>,
    pub(crate) current: usize,
    pub(crate) handler: Handler,
    pub(crate) ast: Ast,
}

impl<'src> Parser<'src> {
    /// Build a parser from a lexer. The whole token stream is fetched up
    /// front; lexer diagnostics are carried over so they precede parser
    /// diagnostics in source order.
    pub fn new(mut lexer: Lexer<'src>) -> Self {
        let tokens = lexer.all_tokens().to_vec();
        let handler = Handler::new();
        for diag in lexer.handler().take() {
            match diag.level {
                novac_util::Level::Error => handler.error(diag.message, diag.location),
                novac_util::Level::Warning => handler.warning(diag.message, diag.location),
                novac_util::Level::Note => handler.note(diag.message, diag.location),
            }
        }
        Self {
            source: lexer.source(),
            file: lexer.file(),
            tokens,
            current: 0,
            handler,
            ast: Ast::default(),
        }
    }

    /// Parse the entire program.
    pub fn parse_program(&mut self) -> Program {
        let mut body = Vec::new();
        while !self.is_at_end() {
            let stmt = self.parse_statement();
            body.push(stmt);
        }
        Program {
            ast: std::mem::take(&mut self.ast),
            body,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.handler.has_errors()
    }

    /// Rendered diagnostics in source order.
    pub fn errors(&self) -> Vec<String> {
        self.handler.rendered()
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    // -----------------------------------------------------------------------
    // Token management
    // -----------------------------------------------------------------------

    pub(crate) fn peek(&self, offset: usize) -> &Token {
        let index = (self.current + offset).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    pub(crate) fn peek_kind(&self, offset: usize) -> TokenKind {
        self.peek(offset).kind
    }

    pub(crate) fn current_token(&self) -> &Token {
        self.peek(0)
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    pub(crate) fn advance(&mut self) -> Token {
        let token = self.tokens[self.current].clone();
        if self.current < self.tokens.len() - 1 {
            self.current += 1;
        }
        token
    }

    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind(0) == kind
    }

    /// Consume the current token if it matches.
    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Require a token kind; on mismatch report a diagnostic and leave the
    /// cursor in place. Returns whether the token was consumed.
    pub(crate) fn expect(&mut self, kind: TokenKind, message: &str) -> bool {
        if self.eat(kind) {
            true
        } else {
            self.error_here(message);
            false
        }
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.peek_kind(0) == TokenKind::EndOfFile
    }

    pub(crate) fn location(&self) -> SourceLocation {
        self.current_token().location
    }

    pub(crate) fn error_here(&mut self, message: impl Into<String>) {
        let loc = self.location();
        self.handler.error(message, loc);
    }

    /// Skip tokens until a likely statement boundary: just past a semicolon,
    /// or at a statement-starting keyword, or end of input.
    pub(crate) fn synchronize(&mut self) {
        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }
            use TokenKind::*;
            match self.peek_kind(0) {
                KeywordClass | KeywordFunction | KeywordVar | KeywordLet | KeywordConst
                | KeywordFor | KeywordIf | KeywordWhile | KeywordDo | KeywordReturn
                | KeywordSwitch | KeywordTry | KeywordThrow | KeywordBreak | KeywordContinue
                | KeywordImport | KeywordExport | KeywordInterface | KeywordEnum => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// A name usable in member/property position: identifiers, keywords, and
    /// keyword-like literals all qualify (`a.type`, `x.default`).
    pub(crate) fn property_name(&mut self) -> Option<Symbol> {
        let token = self.current_token();
        if token.kind == TokenKind::Identifier
            || token.kind.is_keyword()
            || matches!(
                token.kind,
                TokenKind::TrueLiteral
                    | TokenKind::FalseLiteral
                    | TokenKind::NullLiteral
                    | TokenKind::UndefinedLiteral
            )
        {
            let name = Symbol::intern(&token.lexeme);
            self.advance();
            Some(name)
        } else {
            None
        }
    }

    // -----------------------------------------------------------------------
    // Arena allocation
    // -----------------------------------------------------------------------

    pub(crate) fn add_expr(&mut self, expr: Expr) -> ExprId {
        self.ast.exprs.push(expr)
    }

    pub(crate) fn add_stmt(&mut self, stmt: Stmt) -> StmtId {
        self.ast.stmts.push(stmt)
    }

    pub(crate) fn add_pat(&mut self, pat: Pattern) -> PatId {
        self.ast.pats.push(pat)
    }

    pub(crate) fn add_type(&mut self, ty: TypeAnn) -> TypeId {
        self.ast.types.push(ty)
    }

    pub(crate) fn source(&self) -> &'src str {
        self.source
    }

    pub(crate) fn file(&self) -> Symbol {
        self.file
    }
}
