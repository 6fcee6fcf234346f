//! Statement parsing.
//!
//! The `for` header performs a two-token look-ahead to route between
//! C-style, `for-in`, and `for-of`; labeled statements are recognized by an
//! `Identifier ':'` prefix; everything else dispatches on the leading
//! keyword and falls back to an expression statement.

use novac_lex::TokenKind;
use novac_util::Symbol;

use crate::ast::{
    CatchClause, Declarator, Expr, ExprId, Pattern, Stmt, StmtId, SwitchCase, VarKind,
};
use crate::Parser;

impl<'src> Parser<'src> {
    pub(crate) fn parse_statement(&mut self) -> StmtId {
        use TokenKind::*;
        match self.peek_kind(0) {
            Semicolon => {
                self.advance();
                self.add_stmt(Stmt::Empty)
            }
            LeftBrace => {
                let body = self.parse_block_stmts();
                self.add_stmt(Stmt::Block(body))
            }
            KeywordVar => self.parse_var_decl(VarKind::Var),
            KeywordLet => self.parse_var_decl(VarKind::Let),
            KeywordConst => {
                if self.peek_kind(1) == KeywordEnum {
                    self.advance();
                    self.parse_enum_decl(true)
                } else {
                    self.parse_var_decl(VarKind::Const)
                }
            }
            KeywordUsing if self.peek_kind(1) == Identifier => self.parse_var_decl(VarKind::Using),
            KeywordFunction => self.parse_function_decl(false),
            KeywordAsync if self.peek_kind(1) == KeywordFunction => {
                self.advance();
                self.parse_function_decl(true)
            }
            At | KeywordClass => self.parse_class_decl(),
            KeywordAbstract if self.peek_kind(1) == KeywordClass => self.parse_class_decl(),
            KeywordInterface => self.parse_interface_decl(),
            KeywordType if self.peek_kind(1) == Identifier => self.parse_type_alias_decl(),
            KeywordEnum => self.parse_enum_decl(false),
            KeywordImport if !matches!(self.peek_kind(1), LeftParen | Dot) => {
                self.parse_import_decl()
            }
            KeywordExport => self.parse_export_decl(),
            KeywordNamespace if self.peek_kind(1) == Identifier => self.parse_namespace_decl(),
            KeywordDeclare => {
                // Ambient declaration: the modifier is discarded and the
                // inner declaration parsed normally.
                self.advance();
                self.parse_statement()
            }
            KeywordIf => self.parse_if_stmt(),
            KeywordWhile => self.parse_while_stmt(),
            KeywordDo => self.parse_do_while_stmt(),
            KeywordFor => self.parse_for_stmt(),
            KeywordSwitch => self.parse_switch_stmt(),
            KeywordTry => self.parse_try_stmt(),
            KeywordThrow => {
                self.advance();
                let argument = self.parse_expression();
                self.expect_semicolon();
                self.add_stmt(Stmt::Throw(argument))
            }
            KeywordReturn => self.parse_return_stmt(),
            KeywordBreak => {
                self.advance();
                let label = self.take_label();
                self.expect_semicolon();
                self.add_stmt(Stmt::Break(label))
            }
            KeywordContinue => {
                self.advance();
                let label = self.take_label();
                self.expect_semicolon();
                self.add_stmt(Stmt::Continue(label))
            }
            KeywordDebugger => {
                self.advance();
                self.expect_semicolon();
                self.add_stmt(Stmt::Debugger)
            }
            KeywordWith => {
                self.advance();
                self.expect(LeftParen, "expected '(' after 'with'");
                let object = self.parse_expression();
                self.expect(RightParen, "expected ')'");
                let body = self.parse_statement();
                self.add_stmt(Stmt::With { object, body })
            }
            Identifier if self.peek_kind(1) == Colon => {
                let label = Symbol::intern(&self.advance().lexeme);
                self.advance(); // ':'
                let body = self.parse_statement();
                self.add_stmt(Stmt::Labeled { label, body })
            }
            _ => self.parse_expression_stmt(),
        }
    }

    fn parse_expression_stmt(&mut self) -> StmtId {
        let expr = self.parse_expression();
        self.expect_semicolon();
        self.add_stmt(Stmt::Expr(expr))
    }

    /// `{ statement* }` returning the inner statement ids.
    pub(crate) fn parse_block_stmts(&mut self) -> Vec<StmtId> {
        use TokenKind::*;
        self.expect(LeftBrace, "expected '{'");
        let mut body = Vec::new();
        while !self.check(RightBrace) && !self.is_at_end() {
            body.push(self.parse_statement());
        }
        self.expect(RightBrace, "expected '}'");
        body
    }

    fn parse_block_as_stmt(&mut self) -> StmtId {
        let body = self.parse_block_stmts();
        self.add_stmt(Stmt::Block(body))
    }

    /// Semicolon with minimal automatic insertion: accepted when present,
    /// silently inserted before `}` / end of input / a line break.
    pub(crate) fn expect_semicolon(&mut self) {
        use TokenKind::*;
        if self.eat(Semicolon) {
            return;
        }
        if self.check(RightBrace) || self.is_at_end() {
            return;
        }
        if self.current_token().location.line > self.previous().location.line {
            return;
        }
        self.error_here("expected ';'");
    }

    fn take_label(&mut self) -> Option<Symbol> {
        if self.check(TokenKind::Identifier)
            && self.current_token().location.line == self.previous().location.line
        {
            Some(Symbol::intern(&self.advance().lexeme))
        } else {
            None
        }
    }

    // -----------------------------------------------------------------------
    // Declarations with initializers
    // -----------------------------------------------------------------------

    fn parse_var_decl(&mut self, kind: VarKind) -> StmtId {
        self.advance(); // var / let / const / using
        let declarators = self.parse_declarator_list();
        self.expect_semicolon();
        self.add_stmt(Stmt::VarDecl { kind, declarators })
    }

    fn parse_declarator_list(&mut self) -> Vec<Declarator> {
        let mut declarators = Vec::new();
        loop {
            let pattern = self.parse_binding_pattern();
            let ty = if self.eat(TokenKind::Colon) {
                Some(self.parse_type_annotation())
            } else {
                None
            };
            let init = if self.eat(TokenKind::Equal) {
                Some(self.parse_assignment_expr())
            } else {
                None
            };
            declarators.push(Declarator { pattern, ty, init });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        declarators
    }

    // -----------------------------------------------------------------------
    // Control flow
    // -----------------------------------------------------------------------

    fn parse_if_stmt(&mut self) -> StmtId {
        use TokenKind::*;
        self.advance(); // if
        self.expect(LeftParen, "expected '(' after 'if'");
        let test = self.parse_expression();
        self.expect(RightParen, "expected ')'");
        let consequent = self.parse_statement();
        let alternate = if self.eat(KeywordElse) {
            Some(self.parse_statement())
        } else {
            None
        };
        self.add_stmt(Stmt::If {
            test,
            consequent,
            alternate,
        })
    }

    fn parse_while_stmt(&mut self) -> StmtId {
        use TokenKind::*;
        self.advance(); // while
        self.expect(LeftParen, "expected '(' after 'while'");
        let test = self.parse_expression();
        self.expect(RightParen, "expected ')'");
        let body = self.parse_statement();
        self.add_stmt(Stmt::While { test, body })
    }

    fn parse_do_while_stmt(&mut self) -> StmtId {
        use TokenKind::*;
        self.advance(); // do
        let body = self.parse_statement();
        self.expect(KeywordWhile, "expected 'while' after do body");
        self.expect(LeftParen, "expected '('");
        let test = self.parse_expression();
        self.expect(RightParen, "expected ')'");
        self.expect_semicolon();
        self.add_stmt(Stmt::DoWhile { body, test })
    }

    /// `for` headers route on a two-token look-ahead past the declaration
    /// keyword: `for (let x of ...)`, `for (let x in ...)`, otherwise
    /// C-style.
    fn parse_for_stmt(&mut self) -> StmtId {
        use TokenKind::*;
        self.advance(); // for
        self.expect(LeftParen, "expected '(' after 'for'");

        // Empty init: `for (;;)`.
        if self.eat(Semicolon) {
            return self.parse_c_style_for(None);
        }

        let decl_kind = match self.peek_kind(0) {
            KeywordVar => Some(VarKind::Var),
            KeywordLet => Some(VarKind::Let),
            KeywordConst => Some(VarKind::Const),
            _ => None,
        };

        if let Some(kind) = decl_kind {
            self.advance();
            let pattern = self.parse_binding_pattern();
            match self.peek_kind(0) {
                KeywordIn => {
                    self.advance();
                    let object = self.parse_expression();
                    self.expect(RightParen, "expected ')'");
                    let body = self.parse_statement();
                    return self.add_stmt(Stmt::ForIn {
                        decl_kind: Some(kind),
                        pattern,
                        object,
                        body,
                    });
                }
                KeywordOf => {
                    self.advance();
                    let iterable = self.parse_assignment_expr();
                    self.expect(RightParen, "expected ')'");
                    let body = self.parse_statement();
                    return self.add_stmt(Stmt::ForOf {
                        decl_kind: Some(kind),
                        pattern,
                        iterable,
                        body,
                    });
                }
                _ => {
                    // C-style: finish this declarator, then the rest of the
                    // declarator list.
                    let ty = if self.eat(Colon) {
                        Some(self.parse_type_annotation())
                    } else {
                        None
                    };
                    let init = if self.eat(Equal) {
                        Some(self.parse_assignment_expr())
                    } else {
                        None
                    };
                    let mut declarators = vec![Declarator { pattern, ty, init }];
                    if self.eat(Comma) {
                        declarators.extend(self.parse_declarator_list());
                    }
                    self.expect(Semicolon, "expected ';' in for header");
                    let init_stmt = self.add_stmt(Stmt::VarDecl {
                        kind,
                        declarators,
                    });
                    return self.parse_c_style_for(Some(init_stmt));
                }
            }
        }

        // Expression initializer, possibly a for-in/of target.
        let init_expr = self.parse_expression();
        match self.peek_kind(0) {
            KeywordIn => {
                self.advance();
                let pattern = self.expr_as_pattern(init_expr);
                let object = self.parse_expression();
                self.expect(RightParen, "expected ')'");
                let body = self.parse_statement();
                self.add_stmt(Stmt::ForIn {
                    decl_kind: None,
                    pattern,
                    object,
                    body,
                })
            }
            KeywordOf => {
                self.advance();
                let pattern = self.expr_as_pattern(init_expr);
                let iterable = self.parse_assignment_expr();
                self.expect(RightParen, "expected ')'");
                let body = self.parse_statement();
                self.add_stmt(Stmt::ForOf {
                    decl_kind: None,
                    pattern,
                    iterable,
                    body,
                })
            }
            _ => {
                self.expect(Semicolon, "expected ';' in for header");
                let init_stmt = self.add_stmt(Stmt::Expr(init_expr));
                self.parse_c_style_for(Some(init_stmt))
            }
        }
    }

    fn parse_c_style_for(&mut self, init: Option<StmtId>) -> StmtId {
        use TokenKind::*;
        let test = if self.check(Semicolon) {
            None
        } else {
            Some(self.parse_expression())
        };
        self.expect(Semicolon, "expected ';' in for header");
        let update = if self.check(RightParen) {
            None
        } else {
            Some(self.parse_expression())
        };
        self.expect(RightParen, "expected ')'");
        let body = self.parse_statement();
        self.add_stmt(Stmt::For {
            init,
            test,
            update,
            body,
        })
    }

    /// Convert an already-parsed expression into a for-in/of binding target.
    fn expr_as_pattern(&mut self, expr: ExprId) -> crate::ast::PatId {
        match self.ast.expr(expr) {
            Expr::Ident(name) => {
                let name = *name;
                self.add_pat(Pattern::Ident(name))
            }
            _ => {
                self.error_here("invalid for-in/of binding target");
                self.add_pat(Pattern::Invalid)
            }
        }
    }

    fn parse_switch_stmt(&mut self) -> StmtId {
        use TokenKind::*;
        self.advance(); // switch
        self.expect(LeftParen, "expected '(' after 'switch'");
        let discriminant = self.parse_expression();
        self.expect(RightParen, "expected ')'");
        self.expect(LeftBrace, "expected '{'");

        let mut cases = Vec::new();
        while !self.check(RightBrace) && !self.is_at_end() {
            let test = if self.eat(KeywordCase) {
                let test = self.parse_expression();
                self.expect(Colon, "expected ':' after case expression");
                Some(test)
            } else if self.eat(KeywordDefault) {
                self.expect(Colon, "expected ':' after 'default'");
                None
            } else {
                self.error_here("expected 'case' or 'default' in switch body");
                self.synchronize();
                continue;
            };

            let mut body = Vec::new();
            while !matches!(
                self.peek_kind(0),
                KeywordCase | KeywordDefault | RightBrace | EndOfFile
            ) {
                body.push(self.parse_statement());
            }
            cases.push(SwitchCase { test, body });
        }
        self.expect(RightBrace, "expected '}'");
        self.add_stmt(Stmt::Switch {
            discriminant,
            cases,
        })
    }

    fn parse_try_stmt(&mut self) -> StmtId {
        use TokenKind::*;
        self.advance(); // try
        let block = self.parse_block_as_stmt();

        let handler = if self.eat(KeywordCatch) {
            let param = if self.eat(LeftParen) {
                let pattern = self.parse_binding_pattern();
                if self.eat(Colon) {
                    let _ = self.parse_type_annotation();
                }
                self.expect(RightParen, "expected ')'");
                Some(pattern)
            } else {
                None
            };
            let body = self.parse_block_as_stmt();
            Some(CatchClause { param, body })
        } else {
            None
        };

        let finalizer = if self.eat(KeywordFinally) {
            Some(self.parse_block_as_stmt())
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            self.error_here("expected 'catch' or 'finally' after try block");
        }

        self.add_stmt(Stmt::Try {
            block,
            handler,
            finalizer,
        })
    }

    fn parse_return_stmt(&mut self) -> StmtId {
        use TokenKind::*;
        let keyword_line = self.current_token().location.line;
        self.advance(); // return
        let argument = if matches!(self.peek_kind(0), Semicolon | RightBrace | EndOfFile)
            || self.current_token().location.line > keyword_line
        {
            None
        } else {
            Some(self.parse_expression())
        };
        self.expect_semicolon();
        self.add_stmt(Stmt::Return(argument))
    }

    /// `namespace X { ... }` parses its body as ordinary statements; the
    /// namespace scoping itself carries no runtime semantics here.
    fn parse_namespace_decl(&mut self) -> StmtId {
        self.advance(); // namespace
        self.advance(); // name
        let body = self.parse_block_stmts();
        self.add_stmt(Stmt::Block(body))
    }
}
