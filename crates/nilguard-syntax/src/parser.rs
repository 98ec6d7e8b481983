//! Recursive-descent parser for the analyzed Go subset.
//!
//! The parser consumes the token stream produced by the lexer (semicolons
//! already inserted) and builds the [`crate::ast`] tree. It is deliberately
//! tolerant about semantics — name resolution and typing happen later — but
//! strict about shape: a malformed file aborts with a positioned
//! [`SyntaxError`] and the driver skips the unit.

use crate::{
    ast::{
        BinOp, Block, Decl, Expr, FieldGroup, File, FuncDecl, Ident, IdentIds, ImportSpec, LitKind, MethodSpec,
        Signature, Stmt, SwitchCase, TypeExpr, TypeSpec, TypeSwitchCase, UnOp,
    },
    error::SyntaxError,
    lexer::Lexer,
    token::{Span, Token, TokenKind},
};

/// Parses one source file. `base` is the file's base offset in the file set;
/// `ids` is the program-wide identifier allocator.
pub fn parse_file(name: &str, src: &str, base: u32, ids: &mut IdentIds) -> Result<File, SyntaxError> {
    let tokens = Lexer::new(src, base).tokenize()?;
    Parser {
        tokens,
        index: 0,
        ids,
        allow_composite: true,
    }
    .file(name)
}

/// Outcome of parsing a `for` header clause.
enum ForClause {
    Simple(Stmt),
    Range {
        key: Option<Expr>,
        value: Option<Expr>,
        define: bool,
        x: Expr,
    },
}

struct Parser<'a> {
    tokens: Vec<Token>,
    index: usize,
    ids: &'a mut IdentIds,
    /// Composite literals are disabled while parsing `if`/`for`/`switch`
    /// headers, where `{` opens the body instead.
    allow_composite: bool,
}

impl Parser<'_> {
    fn tok(&self) -> &Token {
        &self.tokens[self.index.min(self.tokens.len() - 1)]
    }

    fn kind(&self) -> TokenKind {
        self.tok().kind
    }

    fn kind_at(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.index + n)
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    fn span(&self) -> Span {
        self.tok().span
    }

    fn advance(&mut self) -> Token {
        let tok = self.tok().clone();
        if self.index < self.tokens.len() - 1 {
            self.index += 1;
        }
        tok
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.kind() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, SyntaxError> {
        if self.kind() == kind {
            Ok(self.advance())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn unexpected(&self, what: &str) -> SyntaxError {
        SyntaxError::new(
            format!("expected {what}, found {:?}", self.kind()),
            self.span().start,
        )
    }

    fn ident(&mut self) -> Result<Ident, SyntaxError> {
        let tok = self.expect(TokenKind::Ident, "identifier")?;
        Ok(Ident {
            id: self.ids.alloc(),
            name: tok.text,
            span: tok.span,
        })
    }

    /// Skips statement separators (`;`, inserted or explicit).
    fn skip_semis(&mut self) {
        while self.kind() == TokenKind::Semi {
            self.advance();
        }
    }

    // ------------------------------------------------------------------
    // File structure
    // ------------------------------------------------------------------

    fn file(mut self, name: &str) -> Result<File, SyntaxError> {
        self.skip_semis();
        self.expect(TokenKind::Package, "package clause")?;
        let package = self.ident()?;
        self.skip_semis();

        let mut decls = Vec::new();
        while self.kind() != TokenKind::Eof {
            decls.push(self.decl()?);
            self.skip_semis();
        }
        Ok(File {
            name: name.to_owned(),
            package,
            decls,
        })
    }

    fn decl(&mut self) -> Result<Decl, SyntaxError> {
        match self.kind() {
            TokenKind::Import => self.import_decl(),
            TokenKind::Type => self.type_decl(),
            TokenKind::Func => Ok(Decl::Func(self.func_decl()?)),
            TokenKind::Var | TokenKind::Const => self.var_decl(),
            _ => Err(self.unexpected("declaration")),
        }
    }

    fn import_decl(&mut self) -> Result<Decl, SyntaxError> {
        self.expect(TokenKind::Import, "import")?;
        let mut specs = Vec::new();
        if self.eat(TokenKind::LParen) {
            self.skip_semis();
            while self.kind() != TokenKind::RParen {
                specs.push(self.import_spec()?);
                self.skip_semis();
            }
            self.expect(TokenKind::RParen, "')'")?;
        } else {
            specs.push(self.import_spec()?);
        }
        Ok(Decl::Import(specs))
    }

    fn import_spec(&mut self) -> Result<ImportSpec, SyntaxError> {
        let alias = match self.kind() {
            TokenKind::Ident => Some(self.advance().text),
            TokenKind::Period => {
                self.advance();
                Some(String::from("."))
            }
            _ => None,
        };
        let tok = self.expect(TokenKind::Str, "import path")?;
        let path = tok.text.trim_matches('"').to_owned();
        let name = alias.unwrap_or_else(|| {
            path.rsplit('/')
                .next()
                .unwrap_or(path.as_str())
                .to_owned()
        });
        Ok(ImportSpec {
            name,
            path,
            span: tok.span,
        })
    }

    fn type_decl(&mut self) -> Result<Decl, SyntaxError> {
        self.expect(TokenKind::Type, "type")?;
        let mut specs = Vec::new();
        if self.eat(TokenKind::LParen) {
            self.skip_semis();
            while self.kind() != TokenKind::RParen {
                specs.push(self.type_spec()?);
                self.skip_semis();
            }
            self.expect(TokenKind::RParen, "')'")?;
        } else {
            specs.push(self.type_spec()?);
        }
        Ok(Decl::Type(specs))
    }

    fn type_spec(&mut self) -> Result<TypeSpec, SyntaxError> {
        let name = self.ident()?;
        let alias = self.eat(TokenKind::Assign);
        let typ = self.type_expr()?;
        Ok(TypeSpec { name, alias, typ })
    }

    fn var_decl(&mut self) -> Result<Decl, SyntaxError> {
        // `const` groups are parsed with the same shape; the unevaluated
        // initializers are enough for the analyzer.
        self.advance();
        let mut stmts = Vec::new();
        if self.eat(TokenKind::LParen) {
            self.skip_semis();
            while self.kind() != TokenKind::RParen {
                stmts.push(self.var_spec()?);
                self.skip_semis();
            }
            self.expect(TokenKind::RParen, "')'")?;
        } else {
            stmts.push(self.var_spec()?);
        }
        Ok(Decl::Var(stmts))
    }

    fn var_spec(&mut self) -> Result<Stmt, SyntaxError> {
        let start = self.span();
        let mut names = vec![self.ident()?];
        while self.eat(TokenKind::Comma) {
            names.push(self.ident()?);
        }
        let typ = if matches!(self.kind(), TokenKind::Assign | TokenKind::Semi | TokenKind::Eof) {
            None
        } else {
            Some(self.type_expr()?)
        };
        let values = if self.eat(TokenKind::Assign) {
            self.expr_list()?
        } else {
            Vec::new()
        };
        let end = values.last().map_or(start, |e| e.span());
        Ok(Stmt::Var {
            names,
            typ,
            values,
            span: start.to(end),
        })
    }

    fn func_decl(&mut self) -> Result<FuncDecl, SyntaxError> {
        let start = self.span();
        self.expect(TokenKind::Func, "func")?;

        let recv = if self.kind() == TokenKind::LParen {
            let mut groups = self.param_list()?;
            if groups.len() != 1 {
                return Err(SyntaxError::new("expected one receiver", start.start));
            }
            Some(groups.remove(0))
        } else {
            None
        };

        let name = self.ident()?;
        let params = self.param_list()?;
        let results = self.result_list()?;
        let body = if self.kind() == TokenKind::LBrace {
            Some(self.block()?)
        } else {
            None
        };
        let end = body.as_ref().map_or(name.span, |b| b.span);
        Ok(FuncDecl {
            name,
            recv,
            sig: Signature { params, results },
            body,
            span: start.to(end),
        })
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    fn type_expr(&mut self) -> Result<TypeExpr, SyntaxError> {
        let start = self.span();
        match self.kind() {
            TokenKind::Ident => {
                let name = self.ident()?;
                if self.kind() == TokenKind::Period && self.kind_at(1) == TokenKind::Ident {
                    self.advance();
                    let sel = self.ident()?;
                    let span = name.span.to(sel.span);
                    Ok(TypeExpr::Qualified {
                        pkg: name,
                        name: sel,
                        span,
                    })
                } else {
                    Ok(TypeExpr::Name(name))
                }
            }
            TokenKind::Star => {
                self.advance();
                let elem = self.type_expr()?;
                let span = start.to(elem.span());
                Ok(TypeExpr::Pointer {
                    elem: Box::new(elem),
                    span,
                })
            }
            TokenKind::LBracket => {
                self.advance();
                if self.eat(TokenKind::RBracket) {
                    let elem = self.type_expr()?;
                    let span = start.to(elem.span());
                    Ok(TypeExpr::Slice {
                        elem: Box::new(elem),
                        span,
                    })
                } else {
                    // Fixed-size array; the length expression is skipped.
                    let _len = self.expr()?;
                    self.expect(TokenKind::RBracket, "']'")?;
                    let elem = self.type_expr()?;
                    let span = start.to(elem.span());
                    Ok(TypeExpr::Array {
                        elem: Box::new(elem),
                        span,
                    })
                }
            }
            TokenKind::Map => {
                self.advance();
                self.expect(TokenKind::LBracket, "'['")?;
                let key = self.type_expr()?;
                self.expect(TokenKind::RBracket, "']'")?;
                let value = self.type_expr()?;
                let span = start.to(value.span());
                Ok(TypeExpr::Map {
                    key: Box::new(key),
                    value: Box::new(value),
                    span,
                })
            }
            TokenKind::Chan => {
                self.advance();
                self.eat(TokenKind::Arrow);
                let elem = self.type_expr()?;
                let span = start.to(elem.span());
                Ok(TypeExpr::Chan {
                    elem: Box::new(elem),
                    span,
                })
            }
            TokenKind::Arrow => {
                self.advance();
                self.expect(TokenKind::Chan, "chan")?;
                let elem = self.type_expr()?;
                let span = start.to(elem.span());
                Ok(TypeExpr::Chan {
                    elem: Box::new(elem),
                    span,
                })
            }
            TokenKind::Func => {
                self.advance();
                let params = self.param_list()?;
                let results = self.result_list()?;
                Ok(TypeExpr::Func {
                    sig: Box::new(Signature { params, results }),
                    span: start,
                })
            }
            TokenKind::Struct => {
                self.advance();
                self.expect(TokenKind::LBrace, "'{'")?;
                self.skip_semis();
                let mut fields = Vec::new();
                while self.kind() != TokenKind::RBrace {
                    fields.push(self.field_group()?);
                    self.skip_semis();
                }
                let end = self.expect(TokenKind::RBrace, "'}'")?.span;
                Ok(TypeExpr::Struct {
                    fields,
                    span: start.to(end),
                })
            }
            TokenKind::Interface => {
                self.advance();
                self.expect(TokenKind::LBrace, "'{'")?;
                self.skip_semis();
                let mut methods = Vec::new();
                while self.kind() != TokenKind::RBrace {
                    let name = self.ident()?;
                    if self.kind() == TokenKind::LParen {
                        let params = self.param_list()?;
                        let results = self.result_list()?;
                        methods.push(MethodSpec {
                            name,
                            sig: Signature { params, results },
                        });
                    }
                    // Embedded interface names are accepted and dropped.
                    self.skip_semis();
                }
                let end = self.expect(TokenKind::RBrace, "'}'")?.span;
                Ok(TypeExpr::Interface {
                    methods,
                    span: start.to(end),
                })
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.type_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            _ => Err(self.unexpected("type")),
        }
    }

    /// One `names Type` group in a struct body. Embedded fields (`T` or
    /// `*pkg.T` with no names) produce an empty name list.
    fn field_group(&mut self) -> Result<FieldGroup, SyntaxError> {
        // Embedded fields: `T`, `pkg.T`, or `*T` with no field names.
        let embedded = matches!(self.kind(), TokenKind::Star)
            || (self.kind() == TokenKind::Ident
                && matches!(
                    self.kind_at(1),
                    TokenKind::Semi | TokenKind::RBrace | TokenKind::Period | TokenKind::Str
                ));
        if embedded {
            let typ = self.type_expr()?;
            self.eat_tag();
            return Ok(FieldGroup {
                names: Vec::new(),
                typ,
            });
        }
        let mut names = vec![self.ident()?];
        while self.eat(TokenKind::Comma) {
            names.push(self.ident()?);
        }
        let typ = self.type_expr()?;
        self.eat_tag();
        Ok(FieldGroup { names, typ })
    }

    /// Struct field tags are accepted and ignored.
    fn eat_tag(&mut self) {
        if self.kind() == TokenKind::Str {
            self.advance();
        }
    }

    /// Parses `(a, b int, c *C)` and `(int, string)` parameter lists.
    fn param_list(&mut self) -> Result<Vec<FieldGroup>, SyntaxError> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut items: Vec<(Option<Ident>, Option<TypeExpr>)> = Vec::new();
        while self.kind() != TokenKind::RParen {
            items.push(self.param_item()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        Ok(Self::group_params(items))
    }

    fn param_item(&mut self) -> Result<(Option<Ident>, Option<TypeExpr>), SyntaxError> {
        self.eat(TokenKind::Ellipsis);
        if self.kind() == TokenKind::Ident {
            match self.kind_at(1) {
                // Bare identifier: either an unnamed type parameter or a
                // name whose type follows in a later item.
                TokenKind::Comma | TokenKind::RParen => {
                    let name = self.ident()?;
                    return Ok((Some(name), None));
                }
                // `pkg.T` is a type, not a name.
                TokenKind::Period => {
                    return Ok((None, Some(self.type_expr()?)));
                }
                _ => {
                    let name = self.ident()?;
                    self.eat(TokenKind::Ellipsis);
                    let typ = self.type_expr()?;
                    return Ok((Some(name), Some(typ)));
                }
            }
        }
        Ok((None, Some(self.type_expr()?)))
    }

    /// Distributes pending bare names over the next typed item, Go-style.
    fn group_params(items: Vec<(Option<Ident>, Option<TypeExpr>)>) -> Vec<FieldGroup> {
        let named_mode = items.iter().any(|(n, t)| n.is_some() && t.is_some());
        let mut groups = Vec::new();
        if named_mode {
            let mut pending: Vec<Ident> = Vec::new();
            for (name, typ) in items {
                match (name, typ) {
                    (Some(n), None) => pending.push(n),
                    (Some(n), Some(t)) => {
                        pending.push(n);
                        groups.push(FieldGroup {
                            names: std::mem::take(&mut pending),
                            typ: t,
                        });
                    }
                    (None, Some(t)) => groups.push(FieldGroup {
                        names: Vec::new(),
                        typ: t,
                    }),
                    (None, None) => {}
                }
            }
        } else {
            for (name, typ) in items {
                match (name, typ) {
                    (Some(n), None) => groups.push(FieldGroup {
                        names: Vec::new(),
                        typ: TypeExpr::Name(n),
                    }),
                    (_, Some(t)) => groups.push(FieldGroup {
                        names: Vec::new(),
                        typ: t,
                    }),
                    (None, None) => {}
                }
            }
        }
        groups
    }

    fn result_list(&mut self) -> Result<Vec<FieldGroup>, SyntaxError> {
        match self.kind() {
            TokenKind::LParen => self.param_list(),
            TokenKind::Ident
            | TokenKind::Star
            | TokenKind::LBracket
            | TokenKind::Map
            | TokenKind::Chan
            | TokenKind::Func
            | TokenKind::Struct
            | TokenKind::Interface => {
                let typ = self.type_expr()?;
                Ok(vec![FieldGroup {
                    names: Vec::new(),
                    typ,
                }])
            }
            _ => Ok(Vec::new()),
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn block(&mut self) -> Result<Block, SyntaxError> {
        let start = self.expect(TokenKind::LBrace, "'{'")?.span;
        // The body re-enables composite literals even when the enclosing
        // control-clause disabled them.
        let prev = std::mem::replace(&mut self.allow_composite, true);
        let mut stmts = Vec::new();
        self.skip_semis();
        while self.kind() != TokenKind::RBrace && self.kind() != TokenKind::Eof {
            stmts.push(self.stmt()?);
            self.skip_semis();
        }
        let end = self.expect(TokenKind::RBrace, "'}'")?.span;
        self.allow_composite = prev;
        Ok(Block {
            stmts,
            span: start.to(end),
        })
    }

    fn stmt(&mut self) -> Result<Stmt, SyntaxError> {
        match self.kind() {
            TokenKind::Return => {
                let start = self.advance().span;
                let results = if matches!(self.kind(), TokenKind::Semi | TokenKind::RBrace) {
                    Vec::new()
                } else {
                    self.expr_list()?
                };
                let end = results.last().map_or(start, |e| e.span());
                Ok(Stmt::Return {
                    results,
                    span: start.to(end),
                })
            }
            TokenKind::If => self.if_stmt(),
            TokenKind::For => self.for_stmt(),
            TokenKind::Switch => self.switch_stmt(),
            TokenKind::LBrace => Ok(Stmt::Block(self.block()?)),
            TokenKind::Var | TokenKind::Const => {
                let Decl::Var(mut stmts) = self.var_decl()? else {
                    unreachable!("var_decl returns Decl::Var");
                };
                if stmts.len() == 1 {
                    Ok(stmts.remove(0))
                } else {
                    let span = stmts
                        .first()
                        .map(Stmt::span)
                        .unwrap_or_default();
                    Ok(Stmt::Block(Block { stmts, span }))
                }
            }
            TokenKind::Go | TokenKind::Defer => {
                let start = self.advance().span;
                let call = self.expr()?;
                let span = start.to(call.span());
                Ok(Stmt::GoDefer { call, span })
            }
            TokenKind::Break | TokenKind::Continue | TokenKind::Goto | TokenKind::Fallthrough => {
                let span = self.advance().span;
                // Optional label.
                if self.kind() == TokenKind::Ident {
                    self.advance();
                }
                Ok(Stmt::Branch { span })
            }
            TokenKind::Semi => Ok(Stmt::Empty { span: self.advance().span }),
            _ => self.simple_stmt(),
        }
    }

    /// Expression, assignment, short declaration, or inc/dec statement.
    fn simple_stmt(&mut self) -> Result<Stmt, SyntaxError> {
        let lhs = self.expr_list()?;
        let start = lhs.first().map(Expr::span).unwrap_or_default();
        match self.kind() {
            TokenKind::Define | TokenKind::Assign | TokenKind::OpAssign => {
                let define = self.kind() == TokenKind::Define;
                self.advance();
                let rhs = self.expr_list()?;
                let end = rhs.last().map_or(start, Expr::span);
                Ok(Stmt::Assign {
                    lhs,
                    rhs,
                    define,
                    span: start.to(end),
                })
            }
            TokenKind::Inc | TokenKind::Dec => {
                let end = self.advance().span;
                let mut lhs = lhs;
                if lhs.len() != 1 {
                    return Err(SyntaxError::new("expected one operand", start.start));
                }
                Ok(Stmt::IncDec {
                    x: lhs.remove(0),
                    span: start.to(end),
                })
            }
            _ => {
                let mut lhs = lhs;
                if lhs.len() != 1 {
                    return Err(SyntaxError::new("expected single expression", start.start));
                }
                Ok(Stmt::Expr(lhs.remove(0)))
            }
        }
    }

    fn if_stmt(&mut self) -> Result<Stmt, SyntaxError> {
        let start = self.expect(TokenKind::If, "if")?.span;
        let prev = std::mem::replace(&mut self.allow_composite, false);
        let first = self.simple_stmt()?;
        let (init, cond_stmt) = if self.eat(TokenKind::Semi) {
            (Some(Box::new(first)), self.simple_stmt()?)
        } else {
            (None, first)
        };
        self.allow_composite = prev;
        let Stmt::Expr(cond) = cond_stmt else {
            return Err(SyntaxError::new("expected condition expression", start.start));
        };
        let then = self.block()?;
        let els = if self.eat(TokenKind::Else) {
            let stmt = if self.kind() == TokenKind::If {
                self.if_stmt()?
            } else {
                Stmt::Block(self.block()?)
            };
            Some(Box::new(stmt))
        } else {
            None
        };
        let end = els.as_ref().map_or(then.span, |s| s.span());
        Ok(Stmt::If {
            init,
            cond,
            then,
            els,
            span: start.to(end),
        })
    }

    fn for_stmt(&mut self) -> Result<Stmt, SyntaxError> {
        let start = self.expect(TokenKind::For, "for")?.span;
        let prev = std::mem::replace(&mut self.allow_composite, false);

        if self.kind() == TokenKind::LBrace {
            self.allow_composite = prev;
            let body = self.block()?;
            let span = start.to(body.span);
            return Ok(Stmt::For {
                init: None,
                cond: None,
                post: None,
                body,
                span,
            });
        }

        // `for range x` without bindings.
        if self.kind() == TokenKind::Range {
            self.advance();
            let x = self.expr()?;
            self.allow_composite = prev;
            let body = self.block()?;
            let span = start.to(body.span);
            return Ok(Stmt::Range {
                key: None,
                value: None,
                define: false,
                x,
                body,
                span,
            });
        }

        let first = if self.kind() == TokenKind::Semi {
            None
        } else {
            Some(self.for_clause()?)
        };

        match first {
            Some(ForClause::Range { key, value, define, x }) => {
                self.allow_composite = prev;
                let body = self.block()?;
                let span = start.to(body.span);
                Ok(Stmt::Range {
                    key,
                    value,
                    define,
                    x,
                    body,
                    span,
                })
            }
            Some(ForClause::Simple(stmt)) if self.kind() == TokenKind::LBrace => {
                // `for cond { ... }`
                self.allow_composite = prev;
                let Stmt::Expr(cond) = stmt else {
                    return Err(SyntaxError::new("expected loop condition", start.start));
                };
                let body = self.block()?;
                let span = start.to(body.span);
                Ok(Stmt::For {
                    init: None,
                    cond: Some(cond),
                    post: None,
                    body,
                    span,
                })
            }
            init_stmt => {
                let init = match init_stmt {
                    Some(ForClause::Simple(s)) => Some(Box::new(s)),
                    _ => None,
                };
                self.expect(TokenKind::Semi, "';'")?;
                let cond = if self.kind() == TokenKind::Semi {
                    None
                } else {
                    Some(self.expr()?)
                };
                self.expect(TokenKind::Semi, "';'")?;
                let post = if self.kind() == TokenKind::LBrace {
                    None
                } else {
                    Some(Box::new(self.simple_stmt()?))
                };
                self.allow_composite = prev;
                let body = self.block()?;
                let span = start.to(body.span);
                Ok(Stmt::For {
                    init,
                    cond,
                    post,
                    body,
                    span,
                })
            }
        }
    }

    /// Parses the first clause of a `for` header, which may turn out to be a
    /// range clause (`k, v := range x`).
    fn for_clause(&mut self) -> Result<ForClause, SyntaxError> {
        let lhs = self.expr_list()?;
        match self.kind() {
            TokenKind::Define | TokenKind::Assign => {
                let define = self.kind() == TokenKind::Define;
                self.advance();
                if self.eat(TokenKind::Range) {
                    let x = self.expr()?;
                    let mut lhs = lhs;
                    let value = if lhs.len() > 1 { Some(lhs.remove(1)) } else { None };
                    let key = if lhs.is_empty() { None } else { Some(lhs.remove(0)) };
                    return Ok(ForClause::Range { key, value, define, x });
                }
                let rhs = self.expr_list()?;
                let start = lhs.first().map(Expr::span).unwrap_or_default();
                let end = rhs.last().map_or(start, Expr::span);
                Ok(ForClause::Simple(Stmt::Assign {
                    lhs,
                    rhs,
                    define,
                    span: start.to(end),
                }))
            }
            TokenKind::Inc | TokenKind::Dec => {
                let mut lhs = lhs;
                let start = lhs.first().map(Expr::span).unwrap_or_default();
                let end = self.advance().span;
                Ok(ForClause::Simple(Stmt::IncDec {
                    x: lhs.remove(0),
                    span: start.to(end),
                }))
            }
            _ => {
                let mut lhs = lhs;
                if lhs.len() != 1 {
                    let pos = lhs.first().map(Expr::span).unwrap_or_default().start;
                    return Err(SyntaxError::new("expected single expression", pos));
                }
                Ok(ForClause::Simple(Stmt::Expr(lhs.remove(0))))
            }
        }
    }

    fn switch_stmt(&mut self) -> Result<Stmt, SyntaxError> {
        let start = self.expect(TokenKind::Switch, "switch")?.span;
        let prev = std::mem::replace(&mut self.allow_composite, false);

        let mut init = None;
        let mut header = None;
        if self.kind() != TokenKind::LBrace {
            let first = self.simple_stmt()?;
            if self.eat(TokenKind::Semi) {
                init = Some(Box::new(first));
                if self.kind() != TokenKind::LBrace {
                    header = Some(self.simple_stmt()?);
                }
            } else {
                header = Some(first);
            }
        }
        self.allow_composite = prev;

        // A header of the form `x.(type)` or `v := x.(type)` selects the
        // type-switch grammar for the case clauses.
        enum Header {
            None,
            Tag(Expr),
            TypeSwitch(Option<Ident>, Expr),
        }
        let header = match header {
            None => Header::None,
            Some(Stmt::Expr(Expr::TypeAssert { x, typ: None, .. })) => Header::TypeSwitch(None, *x),
            Some(Stmt::Assign {
                mut lhs,
                mut rhs,
                define: true,
                ..
            }) if lhs.len() == 1
                && rhs.len() == 1
                && matches!(rhs[0], Expr::TypeAssert { typ: None, .. }) =>
            {
                let Expr::TypeAssert { x, .. } = rhs.remove(0) else {
                    unreachable!("matched TypeAssert above");
                };
                let bind = match lhs.remove(0) {
                    Expr::Ident(id) => Some(id),
                    _ => None,
                };
                Header::TypeSwitch(bind, *x)
            }
            Some(Stmt::Expr(e)) => Header::Tag(e),
            Some(_) => return Err(SyntaxError::new("expected switch expression", start.start)),
        };

        let tag = match header {
            Header::TypeSwitch(bind, subject) => {
                // An init statement on a type switch is dropped; the guard
                // classification only needs the switch node and its subject.
                let cases = self.type_switch_cases()?;
                let end = self.span();
                self.expect(TokenKind::RBrace, "'}'")?;
                return Ok(Stmt::TypeSwitch {
                    bind,
                    subject,
                    cases,
                    span: start.to(end),
                });
            }
            Header::Tag(e) => Some(e),
            Header::None => None,
        };
        let cases = self.switch_cases()?;
        let end = self.span();
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(Stmt::Switch {
            init,
            tag,
            cases,
            span: start.to(end),
        })
    }

    fn switch_cases(&mut self) -> Result<Vec<SwitchCase>, SyntaxError> {
        self.expect(TokenKind::LBrace, "'{'")?;
        self.skip_semis();
        let mut cases = Vec::new();
        while self.kind() != TokenKind::RBrace && self.kind() != TokenKind::Eof {
            let start = self.span();
            let exprs = if self.eat(TokenKind::Case) {
                self.expr_list()?
            } else {
                self.expect(TokenKind::Default, "'case' or 'default'")?;
                Vec::new()
            };
            self.expect(TokenKind::Colon, "':'")?;
            let body = self.case_body()?;
            let end = body.last().map_or(start, Stmt::span);
            cases.push(SwitchCase {
                exprs,
                body,
                span: start.to(end),
            });
        }
        Ok(cases)
    }

    fn type_switch_cases(&mut self) -> Result<Vec<TypeSwitchCase>, SyntaxError> {
        self.expect(TokenKind::LBrace, "'{'")?;
        self.skip_semis();
        let mut cases = Vec::new();
        while self.kind() != TokenKind::RBrace && self.kind() != TokenKind::Eof {
            let start = self.span();
            let types = if self.eat(TokenKind::Case) {
                let mut types = vec![self.type_expr()?];
                while self.eat(TokenKind::Comma) {
                    types.push(self.type_expr()?);
                }
                types
            } else {
                self.expect(TokenKind::Default, "'case' or 'default'")?;
                Vec::new()
            };
            self.expect(TokenKind::Colon, "':'")?;
            let body = self.case_body()?;
            let end = body.last().map_or(start, Stmt::span);
            cases.push(TypeSwitchCase {
                types,
                body,
                span: start.to(end),
            });
        }
        Ok(cases)
    }

    fn case_body(&mut self) -> Result<Vec<Stmt>, SyntaxError> {
        let mut body = Vec::new();
        self.skip_semis();
        while !matches!(
            self.kind(),
            TokenKind::Case | TokenKind::Default | TokenKind::RBrace | TokenKind::Eof
        ) {
            body.push(self.stmt()?);
            self.skip_semis();
        }
        Ok(body)
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expr_list(&mut self) -> Result<Vec<Expr>, SyntaxError> {
        let mut exprs = vec![self.expr()?];
        while self.eat(TokenKind::Comma) {
            exprs.push(self.expr()?);
        }
        Ok(exprs)
    }

    fn expr(&mut self) -> Result<Expr, SyntaxError> {
        self.binary_expr(1)
    }

    fn binary_expr(&mut self, min_prec: u8) -> Result<Expr, SyntaxError> {
        let mut x = self.unary_expr()?;
        loop {
            let Some((op, prec)) = Self::bin_op(self.kind()) else {
                return Ok(x);
            };
            if prec < min_prec {
                return Ok(x);
            }
            self.advance();
            let y = self.binary_expr(prec + 1)?;
            let span = x.span().to(y.span());
            x = Expr::Binary {
                x: Box::new(x),
                op,
                y: Box::new(y),
                span,
            };
        }
    }

    fn bin_op(kind: TokenKind) -> Option<(BinOp, u8)> {
        Some(match kind {
            TokenKind::OrOr => (BinOp::LogOr, 1),
            TokenKind::AndAnd => (BinOp::LogAnd, 2),
            TokenKind::Eq => (BinOp::Eq, 3),
            TokenKind::NotEq => (BinOp::NotEq, 3),
            TokenKind::Lt => (BinOp::Lt, 3),
            TokenKind::LtEq => (BinOp::LtEq, 3),
            TokenKind::Gt => (BinOp::Gt, 3),
            TokenKind::GtEq => (BinOp::GtEq, 3),
            TokenKind::Plus => (BinOp::Add, 4),
            TokenKind::Minus => (BinOp::Sub, 4),
            TokenKind::Pipe => (BinOp::Or, 4),
            TokenKind::Caret => (BinOp::Xor, 4),
            TokenKind::Star => (BinOp::Mul, 5),
            TokenKind::Slash => (BinOp::Div, 5),
            TokenKind::Percent => (BinOp::Rem, 5),
            TokenKind::Shl => (BinOp::Shl, 5),
            TokenKind::Shr => (BinOp::Shr, 5),
            TokenKind::Amp => (BinOp::And, 5),
            TokenKind::AmpCaret => (BinOp::AndNot, 5),
            _ => return None,
        })
    }

    fn unary_expr(&mut self) -> Result<Expr, SyntaxError> {
        let start = self.span();
        let op = match self.kind() {
            TokenKind::Star => {
                self.advance();
                let x = self.unary_expr()?;
                let span = start.to(x.span());
                return Ok(Expr::Star { x: Box::new(x), span });
            }
            TokenKind::Amp => UnOp::Addr,
            TokenKind::Not => UnOp::Not,
            TokenKind::Minus => UnOp::Neg,
            TokenKind::Plus => UnOp::Pos,
            TokenKind::Arrow => UnOp::Recv,
            _ => return self.primary_expr(),
        };
        self.advance();
        let x = self.unary_expr()?;
        let span = start.to(x.span());
        Ok(Expr::Unary {
            op,
            x: Box::new(x),
            span,
        })
    }

    fn primary_expr(&mut self) -> Result<Expr, SyntaxError> {
        let mut x = self.operand()?;
        loop {
            match self.kind() {
                TokenKind::Period => {
                    self.advance();
                    if self.eat(TokenKind::LParen) {
                        let typ = if self.kind() == TokenKind::Type {
                            self.advance();
                            None
                        } else {
                            Some(self.type_expr()?)
                        };
                        let end = self.expect(TokenKind::RParen, "')'")?.span;
                        let span = x.span().to(end);
                        x = Expr::TypeAssert {
                            x: Box::new(x),
                            typ,
                            span,
                        };
                    } else {
                        let sel = self.ident()?;
                        let span = x.span().to(sel.span);
                        x = Expr::Selector {
                            x: Box::new(x),
                            sel,
                            span,
                        };
                    }
                }
                TokenKind::LParen => {
                    self.advance();
                    let mut args = Vec::new();
                    while self.kind() != TokenKind::RParen {
                        // Inside parentheses composite literals are legal
                        // again even in a control-clause header.
                        let prev = std::mem::replace(&mut self.allow_composite, true);
                        let arg = self.expr();
                        self.allow_composite = prev;
                        args.push(arg?);
                        self.eat(TokenKind::Ellipsis);
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                    let end = self.expect(TokenKind::RParen, "')'")?.span;
                    let span = x.span().to(end);
                    x = Expr::Call {
                        func: Box::new(x),
                        args,
                        span,
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let prev = std::mem::replace(&mut self.allow_composite, true);
                    let result = self.index_or_slice(x);
                    self.allow_composite = prev;
                    x = result?;
                }
                TokenKind::LBrace if self.allow_composite => {
                    let Some(typ) = Self::to_type_expr(&x) else {
                        return Ok(x);
                    };
                    x = self.composite_lit(typ)?;
                }
                _ => return Ok(x),
            }
        }
    }

    fn index_or_slice(&mut self, x: Expr) -> Result<Expr, SyntaxError> {
        let low = if matches!(self.kind(), TokenKind::Colon) {
            None
        } else {
            Some(Box::new(self.expr()?))
        };
        if self.eat(TokenKind::Colon) {
            let high = if self.kind() == TokenKind::RBracket {
                None
            } else {
                Some(Box::new(self.expr()?))
            };
            // Full slice expressions `a[l:h:m]` drop the capacity bound.
            if self.eat(TokenKind::Colon) {
                let _cap = self.expr()?;
            }
            let end = self.expect(TokenKind::RBracket, "']'")?.span;
            let span = x.span().to(end);
            Ok(Expr::Slice {
                x: Box::new(x),
                low,
                high,
                span,
            })
        } else {
            let end = self.expect(TokenKind::RBracket, "']'")?.span;
            let index = low.ok_or_else(|| SyntaxError::new("expected index expression", end.start))?;
            let span = x.span().to(end);
            Ok(Expr::Index {
                x: Box::new(x),
                index,
                span,
            })
        }
    }

    fn operand(&mut self) -> Result<Expr, SyntaxError> {
        match self.kind() {
            TokenKind::Ident => Ok(Expr::Ident(self.ident()?)),
            TokenKind::Int => Ok(self.lit(LitKind::Int)),
            TokenKind::Float => Ok(self.lit(LitKind::Float)),
            TokenKind::Char => Ok(self.lit(LitKind::Char)),
            TokenKind::Str => Ok(self.lit(LitKind::Str)),
            TokenKind::LParen => {
                let start = self.advance().span;
                let prev = std::mem::replace(&mut self.allow_composite, true);
                let inner = self.expr();
                self.allow_composite = prev;
                let inner = inner?;
                let end = self.expect(TokenKind::RParen, "')'")?.span;
                Ok(Expr::Paren {
                    x: Box::new(inner),
                    span: start.to(end),
                })
            }
            // Composite literal of a slice/array/map type, or a bare type
            // argument to a builtin such as `make([]int, 0)`.
            TokenKind::LBracket | TokenKind::Map | TokenKind::Chan | TokenKind::Func | TokenKind::Struct => {
                let typ = self.type_expr()?;
                if self.kind() == TokenKind::LBrace && self.allow_composite {
                    self.composite_lit(typ)
                } else {
                    let span = typ.span();
                    Ok(Expr::TypeRef { typ, span })
                }
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn lit(&mut self, kind: LitKind) -> Expr {
        let tok = self.advance();
        Expr::Lit {
            kind,
            text: tok.text,
            span: tok.span,
        }
    }

    fn to_type_expr(x: &Expr) -> Option<TypeExpr> {
        match x {
            Expr::Ident(id) => Some(TypeExpr::Name(id.clone())),
            Expr::Selector { x, sel, span } => match x.as_ref() {
                Expr::Ident(pkg) => Some(TypeExpr::Qualified {
                    pkg: pkg.clone(),
                    name: sel.clone(),
                    span: *span,
                }),
                _ => None,
            },
            _ => None,
        }
    }

    fn composite_lit(&mut self, typ: TypeExpr) -> Result<Expr, SyntaxError> {
        let start = self.expect(TokenKind::LBrace, "'{'")?.span;
        let prev = std::mem::replace(&mut self.allow_composite, true);
        let mut elts = Vec::new();
        self.skip_semis();
        let result = loop {
            if self.kind() == TokenKind::RBrace {
                break Ok(());
            }
            let elt = match self.expr() {
                Ok(e) => e,
                Err(e) => break Err(e),
            };
            let elt = if self.eat(TokenKind::Colon) {
                let value = match self.expr() {
                    Ok(v) => v,
                    Err(e) => break Err(e),
                };
                let span = elt.span().to(value.span());
                Expr::KeyValue {
                    key: Box::new(elt),
                    value: Box::new(value),
                    span,
                }
            } else {
                elt
            };
            elts.push(elt);
            self.eat(TokenKind::Comma);
            self.skip_semis();
        };
        self.allow_composite = prev;
        result?;
        let end = self.expect(TokenKind::RBrace, "'}'")?.span;
        let span = typ.span().to(start).to(end);
        Ok(Expr::Composite { typ, elts, span })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Decl, Expr, Stmt};

    fn parse(src: &str) -> File {
        let mut ids = IdentIds::new();
        parse_file("test.go", src, 1, &mut ids).expect("parses")
    }

    #[test]
    fn parses_function_with_pointer_param() {
        let file = parse("package p\n\nfunc f(ptr *int) {\n\tprint(*ptr)\n}\n");
        assert_eq!(file.package.name, "p");
        let Decl::Func(func) = &file.decls[0] else {
            panic!("expected func decl");
        };
        assert_eq!(func.name.name, "f");
        assert_eq!(func.sig.params.len(), 1);
        assert_eq!(func.sig.params[0].names[0].name, "ptr");
    }

    #[test]
    fn parses_struct_and_interface_decls() {
        let file = parse(
            "package p\n\ntype Itf interface {\n\tGet() int\n}\n\ntype A struct {\n\tb B\n\titf Itf\n}\n",
        );
        assert_eq!(file.decls.len(), 2);
        let Decl::Type(specs) = &file.decls[1] else {
            panic!("expected type decl");
        };
        let TypeExpr::Struct { fields, .. } = &specs[0].typ else {
            panic!("expected struct type");
        };
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn parses_nil_guard_if() {
        let file = parse("package p\n\nfunc f(p *int) {\n\tif p != nil {\n\t\tprint(*p)\n\t}\n}\n");
        let Decl::Func(func) = &file.decls[0] else {
            panic!("expected func decl");
        };
        let body = func.body.as_ref().expect("has body");
        let Stmt::If { cond, .. } = &body.stmts[0] else {
            panic!("expected if stmt");
        };
        assert!(matches!(cond, Expr::Binary { op: BinOp::NotEq, .. }));
    }

    #[test]
    fn parses_type_switch() {
        let file = parse(
            "package p\n\nfunc f(i Itf) int {\n\tswitch i.(type) {\n\tcase Itf:\n\t\treturn i.Get()\n\tdefault:\n\t\treturn 0\n\t}\n}\n",
        );
        let Decl::Func(func) = &file.decls[0] else {
            panic!("expected func decl");
        };
        let body = func.body.as_ref().expect("has body");
        let Stmt::TypeSwitch { cases, subject, .. } = &body.stmts[0] else {
            panic!("expected type switch");
        };
        assert!(matches!(subject, Expr::Ident(_)));
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].types.len(), 1);
        assert!(cases[1].types.is_empty());
    }

    #[test]
    fn parses_selector_chains_and_deref() {
        let file = parse("package p\n\nfunc f(b B) {\n\tprint(*b.a.a)\n}\n");
        let Decl::Func(func) = &file.decls[0] else {
            panic!("expected func decl");
        };
        let body = func.body.as_ref().expect("has body");
        let Stmt::Expr(Expr::Call { args, .. }) = &body.stmts[0] else {
            panic!("expected call stmt");
        };
        let Expr::Star { x, .. } = &args[0] else {
            panic!("expected deref arg");
        };
        assert!(matches!(x.as_ref(), Expr::Selector { .. }));
    }

    #[test]
    fn parses_method_declaration() {
        let file = parse("package p\n\nfunc (s *S) Get() int {\n\treturn 0\n}\n");
        let Decl::Func(func) = &file.decls[0] else {
            panic!("expected func decl");
        };
        assert!(func.recv.is_some());
        assert_eq!(func.name.name, "Get");
    }

    #[test]
    fn parses_slice_and_len_guard() {
        let file = parse("package p\n\nfunc f(s []int) int {\n\tif len(s) > 0 {\n\t\treturn s[0]\n\t}\n\treturn 0\n}\n");
        let Decl::Func(func) = &file.decls[0] else {
            panic!("expected func decl");
        };
        assert!(func.body.is_some());
    }

    #[test]
    fn parses_type_alias() {
        let file = parse("package p\n\ntype fptr = func(int, int) int\n");
        let Decl::Type(specs) = &file.decls[0] else {
            panic!("expected type decl");
        };
        assert!(specs[0].alias);
    }
}
