//! Recursive-descent parser producing the arena AST.
//!
//! The parser works on the fully lexed token vector (semicolons already
//! inserted) and stops at the first syntax error.

use std::path::Path;

use crate::ast::*;
use crate::error::{Diag, ParseFailure};
use crate::lexer::{Lexer, RawComment, Tok};
use crate::parser_support::{named_type_from_ident, resolve_param_list, ParamDecl};
use crate::position::FileSet;

type PResult<T> = Result<T, Diag>;

/// Parses one Go source file and registers it in `fset`.
pub fn parse_file(fset: &mut FileSet, path: &Path, src: &str) -> Result<Ast, ParseFailure> {
    let file_id = fset.add_file(path, src);
    let mut lexer = Lexer::new(src);
    let toks: Vec<_> = lexer.by_ref().collect();
    let mut diags = lexer.take_diags();
    let comments = lexer.take_comments();
    if !diags.is_empty() {
        return Err(ParseFailure { diags });
    }

    let mut p = Parser::new(toks, src.len());
    match p.parse_source_file(&comments) {
        Ok(file) => Ok(Ast {
            arena: p.arena,
            interner: p.interner,
            file,
            file_id,
        }),
        Err(d) => {
            diags.push(d);
            Err(ParseFailure { diags })
        }
    }
}

/// Parses source text outside of any file set.
pub fn parse_str(src: &str) -> Result<Ast, ParseFailure> {
    let mut fset = FileSet::new();
    parse_file(&mut fset, Path::new("<input>"), src)
}

enum Header {
    Simple(SimpleStmtId),
    Range { lhs: Option<RangeLhs>, expr: ExprId },
}

struct Parser<'src> {
    toks: Vec<(usize, Tok<'src>, usize)>,
    pos: usize,
    src_len: usize,
    prev_end: usize,
    /// < 0 inside `if`/`for`/`switch` headers, where `T{` opens the body.
    expr_lev: i32,
    arena: AstArena,
    interner: Interner,
}

fn binary_op(t: Tok<'_>) -> Option<BinaryOp> {
    Some(match t {
        Tok::Plus => BinaryOp::Add,
        Tok::Minus => BinaryOp::Sub,
        Tok::Star => BinaryOp::Mul,
        Tok::Slash => BinaryOp::Div,
        Tok::Percent => BinaryOp::Mod,
        Tok::Amp => BinaryOp::And,
        Tok::Pipe => BinaryOp::Or,
        Tok::Caret => BinaryOp::Xor,
        Tok::Shl => BinaryOp::Shl,
        Tok::Shr => BinaryOp::Shr,
        Tok::AndNot => BinaryOp::AndNot,
        Tok::LAnd => BinaryOp::LAnd,
        Tok::LOr => BinaryOp::LOr,
        Tok::EqEq => BinaryOp::Eq,
        Tok::NotEq => BinaryOp::Ne,
        Tok::Lt => BinaryOp::Lt,
        Tok::Le => BinaryOp::Le,
        Tok::Gt => BinaryOp::Gt,
        Tok::Ge => BinaryOp::Ge,
        _ => return None,
    })
}

fn assign_op(t: Tok<'_>) -> Option<AssignOp> {
    Some(match t {
        Tok::Assign => AssignOp::Assign,
        Tok::AddAssign => AssignOp::AddAssign,
        Tok::SubAssign => AssignOp::SubAssign,
        Tok::MulAssign => AssignOp::MulAssign,
        Tok::DivAssign => AssignOp::DivAssign,
        Tok::ModAssign => AssignOp::ModAssign,
        Tok::AndAssign => AssignOp::AndAssign,
        Tok::OrAssign => AssignOp::OrAssign,
        Tok::XorAssign => AssignOp::XorAssign,
        Tok::ShlAssign => AssignOp::ShlAssign,
        Tok::ShrAssign => AssignOp::ShrAssign,
        Tok::AndNotAssign => AssignOp::AndNotAssign,
        _ => return None,
    })
}

impl<'src> Parser<'src> {
    fn new(toks: Vec<(usize, Tok<'src>, usize)>, src_len: usize) -> Self {
        let mut interner = Interner::new();
        interner.reserve(toks.len() / 4);
        Self {
            toks,
            pos: 0,
            src_len,
            prev_end: 0,
            expr_lev: 0,
            arena: AstArena::new(),
            interner,
        }
    }

    // ---------------------------------------------------------------------
    // Token cursor
    // ---------------------------------------------------------------------

    #[inline]
    fn at_eof(&self) -> bool {
        self.pos >= self.toks.len()
    }

    /// Current token; `Tok::Error` past the end (lex errors abort earlier).
    #[inline]
    fn peek(&self) -> Tok<'src> {
        self.peek_at(0)
    }

    #[inline]
    fn peek_at(&self, n: usize) -> Tok<'src> {
        self.toks
            .get(self.pos + n)
            .map(|t| t.1)
            .unwrap_or(Tok::Error)
    }

    #[inline]
    fn start(&self) -> usize {
        self.toks
            .get(self.pos)
            .map(|t| t.0)
            .unwrap_or(self.src_len)
    }

    fn bump(&mut self) -> (usize, Tok<'src>, usize) {
        let t = self
            .toks
            .get(self.pos)
            .copied()
            .unwrap_or((self.src_len, Tok::Error, self.src_len));
        if self.pos < self.toks.len() {
            self.pos += 1;
        }
        self.prev_end = t.2;
        t
    }

    #[inline]
    fn at(&self, t: Tok<'src>) -> bool {
        !self.at_eof() && self.peek() == t
    }

    fn eat(&mut self, t: Tok<'src>) -> bool {
        if self.at(t) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, t: Tok<'src>, what: &str) -> PResult<usize> {
        if self.at(t) {
            Ok(self.bump().0)
        } else {
            self.unexpected(what)
        }
    }

    /// `;` may be omitted before a closing `)` or `}`.
    fn expect_semi(&mut self) -> PResult<()> {
        if self.eat(Tok::Semi) || self.at_eof() || matches!(self.peek(), Tok::RParen | Tok::RBrace) {
            Ok(())
        } else {
            self.unexpected("';' or newline")
        }
    }

    fn unexpected<T>(&self, what: &str) -> PResult<T> {
        let (span, found) = match self.toks.get(self.pos) {
            Some(&(s, tok, e)) => (Span::new(s, e), tok.to_string()),
            None => (Span::empty_at(self.src_len), "EOF".to_string()),
        };
        Err(Diag::parse(span, format!("expected {what}, found {found}")))
    }

    #[inline]
    fn span_from(&self, start: usize) -> Span {
        Span::new(start, self.prev_end.max(start))
    }

    fn ident(&mut self) -> PResult<IdentName> {
        match self.peek() {
            Tok::Ident(s) => {
                let (start, _, end) = self.bump();
                Ok(IdentName {
                    sym: self.interner.intern(s),
                    pos: Span::new(start, end),
                })
            }
            _ => self.unexpected("identifier"),
        }
    }

    fn with_lev<T>(&mut self, lev: i32, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        let saved = self.expr_lev;
        self.expr_lev = lev;
        let out = f(self);
        self.expr_lev = saved;
        out
    }

    // ---------------------------------------------------------------------
    // File and declarations
    // ---------------------------------------------------------------------

    fn parse_source_file(&mut self, comments: &[RawComment<'_>]) -> PResult<SourceFile> {
        let kw = self.expect(Tok::KwPackage, "'package'")?;
        let package_pos = self.span_from(kw);
        let package = self.ident()?;
        self.expect_semi()?;

        let mut decls = Vec::new();
        while self.at(Tok::KwImport) {
            decls.push(TopLevelDecl::Decl(self.parse_gen_decl(GenDeclKind::Import)?));
            self.expect_semi()?;
        }

        while !self.at_eof() {
            let decl = match self.peek() {
                Tok::KwFunc => TopLevelDecl::Func(self.parse_func_decl()?),
                Tok::KwConst => TopLevelDecl::Decl(self.parse_gen_decl(GenDeclKind::Const)?),
                Tok::KwVar => TopLevelDecl::Decl(self.parse_gen_decl(GenDeclKind::Var)?),
                Tok::KwType => TopLevelDecl::Decl(self.parse_gen_decl(GenDeclKind::Type)?),
                Tok::KwImport => {
                    return self.unexpected("declaration (imports must come first)");
                }
                Tok::Semi => {
                    self.bump();
                    continue;
                }
                _ => return self.unexpected("declaration"),
            };
            decls.push(decl);
            self.expect_semi()?;
        }

        let mut comment_ids = Vec::with_capacity(comments.len());
        for c in comments {
            let comment = Comment {
                kind: if c.block {
                    CommentKind::Block
                } else {
                    CommentKind::Line
                },
                text: self.interner.intern(c.text),
                trailing: c.trailing,
            };
            comment_ids.push(self.arena.comments.alloc(comment, c.span));
        }

        Ok(SourceFile {
            package,
            package_pos,
            decls: self.arena.list_top_decls(decls),
            comments: self.arena.list_comment_ids(comment_ids),
        })
    }

    fn parse_gen_decl(&mut self, kind: GenDeclKind) -> PResult<DeclId> {
        let start = self.bump().0;
        let mut specs = Vec::new();
        let grouped = self.eat(Tok::LParen);

        if grouped {
            while !self.at(Tok::RParen) && !self.at_eof() {
                specs.push(self.parse_spec(kind)?);
                self.expect_semi()?;
            }
            self.expect(Tok::RParen, "')'")?;
        } else {
            specs.push(self.parse_spec(kind)?);
        }

        let specs = self.arena.list_specs(specs);
        Ok(self.arena.decls.alloc(
            Decl {
                kind,
                grouped,
                specs,
            },
            self.span_from(start),
        ))
    }

    fn parse_spec(&mut self, kind: GenDeclKind) -> PResult<Spec> {
        match kind {
            GenDeclKind::Import => {
                let name = match self.peek() {
                    Tok::Dot => {
                        self.bump();
                        Some(ImportName::Dot)
                    }
                    Tok::Ident("_") => {
                        self.bump();
                        Some(ImportName::Blank)
                    }
                    Tok::Ident(_) => Some(ImportName::Name(self.ident()?.sym)),
                    _ => None,
                };
                let path = self.string_lit("import path")?;
                Ok(Spec::Import(ImportSpec { name, path }))
            }
            GenDeclKind::Const | GenDeclKind::Var => {
                let mut names = vec![self.ident()?];
                while self.eat(Tok::Comma) {
                    names.push(self.ident()?);
                }
                let typ = if matches!(self.peek(), Tok::Assign | Tok::Semi | Tok::RParen) || self.at_eof()
                {
                    None
                } else {
                    Some(self.parse_type()?)
                };
                let values = if self.eat(Tok::Assign) {
                    self.parse_expr_list()?
                } else {
                    ListRef::EMPTY
                };
                Ok(Spec::Value(ValueSpec {
                    names: self.arena.list_ident_names(names),
                    typ,
                    values,
                }))
            }
            GenDeclKind::Type => {
                let name = self.ident()?;
                let type_params = if self.at(Tok::LBrack) && self.looks_like_type_params() {
                    Some(self.parse_type_params()?)
                } else {
                    None
                };
                let alias = self.eat(Tok::Assign);
                let typ = self.parse_type()?;
                Ok(Spec::Type(TypeSpec {
                    name,
                    type_params,
                    alias,
                    typ,
                }))
            }
        }
    }

    fn string_lit(&mut self, what: &str) -> PResult<StringLit> {
        match self.peek() {
            Tok::StringLit(s) | Tok::RawStringLit(s) => {
                self.bump();
                Ok(StringLit {
                    raw: self.interner.intern(s),
                })
            }
            _ => self.unexpected(what),
        }
    }

    /// `type T[P any]` versus `type T [N]int`.
    fn looks_like_type_params(&self) -> bool {
        matches!(self.peek_at(1), Tok::Ident(_))
            && matches!(
                self.peek_at(2),
                Tok::Ident(_)
                    | Tok::Comma
                    | Tok::Tilde
                    | Tok::LBrack
                    | Tok::KwInterface
                    | Tok::KwFunc
                    | Tok::KwMap
                    | Tok::KwChan
            )
    }

    /// With the cursor on `name [`, decides whether the bracket opens the type
    /// of a named entry (`a []int`, `a [4]int`) rather than type arguments of
    /// an unnamed one (`List[T]`).
    fn name_then_bracket_type(&self) -> bool {
        if self.peek_at(2) == Tok::RBrack {
            return true;
        }
        let mut depth = 0i32;
        let mut i = self.pos + 1;
        while let Some(&(_, t, _)) = self.toks.get(i) {
            match t {
                Tok::LBrack | Tok::LParen | Tok::LBrace => depth += 1,
                Tok::RBrack | Tok::RParen | Tok::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            i += 1;
        }
        !matches!(
            self.toks.get(i + 1).map(|t| t.1),
            None | Some(
                Tok::Comma
                    | Tok::RParen
                    | Tok::Semi
                    | Tok::RBrace
                    | Tok::StringLit(_)
                    | Tok::RawStringLit(_)
            )
        )
    }

    fn parse_func_decl(&mut self) -> PResult<FuncDeclId> {
        let start = self.bump().0;

        let recv = if self.at(Tok::LParen) {
            let fields = self.parse_params()?;
            let first = self
                .arena
                .fields_list(fields)
                .first()
                .copied()
                .map(|f| self.arena.fields[f]);
            match first {
                Some(field) => Some(Receiver {
                    name: self.arena.ident_names(field.names).first().copied(),
                    typ: field.typ,
                }),
                None => return self.unexpected("receiver"),
            }
        } else {
            None
        };

        let name = self.ident()?;
        let type_params = if self.at(Tok::LBrack) {
            Some(self.parse_type_params()?)
        } else {
            None
        };
        let sig_start = self.start();
        let signature = self.parse_signature(sig_start)?;
        let body = if self.at(Tok::LBrace) {
            Some(self.with_lev(0, |p| p.parse_block())?)
        } else {
            None
        };

        Ok(self.arena.funcs.alloc(
            FuncDecl {
                recv,
                name,
                type_params,
                signature,
                body,
            },
            self.span_from(start),
        ))
    }

    fn parse_type_params(&mut self) -> PResult<TypeParamsId> {
        let start = self.bump().0;
        let mut decls = Vec::new();

        while !self.at(Tok::RBrack) {
            let dstart = self.start();
            let mut names = vec![self.ident()?];
            while self.eat(Tok::Comma) {
                names.push(self.ident()?);
            }
            let constraint = self.parse_constraint()?;
            let names = self.arena.list_ident_names(names);
            decls.push(
                self.arena
                    .type_param_decls
                    .alloc(TypeParamDecl { names, constraint }, self.span_from(dstart)),
            );
            if !self.eat(Tok::Comma) {
                break;
            }
        }
        self.expect(Tok::RBrack, "']'")?;

        let params = self.arena.list_type_param_decl_ids(decls);
        Ok(self
            .arena
            .type_params
            .alloc(TypeParams { params }, self.span_from(start)))
    }

    fn parse_constraint(&mut self) -> PResult<TypeId> {
        let start = self.start();
        let mut terms = vec![self.parse_type_term()?];
        while self.eat(Tok::Pipe) {
            terms.push(self.parse_type_term()?);
        }
        if terms.len() == 1 && !terms[0].tilde {
            return Ok(terms[0].typ);
        }
        let terms = self.arena.list_type_terms(terms);
        Ok(self.arena.types.alloc(Type::Union(terms), self.span_from(start)))
    }

    fn parse_type_term(&mut self) -> PResult<TypeTerm> {
        let tilde = self.eat(Tok::Tilde);
        Ok(TypeTerm {
            tilde,
            typ: self.parse_type()?,
        })
    }

    // ---------------------------------------------------------------------
    // Signatures
    // ---------------------------------------------------------------------

    fn parse_signature(&mut self, start: usize) -> PResult<SignatureId> {
        let params = self.parse_params()?;
        let results = if self.at(Tok::LParen) {
            Some(Results::Params(self.parse_params()?))
        } else if self.at_type_start() {
            Some(Results::Type(self.parse_type()?))
        } else {
            None
        };
        Ok(self
            .arena
            .signatures
            .alloc(Signature { params, results }, self.span_from(start)))
    }

    fn at_type_start(&self) -> bool {
        !self.at_eof()
            && matches!(
                self.peek(),
                Tok::Ident(_)
                    | Tok::LBrack
                    | Tok::Star
                    | Tok::KwMap
                    | Tok::KwChan
                    | Tok::KwStruct
                    | Tok::KwInterface
                    | Tok::KwFunc
                    | Tok::Arrow
            )
    }

    fn parse_params(&mut self) -> PResult<ListRef<FieldId>> {
        self.expect(Tok::LParen, "'('")?;
        let mut entries = Vec::new();
        while !self.at(Tok::RParen) {
            entries.push(self.parse_param_entry()?);
            if !self.eat(Tok::Comma) {
                break;
            }
        }
        self.expect(Tok::RParen, "')'")?;
        let fields = resolve_param_list(&mut self.arena, entries);
        Ok(self.arena.list_fields(fields))
    }

    fn parse_param_entry(&mut self) -> PResult<ParamDecl> {
        let start = self.start();

        if let Tok::Ident(_) = self.peek() {
            let named = match self.peek_at(1) {
                Tok::Comma | Tok::RParen => {
                    let name = self.ident()?;
                    return Ok(ParamDecl {
                        names: vec![name],
                        variadic: false,
                        typ: None,
                        span: self.span_from(start),
                    });
                }
                Tok::Dot => false,
                Tok::LBrack => self.name_then_bracket_type(),
                _ => true,
            };
            if named {
                let name = self.ident()?;
                let variadic = self.eat(Tok::Ellipsis);
                let typ = self.parse_type()?;
                return Ok(ParamDecl {
                    names: vec![name],
                    variadic,
                    typ: Some(typ),
                    span: self.span_from(start),
                });
            }
        }

        let variadic = self.eat(Tok::Ellipsis);
        let typ = self.parse_type()?;
        Ok(ParamDecl {
            names: Vec::new(),
            variadic,
            typ: Some(typ),
            span: self.span_from(start),
        })
    }

    // ---------------------------------------------------------------------
    // Types
    // ---------------------------------------------------------------------

    fn parse_type(&mut self) -> PResult<TypeId> {
        let start = self.start();
        let t = match self.peek() {
            Tok::Ident(_) => return self.parse_type_name(),
            Tok::Star => {
                self.bump();
                Type::Pointer(self.parse_type()?)
            }
            Tok::LBrack => {
                self.bump();
                if self.eat(Tok::RBrack) {
                    Type::Slice(self.parse_type()?)
                } else {
                    let len = if self.eat(Tok::Ellipsis) {
                        ArrayLen::Ellipsis
                    } else {
                        ArrayLen::Expr(self.with_lev(1, |p| p.parse_expr())?)
                    };
                    self.expect(Tok::RBrack, "']'")?;
                    Type::Array {
                        len,
                        elem: self.parse_type()?,
                    }
                }
            }
            Tok::KwMap => {
                self.bump();
                self.expect(Tok::LBrack, "'['")?;
                let key = self.parse_type()?;
                self.expect(Tok::RBrack, "']'")?;
                Type::Map {
                    key,
                    val: self.parse_type()?,
                }
            }
            Tok::KwChan => {
                self.bump();
                let dir = if self.eat(Tok::Arrow) {
                    ChanDir::Send
                } else {
                    ChanDir::Both
                };
                Type::Chan {
                    dir,
                    elem: self.parse_type()?,
                }
            }
            Tok::Arrow => {
                self.bump();
                self.expect(Tok::KwChan, "'chan'")?;
                Type::Chan {
                    dir: ChanDir::Recv,
                    elem: self.parse_type()?,
                }
            }
            Tok::KwStruct => self.parse_struct_type()?,
            Tok::KwInterface => self.parse_interface_type()?,
            Tok::KwFunc => {
                self.bump();
                Type::Func(self.parse_signature(start)?)
            }
            Tok::LParen => {
                self.bump();
                let inner = self.parse_type()?;
                self.expect(Tok::RParen, "')'")?;
                Type::Paren(inner)
            }
            _ => return self.unexpected("type"),
        };
        Ok(self.arena.types.alloc(t, self.span_from(start)))
    }

    fn parse_type_name(&mut self) -> PResult<TypeId> {
        let start = self.start();
        let first = self.ident()?;
        let (pkg, name) = if self.eat(Tok::Dot) {
            (Some(first), self.ident()?)
        } else {
            (None, first)
        };
        let args = if self.at(Tok::LBrack) {
            self.parse_type_args()?
        } else {
            ListRef::EMPTY
        };
        Ok(self
            .arena
            .types
            .alloc(Type::Named { pkg, name, args }, self.span_from(start)))
    }

    fn parse_type_args(&mut self) -> PResult<ListRef<TypeId>> {
        self.expect(Tok::LBrack, "'['")?;
        let mut args = Vec::new();
        while !self.at(Tok::RBrack) {
            args.push(self.parse_type()?);
            if !self.eat(Tok::Comma) {
                break;
            }
        }
        self.expect(Tok::RBrack, "']'")?;
        Ok(self.arena.list_types(args))
    }

    fn parse_struct_type(&mut self) -> PResult<Type> {
        self.bump();
        self.expect(Tok::LBrace, "'{'")?;
        let mut fields = Vec::new();
        while !self.at(Tok::RBrace) && !self.at_eof() {
            fields.push(self.parse_struct_field()?);
            self.expect_semi()?;
        }
        self.expect(Tok::RBrace, "'}'")?;
        Ok(Type::Struct {
            fields: self.arena.list_fields(fields),
        })
    }

    fn parse_struct_field(&mut self) -> PResult<FieldId> {
        let start = self.start();
        let embedded = match self.peek() {
            Tok::Star => true,
            Tok::Ident(_) => match self.peek_at(1) {
                Tok::Dot | Tok::Semi | Tok::RBrace | Tok::StringLit(_) | Tok::RawStringLit(_) => true,
                Tok::LBrack => !self.name_then_bracket_type(),
                _ => false,
            },
            _ => return self.unexpected("field name or embedded type"),
        };

        let (names, typ) = if embedded {
            (ListRef::EMPTY, self.parse_type()?)
        } else {
            let mut names = vec![self.ident()?];
            while self.eat(Tok::Comma) {
                names.push(self.ident()?);
            }
            let names = self.arena.list_ident_names(names);
            (names, self.parse_type()?)
        };

        let tag = match self.peek() {
            Tok::StringLit(_) | Tok::RawStringLit(_) => Some(self.string_lit("tag")?),
            _ => None,
        };

        Ok(self.arena.fields.alloc(
            Field {
                names,
                variadic: false,
                typ,
                tag,
                embedded,
            },
            self.span_from(start),
        ))
    }

    fn parse_interface_type(&mut self) -> PResult<Type> {
        self.bump();
        self.expect(Tok::LBrace, "'{'")?;
        let mut elems = Vec::new();
        while !self.at(Tok::RBrace) && !self.at_eof() {
            let elem = if matches!(self.peek(), Tok::Ident(_)) && self.peek_at(1) == Tok::LParen {
                let name = self.ident()?;
                let sig_start = self.start();
                InterfaceElem::Method {
                    name,
                    sig: self.parse_signature(sig_start)?,
                }
            } else {
                InterfaceElem::Embed(self.parse_constraint()?)
            };
            elems.push(elem);
            self.expect_semi()?;
        }
        self.expect(Tok::RBrace, "'}'")?;
        Ok(Type::Interface {
            elems: self.arena.list_interface_elems(elems),
        })
    }

    // ---------------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------------

    fn parse_expr(&mut self) -> PResult<ExprId> {
        self.parse_binary(1)
    }

    fn parse_expr_vec(&mut self) -> PResult<Vec<ExprId>> {
        let mut out = vec![self.parse_expr()?];
        while self.eat(Tok::Comma) {
            out.push(self.parse_expr()?);
        }
        Ok(out)
    }

    fn parse_expr_list(&mut self) -> PResult<ListRef<ExprId>> {
        let v = self.parse_expr_vec()?;
        Ok(self.arena.list_exprs(v))
    }

    fn parse_binary(&mut self, min_prec: u8) -> PResult<ExprId> {
        let start = self.start();
        let mut left = self.parse_unary()?;
        while let Some(op) = binary_op(self.peek()).filter(|_| !self.at_eof()) {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.bump();
            let right = self.parse_binary(prec + 1)?;
            left = self
                .arena
                .exprs
                .alloc(Expr::Binary { left, op, right }, self.span_from(start));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> PResult<ExprId> {
        let start = self.start();
        let op = match self.peek() {
            Tok::Plus => UnaryOp::Add,
            Tok::Minus => UnaryOp::Sub,
            Tok::Bang => UnaryOp::Not,
            Tok::Caret => UnaryOp::Xor,
            Tok::Star => UnaryOp::Deref,
            Tok::Amp => UnaryOp::Addr,
            Tok::Arrow => UnaryOp::Recv,
            Tok::Tilde => UnaryOp::Tilde,
            _ => return self.parse_primary(),
        };

        if op == UnaryOp::Recv && self.peek_at(1) == Tok::KwChan {
            // `<-chan T` in expression position
            let t = self.parse_type()?;
            let x = self.arena.exprs.alloc(Expr::Type(t), self.span_from(start));
            return self.parse_primary_suffix(x, start);
        }

        self.bump();
        let expr = self.parse_unary()?;
        Ok(self
            .arena
            .exprs
            .alloc(Expr::Unary { op, expr }, self.span_from(start)))
    }

    fn parse_primary(&mut self) -> PResult<ExprId> {
        let start = self.start();
        let x = self.parse_operand()?;
        self.parse_primary_suffix(x, start)
    }

    fn basic_lit(&mut self, kind: BasicLitKind, raw: &str) -> Expr {
        self.bump();
        Expr::BasicLit(BasicLit {
            kind,
            raw: self.interner.intern(raw),
        })
    }

    fn parse_operand(&mut self) -> PResult<ExprId> {
        let start = self.start();
        let e = match self.peek() {
            Tok::Ident(s) => {
                self.bump();
                Expr::Ident(self.interner.intern(s))
            }
            Tok::IntLit(s) => self.basic_lit(BasicLitKind::Int, s),
            Tok::FloatLit(s) => self.basic_lit(BasicLitKind::Float, s),
            Tok::ImagLit(s) => self.basic_lit(BasicLitKind::Imag, s),
            Tok::RuneLit(s) => self.basic_lit(BasicLitKind::Char, s),
            Tok::StringLit(s) | Tok::RawStringLit(s) => self.basic_lit(BasicLitKind::String, s),
            Tok::LParen => {
                self.bump();
                let lev = self.expr_lev + 1;
                let inner = self.with_lev(lev, |p| p.parse_expr())?;
                self.expect(Tok::RParen, "')'")?;
                Expr::Paren(inner)
            }
            Tok::KwFunc => {
                self.bump();
                let sig = self.parse_signature(start)?;
                if self.at(Tok::LBrace) {
                    let body = self.with_lev(0, |p| p.parse_block())?;
                    Expr::FuncLit { sig, body }
                } else {
                    let t = self.arena.types.alloc(Type::Func(sig), self.span_from(start));
                    Expr::Type(t)
                }
            }
            Tok::LBrack | Tok::KwMap | Tok::KwChan | Tok::KwStruct | Tok::KwInterface => {
                Expr::Type(self.parse_type()?)
            }
            _ => return self.unexpected("expression"),
        };
        Ok(self.arena.exprs.alloc(e, self.span_from(start)))
    }

    fn parse_primary_suffix(&mut self, mut x: ExprId, start: usize) -> PResult<ExprId> {
        loop {
            if self.at_eof() {
                return Ok(x);
            }
            let e = match self.peek() {
                Tok::Dot => {
                    self.bump();
                    match self.peek() {
                        Tok::Ident(_) => Expr::Selector {
                            expr: x,
                            sel: self.ident()?,
                        },
                        Tok::LParen => {
                            self.bump();
                            let typ = if self.eat(Tok::KwType) {
                                None
                            } else {
                                Some(self.parse_type()?)
                            };
                            self.expect(Tok::RParen, "')'")?;
                            Expr::TypeAssert { expr: x, typ }
                        }
                        _ => return self.unexpected("selector or type assertion"),
                    }
                }
                Tok::LBrack => self.parse_index_or_slice(x)?,
                Tok::LParen => self.parse_call(x)?,
                Tok::LBrace if self.is_literal_type(x) => {
                    let typ = self.expr_to_type(x)?;
                    let lit = self.parse_literal_value()?;
                    Expr::CompositeLit { typ, lit }
                }
                _ => return Ok(x),
            };
            x = self.arena.exprs.alloc(e, self.span_from(start));
        }
    }

    fn is_type_name(&self, x: ExprId) -> bool {
        match self.arena.exprs[x] {
            Expr::Ident(_) => true,
            Expr::Selector { expr, .. } => matches!(self.arena.exprs[expr], Expr::Ident(_)),
            Expr::Index { base, .. } => self.is_type_name(base),
            _ => false,
        }
    }

    fn is_literal_type(&self, x: ExprId) -> bool {
        match self.arena.exprs[x] {
            Expr::Ident(_) | Expr::Selector { .. } | Expr::Index { .. } => {
                self.expr_lev >= 0 && self.is_type_name(x)
            }
            Expr::Type(t) => matches!(
                self.arena.types[t],
                Type::Array { .. } | Type::Slice(_) | Type::Map { .. } | Type::Struct { .. }
            ),
            _ => false,
        }
    }

    /// Reinterprets a parsed expression as a type (`T{}`, `pkg.T{}`, `G[int]{}`).
    fn expr_to_type(&mut self, x: ExprId) -> PResult<TypeId> {
        let span = self.arena.exprs.span(x);
        let t = match self.arena.exprs[x] {
            Expr::Type(t) => return Ok(t),
            Expr::Ident(sym) => {
                return Ok(named_type_from_ident(
                    &mut self.arena,
                    IdentName { sym, pos: span },
                ))
            }
            Expr::Selector { expr, sel } => match self.arena.exprs[expr] {
                Expr::Ident(p) => Type::Named {
                    pkg: Some(IdentName {
                        sym: p,
                        pos: self.arena.exprs.span(expr),
                    }),
                    name: sel,
                    args: ListRef::EMPTY,
                },
                _ => return Err(Diag::parse(span, "expected type")),
            },
            Expr::Index { base, indices } => {
                let base_t = self.expr_to_type(base)?;
                let indices = self.arena.exprs_list(indices).to_vec();
                let mut args = Vec::with_capacity(indices.len());
                for i in indices {
                    args.push(self.expr_to_type(i)?);
                }
                match self.arena.types[base_t] {
                    Type::Named { pkg, name, .. } => Type::Named {
                        pkg,
                        name,
                        args: self.arena.list_types(args),
                    },
                    _ => return Err(Diag::parse(span, "expected generic type")),
                }
            }
            Expr::Paren(e) => Type::Paren(self.expr_to_type(e)?),
            Expr::Unary {
                op: UnaryOp::Deref,
                expr,
            } => Type::Pointer(self.expr_to_type(expr)?),
            _ => return Err(Diag::parse(span, "expected type")),
        };
        Ok(self.arena.types.alloc(t, span))
    }

    fn parse_index_or_slice(&mut self, x: ExprId) -> PResult<Expr> {
        self.bump();
        let lev = self.expr_lev + 1;
        let e = self.with_lev(lev, |p| {
            let mut lo = None;
            if !p.at(Tok::Colon) {
                let first = p.parse_expr()?;
                if !p.at(Tok::Colon) {
                    let mut list = vec![first];
                    while p.eat(Tok::Comma) {
                        if p.at(Tok::RBrack) {
                            break;
                        }
                        list.push(p.parse_expr()?);
                    }
                    return Ok(Expr::Index {
                        base: x,
                        indices: p.arena.list_exprs(list),
                    });
                }
                lo = Some(first);
            }
            p.expect(Tok::Colon, "':'")?;
            let hi = if p.at(Tok::Colon) || p.at(Tok::RBrack) {
                None
            } else {
                Some(p.parse_expr()?)
            };
            let (max, three) = if p.eat(Tok::Colon) {
                (Some(p.parse_expr()?), true)
            } else {
                (None, false)
            };
            Ok(Expr::Slice {
                expr: x,
                lo,
                hi,
                max,
                three,
            })
        })?;
        self.expect(Tok::RBrack, "']'")?;
        Ok(e)
    }

    fn parse_call(&mut self, fun: ExprId) -> PResult<Expr> {
        self.bump();
        let lev = self.expr_lev + 1;
        let (args, ellipsis) = self.with_lev(lev, |p| {
            let mut args = Vec::new();
            let mut ellipsis = false;
            while !p.at(Tok::RParen) && !p.at_eof() {
                args.push(p.parse_expr()?);
                if p.eat(Tok::Ellipsis) {
                    ellipsis = true;
                }
                if !p.eat(Tok::Comma) {
                    break;
                }
            }
            Ok((args, ellipsis))
        })?;
        self.expect(Tok::RParen, "')'")?;
        Ok(Expr::Call {
            fun,
            args: self.arena.list_exprs(args),
            ellipsis,
        })
    }

    fn parse_literal_value(&mut self) -> PResult<LiteralValue> {
        self.expect(Tok::LBrace, "'{'")?;
        let elems = self.with_lev(0, |p| {
            let mut elems = Vec::new();
            while !p.at(Tok::RBrace) && !p.at_eof() {
                let first = p.parse_element()?;
                let elem = if p.eat(Tok::Colon) {
                    let key = match first {
                        Element::Expr(e) => Key::Expr(e),
                        Element::Literal(l) => Key::Literal(l),
                    };
                    KeyedElement {
                        key: Some(key),
                        value: p.parse_element()?,
                    }
                } else {
                    KeyedElement {
                        key: None,
                        value: first,
                    }
                };
                elems.push(elem);
                if !p.eat(Tok::Comma) {
                    break;
                }
            }
            Ok(elems)
        })?;
        self.expect(Tok::RBrace, "'}'")?;
        Ok(LiteralValue {
            elements: self.arena.list_keyed_elems(elems),
        })
    }

    fn parse_element(&mut self) -> PResult<Element> {
        if self.at(Tok::LBrace) {
            Ok(Element::Literal(self.parse_literal_value()?))
        } else {
            Ok(Element::Expr(self.parse_expr()?))
        }
    }

    // ---------------------------------------------------------------------
    // Statements
    // ---------------------------------------------------------------------

    fn parse_block(&mut self) -> PResult<Block> {
        self.expect(Tok::LBrace, "'{'")?;
        let stmts = self.parse_stmt_list()?;
        self.expect(Tok::RBrace, "'}'")?;
        Ok(Block { stmts })
    }

    fn parse_stmt_list(&mut self) -> PResult<ListRef<StmtId>> {
        let mut out = Vec::new();
        while !self.at_eof() && !matches!(self.peek(), Tok::RBrace | Tok::KwCase | Tok::KwDefault) {
            if self.eat(Tok::Semi) {
                continue;
            }
            out.push(self.parse_stmt()?);
            self.expect_semi()?;
        }
        Ok(self.arena.list_stmts(out))
    }

    fn empty_stmt(&mut self) -> StmtId {
        let at = Span::empty_at(self.start());
        let s = self.arena.simple_stmts.alloc(SimpleStmt::Empty, at);
        self.arena.stmts.alloc(Stmt::Simple(s), at)
    }

    fn parse_stmt(&mut self) -> PResult<StmtId> {
        let start = self.start();
        let s = match self.peek() {
            Tok::KwVar => Stmt::Decl(self.parse_gen_decl(GenDeclKind::Var)?),
            Tok::KwConst => Stmt::Decl(self.parse_gen_decl(GenDeclKind::Const)?),
            Tok::KwType => Stmt::Decl(self.parse_gen_decl(GenDeclKind::Type)?),
            Tok::Ident(_) if self.peek_at(1) == Tok::Colon => {
                let label = self.ident()?;
                self.bump();
                let stmt = if matches!(self.peek(), Tok::RBrace | Tok::Semi) || self.at_eof() {
                    self.empty_stmt()
                } else {
                    self.parse_stmt()?
                };
                Stmt::Labeled { label, stmt }
            }
            Tok::KwGo => {
                self.bump();
                Stmt::Go(self.parse_expr()?)
            }
            Tok::KwDefer => {
                self.bump();
                Stmt::Defer(self.parse_expr()?)
            }
            Tok::KwReturn => {
                self.bump();
                let values = if matches!(self.peek(), Tok::Semi | Tok::RBrace) || self.at_eof() {
                    ListRef::EMPTY
                } else {
                    self.parse_expr_list()?
                };
                Stmt::Return(values)
            }
            Tok::KwBreak | Tok::KwContinue | Tok::KwGoto | Tok::KwFallthrough => {
                let kind = match self.bump().1 {
                    Tok::KwBreak => BranchKind::Break,
                    Tok::KwContinue => BranchKind::Continue,
                    Tok::KwGoto => BranchKind::Goto,
                    _ => BranchKind::Fallthrough,
                };
                let label = match self.peek() {
                    Tok::Ident(_) if kind != BranchKind::Fallthrough => Some(self.ident()?),
                    _ => None,
                };
                Stmt::Branch { kind, label }
            }
            Tok::LBrace => Stmt::Block(self.parse_block()?),
            Tok::KwIf => self.parse_if()?,
            Tok::KwFor => self.parse_for()?,
            Tok::KwSwitch => self.parse_switch()?,
            Tok::KwSelect => self.parse_select()?,
            _ => Stmt::Simple(self.parse_simple_stmt()?),
        };
        Ok(self.arena.stmts.alloc(s, self.span_from(start)))
    }

    fn parse_simple_stmt(&mut self) -> PResult<SimpleStmtId> {
        match self.parse_header(false)? {
            Header::Simple(s) => Ok(s),
            Header::Range { .. } => self.unexpected("statement"),
        }
    }

    fn idents_of(&mut self, exprs: &[ExprId]) -> PResult<ListRef<IdentName>> {
        let mut names = Vec::with_capacity(exprs.len());
        for &e in exprs {
            match self.arena.exprs[e] {
                Expr::Ident(sym) => names.push(IdentName {
                    sym,
                    pos: self.arena.exprs.span(e),
                }),
                _ => {
                    return Err(Diag::parse(
                        self.arena.exprs.span(e),
                        "non-name on left side of :=",
                    ))
                }
            }
        }
        Ok(self.arena.list_ident_names(names))
    }

    /// Simple statement, or a range clause when `range_ok`.
    fn parse_header(&mut self, range_ok: bool) -> PResult<Header> {
        let start = self.start();
        if range_ok && self.eat(Tok::KwRange) {
            let expr = self.parse_expr()?;
            return Ok(Header::Range { lhs: None, expr });
        }

        let lhs = self.parse_expr_vec()?;
        let s = match self.peek() {
            _ if self.at_eof() => self.single_expr(&lhs)?,
            Tok::Define => {
                self.bump();
                let names = self.idents_of(&lhs)?;
                if range_ok && self.eat(Tok::KwRange) {
                    let expr = self.parse_expr()?;
                    return Ok(Header::Range {
                        lhs: Some(RangeLhs::Def(names)),
                        expr,
                    });
                }
                let values = self.parse_expr_list()?;
                SimpleStmt::ShortVarDecl { names, values }
            }
            t if assign_op(t).is_some() => {
                let op = assign_op(t).unwrap_or(AssignOp::Assign);
                self.bump();
                let lhs = self.arena.list_exprs(lhs);
                if op == AssignOp::Assign && range_ok && self.eat(Tok::KwRange) {
                    let expr = self.parse_expr()?;
                    return Ok(Header::Range {
                        lhs: Some(RangeLhs::Assign(lhs)),
                        expr,
                    });
                }
                let rhs = self.parse_expr_list()?;
                SimpleStmt::Assign { lhs, op, rhs }
            }
            Tok::Inc | Tok::Dec => {
                let expr = self.single(&lhs)?;
                let op = if self.bump().1 == Tok::Inc {
                    IncDecOp::Inc
                } else {
                    IncDecOp::Dec
                };
                SimpleStmt::IncDec { expr, op }
            }
            Tok::Arrow => {
                let chan = self.single(&lhs)?;
                self.bump();
                let value = self.parse_expr()?;
                SimpleStmt::Send { chan, value }
            }
            _ => self.single_expr(&lhs)?,
        };

        Ok(Header::Simple(
            self.arena.simple_stmts.alloc(s, self.span_from(start)),
        ))
    }

    fn single(&self, lhs: &[ExprId]) -> PResult<ExprId> {
        match lhs {
            [e] => Ok(*e),
            _ => self.unexpected("single expression"),
        }
    }

    fn single_expr(&self, lhs: &[ExprId]) -> PResult<SimpleStmt> {
        match lhs {
            [e] => Ok(SimpleStmt::Expr(*e)),
            _ => self.unexpected("':=' or '=' or ','"),
        }
    }

    fn parse_if(&mut self) -> PResult<Stmt> {
        self.bump();
        let (init, cond) = self.with_lev(-1, |p| {
            if p.at(Tok::LBrace) {
                return p.unexpected("condition");
            }
            let first = if p.at(Tok::Semi) {
                None
            } else {
                Some(p.parse_simple_stmt()?)
            };
            if p.eat(Tok::Semi) {
                return Ok((first, p.parse_expr()?));
            }
            match first.map(|s| p.arena.simple_stmts[s]) {
                Some(SimpleStmt::Expr(e)) => Ok((None, e)),
                _ => p.unexpected("condition"),
            }
        })?;
        let then_block = self.parse_block()?;

        let else_stmt = if self.eat(Tok::KwElse) {
            let start = self.start();
            let s = match self.peek() {
                Tok::KwIf => self.parse_if()?,
                Tok::LBrace => Stmt::Block(self.parse_block()?),
                _ => return self.unexpected("if statement or block"),
            };
            Some(self.arena.stmts.alloc(s, self.span_from(start)))
        } else {
            None
        };

        Ok(Stmt::If {
            init,
            cond,
            then_block,
            else_stmt,
        })
    }

    fn parse_for(&mut self) -> PResult<Stmt> {
        self.bump();
        let kind = if self.at(Tok::LBrace) {
            ForKind::Infinite
        } else {
            self.with_lev(-1, |p| {
                if p.at(Tok::Semi) {
                    return p.parse_for_clause(None);
                }
                match p.parse_header(true)? {
                    Header::Range { lhs, expr } => Ok(ForKind::Range { lhs, expr }),
                    Header::Simple(s) if p.at(Tok::Semi) => p.parse_for_clause(Some(s)),
                    Header::Simple(s) => match p.arena.simple_stmts[s] {
                        SimpleStmt::Expr(e) => Ok(ForKind::Cond(e)),
                        _ => p.unexpected("for loop condition"),
                    },
                }
            })?
        };
        let block = self.parse_block()?;
        Ok(Stmt::For { kind, block })
    }

    fn parse_for_clause(&mut self, init: Option<SimpleStmtId>) -> PResult<ForKind> {
        self.expect(Tok::Semi, "';'")?;
        let cond = if self.at(Tok::Semi) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(Tok::Semi, "';'")?;
        let post = if self.at(Tok::LBrace) {
            None
        } else {
            Some(self.parse_simple_stmt()?)
        };
        Ok(ForKind::Clause { init, cond, post })
    }

    fn parse_switch(&mut self) -> PResult<Stmt> {
        self.bump();
        let (init, tag) = self.with_lev(-1, |p| {
            if p.at(Tok::LBrace) {
                return Ok((None, None));
            }
            let first = if p.at(Tok::Semi) {
                None
            } else {
                Some(p.parse_simple_stmt()?)
            };
            if p.eat(Tok::Semi) {
                let tag = if p.at(Tok::LBrace) {
                    None
                } else {
                    Some(p.parse_simple_stmt()?)
                };
                Ok((first, tag))
            } else {
                Ok((None, first))
            }
        })?;

        if let Some(guard) = tag.and_then(|s| self.type_switch_guard(s)) {
            let clauses = self.parse_switch_clauses(true)?;
            return Ok(Stmt::TypeSwitch {
                init,
                guard,
                clauses,
            });
        }

        let tag = match tag.map(|s| self.arena.simple_stmts[s]) {
            None => None,
            Some(SimpleStmt::Expr(e)) => Some(e),
            Some(_) => return self.unexpected("switch expression"),
        };
        let clauses = self.parse_switch_clauses(false)?;
        Ok(Stmt::Switch { init, tag, clauses })
    }

    fn type_switch_guard(&self, s: SimpleStmtId) -> Option<TypeSwitchGuard> {
        let operand = |e: ExprId| match self.arena.exprs[e] {
            Expr::TypeAssert { expr, typ: None } => Some(expr),
            _ => None,
        };
        match self.arena.simple_stmts[s] {
            SimpleStmt::Expr(e) => operand(e).map(|x| TypeSwitchGuard { bind: None, x }),
            SimpleStmt::ShortVarDecl { names, values } => {
                match (self.arena.ident_names(names), self.arena.exprs_list(values)) {
                    ([bind], [v]) => operand(*v).map(|x| TypeSwitchGuard {
                        bind: Some(*bind),
                        x,
                    }),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn parse_switch_clauses(&mut self, type_switch: bool) -> PResult<ListRef<SwitchClauseId>> {
        self.expect(Tok::LBrace, "'{'")?;
        let mut out = Vec::new();
        while !self.at(Tok::RBrace) && !self.at_eof() {
            let start = self.start();
            let clause = if self.eat(Tok::KwDefault) {
                self.expect(Tok::Colon, "':'")?;
                let stmts = self.parse_stmt_list()?;
                if type_switch {
                    SwitchClause::TypeCase {
                        items: ListRef::EMPTY,
                        stmts,
                    }
                } else {
                    SwitchClause::ExprCase {
                        items: ListRef::EMPTY,
                        stmts,
                    }
                }
            } else {
                self.expect(Tok::KwCase, "'case' or 'default'")?;
                if type_switch {
                    let mut items = Vec::new();
                    loop {
                        if self.at(Tok::Ident("nil")) {
                            self.bump();
                            items.push(TypeCaseElem::Nil);
                        } else {
                            items.push(TypeCaseElem::Type(self.parse_type()?));
                        }
                        if !self.eat(Tok::Comma) {
                            break;
                        }
                    }
                    self.expect(Tok::Colon, "':'")?;
                    let items = self.arena.list_type_cases(items);
                    let stmts = self.parse_stmt_list()?;
                    SwitchClause::TypeCase { items, stmts }
                } else {
                    let items = self.parse_expr_list()?;
                    self.expect(Tok::Colon, "':'")?;
                    let stmts = self.parse_stmt_list()?;
                    SwitchClause::ExprCase { items, stmts }
                }
            };
            out.push(self.arena.switch_clauses.alloc(clause, self.span_from(start)));
        }
        self.expect(Tok::RBrace, "'}'")?;
        Ok(self.arena.list_switch_clause_ids(out))
    }

    fn parse_select(&mut self) -> PResult<Stmt> {
        self.bump();
        self.expect(Tok::LBrace, "'{'")?;
        let mut out = Vec::new();
        while !self.at(Tok::RBrace) && !self.at_eof() {
            let start = self.start();
            let clause = if self.eat(Tok::KwDefault) {
                self.expect(Tok::Colon, "':'")?;
                CommClause::Default {
                    stmts: self.parse_stmt_list()?,
                }
            } else {
                self.expect(Tok::KwCase, "'case' or 'default'")?;
                let s = self.parse_simple_stmt()?;
                let comm = self.comm_of(s)?;
                self.expect(Tok::Colon, "':'")?;
                CommClause::Case {
                    comm,
                    stmts: self.parse_stmt_list()?,
                }
            };
            out.push(self.arena.comm_clauses.alloc(clause, self.span_from(start)));
        }
        self.expect(Tok::RBrace, "'}'")?;
        Ok(Stmt::Select {
            clauses: self.arena.list_comm_clause_ids(out),
        })
    }

    fn comm_of(&self, s: SimpleStmtId) -> PResult<CommStmt> {
        match self.arena.simple_stmts[s] {
            SimpleStmt::Send { chan, value } => Ok(CommStmt::Send { chan, value }),
            SimpleStmt::Expr(expr) => Ok(CommStmt::Recv { lhs: None, expr }),
            SimpleStmt::ShortVarDecl { names, values } if values.len() == 1 => Ok(CommStmt::Recv {
                lhs: Some(RangeLhs::Def(names)),
                expr: self.arena.exprs_list(values)[0],
            }),
            SimpleStmt::Assign {
                lhs,
                op: AssignOp::Assign,
                rhs,
            } if rhs.len() == 1 => Ok(CommStmt::Recv {
                lhs: Some(RangeLhs::Assign(lhs)),
                expr: self.arena.exprs_list(rhs)[0],
            }),
            _ => Err(Diag::parse(
                self.arena.simple_stmts.span(s),
                "select case must be receive, send or assign recv",
            )),
        }
    }
}
