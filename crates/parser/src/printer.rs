//! Source printer producing tab-indented Go text in gofmt's layout.
//!
//! Output is canonical rather than source-preserving: spacing and line breaks
//! are recomputed. Comments of the original file are re-emitted before the
//! first node that starts after them; trailing comments stay on their line.

use crate::ast::*;

/// Prints a whole file.
pub fn print_file(ast: &Ast) -> String {
    let mut p = Printer::new(ast);
    p.source_file();
    p.out
}

/// Prints one expression (used by diagnostics and tests).
pub fn print_expr(ast: &Ast, e: ExprId) -> String {
    let mut p = Printer::new(ast);
    p.expr(e);
    p.out
}

/// Prints one type.
pub fn print_type(ast: &Ast, t: TypeId) -> String {
    let mut p = Printer::new(ast);
    p.typ(t);
    p.out
}

/// Prints one statement at indentation zero.
pub fn print_stmt(ast: &Ast, s: StmtId) -> String {
    let mut p = Printer::new(ast);
    p.stmt(s);
    p.out
}

struct Printer<'a> {
    ast: &'a Ast,
    a: &'a AstArena,
    out: String,
    indent: usize,
    comments: Vec<(Span, Comment)>,
    next_comment: usize,
}

/// Binary-expression spacing mode (mirrors gofmt's cutoff rule).
#[derive(Clone, Copy)]
struct Cutoff(u8);

impl<'a> Printer<'a> {
    fn new(ast: &'a Ast) -> Self {
        let a = &ast.arena;
        let comments = a
            .comment_ids(ast.file.comments)
            .iter()
            .map(|&id| (a.comments.span(id), a.comments[id]))
            .collect();
        Self {
            ast,
            a,
            out: String::new(),
            indent: 0,
            comments,
            next_comment: 0,
        }
    }

    // ---------------------------------------------------------------------
    // Low-level output
    // ---------------------------------------------------------------------

    #[inline]
    fn w(&mut self, s: &str) {
        self.out.push_str(s);
    }

    #[inline]
    fn sym(&mut self, sym: Symbol) {
        let s = self.ast.str(sym);
        self.out.push_str(s);
    }

    fn tabs(&mut self) {
        for _ in 0..self.indent {
            self.out.push('\t');
        }
    }

    fn newline(&mut self) {
        self.out.push('\n');
    }

    /// Emits every pending comment that starts before `pos`.
    fn flush_comments(&mut self, pos: u32) {
        while let Some(&(span, c)) = self.comments.get(self.next_comment) {
            if span.start >= pos {
                break;
            }
            self.next_comment += 1;
            let text = self.ast.str(c.text);
            if c.trailing && self.out.ends_with('\n') {
                self.out.pop();
                self.out.push(' ');
                self.out.push_str(text);
                self.out.push('\n');
            } else {
                self.tabs();
                self.out.push_str(text);
                self.out.push('\n');
            }
        }
    }

    fn flush_before(&mut self, span: Span) {
        if !span.is_dummy() {
            self.flush_comments(span.start);
        }
    }

    fn flush_through(&mut self, span: Span) {
        if !span.is_dummy() {
            self.flush_comments(span.end);
        }
    }

    // ---------------------------------------------------------------------
    // File and declarations
    // ---------------------------------------------------------------------

    fn source_file(&mut self) {
        let file = self.ast.file;
        self.flush_comments(file.package_pos.start);
        self.w("package ");
        self.sym(file.package.sym);
        self.newline();

        let mut prev_import = false;
        for &d in self.a.top_decls(file.decls) {
            let (span, is_import) = match d {
                TopLevelDecl::Decl(id) => (
                    self.a.decls.span(id),
                    self.a.decls[id].kind == GenDeclKind::Import,
                ),
                TopLevelDecl::Func(id) => (self.a.funcs.span(id), false),
            };
            // consecutive single-line imports stay together
            if !(prev_import && is_import) {
                self.newline();
            }
            prev_import = is_import;
            self.flush_before(span);
            match d {
                TopLevelDecl::Decl(id) => self.gen_decl(id),
                TopLevelDecl::Func(id) => self.func_decl(id),
            }
            self.newline();
        }

        self.flush_comments(u32::MAX);
    }

    fn gen_decl(&mut self, id: DeclId) {
        let d = self.a.decls[id];
        self.w(d.kind.keyword());
        let specs = self.a.specs_list(d.specs);

        if !d.grouped && specs.len() == 1 {
            self.w(" ");
            self.spec(specs[0]);
            return;
        }

        self.w(" (");
        if specs.is_empty() {
            self.w(")");
            return;
        }
        self.newline();
        self.indent += 1;
        for &spec in specs {
            self.flush_before(self.spec_span(spec));
            self.tabs();
            self.spec(spec);
            self.newline();
        }
        self.flush_through(self.a.decls.span(id));
        self.indent -= 1;
        self.tabs();
        self.w(")");
    }

    fn spec_span(&self, spec: Spec) -> Span {
        match spec {
            Spec::Value(v) => self
                .a
                .ident_names(v.names)
                .first()
                .map(|n| n.pos)
                .unwrap_or(Span::DUMMY),
            Spec::Type(t) => t.name.pos,
            Spec::Import(_) => Span::DUMMY,
        }
    }

    fn spec(&mut self, spec: Spec) {
        match spec {
            Spec::Import(imp) => {
                match imp.name {
                    Some(ImportName::Dot) => self.w(". "),
                    Some(ImportName::Blank) => self.w("_ "),
                    Some(ImportName::Name(n)) => {
                        self.sym(n);
                        self.w(" ");
                    }
                    None => {}
                }
                self.sym(imp.path.raw);
            }
            Spec::Value(v) => {
                self.ident_list(v.names);
                if let Some(t) = v.typ {
                    self.w(" ");
                    self.typ(t);
                }
                if !v.values.is_empty() {
                    self.w(" = ");
                    self.expr_list(v.values, 1);
                }
            }
            Spec::Type(t) => {
                self.sym(t.name.sym);
                if let Some(tp) = t.type_params {
                    self.type_params(tp);
                }
                self.w(if t.alias { " = " } else { " " });
                self.typ(t.typ);
            }
        }
    }

    fn ident_list(&mut self, names: ListRef<IdentName>) {
        for (i, n) in self.a.ident_names(names).iter().enumerate() {
            if i > 0 {
                self.w(", ");
            }
            self.sym(n.sym);
        }
    }

    fn type_params(&mut self, id: TypeParamsId) {
        self.w("[");
        for (i, &d) in self.a.type_param_decl_ids(self.a.type_params[id].params).iter().enumerate() {
            if i > 0 {
                self.w(", ");
            }
            let decl = self.a.type_param_decls[d];
            self.ident_list(decl.names);
            self.w(" ");
            self.typ(decl.constraint);
        }
        self.w("]");
    }

    fn func_decl(&mut self, id: FuncDeclId) {
        let f = self.a.funcs[id];
        self.w("func ");
        if let Some(recv) = f.recv {
            self.w("(");
            if let Some(n) = recv.name {
                self.sym(n.sym);
                self.w(" ");
            }
            self.typ(recv.typ);
            self.w(") ");
        }
        self.sym(f.name.sym);
        if let Some(tp) = f.type_params {
            self.type_params(tp);
        }
        self.signature(f.signature);
        if let Some(body) = f.body {
            self.w(" ");
            self.block(body, self.a.funcs.span(id));
        }
    }

    fn signature(&mut self, id: SignatureId) {
        let sig = self.a.signatures[id];
        self.params(sig.params);
        match sig.results {
            None => {}
            Some(Results::Type(t)) => {
                self.w(" ");
                self.typ(t);
            }
            Some(Results::Params(fields)) => {
                self.w(" ");
                self.params(fields);
            }
        }
    }

    fn params(&mut self, fields: ListRef<FieldId>) {
        self.w("(");
        for (i, &f) in self.a.fields_list(fields).iter().enumerate() {
            if i > 0 {
                self.w(", ");
            }
            let field = self.a.fields[f];
            if !field.names.is_empty() {
                self.ident_list(field.names);
                self.w(" ");
            }
            if field.variadic {
                self.w("...");
            }
            self.typ(field.typ);
        }
        self.w(")");
    }

    // ---------------------------------------------------------------------
    // Types
    // ---------------------------------------------------------------------

    fn typ(&mut self, id: TypeId) {
        match self.a.types[id] {
            Type::Named { pkg, name, args } => {
                if let Some(p) = pkg {
                    self.sym(p.sym);
                    self.w(".");
                }
                self.sym(name.sym);
                if !args.is_empty() {
                    self.w("[");
                    self.type_list(args);
                    self.w("]");
                }
            }
            Type::Pointer(t) => {
                self.w("*");
                self.typ(t);
            }
            Type::Array { len, elem } => {
                self.w("[");
                match len {
                    ArrayLen::Ellipsis => self.w("..."),
                    ArrayLen::Expr(e) => self.expr(e),
                }
                self.w("]");
                self.typ(elem);
            }
            Type::Slice(t) => {
                self.w("[]");
                self.typ(t);
            }
            Type::Map { key, val } => {
                self.w("map[");
                self.typ(key);
                self.w("]");
                self.typ(val);
            }
            Type::Chan { dir, elem } => {
                self.w(match dir {
                    ChanDir::Both => "chan ",
                    ChanDir::Send => "chan<- ",
                    ChanDir::Recv => "<-chan ",
                });
                self.typ(elem);
            }
            Type::Struct { fields } => self.struct_type(fields),
            Type::Interface { elems } => self.interface_type(elems),
            Type::Func(sig) => {
                self.w("func");
                self.signature(sig);
            }
            Type::Paren(t) => {
                self.w("(");
                self.typ(t);
                self.w(")");
            }
            Type::Union(terms) => {
                for (i, term) in self.a.type_terms(terms).iter().enumerate() {
                    if i > 0 {
                        self.w(" | ");
                    }
                    if term.tilde {
                        self.w("~");
                    }
                    self.typ(term.typ);
                }
            }
        }
    }

    fn type_list(&mut self, list: ListRef<TypeId>) {
        for (i, &t) in self.a.types_list(list).iter().enumerate() {
            if i > 0 {
                self.w(", ");
            }
            self.typ(t);
        }
    }

    fn struct_type(&mut self, fields: ListRef<FieldId>) {
        let fields = self.a.fields_list(fields);
        if fields.is_empty() {
            self.w("struct{}");
            return;
        }
        self.w("struct {");
        self.newline();
        self.indent += 1;
        for &f in fields {
            self.flush_before(self.a.fields.span(f));
            let field = self.a.fields[f];
            self.tabs();
            if !field.embedded {
                self.ident_list(field.names);
                self.w(" ");
            }
            self.typ(field.typ);
            if let Some(tag) = field.tag {
                self.w(" ");
                self.sym(tag.raw);
            }
            self.newline();
        }
        self.indent -= 1;
        self.tabs();
        self.w("}");
    }

    fn interface_type(&mut self, elems: ListRef<InterfaceElem>) {
        let elems = self.a.interface_elems(elems);
        if elems.is_empty() {
            self.w("interface{}");
            return;
        }
        self.w("interface {");
        self.newline();
        self.indent += 1;
        for &e in elems {
            self.tabs();
            match e {
                InterfaceElem::Method { name, sig } => {
                    self.flush_before(name.pos);
                    self.sym(name.sym);
                    self.signature(sig);
                }
                InterfaceElem::Embed(t) => self.typ(t),
            }
            self.newline();
        }
        self.indent -= 1;
        self.tabs();
        self.w("}");
    }

    // ---------------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------------

    fn expr(&mut self, e: ExprId) {
        self.expr_depth(e, 1);
    }

    fn expr_depth(&mut self, e: ExprId, depth: u8) {
        self.expr_prec(e, 0, depth);
    }

    fn expr_list(&mut self, list: ListRef<ExprId>, depth: u8) {
        for (i, &e) in self.a.exprs_list(list).iter().enumerate() {
            if i > 0 {
                self.w(", ");
            }
            self.expr_depth(e, depth);
        }
    }

    /// Precedence-walks a binary tree the way gofmt chooses operator spacing.
    fn binary_shape(&self, e: ExprId) -> (bool, bool) {
        match self.a.exprs[e] {
            Expr::Binary { left, op, right } => {
                let p = op.precedence();
                let (l4, l5) = self.operand_shape(left, p);
                let (r4, r5) = self.operand_shape(right, p + 1);
                (l4 || r4 || p == 4, l5 || r5 || p == 5)
            }
            _ => (false, false),
        }
    }

    /// Operands printed inside inserted parentheses do not count.
    fn operand_shape(&self, e: ExprId, need: u8) -> (bool, bool) {
        match self.a.exprs[e] {
            Expr::Binary { op, .. } if op.precedence() < need => (false, false),
            _ => self.binary_shape(e),
        }
    }

    fn cutoff(&self, e: ExprId, depth: u8) -> Cutoff {
        let (has4, has5) = self.binary_shape(e);
        match (has4 && has5, depth) {
            (true, 1) => Cutoff(5),
            (_, 1) => Cutoff(6),
            _ => Cutoff(4),
        }
    }

    /// `parent` is the binding strength required of `e`; 6 = unary, 7 = primary.
    fn expr_prec(&mut self, e: ExprId, parent: u8, depth: u8) {
        match self.a.exprs[e] {
            Expr::Binary { .. } => {
                let cut = self.cutoff(e, depth);
                self.binary(e, parent, cut, depth);
            }
            Expr::Unary { op, expr } => {
                if parent > 6 {
                    self.w("(");
                }
                self.w(op.as_str());
                // keep `- -x` and `& &x` apart
                if let Expr::Unary { op: inner, .. } = self.a.exprs[expr] {
                    if inner == op && matches!(op, UnaryOp::Sub | UnaryOp::Add | UnaryOp::Addr) {
                        self.w(" ");
                    }
                }
                self.expr_prec(expr, 6, depth);
                if parent > 6 {
                    self.w(")");
                }
            }
            _ => self.primary(e, depth),
        }
    }

    fn binary(&mut self, e: ExprId, parent: u8, cut: Cutoff, depth: u8) {
        let Expr::Binary { left, op, right } = self.a.exprs[e] else {
            return self.expr_prec(e, parent, depth);
        };
        let prec = op.precedence();
        if prec < parent {
            // synthesized tree: print as a fresh parenthesized expression
            self.w("(");
            let cut = self.cutoff(e, 1);
            self.binary(e, 0, cut, 1);
            self.w(")");
            return;
        }
        self.binary_operand(left, prec, cut, depth);
        if prec < cut.0 {
            self.w(" ");
            self.w(op.as_str());
            self.w(" ");
        } else {
            self.w(op.as_str());
        }
        self.binary_operand(right, prec + 1, cut, depth);
    }

    fn binary_operand(&mut self, e: ExprId, prec: u8, cut: Cutoff, depth: u8) {
        if matches!(self.a.exprs[e], Expr::Binary { .. }) {
            self.binary(e, prec, cut, depth);
        } else {
            self.expr_prec(e, prec, depth);
        }
    }

    fn primary(&mut self, e: ExprId, depth: u8) {
        match self.a.exprs[e] {
            Expr::Ident(s) => self.sym(s),
            Expr::BasicLit(lit) => self.sym(lit.raw),
            Expr::FuncLit { sig, body } => {
                self.w("func");
                self.signature(sig);
                self.w(" ");
                self.block(body, self.a.exprs.span(e));
            }
            Expr::CompositeLit { typ, lit } => {
                self.typ(typ);
                self.literal_value(lit);
            }
            Expr::Paren(inner) => {
                self.w("(");
                self.expr(inner);
                self.w(")");
            }
            Expr::Selector { expr, sel } => {
                self.expr_prec(expr, 7, depth);
                self.w(".");
                self.sym(sel.sym);
            }
            Expr::Index { base, indices } => {
                self.expr_prec(base, 7, depth);
                self.w("[");
                self.expr_list(indices, depth + 1);
                self.w("]");
            }
            Expr::Slice {
                expr,
                lo,
                hi,
                max,
                three,
            } => {
                self.expr_prec(expr, 7, depth);
                self.w("[");
                if let Some(lo) = lo {
                    self.expr_depth(lo, depth + 1);
                }
                self.w(":");
                if let Some(hi) = hi {
                    self.expr_depth(hi, depth + 1);
                }
                if three {
                    self.w(":");
                    if let Some(max) = max {
                        self.expr_depth(max, depth + 1);
                    }
                }
                self.w("]");
            }
            Expr::TypeAssert { expr, typ } => {
                self.expr_prec(expr, 7, depth);
                self.w(".(");
                match typ {
                    Some(t) => self.typ(t),
                    None => self.w("type"),
                }
                self.w(")");
            }
            Expr::Call {
                fun,
                args,
                ellipsis,
            } => {
                self.expr_prec(fun, 7, depth);
                self.w("(");
                let d = if args.len() > 1 { depth + 1 } else { depth };
                self.expr_list(args, d);
                if ellipsis {
                    self.w("...");
                }
                self.w(")");
            }
            Expr::Type(t) => self.typ(t),
            Expr::Unary { .. } | Expr::Binary { .. } => {
                self.w("(");
                self.expr(e);
                self.w(")");
            }
        }
    }

    fn literal_value(&mut self, lit: LiteralValue) {
        let elems = self.a.keyed_elems_list(lit.elements);
        if elems.is_empty() {
            self.w("{}");
            return;
        }

        let keyed = elems.iter().filter(|e| e.key.is_some()).count();
        let has_func = elems
            .iter()
            .any(|e| matches!(e.value, Element::Expr(x) if matches!(self.a.exprs[x], Expr::FuncLit { .. })));

        if !has_func && keyed < 3 {
            self.w("{");
            for (i, el) in elems.iter().enumerate() {
                if i > 0 {
                    self.w(", ");
                }
                self.keyed_element(*el);
            }
            self.w("}");
            return;
        }

        self.w("{");
        self.newline();
        self.indent += 1;
        for el in elems {
            self.tabs();
            self.keyed_element(*el);
            self.w(",");
            self.newline();
        }
        self.indent -= 1;
        self.tabs();
        self.w("}");
    }

    fn keyed_element(&mut self, el: KeyedElement) {
        match el.key {
            Some(Key::Expr(k)) => {
                self.expr(k);
                self.w(": ");
            }
            Some(Key::Literal(l)) => {
                self.literal_value(l);
                self.w(": ");
            }
            None => {}
        }
        match el.value {
            Element::Expr(e) => self.expr(e),
            Element::Literal(l) => self.literal_value(l),
        }
    }

    // ---------------------------------------------------------------------
    // Statements
    // ---------------------------------------------------------------------

    /// `{ ... }`; comments up to the end of `owner` are flushed inside.
    fn block(&mut self, b: Block, owner: Span) {
        self.w("{");
        self.newline();
        self.indent += 1;
        self.stmt_list(b.stmts);
        if !owner.is_dummy() {
            // comments before the closing brace
            self.flush_comments(owner.end.saturating_sub(1));
        }
        self.indent -= 1;
        self.tabs();
        self.w("}");
    }

    fn stmt_list(&mut self, stmts: ListRef<StmtId>) {
        for &s in self.a.stmts_list(stmts) {
            self.flush_before(self.a.stmts.span(s));
            if let Stmt::Labeled { label, stmt } = self.a.stmts[s] {
                self.indent = self.indent.saturating_sub(1);
                self.tabs();
                self.indent += 1;
                self.sym(label.sym);
                self.w(":");
                self.newline();
                if self.is_empty_stmt(stmt) {
                    continue;
                }
                self.tabs();
                self.stmt(stmt);
                self.newline();
                continue;
            }
            self.tabs();
            self.stmt(s);
            self.newline();
        }
    }

    fn is_empty_stmt(&self, s: StmtId) -> bool {
        matches!(self.a.stmts[s], Stmt::Simple(ss) if matches!(self.a.simple_stmts[ss], SimpleStmt::Empty))
    }

    fn simple_stmt(&mut self, id: SimpleStmtId) {
        match self.a.simple_stmts[id] {
            SimpleStmt::Empty => {}
            SimpleStmt::Expr(e) => self.expr(e),
            SimpleStmt::Send { chan, value } => {
                self.expr(chan);
                self.w(" <- ");
                self.expr(value);
            }
            SimpleStmt::IncDec { expr, op } => {
                self.expr(expr);
                self.w(match op {
                    IncDecOp::Inc => "++",
                    IncDecOp::Dec => "--",
                });
            }
            SimpleStmt::Assign { lhs, op, rhs } => {
                self.expr_list(lhs, 1);
                self.w(" ");
                self.w(op.as_str());
                self.w(" ");
                self.expr_list(rhs, 1);
            }
            SimpleStmt::ShortVarDecl { names, values } => {
                self.ident_list(names);
                self.w(" := ");
                self.expr_list(values, 1);
            }
        }
    }

    fn range_lhs(&mut self, lhs: RangeLhs) {
        match lhs {
            RangeLhs::Def(names) => {
                self.ident_list(names);
                self.w(" := ");
            }
            RangeLhs::Assign(exprs) => {
                self.expr_list(exprs, 1);
                self.w(" = ");
            }
        }
    }

    fn stmt(&mut self, id: StmtId) {
        let span = self.a.stmts.span(id);
        match self.a.stmts[id] {
            Stmt::Simple(s) => self.simple_stmt(s),
            Stmt::Decl(d) => self.gen_decl(d),
            Stmt::Labeled { label, stmt } => {
                self.sym(label.sym);
                self.w(":");
                if !self.is_empty_stmt(stmt) {
                    self.newline();
                    self.tabs();
                    self.stmt(stmt);
                }
            }
            Stmt::Go(e) => {
                self.w("go ");
                self.expr(e);
            }
            Stmt::Defer(e) => {
                self.w("defer ");
                self.expr(e);
            }
            Stmt::Return(values) => {
                self.w("return");
                if !values.is_empty() {
                    self.w(" ");
                    self.expr_list(values, 1);
                }
            }
            Stmt::Branch { kind, label } => {
                self.w(kind.keyword());
                if let Some(l) = label {
                    self.w(" ");
                    self.sym(l.sym);
                }
            }
            Stmt::Block(b) => self.block(b, span),
            Stmt::If {
                init,
                cond,
                then_block,
                else_stmt,
            } => {
                self.w("if ");
                if let Some(init) = init {
                    self.simple_stmt(init);
                    self.w("; ");
                }
                self.expr(cond);
                self.w(" ");
                let then_span = match else_stmt {
                    Some(e) if !self.a.stmts.span(e).is_dummy() => Span {
                        start: span.start,
                        end: self.a.stmts.span(e).start,
                    },
                    _ => span,
                };
                self.block(then_block, then_span);
                if let Some(e) = else_stmt {
                    self.w(" else ");
                    self.stmt(e);
                }
            }
            Stmt::For { kind, block } => {
                self.w("for ");
                match kind {
                    ForKind::Infinite => {}
                    ForKind::Cond(c) => {
                        self.expr(c);
                        self.w(" ");
                    }
                    ForKind::Clause { init, cond, post } => {
                        if let Some(i) = init {
                            self.simple_stmt(i);
                        }
                        self.w("; ");
                        if let Some(c) = cond {
                            self.expr(c);
                        }
                        self.w("; ");
                        if let Some(p) = post {
                            self.simple_stmt(p);
                            self.w(" ");
                        }
                    }
                    ForKind::Range { lhs, expr } => {
                        if let Some(lhs) = lhs {
                            self.range_lhs(lhs);
                        }
                        self.w("range ");
                        self.expr(expr);
                        self.w(" ");
                    }
                }
                self.block(block, span);
            }
            Stmt::Switch { init, tag, clauses } => {
                self.w("switch ");
                if let Some(init) = init {
                    self.simple_stmt(init);
                    self.w("; ");
                }
                if let Some(t) = tag {
                    self.expr(t);
                    self.w(" ");
                }
                self.switch_body(clauses, span);
            }
            Stmt::TypeSwitch {
                init,
                guard,
                clauses,
            } => {
                self.w("switch ");
                if let Some(init) = init {
                    self.simple_stmt(init);
                    self.w("; ");
                }
                if let Some(b) = guard.bind {
                    self.sym(b.sym);
                    self.w(" := ");
                }
                self.expr_prec(guard.x, 7, 1);
                self.w(".(type) ");
                self.switch_body(clauses, span);
            }
            Stmt::Select { clauses } => {
                self.w("select {");
                self.newline();
                for &c in self.a.comm_clause_ids(clauses) {
                    self.flush_before(self.a.comm_clauses.span(c));
                    self.tabs();
                    let stmts = match self.a.comm_clauses[c] {
                        CommClause::Default { stmts } => {
                            self.w("default:");
                            stmts
                        }
                        CommClause::Case { comm, stmts } => {
                            self.w("case ");
                            match comm {
                                CommStmt::Send { chan, value } => {
                                    self.expr(chan);
                                    self.w(" <- ");
                                    self.expr(value);
                                }
                                CommStmt::Recv { lhs, expr } => {
                                    if let Some(lhs) = lhs {
                                        self.range_lhs(lhs);
                                    }
                                    self.expr(expr);
                                }
                            }
                            self.w(":");
                            stmts
                        }
                    };
                    self.newline();
                    self.indent += 1;
                    self.stmt_list(stmts);
                    self.indent -= 1;
                }
                self.flush_through_brace(span);
                self.tabs();
                self.w("}");
            }
        }
    }

    fn flush_through_brace(&mut self, span: Span) {
        if !span.is_dummy() {
            self.indent += 1;
            self.flush_comments(span.end.saturating_sub(1));
            self.indent -= 1;
        }
    }

    fn switch_body(&mut self, clauses: ListRef<SwitchClauseId>, span: Span) {
        self.w("{");
        self.newline();
        for &c in self.a.switch_clause_ids(clauses) {
            self.flush_before(self.a.switch_clauses.span(c));
            self.tabs();
            let stmts = match self.a.switch_clauses[c] {
                SwitchClause::ExprCase { items, stmts } => {
                    if items.is_empty() {
                        self.w("default:");
                    } else {
                        self.w("case ");
                        self.expr_list(items, 1);
                        self.w(":");
                    }
                    stmts
                }
                SwitchClause::TypeCase { items, stmts } => {
                    if items.is_empty() {
                        self.w("default:");
                    } else {
                        self.w("case ");
                        for (i, item) in self.a.type_case_elems(items).iter().enumerate() {
                            if i > 0 {
                                self.w(", ");
                            }
                            match *item {
                                TypeCaseElem::Nil => self.w("nil"),
                                TypeCaseElem::Type(t) => self.typ(t),
                            }
                        }
                        self.w(":");
                    }
                    stmts
                }
            };
            self.newline();
            self.indent += 1;
            self.stmt_list(stmts);
            self.indent -= 1;
        }
        self.flush_through_brace(span);
        self.tabs();
        self.w("}");
    }
}
