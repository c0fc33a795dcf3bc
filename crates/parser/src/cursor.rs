//! Mutable expression traversal with parent awareness.
//!
//! The read-only [`Visitor`](crate::walk::Visitor) borrows the arena for the
//! whole walk. Rewriters need to mutate while walking, so `ExprCursor` copies
//! each node out of the arena before calling back and re-reads it afterwards:
//! a callback that replaced the node at the cursor sees its replacement and not
//! the original when it returns `Flow::Continue`.
//!
//! Type expressions and prohibited zones (import paths, struct tags) are not
//! expressions in this tree and are never visited.

use crate::ast::*;

/// What the walker does after a callback returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Descend into the (possibly replaced) node's children.
    Continue,
    /// Do not descend into the node.
    Skip,
}

/// Position of an expression inside its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Value of a `var`/`const` spec. `spec` indexes the decl's spec list.
    ValueSpec {
        decl: DeclId,
        spec: u32,
        is_const: bool,
        typ: Option<TypeId>,
    },
    AssignLhs,
    AssignRhs,
    ShortVarValue,
    IncDec,
    SendChan,
    SendValue,
    ExprStmt,
    Go,
    Defer,
    Return,
    IfCond,
    ForCond,
    RangeLhs,
    RangeExpr,
    SwitchTag,
    CaseItem,
    TypeSwitchX,
    CommRecv,
    CallFun,
    CallArg,
    Unary(UnaryOp),
    BinaryLeft(BinaryOp),
    BinaryRight(BinaryOp),
    Paren,
    SelectorBase,
    IndexBase,
    IndexArg,
    SliceBase,
    SliceBound,
    TypeAssertBase,
    CompositeKey,
    CompositeValue,
}

/// One visited expression.
#[derive(Debug, Clone, Copy)]
pub struct Cursor {
    pub node: ExprId,
    /// Enclosing expression; `None` when the parent is a statement or spec.
    pub parent: Option<ExprId>,
    pub slot: Slot,
    /// Index inside the parent's list (argument, element, lhs position).
    pub index: u32,
    /// Innermost enclosing statement.
    pub stmt: Option<StmtId>,
    /// Number of enclosing function bodies (0 at package level).
    pub func_depth: u32,
}

impl Cursor {
    /// Overwrites the node at the cursor. Every link to `self.node` now sees
    /// `new`; the walker will not descend into it.
    pub fn replace(&self, ast: &mut Ast, new: Expr) -> Flow {
        ast.arena.exprs.replace(self.node, new);
        Flow::Skip
    }

    /// Current node value.
    pub fn expr(&self, ast: &Ast) -> Expr {
        ast.arena.exprs[self.node]
    }

    pub fn parent_expr(&self, ast: &Ast) -> Option<Expr> {
        self.parent.map(|p| ast.arena.exprs[p])
    }
}

/// Walks every expression of a file in source order (pre-order).
pub fn walk_exprs<F>(ast: &mut Ast, f: F)
where
    F: FnMut(&mut Ast, &Cursor) -> Flow,
{
    ExprCursor::new(f).run(ast);
}

/// Walks the expressions under one statement.
pub fn walk_stmt_exprs<F>(ast: &mut Ast, stmt: StmtId, func_depth: u32, f: F)
where
    F: FnMut(&mut Ast, &Cursor) -> Flow,
{
    let mut c = ExprCursor::new(f);
    c.depth = func_depth;
    c.stmt(ast, stmt);
}

pub struct ExprCursor<F> {
    f: F,
    stmt: Option<StmtId>,
    depth: u32,
}

impl<F> ExprCursor<F>
where
    F: FnMut(&mut Ast, &Cursor) -> Flow,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            stmt: None,
            depth: 0,
        }
    }

    pub fn run(mut self, ast: &mut Ast) {
        let decls: Vec<TopLevelDecl> = ast.decls().to_vec();
        for d in decls {
            match d {
                TopLevelDecl::Decl(id) => self.decl(ast, id),
                TopLevelDecl::Func(id) => {
                    if let Some(body) = ast.arena.funcs[id].body {
                        self.depth += 1;
                        self.block(ast, body);
                        self.depth -= 1;
                    }
                }
            }
        }
    }

    fn decl(&mut self, ast: &mut Ast, id: DeclId) {
        let d = ast.arena.decls[id];
        if matches!(d.kind, GenDeclKind::Import | GenDeclKind::Type) {
            return;
        }
        let specs = ast.arena.specs_list(d.specs).to_vec();
        for (i, spec) in specs.into_iter().enumerate() {
            let Spec::Value(v) = spec else { continue };
            let slot = Slot::ValueSpec {
                decl: id,
                spec: i as u32,
                is_const: d.kind == GenDeclKind::Const,
                typ: v.typ,
            };
            self.exprs(ast, v.values, None, slot);
        }
    }

    fn block(&mut self, ast: &mut Ast, b: Block) {
        self.stmt_list(ast, b.stmts);
    }

    fn stmt_list(&mut self, ast: &mut Ast, list: ListRef<StmtId>) {
        let stmts = ast.arena.stmts_list(list).to_vec();
        for s in stmts {
            self.stmt(ast, s);
        }
    }

    fn stmt(&mut self, ast: &mut Ast, id: StmtId) {
        let saved = self.stmt.replace(id);
        match ast.arena.stmts[id] {
            Stmt::Simple(s) => self.simple(ast, s),
            Stmt::Decl(d) => self.decl(ast, d),
            Stmt::Labeled { stmt, .. } => self.stmt(ast, stmt),
            Stmt::Go(e) => self.expr(ast, e, None, Slot::Go, 0),
            Stmt::Defer(e) => self.expr(ast, e, None, Slot::Defer, 0),
            Stmt::Return(values) => self.exprs(ast, values, None, Slot::Return),
            Stmt::Branch { .. } => {}
            Stmt::Block(b) => self.block(ast, b),
            Stmt::If {
                init,
                cond,
                then_block,
                else_stmt,
            } => {
                if let Some(init) = init {
                    self.simple(ast, init);
                }
                self.expr(ast, cond, None, Slot::IfCond, 0);
                self.block(ast, then_block);
                if let Some(e) = else_stmt {
                    self.stmt(ast, e);
                }
            }
            Stmt::For { kind, block } => {
                match kind {
                    ForKind::Infinite => {}
                    ForKind::Cond(c) => self.expr(ast, c, None, Slot::ForCond, 0),
                    ForKind::Clause { init, cond, post } => {
                        if let Some(i) = init {
                            self.simple(ast, i);
                        }
                        if let Some(c) = cond {
                            self.expr(ast, c, None, Slot::ForCond, 0);
                        }
                        if let Some(p) = post {
                            self.simple(ast, p);
                        }
                    }
                    ForKind::Range { lhs, expr } => {
                        if let Some(RangeLhs::Assign(l)) = lhs {
                            self.exprs(ast, l, None, Slot::RangeLhs);
                        }
                        self.expr(ast, expr, None, Slot::RangeExpr, 0);
                    }
                }
                self.block(ast, block);
            }
            Stmt::Switch { init, tag, clauses } => {
                if let Some(init) = init {
                    self.simple(ast, init);
                }
                if let Some(t) = tag {
                    self.expr(ast, t, None, Slot::SwitchTag, 0);
                }
                let clauses = ast.arena.switch_clause_ids(clauses).to_vec();
                for c in clauses {
                    if let SwitchClause::ExprCase { items, stmts } = ast.arena.switch_clauses[c] {
                        self.exprs(ast, items, None, Slot::CaseItem);
                        self.stmt_list(ast, stmts);
                    }
                }
            }
            Stmt::TypeSwitch {
                init,
                guard,
                clauses,
            } => {
                if let Some(init) = init {
                    self.simple(ast, init);
                }
                self.expr(ast, guard.x, None, Slot::TypeSwitchX, 0);
                let clauses = ast.arena.switch_clause_ids(clauses).to_vec();
                for c in clauses {
                    let (SwitchClause::TypeCase { stmts, .. } | SwitchClause::ExprCase { stmts, .. }) =
                        ast.arena.switch_clauses[c];
                    self.stmt_list(ast, stmts);
                }
            }
            Stmt::Select { clauses } => {
                let clauses = ast.arena.comm_clause_ids(clauses).to_vec();
                for c in clauses {
                    match ast.arena.comm_clauses[c] {
                        CommClause::Default { stmts } => self.stmt_list(ast, stmts),
                        CommClause::Case { comm, stmts } => {
                            match comm {
                                CommStmt::Send { chan, value } => {
                                    self.expr(ast, chan, None, Slot::SendChan, 0);
                                    self.expr(ast, value, None, Slot::SendValue, 0);
                                }
                                CommStmt::Recv { lhs, expr } => {
                                    if let Some(RangeLhs::Assign(l)) = lhs {
                                        self.exprs(ast, l, None, Slot::AssignLhs);
                                    }
                                    self.expr(ast, expr, None, Slot::CommRecv, 0);
                                }
                            }
                            self.stmt_list(ast, stmts);
                        }
                    }
                }
            }
        }
        self.stmt = saved;
    }

    fn simple(&mut self, ast: &mut Ast, id: SimpleStmtId) {
        match ast.arena.simple_stmts[id] {
            SimpleStmt::Empty => {}
            SimpleStmt::Expr(e) => self.expr(ast, e, None, Slot::ExprStmt, 0),
            SimpleStmt::Send { chan, value } => {
                self.expr(ast, chan, None, Slot::SendChan, 0);
                self.expr(ast, value, None, Slot::SendValue, 0);
            }
            SimpleStmt::IncDec { expr, .. } => self.expr(ast, expr, None, Slot::IncDec, 0),
            SimpleStmt::Assign { lhs, rhs, .. } => {
                self.exprs(ast, lhs, None, Slot::AssignLhs);
                self.exprs(ast, rhs, None, Slot::AssignRhs);
            }
            SimpleStmt::ShortVarDecl { values, .. } => {
                self.exprs(ast, values, None, Slot::ShortVarValue)
            }
        }
    }

    fn exprs(&mut self, ast: &mut Ast, list: ListRef<ExprId>, parent: Option<ExprId>, slot: Slot) {
        let items = ast.arena.exprs_list(list).to_vec();
        for (i, e) in items.into_iter().enumerate() {
            self.expr(ast, e, parent, slot, i as u32);
        }
    }

    fn expr(&mut self, ast: &mut Ast, id: ExprId, parent: Option<ExprId>, slot: Slot, index: u32) {
        let cursor = Cursor {
            node: id,
            parent,
            slot,
            index,
            stmt: self.stmt,
            func_depth: self.depth,
        };
        if (self.f)(ast, &cursor) == Flow::Skip {
            return;
        }

        let p = Some(id);
        match ast.arena.exprs[id] {
            Expr::Ident(_) | Expr::BasicLit(_) | Expr::Type(_) => {}
            Expr::FuncLit { body, .. } => {
                let saved = self.stmt.take();
                self.depth += 1;
                self.block(ast, body);
                self.depth -= 1;
                self.stmt = saved;
            }
            Expr::CompositeLit { lit, .. } => self.literal(ast, lit, id),
            Expr::Paren(inner) => self.expr(ast, inner, p, Slot::Paren, 0),
            Expr::Selector { expr, .. } => self.expr(ast, expr, p, Slot::SelectorBase, 0),
            Expr::Index { base, indices } => {
                self.expr(ast, base, p, Slot::IndexBase, 0);
                self.exprs(ast, indices, p, Slot::IndexArg);
            }
            Expr::Slice {
                expr, lo, hi, max, ..
            } => {
                self.expr(ast, expr, p, Slot::SliceBase, 0);
                for (i, bound) in [lo, hi, max].into_iter().enumerate() {
                    if let Some(b) = bound {
                        self.expr(ast, b, p, Slot::SliceBound, i as u32);
                    }
                }
            }
            Expr::TypeAssert { expr, .. } => self.expr(ast, expr, p, Slot::TypeAssertBase, 0),
            Expr::Call { fun, args, .. } => {
                self.expr(ast, fun, p, Slot::CallFun, 0);
                self.exprs(ast, args, p, Slot::CallArg);
            }
            Expr::Unary { op, expr } => self.expr(ast, expr, p, Slot::Unary(op), 0),
            Expr::Binary { left, op, right } => {
                self.expr(ast, left, p, Slot::BinaryLeft(op), 0);
                self.expr(ast, right, p, Slot::BinaryRight(op), 0);
            }
        }
    }

    /// Elements of a literal; elided inner literals report the outer
    /// composite literal as parent.
    fn literal(&mut self, ast: &mut Ast, lit: LiteralValue, owner: ExprId) {
        let elems = ast.arena.keyed_elems_list(lit.elements).to_vec();
        for (i, el) in elems.into_iter().enumerate() {
            match el.key {
                Some(Key::Expr(k)) => self.expr(ast, k, Some(owner), Slot::CompositeKey, i as u32),
                Some(Key::Literal(l)) => self.literal(ast, l, owner),
                None => {}
            }
            match el.value {
                Element::Expr(v) => self.expr(ast, v, Some(owner), Slot::CompositeValue, i as u32),
                Element::Literal(l) => self.literal(ast, l, owner),
            }
        }
    }
}
