//! Turns `if v == k1 {..} else if v == k2 {..} else if ...` ladders into a
//! map lookup:
//!
//! ```text
//! var table1 = map[int]func(){
//!     1: func() { ... },
//!     2: func() { ... },
//! }
//!
//! if fn, ok := table1[v]; ok {
//!     fn()
//! } else {
//!     <terminal else>
//! }
//! ```
//!
//! Ladders that have the right shape but cannot be rewritten safely are
//! reported as detections.

use std::collections::{HashMap, HashSet};

use gomorph_syntax::ast::*;
use gomorph_syntax::check::{ConstValue, ObjKind, Ty};
use gomorph_syntax::walk::{ExprCollector, Visitor, Walk};
use gomorph_syntax::{print_expr, TypeInfo};

use crate::astutil::{
    block, call, enclosing_stmt_list, expr_stmt, fresh_name, insert_stmt_before,
    insert_top_level, is_already_obfuscated_string_call, nullary_signature, simple_stmt, top_level_index, top_level_names,
    ty_to_type_expr,
};
use crate::context::{Context, SourceUnit};
use crate::error::Result;
use crate::events::SkipReason;
use crate::pass::Pass;

#[derive(Debug, Default)]
pub struct IfChainToJumpTable {
    /// Package path -> names declared at package level, tables included.
    package_names: HashMap<String, HashSet<String>>,
    /// Package path -> last table number handed out.
    counters: HashMap<String, u32>,
}

impl IfChainToJumpTable {
    pub const NAME: &'static str = "IfChainToJumpTable";

    pub fn new() -> Self {
        Self::default()
    }

    fn next_table_name(&mut self, ast: &Ast, package_path: &str) -> String {
        let counter = self.counters.entry(package_path.to_string()).or_default();
        let names = self.package_names.entry(package_path.to_string()).or_default();
        loop {
            *counter += 1;
            let name = format!("table{counter}");
            if !names.contains(&name) && ast.interner.get(&name).is_none() {
                names.insert(name.clone());
                return name;
            }
        }
    }
}

/// Normalized key value; ints and integral floats compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyValue {
    Bool(bool),
    Int(i128),
    Float(u64),
    Bytes(Vec<u8>),
    Text(String),
}

fn key_value(ast: &Ast, info: &TypeInfo, e: ExprId) -> KeyValue {
    match info.value_of(e) {
        Some(ConstValue::Bool(b)) => KeyValue::Bool(*b),
        Some(v @ (ConstValue::Int(_) | ConstValue::Float(_))) => match v.as_int() {
            Some(i) => KeyValue::Int(i),
            None => KeyValue::Float(v.as_float().unwrap_or_default().to_bits()),
        },
        Some(ConstValue::String(b)) => KeyValue::Bytes(b.clone()),
        None => match obfuscated_bytes(ast, e) {
            Some(b) => KeyValue::Bytes(b),
            None => KeyValue::Text(print_expr(ast, e)),
        },
    }
}

/// Bytes spelled by a `T([]byte{...})` key left by string obfuscation.
fn obfuscated_bytes(ast: &Ast, e: ExprId) -> Option<Vec<u8>> {
    let e = unparen(ast, e);
    if !is_already_obfuscated_string_call(ast, e) {
        return None;
    }
    let Expr::Call { args, .. } = ast.arena.exprs[e] else {
        return None;
    };
    let lit = *ast.arena.exprs_list(args).first()?;
    let Expr::CompositeLit { lit, .. } = ast.arena.exprs[lit] else {
        return None;
    };
    ast.arena
        .keyed_elems_list(lit.elements)
        .iter()
        .map(|el| match el.value {
            Element::Expr(v) => match ast.arena.exprs[v] {
                Expr::BasicLit(BasicLit { raw, .. }) => ast.str(raw).parse::<u8>().ok(),
                _ => None,
            },
            _ => None,
        })
        .collect()
}

fn unparen(ast: &Ast, mut e: ExprId) -> ExprId {
    while let Expr::Paren(inner) = ast.arena.exprs[e] {
        e = inner;
    }
    e
}

/// Identifier or selector chain over identifiers: reading it twice has no
/// side effects.
fn is_plain_operand(ast: &Ast, e: ExprId) -> bool {
    match ast.arena.exprs[e] {
        Expr::Ident(_) => true,
        Expr::Selector { expr, .. } => is_plain_operand(ast, expr),
        Expr::Paren(inner) => is_plain_operand(ast, inner),
        _ => false,
    }
}

fn is_literal_key(ast: &Ast, e: ExprId) -> bool {
    let e = unparen(ast, e);
    if is_already_obfuscated_string_call(ast, e) {
        return true;
    }
    match ast.arena.exprs[e] {
        Expr::BasicLit(_) => true,
        Expr::Unary {
            op: UnaryOp::Sub | UnaryOp::Add,
            expr,
        } => matches!(
            ast.arena.exprs[expr],
            Expr::BasicLit(BasicLit {
                kind: BasicLitKind::Int | BasicLitKind::Float | BasicLitKind::Imag,
                ..
            })
        ),
        _ => false,
    }
}

/// One `if v == key { body }` of a ladder.
#[derive(Debug, Clone, Copy)]
struct Link {
    stmt: StmtId,
    operand: ExprId,
    key: ExprId,
    body: Block,
    else_stmt: Option<StmtId>,
}

fn link(ast: &Ast, stmt: StmtId) -> Option<Link> {
    let Stmt::If {
        init: None,
        cond,
        then_block,
        else_stmt,
    } = ast.arena.stmts[stmt]
    else {
        return None;
    };
    let Expr::Binary {
        left,
        op: BinaryOp::Eq,
        right,
    } = ast.arena.exprs[unparen(ast, cond)]
    else {
        return None;
    };
    if !is_plain_operand(ast, left) {
        return None;
    }
    Some(Link {
        stmt,
        operand: left,
        key: right,
        body: then_block,
        else_stmt,
    })
}

fn has_init(ast: &Ast, stmt: StmtId) -> bool {
    matches!(ast.arena.stmts[stmt], Stmt::If { init: Some(_), .. })
}

/// `if` statements in `else if` position of a ladder starting at `head`.
fn ladder(ast: &Ast, head: StmtId) -> Vec<StmtId> {
    let mut out = vec![head];
    let mut cur = head;
    while let Stmt::If {
        else_stmt: Some(next),
        ..
    } = ast.arena.stmts[cur]
    {
        if !matches!(ast.arena.stmts[next], Stmt::If { .. }) {
            break;
        }
        out.push(next);
        cur = next;
    }
    out
}

/// Ladder heads in source order, each with its top-level declaration.
#[derive(Default)]
struct Heads {
    current: Option<TopLevelDecl>,
    heads: Vec<(StmtId, TopLevelDecl)>,
    else_ifs: HashSet<StmtId>,
}

impl<'ast> Visitor<'ast> for Heads {
    fn visit_stmt(&mut self, a: &'ast AstArena, id: StmtId) {
        if let Stmt::If { else_stmt, .. } = a.stmts[id] {
            if !self.else_ifs.contains(&id) {
                if let Some(top) = self.current {
                    self.heads.push((id, top));
                }
            }
            if let Some(next) = else_stmt {
                if matches!(a.stmts[next], Stmt::If { .. }) {
                    self.else_ifs.insert(next);
                }
            }
        }
        a.stmts[id].walk(a, self);
    }
}

/// Statements that would change meaning once moved into a closure.
#[derive(Default)]
struct Escapes {
    found: bool,
}

impl<'ast> Visitor<'ast> for Escapes {
    fn visit_stmt(&mut self, a: &'ast AstArena, id: StmtId) {
        match a.stmts[id] {
            Stmt::Return(_) | Stmt::Branch { .. } | Stmt::Defer(_) | Stmt::Labeled { .. } => {
                self.found = true;
            }
            _ => a.stmts[id].walk(a, self),
        }
    }

    fn visit_expr(&mut self, a: &'ast AstArena, id: ExprId) {
        // closures have their own control flow
        if !matches!(a.exprs[id], Expr::FuncLit { .. }) {
            a.exprs[id].walk(a, self);
        }
    }
}

#[derive(Default)]
struct TypeCollector {
    found: Vec<TypeId>,
}

impl<'ast> Visitor<'ast> for TypeCollector {
    fn visit_type(&mut self, a: &'ast AstArena, id: TypeId) {
        self.found.push(id);
        a.types[id].walk(a, self);
    }
}

/// True when every name the bodies use is visible at package level and
/// cannot take part in an initialization cycle.
fn bodies_are_package_safe(ast: &Ast, info: &TypeInfo, bodies: &[Block]) -> bool {
    let a = &ast.arena;
    let mut exprs = ExprCollector::default();
    let mut types = TypeCollector::default();
    for b in bodies {
        b.walk(a, &mut exprs);
        b.walk(a, &mut types);
    }
    // struct literal keys are field names, not references
    let mut field_keys = HashSet::new();
    for &e in &exprs.found {
        if let Expr::CompositeLit { lit, .. } = a.exprs[e] {
            for el in a.keyed_elems_list(lit.elements) {
                if let Some(Key::Expr(k)) = el.key {
                    field_keys.insert(k);
                }
            }
        }
    }
    let idents_ok = exprs.found.iter().all(|&e| {
        if !matches!(a.exprs[e], Expr::Ident(_)) || field_keys.contains(&e) {
            return true;
        }
        info.uses.get(&e).is_some_and(|o| match o.kind {
            ObjKind::Package | ObjKind::Builtin | ObjKind::Nil => true,
            ObjKind::Const | ObjKind::TypeName => !o.local,
            ObjKind::Var | ObjKind::Func => false,
        })
    });
    let types_ok = types.found.iter().all(|t| match info.type_exprs.get(t) {
        Some(Ty::Named(n)) => !n.local,
        Some(Ty::TypeParam(_)) => false,
        _ => true,
    });
    idents_ok && types_ok
}

enum Outcome {
    /// Fewer than two links: not a ladder at all.
    NotAChain,
    Skipped,
    Rewritten,
}

impl IfChainToJumpTable {
    /// Tries to rewrite the ladder starting at `links[0]`.
    fn rewrite(
        &mut self,
        unit: &mut SourceUnit,
        ctx: &mut Context,
        head: StmtId,
        top: TopLevelDecl,
        links: &[Link],
        scoped: bool,
    ) -> Outcome {
        let ast = &unit.ast;
        let info = &unit.info;
        if links.len() < 2 {
            return Outcome::NotAChain;
        }
        ctx.log_visit(Self::NAME, &unit.path);

        let operand_text = print_expr(ast, links[0].operand);
        let detail = format!("{} links on `{operand_text}`", links.len());
        let terminal = links[links.len() - 1].else_stmt;

        let reason = if scoped {
            Some(SkipReason::ScopedInit)
        } else if links.len() < ctx.options().jump_table_min_chain {
            Some(SkipReason::ChainTooShort)
        } else if links.iter().any(|l| !is_literal_key(ast, l.key)) {
            Some(SkipReason::NonLiteralKey)
        } else {
            let mut seen = HashSet::new();
            let duplicate = !links.iter().all(|l| seen.insert(key_value(ast, info, l.key)));
            let mut escapes = Escapes::default();
            for l in links {
                l.body.walk(&ast.arena, &mut escapes);
            }
            if let Some(t) = terminal {
                escapes.visit_stmt(&ast.arena, t);
            }
            let operand_ty = info.type_of(links[0].operand);
            if duplicate {
                Some(SkipReason::DuplicateKey)
            } else if escapes.found {
                Some(SkipReason::ControlFlowEscape)
            } else if operand_ty.is_none() {
                Some(SkipReason::UnknownKeyType)
            } else {
                None
            }
        };
        if let Some(reason) = reason {
            ctx.log_detect(Self::NAME, &unit.path, reason, detail);
            return Outcome::Skipped;
        }

        let bodies: Vec<Block> = links.iter().map(|l| l.body).collect();
        let operand_ty = info.type_of(links[0].operand).cloned().unwrap_or_default();
        let local_operand_type = matches!(&operand_ty, Ty::Named(n) if n.local);
        let file_scope = !local_operand_type && bodies_are_package_safe(ast, info, &bodies);
        if !file_scope && enclosing_stmt_list(ast, head).is_none() {
            // no statement list to hold a local table
            ctx.log_detect(Self::NAME, &unit.path, SkipReason::ControlFlowEscape, detail);
            return Outcome::Skipped;
        }

        let mut taken = HashSet::new();
        let mut names = ExprCollector::default();
        if let Some(t) = terminal {
            names.visit_stmt(&ast.arena, t);
        }
        names.visit_expr(&ast.arena, links[0].operand);
        for e in names.found {
            if let Expr::Ident(s) = ast.arena.exprs[e] {
                taken.insert(ast.str(s).to_string());
            }
        }

        let Some(key_type) = ty_to_type_expr(&mut unit.ast, &operand_ty) else {
            ctx.log_detect(Self::NAME, &unit.path, SkipReason::UnknownKeyType, detail);
            return Outcome::Skipped;
        };
        let table = self.next_table_name(&unit.ast, &unit.package_path);
        let ast = &mut unit.ast;

        // map[K]func(){ k: func() { body }, ... }
        let func_sig = nullary_signature(ast, None);
        let func_type = ast.arena.new_type(Type::Func(func_sig));
        let map_type = ast.arena.new_type(Type::Map {
            key: key_type,
            val: func_type,
        });
        let elems: Vec<KeyedElement> = links
            .iter()
            .map(|l| {
                let sig = nullary_signature(ast, None);
                let value = ast.arena.new_expr(Expr::FuncLit { sig, body: l.body });
                KeyedElement {
                    key: Some(Key::Expr(l.key)),
                    value: Element::Expr(value),
                }
            })
            .collect();
        let elements = ast.arena.list_keyed_elems(elems);
        let table_lit = ast.arena.new_expr(Expr::CompositeLit {
            typ: map_type,
            lit: LiteralValue { elements },
        });
        let table_sym = ast.intern(&table);

        let names = ast.arena.list_ident_names([IdentName::synthetic(table_sym)]);
        let values = ast.arena.list_exprs([table_lit]);
        if file_scope {
            let specs = ast.arena.list_specs([Spec::Value(ValueSpec {
                names,
                typ: None,
                values,
            })]);
            let decl = ast.arena.new_decl(Decl {
                kind: GenDeclKind::Var,
                grouped: false,
                specs,
            });
            let at = top_level_index(ast, top).unwrap_or(0);
            insert_top_level(ast, at, TopLevelDecl::Decl(decl));
        } else {
            let def = simple_stmt(ast, SimpleStmt::ShortVarDecl { names, values });
            insert_stmt_before(ast, head, &[def]);
        }

        // if fn, ok := tableN[v]; ok { fn() } else <terminal>
        let fn_name = fresh_name("fn", |n| taken.contains(n));
        let ok_name = fresh_name("ok", |n| taken.contains(n) || n == fn_name);
        let fn_sym = ast.intern(&fn_name);
        let ok_sym = ast.intern(&ok_name);
        let table_ref = ast.ident(&table);
        let indices = ast.arena.list_exprs([links[0].operand]);
        let lookup = ast.arena.new_expr(Expr::Index {
            base: table_ref,
            indices,
        });
        let names = ast
            .arena
            .list_ident_names([IdentName::synthetic(fn_sym), IdentName::synthetic(ok_sym)]);
        let values = ast.arena.list_exprs([lookup]);
        let init = ast
            .arena
            .new_simple(SimpleStmt::ShortVarDecl { names, values });
        let cond = ast.ident(&ok_name);
        let fn_ref = ast.ident(&fn_name);
        let invoke = call(ast, fn_ref, &[]);
        let invoke = expr_stmt(ast, invoke);
        let then_block = block(ast, &[invoke]);
        ast.arena.stmts[links[0].stmt] = Stmt::If {
            init: Some(init),
            cond,
            then_block,
            else_stmt: terminal,
        };

        tracing::debug!(path = %unit.path.display(), table = %table, file_scope, "if ladder rewritten");
        ctx.log_change(Self::NAME, &unit.path);
        Outcome::Rewritten
    }
}

impl Pass for IfChainToJumpTable {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn alias(&self) -> &'static str {
        "jump-table"
    }

    fn priority(&self) -> i32 {
        400
    }

    fn description(&self) -> &'static str {
        "equality if-else ladders become map lookups"
    }

    fn setup(&mut self, ctx: &mut Context) -> Result<()> {
        for unit in ctx.files() {
            self.package_names
                .entry(unit.package_path.clone())
                .or_default()
                .extend(top_level_names(&unit.ast));
        }
        Ok(())
    }

    fn apply(&mut self, unit: &mut SourceUnit, ctx: &mut Context) -> Result<bool> {
        let mut heads = Heads::default();
        for &top in unit.ast.decls() {
            heads.current = Some(top);
            top.walk(&unit.ast.arena, &mut heads);
        }

        let mut changed = false;
        for (head, top) in heads.heads {
            let rungs = ladder(&unit.ast, head);
            let mut i = 0;
            while i < rungs.len() {
                let first = link(&unit.ast, rungs[i]);
                let Some(first) = first else {
                    i += 1;
                    continue;
                };
                let text = print_expr(&unit.ast, first.operand);
                let mut links = vec![first];
                for &next in &rungs[i + 1..] {
                    match link(&unit.ast, next) {
                        Some(l) if print_expr(&unit.ast, l.operand) == text => links.push(l),
                        _ => break,
                    }
                }
                // tables go before the statement holding the whole ladder,
                // outside the scope of any earlier init statement
                let scoped = rungs[..i].iter().any(|&r| has_init(&unit.ast, r));
                match self.rewrite(unit, ctx, head, top, &links, scoped) {
                    Outcome::Rewritten => changed = true,
                    Outcome::Skipped | Outcome::NotAChain => {}
                }
                i += links.len();
            }
        }
        Ok(changed)
    }
}
