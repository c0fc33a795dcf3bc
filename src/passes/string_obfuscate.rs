//! Replaces string literals with byte-slice conversions.
//!
//! `"info"` becomes `T([]byte{105, 110, 102, 111})` where `T` is the type the
//! literal takes in its context, so named string types keep type-checking.
//! Const declarations holding such literals become `var` declarations.

use std::collections::{HashMap, HashSet};

use gomorph_syntax::ast::*;
use gomorph_syntax::check::{ObjKind, Ty};
use gomorph_syntax::walk::{ExprCollector, Visitor, Walk};
use gomorph_syntax::{walk_exprs, Cursor, Flow, Slot, TypeInfo};

use crate::astutil::{
    call, decode_string_lit, enclosing_stmt_list, insert_stmt_after, insert_top_level,
    is_already_obfuscated_string_call, is_const_string, prohibited_zones, resolve_local_string_type,
    string_from_bytes, top_level_index, ty_to_type_expr,
};
use crate::context::{Context, SourceUnit};
use crate::error::Result;
use crate::events::SkipReason;
use crate::pass::Pass;

/// Literal values never rewritten. Reflection, encoding and protocol code
/// tends to compare against these words.
pub const DENY_LIST: &[&str] = &[
    "main", "func", "package", "import", "return", "string", "struct", "interface", "type",
    "const", "var", "true", "false", "nil", "error", "init", "json", "yaml", "xml", "http",
    "https", "GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS", "UTF-8",
];

#[derive(Debug, Default)]
pub struct StringLiteralObfuscate {
    /// Package path -> package-level consts that must keep their untyped
    /// constant nature (used where a named type is expected).
    pinned: HashMap<String, HashSet<String>>,
}

impl StringLiteralObfuscate {
    pub const NAME: &'static str = "StringLiteralObfuscate";

    pub fn new() -> Self {
        Self::default()
    }
}

/// Why a decoded value is not worth rewriting, if it is not.
fn value_skip(bytes: &[u8], min_len: usize) -> Option<SkipReason> {
    if bytes.len() < min_len {
        return Some(SkipReason::ShortString);
    }
    let denied = std::str::from_utf8(bytes).is_ok_and(|s| DENY_LIST.contains(&s));
    denied.then_some(SkipReason::DenyListed)
}

fn string_lit_raw(ast: &Ast, e: ExprId) -> Option<Symbol> {
    match ast.arena.exprs[e] {
        Expr::BasicLit(BasicLit {
            kind: BasicLitKind::String,
            raw,
        }) => Some(raw),
        _ => None,
    }
}

/// Constant-required positions: const spec values and array lengths.
fn const_context_exprs(ast: &Ast) -> HashSet<ExprId> {
    let a = &ast.arena;
    let mut v = ExprCollector::default();
    for d in a.decls.ids() {
        let decl = a.decls[d];
        if decl.kind != GenDeclKind::Const {
            continue;
        }
        for spec in a.specs_list(decl.specs) {
            if let Spec::Value(vs) = spec {
                for &e in a.exprs_list(vs.values) {
                    v.visit_expr(a, e);
                }
            }
        }
    }
    for t in a.types.ids() {
        if let Type::Array {
            len: ArrayLen::Expr(e),
            ..
        } = a.types[t]
        {
            v.visit_expr(a, e);
        }
    }
    v.found.into_iter().collect()
}

/// Where a declaration sits: the top-level list or a statement.
#[derive(Debug, Clone, Copy)]
enum DeclSite {
    TopLevel,
    Local(StmtId),
}

#[derive(Default)]
struct LocalDecls {
    found: Vec<(DeclId, StmtId)>,
}

impl<'ast> Visitor<'ast> for LocalDecls {
    fn visit_stmt(&mut self, a: &'ast AstArena, id: StmtId) {
        if let Stmt::Decl(d) = a.stmts[id] {
            self.found.push((d, id));
        }
        a.stmts[id].walk(a, self);
    }
}

fn const_decls(ast: &Ast) -> Vec<(DeclId, DeclSite)> {
    let mut out: Vec<(DeclId, DeclSite)> = ast
        .decls()
        .iter()
        .filter_map(|d| match *d {
            TopLevelDecl::Decl(id) => Some((id, DeclSite::TopLevel)),
            TopLevelDecl::Func(_) => None,
        })
        .collect();
    let mut locals = LocalDecls::default();
    ast.file.walk(&ast.arena, &mut locals);
    out.extend(
        locals
            .found
            .into_iter()
            .map(|(d, s)| (d, DeclSite::Local(s))),
    );
    out.retain(|(d, _)| ast.arena.decls[*d].kind == GenDeclKind::Const);
    out
}

/// Identifiers referenced from constant-required positions in this file.
fn const_referenced_names(ast: &Ast, const_exprs: &HashSet<ExprId>) -> HashSet<String> {
    const_exprs
        .iter()
        .filter_map(|&e| match ast.arena.exprs[e] {
            Expr::Ident(s) => Some(ast.str(s).to_string()),
            _ => None,
        })
        .collect()
}

/// String constants used where a named (or foreign) type is expected.
fn pinned_const_uses(ast: &Ast, info: &TypeInfo, local: bool) -> HashSet<String> {
    let mut out = HashSet::new();
    for e in ast.arena.exprs.ids() {
        let Expr::Ident(s) = ast.arena.exprs[e] else {
            continue;
        };
        let is_const = info
            .uses
            .get(&e)
            .is_some_and(|o| o.kind == ObjKind::Const && o.local == local);
        let named = matches!(
            info.expected.get(&e),
            Some(Ty::Named(_) | Ty::External { .. })
        );
        if is_const && named && is_const_string(info, e) {
            out.insert(ast.str(s).to_string());
        }
    }
    out
}

fn uses_iota(ast: &Ast, spec: &Spec) -> bool {
    let Spec::Value(v) = spec else { return false };
    ast.arena.exprs_list(v.values).iter().any(|&e| {
        let mut c = ExprCollector::default();
        c.visit_expr(&ast.arena, e);
        c.found
            .iter()
            .any(|&x| matches!(ast.arena.exprs[x], Expr::Ident(s) if ast.str(s) == "iota"))
    })
}

struct ConstConversion {
    changed: bool,
    /// Literals of const specs left in place, with the reason.
    skipped: HashMap<ExprId, SkipReason>,
}

impl StringLiteralObfuscate {
    /// Turns const specs whose values are all qualifying string literals into
    /// `var` specs, so the walk can rewrite their literals.
    fn convert_consts(&self, unit: &mut SourceUnit, ctx: &mut Context) -> ConstConversion {
        let min_len = ctx.options().short_string_min_len;
        let ast = &mut unit.ast;
        let info = &unit.info;
        let const_exprs = const_context_exprs(ast);
        let referenced = const_referenced_names(ast, &const_exprs);
        let pinned_local = pinned_const_uses(ast, info, true);
        let no_pins = HashSet::new();
        let pinned_pkg = self.pinned.get(&unit.package_path).unwrap_or(&no_pins);

        let mut out = ConstConversion {
            changed: false,
            skipped: HashMap::new(),
        };
        for (decl_id, site) in const_decls(ast) {
            let decl = ast.arena.decls[decl_id];
            let specs = ast.arena.specs_list(decl.specs).to_vec();
            let mut convert = Vec::new();
            for (i, spec) in specs.iter().enumerate() {
                let Spec::Value(v) = spec else { continue };
                let values = ast.arena.exprs_list(v.values).to_vec();
                let raws: Option<Vec<Symbol>> =
                    values.iter().map(|&e| string_lit_raw(ast, e)).collect();
                let Some(raws) = raws.filter(|r| !r.is_empty()) else {
                    continue;
                };
                let qualifies = raws.iter().any(|&raw| {
                    decode_string_lit(ast.str(raw))
                        .is_some_and(|b| value_skip(&b, min_len).is_none())
                });
                if !qualifies {
                    continue;
                }

                let names: Vec<String> = ast
                    .arena
                    .ident_names(v.names)
                    .iter()
                    .map(|n| ast.str(n.sym).to_string())
                    .collect();
                let pinned = match site {
                    DeclSite::TopLevel => pinned_pkg,
                    DeclSite::Local(_) => &pinned_local,
                };
                let reason = if specs.get(i + 1).is_some_and(
                    |next| matches!(next, Spec::Value(n) if n.values.is_empty()),
                ) {
                    Some(SkipReason::ImplicitRepetition)
                } else if specs[i + 1..].iter().any(|s| uses_iota(ast, s)) {
                    Some(SkipReason::ConstDependency)
                } else if names.iter().any(|n| {
                    referenced.contains(n)
                        || (matches!(site, DeclSite::TopLevel)
                            && info.package.const_deps.contains(n))
                        || (v.typ.is_none() && pinned.contains(n))
                }) {
                    Some(SkipReason::ConstDependency)
                } else {
                    None
                };
                match reason {
                    Some(r) => {
                        for &e in &values {
                            out.skipped.insert(e, r);
                        }
                    }
                    None => convert.push(i),
                }
            }
            if convert.is_empty() {
                continue;
            }
            out.changed = true;

            if convert.len() == specs.len() {
                ast.arena.decls[decl_id].kind = GenDeclKind::Var;
                continue;
            }
            // split the converted specs out of the group, keeping their order
            let kept: Vec<Spec> = specs
                .iter()
                .enumerate()
                .filter(|(i, _)| !convert.contains(i))
                .map(|(_, s)| *s)
                .collect();
            ast.arena.decls[decl_id].specs = ast.arena.list_specs(kept);
            let split: Vec<DeclId> = convert
                .iter()
                .map(|&i| {
                    let specs = ast.arena.list_specs([specs[i]]);
                    ast.arena.new_decl(Decl {
                        kind: GenDeclKind::Var,
                        grouped: false,
                        specs,
                    })
                })
                .collect();
            match site {
                DeclSite::TopLevel => {
                    let at = top_level_index(ast, TopLevelDecl::Decl(decl_id))
                        .map_or(ast.decls().len(), |i| i + 1);
                    for (k, d) in split.into_iter().enumerate() {
                        insert_top_level(ast, at + k, TopLevelDecl::Decl(d));
                    }
                }
                DeclSite::Local(anchor) => {
                    let stmts: Vec<StmtId> = split
                        .into_iter()
                        .map(|d| ast.arena.new_stmt(Stmt::Decl(d)))
                        .collect();
                    if enclosing_stmt_list(ast, anchor).is_some() {
                        insert_stmt_after(ast, anchor, &stmts);
                    }
                }
            }
        }
        out
    }
}

impl Pass for StringLiteralObfuscate {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn alias(&self) -> &'static str {
        "string-obfuscate"
    }

    fn priority(&self) -> i32 {
        300
    }

    fn description(&self) -> &'static str {
        "string literals become byte-slice conversions"
    }

    fn obfuscates(&self) -> bool {
        true
    }

    fn collect(&mut self, unit: &SourceUnit, _ctx: &mut Context) -> Result<()> {
        let pins = pinned_const_uses(&unit.ast, &unit.info, false);
        self.pinned
            .entry(unit.package_path.clone())
            .or_default()
            .extend(pins);
        Ok(())
    }

    fn apply(&mut self, unit: &mut SourceUnit, ctx: &mut Context) -> Result<bool> {
        for _ in prohibited_zones(&unit.ast) {
            ctx.log_visit(Self::NAME, &unit.path);
            ctx.log_skip(Self::NAME, &unit.path, SkipReason::ProhibitedZone);
        }

        let ConstConversion {
            mut changed,
            skipped,
        } = self.convert_consts(unit, ctx);
        let const_exprs = const_context_exprs(&unit.ast);
        let min_len = ctx.options().short_string_min_len;
        let info = &unit.info;
        let path = unit.path.as_path();

        walk_exprs(&mut unit.ast, |ast, c| {
            if is_already_obfuscated_string_call(ast, c.node) {
                ctx.log_visit(Self::NAME, path);
                ctx.log_skip(Self::NAME, path, SkipReason::AlreadyObfuscated);
                return Flow::Skip;
            }
            let Some(raw) = string_lit_raw(ast, c.node) else {
                return Flow::Continue;
            };
            ctx.log_visit(Self::NAME, path);
            let Some(bytes) = decode_string_lit(ast.str(raw)) else {
                tracing::warn!(path = %path.display(), "undecodable string literal left as is");
                return Flow::Skip;
            };

            let reason = if const_exprs.contains(&c.node) {
                let bare = matches!(c.slot, Slot::ValueSpec { is_const: true, .. })
                    && c.parent.is_none();
                Some(match skipped.get(&c.node) {
                    Some(&r) => r,
                    None if bare => {
                        value_skip(&bytes, min_len).unwrap_or(SkipReason::ConstExpression)
                    }
                    None => SkipReason::ConstExpression,
                })
            } else {
                value_skip(&bytes, min_len)
            };
            if let Some(reason) = reason {
                ctx.log_skip(Self::NAME, path, reason);
                return Flow::Skip;
            }

            let Some(new) = obfuscated(ast, info, c, &bytes) else {
                ctx.log_skip(Self::NAME, path, SkipReason::UnexpressibleType);
                return Flow::Skip;
            };
            ctx.log_change(Self::NAME, path);
            changed = true;
            c.replace(ast, new)
        });
        Ok(changed)
    }
}

/// Replacement for the literal under `c`.
fn obfuscated(ast: &mut Ast, info: &TypeInfo, c: &Cursor, bytes: &[u8]) -> Option<Expr> {
    let foreign = match info.expected.get(&c.node) {
        Some(ty @ Ty::External { .. }) => Some(ty.clone()),
        _ => None,
    };
    // conversions and declared types take precedence over the context type
    let local = resolve_local_string_type(ast, info, c);
    let is_plain_string = matches!(ast.arena.exprs[local], Expr::Ident(s) if ast.str(s) == "string");
    match foreign {
        Some(ty) if is_plain_string => {
            let t = ty_to_type_expr(ast, &ty)?;
            let fun = ast.arena.new_expr(Expr::Type(t));
            let inner = string_from_bytes(ast, local, bytes);
            let inner = ast.arena.new_expr(inner);
            let outer = call(ast, fun, &[inner]);
            Some(ast.arena.exprs[outer])
        }
        _ => Some(string_from_bytes(ast, local, bytes)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_and_denied_values_are_skipped() {
        assert_eq!(value_skip(b"abc", 4), Some(SkipReason::ShortString));
        assert_eq!(value_skip(b"main", 4), Some(SkipReason::DenyListed));
        assert_eq!(value_skip(b"UTF-8", 4), Some(SkipReason::DenyListed));
        assert_eq!(value_skip(b"hello", 4), None);
        // length counts bytes of the decoded value
        assert_eq!(value_skip("\u{e9}\u{e9}".as_bytes(), 4), None);
    }
}
