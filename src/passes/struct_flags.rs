//! Packs the bool fields of a struct into one unsigned flag word.
//!
//! ```text
//! type Cfg struct {            const (
//!     Debug bool                   FlagP_Cfg_Debug uint8 = 1 << 0
//!     Name  string      =>     )
//! }                            type CfgFlags struct {
//!                                  flags uint8
//!                                  Name  string
//!                              }
//! ```
//!
//! Collection runs over every file before any file is rewritten, so type
//! references are renamed consistently across the files of a package.

use std::collections::{HashMap, HashSet};

use gomorph_syntax::ast::*;
use gomorph_syntax::check::{ObjKind, Ty};
use gomorph_syntax::{walk_exprs, Flow, TypeInfo};

use crate::astutil::{
    binary, const_block, decode_string_lit, flag_const, iife_flag, insert_top_level,
    bool_literal, PACKED_FIELD,
};
use crate::context::{Context, SourceUnit, StructRecord};
use crate::error::{Error, Result};
use crate::events::SkipReason;
use crate::pass::Pass;

/// Suffix of the rewritten type name.
pub const NEW_NAME_SUFFIX: &str = "Flags";

#[derive(Debug, Default)]
pub struct StructOfBoolsToFlags {
    /// `(package path, type name)` used from another package of the project.
    cross_refs: HashSet<(String, String)>,
    /// Package paths dot-imported somewhere in the project.
    dot_imported: HashSet<String>,
    /// `(package path, type name)` embedded in another struct.
    embedded: HashSet<(String, String)>,
}

impl StructOfBoolsToFlags {
    pub const NAME: &'static str = "StructOfBoolsToFlags";

    pub fn new() -> Self {
        Self::default()
    }

    fn is_cross_package(&self, package_path: &str, name: &str) -> bool {
        self.dot_imported.contains(package_path)
            || self
                .cross_refs
                .contains(&(package_path.to_string(), name.to_string()))
    }
}

/// Package directory an import path points at, if it is one of ours.
fn imported_package<'p>(import: &str, packages: &'p [String]) -> Option<&'p String> {
    packages
        .iter()
        .filter(|p| !p.is_empty())
        .find(|p| import == p.as_str() || import.ends_with(&format!("/{p}")))
}

/// Qualified references `alias.Name` in types and expressions.
fn qualified_refs(ast: &Ast) -> Vec<(String, String)> {
    let a = &ast.arena;
    let mut out = Vec::new();
    for t in a.types.ids() {
        if let Type::Named {
            pkg: Some(pkg),
            name,
            ..
        } = a.types[t]
        {
            out.push((ast.str(pkg.sym).to_string(), ast.str(name.sym).to_string()));
        }
    }
    for e in a.exprs.ids() {
        if let Expr::Selector { expr, sel } = a.exprs[e] {
            if let Expr::Ident(pkg) = a.exprs[expr] {
                out.push((ast.str(pkg).to_string(), ast.str(sel.sym).to_string()));
            }
        }
    }
    out
}

/// Name of the type a field embeds.
fn embedded_name(ast: &Ast, t: TypeId) -> Option<&str> {
    match ast.arena.types[t] {
        Type::Named { pkg: None, name, .. } => Some(ast.str(name.sym)),
        Type::Pointer(inner) | Type::Paren(inner) => embedded_name(ast, inner),
        _ => None,
    }
}

fn is_bool_field_type(ast: &Ast, info: &TypeInfo, t: TypeId) -> bool {
    match info.type_exprs.get(&t) {
        Some(ty) => *ty == Ty::BOOL,
        None => matches!(
            ast.arena.types[t],
            Type::Named { pkg: None, name, args } if args.is_empty() && ast.str(name.sym) == "bool"
        ),
    }
}

/// Candidate struct declarations: top-level, non-alias `type T struct{...}`.
fn struct_specs(ast: &Ast) -> Vec<(DeclId, usize, TypeSpec, ListRef<FieldId>)> {
    let mut out = Vec::new();
    for d in ast.decls() {
        let TopLevelDecl::Decl(id) = *d else { continue };
        let decl = ast.arena.decls[id];
        if decl.kind != GenDeclKind::Type {
            continue;
        }
        for (i, spec) in ast.arena.specs_list(decl.specs).iter().enumerate() {
            let Spec::Type(ts) = *spec else { continue };
            if ts.alias {
                continue;
            }
            if let Type::Struct { fields } = ast.arena.types[ts.typ] {
                out.push((id, i, ts, fields));
            }
        }
    }
    out
}

/// Bool field names in declaration order, and whether a field is already
/// called like the packed field.
fn bool_fields(ast: &Ast, info: &TypeInfo, fields: ListRef<FieldId>) -> (Vec<String>, bool) {
    let mut bools = Vec::new();
    let mut collides = false;
    for &f in ast.arena.fields_list(fields) {
        let field = ast.arena.fields[f];
        let names = ast.arena.ident_names(field.names);
        collides |= names.iter().any(|n| ast.str(n.sym) == PACKED_FIELD);
        if field.embedded || !is_bool_field_type(ast, info, field.typ) {
            continue;
        }
        bools.extend(names.iter().map(|n| ast.str(n.sym).to_string()));
    }
    (bools, collides)
}

impl Pass for StructOfBoolsToFlags {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn alias(&self) -> &'static str {
        "struct-flags"
    }

    fn priority(&self) -> i32 {
        100
    }

    fn description(&self) -> &'static str {
        "packs bool fields of structs into one unsigned flag word"
    }

    fn setup(&mut self, ctx: &mut Context) -> Result<()> {
        let mut packages: Vec<String> = ctx.files().map(|u| u.package_path.clone()).collect();
        packages.sort();
        packages.dedup();

        for unit in ctx.files() {
            let ast = &unit.ast;
            // alias -> package path, for imports of our own packages
            let mut aliases: HashMap<String, String> = HashMap::new();
            for (_, _, spec) in ast.import_specs() {
                let Some(path) = decode_string_lit(ast.str(spec.path.raw)) else {
                    continue;
                };
                let path = String::from_utf8_lossy(&path).into_owned();
                let Some(target) = imported_package(&path, &packages) else {
                    continue;
                };
                if *target == unit.package_path {
                    continue;
                }
                match spec.name {
                    Some(ImportName::Dot) => {
                        self.dot_imported.insert(target.clone());
                    }
                    Some(ImportName::Blank) => {}
                    Some(ImportName::Name(n)) => {
                        aliases.insert(ast.str(n).to_string(), target.clone());
                    }
                    None => {
                        let last = path.rsplit('/').next().unwrap_or(path.as_str()).to_string();
                        aliases.insert(last, target.clone());
                    }
                }
            }
            for (alias, name) in qualified_refs(ast) {
                if let Some(target) = aliases.get(&alias) {
                    self.cross_refs.insert((target.clone(), name));
                }
            }
            for f in ast.arena.fields.ids() {
                let field = ast.arena.fields[f];
                if field.embedded {
                    if let Some(name) = embedded_name(ast, field.typ) {
                        self.embedded
                            .insert((unit.package_path.clone(), name.to_string()));
                    }
                }
            }
        }
        tracing::debug!(
            cross = self.cross_refs.len(),
            dot = self.dot_imported.len(),
            "struct references across packages"
        );
        Ok(())
    }

    fn collect(&mut self, unit: &SourceUnit, ctx: &mut Context) -> Result<()> {
        let ast = &unit.ast;
        for (_, _, ts, fields) in struct_specs(ast) {
            let (bools, collides) = bool_fields(ast, &unit.info, fields);
            if bools.is_empty() {
                continue;
            }
            let name = ast.str(ts.name.sym);
            ctx.log_visit(Self::NAME, &unit.path);

            let reason = if ts.type_params.is_some() {
                Some(SkipReason::GenericStruct)
            } else if bools.len() < ctx.options().min_bool_fields {
                Some(SkipReason::BelowThreshold)
            } else if collides {
                Some(SkipReason::NameCollision)
            } else if self.is_cross_package(&unit.package_path, name) {
                Some(SkipReason::CrossPackage)
            } else if self
                .embedded
                .contains(&(unit.package_path.clone(), name.to_string()))
            {
                Some(SkipReason::PromotedField)
            } else {
                None
            };
            if let Some(reason) = reason {
                tracing::debug!(path = %unit.path.display(), name, %reason, "struct left as is");
                ctx.log_skip(Self::NAME, &unit.path, reason);
                continue;
            }

            let new_name = ctx
                .struct_record(&unit.package_path, name)
                .map(|r| r.new_name.clone())
                .unwrap_or_else(|| format!("{name}{NEW_NAME_SUFFIX}"));
            ctx.register_struct(
                unit.package_name(),
                &unit.package_path,
                name,
                &new_name,
                &bools,
            )?;
        }
        Ok(())
    }

    fn apply(&mut self, unit: &mut SourceUnit, ctx: &mut Context) -> Result<bool> {
        let records: Vec<StructRecord> = ctx
            .structs()
            .filter(|r| r.package_path == unit.package_path)
            .cloned()
            .collect();
        if records.is_empty() {
            return Ok(false);
        }
        let by_name: HashMap<&str, &StructRecord> = records
            .iter()
            .map(|r| (r.original_name.as_str(), r))
            .collect();

        let mut changed = rewrite_literals(unit, ctx, &by_name)?;
        changed |= rewrite_declarations(unit, ctx, &by_name);
        changed |= rename_references(unit, &by_name);
        Ok(changed)
    }
}

// =============================================================================
// Literals
// =============================================================================

struct LiteralRewriter<'r> {
    records: &'r HashMap<&'r str, &'r StructRecord>,
    /// Span of the literal being rewritten, for error reports.
    span: Span,
    rewritten: usize,
    positional: bool,
}

impl LiteralRewriter<'_> {
    /// Record for a type expression naming one of the packed structs.
    fn record_for(&self, ast: &Ast, info: &TypeInfo, t: TypeId) -> Option<&StructRecord> {
        match ast.arena.types[t] {
            Type::Paren(inner) => self.record_for(ast, info, inner),
            Type::Named {
                pkg: None,
                name,
                args,
            } if args.is_empty() => {
                let shadowed = matches!(
                    info.type_exprs.get(&t),
                    Some(Ty::Named(n)) if n.local
                ) || matches!(info.type_exprs.get(&t), Some(Ty::TypeParam(_)));
                if shadowed {
                    return None;
                }
                self.records.get(ast.str(name.sym)).copied()
            }
            _ => None,
        }
    }

    /// Rewrites `lit` as a literal of type `t`. Returns the new literal when
    /// anything changed.
    fn literal(
        &mut self,
        ast: &mut Ast,
        info: &TypeInfo,
        t: TypeId,
        lit: LiteralValue,
    ) -> Option<LiteralValue> {
        if let Some(rec) = self.record_for(ast, info, t) {
            let rec = rec.clone();
            return self.struct_literal(ast, info, &rec, lit);
        }
        let (key_t, elem_t) = match ast.arena.types[t] {
            Type::Slice(elem) | Type::Array { elem, .. } => (None, elem),
            Type::Map { key, val } => (Some(key), val),
            Type::Paren(inner) => return self.literal(ast, info, inner, lit),
            _ => return None,
        };
        let mut changed = false;
        let n = ast.arena.keyed_elems_list(lit.elements).len();
        for i in 0..n {
            let el = ast.arena.keyed_elems_list(lit.elements)[i];
            if let (Some(kt), Some(Key::Literal(kl))) = (key_t, el.key) {
                if let Some(new) = self.elided(ast, info, kt, kl) {
                    ast.arena.keyed_elems_list_mut(lit.elements)[i].key = Some(Key::Literal(new));
                    changed = true;
                }
            }
            if let Element::Literal(vl) = el.value {
                if let Some(new) = self.elided(ast, info, elem_t, vl) {
                    ast.arena.keyed_elems_list_mut(lit.elements)[i].value = Element::Literal(new);
                    changed = true;
                }
            }
        }
        // elements were edited in place
        changed.then_some(lit)
    }

    /// Elided literal of element type `t`; `{...}` stands for `&T{...}`
    /// when `t` is `*T`.
    fn elided(
        &mut self,
        ast: &mut Ast,
        info: &TypeInfo,
        t: TypeId,
        lit: LiteralValue,
    ) -> Option<LiteralValue> {
        match ast.arena.types[t] {
            Type::Pointer(inner) => self.literal(ast, info, inner, lit),
            _ => self.literal(ast, info, t, lit),
        }
    }

    /// `T{F1: true, F2: v, Name: n}` to `TFlags{flags: F1 | iife(v), Name: n}`.
    fn struct_literal(
        &mut self,
        ast: &mut Ast,
        info: &TypeInfo,
        rec: &StructRecord,
        lit: LiteralValue,
    ) -> Option<LiteralValue> {
        let elems = ast.arena.keyed_elems_list(lit.elements).to_vec();
        if elems.iter().any(|e| e.key.is_none()) {
            self.positional = true;
            return None;
        }
        let mut terms = Vec::new();
        let mut rest = Vec::new();
        let mut touched = false;
        for el in elems {
            let field = match (el.key, el.value) {
                (Some(Key::Expr(k)), Element::Expr(v)) => match ast.arena.exprs[k] {
                    Expr::Ident(s) if rec.bit_of(ast.str(s)).is_some() => {
                        Some((ast.str(s).to_string(), v))
                    }
                    _ => None,
                },
                _ => None,
            };
            let Some((name, value)) = field else {
                rest.push(el);
                continue;
            };
            touched = true;
            let Some(flag) = rec.flag_for(&name).map(str::to_string) else {
                continue;
            };
            match bool_literal(ast, info, value) {
                Some(true) => terms.push(ast.ident(&flag)),
                Some(false) => {}
                None => terms.push(iife_flag(ast, value, &flag, rec.storage)),
            }
        }
        if !touched {
            return None;
        }
        self.rewritten += 1;
        let mut out = Vec::with_capacity(rest.len() + 1);
        if let Some((&first, more)) = terms.split_first() {
            let value = more
                .iter()
                .fold(first, |acc, &t| binary(ast, acc, BinaryOp::Or, t));
            let key = ast.ident(PACKED_FIELD);
            out.push(KeyedElement {
                key: Some(Key::Expr(key)),
                value: Element::Expr(value),
            });
        }
        out.extend(rest);
        Some(LiteralValue {
            elements: ast.arena.list_keyed_elems(out),
        })
    }
}

fn rewrite_literals(
    unit: &mut SourceUnit,
    ctx: &mut Context,
    records: &HashMap<&str, &StructRecord>,
) -> Result<bool> {
    let info = &unit.info;
    let mut rw = LiteralRewriter {
        records,
        span: Span::DUMMY,
        rewritten: 0,
        positional: false,
    };
    walk_exprs(&mut unit.ast, |ast, c| {
        if rw.positional {
            return Flow::Skip;
        }
        let Expr::CompositeLit { typ, lit } = c.expr(ast) else {
            return Flow::Continue;
        };
        rw.span = ast.arena.exprs.span(c.node);
        if let Some(new) = rw.literal(ast, info, typ, lit) {
            ast.arena
                .exprs
                .replace(c.node, Expr::CompositeLit { typ, lit: new });
        }
        Flow::Continue
    });
    if rw.positional {
        return Err(Error::PassInternal {
            pass: StructOfBoolsToFlags::NAME,
            path: unit.path.clone(),
            message: "positional literal of a struct with packed bool fields".to_string(),
            position: ctx.position(unit.ast.file_id, rw.span),
        });
    }
    for _ in 0..rw.rewritten {
        ctx.log_change(StructOfBoolsToFlags::NAME, &unit.path);
    }
    Ok(rw.rewritten > 0)
}

// =============================================================================
// Declarations
// =============================================================================

fn rewrite_declarations(
    unit: &mut SourceUnit,
    ctx: &mut Context,
    records: &HashMap<&str, &StructRecord>,
) -> bool {
    let ast = &mut unit.ast;
    let mut const_blocks = Vec::new();
    let mut changed = false;

    for (decl, idx, ts, fields) in struct_specs(ast) {
        let name = ast.str(ts.name.sym).to_string();
        let Some(rec) = records.get(name.as_str()) else {
            continue;
        };
        let (bools, _) = bool_fields(ast, &unit.info, fields);
        if bools.is_empty() {
            continue;
        }

        let storage = ast.named_type(rec.storage.type_name());
        let packed_name = ast.intern(PACKED_FIELD);
        let names = ast.arena.list_ident_names([IdentName::synthetic(packed_name)]);
        let packed = ast.arena.new_field(Field {
            names,
            variadic: false,
            typ: storage,
            tag: None,
            embedded: false,
        });
        let mut kept = vec![packed];
        for &f in ast.arena.fields_list(fields) {
            let field = ast.arena.fields[f];
            if field.embedded || !is_bool_field_type(ast, &unit.info, field.typ) {
                kept.push(f);
            }
        }
        let new_fields = ast.arena.list_fields(kept);
        ast.arena.types[ts.typ] = Type::Struct { fields: new_fields };

        let new_sym = ast.intern(&rec.new_name);
        let specs = ast.arena.decls[decl].specs;
        ast.arena.specs_list_mut(specs)[idx] = Spec::Type(TypeSpec {
            name: IdentName {
                sym: new_sym,
                pos: ts.name.pos,
            },
            ..ts
        });
        ctx.log_change(StructOfBoolsToFlags::NAME, &unit.path);
        changed = true;

        if !ctx.has_emitted_package_constants(&rec.package_path, &rec.original_name) {
            let specs: Vec<Spec> = rec
                .bool_fields
                .iter()
                .enumerate()
                .filter_map(|(bit, field)| {
                    let flag = rec.flag_for(field)?;
                    Some(flag_const(ast, flag, rec.storage, bit as u32))
                })
                .collect();
            const_blocks.push(const_block(ast, specs));
            ctx.mark_package_constants_emitted(&rec.package_path, &rec.original_name);
        }
    }

    let at = ast
        .decls()
        .iter()
        .rposition(|d| matches!(d, TopLevelDecl::Decl(id) if ast.arena.decls[*id].kind == GenDeclKind::Import))
        .map_or(0, |i| i + 1);
    for (k, block) in const_blocks.into_iter().enumerate() {
        insert_top_level(ast, at + k, TopLevelDecl::Decl(block));
    }
    changed
}

// =============================================================================
// References
// =============================================================================

/// Renames every remaining reference to a packed struct type.
fn rename_references(unit: &mut SourceUnit, records: &HashMap<&str, &StructRecord>) -> bool {
    let info = &unit.info;
    let ast = &mut unit.ast;
    let mut renames: Vec<(TypeId, Symbol)> = Vec::new();
    let mut expr_renames: Vec<(ExprId, Symbol)> = Vec::new();

    for t in ast.arena.types.ids() {
        let Type::Named {
            pkg: None, name, ..
        } = ast.arena.types[t]
        else {
            continue;
        };
        let Some(rec) = records.get(ast.str(name.sym)) else {
            continue;
        };
        let ours = match info.type_exprs.get(&t) {
            None => true,
            Some(Ty::Named(n)) => !n.local && *n.name == *rec.original_name,
            Some(_) => false,
        };
        if ours {
            renames.push((t, ast.intern(&rec.new_name)));
        }
    }
    for e in ast.arena.exprs.ids() {
        let Expr::Ident(sym) = ast.arena.exprs[e] else {
            continue;
        };
        let Some(rec) = records.get(ast.str(sym)) else {
            continue;
        };
        // struct literal keys are not recorded as uses and stay untouched
        let ours = info
            .uses
            .get(&e)
            .is_some_and(|o| o.kind == ObjKind::TypeName && !o.local);
        if ours {
            expr_renames.push((e, ast.intern(&rec.new_name)));
        }
    }

    let changed = !renames.is_empty() || !expr_renames.is_empty();
    for (t, sym) in renames {
        if let Type::Named { name, .. } = &mut ast.arena.types[t] {
            name.sym = sym;
        }
    }
    for (e, sym) in expr_renames {
        ast.arena.exprs[e] = Expr::Ident(sym);
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imports_match_package_directories() {
        let pkgs = vec![String::new(), "util".to_string(), "internal/conf".to_string()];
        assert_eq!(
            imported_package("example.com/m/internal/conf", &pkgs).map(String::as_str),
            Some("internal/conf")
        );
        assert_eq!(imported_package("util", &pkgs).map(String::as_str), Some("util"));
        assert_eq!(imported_package("example.com/other/myutil", &pkgs), None);
    }
}
