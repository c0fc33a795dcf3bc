//! Receiver resolution shared by the three field passes.

use std::collections::{HashMap, HashSet};

use gomorph_syntax::ast::{Ast, Expr, ExprId};
use gomorph_syntax::check::{ObjKind, SelectionKind};
use gomorph_syntax::TypeInfo;

use crate::astutil::{declared_struct_types, selector_parts, TypeRef};
use crate::context::{Context, SourceUnit};
use crate::events::SkipReason;

/// `x.F` where `F` is a packed bool field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FlagAccess {
    pub receiver: ExprId,
    pub flag: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Resolved {
    Flag(FlagAccess),
    Skip(SkipReason),
    /// Not a packed field at all.
    Other,
}

/// Resolves selectors of one file against the struct registry.
///
/// Checker selections are used when present. Otherwise a selector is only
/// rewritten when its receiver is an identifier declared in the same file
/// with a registered struct type.
pub(crate) struct FieldResolver {
    package_path: String,
    declared: HashMap<String, TypeRef>,
    /// Bool field names registered in this package.
    local_fields: HashSet<String>,
    /// Bool field names registered anywhere.
    any_fields: HashSet<String>,
}

impl FieldResolver {
    pub fn new(unit: &SourceUnit, ctx: &Context) -> Self {
        let mut local_fields = HashSet::new();
        let mut any_fields = HashSet::new();
        for r in ctx.structs() {
            for f in &r.bool_fields {
                any_fields.insert(f.clone());
                if r.package_path == unit.package_path {
                    local_fields.insert(f.clone());
                }
            }
        }
        Self {
            package_path: unit.package_path.clone(),
            declared: declared_struct_types(&unit.ast),
            local_fields,
            any_fields,
        }
    }

    /// Nothing registered at all: the passes have nothing to do.
    pub fn is_idle(&self) -> bool {
        self.any_fields.is_empty()
    }

    pub fn resolve(&self, ast: &Ast, info: &TypeInfo, ctx: &mut Context, e: ExprId) -> Resolved {
        let Some((base, field)) = selector_parts(ast, e) else {
            return Resolved::Other;
        };
        if !self.any_fields.contains(field) {
            return Resolved::Other;
        }

        if let Some(sel) = info.selections.get(&e) {
            if sel.kind != SelectionKind::Field {
                return Resolved::Other;
            }
            let Some(recv) = sel.recv.as_ref().filter(|r| !r.local) else {
                return Resolved::Other;
            };
            return self.lookup(ctx, &recv.name, field, base, sel.promoted);
        }

        match ast.arena.exprs[base] {
            Expr::Ident(sym) => {
                if info
                    .uses
                    .get(&base)
                    .is_some_and(|o| o.kind == ObjKind::Package)
                {
                    return Resolved::Other;
                }
                match self.declared.get(ast.str(sym)) {
                    Some(TypeRef { pkg: Some(_), .. }) => Resolved::Skip(SkipReason::CrossPackage),
                    Some(TypeRef { pkg: None, name }) => self.lookup(ctx, name, field, base, false),
                    None => self.unresolved(field),
                }
            }
            _ => self.unresolved(field),
        }
    }

    fn unresolved(&self, field: &str) -> Resolved {
        if self.local_fields.contains(field) {
            Resolved::Skip(SkipReason::UnresolvedReceiver)
        } else {
            Resolved::Other
        }
    }

    fn lookup(
        &self,
        ctx: &mut Context,
        type_name: &str,
        field: &str,
        receiver: ExprId,
        promoted: bool,
    ) -> Resolved {
        let Some(rec) = ctx.find_struct(&self.package_path, type_name) else {
            return Resolved::Other;
        };
        if rec.bit_of(field).is_none() {
            return Resolved::Other;
        }
        if promoted {
            return Resolved::Skip(SkipReason::PromotedField);
        }
        let (package, original) = (rec.package.clone(), rec.original_name.clone());
        let flag = ctx.flag_name_for(&package, &self.package_path, &original, field);
        Resolved::Flag(FlagAccess { receiver, flag })
    }
}
