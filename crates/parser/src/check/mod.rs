//! Package-level type checker.
//!
//! All files of one directory form a package. Package-level declarations of
//! every file are collected first, then declarations and function bodies are
//! checked file by file. Problems become [`TypeDiagnostic`]s; checking never
//! fails. Types declared in other packages are opaque.

mod checker;
mod types;
mod universe;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub use types::{BasicKind, ConstValue, FieldTy, FuncTy, MethodTy, Named, NamedType, ObjKind, Ty};
pub use universe::Builtin;

use crate::ast::{Ast, ExprId, Span, TypeId};

/// Type and constant value of an expression.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAndValue {
    pub ty: Ty,
    pub value: Option<ConstValue>,
    /// The expression denotes a type, not a value.
    pub is_type: bool,
}

/// Entity an identifier refers to.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub kind: ObjKind,
    /// Declared inside a function body (including parameters).
    pub local: bool,
    pub ty: Ty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    Field,
    Method,
}

/// Resolved `x.f`.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub kind: SelectionKind,
    /// Named type declaring the field or method.
    pub recv: Option<Named>,
    pub name: Arc<str>,
    /// Reached through an embedded field.
    pub promoted: bool,
    /// Reached through a pointer.
    pub indirect: bool,
    pub ty: Ty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDiagnostic {
    pub span: Span,
    pub message: String,
}

/// Lexical block materialized while checking.
#[derive(Debug, Clone)]
pub struct ScopeRecord {
    pub span: Span,
    pub parent: Option<usize>,
    pub names: Vec<Arc<str>>,
}

/// Facts shared by every file of a package.
#[derive(Debug, Default)]
pub struct PackageScope {
    pub name: String,
    pub named: Vec<NamedType>,
    /// Package-level constants referenced from constant-required contexts
    /// (other constant declarations, array lengths).
    pub const_deps: HashSet<String>,
}

/// Checker output for one file.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub package: Arc<PackageScope>,
    pub types: HashMap<ExprId, TypeAndValue>,
    pub type_exprs: HashMap<TypeId, Ty>,
    pub uses: HashMap<ExprId, Object>,
    pub selections: HashMap<ExprId, Selection>,
    /// Type an untyped operand is converted to by its context.
    pub expected: HashMap<ExprId, Ty>,
    pub scopes: Vec<ScopeRecord>,
    pub diagnostics: Vec<TypeDiagnostic>,
}

impl Default for TypeInfo {
    fn default() -> Self {
        Self::empty()
    }
}

impl TypeInfo {
    /// Info carrying no facts; every lookup misses.
    pub fn empty() -> Self {
        Self {
            package: Arc::new(PackageScope::default()),
            types: HashMap::new(),
            type_exprs: HashMap::new(),
            uses: HashMap::new(),
            selections: HashMap::new(),
            expected: HashMap::new(),
            scopes: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn type_of(&self, e: ExprId) -> Option<&Ty> {
        self.types.get(&e).map(|tv| &tv.ty).filter(|t| t.is_valid())
    }

    pub fn value_of(&self, e: ExprId) -> Option<&ConstValue> {
        self.types.get(&e).and_then(|tv| tv.value.as_ref())
    }

    /// Underlying type; named types of other packages stay opaque.
    pub fn underlying<'t>(&'t self, ty: &'t Ty) -> &'t Ty {
        let mut cur = ty;
        for _ in 0..16 {
            match cur {
                Ty::Named(n) => match self.package.named.get(n.id as usize) {
                    Some(nt) => cur = &nt.underlying,
                    None => return cur,
                },
                _ => return cur,
            }
        }
        cur
    }

    /// True for `string` and named types whose underlying type is `string`.
    pub fn is_string_type(&self, ty: &Ty) -> bool {
        matches!(self.underlying(ty), Ty::Basic(b) if b.is_string())
    }

    pub fn is_bool_type(&self, ty: &Ty) -> bool {
        matches!(self.underlying(ty), Ty::Basic(b) if b.is_bool())
    }

    pub fn named_type(&self, n: &Named) -> Option<&NamedType> {
        self.package.named.get(n.id as usize)
    }
}

/// Checks every file of one package. `files` must share a package clause;
/// the result holds one [`TypeInfo`] per file, in order.
pub fn check_package(files: &[&Ast]) -> Vec<TypeInfo> {
    checker::Checker::new(files).run()
}

/// Checks a single-file package.
pub fn check_file(ast: &Ast) -> TypeInfo {
    check_package(&[ast]).pop().unwrap_or_default()
}
