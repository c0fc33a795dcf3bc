//! Node builders and predicates shared by the passes.
//!
//! Builders allocate synthesized nodes (dummy spans) and return either the new
//! id or, for in-place replacement through a cursor, the node value itself.

use std::collections::{HashMap, HashSet};

use gomorph_syntax::ast::*;
use gomorph_syntax::check::{BasicKind, ConstValue, Ty, TypeInfo};
use gomorph_syntax::lexer::unquote;
use gomorph_syntax::walk::{Visitor, Walk};
use gomorph_syntax::Cursor;

/// Name of the packed field of every rewritten struct.
pub const PACKED_FIELD: &str = "flags";

// =============================================================================
// Storage width
// =============================================================================

/// Unsigned integer type holding the bits of one packed struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StorageWidth {
    U8,
    U16,
    U32,
    U64,
}

impl StorageWidth {
    pub const fn bits(self) -> u32 {
        match self {
            StorageWidth::U8 => 8,
            StorageWidth::U16 => 16,
            StorageWidth::U32 => 32,
            StorageWidth::U64 => 64,
        }
    }

    pub const fn type_name(self) -> &'static str {
        match self {
            StorageWidth::U8 => "uint8",
            StorageWidth::U16 => "uint16",
            StorageWidth::U32 => "uint32",
            StorageWidth::U64 => "uint64",
        }
    }

    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "uint8" | "byte" => Some(StorageWidth::U8),
            "uint16" => Some(StorageWidth::U16),
            "uint32" => Some(StorageWidth::U32),
            "uint64" => Some(StorageWidth::U64),
            _ => None,
        }
    }
}

/// Narrowest storage for `n` flags; `None` for 0 and for more than 64.
pub fn width_for(n: usize) -> Option<StorageWidth> {
    match n {
        1..=8 => Some(StorageWidth::U8),
        9..=16 => Some(StorageWidth::U16),
        17..=32 => Some(StorageWidth::U32),
        33..=64 => Some(StorageWidth::U64),
        _ => None,
    }
}

/// Upper-cases the first character.
pub fn title(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `"Flag" + Title(pkg) + "_" + Struct + "_" + Title(field)`.
pub fn flag_const_name(package: &str, strukt: &str, field: &str) -> String {
    format!("Flag{}_{}_{}", title(package), strukt, title(field))
}

// =============================================================================
// Small builders
// =============================================================================

pub fn basic_lit(ast: &mut Ast, kind: BasicLitKind, raw: &str) -> ExprId {
    let raw = ast.intern(raw);
    ast.arena.new_expr(Expr::BasicLit(BasicLit { kind, raw }))
}

pub fn int_lit(ast: &mut Ast, v: u64) -> ExprId {
    basic_lit(ast, BasicLitKind::Int, &v.to_string())
}

pub fn selector(ast: &mut Ast, x: ExprId, name: &str) -> ExprId {
    let sym = ast.intern(name);
    ast.arena.new_expr(Expr::Selector {
        expr: x,
        sel: IdentName::synthetic(sym),
    })
}

pub fn binary(ast: &mut Ast, left: ExprId, op: BinaryOp, right: ExprId) -> ExprId {
    ast.arena.new_expr(Expr::Binary { left, op, right })
}

pub fn call(ast: &mut Ast, fun: ExprId, args: &[ExprId]) -> ExprId {
    let args = ast.arena.list_exprs(args.iter().copied());
    ast.arena.new_expr(Expr::Call {
        fun,
        args,
        ellipsis: false,
    })
}

pub fn block(ast: &mut Ast, stmts: &[StmtId]) -> Block {
    Block {
        stmts: ast.arena.list_stmts(stmts.iter().copied()),
    }
}

pub fn simple_stmt(ast: &mut Ast, s: SimpleStmt) -> StmtId {
    let id = ast.arena.new_simple(s);
    ast.arena.new_stmt(Stmt::Simple(id))
}

pub fn expr_stmt(ast: &mut Ast, e: ExprId) -> StmtId {
    simple_stmt(ast, SimpleStmt::Expr(e))
}

pub fn return_stmt(ast: &mut Ast, values: &[ExprId]) -> StmtId {
    let values = ast.arena.list_exprs(values.iter().copied());
    ast.arena.new_stmt(Stmt::Return(values))
}

/// Signature without parameters, with at most one unnamed result.
pub fn nullary_signature(ast: &mut Ast, result: Option<TypeId>) -> SignatureId {
    ast.arena.new_signature(Signature {
        params: ListRef::EMPTY,
        results: result.map(Results::Type),
    })
}

// =============================================================================
// Bitwise builders
// =============================================================================

fn masked(ast: &mut Ast, receiver: ExprId, packed_field: &str, flag: &str) -> ExprId {
    let field = selector(ast, receiver, packed_field);
    let flag = ast.ident(flag);
    let and = binary(ast, field, BinaryOp::And, flag);
    ast.arena.new_expr(Expr::Paren(and))
}

/// `(receiver.packedField & flag) != 0`
pub fn bitwise_check(ast: &mut Ast, receiver: ExprId, packed_field: &str, flag: &str) -> Expr {
    let m = masked(ast, receiver, packed_field, flag);
    let zero = int_lit(ast, 0);
    Expr::Binary {
        left: m,
        op: BinaryOp::Ne,
        right: zero,
    }
}

/// `(receiver.packedField & flag) == 0`
pub fn bitwise_check_unset(
    ast: &mut Ast,
    receiver: ExprId,
    packed_field: &str,
    flag: &str,
) -> Expr {
    let m = masked(ast, receiver, packed_field, flag);
    let zero = int_lit(ast, 0);
    Expr::Binary {
        left: m,
        op: BinaryOp::Eq,
        right: zero,
    }
}

fn flag_assign(
    ast: &mut Ast,
    receiver: ExprId,
    packed_field: &str,
    flag: &str,
    op: AssignOp,
) -> SimpleStmt {
    let field = selector(ast, receiver, packed_field);
    let flag = ast.ident(flag);
    SimpleStmt::Assign {
        lhs: ast.arena.list_exprs([field]),
        op,
        rhs: ast.arena.list_exprs([flag]),
    }
}

/// `receiver.packedField |= flag`
pub fn set_flag(ast: &mut Ast, receiver: ExprId, packed_field: &str, flag: &str) -> SimpleStmt {
    flag_assign(ast, receiver, packed_field, flag, AssignOp::OrAssign)
}

/// `receiver.packedField &^= flag`
pub fn clear_flag(ast: &mut Ast, receiver: ExprId, packed_field: &str, flag: &str) -> SimpleStmt {
    flag_assign(ast, receiver, packed_field, flag, AssignOp::AndNotAssign)
}

fn value_spec(ast: &mut Ast, name: &str, type_name: Option<&str>, value: ExprId) -> Spec {
    let sym = ast.intern(name);
    let names = ast.arena.list_ident_names([IdentName::synthetic(sym)]);
    let typ = type_name.map(|t| ast.named_type(t));
    let values = ast.arena.list_exprs([value]);
    Spec::Value(ValueSpec { names, typ, values })
}

/// Spec `name storageType = 1 << bit`.
pub fn flag_const(ast: &mut Ast, name: &str, storage: StorageWidth, bit: u32) -> Spec {
    let one = int_lit(ast, 1);
    let shift = int_lit(ast, u64::from(bit));
    let value = binary(ast, one, BinaryOp::Shl, shift);
    value_spec(ast, name, Some(storage.type_name()), value)
}

/// Single `const name typeName = value`.
pub fn const_decl(ast: &mut Ast, name: &str, type_name: Option<&str>, value: ExprId) -> DeclId {
    let spec = value_spec(ast, name, type_name, value);
    let specs = ast.arena.list_specs([spec]);
    ast.arena.new_decl(Decl {
        kind: GenDeclKind::Const,
        grouped: false,
        specs,
    })
}

/// Grouped `const ( ... )` holding `specs`.
pub fn const_block(ast: &mut Ast, specs: Vec<Spec>) -> DeclId {
    let specs = ast.arena.list_specs(specs);
    ast.arena.new_decl(Decl {
        kind: GenDeclKind::Const,
        grouped: true,
        specs,
    })
}

/// `typeExpr([]byte{b0, b1, ...})` with decimal byte literals.
pub fn string_from_bytes(ast: &mut Ast, type_expr: ExprId, bytes: &[u8]) -> Expr {
    let elems: Vec<KeyedElement> = bytes
        .iter()
        .map(|&b| KeyedElement {
            key: None,
            value: Element::Expr(int_lit(ast, u64::from(b))),
        })
        .collect();
    let elements = ast.arena.list_keyed_elems(elems);
    let byte = ast.named_type("byte");
    let slice = ast.arena.new_type(Type::Slice(byte));
    let lit = ast.arena.new_expr(Expr::CompositeLit {
        typ: slice,
        lit: LiteralValue { elements },
    });
    Expr::Call {
        fun: type_expr,
        args: ast.arena.list_exprs([lit]),
        ellipsis: false,
    }
}

/// `func() T { if cond { return flag }; return 0 }()`: the flag contribution of
/// a bool that is not a literal.
pub fn iife_flag(ast: &mut Ast, cond: ExprId, flag: &str, storage: StorageWidth) -> ExprId {
    let flag = ast.ident(flag);
    let ret_flag = return_stmt(ast, &[flag]);
    let then_block = block(ast, &[ret_flag]);
    let if_stmt = ast.arena.new_stmt(Stmt::If {
        init: None,
        cond,
        then_block,
        else_stmt: None,
    });
    let zero = int_lit(ast, 0);
    let ret_zero = return_stmt(ast, &[zero]);
    let body = block(ast, &[if_stmt, ret_zero]);
    let result = ast.named_type(storage.type_name());
    let sig = nullary_signature(ast, Some(result));
    let func = ast.arena.new_expr(Expr::FuncLit { sig, body });
    call(ast, func, &[])
}

// =============================================================================
// Predicates
// =============================================================================

/// `x.name` split into its parts.
pub fn selector_parts(ast: &Ast, e: ExprId) -> Option<(ExprId, &str)> {
    match ast.arena.exprs[e] {
        Expr::Selector { expr, sel } => Some((expr, ast.str(sel.sym))),
        _ => None,
    }
}

pub fn ident_name(ast: &Ast, e: ExprId) -> Option<&str> {
    match ast.arena.exprs[e] {
        Expr::Ident(s) => Some(ast.str(s)),
        _ => None,
    }
}

/// `Some(true)` / `Some(false)` for the predeclared constants.
pub fn bool_literal(ast: &Ast, info: &TypeInfo, e: ExprId) -> Option<bool> {
    let value = match ident_name(ast, e)? {
        "true" => true,
        "false" => false,
        _ => return None,
    };
    // a local named `true` shadows the constant
    match info.uses.get(&e) {
        Some(obj) if obj.local => None,
        _ => Some(value),
    }
}

/// Output shape of [`string_from_bytes`]: `T([]byte{int, int, ...})`.
pub fn is_already_obfuscated_string_call(ast: &Ast, e: ExprId) -> bool {
    let Expr::Call {
        args,
        ellipsis: false,
        ..
    } = ast.arena.exprs[e]
    else {
        return false;
    };
    let [arg] = ast.arena.exprs_list(args) else {
        return false;
    };
    let Expr::CompositeLit { typ, lit } = ast.arena.exprs[*arg] else {
        return false;
    };
    let Type::Slice(elem) = ast.arena.types[typ] else {
        return false;
    };
    let is_byte = matches!(
        ast.arena.types[elem],
        Type::Named { pkg: None, name, args } if args.is_empty()
            && matches!(ast.str(name.sym), "byte" | "uint8")
    );
    is_byte
        && ast.arena.keyed_elems_list(lit.elements).iter().all(|el| {
            el.key.is_none()
                && matches!(el.value, Element::Expr(v) if matches!(
                    ast.arena.exprs[v],
                    Expr::BasicLit(BasicLit { kind: BasicLitKind::Int, .. })
                ))
        })
}

/// Decoded bytes of a string literal, raw or interpreted.
pub fn decode_string_lit(raw: &str) -> Option<Vec<u8>> {
    unquote::string(raw).ok()
}

/// `e` is a string constant, or has a named type over `string`.
pub fn is_const_string(info: &TypeInfo, e: ExprId) -> bool {
    matches!(info.value_of(e), Some(ConstValue::String(_)))
        || info
            .type_of(e)
            .is_some_and(|t| matches!(t, Ty::Named(_)) && info.is_string_type(t))
}

fn is_string_type_expr(ast: &Ast, info: &TypeInfo, t: TypeId) -> bool {
    match info.type_exprs.get(&t) {
        Some(ty) => info.is_string_type(ty),
        None => matches!(
            ast.arena.types[t],
            Type::Named { pkg: None, name, .. } if ast.str(name.sym) == "string"
        ),
    }
}

/// Type to rebuild a string literal with, as an expression.
///
/// In order: the target of an enclosing string conversion, the declared type
/// of a typed `var`/`const`, the named string type the context converts the
/// literal to, and finally `string`.
pub fn resolve_local_string_type(ast: &mut Ast, info: &TypeInfo, c: &Cursor) -> ExprId {
    if let Some(Expr::Call { fun, args, .. }) = c.parent_expr(ast) {
        let is_conversion = args.len() == 1
            && info.types.get(&fun).is_some_and(|tv| tv.is_type)
            && c.parent.and_then(|p| info.type_of(p)).is_some_and(|t| info.is_string_type(t));
        if is_conversion {
            return fun;
        }
    }
    if let gomorph_syntax::Slot::ValueSpec { typ: Some(t), .. } = c.slot {
        if c.parent.is_none() && is_string_type_expr(ast, info, t) {
            return ast.arena.new_expr(Expr::Type(t));
        }
    }
    if let Some(Ty::Named(n)) = info.expected.get(&c.node) {
        if info.is_string_type(&Ty::Named(n.clone())) {
            let name = n.name.to_string();
            return ast.ident(&name);
        }
    }
    ast.ident("string")
}

// =============================================================================
// Type expressions
// =============================================================================

/// Import alias used for `path` in this file.
pub fn import_alias(ast: &Ast, path: &str) -> Option<String> {
    for (_, _, spec) in ast.import_specs() {
        let Some(p) = decode_string_lit(ast.str(spec.path.raw)) else {
            continue;
        };
        if p != path.as_bytes() {
            continue;
        }
        return match spec.name {
            Some(ImportName::Name(n)) => Some(ast.str(n).to_string()),
            Some(ImportName::Dot) | Some(ImportName::Blank) => None,
            None => path.rsplit('/').next().map(str::to_string),
        };
    }
    None
}

/// Renders a checker type as a type expression, when it can be spelled.
pub fn ty_to_type_expr(ast: &mut Ast, ty: &Ty) -> Option<TypeId> {
    let t = match ty {
        Ty::Basic(BasicKind::UntypedNil) | Ty::Invalid | Ty::Tuple(_) | Ty::TypeParam(_) => {
            return None
        }
        Ty::Basic(BasicKind::UnsafePointer) => {
            let pkg = ast.intern("unsafe");
            let name = ast.intern("Pointer");
            Type::Named {
                pkg: Some(IdentName::synthetic(pkg)),
                name: IdentName::synthetic(name),
                args: ListRef::EMPTY,
            }
        }
        Ty::Basic(b) => return Some(ast.named_type(b.default_type().name())),
        Ty::Error => return Some(ast.named_type("error")),
        Ty::Named(n) => return Some(ast.named_type(&n.name)),
        Ty::External { pkg, name } => {
            let alias = import_alias(ast, pkg)?;
            let pkg = ast.intern(&alias);
            let name = ast.intern(name);
            Type::Named {
                pkg: Some(IdentName::synthetic(pkg)),
                name: IdentName::synthetic(name),
                args: ListRef::EMPTY,
            }
        }
        Ty::Pointer(inner) => Type::Pointer(ty_to_type_expr(ast, inner)?),
        Ty::Slice(inner) => Type::Slice(ty_to_type_expr(ast, inner)?),
        Ty::Array(Some(n), inner) => {
            let elem = ty_to_type_expr(ast, inner)?;
            let len = int_lit(ast, *n);
            Type::Array {
                len: ArrayLen::Expr(len),
                elem,
            }
        }
        Ty::Array(None, _) => return None,
        Ty::Map(k, v) => {
            let key = ty_to_type_expr(ast, k)?;
            let val = ty_to_type_expr(ast, v)?;
            Type::Map { key, val }
        }
        Ty::Chan(dir, inner) => Type::Chan {
            dir: *dir,
            elem: ty_to_type_expr(ast, inner)?,
        },
        Ty::Interface(methods) if methods.is_empty() => Type::Interface {
            elems: ListRef::EMPTY,
        },
        Ty::Interface(_) | Ty::Struct(_) | Ty::Func(_) => return None,
    };
    Some(ast.arena.new_type(t))
}

/// `Name` of an unqualified named type expression, looking through parens.
pub fn local_type_name(ast: &Ast, t: TypeId) -> Option<&str> {
    match ast.arena.types[t] {
        Type::Named {
            pkg: None, name, ..
        } => Some(ast.str(name.sym)),
        Type::Paren(inner) => local_type_name(ast, inner),
        _ => None,
    }
}

// =============================================================================
// Syntactic declaration index
// =============================================================================

/// Type a variable was declared with, as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    /// Package qualifier (`pkg.T`).
    pub pkg: Option<String>,
    pub name: String,
}

fn type_ref(ast: &Ast, t: TypeId) -> Option<TypeRef> {
    match ast.arena.types[t] {
        Type::Named { pkg, name, .. } => Some(TypeRef {
            pkg: pkg.map(|p| ast.str(p.sym).to_string()),
            name: ast.str(name.sym).to_string(),
        }),
        Type::Pointer(inner) | Type::Paren(inner) => type_ref(ast, inner),
        _ => None,
    }
}

fn init_type_ref(ast: &Ast, e: ExprId) -> Option<TypeRef> {
    match ast.arena.exprs[e] {
        Expr::CompositeLit { typ, .. } => type_ref(ast, typ),
        Expr::Unary {
            op: UnaryOp::Addr,
            expr,
        } => init_type_ref(ast, expr),
        Expr::Paren(x) => init_type_ref(ast, x),
        _ => None,
    }
}

#[derive(Default)]
struct DeclIndex {
    found: HashMap<String, TypeRef>,
}

impl DeclIndex {
    fn names(&mut self, ast: &Ast, names: &[IdentName], t: Option<TypeRef>) {
        if let Some(t) = t {
            for n in names {
                self.found.insert(ast.str(n.sym).to_string(), t.clone());
            }
        }
    }

    fn fields(&mut self, ast: &Ast, fields: ListRef<FieldId>) {
        for &f in ast.arena.fields_list(fields) {
            let field = ast.arena.fields[f];
            let t = type_ref(ast, field.typ);
            self.names(ast, ast.arena.ident_names(field.names), t);
        }
    }

    fn signature(&mut self, ast: &Ast, sig: SignatureId) {
        let s = ast.arena.signatures[sig];
        self.fields(ast, s.params);
        if let Some(Results::Params(r)) = s.results {
            self.fields(ast, r);
        }
    }

    fn values(&mut self, ast: &Ast, names: &[IdentName], values: &[ExprId]) {
        for (i, n) in names.iter().enumerate() {
            if let Some(t) = values.get(i).and_then(|&v| init_type_ref(ast, v)) {
                self.found.insert(ast.str(n.sym).to_string(), t);
            }
        }
    }
}

/// Variables, parameters and receivers of `ast` mapped to the type they were
/// declared with (explicit type, `T{...}` or `&T{...}` initializer).
///
/// Scopes are ignored: the index is the name-based fallback used when the
/// checker has no selection for a field access.
pub fn declared_struct_types(ast: &Ast) -> HashMap<String, TypeRef> {
    let a = &ast.arena;
    let mut idx = DeclIndex::default();
    for f in a.funcs.ids() {
        let func = a.funcs[f];
        if let Some(recv) = func.recv {
            if let Some(name) = recv.name {
                idx.names(ast, &[name], type_ref(ast, recv.typ));
            }
        }
        idx.signature(ast, func.signature);
    }
    for e in a.exprs.ids() {
        if let Expr::FuncLit { sig, .. } = a.exprs[e] {
            idx.signature(ast, sig);
        }
    }
    for s in all_specs(a) {
        if let Spec::Value(v) = s {
            let names = a.ident_names(v.names);
            match v.typ {
                Some(t) => idx.names(ast, names, type_ref(ast, t)),
                None => idx.values(ast, names, a.exprs_list(v.values)),
            }
        }
    }
    for s in a.simple_stmts.ids() {
        if let SimpleStmt::ShortVarDecl { names, values } = a.simple_stmts[s] {
            idx.values(ast, a.ident_names(names), a.exprs_list(values));
        }
    }
    idx.found
}

/// Every spec of every declaration in the arena, top-level and local.
fn all_specs(a: &AstArena) -> Vec<Spec> {
    a.decls
        .ids()
        .flat_map(|d| a.specs_list(a.decls[d].specs).to_vec())
        .collect()
}

/// Names declared at package level in this file.
pub fn top_level_names(ast: &Ast) -> HashSet<String> {
    let mut out = HashSet::new();
    for d in ast.decls() {
        match *d {
            TopLevelDecl::Func(f) => {
                let func = ast.arena.funcs[f];
                if func.recv.is_none() {
                    out.insert(ast.str(func.name.sym).to_string());
                }
            }
            TopLevelDecl::Decl(id) => {
                for spec in ast.arena.specs_list(ast.arena.decls[id].specs) {
                    match spec {
                        Spec::Value(v) => {
                            for n in ast.arena.ident_names(v.names) {
                                out.insert(ast.str(n.sym).to_string());
                            }
                        }
                        Spec::Type(t) => {
                            out.insert(ast.str(t.name.sym).to_string());
                        }
                        Spec::Import(_) => {}
                    }
                }
            }
        }
    }
    out
}

/// Import paths and struct tags: string literals no pass may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProhibitedZone {
    ImportPath(StringLit),
    StructTag(StringLit),
}

pub fn prohibited_zones(ast: &Ast) -> Vec<ProhibitedZone> {
    let mut out: Vec<ProhibitedZone> = ast
        .import_specs()
        .into_iter()
        .map(|(_, _, spec)| ProhibitedZone::ImportPath(spec.path))
        .collect();
    for f in ast.arena.fields.ids() {
        if let Some(tag) = ast.arena.fields[f].tag {
            out.push(ProhibitedZone::StructTag(tag));
        }
    }
    out
}

// =============================================================================
// Insertion points
// =============================================================================

/// Inserts `decl` at position `at` of the top-level list.
pub fn insert_top_level(ast: &mut Ast, at: usize, decl: TopLevelDecl) {
    let mut decls = ast.decls().to_vec();
    decls.insert(at.min(decls.len()), decl);
    ast.file.decls = ast.arena.list_top_decls(decls);
}

/// Position of `decl` in the top-level list.
pub fn top_level_index(ast: &Ast, decl: TopLevelDecl) -> Option<usize> {
    ast.decls().iter().position(|d| *d == decl)
}

#[derive(Default)]
struct StmtListOwners {
    target: Option<StmtId>,
    found: Option<ListRef<StmtId>>,
}

impl<'ast> Visitor<'ast> for StmtListOwners {
    fn visit_func_decl(&mut self, a: &'ast AstArena, id: FuncDeclId) {
        if let Some(body) = a.funcs[id].body {
            self.check(a, &[body.stmts]);
        }
        a.funcs[id].walk(a, self);
    }

    fn visit_stmt(&mut self, a: &'ast AstArena, id: StmtId) {
        if self.found.is_some() {
            return;
        }
        match a.stmts[id] {
            Stmt::Block(b) => self.check(a, &[b.stmts]),
            Stmt::If { then_block, .. } => self.check(a, &[then_block.stmts]),
            Stmt::For { block, .. } => self.check(a, &[block.stmts]),
            _ => {}
        }
        a.stmts[id].walk(a, self);
    }

    fn visit_expr(&mut self, a: &'ast AstArena, id: ExprId) {
        if let Expr::FuncLit { body, .. } = a.exprs[id] {
            self.check(a, &[body.stmts]);
        }
        a.exprs[id].walk(a, self);
    }

    fn visit_switch_clause(&mut self, a: &'ast AstArena, id: SwitchClauseId) {
        let (SwitchClause::ExprCase { stmts, .. } | SwitchClause::TypeCase { stmts, .. }) =
            a.switch_clauses[id];
        self.check(a, &[stmts]);
        a.switch_clauses[id].walk(a, self);
    }

    fn visit_comm_clause(&mut self, a: &'ast AstArena, id: CommClauseId) {
        let (CommClause::Case { stmts, .. } | CommClause::Default { stmts }) = a.comm_clauses[id];
        self.check(a, &[stmts]);
        a.comm_clauses[id].walk(a, self);
    }
}

impl StmtListOwners {
    fn check(&mut self, a: &AstArena, lists: &[ListRef<StmtId>]) {
        let Some(target) = self.target else { return };
        if self.found.is_some() {
            return;
        }
        for &l in lists {
            if a.stmts_list(l).contains(&target) {
                self.found = Some(l);
                return;
            }
        }
    }
}

/// Statement list directly holding `stmt`.
pub fn enclosing_stmt_list(ast: &Ast, stmt: StmtId) -> Option<ListRef<StmtId>> {
    let mut owners = StmtListOwners {
        target: Some(stmt),
        found: None,
    };
    ast.file.walk(&ast.arena, &mut owners);
    owners.found
}

/// Inserts `new` right after `anchor` in the statement list holding it.
/// Returns false when `anchor` is in no list.
pub fn insert_stmt_after(ast: &mut Ast, anchor: StmtId, new: &[StmtId]) -> bool {
    insert_stmts(ast, anchor, new, 1)
}

/// Inserts `new` right before `anchor` in the statement list holding it.
pub fn insert_stmt_before(ast: &mut Ast, anchor: StmtId, new: &[StmtId]) -> bool {
    insert_stmts(ast, anchor, new, 0)
}

fn insert_stmts(ast: &mut Ast, anchor: StmtId, new: &[StmtId], offset: usize) -> bool {
    let Some(old) = enclosing_stmt_list(ast, anchor) else {
        return false;
    };
    let mut items = ast.arena.stmts_list(old).to_vec();
    let Some(pos) = items.iter().position(|&s| s == anchor) else {
        return false;
    };
    let at = pos + offset;
    items.splice(at..at, new.iter().copied());
    let rebuilt = ast.arena.list_stmts(items);
    repoint_stmt_list(ast, old, rebuilt);
    true
}

/// Re-points every holder of the statement list `old` at `new`.
///
/// Lists are plain ranges of the arena buffer, so a rebuilt list has to be
/// written back into the node that owns it.
pub fn repoint_stmt_list(ast: &mut Ast, old: ListRef<StmtId>, new: ListRef<StmtId>) {
    let a = &mut ast.arena;
    let swap = |b: &mut Block| {
        if b.stmts == old {
            b.stmts = new;
        }
    };
    for f in a.funcs.ids() {
        if let Some(body) = a.funcs[f].body.as_mut() {
            swap(body);
        }
    }
    for s in a.stmts.ids() {
        match &mut a.stmts[s] {
            Stmt::Block(b) => swap(b),
            Stmt::If { then_block, .. } => swap(then_block),
            Stmt::For { block, .. } => swap(block),
            _ => {}
        }
    }
    for e in a.exprs.ids() {
        if let Expr::FuncLit { body, .. } = &mut a.exprs[e] {
            swap(body);
        }
    }
    for c in a.switch_clauses.ids() {
        match &mut a.switch_clauses[c] {
            SwitchClause::ExprCase { stmts, .. } | SwitchClause::TypeCase { stmts, .. } => {
                if *stmts == old {
                    *stmts = new;
                }
            }
        }
    }
    for c in a.comm_clauses.ids() {
        match &mut a.comm_clauses[c] {
            CommClause::Case { stmts, .. } | CommClause::Default { stmts } => {
                if *stmts == old {
                    *stmts = new;
                }
            }
        }
    }
}

/// Returns `base` if unused in `taken`, else the first free `baseN`.
pub fn fresh_name(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    (1u32..)
        .map(|n| format!("{base}{n}"))
        .find(|n| !taken(n))
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_boundaries() {
        assert_eq!(width_for(0), None);
        assert_eq!(width_for(1), Some(StorageWidth::U8));
        assert_eq!(width_for(8), Some(StorageWidth::U8));
        assert_eq!(width_for(9), Some(StorageWidth::U16));
        assert_eq!(width_for(33), Some(StorageWidth::U64));
        assert_eq!(width_for(65), None);
    }

    #[test]
    fn const_decl_prints_as_a_single_spec() {
        let mut ast = gomorph_syntax::parse_str("package p\n").unwrap();
        let seven = int_lit(&mut ast, 7);
        let d = const_decl(&mut ast, "Answer", Some("uint8"), seven);
        insert_top_level(&mut ast, 0, TopLevelDecl::Decl(d));
        let out = gomorph_syntax::print_file(&ast);
        assert!(out.contains("const Answer uint8 = 7"), "{out}");
    }

    #[test]
    fn flag_names_are_package_qualified() {
        assert_eq!(flag_const_name("p", "Cfg", "debug"), "FlagP_Cfg_Debug");
        assert_eq!(flag_const_name("", "S", "x"), "Flag_S_X");
    }
}
