//! # Go syntax tree
//!
//! Arena-allocated AST for one Go compilation unit.
//!
//! ## Architecture
//!
//! - **Nodes**: all nodes live in typed arenas (`SpannedArena<T>`) and are
//!   addressed by `Id<T>`. Nodes are `Copy`; a parent refers to its children
//!   by id, so overwriting the node stored at an id rewrites every link to it.
//! - **Lists**: variable-length children live in centralized buffers
//!   (`ExtraData`) referenced by `ListRef<T>`. Lists are append-only; editing a
//!   list means building a new one and storing the new `ListRef` in the parent.
//! - **Spans**: byte spans are kept in side tables next to each arena. Nodes
//!   synthesized by rewrites carry `Span::DUMMY`.
//! - **Symbols**: identifiers *and* literal raw text are interned, so a
//!   synthesized literal needs no backing source text.
//!
//! The tree models syntax only; resolution lives in `crate::check`.

use gomorph_ast_derive::WalkAst;
use core::marker::PhantomData;
use core::ops::{Index, IndexMut};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::hash::{BuildHasher, BuildHasherDefault, Hasher, RandomState};

use crate::position::FileId;

// =============================================================================
// Core Foundation Types
// =============================================================================

/// Byte span inside one source file.
///
/// Positions are stored as `u32` to save memory, limiting file size to 4GB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// Span carried by synthesized nodes.
    pub const DUMMY: Span = Span { start: 0, end: 0 };

    /// Creates a new span from usize positions.
    ///
    /// # Panics
    /// In debug builds, panics if positions exceed `u32::MAX`.
    #[inline]
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= u32::MAX as usize);
        debug_assert!(end <= u32::MAX as usize);
        Self {
            start: start as u32,
            end: end as u32,
        }
    }

    /// Returns the length of the span.
    #[inline]
    pub const fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Checks if the span is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True for spans of synthesized nodes.
    #[inline]
    pub const fn is_dummy(&self) -> bool {
        self.start == 0 && self.end == 0
    }

    /// Smallest span covering both.
    #[inline]
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Type-safe identifier for arena-allocated nodes.
///
/// The phantom marker ensures type safety at compile time.
#[repr(transparent)]
pub struct Id<T> {
    raw: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    /// Creates an ID from a raw u32 value.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    /// Converts the ID to usize for indexing.
    #[inline]
    pub const fn to_usize(&self) -> usize {
        self.raw as usize
    }

    /// Returns the raw u32 value.
    #[inline]
    pub const fn raw(&self) -> u32 {
        self.raw
    }
}

impl<T> Copy for Id<T> {}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for Id<T> {}

impl<T> std::hash::Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl<T> std::fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.raw)
    }
}

/// Typed reference into a centralized list buffer.
///
/// Lists are stored in `AstArena::extras` to avoid per-node allocations.
/// Each `ListRef` points to a contiguous slice in the appropriate buffer.
#[derive(Debug, PartialEq, Eq)]
pub struct ListRef<T> {
    start: u32,
    len: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Copy for ListRef<T> {}

impl<T> Clone for ListRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Default for ListRef<T> {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl<T> ListRef<T> {
    /// Empty list constant.
    pub const EMPTY: Self = Self {
        start: 0,
        len: 0,
        _marker: PhantomData,
    };

    /// Creates a new list reference.
    #[inline]
    pub const fn new(start: u32, len: u32) -> Self {
        Self {
            start,
            len,
            _marker: PhantomData,
        }
    }

    /// Checks if the list is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the start index.
    #[inline]
    pub const fn start(&self) -> u32 {
        self.start
    }

    /// Returns the length.
    #[inline]
    pub const fn len(&self) -> u32 {
        self.len
    }

    /// Returns the end index (exclusive).
    #[inline]
    pub const fn end(&self) -> u32 {
        self.start + self.len
    }
}

// =============================================================================
// Symbol Interning System
// =============================================================================

/// Interned string symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Symbol(u32);

/// Type alias for identifier symbols.
pub type Ident = Symbol;

impl Symbol {
    /// Creates a symbol from a raw u32 value.
    #[inline]
    pub const fn from_raw(v: u32) -> Self {
        Self(v)
    }

    /// Returns the raw u32 value.
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

/// Identifier occurrence (interned symbol + source position).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentName {
    pub sym: Ident,
    pub pos: Span,
}

impl IdentName {
    /// Identifier with no source position.
    #[inline]
    pub const fn synthetic(sym: Ident) -> Self {
        Self {
            sym,
            pos: Span::DUMMY,
        }
    }
}

/// Identity hasher for u64 values (used for symbol hash buckets).
#[derive(Default)]
struct U64IdentityHasher(u64);

impl Hasher for U64IdentityHasher {
    fn write(&mut self, _b: &[u8]) {
        unreachable!("U64IdentityHasher only supports write_u64")
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.0 = i;
    }

    #[inline]
    fn finish(&self) -> u64 {
        self.0
    }
}

type U64IdentityBuild = BuildHasherDefault<U64IdentityHasher>;

/// String interner.
///
/// Symbols are numbered in insertion order, so two runs over the same input
/// assign the same symbols regardless of the hasher seed.
#[derive(Debug, Default)]
pub struct Interner {
    strings: Vec<Box<str>>,
    buckets: HashMap<u64, SmallVec<[Symbol; 1]>, U64IdentityBuild>,
    state: RandomState,
}

impl Interner {
    /// Creates a new empty interner.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves capacity for additional symbols.
    #[inline]
    pub fn reserve(&mut self, additional: usize) {
        self.strings.reserve(additional);
        self.buckets.reserve(additional);
    }

    #[inline(always)]
    fn hash_str(&self, s: &str) -> u64 {
        self.state.hash_one(s)
    }

    /// Interns a string and returns its symbol.
    #[inline]
    pub fn intern(&mut self, s: &str) -> Symbol {
        let h = self.hash_str(s);
        let entry = self.buckets.entry(h).or_default();

        for &sym in entry.iter() {
            if self.strings[sym.0 as usize].as_ref() == s {
                return sym;
            }
        }

        let sym = Symbol(self.strings.len() as u32);
        self.strings.push(s.into());
        entry.push(sym);
        sym
    }

    /// Looks a string up without interning it.
    #[inline]
    pub fn get(&self, s: &str) -> Option<Symbol> {
        let h = self.hash_str(s);
        self.buckets
            .get(&h)?
            .iter()
            .copied()
            .find(|sym| self.strings[sym.0 as usize].as_ref() == s)
    }

    /// Resolves a symbol back to its string.
    ///
    /// Unknown symbols resolve to the empty string.
    #[inline]
    pub fn resolve(&self, sym: Symbol) -> &str {
        debug_assert!((sym.0 as usize) < self.strings.len());
        self.strings
            .get(sym.0 as usize)
            .map(|s| s.as_ref())
            .unwrap_or("")
    }

    /// Number of interned strings.
    #[inline]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

// =============================================================================
// Arena Allocation
// =============================================================================

/// Arena for nodes with associated spans.
///
/// Stores nodes and their spans in parallel vectors for cache efficiency.
#[derive(Debug)]
pub struct SpannedArena<T> {
    data: Vec<T>,
    spans: Vec<Span>,
}

impl<T> Default for SpannedArena<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            spans: Vec::new(),
        }
    }
}

impl<T> SpannedArena<T> {
    /// Creates a new empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a node with its span and returns an ID.
    #[inline]
    pub fn alloc(&mut self, node: T, span: Span) -> Id<T> {
        let id = Id::from_raw(self.data.len() as u32);
        self.data.push(node);
        self.spans.push(span);
        id
    }

    /// Gets an immutable reference to a node.
    #[inline]
    pub fn get(&self, id: Id<T>) -> &T {
        &self.data[id.to_usize()]
    }

    /// Gets a mutable reference to a node.
    #[inline]
    pub fn get_mut(&mut self, id: Id<T>) -> &mut T {
        &mut self.data[id.to_usize()]
    }

    /// Replaces the node stored at `id`, keeping its span.
    ///
    /// Every parent holding `id` now sees the new node.
    #[inline]
    pub fn replace(&mut self, id: Id<T>, node: T) -> T {
        std::mem::replace(&mut self.data[id.to_usize()], node)
    }

    /// Gets the span for a node.
    #[inline]
    pub fn span(&self, id: Id<T>) -> Span {
        self.spans[id.to_usize()]
    }

    /// Returns the number of nodes in the arena.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Checks if the arena is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterates over every allocated id.
    pub fn ids(&self) -> impl Iterator<Item = Id<T>> {
        (0..self.data.len() as u32).map(Id::from_raw)
    }
}

impl<T> Index<Id<T>> for SpannedArena<T> {
    type Output = T;
    fn index(&self, id: Id<T>) -> &T {
        self.get(id)
    }
}

impl<T> IndexMut<Id<T>> for SpannedArena<T> {
    fn index_mut(&mut self, id: Id<T>) -> &mut T {
        self.get_mut(id)
    }
}

// =============================================================================
// Type Aliases for Node IDs
// =============================================================================

pub type DeclId = Id<Decl>;
pub type StmtId = Id<Stmt>;
pub type SimpleStmtId = Id<SimpleStmt>;
pub type ExprId = Id<Expr>;
pub type TypeId = Id<Type>;
pub type FieldId = Id<Field>;
pub type SignatureId = Id<Signature>;
pub type FuncDeclId = Id<FuncDecl>;
pub type SwitchClauseId = Id<SwitchClause>;
pub type CommClauseId = Id<CommClause>;
pub type TypeParamsId = Id<TypeParams>;
pub type TypeParamDeclId = Id<TypeParamDecl>;
pub type CommentId = Id<Comment>;

// =============================================================================
// Centralized List Storage
// =============================================================================

/// Extra data storage for all list types.
#[derive(Debug, Default)]
pub struct ExtraData {
    pub ident_names: Vec<IdentName>,
    pub exprs: Vec<ExprId>,
    pub stmts: Vec<StmtId>,
    pub types: Vec<TypeId>,
    pub fields: Vec<FieldId>,
    pub specs: Vec<Spec>,
    pub keyed_elems: Vec<KeyedElement>,
    pub top_decls: Vec<TopLevelDecl>,
    pub switch_clause_ids: Vec<SwitchClauseId>,
    pub comm_clause_ids: Vec<CommClauseId>,
    pub type_case_elems: Vec<TypeCaseElem>,
    pub type_terms: Vec<TypeTerm>,
    pub interface_elems: Vec<InterfaceElem>,
    pub type_param_decl_ids: Vec<TypeParamDeclId>,
    pub comment_ids: Vec<CommentId>,
}

// =============================================================================
// Main AST Arena
// =============================================================================

/// Central arena holding all AST nodes and list buffers.
#[derive(Debug, Default)]
pub struct AstArena {
    pub decls: SpannedArena<Decl>,
    pub stmts: SpannedArena<Stmt>,
    pub simple_stmts: SpannedArena<SimpleStmt>,
    pub exprs: SpannedArena<Expr>,
    pub types: SpannedArena<Type>,
    pub signatures: SpannedArena<Signature>,
    pub funcs: SpannedArena<FuncDecl>,
    pub fields: SpannedArena<Field>,
    pub switch_clauses: SpannedArena<SwitchClause>,
    pub comm_clauses: SpannedArena<CommClause>,
    pub type_params: SpannedArena<TypeParams>,
    pub type_param_decls: SpannedArena<TypeParamDecl>,
    pub comments: SpannedArena<Comment>,
    pub extras: ExtraData,
}

macro_rules! list_api {
    ($($buf:ident : $t:ty => $build:ident, $get:ident, $get_mut:ident;)*) => {
        impl AstArena {
            $(
                pub fn $build(&mut self, items: impl IntoIterator<Item = $t>) -> ListRef<$t> {
                    Self::push_list(&mut self.extras.$buf, items)
                }

                pub fn $get(&self, r: ListRef<$t>) -> &[$t] {
                    Self::slice(&self.extras.$buf, r)
                }

                pub fn $get_mut(&mut self, r: ListRef<$t>) -> &mut [$t] {
                    let s = r.start() as usize;
                    let e = r.end() as usize;
                    &mut self.extras.$buf[s..e]
                }
            )*
        }
    };
}

list_api! {
    ident_names: IdentName => list_ident_names, ident_names, ident_names_mut;
    exprs: ExprId => list_exprs, exprs_list, exprs_list_mut;
    stmts: StmtId => list_stmts, stmts_list, stmts_list_mut;
    types: TypeId => list_types, types_list, types_list_mut;
    fields: FieldId => list_fields, fields_list, fields_list_mut;
    specs: Spec => list_specs, specs_list, specs_list_mut;
    keyed_elems: KeyedElement => list_keyed_elems, keyed_elems_list, keyed_elems_list_mut;
    top_decls: TopLevelDecl => list_top_decls, top_decls, top_decls_mut;
    switch_clause_ids: SwitchClauseId => list_switch_clause_ids, switch_clause_ids, switch_clause_ids_mut;
    comm_clause_ids: CommClauseId => list_comm_clause_ids, comm_clause_ids, comm_clause_ids_mut;
    type_case_elems: TypeCaseElem => list_type_cases, type_case_elems, type_case_elems_mut;
    type_terms: TypeTerm => list_type_terms, type_terms, type_terms_mut;
    interface_elems: InterfaceElem => list_interface_elems, interface_elems, interface_elems_mut;
    type_param_decl_ids: TypeParamDeclId => list_type_param_decl_ids, type_param_decl_ids, type_param_decl_ids_mut;
    comment_ids: CommentId => list_comment_ids, comment_ids, comment_ids_mut;
}

impl AstArena {
    /// Creates a new empty AST arena.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn push_list<T>(buf: &mut Vec<T>, items: impl IntoIterator<Item = T>) -> ListRef<T> {
        let start = buf.len();
        buf.extend(items);
        let len = buf.len() - start;
        debug_assert!(start <= u32::MAX as usize);
        debug_assert!(len <= u32::MAX as usize);
        if len == 0 {
            return ListRef::EMPTY;
        }
        ListRef::new(start as u32, len as u32)
    }

    #[inline]
    fn slice<T>(buf: &[T], r: ListRef<T>) -> &[T] {
        let s = r.start() as usize;
        let e = r.end() as usize;
        &buf[s..e]
    }

    // Synthesized-node constructors (dummy spans).

    pub fn new_expr(&mut self, e: Expr) -> ExprId {
        self.exprs.alloc(e, Span::DUMMY)
    }

    pub fn new_type(&mut self, t: Type) -> TypeId {
        self.types.alloc(t, Span::DUMMY)
    }

    pub fn new_stmt(&mut self, s: Stmt) -> StmtId {
        self.stmts.alloc(s, Span::DUMMY)
    }

    pub fn new_simple(&mut self, s: SimpleStmt) -> SimpleStmtId {
        self.simple_stmts.alloc(s, Span::DUMMY)
    }

    pub fn new_decl(&mut self, d: Decl) -> DeclId {
        self.decls.alloc(d, Span::DUMMY)
    }

    pub fn new_field(&mut self, f: Field) -> FieldId {
        self.fields.alloc(f, Span::DUMMY)
    }

    pub fn new_signature(&mut self, s: Signature) -> SignatureId {
        self.signatures.alloc(s, Span::DUMMY)
    }

    pub fn new_func(&mut self, f: FuncDecl) -> FuncDeclId {
        self.funcs.alloc(f, Span::DUMMY)
    }
}

// =============================================================================
// Whole-file bundle
// =============================================================================

/// One parsed compilation unit: the arena, its interner and the root node.
#[derive(Debug)]
pub struct Ast {
    pub arena: AstArena,
    pub interner: Interner,
    pub file: SourceFile,
    pub file_id: FileId,
}

impl Ast {
    /// Resolves an interned symbol.
    #[inline]
    pub fn str(&self, sym: Symbol) -> &str {
        self.interner.resolve(sym)
    }

    #[inline]
    pub fn intern(&mut self, s: &str) -> Symbol {
        self.interner.intern(s)
    }

    /// Declared package name.
    pub fn package_name(&self) -> &str {
        self.str(self.file.package.sym)
    }

    /// Top-level declarations in source order.
    pub fn decls(&self) -> &[TopLevelDecl] {
        self.arena.top_decls(self.file.decls)
    }

    /// Every import spec as `(decl, index into the decl's spec list)`.
    pub fn import_specs(&self) -> Vec<(DeclId, usize, ImportSpec)> {
        let mut out = Vec::new();
        for decl in self.decls() {
            let TopLevelDecl::Decl(id) = *decl else {
                continue;
            };
            let d = self.arena.decls[id];
            if d.kind != GenDeclKind::Import {
                continue;
            }
            for (i, spec) in self.arena.specs_list(d.specs).iter().enumerate() {
                if let Spec::Import(imp) = spec {
                    out.push((id, i, *imp));
                }
            }
        }
        out
    }

    /// Identifier expression for `name`.
    pub fn ident(&mut self, name: &str) -> ExprId {
        let sym = self.intern(name);
        self.arena.new_expr(Expr::Ident(sym))
    }

    /// Named type expression for `name`.
    pub fn named_type(&mut self, name: &str) -> TypeId {
        let sym = self.intern(name);
        self.arena.new_type(Type::Named {
            pkg: None,
            name: IdentName::synthetic(sym),
            args: ListRef::EMPTY,
        })
    }
}

// =============================================================================
// Comments
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    Line,
    Block,
}

/// Source comment with its full text (including `//` or `/* */`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comment {
    pub kind: CommentKind,
    pub text: Symbol,
    /// Follows code on the same source line.
    pub trailing: bool,
}

// =============================================================================
// Source File (Root Node)
// =============================================================================

/// Complete Go source file.
///
/// ```text
/// SourceFile = PackageClause ";" { ImportDecl ";" } { TopLevelDecl ";" }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct SourceFile {
    /// Package name and position of the name.
    #[walk(skip)]
    pub package: IdentName,
    /// Position of the `package` keyword.
    #[walk(skip)]
    pub package_pos: Span,
    /// All top-level declarations in source order (imports first).
    pub decls: ListRef<TopLevelDecl>,
    /// Every comment of the file, in source order.
    #[walk(skip)]
    pub comments: ListRef<CommentId>,
}

// =============================================================================
// Declarations
// =============================================================================

/// Top-level declaration (can be a general declaration or function).
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub enum TopLevelDecl {
    Decl(DeclId),
    Func(FuncDeclId),
}

/// Generic declaration (import, const, type, var).
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct Decl {
    pub kind: GenDeclKind,
    /// Written with parentheses: `const ( ... )`.
    pub grouped: bool,
    pub specs: ListRef<Spec>,
}

/// Kind of generic declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GenDeclKind {
    Import,
    Const,
    Type,
    Var,
}

impl GenDeclKind {
    pub const fn keyword(self) -> &'static str {
        match self {
            GenDeclKind::Import => "import",
            GenDeclKind::Const => "const",
            GenDeclKind::Type => "type",
            GenDeclKind::Var => "var",
        }
    }
}

/// Specification within a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub enum Spec {
    Import(ImportSpec),
    Value(ValueSpec),
    Type(TypeSpec),
}

/// `ImportSpec = [ "." | PackageName ] ImportPath`
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct ImportSpec {
    pub name: Option<ImportName>,
    pub path: StringLit,
}

/// Import name variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportName {
    /// `import . "pkg"`
    Dot,
    /// `import _ "pkg"`
    Blank,
    /// `import name "pkg"`
    Name(Ident),
}

/// Value specification (const or var).
///
/// `ConstSpec = IdentifierList [ [ Type ] "=" ExpressionList ]`
/// `VarSpec = IdentifierList ( Type [ "=" ExpressionList ] | "=" ExpressionList )`
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct ValueSpec {
    pub names: ListRef<IdentName>,
    pub typ: Option<TypeId>,
    pub values: ListRef<ExprId>,
}

/// `TypeSpec = AliasDecl | TypeDef`
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct TypeSpec {
    #[walk(skip)]
    pub name: IdentName,
    pub type_params: Option<TypeParamsId>,
    /// True for `type A = B`.
    pub alias: bool,
    pub typ: TypeId,
}

/// Function or method declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct FuncDecl {
    pub recv: Option<Receiver>,
    #[walk(skip)]
    pub name: IdentName,
    pub type_params: Option<TypeParamsId>,
    pub signature: SignatureId,
    /// None for declarations without body (assembly-backed functions).
    pub body: Option<Block>,
}

// =============================================================================
// Generics
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct TypeParams {
    pub params: ListRef<TypeParamDeclId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct TypeParamDecl {
    pub names: ListRef<IdentName>,
    pub constraint: TypeId,
}

/// Method receiver. Receiver type parameters appear as `args` of the named type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct Receiver {
    #[walk(skip)]
    pub name: Option<IdentName>,
    pub typ: TypeId,
}

// =============================================================================
// Signatures and Fields
// =============================================================================

/// `Signature = Parameters [ Result ]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct Signature {
    pub params: ListRef<FieldId>,
    pub results: Option<Results>,
}

/// Function result specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub enum Results {
    /// Parenthesized results: `(x int, y string)` or `(int, error)`
    Params(ListRef<FieldId>),
    /// Single unnamed result: `int`
    Type(TypeId),
}

/// Field in a parameter list, struct, or interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct Field {
    /// Field names (empty for anonymous parameters and embedded fields)
    pub names: ListRef<IdentName>,
    /// `...T` parameter
    pub variadic: bool,
    pub typ: TypeId,
    /// Struct tag (struct fields only)
    pub tag: Option<StringLit>,
    pub embedded: bool,
}

// =============================================================================
// Statements
// =============================================================================

/// `SimpleStmt = EmptyStmt | ExpressionStmt | SendStmt | IncDecStmt | Assignment | ShortVarDecl`
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub enum SimpleStmt {
    Empty,
    Expr(ExprId),
    /// `chan <- value`
    Send { chan: ExprId, value: ExprId },
    /// `x++` or `x--`
    IncDec { expr: ExprId, op: IncDecOp },
    /// `x = y` or `x += y`
    Assign {
        lhs: ListRef<ExprId>,
        op: AssignOp,
        rhs: ListRef<ExprId>,
    },
    /// `x := y`
    ShortVarDecl {
        names: ListRef<IdentName>,
        values: ListRef<ExprId>,
    },
}

/// Statement node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub enum Stmt {
    Simple(SimpleStmtId),
    Decl(DeclId),
    Labeled {
        #[walk(skip)]
        label: IdentName,
        stmt: StmtId,
    },
    Go(ExprId),
    Defer(ExprId),
    Return(ListRef<ExprId>),
    Branch {
        kind: BranchKind,
        #[walk(skip)]
        label: Option<IdentName>,
    },
    Block(Block),
    If {
        init: Option<SimpleStmtId>,
        cond: ExprId,
        then_block: Block,
        else_stmt: Option<StmtId>,
    },
    For {
        kind: ForKind,
        block: Block,
    },
    Switch {
        init: Option<SimpleStmtId>,
        tag: Option<ExprId>,
        clauses: ListRef<SwitchClauseId>,
    },
    TypeSwitch {
        init: Option<SimpleStmtId>,
        guard: TypeSwitchGuard,
        clauses: ListRef<SwitchClauseId>,
    },
    Select {
        clauses: ListRef<CommClauseId>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    Break,
    Continue,
    Goto,
    Fallthrough,
}

impl BranchKind {
    pub const fn keyword(self) -> &'static str {
        match self {
            BranchKind::Break => "break",
            BranchKind::Continue => "continue",
            BranchKind::Goto => "goto",
            BranchKind::Fallthrough => "fallthrough",
        }
    }
}

/// For loop variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub enum ForKind {
    /// `for { ... }`
    Infinite,
    /// `for cond { ... }`
    Cond(ExprId),
    /// `for init; cond; post { ... }`
    Clause {
        init: Option<SimpleStmtId>,
        cond: Option<ExprId>,
        post: Option<SimpleStmtId>,
    },
    /// `for k, v := range x { ... }`
    Range { lhs: Option<RangeLhs>, expr: ExprId },
}

/// Left-hand side of a range clause or a receive in `select`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub enum RangeLhs {
    /// `k, v :=`
    Def(ListRef<IdentName>),
    /// `k, v =`
    Assign(ListRef<ExprId>),
}

/// Switch or type switch case clause. An empty item list is `default:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub enum SwitchClause {
    ExprCase {
        items: ListRef<ExprId>,
        stmts: ListRef<StmtId>,
    },
    TypeCase {
        items: ListRef<TypeCaseElem>,
        stmts: ListRef<StmtId>,
    },
}

/// Select case clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub enum CommClause {
    Case { comm: CommStmt, stmts: ListRef<StmtId> },
    Default { stmts: ListRef<StmtId> },
}

/// Communication statement (send or receive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub enum CommStmt {
    Send { chan: ExprId, value: ExprId },
    Recv { lhs: Option<RangeLhs>, expr: ExprId },
}

/// `Block = "{" StatementList "}"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Block {
    pub stmts: ListRef<StmtId>,
}

/// `TypeSwitchGuard = [ identifier ":=" ] PrimaryExpr "." "(" "type" ")"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct TypeSwitchGuard {
    #[walk(skip)]
    pub bind: Option<IdentName>,
    pub x: ExprId,
}

// =============================================================================
// Expressions
// =============================================================================

/// `LiteralValue = "{" [ ElementList [ "," ] ] "}"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct LiteralValue {
    pub elements: ListRef<KeyedElement>,
}

/// `KeyedElement = [ Key ":" ] Element`
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct KeyedElement {
    pub key: Option<Key>,
    pub value: Element,
}

/// A field name in a struct literal is an `Expr::Ident` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub enum Key {
    Expr(ExprId),
    /// Nested literal: `map[[2]int]string{{1, 2}: "x"}`
    Literal(LiteralValue),
}

/// `Element = Expression | LiteralValue`
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub enum Element {
    Expr(ExprId),
    /// Elided-type literal: `[][]int{{1, 2}}`
    Literal(LiteralValue),
}

/// Expression node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub enum Expr {
    Ident(#[walk(skip)] Ident),
    BasicLit(BasicLit),
    /// `func(x int) int { return x }`
    FuncLit { sig: SignatureId, body: Block },
    /// `T{...}`
    CompositeLit { typ: TypeId, lit: LiteralValue },
    /// `(x)`
    Paren(ExprId),
    /// `x.y`
    Selector {
        expr: ExprId,
        #[walk(skip)]
        sel: IdentName,
    },
    /// Indexing `a[i]` or instantiation `F[T, U]`.
    Index {
        base: ExprId,
        indices: ListRef<ExprId>,
    },
    /// `a[lo:hi]` or `a[lo:hi:max]`
    Slice {
        expr: ExprId,
        lo: Option<ExprId>,
        hi: Option<ExprId>,
        max: Option<ExprId>,
        three: bool,
    },
    /// `x.(T)`; `typ` is None for `x.(type)`.
    TypeAssert { expr: ExprId, typ: Option<TypeId> },
    /// Call or conversion: `f(args...)`, `T(x)`, `[]byte(s)`
    Call {
        fun: ExprId,
        args: ListRef<ExprId>,
        ellipsis: bool,
    },
    Unary { op: UnaryOp, expr: ExprId },
    Binary {
        left: ExprId,
        op: BinaryOp,
        right: ExprId,
    },
    /// Type literal in expression position (`[]byte` in `[]byte(s)`, `make([]int, n)`).
    Type(TypeId),
}

/// Basic literal; `raw` is the literal exactly as written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicLit {
    pub kind: BasicLitKind,
    pub raw: Symbol,
}

/// Basic literal kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BasicLitKind {
    Int,
    Float,
    Imag,
    Char,
    String,
}

/// String literal in a non-expression position (import path, struct tag).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringLit {
    pub raw: Symbol,
}

// =============================================================================
// Types
// =============================================================================

/// Type node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub enum Type {
    /// `Name`, `pkg.Name`, `Name[T]`
    Named {
        #[walk(skip)]
        pkg: Option<IdentName>,
        #[walk(skip)]
        name: IdentName,
        args: ListRef<TypeId>,
    },
    /// `*T`
    Pointer(TypeId),
    /// `[N]T` or `[...]T`
    Array { len: ArrayLen, elem: TypeId },
    /// `[]T`
    Slice(TypeId),
    /// `map[K]V`
    Map { key: TypeId, val: TypeId },
    /// `chan T`, `<-chan T`, `chan<- T`
    Chan { dir: ChanDir, elem: TypeId },
    Struct { fields: ListRef<FieldId> },
    Interface { elems: ListRef<InterfaceElem> },
    Func(SignatureId),
    Paren(TypeId),
    /// Constraint union: `~int | string`
    Union(ListRef<TypeTerm>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub enum ArrayLen {
    Expr(ExprId),
    Ellipsis,
}

/// Channel direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

/// Type case element (in type switch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub enum TypeCaseElem {
    Type(TypeId),
    Nil,
}

/// Union term: `~T` or `T`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub struct TypeTerm {
    pub tilde: bool,
    pub typ: TypeId,
}

/// Interface element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, WalkAst)]
pub enum InterfaceElem {
    Method {
        #[walk(skip)]
        name: IdentName,
        sig: SignatureId,
    },
    /// Embedded interface or constraint union.
    Embed(TypeId),
}

// =============================================================================
// Operators
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Add,   // +
    Sub,   // -
    Not,   // !
    Xor,   // ^
    Deref, // *
    Addr,  // &
    Recv,  // <-
    Tilde, // ~ (constraint position only)
}

impl UnaryOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Add => "+",
            UnaryOp::Sub => "-",
            UnaryOp::Not => "!",
            UnaryOp::Xor => "^",
            UnaryOp::Deref => "*",
            UnaryOp::Addr => "&",
            UnaryOp::Recv => "<-",
            UnaryOp::Tilde => "~",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,    // +
    Sub,    // -
    Mul,    // *
    Div,    // /
    Mod,    // %
    And,    // &
    Or,     // |
    Xor,    // ^
    Shl,    // <<
    Shr,    // >>
    AndNot, // &^
    LAnd,   // &&
    LOr,    // ||
    Eq,     // ==
    Ne,     // !=
    Lt,     // <
    Le,     // <=
    Gt,     // >
    Ge,     // >=
}

impl BinaryOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::AndNot => "&^",
            BinaryOp::LAnd => "&&",
            BinaryOp::LOr => "||",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }

    /// Go operator precedence (5 binds tightest).
    pub const fn precedence(self) -> u8 {
        match self {
            BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Mod
            | BinaryOp::Shl
            | BinaryOp::Shr
            | BinaryOp::And
            | BinaryOp::AndNot => 5,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Or | BinaryOp::Xor => 4,
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge => 3,
            BinaryOp::LAnd => 2,
            BinaryOp::LOr => 1,
        }
    }

    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignOp {
    Assign,       // =
    AddAssign,    // +=
    SubAssign,    // -=
    MulAssign,    // *=
    DivAssign,    // /=
    ModAssign,    // %=
    AndAssign,    // &=
    OrAssign,     // |=
    XorAssign,    // ^=
    ShlAssign,    // <<=
    ShrAssign,    // >>=
    AndNotAssign, // &^=
}

impl AssignOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubAssign => "-=",
            AssignOp::MulAssign => "*=",
            AssignOp::DivAssign => "/=",
            AssignOp::ModAssign => "%=",
            AssignOp::AndAssign => "&=",
            AssignOp::OrAssign => "|=",
            AssignOp::XorAssign => "^=",
            AssignOp::ShlAssign => "<<=",
            AssignOp::ShrAssign => ">>=",
            AssignOp::AndNotAssign => "&^=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IncDecOp {
    Inc, // ++
    Dec, // --
}
