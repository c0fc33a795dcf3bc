use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::types::*;
use super::universe::{self, Builtin, Predeclared};
use super::{
    Object, PackageScope, ScopeRecord, Selection, SelectionKind, TypeAndValue, TypeDiagnostic,
    TypeInfo,
};
use crate::ast::*;
use crate::lexer::unquote;

#[derive(Debug, Clone)]
enum Mode {
    NoValue,
    Value,
    Const(ConstValue),
    Type,
    Builtin(Builtin),
    Package,
    Nil,
}

#[derive(Debug, Clone)]
struct Operand {
    mode: Mode,
    ty: Ty,
}

impl Operand {
    fn value(ty: Ty) -> Self {
        Self {
            mode: Mode::Value,
            ty,
        }
    }

    fn invalid() -> Self {
        Self::value(Ty::Invalid)
    }

    fn konst(ty: Ty, v: ConstValue) -> Self {
        Self {
            mode: Mode::Const(v),
            ty,
        }
    }

    fn maybe_const(ty: Ty, v: Option<ConstValue>) -> Self {
        match v {
            Some(v) => Self::konst(ty, v),
            None => Self::value(ty),
        }
    }

    fn const_value(&self) -> Option<&ConstValue> {
        match &self.mode {
            Mode::Const(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum PkgObjKind {
    /// `src` is the spec supplying type and values (differs from `spec`
    /// under implicit repetition).
    Const {
        decl: DeclId,
        spec: usize,
        src: usize,
        name: usize,
    },
    Var {
        decl: DeclId,
        spec: usize,
        name: usize,
    },
    Type,
    Func {
        func: FuncDeclId,
    },
}

#[derive(Debug, Clone)]
enum ObjState {
    Pending,
    Resolving,
    Done(Ty, Option<ConstValue>),
}

#[derive(Debug)]
struct PkgObj {
    kind: PkgObjKind,
    file: usize,
    state: ObjState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NamedState {
    Pending,
    Resolving,
    Done,
}

#[derive(Debug, Clone)]
struct Local {
    kind: ObjKind,
    ty: Ty,
    value: Option<ConstValue>,
}

#[derive(Debug)]
struct LocalScope {
    names: HashMap<Arc<str>, Local>,
    record: usize,
}

struct Resolved {
    kind: ObjKind,
    ty: Ty,
    value: Option<ConstValue>,
    local: bool,
    builtin: Option<Builtin>,
}

/// Function-level state swapped out while a package-level object of
/// another file (or scope) is resolved.
struct Saved {
    cur: usize,
    scopes: Vec<LocalScope>,
    results: Vec<Vec<Ty>>,
    iota: Option<i128>,
    silent: u32,
    const_ctx: u32,
}

struct Member {
    kind: SelectionKind,
    ty: Ty,
    recv: Option<Named>,
    promoted: bool,
    indirect: bool,
}

pub(super) struct Checker<'a> {
    files: &'a [&'a Ast],
    infos: Vec<TypeInfo>,
    named: Vec<NamedType>,
    named_state: Vec<NamedState>,
    named_site: Vec<Option<(usize, TypeSpec)>>,
    objs: Vec<PkgObj>,
    pkg_names: HashMap<Arc<str>, usize>,
    imports: Vec<HashMap<Arc<str>, Arc<str>>>,
    dot_import: Vec<bool>,
    methods: Vec<(usize, FuncDeclId)>,
    cur: usize,
    scopes: Vec<LocalScope>,
    results: Vec<Vec<Ty>>,
    iota: Option<i128>,
    silent: u32,
    const_ctx: u32,
    const_deps: HashSet<String>,
}

impl<'a> Checker<'a> {
    pub(super) fn new(files: &'a [&'a Ast]) -> Self {
        Self {
            files,
            infos: files.iter().map(|_| TypeInfo::empty()).collect(),
            named: Vec::new(),
            named_state: Vec::new(),
            named_site: Vec::new(),
            objs: Vec::new(),
            pkg_names: HashMap::new(),
            imports: files.iter().map(|_| HashMap::new()).collect(),
            dot_import: vec![false; files.len()],
            methods: Vec::new(),
            cur: 0,
            scopes: Vec::new(),
            results: Vec::new(),
            iota: None,
            silent: 0,
            const_ctx: 0,
            const_deps: HashSet::new(),
        }
    }

    pub(super) fn run(mut self) -> Vec<TypeInfo> {
        self.collect();
        self.collect_methods();
        for f in 0..self.files.len() {
            self.cur = f;
            let ast = self.ast();
            for d in ast.decls() {
                match *d {
                    TopLevelDecl::Decl(id) => self.package_decl(id),
                    TopLevelDecl::Func(id) => self.func_decl(id),
                }
            }
        }

        let name = self
            .files
            .first()
            .map(|a| a.package_name().to_string())
            .unwrap_or_default();
        let pkg = Arc::new(PackageScope {
            name,
            named: self.named,
            const_deps: self.const_deps,
        });
        self.infos
            .into_iter()
            .map(|mut info| {
                info.package = Arc::clone(&pkg);
                info
            })
            .collect()
    }

    #[inline]
    fn ast(&self) -> &'a Ast {
        self.files[self.cur]
    }

    fn diag(&mut self, span: Span, message: impl Into<String>) {
        if self.silent == 0 {
            self.infos[self.cur].diagnostics.push(TypeDiagnostic {
                span,
                message: message.into(),
            });
        }
    }

    // ---------------------------------------------------------------------
    // Collection
    // ---------------------------------------------------------------------

    fn register(&mut self, name: &str, span: Span, kind: PkgObjKind, file: usize) {
        if name == "_" {
            return;
        }
        if self.pkg_names.contains_key(name) {
            self.diag(span, format!("{name} redeclared in this block"));
            return;
        }
        self.pkg_names.insert(Arc::from(name), self.objs.len());
        self.objs.push(PkgObj {
            kind,
            file,
            state: ObjState::Pending,
        });
    }

    fn alloc_named(&mut self, name: &str, spec: TypeSpec, local: bool) -> Named {
        let id = self.named.len() as u32;
        let name: Arc<str> = Arc::from(name);
        self.named.push(NamedType {
            name: Arc::clone(&name),
            underlying: Ty::Invalid,
            methods: Vec::new(),
            generic: spec.type_params.is_some(),
            local,
            file: self.cur,
        });
        self.named_state.push(NamedState::Pending);
        self.named_site.push(Some((self.cur, spec)));
        Named { id, name, local }
    }

    fn collect(&mut self) {
        for fi in 0..self.files.len() {
            self.cur = fi;
            let ast = self.ast();
            for d in ast.decls() {
                match *d {
                    TopLevelDecl::Decl(id) => self.collect_decl(fi, id),
                    TopLevelDecl::Func(id) => {
                        let f = ast.arena.funcs[id];
                        let name = ast.str(f.name.sym);
                        if f.recv.is_some() {
                            self.methods.push((fi, id));
                        } else if name != "init" {
                            self.register(name, f.name.pos, PkgObjKind::Func { func: id }, fi);
                        }
                    }
                }
            }
        }
    }

    fn collect_decl(&mut self, fi: usize, id: DeclId) {
        let ast = self.ast();
        let decl = ast.arena.decls[id];
        let specs = ast.arena.specs_list(decl.specs);
        match decl.kind {
            GenDeclKind::Import => {
                for spec in specs {
                    let Spec::Import(imp) = spec else { continue };
                    let path = unquote::string(ast.str(imp.path.raw))
                        .map(|b| String::from_utf8_lossy(&b).into_owned())
                        .unwrap_or_default();
                    let local = match imp.name {
                        Some(ImportName::Dot) => {
                            self.dot_import[fi] = true;
                            continue;
                        }
                        Some(ImportName::Blank) => continue,
                        Some(ImportName::Name(n)) => ast.str(n).to_string(),
                        None => default_package_name(&path),
                    };
                    self.imports[fi].insert(Arc::from(local.as_str()), Arc::from(path.as_str()));
                }
            }
            GenDeclKind::Const => {
                let mut src = None;
                for (si, spec) in specs.iter().enumerate() {
                    let Spec::Value(v) = spec else { continue };
                    if !v.values.is_empty() {
                        src = Some(si);
                    }
                    for (ni, n) in ast.arena.ident_names(v.names).iter().enumerate() {
                        let kind = PkgObjKind::Const {
                            decl: id,
                            spec: si,
                            src: src.unwrap_or(si),
                            name: ni,
                        };
                        self.register(ast.str(n.sym), n.pos, kind, fi);
                    }
                }
            }
            GenDeclKind::Var => {
                for (si, spec) in specs.iter().enumerate() {
                    let Spec::Value(v) = spec else { continue };
                    for (ni, n) in ast.arena.ident_names(v.names).iter().enumerate() {
                        let kind = PkgObjKind::Var {
                            decl: id,
                            spec: si,
                            name: ni,
                        };
                        self.register(ast.str(n.sym), n.pos, kind, fi);
                    }
                }
            }
            GenDeclKind::Type => {
                for spec in specs {
                    let Spec::Type(t) = *spec else { continue };
                    let name = ast.str(t.name.sym);
                    if name == "_" {
                        continue;
                    }
                    let named = self.alloc_named(name, t, false);
                    self.register(name, t.name.pos, PkgObjKind::Type, fi);
                    if let Some(&idx) = self.pkg_names.get(name) {
                        if matches!(self.objs[idx].kind, PkgObjKind::Type)
                            && matches!(self.objs[idx].state, ObjState::Pending)
                        {
                            self.objs[idx].state = ObjState::Done(Ty::Named(named), None);
                        }
                    }
                }
            }
        }
    }

    fn collect_methods(&mut self) {
        for (fi, id) in std::mem::take(&mut self.methods) {
            self.cur = fi;
            let ast = self.ast();
            let f = ast.arena.funcs[id];
            let Some(recv) = f.recv else { continue };
            let Some((base, ptr, args)) = receiver_base(&ast.arena, recv.typ) else {
                continue;
            };
            let Some(named_id) = self.package_named(ast.str(base)) else {
                continue;
            };

            self.push_scope(Span::DUMMY);
            for a in ast.arena.types_list(args) {
                if let Type::Named { pkg: None, name, .. } = ast.arena.types[*a] {
                    let n = ast.str(name.sym);
                    self.declare(n, Local::type_param(n));
                }
            }
            self.silent += 1;
            let sig = self.signature(f.signature, false);
            self.silent -= 1;
            self.pop_scope();

            let name: Arc<str> = Arc::from(ast.str(f.name.sym));
            self.named[named_id as usize]
                .methods
                .push((name, Ty::Func(Arc::new(sig)), ptr));
        }
    }

    fn package_named(&self, name: &str) -> Option<u32> {
        let idx = *self.pkg_names.get(name)?;
        match &self.objs[idx].state {
            ObjState::Done(Ty::Named(n), _) if !n.local => Some(n.id),
            _ => None,
        }
    }

    // ---------------------------------------------------------------------
    // Package-level objects
    // ---------------------------------------------------------------------

    fn enter_file(&mut self, file: usize) -> Saved {
        let saved = Saved {
            cur: self.cur,
            scopes: std::mem::take(&mut self.scopes),
            results: std::mem::take(&mut self.results),
            iota: self.iota.take(),
            silent: self.silent,
            const_ctx: self.const_ctx,
        };
        self.cur = file;
        self.silent = 0;
        self.const_ctx = 0;
        saved
    }

    fn leave_file(&mut self, s: Saved) {
        self.cur = s.cur;
        self.scopes = s.scopes;
        self.results = s.results;
        self.iota = s.iota;
        self.silent = s.silent;
        self.const_ctx = s.const_ctx;
    }

    fn resolve_obj(&mut self, idx: usize) -> (Ty, Option<ConstValue>) {
        match &self.objs[idx].state {
            ObjState::Done(t, v) => return (t.clone(), v.clone()),
            ObjState::Resolving => return (Ty::Invalid, None),
            ObjState::Pending => {}
        }
        self.objs[idx].state = ObjState::Resolving;
        let kind = self.objs[idx].kind;
        let saved = self.enter_file(self.objs[idx].file);
        let (ty, value) = match kind {
            PkgObjKind::Const {
                decl,
                spec,
                src,
                name,
            } => self.eval_const(decl, spec, src, name),
            PkgObjKind::Var { decl, spec, name } => (self.eval_var(decl, spec, name), None),
            PkgObjKind::Func { func } => {
                let f = self.ast().arena.funcs[func];
                self.push_scope(Span::DUMMY);
                if let Some(tp) = f.type_params {
                    self.declare_type_params(tp);
                }
                let sig = self.signature(f.signature, false);
                self.pop_scope();
                (Ty::Func(Arc::new(sig)), None)
            }
            PkgObjKind::Type => (Ty::Invalid, None),
        };
        self.leave_file(saved);
        self.objs[idx].state = ObjState::Done(ty.clone(), value.clone());
        (ty, value)
    }

    fn value_spec(&self, decl: DeclId, spec: usize) -> Option<ValueSpec> {
        let ast = self.ast();
        let d = ast.arena.decls[decl];
        match ast.arena.specs_list(d.specs).get(spec) {
            Some(Spec::Value(v)) => Some(*v),
            _ => None,
        }
    }

    fn eval_const(
        &mut self,
        decl: DeclId,
        spec: usize,
        src: usize,
        name: usize,
    ) -> (Ty, Option<ConstValue>) {
        let Some(v) = self.value_spec(decl, src) else {
            return (Ty::Invalid, None);
        };
        let repeated = src != spec;
        if repeated {
            self.silent += 1;
        }
        self.const_ctx += 1;
        let old_iota = self.iota.replace(spec as i128);

        let typ = v.typ.map(|t| self.resolve_type(t));
        let op = self
            .ast()
            .arena
            .exprs_list(v.values)
            .get(name)
            .copied()
            .map(|e| self.expr(e, typ.as_ref()));

        self.iota = old_iota;
        self.const_ctx -= 1;
        if repeated {
            self.silent -= 1;
        }

        let Some(op) = op else {
            return (typ.unwrap_or_default(), None);
        };
        let value = op.const_value().cloned();
        (typ.unwrap_or(op.ty), value)
    }

    fn eval_var(&mut self, decl: DeclId, spec: usize, name: usize) -> Ty {
        let Some(v) = self.value_spec(decl, spec) else {
            return Ty::Invalid;
        };
        if let Some(t) = v.typ {
            return self.resolve_type(t);
        }
        let ast = self.ast();
        let values = ast.arena.exprs_list(v.values);
        let names = v.names.len() as usize;
        if values.len() == names {
            self.expr(values[name], None).ty.defaulted()
        } else if values.len() == 1 {
            self.multi_value(values[0], names)
                .into_iter()
                .nth(name)
                .unwrap_or_default()
        } else {
            Ty::Invalid
        }
    }

    fn resolve_package_name(&mut self, name: &str) -> Option<(Ty, Option<ConstValue>)> {
        let idx = *self.pkg_names.get(name)?;
        Some(self.resolve_obj(idx))
    }

    fn package_decl(&mut self, id: DeclId) {
        let ast = self.ast();
        let decl = ast.arena.decls[id];
        let specs = ast.arena.specs_list(decl.specs);
        match decl.kind {
            GenDeclKind::Import => {}
            GenDeclKind::Const => {
                let mut src = None;
                for (si, spec) in specs.iter().enumerate() {
                    let Spec::Value(v) = spec else { continue };
                    if !v.values.is_empty() {
                        src = Some(si);
                    }
                    for (ni, n) in ast.arena.ident_names(v.names).iter().enumerate() {
                        let name = ast.str(n.sym);
                        if name == "_" {
                            self.eval_const(id, si, src.unwrap_or(si), ni);
                        } else {
                            self.resolve_package_name(name);
                        }
                    }
                }
            }
            GenDeclKind::Var => {
                for (si, spec) in specs.iter().enumerate() {
                    let Spec::Value(v) = spec else { continue };
                    let names = ast.arena.ident_names(v.names);
                    if let Some(t) = v.typ {
                        let ty = self.resolve_type(t);
                        for &e in ast.arena.exprs_list(v.values) {
                            self.expr(e, Some(&ty));
                        }
                        for n in names {
                            self.resolve_package_name(ast.str(n.sym));
                        }
                        continue;
                    }
                    for (ni, n) in names.iter().enumerate() {
                        let name = ast.str(n.sym);
                        if name == "_" {
                            self.eval_var(id, si, ni);
                        } else {
                            self.resolve_package_name(name);
                        }
                    }
                }
            }
            GenDeclKind::Type => {
                for spec in specs {
                    let Spec::Type(t) = spec else { continue };
                    if let Some(nid) = self.package_named(ast.str(t.name.sym)) {
                        self.resolve_named(nid);
                    }
                }
            }
        }
    }

    fn func_decl(&mut self, id: FuncDeclId) {
        let ast = self.ast();
        let f = ast.arena.funcs[id];
        self.push_scope(ast.arena.funcs.span(id));
        if let Some(tp) = f.type_params {
            self.declare_type_params(tp);
        }
        if let Some(recv) = f.recv {
            if let Some((_, _, args)) = receiver_base(&ast.arena, recv.typ) {
                for a in ast.arena.types_list(args) {
                    if let Type::Named { pkg: None, name, .. } = ast.arena.types[*a] {
                        let n = ast.str(name.sym);
                        self.declare(n, Local::type_param(n));
                    }
                }
            }
            let rt = self.resolve_type(recv.typ);
            if let Some(n) = recv.name {
                self.declare(ast.str(n.sym), Local::var(rt));
            }
        }
        let sig = self.signature(f.signature, true);
        if let Some(body) = f.body {
            self.results.push(sig.results);
            self.stmt_list(body.stmts);
            self.results.pop();
        }
        self.pop_scope();
    }

    // ---------------------------------------------------------------------
    // Types
    // ---------------------------------------------------------------------

    fn resolve_named(&mut self, id: u32) -> Ty {
        let i = id as usize;
        match self.named_state[i] {
            NamedState::Done => return self.named[i].underlying.clone(),
            NamedState::Resolving => return Ty::Invalid,
            NamedState::Pending => {}
        }
        let Some((file, spec)) = self.named_site[i] else {
            self.named_state[i] = NamedState::Done;
            return Ty::Invalid;
        };
        self.named_state[i] = NamedState::Resolving;

        let saved = (!self.named[i].local).then(|| self.enter_file(file));
        self.push_scope(Span::DUMMY);
        if let Some(tp) = spec.type_params {
            self.declare_type_params(tp);
        }
        let ty = self.resolve_type(spec.typ);
        self.pop_scope();
        if let Some(saved) = saved {
            self.leave_file(saved);
        }

        let u = if matches!(ty, Ty::Named(_)) {
            self.underlying(&ty)
        } else {
            ty
        };
        self.named[i].underlying = u.clone();
        self.named_state[i] = NamedState::Done;
        u
    }

    fn underlying(&mut self, ty: &Ty) -> Ty {
        let mut cur = ty.clone();
        for _ in 0..16 {
            match cur {
                Ty::Named(n) => cur = self.resolve_named(n.id),
                other => return other,
            }
        }
        Ty::Invalid
    }

    fn resolve_type(&mut self, t: TypeId) -> Ty {
        let ast = self.ast();
        let ty = match ast.arena.types[t] {
            Type::Named {
                pkg: Some(p),
                name,
                args,
            } => {
                for a in ast.arena.types_list(args) {
                    self.resolve_type(*a);
                }
                let pkg = ast.str(p.sym);
                let n = ast.str(name.sym);
                if pkg == "unsafe" && n == "Pointer" {
                    Ty::Basic(BasicKind::UnsafePointer)
                } else {
                    let path = self.imports[self.cur]
                        .get(pkg)
                        .cloned()
                        .unwrap_or_else(|| Arc::from(pkg));
                    Ty::External {
                        pkg: path,
                        name: Arc::from(n),
                    }
                }
            }
            Type::Named {
                pkg: None,
                name,
                args,
            } => {
                for a in ast.arena.types_list(args) {
                    self.resolve_type(*a);
                }
                let n = ast.str(name.sym);
                match self.lookup(n) {
                    Some(r) if r.kind == ObjKind::TypeName => r.ty,
                    Some(_) => {
                        self.diag(name.pos, format!("{n} is not a type"));
                        Ty::Invalid
                    }
                    None => {
                        if !self.dot_import[self.cur] {
                            self.diag(name.pos, format!("undefined: {n}"));
                        }
                        Ty::Invalid
                    }
                }
            }
            Type::Pointer(x) => self.resolve_type(x).pointer_to(),
            Type::Array { len, elem } => {
                let n = match len {
                    ArrayLen::Expr(e) => {
                        self.const_ctx += 1;
                        let op = self.expr(e, Some(&Ty::INT));
                        self.const_ctx -= 1;
                        op.const_value()
                            .and_then(ConstValue::as_int)
                            .and_then(|v| u64::try_from(v).ok())
                    }
                    ArrayLen::Ellipsis => None,
                };
                Ty::Array(n, Box::new(self.resolve_type(elem)))
            }
            Type::Slice(x) => Ty::Slice(Box::new(self.resolve_type(x))),
            Type::Map { key, val } => Ty::Map(
                Box::new(self.resolve_type(key)),
                Box::new(self.resolve_type(val)),
            ),
            Type::Chan { dir, elem } => Ty::Chan(dir, Box::new(self.resolve_type(elem))),
            Type::Struct { fields } => Ty::Struct(self.struct_fields(fields).into()),
            Type::Interface { elems } => {
                let mut methods = Vec::new();
                for e in ast.arena.interface_elems(elems) {
                    match *e {
                        InterfaceElem::Method { name, sig } => {
                            let sig = self.signature(sig, false);
                            methods.push(MethodTy {
                                name: Arc::from(ast.str(name.sym)),
                                sig: Ty::Func(Arc::new(sig)),
                            });
                        }
                        InterfaceElem::Embed(t) => {
                            let et = self.resolve_type(t);
                            if let Ty::Interface(ms) = self.underlying(&et) {
                                methods.extend(ms.iter().cloned());
                            }
                        }
                    }
                }
                Ty::Interface(methods.into())
            }
            Type::Func(sig) => Ty::Func(Arc::new(self.signature(sig, false))),
            Type::Paren(x) => self.resolve_type(x),
            Type::Union(terms) => {
                for term in ast.arena.type_terms(terms) {
                    self.resolve_type(term.typ);
                }
                Ty::empty_interface()
            }
        };
        if self.silent == 0 {
            self.infos[self.cur].type_exprs.insert(t, ty.clone());
        }
        ty
    }

    fn struct_fields(&mut self, fields: ListRef<FieldId>) -> Vec<FieldTy> {
        let ast = self.ast();
        let mut out = Vec::new();
        for &fid in ast.arena.fields_list(fields) {
            let f = ast.arena.fields[fid];
            let ty = self.resolve_type(f.typ);
            if f.embedded {
                let name = embedded_name(&ast.arena, f.typ)
                    .map(|s| ast.str(s))
                    .unwrap_or("_");
                out.push(FieldTy {
                    name: Arc::from(name),
                    ty,
                    embedded: true,
                });
                continue;
            }
            for n in ast.arena.ident_names(f.names) {
                out.push(FieldTy {
                    name: Arc::from(ast.str(n.sym)),
                    ty: ty.clone(),
                    embedded: false,
                });
            }
        }
        out
    }

    /// Resolves a signature; with `declare`, parameters and named results
    /// are declared in the current scope.
    fn signature(&mut self, sig: SignatureId, declare: bool) -> FuncTy {
        let ast = self.ast();
        let s = ast.arena.signatures[sig];
        let mut params = Vec::new();
        let mut variadic = false;
        for &fid in ast.arena.fields_list(s.params) {
            let f = ast.arena.fields[fid];
            let mut ty = self.resolve_type(f.typ);
            if f.variadic {
                variadic = true;
                ty = Ty::Slice(Box::new(ty));
            }
            let names = ast.arena.ident_names(f.names);
            if names.is_empty() {
                params.push(ty);
                continue;
            }
            for n in names {
                if declare {
                    self.declare(ast.str(n.sym), Local::var(ty.clone()));
                }
                params.push(ty.clone());
            }
        }

        let mut results = Vec::new();
        match s.results {
            None => {}
            Some(Results::Type(t)) => results.push(self.resolve_type(t)),
            Some(Results::Params(fields)) => {
                for &fid in ast.arena.fields_list(fields) {
                    let f = ast.arena.fields[fid];
                    let ty = self.resolve_type(f.typ);
                    let names = ast.arena.ident_names(f.names);
                    if names.is_empty() {
                        results.push(ty);
                        continue;
                    }
                    for n in names {
                        if declare {
                            self.declare(ast.str(n.sym), Local::var(ty.clone()));
                        }
                        results.push(ty.clone());
                    }
                }
            }
        }
        FuncTy {
            params,
            results,
            variadic,
        }
    }

    fn declare_type_params(&mut self, tp: TypeParamsId) {
        let ast = self.ast();
        let params = ast.arena.type_params[tp].params;
        for &d in ast.arena.type_param_decl_ids(params) {
            let decl = ast.arena.type_param_decls[d];
            for n in ast.arena.ident_names(decl.names) {
                let name = ast.str(n.sym);
                self.declare(name, Local::type_param(name));
            }
        }
        for &d in ast.arena.type_param_decl_ids(params) {
            let decl = ast.arena.type_param_decls[d];
            self.resolve_type(decl.constraint);
        }
    }

    // ---------------------------------------------------------------------
    // Scopes
    // ---------------------------------------------------------------------

    fn push_scope(&mut self, span: Span) {
        let parent = self
            .scopes
            .last()
            .map(|s| s.record)
            .filter(|&r| r != usize::MAX);
        let record = if self.silent > 0 {
            usize::MAX
        } else {
            let scopes = &mut self.infos[self.cur].scopes;
            scopes.push(ScopeRecord {
                span,
                parent,
                names: Vec::new(),
            });
            scopes.len() - 1
        };
        self.scopes.push(LocalScope {
            names: HashMap::new(),
            record,
        });
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &str, local: Local) {
        if name == "_" {
            return;
        }
        let key: Arc<str> = Arc::from(name);
        let cur = self.cur;
        if let Some(scope) = self.scopes.last_mut() {
            if let Some(rec) = self.infos[cur].scopes.get_mut(scope.record) {
                rec.names.push(Arc::clone(&key));
            }
            scope.names.insert(key, local);
        }
    }

    fn declared_in_top(&self, name: &str) -> bool {
        self.scopes
            .last()
            .is_some_and(|s| s.names.contains_key(name))
    }

    fn lookup(&mut self, name: &str) -> Option<Resolved> {
        for scope in self.scopes.iter().rev() {
            if let Some(l) = scope.names.get(name) {
                return Some(Resolved {
                    kind: l.kind,
                    ty: l.ty.clone(),
                    value: l.value.clone(),
                    local: true,
                    builtin: None,
                });
            }
        }
        if self.imports[self.cur].contains_key(name) {
            return Some(Resolved {
                kind: ObjKind::Package,
                ty: Ty::Invalid,
                value: None,
                local: false,
                builtin: None,
            });
        }
        if let Some(&idx) = self.pkg_names.get(name) {
            let kind = match self.objs[idx].kind {
                PkgObjKind::Const { .. } => ObjKind::Const,
                PkgObjKind::Var { .. } => ObjKind::Var,
                PkgObjKind::Type => ObjKind::TypeName,
                PkgObjKind::Func { .. } => ObjKind::Func,
            };
            let (ty, value) = self.resolve_obj(idx);
            return Some(Resolved {
                kind,
                ty,
                value,
                local: false,
                builtin: None,
            });
        }
        let p = universe::lookup(name)?;
        let kind = p.kind();
        Some(match p {
            Predeclared::Type(ty) => Resolved {
                kind,
                ty,
                value: None,
                local: false,
                builtin: None,
            },
            Predeclared::Const(ty, v) => Resolved {
                kind,
                ty,
                value: Some(v),
                local: false,
                builtin: None,
            },
            Predeclared::Nil => Resolved {
                kind,
                ty: Ty::Basic(BasicKind::UntypedNil),
                value: None,
                local: false,
                builtin: None,
            },
            Predeclared::Builtin(b) => Resolved {
                kind,
                ty: Ty::Invalid,
                value: None,
                local: false,
                builtin: Some(b),
            },
        })
    }

    // ---------------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------------

    fn record(&mut self, e: ExprId, op: &Operand, expected: Option<&Ty>) {
        if self.silent > 0 {
            return;
        }
        let value = op.const_value().cloned();
        let is_type = matches!(op.mode, Mode::Type);
        self.infos[self.cur].types.insert(
            e,
            TypeAndValue {
                ty: op.ty.clone(),
                value,
                is_type,
            },
        );
        if let Some(t) = expected {
            if t.is_valid() && op.ty.is_untyped() {
                self.convert_untyped(e, t);
            }
        }
    }

    fn is_untyped_expr(&self, e: ExprId) -> bool {
        self.infos[self.cur]
            .types
            .get(&e)
            .is_some_and(|tv| tv.ty.is_untyped())
    }

    /// Records the type an untyped operand takes from its context.
    fn convert_untyped(&mut self, e: ExprId, target: &Ty) {
        if self.silent > 0 {
            return;
        }
        self.infos[self.cur].expected.insert(e, target.clone());
        match self.ast().arena.exprs[e] {
            Expr::Paren(x) => self.convert_untyped(x, target),
            Expr::Unary { op, expr } if !matches!(op, UnaryOp::Addr | UnaryOp::Deref | UnaryOp::Recv) => {
                if self.is_untyped_expr(expr) {
                    self.convert_untyped(expr, target);
                }
            }
            Expr::Binary { left, op, right }
                if !op.is_comparison() && !matches!(op, BinaryOp::LAnd | BinaryOp::LOr) =>
            {
                if self.is_untyped_expr(left) {
                    self.convert_untyped(left, target);
                }
                if !matches!(op, BinaryOp::Shl | BinaryOp::Shr) && self.is_untyped_expr(right) {
                    self.convert_untyped(right, target);
                }
            }
            _ => {}
        }
    }

    fn expr(&mut self, e: ExprId, expected: Option<&Ty>) -> Operand {
        let ast = self.ast();
        let op = match ast.arena.exprs[e] {
            Expr::Ident(sym) => self.ident(e, ast.str(sym)),
            Expr::BasicLit(lit) => literal(lit.kind, ast.str(lit.raw)),
            Expr::FuncLit { sig, body } => {
                self.push_scope(ast.arena.exprs.span(e));
                let fty = self.signature(sig, true);
                self.results.push(fty.results.clone());
                self.stmt_list(body.stmts);
                self.results.pop();
                self.pop_scope();
                Operand::value(Ty::Func(Arc::new(fty)))
            }
            Expr::CompositeLit { typ, lit } => {
                let mut ty = self.resolve_type(typ);
                let n = self.literal_value(lit, &ty);
                if let (Type::Array { len: ArrayLen::Ellipsis, .. }, Ty::Array(None, elem)) =
                    (ast.arena.types[typ], &ty)
                {
                    ty = Ty::Array(Some(n), elem.clone());
                }
                Operand::value(ty)
            }
            Expr::Paren(x) => self.expr(x, expected),
            Expr::Selector { expr, sel } => self.selector(e, expr, ast.str(sel.sym)),
            Expr::Index { base, indices } => self.index(base, indices),
            Expr::Slice {
                expr, lo, hi, max, ..
            } => {
                let b = self.expr(expr, None);
                for bound in [lo, hi, max].into_iter().flatten() {
                    self.expr(bound, Some(&Ty::INT));
                }
                match self.underlying(&b.ty) {
                    Ty::Basic(k) if k.is_string() => match b.ty {
                        Ty::Named(_) => Operand::value(b.ty),
                        _ => Operand::value(Ty::STRING),
                    },
                    Ty::Array(_, el) => Operand::value(Ty::Slice(el)),
                    Ty::Pointer(p) => match self.underlying(&p) {
                        Ty::Array(_, el) => Operand::value(Ty::Slice(el)),
                        _ => Operand::invalid(),
                    },
                    Ty::Slice(_) => Operand::value(b.ty),
                    _ => Operand::invalid(),
                }
            }
            Expr::TypeAssert { expr, typ } => {
                self.expr(expr, None);
                match typ {
                    Some(t) => Operand::value(self.resolve_type(t)),
                    None => Operand::invalid(),
                }
            }
            Expr::Call {
                fun,
                args,
                ellipsis,
            } => self.call(fun, args, ellipsis),
            Expr::Unary { op, expr } => self.unary(op, expr, expected),
            Expr::Binary { left, op, right } => self.binary(left, op, right, expected),
            Expr::Type(t) => Operand {
                mode: Mode::Type,
                ty: self.resolve_type(t),
            },
        };
        self.record(e, &op, expected);
        op
    }

    fn ident(&mut self, e: ExprId, name: &str) -> Operand {
        if name == "_" {
            return Operand::invalid();
        }
        if name == "iota" {
            if let Some(iota) = self.iota {
                if self.scopes.iter().all(|s| !s.names.contains_key("iota")) {
                    return Operand::konst(Ty::Basic(BasicKind::UntypedInt), ConstValue::Int(iota));
                }
            }
        }
        let Some(r) = self.lookup(name) else {
            if !self.dot_import[self.cur] {
                let span = self.ast().arena.exprs.span(e);
                self.diag(span, format!("undefined: {name}"));
            }
            return Operand::invalid();
        };
        if self.silent == 0 {
            self.infos[self.cur].uses.insert(
                e,
                Object {
                    kind: r.kind,
                    local: r.local,
                    ty: r.ty.clone(),
                },
            );
        }
        if r.kind == ObjKind::Const && !r.local && self.const_ctx > 0 {
            self.const_deps.insert(name.to_string());
        }
        match r.kind {
            ObjKind::Const => Operand::maybe_const(r.ty, r.value),
            ObjKind::TypeName => Operand {
                mode: Mode::Type,
                ty: r.ty,
            },
            ObjKind::Builtin => match r.builtin {
                Some(b) => Operand {
                    mode: Mode::Builtin(b),
                    ty: Ty::Invalid,
                },
                None => Operand::invalid(),
            },
            ObjKind::Package => Operand {
                mode: Mode::Package,
                ty: Ty::Invalid,
            },
            ObjKind::Nil => Operand {
                mode: Mode::Nil,
                ty: r.ty,
            },
            ObjKind::Var | ObjKind::Func => Operand::value(r.ty),
        }
    }

    fn selector(&mut self, e: ExprId, x: ExprId, name: &str) -> Operand {
        let base = self.expr(x, None);
        match base.mode {
            Mode::Package => {
                // other packages are opaque
                let is_unsafe_ptr = name == "Pointer"
                    && matches!(self.ast().arena.exprs[x], Expr::Ident(s) if self.ast().str(s) == "unsafe");
                return if is_unsafe_ptr {
                    Operand {
                        mode: Mode::Type,
                        ty: Ty::Basic(BasicKind::UnsafePointer),
                    }
                } else {
                    Operand::invalid()
                };
            }
            Mode::Type => return Operand::invalid(),
            _ => {}
        }

        match self.lookup_member(&base.ty, name) {
            Some(m) => {
                if self.silent == 0 {
                    self.infos[self.cur].selections.insert(
                        e,
                        Selection {
                            kind: m.kind,
                            recv: m.recv,
                            name: Arc::from(name),
                            promoted: m.promoted,
                            indirect: m.indirect,
                            ty: m.ty.clone(),
                        },
                    );
                }
                Operand::value(m.ty)
            }
            None => {
                if matches!(self.underlying(&base.ty), Ty::Struct(_)) {
                    let span = self.ast().arena.exprs.span(e);
                    self.diag(span, format!("{} has no field or method {name}", base.ty));
                }
                Operand::invalid()
            }
        }
    }

    fn lookup_member(&mut self, ty: &Ty, name: &str) -> Option<Member> {
        let (start, indirect) = match ty {
            Ty::Pointer(t) => ((**t).clone(), true),
            t => (t.clone(), false),
        };
        let mut level = vec![(start, indirect)];
        let mut seen = HashSet::new();
        let mut depth = 0usize;

        while !level.is_empty() && depth < 8 {
            let mut next = Vec::new();
            for (t, ind) in level {
                if let Ty::Named(n) = &t {
                    if !seen.insert(n.id) {
                        continue;
                    }
                    let method = self.named[n.id as usize]
                        .methods
                        .iter()
                        .find(|m| &*m.0 == name)
                        .map(|m| m.1.clone());
                    if let Some(sig) = method {
                        return Some(Member {
                            kind: SelectionKind::Method,
                            ty: sig,
                            recv: Some(n.clone()),
                            promoted: depth > 0,
                            indirect: ind,
                        });
                    }
                }
                match self.underlying(&t) {
                    Ty::Struct(fields) => {
                        if let Some(f) = fields.iter().find(|f| &*f.name == name) {
                            return Some(Member {
                                kind: SelectionKind::Field,
                                ty: f.ty.clone(),
                                recv: t.named().cloned(),
                                promoted: depth > 0,
                                indirect: ind,
                            });
                        }
                        for f in fields.iter().filter(|f| f.embedded) {
                            match &f.ty {
                                Ty::Pointer(inner) => next.push(((**inner).clone(), true)),
                                other => next.push((other.clone(), ind)),
                            }
                        }
                    }
                    Ty::Interface(ms) => {
                        if let Some(m) = ms.iter().find(|m| &*m.name == name) {
                            return Some(Member {
                                kind: SelectionKind::Method,
                                ty: m.sig.clone(),
                                recv: t.named().cloned(),
                                promoted: depth > 0,
                                indirect: ind,
                            });
                        }
                    }
                    Ty::Error => {
                        if let Some(m) = universe::error_method(name) {
                            return Some(Member {
                                kind: SelectionKind::Method,
                                ty: m.sig,
                                recv: None,
                                promoted: depth > 0,
                                indirect: ind,
                            });
                        }
                    }
                    _ => {}
                }
            }
            depth += 1;
            level = next;
        }
        None
    }

    fn index(&mut self, base: ExprId, indices: ListRef<ExprId>) -> Operand {
        let b = self.expr(base, None);
        let idx = self.ast().arena.exprs_list(indices);
        if matches!(b.mode, Mode::Type) {
            for &i in idx {
                self.expr(i, None);
            }
            return Operand {
                mode: Mode::Type,
                ty: b.ty,
            };
        }
        match self.underlying(&b.ty) {
            Ty::Map(k, v) => {
                for &i in idx {
                    self.expr(i, Some(&*k));
                }
                Operand::value(*v)
            }
            Ty::Slice(el) | Ty::Array(_, el) => {
                for &i in idx {
                    self.expr(i, Some(&Ty::INT));
                }
                Operand::value(*el)
            }
            Ty::Pointer(p) => {
                for &i in idx {
                    self.expr(i, Some(&Ty::INT));
                }
                match self.underlying(&p) {
                    Ty::Array(_, el) => Operand::value(*el),
                    _ => Operand::invalid(),
                }
            }
            Ty::Basic(k) if k.is_string() => {
                let mut value = None;
                for &i in idx {
                    let op = self.expr(i, Some(&Ty::INT));
                    if let (Some(ConstValue::String(s)), Some(n)) =
                        (b.const_value(), op.const_value().and_then(ConstValue::as_int))
                    {
                        value = usize::try_from(n)
                            .ok()
                            .and_then(|n| s.get(n))
                            .map(|&c| ConstValue::Int(c as i128));
                    }
                }
                Operand::maybe_const(Ty::Basic(BasicKind::Uint8), value)
            }
            Ty::Func(_) => {
                for &i in idx {
                    self.expr(i, None);
                }
                Operand::value(b.ty)
            }
            _ => {
                for &i in idx {
                    self.expr(i, None);
                }
                Operand::invalid()
            }
        }
    }

    fn call(&mut self, fun: ExprId, args: ListRef<ExprId>, ellipsis: bool) -> Operand {
        let f = self.expr(fun, None);
        let args = self.ast().arena.exprs_list(args);
        match f.mode {
            Mode::Type => {
                let target = f.ty;
                let mut first = None;
                for (i, &a) in args.iter().enumerate() {
                    let op = self.expr(a, if i == 0 { Some(&target) } else { None });
                    if i == 0 {
                        first = Some(op);
                    }
                }
                let value = match first.as_ref().and_then(Operand::const_value) {
                    Some(v) if self.is_const_type(&target) => Some(self.convert_const(v, &target)),
                    _ => None,
                };
                Operand::maybe_const(target, value)
            }
            Mode::Builtin(b) => self.builtin(b, args, ellipsis),
            _ => {
                let Ty::Func(sig) = self.underlying(&f.ty) else {
                    for &a in args {
                        self.expr(a, None);
                    }
                    return Operand::invalid();
                };
                for (i, &a) in args.iter().enumerate() {
                    let expected = param_type(&sig, i, ellipsis);
                    self.expr(a, expected.as_ref());
                }
                match sig.results.as_slice() {
                    [] => Operand {
                        mode: Mode::NoValue,
                        ty: Ty::Invalid,
                    },
                    [one] => Operand::value(one.clone()),
                    many => Operand::value(Ty::Tuple(many.to_vec().into())),
                }
            }
        }
    }

    fn is_const_type(&mut self, t: &Ty) -> bool {
        matches!(self.underlying(t), Ty::Basic(k) if k != BasicKind::UnsafePointer)
    }

    fn convert_const(&mut self, v: &ConstValue, target: &Ty) -> ConstValue {
        match (self.underlying(target), v) {
            (Ty::Basic(k), ConstValue::Int(n)) if k.is_string() => {
                let c = u32::try_from(*n)
                    .ok()
                    .and_then(char::from_u32)
                    .unwrap_or('\u{FFFD}');
                ConstValue::String(c.to_string().into_bytes())
            }
            (Ty::Basic(k), ConstValue::Float(f)) if k.is_integer() => ConstValue::Int(*f as i128),
            _ => v.clone(),
        }
    }

    fn builtin(&mut self, b: Builtin, args: &[ExprId], ellipsis: bool) -> Operand {
        match b {
            Builtin::Len | Builtin::Cap => {
                let mut value = None;
                for (i, &a) in args.iter().enumerate() {
                    let op = self.expr(a, None);
                    if i == 0 && b == Builtin::Len {
                        if let Some(ConstValue::String(s)) = op.const_value() {
                            value = Some(ConstValue::Int(s.len() as i128));
                        }
                    }
                }
                Operand::maybe_const(Ty::INT, value)
            }
            Builtin::New => {
                let t = args.first().map(|&a| self.expr(a, None).ty).unwrap_or_default();
                Operand::value(t.pointer_to())
            }
            Builtin::Make => {
                let mut t = Ty::Invalid;
                for (i, &a) in args.iter().enumerate() {
                    if i == 0 {
                        t = self.expr(a, None).ty;
                    } else {
                        self.expr(a, Some(&Ty::INT));
                    }
                }
                Operand::value(t)
            }
            Builtin::Append => {
                let mut s = Ty::Invalid;
                let mut elem = None;
                for (i, &a) in args.iter().enumerate() {
                    if i == 0 {
                        s = self.expr(a, None).ty;
                        if let Ty::Slice(el) = self.underlying(&s) {
                            elem = Some(*el);
                        }
                    } else if ellipsis {
                        self.expr(a, None);
                    } else {
                        self.expr(a, elem.as_ref());
                    }
                }
                Operand::value(s)
            }
            Builtin::Copy => {
                for &a in args {
                    self.expr(a, None);
                }
                Operand::value(Ty::INT)
            }
            Builtin::Delete => {
                let mut key = None;
                for (i, &a) in args.iter().enumerate() {
                    if i == 0 {
                        let m = self.expr(a, None).ty;
                        if let Ty::Map(k, _) = self.underlying(&m) {
                            key = Some(*k);
                        }
                    } else {
                        self.expr(a, key.as_ref());
                    }
                }
                Operand {
                    mode: Mode::NoValue,
                    ty: Ty::Invalid,
                }
            }
            Builtin::Clear | Builtin::Close | Builtin::Panic | Builtin::Print | Builtin::Println => {
                for &a in args {
                    self.expr(a, None);
                }
                Operand {
                    mode: Mode::NoValue,
                    ty: Ty::Invalid,
                }
            }
            Builtin::Recover => Operand::value(Ty::empty_interface()),
            Builtin::Complex => {
                for &a in args {
                    self.expr(a, None);
                }
                Operand::value(Ty::Basic(BasicKind::Complex128))
            }
            Builtin::Real | Builtin::Imag => {
                for &a in args {
                    self.expr(a, None);
                }
                Operand::value(Ty::Basic(BasicKind::Float64))
            }
            Builtin::Min | Builtin::Max => {
                let ops: Vec<Operand> = args.iter().map(|&a| self.expr(a, None)).collect();
                let ty = ops
                    .iter()
                    .find(|o| !o.ty.is_untyped())
                    .or(ops.first())
                    .map(|o| o.ty.clone())
                    .unwrap_or_default();
                let ints: Option<Vec<i128>> = ops
                    .iter()
                    .map(|o| o.const_value().and_then(ConstValue::as_int))
                    .collect();
                let value = ints.and_then(|v| {
                    let r = if b == Builtin::Min {
                        v.into_iter().min()
                    } else {
                        v.into_iter().max()
                    };
                    r.map(ConstValue::Int)
                });
                Operand::maybe_const(ty, value)
            }
        }
    }

    fn unary(&mut self, op: UnaryOp, x: ExprId, expected: Option<&Ty>) -> Operand {
        match op {
            UnaryOp::Addr => {
                let o = self.expr(x, None);
                Operand::value(o.ty.pointer_to())
            }
            UnaryOp::Deref => {
                let o = self.expr(x, None);
                if matches!(o.mode, Mode::Type) {
                    return Operand {
                        mode: Mode::Type,
                        ty: o.ty.pointer_to(),
                    };
                }
                match self.underlying(&o.ty) {
                    Ty::Pointer(t) => Operand::value(*t),
                    _ => Operand::invalid(),
                }
            }
            UnaryOp::Recv => {
                let o = self.expr(x, None);
                match self.underlying(&o.ty) {
                    Ty::Chan(_, t) => Operand::value(*t),
                    _ => Operand::invalid(),
                }
            }
            UnaryOp::Not => {
                let o = self.expr(x, expected);
                let v = match o.const_value() {
                    Some(ConstValue::Bool(b)) => Some(ConstValue::Bool(!b)),
                    _ => None,
                };
                Operand::maybe_const(o.ty, v)
            }
            UnaryOp::Add | UnaryOp::Sub | UnaryOp::Xor => {
                let o = self.expr(x, expected);
                let v = match (op, o.const_value()) {
                    (UnaryOp::Add, Some(v)) => Some(v.clone()),
                    (UnaryOp::Sub, Some(ConstValue::Int(n))) => n.checked_neg().map(ConstValue::Int),
                    (UnaryOp::Sub, Some(ConstValue::Float(f))) => Some(ConstValue::Float(-f)),
                    (UnaryOp::Xor, Some(ConstValue::Int(n))) => Some(ConstValue::Int(!n)),
                    _ => None,
                };
                Operand::maybe_const(o.ty, v)
            }
            UnaryOp::Tilde => {
                self.expr(x, None);
                Operand::invalid()
            }
        }
    }

    fn binary(&mut self, left: ExprId, op: BinaryOp, right: ExprId, expected: Option<&Ty>) -> Operand {
        match op {
            BinaryOp::LAnd | BinaryOp::LOr => {
                let l = self.expr(left, None);
                let r = self.expr(right, None);
                let ty = if l.ty.is_untyped() && r.ty.is_untyped() {
                    Ty::Basic(BasicKind::UntypedBool)
                } else {
                    Ty::BOOL
                };
                let v = match (l.const_value(), r.const_value()) {
                    (Some(ConstValue::Bool(a)), Some(ConstValue::Bool(b))) => Some(ConstValue::Bool(
                        if op == BinaryOp::LAnd { *a && *b } else { *a || *b },
                    )),
                    _ => None,
                };
                Operand::maybe_const(ty, v)
            }
            _ if op.is_comparison() => {
                let l = self.expr(left, None);
                let r = self.expr(right, None);
                if l.ty.is_untyped() && !r.ty.is_untyped() && r.ty.is_valid() {
                    self.convert_untyped(left, &r.ty);
                } else if r.ty.is_untyped() && !l.ty.is_untyped() && l.ty.is_valid() {
                    self.convert_untyped(right, &l.ty);
                }
                let v = match (l.const_value(), r.const_value()) {
                    (Some(a), Some(b)) => compare(op, a, b).map(ConstValue::Bool),
                    _ => None,
                };
                Operand::maybe_const(Ty::Basic(BasicKind::UntypedBool), v)
            }
            BinaryOp::Shl | BinaryOp::Shr => {
                let l = self.expr(left, expected);
                let r = self.expr(right, None);
                let v = match (l.const_value(), r.const_value()) {
                    (Some(a), Some(b)) => arith(op, a, b),
                    _ => None,
                };
                Operand::maybe_const(l.ty, v)
            }
            _ => {
                let l = self.expr(left, None);
                let r = self.expr(right, None);
                let ty = if !l.ty.is_untyped() && l.ty.is_valid() {
                    l.ty.clone()
                } else if !r.ty.is_untyped() && r.ty.is_valid() {
                    r.ty.clone()
                } else {
                    wider_untyped(&l.ty, &r.ty)
                };
                if !ty.is_untyped() && ty.is_valid() {
                    if l.ty.is_untyped() {
                        self.convert_untyped(left, &ty);
                    }
                    if r.ty.is_untyped() {
                        self.convert_untyped(right, &ty);
                    }
                }
                let v = match (l.const_value(), r.const_value()) {
                    (Some(a), Some(b)) => arith(op, a, b),
                    _ => None,
                };
                Operand::maybe_const(ty, v)
            }
        }
    }

    /// Checks the elements of a literal of type `ty`; returns the element
    /// count (highest index + 1 for arrays and slices).
    fn literal_value(&mut self, lit: LiteralValue, ty: &Ty) -> u64 {
        let ast = self.ast();
        let elems = ast.arena.keyed_elems_list(lit.elements);
        match self.underlying(ty) {
            Ty::Struct(fields) => {
                for (i, el) in elems.iter().enumerate() {
                    let field = match el.key {
                        Some(Key::Expr(k)) => match ast.arena.exprs[k] {
                            Expr::Ident(s) => {
                                let name = ast.str(s);
                                let f = fields.iter().find(|f| &*f.name == name).cloned();
                                if f.is_none() {
                                    let span = ast.arena.exprs.span(k);
                                    self.diag(span, format!("unknown field {name} in struct literal"));
                                }
                                f
                            }
                            _ => None,
                        },
                        Some(Key::Literal(_)) => None,
                        None => fields.get(i).cloned(),
                    };
                    self.element(el.value, field.as_ref().map(|f| &f.ty));
                }
                elems.len() as u64
            }
            Ty::Array(_, elem) | Ty::Slice(elem) => {
                let mut next = 0u64;
                let mut count = 0u64;
                for el in elems {
                    if let Some(Key::Expr(k)) = el.key {
                        let op = self.expr(k, Some(&Ty::INT));
                        if let Some(n) = op.const_value().and_then(ConstValue::as_int) {
                            next = u64::try_from(n).unwrap_or(next);
                        }
                    }
                    self.element(el.value, Some(&*elem));
                    next += 1;
                    count = count.max(next);
                }
                count
            }
            Ty::Map(k, v) => {
                for el in elems {
                    match el.key {
                        Some(Key::Expr(ke)) => {
                            self.expr(ke, Some(&*k));
                        }
                        Some(Key::Literal(l)) => {
                            self.elided_literal(l, &k);
                        }
                        None => {}
                    }
                    self.element(el.value, Some(&*v));
                }
                elems.len() as u64
            }
            _ => {
                for el in elems {
                    match el.key {
                        // may be a field name of an unknown struct type
                        Some(Key::Expr(ke)) if matches!(ast.arena.exprs[ke], Expr::Ident(_)) => {}
                        Some(Key::Expr(ke)) => {
                            self.expr(ke, None);
                        }
                        Some(Key::Literal(l)) => {
                            self.literal_value(l, &Ty::Invalid);
                        }
                        None => {}
                    }
                    self.element(el.value, None);
                }
                elems.len() as u64
            }
        }
    }

    fn element(&mut self, el: Element, expected: Option<&Ty>) {
        match el {
            Element::Expr(e) => {
                self.expr(e, expected);
            }
            Element::Literal(l) => {
                let t = expected.cloned().unwrap_or_default();
                self.elided_literal(l, &t);
            }
        }
    }

    /// `{...}` standing for `T{...}` or `&T{...}`.
    fn elided_literal(&mut self, lit: LiteralValue, ty: &Ty) {
        match self.underlying(ty) {
            Ty::Pointer(inner) => {
                self.literal_value(lit, &inner);
            }
            _ => {
                self.literal_value(lit, ty);
            }
        }
    }

    /// Types of an `n`-valued right-hand side made of one expression.
    fn multi_value(&mut self, e: ExprId, n: usize) -> Vec<Ty> {
        let op = self.expr(e, None);
        match op.ty {
            Ty::Tuple(items) => items.to_vec(),
            t if n == 2 => vec![t.defaulted(), Ty::BOOL],
            _ => vec![Ty::Invalid; n],
        }
    }

    // ---------------------------------------------------------------------
    // Statements
    // ---------------------------------------------------------------------

    fn stmt_list(&mut self, list: ListRef<StmtId>) {
        let ast = self.ast();
        for &s in ast.arena.stmts_list(list) {
            self.stmt(s);
        }
    }

    fn block(&mut self, b: Block, span: Span) {
        self.push_scope(span);
        self.stmt_list(b.stmts);
        self.pop_scope();
    }

    fn stmt(&mut self, id: StmtId) {
        let ast = self.ast();
        let span = ast.arena.stmts.span(id);
        match ast.arena.stmts[id] {
            Stmt::Simple(s) => self.simple(s),
            Stmt::Decl(d) => self.local_decl(d),
            Stmt::Labeled { stmt, .. } => self.stmt(stmt),
            Stmt::Go(e) | Stmt::Defer(e) => {
                self.expr(e, None);
            }
            Stmt::Return(values) => {
                let vals = ast.arena.exprs_list(values);
                let results = self.results.last().cloned().unwrap_or_default();
                if vals.len() == results.len() {
                    for (&v, t) in vals.iter().zip(results.iter()) {
                        self.expr(v, Some(t));
                    }
                } else {
                    for &v in vals {
                        self.expr(v, None);
                    }
                }
            }
            Stmt::Branch { .. } => {}
            Stmt::Block(b) => self.block(b, span),
            Stmt::If {
                init,
                cond,
                then_block,
                else_stmt,
            } => {
                self.push_scope(span);
                if let Some(init) = init {
                    self.simple(init);
                }
                self.expr(cond, Some(&Ty::BOOL));
                self.block(then_block, span);
                if let Some(e) = else_stmt {
                    self.stmt(e);
                }
                self.pop_scope();
            }
            Stmt::For { kind, block } => {
                self.push_scope(span);
                match kind {
                    ForKind::Infinite => {}
                    ForKind::Cond(c) => {
                        self.expr(c, Some(&Ty::BOOL));
                    }
                    ForKind::Clause { init, cond, post } => {
                        if let Some(i) = init {
                            self.simple(i);
                        }
                        if let Some(c) = cond {
                            self.expr(c, Some(&Ty::BOOL));
                        }
                        if let Some(p) = post {
                            self.simple(p);
                        }
                    }
                    ForKind::Range { lhs, expr } => {
                        let r = self.expr(expr, None);
                        let (k, v) = self.range_types(&r.ty);
                        match lhs {
                            Some(RangeLhs::Def(names)) => {
                                for (i, n) in ast.arena.ident_names(names).iter().enumerate() {
                                    let t = if i == 0 { k.clone() } else { v.clone() };
                                    self.declare(ast.str(n.sym), Local::var(t));
                                }
                            }
                            Some(RangeLhs::Assign(exprs)) => {
                                for &e in ast.arena.exprs_list(exprs) {
                                    self.expr(e, None);
                                }
                            }
                            None => {}
                        }
                    }
                }
                self.block(block, span);
                self.pop_scope();
            }
            Stmt::Switch { init, tag, clauses } => {
                self.push_scope(span);
                if let Some(init) = init {
                    self.simple(init);
                }
                let tag_ty = match tag {
                    Some(t) => self.expr(t, None).ty.defaulted(),
                    None => Ty::BOOL,
                };
                for &c in ast.arena.switch_clause_ids(clauses) {
                    let SwitchClause::ExprCase { items, stmts } = ast.arena.switch_clauses[c] else {
                        continue;
                    };
                    for &item in ast.arena.exprs_list(items) {
                        self.expr(item, Some(&tag_ty));
                    }
                    self.push_scope(ast.arena.switch_clauses.span(c));
                    self.stmt_list(stmts);
                    self.pop_scope();
                }
                self.pop_scope();
            }
            Stmt::TypeSwitch {
                init,
                guard,
                clauses,
            } => {
                self.push_scope(span);
                if let Some(init) = init {
                    self.simple(init);
                }
                let x = self.expr(guard.x, None);
                for &c in ast.arena.switch_clause_ids(clauses) {
                    let SwitchClause::TypeCase { items, stmts } = ast.arena.switch_clauses[c] else {
                        continue;
                    };
                    let mut tys = Vec::new();
                    for item in ast.arena.type_case_elems(items) {
                        match *item {
                            TypeCaseElem::Type(t) => tys.push(self.resolve_type(t)),
                            TypeCaseElem::Nil => tys.push(Ty::Invalid),
                        }
                    }
                    self.push_scope(ast.arena.switch_clauses.span(c));
                    if let Some(b) = guard.bind {
                        let t = match tys.as_slice() {
                            [one] if one.is_valid() => one.clone(),
                            _ => x.ty.clone(),
                        };
                        self.declare(ast.str(b.sym), Local::var(t));
                    }
                    self.stmt_list(stmts);
                    self.pop_scope();
                }
                self.pop_scope();
            }
            Stmt::Select { clauses } => {
                for &c in ast.arena.comm_clause_ids(clauses) {
                    self.push_scope(ast.arena.comm_clauses.span(c));
                    let stmts = match ast.arena.comm_clauses[c] {
                        CommClause::Default { stmts } => stmts,
                        CommClause::Case { comm, stmts } => {
                            match comm {
                                CommStmt::Send { chan, value } => self.send(chan, value),
                                CommStmt::Recv { lhs, expr } => {
                                    let o = self.expr(expr, None);
                                    match lhs {
                                        Some(RangeLhs::Def(names)) => {
                                            for (i, n) in ast.arena.ident_names(names).iter().enumerate() {
                                                let t = if i == 0 { o.ty.clone() } else { Ty::BOOL };
                                                self.declare(ast.str(n.sym), Local::var(t));
                                            }
                                        }
                                        Some(RangeLhs::Assign(exprs)) => {
                                            for &e in ast.arena.exprs_list(exprs) {
                                                self.expr(e, None);
                                            }
                                        }
                                        None => {}
                                    }
                                }
                            }
                            stmts
                        }
                    };
                    self.stmt_list(stmts);
                    self.pop_scope();
                }
            }
        }
    }

    fn range_types(&mut self, ty: &Ty) -> (Ty, Ty) {
        match self.underlying(ty) {
            Ty::Slice(el) | Ty::Array(_, el) => (Ty::INT, *el),
            Ty::Pointer(p) => match self.underlying(&p) {
                Ty::Array(_, el) => (Ty::INT, *el),
                _ => (Ty::Invalid, Ty::Invalid),
            },
            Ty::Basic(k) if k.is_string() => (Ty::INT, Ty::Basic(BasicKind::Int32)),
            Ty::Basic(k) if k.is_integer() => (ty.defaulted(), Ty::Invalid),
            Ty::Map(k, v) => (*k, *v),
            Ty::Chan(_, el) => (*el, Ty::Invalid),
            _ => (Ty::Invalid, Ty::Invalid),
        }
    }

    fn send(&mut self, chan: ExprId, value: ExprId) {
        let c = self.expr(chan, None);
        let elem = match self.underlying(&c.ty) {
            Ty::Chan(_, el) => Some(*el),
            _ => None,
        };
        self.expr(value, elem.as_ref());
    }

    fn is_blank(&self, e: ExprId) -> bool {
        let ast = self.ast();
        matches!(ast.arena.exprs[e], Expr::Ident(s) if ast.str(s) == "_")
    }

    fn simple(&mut self, id: SimpleStmtId) {
        let ast = self.ast();
        match ast.arena.simple_stmts[id] {
            SimpleStmt::Empty => {}
            SimpleStmt::Expr(e) => {
                self.expr(e, None);
            }
            SimpleStmt::Send { chan, value } => self.send(chan, value),
            SimpleStmt::IncDec { expr, .. } => {
                self.expr(expr, None);
            }
            SimpleStmt::Assign { lhs, op, rhs } => {
                let l = ast.arena.exprs_list(lhs);
                let r = ast.arena.exprs_list(rhs);
                if op == AssignOp::Assign {
                    let lts: Vec<Ty> = l
                        .iter()
                        .map(|&x| {
                            if self.is_blank(x) {
                                Ty::Invalid
                            } else {
                                self.expr(x, None).ty
                            }
                        })
                        .collect();
                    if l.len() == r.len() {
                        for (&x, t) in r.iter().zip(lts.iter()) {
                            self.expr(x, Some(t).filter(|t| t.is_valid()));
                        }
                    } else {
                        for &x in r {
                            self.expr(x, None);
                        }
                    }
                } else {
                    let lt = l.first().map(|&x| self.expr(x, None).ty).unwrap_or_default();
                    let shift = matches!(op, AssignOp::ShlAssign | AssignOp::ShrAssign);
                    for &x in r {
                        self.expr(x, if shift { None } else { Some(&lt) });
                    }
                }
            }
            SimpleStmt::ShortVarDecl { names, values } => {
                let vals = ast.arena.exprs_list(values);
                let nms = ast.arena.ident_names(names);
                let tys: Vec<Ty> = if vals.len() == nms.len() {
                    vals.iter().map(|&v| self.expr(v, None).ty.defaulted()).collect()
                } else if vals.len() == 1 {
                    self.multi_value(vals[0], nms.len())
                } else {
                    for &v in vals {
                        self.expr(v, None);
                    }
                    vec![Ty::Invalid; nms.len()]
                };
                for (n, t) in nms.iter().zip(tys) {
                    let name = ast.str(n.sym);
                    if !self.declared_in_top(name) {
                        self.declare(name, Local::var(t));
                    }
                }
            }
        }
    }

    fn local_decl(&mut self, id: DeclId) {
        let ast = self.ast();
        let decl = ast.arena.decls[id];
        let specs = ast.arena.specs_list(decl.specs);
        match decl.kind {
            GenDeclKind::Import => {}
            GenDeclKind::Var => {
                for spec in specs {
                    let Spec::Value(v) = spec else { continue };
                    let names = ast.arena.ident_names(v.names);
                    let vals = ast.arena.exprs_list(v.values);
                    let tys: Vec<Ty> = if let Some(t) = v.typ {
                        let ty = self.resolve_type(t);
                        for &e in vals {
                            self.expr(e, Some(&ty));
                        }
                        vec![ty; names.len()]
                    } else if vals.len() == names.len() {
                        vals.iter().map(|&e| self.expr(e, None).ty.defaulted()).collect()
                    } else if vals.len() == 1 {
                        self.multi_value(vals[0], names.len())
                    } else {
                        vec![Ty::Invalid; names.len()]
                    };
                    for (n, t) in names.iter().zip(tys) {
                        self.declare(ast.str(n.sym), Local::var(t));
                    }
                }
            }
            GenDeclKind::Const => {
                let mut last: Option<ValueSpec> = None;
                for (si, spec) in specs.iter().enumerate() {
                    let Spec::Value(v) = *spec else { continue };
                    let repeated = v.values.is_empty();
                    if !repeated {
                        last = Some(v);
                    }
                    let Some(src) = last else { continue };
                    if repeated {
                        self.silent += 1;
                    }
                    self.const_ctx += 1;
                    let old_iota = self.iota.replace(si as i128);
                    let typ = src.typ.map(|t| self.resolve_type(t));
                    let vals = ast.arena.exprs_list(src.values);
                    let mut decls = Vec::new();
                    for (ni, n) in ast.arena.ident_names(v.names).iter().enumerate() {
                        let (ty, value) = match vals.get(ni) {
                            Some(&e) => {
                                let op = self.expr(e, typ.as_ref());
                                let value = op.const_value().cloned();
                                (typ.clone().unwrap_or(op.ty), value)
                            }
                            None => (typ.clone().unwrap_or_default(), None),
                        };
                        decls.push((n.sym, ty, value));
                    }
                    self.iota = old_iota;
                    self.const_ctx -= 1;
                    if repeated {
                        self.silent -= 1;
                    }
                    for (sym, ty, value) in decls {
                        self.declare(
                            ast.str(sym),
                            Local {
                                kind: ObjKind::Const,
                                ty,
                                value,
                            },
                        );
                    }
                }
            }
            GenDeclKind::Type => {
                for spec in specs {
                    let Spec::Type(t) = *spec else { continue };
                    let name = ast.str(t.name.sym);
                    let named = self.alloc_named(name, t, true);
                    let nid = named.id;
                    self.declare(
                        name,
                        Local {
                            kind: ObjKind::TypeName,
                            ty: Ty::Named(named),
                            value: None,
                        },
                    );
                    self.resolve_named(nid);
                }
            }
        }
    }
}

impl Local {
    fn var(ty: Ty) -> Self {
        Self {
            kind: ObjKind::Var,
            ty,
            value: None,
        }
    }

    fn type_param(name: &str) -> Self {
        Self {
            kind: ObjKind::TypeName,
            ty: Ty::TypeParam(Arc::from(name)),
            value: None,
        }
    }
}

// -------------------------------------------------------------------------
// Helpers
// -------------------------------------------------------------------------

/// Package name assumed for an import without an explicit name.
fn default_package_name(path: &str) -> String {
    let mut segs = path.rsplit('/');
    let last = segs.next().unwrap_or(path);
    let last = match segs.next() {
        Some(prev) if last.len() > 1 && last.starts_with('v') && last[1..].bytes().all(|b| b.is_ascii_digit()) => prev,
        _ => last,
    };
    let last = last.strip_prefix("go-").unwrap_or(last);
    let last = last.split('.').next().unwrap_or(last);
    last.replace('-', "_")
}

/// Base type name of a receiver: `T`, `*T`, `T[K]`, `*T[K]`.
fn receiver_base(a: &AstArena, t: TypeId) -> Option<(Symbol, bool, ListRef<TypeId>)> {
    match a.types[t] {
        Type::Named {
            pkg: None,
            name,
            args,
        } => Some((name.sym, false, args)),
        Type::Pointer(inner) => receiver_base(a, inner).map(|(s, _, args)| (s, true, args)),
        Type::Paren(inner) => receiver_base(a, inner),
        _ => None,
    }
}

/// Field name of an embedded field (`T`, `*T`, `pkg.T`).
fn embedded_name(a: &AstArena, t: TypeId) -> Option<Symbol> {
    match a.types[t] {
        Type::Named { name, .. } => Some(name.sym),
        Type::Pointer(inner) | Type::Paren(inner) => embedded_name(a, inner),
        _ => None,
    }
}

fn param_type(sig: &FuncTy, i: usize, ellipsis: bool) -> Option<Ty> {
    let n = sig.params.len();
    if sig.variadic && n > 0 && i >= n - 1 {
        let last = &sig.params[n - 1];
        if ellipsis {
            return Some(last.clone());
        }
        return match last {
            Ty::Slice(el) => Some((**el).clone()),
            _ => None,
        };
    }
    sig.params.get(i).cloned()
}

fn literal(kind: BasicLitKind, raw: &str) -> Operand {
    match kind {
        BasicLitKind::Int => Operand::maybe_const(
            Ty::Basic(BasicKind::UntypedInt),
            parse_int(raw).map(ConstValue::Int),
        ),
        BasicLitKind::Float => Operand::maybe_const(
            Ty::Basic(BasicKind::UntypedFloat),
            raw.replace('_', "").parse::<f64>().ok().map(ConstValue::Float),
        ),
        BasicLitKind::Imag => Operand::value(Ty::Basic(BasicKind::Complex128)),
        BasicLitKind::Char => Operand::maybe_const(
            Ty::Basic(BasicKind::UntypedRune),
            unquote::rune(raw).ok().map(|c| ConstValue::Int(c as i128)),
        ),
        BasicLitKind::String => Operand::maybe_const(
            Ty::Basic(BasicKind::UntypedString),
            unquote::string(raw).ok().map(ConstValue::String),
        ),
    }
}

/// Value of a Go integer literal (all bases, digit separators).
pub(crate) fn parse_int(raw: &str) -> Option<i128> {
    let s = raw.replace('_', "");
    let lower = s.to_ascii_lowercase();
    let (digits, radix) = if let Some(r) = lower.strip_prefix("0x") {
        (r.to_string(), 16)
    } else if let Some(r) = lower.strip_prefix("0b") {
        (r.to_string(), 2)
    } else if let Some(r) = lower.strip_prefix("0o") {
        (r.to_string(), 8)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (lower[1..].to_string(), 8)
    } else {
        (lower, 10)
    };
    i128::from_str_radix(&digits, radix).ok()
}

fn wider_untyped(a: &Ty, b: &Ty) -> Ty {
    fn rank(t: &Ty) -> u8 {
        match t {
            Ty::Basic(BasicKind::UntypedInt) => 1,
            Ty::Basic(BasicKind::UntypedRune) => 2,
            Ty::Basic(BasicKind::UntypedFloat) => 3,
            _ => 0,
        }
    }
    if rank(b) > rank(a) {
        b.clone()
    } else {
        a.clone()
    }
}

fn arith(op: BinaryOp, a: &ConstValue, b: &ConstValue) -> Option<ConstValue> {
    use BinaryOp::*;
    match (a, b) {
        (ConstValue::Int(x), ConstValue::Int(y)) => {
            let (x, y) = (*x, *y);
            let v = match op {
                Add => x.checked_add(y)?,
                Sub => x.checked_sub(y)?,
                Mul => x.checked_mul(y)?,
                Div => x.checked_div(y)?,
                Mod => x.checked_rem(y)?,
                And => x & y,
                Or => x | y,
                Xor => x ^ y,
                AndNot => x & !y,
                Shl => x.checked_shl(u32::try_from(y).ok()?)?,
                Shr => x.checked_shr(u32::try_from(y).ok()?)?,
                _ => return None,
            };
            Some(ConstValue::Int(v))
        }
        (ConstValue::String(x), ConstValue::String(y)) if op == Add => {
            let mut s = x.clone();
            s.extend_from_slice(y);
            Some(ConstValue::String(s))
        }
        _ => {
            let (x, y) = (a.as_float()?, b.as_float()?);
            let v = match op {
                Add => x + y,
                Sub => x - y,
                Mul => x * y,
                Div if y != 0.0 => x / y,
                _ => return None,
            };
            Some(ConstValue::Float(v))
        }
    }
}

fn compare(op: BinaryOp, a: &ConstValue, b: &ConstValue) -> Option<bool> {
    use std::cmp::Ordering;
    let ord = match (a, b) {
        (ConstValue::Int(x), ConstValue::Int(y)) => x.cmp(y),
        (ConstValue::String(x), ConstValue::String(y)) => x.cmp(y),
        (ConstValue::Bool(x), ConstValue::Bool(y)) => {
            return match op {
                BinaryOp::Eq => Some(x == y),
                BinaryOp::Ne => Some(x != y),
                _ => None,
            }
        }
        _ => a.as_float()?.partial_cmp(&b.as_float()?)?,
    };
    Some(match op {
        BinaryOp::Eq => ord == Ordering::Equal,
        BinaryOp::Ne => ord != Ordering::Equal,
        BinaryOp::Lt => ord == Ordering::Less,
        BinaryOp::Le => ord != Ordering::Greater,
        BinaryOp::Gt => ord == Ordering::Greater,
        BinaryOp::Ge => ord != Ordering::Less,
        _ => return None,
    })
}
