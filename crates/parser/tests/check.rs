use gomorph_syntax::ast::*;
use gomorph_syntax::check::{
    check_file, check_package, BasicKind, ConstValue, ObjKind, SelectionKind, Ty, TypeInfo,
};
use gomorph_syntax::parse_str;
use gomorph_syntax::print_expr;
use gomorph_syntax::walk::{Visitor, Walk};

/// Every expression printed next to its id, so tests can look nodes up by text.
fn exprs_by_text(ast: &Ast) -> Vec<(String, ExprId)> {
    ast.arena
        .exprs
        .ids()
        .map(|id| (print_expr(ast, id), id))
        .collect()
}

fn find(ast: &Ast, text: &str) -> ExprId {
    exprs_by_text(ast)
        .into_iter()
        .find(|(t, _)| t == text)
        .map(|(_, id)| id)
        .unwrap_or_else(|| panic!("no expression `{text}`"))
}

fn checked(src: &str) -> (Ast, TypeInfo) {
    let ast = parse_str(src).expect("parses");
    let info = check_file(&ast);
    (ast, info)
}

#[test]
fn constants_fold_across_declarations() {
    let (ast, info) = checked(
        r#"package p

const (
	A = 1 << iota
	B
	C
)

const Name = "ab" + "cd"

const Size = len(Name) * C

var arr [Size]int
"#,
    );
    assert!(info.diagnostics.is_empty(), "{:?}", info.diagnostics);
    let size = find(&ast, "len(Name) * C");
    assert_eq!(info.value_of(size), Some(&ConstValue::Int(16)));
    let name = find(&ast, "\"ab\" + \"cd\"");
    assert_eq!(info.value_of(name), Some(&ConstValue::String(b"abcd".to_vec())));

    let deps = &info.package.const_deps;
    assert!(deps.contains("Name"));
    assert!(deps.contains("C"));
    assert!(deps.contains("Size"));
    assert!(!deps.contains("A"));
}

#[test]
fn untyped_literals_record_their_context_type() {
    let (ast, info) = checked(
        r#"package p

type Label string

func use(l Label, b []byte) {}

func f() {
	var l Label = "x"
	use("y", nil)
	if l == "z" {
	}
	s := "w"
	_ = s
}
"#,
    );
    let label = |id| match info.expected.get(&id) {
        Some(Ty::Named(n)) => n.name.to_string(),
        other => format!("{other:?}"),
    };
    assert_eq!(label(find(&ast, "\"x\"")), "Label");
    assert_eq!(label(find(&ast, "\"y\"")), "Label");
    assert_eq!(label(find(&ast, "\"z\"")), "Label");
    assert!(!info.expected.contains_key(&find(&ast, "\"w\"")));

    let w = find(&ast, "\"w\"");
    assert_eq!(
        info.types[&w].ty,
        Ty::Basic(BasicKind::UntypedString),
        "short var decl keeps the literal untyped"
    );
}

#[test]
fn field_selections_resolve_through_embedding_and_pointers() {
    let (ast, info) = checked(
        r#"package p

type Base struct {
	on bool
}

type Outer struct {
	*Base
	name string
}

func (o *Outer) Name() string { return o.name }

func f(o *Outer) bool {
	_ = o.Name()
	return o.on
}
"#,
    );
    let on = info.selections[&find(&ast, "o.on")].clone();
    assert_eq!(on.kind, SelectionKind::Field);
    assert!(on.promoted);
    assert!(on.indirect);
    assert_eq!(on.recv.as_ref().map(|n| &*n.name), Some("Base"));
    assert_eq!(on.ty, Ty::BOOL);

    let name = info.selections[&find(&ast, "o.name")].clone();
    assert!(!name.promoted);
    assert_eq!(name.recv.as_ref().map(|n| &*n.name), Some("Outer"));

    let method = info.selections[&find(&ast, "o.Name")].clone();
    assert_eq!(method.kind, SelectionKind::Method);
}

#[test]
fn identifier_uses_distinguish_locals_from_package_objects() {
    let (ast, info) = checked(
        r#"package p

var counter int

func f(n int) int {
	counter++
	m := n
	return m
}
"#,
    );
    let mut seen = Vec::new();
    for (text, id) in exprs_by_text(&ast) {
        if let Some(obj) = info.uses.get(&id) {
            seen.push((text, obj.kind, obj.local));
        }
    }
    assert!(seen.contains(&("counter".into(), ObjKind::Var, false)));
    assert!(seen.contains(&("n".into(), ObjKind::Var, true)));
    assert!(seen.contains(&("m".into(), ObjKind::Var, true)));
}

#[test]
fn package_spans_files_and_named_types_are_shared() {
    let a = parse_str("package p\n\ntype T struct {\n\tok bool\n}\n").unwrap();
    let b = parse_str("package p\n\nfunc g(t T) bool {\n\treturn t.ok\n}\n").unwrap();
    let infos = check_package(&[&a, &b]);
    assert_eq!(infos.len(), 2);
    assert!(infos[1].diagnostics.is_empty(), "{:?}", infos[1].diagnostics);

    let sel = infos[1].selections[&find(&b, "t.ok")].clone();
    let recv = sel.recv.expect("declared type");
    let nt = infos[1].named_type(&recv).expect("named type");
    assert_eq!(nt.file, 0);
    assert!(matches!(nt.underlying, Ty::Struct(_)));
}

#[test]
fn comma_ok_and_range_declare_typed_locals() {
    let (ast, info) = checked(
        r#"package p

func f(m map[string]bool, xs []int, v any) {
	b, ok := m["k"]
	_, _ = b, ok
	for i, x := range xs {
		_, _ = i, x
	}
	switch t := v.(type) {
	case string:
		_ = t
	}
}
"#,
    );
    assert!(info.diagnostics.is_empty(), "{:?}", info.diagnostics);
    let ty_of = |text: &str| {
        exprs_by_text(&ast)
            .into_iter()
            .filter(|(t, _)| t == text)
            .find_map(|(_, id)| info.type_of(id).cloned())
    };
    assert_eq!(ty_of("b"), Some(Ty::BOOL));
    assert_eq!(ty_of("ok"), Some(Ty::BOOL));
    assert_eq!(ty_of("x"), Some(Ty::INT));
    assert_eq!(ty_of("t"), Some(Ty::STRING));
}

#[test]
fn undefined_names_are_diagnosed() {
    let (_, info) = checked("package p\n\nfunc f() {\n\t_ = missing\n}\n");
    assert_eq!(info.diagnostics.len(), 1);
    assert!(info.diagnostics[0].message.contains("missing"));

    let (_, dot) = checked("package p\n\nimport . \"strings\"\n\nvar _ = ToUpper(\"x\")\n");
    assert!(dot.diagnostics.is_empty(), "dot imports hide unknown names");
}

#[test]
fn imported_identifiers_are_opaque() {
    let (ast, info) = checked(
        "package p\n\nimport \"strings\"\n\nvar s = strings.ToUpper(\"x\")\n",
    );
    assert!(info.diagnostics.is_empty());
    let pkg = find(&ast, "strings");
    assert_eq!(info.uses[&pkg].kind, ObjKind::Package);
    assert!(info.type_of(find(&ast, "strings.ToUpper(\"x\")")).is_none());
}

#[derive(Default)]
struct Lits(Vec<ExprId>);

impl<'ast> Visitor<'ast> for Lits {
    fn visit_expr(&mut self, a: &'ast AstArena, id: ExprId) {
        if matches!(a.exprs[id], Expr::BasicLit(_)) {
            self.0.push(id);
        }
        a.exprs[id].walk(a, self);
    }
}

#[test]
fn every_literal_gets_a_type() {
    let (ast, info) = checked(
        r#"package p

var table = map[string][]int{"a": {1, 2}, "b": nil}

func f() {
	x := []struct{ n int }{{1}, {n: 2}}
	_ = x
}
"#,
    );
    let mut lits = Lits::default();
    ast.file.walk(&ast.arena, &mut lits);
    assert!(!lits.0.is_empty());
    for id in lits.0 {
        assert!(info.types.contains_key(&id), "{}", print_expr(&ast, id));
    }
}
