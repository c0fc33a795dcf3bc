use gomorph_syntax::ast::*;
use gomorph_syntax::{parse_str, print_expr, print_file, walk_exprs, Flow, Slot};
use pretty_assertions::assert_eq;

const SRC: &str = r#"package p

import "fmt"

type T struct {
	name string `json:"name"`
}

var greeting = "hello"

func f(t T) {
	if t.name == "x" {
		fmt.Println(greeting, T{name: "y"})
	}
	go func() {
		_ = "z"
	}()
}
"#;

#[test]
fn visits_values_and_bodies_in_source_order() {
    let mut ast = parse_str(SRC).unwrap();
    let mut strings = Vec::new();
    walk_exprs(&mut ast, |ast, c| {
        if let Expr::BasicLit(lit) = c.expr(ast) {
            if lit.kind == BasicLitKind::String {
                strings.push((ast.str(lit.raw).to_string(), c.slot, c.func_depth));
            }
        }
        Flow::Continue
    });

    let got: Vec<(&str, u32)> = strings.iter().map(|(s, _, d)| (s.as_str(), *d)).collect();
    // import paths and struct tags are not expressions
    assert_eq!(
        got,
        vec![("\"hello\"", 0), ("\"x\"", 1), ("\"y\"", 1), ("\"z\"", 2)]
    );
    assert!(matches!(strings[0].1, Slot::ValueSpec { is_const: false, .. }));
    assert_eq!(strings[1].1, Slot::BinaryRight(BinaryOp::Eq));
    assert_eq!(strings[2].1, Slot::CompositeValue);
    assert_eq!(strings[3].1, Slot::AssignRhs);
}

#[test]
fn parents_and_statements_are_reported() {
    let mut ast = parse_str(SRC).unwrap();
    let mut seen = None;
    walk_exprs(&mut ast, |ast, c| {
        if let Expr::Ident(s) = c.expr(ast) {
            if ast.str(s) == "greeting" && c.func_depth > 0 {
                seen = Some((c.parent.map(|p| print_expr(ast, p)), c.slot, c.index, c.stmt));
            }
        }
        Flow::Continue
    });
    let (parent, slot, index, stmt) = seen.expect("greeting visited");
    assert_eq!(
        parent.as_deref(),
        Some("fmt.Println(greeting, T{name: \"y\"})")
    );
    assert_eq!(slot, Slot::CallArg);
    assert_eq!(index, 0);
    assert!(stmt.is_some());
}

#[test]
fn replacement_is_visible_through_every_parent_link() {
    let mut ast = parse_str(SRC).unwrap();
    walk_exprs(&mut ast, |ast, c| match c.expr(ast) {
        Expr::BasicLit(lit) if ast.str(lit.raw) == "\"x\"" => {
            let raw = ast.intern("\"replaced\"");
            c.replace(
                ast,
                Expr::BasicLit(BasicLit {
                    kind: BasicLitKind::String,
                    raw,
                }),
            )
        }
        _ => Flow::Continue,
    });
    let out = print_file(&ast);
    assert!(out.contains("if t.name == \"replaced\" {"), "{out}");
    assert!(!out.contains("\"x\""));
}

#[test]
fn skip_prunes_children() {
    let mut ast = parse_str(SRC).unwrap();
    let mut visited = 0;
    walk_exprs(&mut ast, |ast, c| {
        visited += 1;
        if matches!(c.expr(ast), Expr::Call { .. }) {
            Flow::Skip
        } else {
            Flow::Continue
        }
    });

    let mut all = 0;
    walk_exprs(&mut ast, |_, _| {
        all += 1;
        Flow::Continue
    });
    assert!(visited < all);
}
