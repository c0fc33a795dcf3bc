use gomorph_syntax::ast::*;
use gomorph_syntax::{parse_str, print_expr, print_file};
use pretty_assertions::assert_eq;

const CANONICAL: &[&str] = &[
    r#"package main

import "fmt"

type Config struct {
	Debug bool
	Name string
}

func main() {
	c := Config{Debug: true, Name: "x"}
	if c.Debug && len(c.Name) > 0 {
		fmt.Println(c.Name)
	} else if !c.Debug {
		return
	}
	for i := 0; i < 3; i++ {
		fmt.Println(i*2 + 1)
	}
}
"#,
    r#"// Package p does things.
package p

// Answer is the answer.
const Answer = 42

var (
	a = 1
	b = "two"
)

func f(x int) (int, error) {
	// inside
	switch x {
	case 1, 2:
		return x, nil
	default:
		return 0, nil
	}
}
"#,
    r#"package p

type List[T any] struct {
	items []T
}

func (l *List[T]) Push(v T) {
	l.items = append(l.items, v)
}

func kind(v any) string {
	switch t := v.(type) {
	case int:
		return "int"
	case nil:
		return "nil"
	default:
		_ = t
		return "other"
	}
}
"#,
    r#"package p

import (
	"os"
	str "strings"
)

func run(m map[string]int, ch chan int, done <-chan struct{}) {
	defer os.Exit(0)
	for k, v := range m {
		_ = str.Repeat(k, v)
	}
	select {
	case v := <-ch:
		_ = v
	case <-done:
		return
	default:
	}
	go func() {
		ch <- 1
	}()
}
"#,
];

#[test]
fn canonical_sources_print_unchanged() {
    for src in CANONICAL {
        let ast = parse_str(src).expect("parses");
        assert_eq!(print_file(&ast), *src);
    }
}

#[test]
fn printing_is_idempotent_for_irregular_spacing() {
    let src = "package p\nfunc  f( a int ,b string )  {\n x:=a+ 1\n  _ = x\n}\n";
    let once = print_file(&parse_str(src).unwrap());
    let twice = print_file(&parse_str(&once).unwrap());
    assert_eq!(once, twice);
    assert!(once.contains("func f(a int, b string) {"), "{once}");
    assert!(once.contains("\tx := a + 1\n"), "{once}");
}

#[test]
fn unnamed_parameters_stay_types() {
    let sigs = [
        "func f() ([]int, error, interface{})",
        "func f(*T, error, struct{})",
        "func f(string, []byte)",
        "func f(error, *T) int",
        "func f(int, ...string)",
        "func f(a, b int, error, x interface{})",
        "func f(a, b int, rest ...string) (n int, err error)",
    ];
    for sig in sigs {
        let src = format!("package p\n\n{sig} {{\n}}\n");
        let out = print_file(&parse_str(&src).expect("parses"));
        assert!(out.contains(sig), "{sig} printed as:\n{out}");
    }

    let src = "package p\n\ntype H func(string, []byte) error\n";
    let out = print_file(&parse_str(src).unwrap());
    assert_eq!(out, src);
}

fn first_var_value(ast: &Ast) -> ExprId {
    for d in ast.decls() {
        let TopLevelDecl::Decl(id) = *d else { continue };
        for spec in ast.arena.specs_list(ast.arena.decls[id].specs) {
            if let Spec::Value(v) = spec {
                return ast.arena.exprs_list(v.values)[0];
            }
        }
    }
    panic!("no var in file")
}

#[test]
fn binary_spacing_follows_gofmt() {
    let cases = [
        "a + b*c",
        "a*b + c*d",
        "x == 1 || y == 2",
        "-x + 1",
        "f(a+b, c)",
        "a[i+1]",
        "(a + b) * c",
        "s[1:len(s)-1]",
    ];
    for want in cases {
        let src = format!("package p\nvar v = {want}\n");
        let ast = parse_str(&src).unwrap();
        assert_eq!(print_expr(&ast, first_var_value(&ast)), want);
    }
}

#[test]
fn synthesized_operands_get_parentheses() {
    let mut ast = parse_str("package p\n").unwrap();
    let a = ast.ident("a");
    let b = ast.ident("b");
    let c = ast.ident("c");
    let sum = ast.arena.new_expr(Expr::Binary {
        left: a,
        op: BinaryOp::Add,
        right: b,
    });
    let prod = ast.arena.new_expr(Expr::Binary {
        left: sum,
        op: BinaryOp::Mul,
        right: c,
    });
    assert_eq!(print_expr(&ast, prod), "(a + b) * c");

    let not = ast.arena.new_expr(Expr::Unary {
        op: UnaryOp::Not,
        expr: sum,
    });
    assert_eq!(print_expr(&ast, not), "!(a + b)");
}

#[test]
fn syntax_errors_are_reported() {
    for src in ["package p\nfunc (", "package p\nvar = 1\n", "func main() {}\n"] {
        let err = parse_str(src).unwrap_err();
        assert!(!err.diags.is_empty(), "{src:?}");
    }
}

#[test]
fn literal_raw_text_is_kept() {
    let src = "package p\n\nvar x = 0x_FF + 1e3 + 'a'\n\nvar s = `raw\\n`\n";
    let ast = parse_str(src).unwrap();
    assert_eq!(print_file(&ast), src);
}
