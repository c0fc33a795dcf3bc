use gomorph::events::SkipReason;
use gomorph::{parse_pipeline, transform_sources, Error, SourceOutput, TransformOptions};
use pretty_assertions::assert_eq;

/// Source text with every whitespace character removed, so assertions do not
/// depend on indentation or line breaks.
fn squash(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

fn run(passes: &str, files: &[(&str, &str)]) -> SourceOutput {
    let pipeline = parse_pipeline(passes).expect("known passes");
    transform_sources(files, pipeline, TransformOptions::default(), Vec::new())
        .unwrap_or_else(|e| panic!("transform failed: {e}"))
}

fn run_one(passes: &str, src: &str) -> (String, SourceOutput) {
    let out = run(passes, &[("a.go", src)]);
    let text = out.file("a.go").expect("printed").to_string();
    (text, out)
}

fn assert_contains(haystack: &str, needle: &str) {
    assert!(
        squash(haystack).contains(&squash(needle)),
        "expected `{needle}` in:\n{haystack}"
    );
}

const FIELD_PASSES: &str = "struct-flags,field-read,if-condition,field-write";

const SINGLE_BOOL: &str = r#"package p

type Cfg struct {
	Debug bool
	Name string
}

func g() {}

func f() {
	c := Cfg{Debug: true, Name: "x"}
	if c.Debug {
		g()
	}
}
"#;

#[test]
fn single_bool_struct_is_packed() {
    let (out, res) = run_one(FIELD_PASSES, SINGLE_BOOL);

    assert_contains(&out, "const ( FlagP_Cfg_Debug uint8 = 1 << 0 )");
    assert_contains(&out, "type CfgFlags struct { flags uint8 Name string }");
    assert_contains(&out, r#"c := CfgFlags{flags: FlagP_Cfg_Debug, Name: "x"}"#);
    assert_contains(&out, "if (c.flags & FlagP_Cfg_Debug) != 0 { g() }");
    assert!(!out.contains("Debug bool"));

    assert_eq!(res.structs.len(), 1);
    let rec = &res.structs[0];
    assert_eq!(rec.original_name, "Cfg");
    assert_eq!(rec.new_name, "CfgFlags");
    assert_eq!(rec.flag_for("Debug"), Some("FlagP_Cfg_Debug"));
}

#[test]
fn negated_condition_tests_for_a_clear_bit() {
    let src = r#"package p

type Cfg struct {
	Debug bool
	Name string
}

func g() {}

func f(c Cfg) {
	if !c.Debug {
		g()
	}
}
"#;
    let (out, _) = run_one(FIELD_PASSES, src);
    assert_contains(&out, "if (c.flags & FlagP_Cfg_Debug) == 0 { g() }");
}

#[test]
fn literal_assignments_become_bit_operations() {
    let src = r#"package p

type Cfg struct {
	Debug bool
	Name string
}

func other() bool { return true }

func f(c *Cfg) {
	c.Debug = true
	c.Debug = false
	c.Debug = other()
}
"#;
    let (out, res) = run_one(FIELD_PASSES, src);
    assert_contains(&out, "c.flags |= FlagP_Cfg_Debug");
    assert_contains(&out, "c.flags &^= FlagP_Cfg_Debug");
    assert_contains(&out, "c.Debug = other()");

    let m = res.metrics.pass("FieldWriteToBitwise").expect("write metrics");
    assert_eq!(m.changed, 2);
    assert_eq!(m.skipped_for(SkipReason::NonLiteralRhs), 1);
}

#[test]
fn storage_width_follows_field_count() {
    fn struct_with(n: usize) -> String {
        let mut src = String::from("package p\n\ntype Wide struct {\n");
        for i in 0..n {
            src.push_str(&format!("\tF{i} bool\n"));
        }
        src.push_str("}\n");
        src
    }

    let (nine, _) = run_one("struct-flags", &struct_with(9));
    assert_contains(&nine, "type WideFlags struct { flags uint16 }");
    assert_contains(&nine, "FlagP_Wide_F8 uint16 = 1 << 8");

    let (many, _) = run_one("struct-flags", &struct_with(33));
    assert_contains(&many, "type WideFlags struct { flags uint64 }");
    assert_contains(&many, "FlagP_Wide_F32 uint64 = 1 << 32");
}

#[test]
fn too_many_bools_is_an_error() {
    let mut src = String::from("package p\n\ntype Huge struct {\n");
    for i in 0..65 {
        src.push_str(&format!("\tF{i} bool\n"));
    }
    src.push_str("}\n");
    let err = transform_sources(
        &[("a.go", &src)],
        parse_pipeline("struct-flags").unwrap(),
        TransformOptions::default(),
        Vec::new(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::UnsupportedWidth { count: 65, .. }));
    assert_eq!(err.exit_code(), 5);
}

#[test]
fn generic_structs_are_left_alone() {
    let src = r#"package p

type Box[T any] struct {
	Set bool
	Val T
}
"#;
    let (out, res) = run_one("struct-flags", src);
    assert_contains(&out, "type Box[T any] struct { Set bool Val T }");
    assert!(res.structs.is_empty());
    let m = res.metrics.pass("StructOfBoolsToFlags").expect("metrics");
    assert_eq!(m.skipped_for(SkipReason::GenericStruct), 1);
}

#[test]
fn positional_literal_of_packed_struct_is_rejected() {
    let src = r#"package p

type Cfg struct {
	Debug bool
	Name string
}

var c = Cfg{true, "x"}
"#;
    let err = transform_sources(
        &[("a.go", src)],
        parse_pipeline("struct-flags").unwrap(),
        TransformOptions::default(),
        Vec::new(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), "pass-internal");
    assert_eq!(err.pass(), Some("StructOfBoolsToFlags"));
    assert_eq!(err.exit_code(), 5);
}

#[test]
fn named_string_type_survives_obfuscation() {
    let src = r#"package p

type LogType string

var L LogType = "info"
"#;
    let (out, _) = run_one("string-obfuscate", src);
    assert_contains(&out, "var L LogType = LogType([]byte{105, 110, 102, 111})");

    let (again, res) = run_one("string-obfuscate", &out);
    assert_eq!(again, out);
    let m = res.metrics.pass("StringLiteralObfuscate").expect("metrics");
    assert_eq!(m.changed, 0);
    assert_eq!(m.skipped_for(SkipReason::AlreadyObfuscated), 1);
}

#[test]
fn short_and_deny_listed_strings_stay_readable() {
    let src = r#"package p

func f() []string {
	return []string{"ab", "json", "payload"}
}
"#;
    let (out, res) = run_one("string-obfuscate", src);
    assert_contains(&out, r#""ab""#);
    assert_contains(&out, r#""json""#);
    assert!(!out.contains(r#""payload""#));

    let m = res.metrics.pass("StringLiteralObfuscate").expect("metrics");
    assert_eq!(m.changed, 1);
    assert_eq!(m.skipped_for(SkipReason::ShortString), 1);
    assert_eq!(m.skipped_for(SkipReason::DenyListed), 1);
}

#[test]
fn string_consts_become_vars() {
    let src = r#"package p

const Greeting = "hello there"

func f() string {
	return Greeting
}
"#;
    let (out, _) = run_one("string-obfuscate", src);
    assert!(!out.contains("const Greeting"), "{out}");
    assert_contains(&out, "var Greeting = string([]byte{");
}

#[test]
fn import_paths_and_tags_are_prohibited_zones() {
    let src = r#"package p

import "config"

type User struct {
	Name string `json:"name"`
}

var _ = config.Load
"#;
    let (out, res) = run_one("all", src);
    assert_contains(&out, r#"import "config""#);
    assert_contains(&out, r#"Name string `json:"name"`"#);

    let m = res.metrics.pass("StringLiteralObfuscate").expect("metrics");
    assert_eq!(m.skipped_for(SkipReason::ProhibitedZone), 2);
}

const LADDER: &str = r#"package p

func f(v int) {
	if v == 1 {
		println("one")
	} else if v == 2 {
		println("two")
	} else if v == 3 {
		println("three")
	} else {
		println("other")
	}
}
"#;

#[test]
fn if_ladder_becomes_package_table() {
    let (out, res) = run_one("jump-table", LADDER);
    assert_contains(
        &out,
        r#"var table1 = map[int]func(){
	1: func() { println("one") },
	2: func() { println("two") },
	3: func() { println("three") },
}"#,
    );
    assert_contains(&out, r#"if fn, ok := table1[v]; ok { fn() } else { println("other") }"#);
    // the table is declared ahead of the function using it
    assert!(out.find("var table1").unwrap() < out.find("func f(").unwrap());

    let m = res.metrics.pass("IfChainToJumpTable").expect("metrics");
    assert_eq!(m.changed, 1);
}

#[test]
fn ladder_over_locals_gets_a_local_table() {
    let src = r#"package p

func f(v int) int {
	n := 0
	if v == 1 {
		n = 10
	} else if v == 2 {
		n = 20
	} else if v == 3 {
		n = 30
	}
	return n
}
"#;
    let (out, _) = run_one("jump-table", src);
    assert!(!out.contains("var table1"), "{out}");
    assert_contains(&out, "table1 := map[int]func(){ 1: func() { n = 10 },");
    assert_contains(&out, "if fn, ok := table1[v]; ok { fn() }");
}

#[test]
fn unsafe_ladders_are_detected_not_rewritten() {
    let src = r#"package p

func short(v int) {
	if v == 1 {
		println("one")
	} else if v == 2 {
		println("two")
	}
}

func dup(v int) {
	if v == 1 {
		println("a")
	} else if v == 1 {
		println("b")
	} else if v == 3 {
		println("c")
	}
}

func escapes(v int) int {
	if v == 1 {
		return 10
	} else if v == 2 {
		return 20
	} else if v == 3 {
		return 30
	}
	return 0
}
"#;
    let (out, res) = run_one("jump-table", src);
    assert!(!out.contains("table1"), "{out}");

    let m = res.metrics.pass("IfChainToJumpTable").expect("metrics");
    assert_eq!(m.changed, 0);
    assert_eq!(m.detected, 3);
    assert_eq!(m.skipped_for(SkipReason::ChainTooShort), 1);
    assert_eq!(m.skipped_for(SkipReason::DuplicateKey), 1);
    assert_eq!(m.skipped_for(SkipReason::ControlFlowEscape), 1);
}

#[test]
fn ladders_under_an_init_statement_stay_in_scope() {
    let src = r#"package p

func g(n int) {}

func shadowed(v int) {
	if v := v + 1; v == 1 {
		g(v)
	} else if v == 2 {
		g(v)
	} else if v == 3 {
		g(v)
	} else if v == 4 {
		g(v)
	}
}

func headed(v int) {
	if x := 1; v == x {
		g(0)
	} else if v == 2 {
		g(2)
	} else if v == 3 {
		g(3)
	}
}
"#;
    let (out, res) = run_one("jump-table", src);
    assert!(!out.contains("table1"), "{out}");
    assert_contains(&out, "if v := v + 1; v == 1 { g(v) } else if v == 2 { g(v) }");

    let m = res.metrics.pass("IfChainToJumpTable").expect("metrics");
    assert_eq!(m.changed, 0);
    assert_eq!(m.detected, 2);
    assert_eq!(m.skipped_for(SkipReason::ScopedInit), 2);
    assert_eq!(m.skipped_for(SkipReason::ChainTooShort), 0);
}

const STRING_LADDER: &str = r#"package p

func f(v string) int {
	n := 0
	if v == "alpha" {
		n = 1
	} else if v == "bravo" {
		n = 2
	} else if v == "charlie" {
		n = 3
	}
	return n
}
"#;

#[test]
fn obfuscated_string_keys_still_form_a_table() {
    let (out, res) = run_one("all", STRING_LADDER);
    assert_contains(&out, "map[string]func(){");
    assert_contains(&out, "string([]byte{97, 108, 112, 104, 97}): func() { n = 1 }");
    assert_contains(&out, "if fn, ok := table1[v]; ok { fn() }");
    assert!(!out.contains("v == string("), "{out}");

    let m = res.metrics.pass("IfChainToJumpTable").expect("metrics");
    assert_eq!(m.changed, 1);
}

#[test]
fn duplicate_obfuscated_keys_are_detected() {
    let src = STRING_LADDER.replace("\"bravo\"", "\"alpha\"");
    let (out, res) = run_one("all", &src);
    assert!(!out.contains("table1"), "{out}");
    let m = res.metrics.pass("IfChainToJumpTable").expect("metrics");
    assert_eq!(m.skipped_for(SkipReason::DuplicateKey), 1);
}

#[test]
fn every_pass_is_idempotent() {
    let inputs = [SINGLE_BOOL, LADDER];
    for alias in gomorph::pipeline::aliases() {
        for src in inputs {
            let (once, _) = run_one(alias, src);
            let (twice, _) = run_one(alias, &once);
            assert_eq!(twice, once, "pass {alias} is not idempotent");
        }
    }
}

#[test]
fn whole_pipeline_is_idempotent() {
    let (once, _) = run_one("all", SINGLE_BOOL);
    let (twice, _) = run_one("all", &once);
    assert_eq!(twice, once);
}

#[test]
fn files_of_one_package_share_the_rename() {
    let a = r#"package p

type Cfg struct {
	Debug bool
}
"#;
    let b = r#"package p

func f(c *Cfg) bool {
	return c.Debug
}
"#;
    let out = run(FIELD_PASSES, &[("a.go", a), ("b.go", b)]);
    let b_out = out.file("b.go").expect("b printed");
    assert_contains(b_out, "func f(c *CfgFlags) bool");
    assert_contains(b_out, "return (c.flags & FlagP_Cfg_Debug) != 0");

    // constants are emitted once per package
    let a_out = out.file("a.go").expect("a printed");
    assert!(a_out.contains("FlagP_Cfg_Debug uint8"));
    assert!(!b_out.contains("FlagP_Cfg_Debug uint8"));
}

#[test]
fn unknown_pass_is_a_config_error() {
    let err = parse_pipeline("struct-flags,nope").err().expect("unknown pass");
    assert_eq!(err.kind(), "config");
    assert_eq!(err.exit_code(), 2);
    assert!(err.to_string().contains("nope"));
}
