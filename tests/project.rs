use std::fs;
use std::path::Path;

use gomorph::mapfile::ContextMap;
use gomorph::walker::source_files;
use gomorph::{check, parse_pipeline, passes, transform, Error, RunConfig, TransformOptions};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

const MAIN: &str = r#"package main

import (
	"encoding/json"
	"example.com/other"
	"fmt"
	"internal/util"
)

type Cfg struct {
	Debug bool
	Name string
}

func main() {
	c := Cfg{Debug: true, Name: "x"}
	if c.Debug {
		fmt.Println(util.Hello(), other.X, json.Valid(nil))
	}
}
"#;

const UTIL: &str = r#"package util

func Hello() string {
	return "hello world"
}
"#;

/// A small module: two packages, a non-source file, a test file, a vendor
/// directory and one file that does not parse.
fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "go.mod", "module example.com/proj\n\ngo 1.22\n");
    write(root, "main.go", MAIN);
    write(root, "internal/util/util.go", UTIL);
    write(root, "internal/util/util_test.go", "package util\n");
    write(root, "vendor/dep/dep.go", "package dep\n");
    write(root, "broken.go", "package main\n\nfunc {\n");
    write(root, "README.md", "# proj\n\nnot go\n");
    dir
}

fn run_config(input: &Path, output: &Path) -> RunConfig {
    RunConfig::new(input, output)
}

#[test]
fn walker_skips_tests_vendor_and_output() {
    let dir = project();
    let root = dir.path();
    write(root, "out/stale.go", "package stale\n");

    let files = source_files(root, &TransformOptions::default(), &root.join("out")).unwrap();
    let rel: Vec<String> = files
        .iter()
        .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
        .collect();
    assert_eq!(rel, vec!["broken.go", "internal/util/util.go", "main.go"]);
}

#[test]
fn check_reports_unparsable_files() {
    let dir = project();
    let report = check(dir.path(), TransformOptions::default()).unwrap();
    assert_eq!(report.parsed, 2);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].ends_with("broken.go"));
}

#[test]
fn transform_writes_a_mirrored_tree() {
    let dir = project();
    let out = TempDir::new().unwrap();
    let mut run = run_config(dir.path(), out.path());
    run.map_file_path = Some(out.path().join("map.json"));

    let summary = transform(run, TransformOptions::default(), passes::all()).unwrap();
    assert_eq!(summary.module, "example.com/proj");
    assert_eq!(summary.walk.failed.len(), 1);
    assert_eq!(summary.output.imports_rewritten, 1);

    let main = fs::read_to_string(out.path().join("main.go")).unwrap();
    assert!(main.contains("\"example.com/proj/internal/util\""), "{main}");
    assert!(main.contains("\"fmt\""));
    assert!(main.contains("\"encoding/json\""));
    assert!(main.contains("\"example.com/other\""));
    assert!(main.contains("CfgFlags{flags: FlagMain_Cfg_Debug, Name: \"x\"}"), "{main}");
    assert!(main.contains("(c.flags & FlagMain_Cfg_Debug) != 0"), "{main}");

    let util = fs::read_to_string(out.path().join("internal/util/util.go")).unwrap();
    assert!(!util.contains("\"hello world\""), "{util}");
    assert!(util.contains("string([]byte{104, 101, 108, 108, 111,"), "{util}");

    // everything else is copied byte for byte
    for rel in [
        "README.md",
        "go.mod",
        "broken.go",
        "vendor/dep/dep.go",
        "internal/util/util_test.go",
    ] {
        assert_eq!(
            fs::read(out.path().join(rel)).unwrap(),
            fs::read(dir.path().join(rel)).unwrap(),
            "{rel}"
        );
    }

    let map = ContextMap::load(&out.path().join("map.json")).unwrap();
    assert_eq!(map.structs.len(), 1);
    assert_eq!(map.structs[0].original_name, "Cfg");
    assert_eq!(map.structs[0].storage_type.as_deref(), Some("uint8"));
}

#[test]
fn no_obfuscate_keeps_strings() {
    let dir = project();
    let out = TempDir::new().unwrap();
    let mut run = run_config(dir.path(), out.path());
    run.obfuscate = false;

    transform(run, TransformOptions::default(), passes::all()).unwrap();
    let util = fs::read_to_string(out.path().join("internal/util/util.go")).unwrap();
    assert!(util.contains("\"hello world\""), "{util}");
}

#[test]
fn output_inside_input_is_not_walked() {
    let dir = project();
    let out = dir.path().join("build");
    let run = run_config(dir.path(), &out);

    transform(run.clone(), TransformOptions::default(), passes::all()).unwrap();
    // a second run must not pick up the first run's output
    let summary = transform(run, TransformOptions::default(), passes::all()).unwrap();
    assert_eq!(summary.walk.parsed, 2);
    assert!(!out.join("build").exists());
}

#[test]
fn dry_run_touches_nothing() {
    let dir = project();
    let out = dir.path().join("never");
    let mut run = run_config(dir.path(), &out);
    run.dry_run = true;
    run.map_file_path = Some(dir.path().join("map.json"));

    let summary = transform(run, TransformOptions::default(), passes::all()).unwrap();
    assert!(!out.exists());
    assert!(!dir.path().join("map.json").exists());
    assert_eq!(summary.output.written.len(), 2);
    assert!(summary.metrics.files_written >= 2);
}

#[test]
fn missing_manifest_fails_before_any_output() {
    let dir = project();
    fs::remove_file(dir.path().join("go.mod")).unwrap();
    let out = TempDir::new().unwrap();
    let target = out.path().join("tree");

    let err = transform(
        run_config(dir.path(), &target),
        TransformOptions::default(),
        passes::all(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::ModuleManifestMissing(_)));
    assert_eq!(err.exit_code(), 2);
    assert!(!target.exists());
}

#[test]
fn resumed_registry_reproduces_the_output() {
    let dir = project();
    let first = TempDir::new().unwrap();
    let mut run = run_config(dir.path(), first.path());
    let map_path = first.path().join("map.json");
    run.map_file_path = Some(map_path.clone());
    transform(run, TransformOptions::default(), parse_pipeline("all").unwrap()).unwrap();

    let second = TempDir::new().unwrap();
    let mut run = run_config(dir.path(), second.path());
    run.resume_map_path = Some(map_path);
    let summary = transform(run, TransformOptions::default(), parse_pipeline("all").unwrap()).unwrap();
    assert_eq!(summary.structs.len(), 1);

    for rel in ["main.go", "internal/util/util.go"] {
        assert_eq!(
            fs::read_to_string(second.path().join(rel)).unwrap(),
            fs::read_to_string(first.path().join(rel)).unwrap(),
            "{rel}"
        );
    }
}

#[test]
fn map_file_json_round_trips() {
    let dir = project();
    let out = TempDir::new().unwrap();
    let mut run = run_config(dir.path(), out.path());
    run.map_file_path = Some(out.path().join("map.json"));
    transform(run, TransformOptions::default(), passes::all()).unwrap();

    let map = ContextMap::load(&out.path().join("map.json")).unwrap();
    let again = ContextMap::from_json(&map.to_json().unwrap()).unwrap();
    assert_eq!(again, map);
    let records = again.records().unwrap();
    assert_eq!(records[0].flag_for("Debug"), Some("FlagMain_Cfg_Debug"));
}

#[test]
fn config_file_overrides_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gomorph.json");
    fs::write(&path, r#"{"shortStringMinLen": 32, "excludeDirs": ["third_party"]}"#).unwrap();
    let opts = TransformOptions::load(&path).unwrap();
    assert_eq!(opts.short_string_min_len, 32);
    assert_eq!(opts.exclude_dirs, vec!["third_party".to_string()]);
    assert_eq!(opts.jump_table_min_chain, 3);

    fs::write(&path, "{not json").unwrap();
    assert_eq!(TransformOptions::load(&path).unwrap_err().exit_code(), 2);
}
