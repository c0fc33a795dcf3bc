use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gomorph::pipeline::aliases;
use gomorph::{parse_pipeline, transform_sources, TransformOptions};
use gomorph_syntax::{parse_str, print_file};
use std::hint::black_box as bb;

// =============================================================================
// Corpus
// =============================================================================

const FLAGS: &str = r#"package server

import "fmt"

type Options struct {
	Verbose bool
	Strict bool
	Color bool
	Name string
	Retries int
}

func configure(verbose bool) Options {
	o := Options{Verbose: verbose, Strict: true, Name: "primary"}
	if o.Strict {
		o.Color = false
	}
	if !o.Verbose {
		o.Retries = 3
	}
	o.Color = true
	return o
}

func report(o *Options) {
	if o.Verbose && o.Color {
		fmt.Println("verbose colored output", o.Name)
	}
}
"#;

const STRINGS: &str = r#"package messages

type Level string

const (
	Info Level = "information"
	Warn Level = "warning level"
)

var banner = "welcome to the service"

func describe(l Level) string {
	switch l {
	case Info:
		return "just so you know"
	case Warn:
		return "pay attention to this"
	}
	return "unknown level value"
}
"#;

const LADDERS: &str = r#"package codes

func name(code int) string {
	s := ""
	if code == 200 {
		s = "ok"
	} else if code == 301 {
		s = "moved"
	} else if code == 404 {
		s = "not found"
	} else if code == 500 {
		s = "error"
	} else {
		s = "other"
	}
	return s
}

func log(code int) {
	if code == 1 {
		println("one")
	} else if code == 2 {
		println("two")
	} else if code == 3 {
		println("three")
	}
}
"#;

/// One package made of `n` copies of the flag file, each with its own names.
fn scaled(n: usize) -> Vec<(String, String)> {
    (0..n)
        .map(|i| {
            let src = FLAGS
                .replace("Options", &format!("Options{i}"))
                .replace("configure", &format!("configure{i}"))
                .replace("report", &format!("report{i}"));
            (format!("f{i}.go"), src)
        })
        .collect()
}

// =============================================================================
// Benchmark 1: parse + print round trip
// =============================================================================

fn bench_parse_print(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_print");
    for (name, src) in [("flags", FLAGS), ("strings", STRINGS), ("ladders", LADDERS)] {
        group.throughput(Throughput::Bytes(src.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &src, |b, &src| {
            b.iter(|| {
                let ast = parse_str(bb(src)).unwrap();
                bb(print_file(&ast));
            });
        });
    }
    group.finish();
}

// =============================================================================
// Benchmark 2: single passes over the mixed corpus
// =============================================================================

fn bench_passes(c: &mut Criterion) {
    let mut group = c.benchmark_group("passes");
    let files = [("flags.go", FLAGS), ("strings.go", STRINGS), ("ladders.go", LADDERS)];
    let bytes: usize = files.iter().map(|(_, s)| s.len()).sum();
    group.throughput(Throughput::Bytes(bytes as u64));

    for alias in aliases() {
        group.bench_function(BenchmarkId::from_parameter(alias), |b| {
            b.iter(|| {
                let passes = parse_pipeline(alias).unwrap();
                let out =
                    transform_sources(bb(&files), passes, TransformOptions::default(), Vec::new())
                        .unwrap();
                bb(out);
            });
        });
    }
    group.bench_function("all", |b| {
        b.iter(|| {
            let passes = parse_pipeline("all").unwrap();
            let out = transform_sources(bb(&files), passes, TransformOptions::default(), Vec::new())
                .unwrap();
            bb(out);
        });
    });
    group.finish();
}

// =============================================================================
// Benchmark 3: full pipeline as the package grows
// =============================================================================

fn bench_scalability(c: &mut Criterion) {
    let mut group = c.benchmark_group("scalability");
    group.sample_size(20);
    for n in [1usize, 8, 32] {
        let owned = scaled(n);
        let files: Vec<(&str, &str)> = owned
            .iter()
            .map(|(p, s)| (p.as_str(), s.as_str()))
            .collect();
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("files", n), &files, |b, files| {
            b.iter(|| {
                let passes = parse_pipeline("all").unwrap();
                let out = transform_sources(files, passes, TransformOptions::default(), Vec::new())
                    .unwrap();
                bb(out);
            });
        });
    }
    group.finish();
}

// =============================================================================
// Criterion registration
// =============================================================================

criterion_group!(benches, bench_parse_print, bench_passes, bench_scalability);
criterion_main!(benches);
