use gomorph::{parse_pipeline, transform_sources, TransformOptions};
use gomorph_syntax::{parse_str, print_file};
use walkdir::WalkDir;

/// Runs the whole pipeline over every file of a real Go tree, when one is
/// configured through `GOMORPH_CORPUS`.
#[test]
fn transforms_go_corpus_if_configured() {
    let Some(root) = std::env::var_os("GOMORPH_CORPUS") else {
        eprintln!("GOMORPH_CORPUS not set; skipping corpus test");
        return;
    };

    let mut total = 0usize;
    let mut unparsed = 0usize;
    for entry in WalkDir::new(&root).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("go") {
            continue;
        }
        if path.to_string_lossy().contains("testdata") {
            continue;
        }
        let Ok(src) = std::fs::read_to_string(path) else {
            continue;
        };
        total += 1;

        let Ok(ast) = parse_str(&src) else {
            unparsed += 1;
            continue;
        };
        let printed = print_file(&ast);
        let reparsed = parse_str(&printed)
            .unwrap_or_else(|f| panic!("{}: printed output does not parse: {f}", path.display()));
        assert_eq!(print_file(&reparsed), printed, "{}: printing is not stable", path.display());

        let rel = path.to_string_lossy();
        match transform_sources(
            &[(rel.as_ref(), src.as_str())],
            parse_pipeline("all").unwrap(),
            TransformOptions::default(),
            Vec::new(),
        ) {
            Ok(out) => {
                let text = out.file(&rel).unwrap_or_default();
                assert!(
                    parse_str(text).is_ok(),
                    "{}: transformed output does not parse",
                    path.display()
                );
            }
            Err(e) => eprintln!("{}: {e}", path.display()),
        }
    }

    eprintln!("Transformed {total} Go files ({unparsed} did not parse).");
}
