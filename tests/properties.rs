use std::collections::HashSet;

use gomorph::astutil::width_for;
use gomorph::output::rewrite_import_path;
use gomorph::passes::DENY_LIST;
use gomorph::stdlib::{is_stdlib, PACKAGES};
use gomorph::{parse_pipeline, transform_sources, Context, RunConfig, TransformOptions};
use proptest::prelude::*;

const MODULE: &str = "example.com/proj";

/// Byte values of the first `[]byte{...}` literal in `text`.
fn first_byte_slice(text: &str) -> Option<Vec<u8>> {
    let start = text.find("[]byte{")? + "[]byte{".len();
    let end = start + text[start..].find('}')?;
    text[start..end]
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<u8>().ok())
        .collect()
}

fn obfuscate_var(literal: &str) -> String {
    let src = format!("package p\n\nvar s = {literal}\n");
    let out = transform_sources(
        &[("a.go", &src)],
        parse_pipeline("string-obfuscate").unwrap(),
        TransformOptions::default(),
        Vec::new(),
    )
    .unwrap();
    out.file("a.go").unwrap().to_string()
}

#[test]
fn escaped_literals_decode_before_obfuscation() {
    let out = obfuscate_var(r#""tab\there\u00e9\x41""#);
    let bytes = first_byte_slice(&out).expect("obfuscated");
    assert_eq!(bytes, "tab\there\u{e9}A".as_bytes());

    let raw = obfuscate_var("`C:\\path\\n`");
    let bytes = first_byte_slice(&raw).expect("obfuscated");
    assert_eq!(bytes, b"C:\\path\\n");
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn flag_names_are_stable_and_distinct(
        (fields, order) in prop::collection::btree_set("[A-Z][a-zA-Z0-9]{0,6}", 1..=64usize)
            .prop_flat_map(|set| {
                let fields: Vec<String> = set.into_iter().collect();
                let order = Just((0..fields.len()).collect::<Vec<_>>()).prop_shuffle();
                (Just(fields), order)
            })
    ) {
        let mut ctx = Context::new(RunConfig::default(), TransformOptions::default());
        ctx.register_struct("p", "p", "S", "SFlags", &fields).unwrap();

        let in_order: Vec<String> = fields
            .iter()
            .map(|f| ctx.flag_name_for("p", "p", "S", f))
            .collect();
        for &i in &order {
            prop_assert_eq!(&ctx.flag_name_for("p", "p", "S", &fields[i]), &in_order[i]);
        }
        let distinct: HashSet<&String> = in_order.iter().collect();
        prop_assert_eq!(distinct.len(), fields.len());
    }

    #[test]
    fn width_is_the_narrowest_that_fits(n in 1usize..=64) {
        let w = width_for(n).unwrap();
        prop_assert!(w.bits() as usize >= n);
        let narrower = [8u32, 16, 32, 64].into_iter().filter(|&b| b < w.bits());
        for b in narrower {
            prop_assert!((b as usize) < n);
        }
    }

    #[test]
    fn width_rejects_more_than_64(n in 65usize..10_000) {
        prop_assert!(width_for(n).is_none());
    }

    #[test]
    fn stdlib_paths_and_subpaths_are_kept(
        idx in 0..PACKAGES.len(),
        suffix in "[a-z][a-z0-9]{0,7}(/[a-z][a-z0-9]{0,7}){0,2}",
    ) {
        let pkg = PACKAGES[idx];
        prop_assert!(is_stdlib(pkg));
        prop_assert_eq!(rewrite_import_path(pkg, MODULE), None);
        let sub = format!("{pkg}/{suffix}");
        prop_assert_eq!(rewrite_import_path(&sub, MODULE), None);
    }

    #[test]
    fn project_imports_are_rooted_once(path in "[a-z][a-z0-9]{0,7}(/[a-z][a-z0-9]{0,7}){0,2}") {
        prop_assume!(!is_stdlib(&path));
        let once = rewrite_import_path(&path, MODULE).unwrap();
        prop_assert_eq!(&once, &format!("{MODULE}/{path}"));
        prop_assert_eq!(rewrite_import_path(&once, MODULE), None);
    }

    #[test]
    fn obfuscated_strings_keep_their_bytes(s in "[a-zA-Z0-9 _.,:;!?/éßπ中-]{4,24}") {
        prop_assume!(!DENY_LIST.contains(&s.as_str()));
        let out = obfuscate_var(&format!("\"{s}\""));
        prop_assert!(out.contains("string([]byte{"), "{}", out);
        prop_assert_eq!(first_byte_slice(&out).unwrap(), s.as_bytes().to_vec());
    }
}
