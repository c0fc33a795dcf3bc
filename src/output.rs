//! Output manager: mirrors the input tree under the output root.
//!
//! Parsed files are printed from their (possibly rewritten) trees with
//! intra-project imports re-rooted at the module path; everything else is
//! copied byte for byte.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use gomorph_syntax::ast::{Ast, Spec};
use gomorph_syntax::print_file;
use walkdir::WalkDir;

use crate::astutil::decode_string_lit;
use crate::context::{Context, SourceUnit};
use crate::error::{Error, Result};
use crate::events::{Event, Topic};
use crate::stdlib::is_stdlib;
use crate::walker::same_path;

/// New import path for `path`, or `None` when it stays as is.
///
/// Standard library paths, paths with a dot (other modules) and paths already
/// under `module` are kept; anything else is an intra-project path and is
/// prefixed with `module/`.
pub fn rewrite_import_path(path: &str, module: &str) -> Option<String> {
    if is_stdlib(path) || path.contains('.') {
        return None;
    }
    if path == module || path.starts_with(&format!("{module}/")) {
        return None;
    }
    let normalized = path.replace('\\', "/");
    let normalized = normalized.trim_start_matches("./").trim_matches('/');
    if normalized.is_empty() {
        return None;
    }
    Some(format!("{module}/{normalized}"))
}

fn quote_import(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 2);
    out.push('"');
    for c in path.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Re-roots the intra-project imports of `ast`. Returns how many changed.
pub fn rewrite_imports(ast: &mut Ast, module: &str) -> usize {
    let mut n = 0;
    for (decl, idx, spec) in ast.import_specs() {
        let Some(bytes) = decode_string_lit(ast.str(spec.path.raw)) else {
            continue;
        };
        let path = String::from_utf8_lossy(&bytes);
        let Some(new) = rewrite_import_path(&path, module) else {
            continue;
        };
        let raw = ast.intern(&quote_import(&new));
        let specs = ast.arena.decls[decl].specs;
        if let Spec::Import(imp) = &mut ast.arena.specs_list_mut(specs)[idx] {
            imp.path.raw = raw;
            n += 1;
        }
    }
    n
}

/// What one output run did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OutputReport {
    pub written: Vec<PathBuf>,
    pub copied: Vec<PathBuf>,
    pub imports_rewritten: usize,
}

/// Writes the output tree.
///
/// `units` are the parsed files keyed by input path; every other file below
/// the input root is copied. With `dry_run` nothing is touched on disk.
pub fn write_output(
    ctx: &mut Context,
    units: Vec<SourceUnit>,
    module: &str,
) -> Result<OutputReport> {
    let input = ctx.run().input_root.clone();
    let output = ctx.run().output_root.clone();
    let dry_run = ctx.run().dry_run;
    let mut units: BTreeMap<PathBuf, SourceUnit> =
        units.into_iter().map(|u| (u.path.clone(), u)).collect();
    let mut report = OutputReport::default();

    if !dry_run {
        std::fs::create_dir_all(&output).map_err(|e| Error::io(&output, e))?;
    }
    let walk = WalkDir::new(&input)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !same_path(e.path(), &output));
    for entry in walk {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(&input).to_path_buf();
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
            Error::io(path, source)
        })?;
        let rel = entry.path().strip_prefix(&input).unwrap_or(entry.path());
        let target = output.join(rel);

        if entry.file_type().is_dir() {
            if !dry_run {
                std::fs::create_dir_all(&target).map_err(|e| Error::io(&target, e))?;
            }
            continue;
        }
        if !entry.file_type().is_file() {
            continue;
        }

        match units.remove(entry.path()) {
            Some(mut unit) => {
                report.imports_rewritten += rewrite_imports(&mut unit.ast, module);
                let text = print_file(&unit.ast);
                write_file(&target, text.as_bytes(), dry_run)?;
                ctx.publish(Event::new(Topic::OutputWrite).path(&target));
                report.written.push(target);
            }
            None => {
                copy_file(entry.path(), &target, dry_run)?;
                ctx.publish(Event::new(Topic::OutputCopy).path(&target));
                report.copied.push(target);
            }
        }
    }
    if dry_run {
        tracing::info!(
            written = report.written.len(),
            copied = report.copied.len(),
            "dry run, nothing written"
        );
    }
    Ok(report)
}

fn write_file(target: &Path, bytes: &[u8], dry_run: bool) -> Result<()> {
    if dry_run {
        tracing::info!(path = %target.display(), "would write");
        return Ok(());
    }
    std::fs::write(target, bytes).map_err(|e| Error::io(target, e))
}

fn copy_file(from: &Path, to: &Path, dry_run: bool) -> Result<()> {
    if dry_run {
        tracing::debug!(path = %to.display(), "would copy");
        return Ok(());
    }
    std::fs::copy(from, to)
        .map(|_| ())
        .map_err(|e| Error::io(to, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_paths_are_re_rooted() {
        let m = "example.com/proj";
        assert_eq!(rewrite_import_path("fmt", m), None);
        assert_eq!(rewrite_import_path("encoding/json", m), None);
        assert_eq!(rewrite_import_path("example.com/other", m), None);
        assert_eq!(rewrite_import_path("example.com/proj/x", m), None);
        assert_eq!(
            rewrite_import_path("internal/util", m).as_deref(),
            Some("example.com/proj/internal/util")
        );
    }

    #[test]
    fn module_without_dot_is_stable() {
        let once = rewrite_import_path("config", "proj").unwrap();
        assert_eq!(once, "proj/config");
        assert_eq!(rewrite_import_path(&once, "proj"), None);
    }
}
