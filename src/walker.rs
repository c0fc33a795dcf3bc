//! Project walker: finds source files, parses and type-checks them package by
//! package, and hands them to the context.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use gomorph_syntax::ast::Ast;
use gomorph_syntax::{check_package, parse_file};
use walkdir::{DirEntry, WalkDir};

use crate::config::TransformOptions;
use crate::context::{Context, SourceUnit};
use crate::error::{Error, Result};
use crate::events::{Event, Payload, Topic};

/// Outcome of one walk.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WalkReport {
    pub parsed: usize,
    /// Unreadable or unparsable files; the output manager copies them.
    pub failed: Vec<PathBuf>,
    pub type_diagnostics: usize,
}

/// True for directories the walk never enters.
pub(crate) fn is_skipped_dir(entry: &DirEntry, options: &TransformOptions, output_root: &Path) -> bool {
    if !entry.file_type().is_dir() || entry.depth() == 0 {
        return false;
    }
    if same_path(entry.path(), output_root) {
        return true;
    }
    entry
        .file_name()
        .to_str()
        .is_some_and(|n| options.is_excluded_dir(n))
}

pub(crate) fn same_path(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Source files below `root` in sorted order.
pub fn source_files(root: &Path, options: &TransformOptions, output_root: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    let walk = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e, options, output_root));
    for entry in walk {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
            Error::io(path, source)
        })?;
        if entry.file_type().is_file() && options.is_source_file(entry.path()) {
            out.push(entry.into_path());
        }
    }
    Ok(out)
}

/// Package directory of `rel`, `/`-separated (`""` for the root).
pub fn package_path_of(rel: &Path) -> String {
    rel.parent()
        .map(|p| {
            p.components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default()
}

/// Parses and checks every source file under the input root into `ctx`.
pub fn load_project(ctx: &mut Context) -> Result<WalkReport> {
    let root = ctx.run().input_root.clone();
    let output_root = ctx.run().output_root.clone();
    let files = source_files(&root, ctx.options(), &output_root)?;
    let mut report = WalkReport::default();

    let mut parsed = Vec::new();
    for path in files {
        let rel = path.strip_prefix(&root).unwrap_or(&path).to_path_buf();
        let src = match std::fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable source file, copying as is");
                report.failed.push(path);
                continue;
            }
        };
        let ast = match parse_file(ctx.fset_mut(), &path, &src) {
            Ok(ast) => ast,
            Err(failure) => {
                let err = Error::Parse {
                    path: path.clone(),
                    failure,
                };
                tracing::warn!("{err}, copying as is");
                ctx.publish(
                    Event::new(Topic::FileParseError)
                        .path(&path)
                        .payload(Payload::Text(err.to_string())),
                );
                report.failed.push(path);
                continue;
            }
        };
        parsed.push(ParsedFile { path, rel, ast });
    }

    report.parsed = parsed.len();
    report.type_diagnostics = check_and_insert(ctx, parsed);
    Ok(report)
}

/// A parsed file waiting for type checking.
pub(crate) struct ParsedFile {
    pub path: PathBuf,
    pub rel: PathBuf,
    pub ast: Ast,
}

/// Type-checks `files` package by package and moves them into `ctx`.
/// Returns the number of type diagnostics.
pub(crate) fn check_and_insert(ctx: &mut Context, files: Vec<ParsedFile>) -> usize {
    // (package dir, package clause) -> files
    let mut packages: BTreeMap<(String, String), Vec<ParsedFile>> = BTreeMap::new();
    for f in files {
        let key = (package_path_of(&f.rel), f.ast.package_name().to_string());
        packages.entry(key).or_default().push(f);
    }

    let mut total = 0;
    for ((package_path, package), files) in packages {
        let asts: Vec<&Ast> = files.iter().map(|f| &f.ast).collect();
        let infos = check_package(&asts);
        let diagnostics: usize = infos.iter().map(|i| i.diagnostics.len()).sum();
        if diagnostics > 0 {
            tracing::warn!(
                package = %package,
                dir = %package_path,
                diagnostics,
                "type diagnostics, passes fall back to syntax where facts are missing"
            );
            for (info, f) in infos.iter().zip(&files) {
                for d in &info.diagnostics {
                    tracing::debug!(path = %f.path.display(), message = %d.message, "type diagnostic");
                }
            }
        }
        total += diagnostics;
        tracing::debug!(package = %package, dir = %package_path, files = files.len(), "package loaded");

        for (f, info) in files.into_iter().zip(infos) {
            ctx.insert_file(SourceUnit {
                path: f.path,
                rel: f.rel,
                package_path: package_path.clone(),
                ast: f.ast,
                info,
                changed: false,
            });
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_paths_use_slashes() {
        assert_eq!(package_path_of(Path::new("a.go")), "");
        assert_eq!(package_path_of(Path::new("internal/util/u.go")), "internal/util");
    }
}
