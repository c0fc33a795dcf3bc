//! Run orchestration: walker, passes, map file, output.

use std::path::{Path, PathBuf};

use gomorph_syntax::print_file;
use gomorph_syntax::parse_file;

use crate::config::{RunConfig, TransformOptions};
use crate::context::{Context, StructRecord};
use crate::error::{Error, Result};
use crate::events::Metrics;
use crate::manifest::read_module_path;
use crate::mapfile::ContextMap;
use crate::output::{write_output, OutputReport};
use crate::pass::Pass;
use crate::registry::PassRegistry;
use crate::walker::{check_and_insert, load_project, ParsedFile, WalkReport};

/// What a `transform` run did.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub module: String,
    pub walk: WalkReport,
    pub changed_files: usize,
    pub output: OutputReport,
    pub structs: Vec<StructRecord>,
    pub metrics: Metrics,
}

fn registry_for(run: &RunConfig, passes: Vec<Box<dyn Pass>>) -> PassRegistry {
    let mut registry = PassRegistry::with_passes(passes);
    if !run.obfuscate {
        registry.retain(|p| !p.obfuscates());
    }
    registry
}

/// Transforms the project at `run.input_root` into `run.output_root`.
///
/// # Errors
///
/// Configuration, registry and pass errors, and any failed write. Parse
/// failures of single files are not errors; those files are copied.
pub fn transform(
    run: RunConfig,
    options: TransformOptions,
    passes: Vec<Box<dyn Pass>>,
) -> Result<RunSummary> {
    let module = read_module_path(&run.module_manifest_path)?;
    tracing::info!(
        input = %run.input_root.display(),
        output = %run.output_root.display(),
        module = %module,
        "transform"
    );
    let mut registry = registry_for(&run, passes);
    let mut ctx = Context::new(run, options);

    if let Some(path) = ctx.run().resume_map_path.clone() {
        let records = ContextMap::load(&path)?.records()?;
        tracing::info!(path = %path.display(), structs = records.len(), "resuming from map file");
        ctx.preload_structs(records);
    }

    let walk = load_project(&mut ctx)?;
    tracing::info!(
        parsed = walk.parsed,
        failed = walk.failed.len(),
        passes = ?registry.names(),
        "project loaded"
    );
    let changed_files = registry.run(&mut ctx)?;

    if let Some(path) = ctx.run().map_file_path.clone() {
        if ctx.run().dry_run {
            tracing::info!(path = %path.display(), "dry run, map file not written");
        } else {
            ContextMap::from_context(&ctx).save(&path)?;
        }
    }

    let units = ctx.drain_files();
    let output = write_output(&mut ctx, units, &module)?;
    let summary = RunSummary {
        module,
        walk,
        changed_files,
        output,
        structs: ctx.structs().cloned().collect(),
        metrics: ctx.metrics().clone(),
    };
    tracing::info!(
        changed = summary.changed_files,
        written = summary.output.written.len(),
        copied = summary.output.copied.len(),
        "transform finished"
    );
    Ok(summary)
}

/// Parses and type-checks the project without transforming it.
pub fn check(input: &Path, options: TransformOptions) -> Result<WalkReport> {
    let run = RunConfig {
        input_root: input.to_path_buf(),
        ..RunConfig::default()
    };
    let mut ctx = Context::new(run, options);
    load_project(&mut ctx)
}

/// Result of [`transform_sources`].
#[derive(Debug, Clone, Default)]
pub struct SourceOutput {
    /// Printed files, in input order.
    pub files: Vec<(String, String)>,
    pub structs: Vec<StructRecord>,
    pub metrics: Metrics,
}

impl SourceOutput {
    /// Printed text of `path`.
    pub fn file(&self, path: &str) -> Option<&str> {
        self.files
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, s)| s.as_str())
    }
}

/// Runs `passes` over in-memory sources given as `(relative path, text)`.
///
/// Imports are not rewritten. `preload` seeds the struct registry, as
/// `--resume` does.
///
/// # Errors
///
/// Unlike a project run, a file that fails to parse is an error.
pub fn transform_sources(
    files: &[(&str, &str)],
    passes: Vec<Box<dyn Pass>>,
    options: TransformOptions,
    preload: Vec<StructRecord>,
) -> Result<SourceOutput> {
    let run = RunConfig::default();
    let mut registry = PassRegistry::with_passes(passes);
    let mut ctx = Context::new(run, options);
    ctx.preload_structs(preload);

    let mut parsed = Vec::with_capacity(files.len());
    for (rel, src) in files {
        let path = PathBuf::from(rel);
        let ast = parse_file(ctx.fset_mut(), &path, src).map_err(|failure| Error::Parse {
            path: path.clone(),
            failure,
        })?;
        parsed.push(ParsedFile {
            rel: path.clone(),
            path,
            ast,
        });
    }
    check_and_insert(&mut ctx, parsed);
    registry.run(&mut ctx)?;

    let mut out = SourceOutput {
        files: Vec::with_capacity(files.len()),
        structs: ctx.structs().cloned().collect(),
        metrics: ctx.metrics().clone(),
    };
    for (rel, _) in files {
        if let Some(unit) = ctx.file(Path::new(rel)) {
            out.files.push((rel.to_string(), print_file(&unit.ast)));
        }
    }
    Ok(out)
}
