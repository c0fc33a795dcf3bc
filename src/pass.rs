//! The `Pass` trait every rewrite implements.

use crate::context::{Context, SourceUnit};
use crate::error::Result;

/// Guarantees a pass makes about its own behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassConstraints {
    /// Same input yields the same output bytes.
    pub deterministic: bool,
    /// Applying twice equals applying once.
    pub idempotent: bool,
    /// Safe to run over nodes synthesized by earlier passes.
    pub reentrant: bool,
}

impl Default for PassConstraints {
    fn default() -> Self {
        Self {
            deterministic: true,
            idempotent: true,
            reentrant: true,
        }
    }
}

/// A rewrite over one source file.
///
/// The scheduler drives every pass in three steps: [`setup`](Pass::setup)
/// once, [`collect`](Pass::collect) over every file, then
/// [`apply`](Pass::apply) over every file in path order. Passes publish what
/// they visit, change and skip through the context's event bus.
pub trait Pass {
    /// Unique name used in events and error reports.
    fn name(&self) -> &'static str;

    /// Short name accepted by `--passes`.
    fn alias(&self) -> &'static str;

    /// Lower runs first.
    fn priority(&self) -> i32;

    fn description(&self) -> &'static str;

    fn constraints(&self) -> PassConstraints {
        PassConstraints::default()
    }

    /// True for passes that only make the output harder to read; these are
    /// dropped when obfuscation is disabled.
    fn obfuscates(&self) -> bool {
        false
    }

    /// Called once before any file is visited.
    ///
    /// # Errors
    ///
    /// Returns an error if the pass cannot run on this project at all.
    fn setup(&mut self, _ctx: &mut Context) -> Result<()> {
        Ok(())
    }

    /// Read-only look at one file before any file is rewritten.
    ///
    /// # Errors
    ///
    /// Returns an error when the file holds something the pass must reject.
    fn collect(&mut self, _unit: &SourceUnit, _ctx: &mut Context) -> Result<()> {
        Ok(())
    }

    /// Rewrites one file; returns `true` if anything changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the pass fails to process the file.
    fn apply(&mut self, unit: &mut SourceUnit, ctx: &mut Context) -> Result<bool>;
}
