//! Pass registry and scheduler.

use std::fmt;

use crate::context::Context;
use crate::error::Result;
use crate::pass::Pass;

/// Ordered set of passes.
///
/// Passes may be added in any order; [`PassRegistry::run`] executes them
/// stably sorted by priority, pass-major: each pass sees every file before
/// the next one starts.
#[derive(Default)]
pub struct PassRegistry {
    passes: Vec<Box<dyn Pass>>,
}

impl fmt::Debug for PassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl PassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_passes(passes: Vec<Box<dyn Pass>>) -> Self {
        let mut r = Self::new();
        for p in passes {
            r.add(p);
        }
        r
    }

    /// Adds a pass, keeping the list sorted by priority. Equal priorities
    /// keep insertion order.
    pub fn add(&mut self, pass: Box<dyn Pass>) {
        let at = self
            .passes
            .iter()
            .position(|p| p.priority() > pass.priority())
            .unwrap_or(self.passes.len());
        self.passes.insert(at, pass);
    }

    /// Names in execution order.
    pub fn names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Keeps only the passes for which `keep` holds.
    pub fn retain(&mut self, keep: impl FnMut(&Box<dyn Pass>) -> bool) {
        self.passes.retain(keep);
    }

    /// Runs every pass over every file of the context.
    ///
    /// Returns the number of files at least one pass changed.
    ///
    /// # Errors
    ///
    /// The first pass error aborts the run.
    pub fn run(&mut self, ctx: &mut Context) -> Result<usize> {
        let paths = ctx.file_paths();
        for pass in &mut self.passes {
            let name = pass.name();
            let _span = tracing::info_span!("pass", name).entered();
            pass.setup(ctx)?;

            for path in &paths {
                if let Some(r) = ctx.with_file(path, |unit, ctx| pass.collect(unit, ctx)) {
                    r?;
                }
            }

            let mut changed_files = 0usize;
            for path in &paths {
                let res = ctx.with_file(path, |unit, ctx| -> Result<bool> {
                    let changed = pass.apply(unit, ctx)?;
                    unit.changed |= changed;
                    Ok(changed)
                });
                if let Some(r) = res {
                    if r? {
                        changed_files += 1;
                    }
                }
            }
            tracing::debug!(pass = name, files = changed_files, "pass finished");
        }
        Ok(ctx.files().filter(|u| u.changed).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SourceUnit;

    struct Named(&'static str, i32);

    impl Pass for Named {
        fn name(&self) -> &'static str {
            self.0
        }
        fn alias(&self) -> &'static str {
            self.0
        }
        fn priority(&self) -> i32 {
            self.1
        }
        fn description(&self) -> &'static str {
            ""
        }
        fn apply(&mut self, _: &mut SourceUnit, _: &mut Context) -> Result<bool> {
            Ok(false)
        }
    }

    #[test]
    fn sorted_by_priority_stable_on_ties() {
        let r = PassRegistry::with_passes(vec![
            Box::new(Named("strings", 300)),
            Box::new(Named("read", 200)),
            Box::new(Named("struct", 100)),
            Box::new(Named("write", 200)),
        ]);
        assert_eq!(r.names(), vec!["struct", "read", "write", "strings"]);
    }
}
