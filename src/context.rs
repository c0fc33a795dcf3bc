//! Run-wide transformation context.
//!
//! One [`Context`] exists per run. It owns the struct registry, the parsed
//! files and the event bus; every mutation goes through a method here.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use gomorph_syntax::ast::{Ast, Span};
use gomorph_syntax::{FileId, FileSet, Position, TypeInfo};

use crate::astutil::{flag_const_name, width_for, StorageWidth};
use crate::config::{RunConfig, TransformOptions};
use crate::error::{Error, Result};
use crate::events::{Event, EventBus, Metrics, Payload, SkipReason, Topic};

/// One parsed source file and its checker facts.
#[derive(Debug)]
pub struct SourceUnit {
    /// Path under the input root.
    pub path: PathBuf,
    /// Path relative to the input root.
    pub rel: PathBuf,
    /// Package directory relative to the input root (`""` for the root).
    pub package_path: String,
    pub ast: Ast,
    pub info: TypeInfo,
    /// Set once any pass rewrote something in this file.
    pub changed: bool,
}

impl SourceUnit {
    pub fn package_name(&self) -> &str {
        self.ast.package_name()
    }
}

/// Registry entry of one packed struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructRecord {
    /// Declared package name; feeds the flag-name formula.
    pub package: String,
    pub package_path: String,
    pub original_name: String,
    pub new_name: String,
    /// Bool fields in declaration order; the index is the bit.
    pub bool_fields: Vec<String>,
    pub flag_mapping: BTreeMap<String, String>,
    pub storage: StorageWidth,
}

impl StructRecord {
    pub fn bit_of(&self, field: &str) -> Option<u32> {
        self.bool_fields
            .iter()
            .position(|f| f == field)
            .map(|i| i as u32)
    }

    pub fn flag_for(&self, field: &str) -> Option<&str> {
        self.flag_mapping.get(field).map(String::as_str)
    }
}

type StructKey = (String, String);

#[derive(Debug)]
pub struct Context {
    run: RunConfig,
    options: TransformOptions,
    fset: FileSet,
    structs: BTreeMap<StructKey, StructRecord>,
    constants_emitted: BTreeSet<StructKey>,
    generated: BTreeMap<PathBuf, SourceUnit>,
    events: EventBus,
}

impl Context {
    pub fn new(run: RunConfig, options: TransformOptions) -> Self {
        Self {
            run,
            options,
            fset: FileSet::new(),
            structs: BTreeMap::new(),
            constants_emitted: BTreeSet::new(),
            generated: BTreeMap::new(),
            events: EventBus::new(),
        }
    }

    pub fn run(&self) -> &RunConfig {
        &self.run
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    pub fn fset(&self) -> &FileSet {
        &self.fset
    }

    pub fn fset_mut(&mut self) -> &mut FileSet {
        &mut self.fset
    }

    pub fn position(&self, file: FileId, span: Span) -> Option<Position> {
        if span.is_dummy() {
            return None;
        }
        self.fset.position(file, span.start)
    }

    // -------------------------------------------------------------------------
    // Struct registry
    // -------------------------------------------------------------------------

    /// Registers a packed struct.
    ///
    /// The first registration of `(package_path, original_name)` wins; an
    /// identical second call is a no-op and a different one is a conflict.
    pub fn register_struct(
        &mut self,
        package: &str,
        package_path: &str,
        original_name: &str,
        new_name: &str,
        bool_fields: &[String],
    ) -> Result<&StructRecord> {
        let storage = width_for(bool_fields.len()).ok_or_else(|| Error::UnsupportedWidth {
            name: original_name.to_string(),
            count: bool_fields.len(),
        })?;
        let key = (package_path.to_string(), original_name.to_string());
        if let Some(existing) = self.structs.get(&key) {
            if existing.package != package
                || existing.new_name != new_name
                || existing.bool_fields != bool_fields
            {
                return Err(Error::RegistryConflict {
                    package_path: package_path.to_string(),
                    name: original_name.to_string(),
                    detail: format!(
                        "registered as {} {:?}, now {} {:?}",
                        existing.new_name, existing.bool_fields, new_name, bool_fields
                    ),
                });
            }
        } else {
            let flag_mapping = bool_fields
                .iter()
                .map(|f| (f.clone(), flag_const_name(package, original_name, f)))
                .collect();
            let record = StructRecord {
                package: package.to_string(),
                package_path: package_path.to_string(),
                original_name: original_name.to_string(),
                new_name: new_name.to_string(),
                bool_fields: bool_fields.to_vec(),
                flag_mapping,
                storage,
            };
            tracing::debug!(
                package = package_path,
                name = original_name,
                new_name,
                fields = bool_fields.len(),
                "registered struct"
            );
            self.events.publish(
                Event::new(Topic::RegistryInsert)
                    .payload(Payload::Text(format!("{package_path}.{original_name}"))),
            );
            self.structs.insert(key.clone(), record);
        }
        self.structs
            .get(&key)
            .ok_or_else(|| Error::config(format!("registry lost {original_name}")))
    }

    /// Loads records of an earlier run; they keep their recorded names.
    pub fn preload_structs(&mut self, records: impl IntoIterator<Item = StructRecord>) {
        for r in records {
            let key = (r.package_path.clone(), r.original_name.clone());
            self.structs.entry(key).or_insert(r);
        }
    }

    pub fn struct_record(&self, package_path: &str, name: &str) -> Option<&StructRecord> {
        self.structs
            .get(&(package_path.to_string(), name.to_string()))
    }

    /// Record whose rewritten name is `new_name`.
    pub fn struct_by_new_name(&self, package_path: &str, new_name: &str) -> Option<&StructRecord> {
        self.structs
            .values()
            .find(|r| r.package_path == package_path && r.new_name == new_name)
    }

    /// Record matching `name` either as declared or as rewritten.
    pub fn find_struct(&self, package_path: &str, name: &str) -> Option<&StructRecord> {
        self.struct_record(package_path, name)
            .or_else(|| self.struct_by_new_name(package_path, name))
    }

    pub fn structs(&self) -> impl Iterator<Item = &StructRecord> {
        self.structs.values()
    }

    /// Flag constant of `field`: the registered name, else the formula (which
    /// is then recorded when the struct is registered).
    pub fn flag_name_for(
        &mut self,
        package: &str,
        package_path: &str,
        strukt: &str,
        field: &str,
    ) -> String {
        let key = (package_path.to_string(), strukt.to_string());
        if let Some(rec) = self.structs.get_mut(&key) {
            if let Some(name) = rec.flag_mapping.get(field) {
                return name.clone();
            }
            let name = flag_const_name(&rec.package, strukt, field);
            if rec.bool_fields.iter().any(|f| f == field) {
                rec.flag_mapping.insert(field.to_string(), name.clone());
            }
            return name;
        }
        flag_const_name(package, strukt, field)
    }

    pub fn is_bool_field(&self, package_path: &str, strukt: &str, field: &str) -> bool {
        self.find_struct(package_path, strukt)
            .is_some_and(|r| r.bool_fields.iter().any(|f| f == field))
    }

    pub fn mark_package_constants_emitted(&mut self, package_path: &str, strukt: &str) {
        self.constants_emitted
            .insert((package_path.to_string(), strukt.to_string()));
    }

    pub fn has_emitted_package_constants(&self, package_path: &str, strukt: &str) -> bool {
        self.constants_emitted
            .contains(&(package_path.to_string(), strukt.to_string()))
    }

    // -------------------------------------------------------------------------
    // Generated files
    // -------------------------------------------------------------------------

    pub fn insert_file(&mut self, unit: SourceUnit) {
        self.generated.insert(unit.path.clone(), unit);
    }

    pub fn file(&self, path: &Path) -> Option<&SourceUnit> {
        self.generated.get(path)
    }

    pub fn files(&self) -> impl Iterator<Item = &SourceUnit> {
        self.generated.values()
    }

    /// Paths of the parsed files, sorted.
    pub fn file_paths(&self) -> Vec<PathBuf> {
        self.generated.keys().cloned().collect()
    }

    /// Lends one file to `f` together with the rest of the context.
    pub fn with_file<R>(
        &mut self,
        path: &Path,
        f: impl FnOnce(&mut SourceUnit, &mut Context) -> R,
    ) -> Option<R> {
        let mut unit = self.generated.remove(path)?;
        let out = f(&mut unit, self);
        self.generated.insert(path.to_path_buf(), unit);
        Some(out)
    }

    /// Hands every parsed file over to the output manager.
    pub fn drain_files(&mut self) -> Vec<SourceUnit> {
        std::mem::take(&mut self.generated).into_values().collect()
    }

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    pub fn metrics(&self) -> &Metrics {
        self.events.metrics()
    }

    pub fn publish(&mut self, ev: Event) {
        self.events.publish(ev);
    }

    pub fn log_visit(&mut self, pass: &'static str, path: &Path) {
        self.publish(Event::new(Topic::PassVisit).pass(pass).path(path));
    }

    pub fn log_change(&mut self, pass: &'static str, path: &Path) {
        self.publish(Event::new(Topic::PassChange).pass(pass).path(path));
    }

    pub fn log_skip(&mut self, pass: &'static str, path: &Path, reason: SkipReason) {
        self.publish(
            Event::new(Topic::PassSkip)
                .pass(pass)
                .path(path)
                .payload(Payload::Skip(reason)),
        );
    }

    /// A recognized pattern that was reported instead of rewritten.
    pub fn log_detect(
        &mut self,
        pass: &'static str,
        path: &Path,
        reason: SkipReason,
        detail: impl Into<String>,
    ) {
        let detail = detail.into();
        tracing::info!(pass, path = %path.display(), %reason, %detail, "pattern left as is");
        self.publish(
            Event::new(Topic::PassDetect)
                .pass(pass)
                .path(path)
                .payload(Payload::Detect { reason, detail }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Context {
        Context::new(RunConfig::new("in", "out"), TransformOptions::default())
    }

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn first_writer_wins() {
        let mut c = ctx();
        c.register_struct("p", "p", "Cfg", "CfgFlags", &fields(&["a", "b"]))
            .unwrap();
        // identical registration is a no-op
        c.register_struct("p", "p", "Cfg", "CfgFlags", &fields(&["a", "b"]))
            .unwrap();
        assert_eq!(c.metrics().registered_structs, 1);

        let err = c
            .register_struct("p", "p", "Cfg", "CfgFlags", &fields(&["a"]))
            .unwrap_err();
        assert_eq!(err.exit_code(), 4);

        // same name, other package
        c.register_struct("q", "q", "Cfg", "CfgFlags", &fields(&["a"]))
            .unwrap();
        assert_eq!(c.structs().count(), 2);
    }

    #[test]
    fn too_many_bools_is_rejected() {
        let mut c = ctx();
        let many: Vec<String> = (0..65).map(|i| format!("f{i}")).collect();
        let err = c
            .register_struct("p", "p", "Big", "BigFlags", &many)
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedWidth { count: 65, .. }));
    }

    #[test]
    fn flag_names_and_bool_fields() {
        let mut c = ctx();
        c.register_struct("p", "p", "Cfg", "CfgFlags", &fields(&["debug"]))
            .unwrap();
        assert_eq!(c.flag_name_for("p", "p", "Cfg", "debug"), "FlagP_Cfg_Debug");
        assert!(c.is_bool_field("p", "Cfg", "debug"));
        assert!(c.is_bool_field("p", "CfgFlags", "debug"));
        assert!(!c.is_bool_field("p", "Cfg", "name"));
        assert!(!c.has_emitted_package_constants("p", "Cfg"));
        c.mark_package_constants_emitted("p", "Cfg");
        assert!(c.has_emitted_package_constants("p", "Cfg"));
    }

    #[test]
    fn detections_reach_subscribers() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut c = ctx();
        let details = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&details);
        c.events_mut().subscribe("pass.detect", move |ev| {
            if let Payload::Detect { detail, .. } = &ev.payload {
                sink.borrow_mut().push(detail.clone());
            }
        });
        c.log_visit("J", Path::new("a.go"));
        c.log_detect("J", Path::new("a.go"), SkipReason::ChainTooShort, "2 links on `v`");

        assert_eq!(*details.borrow(), vec!["2 links on `v`".to_string()]);
        let m = c.metrics().pass("J").cloned().unwrap_or_default();
        assert_eq!((m.visited, m.detected), (1, 1));
        assert_eq!(m.skipped_for(SkipReason::ChainTooShort), 1);
    }
}
