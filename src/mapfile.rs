//! Context map file: the struct registry of a run as JSON.
//!
//! ```json
//! {
//!   "version": 1,
//!   "inputFile": "proj",
//!   "outputDir": "out",
//!   "structs": [
//!     {
//!       "package": "p",
//!       "packagePath": "internal/p",
//!       "originalName": "Cfg",
//!       "newName": "CfgFlags",
//!       "boolFields": ["Debug"],
//!       "flagMapping": { "Debug": "FlagP_Cfg_Debug" },
//!       "storageType": "uint8"
//!     }
//!   ]
//! }
//! ```
//!
//! `packagePath` and `storageType` may be missing on read; unknown keys are
//! ignored.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::astutil::{width_for, StorageWidth};
use crate::context::{Context, StructRecord};
use crate::error::{Error, Result};

pub const MAP_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextMap {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub input_file: String,
    #[serde(default)]
    pub output_dir: String,
    #[serde(default)]
    pub structs: Vec<StructEntry>,
}

fn default_version() -> u32 {
    MAP_VERSION
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructEntry {
    pub package: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_path: Option<String>,
    pub original_name: String,
    pub new_name: String,
    pub bool_fields: Vec<String>,
    #[serde(default)]
    pub flag_mapping: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_type: Option<String>,
}

impl From<&StructRecord> for StructEntry {
    fn from(r: &StructRecord) -> Self {
        Self {
            package: r.package.clone(),
            package_path: Some(r.package_path.clone()),
            original_name: r.original_name.clone(),
            new_name: r.new_name.clone(),
            bool_fields: r.bool_fields.clone(),
            flag_mapping: r.flag_mapping.clone(),
            storage_type: Some(r.storage.type_name().to_string()),
        }
    }
}

impl StructEntry {
    /// Registry record of this entry. Without a `packagePath` the package is
    /// assumed to live in a directory named like the package.
    pub fn to_record(&self) -> Result<StructRecord> {
        let needed = width_for(self.bool_fields.len()).ok_or_else(|| Error::UnsupportedWidth {
            name: self.original_name.clone(),
            count: self.bool_fields.len(),
        })?;
        let storage = match self.storage_type.as_deref() {
            None => needed,
            Some(name) => match StorageWidth::from_type_name(name) {
                Some(w) if w >= needed => w,
                _ => {
                    return Err(Error::config(format!(
                        "struct {}: storage type {name} cannot hold {} flags",
                        self.original_name,
                        self.bool_fields.len()
                    )))
                }
            },
        };
        Ok(StructRecord {
            package: self.package.clone(),
            package_path: self
                .package_path
                .clone()
                .unwrap_or_else(|| self.package.clone()),
            original_name: self.original_name.clone(),
            new_name: self.new_name.clone(),
            bool_fields: self.bool_fields.clone(),
            flag_mapping: self.flag_mapping.clone(),
            storage,
        })
    }
}

impl ContextMap {
    /// Snapshot of the registry of `ctx`.
    pub fn from_context(ctx: &Context) -> Self {
        Self {
            version: MAP_VERSION,
            input_file: ctx.run().input_root.display().to_string(),
            output_dir: ctx.run().output_root.display().to_string(),
            structs: ctx.structs().map(StructEntry::from).collect(),
        }
    }

    pub fn records(&self) -> Result<Vec<StructRecord>> {
        self.structs.iter().map(StructEntry::to_record).collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = self.to_json().map_err(|source| Error::MapFile {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, text + "\n").map_err(|e| Error::io(path, e))?;
        tracing::info!(path = %path.display(), structs = self.structs.len(), "map file written");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let map = Self::from_json(&text).map_err(|source| Error::MapFile {
            path: path.to_path_buf(),
            source,
        })?;
        if map.version > MAP_VERSION {
            return Err(Error::config(format!(
                "{}: map file version {} is newer than {MAP_VERSION}",
                path.display(),
                map.version
            )));
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_keys_and_unknown_keys() {
        let text = r#"{
            "inputFile": "in",
            "outputDir": "out",
            "comment": "ignored",
            "structs": [{
                "package": "p",
                "originalName": "Cfg",
                "newName": "CfgFlags",
                "boolFields": ["A", "B"],
                "flagMapping": {"A": "FlagP_Cfg_A", "B": "FlagP_Cfg_B"},
                "extra": true
            }]
        }"#;
        let map = ContextMap::from_json(text).unwrap();
        assert_eq!(map.version, MAP_VERSION);
        let recs = map.records().unwrap();
        assert_eq!(recs[0].package_path, "p");
        assert_eq!(recs[0].storage, StorageWidth::U8);
        assert_eq!(recs[0].flag_for("B"), Some("FlagP_Cfg_B"));
    }

    #[test]
    fn too_narrow_storage_is_rejected() {
        let entry = StructEntry {
            package: "p".into(),
            package_path: None,
            original_name: "S".into(),
            new_name: "SFlags".into(),
            bool_fields: (0..9).map(|i| format!("F{i}")).collect(),
            flag_mapping: BTreeMap::new(),
            storage_type: Some("uint8".into()),
        };
        assert!(entry.to_record().is_err());
    }
}
