use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Tunables of the passes and of the project walker.
///
/// Deserialized from the `--config` JSON file; every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformOptions {
    /// Strings whose decoded length is below this are left readable.
    pub short_string_min_len: usize,
    /// Structs with fewer bool fields are not packed.
    pub min_bool_fields: usize,
    /// Minimum number of `v == lit` links before an if-chain becomes a table.
    pub jump_table_min_chain: usize,
    /// Directory names copied verbatim and never parsed.
    pub exclude_dirs: Vec<String>,
    pub source_extension: String,
    pub test_suffix: String,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            short_string_min_len: 4,
            min_bool_fields: 1,
            jump_table_min_chain: 3,
            exclude_dirs: vec![".git".to_string(), "vendor".to_string()],
            source_extension: "go".to_string(),
            test_suffix: "_test.go".to_string(),
        }
    }
}

impl TransformOptions {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_json(&text).map_err(|e| Error::config(format!("{}: {e}", path.display())))
    }

    pub fn is_excluded_dir(&self, name: &str) -> bool {
        self.exclude_dirs.iter().any(|d| d == name)
    }

    /// True for files the walker parses.
    pub fn is_source_file(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        path.extension().and_then(|e| e.to_str()) == Some(self.source_extension.as_str())
            && !name.ends_with(self.test_suffix.as_str())
    }
}

/// Parameters of one run.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub input_root: PathBuf,
    pub output_root: PathBuf,
    pub module_manifest_path: PathBuf,
    pub map_file_path: Option<PathBuf>,
    pub resume_map_path: Option<PathBuf>,
    pub verbose: bool,
    pub dry_run: bool,
    /// Enables the string obfuscation pass.
    pub obfuscate: bool,
}

impl RunConfig {
    /// Run over `input` writing to `output`, manifest at `<input>/go.mod`.
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        let input_root = input.into();
        let module_manifest_path = input_root.join("go.mod");
        Self {
            input_root,
            output_root: output.into(),
            module_manifest_path,
            map_file_path: None,
            resume_map_path: None,
            verbose: false,
            dry_run: false,
            obfuscate: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let opts = TransformOptions::from_json(r#"{"shortStringMinLen": 8, "extra": 1}"#).unwrap();
        assert_eq!(opts.short_string_min_len, 8);
        assert_eq!(opts.jump_table_min_chain, 3);
        assert_eq!(opts.exclude_dirs, vec![".git", "vendor"]);
    }

    #[test]
    fn test_files_are_not_sources() {
        let opts = TransformOptions::default();
        assert!(opts.is_source_file(Path::new("a/b.go")));
        assert!(!opts.is_source_file(Path::new("a/b_test.go")));
        assert!(!opts.is_source_file(Path::new("a/go.mod")));
    }
}
