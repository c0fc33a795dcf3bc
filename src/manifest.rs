//! `go.mod` reading. Only the `module` line is consumed.

use std::path::Path;

use crate::error::{Error, Result};

/// Module path declared by the first `module <path>` line of `text`.
pub fn parse_module_path(text: &str) -> Option<String> {
    text.lines().find_map(|line| {
        let line = line.split("//").next().unwrap_or(line).trim();
        let rest = line.strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let path = rest.trim().trim_matches(|c| c == '"' || c == '`');
        (!path.is_empty()).then(|| path.to_string())
    })
}

/// Reads the module path from the manifest at `path`.
///
/// # Errors
///
/// [`Error::ModuleManifestMissing`] when the file cannot be read or declares
/// no module.
pub fn read_module_path(path: &Path) -> Result<String> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        tracing::debug!(path = %path.display(), error = %e, "module manifest unreadable");
        Error::ModuleManifestMissing(path.to_path_buf())
    })?;
    parse_module_path(&text).ok_or_else(|| Error::ModuleManifestMissing(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_module_line_wins() {
        let text = "// comment\nmodule example.com/proj // trailing\n\ngo 1.22\nmodule other\n";
        assert_eq!(parse_module_path(text).as_deref(), Some("example.com/proj"));
    }

    #[test]
    fn quoted_and_missing() {
        assert_eq!(
            parse_module_path("module \"example.com/q\"\n").as_deref(),
            Some("example.com/q")
        );
        assert_eq!(parse_module_path("modules x\ngo 1.21\n"), None);
    }
}
