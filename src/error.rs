use std::path::PathBuf;

use gomorph_syntax::{ParseFailure, Position};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can stop a run.
///
/// Parse failures and type diagnostics of individual files are not errors of
/// the run: the walker logs them and the file is copied verbatim.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{}: {failure}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        failure: ParseFailure,
    },

    #[error("conflicting registration for {package_path}.{name}: {detail}")]
    RegistryConflict {
        package_path: String,
        name: String,
        detail: String,
    },

    #[error("{}: {message}", .path.display())]
    PassInternal {
        pass: &'static str,
        path: PathBuf,
        message: String,
        position: Option<Position>,
    },

    #[error("module manifest not found: {}", .0.display())]
    ModuleManifestMissing(PathBuf),

    #[error("{0}")]
    Config(String),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", .path.display())]
    MapFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("struct {name} has {count} bool fields, a flag word holds at most 64")]
    UnsupportedWidth { name: String, count: usize },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) | Error::ModuleManifestMissing(_) => 2,
            Error::Io { .. } | Error::MapFile { .. } => 3,
            Error::RegistryConflict { .. } => 4,
            Error::PassInternal { .. } | Error::UnsupportedWidth { .. } => 5,
            Error::Parse { .. } => 1,
        }
    }

    /// Short kind tag used in the one-line error report.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Parse { .. } => "parse",
            Error::RegistryConflict { .. } => "registry-conflict",
            Error::PassInternal { .. } => "pass-internal",
            Error::ModuleManifestMissing(_) => "module-manifest-missing",
            Error::Config(_) => "config",
            Error::Io { .. } => "io",
            Error::MapFile { .. } => "map-file",
            Error::UnsupportedWidth { .. } => "unsupported-width",
        }
    }

    /// Pass that raised the error, if any.
    pub fn pass(&self) -> Option<&'static str> {
        match self {
            Error::PassInternal { pass, .. } => Some(pass),
            _ => None,
        }
    }

    /// Source location for verbose reports.
    pub fn position(&self) -> Option<&Position> {
        match self {
            Error::PassInternal { position, .. } => position.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_the_cli_contract() {
        assert_eq!(Error::config("unknown pass `x`").exit_code(), 2);
        assert_eq!(Error::ModuleManifestMissing("go.mod".into()).exit_code(), 2);
        let io = Error::io("out", std::io::Error::other("disk full"));
        assert_eq!(io.exit_code(), 3);
        let conflict = Error::RegistryConflict {
            package_path: "p".into(),
            name: "Cfg".into(),
            detail: "different fields".into(),
        };
        assert_eq!(conflict.exit_code(), 4);
        let internal = Error::PassInternal {
            pass: "StructOfBoolsToFlags",
            path: "a.go".into(),
            message: "positional literal".into(),
            position: None,
        };
        assert_eq!(internal.exit_code(), 5);
        assert_eq!(internal.pass(), Some("StructOfBoolsToFlags"));
    }
}
