//! File set: maps byte offsets of registered files to `path:line:column`.

use std::fmt;
use std::path::{Path, PathBuf};

/// Handle of a file registered in a [`FileSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FileId(u32);

impl FileId {
    pub const fn raw(self) -> u32 {
        self.0
    }
}

#[derive(Debug)]
struct FileEntry {
    path: PathBuf,
    /// Byte offset of the first byte of every line.
    line_starts: Vec<u32>,
}

/// Resolved source position; lines and columns are 1-based, columns count bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub path: PathBuf,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.path.display(), self.line, self.column)
    }
}

#[derive(Debug, Default)]
pub struct FileSet {
    files: Vec<FileEntry>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, path: &Path, src: &str) -> FileId {
        let mut line_starts = vec![0u32];
        line_starts.extend(
            memchr::memchr_iter(b'\n', src.as_bytes()).map(|i| (i + 1) as u32),
        );
        let id = FileId(self.files.len() as u32);
        self.files.push(FileEntry {
            path: path.to_path_buf(),
            line_starts,
        });
        id
    }

    pub fn path(&self, file: FileId) -> Option<&Path> {
        self.files.get(file.0 as usize).map(|f| f.path.as_path())
    }

    /// Position of `offset` in `file`; `None` for unknown files.
    pub fn position(&self, file: FileId, offset: u32) -> Option<Position> {
        let entry = self.files.get(file.0 as usize)?;
        let line = match entry.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        Some(Position {
            path: entry.path.clone(),
            line: line as u32 + 1,
            column: offset - entry.line_starts[line] + 1,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
