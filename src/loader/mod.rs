//! Sources of program text for the lexer.

use std::{
    collections::VecDeque,
    fs, io,
    path::{Path, PathBuf},
};

/// Feeds source lines to the lexer, one at a time.
pub trait CodeProvider {
    fn next_line(&mut self) -> Option<String>;
}

/// Reads a `.ne` file from disk.
pub struct FileCodeProvider {
    lines: VecDeque<String>,
}

impl FileCodeProvider {
    pub fn new(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self {
            lines: content.lines().map(str::to_owned).collect(),
        })
    }
}

impl CodeProvider for FileCodeProvider {
    fn next_line(&mut self) -> Option<String> {
        self.lines.pop_front()
    }
}

/// Serves a fixed list of lines. Used by tests.
pub struct StringCodeProvider {
    lines: VecDeque<String>,
}

impl StringCodeProvider {
    pub fn new(lines: Vec<String>) -> Self {
        Self {
            lines: lines.into(),
        }
    }

    pub fn from_source(source: &str) -> Self {
        Self::new(source.lines().map(str::to_owned).collect())
    }
}

impl CodeProvider for StringCodeProvider {
    fn next_line(&mut self) -> Option<String> {
        self.lines.pop_front()
    }
}

/// Resolve an import path relative to the directory of the importing file.
pub fn resolve_import(directory: &Path, file_name: &str) -> PathBuf {
    let joined = directory.join(file_name);
    fs::canonicalize(&joined).unwrap_or(joined)
}
