//! Source map for tracking file locations.

use beancheck_parser::Span;
use std::path::{Path, PathBuf};

/// A source file in the source map.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Unique ID for this file.
    pub id: usize,
    /// Path to the file.
    pub path: PathBuf,
    /// Source content.
    pub source: String,
    /// Byte offsets where each line starts.
    line_starts: Vec<usize>,
}

impl SourceFile {
    fn new(id: usize, path: PathBuf, source: String) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();

        Self {
            id,
            path,
            source,
            line_starts,
        }
    }

    /// Get the line and column (1-based) for a byte offset.
    #[must_use]
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        (line + 1, offset - self.line_starts[line] + 1)
    }

    /// Get the 1-based line of a span's start.
    #[must_use]
    pub fn line_of(&self, span: &Span) -> usize {
        self.line_col(span.start).0
    }

    /// Get a specific line (1-based), without its newline.
    #[must_use]
    pub fn line(&self, line_num: usize) -> Option<&str> {
        let start = *self.line_starts.get(line_num.checked_sub(1)?)?;
        let end = self
            .line_starts
            .get(line_num)
            .map_or(self.source.len(), |next| next - 1);
        Some(self.source[start..end].trim_end_matches('\r'))
    }
}

/// The files that make up a loaded ledger.
#[derive(Debug, Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

impl SourceMap {
    /// Create a new source map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file and return its ID.
    pub fn add_file(&mut self, path: PathBuf, source: String) -> usize {
        let id = self.files.len();
        self.files.push(SourceFile::new(id, path, source));
        id
    }

    /// Get a file by ID.
    #[must_use]
    pub fn get(&self, id: usize) -> Option<&SourceFile> {
        self.files.get(id)
    }

    /// Get a file by path.
    #[must_use]
    pub fn get_by_path(&self, path: &Path) -> Option<&SourceFile> {
        self.files.iter().find(|f| f.path == path)
    }

    /// All files, in load order.
    #[must_use]
    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col() {
        let mut map = SourceMap::new();
        let id = map.add_file(PathBuf::from("a.beancount"), "line one\nline two\n".to_string());
        let file = map.get(id).unwrap();

        assert_eq!(file.line_col(0), (1, 1));
        assert_eq!(file.line_col(5), (1, 6));
        assert_eq!(file.line_col(9), (2, 1));
        assert_eq!(file.line_of(&Span::new(12, 15)), 2);
    }

    #[test]
    fn test_line_text() {
        let mut map = SourceMap::new();
        map.add_file(PathBuf::from("a.beancount"), "first\r\nsecond".to_string());
        let file = map.get_by_path(Path::new("a.beancount")).unwrap();

        assert_eq!(file.line(1), Some("first"));
        assert_eq!(file.line(2), Some("second"));
        assert_eq!(file.line(0), None);
        assert_eq!(file.line(3), None);
    }
}
