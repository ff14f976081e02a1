//! Ledger file loader with include resolution.
//!
//! Reads the root file, resolves `include` lines recursively, collects
//! options and plugins, and stamps every directive and posting with the
//! `filename`/`lineno` metadata that downstream reports use to point back
//! into the source.
//!
//! # Example
//!
//! ```no_run
//! use beancheck_loader::load;
//! use std::path::Path;
//!
//! let result = load(Path::new("ledger.beancount"))?;
//! for directive in &result.directives {
//!     println!("{}", directive.type_name());
//! }
//! # Ok::<(), beancheck_loader::LoadError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod options;
mod source_map;

pub use options::{OptionWarning, Options};
pub use source_map::{SourceFile, SourceMap};

use beancheck_core::{meta, Directive};
use beancheck_parser::{ParseError, Span};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during loading.
#[derive(Debug, Error)]
pub enum LoadError {
    /// IO error reading a file.
    #[error("failed to read file {path}: {source}")]
    Io {
        /// The path that failed to read.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Include cycle detected.
    #[error("include cycle detected: {}", .cycle.join(" -> "))]
    IncludeCycle {
        /// The cycle of file paths.
        cycle: Vec<String>,
    },

    /// An `include` line that could not be loaded.
    #[error("{source}")]
    Include {
        /// File containing the include line.
        path: PathBuf,
        /// Line of the include.
        line: usize,
        /// Why the include failed.
        source: Box<LoadError>,
    },

    /// A syntax error.
    #[error("{error}")]
    Parse {
        /// File containing the error.
        path: PathBuf,
        /// Line of the error.
        line: usize,
        /// The parse error.
        #[source]
        error: ParseError,
    },

    /// A problem with an `option` line.
    #[error("{message}")]
    Option {
        /// File containing the option.
        path: PathBuf,
        /// Line of the option.
        line: usize,
        /// Warning code.
        code: &'static str,
        /// Description.
        message: String,
    },
}

impl LoadError {
    /// File and line the error points at, when it has one.
    #[must_use]
    pub fn location(&self) -> Option<(&Path, usize)> {
        match self {
            Self::Include { path, line, .. }
            | Self::Parse { path, line, .. }
            | Self::Option { path, line, .. } => Some((path.as_path(), *line)),
            Self::Io { .. } | Self::IncludeCycle { .. } => None,
        }
    }
}

/// Result of loading a ledger file.
#[derive(Debug)]
pub struct LoadResult {
    /// All directives from all files, root file first, each file in order.
    pub directives: Vec<Directive>,
    /// Parsed options.
    pub options: Options,
    /// Plugins declared in the ledger.
    pub plugins: Vec<Plugin>,
    /// Source map for error reporting.
    pub source_map: SourceMap,
    /// Non-fatal errors encountered during loading.
    pub errors: Vec<LoadError>,
}

/// A plugin directive.
#[derive(Debug, Clone)]
pub struct Plugin {
    /// Plugin module name.
    pub name: String,
    /// Optional configuration string.
    pub config: Option<String>,
    /// Source location.
    pub span: Span,
    /// File this plugin was declared in.
    pub file_id: usize,
}

/// Ledger file loader.
#[derive(Debug, Default)]
pub struct Loader {
    /// Files already loaded; a second include of the same file is a no-op.
    loaded_files: HashSet<PathBuf>,
    /// Files currently being loaded, for cycle detection.
    include_stack: Vec<PathBuf>,
}

struct Collected {
    directives: Vec<Directive>,
    options: Options,
    plugins: Vec<Plugin>,
    source_map: SourceMap,
    errors: Vec<LoadError>,
}

impl Loader {
    /// Create a new loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a ledger file and all its includes.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Io`] when the root file cannot be read. Problems
    /// in the ledger itself, including broken includes, are collected in
    /// [`LoadResult::errors`] instead.
    pub fn load(&mut self, path: &Path) -> Result<LoadResult, LoadError> {
        let canonical = path.canonicalize().map_err(|e| LoadError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut out = Collected {
            directives: Vec::new(),
            options: Options::new(),
            plugins: Vec::new(),
            source_map: SourceMap::new(),
            errors: Vec::new(),
        };
        out.options.filename = Some(canonical.display().to_string());

        self.load_recursive(&canonical, &mut out)?;
        debug!(
            files = out.source_map.files().len(),
            directives = out.directives.len(),
            errors = out.errors.len(),
            "loaded ledger"
        );

        Ok(LoadResult {
            directives: out.directives,
            options: out.options,
            plugins: out.plugins,
            source_map: out.source_map,
            errors: out.errors,
        })
    }

    fn load_recursive(&mut self, path: &Path, out: &mut Collected) -> Result<(), LoadError> {
        let path_buf = path.to_path_buf();
        if self.include_stack.contains(&path_buf) {
            let mut cycle: Vec<String> = self
                .include_stack
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            cycle.push(path.display().to_string());
            return Err(LoadError::IncludeCycle { cycle });
        }
        if self.loaded_files.contains(path) {
            return Ok(());
        }

        let source = fs::read_to_string(path).map_err(|e| LoadError::Io {
            path: path_buf.clone(),
            source: e,
        })?;
        let result = beancheck_parser::parse(&source);
        let file_id = out.source_map.add_file(path_buf.clone(), source);
        let Some(file) = out.source_map.get(file_id) else {
            return Ok(());
        };

        self.include_stack.push(path_buf.clone());
        self.loaded_files.insert(path_buf.clone());

        for error in result.errors {
            out.errors.push(LoadError::Parse {
                path: path_buf.clone(),
                line: file.line_of(&error.span),
                error,
            });
        }

        for (key, value, span) in &result.options {
            if let Some(warning) = out.options.set(key, value) {
                out.errors.push(LoadError::Option {
                    path: path_buf.clone(),
                    line: file.line_of(span),
                    code: warning.code,
                    message: warning.message,
                });
            }
        }

        for (name, config, span) in result.plugins {
            out.plugins.push(Plugin {
                name,
                config,
                span,
                file_id,
            });
        }

        let filename = path.display().to_string();
        for spanned in result.directives {
            let mut directive = spanned.into_inner();
            stamp_filename(&mut directive, &filename);
            out.directives.push(directive);
        }

        let includes: Vec<(PathBuf, usize)> = result
            .includes
            .iter()
            .map(|(include, span)| {
                let base_dir = path.parent().unwrap_or(Path::new("."));
                (base_dir.join(include), file.line_of(span))
            })
            .collect();

        for (target, line) in includes {
            let loaded = target
                .canonicalize()
                .map_err(|e| LoadError::Io {
                    path: target.clone(),
                    source: e,
                })
                .and_then(|canonical| self.load_recursive(&canonical, out));
            if let Err(e) = loaded {
                out.errors.push(LoadError::Include {
                    path: path_buf.clone(),
                    line,
                    source: Box::new(e),
                });
            }
        }

        self.include_stack.pop();
        Ok(())
    }
}

fn stamp_filename(directive: &mut Directive, filename: &str) {
    meta::set_filename(directive.meta_mut(), filename);
    if let Directive::Transaction(txn) = directive {
        for posting in &mut txn.postings {
            meta::set_filename(&mut posting.meta, filename);
        }
    }
}

/// Load a ledger file.
///
/// Convenience wrapper around [`Loader::load`].
pub fn load(path: &Path) -> Result<LoadResult, LoadError> {
    Loader::new().load(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_stamps_filename_and_line() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "2024-01-01 open Assets:Cash").unwrap();
        writeln!(file, "2024-01-02 * \"Coffee\"").unwrap();
        writeln!(file, "  Assets:Cash  -3.00 USD").unwrap();
        writeln!(file, "  Expenses:Food").unwrap();

        let result = load(file.path()).unwrap();
        assert!(result.errors.is_empty());

        let expected = file.path().canonicalize().unwrap().display().to_string();
        let txn = result.directives[1].as_transaction().unwrap();
        let loc = result.directives[1].location().unwrap();
        assert_eq!(loc.file, expected);
        assert_eq!(loc.line, 2);

        let posting_loc = txn.postings[1].location().unwrap();
        assert_eq!(posting_loc.file, expected);
        assert_eq!(posting_loc.line, 4);
    }

    #[test]
    fn test_parse_errors_carry_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "2024-01-01 open Assets:Cash").unwrap();
        writeln!(file, "not valid").unwrap();

        let result = load(file.path()).unwrap();
        assert_eq!(result.errors.len(), 1);
        let (_, line) = result.errors[0].location().unwrap();
        assert_eq!(line, 2);
        assert_eq!(result.directives.len(), 1);
    }

    #[test]
    fn test_option_warnings_are_errors() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "option \"title\" \"Books\"").unwrap();
        writeln!(file, "option \"bogus\" \"x\"").unwrap();

        let result = load(file.path()).unwrap();
        assert_eq!(result.options.title.as_deref(), Some("Books"));
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].to_string(), "Invalid option \"bogus\"");
        assert_eq!(result.errors[0].location().unwrap().1, 2);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = load(Path::new("/nonexistent/ledger.beancount")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
