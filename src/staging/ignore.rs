//! Ignore rules for staged files
//!
//! Glob patterns, matched against paths relative to the staging root,
//! naming files that take no part in a release (editor droppings and the
//! like). Nothing is ignored by default.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Errors for ignore rules
#[derive(Debug, thiserror::Error)]
pub enum IgnoreError {
    #[error("cannot read ignore file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Glob pattern error: {0}")]
    GlobError(#[from] globset::Error),
}

/// Ignore rules for filtering staged files
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    patterns: Vec<String>,
    glob_set: GlobSet,
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            glob_set: GlobSet::empty(),
        }
    }
}

impl IgnoreRules {
    /// Create rules from a list of glob patterns
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, IgnoreError> {
        Self::default().with_patterns(patterns)
    }

    /// Add patterns from an ignore file (one glob per line, `#` comments)
    pub fn with_ignore_file(self, path: &Path) -> Result<Self, IgnoreError> {
        let contents = fs::read_to_string(path).map_err(|source: io::Error| IgnoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let patterns: Vec<&str> = contents
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .collect();

        self.with_patterns(&patterns)
    }

    /// Add additional patterns
    pub fn with_patterns<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self, IgnoreError> {
        for pattern in patterns {
            let pattern = pattern.as_ref().trim();
            if !pattern.is_empty() {
                self.patterns.push(pattern.to_string());
            }
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in &self.patterns {
            builder.add(Glob::new(pattern)?);
        }
        self.glob_set = builder.build()?;
        Ok(self)
    }

    /// Check if a relative path should be ignored
    pub fn is_ignored(&self, path: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let path_str = path.to_string_lossy().replace('\\', "/");
        self.glob_set.is_match(path_str.as_str())
    }

    /// Whether any patterns are configured
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
