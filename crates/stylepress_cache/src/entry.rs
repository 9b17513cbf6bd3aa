//! Cache key and entry types.

use std::fmt;

/// Identity of one transform result.
///
/// Combines the logical path of the source with a fingerprint of its
/// contents. Two sources with the same key are assumed to compile to
/// byte-identical CSS.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Logical path of the source inside its package.
    pub path: String,

    /// Fingerprint of the source contents.
    pub source_hash: String,
}

impl CacheKey {
    /// Creates a new cache key.
    pub fn new(path: impl Into<String>, source_hash: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source_hash: source_hash.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.path, self.source_hash)
    }
}

/// The final, prefixed CSS produced for a [`CacheKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedArtifact {
    /// Prefixed CSS text.
    pub css: String,
}

impl CachedArtifact {
    /// Creates a new artifact.
    pub fn new(css: impl Into<String>) -> Self {
        Self { css: css.into() }
    }
}
