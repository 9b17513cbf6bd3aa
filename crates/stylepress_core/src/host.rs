//! Boundary types shared with the host build system.

use parking_lot::Mutex;
use stylepress_cache::TransformCache;

/// A compiled CSS artifact handed to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stylesheet {
    /// Output path of the artifact.
    pub path: String,
    /// CSS text.
    pub data: String,
}

/// A per-file diagnostic handed to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Human readable message.
    pub message: String,
    /// 1-based line in the authored source, when known.
    pub line: Option<u32>,
    /// 1-based column in the authored source, when known.
    pub column: Option<u32>,
}

/// One stylesheet source offered by the host for a build pass.
///
/// The source accessors are read-only. The two sinks receive exactly one
/// call between them per pipeline run.
pub trait InputFile: Send + Sync {
    /// Logical path inside the package. Used as part of the cache key and as
    /// the basis for the output path.
    fn path_in_package(&self) -> &str;

    /// Full source text.
    fn contents_as_string(&self) -> &str;

    /// Deterministic fingerprint of [`contents_as_string`](Self::contents_as_string).
    fn source_hash(&self) -> &str;

    /// Registers a compiled stylesheet for this file.
    fn add_stylesheet(&self, stylesheet: Stylesheet);

    /// Registers a diagnostic for this file.
    fn error(&self, diagnostic: Diagnostic);
}

/// An in-memory [`InputFile`] that records what it receives.
///
/// Useful for hosts that already hold sources in memory, and in tests.
#[derive(Debug)]
pub struct SourceFile {
    path: String,
    contents: String,
    source_hash: String,
    stylesheets: Mutex<Vec<Stylesheet>>,
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl SourceFile {
    /// Creates a source file, fingerprinting `contents` with BLAKE3.
    pub fn new(path: impl Into<String>, contents: impl Into<String>) -> Self {
        let contents = contents.into();
        let source_hash = TransformCache::hash_content(&contents);
        Self::with_hash(path, contents, source_hash)
    }

    /// Creates a source file with a hash supplied by the caller.
    pub fn with_hash(
        path: impl Into<String>,
        contents: impl Into<String>,
        source_hash: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
            source_hash: source_hash.into(),
            stylesheets: Mutex::new(Vec::new()),
            diagnostics: Mutex::new(Vec::new()),
        }
    }

    /// Returns the stylesheets registered so far.
    pub fn stylesheets(&self) -> Vec<Stylesheet> {
        self.stylesheets.lock().clone()
    }

    /// Returns the diagnostics registered so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().clone()
    }
}

impl InputFile for SourceFile {
    fn path_in_package(&self) -> &str {
        &self.path
    }

    fn contents_as_string(&self) -> &str {
        &self.contents
    }

    fn source_hash(&self) -> &str {
        &self.source_hash
    }

    fn add_stylesheet(&self, stylesheet: Stylesheet) {
        self.stylesheets.lock().push(stylesheet);
    }

    fn error(&self, diagnostic: Diagnostic) {
        self.diagnostics.lock().push(diagnostic);
    }
}
