//! Recording engine doubles for pipeline tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use stylepress_cache::TransformCache;

use crate::compiler::{CompileOutput, CompileRequest, SourceCompiler};
use crate::config::PipelineConfig;
use crate::error::{CompileError, PrefixError};
use crate::pipeline::FileTransformPipeline;
use crate::prefixer::{PrefixProcessor, PrefixRequest};

/// Compiles a tiny indentation dialect: unindented lines are selectors,
/// indented lines are `property value` pairs. A line starting with `!!` is
/// a syntax error.
pub fn toy_compile(source: &str) -> Result<String, CompileError> {
    let mut css = String::new();
    let mut open = false;

    for (index, line) in source.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let line_no = index as u32 + 1;
        let column = (line.len() - line.trim_start().len()) as u32 + 1;

        if trimmed.starts_with("!!") {
            return Err(CompileError::at(
                format!("Unexpected token \"{}\"", trimmed),
                line_no,
                column,
            ));
        }

        if column == 1 {
            if open {
                css.push('}');
            }
            css.push_str(trimmed);
            css.push('{');
            open = true;
        } else {
            let (property, value) = trimmed.split_once(char::is_whitespace).ok_or_else(|| {
                CompileError::at(format!("Expected a value for \"{}\"", trimmed), line_no, column)
            })?;
            if !css.ends_with('{') {
                css.push(';');
            }
            css.push_str(property);
            css.push(':');
            css.push_str(value.trim());
        }
    }

    if open {
        css.push('}');
    }
    Ok(css)
}

/// Owned copy of a [`CompileRequest`].
#[derive(Debug, Clone)]
pub struct RecordedCompile {
    pub source: String,
    pub filename: String,
    pub include_paths: Vec<String>,
    pub import_files: Vec<String>,
    pub options: Map<String, Value>,
}

#[derive(Debug)]
enum CompileBehavior {
    Toy,
    Slow(Duration),
    Panic,
}

/// A [`SourceCompiler`] that counts and records its calls.
#[derive(Debug)]
pub struct RecordingCompiler {
    behavior: CompileBehavior,
    calls: AtomicUsize,
    requests: Mutex<Vec<RecordedCompile>>,
}

impl RecordingCompiler {
    fn with_behavior(behavior: CompileBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Compiles with [`toy_compile`].
    pub fn toy() -> Self {
        Self::with_behavior(CompileBehavior::Toy)
    }

    /// Sleeps for `delay`, then compiles with [`toy_compile`].
    pub fn slow(delay: Duration) -> Self {
        Self::with_behavior(CompileBehavior::Slow(delay))
    }

    /// Panics on every call.
    pub fn panicking() -> Self {
        Self::with_behavior(CompileBehavior::Panic)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedCompile> {
        self.requests.lock().clone()
    }
}

impl SourceCompiler for RecordingCompiler {
    fn name(&self) -> &str {
        "recording"
    }

    fn extensions(&self) -> &[&str] {
        &["styl"]
    }

    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompileOutput, CompileError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(RecordedCompile {
            source: request.source.to_string(),
            filename: request.filename.to_string(),
            include_paths: request.include_paths.to_vec(),
            import_files: request.import_files.to_vec(),
            options: request.options.clone(),
        });

        match self.behavior {
            CompileBehavior::Toy => {}
            CompileBehavior::Slow(delay) => std::thread::sleep(delay),
            CompileBehavior::Panic => panic!("compiler crashed"),
        }

        toy_compile(request.source).map(CompileOutput::css)
    }
}

/// Owned copy of a [`PrefixRequest`].
#[derive(Debug, Clone)]
pub struct RecordedPrefix {
    pub css: String,
    pub from: String,
    pub to: String,
}

/// A [`PrefixProcessor`] that counts and records its calls.
#[derive(Debug)]
pub struct RecordingPrefixer {
    failure: Option<String>,
    calls: AtomicUsize,
    requests: Mutex<Vec<RecordedPrefix>>,
}

impl RecordingPrefixer {
    /// Returns the CSS unchanged.
    pub fn identity() -> Self {
        Self {
            failure: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fails every call with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::identity()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedPrefix> {
        self.requests.lock().clone()
    }
}

impl PrefixProcessor for RecordingPrefixer {
    fn name(&self) -> &str {
        "recording"
    }

    fn process(&self, request: &PrefixRequest<'_>) -> Result<String, PrefixError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(RecordedPrefix {
            css: request.css.to_string(),
            from: request.from.to_string(),
            to: request.to.to_string(),
        });

        match &self.failure {
            Some(message) => Err(PrefixError::new(message.clone())),
            None => Ok(request.css.to_string()),
        }
    }
}

/// Builds a pipeline around the given doubles.
pub fn pipeline_with(
    compiler: Arc<RecordingCompiler>,
    prefixer: Arc<RecordingPrefixer>,
    config: PipelineConfig,
) -> FileTransformPipeline {
    let cache = Arc::new(TransformCache::new(config.cache_capacity));
    FileTransformPipeline::new(compiler, prefixer, cache, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_toy_compile() {
        assert_eq!(toy_compile("body\n  color red").unwrap(), "body{color:red}");
        assert_eq!(
            toy_compile("a\n  color red\n  width 1px\nb\n  margin 0").unwrap(),
            "a{color:red;width:1px}b{margin:0}"
        );
    }

    #[test]
    fn test_toy_compile_error_position() {
        let err = toy_compile("a\n    !!x").unwrap_err();
        assert_eq!(err.line, Some(2));
        assert_eq!(err.column, Some(5));
    }
}
