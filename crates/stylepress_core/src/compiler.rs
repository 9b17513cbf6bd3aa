//! Stylesheet compilers.
//!
//! A [`SourceCompiler`] turns one indentation-based stylesheet into plain CSS.
//! The pipeline treats it as a pure function of its request and may call it
//! from several threads at once.

use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::CompileError;

/// Everything a compiler needs to compile one source.
#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
    /// Source text.
    pub source: &'a str,
    /// Logical path of the source, for diagnostics and relative imports.
    pub filename: &'a str,
    /// Extra search paths.
    pub include_paths: &'a [String],
    /// Files imported ahead of the source.
    pub import_files: &'a [String],
    /// Compiler-specific options, passed through untouched.
    pub options: &'a Map<String, Value>,
}

/// Output of a successful compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOutput {
    /// Compiled CSS.
    pub css: String,
    /// Source map of `css`, when the compiler produces one.
    pub source_map: Option<String>,
}

impl CompileOutput {
    /// Creates an output without a source map.
    pub fn css(css: impl Into<String>) -> Self {
        Self {
            css: css.into(),
            source_map: None,
        }
    }
}

/// Trait for compiling stylesheet sources to CSS.
pub trait SourceCompiler: Send + Sync {
    /// Returns the name of this compiler.
    fn name(&self) -> &str;

    /// Returns the source file extensions this compiler handles.
    ///
    /// Extensions should not include the leading dot (e.g., `["sass"]`).
    fn extensions(&self) -> &[&str];

    /// Compiles one source.
    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompileOutput, CompileError>;

    /// Returns true if `path` carries one of this compiler's extensions.
    fn can_compile(&self, path: &str) -> bool {
        let Some(extension) = crate::pipeline::extension_of(path) else {
            return false;
        };
        self.extensions()
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }
}

/// Compiles the indented Sass syntax with [`grass`].
///
/// `import_files` are injected as `@import` lines ahead of the source, and
/// error positions are shifted back so they point into the authored file.
/// The directory of the source is searched before `include_paths`.
///
/// Recognized `options`: `style` (`"expanded"` or `"compressed"`), `quiet`,
/// `allowsCharset` and `unicodeErrorMessages`. Other keys are ignored.
#[derive(Debug, Default, Clone, Copy)]
pub struct GrassCompiler;

/// Name grass gives to sources compiled from a string.
const GRASS_INPUT_NAME: &str = "stdin";

impl GrassCompiler {
    /// Creates a new compiler.
    pub fn new() -> Self {
        Self
    }

    fn options(request: &CompileRequest<'_>) -> grass::Options<'static> {
        let mut options = grass::Options::default().input_syntax(grass::InputSyntax::Sass);

        if let Some(dir) = Path::new(request.filename).parent()
            && !dir.as_os_str().is_empty()
        {
            options = options.load_path(dir);
        }
        for include_path in request.include_paths {
            options = options.load_path(include_path);
        }

        for (key, value) in request.options {
            options = match (key.as_str(), value) {
                ("style", Value::String(style)) if style == "compressed" => {
                    options.style(grass::OutputStyle::Compressed)
                }
                ("style", Value::String(style)) if style == "expanded" => {
                    options.style(grass::OutputStyle::Expanded)
                }
                ("quiet", Value::Bool(quiet)) => options.quiet(*quiet),
                ("allowsCharset", Value::Bool(allows)) => options.allows_charset(*allows),
                ("unicodeErrorMessages", Value::Bool(unicode)) => {
                    options.unicode_error_messages(*unicode)
                }
                _ => {
                    debug!("Ignoring compiler option '{}' = {}", key, value);
                    options
                }
            };
        }

        options
    }

    fn to_compile_error(error: Box<grass::Error>, prelude_lines: u32) -> CompileError {
        let rendered = error.to_string();
        match (*error).kind() {
            grass::ErrorKind::ParseError { message, loc, .. } => {
                if loc.file.name() != GRASS_INPUT_NAME {
                    return CompileError::new(format!("{} ({})", message, loc.file.name()));
                }
                let line = loc.begin.line as u32 + 1;
                let column = loc.begin.column as u32 + 1;
                match line.checked_sub(prelude_lines) {
                    Some(line) if line > 0 => CompileError::at(message, line, column),
                    _ => CompileError::new(message),
                }
            }
            _ => CompileError::new(rendered),
        }
    }
}

/// Builds the `@import` lines injected ahead of every source, one line per
/// file.
fn import_prelude(import_files: &[String]) -> Result<String, CompileError> {
    let mut prelude = String::new();
    for file in import_files {
        if file.contains(['\n', '\r']) {
            return Err(CompileError::new(format!(
                "Import file name contains a line break: {:?}",
                file
            )));
        }
        prelude.push_str(&format!("@import \"{}\"\n", file.replace('"', "\\\"")));
    }
    Ok(prelude)
}

impl SourceCompiler for GrassCompiler {
    fn name(&self) -> &str {
        "grass"
    }

    fn extensions(&self) -> &[&str] {
        &["sass"]
    }

    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompileOutput, CompileError> {
        let prelude = import_prelude(request.import_files)?;
        let prelude_lines = request.import_files.len() as u32;
        let input = format!("{}{}", prelude, request.source);

        grass::from_string(input, &Self::options(request))
            .map(CompileOutput::css)
            .map_err(|e| Self::to_compile_error(e, prelude_lines))
    }
}
