//! Vendor prefixing of compiled CSS.

use base64::{Engine, engine::general_purpose::STANDARD};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use parcel_sourcemap::{OriginalLocation, SourceMap, SourceMapError};
use tracing::debug;

use crate::config::PipelineConfig;
use crate::error::PrefixError;

/// Start of the comment that carries an inline source map.
pub const SOURCE_MAP_PREFIX: &str = "/*# sourceMappingURL=data:application/json;base64,";

/// Everything a prefixer needs to process one compiled stylesheet.
#[derive(Debug, Clone, Copy)]
pub struct PrefixRequest<'a> {
    /// Compiled CSS.
    pub css: &'a str,
    /// Source map JSON produced by the compiler, if any.
    pub source_map: Option<&'a str>,
    /// Path of the authored source.
    pub from: &'a str,
    /// Path of the CSS artifact.
    pub to: &'a str,
}

/// Trait for adding vendor prefixes to CSS.
pub trait PrefixProcessor: Send + Sync {
    /// Returns the name of this prefixer.
    fn name(&self) -> &str;

    /// Returns the prefixed CSS.
    fn process(&self, request: &PrefixRequest<'_>) -> Result<String, PrefixError>;
}

/// Adds the prefixes required by a set of browserslist targets, using
/// [`lightningcss`].
///
/// Without `minify`, CSS that needs nothing for the targets is returned as
/// it came in. Otherwise the stylesheet is printed again by the engine.
/// When source maps are enabled the output ends with an inline map whose
/// source is `from`, relative to the directory of `to`.
#[derive(Debug, Clone)]
pub struct LightningPrefixer {
    targets: Targets,
    minify: bool,
    source_map: bool,
}

impl LightningPrefixer {
    /// Creates a prefixer for the given browserslist queries, with inline
    /// source maps enabled.
    pub fn new(queries: &[String], minify: bool) -> Result<Self, PrefixError> {
        let browsers = Browsers::from_browserslist(queries)
            .map_err(|e| PrefixError::new(format!("Invalid browserslist query: {}", e)))?;

        Ok(Self {
            targets: Targets {
                browsers,
                ..Targets::default()
            },
            minify,
            source_map: true,
        })
    }

    /// Enables or disables the inline source map.
    pub fn with_source_map(mut self, enabled: bool) -> Self {
        self.source_map = enabled;
        self
    }

    /// Creates a prefixer from the `browsers`, `minify` and `sourceMap`
    /// settings.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PrefixError> {
        Ok(Self::new(&config.browsers, config.minify)?.with_source_map(config.source_map))
    }

    fn print(
        &self,
        request: &PrefixRequest<'_>,
        targets: Targets,
        source_map: Option<&mut SourceMap>,
    ) -> Result<String, PrefixError> {
        let mut stylesheet = StyleSheet::parse(
            request.css,
            ParserOptions {
                filename: request.from.to_string(),
                ..ParserOptions::default()
            },
        )
        .map_err(|e| PrefixError::new(e.to_string()))?;

        stylesheet
            .minify(MinifyOptions {
                targets: targets.clone(),
                ..MinifyOptions::default()
            })
            .map_err(|e| PrefixError::new(e.to_string()))?;

        let result = stylesheet
            .to_css(PrinterOptions {
                minify: self.minify,
                source_map,
                targets,
                ..PrinterOptions::default()
            })
            .map_err(|e| PrefixError::new(e.to_string()))?;

        Ok(result.code)
    }

    /// Returns the input as is, with a map that points every line back at
    /// itself, or with the compiler's map.
    fn unchanged(&self, request: &PrefixRequest<'_>) -> Result<String, PrefixError> {
        if !self.source_map {
            return Ok(request.css.to_string());
        }

        let json = match request.source_map {
            Some(previous) => previous.to_string(),
            None => {
                let mut map = new_source_map(request);
                for line in 0..request.css.lines().count() as u32 {
                    map.add_mapping(
                        line,
                        0,
                        Some(OriginalLocation {
                            original_line: line,
                            original_column: 0,
                            source: 0,
                            name: None,
                        }),
                    );
                }
                map.to_json(None).map_err(source_map_error)?
            }
        };

        Ok(inline_source_map(request.css, &json))
    }
}

impl PrefixProcessor for LightningPrefixer {
    fn name(&self) -> &str {
        "lightningcss"
    }

    fn process(&self, request: &PrefixRequest<'_>) -> Result<String, PrefixError> {
        let mut source_map = self.source_map.then(|| new_source_map(request));
        let code = self.print(request, self.targets.clone(), source_map.as_mut())?;

        if !self.minify && code == self.print(request, Targets::default(), None)? {
            debug!("No prefixes needed for {}", request.from);
            return self.unchanged(request);
        }

        let Some(mut map) = source_map else {
            return Ok(code);
        };
        if let Some(previous) = request.source_map {
            let mut previous = SourceMap::from_json("/", previous).map_err(source_map_error)?;
            map.extends(&mut previous).map_err(source_map_error)?;
        }

        Ok(inline_source_map(
            &code,
            &map.to_json(None).map_err(source_map_error)?,
        ))
    }
}

fn new_source_map(request: &PrefixRequest<'_>) -> SourceMap {
    let mut map = SourceMap::new("/");
    map.add_source(&relative_source(request.from, request.to));
    map
}

fn source_map_error(e: SourceMapError) -> PrefixError {
    PrefixError::new(format!("Failed to build source map: {}", e))
}

/// Appends `json` to `css` as an inline source map comment.
fn inline_source_map(css: &str, json: &str) -> String {
    let mut output = css.to_string();
    if !output.is_empty() && !output.ends_with('\n') {
        output.push('\n');
    }
    output.push_str(SOURCE_MAP_PREFIX);
    output.push_str(&STANDARD.encode(json));
    output.push_str(" */\n");
    output
}

/// Returns the path of `from` as seen from the directory of `to`.
fn relative_source(from: &str, to: &str) -> String {
    let mut to_dir: Vec<&str> = to.split('/').collect();
    to_dir.pop();
    let from_parts: Vec<&str> = from.split('/').collect();
    let from_dir = &from_parts[..from_parts.len() - 1];

    let common = to_dir
        .iter()
        .zip(from_dir)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts = vec![".."; to_dir.len() - common];
    parts.extend(from_parts[common..].iter().copied());
    parts.join("/")
}
