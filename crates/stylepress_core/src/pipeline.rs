//! Single file transform logic.

use std::sync::Arc;

use stylepress_cache::{CacheKey, CachedArtifact, TransformCache};
use tracing::{debug, warn};

use crate::compiler::{CompileRequest, GrassCompiler, SourceCompiler};
use crate::config::PipelineConfig;
use crate::error::{Stage, TransformError};
use crate::host::{Diagnostic, InputFile, Stylesheet};
use crate::prefixer::{LightningPrefixer, PrefixProcessor, PrefixRequest};

/// Extension of every produced artifact.
pub const OUTPUT_EXTENSION: &str = "css";

/// Returns the extension of the final segment of `path`, without the dot.
///
/// A leading dot (as in `.styl`) does not start an extension.
pub fn extension_of(path: &str) -> Option<&str> {
    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    let name = &path[name_start..];
    match name.rfind('.') {
        Some(dot) if dot > 0 => Some(&name[dot + 1..]),
        _ => None,
    }
}

/// Derives the artifact path for a source path.
///
/// The extension of the final segment is replaced with `.css`. A segment
/// without an extension gets `.css` appended. Directories are left alone.
pub fn derive_output_path(path: &str) -> String {
    let stem = match extension_of(path) {
        Some(extension) => &path[..path.len() - extension.len() - 1],
        None => path,
    };
    format!("{}.{}", stem, OUTPUT_EXTENSION)
}

/// Result of running one file through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutput {
    /// The file produced a stylesheet.
    Success {
        /// Path of the CSS artifact.
        output_path: String,
        /// Prefixed CSS.
        css: String,
        /// Whether the CSS came from the cache.
        from_cache: bool,
    },
    /// The file failed to compile or prefix.
    Failure(Diagnostic),
}

impl PipelineOutput {
    /// Returns true for [`PipelineOutput::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineOutput::Success { .. })
    }

    /// Hands this output to the matching sink of `file`.
    pub fn deliver<F: InputFile + ?Sized>(self, file: &F) {
        match self {
            PipelineOutput::Success {
                output_path, css, ..
            } => file.add_stylesheet(Stylesheet {
                path: output_path,
                data: css,
            }),
            PipelineOutput::Failure(diagnostic) => file.error(diagnostic),
        }
    }
}

/// Drives one file at a time through cache lookup, compilation, prefixing
/// and cache store.
///
/// The pipeline holds no per-file state, so a single instance serves every
/// file of a batch concurrently. Both engines run on Tokio's blocking pool.
pub struct FileTransformPipeline {
    compiler: Arc<dyn SourceCompiler>,
    prefixer: Arc<dyn PrefixProcessor>,
    cache: Arc<TransformCache>,
    config: Arc<PipelineConfig>,
}

impl FileTransformPipeline {
    /// Creates a pipeline from its parts.
    pub fn new(
        compiler: Arc<dyn SourceCompiler>,
        prefixer: Arc<dyn PrefixProcessor>,
        cache: Arc<TransformCache>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            compiler,
            prefixer,
            cache,
            config: Arc::new(config),
        }
    }

    /// Creates a pipeline with the default engines and a cache sized by
    /// `config.cache_capacity`.
    pub fn from_config(config: PipelineConfig) -> Result<Self, TransformError> {
        let prefixer = LightningPrefixer::from_config(&config)?;
        let cache = TransformCache::new(config.cache_capacity);

        Ok(Self::new(
            Arc::new(GrassCompiler::new()),
            Arc::new(prefixer),
            Arc::new(cache),
            config,
        ))
    }

    /// Returns the compiler.
    pub fn compiler(&self) -> &dyn SourceCompiler {
        self.compiler.as_ref()
    }

    /// Returns the cache shared by every run.
    pub fn cache(&self) -> &Arc<TransformCache> {
        &self.cache
    }

    /// Returns the configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs one file through the pipeline.
    ///
    /// Never fails: errors from either engine are turned into a
    /// [`PipelineOutput::Failure`] and nothing is cached for the file.
    pub async fn run<F: InputFile + ?Sized>(&self, file: &F) -> PipelineOutput {
        let path = file.path_in_package();
        let output_path = derive_output_path(path);
        let key = CacheKey::new(path, file.source_hash());

        if let Some(artifact) = self.cache.lookup(&key) {
            debug!("Using cached result for {}", path);
            return PipelineOutput::Success {
                output_path,
                css: artifact.css,
                from_cache: true,
            };
        }

        debug!("Transforming {}", path);
        match self
            .transform(file.contents_as_string(), path, &output_path)
            .await
        {
            Ok(css) => {
                self.cache.store(key, CachedArtifact::new(css.clone()));
                PipelineOutput::Success {
                    output_path,
                    css,
                    from_cache: false,
                }
            }
            Err(e) => {
                warn!("Failed to transform {}: {}", path, e);
                PipelineOutput::Failure(e.to_diagnostic())
            }
        }
    }

    async fn transform(
        &self,
        source: &str,
        path: &str,
        output_path: &str,
    ) -> Result<String, TransformError> {
        let compiler = Arc::clone(&self.compiler);
        let config = Arc::clone(&self.config);
        let source = source.to_string();
        let filename = path.to_string();

        let compiled = self
            .run_stage(Stage::Compile, move || {
                let include_paths = config.resolved_include_paths();
                let request = CompileRequest {
                    source: &source,
                    filename: &filename,
                    include_paths: &include_paths,
                    import_files: &config.import_files,
                    options: &config.compiler_options,
                };
                Ok(compiler.compile(&request)?)
            })
            .await?;

        let prefixer = Arc::clone(&self.prefixer);
        let from = path.to_string();
        let to = output_path.to_string();

        self.run_stage(Stage::Prefix, move || {
            let request = PrefixRequest {
                css: &compiled.css,
                source_map: compiled.source_map.as_deref(),
                from: &from,
                to: &to,
            };
            Ok(prefixer.process(&request)?)
        })
        .await
    }

    /// Runs blocking engine work off the async executor, enforcing the
    /// configured stage timeout.
    async fn run_stage<T, W>(&self, stage: Stage, work: W) -> Result<T, TransformError>
    where
        T: Send + 'static,
        W: FnOnce() -> Result<T, TransformError> + Send + 'static,
    {
        let handle = tokio::task::spawn_blocking(work);

        let joined = match self.config.stage_timeout() {
            Some(limit) => tokio::time::timeout(limit, handle)
                .await
                .map_err(|_| TransformError::Timeout { stage, after: limit })?,
            None => handle.await,
        };

        joined.map_err(|e| TransformError::internal(format!("The {} stage failed: {}", stage, e)))?
    }
}

impl std::fmt::Debug for FileTransformPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileTransformPipeline")
            .field("compiler", &self.compiler.name())
            .field("prefixer", &self.prefixer.name())
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish()
    }
}
