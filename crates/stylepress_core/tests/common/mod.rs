#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use stylepress_core::{
    FileTransformPipeline, GrassCompiler, PipelineConfig, PrefixError, PrefixProcessor,
    PrefixRequest, SourceFile, TransformCache,
};

/// Prefixer that returns its input untouched and counts calls.
#[derive(Default)]
pub struct PassThroughPrefixer {
    calls: AtomicUsize,
}

impl PassThroughPrefixer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PrefixProcessor for PassThroughPrefixer {
    fn name(&self) -> &str {
        "pass-through"
    }

    fn process(&self, request: &PrefixRequest<'_>) -> Result<String, PrefixError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(request.css.to_string())
    }
}

/// Config with compressed compiler output, which keeps assertions short.
pub fn compressed_config() -> PipelineConfig {
    let mut config = PipelineConfig::new();
    config.compiler_options.insert(
        "style".to_string(),
        serde_json::Value::String("compressed".to_string()),
    );
    config
}

/// Pipeline with the real compiler and a pass-through prefixer.
pub fn grass_pipeline(
    config: PipelineConfig,
    prefixer: Arc<PassThroughPrefixer>,
) -> FileTransformPipeline {
    let cache = Arc::new(TransformCache::new(config.cache_capacity));
    FileTransformPipeline::new(Arc::new(GrassCompiler::new()), prefixer, cache, config)
}

pub fn files(sources: &[(&str, &str)]) -> Vec<Arc<SourceFile>> {
    sources
        .iter()
        .map(|(path, source)| Arc::new(SourceFile::new(*path, *source)))
        .collect()
}
