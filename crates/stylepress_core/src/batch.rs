//! Concurrent processing of one build pass.

use std::path::Path;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{error, info};

use crate::config::PipelineConfig;
use crate::error::TransformError;
use crate::host::InputFile;
use crate::pipeline::{FileTransformPipeline, PipelineOutput};

/// Counts of what happened to the files of one batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    /// Files compiled and prefixed in this batch.
    pub compiled: usize,
    /// Files served from the cache.
    pub cached: usize,
    /// Files that produced a diagnostic, or whose task failed.
    pub failed: usize,
}

impl BatchSummary {
    /// Returns the number of files accounted for.
    pub fn total(&self) -> usize {
        self.compiled + self.cached + self.failed
    }

    fn record(&mut self, output: &PipelineOutput) {
        match output {
            PipelineOutput::Success {
                from_cache: true, ..
            } => self.cached += 1,
            PipelineOutput::Success { .. } => self.compiled += 1,
            PipelineOutput::Failure(_) => self.failed += 1,
        }
    }
}

/// Runs every file of a batch through a shared pipeline.
///
/// Files are processed concurrently and independently. A failing file only
/// affects its own output.
#[derive(Debug, Clone)]
pub struct BatchCoordinator {
    pipeline: Arc<FileTransformPipeline>,
}

impl BatchCoordinator {
    /// Creates a coordinator around a pipeline.
    pub fn new(pipeline: FileTransformPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    /// Creates a coordinator with the default engines.
    pub fn from_config(config: PipelineConfig) -> Result<Self, TransformError> {
        Ok(Self::new(FileTransformPipeline::from_config(config)?))
    }

    /// Creates a coordinator for the project rooted at `project_root`,
    /// reading its optional configuration file once.
    pub fn for_project(project_root: &Path) -> Result<Self, TransformError> {
        Self::from_config(PipelineConfig::load_or_default(project_root))
    }

    /// Returns the shared pipeline.
    pub fn pipeline(&self) -> &FileTransformPipeline {
        &self.pipeline
    }

    /// Processes a batch and returns once every file has received its
    /// stylesheet or diagnostic.
    ///
    /// Outputs are delivered as they complete, in no particular order.
    pub async fn process_batch<F, I>(&self, files: I) -> BatchSummary
    where
        F: InputFile + ?Sized + 'static,
        I: IntoIterator<Item = Arc<F>>,
    {
        let mut tasks = JoinSet::new();

        for file in files {
            let pipeline = Arc::clone(&self.pipeline);
            tasks.spawn(async move {
                let output = pipeline.run(&*file).await;
                let mut summary = BatchSummary::default();
                summary.record(&output);
                output.deliver(&*file);
                summary
            });
        }

        let mut summary = BatchSummary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(file_summary) => {
                    summary.compiled += file_summary.compiled;
                    summary.cached += file_summary.cached;
                    summary.failed += file_summary.failed;
                }
                Err(e) => {
                    error!("Transform task failed: {}", e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            "Processed {} stylesheets ({} compiled, {} cached, {} failed)",
            summary.total(),
            summary.compiled,
            summary.cached,
            summary.failed
        );

        summary
    }
}
