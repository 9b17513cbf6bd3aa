//! # stylepress_core
//!
//! Stylesheet transform pipeline for Stylepress.
//!
//! This crate provides:
//! - The `SourceCompiler` and `PrefixProcessor` seams, with default engines
//! - The per-file `FileTransformPipeline`
//! - The concurrent `BatchCoordinator`
//! - Configuration loading
//! - Registration with a host build system
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::path::Path;
//! use std::sync::Arc;
//! use stylepress_core::{BatchCoordinator, SourceFile};
//!
//! let coordinator = BatchCoordinator::for_project(Path::new("."))?;
//!
//! let file = Arc::new(SourceFile::new("client/main.sass", "body\n  color: red\n"));
//! coordinator.process_batch(vec![file.clone()]).await;
//! for stylesheet in file.stylesheets() {
//!     println!("{}: {} bytes", stylesheet.path, stylesheet.data.len());
//! }
//! ```

mod batch;
pub mod compiler;
mod config;
mod error;
mod host;
pub mod pipeline;
pub mod prefixer;
pub mod registry;

pub use batch::{BatchCoordinator, BatchSummary};
pub use compiler::{CompileOutput, CompileRequest, GrassCompiler, SourceCompiler};
pub use config::PipelineConfig;
pub use error::{CompileError, ConfigError, PrefixError, Stage, TransformError};
pub use host::{Diagnostic, InputFile, SourceFile, Stylesheet};
pub use pipeline::{FileTransformPipeline, PipelineOutput, derive_output_path};
pub use prefixer::{LightningPrefixer, PrefixProcessor, PrefixRequest, SOURCE_MAP_PREFIX};
pub use registry::{CompilerFactory, CompilerRegistry, handles, register};

pub use stylepress_cache::{CacheKey, CachedArtifact, TransformCache};

#[cfg(test)]
pub mod test_utils;
