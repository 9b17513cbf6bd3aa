//! Registration with the host build system.

use std::path::PathBuf;

use tracing::info;

use crate::batch::BatchCoordinator;
use crate::compiler::{GrassCompiler, SourceCompiler};
use crate::error::TransformError;

/// Builds a coordinator each time the host asks for a compiler instance.
pub type CompilerFactory =
    Box<dyn Fn() -> Result<BatchCoordinator, TransformError> + Send + Sync>;

/// The part of the host that accepts compiler registrations.
pub trait CompilerRegistry {
    /// Declares `factory` as the compiler for sources with `extensions`.
    fn register_compiler(&mut self, extensions: Vec<String>, factory: CompilerFactory);
}

/// Registers the default stylesheet compiler for the project rooted at
/// `project_root`.
///
/// Call once at startup. Each compiler instance the host creates reads the
/// project configuration when it is built.
pub fn register<R: CompilerRegistry + ?Sized>(registry: &mut R, project_root: impl Into<PathBuf>) {
    let project_root = project_root.into();
    let extensions: Vec<String> = GrassCompiler::new()
        .extensions()
        .iter()
        .map(|ext| ext.to_string())
        .collect();

    info!(
        "Registering stylesheet compiler for {}",
        extensions.join(", ")
    );

    registry.register_compiler(
        extensions,
        Box::new(move || BatchCoordinator::for_project(&project_root)),
    );
}

/// Returns true if `path` carries an extension claimed by [`register`].
///
/// Matching ignores ASCII case.
pub fn handles(path: &str) -> bool {
    GrassCompiler::new().can_compile(path)
}
