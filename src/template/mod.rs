//! Template rendering: loaders, context namespaces and the handlebars renderer

pub mod context;
pub mod helpers;
pub mod loader;
pub mod renderer;

pub use context::TemplateContext;
pub use loader::{FileSystemResourceLoader, InMemoryResourceLoader, ResourceLoader};
pub use renderer::TemplateRenderer;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to load template {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("Failed to parse template {path}: {reason}")]
    TemplateParsing { path: String, reason: String },
}
