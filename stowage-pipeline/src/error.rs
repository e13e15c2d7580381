//! Error types for the pipeline.

use thiserror::Error;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that can occur while running a pipeline chain.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A data-transform hook failed. Lifecycle hook failures never surface
    /// here; they are logged and swallowed.
    #[error("plugin '{plugin}' failed in {stage} hook: {source}")]
    Hook {
        plugin: String,
        stage: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl PipelineError {
    pub(crate) fn hook(plugin: &str, stage: &'static str, source: anyhow::Error) -> Self {
        PipelineError::Hook {
            plugin: plugin.to_string(),
            stage,
            source,
        }
    }
}
