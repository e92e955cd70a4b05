//! Error taxonomy for the blueprint engine

use thiserror::Error;

use crate::functions::FunctionError;
use crate::resources::ManagerError;
use crate::store::StoreError;
use crate::template::RenderError;

/// Coarse classification of a failure, surfaced to callers alongside the code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Parse,
    Execution,
    Deployment,
    Graph,
    Storage,
}

#[derive(Debug, Error)]
pub enum BlueprintError {
    #[error("Variables validation failed: {errors:?}")]
    VariablesValidation { errors: Vec<String> },

    #[error("Template {path} not found")]
    TemplateNotFound { path: String },

    #[error("Template rendering failed: {0}")]
    Render(#[from] RenderError),

    #[error("Template parsing failed at {path}: {reason}")]
    TemplateParsing { path: String, reason: String },

    #[error("Template node count exceeds {limit}")]
    MaxNodeCountExceeded { limit: usize },

    #[error("Nested template depth exceeds {limit} at {path}")]
    MaxNestedTemplatesExceeded { limit: usize, path: String },

    #[error("Reference '{reference}' at {path} cannot be resolved: {reason}")]
    ReferenceNotFound {
        path: String,
        reference: String,
        reason: String,
    },

    #[error("No dependency discoverer registered for {node_type} nodes")]
    DiscovererNotFound { node_type: String },

    #[error("No executor registered for function '{kind}' at {path}")]
    FunctionExecutorNotFound { kind: String, path: String },

    #[error("Function execution failed at {path}: {source}")]
    FunctionExecution {
        path: String,
        #[source]
        source: FunctionError,
    },

    #[error("No resource manager registered for '{kind}'")]
    ResourceManagerNotFound { kind: String },

    #[error("Resource deployment failed at {path}: {source}")]
    ResourceDeployment {
        path: String,
        #[source]
        source: ManagerError,
    },

    #[error("Resource deletion failed for {key}: {source}")]
    ResourceDeletion {
        key: String,
        #[source]
        source: ManagerError,
    },

    #[error("Circular dependency detected: {cycle:?}")]
    CircularDependency { cycle: Vec<String> },

    #[error("Blueprint {blueprint_id} not found")]
    BlueprintNotFound { blueprint_id: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl BlueprintError {
    /// Stable error code exposed through the facade
    pub fn code(&self) -> &'static str {
        match self {
            BlueprintError::VariablesValidation { .. } => "BLUEPRINT_VARIABLES_VALIDATION_FAILED",
            BlueprintError::TemplateNotFound { .. } => "BLUEPRINT_TEMPLATE_NOT_FOUND",
            BlueprintError::Render(_) => "TEMPLATE_PARSING_FAILED",
            BlueprintError::TemplateParsing { .. } => "BLUEPRINT_TEMPLATE_PARSING_FAILED",
            BlueprintError::MaxNodeCountExceeded { .. } => {
                "BLUEPRINT_MAX_TEMPLATE_NODE_COUNT_EXCEED"
            }
            BlueprintError::MaxNestedTemplatesExceeded { .. } => {
                "BLUEPRINT_MAX_NESTED_TEMPLATE_COUNT_EXCEED"
            }
            BlueprintError::ReferenceNotFound { .. } => "BLUEPRINT_REFERENCE_NOT_FOUND",
            BlueprintError::DiscovererNotFound { .. } => {
                "BLUEPRINT_DEPENDENCY_DISCOVERER_NOT_FOUND"
            }
            BlueprintError::FunctionExecutorNotFound { .. } => {
                "BLUEPRINT_FUNCTION_EXECUTOR_NOT_FOUND"
            }
            BlueprintError::FunctionExecution { .. } => "BLUEPRINT_FUNCTION_EXECUTION_FAILED",
            BlueprintError::ResourceManagerNotFound { .. } => {
                "BLUEPRINT_RESOURCE_MANAGER_NOT_FOUND"
            }
            BlueprintError::ResourceDeployment { .. } => "BLUEPRINT_RESOURCE_DEPLOYMENT_FAILED",
            BlueprintError::ResourceDeletion { .. } => "BLUEPRINT_RESOURCE_DELETION_FAILED",
            BlueprintError::CircularDependency { .. } => {
                "BLUEPRINT_CIRCULAR_DEPENDENCY_DETECTED"
            }
            BlueprintError::BlueprintNotFound { .. } => "BLUEPRINT_NOT_FOUND",
            BlueprintError::Storage(_) => "BLUEPRINT_STORAGE_FAILED",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            BlueprintError::VariablesValidation { .. } => ErrorCategory::Validation,
            BlueprintError::TemplateNotFound { .. }
            | BlueprintError::Render(_)
            | BlueprintError::TemplateParsing { .. }
            | BlueprintError::MaxNodeCountExceeded { .. }
            | BlueprintError::MaxNestedTemplatesExceeded { .. }
            | BlueprintError::ReferenceNotFound { .. } => ErrorCategory::Parse,
            BlueprintError::DiscovererNotFound { .. }
            | BlueprintError::FunctionExecutorNotFound { .. }
            | BlueprintError::FunctionExecution { .. } => ErrorCategory::Execution,
            BlueprintError::ResourceManagerNotFound { .. }
            | BlueprintError::ResourceDeployment { .. }
            | BlueprintError::ResourceDeletion { .. } => ErrorCategory::Deployment,
            BlueprintError::CircularDependency { .. } => ErrorCategory::Graph,
            BlueprintError::BlueprintNotFound { .. } | BlueprintError::Storage(_) => {
                ErrorCategory::Storage
            }
        }
    }

    pub(crate) fn parsing(path: impl Into<String>, reason: impl Into<String>) -> Self {
        BlueprintError::TemplateParsing {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BlueprintError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_follow_taxonomy() {
        let err = BlueprintError::MaxNodeCountExceeded { limit: 65_535 };
        assert_eq!(err.code(), "BLUEPRINT_MAX_TEMPLATE_NODE_COUNT_EXCEED");
        assert_eq!(err.category(), ErrorCategory::Parse);

        let err = BlueprintError::CircularDependency {
            cycle: vec!["$.a".to_string(), "$.b".to_string()],
        };
        assert_eq!(err.code(), "BLUEPRINT_CIRCULAR_DEPENDENCY_DETECTED");
        assert_eq!(err.category(), ErrorCategory::Graph);
    }

    #[test]
    fn test_function_errors_keep_their_message() {
        let err = BlueprintError::FunctionExecution {
            path: "$.a".to_string(),
            source: FunctionError::MissingParameter { position: 1 },
        };
        assert_eq!(err.category(), ErrorCategory::Execution);
        assert!(err.to_string().contains("$.a"));
        assert!(err.to_string().contains("parameter 1"));
    }
}
