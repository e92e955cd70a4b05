//! Function executors: strategies that compute a function node's result from its parameters

pub mod builtin;
pub mod call;
pub mod hash;
pub mod registry;

pub use builtin::*;
pub use call::{json_type_name, FromParam, FunctionCall};
pub use hash::*;
pub use registry::FunctionExecutorRegistry;

use serde_json::Value;
use thiserror::Error;

use crate::deploy::BlueprintDeployContext;

/// Failures raised by an executor while reading its parameters or computing its result
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FunctionError {
    #[error("Missing required parameter {position}")]
    MissingParameter { position: usize },

    #[error("Parameter {position} must be a {expected}, got {actual}")]
    TypeMismatch {
        position: usize,
        expected: String,
        actual: String,
    },

    #[error("Parameter {position} is out of range ({len} parameters)")]
    OutOfRange { position: usize, len: usize },

    #[error("{reason}")]
    Failed { reason: String },
}

/// Computes the result of every function node of one kind
pub trait FunctionExecutor: Send + Sync {
    /// Function kind as written after `@fn`
    fn kind(&self) -> &'static str;

    /// `None` leaves the node without a result
    fn execute(
        &self,
        call: &FunctionCall<'_>,
        ctx: &BlueprintDeployContext<'_>,
    ) -> Result<Option<Value>, FunctionError>;
}
