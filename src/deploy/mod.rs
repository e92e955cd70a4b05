//! Deployment orchestration: dependency ordering, evaluation and reconciliation

pub mod context;
pub mod engine;
pub mod graph;

pub use context::BlueprintDeployContext;
pub use engine::*;
pub use graph::DependencyGraph;
