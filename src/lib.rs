//! Blueprint Deploy - declarative blueprint interpreter and resource deployer
//!
//! This crate renders blueprint packages into a typed node graph, evaluates
//! its functions in dependency order and reconciles the platform resources
//! it binds across deploys, redeploys and removal.

pub mod config;
pub mod deploy;
pub mod discovery;
pub mod error;
pub mod functions;
pub mod node;
pub mod parser;
pub mod resources;
pub mod store;
pub mod template;
pub mod types;

pub use config::EngineConfig;
pub use deploy::{BlueprintEngine, DeploymentPlan, DeploymentReport, DeploymentStage};
pub use error::{BlueprintError, ErrorCategory, Result};
pub use types::*;
