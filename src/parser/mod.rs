pub mod blueprint_parser;
pub mod context;

pub use blueprint_parser::*;
pub use context::{BlueprintParseContext, NestedTask, ParseLimits};
