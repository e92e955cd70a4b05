//! Typed blueprint node graph

pub mod path;
pub mod tree;
pub mod value;

pub use path::{parse_reference, read_reference, resolve_reference, ResolvedReference};
pub use tree::*;
pub use value::ScalarValue;
