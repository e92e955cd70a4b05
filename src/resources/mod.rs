//! Resource managers: lookup-or-create deployment of resource nodes and
//! matcher-guarded deletion of the resources they bound

pub mod manager;
pub mod matcher;
pub mod memory;
pub mod registry;
pub mod service;

pub use manager::{ManagerError, ResourceManager, ResourceSpec};
pub use matcher::ResourceMatcher;
pub use memory::InMemoryResourceService;
pub use registry::ResourceManagerRegistry;
pub use service::*;
