use std::collections::HashSet;

use crate::types::BindResource;

/// Selects which bound resources a delete request applies to. Unmanaged binds
/// never match, whatever the variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceMatcher {
    /// Exactly the bind with this key
    Exact(String),
    /// Every bind whose key is not in the set (orphans of a redeploy)
    Absent(HashSet<String>),
    Any,
}

impl ResourceMatcher {
    pub fn exact(bind: &BindResource) -> Self {
        ResourceMatcher::Exact(bind.key())
    }

    pub fn absent_from<'a>(binds: impl IntoIterator<Item = &'a BindResource>) -> Self {
        ResourceMatcher::Absent(binds.into_iter().map(BindResource::key).collect())
    }

    pub fn matches(&self, bind: &BindResource) -> bool {
        if !bind.managed {
            return false;
        }
        match self {
            ResourceMatcher::Exact(key) => *key == bind.key(),
            ResourceMatcher::Absent(keys) => !keys.contains(&bind.key()),
            ResourceMatcher::Any => true,
        }
    }
}
