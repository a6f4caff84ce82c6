//! Framework context
//!
//! The registry, scheme and metadata accessor shared by every API group
//! installed into one process (or one test).

use std::sync::Arc;

use crate::accessor::Accessor;
use crate::registry::ApiRegistry;
use crate::scheme::Scheme;
use crate::version::GroupVersion;

#[derive(Debug, Clone)]
pub struct FrameworkContext {
    registry: Arc<ApiRegistry>,
    scheme: Arc<Scheme>,
    accessor: Arc<Accessor>,
}

impl FrameworkContext {
    /// Create a context whose registry allows `allowed_versions`
    /// (every version when empty)
    pub fn new(allowed_versions: Vec<GroupVersion>) -> Self {
        Self {
            registry: Arc::new(ApiRegistry::new(allowed_versions)),
            scheme: Arc::new(Scheme::new()),
            accessor: Arc::new(Accessor::new()),
        }
    }

    pub fn registry(&self) -> &Arc<ApiRegistry> {
        &self.registry
    }

    pub fn scheme(&self) -> &Arc<Scheme> {
        &self.scheme
    }

    pub fn accessor(&self) -> &Arc<Accessor> {
        &self.accessor
    }
}

impl Default for FrameworkContext {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
