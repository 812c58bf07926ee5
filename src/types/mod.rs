pub mod builder;
pub mod error;
pub mod resolver;
pub mod ty;

use std::fmt;
use std::sync::Arc;

pub use builder::{DefaultBuilder, NodeBuilder};
pub use error::{ResolveError, TypeError};
pub use resolver::{DefaultResolver, TypeResolver};
pub use ty::{ACTION, FUNC, SYSTEM_TYPE, Type};

/// The two capabilities a parse consults, shared by every scope of it.
#[derive(Clone)]
pub struct Capabilities {
    pub resolver: Arc<dyn TypeResolver>,
    pub builder: Arc<dyn NodeBuilder>,
}

impl Capabilities {
    pub fn new(resolver: impl TypeResolver + 'static, builder: impl NodeBuilder + 'static) -> Self {
        Self {
            resolver: Arc::new(resolver),
            builder: Arc::new(builder),
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::new(DefaultResolver::new(), DefaultBuilder::new())
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities").finish_non_exhaustive()
    }
}
