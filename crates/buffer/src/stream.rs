//! Stream identity

use std::fmt;
use std::sync::Arc;

/// Identifies one logical stream (namespace + name)
///
/// Cheap to clone (two `Arc<str>`), immutable, and usable as a map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamDescriptor {
    namespace: Option<Arc<str>>,
    name: Arc<str>,
}

impl StreamDescriptor {
    /// Create a descriptor with a namespace
    pub fn new(namespace: impl AsRef<str>, name: impl AsRef<str>) -> Self {
        Self {
            namespace: Some(Arc::from(namespace.as_ref())),
            name: Arc::from(name.as_ref()),
        }
    }

    /// Create a descriptor without a namespace
    pub fn unqualified(name: impl AsRef<str>) -> Self {
        Self {
            namespace: None,
            name: Arc::from(name.as_ref()),
        }
    }

    /// Create a descriptor from an optional namespace
    pub fn from_parts(namespace: Option<&str>, name: impl AsRef<str>) -> Self {
        match namespace {
            Some(ns) => Self::new(ns, name),
            None => Self::unqualified(name),
        }
    }

    /// Namespace, if any
    #[inline]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Stream name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for StreamDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}.{}", ns, self.name),
            None => f.write_str(&self.name),
        }
    }
}
