//! Service property metadata.

use super::shape::ServiceKind;
use super::source::ConfigurationSource;

/// A member bound to an injectable runtime service instead of stored data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceProperty {
    pub(crate) name: String,
    pub(crate) kind: ServiceKind,
    pub(crate) source: ConfigurationSource,
}

impl ServiceProperty {
    pub(crate) fn new(name: String, kind: ServiceKind, source: ConfigurationSource) -> Self {
        Self { name, kind, source }
    }

    /// Member name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The bound service.
    pub fn kind(&self) -> ServiceKind {
        self.kind
    }

    /// Source that added the service property.
    pub fn configuration_source(&self) -> ConfigurationSource {
        self.source
    }
}
