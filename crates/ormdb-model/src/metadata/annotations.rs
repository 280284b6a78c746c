//! String-keyed annotations attached to metadata elements.
//!
//! Layers outside the core (scaffolding, provider mapping) stash facts here
//! without extending the element structs. Keys shared across layers should be
//! namespaced, see [`namespaced`].

use super::source::ConfigurationSource;
use serde_json::Value;
use std::collections::BTreeMap;

/// Build a namespaced annotation key (`"{prefix}:{name}"`).
pub fn namespaced(prefix: &str, name: &str) -> String {
    format!("{prefix}:{name}")
}

/// A single annotation value with its source.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// The annotation value.
    pub value: Value,
    /// Source that set the value.
    pub source: ConfigurationSource,
}

/// An ordered annotation dictionary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations {
    entries: BTreeMap<String, Annotation>,
}

impl Annotations {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an annotation value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name).map(|a| &a.value)
    }

    /// Get an annotation with its source.
    pub fn find(&self, name: &str) -> Option<&Annotation> {
        self.entries.get(name)
    }

    /// Iterate annotations in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, a)| (k.as_str(), &a.value))
    }

    /// Number of annotations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no annotations.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `value` may be stored under `name` at `source`.
    pub fn can_set(&self, name: &str, value: Option<&Value>, source: ConfigurationSource) -> bool {
        match self.entries.get(name) {
            None => true,
            Some(existing) => {
                Some(&existing.value) == value || source.overrides(Some(existing.source))
            }
        }
    }

    /// Set or remove (`value == None`) an annotation.
    ///
    /// Returns `None` when rejected, otherwise the previous value.
    pub(crate) fn set(
        &mut self,
        name: &str,
        value: Option<Value>,
        source: ConfigurationSource,
    ) -> Option<Option<Value>> {
        if !self.can_set(name, value.as_ref(), source) {
            return None;
        }
        let previous = match value {
            Some(value) => {
                let source = source.max_with(self.entries.get(name).map(|a| a.source));
                self.entries
                    .insert(name.to_string(), Annotation { value, source })
            }
            None => self.entries.remove(name),
        };
        Some(previous.map(|a| a.value))
    }

    /// Put back an annotation captured before a change.
    pub(crate) fn restore(&mut self, name: &str, previous: Option<Annotation>) {
        match previous {
            Some(annotation) => {
                self.entries.insert(name.to_string(), annotation);
            }
            None => {
                self.entries.remove(name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_namespaced_key() {
        assert_eq!(namespaced("Relational", "TableName"), "Relational:TableName");
    }

    #[test]
    fn test_set_and_get() {
        let mut annotations = Annotations::new();
        let previous = annotations.set(
            "Relational:TableName",
            Some(json!("Blogs")),
            ConfigurationSource::Explicit,
        );
        assert_eq!(previous, Some(None));
        assert_eq!(annotations.get("Relational:TableName"), Some(&json!("Blogs")));
    }

    #[test]
    fn test_lower_source_rejected() {
        let mut annotations = Annotations::new();
        annotations.set("Scaffolding:Schema", Some(json!("dbo")), ConfigurationSource::Explicit);
        let rejected = annotations.set(
            "Scaffolding:Schema",
            Some(json!("app")),
            ConfigurationSource::Convention,
        );
        assert_eq!(rejected, None);
        assert!(annotations
            .set("Scaffolding:Schema", None, ConfigurationSource::Convention)
            .is_none());
        assert_eq!(annotations.get("Scaffolding:Schema"), Some(&json!("dbo")));
    }

    #[test]
    fn test_remove_returns_previous() {
        let mut annotations = Annotations::new();
        annotations.set("k", Some(json!(1)), ConfigurationSource::Convention);
        let previous = annotations.set("k", None, ConfigurationSource::Explicit);
        assert_eq!(previous, Some(Some(json!(1))));
        assert!(annotations.is_empty());
    }
}
