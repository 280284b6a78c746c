//! Configuration sources and source-tagged values.

use rkyv::Archive;

/// How confident the model is in a piece of configuration.
///
/// Sources are totally ordered. A change made at some source may overwrite a
/// value previously set at the same or a lower source.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum ConfigurationSource {
    /// Discovered by a convention.
    Convention,
    /// Read from a member attribute.
    DataAnnotation,
    /// Requested through the fluent API.
    Explicit,
}

impl ConfigurationSource {
    /// Whether a change at `self` may overwrite a value set at `existing`.
    ///
    /// An unset value (`None`) can always be overwritten.
    pub fn overrides(self, existing: Option<ConfigurationSource>) -> bool {
        existing.map_or(true, |existing| self >= existing)
    }

    /// Whether `self` is strictly stronger than `existing`.
    pub fn overrides_strictly(self, existing: Option<ConfigurationSource>) -> bool {
        existing.map_or(true, |existing| self > existing)
    }

    /// The stronger of `self` and `other`.
    pub fn max_with(self, other: Option<ConfigurationSource>) -> ConfigurationSource {
        match other {
            Some(other) if other > self => other,
            _ => self,
        }
    }
}

impl std::fmt::Display for ConfigurationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigurationSource::Convention => write!(f, "convention"),
            ConfigurationSource::DataAnnotation => write!(f, "data annotation"),
            ConfigurationSource::Explicit => write!(f, "explicit"),
        }
    }
}

/// The stronger of two optional sources.
pub fn max_source(
    a: Option<ConfigurationSource>,
    b: Option<ConfigurationSource>,
) -> Option<ConfigurationSource> {
    match (a, b) {
        (Some(a), b) => Some(a.max_with(b)),
        (None, b) => b,
    }
}

/// A value together with the source that last set it.
///
/// Every mutable metadata attribute goes through this type so precedence is
/// checked the same way everywhere.
#[derive(Debug, Clone, PartialEq)]
pub struct Sourced<T> {
    value: T,
    source: Option<ConfigurationSource>,
}

impl<T: PartialEq> Sourced<T> {
    /// An unconfigured default value.
    pub fn new(value: T) -> Self {
        Self {
            value,
            source: None,
        }
    }

    /// A value configured at `source`.
    pub fn with_source(value: T, source: ConfigurationSource) -> Self {
        Self {
            value,
            source: Some(source),
        }
    }

    /// The current value.
    pub fn get(&self) -> &T {
        &self.value
    }

    /// The source that last set the value, if any.
    pub fn source(&self) -> Option<ConfigurationSource> {
        self.source
    }

    /// Whether `value` may be set at `source`.
    ///
    /// Setting the current value again is always allowed.
    pub fn can_set(&self, value: &T, source: ConfigurationSource) -> bool {
        self.value == *value || source.overrides(self.source)
    }

    /// Set `value` at `source`.
    ///
    /// Returns `None` when rejected, otherwise whether the value changed. The
    /// stored source never decreases.
    pub fn set(&mut self, value: T, source: ConfigurationSource) -> Option<bool> {
        if !self.can_set(&value, source) {
            return None;
        }
        let changed = self.value != value;
        self.value = value;
        self.source = Some(source.max_with(self.source));
        Some(changed)
    }

    /// Restore `value` and forget the source.
    pub fn reset(&mut self, value: T) {
        self.value = value;
        self.source = None;
    }
}

impl<T: Copy + PartialEq> Sourced<T> {
    /// The current value by copy.
    pub fn value(&self) -> T {
        self.value
    }
}
