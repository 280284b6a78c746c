//! Stable arena identifiers for metadata elements.
//!
//! Elements reference each other by id and resolve through the [`Model`]
//! that owns them. Slots are never reused, so the id of a removed element
//! simply stops resolving.
//!
//! [`Model`]: super::Model

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub(crate) usize);

        impl $name {
            /// The arena slot index.
            pub fn index(self) -> usize {
                self.0
            }
        }
    };
}

arena_id!(
    /// Identifies an entity type.
    EntityTypeId
);
arena_id!(
    /// Identifies a property.
    PropertyId
);
arena_id!(
    /// Identifies a key.
    KeyId
);
arena_id!(
    /// Identifies an index.
    IndexId
);
arena_id!(
    /// Identifies a foreign key.
    ForeignKeyId
);
