//! Binds properties to backing fields found by naming pattern.

use crate::internal::InternalModelBuilder;
use crate::metadata::{ConfigurationSource, PropertyId};

pub(crate) fn property_added(mb: &mut InternalModelBuilder, id: PropertyId) -> Option<PropertyId> {
    let property = mb.model.property(id)?;
    if property.is_shadow() || property.field_name().is_some() {
        return Some(id);
    }
    let entity_type = property.declaring_entity_type();
    let property_type = property.property_type().clone();
    let name = property.name().to_string();

    let field = candidate_names(&name).into_iter().find(|candidate| {
        mb.find_member(entity_type, candidate).is_some_and(|m| {
            m.is_field
                && m.member_type.property_type().map(|(t, _)| t).as_ref() == Some(&property_type)
        })
    });
    if let Some(field) = field {
        mb.property_builder(id)
            .has_field(Some(&field), ConfigurationSource::Convention);
    }
    mb.model.contains_property(id).then_some(id)
}

fn candidate_names(name: &str) -> Vec<String> {
    let mut chars = name.chars();
    let camel = match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    };
    vec![format!("_{name}"), format!("_{camel}"), format!("m_{name}")]
}
