//! Integration tests for convention-driven model building.

mod common;

use common::{blog_registry, init_tracing, pinned_blog_registry, store_registry};
use ormdb_model::conventions::ConventionSet;
use ormdb_model::{
    ConfigurationSource, Diagnostic, DiagnosticLevel, EntityTypeId, ForeignKey, InternalModelBuilder,
    KeyId, ModelBuilder, ModelConfig, ModelSnapshot, PropertyId, PropertyType, ScalarType,
    TypeRegistry, TypeShape, ValueGenerated,
};
use std::cell::RefCell;
use std::rc::Rc;

type EventLog = Rc<RefCell<Vec<String>>>;

/// Core conventions plus recorders appended to a few event kinds.
fn recording_conventions(config: &ModelConfig, log: &EventLog) -> ConventionSet {
    let mut set = ConventionSet::core(config);

    let events = Rc::clone(log);
    set.property_added.push(Rc::new(
        move |mb: &mut InternalModelBuilder, id: PropertyId| -> Option<PropertyId> {
            if let Some(property) = mb.model().property(id) {
                events.borrow_mut().push(format!("property_added:{}", property.name()));
            }
            Some(id)
        },
    ));

    let events = Rc::clone(log);
    set.key_added.push(Rc::new(
        move |mb: &mut InternalModelBuilder, id: KeyId| -> Option<KeyId> {
            if let Some(key) = mb.model().key(id) {
                let names = mb.model().property_names(key.properties()).join(",");
                events.borrow_mut().push(format!("key_added:{names}"));
            }
            Some(id)
        },
    ));

    let events = Rc::clone(log);
    set.primary_key_changed.push(Rc::new(
        move |mb: &mut InternalModelBuilder, id: EntityTypeId, _previous: &[PropertyId]| -> bool {
            let name = mb.model().entity_type_name(id);
            events.borrow_mut().push(format!("primary_key_changed:{name}"));
            true
        },
    ));

    let events = Rc::clone(log);
    set.foreign_key_removed.push(Rc::new(
        move |mb: &mut InternalModelBuilder, foreign_key: &ForeignKey| -> bool {
            let name = mb.model().entity_type_name(foreign_key.declaring_entity_type());
            events.borrow_mut().push(format!("foreign_key_removed:{name}"));
            true
        },
    ));

    set
}

#[test]
fn test_blog_post_relationship_is_discovered() {
    init_tracing();
    let mut builder = ModelBuilder::new(blog_registry());
    builder.entity("Blog").unwrap();
    builder.entity("Post").unwrap();
    let model = builder.finalize().unwrap();

    let blog = model.find_entity_type_id("Blog").unwrap();
    let post = model.find_entity_type_id("Post").unwrap();
    assert_eq!(model.all_foreign_key_ids().len(), 1);

    let foreign_key = model.foreign_keys(post)[0];
    assert_eq!(foreign_key.declaring_entity_type(), post);
    assert_eq!(foreign_key.principal_entity_type(), blog);
    assert_eq!(model.property_names(foreign_key.properties()), vec!["BlogId"]);
    assert_eq!(Some(foreign_key.principal_key()), model.primary_key_id(blog));
    assert!(!foreign_key.is_unique());
    assert_eq!(foreign_key.dependent_to_principal().map(|n| n.name()), Some("Blog"));
    assert_eq!(foreign_key.principal_to_dependent().map(|n| n.name()), Some("Posts"));
}

#[test]
fn test_case_variant_key_candidates_leave_no_key() {
    init_tracing();
    let registry = TypeRegistry::new().with_shape(
        TypeShape::new("Widget")
            .with_scalar("ID", ScalarType::Int32)
            .with_scalar("Id", ScalarType::Int32),
    );
    let mut builder = ModelBuilder::new(registry);
    let widget = builder.entity("Widget").unwrap().id();

    let model = builder.model();
    assert!(model.find_primary_key(widget).is_none());

    let logged: Vec<&Diagnostic> = model
        .diagnostics()
        .with_code("multiple_primary_key_candidates")
        .collect();
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].level(), DiagnosticLevel::Information);
    let message = logged[0].to_string();
    assert!(message.contains("Widget"));
    assert!(message.contains("ID"));
    assert!(message.contains("Id"));
}

#[test]
fn test_removing_key_cascades_to_foreign_keys() {
    init_tracing();
    let config = ModelConfig::default();
    let log: EventLog = Rc::default();
    let mut builder = InternalModelBuilder::with_conventions(
        pinned_blog_registry(),
        config.clone(),
        recording_conventions(&config, &log),
    );
    let blog = builder.entity("Blog", ConfigurationSource::Explicit).unwrap();
    let key = builder.model().primary_key_id(blog).unwrap();
    assert_eq!(builder.model().foreign_keys_referencing_key(key).len(), 2);

    log.borrow_mut().clear();
    builder
        .entity_builder(blog)
        .remove_key(key, ConfigurationSource::Explicit)
        .unwrap();

    assert!(builder.model().find_primary_key(blog).is_none());
    assert!(builder.model().all_foreign_key_ids().is_empty());

    // Dependents go in the order their entity types were mapped.
    assert_eq!(
        *log.borrow(),
        vec![
            "primary_key_changed:Blog",
            "foreign_key_removed:Post",
            "foreign_key_removed:Pin",
        ]
    );
}

#[test]
fn test_value_generation_follows_foreign_keys() {
    init_tracing();
    let registry = TypeRegistry::new()
        .with_shape(
            TypeShape::new("Person")
                .with_scalar("Id", ScalarType::Int32)
                .with_reference("Profile", "Profile"),
        )
        .with_shape(
            TypeShape::new("Profile")
                .with_scalar("Id", ScalarType::Int32)
                .with_reference("Person", "Person"),
        );
    let config = ModelConfig::default().without_relationship_discovery();
    let mut builder = ModelBuilder::with_config(registry, config);
    builder.entity("Person").unwrap();
    let profile = builder.entity("Profile").unwrap().id();

    let generation = |builder: &ModelBuilder| {
        let property = builder.model().find_property(profile, "Id").unwrap();
        (property.value_generated(), property.requires_value_generator())
    };
    assert_eq!(generation(&builder), (ValueGenerated::OnAdd, true));

    let foreign_key = {
        let mut entity = builder.entity("Profile").unwrap();
        let mut relationship = entity.has_one("Person").unwrap().with_one(Some("Profile")).unwrap();
        relationship.has_foreign_key_on("Profile", &["Id"]).unwrap();
        relationship.id()
    };
    assert_eq!(generation(&builder), (ValueGenerated::Never, false));

    builder
        .internal()
        .remove_foreign_key(foreign_key, ConfigurationSource::Explicit)
        .unwrap();
    assert_eq!(generation(&builder), (ValueGenerated::OnAdd, true));
}

#[test]
fn test_configuration_source_precedence() {
    let mut builder = InternalModelBuilder::new(blog_registry(), ModelConfig::default());
    let blog = builder.entity("Blog", ConfigurationSource::Explicit).unwrap();
    let url = builder.model().find_property_id(blog, "Url").unwrap();
    let max_length = |builder: &InternalModelBuilder| builder.model().property(url).unwrap().max_length();

    let mut property = builder.property_builder(url);
    assert!(property.has_max_length(Some(100), ConfigurationSource::Convention));
    assert!(property.has_max_length(Some(200), ConfigurationSource::Explicit));
    assert!(!property.has_max_length(Some(50), ConfigurationSource::Convention));
    assert!(!property.has_max_length(Some(50), ConfigurationSource::DataAnnotation));
    assert_eq!(max_length(&builder), Some(200));

    assert!(builder
        .property_builder(url)
        .has_max_length(Some(300), ConfigurationSource::Explicit));
    assert_eq!(max_length(&builder), Some(300));
}

#[test]
fn test_batch_delivers_each_change_once() {
    let registry =
        TypeRegistry::new().with_shape(TypeShape::new("Tag").with_scalar("Id", ScalarType::Int32));
    let config = ModelConfig::default();
    let log: EventLog = Rc::default();
    let mut builder =
        InternalModelBuilder::with_conventions(registry, config.clone(), recording_conventions(&config, &log));
    let tag = builder.entity("Tag", ConfigurationSource::Explicit).unwrap();
    log.borrow_mut().clear();

    {
        let mut batch = builder.start_batch();
        let code = batch
            .entity_builder(tag)
            .shadow_property(
                "Code",
                PropertyType::scalar(ScalarType::String),
                false,
                ConfigurationSource::Explicit,
            )
            .unwrap();
        batch
            .entity_builder(tag)
            .has_key(vec![code], ConfigurationSource::Explicit)
            .unwrap();
        assert!(log.borrow().is_empty());
        assert_eq!(batch.dispatcher().batch_depth(), 1);
    }

    assert_eq!(
        *log.borrow(),
        vec!["property_added:Code".to_string(), "key_added:Code".to_string()]
    );
    assert_eq!(builder.dispatcher().batch_depth(), 0);
    assert_eq!(builder.dispatcher().pending_events(), 0);
}

#[test]
fn test_rediscovery_after_explicit_configuration_is_stable() {
    init_tracing();
    let configure = |builder: &mut ModelBuilder| {
        let mut post = builder.entity("Post").unwrap();
        post.has_one("Blog")
            .unwrap()
            .with_many(Some("Posts"))
            .unwrap()
            .has_foreign_key(&["BlogId"])
            .unwrap();
        post.property("Title").unwrap().has_max_length(120).unwrap();
    };

    let mut builder = ModelBuilder::new(blog_registry());
    builder.entity("Blog").unwrap();
    configure(&mut builder);
    let before = ModelSnapshot::capture(builder.model());

    configure(&mut builder);
    builder.internal().entity("Blog", ConfigurationSource::Convention).unwrap();
    builder.internal().entity("Post", ConfigurationSource::Convention).unwrap();
    assert_eq!(ModelSnapshot::capture(builder.model()), before);

    let model = builder.finalize().unwrap();
    assert_eq!(ModelSnapshot::capture(&model).entity_type_names(), vec!["Blog", "Post"]);
}

#[test]
fn test_snapshot_as_json() {
    let mut builder = ModelBuilder::new(blog_registry());
    builder.entity("Blog").unwrap();
    let model = builder.finalize().unwrap();

    let snapshot = ModelSnapshot::capture(&model);
    let json = snapshot.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["entity_types"][0]["name"], "Blog");
    assert_eq!(value["entity_types"][1]["name"], "Post");
    assert_eq!(
        value["entity_types"][1]["foreign_keys"][0]["properties"],
        serde_json::json!(["BlogId"])
    );
    assert_eq!(
        value["entity_types"][1]["foreign_keys"][0]["principal_entity_type"],
        "Blog"
    );
    assert_eq!(ModelSnapshot::from_json(&json).unwrap(), snapshot);
}

#[test]
fn test_store_model() {
    init_tracing();
    let mut builder = ModelBuilder::new(store_registry());
    for name in ["Product", "Book", "Customer"] {
        builder.entity(name).unwrap();
    }
    let model = builder.finalize().unwrap();

    let product = model.find_entity_type_id("Product").unwrap();
    let book = model.find_entity_type_id("Book").unwrap();
    assert_eq!(model.entity_type(book).unwrap().base_type(), Some(product));
    assert_eq!(model.root_type(book), product);
    let key = model.find_primary_key(book).unwrap();
    assert_eq!(model.property_names(key.properties()), vec!["Sku"]);
    let sku = model.find_property(product, "Sku").unwrap();
    assert_eq!(sku.max_length(), Some(32));
    assert_eq!(sku.value_generated(), ValueGenerated::OnAdd);
    assert!(!model.find_property(product, "Name").unwrap().is_nullable());
    assert!(model.find_property(product, "Discontinued").unwrap().is_nullable());

    let customer = model.find_entity_type_id("Customer").unwrap();
    let address = model.find_navigation(customer, "Address").unwrap();
    let weak = model.entity_type(address.target_entity_type).unwrap();
    assert!(weak.is_weak());
    assert_eq!(weak.name(), "Customer.Address#Address");
    assert!(model.find_primary_key(weak.id()).is_some());

    let order = model.find_entity_type_id("Order").unwrap();
    let buyer = model.find_navigation(order, "Buyer").unwrap();
    let foreign_key = model.foreign_key(buyer.foreign_key).unwrap();
    assert_eq!(model.property_names(foreign_key.properties()), vec!["BuyerId"]);
    assert_eq!(
        foreign_key.properties_configuration_source(),
        Some(ConfigurationSource::DataAnnotation)
    );
    assert_eq!(foreign_key.principal_to_dependent().map(|n| n.name()), Some("Orders"));
}
