//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use ormdb_model::{MemberAttribute, MemberShape, MemberType, ScalarType, TypeRegistry, TypeShape};
use std::sync::Once;

static TRACING: Once = Once::new();

/// Route `tracing` output to the test harness, filtered by `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// `Blog { Id, Posts }` and `Post { Id, BlogId, Blog }`.
pub fn blog_registry() -> TypeRegistry {
    TypeRegistry::new()
        .with_shape(
            TypeShape::new("Blog")
                .with_scalar("Id", ScalarType::Int32)
                .with_scalar("Url", ScalarType::String)
                .with_collection("Posts", "Post"),
        )
        .with_shape(
            TypeShape::new("Post")
                .with_scalar("Id", ScalarType::Int32)
                .with_scalar("Title", ScalarType::String)
                .with_scalar("BlogId", ScalarType::Int32)
                .with_reference("Blog", "Blog"),
        )
}

/// The blog fixture plus `Pin`, a second dependent of `Blog`.
pub fn pinned_blog_registry() -> TypeRegistry {
    let mut registry = blog_registry();
    registry.register(
        TypeShape::new("Blog")
            .with_scalar("Id", ScalarType::Int32)
            .with_scalar("Url", ScalarType::String)
            .with_collection("Posts", "Post")
            .with_collection("Pins", "Pin"),
    );
    registry.register(
        TypeShape::new("Pin")
            .with_scalar("Id", ScalarType::Int32)
            .with_scalar("BlogId", ScalarType::Int32)
            .with_reference("Blog", "Blog"),
    );
    registry
}

/// A small store: inheritance, an owned type and data annotations.
pub fn store_registry() -> TypeRegistry {
    TypeRegistry::new()
        .with_shape(
            TypeShape::new("Product")
                .with_member(
                    MemberShape::property("Sku", MemberType::Scalar(ScalarType::String))
                        .with_attribute(MemberAttribute::Key)
                        .with_attribute(MemberAttribute::MaxLength(32)),
                )
                .with_member(
                    MemberShape::property("Name", MemberType::Scalar(ScalarType::String))
                        .with_attribute(MemberAttribute::Required),
                )
                .with_property("Discontinued", MemberType::OptionalScalar(ScalarType::Timestamp)),
        )
        .with_shape(
            TypeShape::new("Book")
                .with_base("Product")
                .with_scalar("Isbn", ScalarType::String),
        )
        .with_shape(
            TypeShape::new("Customer")
                .with_scalar("Id", ScalarType::Int64)
                .with_reference("Address", "Address")
                .with_collection("Orders", "Order"),
        )
        .with_shape(
            TypeShape::new("Address")
                .with_scalar("Street", ScalarType::String)
                .with_scalar("City", ScalarType::String)
                .owned(),
        )
        .with_shape(
            TypeShape::new("Order")
                .with_scalar("Id", ScalarType::Int64)
                .with_scalar("BuyerId", ScalarType::Int64)
                .with_member(
                    MemberShape::property(
                        "Buyer",
                        MemberType::Reference {
                            entity: "Customer".into(),
                        },
                    )
                    .with_attribute(MemberAttribute::ForeignKey("BuyerId".into())),
                ),
        )
}
