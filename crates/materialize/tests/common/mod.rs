//! Shared fixtures for integration tests

#![allow(dead_code)]

use elif_materialize::{
    ColumnMapping, ColumnMappingConnector, InMemoryRegistry, Materializer, ModelResolver,
    ModelType, PassthroughConnector, PropertyType, RelationDescriptor, RelationType, Row,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Customer -> orders -> items, customer -> profile, plus a vehicle hierarchy
pub fn shop_registry() -> InMemoryRegistry {
    let registry = InMemoryRegistry::new();

    registry
        .register(
            ModelType::new("Customer")
                .property("id", PropertyType::Number)
                .property("name", PropertyType::String)
                .property("email", PropertyType::String)
                .relation(RelationDescriptor::has_many("orders", "Order"))
                .relation(RelationDescriptor::has_one("profile", "Profile"))
                .relation(RelationDescriptor::new(
                    "groups",
                    RelationType::HasAndBelongsToMany,
                    "Group",
                ))
                .relation(RelationDescriptor::has_many("vehicles", "Vehicle")),
        )
        .unwrap();

    registry
        .register(
            ModelType::new("Order")
                .property("id", PropertyType::Number)
                .property("total", PropertyType::Number)
                .property("customerId", PropertyType::Number)
                .relation(RelationDescriptor::has_many("items", "Item"))
                .relation(RelationDescriptor::belongs_to("customer", "Customer")),
        )
        .unwrap();

    registry
        .register(
            ModelType::new("Item")
                .property("id", PropertyType::Number)
                .property("sku", PropertyType::String)
                .property("quantity", PropertyType::Number),
        )
        .unwrap();

    registry
        .register(
            ModelType::new("Profile")
                .property("id", PropertyType::Number)
                .property("bio", PropertyType::String),
        )
        .unwrap();

    registry
        .register(ModelType::new("Group").property("name", PropertyType::String))
        .unwrap();

    registry
        .register(
            ModelType::new("Vehicle")
                .property("id", PropertyType::Number)
                .property("kind", PropertyType::String)
                .with_resolver(ModelResolver::discriminator(
                    "kind",
                    [("car", "Car"), ("truck", "Truck")],
                )),
        )
        .unwrap();

    registry
        .register(
            ModelType::new("Car")
                .property("id", PropertyType::Number)
                .property("kind", PropertyType::String)
                .property("doors", PropertyType::Number),
        )
        .unwrap();

    registry
        .register(
            ModelType::new("Truck")
                .property("id", PropertyType::Number)
                .property("kind", PropertyType::String)
                .property("payload", PropertyType::Number)
                .relation(RelationDescriptor::has_many("trailers", "Trailer")),
        )
        .unwrap();

    registry
        .register(ModelType::new("Trailer").property("length", PropertyType::Number))
        .unwrap();

    registry
}

pub fn materializer() -> Materializer {
    Materializer::new(Arc::new(shop_registry()), Arc::new(PassthroughConnector))
}

/// Materializer whose connector speaks snake_case columns
pub fn sql_materializer() -> Materializer {
    let connector = ColumnMappingConnector::new()
        .with_model(
            "Customer",
            ColumnMapping::new()
                .rename("full_name", "name")
                .rename("email_address", "email"),
        )
        .with_model("Order", ColumnMapping::new().rename("customer_id", "customerId"))
        .with_model("Item", ColumnMapping::new());

    Materializer::new(Arc::new(shop_registry()), Arc::new(connector))
}

pub fn customer_with_orders() -> Value {
    json!({
        "id": 1,
        "name": "Ada",
        "email": "ada@example.com",
        "password_hash": "never-leaks",
        "orders": [
            {
                "id": 10,
                "total": 25,
                "customerId": 1,
                "items": [
                    {"id": 100, "sku": "pen", "quantity": 2},
                    {"id": 101, "sku": "ink", "quantity": 1}
                ]
            },
            {
                "id": 11,
                "total": 5,
                "customerId": 1,
                "items": [{"id": 102, "sku": "pad", "quantity": 3}]
            }
        ]
    })
}

pub fn row(value: Value) -> Row {
    value.as_object().cloned().expect("fixture must be an object")
}
