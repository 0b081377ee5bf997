// SPDX-License-Identifier: PMPL-1.0-or-later
//! Shared fixture: a small shop with customers, addresses, orders and items.

#![allow(dead_code)]

use dynaquery_core::SchemaRegistry;
use dynaquery_memory::MemoryStore;
use serde_json::{json, Value as Json};

pub const SHOP_SCHEMA: &str = r#"{
    "model_namespace": "shop",
    "entities": [
        {"name": "shop.Customer", "fields": [
            {"name": "id", "type": "int32"},
            {"name": "name", "type": "string"},
            {"name": "joined", "type": "datetime?"},
            {"name": "address", "type": "shop.Address"},
            {"name": "orders", "type": "[shop.Order]"}
        ]},
        {"name": "shop.Address", "fields": [
            {"name": "city", "type": "string?"}
        ]},
        {"name": "shop.Order", "fields": [
            {"name": "id", "type": "int32"},
            {"name": "customer_id", "type": "int32"},
            {"name": "total", "type": "decimal"},
            {"name": "item", "type": "shop.Item"}
        ]},
        {"name": "shop.Item", "fields": [
            {"name": "sku", "type": "string"},
            {"name": "name", "type": "string"}
        ]}
    ]
}"#;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn registry() -> SchemaRegistry {
    SchemaRegistry::from_json(SHOP_SCHEMA).unwrap()
}

pub fn apple() -> Json {
    json!({"sku": "A-1", "name": "apple"})
}

pub fn bread() -> Json {
    json!({"sku": "B-2", "name": "bread"})
}

pub fn orders() -> Vec<Json> {
    vec![
        json!({"id": 10, "customer_id": 1, "total": 12.5, "item": apple()}),
        json!({"id": 11, "customer_id": 1, "total": 40.0, "item": bread()}),
        json!({"id": 12, "customer_id": 3, "total": 5.0, "item": apple()}),
    ]
}

pub fn customers() -> Vec<Json> {
    let orders = orders();
    vec![
        json!({
            "id": 1,
            "name": "ann",
            "joined": "2024-01-15T09:00:00Z",
            "address": {"city": "Leeds"},
            "orders": [orders[0], orders[1]],
        }),
        json!({
            "id": 2,
            "name": "bob",
            "joined": "2023-06-01T00:00:00Z",
            "address": {"city": "York"},
            "orders": [],
        }),
        json!({
            "id": 3,
            "name": "cy",
            "joined": null,
            "address": null,
            "orders": [orders[2]],
        }),
    ]
}

pub fn store() -> MemoryStore {
    let mut store = MemoryStore::new();
    store.insert("shop.Customer", customers()).unwrap();
    store.insert("shop.Order", orders()).unwrap();
    store
}

/// Values of `member` across `rows`.
pub fn column(rows: &[Json], member: &str) -> Vec<Json> {
    rows.iter().map(|row| row[member].clone()).collect()
}
