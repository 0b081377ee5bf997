// SPDX-License-Identifier: PMPL-1.0-or-later
//! Property-based tests for path parsing, coercion and relation planning

use std::collections::BTreeSet;

use dynaquery_core::{
    coerce, Combinator, Condition, EntitySchema, FieldPath, FilterTreeBuilder, LeafMerge,
    Operator, PredicateAssembler, ProjectionTreeBuilder, ScalarKind, ScalarType, SchemaRegistry,
    Value,
};
use proptest::prelude::*;

fn shop() -> SchemaRegistry {
    SchemaRegistry::builder("shop")
        .entity(
            EntitySchema::new("shop.Customer")
                .scalar("id", ScalarKind::Int32)
                .reference("address", "shop.Address")
                .collection("orders", "shop.Order"),
        )
        .entity(
            EntitySchema::new("shop.Address")
                .scalar("city", ScalarKind::String)
                .reference("country", "shop.Country"),
        )
        .entity(EntitySchema::new("shop.Country").scalar("code", ScalarKind::String))
        .entity(
            EntitySchema::new("shop.Order")
                .scalar("total", ScalarKind::Double)
                .reference("item", "shop.Item"),
        )
        .entity(EntitySchema::new("shop.Item").scalar("sku", ScalarKind::String))
        .build()
        .unwrap()
}

/// Generate arbitrary member names
fn arb_segment() -> impl Strategy<Value = String> {
    "[a-zA-Z_][a-zA-Z0-9_]{0,11}"
}

/// Scalar leaf paths of the shop schema
fn arb_leaf_path() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "id",
        "address.city",
        "address.country.code",
        "orders.total",
        "orders.item.sku",
    ])
}

#[test]
fn test_projection_trees_merge_without_duplicates() {
    let registry = shop();
    let build = |paths: &[&str]| {
        let mut builder = ProjectionTreeBuilder::new(&registry, "shop.Customer", 16).unwrap();
        for path in paths {
            builder.add(path).unwrap();
        }
        builder.finish().0
    };

    let mut tree = build(&["id", "address.city"]);
    tree.merge(build(&["address.city", "orders.total"]), LeafMerge::Dedupe);
    assert_eq!(tree.leaf_count(), 3);

    let mut tree = build(&["id"]);
    tree.merge(build(&["id"]), LeafMerge::Append);
    assert_eq!(tree.leaf_count(), 2);
}

proptest! {
    #[test]
    fn test_dotted_path_round_trips(segments in prop::collection::vec(arb_segment(), 1..8)) {
        let raw = segments.join(".");
        let path = FieldPath::parse(&raw).unwrap();
        prop_assert_eq!(path.segments(), segments.as_slice());
        prop_assert_eq!(path.to_string(), raw);
        prop_assert_eq!(path.leaf(), segments[segments.len() - 1].as_str());
    }

    #[test]
    fn test_int16_coercion_respects_range(n in any::<i32>()) {
        let result = coerce(&n.to_string(), ScalarType::required(ScalarKind::Int16));
        if i16::try_from(n).is_ok() {
            prop_assert_eq!(result.unwrap(), Value::Int(i64::from(n)));
        } else {
            prop_assert_eq!(result.unwrap_err().code(), "ValueConversionError");
        }
    }

    #[test]
    fn test_each_relation_planned_once_parent_first(
        filters in prop::collection::vec(arb_leaf_path(), 0..6),
        projected in prop::collection::vec(arb_leaf_path(), 0..6)
    ) {
        let registry = shop();
        let mut filter = FilterTreeBuilder::new(&registry, "shop.Customer", 16).unwrap();
        for path in &filters {
            filter.add(&Condition::new(*path, Operator::Equal, "1")).unwrap();
        }
        let mut projection = ProjectionTreeBuilder::new(&registry, "shop.Customer", 16).unwrap();
        for path in &projected {
            projection.add(path).unwrap();
        }

        let (_, mut relations) = filter.finish();
        relations.merge(projection.finish().1);
        let plan = relations.plan();

        let mut seen = BTreeSet::new();
        for load in &plan {
            prop_assert!(seen.insert(load.id()), "duplicate load {}", load.id());
            if load.nested {
                let parent = load.path[..load.path.len() - 1].join(".");
                prop_assert!(seen.contains(&parent), "{} planned before {}", load.id(), parent);
            }
        }

        let expected: BTreeSet<String> = filters
            .iter()
            .chain(&projected)
            .flat_map(|path| {
                let segments: Vec<&str> = path.split('.').collect();
                (1..segments.len()).map(move |n| segments[..n].join("."))
            })
            .collect();
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn test_fingerprint_ignores_parameter_values(a in any::<i32>(), b in any::<i32>()) {
        let registry = shop();
        let fingerprint = |id: i32| {
            let mut builder = FilterTreeBuilder::new(&registry, "shop.Customer", 16).unwrap();
            builder
                .add(&Condition::new("id", Operator::GreaterEqual, id.to_string()))
                .unwrap();
            builder
                .add(&Condition::new("orders.item.sku", Operator::Equal, "X"))
                .unwrap();
            let (tree, _) = builder.finish();
            PredicateAssembler::new(Combinator::And, true)
                .assemble("shop.Customer", &tree)
                .unwrap()
                .unwrap()
                .shape_fingerprint()
        };
        prop_assert_eq!(fingerprint(a), fingerprint(b));
    }
}
