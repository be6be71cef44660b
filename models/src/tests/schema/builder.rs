use crate::{EnumTable, FieldKind, ModelError, ScalarType, Schema};

use std::sync::Arc;

/// **VALUE**: Verifies fields are sorted by index regardless of declaration order.
///
/// **WHY THIS MATTERS**: `max_index()` and trailing-element detection rely on the
/// last field being the highest index.
///
/// **BUG THIS CATCHES**: Would catch a builder that forgets to sort.
#[test]
fn given_fields_out_of_order_when_building_then_sorted_by_index() {
    // GIVEN: Fields declared 3, 0, 1
    let schema = Schema::builder("Project")
        .scalar("emoji", 3, ScalarType::String)
        .scalar("title", 0, ScalarType::String)
        .scalar("id", 1, ScalarType::String)
        .build()
        .unwrap();

    // WHEN: Inspecting
    let indices: Vec<usize> = schema.fields().iter().map(|f| f.index).collect();

    // THEN: Sorted, with lookups by name and index
    assert_eq!(indices, vec![0, 1, 3]);
    assert_eq!(schema.max_index(), Some(3));
    assert_eq!(schema.field("emoji").unwrap().index, 3);
    assert_eq!(schema.field_at(1).unwrap().name, "id");
    assert!(schema.field_at(2).is_none());
}

/// **VALUE**: Verifies duplicate indices are rejected.
///
/// **WHY THIS MATTERS**: Two fields on one position would decode the same source
/// value twice under different names, and one of them is certainly wrong.
///
/// **BUG THIS CATCHES**: Would catch removal of the uniqueness check.
#[test]
fn given_duplicate_index_when_building_then_returns_validation_error() {
    let result = Schema::builder("Note")
        .scalar("a", 0, ScalarType::String)
        .scalar("b", 0, ScalarType::Int)
        .build();

    match result.unwrap_err() {
        ModelError::Validation { message, .. } => {
            assert!(message.starts_with("Duplicate index 0"), "{message}");
        }
    }
}

#[test]
fn given_duplicate_name_when_building_then_returns_validation_error() {
    let result = Schema::builder("Note")
        .scalar("a", 0, ScalarType::String)
        .scalar("a", 1, ScalarType::Int)
        .build();

    match result.unwrap_err() {
        ModelError::Validation { message, .. } => {
            assert!(message.contains("Duplicate field name 'a'"), "{message}");
        }
    }
}

#[test]
fn given_empty_schema_name_when_building_then_returns_validation_error() {
    assert!(Schema::builder("").build().is_err());
}

/// **VALUE**: Verifies that nested kinds carry their schema or table.
///
/// **WHY THIS MATTERS**: Mismatch errors quote `describe()`; without the nested
/// name a developer cannot tell which message failed.
///
/// **BUG THIS CATCHES**: Would catch a describe() that drops the nested name.
#[test]
fn given_nested_kinds_when_described_then_include_nested_names() {
    let nested = Arc::new(Schema::builder("Source").build().unwrap());
    let table = Arc::new(EnumTable::new("Status", [(1, "ENABLED")]));

    assert_eq!(FieldKind::Message(nested.clone()).describe(), "message Source");
    assert_eq!(
        FieldKind::RepeatedMessage(nested).describe(),
        "array of message Source"
    );
    assert_eq!(FieldKind::Enum(table.clone()).describe(), "enum Status");
    assert_eq!(
        FieldKind::RepeatedScalar(ScalarType::Float).describe(),
        "array of number"
    );
    assert_eq!(table.lookup(1), Some("ENABLED"));
    assert_eq!(table.lookup(2), None);
}
