use crate::{EnumValue, FieldValue, Record};

use serde_json::json;

fn sample() -> Record {
    let child = Record::new(
        "Child",
        vec![("id".to_string(), FieldValue::Str("c1".to_string()))],
        Vec::new(),
    );
    Record::new(
        "Parent",
        vec![
            ("title".to_string(), FieldValue::Str("Notes".to_string())),
            ("count".to_string(), FieldValue::Int(3)),
            ("ready".to_string(), FieldValue::Bool(true)),
            ("child".to_string(), FieldValue::Message(Some(child.clone()))),
            ("children".to_string(), FieldValue::Messages(vec![child])),
            (
                "tags".to_string(),
                FieldValue::Repeated(vec![
                    FieldValue::Str("a".to_string()),
                    FieldValue::Str("b".to_string()),
                ]),
            ),
            ("status".to_string(), FieldValue::Enum(EnumValue::Unknown(99))),
        ],
        vec![json!("extra")],
    )
}

/// **VALUE**: Verifies typed accessors return values only for the matching kind.
///
/// **WHY THIS MATTERS**: Typed domain structs are built through these accessors; a
/// lenient accessor would hide a schema declared with the wrong kind.
///
/// **BUG THIS CATCHES**: Would catch `str()` returning something for an Int field.
#[test]
fn given_record_when_using_accessors_then_returns_typed_values() {
    let record = sample();

    assert_eq!(record.schema_name(), "Parent");
    assert_eq!(record.str("title"), Some("Notes"));
    assert_eq!(record.str("count"), None);
    assert_eq!(record.i64("count"), Some(3));
    assert_eq!(record.f64("count"), Some(3.0));
    assert_eq!(record.bool("ready"), Some(true));
    assert_eq!(record.message("child").unwrap().str("id"), Some("c1"));
    assert_eq!(record.messages("children").len(), 1);
    assert!(record.messages("missing").is_empty());
    assert_eq!(record.strings("tags"), vec!["a", "b"]);
    assert_eq!(record.enum_value("status").unwrap().number(), 99);
    assert!(!record.enum_value("status").unwrap().is_known());
    assert_eq!(record.trailing(), &[json!("extra")]);
}

#[test]
fn given_record_when_taking_field_then_field_is_moved_out() {
    let mut record = sample();

    let taken = record.take("title");

    assert_eq!(taken, Some(FieldValue::Str("Notes".to_string())));
    assert!(record.get("title").is_none());
    assert!(record.take("title").is_none());
}
