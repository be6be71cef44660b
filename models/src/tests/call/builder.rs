use crate::{ArgValue, Call, ModelError};

/// **VALUE**: Verifies that a fully specified call builds and keeps argument order.
///
/// **WHY THIS MATTERS**: Arguments are positional. Reordering or dropping a `Null`
/// placeholder shifts every later argument and the server executes something else.
///
/// **BUG THIS CATCHES**: Would catch a builder that filters nulls or sorts arguments.
#[test]
fn given_id_args_and_scope_when_building_call_then_preserves_everything() {
    // GIVEN: A builder with a null placeholder between two arguments
    let builder = Call::builder()
        .with_id("rLM1Ne")
        .with_arg("project-1")
        .with_arg(ArgValue::Null)
        .with_arg(2)
        .with_scope_key("project-1");

    // WHEN: Building
    let call = builder.build().unwrap();

    // THEN: Id, argument order and scope key survive
    assert_eq!(call.id(), "rLM1Ne");
    assert_eq!(
        call.args(),
        &[
            ArgValue::Str("project-1".to_string()),
            ArgValue::Null,
            ArgValue::Int(2)
        ]
    );
    assert_eq!(call.scope_key(), Some("project-1"));
}

/// **VALUE**: Verifies that the RPC id is mandatory.
///
/// **WHY THIS MATTERS**: A call without an id would be encoded as an empty `rpcids`
/// query and rejected by the server with an unhelpful 400.
///
/// **BUG THIS CATCHES**: Would catch if the required-field check is dropped.
#[test]
fn given_missing_id_when_building_call_then_returns_validation_error() {
    // GIVEN: Builder without id
    let builder = Call::builder().with_arg("x");

    // WHEN: Building
    let result = builder.build();

    // THEN: Validation error
    match result.unwrap_err() {
        ModelError::Validation { message, .. } => {
            assert_eq!(message, "RPC id is required");
        }
    }
}

/// **VALUE**: Verifies ids that would corrupt the `rpcids` list are rejected.
///
/// **WHY THIS MATTERS**: Batched ids are comma-joined into one query parameter; a
/// comma inside an id would split it into two bogus calls.
///
/// **BUG THIS CATCHES**: Would catch removal of the separator check.
#[test]
fn given_id_with_separator_when_building_call_then_returns_validation_error() {
    for id in ["a,b", "a b", ""] {
        let result = Call::builder().with_id(id).build();
        assert!(result.is_err(), "id {id:?} should be rejected");
    }
}

#[test]
fn given_empty_scope_key_when_building_call_then_returns_validation_error() {
    let result = Call::builder().with_id("wXbhsf").with_scope_key("").build();

    match result.unwrap_err() {
        ModelError::Validation { message, .. } => {
            assert_eq!(message, "Scope key cannot be empty");
        }
    }
}

/// **VALUE**: Verifies the `From` conversions used to build nested argument trees.
///
/// **WHY THIS MATTERS**: Domain calls build deep trees like `[[["id"]]]`; a wrong
/// conversion silently changes the nesting depth.
///
/// **BUG THIS CATCHES**: Would catch Option::None not mapping to Null or Vec not
/// mapping to List.
#[test]
fn given_rust_values_when_converted_then_produce_expected_arg_tree() {
    let none: Option<&str> = None;

    let arg = ArgValue::list(vec![
        ArgValue::from(vec!["a", "b"]),
        ArgValue::from(none),
        ArgValue::from(true),
        ArgValue::from(1.5),
    ]);

    assert_eq!(
        arg,
        ArgValue::List(vec![
            ArgValue::List(vec![
                ArgValue::Str("a".to_string()),
                ArgValue::Str("b".to_string())
            ]),
            ArgValue::Null,
            ArgValue::Bool(true),
            ArgValue::Float(1.5),
        ])
    );
}
