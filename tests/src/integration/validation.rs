//! # Schema Loading and Validation
//!
//! Properties of the registry and validator working on a loaded document.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rc_01_type_registry::test_utils::accounts_registry;
    use rc_01_type_registry::{SchemaError, TypeRegistry};
    use rc_02_validator::{ValidationError, ValidationFailure, Validator};
    use serde_json::{json, Value};

    fn validator() -> Validator {
        Validator::new(accounts_registry().expect("accounts schema"))
    }

    fn last_error(validator: &Validator) -> Option<ValidationError> {
        validator.last_error().and_then(|f| f.error().cloned())
    }

    // =============================================================================
    // SCHEMA LOADING
    // =============================================================================

    #[test]
    fn test_cyclic_custom_types_rejected() {
        let raw = r#"{"types": [
            {"name": "a", "type": "b", "validateSpec": []},
            {"name": "b", "type": "a", "validateSpec": []}
        ]}"#;

        match TypeRegistry::from_json_str(raw) {
            Err(SchemaError::CyclicType { chain }) => {
                assert!(chain.len() >= 3);
                assert_eq!(chain.first(), chain.last());
            }
            other => panic!("expected CyclicType, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_dangling_reference_rejected() {
        let raw = r#"{"structs": [{"name": "s", "exception": false, "fields": [
            {"index": 1, "name": "f", "optional": false, "type": "missing", "validateSpec": []}
        ]}]}"#;

        assert_eq!(
            TypeRegistry::from_json_str(raw).map(|_| ()),
            Err(SchemaError::UnknownType("missing".into()))
        );
    }

    // =============================================================================
    // STRUCT VALIDATION
    // =============================================================================

    #[test]
    fn test_valid_struct() {
        let v = validator();
        assert_eq!(
            v.validate_type("account", &json!({"id": 5, "allocation": 10})),
            Ok(true)
        );
        assert!(v.last_error().is_none());
    }

    #[test]
    fn test_missing_required_field() {
        let v = validator();
        assert_eq!(v.validate_type("account", &json!({"allocation": 10})), Ok(false));
        assert_eq!(
            last_error(&v),
            Some(ValidationError::MissingRequiredField("id".into()))
        );
    }

    #[test]
    fn test_unexpected_fields_named_exactly() {
        let v = validator();
        assert_eq!(
            v.validate_type(
                "account",
                &json!({"id": 5, "allocation": 10, "zeta": 1, "alpha": 2})
            ),
            Ok(false)
        );
        assert_eq!(
            last_error(&v),
            Some(ValidationError::UnexpectedFields(vec![
                "alpha".into(),
                "zeta".into()
            ]))
        );
    }

    #[test]
    fn test_call_params_checked_against_method() {
        let v = validator();
        assert_eq!(
            v.validate_call("Accounts", "listAccounts", &json!({"ids": [1, 2], "quotas": {"1": 5}})),
            Ok(true)
        );
        assert_eq!(
            v.validate_call("Accounts", "listAccounts", &json!({"ids": [0]})),
            Ok(false)
        );
        assert!(matches!(
            v.last_error(),
            Some(ValidationFailure::Invalid { ref path, .. }) if path.contains("ids")
        ));
        assert!(matches!(
            v.validate_call("Accounts", "deleteAccount", &json!({})),
            Err(SchemaError::UnknownMethod { .. })
        ));
    }

    #[test]
    fn test_last_error_cleared_on_success() {
        let v = validator();
        assert_eq!(v.validate_type("account_id", &json!(0)), Ok(false));
        assert!(v.last_error().is_some());
        assert_eq!(v.validate_type("account_id", &json!(1)), Ok(true));
        assert!(v.last_error().is_none());
    }

    // =============================================================================
    // PROPERTIES
    // =============================================================================

    proptest! {
        #[test]
        fn prop_empty_list_always_valid(name in prop::sample::select(vec![
            "account", "account_id", "username", "Color", "i64", "string", "bool",
        ])) {
            let v = validator();
            let list = rc_01_type_registry::TypeRef::List(Box::new(
                rc_01_type_registry::TypeRef::Named(name.to_string()),
            ));
            prop_assert_eq!(v.validate_ref(&list, &json!([])), Ok(true));
        }

        #[test]
        fn prop_enum_accepts_only_declared_ordinals(ordinal in -10i64..10) {
            let v = validator();
            let expected = ordinal == 1 || ordinal == 4;
            prop_assert_eq!(v.validate_type("Color", &json!(ordinal)), Ok(expected));
        }

        #[test]
        fn prop_account_id_range(id in -100i64..20_000) {
            let v = validator();
            let expected = (1..=10_000).contains(&id);
            prop_assert_eq!(v.validate_type("account_id", &json!(id)), Ok(expected));
        }

        #[test]
        fn prop_username_length(name in "[a-z]{0,12}") {
            let v = validator();
            let expected = (1..=8).contains(&name.chars().count());
            prop_assert_eq!(v.validate_type("username", &Value::String(name)), Ok(expected));
        }
    }
}
