//! Shared test fixtures.
//!
//! A small accounts schema used by this crate's tests and by the validator,
//! dispatcher and tracker crates.

use crate::registry::TypeRegistry;
use crate::SchemaError;
use std::sync::Arc;

/// Accounts schema in document form.
pub const ACCOUNTS_SCHEMA: &str = r#"{
    "types": [
        {"name": "account_id", "type": "i32",
         "validateSpec": [{"type": "range", "low": "1", "high": "10000"}]},
        {"name": "password", "type": "string",
         "validateSpec": [{"type": "regex", "pattern": "^[^ ]+$"}]},
        {"name": "username", "type": "string",
         "validateSpec": [{"type": "length", "low": "1", "high": "8"}]},
        {"name": "nickname", "type": "username",
         "validateSpec": [{"type": "regex", "pattern": "/^[a-z]+$/"}]},
        {"name": "display_name", "type": "string",
         "validateSpec": [{"type": "length", "low": 1, "high": 32}, {"type": "utf8"}]}
    ],
    "enums": [
        {"name": "Color", "values": {"RED": 1, "BLUE": 4}}
    ],
    "structs": [
        {"name": "account", "exception": false, "fields": [
            {"index": "1", "name": "id", "optional": false, "type": "account_id", "validateSpec": []},
            {"index": "2", "name": "allocation", "optional": false, "type": "i32", "validateSpec": []},
            {"index": "3", "name": "is_admin", "optional": true, "type": "bool", "validateSpec": []}
        ]},
        {"name": "genericCode", "exception": true, "fields": [
            {"index": "1", "name": "code", "optional": false, "type": "i16", "validateSpec": []},
            {"index": "2", "name": "message", "optional": false, "type": "string", "validateSpec": []}
        ]},
        {"name": "insufficientResources", "exception": true, "fields": [
            {"index": "1", "name": "code", "optional": false, "type": "i16", "validateSpec": []},
            {"index": "2", "name": "message", "optional": false, "type": "string", "validateSpec": []}
        ]}
    ],
    "services": [
        {"name": "Accounts", "methods": [
            {"name": "createAccount",
             "fields": [
                {"index": "1", "name": "username", "optional": false, "type": "username", "validateSpec": []},
                {"index": "2", "name": "password", "optional": false, "type": "password",
                 "validateSpec": [{"type": "length", "low": "1", "high": null}]},
                {"index": "3", "name": "is_admin", "optional": true, "type": "bool", "validateSpec": []}
             ],
             "exceptions": [
                {"index": "1", "name": "insufficient", "optional": false, "type": "insufficientResources", "validateSpec": []},
                {"index": "2", "name": "code", "optional": false, "type": "genericCode", "validateSpec": []}
             ],
             "returns": "account"},
            {"name": "getAccount",
             "fields": [
                {"index": "1", "name": "username", "optional": false, "type": "username", "validateSpec": []}
             ],
             "exceptions": [
                {"index": "1", "name": "code", "optional": false, "type": "genericCode", "validateSpec": []}
             ],
             "returns": "account"},
            {"name": "listAccounts",
             "fields": [
                {"index": 1, "name": "ids", "optional": true,
                 "type": {"type": "list", "valType": "account_id"}},
                {"index": 2, "name": "quotas", "optional": true,
                 "type": {"type": "map", "keyType": "account_id", "valType": "i32"}}
             ],
             "returns": {"type": "list", "valType": "account"}},
            {"name": "ping", "returns": "void"}
        ]}
    ]
}"#;

/// Load [`ACCOUNTS_SCHEMA`].
pub fn accounts_registry() -> Result<Arc<TypeRegistry>, SchemaError> {
    TypeRegistry::from_json_str(ACCOUNTS_SCHEMA).map(Arc::new)
}
