// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use proize_tasks::ReconcileOptions;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Flags given in the query string
#[derive(Debug, Default, Deserialize)]
pub struct FlagsQuery {
    #[serde(rename = "dryRun")]
    dry_run: Option<String>,
    confirm: Option<String>,
}

/// Only the string `"true"` and the boolean `true` are truthy. A non-empty
/// query value takes precedence over the body.
fn is_set(query: Option<&str>, body: Option<&Value>) -> bool {
    match query.filter(|value| !value.is_empty()) {
        Some(value) => value == "true",
        None => match body {
            Some(Value::Bool(value)) => *value,
            Some(Value::String(value)) => value == "true",
            _ => false,
        },
    }
}

/// Combine the flags of the query string with the ones of the request body.
///
/// A body which is empty or is not a JSON object is ignored.
pub fn parse(query: &FlagsQuery, body: &[u8]) -> ReconcileOptions {
    // Values are kept raw, as both strings and booleans are accepted
    let body: Map<String, Value> = serde_json::from_slice(body).unwrap_or_default();

    ReconcileOptions {
        dry_run: is_set(query.dry_run.as_deref(), body.get("dryRun")),
        confirm: is_set(query.confirm.as_deref(), body.get("confirm")),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn query(dry_run: Option<&str>, confirm: Option<&str>) -> FlagsQuery {
        FlagsQuery {
            dry_run: dry_run.map(ToOwned::to_owned),
            confirm: confirm.map(ToOwned::to_owned),
        }
    }

    #[test]
    fn test_truthiness() {
        assert!(is_set(Some("true"), None));
        assert!(is_set(None, Some(&json!(true))));
        assert!(is_set(None, Some(&json!("true"))));

        assert!(!is_set(None, None));
        assert!(!is_set(Some("1"), None));
        assert!(!is_set(Some("TRUE"), None));
        assert!(!is_set(Some("yes"), None));
        assert!(!is_set(None, Some(&json!(1))));
        assert!(!is_set(None, Some(&json!(false))));
        assert!(!is_set(None, Some(&json!("false"))));
        assert!(!is_set(None, Some(&Value::Null)));
    }

    #[test]
    fn test_query_wins_over_body() {
        assert!(!is_set(Some("false"), Some(&json!(true))));
        assert!(is_set(Some("true"), Some(&json!(false))));
        // An empty query value falls back to the body
        assert!(is_set(Some(""), Some(&json!(true))));
    }

    #[test]
    fn test_parse() {
        let options = parse(&FlagsQuery::default(), b"");
        assert!(!options.dry_run);
        assert!(!options.confirm);

        let options = parse(&FlagsQuery::default(), br#"{"dryRun": "true"}"#);
        assert!(options.dry_run);
        assert!(!options.confirm);

        let options = parse(&query(None, Some("true")), br#"{"dryRun": true}"#);
        assert!(options.dry_run);
        assert!(options.confirm);

        let options = parse(&query(Some("false"), None), br#"{"dryRun": true, "confirm": true}"#);
        assert!(!options.dry_run);
        assert!(options.confirm);

        // Garbage bodies are ignored
        let options = parse(&query(Some("true"), None), b"not json");
        assert!(options.dry_run);
        let options = parse(&FlagsQuery::default(), b"[true]");
        assert!(!options.dry_run);
    }

    #[test]
    fn test_parse_non_object_body() {
        // Positional values never map to the flags
        let options = parse(&FlagsQuery::default(), b"[false, true]");
        assert!(!options.dry_run);
        assert!(!options.confirm);

        let options = parse(&FlagsQuery::default(), b"true");
        assert!(!options.confirm);

        let options = parse(&FlagsQuery::default(), br#""confirm""#);
        assert!(!options.confirm);
    }
}
