//! Property tests for enumeration, synthesis and matching

use contractcheck_core::{
    ConstraintViolation, EnumerateOptions, ErrorEntry, ExpectedError, Synthesizer, ViolationKind,
    enumerate, load, match_errors, substitute_path,
};
use proptest::prelude::*;
use serde_json::{Map, Value, json};

fn expected_error() -> impl Strategy<Value = ExpectedError> {
    (
        prop::option::of("[a-z]{1,8}"),
        "[a-z]{1,6}( [a-z]{1,6}){0,3}",
        prop::option::of("[a-zA-Z]{3,12}"),
    )
        .prop_map(|(field, message, code)| {
            ExpectedError::new(field.as_deref().unwrap_or(""), &message, code.as_deref())
        })
}

proptest! {
    #[test]
    fn enumerated_paths_never_contain_braces(
        segments in prop::collection::vec(
            prop_oneof!["[a-z]{1,6}".prop_map(String::from), "[a-z]{1,6}".prop_map(|s| format!("{{{s}}}"))],
            1..6,
        ),
        sentinel in "[a-zA-Z0-9]{1,4}",
    ) {
        let template = format!("/{}", segments.join("/"));
        let doc = load(&json!({
            "paths": {template.clone(): {"get": {}, "delete": {}}},
            "components": {"schemas": {}}
        }))
        .unwrap();
        let options = EnumerateOptions {
            path_param_sentinel: sentinel,
            excluded_paths: Vec::new(),
            ..EnumerateOptions::default()
        };
        let endpoints: Vec<_> = enumerate(&doc, &options).collect();
        prop_assert_eq!(endpoints.len(), 2);
        for endpoint in endpoints {
            prop_assert!(!endpoint.path.contains('{'), "path contains an opening brace");
            prop_assert!(!endpoint.path.contains('}'), "path contains a closing brace");
        }
    }

    #[test]
    fn substitution_removes_unbalanced_braces(template in "[a-z/{}]{0,24}") {
        prop_assert!(!substitute_path(&template, "1").contains('{'), "substituted path contains a brace");
    }

    #[test]
    fn missing_required_strips_exactly_one_field(
        names in prop::collection::btree_set("[a-z]{1,8}", 1..6),
        required_mask in prop::collection::vec(any::<bool>(), 6),
    ) {
        let names: Vec<String> = names.into_iter().collect();
        let required: Vec<&String> = names
            .iter()
            .zip(&required_mask)
            .filter(|(_, r)| **r)
            .map(|(n, _)| n)
            .collect();
        prop_assume!(!required.is_empty());

        let properties: Map<String, Value> = names
            .iter()
            .map(|n| (n.clone(), json!({"type": "string", "maxLength": 5})))
            .collect();
        let doc = load(&json!({"components": {"schemas": {"Thing": {
            "type": "object",
            "required": required,
            "properties": properties,
        }}}}))
        .unwrap();

        let out = Synthesizer::new(&doc)
            .synthesize("Thing", ViolationKind::MissingRequired)
            .unwrap();
        let body = out.body.as_object().unwrap();
        prop_assert_eq!(body.len(), required.len() - 1);
        prop_assert!(!body.contains_key(required[0].as_str()));
        for name in &required[1..] {
            prop_assert_eq!(&body[name.as_str()], &json!("aaaa"));
        }
    }

    #[test]
    fn above_max_length_is_exactly_one_over(max_length in 0_u64..=2_000) {
        let doc = load(&json!({"components": {"schemas": {"Thing": {
            "type": "object",
            "properties": {"name": {"type": "string", "maxLength": max_length}},
        }}}}))
        .unwrap();
        let out = Synthesizer::new(&doc)
            .synthesize("Thing", ViolationKind::AboveMaxLength)
            .unwrap();
        let sent = out.body["name"].as_str().unwrap().len() as u64;
        prop_assert_eq!(sent, max_length + 1);
        let is_above = matches!(
            out.violation,
            ConstraintViolation::AboveMaxLength { max_length: n, .. } if n == max_length
        );
        prop_assert!(is_above);
    }

    #[test]
    fn matcher_is_reflexive(expected in prop::collection::vec(expected_error(), 0..6)) {
        let actual: Vec<ErrorEntry> = expected.iter().map(ErrorEntry::from).collect();
        prop_assert!(match_errors(&actual, &expected).all_expected_present);
    }

    #[test]
    fn matcher_ignores_order(
        expected in prop::collection::vec(expected_error(), 0..6),
        drop in any::<prop::sample::Index>(),
        rotate in 0_usize..6,
    ) {
        let mut actual: Vec<ErrorEntry> = expected.iter().map(ErrorEntry::from).collect();
        if !actual.is_empty() {
            actual.remove(drop.index(actual.len()));
        }
        let forward = match_errors(&actual, &expected);

        let mut shuffled_actual = actual.clone();
        let mut shuffled_expected = expected.clone();
        if !shuffled_actual.is_empty() {
            let n = rotate % shuffled_actual.len();
            shuffled_actual.rotate_left(n);
        }
        shuffled_expected.reverse();
        let backward = match_errors(&shuffled_actual, &shuffled_expected);

        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn matcher_tolerates_supersets(
        expected in prop::collection::vec(expected_error(), 0..5),
        extra in prop::collection::vec("[A-Z][a-z ]{0,20}", 0..4),
    ) {
        let mut actual: Vec<ErrorEntry> = expected.iter().map(ErrorEntry::from).collect();
        actual.extend(extra.into_iter().map(|title| ErrorEntry {
            code: None,
            title: Some(title),
            description: None,
        }));
        prop_assert!(match_errors(&actual, &expected).all_expected_present);
    }
}
