/// Property-based tests using proptest
/// Tests invariants of environment resolution and branch identifier extraction
use kvk_proxy::aggregation::extract_vestigingsnummers;
use kvk_proxy::config::{kvk_base_urls, KvkEnvironment, KVK_PROD_ROOT, KVK_TEST_ROOT};
use proptest::prelude::*;
use serde_json::{json, Value};

fn branch_items(ids: &[String], camel_case: bool) -> Value {
    let key = if camel_case {
        "vestigingsNummer"
    } else {
        "vestigingsnummer"
    };
    Value::Array(ids.iter().map(|id| json!({ key: id })).collect())
}

// Property: environment selector resolution
proptest! {
    #[test]
    fn non_test_selectors_resolve_to_production(env in "\\PC*") {
        prop_assume!(!env.trim().eq_ignore_ascii_case("test"));
        prop_assert_eq!(KvkEnvironment::parse(&env), KvkEnvironment::Production);
        prop_assert!(kvk_base_urls(&env).zoeken.starts_with(KVK_PROD_ROOT));
        prop_assert!(!kvk_base_urls(&env).zoeken.starts_with(KVK_TEST_ROOT));
    }

    #[test]
    fn test_selector_any_case_and_padding(
        mask in proptest::collection::vec(proptest::bool::ANY, 4),
        left in "[ \t\n]{0,3}",
        right in "[ \t\n]{0,3}"
    ) {
        let word: String = "test"
            .chars()
            .zip(mask)
            .map(|(c, upper)| if upper { c.to_ascii_uppercase() } else { c })
            .collect();
        let env = format!("{}{}{}", left, word, right);
        prop_assert_eq!(KvkEnvironment::parse(&env), KvkEnvironment::Test);
        prop_assert_eq!(
            kvk_base_urls(&env).basisprofielen,
            format!("{}/v1/basisprofielen", KVK_TEST_ROOT)
        );
    }
}

// Property: identifier extraction is sorted, deduplicated and order-independent
proptest! {
    #[test]
    fn extraction_is_sorted_and_unique(ids in proptest::collection::vec("[0-9]{1,12}", 0..20)) {
        let payload = json!({ "vestigingen": branch_items(&ids, false) });
        let extracted = extract_vestigingsnummers(&payload);

        let mut expected = ids.clone();
        expected.sort();
        expected.dedup();
        prop_assert_eq!(extracted, expected);
    }

    #[test]
    fn extraction_ignores_order_and_location(
        ids in proptest::collection::vec("[0-9]{1,12}", 1..20),
        split in 0usize..20
    ) {
        let split = split.min(ids.len());
        let mut doubled = ids.clone();
        doubled.extend(ids.iter().cloned());
        let mut reversed = doubled.clone();
        reversed.reverse();

        let direct = json!({ "vestigingen": branch_items(&doubled, false) });
        let mixed = json!({
            "vestigingen": branch_items(&reversed[..split], true),
            "_embedded": {
                "vestigingen": branch_items(&reversed[split..], false),
                "links": "not a list"
            }
        });

        prop_assert_eq!(extract_vestigingsnummers(&direct), extract_vestigingsnummers(&mixed));
    }

    #[test]
    fn extraction_is_idempotent(ids in proptest::collection::vec("[0-9]{1,12}", 0..20)) {
        let once = extract_vestigingsnummers(&json!({ "vestigingen": branch_items(&ids, false) }));
        let twice = extract_vestigingsnummers(&json!({ "vestigingen": branch_items(&once, false) }));
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn extraction_never_panics_on_arbitrary_shapes(
        key in "\\PC{0,12}",
        text in "\\PC*",
        number in proptest::num::i64::ANY
    ) {
        let payloads = [
            json!({ key.clone(): text.clone() }),
            json!({ "vestigingen": text.clone() }),
            json!({ "vestigingen": number }),
            json!({ "_embedded": text.clone() }),
            json!({ "_embedded": { key.clone(): number } }),
            json!([text.clone(), number]),
            Value::String(text.clone()),
        ];
        for payload in payloads.iter() {
            let extracted = extract_vestigingsnummers(payload);
            prop_assert!(extracted.is_empty());
        }
    }
}
