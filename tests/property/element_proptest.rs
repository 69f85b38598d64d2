//! Property-based tests for element identifiers

use plenum::element::{element_id, Element, FullData};
use proptest::prelude::*;

proptest! {
    #[test]
    fn test_element_id_is_injective_per_collection(
        a in 0..10_000i64,
        b in 0..10_000i64,
    ) {
        let id_a = element_id("core/tag", a);
        let id_b = element_id("core/tag", b);
        prop_assert_eq!(id_a == id_b, a == b);
    }

    #[test]
    fn test_element_id_splits_back(id in 0..100_000i64) {
        let element = Element::deleted("core/motion", id);
        let element_id = element.element_id();
        let (collection, rest) = element_id.rsplit_once(':').unwrap();
        prop_assert_eq!(collection, "core/motion");
        prop_assert_eq!(rest.parse::<i64>().unwrap(), id);
    }

    #[test]
    fn test_serialization_roundtrip(id in 0..1000i64, name in "[a-zA-Z ]{0,20}") {
        let mut data = FullData::new();
        data.insert("id".to_string(), serde_json::json!(id));
        data.insert("name".to_string(), serde_json::json!(name));
        let element = Element::new("core/tag", id, data);

        let json = serde_json::to_string(&element).unwrap();
        let back: Element = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(element, back);
    }
}
