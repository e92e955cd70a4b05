use blueprint_deploy::node::parse_reference;
use blueprint_deploy::{dedup_bindings, BindResource};
use proptest::prelude::*;
use std::collections::HashSet;

fn bind_strategy() -> impl Strategy<Value = BindResource> {
    (0u8..4, 0u8..6, any::<bool>()).prop_map(|(kind, id, managed)| BindResource {
        resource_type: format!("kind{kind}"),
        id: format!("id{id}"),
        managed,
        manager: None,
    })
}

proptest! {
    #[test]
    fn dedup_keeps_one_bind_per_key(binds in prop::collection::vec(bind_strategy(), 0..40)) {
        let merged = dedup_bindings(binds.clone());

        let merged_keys: Vec<String> = merged.iter().map(BindResource::key).collect();
        let unique: HashSet<&String> = merged_keys.iter().collect();
        prop_assert_eq!(unique.len(), merged_keys.len());

        let mut first_seen = Vec::new();
        for bind in &binds {
            if !first_seen.contains(&bind.key()) {
                first_seen.push(bind.key());
            }
        }
        prop_assert_eq!(&merged_keys, &first_seen);

        for bind in &merged {
            let managed_anywhere = binds
                .iter()
                .any(|b| b.key() == bind.key() && b.managed);
            prop_assert_eq!(bind.managed, managed_anywhere);
        }
    }

    #[test]
    fn dotted_references_split_into_segments(
        keys in prop::collection::vec("[a-z][a-z0-9_]{0,8}", 1..6),
        index in 0usize..100,
    ) {
        let reference = format!("{}[{}]", keys.join("."), index);
        let segments = parse_reference(&reference).unwrap();

        let mut expected = keys.clone();
        expected.push(index.to_string());
        prop_assert_eq!(segments, expected);
    }
}
