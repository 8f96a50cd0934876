//! Property tests for paths and leaf ranges

use proptest::prelude::*;
use std::sync::Arc;
use trajex_leaf::{LeafEntity, NodePath, ParameterKind, Value};

fn segment() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,6}"
}

proptest! {
    #[test]
    fn prop_path_display_parse_roundtrip(segments in prop::collection::vec(segment(), 1..6)) {
        let path = NodePath::new(segments);
        let parsed: NodePath = path.to_string().parse().unwrap();
        prop_assert_eq!(parsed, path);
    }

    #[test]
    fn prop_explore_then_expand_concatenates(
        first in prop::collection::vec(any::<i64>(), 1..20),
        second in prop::collection::vec(any::<i64>(), 0..20),
    ) {
        let mut leaf = LeafEntity::new(Arc::new(ParameterKind));
        leaf.explore(first.iter().copied().map(Value::Int).collect()).unwrap();
        leaf.expand(second.iter().copied().map(Value::Int).collect()).unwrap();

        prop_assert_eq!(leaf.range().len(), first.len() + second.len());
        for (i, v) in first.iter().chain(second.iter()).enumerate() {
            leaf.set_access_index(i).unwrap();
            prop_assert_eq!(leaf.value(), Some(&Value::Int(*v)));
        }
    }
}
