use proptest::prelude::*;
use trajex_merge::{MergeEngine, MergeError, MergeOptions};
use trajex_test_utils::{assert_length_invariant, create_explored_trajectory, ints};

proptest! {
    #[test]
    fn prop_merge_appends_every_run(
        xs in prop::collection::vec(-20i64..20, 1..15),
        ys in prop::collection::vec(-20i64..20, 1..15),
    ) {
        let mut a = create_explored_trajectory("a", &xs);
        let b = create_explored_trajectory("b", &ys);
        let outcome = MergeEngine::default().merge(&mut a, &b).unwrap();

        prop_assert_eq!(outcome.merged_runs, ys.len());
        prop_assert_eq!(a.len(), xs.len() + ys.len());
        let mut expected = xs.clone();
        expected.extend(&ys);
        prop_assert_eq!(&a.explored_values()["parameters.x"], &ints(&expected));
        assert_length_invariant(&a);
    }

    #[test]
    fn prop_dedup_drops_exactly_the_known_points(
        xs in prop::collection::vec(-10i64..10, 1..15),
        ys in prop::collection::vec(-10i64..10, 1..15),
    ) {
        let mut a = create_explored_trajectory("a", &xs);
        let b = create_explored_trajectory("b", &ys);
        let fresh: Vec<i64> = ys.iter().copied().filter(|y| !xs.contains(y)).collect();
        let engine = MergeEngine::new(MergeOptions::default().with_remove_duplicates(true));

        match engine.merge(&mut a, &b) {
            Ok(outcome) => {
                prop_assert_eq!(outcome.merged_runs, fresh.len());
                prop_assert_eq!(outcome.duplicate_runs.len(), ys.len() - fresh.len());
                prop_assert_eq!(a.len(), xs.len() + fresh.len());
                assert_length_invariant(&a);
            }
            Err(MergeError::NothingToMerge { .. }) => {
                prop_assert!(fresh.is_empty());
                prop_assert_eq!(a.len(), xs.len());
            }
            Err(e) => prop_assert!(false, "unexpected error: {}", e),
        }
    }
}
