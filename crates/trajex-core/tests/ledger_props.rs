use proptest::prelude::*;
use trajex_core::{RunLedger, RunNaming, RunRef};
use trajex_test_utils::{assert_length_invariant, create_explored_trajectory, ints};

proptest! {
    #[test]
    fn prop_index_name_bijection(len in 1usize..200, width in 1usize..12) {
        let mut ledger = RunLedger::new(RunNaming::new("run_", width, "run_ALL"));
        while ledger.len() < len {
            ledger.add_run();
        }
        for i in 0..len {
            let name = ledger.to_name(i).unwrap().to_string();
            prop_assert_eq!(ledger.to_index(&name).unwrap(), i);
            prop_assert_eq!(ledger.index_of(&RunRef::Name(name)).unwrap(), i);
        }
        prop_assert!(ledger.to_index("run_ALL").is_err());
    }

    #[test]
    fn prop_explore_then_expand_keeps_lengths(
        first in prop::collection::vec(-50i64..50, 1..20),
        second in prop::collection::vec(-50i64..50, 0..20),
    ) {
        let mut traj = create_explored_trajectory("props", &first);
        traj.expand([("x", ints(&second))]).unwrap();
        prop_assert_eq!(traj.len(), first.len() + second.len());
        assert_length_invariant(&traj);
    }
}
