use pretty_assertions::assert_eq;
use trajex_core::prelude::*;
use trajex_core::Lookup;
use trajex_leaf::ErrorClass;
use trajex_test_utils::{add_run_results, create_explored_trajectory, create_trajectory, path};
use trajex_tree::ResolveOptions;

#[test]
fn test_shortcut_resolution() {
    let mut traj = create_trajectory("shortcuts");
    traj.parameters().add_leaf("a.b.c.d", Some(Value::Int(4))).unwrap();

    let id = traj.resolve("parameters.a.d").unwrap();
    assert_eq!(traj.node(id).unwrap().full_name(), &path("parameters.a.b.c.d"));
    assert_eq!(traj.value("d").unwrap(), &Value::Int(4));

    let exact = Lookup::new(ResolveOptions::exact());
    let err = traj.resolve_with("parameters.a.d", &exact).unwrap_err();
    assert_eq!(err.class(), ErrorClass::NotFound);
}

#[test]
fn test_max_depth_limits_hops() {
    let mut traj = create_trajectory("depth");
    traj.parameters().add_leaf("a.b.c.d", Some(Value::Int(4))).unwrap();

    let shallow = Lookup::new(ResolveOptions::default().with_max_depth(2));
    assert!(traj.resolve_with("a.d", &shallow).is_err());
    let deep = Lookup::new(ResolveOptions::default().with_max_depth(3));
    assert!(traj.resolve_with("a.d", &deep).is_ok());
}

#[test]
fn test_ambiguous_lookup_lists_candidates() {
    let mut traj = create_trajectory("ambiguous");
    traj.parameters().add_leaf("a.x.val", Some(Value::Int(1))).unwrap();
    traj.parameters().add_leaf("a.y.val", Some(Value::Int(2))).unwrap();

    match traj.resolve("a.val").unwrap_err() {
        TrajectoryError::Tree(trajex_tree::TreeError::AmbiguousPath { candidates, .. }) => {
            assert_eq!(
                candidates,
                vec!["parameters.a.x.val".to_string(), "parameters.a.y.val".to_string()]
            );
        }
        other => panic!("expected ambiguity, got {other}"),
    }
    assert_eq!(traj.value("a.x.val").unwrap(), &Value::Int(1));
}

#[test]
fn test_lookup_from_start_node() {
    let mut traj = create_trajectory("start");
    traj.parameters().add_leaf("a.val", Some(Value::Int(1))).unwrap();
    traj.results().add_leaf("a.val", Some(Value::Int(2))).unwrap();

    assert!(traj.resolve("val").is_err());
    let lookup = traj.lookup().from_node(path("results"));
    let id = traj.resolve_with("val", &lookup).unwrap();
    assert_eq!(traj.node(id).unwrap().full_name(), &path("results.a.val"));
}

#[test]
fn test_run_scoped_lookup() {
    let mut traj = create_explored_trajectory("scoped", &[1, 2, 3]);
    add_run_results(&mut traj, "z");

    // Without a selected run every branch is a candidate
    assert_eq!(traj.resolve("z").unwrap_err().class(), ErrorClass::AmbiguousPath);

    traj.set_cursor(Some(RunRef::Index(1))).unwrap();
    let id = traj.resolve("z").unwrap();
    assert_eq!(
        traj.node(id).unwrap().full_name(),
        &path("results.runs.run_00000001.z")
    );

    // Naming another run explicitly still reaches it
    assert_eq!(traj.value("run_00000002.z").unwrap(), &Value::Int(2));
}

#[test]
fn test_shared_branch_ambiguity() {
    let mut traj = create_explored_trajectory("shared", &[1, 2]);
    add_run_results(&mut traj, "z");
    traj.results()
        .add_leaf("runs.run_ALL.z", Some(Value::Int(-1)))
        .unwrap();

    traj.set_cursor(Some(RunRef::Index(0))).unwrap();
    assert_eq!(traj.resolve("z").unwrap_err().class(), ErrorClass::AmbiguousPath);

    let lookup = traj.lookup().excluding_shared();
    let id = traj.resolve_with("z", &lookup).unwrap();
    assert_eq!(
        traj.node(id).unwrap().full_name(),
        &path("results.runs.run_00000000.z")
    );

    traj.set_cursor(None).unwrap();
    assert_eq!(traj.value("run_ALL.z").unwrap(), &Value::Int(-1));
}

#[test]
fn test_lookup_through_links() {
    let mut traj = create_trajectory("links");
    traj.results().add_leaf("deep.inner.z", Some(Value::Int(3))).unwrap();
    traj.derived_parameters().add_group("view").unwrap();
    traj.add_link("derived_parameters.view", "zz", "results.deep.inner.z")
        .unwrap();

    assert_eq!(traj.value("view.zz").unwrap(), &Value::Int(3));
    assert_eq!(traj.value("zz").unwrap(), &Value::Int(3));

    let no_links = Lookup::new(ResolveOptions::default().without_links());
    assert!(traj.resolve_with("zz", &no_links).is_err());
}
