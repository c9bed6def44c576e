//! Property-based tests for ordering, diff, and aggregation invariants.

use std::collections::{BTreeSet, HashMap};

use proptest::prelude::*;

use reconcile::{
    ChangeType, DependencyResolver, Error, ExecutionResult, ExecutionStatus, OperationStatus,
    Resource, ResourceKind, ResourceResult, State, diff,
};

/// Generates an acyclic pipeline: node `i` may only read outputs of nodes `< i`.
fn arb_dag() -> impl Strategy<Value = Vec<Resource>> {
    (1usize..12).prop_flat_map(|n| {
        prop::collection::vec(prop::collection::vec(any::<prop::sample::Index>(), 0..3), n)
            .prop_map(move |picks| {
                picks
                    .into_iter()
                    .enumerate()
                    .map(|(i, idx)| {
                        let inputs: Vec<String> = if i == 0 {
                            Vec::new()
                        } else {
                            idx.iter().map(|ix| format!("out_{}", ix.index(i))).collect()
                        };
                        Resource::recipe(format!("node_{i:02}"), inputs, vec![format!("out_{i}")])
                    })
                    .collect::<Vec<_>>()
            })
    })
}

/// Same pipeline, declared in a random order.
fn arb_shuffled_dag() -> impl Strategy<Value = (Vec<Resource>, Vec<Resource>)> {
    arb_dag().prop_flat_map(|dag| (Just(dag.clone()), Just(dag).prop_shuffle()))
}

/// Edges as (producer, consumer) name pairs.
fn edges(resources: &[Resource]) -> Vec<(String, String)> {
    let producers: HashMap<&str, &str> = resources
        .iter()
        .filter_map(Resource::as_recipe)
        .flat_map(|r| r.outputs.iter().map(move |o| (o.as_str(), r.name.as_str())))
        .collect();

    resources
        .iter()
        .filter_map(Resource::as_recipe)
        .flat_map(|r| {
            r.inputs
                .iter()
                .filter_map(|i| producers.get(i.as_str()))
                .filter(|p| **p != r.name)
                .map(|p| (p.to_string(), r.name.clone()))
                .collect::<Vec<_>>()
        })
        .collect()
}

fn arb_names() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set("[a-e][0-3]", 0..8)
}

fn arb_state() -> impl Strategy<Value = State> {
    (arb_names(), arb_names(), arb_names()).prop_map(|(ds, rc, sc)| {
        let mut state = State::new();
        for n in ds {
            state.insert(ResourceKind::Dataset, n, None);
        }
        for n in rc {
            state.insert(ResourceKind::Recipe, n, None);
        }
        for n in sc {
            state.insert(ResourceKind::Scenario, n, None);
        }
        state
    })
}

fn arb_status() -> impl Strategy<Value = OperationStatus> {
    prop::sample::select(vec![
        OperationStatus::Success,
        OperationStatus::Failed,
        OperationStatus::Cancelled,
        OperationStatus::Partial,
        OperationStatus::Skipped,
    ])
}

proptest! {
    #[test]
    fn resolve_is_a_topological_permutation(dag in arb_dag()) {
        let order = DependencyResolver::new().resolve(&dag).unwrap();

        let mut sorted = order.clone();
        sorted.sort();
        let mut names: Vec<String> = dag.iter().map(|r| r.name().to_string()).collect();
        names.sort();
        prop_assert_eq!(sorted, names);

        let index: HashMap<&str, usize> =
            order.iter().enumerate().map(|(i, n)| (n.as_str(), i)).collect();
        for (producer, consumer) in edges(&dag) {
            prop_assert!(index[producer.as_str()] < index[consumer.as_str()]);
        }
    }

    #[test]
    fn resolve_is_deterministic((dag, shuffled) in arb_shuffled_dag()) {
        let resolver = DependencyResolver::new();
        prop_assert_eq!(resolver.resolve(&dag).unwrap(), resolver.resolve(&shuffled).unwrap());
        prop_assert_eq!(
            resolver.execution_groups(&dag).unwrap(),
            resolver.execution_groups(&shuffled).unwrap()
        );
    }

    #[test]
    fn groups_partition_and_respect_edges(dag in arb_dag()) {
        let groups = DependencyResolver::new().execution_groups(&dag).unwrap();

        let flat: Vec<String> = groups.iter().flatten().cloned().collect();
        let unique: BTreeSet<&String> = flat.iter().collect();
        prop_assert_eq!(unique.len(), dag.len());

        let level: HashMap<&str, usize> = groups
            .iter()
            .enumerate()
            .flat_map(|(l, g)| g.iter().map(move |n| (n.as_str(), l)))
            .collect();
        for (producer, consumer) in edges(&dag) {
            prop_assert!(level[producer.as_str()] < level[consumer.as_str()]);
        }

        for group in &groups {
            let mut sorted = group.clone();
            sorted.sort();
            prop_assert_eq!(&sorted, group);
        }
    }

    #[test]
    fn closing_a_cycle_always_fails(dag in arb_dag()) {
        // Make node_00 read the last node's output, closing a loop through
        // every node on a path between them.
        let last = dag.len() - 1;
        prop_assume!(last > 0);
        let mut cyclic = dag.clone();
        cyclic[0] = Resource::recipe("node_00", vec![format!("out_{last}")], vec!["out_0".to_string()]);

        match DependencyResolver::new().resolve(&cyclic) {
            Err(Error::CircularDependency { unresolved }) => {
                prop_assert!(unresolved.contains(&"node_00".to_string()));
                let last_name = format!("node_{last:02}");
                prop_assert!(unresolved.contains(&last_name));
            }
            other => {
                // node_00 -> ... -> last only exists if last depends on node_00
                let deps = DependencyResolver::new().dependencies(&format!("node_{last:02}"), &dag);
                prop_assert!(!deps.contains(&"node_00".to_string()), "unexpected {:?}", other);
            }
        }
    }

    #[test]
    fn diff_of_identical_states_is_all_updates(state in arb_state()) {
        let d = diff(&state, &state);
        for kind in ResourceKind::ALL {
            prop_assert!(d.create(kind).is_empty());
            prop_assert!(d.delete(kind).is_empty());
            prop_assert_eq!(d.update(kind), state.names(kind));
        }
    }

    #[test]
    fn diff_against_empty(state in arb_state()) {
        let empty = State::new();
        let create = diff(&empty, &state);
        let delete = diff(&state, &empty);
        for kind in ResourceKind::ALL {
            prop_assert_eq!(create.create(kind), state.names(kind));
            prop_assert!(create.update(kind).is_empty() && create.delete(kind).is_empty());
            prop_assert_eq!(delete.delete(kind), state.names(kind));
            prop_assert!(delete.update(kind).is_empty() && delete.create(kind).is_empty());
        }
    }

    #[test]
    fn diff_sets_are_disjoint_and_cover_both_sides(current in arb_state(), desired in arb_state()) {
        let d = diff(&current, &desired);
        for kind in ResourceKind::ALL {
            let kd = d.kind(kind);
            prop_assert!(kd.create.is_disjoint(&kd.update));
            prop_assert!(kd.create.is_disjoint(&kd.delete));
            prop_assert!(kd.update.is_disjoint(&kd.delete));

            let after: BTreeSet<String> = kd.create.union(&kd.update).cloned().collect();
            prop_assert_eq!(&after, desired.names(kind));
            let before: BTreeSet<String> = kd.delete.union(&kd.update).cloned().collect();
            prop_assert_eq!(&before, current.names(kind));
        }
        prop_assert_eq!(d.changes().len(), d.counts().total());
    }

    #[test]
    fn aggregate_status_follows_counts(statuses in prop::collection::vec(arb_status(), 0..20)) {
        let mut result = ExecutionResult::new();
        for (i, status) in statuses.iter().enumerate() {
            result.add_result(
                ResourceResult::success(ResourceKind::Recipe, format!("r{i}"), ChangeType::Create)
                    .with_status(*status),
            );
        }
        let status = result.finalize();

        let ok = result.success_count();
        let failed = result.failed_count();
        prop_assert!(ok + failed <= result.len());
        prop_assert_eq!(status == ExecutionStatus::Failed, ok == 0 && failed > 0);
        prop_assert_eq!(status == ExecutionStatus::Partial, ok > 0 && failed > 0);
        prop_assert_eq!(status == ExecutionStatus::Success, failed == 0);
    }
}
