//! Property tests over random mutation sequences.

use std::collections::HashSet;

use proptest::prelude::*;
use synapse_core::{
    sanitize, DocumentStore, Edge, GraphSnapshot, GroupColor, GroupData, Node, Position,
    ServiceData,
};

#[derive(Debug, Clone)]
enum Op {
    AddService,
    AddGroup,
    Remove(usize),
    Connect(usize, usize),
    Duplicate(usize),
    Front(usize),
    Back(usize),
    Undo,
    Redo,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::AddService),
        2 => Just(Op::AddGroup),
        2 => (0usize..16).prop_map(Op::Remove),
        3 => (0usize..16, 0usize..16).prop_map(|(a, b)| Op::Connect(a, b)),
        1 => (0usize..16).prop_map(Op::Duplicate),
        1 => (0usize..16).prop_map(Op::Front),
        1 => (0usize..16).prop_map(Op::Back),
        1 => Just(Op::Undo),
        1 => Just(Op::Redo),
    ]
}

fn pick(store: &DocumentStore, i: usize) -> Option<String> {
    let nodes = store.nodes();
    (!nodes.is_empty()).then(|| nodes[i % nodes.len()].id.clone())
}

fn run(store: &mut DocumentStore, ops: &[Op]) {
    let mut counter = 0;
    for op in ops {
        counter += 1;
        match op {
            Op::AddService => store.add_node(Node::service(
                format!("s{counter}"),
                Position::new(counter as f64, 0.0),
                ServiceData::new("svc", "Server"),
            )),
            Op::AddGroup => store.add_node(Node::group(
                format!("g{counter}"),
                Position::default(),
                GroupData::new("grp", GroupColor::Green),
            )),
            Op::Remove(i) => {
                if let Some(id) = pick(store, *i) {
                    store.remove_node(&id);
                }
            }
            Op::Connect(a, b) => {
                if let (Some(a), Some(b)) = (pick(store, *a), pick(store, *b)) {
                    store.connect(&a, &b, None, None);
                }
            }
            Op::Duplicate(i) => {
                if let Some(id) = pick(store, *i) {
                    store.duplicate_node(&id);
                }
            }
            Op::Front(i) => {
                if let Some(id) = pick(store, *i) {
                    store.bring_to_front(&id);
                }
            }
            Op::Back(i) => {
                if let Some(id) = pick(store, *i) {
                    store.send_to_back(&id);
                }
            }
            Op::Undo => {
                store.undo();
            }
            Op::Redo => {
                store.redo();
            }
        }
    }
}

proptest! {
    #[test]
    fn ids_stay_unique_and_edges_resolve(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let mut store = DocumentStore::new();
        run(&mut store, &ops);

        let ids: HashSet<&str> = store.nodes().iter().map(|n| n.id.as_str()).collect();
        prop_assert_eq!(ids.len(), store.nodes().len());
        for edge in store.edges() {
            prop_assert!(ids.contains(edge.source.as_str()));
            prop_assert!(ids.contains(edge.target.as_str()));
        }
    }

    #[test]
    fn adding_nodes_keeps_groups_behind_services(kinds in prop::collection::vec(any::<bool>(), 1..40)) {
        let mut store = DocumentStore::new();
        for (i, is_group) in kinds.iter().enumerate() {
            let node = if *is_group {
                Node::group(format!("n{i}"), Position::default(), GroupData::new("g", GroupColor::Cyan))
            } else {
                Node::service(format!("n{i}"), Position::default(), ServiceData::new("s", "Box"))
            };
            store.add_node(node);
        }
        let top_group = store.nodes().iter().filter(|n| n.is_group()).map(|n| n.z_order).max();
        let bottom_service = store.nodes().iter().filter(|n| !n.is_group()).map(|n| n.z_order).min();
        if let (Some(g), Some(s)) = (top_group, bottom_service) {
            prop_assert!(g < s);
        }
    }

    #[test]
    fn load_state_repairs_any_z_order(zs in prop::collection::vec((any::<bool>(), -50i64..50), 1..30)) {
        let nodes: Vec<Node> = zs
            .iter()
            .enumerate()
            .map(|(i, (is_group, z))| {
                let mut node = if *is_group {
                    Node::group(format!("n{i}"), Position::default(), GroupData::new("g", GroupColor::Cyan))
                } else {
                    Node::service(format!("n{i}"), Position::default(), ServiceData::new("s", "Box"))
                };
                node.z_order = *z;
                node
            })
            .collect();
        let edges = vec![Edge::new("e", "n0", "missing")];

        let mut store = DocumentStore::new();
        store.load_state(nodes.clone(), edges.clone(), None);
        let top_group = store.nodes().iter().filter(|n| n.is_group()).map(|n| n.z_order).max();
        let bottom_service = store.nodes().iter().filter(|n| !n.is_group()).map(|n| n.z_order).min();
        if let (Some(g), Some(s)) = (top_group, bottom_service) {
            prop_assert!(g < s);
        }
        prop_assert!(store.edges().is_empty());

        let once = store.graph_snapshot();
        prop_assert_eq!(&once, &sanitize(GraphSnapshot { nodes, edges }));
        prop_assert_eq!(sanitize(once.clone()), once);
    }

    #[test]
    fn undo_redo_is_an_inverse(ops in prop::collection::vec(op_strategy(), 1..30)) {
        let mut store = DocumentStore::new();
        run(&mut store, &ops);
        store.add_node(Node::service("last", Position::default(), ServiceData::new("s", "Box")));
        let after = store.graph_snapshot();
        prop_assert!(store.undo());
        prop_assert!(store.redo());
        prop_assert_eq!(store.graph_snapshot(), after);
        prop_assert!(!store.redo());
    }
}
