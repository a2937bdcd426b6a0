use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use arbor_bt::{
    Action, Condition, Node, NodeCategory, NodeId, NodeKind, NodeMeta, NodeRegistry, NodeResult,
    NodeStats, Parallel, PrioritySelector, RandomSelector, ResetMode, Sequence, Tree, TreeConfig,
    TreeError, Wait,
};
use arbor_core::DeterministicRng;
use arbor_tools::{TraceLog, TRACE_LOG};

fn manual_tree() -> Tree {
    Tree::with_config(TreeConfig::default().with_restart_when_idle(false))
}

fn counting(key: &'static str, result: NodeResult) -> Action {
    Action::new(move |_, bb| {
        let n = bb.get_value(key, 0u32);
        bb.set_value(key, n + 1);
        result
    })
}

fn scripted(results: &[NodeResult]) -> Action {
    let mut queue: VecDeque<NodeResult> = results.iter().copied().collect();
    let last = results.last().copied().unwrap_or(NodeResult::Failed);
    Action::new(move |_, _| queue.pop_front().unwrap_or(last))
}

fn wait_elapsed(tree: &Tree, id: NodeId) -> f32 {
    match tree.node(id) {
        Some(Node::Wait(w)) => w.elapsed(),
        other => panic!("expected a wait node, got {other:?}"),
    }
}

#[test]
fn paused_tree_does_not_advance() {
    let mut tree = manual_tree();
    let wait = tree.add_node(Wait::new(5.0)).unwrap();

    tree.update(1.0);
    let stats_before = tree.stats(wait).unwrap();

    tree.pause();
    assert!(tree.is_paused());
    for _ in 0..100 {
        tree.update(1.0);
    }
    assert_eq!(wait_elapsed(&tree, wait), 1.0);
    assert_eq!(tree.tick_count(), 1);
    assert_eq!(tree.node_result(0), Ok(NodeResult::Running));
    assert_eq!(tree.stats(wait), Some(stats_before));

    tree.pause();
    tree.resume();
    tree.resume();
    assert!(!tree.is_paused());
    tree.update(1.0);
    assert_eq!(wait_elapsed(&tree, wait), 2.0);
}

#[test]
fn update_without_top_level_nodes_is_a_no_op() {
    let mut tree = Tree::new();
    tree.insert(Wait::new(1.0));
    tree.update(0.1);
    assert_eq!(tree.tick_count(), 0);
    assert_eq!(tree.root_count(), 0);
}

#[test]
fn top_level_nodes_run_in_insertion_order() {
    let mut tree = manual_tree();
    for name in ["first", "second", "third"] {
        tree.add_node(Action::new(move |_, bb| {
            let mut order: Vec<&'static str> = bb.get_value("order", Vec::new());
            order.push(name);
            bb.set_value("order", order);
            NodeResult::Succeeded
        }))
        .unwrap();
    }

    tree.update(0.1);
    let order: Vec<&'static str> = tree.blackboard().get_value("order", Vec::new());
    assert_eq!(order, vec!["first", "second", "third"]);
    assert_eq!(tree.roots().len(), 3);
}

#[test]
fn wiring_errors_are_reported() {
    let mut tree = manual_tree();
    let leaf = tree.insert(Wait::new(1.0));
    tree.add_root(leaf).unwrap();
    assert_eq!(tree.add_root(leaf), Err(TreeError::DuplicateRoot(leaf)));

    let mut other = manual_tree();
    for _ in 0..3 {
        other.insert(Wait::new(1.0));
    }
    let foreign = other.insert(Wait::new(1.0));
    assert_eq!(tree.add_root(foreign), Err(TreeError::UnknownNode(foreign)));
    assert_eq!(tree.run_node(foreign, 0.1), Err(TreeError::UnknownNode(foreign)));

    assert_eq!(
        tree.reset_node(3),
        Err(TreeError::NodeIndexOutOfRange { index: 3, len: 1 })
    );
    assert_eq!(
        tree.node_result(1),
        Err(TreeError::NodeIndexOutOfRange { index: 1, len: 1 })
    );

    tree.update(0.1);
    assert_eq!(tree.add_node(Wait::new(1.0)).err(), Some(TreeError::AlreadyStarted));
    assert_eq!(tree.add_root(leaf), Err(TreeError::AlreadyStarted));
}

#[test]
fn error_messages_describe_the_problem() {
    let err = TreeError::NodeIndexOutOfRange { index: 4, len: 2 };
    assert_eq!(
        err.to_string(),
        "top-level node index 4 out of range (tree has 2 top-level nodes)"
    );
    assert_eq!(
        TreeError::AlreadyStarted.to_string(),
        "cannot add top-level nodes after the tree has started ticking"
    );
}

#[test]
fn result_changes_are_reported_once_per_transition() {
    let mut tree = manual_tree();
    tree.blackboard_mut().set(TRACE_LOG, TraceLog::default());
    let root = tree
        .add_node(scripted(&[
            NodeResult::Running,
            NodeResult::Running,
            NodeResult::Succeeded,
            NodeResult::Succeeded,
            NodeResult::Failed,
        ]))
        .unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    tree.on_node_result_changed(move |id, result| sink.borrow_mut().push((id, result)));

    for _ in 0..5 {
        tree.update(0.1);
    }

    assert_eq!(
        *seen.borrow(),
        vec![(root, NodeResult::Succeeded), (root, NodeResult::Failed)]
    );

    let log = tree.blackboard().get(TRACE_LOG).unwrap();
    let changes: Vec<(u64, u64, u64)> = log
        .with_tag("bt.result.changed")
        .map(|e| (e.tick, e.a, e.b))
        .collect();
    let index = root.index() as u64;
    assert_eq!(changes, vec![(3, index, 1), (5, index, 2)]);
}

#[test]
fn idle_tree_restarts_and_keeps_reporting_its_last_result() {
    let mut tree = Tree::new();
    let wait = tree.add_node(Wait::new(1.0)).unwrap();

    let seen = Rc::new(RefCell::new(0u32));
    let sink = Rc::clone(&seen);
    tree.on_node_result_changed(move |_, _| *sink.borrow_mut() += 1);

    for _ in 0..3 {
        tree.update(1.0);
        assert_eq!(tree.node_result(0), Ok(NodeResult::Succeeded));
        // Soft-reset after finishing, so the next tick waits again from zero.
        assert_eq!(wait_elapsed(&tree, wait), 0.0);
    }

    assert_eq!(*seen.borrow(), 1);
    assert_eq!(
        tree.stats(wait),
        Some(NodeStats {
            runs: 3,
            successes: 3,
            failures: 0,
            running: 0,
        })
    );
}

#[test]
fn tree_keeps_running_branch_when_something_is_running() {
    let mut tree = Tree::new();
    let slow = tree.add_node(Wait::new(3.0)).unwrap();
    tree.add_node(counting("hits", NodeResult::Succeeded)).unwrap();

    tree.update(1.0);
    tree.update(1.0);
    assert_eq!(wait_elapsed(&tree, slow), 2.0);
    assert_eq!(tree.blackboard().get_value("hits", 0u32), 2);
}

#[test]
fn only_full_reset_clears_statistics() {
    let mut tree = manual_tree();
    let wait = tree.add_node(Wait::new(5.0)).unwrap();
    tree.update(1.0);
    tree.update(1.0);

    tree.reset_all_nodes(ResetMode::Soft);
    assert_eq!(tree.stats(wait).map(|s| s.runs), Some(2));
    assert_eq!(wait_elapsed(&tree, wait), 0.0);

    tree.update(1.0);
    tree.reset_all_nodes(ResetMode::Partial);
    assert_eq!(tree.stats(wait).map(|s| s.runs), Some(3));

    tree.reset_all_nodes(ResetMode::Full);
    assert_eq!(tree.stats(wait), Some(NodeStats::default()));
}

#[test]
fn partial_reset_interrupts_running_branch_and_rewinds_finished_steps() {
    let mut tree = manual_tree();
    let done = tree.insert(Wait::new(1.0));
    let busy = tree.insert(Wait::new(5.0));
    let seq = tree.add_node(Sequence::new(vec![done, busy])).unwrap();

    tree.update(1.0);
    assert_eq!(wait_elapsed(&tree, busy), 1.0);

    tree.reset_all_nodes(ResetMode::Partial);
    assert_eq!(wait_elapsed(&tree, busy), 0.0);
    assert_eq!(wait_elapsed(&tree, done), 0.0);
    let Some(Node::Wait(w)) = tree.node(done) else {
        panic!("expected a wait");
    };
    assert!(!w.is_completed(), "finished step runs again");
    assert_eq!(tree.stats(done).map(|s| s.runs), Some(1), "stats survive");

    tree.update(0.5);
    assert_eq!(wait_elapsed(&tree, done), 0.5);
    assert_eq!(wait_elapsed(&tree, busy), 0.0);
    let Some(Node::Sequence(s)) = tree.node(seq) else {
        panic!("expected a sequence");
    };
    assert_eq!(s.cursor(), 0);
}

#[test]
fn reset_node_restarts_one_top_level_node() {
    let mut tree = manual_tree();
    let a = tree.add_node(Wait::new(5.0)).unwrap();
    let b = tree.add_node(Wait::new(5.0)).unwrap();
    tree.update(1.0);

    tree.reset_node(1).unwrap();
    assert_eq!(wait_elapsed(&tree, a), 1.0);
    assert_eq!(wait_elapsed(&tree, b), 0.0);
    assert_eq!(tree.stats(b), Some(NodeStats::default()));
    assert_eq!(tree.node_result(1), Ok(NodeResult::Running));
}

#[test]
fn active_path_follows_running_branch() {
    let mut tree = manual_tree();
    let threat = tree.insert_named(
        "threat",
        Condition::new(|_, bb| bb.get_value("threat", false)),
    );
    let walk = tree.insert_named("walk", Wait::new(10.0));
    let patrol = tree.insert_named("patrol", Sequence::new(vec![walk]));
    let root = tree.insert_named("root", PrioritySelector::new(vec![threat, patrol]));
    tree.add_root(root).unwrap();

    assert!(tree.active_path().is_empty(), "nothing has run yet");

    tree.update(1.0);
    assert_eq!(
        tree.active_path(),
        vec!["PrioritySelector(root)/Sequence(patrol)/Wait(walk)".to_string()]
    );
    assert_eq!(tree.label(walk), Some("walk"));

    tree.blackboard_mut().set_value("threat", true);
    tree.update(1.0);
    assert!(tree.active_path().is_empty());
}

#[test]
fn active_path_lists_every_parallel_branch() {
    let mut tree = manual_tree();
    let a = tree.insert_named("a", Wait::new(5.0));
    let b = tree.insert(Wait::new(5.0));
    tree.add_node(Parallel::require_all(vec![a, b])).unwrap();

    tree.update(1.0);
    assert_eq!(
        tree.active_path(),
        vec!["Parallel/Wait(a)".to_string(), "Parallel/Wait".to_string()]
    );
}

#[test]
fn self_referencing_node_fails_instead_of_recursing() {
    let mut tree = manual_tree();
    let seq = tree.add_node(Sequence::new(Vec::new())).unwrap();
    *tree.node_mut(seq).unwrap() = Node::Sequence(Sequence::new(vec![seq]));

    tree.update(0.1);
    assert_eq!(tree.node_result(0), Ok(NodeResult::Failed));
}

#[test]
fn find_nodes_scans_whole_arena() {
    let mut tree = manual_tree();
    let a = tree.insert(Wait::new(1.0));
    let b = tree.insert(Wait::new(2.0));
    let seq = tree.add_node(Sequence::new(vec![a, b])).unwrap();

    assert_eq!(tree.find_nodes_of_kind("Wait"), vec![a, b]);
    assert_eq!(tree.find_nodes_of_kind("Sequence"), vec![seq]);
    assert!(tree.find_nodes_of_kind("Teleport").is_empty());
    assert_eq!(tree.find_nodes(Node::is_composite), vec![seq]);
    assert_eq!(tree.find_nodes(|n| n.is_resettable()).len(), 3);
}

#[test]
fn builtin_registry_describes_every_kind() {
    let registry = NodeRegistry::builtin();
    assert_eq!(registry.len(), NodeKind::ALL.len());

    for kind in NodeKind::ALL {
        let meta = registry.meta(kind).expect("builtin kind is registered");
        assert_eq!(meta.name, kind.name());
        assert_eq!(registry.resolve(kind.name()), Some(kind));
    }

    let wait = registry.get("Wait").unwrap();
    assert_eq!(wait.category, NodeCategory::Leaf);
    assert!(wait.resettable && wait.preparable && !wait.composite);

    let timeout = registry.get("Timeout").unwrap();
    assert_eq!(timeout.category, NodeCategory::Decorator);
    assert!(timeout.composite);

    let condition = registry.get("Condition").unwrap();
    assert!(!condition.resettable && !condition.preparable);

    assert_eq!(registry.resolve("wait"), None, "names are case-sensitive");
}

#[test]
fn registry_entries_can_be_replaced() {
    let mut registry = NodeRegistry::new();
    assert!(registry.is_empty());

    registry.register(NodeMeta::for_kind(NodeKind::Parallel, "first"));
    registry.register(NodeMeta::for_kind(NodeKind::Parallel, "second"));
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.get("Parallel").map(|m| m.summary), Some("second"));
}

#[test]
fn same_seed_reproduces_random_choices() {
    fn picks(seed: u64) -> Vec<u32> {
        let mut tree = Tree::with_config(TreeConfig::default().with_seed(seed));
        let children = (0..4u32)
            .map(|i| {
                tree.insert(Action::new(move |_, bb| {
                    let mut picks: Vec<u32> = bb.get_value("picks", Vec::new());
                    picks.push(i);
                    bb.set_value("picks", picks);
                    NodeResult::Succeeded
                }))
            })
            .collect();
        tree.add_node(RandomSelector::new(children)).unwrap();
        for _ in 0..64 {
            tree.update(0.1);
        }
        tree.blackboard().get_value("picks", Vec::new())
    }

    assert_eq!(picks(5), picks(5));
    assert_ne!(picks(5), picks(6));
}

#[derive(Debug)]
struct AlwaysLast;

impl DeterministicRng for AlwaysLast {
    fn next_u64(&mut self) -> u64 {
        u64::MAX
    }
}

#[test]
fn injected_rng_drives_selection() {
    let mut tree = manual_tree().with_rng(AlwaysLast);
    let a = tree.insert(counting("a", NodeResult::Succeeded));
    let b = tree.insert(counting("b", NodeResult::Succeeded));
    let c = tree.insert(counting("c", NodeResult::Succeeded));
    tree.add_node(RandomSelector::new(vec![a, b, c])).unwrap();

    for _ in 0..10 {
        tree.update(0.1);
    }
    assert_eq!(tree.blackboard().get_value("a", 0u32), 0);
    assert_eq!(tree.blackboard().get_value("c", 0u32), 10);
}

#[test]
fn per_agent_configs_get_distinct_seeds() {
    let a = TreeConfig::for_agent(1234, 1);
    let b = TreeConfig::for_agent(1234, 2);
    assert_ne!(a.seed, b.seed);
    assert_eq!(a, TreeConfig::for_agent(1234, 1));
    assert!(a.restart_when_idle);
    assert_eq!(a.initial_capacity, TreeConfig::default().initial_capacity);
}
