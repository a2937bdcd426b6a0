//! A guard that patrols until it hears a noise, investigates for a while, and
//! gives up if the search takes too long.
//!
//! Run with `RUST_LOG=debug cargo run -p arbor-bt --example guard` to see the
//! engine's own logging.

use anyhow::{anyhow, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use arbor_bt::{
    Action, BlackboardWatcher, Condition, FailureHandler, NodeResult, PrioritySelector,
    RepeatMode, Repeater, Sequence, Timeout, Tree, TreeConfig, Wait, WatchMode,
};
use arbor_tools::{TraceLog, TRACE_LOG};

const NOISE: &str = "noise";
const STEPS: &str = "patrol.steps";

fn build(tree: &mut Tree) -> Result<()> {
    let heard = tree.insert_named("heard", Condition::new(|_, bb| bb.get_value(NOISE, false)));
    let search = tree.insert_named("search", Wait::new(3.0));
    let give_up = tree.insert_named(
        "give-up",
        Action::new(|_, bb| {
            bb.set_value(NOISE, false);
            NodeResult::Succeeded
        }),
    );
    let bounded = tree.insert_named("bounded", Timeout::new(search, 2.0));
    let recover = tree.insert_named("recover", FailureHandler::catch(bounded, give_up));
    let investigate = tree.insert_named("investigate", Sequence::new(vec![heard, recover]));

    let step = tree.insert_named(
        "step",
        Action::new(|ctx, bb| {
            let steps = bb.get_value(STEPS, 0u32) + 1;
            bb.set_value(STEPS, steps);
            info!(tick = ctx.tick, steps, "patrolling");
            NodeResult::Succeeded
        }),
    );
    let pause = tree.insert_named("pause", Wait::new(1.0));
    let walk = tree.insert_named("walk", Sequence::new(vec![step, pause]));
    let patrol = tree.insert_named("patrol", Repeater::new(walk, RepeatMode::Infinite));
    let alert = tree.insert_named(
        "alert",
        BlackboardWatcher::new::<bool>(patrol, NOISE, WatchMode::OnAnyChange),
    );

    let root = tree.insert_named("root", PrioritySelector::new(vec![investigate, alert]));
    tree.add_root(root)?;
    Ok(())
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).init();

    let mut tree = Tree::with_config(TreeConfig::for_agent(2024, 7));
    tree.blackboard_mut().set(TRACE_LOG, TraceLog::default());
    build(&mut tree)?;

    tree.on_node_result_changed(|id, result| info!(node = %id, ?result, "result changed"));

    for frame in 0..12u32 {
        if frame == 4 {
            tree.blackboard_mut().set_value(NOISE, true);
        }
        tree.update(0.5);
        info!(frame, path = ?tree.active_path(), "frame");
    }

    let log = tree
        .blackboard()
        .get(TRACE_LOG)
        .ok_or_else(|| anyhow!("trace log missing"))?;
    info!(
        events = log.events.len(),
        timeouts = log.with_tag("bt.timeout").count(),
        "done"
    );
    Ok(())
}
