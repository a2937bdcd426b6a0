#![cfg(feature = "serde")]

use arbor_bt::{
    NodeResult, RepeatMode, ResetMode, Tree, TreeConfig, Wait, WaitData, WaitResetMode,
    WeightedChild, WeightedSelectorData,
};

#[test]
fn tree_config_json_roundtrip() {
    let config = TreeConfig::for_agent(7, 3).with_restart_when_idle(false);
    let json = serde_json::to_string(&config).expect("serialize");
    let roundtrip: TreeConfig = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(roundtrip, config);
}

#[test]
fn missing_config_fields_take_defaults() {
    let config: TreeConfig = serde_json::from_str(r#"{ "seed": 9 }"#).expect("deserialize");
    assert_eq!(config, TreeConfig::default().with_seed(9));
}

#[test]
fn enums_serialize_by_variant_name() {
    assert_eq!(serde_json::to_string(&NodeResult::Running).unwrap(), r#""Running""#);
    assert_eq!(serde_json::to_string(&ResetMode::Partial).unwrap(), r#""Partial""#);
    assert_eq!(
        serde_json::to_string(&RepeatMode::CountLimited(3)).unwrap(),
        r#"{"CountLimited":3}"#
    );
}

#[test]
fn node_data_loaded_from_json_drives_a_node() {
    let data: WaitData =
        serde_json::from_str(r#"{ "duration": 0.5, "reset_mode": "Once" }"#).expect("deserialize");
    assert_eq!(data.reset_mode, WaitResetMode::Once);

    let mut tree = Tree::with_config(TreeConfig::default().with_restart_when_idle(false));
    tree.add_node(Wait::new(10.0).with_data_key("wait")).unwrap();
    tree.blackboard_mut().set_value("wait", data);
    tree.update(0.5);
    assert_eq!(tree.node_result(0), Ok(NodeResult::Succeeded));
}

#[test]
fn weighted_data_json_roundtrip() {
    let mut tree = Tree::new();
    let a = tree.insert(Wait::new(1.0));
    let data = WeightedSelectorData {
        children: vec![WeightedChild::new(a, 2.5)],
    };
    let json = serde_json::to_string(&data).expect("serialize");
    let roundtrip: WeightedSelectorData = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(roundtrip, data);
}
