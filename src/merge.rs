use std::collections::BTreeMap;

use crate::node::ConfigNode;

/// Deep-merge `overlay` on top of `base`.
/// If both sides hold a mapping, recurse key by key.
/// Otherwise `overlay` replaces `base` wholesale, sequences included.
pub fn deep_merge(base: ConfigNode, overlay: ConfigNode) -> ConfigNode {
    match (base, overlay) {
        (ConfigNode::Mapping(base), ConfigNode::Mapping(overlay)) => {
            ConfigNode::Mapping(merge_mappings(base, overlay))
        }
        (_, overlay) => overlay,
    }
}

fn merge_mappings(
    mut base: BTreeMap<String, ConfigNode>,
    overlay: BTreeMap<String, ConfigNode>,
) -> BTreeMap<String, ConfigNode> {
    for (key, overlay_val) in overlay {
        let merged = match base.remove(&key) {
            Some(base_val) => deep_merge(base_val, overlay_val),
            None => overlay_val,
        };
        base.insert(key, merged);
    }
    base
}
