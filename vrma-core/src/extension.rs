//! `VRMC_vrm_animation` extension block and expression node assembly
//!
//! Expressions are sorted by name (ordinal) before placeholder nodes are
//! allocated, which is what keeps node numbering, channel order and the
//! extension content independent of how the caller's map iterates.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

use crate::artifact::SceneNode;
use crate::bone::HumanoidBone;
use crate::expression::{ExpressionKey, ExpressionPreset};

/// Extension name in `extensions` / `extensionsUsed`
pub const EXTENSION_NAME: &str = "VRMC_vrm_animation";

/// Extension schema version written to `specVersion`
pub const SPEC_VERSION: &str = "1.0";

/// Prefix of expression placeholder node names
pub const EXPRESSION_NODE_PREFIX: &str = "__expression_";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRef {
    pub node: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Humanoid {
    pub human_bones: BTreeMap<HumanoidBone, NodeRef>,
}

/// One slot per preset expression, indexed by [`ExpressionPreset::index`].
///
/// Serialized as a map containing only the filled slots.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PresetSlots([Option<NodeRef>; ExpressionPreset::COUNT]);

impl PresetSlots {
    pub fn get(&self, preset: ExpressionPreset) -> Option<NodeRef> {
        self.0[preset.index()]
    }

    pub fn set(&mut self, preset: ExpressionPreset, node: NodeRef) {
        self.0[preset.index()] = Some(node);
    }

    pub fn iter(&self) -> impl Iterator<Item = (ExpressionPreset, NodeRef)> + '_ {
        ExpressionPreset::ALL
            .iter()
            .filter_map(|&preset| self.get(preset).map(|node| (preset, node)))
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }
}

impl Serialize for PresetSlots {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (preset, node) in self.iter() {
            map.serialize_entry(preset.name(), &node)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PresetSlots {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SlotsVisitor;

        impl<'de> Visitor<'de> for SlotsVisitor {
            type Value = PresetSlots;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a map of preset expression names to node references")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<PresetSlots, A::Error> {
                let mut slots = PresetSlots::default();
                while let Some((preset, node)) = access.next_entry::<ExpressionPreset, NodeRef>()? {
                    slots.set(preset, node);
                }
                Ok(slots)
            }
        }

        deserializer.deserialize_map(SlotsVisitor)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Expressions {
    pub preset: PresetSlots,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<BTreeMap<String, NodeRef>>,
}

/// Root-level `VRMC_vrm_animation` block
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VrmAnimationExtension {
    pub spec_version: String,
    pub humanoid: Humanoid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expressions: Option<Expressions>,
}

impl VrmAnimationExtension {
    pub fn new(humanoid: Humanoid, expressions: Expressions) -> Self {
        Self {
            spec_version: SPEC_VERSION.to_string(),
            humanoid,
            expressions: Some(expressions),
        }
    }
}

/// An expression with its allocated placeholder node
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placeholder<'k> {
    pub key: &'k ExpressionKey,
    pub node: u32,
}

/// Sort expression keys by name and give each a node index starting at
/// `first_node`.
pub fn allocate_placeholders<'k>(
    keys: impl IntoIterator<Item = &'k ExpressionKey>,
    first_node: u32,
) -> Vec<Placeholder<'k>> {
    let mut keys: Vec<&ExpressionKey> = keys.into_iter().collect();
    keys.sort_by(|a, b| a.name().as_bytes().cmp(b.name().as_bytes()));

    keys.into_iter()
        .zip(first_node..)
        .map(|(key, node)| Placeholder { key, node })
        .collect()
}

/// Placeholder scene node carrying an expression's weight
pub fn placeholder_node(key: &ExpressionKey) -> SceneNode {
    SceneNode::new(format!("{}{}", EXPRESSION_NODE_PREFIX, key.name()))
}

/// Partition placeholders into preset slots and custom names.
///
/// `custom` is only present when at least one custom expression exists.
pub fn build_expressions(placeholders: &[Placeholder<'_>]) -> Expressions {
    let mut preset = PresetSlots::default();
    let mut custom = BTreeMap::new();

    for placeholder in placeholders {
        let node = NodeRef {
            node: placeholder.node,
        };
        match placeholder.key {
            ExpressionKey::Preset(p) => preset.set(*p, node),
            ExpressionKey::Custom(name) => {
                custom.insert(name.clone(), node);
            }
        }
    }

    Expressions {
        preset,
        custom: (!custom.is_empty()).then_some(custom),
    }
}

/// Expand weights into the translation-shaped values carried by the
/// placeholder channel: `(weight, 0, 0)`.
pub fn weights_as_translation(weights: &[f32]) -> Vec<[f32; 3]> {
    weights.iter().map(|&w| [w, 0.0, 0.0]).collect()
}
