//! glTF avatar host
//!
//! Loads a `.glb`/`.gltf` avatar and exposes it to the exporter as a
//! [`SkeletonProvider`] plus one [`ClipSource`] per animation.
//!
//! glTF is right-handed while the exporter expects poses in a left-handed
//! (X-mirrored) convention, so every world pose handed out is mirrored:
//! position `(-x, y, z)`, rotation `(x, -y, -z, w)`. The exporter's own
//! conversion mirrors back.

use anyhow::{Context, Result};
use glam::{Mat4, Quat, Vec3};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use vrma_core::{
    BoneHandle, ClipSource, CurveBinding, ExpressionKey, ExpressionMap, HumanoidBone, JointPose,
    PoseEvaluator, PoseSnapshot, SkeletonProvider, SkeletonSource,
};

use crate::animation::{AnimationClip, Transform, read_animation};
use crate::config::ExportConfig;

/// Root extension carrying the avatar's humanoid and expression tables
pub const VRM_EXTENSION: &str = "VRMC_vrm";

/// Name used when the designated root is the scene origin
pub const SCENE_ROOT_NAME: &str = "Root";

// ============================================================================
// VRMC_vrm subset
// ============================================================================

#[derive(Clone, Debug, Default, Deserialize)]
struct RawDocument {
    #[serde(default)]
    meshes: Vec<RawMesh>,
    #[serde(default)]
    extensions: RawExtensions,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct RawMesh {
    #[serde(default)]
    extras: Option<serde_json::Value>,
}

impl RawMesh {
    /// `extras.targetNames`, the de facto morph target naming convention
    fn target_names(&self) -> Vec<String> {
        self.extras
            .as_ref()
            .and_then(|extras| extras.get("targetNames"))
            .and_then(serde_json::Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .map(|name| name.as_str().unwrap_or_default().to_string())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
struct RawExtensions {
    #[serde(rename = "VRMC_vrm", default)]
    vrm: Option<VrmcVrm>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct VrmcVrm {
    #[serde(default)]
    humanoid: Option<VrmHumanoid>,
    #[serde(default)]
    expressions: Option<VrmExpressions>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VrmHumanoid {
    #[serde(default)]
    human_bones: BTreeMap<String, VrmNodeRef>,
}

#[derive(Clone, Copy, Debug, Deserialize)]
struct VrmNodeRef {
    node: usize,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct VrmExpressions {
    #[serde(default)]
    preset: BTreeMap<String, VrmExpression>,
    #[serde(default)]
    custom: BTreeMap<String, VrmExpression>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VrmExpression {
    #[serde(default)]
    morph_target_binds: Vec<MorphTargetBind>,
}

#[derive(Clone, Copy, Debug, Deserialize)]
struct MorphTargetBind {
    node: usize,
    index: usize,
}

// ============================================================================
// Scene
// ============================================================================

/// One glTF node
#[derive(Clone, Debug)]
pub struct NodeInfo {
    pub name: String,
    pub parent: Option<usize>,
    pub rest: Transform,
    pub mesh: Option<usize>,
}

/// Morph target naming of one mesh
#[derive(Clone, Debug)]
pub struct MeshInfo {
    pub name: String,
    /// One channel name per morph target
    pub channels: Vec<String>,
}

/// Where the humanoid bone assignment came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoneSource {
    Config,
    VrmExtension,
    NodeNames,
}

/// A loaded glTF avatar with its animations
#[derive(Clone, Debug)]
pub struct GltfScene {
    nodes: Vec<NodeInfo>,
    /// Node indices with parents before children
    order: Vec<usize>,
    meshes: Vec<MeshInfo>,
    clips: Vec<AnimationClip>,
    vrm: Option<VrmcVrm>,
}

impl GltfScene {
    /// Load a `.glb` or `.gltf` file
    pub fn load(path: &Path) -> Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read glTF: {:?}", path))?;
        let (document, buffers, _images) =
            gltf::import(path).with_context(|| format!("Failed to load glTF: {:?}", path))?;
        Self::from_parts(&document, &buffers, &bytes)
    }

    /// Load from an in-memory `.glb` (or self-contained `.gltf`)
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let (document, buffers, _images) =
            gltf::import_slice(bytes).context("Failed to load glTF from memory")?;
        Self::from_parts(&document, &buffers, bytes)
    }

    fn from_parts(
        document: &gltf::Document,
        buffers: &[gltf::buffer::Data],
        bytes: &[u8],
    ) -> Result<Self> {
        let raw = parse_raw_document(bytes)?;

        let mut nodes: Vec<NodeInfo> = document
            .nodes()
            .map(|node| {
                let (t, r, s) = node.transform().decomposed();
                NodeInfo {
                    name: node
                        .name()
                        .map_or_else(|| format!("node{}", node.index()), str::to_string),
                    parent: None,
                    rest: Transform {
                        translation: Vec3::from(t),
                        rotation: Quat::from_array(r).normalize(),
                        scale: Vec3::from(s),
                    },
                    mesh: node.mesh().map(|mesh| mesh.index()),
                }
            })
            .collect();
        for node in document.nodes() {
            for child in node.children() {
                nodes[child.index()].parent = Some(node.index());
            }
        }
        let order = hierarchy_order(&nodes);

        let meshes = document
            .meshes()
            .map(|mesh| {
                let name = mesh
                    .name()
                    .map_or_else(|| format!("mesh{}", mesh.index()), str::to_string);
                let targets = mesh
                    .primitives()
                    .next()
                    .map_or(0, |primitive| primitive.morph_targets().count());
                let names = raw
                    .meshes
                    .get(mesh.index())
                    .map(RawMesh::target_names)
                    .unwrap_or_default();
                let channels = (0..targets)
                    .map(|i| match names.get(i) {
                        Some(target) if !target.is_empty() => target.clone(),
                        _ => format!("{}.{}", name, i),
                    })
                    .collect();
                MeshInfo { name, channels }
            })
            .collect();

        let clips = document
            .animations()
            .map(|animation| read_animation(&animation, buffers))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            "Loaded glTF: {} nodes, {} meshes, {} animations, VRMC_vrm {}",
            nodes.len(),
            document.meshes().count(),
            clips.len(),
            if raw.extensions.vrm.is_some() { "present" } else { "absent" }
        );

        Ok(Self {
            nodes,
            order,
            meshes,
            clips,
            vrm: raw.extensions.vrm,
        })
    }

    pub fn nodes(&self) -> &[NodeInfo] {
        &self.nodes
    }

    pub fn meshes(&self) -> &[MeshInfo] {
        &self.meshes
    }

    pub fn clips(&self) -> &[AnimationClip] {
        &self.clips
    }

    pub fn has_vrm(&self) -> bool {
        self.vrm.is_some()
    }

    pub fn find_node(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.name == name)
    }

    /// Pick a clip by name or index; the first clip when `selector` is None
    pub fn select_clip(&self, selector: Option<&str>) -> Result<&AnimationClip> {
        let Some(selector) = selector else {
            return self.clips.first().context("No animations found in glTF file");
        };

        if let Some(clip) = self.clips.iter().find(|c| c.name.as_deref() == Some(selector)) {
            return Ok(clip);
        }
        if let Ok(index) = selector.parse::<usize>() {
            return self
                .clips
                .get(index)
                .with_context(|| format!("Animation index {} not found in glTF", index));
        }

        let available: Vec<_> = self.clips.iter().filter_map(|c| c.name.as_deref()).collect();
        anyhow::bail!(
            "Animation '{}' not found in glTF. Available animations: {:?}",
            selector,
            available
        )
    }

    /// Morph channel name of target `index` on `node`'s mesh
    pub fn morph_channel(&self, node: usize, index: usize) -> Option<&str> {
        let mesh = self.nodes.get(node)?.mesh?;
        self.meshes.get(mesh)?.channels.get(index).map(String::as_str)
    }

    /// Topmost ancestor of `node`, or None when `node` is itself top-level
    pub fn topmost_ancestor(&self, node: usize) -> Option<usize> {
        let mut current = self.nodes.get(node)?.parent?;
        while let Some(parent) = self.nodes[current].parent {
            current = parent;
        }
        Some(current)
    }

    /// Assign humanoid bones: config table, then `VRMC_vrm`, then node names
    pub fn assign_bones(
        &self,
        config: &ExportConfig,
    ) -> Result<(BTreeMap<HumanoidBone, usize>, BoneSource)> {
        let configured = config.humanoid_bones()?;
        if !configured.is_empty() {
            let mut bones = BTreeMap::new();
            for (bone, name) in configured {
                let node = self.find_node(name).with_context(|| {
                    format!("Node '{}' for humanoid bone '{}' not found in glTF", name, bone)
                })?;
                bones.insert(bone, node);
            }
            return Ok((bones, BoneSource::Config));
        }

        if let Some(humanoid) = self.vrm.as_ref().and_then(|vrm| vrm.humanoid.as_ref()) {
            let mut bones = BTreeMap::new();
            for (name, node_ref) in &humanoid.human_bones {
                let Some(bone) = HumanoidBone::from_name_ignore_case(name) else {
                    tracing::warn!("Unknown humanoid bone '{}' in {}, skipped", name, VRM_EXTENSION);
                    continue;
                };
                if node_ref.node >= self.nodes.len() {
                    tracing::warn!(
                        "Humanoid bone '{}' points at missing node {}, skipped",
                        bone,
                        node_ref.node
                    );
                    continue;
                }
                bones.insert(bone, node_ref.node);
            }
            return Ok((bones, BoneSource::VrmExtension));
        }

        let mut bones = BTreeMap::new();
        for (index, node) in self.nodes.iter().enumerate() {
            let Some(bone) = HumanoidBone::from_name_ignore_case(&node.name) else {
                continue;
            };
            if bones.contains_key(&bone) {
                tracing::warn!("Node '{}' matches already assigned bone {}, skipped", node.name, bone);
                continue;
            }
            bones.insert(bone, index);
        }
        Ok((bones, BoneSource::NodeNames))
    }

    /// Designated root: the configured node, else the topmost ancestor of
    /// the hips. None means the scene origin.
    pub fn designated_root(
        &self,
        config: &ExportConfig,
        bones: &BTreeMap<HumanoidBone, usize>,
    ) -> Result<Option<usize>> {
        if let Some(name) = &config.root {
            let node = self
                .find_node(name)
                .with_context(|| format!("Root node '{}' not found in glTF", name))?;
            return Ok(Some(node));
        }
        Ok(bones
            .get(&HumanoidBone::ROOT)
            .and_then(|&hips| self.topmost_ancestor(hips)))
    }

    /// Skeleton provider for this avatar
    pub fn avatar(&self, config: &ExportConfig) -> Result<GltfAvatar<'_>> {
        let (bones, source) = self.assign_bones(config)?;
        let root = self.designated_root(config, &bones)?;
        tracing::info!(
            "Humanoid: {} bones from {:?}, root '{}'",
            bones.len(),
            source,
            root.map_or(SCENE_ROOT_NAME, |r| self.nodes[r].name.as_str())
        );
        Ok(GltfAvatar {
            scene: self,
            bones,
            root,
            source,
        })
    }

    /// Expression map derived from `VRMC_vrm.expressions`.
    ///
    /// Each expression's first morph target bind names the channel; the
    /// first expression to claim a channel keeps it. None when the avatar
    /// binds no morph targets.
    pub fn vrm_expression_map(&self) -> Option<ExpressionMap> {
        let expressions = self.vrm.as_ref()?.expressions.as_ref()?;

        let entries = expressions
            .preset
            .iter()
            .map(|(name, expression)| (ExpressionKey::parse(name), expression))
            .chain(
                expressions
                    .custom
                    .iter()
                    .map(|(name, expression)| (ExpressionKey::custom(name.as_str()), expression)),
            );

        let mut map = ExpressionMap::new();
        for (key, expression) in entries {
            let Some(bind) = expression.morph_target_binds.first() else {
                continue;
            };
            let Some(channel) = self.morph_channel(bind.node, bind.index) else {
                tracing::warn!(
                    "Expression '{}' binds missing morph target {} on node {}",
                    key,
                    bind.index,
                    bind.node
                );
                continue;
            };
            map.entry(channel.to_string()).or_insert(key);
        }

        (!map.is_empty()).then_some(map)
    }

    fn rest_locals(&self) -> Vec<Transform> {
        self.nodes.iter().map(|node| node.rest).collect()
    }

    /// Mirrored world poses of every node for the given local transforms
    fn snapshot(&self, locals: &[Transform], root: Option<usize>) -> PoseSnapshot {
        let mut world = vec![Mat4::IDENTITY; self.nodes.len()];
        for &index in &self.order {
            let local = locals.get(index).unwrap_or(&Transform::IDENTITY).to_mat4();
            world[index] = match self.nodes[index].parent {
                Some(parent) => world[parent] * local,
                None => local,
            };
        }

        let joints: Vec<JointPose> = world.iter().map(mirrored_pose).collect();
        let root = root
            .and_then(|r| joints.get(r).copied())
            .unwrap_or(JointPose::IDENTITY);
        PoseSnapshot { root, joints }
    }

    /// Rest pose snapshot
    pub fn rest_pose(&self, root: Option<usize>) -> PoseSnapshot {
        self.snapshot(&self.rest_locals(), root)
    }
}

fn parse_raw_document(bytes: &[u8]) -> Result<RawDocument> {
    let json = if bytes.starts_with(b"glTF") {
        gltf::Glb::from_slice(bytes)
            .context("Failed to read GLB container")?
            .json
            .into_owned()
    } else {
        bytes.to_vec()
    };
    serde_json::from_slice(&json).context("Failed to parse glTF JSON")
}

/// Order nodes so that every parent precedes its children
fn hierarchy_order(nodes: &[NodeInfo]) -> Vec<usize> {
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (index, node) in nodes.iter().enumerate() {
        if let Some(parent) = node.parent {
            children[parent].push(index);
        }
    }

    let mut order = Vec::with_capacity(nodes.len());
    let mut stack: Vec<usize> = (0..nodes.len())
        .rev()
        .filter(|&i| nodes[i].parent.is_none())
        .collect();
    while let Some(index) = stack.pop() {
        order.push(index);
        stack.extend(children[index].iter().rev());
    }
    order
}

/// World matrix -> X-mirrored world pose
fn mirrored_pose(world: &Mat4) -> JointPose {
    let (scale, rotation, translation) = world.to_scale_rotation_translation();
    JointPose {
        position: Vec3::new(-translation.x, translation.y, translation.z),
        rotation: Quat::from_xyzw(rotation.x, -rotation.y, -rotation.z, rotation.w),
        scale,
    }
}

// ============================================================================
// Exporter contracts
// ============================================================================

/// Humanoid view of a [`GltfScene`]
#[derive(Clone, Debug)]
pub struct GltfAvatar<'a> {
    scene: &'a GltfScene,
    bones: BTreeMap<HumanoidBone, usize>,
    root: Option<usize>,
    source: BoneSource,
}

impl<'a> GltfAvatar<'a> {
    pub fn bones(&self) -> &BTreeMap<HumanoidBone, usize> {
        &self.bones
    }

    pub fn root(&self) -> Option<usize> {
        self.root
    }

    pub fn source(&self) -> BoneSource {
        self.source
    }

    pub fn root_name(&self) -> &str {
        self.root
            .map_or(SCENE_ROOT_NAME, |r| self.scene.nodes[r].name.as_str())
    }

    /// Whether `clip` moves any humanoid bone, directly or through one of
    /// its ancestors. Prop, camera and morph-only clips do not.
    pub fn is_humanoid_motion(&self, clip: &AnimationClip) -> bool {
        let mut affecting = BTreeSet::new();
        for &bone in self.bones.values() {
            let mut current = Some(bone);
            while let Some(node) = current {
                if !affecting.insert(node) {
                    break;
                }
                current = self.scene.nodes.get(node).and_then(|n| n.parent);
            }
        }
        clip.node_tracks
            .iter()
            .any(|track| affecting.contains(&track.node))
    }

    /// Clip source for `clip` posed on this avatar
    pub fn clip(&self, clip: &'a AnimationClip) -> GltfClip<'a> {
        GltfClip::new(self.scene, clip, self.root)
    }
}

impl SkeletonProvider for GltfAvatar<'_> {
    fn provide(&self) -> SkeletonSource {
        SkeletonSource {
            bones: self
                .bones
                .iter()
                .map(|(&bone, &node)| {
                    (bone, BoneHandle::new(self.scene.nodes[node].name.clone(), node))
                })
                .collect(),
            root_name: self.root_name().to_string(),
            rest_pose: self.scene.rest_pose(self.root),
        }
    }
}

/// One glTF animation as a clip source
#[derive(Clone, Debug)]
pub struct GltfClip<'a> {
    scene: &'a GltfScene,
    clip: &'a AnimationClip,
    root: Option<usize>,
    bindings: Vec<CurveBinding>,
}

impl<'a> GltfClip<'a> {
    pub fn new(scene: &'a GltfScene, clip: &'a AnimationClip, root: Option<usize>) -> Self {
        let mut bindings = Vec::new();
        for track in &clip.weight_tracks {
            for target in 0..track.targets {
                let Some(channel) = scene.morph_channel(track.node, target) else {
                    continue;
                };
                bindings.push(CurveBinding::new(channel, track.curve(target)));
            }
        }

        Self {
            scene,
            clip,
            root,
            bindings,
        }
    }

    pub fn name(&self) -> String {
        self.clip.label()
    }
}

impl<'a> ClipSource for GltfClip<'a> {
    type Working = PoseRig<'a>;

    fn duration(&self) -> f32 {
        self.clip.duration
    }

    fn curve_bindings(&self) -> &[CurveBinding] {
        &self.bindings
    }

    fn duplicate(&self) -> PoseRig<'a> {
        PoseRig {
            scene: self.scene,
            clip: self.clip,
            root: self.root,
            locals: self.scene.rest_locals(),
        }
    }
}

/// Working copy: local transforms the clip is applied to
#[derive(Debug)]
pub struct PoseRig<'a> {
    scene: &'a GltfScene,
    clip: &'a AnimationClip,
    root: Option<usize>,
    locals: Vec<Transform>,
}

impl PoseEvaluator for PoseRig<'_> {
    fn evaluate_pose(&mut self, time: f32) -> PoseSnapshot {
        for (local, node) in self.locals.iter_mut().zip(&self.scene.nodes) {
            *local = node.rest;
        }
        for track in &self.clip.node_tracks {
            if let Some(local) = self.locals.get_mut(track.node) {
                track.apply(time, local);
            }
        }
        self.scene.snapshot(&self.locals, self.root)
    }
}
