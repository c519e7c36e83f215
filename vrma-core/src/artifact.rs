//! Output records handed to the container writer

use crate::extension::VrmAnimationExtension;

/// A scene node of the output document
#[derive(Clone, Debug, PartialEq)]
pub struct SceneNode {
    pub name: String,
    pub children: Vec<u32>,
    pub translation: Option<[f32; 3]>,
    /// Quaternion `[x, y, z, w]`
    pub rotation: Option<[f32; 4]>,
}

impl SceneNode {
    /// Node with an identity transform and no children
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            translation: None,
            rotation: None,
        }
    }
}

/// Animated node property
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelPath {
    Translation,
    Rotation,
}

/// One sampler + channel pair
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnimationChannel {
    /// Target node
    pub node: u32,
    pub path: ChannelPath,
    /// Time accessor
    pub input: u32,
    /// Value accessor
    pub output: u32,
}

/// Everything the container needs besides the packed buffers.
#[derive(Clone, Debug)]
pub struct VrmAnimation {
    /// Skeleton nodes followed by expression placeholder nodes
    pub nodes: Vec<SceneNode>,
    /// Nodes listed in the scene (the root transform)
    pub scene_roots: Vec<u32>,
    /// Shared time accessor of the root and bone channels
    pub time_accessor: u32,
    /// Root translation channel first, then one rotation channel per bone
    pub bone_channels: Vec<AnimationChannel>,
    /// One translation channel per expression placeholder, in sorted order
    pub expression_channels: Vec<AnimationChannel>,
    /// Number of frames sampled
    pub frame_count: usize,
    pub extension: VrmAnimationExtension,
}

impl VrmAnimation {
    /// Bone channels followed by expression channels (sampler order)
    pub fn channels(&self) -> impl Iterator<Item = &AnimationChannel> {
        self.bone_channels.iter().chain(self.expression_channels.iter())
    }
}
