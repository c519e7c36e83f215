//! Skeleton adapter: host skeleton -> canonical bones with effective parents
//!
//! A host avatar rarely has every canonical joint. Each present bone is
//! attached to its nearest *present* canonical ancestor, or to the
//! designated root transform when none exists, which flattens the hierarchy
//! around missing joints.

use std::collections::BTreeMap;

use glam::Quat;

use crate::artifact::SceneNode;
use crate::bone::{BoneHierarchy, HumanoidBone};
use crate::coords::{convert_position, convert_rotation};
use crate::error::ExportError;
use crate::pose::{JointPose, PoseHandle, PoseSnapshot};

/// Host bone as reported by a [`SkeletonProvider`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoneHandle {
    /// Host node name, reused for the emitted node
    pub name: String,
    /// Where this bone's pose lives in every [`PoseSnapshot`]
    pub pose: PoseHandle,
}

impl BoneHandle {
    pub fn new(name: impl Into<String>, pose: PoseHandle) -> Self {
        Self {
            name: name.into(),
            pose,
        }
    }
}

/// Result of host skeleton introspection
#[derive(Clone, Debug, Default)]
pub struct SkeletonSource {
    /// Canonical bones actually present on the avatar
    pub bones: BTreeMap<HumanoidBone, BoneHandle>,
    /// Name of the designated root transform
    pub root_name: String,
    /// Rest pose, used for node rest transforms
    pub rest_pose: PoseSnapshot,
}

/// Host skeleton introspection
pub trait SkeletonProvider {
    fn provide(&self) -> SkeletonSource;
}

/// Resolved parent of a bone
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParentRef {
    /// The designated root transform
    SceneRoot,
    Bone(HumanoidBone),
}

/// A present bone with its effective parent
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bone {
    pub id: HumanoidBone,
    pub name: String,
    pub pose: PoseHandle,
    pub parent: ParentRef,
}

/// Canonical skeleton resolved against one host avatar.
///
/// Always contains the root bone.
#[derive(Clone, Debug)]
pub struct Skeleton {
    bones: BTreeMap<HumanoidBone, Bone>,
    root_name: String,
    rest_pose: PoseSnapshot,
}

impl Skeleton {
    /// Resolve effective parents for every present bone.
    ///
    /// Fails with [`ExportError::MissingRootBone`] when the root joint is
    /// absent.
    pub fn resolve(source: SkeletonSource, hierarchy: &BoneHierarchy) -> Result<Self, ExportError> {
        if !source.bones.contains_key(&HumanoidBone::ROOT) {
            return Err(ExportError::MissingRootBone);
        }

        let bones = source
            .bones
            .iter()
            .map(|(&id, handle)| {
                let parent = effective_parent(id, &source.bones, hierarchy);
                tracing::trace!("Bone {} ('{}') -> parent {:?}", id, handle.name, parent);
                let bone = Bone {
                    id,
                    name: handle.name.clone(),
                    pose: handle.pose,
                    parent,
                };
                (id, bone)
            })
            .collect();

        Ok(Self {
            bones,
            root_name: source.root_name,
            rest_pose: source.rest_pose,
        })
    }

    /// Present bones in canonical order
    pub fn bones(&self) -> impl Iterator<Item = &Bone> {
        self.bones.values()
    }

    pub fn get(&self, id: HumanoidBone) -> Option<&Bone> {
        self.bones.get(&id)
    }

    /// Number of present bones (always at least the root)
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    /// The root joint (hips)
    pub fn root_bone(&self) -> &Bone {
        // Guaranteed by `resolve`
        &self.bones[&HumanoidBone::ROOT]
    }

    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    /// World pose of a bone's effective parent in `pose`
    pub fn parent_pose(&self, bone: &Bone, pose: &PoseSnapshot) -> JointPose {
        match bone.parent {
            ParentRef::SceneRoot => pose.root,
            ParentRef::Bone(parent) => self
                .bones
                .get(&parent)
                .map_or(pose.root, |parent| pose.joint(parent.pose)),
        }
    }

    /// World rotation of a bone's effective parent in `pose`
    pub fn parent_rotation(&self, bone: &Bone, pose: &PoseSnapshot) -> Quat {
        self.parent_pose(bone, pose).rotation
    }

    /// Node index of a bone: node 0 is the root transform, bones follow in
    /// canonical order.
    pub fn node_index(&self, id: HumanoidBone) -> Option<u32> {
        self.bones
            .keys()
            .position(|&bone| bone == id)
            .map(|i| i as u32 + 1)
    }

    /// Build the skeleton node table (root + one node per present bone).
    ///
    /// Rest transforms are parent-relative and converted with the same
    /// conventions as the animation samples.
    pub fn scene_nodes(&self) -> Vec<SceneNode> {
        let rest = &self.rest_pose;
        let mut nodes = Vec::with_capacity(self.bones.len() + 1);
        nodes.push(SceneNode::new(self.root_name.clone()));

        for bone in self.bones.values() {
            let parent = self.parent_pose(bone, rest);
            let own = rest.joint(bone.pose);
            let translation = convert_position(parent.world_to_local(), own.position);
            let rotation = convert_rotation(parent.rotation, own.rotation);

            let mut node = SceneNode::new(bone.name.clone());
            node.translation = Some(translation.to_array());
            node.rotation = Some(rotation.normalize().to_array());
            nodes.push(node);
        }

        for bone in self.bones.values() {
            let Some(child) = self.node_index(bone.id) else {
                continue;
            };
            let parent = match bone.parent {
                ParentRef::SceneRoot => 0,
                ParentRef::Bone(parent) => self.node_index(parent).unwrap_or(0),
            };
            nodes[parent as usize].children.push(child);
        }

        nodes
    }
}

/// Walk the canonical parent table up from `bone` until a present bone is
/// found. Reaching the top without one means the root transform.
fn effective_parent(
    bone: HumanoidBone,
    present: &BTreeMap<HumanoidBone, BoneHandle>,
    hierarchy: &BoneHierarchy,
) -> ParentRef {
    hierarchy
        .ancestors(bone)
        .find(|ancestor| present.contains_key(ancestor))
        .map_or(ParentRef::SceneRoot, ParentRef::Bone)
}
