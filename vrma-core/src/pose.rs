//! Pose snapshots and the clip source contract
//!
//! Pose evaluation on a host mutates that host's transform graph, so the
//! exporter never evaluates on the caller's objects. A [`ClipSource`] hands
//! out an exclusively owned working duplicate ([`PoseEvaluator`]) that is
//! released when the export call leaves scope, on success or failure.

use glam::{Mat4, Quat, Vec3};

use crate::curve::CurveBinding;

/// Index of a joint inside a [`PoseSnapshot`]
pub type PoseHandle = usize;

/// World-space pose of one transform
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JointPose {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl JointPose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub const fn new(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            scale: Vec3::ONE,
        }
    }

    pub fn local_to_world(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    pub fn world_to_local(&self) -> Mat4 {
        self.local_to_world().inverse()
    }
}

impl Default for JointPose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Immutable world-space pose of the designated root and every joint at one
/// instant
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PoseSnapshot {
    /// Designated root transform (avatar root)
    pub root: JointPose,
    /// Joint poses, indexed by [`PoseHandle`]
    pub joints: Vec<JointPose>,
}

impl PoseSnapshot {
    /// Pose of a joint; unknown handles read as identity.
    pub fn joint(&self, handle: PoseHandle) -> JointPose {
        match self.joints.get(handle) {
            Some(pose) => *pose,
            None => {
                tracing::trace!("Pose handle {} out of range, using identity", handle);
                JointPose::IDENTITY
            }
        }
    }
}

/// Exclusively owned working copy of a host rig.
///
/// `evaluate_pose` may mutate the copy (it is the host's pose state), but
/// the returned snapshot is detached from it.
pub trait PoseEvaluator {
    fn evaluate_pose(&mut self, time: f32) -> PoseSnapshot;
}

/// A host animation clip
pub trait ClipSource {
    type Working: PoseEvaluator;

    /// Clip length in seconds
    fn duration(&self) -> f32;

    /// Scalar curve channels (expression candidates)
    fn curve_bindings(&self) -> &[CurveBinding];

    /// Create a disposable working duplicate to sample poses on
    fn duplicate(&self) -> Self::Working;
}

/// Scope guard around a working duplicate.
pub(crate) struct WorkingCopy<W> {
    inner: W,
}

impl<W: PoseEvaluator> WorkingCopy<W> {
    pub(crate) fn acquire<C: ClipSource<Working = W>>(clip: &C) -> Self {
        tracing::trace!("Acquired working pose copy");
        Self {
            inner: clip.duplicate(),
        }
    }

    pub(crate) fn evaluate_pose(&mut self, time: f32) -> PoseSnapshot {
        self.inner.evaluate_pose(time)
    }
}

impl<W> Drop for WorkingCopy<W> {
    fn drop(&mut self) {
        tracing::trace!("Released working pose copy");
    }
}
