//! Fixed-rate resampling of pose and expression curves
//!
//! Output frames are spaced `1 / SAMPLE_RATE` apart regardless of how dense
//! the source keys are; the last frame is clamped to the clip duration.

use std::collections::BTreeMap;

use glam::{Quat, Vec3};

use crate::bone::HumanoidBone;
use crate::coords::{convert_position, convert_rotation};
use crate::expression::{ExpressionBinding, ExpressionKey};
use crate::pose::PoseSnapshot;
use crate::skeleton::Skeleton;

/// Output sample rate (frames per second)
pub const SAMPLE_RATE: f32 = 30.0;

/// Expression curves are authored on a 0-100 scale
pub const EXPRESSION_SCALE: f32 = 100.0;

/// Number of frames for a clip of `duration` seconds:
/// `floor(duration * SAMPLE_RATE) + 1`.
///
/// Negative and non-finite durations degenerate to a single frame. The
/// count saturates instead of overflowing for absurdly long clips.
pub fn frame_count(duration: f32) -> usize {
    let frames = (sanitize_duration(duration) * SAMPLE_RATE).floor() as usize;
    frames.saturating_add(1)
}

/// Sample time of frame `index`, clamped to `duration`
pub fn sample_time(index: usize, duration: f32) -> f32 {
    (index as f32 / SAMPLE_RATE).min(sanitize_duration(duration))
}

fn sanitize_duration(duration: f32) -> f32 {
    if duration.is_finite() && duration > 0.0 {
        duration
    } else {
        0.0
    }
}

/// One resampled instant, already in output conventions
#[derive(Clone, Debug, PartialEq)]
pub struct Frame<'a> {
    pub time: f32,
    /// Root joint position relative to the root transform
    pub root_position: Vec3,
    /// Parent-relative rotation per present bone
    pub rotations: BTreeMap<HumanoidBone, Quat>,
    /// Normalized weight (0-1) per resolved expression
    pub weights: BTreeMap<&'a ExpressionKey, f32>,
}

/// Drives pose and curve evaluation over fixed time steps
pub struct Resampler<'s, 'a> {
    skeleton: &'s Skeleton,
    expressions: &'s [ExpressionBinding<'a>],
}

impl<'s, 'a> Resampler<'s, 'a> {
    pub fn new(skeleton: &'s Skeleton, expressions: &'s [ExpressionBinding<'a>]) -> Self {
        Self {
            skeleton,
            expressions,
        }
    }

    /// Sample the whole clip, handing each frame to `sink` before the next
    /// pose is evaluated.
    pub fn run(
        &self,
        duration: f32,
        mut evaluate_pose: impl FnMut(f32) -> PoseSnapshot,
        mut sink: impl FnMut(Frame<'s>),
    ) {
        let frames = frame_count(duration);
        tracing::debug!(
            "Resampling {:.3}s at {} fps: {} frames, {} bones, {} expressions",
            duration,
            SAMPLE_RATE,
            frames,
            self.skeleton.bone_count(),
            self.expressions.len()
        );

        for index in 0..frames {
            let time = sample_time(index, duration);
            let pose = evaluate_pose(time);
            sink(self.sample_frame(time, &pose));
        }
    }

    /// Convert one pose snapshot (plus curve values at `time`) into a frame
    pub fn sample_frame(&self, time: f32, pose: &PoseSnapshot) -> Frame<'s> {
        let root = self.skeleton.root_bone();
        let root_position =
            convert_position(pose.root.world_to_local(), pose.joint(root.pose).position);

        let rotations = self
            .skeleton
            .bones()
            .map(|bone| {
                let parent = self.skeleton.parent_rotation(bone, pose);
                let rotation = convert_rotation(parent, pose.joint(bone.pose).rotation);
                (bone.id, rotation)
            })
            .collect();

        let expressions: &'s [ExpressionBinding<'a>] = self.expressions;
        let weights = expressions
            .iter()
            .map(|binding| {
                let weight = binding.curve.evaluate(time) / EXPRESSION_SCALE;
                (&binding.key, weight)
            })
            .collect();

        tracing::trace!("Sampled frame at {:.4}s", time);

        Frame {
            time,
            root_position,
            rotations,
            weights,
        }
    }
}
