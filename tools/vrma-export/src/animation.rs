//! glTF animation tracks
//!
//! Reads node TRS channels and morph weight channels of one glTF animation
//! and samples them at arbitrary times.

use anyhow::{Context, Result};
use glam::{Quat, Vec3};
use gltf::animation::Interpolation;
use gltf::animation::util::ReadOutputs;

use vrma_core::curve::{Curve, Interpolation as CurveInterpolation, Keyframe};

/// Morph weights are 0-1 in glTF; expression curves are authored 0-100
pub const WEIGHT_SCALE: f32 = 100.0;

/// Sampled values of one node property
#[derive(Clone, Debug)]
pub enum TrackValues {
    Translation(Vec<Vec3>),
    Rotation(Vec<Quat>),
    Scale(Vec<Vec3>),
}

/// One TRS channel
#[derive(Clone, Debug)]
pub struct NodeTrack {
    pub node: usize,
    pub times: Vec<f32>,
    pub interpolation: Interpolation,
    /// Three values per key (in-tangent, value, out-tangent) for
    /// `CUBICSPLINE`, one otherwise
    pub values: TrackValues,
}

/// One morph weight channel: `targets` weights per key
#[derive(Clone, Debug)]
pub struct WeightTrack {
    pub node: usize,
    pub targets: usize,
    pub times: Vec<f32>,
    pub interpolation: Interpolation,
    pub weights: Vec<f32>,
}

/// Everything an export needs from one glTF animation
#[derive(Clone, Debug)]
pub struct AnimationClip {
    pub index: usize,
    pub name: Option<String>,
    pub duration: f32,
    pub node_tracks: Vec<NodeTrack>,
    pub weight_tracks: Vec<WeightTrack>,
    pub channel_count: usize,
}

impl AnimationClip {
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("#{}", self.index),
        }
    }
}

/// Read every channel of `animation`
pub fn read_animation(
    animation: &gltf::Animation,
    buffers: &[gltf::buffer::Data],
) -> Result<AnimationClip> {
    let mut node_tracks = Vec::new();
    let mut weight_tracks = Vec::new();
    let mut duration = 0.0f32;

    for channel in animation.channels() {
        let target = channel.target();
        let node = target.node();
        let interpolation = channel.sampler().interpolation();
        let reader = channel.reader(|buffer| buffers.get(buffer.index()).map(|data| &data[..]));

        let times: Vec<f32> = reader
            .read_inputs()
            .with_context(|| {
                format!("Animation channel on node {} has no input times", node.index())
            })?
            .collect();
        if let Some(&t) = times.last() {
            duration = duration.max(t);
        }

        let Some(outputs) = reader.read_outputs() else {
            tracing::warn!("Animation channel on node {} has no outputs, skipped", node.index());
            continue;
        };

        let values = match outputs {
            ReadOutputs::Translations(it) => TrackValues::Translation(it.map(Vec3::from).collect()),
            ReadOutputs::Rotations(it) => TrackValues::Rotation(
                it.into_f32()
                    .map(|v| Quat::from_array(v).normalize())
                    .collect(),
            ),
            ReadOutputs::Scales(it) => TrackValues::Scale(it.map(Vec3::from).collect()),
            ReadOutputs::MorphTargetWeights(it) => {
                let targets = node
                    .mesh()
                    .and_then(|mesh| mesh.primitives().next())
                    .map_or(0, |primitive| primitive.morph_targets().count());
                weight_tracks.push(WeightTrack {
                    node: node.index(),
                    targets,
                    times,
                    interpolation,
                    weights: it.into_f32().collect(),
                });
                continue;
            }
        };

        node_tracks.push(NodeTrack {
            node: node.index(),
            times,
            interpolation,
            values,
        });
    }

    Ok(AnimationClip {
        index: animation.index(),
        name: animation.name().map(str::to_string),
        duration,
        node_tracks,
        weight_tracks,
        channel_count: animation.channels().count(),
    })
}

/// Node-local TRS
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn to_mat4(&self) -> glam::Mat4 {
        glam::Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl NodeTrack {
    /// Overwrite the animated property of `local` with its value at `t`
    pub fn apply(&self, t: f32, local: &mut Transform) {
        match &self.values {
            TrackValues::Translation(values) => {
                if let Some(v) = sample_vec3(&self.times, values, t, self.interpolation) {
                    local.translation = v;
                }
            }
            TrackValues::Rotation(values) => {
                if let Some(q) = sample_quat(&self.times, values, t, self.interpolation) {
                    local.rotation = q;
                }
            }
            TrackValues::Scale(values) => {
                if let Some(v) = sample_vec3(&self.times, values, t, self.interpolation) {
                    local.scale = v;
                }
            }
        }
    }
}

impl WeightTrack {
    /// Curve of one morph target on the 0-100 authoring scale
    pub fn curve(&self, target: usize) -> Curve {
        let n = self.targets;
        if n == 0 || target >= n {
            return Curve::default();
        }

        match self.interpolation {
            Interpolation::CubicSpline => {
                let keys = self
                    .times
                    .iter()
                    .enumerate()
                    .filter_map(|(i, &time)| {
                        let base = i * n * 3;
                        let in_tangent = *self.weights.get(base + target)?;
                        let value = *self.weights.get(base + n + target)?;
                        let out_tangent = *self.weights.get(base + 2 * n + target)?;
                        Some(Keyframe::with_tangents(
                            time,
                            value * WEIGHT_SCALE,
                            in_tangent * WEIGHT_SCALE,
                            out_tangent * WEIGHT_SCALE,
                        ))
                    })
                    .collect();
                Curve::new(keys, CurveInterpolation::Hermite)
            }
            interpolation => {
                let keys = self
                    .times
                    .iter()
                    .enumerate()
                    .filter_map(|(i, &time)| {
                        let value = *self.weights.get(i * n + target)?;
                        Some(Keyframe::new(time, value * WEIGHT_SCALE))
                    })
                    .collect();
                let mode = if matches!(interpolation, Interpolation::Step) {
                    CurveInterpolation::Step
                } else {
                    CurveInterpolation::Linear
                };
                Curve::new(keys, mode)
            }
        }
    }
}

// ============================================================================
// Interpolation
// ============================================================================

/// Keyframe segment containing `t`: `(left key, blend factor)`.
/// Clamps to the first/last key outside the range.
fn find_segment(times: &[f32], t: f32) -> Option<(usize, f32)> {
    let last = times.len().checked_sub(1)?;
    let next = times.partition_point(|&time| time <= t);
    if next == 0 {
        return Some((0, 0.0));
    }
    if next > last {
        return Some((last, 0.0));
    }

    let t0 = times[next - 1];
    let t1 = times[next];
    let factor = if t1 > t0 { (t - t0) / (t1 - t0) } else { 0.0 };
    Some((next - 1, factor.clamp(0.0, 1.0)))
}

/// Key value, skipping tangents for `CUBICSPLINE`
fn key<T: Copy>(values: &[T], i: usize, interpolation: Interpolation) -> Option<T> {
    if matches!(interpolation, Interpolation::CubicSpline) {
        values.get(i * 3 + 1).copied()
    } else {
        values.get(i).copied()
    }
}

fn hermite_weights(u: f32) -> [f32; 4] {
    let u2 = u * u;
    let u3 = u2 * u;
    [
        2.0 * u3 - 3.0 * u2 + 1.0,
        u3 - 2.0 * u2 + u,
        -2.0 * u3 + 3.0 * u2,
        u3 - u2,
    ]
}

fn sample_vec3(times: &[f32], values: &[Vec3], t: f32, interpolation: Interpolation) -> Option<Vec3> {
    let (i, u) = find_segment(times, t)?;
    let v0 = key(values, i, interpolation)?;
    if u == 0.0 || i + 1 >= times.len() {
        return Some(v0);
    }
    let v1 = key(values, i + 1, interpolation)?;

    Some(match interpolation {
        Interpolation::Step => v0,
        Interpolation::Linear => v0.lerp(v1, u),
        Interpolation::CubicSpline => {
            let dt = times[i + 1] - times[i];
            let b0 = *values.get(i * 3 + 2)?;
            let a1 = *values.get((i + 1) * 3)?;
            let [h00, h10, h01, h11] = hermite_weights(u);
            v0 * h00 + b0 * (h10 * dt) + v1 * h01 + a1 * (h11 * dt)
        }
    })
}

fn sample_quat(times: &[f32], values: &[Quat], t: f32, interpolation: Interpolation) -> Option<Quat> {
    let (i, u) = find_segment(times, t)?;
    let q0 = key(values, i, interpolation)?;
    if u == 0.0 || i + 1 >= times.len() {
        return Some(q0);
    }
    let q1 = key(values, i + 1, interpolation)?;

    Some(match interpolation {
        Interpolation::Step => q0,
        Interpolation::Linear => q0.slerp(q1, u),
        Interpolation::CubicSpline => {
            let dt = times[i + 1] - times[i];
            let b0 = *values.get(i * 3 + 2)?;
            let a1 = *values.get((i + 1) * 3)?;
            let [h00, h10, h01, h11] = hermite_weights(u);
            let v = glam::Vec4::from(q0) * h00
                + glam::Vec4::from(b0) * (h10 * dt)
                + glam::Vec4::from(q1) * h01
                + glam::Vec4::from(a1) * (h11 * dt);
            Quat::from_vec4(v).normalize()
        }
    })
}
