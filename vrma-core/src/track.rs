//! Track builder: frames -> flat per-channel sequences

use std::collections::BTreeMap;

use crate::bone::HumanoidBone;
use crate::expression::{ExpressionBinding, ExpressionKey};
use crate::resample::Frame;
use crate::skeleton::Skeleton;

/// Resampled weight curve of one expression.
///
/// Carries its own copy of the frame times; the container re-encodes them
/// into a dedicated accessor.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExpressionTrack {
    pub times: Vec<f32>,
    pub weights: Vec<f32>,
}

/// Accumulated tracks of one clip
#[derive(Clone, Debug, PartialEq)]
pub struct BakedTracks<'s> {
    /// Shared time axis of the root and bone tracks
    pub times: Vec<f32>,
    /// Root joint positions
    pub root_positions: Vec<[f32; 3]>,
    /// Parent-relative rotations per present bone, canonical order
    pub rotations: BTreeMap<HumanoidBone, Vec<[f32; 4]>>,
    /// Weight tracks in resolution order (not sorted)
    pub expressions: Vec<(&'s ExpressionKey, ExpressionTrack)>,
}

impl BakedTracks<'_> {
    pub fn frame_count(&self) -> usize {
        self.times.len()
    }
}

/// Collects frames into per-channel sequences
pub struct TrackBuilder<'s> {
    tracks: BakedTracks<'s>,
}

impl<'s> TrackBuilder<'s> {
    /// Prepare empty sequences for every present bone and resolved expression
    pub fn new(
        skeleton: &Skeleton,
        expressions: &'s [ExpressionBinding<'_>],
        frame_capacity: usize,
    ) -> Self {
        let rotations = skeleton
            .bones()
            .map(|bone| (bone.id, Vec::with_capacity(frame_capacity)))
            .collect();
        let expressions = expressions
            .iter()
            .map(|binding| {
                let track = ExpressionTrack {
                    times: Vec::with_capacity(frame_capacity),
                    weights: Vec::with_capacity(frame_capacity),
                };
                (&binding.key, track)
            })
            .collect();

        Self {
            tracks: BakedTracks {
                times: Vec::with_capacity(frame_capacity),
                root_positions: Vec::with_capacity(frame_capacity),
                rotations,
                expressions,
            },
        }
    }

    /// Append one frame to every sequence
    pub fn push(&mut self, frame: Frame<'s>) {
        let tracks = &mut self.tracks;
        tracks.times.push(frame.time);
        tracks.root_positions.push(frame.root_position.to_array());

        for (bone, values) in tracks.rotations.iter_mut() {
            if let Some(rotation) = frame.rotations.get(bone) {
                values.push(rotation.to_array());
            } else {
                tracing::warn!("Frame at {:.4}s has no rotation for {}, holding identity", frame.time, bone);
                values.push([0.0, 0.0, 0.0, 1.0]);
            }
        }

        for (key, track) in tracks.expressions.iter_mut() {
            let weight = frame.weights.get(*key).copied().unwrap_or(0.0);
            track.times.push(frame.time);
            track.weights.push(weight);
        }
    }

    pub fn frame_count(&self) -> usize {
        self.tracks.times.len()
    }

    pub fn finish(self) -> BakedTracks<'s> {
        self.tracks
    }
}
