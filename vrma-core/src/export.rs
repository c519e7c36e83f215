//! Export pipeline
//!
//! skeleton -> expressions -> working copy -> resampler -> tracks ->
//! placeholder nodes -> accessors -> extension

use crate::artifact::{AnimationChannel, ChannelPath, VrmAnimation};
use crate::bone::{BoneHierarchy, HumanoidBone};
use crate::container::{ContainerSerializer, GlbBuilder, Sequence};
use crate::error::ExportError;
use crate::expression::{ExpressionMap, resolve_bindings};
use crate::extension::{
    Humanoid, NodeRef, VrmAnimationExtension, allocate_placeholders, build_expressions,
    placeholder_node, weights_as_translation,
};
use crate::pose::{ClipSource, WorkingCopy};
use crate::resample::{Resampler, frame_count};
use crate::skeleton::{Skeleton, SkeletonProvider};
use crate::track::TrackBuilder;

/// Configured exporter.
///
/// Holds no state between calls; every call re-reads the skeleton and the
/// clip.
#[derive(Clone, Debug, Default)]
pub struct Exporter {
    hierarchy: BoneHierarchy,
    expression_map: Option<ExpressionMap>,
}

impl Exporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a non-canonical parent table
    pub fn with_hierarchy(mut self, hierarchy: BoneHierarchy) -> Self {
        self.hierarchy = hierarchy;
        self
    }

    /// Only channels named in `map` become expressions
    pub fn with_expression_map(mut self, map: ExpressionMap) -> Self {
        self.expression_map = Some(map);
        self
    }

    pub fn expression_map(&self) -> Option<&ExpressionMap> {
        self.expression_map.as_ref()
    }

    /// Sample `clip` on the skeleton of `provider` and append every sequence
    /// to `serializer`.
    ///
    /// Nothing is appended when the skeleton has no root bone.
    pub fn build<P, C, S>(
        &self,
        provider: &P,
        clip: &C,
        serializer: &mut S,
    ) -> Result<VrmAnimation, ExportError>
    where
        P: SkeletonProvider + ?Sized,
        C: ClipSource,
        S: ContainerSerializer + ?Sized,
    {
        let skeleton = Skeleton::resolve(provider.provide(), &self.hierarchy)?;
        let expressions = resolve_bindings(clip.curve_bindings(), self.expression_map.as_ref());

        let duration = clip.duration();
        let mut builder = TrackBuilder::new(&skeleton, &expressions, frame_count(duration));
        {
            let mut working = WorkingCopy::acquire(clip);
            Resampler::new(&skeleton, &expressions).run(
                duration,
                |time| working.evaluate_pose(time),
                |frame| builder.push(frame),
            );
        }
        let tracks = builder.finish();

        let mut nodes = skeleton.scene_nodes();
        let placeholders =
            allocate_placeholders(tracks.expressions.iter().map(|(key, _)| *key), nodes.len() as u32);
        nodes.extend(placeholders.iter().map(|p| placeholder_node(p.key)));

        let time_accessor = serializer.append_sequence(Sequence::Scalar(&tracks.times));

        let mut bone_channels = Vec::with_capacity(tracks.rotations.len() + 1);
        if let Some(node) = skeleton.node_index(HumanoidBone::ROOT) {
            let output = serializer.append_sequence(Sequence::Vec3(&tracks.root_positions));
            bone_channels.push(AnimationChannel {
                node,
                path: ChannelPath::Translation,
                input: time_accessor,
                output,
            });
        }
        for (&bone, rotations) in &tracks.rotations {
            let Some(node) = skeleton.node_index(bone) else {
                continue;
            };
            let output = serializer.append_sequence(Sequence::Vec4(rotations));
            bone_channels.push(AnimationChannel {
                node,
                path: ChannelPath::Rotation,
                input: time_accessor,
                output,
            });
        }

        let mut expression_channels = Vec::with_capacity(placeholders.len());
        for placeholder in &placeholders {
            let Some((_, track)) = tracks.expressions.iter().find(|(key, _)| *key == placeholder.key)
            else {
                continue;
            };
            let input = serializer.append_sequence(Sequence::Scalar(&track.times));
            let values = weights_as_translation(&track.weights);
            let output = serializer.append_sequence(Sequence::Vec3(&values));
            expression_channels.push(AnimationChannel {
                node: placeholder.node,
                path: ChannelPath::Translation,
                input,
                output,
            });
        }

        let human_bones = skeleton
            .bones()
            .filter_map(|bone| {
                skeleton
                    .node_index(bone.id)
                    .map(|node| (bone.id, NodeRef { node }))
            })
            .collect();
        let extension = VrmAnimationExtension::new(
            Humanoid { human_bones },
            build_expressions(&placeholders),
        );

        tracing::info!(
            "Exported {:.3}s clip: {} frames, {} bones, {} expressions",
            duration,
            tracks.frame_count(),
            skeleton.bone_count(),
            placeholders.len()
        );

        Ok(VrmAnimation {
            nodes,
            scene_roots: vec![0],
            time_accessor,
            bone_channels,
            expression_channels,
            frame_count: tracks.frame_count(),
            extension,
        })
    }

    /// Build and serialize to GLB bytes
    pub fn export_glb<P, C>(&self, provider: &P, clip: &C) -> Result<Vec<u8>, ExportError>
    where
        P: SkeletonProvider + ?Sized,
        C: ClipSource,
    {
        let mut builder = GlbBuilder::new();
        let animation = self.build(provider, clip, &mut builder)?;
        builder.finish(&animation)
    }
}

/// Export `clip` on the skeleton of `provider` as `.vrma` bytes using the
/// canonical hierarchy.
pub fn export_vrma<P, C>(
    provider: &P,
    clip: &C,
    expression_map: Option<ExpressionMap>,
) -> Result<Vec<u8>, ExportError>
where
    P: SkeletonProvider + ?Sized,
    C: ClipSource,
{
    let exporter = match expression_map {
        Some(map) => Exporter::new().with_expression_map(map),
        None => Exporter::new(),
    };
    exporter.export_glb(provider, clip)
}
