//! glTF -> .vrma conversion and listing

use anyhow::{Context, Result};
use std::path::Path;

use vrma_core::{ExpressionMap, Exporter};

use crate::config::ExportConfig;
use crate::scene::GltfScene;

/// Output file extension
pub const VRMA_EXT: &str = "vrma";

/// Longest clip accepted for export, in seconds
pub const MAX_CLIP_DURATION: f32 = 3600.0;

/// Options of one conversion
#[derive(Debug, Default)]
pub struct ConvertOptions {
    /// Animation name or index (overrides the config)
    pub animation: Option<String>,
    pub config: ExportConfig,
    /// Ignore `VRMC_vrm` expressions and resolve channels by name
    pub direct_expressions: bool,
}

/// Result of in-memory conversion
#[derive(Debug, Clone)]
pub struct ConvertedClip {
    pub name: String,
    pub frame_count: usize,
    pub bone_count: usize,
    pub expression_count: usize,
    /// GLB bytes
    pub data: Vec<u8>,
}

/// Expression map to export with: config table, else the avatar's own
/// `VRMC_vrm` expressions unless disabled, else none (name fallback).
fn expression_map(scene: &GltfScene, options: &ConvertOptions) -> Option<ExpressionMap> {
    if let Some(map) = options.config.expression_map() {
        tracing::debug!("Using {} configured expression mappings", map.len());
        return Some(map);
    }
    if options.direct_expressions {
        return None;
    }
    let map = scene.vrm_expression_map()?;
    tracing::debug!("Using {} expression mappings from VRMC_vrm", map.len());
    Some(map)
}

/// Convert one clip of a loaded scene to `.vrma` bytes
pub fn convert_scene_to_memory(scene: &GltfScene, options: &ConvertOptions) -> Result<ConvertedClip> {
    let selector = options
        .animation
        .as_deref()
        .or(options.config.animation.as_deref());
    let clip = scene.select_clip(selector)?;
    if !(clip.duration.is_finite() && clip.duration <= MAX_CLIP_DURATION) {
        anyhow::bail!(
            "Animation '{}' has an invalid duration ({}s, at most {}s supported)",
            clip.label(),
            clip.duration,
            MAX_CLIP_DURATION
        );
    }

    let avatar = scene.avatar(&options.config)?;
    if !avatar.is_humanoid_motion(clip) {
        anyhow::bail!(
            "Animation '{}' is not a humanoid animation: it moves none of the {} humanoid bones",
            clip.label(),
            avatar.bones().len()
        );
    }
    let source = avatar.clip(clip);

    let mut exporter = Exporter::new();
    if let Some(map) = expression_map(scene, options) {
        exporter = exporter.with_expression_map(map);
    }

    let mut builder = vrma_core::GlbBuilder::new();
    let animation = exporter
        .build(&avatar, &source, &mut builder)
        .with_context(|| format!("Failed to export animation '{}'", source.name()))?;
    let data = builder.finish(&animation)?;

    Ok(ConvertedClip {
        name: source.name(),
        frame_count: animation.frame_count,
        bone_count: animation.extension.humanoid.human_bones.len(),
        expression_count: animation.expression_channels.len(),
        data,
    })
}

/// Convert a glTF file to `.vrma` bytes
pub fn convert_gltf_to_memory(input: &Path, options: &ConvertOptions) -> Result<ConvertedClip> {
    let scene = GltfScene::load(input)?;
    convert_scene_to_memory(&scene, options)
}

/// Convert a glTF file and write the `.vrma` output.
///
/// Nothing is written when the export fails.
pub fn convert_gltf(input: &Path, output: &Path, options: &ConvertOptions) -> Result<()> {
    let converted = convert_gltf_to_memory(input, options)?;

    std::fs::write(output, &converted.data)
        .with_context(|| format!("Failed to write output: {:?}", output))?;

    tracing::info!(
        "Exported animation '{}': {} bones, {} expressions, {} frames ({} bytes)",
        converted.name,
        converted.bone_count,
        converted.expression_count,
        converted.frame_count,
        converted.data.len()
    );

    Ok(())
}

/// List animations, humanoid bones and morph channels of a glTF file
pub fn list_gltf(input: &Path, config: &ExportConfig) -> Result<()> {
    let scene = GltfScene::load(input)?;

    if scene.clips().is_empty() {
        tracing::info!("No animations found in {:?}", input);
    } else {
        tracing::info!("Animations in {:?}:", input);
        for (i, clip) in scene.clips().iter().enumerate() {
            tracing::info!(
                "  [{}] '{}': {} channels, {:.2}s",
                i,
                clip.name.as_deref().unwrap_or("unnamed"),
                clip.channel_count,
                clip.duration
            );
        }
    }

    if scene.has_vrm() {
        tracing::info!("Avatar carries {}", crate::scene::VRM_EXTENSION);
    }

    let avatar = scene.avatar(config)?;
    tracing::info!("Humanoid bones ({:?}), root '{}':", avatar.source(), avatar.root_name());
    for (bone, &node) in avatar.bones() {
        tracing::info!("  {} -> '{}'", bone, scene.nodes()[node].name);
    }

    let channels: Vec<&str> = scene
        .meshes()
        .iter()
        .flat_map(|mesh| mesh.channels.iter().map(String::as_str))
        .collect();
    if channels.is_empty() {
        tracing::info!("No morph target channels");
    } else {
        tracing::info!("Morph target channels: {}", channels.join(", "));
    }

    Ok(())
}
