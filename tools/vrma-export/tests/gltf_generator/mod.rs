//! Programmatic GLB generation for integration tests.
//!
//! Generates a small humanoid avatar:
//! - Armature -> Hips -> Spine -> Neck -> Head, Hips -> LeftUpperLeg
//! - a face mesh with three morph targets (Blink, Smile, Custom_Brow)
//! - one 1-second animation "Wave" keyed every 0.1s
//!   (or, with `prop_clip`, the same keys driving only the face mesh)

mod binary_packing;
mod gltf_json;
mod rig_data;

pub use rig_data::{
    CLIP_DURATION, CLIP_NAME, FACE_NODE, Naming, TARGET_NAMES, hips_rotation, hips_translation,
    spine_rotation,
};

/// Avatar variants
#[derive(Clone, Copy, Debug)]
pub struct RigOptions {
    pub naming: Naming,
    /// Emit a `VRMC_vrm` extension (humanoid + expressions)
    pub vrm_extension: bool,
    /// Store morph weights as CUBICSPLINE (in, value, out) triples
    pub cubic_weights: bool,
    /// Key the hips samplers onto the face mesh instead of the skeleton
    pub prop_clip: bool,
}

impl Default for RigOptions {
    fn default() -> Self {
        Self {
            naming: Naming::Canonical,
            vrm_extension: false,
            cubic_weights: false,
            prop_clip: false,
        }
    }
}

/// Humanoid avatar whose node names match canonical bone names
pub fn generate_humanoid_glb() -> Vec<u8> {
    generate_glb(RigOptions::default())
}

/// VRM-style avatar: `J_Bip_*` node names plus a `VRMC_vrm` extension
pub fn generate_vrm_glb() -> Vec<u8> {
    generate_glb(RigOptions {
        naming: Naming::Vrm,
        vrm_extension: true,
        ..Default::default()
    })
}

/// Avatar without a recognizable hips node
pub fn generate_hipless_glb() -> Vec<u8> {
    generate_glb(RigOptions {
        naming: Naming::NoHips,
        ..Default::default()
    })
}

/// Humanoid avatar whose only clip moves the face mesh, not the skeleton
pub fn generate_prop_clip_glb() -> Vec<u8> {
    generate_glb(RigOptions {
        prop_clip: true,
        ..Default::default()
    })
}

pub fn generate_glb(options: RigOptions) -> Vec<u8> {
    // Build rig data
    let rig = rig_data::create_rig(options.naming);
    let animation = rig_data::create_animation(options.cubic_weights);

    // Pack all binary data
    let packed = binary_packing::pack_binary_data(&rig, &animation);

    // Build GLTF JSON
    let document = gltf_json::build_gltf_json(&rig, &packed, options);

    let json_bytes = serde_json::to_vec(&document).expect("Failed to serialize JSON");
    vrma_core::container::assemble_glb(&json_bytes, &packed.buffer)
}
