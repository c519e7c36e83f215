//! Test avatar and animation data.

/// Clip length in seconds
pub const CLIP_DURATION: f32 = 1.0;
/// Animation name
pub const CLIP_NAME: &str = "Wave";
/// Key spacing in seconds
const KEY_STEP: f32 = 0.1;
/// Index of the mesh node carrying the morph targets
pub const FACE_NODE: usize = 6;
/// Morph target names, in target order
pub const TARGET_NAMES: [&str; 3] = ["Blink", "Smile", "Custom_Brow"];

/// Node naming scheme
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Naming {
    /// Node names equal canonical bone names
    Canonical,
    /// VRoid-style names (need the VRMC_vrm humanoid table)
    Vrm,
    /// Canonical names, but the hips node is called "Pelvis"
    NoHips,
}

pub struct NodeData {
    pub name: &'static str,
    pub children: Vec<u32>,
    pub translation: [f32; 3],
    pub mesh: bool,
}

pub struct RigData {
    pub nodes: Vec<NodeData>,
    /// Triangle positions of the face mesh
    pub positions: Vec<[f32; 3]>,
    /// Per-target position deltas
    pub target_deltas: Vec<Vec<[f32; 3]>>,
}

pub struct AnimationData {
    pub times: Vec<f32>,
    pub hips_translations: Vec<[f32; 3]>,
    pub hips_rotations: Vec<[f32; 4]>,
    pub spine_rotations: Vec<[f32; 4]>,
    /// Flattened morph weights (targets per key, x3 when cubic)
    pub weights: Vec<f32>,
    pub cubic_weights: bool,
}

/// Expected local hips translation at `t`
pub fn hips_translation(t: f32) -> [f32; 3] {
    [0.5 * t, 1.0, 0.0]
}

/// Expected local hips rotation at `t` (about Y)
pub fn hips_rotation(t: f32) -> [f32; 4] {
    let half = 0.25 * t;
    [0.0, half.sin(), 0.0, half.cos()]
}

/// Expected local spine rotation at `t` (about X)
pub fn spine_rotation(t: f32) -> [f32; 4] {
    let half = 0.4 * t;
    [half.sin(), 0.0, 0.0, half.cos()]
}

/// Morph weights at `t`: Blink ramps up, Smile ramps down, Brow holds 0.5
fn morph_weights(t: f32) -> [f32; 3] {
    [t, 1.0 - t, 0.5]
}

pub fn create_rig(naming: Naming) -> RigData {
    let name = |canonical: &'static str, vrm: &'static str| match naming {
        Naming::Vrm => vrm,
        Naming::NoHips if canonical == "Hips" => "Pelvis",
        _ => canonical,
    };

    let nodes = vec![
        // Node 0: Armature
        NodeData {
            name: "Armature",
            children: vec![1, FACE_NODE as u32],
            translation: [0.0, 0.0, 0.0],
            mesh: false,
        },
        // Node 1: Hips
        NodeData {
            name: name("Hips", "J_Bip_C_Hips"),
            children: vec![2, 5],
            translation: hips_translation(0.0),
            mesh: false,
        },
        // Node 2: Spine
        NodeData {
            name: name("Spine", "J_Bip_C_Spine"),
            children: vec![3],
            translation: [0.0, 0.2, 0.0],
            mesh: false,
        },
        // Node 3: Neck
        NodeData {
            name: name("Neck", "J_Bip_C_Neck"),
            children: vec![4],
            translation: [0.0, 0.3, 0.0],
            mesh: false,
        },
        // Node 4: Head
        NodeData {
            name: name("Head", "J_Bip_C_Head"),
            children: vec![],
            translation: [0.0, 0.1, 0.0],
            mesh: false,
        },
        // Node 5: LeftUpperLeg
        NodeData {
            name: name("LeftUpperLeg", "J_Bip_L_UpperLeg"),
            children: vec![],
            translation: [0.1, -0.05, 0.0],
            mesh: false,
        },
        // Node 6: Face mesh
        NodeData {
            name: "Face",
            children: vec![],
            translation: [0.0, 1.6, 0.0],
            mesh: true,
        },
    ];

    let positions = vec![[0.0, 0.0, 0.0], [0.1, 0.0, 0.0], [0.0, 0.1, 0.0]];
    let target_deltas = (0..TARGET_NAMES.len())
        .map(|i| {
            let d = 0.01 * (i + 1) as f32;
            vec![[0.0, d, 0.0], [0.0, d, 0.0], [0.0, 0.0, d]]
        })
        .collect();

    RigData {
        nodes,
        positions,
        target_deltas,
    }
}

pub fn create_animation(cubic_weights: bool) -> AnimationData {
    let key_count = (CLIP_DURATION / KEY_STEP).round() as usize + 1;
    let times: Vec<f32> = (0..key_count).map(|i| i as f32 * KEY_STEP).collect();

    let mut weights = Vec::new();
    for &t in &times {
        let values = morph_weights(t);
        if cubic_weights {
            // Zero tangents: in, value, out
            weights.extend([0.0; 3]);
            weights.extend(values);
            weights.extend([0.0; 3]);
        } else {
            weights.extend(values);
        }
    }

    AnimationData {
        hips_translations: times.iter().map(|&t| hips_translation(t)).collect(),
        hips_rotations: times.iter().map(|&t| hips_rotation(t)).collect(),
        spine_rotations: times.iter().map(|&t| spine_rotation(t)).collect(),
        times,
        weights,
        cubic_weights,
    }
}
