//! GLTF JSON structure building.

use super::RigOptions;
use super::binary_packing::PackedData;
use super::rig_data::{CLIP_NAME, FACE_NODE, RigData, TARGET_NAMES};
use gltf_json as json;
use json::validation::Checked::Valid;
use serde_json::json as value;

/// Build the GLTF JSON document (extensions and extras included)
pub(crate) fn build_gltf_json(
    rig: &RigData,
    packed: &PackedData,
    options: RigOptions,
) -> serde_json::Value {
    let indices = &packed.indices;

    // Create nodes
    let nodes = rig
        .nodes
        .iter()
        .map(|node| json::Node {
            camera: None,
            children: (!node.children.is_empty())
                .then(|| node.children.iter().map(|&c| json::Index::new(c)).collect()),
            extensions: Default::default(),
            extras: Default::default(),
            matrix: None,
            mesh: node.mesh.then(|| json::Index::new(0)),
            name: Some(node.name.to_string()),
            rotation: None,
            scale: None,
            translation: Some(node.translation),
            skin: None,
            weights: None,
        })
        .collect();

    // Create morph target mesh
    let mut attributes = std::collections::BTreeMap::new();
    attributes.insert(
        Valid(json::mesh::Semantic::Positions),
        json::Index::new(indices.positions),
    );
    let targets = indices
        .targets
        .iter()
        .map(|&accessor| json::mesh::MorphTarget {
            positions: Some(json::Index::new(accessor)),
            normals: None,
            tangents: None,
        })
        .collect();

    let meshes = vec![json::Mesh {
        extensions: Default::default(),
        extras: Default::default(),
        name: Some("FaceMesh".to_string()),
        primitives: vec![json::mesh::Primitive {
            attributes,
            extensions: Default::default(),
            extras: Default::default(),
            indices: None,
            material: None,
            mode: Valid(json::mesh::Mode::Triangles),
            targets: Some(targets),
        }],
        weights: Some(vec![0.0; TARGET_NAMES.len()]),
    }];

    // Create animation
    let sampler = |output: u32, interpolation: json::animation::Interpolation| {
        json::animation::Sampler {
            extensions: Default::default(),
            extras: Default::default(),
            input: json::Index::new(indices.times),
            interpolation: Valid(interpolation),
            output: json::Index::new(output),
        }
    };
    let channel = |sampler: u32, node: u32, path: json::animation::Property| {
        json::animation::Channel {
            sampler: json::Index::new(sampler),
            target: json::animation::Target {
                extensions: Default::default(),
                extras: Default::default(),
                node: json::Index::new(node),
                path: Valid(path),
            },
            extensions: Default::default(),
            extras: Default::default(),
        }
    };
    let weight_interpolation = if options.cubic_weights {
        json::animation::Interpolation::CubicSpline
    } else {
        json::animation::Interpolation::Linear
    };

    let face = FACE_NODE as u32;
    let channels = if options.prop_clip {
        vec![
            channel(0, face, json::animation::Property::Translation),
            channel(1, face, json::animation::Property::Rotation),
            channel(3, face, json::animation::Property::MorphTargetWeights),
        ]
    } else {
        vec![
            channel(0, 1, json::animation::Property::Translation),
            channel(1, 1, json::animation::Property::Rotation),
            channel(2, 2, json::animation::Property::Rotation),
            channel(3, face, json::animation::Property::MorphTargetWeights),
        ]
    };

    let animations = vec![json::Animation {
        extensions: Default::default(),
        extras: Default::default(),
        name: Some(CLIP_NAME.to_string()),
        samplers: vec![
            sampler(indices.hips_translations, json::animation::Interpolation::Linear),
            sampler(indices.hips_rotations, json::animation::Interpolation::Linear),
            sampler(indices.spine_rotations, json::animation::Interpolation::Linear),
            sampler(indices.weights, weight_interpolation),
        ],
        channels,
    }];

    let root = json::Root {
        accessors: packed.accessors.clone(),
        animations,
        asset: json::Asset {
            copyright: None,
            extensions: Default::default(),
            extras: Default::default(),
            generator: Some("vrma-export test generator".to_string()),
            min_version: None,
            version: "2.0".to_string(),
        },
        buffers: vec![json::Buffer {
            byte_length: packed.buffer.len().into(),
            extensions: Default::default(),
            extras: Default::default(),
            name: None,
            uri: None,
        }],
        buffer_views: packed.views.clone(),
        cameras: Vec::new(),
        extensions: Default::default(),
        extras: Default::default(),
        extensions_required: Vec::new(),
        extensions_used: Vec::new(),
        images: Vec::new(),
        materials: Vec::new(),
        meshes,
        nodes,
        samplers: Vec::new(),
        scene: Some(json::Index::new(0)),
        scenes: vec![json::Scene {
            extensions: Default::default(),
            extras: Default::default(),
            name: Some("Scene".to_string()),
            nodes: vec![json::Index::new(0)],
        }],
        skins: Vec::new(),
        textures: Vec::new(),
    };

    let mut document = serde_json::to_value(&root).expect("Failed to serialize JSON");

    // Morph target names live in mesh extras
    document["meshes"][0]["extras"] = value!({ "targetNames": TARGET_NAMES });

    if options.vrm_extension {
        document["extensionsUsed"] = value!(["VRMC_vrm"]);
        document["extensions"] = value!({ "VRMC_vrm": vrm_extension() });
    }

    document
}

/// VRMC_vrm block: humanoid table plus blink/happy bound to the face targets
fn vrm_extension() -> serde_json::Value {
    let face = FACE_NODE;
    value!({
        "specVersion": "1.0",
        "humanoid": {
            "humanBones": {
                "hips": { "node": 1 },
                "spine": { "node": 2 },
                "neck": { "node": 3 },
                "head": { "node": 4 },
                "leftUpperLeg": { "node": 5 }
            }
        },
        "expressions": {
            "preset": {
                "blink": {
                    "morphTargetBinds": [{ "node": face, "index": 0, "weight": 1.0 }]
                },
                "happy": {
                    "morphTargetBinds": [{ "node": face, "index": 1, "weight": 1.0 }]
                },
                "neutral": {}
            }
        }
    })
}
