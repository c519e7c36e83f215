//! Container serializer: float sequences -> GLB
//!
//! The exporter only talks to [`ContainerSerializer`]; [`GlbBuilder`] is
//! the implementation that packs sequences into a single binary buffer and
//! frames the final document as GLB 2.0.

use gltf_json as json;
use json::validation::Checked::Valid;

use crate::artifact::{AnimationChannel, ChannelPath, SceneNode, VrmAnimation};
use crate::error::ExportError;
use crate::extension::EXTENSION_NAME;

/// Name of the single animation in the output
pub const ANIMATION_NAME: &str = "vrm_animation";

/// Typed float sequence to append
#[derive(Clone, Copy, Debug)]
pub enum Sequence<'a> {
    Scalar(&'a [f32]),
    Vec3(&'a [[f32; 3]]),
    Vec4(&'a [[f32; 4]]),
}

impl Sequence<'_> {
    pub fn len(&self) -> usize {
        match *self {
            Sequence::Scalar(values) => values.len(),
            Sequence::Vec3(values) => values.len(),
            Sequence::Vec4(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn components(&self) -> usize {
        match self {
            Sequence::Scalar(_) => 1,
            Sequence::Vec3(_) => 3,
            Sequence::Vec4(_) => 4,
        }
    }

    fn as_bytes(&self) -> &[u8] {
        match *self {
            Sequence::Scalar(values) => bytemuck::cast_slice(values),
            Sequence::Vec3(values) => bytemuck::cast_slice(values),
            Sequence::Vec4(values) => bytemuck::cast_slice(values),
        }
    }

    fn as_floats(&self) -> &[f32] {
        match *self {
            Sequence::Scalar(values) => values,
            Sequence::Vec3(values) => bytemuck::cast_slice(values),
            Sequence::Vec4(values) => bytemuck::cast_slice(values),
        }
    }

    fn accessor_type(&self) -> json::accessor::Type {
        match self {
            Sequence::Scalar(_) => json::accessor::Type::Scalar,
            Sequence::Vec3(_) => json::accessor::Type::Vec3,
            Sequence::Vec4(_) => json::accessor::Type::Vec4,
        }
    }

    /// Per-component `(min, max)`
    fn bounds(&self) -> (Vec<f32>, Vec<f32>) {
        let components = self.components();
        let mut min = vec![f32::INFINITY; components];
        let mut max = vec![f32::NEG_INFINITY; components];
        for element in self.as_floats().chunks_exact(components) {
            for (i, &value) in element.iter().enumerate() {
                min[i] = min[i].min(value);
                max[i] = max[i].max(value);
            }
        }
        (min, max)
    }
}

/// Accessor allocation contract consumed by the exporter.
///
/// Every call returns a fresh accessor index, increasing monotonically; no
/// deduplication is performed.
pub trait ContainerSerializer {
    fn append_sequence(&mut self, values: Sequence<'_>) -> u32;
}

/// Packs sequences into one buffer and writes the final GLB
#[derive(Debug, Default)]
pub struct GlbBuilder {
    buffer: Vec<u8>,
    views: Vec<json::buffer::View>,
    accessors: Vec<json::Accessor>,
}

impl GlbBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accessor_count(&self) -> usize {
        self.accessors.len()
    }

    /// Size of the packed binary buffer so far
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// Build the document around `animation` and frame it as GLB
    pub fn finish(self, animation: &VrmAnimation) -> Result<Vec<u8>, ExportError> {
        let buffer_length = self.buffer.len();
        let accessor_count = self.accessors.len();
        let root = json::Root {
            accessors: self.accessors,
            animations: vec![build_animation(animation)],
            asset: json::Asset {
                copyright: None,
                extensions: Default::default(),
                extras: Default::default(),
                generator: Some(concat!("vrma-core ", env!("CARGO_PKG_VERSION")).to_string()),
                min_version: None,
                version: "2.0".to_string(),
            },
            buffers: vec![json::Buffer {
                byte_length: buffer_length.into(),
                extensions: Default::default(),
                extras: Default::default(),
                name: None,
                uri: None,
            }],
            buffer_views: self.views,
            cameras: Vec::new(),
            extensions: Default::default(),
            extras: Default::default(),
            extensions_required: Vec::new(),
            extensions_used: vec![EXTENSION_NAME.to_string()],
            images: Vec::new(),
            materials: Vec::new(),
            meshes: Vec::new(),
            nodes: animation.nodes.iter().map(build_node).collect(),
            samplers: Vec::new(),
            scene: Some(json::Index::new(0)),
            scenes: vec![json::Scene {
                extensions: Default::default(),
                extras: Default::default(),
                name: None,
                nodes: animation
                    .scene_roots
                    .iter()
                    .map(|&node| json::Index::new(node))
                    .collect(),
            }],
            skins: Vec::new(),
            textures: Vec::new(),
        };

        // The extension block is not part of gltf-json's model; attach it to
        // the serialized document.
        let mut document = serde_json::to_value(&root)?;
        if let Some(object) = document.as_object_mut() {
            let mut extensions = serde_json::Map::new();
            extensions.insert(
                EXTENSION_NAME.to_string(),
                serde_json::to_value(&animation.extension)?,
            );
            object.insert("extensions".to_string(), serde_json::Value::Object(extensions));
        }
        let json_bytes = serde_json::to_vec(&document)?;

        tracing::debug!(
            "GLB: {} nodes, {} accessors, {} JSON bytes, {} binary bytes",
            animation.nodes.len(),
            accessor_count,
            json_bytes.len(),
            buffer_length
        );

        Ok(assemble_glb(&json_bytes, &self.buffer))
    }
}

impl ContainerSerializer for GlbBuilder {
    fn append_sequence(&mut self, values: Sequence<'_>) -> u32 {
        align_buffer(&mut self.buffer);
        let offset = self.buffer.len();
        self.buffer.extend_from_slice(values.as_bytes());
        let length = self.buffer.len() - offset;

        self.views.push(json::buffer::View {
            buffer: json::Index::new(0),
            byte_length: length.into(),
            byte_offset: Some(offset.into()),
            byte_stride: None,
            extensions: Default::default(),
            extras: Default::default(),
            name: None,
            target: None,
        });

        let (min, max) = if values.is_empty() {
            (None, None)
        } else {
            let (min, max) = values.bounds();
            (Some(float_array(min)), Some(float_array(max)))
        };

        self.accessors.push(json::Accessor {
            buffer_view: Some(json::Index::new(self.views.len() as u32 - 1)),
            byte_offset: Some(0u64.into()),
            count: values.len().into(),
            component_type: Valid(json::accessor::GenericComponentType(
                json::accessor::ComponentType::F32,
            )),
            extensions: Default::default(),
            extras: Default::default(),
            type_: Valid(values.accessor_type()),
            min,
            max,
            name: None,
            normalized: false,
            sparse: None,
        });

        self.accessors.len() as u32 - 1
    }
}

fn float_array(values: Vec<f32>) -> json::Value {
    json::Value::Array(values.into_iter().map(json::Value::from).collect())
}

fn align_buffer(buffer: &mut Vec<u8>) {
    while buffer.len() % 4 != 0 {
        buffer.push(0);
    }
}

fn build_node(node: &SceneNode) -> json::Node {
    json::Node {
        camera: None,
        children: (!node.children.is_empty())
            .then(|| node.children.iter().map(|&c| json::Index::new(c)).collect()),
        extensions: Default::default(),
        extras: Default::default(),
        matrix: None,
        mesh: None,
        name: Some(node.name.clone()),
        rotation: node.rotation.map(json::scene::UnitQuaternion),
        scale: None,
        translation: node.translation,
        skin: None,
        weights: None,
    }
}

fn build_animation(animation: &VrmAnimation) -> json::Animation {
    let mut samplers = Vec::new();
    let mut channels = Vec::new();

    for channel in animation.channels() {
        let sampler = samplers.len() as u32;
        samplers.push(json::animation::Sampler {
            input: json::Index::new(channel.input),
            interpolation: Valid(json::animation::Interpolation::Linear),
            output: json::Index::new(channel.output),
            extensions: Default::default(),
            extras: Default::default(),
        });
        channels.push(build_channel(channel, sampler));
    }

    json::Animation {
        channels,
        extensions: Default::default(),
        extras: Default::default(),
        name: Some(ANIMATION_NAME.to_string()),
        samplers,
    }
}

fn build_channel(channel: &AnimationChannel, sampler: u32) -> json::animation::Channel {
    let path = match channel.path {
        ChannelPath::Translation => json::animation::Property::Translation,
        ChannelPath::Rotation => json::animation::Property::Rotation,
    };
    json::animation::Channel {
        sampler: json::Index::new(sampler),
        target: json::animation::Target {
            node: json::Index::new(channel.node),
            path: Valid(path),
            extensions: Default::default(),
            extras: Default::default(),
        },
        extensions: Default::default(),
        extras: Default::default(),
    }
}

/// Frame a JSON document and binary buffer as GLB 2.0
pub fn assemble_glb(json_bytes: &[u8], buffer_data: &[u8]) -> Vec<u8> {
    // Pad JSON to 4-byte alignment
    let json_padding = (4 - (json_bytes.len() % 4)) % 4;
    let json_chunk_length = json_bytes.len() + json_padding;

    // Pad buffer to 4-byte alignment
    let buffer_padding = (4 - (buffer_data.len() % 4)) % 4;
    let buffer_chunk_length = buffer_data.len() + buffer_padding;

    let total_length = 12 + 8 + json_chunk_length + 8 + buffer_chunk_length;

    let mut glb = Vec::with_capacity(total_length);

    // Header
    glb.extend_from_slice(b"glTF"); // magic
    glb.extend_from_slice(&2u32.to_le_bytes()); // version
    glb.extend_from_slice(&(total_length as u32).to_le_bytes()); // length

    // JSON chunk
    glb.extend_from_slice(&(json_chunk_length as u32).to_le_bytes());
    glb.extend_from_slice(&0x4E4F534Au32.to_le_bytes()); // "JSON"
    glb.extend_from_slice(json_bytes);
    glb.extend(std::iter::repeat_n(0x20u8, json_padding)); // spaces

    // BIN chunk
    glb.extend_from_slice(&(buffer_chunk_length as u32).to_le_bytes());
    glb.extend_from_slice(&0x004E4942u32.to_le_bytes()); // "BIN\0"
    glb.extend_from_slice(buffer_data);
    glb.extend(std::iter::repeat_n(0u8, buffer_padding));

    glb
}
