//! Binary data packing for GLTF buffers.

use super::rig_data::{AnimationData, RigData};
use gltf_json as json;
use json::validation::Checked::Valid;

/// Accessor indices of the packed data
pub(crate) struct AccessorIndices {
    pub positions: u32,
    pub targets: Vec<u32>,
    pub times: u32,
    pub hips_translations: u32,
    pub hips_rotations: u32,
    pub spine_rotations: u32,
    pub weights: u32,
}

pub(crate) struct PackedData {
    pub buffer: Vec<u8>,
    pub views: Vec<json::buffer::View>,
    pub accessors: Vec<json::Accessor>,
    pub indices: AccessorIndices,
}

struct Packer {
    buffer: Vec<u8>,
    views: Vec<json::buffer::View>,
    accessors: Vec<json::Accessor>,
}

impl Packer {
    /// Append `components`-wide float elements, return the accessor index
    fn push(
        &mut self,
        values: &[f32],
        components: usize,
        type_: json::accessor::Type,
        target: Option<json::buffer::Target>,
    ) -> u32 {
        // Align buffer to 4 bytes
        while !self.buffer.len().is_multiple_of(4) {
            self.buffer.push(0);
        }

        let offset = self.buffer.len();
        self.buffer.extend_from_slice(bytemuck::cast_slice(values));
        let length = self.buffer.len() - offset;
        self.views.push(json::buffer::View {
            buffer: json::Index::new(0),
            byte_length: length.into(),
            byte_offset: Some(offset.into()),
            byte_stride: None,
            extensions: Default::default(),
            extras: Default::default(),
            name: None,
            target: target.map(Valid),
        });

        let (min, max) = compute_bounds(values, components);
        self.accessors.push(json::Accessor {
            buffer_view: Some(json::Index::new(self.views.len() as u32 - 1)),
            byte_offset: Some(0u64.into()),
            count: (values.len() / components).into(),
            component_type: Valid(json::accessor::GenericComponentType(
                json::accessor::ComponentType::F32,
            )),
            extensions: Default::default(),
            extras: Default::default(),
            type_: Valid(type_),
            min: Some(json::Value::Array(
                min.into_iter().map(json::Value::from).collect(),
            )),
            max: Some(json::Value::Array(
                max.into_iter().map(json::Value::from).collect(),
            )),
            name: None,
            normalized: false,
            sparse: None,
        });
        self.accessors.len() as u32 - 1
    }
}

fn compute_bounds(values: &[f32], components: usize) -> (Vec<f32>, Vec<f32>) {
    let mut min = vec![f32::MAX; components];
    let mut max = vec![f32::MIN; components];
    for element in values.chunks_exact(components) {
        for (i, &v) in element.iter().enumerate() {
            min[i] = min[i].min(v);
            max[i] = max[i].max(v);
        }
    }
    (min, max)
}

/// Pack all binary data into a single buffer
pub(crate) fn pack_binary_data(rig: &RigData, animation: &AnimationData) -> PackedData {
    use json::accessor::Type;
    use json::buffer::Target;

    let mut packer = Packer {
        buffer: Vec::new(),
        views: Vec::new(),
        accessors: Vec::new(),
    };

    // --- Mesh data ---
    let positions = packer.push(
        bytemuck::cast_slice(&rig.positions),
        3,
        Type::Vec3,
        Some(Target::ArrayBuffer),
    );
    let targets = rig
        .target_deltas
        .iter()
        .map(|deltas| {
            packer.push(
                bytemuck::cast_slice(deltas),
                3,
                Type::Vec3,
                Some(Target::ArrayBuffer),
            )
        })
        .collect();

    // --- Animation data ---
    let times = packer.push(&animation.times, 1, Type::Scalar, None);
    let hips_translations = packer.push(
        bytemuck::cast_slice(&animation.hips_translations),
        3,
        Type::Vec3,
        None,
    );
    let hips_rotations = packer.push(
        bytemuck::cast_slice(&animation.hips_rotations),
        4,
        Type::Vec4,
        None,
    );
    let spine_rotations = packer.push(
        bytemuck::cast_slice(&animation.spine_rotations),
        4,
        Type::Vec4,
        None,
    );
    let weights = packer.push(&animation.weights, 1, Type::Scalar, None);

    PackedData {
        buffer: packer.buffer,
        views: packer.views,
        accessors: packer.accessors,
        indices: AccessorIndices {
            positions,
            targets,
            times,
            hips_translations,
            hips_rotations,
            spine_rotations,
            weights,
        },
    }
}
