//! vrma-export library
//!
//! glTF host for the `.vrma` exporter: loads avatars and clips from glTF,
//! applies the export config and writes VRM Animation files.

pub mod animation;
pub mod config;
pub mod convert;
pub mod scene;

pub use config::{ExportConfig, load_config, parse_config};
pub use convert::{
    ConvertOptions, ConvertedClip, VRMA_EXT, convert_gltf, convert_gltf_to_memory,
    convert_scene_to_memory, list_gltf,
};
pub use scene::{GltfAvatar, GltfClip, GltfScene};
