//! VRM Animation (`.vrma`) export core
//!
//! Bakes a humanoid animation clip into a standalone glTF 2.0 binary that
//! carries the `VRMC_vrm_animation` extension. The host application supplies
//! its skeleton through [`SkeletonProvider`] and its clip through
//! [`ClipSource`]; everything past that point (resampling, coordinate
//! conversion, expression mapping, GLB layout) lives here.

pub mod artifact;
pub mod bone;
pub mod container;
pub mod coords;
pub mod curve;
pub mod error;
pub mod export;
pub mod expression;
pub mod extension;
pub mod pose;
pub mod resample;
pub mod skeleton;
pub mod track;

pub use artifact::{AnimationChannel, ChannelPath, SceneNode, VrmAnimation};
pub use bone::{BoneHierarchy, HumanoidBone};
pub use container::{ContainerSerializer, GlbBuilder, Sequence};
pub use curve::{Curve, CurveBinding, Interpolation, Keyframe};
pub use error::ExportError;
pub use export::{Exporter, export_vrma};
pub use expression::{ExpressionKey, ExpressionMap, ExpressionPreset};
pub use extension::VrmAnimationExtension;
pub use pose::{ClipSource, JointPose, PoseEvaluator, PoseHandle, PoseSnapshot};
pub use resample::{SAMPLE_RATE, frame_count};
pub use skeleton::{BoneHandle, Skeleton, SkeletonProvider, SkeletonSource};
