//! Export errors

use crate::bone::HumanoidBone;

/// Failure of an export call.
///
/// Unresolvable expression channels are not errors: they are dropped from
/// the output. Clip validity (duration, humanoid compatibility) is the
/// caller's responsibility and is not re-checked here.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The root joint (hips) is absent from the provided skeleton.
    /// Raised before any buffer is allocated.
    #[error("humanoid root bone '{}' is missing from the skeleton", HumanoidBone::ROOT)]
    MissingRootBone,

    /// An injected parent table violates the hierarchy invariants
    #[error("invalid bone hierarchy at '{bone}': {reason}")]
    InvalidHierarchy {
        bone: HumanoidBone,
        reason: &'static str,
    },

    /// glTF JSON encoding failed
    #[error("failed to encode glTF JSON: {0}")]
    Serialize(#[from] serde_json::Error),
}
