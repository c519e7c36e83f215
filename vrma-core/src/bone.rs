//! Canonical humanoid bone vocabulary and parent table
//!
//! The vocabulary is the VRM 1.0 humanoid: 55 joints, each with a fixed
//! canonical parent. The parent table is a plain value (`BoneHierarchy`) that
//! callers inject into the exporter; nothing here is global mutable state.

use serde::{Deserialize, Serialize};

use crate::error::ExportError;

macro_rules! humanoid_bones {
    ($($variant:ident => $name:literal,)*) => {
        /// A joint of the canonical humanoid skeleton.
        ///
        /// Ordering follows declaration order, which is also the order bones
        /// are emitted in (nodes, channels, accessors).
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        #[repr(u8)]
        pub enum HumanoidBone {
            $($variant,)*
        }

        impl HumanoidBone {
            /// Every bone in canonical order
            pub const ALL: &'static [HumanoidBone] = &[$(HumanoidBone::$variant,)*];

            /// VRM name of the bone (camelCase, e.g. `leftUpperArm`)
            pub const fn name(self) -> &'static str {
                match self {
                    $(HumanoidBone::$variant => $name,)*
                }
            }
        }
    };
}

humanoid_bones! {
    Hips => "hips",
    Spine => "spine",
    Chest => "chest",
    UpperChest => "upperChest",
    Neck => "neck",
    Head => "head",
    LeftEye => "leftEye",
    RightEye => "rightEye",
    Jaw => "jaw",
    LeftUpperLeg => "leftUpperLeg",
    LeftLowerLeg => "leftLowerLeg",
    LeftFoot => "leftFoot",
    LeftToes => "leftToes",
    RightUpperLeg => "rightUpperLeg",
    RightLowerLeg => "rightLowerLeg",
    RightFoot => "rightFoot",
    RightToes => "rightToes",
    LeftShoulder => "leftShoulder",
    LeftUpperArm => "leftUpperArm",
    LeftLowerArm => "leftLowerArm",
    LeftHand => "leftHand",
    RightShoulder => "rightShoulder",
    RightUpperArm => "rightUpperArm",
    RightLowerArm => "rightLowerArm",
    RightHand => "rightHand",
    LeftThumbMetacarpal => "leftThumbMetacarpal",
    LeftThumbProximal => "leftThumbProximal",
    LeftThumbDistal => "leftThumbDistal",
    LeftIndexProximal => "leftIndexProximal",
    LeftIndexIntermediate => "leftIndexIntermediate",
    LeftIndexDistal => "leftIndexDistal",
    LeftMiddleProximal => "leftMiddleProximal",
    LeftMiddleIntermediate => "leftMiddleIntermediate",
    LeftMiddleDistal => "leftMiddleDistal",
    LeftRingProximal => "leftRingProximal",
    LeftRingIntermediate => "leftRingIntermediate",
    LeftRingDistal => "leftRingDistal",
    LeftLittleProximal => "leftLittleProximal",
    LeftLittleIntermediate => "leftLittleIntermediate",
    LeftLittleDistal => "leftLittleDistal",
    RightThumbMetacarpal => "rightThumbMetacarpal",
    RightThumbProximal => "rightThumbProximal",
    RightThumbDistal => "rightThumbDistal",
    RightIndexProximal => "rightIndexProximal",
    RightIndexIntermediate => "rightIndexIntermediate",
    RightIndexDistal => "rightIndexDistal",
    RightMiddleProximal => "rightMiddleProximal",
    RightMiddleIntermediate => "rightMiddleIntermediate",
    RightMiddleDistal => "rightMiddleDistal",
    RightRingProximal => "rightRingProximal",
    RightRingIntermediate => "rightRingIntermediate",
    RightRingDistal => "rightRingDistal",
    RightLittleProximal => "rightLittleProximal",
    RightLittleIntermediate => "rightLittleIntermediate",
    RightLittleDistal => "rightLittleDistal",
}

impl HumanoidBone {
    /// Number of canonical bones
    pub const COUNT: usize = Self::ALL.len();

    /// The root joint of every humanoid skeleton
    pub const ROOT: HumanoidBone = HumanoidBone::Hips;

    /// Dense index in `0..COUNT`
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Look up a bone by its VRM name, ignoring ASCII case
    /// (`"LeftUpperArm"`, `"leftupperarm"` and `"leftUpperArm"` all match).
    pub fn from_name_ignore_case(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|bone| bone.name().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for HumanoidBone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Canonical parent of each bone as defined by VRM 1.0.
const fn vrm_parent(bone: HumanoidBone) -> Option<HumanoidBone> {
    use HumanoidBone::*;
    let parent = match bone {
        Hips => return None,
        Spine => Hips,
        Chest => Spine,
        UpperChest => Chest,
        Neck => UpperChest,
        Head => Neck,
        LeftEye | RightEye | Jaw => Head,

        LeftUpperLeg => Hips,
        LeftLowerLeg => LeftUpperLeg,
        LeftFoot => LeftLowerLeg,
        LeftToes => LeftFoot,
        RightUpperLeg => Hips,
        RightLowerLeg => RightUpperLeg,
        RightFoot => RightLowerLeg,
        RightToes => RightFoot,

        LeftShoulder => UpperChest,
        LeftUpperArm => LeftShoulder,
        LeftLowerArm => LeftUpperArm,
        LeftHand => LeftLowerArm,
        RightShoulder => UpperChest,
        RightUpperArm => RightShoulder,
        RightLowerArm => RightUpperArm,
        RightHand => RightLowerArm,

        LeftThumbMetacarpal => LeftHand,
        LeftThumbProximal => LeftThumbMetacarpal,
        LeftThumbDistal => LeftThumbProximal,
        LeftIndexProximal => LeftHand,
        LeftIndexIntermediate => LeftIndexProximal,
        LeftIndexDistal => LeftIndexIntermediate,
        LeftMiddleProximal => LeftHand,
        LeftMiddleIntermediate => LeftMiddleProximal,
        LeftMiddleDistal => LeftMiddleIntermediate,
        LeftRingProximal => LeftHand,
        LeftRingIntermediate => LeftRingProximal,
        LeftRingDistal => LeftRingIntermediate,
        LeftLittleProximal => LeftHand,
        LeftLittleIntermediate => LeftLittleProximal,
        LeftLittleDistal => LeftLittleIntermediate,

        RightThumbMetacarpal => RightHand,
        RightThumbProximal => RightThumbMetacarpal,
        RightThumbDistal => RightThumbProximal,
        RightIndexProximal => RightHand,
        RightIndexIntermediate => RightIndexProximal,
        RightIndexDistal => RightIndexIntermediate,
        RightMiddleProximal => RightHand,
        RightMiddleIntermediate => RightMiddleProximal,
        RightMiddleDistal => RightMiddleIntermediate,
        RightRingProximal => RightHand,
        RightRingIntermediate => RightRingProximal,
        RightRingDistal => RightRingIntermediate,
        RightLittleProximal => RightHand,
        RightLittleIntermediate => RightLittleProximal,
        RightLittleDistal => RightLittleIntermediate,
    };
    Some(parent)
}

/// Immutable canonical parent table.
///
/// Invariants (checked on construction): the root has no parent, and every
/// other bone's parent chain reaches the root without revisiting a bone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoneHierarchy {
    parents: [Option<HumanoidBone>; HumanoidBone::COUNT],
}

impl BoneHierarchy {
    /// The VRM 1.0 humanoid hierarchy
    pub fn vrm() -> Self {
        let mut parents = [None; HumanoidBone::COUNT];
        for &bone in HumanoidBone::ALL {
            parents[bone.index()] = vrm_parent(bone);
        }
        Self { parents }
    }

    /// Build a hierarchy from an explicit parent table indexed by
    /// [`HumanoidBone::index`].
    pub fn new(parents: [Option<HumanoidBone>; HumanoidBone::COUNT]) -> Result<Self, ExportError> {
        let hierarchy = Self { parents };
        hierarchy.validate()?;
        Ok(hierarchy)
    }

    /// Return a copy with one parent entry replaced.
    pub fn with_parent(
        mut self,
        bone: HumanoidBone,
        parent: Option<HumanoidBone>,
    ) -> Result<Self, ExportError> {
        self.parents[bone.index()] = parent;
        self.validate()?;
        Ok(self)
    }

    /// Canonical parent of `bone` (`None` only for the root)
    pub fn parent(&self, bone: HumanoidBone) -> Option<HumanoidBone> {
        self.parents[bone.index()]
    }

    /// Iterate the canonical ancestors of `bone`, nearest first, ending at the root.
    pub fn ancestors(&self, bone: HumanoidBone) -> impl Iterator<Item = HumanoidBone> + '_ {
        std::iter::successors(self.parent(bone), move |&current| self.parent(current))
    }

    fn validate(&self) -> Result<(), ExportError> {
        if self.parent(HumanoidBone::ROOT).is_some() {
            return Err(ExportError::InvalidHierarchy {
                bone: HumanoidBone::ROOT,
                reason: "the root bone must not have a parent",
            });
        }

        for &bone in HumanoidBone::ALL {
            if bone == HumanoidBone::ROOT {
                continue;
            }
            let mut current = bone;
            let mut steps = 0;
            loop {
                let Some(parent) = self.parent(current) else {
                    return Err(ExportError::InvalidHierarchy {
                        bone,
                        reason: "parent chain does not reach the root bone",
                    });
                };
                if parent == HumanoidBone::ROOT {
                    break;
                }
                steps += 1;
                if steps > HumanoidBone::COUNT {
                    return Err(ExportError::InvalidHierarchy {
                        bone,
                        reason: "parent chain contains a cycle",
                    });
                }
                current = parent;
            }
        }
        Ok(())
    }
}

impl Default for BoneHierarchy {
    fn default() -> Self {
        Self::vrm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bone_count() {
        assert_eq!(HumanoidBone::COUNT, 55);
        for (i, bone) in HumanoidBone::ALL.iter().enumerate() {
            assert_eq!(bone.index(), i);
        }
    }

    #[test]
    fn test_names_match_serde() {
        for &bone in HumanoidBone::ALL {
            let json = serde_json::to_string(&bone).unwrap();
            assert_eq!(json, format!("\"{}\"", bone.name()));
        }
    }

    #[test]
    fn test_from_name_ignore_case() {
        assert_eq!(
            HumanoidBone::from_name_ignore_case("LeftUpperArm"),
            Some(HumanoidBone::LeftUpperArm)
        );
        assert_eq!(
            HumanoidBone::from_name_ignore_case("HIPS"),
            Some(HumanoidBone::Hips)
        );
        assert_eq!(HumanoidBone::from_name_ignore_case("tail"), None);
    }

    #[test]
    fn test_vrm_hierarchy_is_valid() {
        let hierarchy = BoneHierarchy::vrm();
        assert!(hierarchy.validate().is_ok());
        assert_eq!(hierarchy.parent(HumanoidBone::Hips), None);
        assert_eq!(
            hierarchy.parent(HumanoidBone::LeftShoulder),
            Some(HumanoidBone::UpperChest)
        );
    }

    #[test]
    fn test_ancestors_end_at_root() {
        let hierarchy = BoneHierarchy::vrm();
        let chain: Vec<_> = hierarchy.ancestors(HumanoidBone::LeftHand).collect();
        assert_eq!(
            chain,
            vec![
                HumanoidBone::LeftLowerArm,
                HumanoidBone::LeftUpperArm,
                HumanoidBone::LeftShoulder,
                HumanoidBone::UpperChest,
                HumanoidBone::Chest,
                HumanoidBone::Spine,
                HumanoidBone::Hips,
            ]
        );
    }

    #[test]
    fn test_with_parent_rejects_cycle() {
        let result = BoneHierarchy::vrm().with_parent(HumanoidBone::Spine, Some(HumanoidBone::Chest));
        assert!(matches!(
            result,
            Err(ExportError::InvalidHierarchy { .. })
        ));
    }

    #[test]
    fn test_with_parent_rejects_root_parent() {
        let result = BoneHierarchy::vrm().with_parent(HumanoidBone::Hips, Some(HumanoidBone::Spine));
        assert!(matches!(
            result,
            Err(ExportError::InvalidHierarchy {
                bone: HumanoidBone::Hips,
                ..
            })
        ));
    }

    #[test]
    fn test_with_parent_accepts_reparent() {
        let hierarchy = BoneHierarchy::vrm()
            .with_parent(HumanoidBone::LeftShoulder, Some(HumanoidBone::Chest))
            .unwrap();
        assert_eq!(
            hierarchy.parent(HumanoidBone::LeftShoulder),
            Some(HumanoidBone::Chest)
        );
    }
}
