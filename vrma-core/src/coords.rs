//! Host -> interchange coordinate conversion
//!
//! Positions mirror X only; rotations negate the Y and Z imaginary parts
//! only. Both are fixed output conventions and must be kept exactly as is.

use glam::{Mat4, Quat, Vec3};

/// Root-relative position of the root joint.
///
/// `world_to_local` is the designated root transform's world-to-local
/// matrix, `world_position` the root joint's world position.
pub fn convert_position(world_to_local: Mat4, world_position: Vec3) -> Vec3 {
    let p = world_to_local.transform_point3(world_position);
    Vec3::new(-p.x, p.y, p.z)
}

/// Parent-relative rotation of a bone.
///
/// `parent` is the world rotation of the bone's effective parent (not
/// necessarily its direct host parent), `rotation` the bone's own.
pub fn convert_rotation(parent: Quat, rotation: Quat) -> Quat {
    let q = parent.inverse() * rotation;
    Quat::from_xyzw(q.x, -q.y, -q.z, q.w)
}
