use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Placement of a scene node in world space.
///
/// Left-handed: local +Z is the forward direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// Rotation given as Euler angles in degrees, applied X then Y then Z.
    pub fn from_euler_degrees(translation: Vec3, rotation: Vec3, scale: Vec3) -> Self {
        let rotation = Quat::from_euler(
            EulerRot::ZYX,
            rotation.z.to_radians(),
            rotation.y.to_radians(),
            rotation.x.to_radians(),
        );
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Places the node at `translation` with its local +Z along `direction`.
    pub fn looking_to(translation: Vec3, direction: Vec3) -> Self {
        let direction = direction.normalize_or_zero();
        let rotation = if direction == Vec3::ZERO {
            Quat::IDENTITY
        } else {
            Quat::from_rotation_arc(Vec3::Z, direction)
        };
        Self {
            translation,
            rotation,
            scale: Vec3::ONE,
        }
    }

    pub fn object_to_world(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    pub fn world_to_object(&self) -> Mat4 {
        self.object_to_world().inverse()
    }

    /// Local origin in world space.
    pub fn world_eye(&self) -> Vec3 {
        self.translation
    }

    /// Local +Z in world space, normalized.
    pub fn world_forward(&self) -> Vec3 {
        (self.rotation * Vec3::Z).normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_to_object_inverts_object_to_world() {
        let transform = Transform::from_euler_degrees(
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(10.0, 20.0, 30.0),
            Vec3::splat(2.0),
        );
        let product = transform.object_to_world() * transform.world_to_object();
        assert!(product.abs_diff_eq(Mat4::IDENTITY, 1e-5));
    }

    #[test]
    fn yaw_turns_forward_towards_x() {
        let transform =
            Transform::from_euler_degrees(Vec3::ZERO, Vec3::new(0.0, 90.0, 0.0), Vec3::ONE);
        assert!(transform.world_forward().abs_diff_eq(Vec3::X, 1e-5));
    }

    #[test]
    fn looking_to_aligns_forward() {
        let direction = Vec3::new(1.0, -1.0, 0.0);
        let transform = Transform::looking_to(Vec3::ONE, direction);
        assert!(transform
            .world_forward()
            .abs_diff_eq(direction.normalize(), 1e-5));
        assert_eq!(transform.world_eye(), Vec3::ONE);
    }
}
