use std::f32::consts::{FRAC_PI_2, PI};

use glam::{Mat4, Vec3};

/// Transforms used to render one shadow map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightCamera {
    pub world_to_lview: Mat4,
    pub lview_to_lprojection: Mat4,
    pub world_to_lprojection: Mat4,
}

impl LightCamera {
    pub fn new(world_to_lview: Mat4, lview_to_lprojection: Mat4) -> Self {
        Self {
            world_to_lview,
            lview_to_lprojection,
            world_to_lprojection: lview_to_lprojection * world_to_lview,
        }
    }

    /// Direction the camera looks along, in world space.
    pub fn world_forward(&self) -> Vec3 {
        self.world_to_lview
            .inverse()
            .transform_vector3(Vec3::Z)
            .normalize()
    }
}

/// Cube face order of omni shadow maps.
pub const OMNI_FACE_DIRECTIONS: [Vec3; 6] = [
    Vec3::X,
    Vec3::NEG_X,
    Vec3::Y,
    Vec3::NEG_Y,
    Vec3::Z,
    Vec3::NEG_Z,
];

/// Rotations taking the light's local frame to each cube face view, so that
/// `OMNI_FACE_DIRECTIONS[i]` ends up along +Z.
pub fn omni_face_rotations() -> [Mat4; 6] {
    [
        Mat4::from_rotation_y(-FRAC_PI_2),
        Mat4::from_rotation_y(FRAC_PI_2),
        Mat4::from_rotation_x(FRAC_PI_2),
        Mat4::from_rotation_x(-FRAC_PI_2),
        Mat4::IDENTITY,
        Mat4::from_rotation_y(PI),
    ]
}

/// Six cameras, one per cube face in [`OMNI_FACE_DIRECTIONS`] order.
pub fn omni_face_cameras(world_to_lview: Mat4, lview_to_lprojection: Mat4) -> [LightCamera; 6] {
    omni_face_rotations()
        .map(|rotation| LightCamera::new(rotation * world_to_lview, lview_to_lprojection))
}
