//! Light sources as seen from their own local frame.
//!
//! Lights carry no placement; a [`crate::scene::LightNode`] pairs them with a
//! [`crate::transform::Transform`].

use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::culling::{Aabb, BoundingSphere};

/// Near plane of perspective shadow cameras.
pub const SHADOW_CAMERA_NEAR: f32 = 0.1;

/// Distance range over which a light fades out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceFalloff {
    pub start: f32,
    pub end: f32,
}

impl DistanceFalloff {
    pub fn new(start: f32, end: f32) -> Self {
        Self { start, end }
    }

    pub fn range(&self) -> f32 {
        self.end - self.start
    }
}

impl Default for DistanceFalloff {
    fn default() -> Self {
        Self::new(0.0, 1.0)
    }
}

/// Extent of the orthographic camera used to render a directional shadow map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrthographicExtent {
    pub width: f32,
    pub height: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for OrthographicExtent {
    fn default() -> Self {
        Self {
            width: 20.0,
            height: 20.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

/// Light arriving along the local +Z axis from infinitely far away.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLight {
    /// Radiant intensity per RGB channel.
    pub intensity: Vec3,
    pub shadow_extent: OrthographicExtent,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            intensity: Vec3::ONE,
            shadow_extent: OrthographicExtent::default(),
        }
    }
}

impl DirectionalLight {
    pub fn new(intensity: Vec3) -> Self {
        Self {
            intensity,
            ..Self::default()
        }
    }

    pub fn view_to_projection(&self) -> Mat4 {
        let OrthographicExtent {
            width,
            height,
            near,
            far,
        } = self.shadow_extent;
        Mat4::orthographic_lh(
            -0.5 * width,
            0.5 * width,
            -0.5 * height,
            0.5 * height,
            near,
            far,
        )
    }
}

/// Point light radiating in all directions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OmniLight {
    pub intensity: Vec3,
    pub falloff: DistanceFalloff,
}

impl Default for OmniLight {
    fn default() -> Self {
        Self {
            intensity: Vec3::ONE,
            falloff: DistanceFalloff::default(),
        }
    }
}

impl OmniLight {
    pub fn new(intensity: Vec3, falloff: DistanceFalloff) -> Self {
        Self { intensity, falloff }
    }

    /// Sphere around the light origin beyond which the light has no effect.
    pub fn bounding_sphere(&self) -> BoundingSphere {
        BoundingSphere::new(Vec3::ZERO, self.falloff.end)
    }

    /// Projection shared by the six cube faces.
    pub fn view_to_projection(&self) -> Mat4 {
        Mat4::perspective_lh(FRAC_PI_2, 1.0, SHADOW_CAMERA_NEAR, self.falloff.end)
    }
}

/// Cone light shining along the local +Z axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpotLight {
    pub intensity: Vec3,
    pub exponent_property: f32,
    pub falloff: DistanceFalloff,
    /// Cosine of the angle where the angular falloff starts.
    pub cos_penumbra: f32,
    /// Cosine of the angle where the light is fully cut off.
    pub cos_umbra: f32,
}

impl Default for SpotLight {
    fn default() -> Self {
        Self::new(
            Vec3::ONE,
            1.0,
            DistanceFalloff::default(),
            std::f32::consts::FRAC_PI_8,
            std::f32::consts::FRAC_PI_4,
        )
    }
}

impl SpotLight {
    /// Angles are half-angles of the cone, in radians.
    pub fn new(
        intensity: Vec3,
        exponent_property: f32,
        falloff: DistanceFalloff,
        penumbra: f32,
        umbra: f32,
    ) -> Self {
        Self {
            intensity,
            exponent_property,
            falloff,
            cos_penumbra: penumbra.cos(),
            cos_umbra: umbra.cos(),
        }
    }

    pub fn umbra_angle(&self) -> f32 {
        self.cos_umbra.clamp(-1.0, 1.0).acos()
    }

    pub fn angular_range(&self) -> f32 {
        self.cos_penumbra - self.cos_umbra
    }

    /// Box enclosing the lit cone in light space.
    pub fn aabb(&self) -> Aabb {
        let end = self.falloff.end;
        let a = end * self.umbra_angle().tan();
        Aabb::new(Vec3::new(-a, -a, 0.0), Vec3::new(a, a, end))
    }

    pub fn view_to_projection(&self) -> Mat4 {
        Mat4::perspective_lh(
            2.0 * self.umbra_angle(),
            1.0,
            SHADOW_CAMERA_NEAR,
            self.falloff.end,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omni_bounds_follow_falloff_end() {
        let light = OmniLight::new(Vec3::ONE, DistanceFalloff::new(1.0, 7.5));
        assert_eq!(light.bounding_sphere().radius, 7.5);
        assert_eq!(light.falloff.range(), 6.5);
    }

    #[test]
    fn spot_aabb_encloses_cone() {
        let light = SpotLight::new(
            Vec3::ONE,
            1.0,
            DistanceFalloff::new(0.0, 10.0),
            0.3,
            std::f32::consts::FRAC_PI_4,
        );
        let aabb = light.aabb();
        assert!((aabb.max.x - 10.0).abs() < 1e-4);
        assert_eq!(aabb.min.z, 0.0);
        assert_eq!(aabb.max.z, 10.0);
        assert!(light.angular_range() > 0.0);
    }

    #[test]
    fn spot_projection_maps_cone_edge_to_clip_edge() {
        let light = SpotLight::new(
            Vec3::ONE,
            1.0,
            DistanceFalloff::new(0.0, 10.0),
            0.3,
            std::f32::consts::FRAC_PI_4,
        );
        let clip = light.view_to_projection() * Vec3::new(5.0, 0.0, 5.0).extend(1.0);
        assert!((clip.x / clip.w - 1.0).abs() < 1e-4);
    }

    #[test]
    fn directional_projection_is_centered() {
        let light = DirectionalLight::default();
        let clip = light.view_to_projection().project_point3(Vec3::new(0.0, 0.0, 0.1));
        assert!(clip.abs_diff_eq(Vec3::ZERO, 1e-5));
    }
}
