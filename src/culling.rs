//! Frustum tests for light bounding volumes.

use glam::{Mat4, Vec3, Vec4};

/// Sphere in object space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }
}

/// Axis-aligned box in object space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box has positive extent along every axis.
    pub fn has_volume(&self) -> bool {
        self.max.cmpgt(self.min).all()
    }
}

/// Six planes `(n, d)` with unit normals pointing into the frustum, in the
/// order left, right, bottom, top, near, far.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewFrustum {
    planes: [Vec4; 6],
}

impl ViewFrustum {
    /// Extracts the planes of `object_to_projection` for a `[0, 1]` clip
    /// depth range. Volumes tested against the frustum are in object space.
    pub fn from_matrix(object_to_projection: &Mat4) -> Self {
        let m = object_to_projection;
        let (r0, r1, r2, r3) = (m.row(0), m.row(1), m.row(2), m.row(3));
        let planes = [r3 + r0, r3 - r0, r3 + r1, r3 - r1, r2, r3 - r2].map(normalize_plane);
        Self { planes }
    }

    pub fn planes(&self) -> &[Vec4; 6] {
        &self.planes
    }

    /// Returns `true` when the sphere lies entirely outside the frustum.
    ///
    /// Spheres without a positive radius are never culled.
    pub fn cull_sphere(&self, sphere: &BoundingSphere) -> bool {
        if !(sphere.radius > 0.0) {
            return false;
        }
        self.planes
            .iter()
            .any(|plane| signed_distance(plane, sphere.center) < -sphere.radius)
    }

    /// Returns `true` when the box lies entirely outside the frustum.
    ///
    /// Boxes that are flat or inverted along any axis are never culled.
    pub fn cull_aabb(&self, aabb: &Aabb) -> bool {
        if !aabb.has_volume() {
            return false;
        }
        self.planes.iter().any(|plane| {
            let normal = plane.truncate();
            let farthest = Vec3::select(normal.cmpge(Vec3::ZERO), aabb.max, aabb.min);
            signed_distance(plane, farthest) < 0.0
        })
    }
}

/// Culls `sphere` against the frustum of `object_to_projection`.
pub fn cull_sphere(object_to_projection: &Mat4, sphere: &BoundingSphere) -> bool {
    ViewFrustum::from_matrix(object_to_projection).cull_sphere(sphere)
}

/// Culls `aabb` against the frustum of `object_to_projection`.
pub fn cull_aabb(object_to_projection: &Mat4, aabb: &Aabb) -> bool {
    ViewFrustum::from_matrix(object_to_projection).cull_aabb(aabb)
}

fn normalize_plane(plane: Vec4) -> Vec4 {
    let length = plane.truncate().length();
    if length > 0.0 {
        plane / length
    } else {
        plane
    }
}

fn signed_distance(plane: &Vec4, point: Vec3) -> f32 {
    plane.truncate().dot(point) + plane.w
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Mat4 {
        let projection = Mat4::perspective_lh(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0);
        let view = Mat4::look_to_lh(Vec3::ZERO, Vec3::Z, Vec3::Y);
        projection * view
    }

    #[test]
    fn sphere_in_front_is_kept() {
        let sphere = BoundingSphere::new(Vec3::new(0.0, 0.0, 10.0), 1.0);
        assert!(!cull_sphere(&camera(), &sphere));
    }

    #[test]
    fn sphere_behind_is_culled() {
        let sphere = BoundingSphere::new(Vec3::new(0.0, 0.0, -10.0), 1.0);
        assert!(cull_sphere(&camera(), &sphere));
    }

    #[test]
    fn sphere_beyond_far_plane_is_culled() {
        let sphere = BoundingSphere::new(Vec3::new(0.0, 0.0, 150.0), 10.0);
        assert!(cull_sphere(&camera(), &sphere));
    }

    #[test]
    fn sphere_straddling_side_plane_is_kept() {
        // 90 degree frustum: the right plane passes through x = z.
        let sphere = BoundingSphere::new(Vec3::new(11.0, 0.0, 10.0), 2.0);
        assert!(!cull_sphere(&camera(), &sphere));
        let outside = BoundingSphere::new(Vec3::new(20.0, 0.0, 10.0), 2.0);
        assert!(cull_sphere(&camera(), &outside));
    }

    #[test]
    fn degenerate_spheres_are_never_culled() {
        for radius in [0.0, -1.0, f32::NAN] {
            let sphere = BoundingSphere::new(Vec3::new(0.0, 0.0, -50.0), radius);
            assert!(!cull_sphere(&camera(), &sphere));
        }
    }

    #[test]
    fn aabb_tests_use_the_nearest_corner() {
        let inside = Aabb::new(Vec3::new(-1.0, -1.0, 5.0), Vec3::new(1.0, 1.0, 6.0));
        assert!(!cull_aabb(&camera(), &inside));
        let behind = Aabb::new(Vec3::new(-1.0, -1.0, -6.0), Vec3::new(1.0, 1.0, -5.0));
        assert!(cull_aabb(&camera(), &behind));
        let straddling = Aabb::new(Vec3::new(-1.0, -1.0, -5.0), Vec3::new(1.0, 1.0, 5.0));
        assert!(!cull_aabb(&camera(), &straddling));
    }

    #[test]
    fn flat_aabb_is_never_culled() {
        let flat = Aabb::new(Vec3::new(-1.0, -1.0, -6.0), Vec3::new(1.0, 1.0, -6.0));
        assert!(!cull_aabb(&camera(), &flat));
    }

    #[test]
    fn object_transform_moves_the_volume() {
        let object_to_world = Mat4::from_translation(Vec3::new(0.0, 0.0, -20.0));
        let sphere = BoundingSphere::new(Vec3::new(0.0, 0.0, 10.0), 1.0);
        assert!(cull_sphere(&(camera() * object_to_world), &sphere));
    }
}
