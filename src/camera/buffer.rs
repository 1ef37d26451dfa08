use std::mem::size_of;

use bytemuck::{Pod, Zeroable};

use super::viewport::AntiAliasing;
use super::voxelization::VoxelizationSettings;
use super::Camera;
use crate::transform::Transform;

/// Per-camera constants shared by all passes of a frame.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CameraBuffer {
    pub world_to_camera: [[f32; 4]; 4],
    pub camera_to_projection: [[f32; 4]; 4],
    pub projection_to_camera: [[f32; 4]; 4],
    pub camera_to_world: [[f32; 4]; 4],

    pub viewport_top_left: [u32; 2],
    pub viewport_resolution: [u32; 2],
    pub ss_viewport_top_left: [u32; 2],
    pub ss_viewport_resolution: [u32; 2],
    pub viewport_inv_resolution_minus1: [f32; 2],
    pub ss_viewport_inv_resolution_minus1: [f32; 2],

    pub fog_color: [f32; 3],
    pub fog_density: f32,

    pub voxel_grid_center: [f32; 3],
    pub voxel_grid_resolution: u32,
    pub voxel_grid_inv_resolution: f32,
    pub voxel_size: f32,
    pub voxel_inv_size: f32,
    pub voxel_texture_max_mip_level: u32,
    pub nb_cones: u32,
    pub cone_step_multiplier: f32,
    pub max_cone_distance: f32,
    pub sky_dome_scale_z: f32,

    pub lens_radius: f32,
    pub focal_length: f32,
    pub max_coc_radius: f32,
    pub inv_gamma: f32,
}

const _: () = assert!(size_of::<CameraBuffer>() == 384);

impl CameraBuffer {
    /// Packs `camera`, placed by `transform`, for the current frame.
    pub fn compose(
        camera: &Camera,
        transform: &Transform,
        aa: AntiAliasing,
        voxelization: &VoxelizationSettings,
    ) -> Self {
        let camera_to_projection = camera.camera_to_projection();
        let viewport = camera.viewport;
        let ss_viewport = viewport.supersampled(aa);
        let settings = &camera.settings;

        Self {
            world_to_camera: transform.world_to_object().to_cols_array_2d(),
            camera_to_projection: camera_to_projection.to_cols_array_2d(),
            projection_to_camera: camera_to_projection.inverse().to_cols_array_2d(),
            camera_to_world: transform.object_to_world().to_cols_array_2d(),

            viewport_top_left: viewport.top_left.to_array(),
            viewport_resolution: viewport.size.to_array(),
            ss_viewport_top_left: ss_viewport.top_left.to_array(),
            ss_viewport_resolution: ss_viewport.size.to_array(),
            viewport_inv_resolution_minus1: viewport.inv_resolution_minus1(),
            ss_viewport_inv_resolution_minus1: ss_viewport.inv_resolution_minus1(),

            fog_color: settings.fog.base_color.to_array(),
            fog_density: settings.fog.density,

            voxel_grid_center: voxelization.grid_center.to_array(),
            voxel_grid_resolution: voxelization.grid_resolution,
            voxel_grid_inv_resolution: voxelization.grid_inv_resolution(),
            voxel_size: voxelization.voxel_size,
            voxel_inv_size: voxelization.voxel_inv_size(),
            voxel_texture_max_mip_level: voxelization.max_mip_level(),
            nb_cones: settings.vct.nb_cones,
            cone_step_multiplier: settings.vct.cone_step_multiplier,
            max_cone_distance: settings.vct.max_cone_distance,
            sky_dome_scale_z: settings.sky.scale_z,

            lens_radius: camera.lens.radius,
            focal_length: camera.lens.focal_length,
            max_coc_radius: camera.lens.max_coc_radius,
            inv_gamma: 1.0 / settings.gamma,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Viewport;
    use glam::{Mat4, Vec3};

    #[test]
    fn inverse_resolution_terms_exclude_the_last_pixel() {
        let camera = Camera {
            viewport: Viewport::new(1920, 1080),
            ..Camera::default()
        };
        let buffer = CameraBuffer::compose(
            &camera,
            &Transform::IDENTITY,
            AntiAliasing::None,
            &VoxelizationSettings::default(),
        );
        assert_eq!(buffer.viewport_resolution, [1920, 1080]);
        assert_eq!(
            buffer.viewport_inv_resolution_minus1,
            [1.0 / 1919.0, 1.0 / 1079.0]
        );
        assert_eq!(
            buffer.ss_viewport_inv_resolution_minus1,
            buffer.viewport_inv_resolution_minus1
        );
    }

    #[test]
    fn supersampled_viewport_uses_the_multiplier() {
        let camera = Camera {
            viewport: Viewport::new(800, 600),
            ..Camera::default()
        };
        let buffer = CameraBuffer::compose(
            &camera,
            &Transform::IDENTITY,
            AntiAliasing::Ssaa2x,
            &VoxelizationSettings::default(),
        );
        assert_eq!(buffer.ss_viewport_resolution, [1600, 1200]);
        assert_eq!(
            buffer.ss_viewport_inv_resolution_minus1,
            [1.0 / 1599.0, 1.0 / 1199.0]
        );
    }

    #[test]
    fn matrices_and_voxel_terms() {
        let camera = Camera::default();
        let transform = Transform::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let voxelization = VoxelizationSettings {
            grid_center: Vec3::new(0.0, 1.0, 0.0),
            grid_resolution: 64,
            voxel_size: 0.25,
        };
        let buffer = CameraBuffer::compose(&camera, &transform, AntiAliasing::None, &voxelization);

        let world_to_camera = Mat4::from_cols_array_2d(&buffer.world_to_camera);
        assert!(world_to_camera
            .transform_point3(Vec3::new(1.0, 2.0, 3.0))
            .abs_diff_eq(Vec3::ZERO, 1e-6));
        let camera_to_world = Mat4::from_cols_array_2d(&buffer.camera_to_world);
        assert!((camera_to_world * world_to_camera).abs_diff_eq(Mat4::IDENTITY, 1e-6));

        assert_eq!(buffer.voxel_grid_resolution, 64);
        assert_eq!(buffer.voxel_grid_inv_resolution, 1.0 / 64.0);
        assert_eq!(buffer.voxel_inv_size, 4.0);
        assert_eq!(buffer.voxel_texture_max_mip_level, 6);
        assert!((buffer.inv_gamma - 1.0 / 2.2).abs() < 1e-6);
    }
}
