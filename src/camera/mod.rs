//! Cameras and the per-camera constant buffer.

pub mod buffer;
pub mod settings;
pub mod viewport;
pub mod voxelization;

use glam::Mat4;
use serde::{Deserialize, Serialize};

use crate::render::{ConstantBuffer, RenderDevice, RenderError, ShaderStage, SLOT_CBUFFER_CAMERA};
use crate::transform::Transform;

pub use buffer::CameraBuffer;
pub use settings::{
    Brdf, CameraSettings, FogSettings, RenderLayer, RenderLayers, RenderMode, SkySettings,
    VoxelConeTracingSettings,
};
pub use viewport::{AntiAliasing, Viewport};
pub use voxelization::VoxelizationSettings;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClippingPlanes {
    pub near: f32,
    pub far: f32,
}

impl Default for ClippingPlanes {
    fn default() -> Self {
        Self {
            near: 0.01,
            far: 100.0,
        }
    }
}

/// Thin-lens parameters used by depth of field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lens {
    pub radius: f32,
    pub focal_length: f32,
    /// Upper bound of the circle of confusion, in pixels.
    pub max_coc_radius: f32,
}

impl Default for Lens {
    fn default() -> Self {
        Self {
            radius: 0.0,
            focal_length: 3.0,
            max_coc_radius: 8.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Projection {
    /// Vertical field of view in radians; the aspect ratio follows the viewport.
    Perspective { fov_y: f32 },
    Orthographic { width: f32, height: f32 },
}

impl Default for Projection {
    fn default() -> Self {
        Projection::Perspective {
            fov_y: std::f32::consts::FRAC_PI_4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Camera {
    pub projection: Projection,
    pub clipping_planes: ClippingPlanes,
    pub lens: Lens,
    pub viewport: Viewport,
    pub settings: CameraSettings,
}

impl Camera {
    pub fn camera_to_projection(&self) -> Mat4 {
        let ClippingPlanes { near, far } = self.clipping_planes;
        match self.projection {
            Projection::Perspective { fov_y } => {
                Mat4::perspective_lh(fov_y, self.viewport.aspect_ratio(), near, far)
            }
            Projection::Orthographic { width, height } => Mat4::orthographic_lh(
                -0.5 * width,
                0.5 * width,
                -0.5 * height,
                0.5 * height,
                near,
                far,
            ),
        }
    }

    pub fn projection_to_camera(&self) -> Mat4 {
        self.camera_to_projection().inverse()
    }

    /// Composes the camera buffer, uploads it into `buffer` and binds it to
    /// the camera slot of every stage.
    pub fn update_buffer<D: RenderDevice + ?Sized>(
        &self,
        device: &mut D,
        buffer: &ConstantBuffer<CameraBuffer>,
        transform: &Transform,
        aa: AntiAliasing,
        voxelization: &VoxelizationSettings,
    ) -> Result<CameraBuffer, RenderError> {
        let data = CameraBuffer::compose(self, transform, aa, voxelization);
        buffer.update_data(device, &data)?;
        for stage in ShaderStage::ALL {
            device.bind_constant_buffer(stage, SLOT_CBUFFER_CAMERA, Some(buffer.id()));
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RecordingDevice;
    use bytemuck::bytes_of;
    use glam::Vec3;

    #[test]
    fn perspective_uses_viewport_aspect() {
        let camera = Camera {
            viewport: Viewport::new(200, 100),
            ..Camera::default()
        };
        let expected = Mat4::perspective_lh(std::f32::consts::FRAC_PI_4, 2.0, 0.01, 100.0);
        assert_eq!(camera.camera_to_projection(), expected);
    }

    #[test]
    fn orthographic_maps_extent_to_clip_edges() {
        let camera = Camera {
            projection: Projection::Orthographic {
                width: 4.0,
                height: 2.0,
            },
            ..Camera::default()
        };
        let clip = camera
            .camera_to_projection()
            .project_point3(Vec3::new(2.0, 1.0, 100.0));
        assert!(clip.abs_diff_eq(Vec3::ONE, 1e-5));
    }

    #[test]
    fn update_buffer_uploads_and_binds() {
        let mut device = RecordingDevice::new();
        let buffer = ConstantBuffer::<CameraBuffer>::new(&mut device, "camera").unwrap();
        let camera = Camera::default();
        let data = camera
            .update_buffer(
                &mut device,
                &buffer,
                &Transform::IDENTITY,
                AntiAliasing::Ssaa4x,
                &VoxelizationSettings::default(),
            )
            .unwrap();
        assert_eq!(device.buffer_contents(buffer.id()), Some(bytes_of(&data)));
        for stage in ShaderStage::ALL {
            assert_eq!(
                device.bound_constant_buffer(stage, SLOT_CBUFFER_CAMERA),
                Some(buffer.id())
            );
        }
    }
}
