use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Voxel grid used for voxel cone tracing, shared by every camera of a frame.
///
/// Captured once at frame start and passed to the camera composer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoxelizationSettings {
    pub grid_center: Vec3,
    /// Voxels along each axis of the grid.
    pub grid_resolution: u32,
    /// Edge length of one voxel in world units.
    pub voxel_size: f32,
}

impl Default for VoxelizationSettings {
    fn default() -> Self {
        Self {
            grid_center: Vec3::ZERO,
            grid_resolution: 128,
            voxel_size: 0.08,
        }
    }
}

impl VoxelizationSettings {
    pub fn grid_inv_resolution(&self) -> f32 {
        1.0 / self.grid_resolution as f32
    }

    pub fn voxel_inv_size(&self) -> f32 {
        1.0 / self.voxel_size
    }

    /// Highest mip level of the voxel texture.
    pub fn max_mip_level(&self) -> u32 {
        self.grid_resolution.max(1).ilog2()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_mip_level_is_floor_log2() {
        let mut settings = VoxelizationSettings::default();
        assert_eq!(settings.max_mip_level(), 7);
        settings.grid_resolution = 100;
        assert_eq!(settings.max_mip_level(), 6);
        settings.grid_resolution = 0;
        assert_eq!(settings.max_mip_level(), 0);
    }
}
