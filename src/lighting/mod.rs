//! Per-frame light pass: culling, packing, shadow-map provisioning and
//! binding of all lighting data.

pub mod lbuffer_pass;
pub mod light_camera;
pub mod packer;
pub mod records;
pub mod shadow_map;

use glam::Mat4;

pub use lbuffer_pass::LBufferPass;
pub use light_camera::{omni_face_cameras, LightCamera, OMNI_FACE_DIRECTIONS};
pub use packer::ShadowPacking;
pub use records::{
    DirectionalLightRecord, DirectionalShadowLightRecord, LightingConstants, OmniLightRecord,
    OmniShadowLightRecord, SpotLightRecord, SpotShadowLightRecord,
};
pub use shadow_map::{ShadowMapConfig, ShadowMapHandle, ShadowMapPool};

/// Camera transforms the light pass works with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransforms {
    pub world_to_projection: Mat4,
    pub world_to_view: Mat4,
    pub view_to_world: Mat4,
}

impl ViewTransforms {
    pub fn new(view_to_projection: Mat4, world_to_view: Mat4) -> Self {
        Self {
            world_to_projection: view_to_projection * world_to_view,
            world_to_view,
            view_to_world: world_to_view.inverse(),
        }
    }
}
