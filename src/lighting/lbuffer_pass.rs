use log::debug;

use super::light_camera::LightCamera;
use super::packer::{
    pack_directional_lights, pack_directional_shadow_lights, pack_omni_lights,
    pack_omni_shadow_lights, pack_spot_lights, pack_spot_shadow_lights,
};
use super::records::{
    DirectionalLightRecord, DirectionalShadowLightRecord, LightingConstants, OmniLightRecord,
    OmniShadowLightRecord, SpotLightRecord, SpotShadowLightRecord,
};
use super::shadow_map::{ShadowMapConfig, ShadowMapPool};
use super::ViewTransforms;
use crate::render::{
    BufferId, ConstantBuffer, RenderDevice, RenderError, ShaderStage, ShaderView,
    StructuredBuffer, LIGHT_PASS_VIEW_COUNT, SHADOW_MAP_VIEW_COUNT, SLOT_CBUFFER_LIGHTING,
    SLOT_SRV_LIGHTS_START, SLOT_SRV_SHADOW_MAPS_START,
};
use crate::scene::PassScene;

/// Owns the lighting buffers and shadow-map pools and refreshes them from
/// the scene once per frame.
#[derive(Debug)]
pub struct LBufferPass {
    constants_buffer: ConstantBuffer<LightingConstants>,
    constants: LightingConstants,
    directional_lights: StructuredBuffer<DirectionalLightRecord>,
    omni_lights: StructuredBuffer<OmniLightRecord>,
    spot_lights: StructuredBuffer<SpotLightRecord>,
    sm_directional_lights: StructuredBuffer<DirectionalShadowLightRecord>,
    sm_omni_lights: StructuredBuffer<OmniShadowLightRecord>,
    sm_spot_lights: StructuredBuffer<SpotShadowLightRecord>,
    directional_shadow_maps: ShadowMapPool,
    omni_shadow_maps: ShadowMapPool,
    spot_shadow_maps: ShadowMapPool,
    directional_cameras: Vec<LightCamera>,
    omni_cameras: Vec<LightCamera>,
    spot_cameras: Vec<LightCamera>,
}

impl LBufferPass {
    pub fn new<D: RenderDevice + ?Sized>(
        device: &mut D,
        shadow_maps: ShadowMapConfig,
    ) -> Result<Self, RenderError> {
        Ok(Self {
            constants_buffer: ConstantBuffer::new(device, "lighting-constants")?,
            constants: LightingConstants::default(),
            directional_lights: StructuredBuffer::new(device, "directional-lights", 3)?,
            omni_lights: StructuredBuffer::new(device, "omni-lights", 32)?,
            spot_lights: StructuredBuffer::new(device, "spot-lights", 32)?,
            sm_directional_lights: StructuredBuffer::new(device, "sm-directional-lights", 1)?,
            sm_omni_lights: StructuredBuffer::new(device, "sm-omni-lights", 1)?,
            sm_spot_lights: StructuredBuffer::new(device, "sm-spot-lights", 1)?,
            directional_shadow_maps: ShadowMapPool::flat(
                device,
                "directional-shadow-maps",
                shadow_maps,
            )?,
            omni_shadow_maps: ShadowMapPool::cube(device, "omni-shadow-maps", shadow_maps)?,
            spot_shadow_maps: ShadowMapPool::flat(device, "spot-shadow-maps", shadow_maps)?,
            directional_cameras: Vec::new(),
            omni_cameras: Vec::new(),
            spot_cameras: Vec::new(),
        })
    }

    /// Runs the light pass for one frame.
    ///
    /// Any device error aborts the frame; buffers may then be partially
    /// updated and nothing is bound.
    pub fn render<D: RenderDevice + ?Sized>(
        &mut self,
        device: &mut D,
        scene: &PassScene,
        view: &ViewTransforms,
    ) -> Result<(), RenderError> {
        let directional = pack_directional_lights(&scene.directional_lights, view);
        self.directional_lights.update_data(device, &directional)?;
        let omni = pack_omni_lights(&scene.omni_lights, view);
        self.omni_lights.update_data(device, &omni)?;
        let spot = pack_spot_lights(&scene.spot_lights, view);
        self.spot_lights.update_data(device, &spot)?;

        self.unbind_shadow_maps(device);

        let sm_directional = pack_directional_shadow_lights(&scene.sm_directional_lights, view);
        self.sm_directional_lights
            .update_data(device, &sm_directional.records)?;
        self.directional_shadow_maps
            .ensure_capacity(device, sm_directional.records.len())?;
        self.directional_cameras = sm_directional.cameras;

        let sm_omni = pack_omni_shadow_lights(&scene.sm_omni_lights, view);
        self.sm_omni_lights.update_data(device, &sm_omni.records)?;
        self.omni_shadow_maps
            .ensure_capacity(device, sm_omni.records.len())?;
        self.omni_cameras = sm_omni.cameras;

        let sm_spot = pack_spot_shadow_lights(&scene.sm_spot_lights, view);
        self.sm_spot_lights.update_data(device, &sm_spot.records)?;
        self.spot_shadow_maps
            .ensure_capacity(device, sm_spot.records.len())?;
        self.spot_cameras = sm_spot.cameras;

        self.constants = self.compose_constants(scene);
        self.constants_buffer.update_data(device, &self.constants)?;
        debug!(
            "light pass packed {}/{}/{} lights and {}/{}/{} shadow-mapped lights",
            self.constants.nb_directional_lights,
            self.constants.nb_omni_lights,
            self.constants.nb_spot_lights,
            self.constants.nb_sm_directional_lights,
            self.constants.nb_sm_omni_lights,
            self.constants.nb_sm_spot_lights,
        );

        self.bind(device);
        Ok(())
    }

    /// Clears the shadow maps of all three pools to the far plane.
    pub fn clear_shadow_maps<D: RenderDevice + ?Sized>(
        &self,
        device: &mut D,
    ) -> Result<(), RenderError> {
        self.directional_shadow_maps.clear(device)?;
        self.omni_shadow_maps.clear(device)?;
        self.spot_shadow_maps.clear(device)
    }

    fn compose_constants(&self, scene: &PassScene) -> LightingConstants {
        LightingConstants {
            ambient: scene.ambient.to_array(),
            fog_color: scene.fog.color.to_array(),
            fog_distance_falloff_start: scene.fog.falloff.start,
            fog_distance_falloff_inv_range: 1.0 / scene.fog.falloff.range(),
            nb_directional_lights: count(self.directional_lights.len()),
            nb_omni_lights: count(self.omni_lights.len()),
            nb_spot_lights: count(self.spot_lights.len()),
            nb_sm_directional_lights: count(self.sm_directional_lights.len()),
            nb_sm_omni_lights: count(self.sm_omni_lights.len()),
            nb_sm_spot_lights: count(self.sm_spot_lights.len()),
            _pad: [0; 2],
        }
    }

    fn unbind_shadow_maps<D: RenderDevice + ?Sized>(&self, device: &mut D) {
        let empty = [None; SHADOW_MAP_VIEW_COUNT as usize];
        for stage in ShaderStage::ALL {
            device.bind_shader_views(stage, SLOT_SRV_SHADOW_MAPS_START, &empty);
        }
    }

    fn bind<D: RenderDevice + ?Sized>(&self, device: &mut D) {
        let views = self.shader_views().map(Some);
        for stage in ShaderStage::ALL {
            device.bind_constant_buffer(
                stage,
                SLOT_CBUFFER_LIGHTING,
                Some(self.constants_buffer.id()),
            );
            device.bind_shader_views(stage, SLOT_SRV_LIGHTS_START, &views);
        }
    }

    /// Views in binding order starting at the first light slot.
    pub fn shader_views(&self) -> [ShaderView; LIGHT_PASS_VIEW_COUNT as usize] {
        [
            ShaderView::Buffer(self.directional_lights.id()),
            ShaderView::Buffer(self.omni_lights.id()),
            ShaderView::Buffer(self.spot_lights.id()),
            ShaderView::Buffer(self.sm_directional_lights.id()),
            ShaderView::Buffer(self.sm_omni_lights.id()),
            ShaderView::Buffer(self.sm_spot_lights.id()),
            ShaderView::Texture(self.directional_shadow_maps.shader_view()),
            ShaderView::Texture(self.omni_shadow_maps.shader_view()),
            ShaderView::Texture(self.spot_shadow_maps.shader_view()),
        ]
    }

    pub fn constants_buffer(&self) -> BufferId {
        self.constants_buffer.id()
    }

    /// Constants uploaded by the last frame.
    pub fn constants(&self) -> &LightingConstants {
        &self.constants
    }

    pub fn directional_lights(&self) -> &StructuredBuffer<DirectionalLightRecord> {
        &self.directional_lights
    }

    pub fn omni_lights(&self) -> &StructuredBuffer<OmniLightRecord> {
        &self.omni_lights
    }

    pub fn spot_lights(&self) -> &StructuredBuffer<SpotLightRecord> {
        &self.spot_lights
    }

    pub fn sm_directional_lights(&self) -> &StructuredBuffer<DirectionalShadowLightRecord> {
        &self.sm_directional_lights
    }

    pub fn sm_omni_lights(&self) -> &StructuredBuffer<OmniShadowLightRecord> {
        &self.sm_omni_lights
    }

    pub fn sm_spot_lights(&self) -> &StructuredBuffer<SpotShadowLightRecord> {
        &self.sm_spot_lights
    }

    pub fn directional_shadow_maps(&self) -> &ShadowMapPool {
        &self.directional_shadow_maps
    }

    pub fn omni_shadow_maps(&self) -> &ShadowMapPool {
        &self.omni_shadow_maps
    }

    pub fn spot_shadow_maps(&self) -> &ShadowMapPool {
        &self.spot_shadow_maps
    }

    pub fn directional_cameras(&self) -> &[LightCamera] {
        &self.directional_cameras
    }

    /// Six cameras per shadow-mapped omni light, in cube face order.
    pub fn omni_cameras(&self) -> &[LightCamera] {
        &self.omni_cameras
    }

    pub fn spot_cameras(&self) -> &[LightCamera] {
        &self.spot_cameras
    }
}

fn count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}
