//! GPU layouts of the lighting buffers.
//!
//! Every record mirrors a WGSL struct field for field. Matrices are stored
//! column-major, as WGSL `mat4x4<f32>` expects.

use std::mem::size_of;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DirectionalLightRecord {
    /// Negated light direction in camera view space.
    pub neg_d: [f32; 3],
    pub _pad0: f32,
    pub intensity: [f32; 3],
    pub _pad1: f32,
}

impl DirectionalLightRecord {
    pub fn new(neg_d: Vec3, intensity: Vec3) -> Self {
        Self {
            neg_d: neg_d.to_array(),
            _pad0: 0.0,
            intensity: intensity.to_array(),
            _pad1: 0.0,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct OmniLightRecord {
    /// Light position in camera view space.
    pub p: [f32; 3],
    pub distance_falloff_end: f32,
    pub intensity: [f32; 3],
    pub distance_falloff_inv_range: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SpotLightRecord {
    pub p: [f32; 3],
    pub exponent_property: f32,
    pub neg_d: [f32; 3],
    pub distance_falloff_end: f32,
    pub intensity: [f32; 3],
    pub distance_falloff_inv_range: f32,
    pub cos_umbra: f32,
    pub cos_inv_range: f32,
    pub _pad: [f32; 2],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DirectionalShadowLightRecord {
    pub light: DirectionalLightRecord,
    pub cview_to_lprojection: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct OmniShadowLightRecord {
    pub light: OmniLightRecord,
    /// Camera view space to light view space; the face is picked in the shader.
    pub cview_to_lview: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SpotShadowLightRecord {
    pub light: SpotLightRecord,
    pub cview_to_lprojection: [[f32; 4]; 4],
}

/// Scene-wide lighting constants, bound once per frame.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct LightingConstants {
    pub ambient: [f32; 3],
    pub nb_directional_lights: u32,
    pub fog_color: [f32; 3],
    pub fog_distance_falloff_start: f32,
    pub fog_distance_falloff_inv_range: f32,
    pub nb_omni_lights: u32,
    pub nb_spot_lights: u32,
    pub nb_sm_directional_lights: u32,
    pub nb_sm_omni_lights: u32,
    pub nb_sm_spot_lights: u32,
    pub _pad: [u32; 2],
}

pub(crate) fn matrix(m: &Mat4) -> [[f32; 4]; 4] {
    m.to_cols_array_2d()
}

const _: () = assert!(size_of::<DirectionalLightRecord>() == 32);
const _: () = assert!(size_of::<OmniLightRecord>() == 32);
const _: () = assert!(size_of::<SpotLightRecord>() == 64);
const _: () = assert!(size_of::<DirectionalShadowLightRecord>() == 96);
const _: () = assert!(size_of::<OmniShadowLightRecord>() == 96);
const _: () = assert!(size_of::<SpotShadowLightRecord>() == 128);
const _: () = assert!(size_of::<LightingConstants>() == 64);
