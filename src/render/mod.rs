//! Device seam between the lighting core and the graphics API.
//!
//! The light pass and the camera composer never talk to `wgpu` directly.
//! They allocate, upload and bind through [`RenderDevice`], which is
//! implemented by [`native::WgpuDevice`] for real GPUs and by
//! [`recording::RecordingDevice`] for headless runs and tests.

pub mod buffer;
pub mod native;
pub mod recording;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use buffer::{ConstantBuffer, StructuredBuffer};
pub use native::WgpuDevice;
pub use recording::{DeviceCommand, RecordingDevice};

/// Binding slot of the per-camera constant buffer.
pub const SLOT_CBUFFER_CAMERA: u32 = 0;
/// Binding slot of the combined lighting constant buffer.
pub const SLOT_CBUFFER_LIGHTING: u32 = 1;
/// First binding slot of the six light record buffers.
pub const SLOT_SRV_LIGHTS_START: u32 = 2;
/// First binding slot of the three shadow-map arrays.
pub const SLOT_SRV_SHADOW_MAPS_START: u32 = SLOT_SRV_LIGHTS_START + 6;
/// Number of shader views bound by the light pass.
pub const LIGHT_PASS_VIEW_COUNT: u32 = 9;
/// Number of shadow-map shader views.
pub const SHADOW_MAP_VIEW_COUNT: u32 = 3;

/// Identifier of a GPU buffer owned by a [`RenderDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

/// Identifier of a GPU texture owned by a [`RenderDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

/// Identifier of a view into a texture owned by a [`RenderDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureViewId(pub u64);

/// Programmable stages the lighting data is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Fragment,
    Compute,
}

impl ShaderStage {
    pub const ALL: [ShaderStage; 2] = [ShaderStage::Fragment, ShaderStage::Compute];
}

/// How a buffer is exposed to shaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Uniform,
    Storage,
}

/// Buffer allocation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDescriptor {
    pub label: String,
    pub size: u64,
    pub kind: BufferKind,
}

/// Depth formats supported for shadow maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DepthFormat {
    #[default]
    D16,
    D32,
}

impl DepthFormat {
    pub fn bytes_per_texel(self) -> u64 {
        match self {
            DepthFormat::D16 => 2,
            DepthFormat::D32 => 4,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "d16" => Some(DepthFormat::D16),
            "d32" => Some(DepthFormat::D32),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DepthFormat::D16 => "d16",
            DepthFormat::D32 => "d32",
        }
    }
}

/// Shape of a depth texture array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthArrayKind {
    /// One 2D layer per shadow map, sampled as a 2D array.
    Flat,
    /// Six layers per shadow map, sampled as a cube array.
    Cube,
}

impl DepthArrayKind {
    pub fn layers_per_map(self) -> u32 {
        match self {
            DepthArrayKind::Flat => 1,
            DepthArrayKind::Cube => 6,
        }
    }
}

/// Depth texture array allocation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthArrayDescriptor {
    pub label: String,
    pub width: u32,
    pub height: u32,
    /// Number of maps; the texture holds `maps * kind.layers_per_map()` layers.
    pub maps: u32,
    pub format: DepthFormat,
    pub kind: DepthArrayKind,
}

impl DepthArrayDescriptor {
    pub fn layer_count(&self) -> u32 {
        self.maps.saturating_mul(self.kind.layers_per_map())
    }
}

/// A freshly allocated depth array with its views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthArray {
    pub texture: TextureId,
    /// One depth-attachment view per layer.
    pub depth_views: Vec<TextureViewId>,
    /// Single shader-visible view over the whole array.
    pub shader_view: TextureViewId,
}

/// Something bindable to a shader-resource slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderView {
    Buffer(BufferId),
    Texture(TextureViewId),
}

/// Errors raised by a [`RenderDevice`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RenderError {
    #[error("failed to allocate {label}: {reason}")]
    Allocation { label: String, reason: String },
    #[error("unknown buffer {0:?}")]
    UnknownBuffer(BufferId),
    #[error("unknown texture {0:?}")]
    UnknownTexture(TextureId),
    #[error("unknown texture view {0:?}")]
    UnknownView(TextureViewId),
    #[error("write of {len} bytes at offset {offset} overflows {buffer:?} ({size} bytes)")]
    BufferOverflow {
        buffer: BufferId,
        offset: u64,
        len: u64,
        size: u64,
    },
    #[error("slot {slot} of the {stage:?} stage has nothing bound")]
    MissingBinding { stage: ShaderStage, slot: u32 },
}

/// Minimal graphics API surface needed by the lighting core.
///
/// Allocation failures are reported as [`RenderError::Allocation`] and are
/// fatal for the frame that hit them.
pub trait RenderDevice {
    fn create_buffer(&mut self, descriptor: &BufferDescriptor) -> Result<BufferId, RenderError>;

    fn destroy_buffer(&mut self, buffer: BufferId) -> Result<(), RenderError>;

    fn write_buffer(&mut self, buffer: BufferId, offset: u64, data: &[u8])
        -> Result<(), RenderError>;

    fn create_depth_array(
        &mut self,
        descriptor: &DepthArrayDescriptor,
    ) -> Result<DepthArray, RenderError>;

    /// Destroys a texture together with every view created for it.
    fn destroy_texture(&mut self, texture: TextureId) -> Result<(), RenderError>;

    fn clear_depth(&mut self, view: TextureViewId, depth: f32) -> Result<(), RenderError>;

    fn bind_constant_buffer(&mut self, stage: ShaderStage, slot: u32, buffer: Option<BufferId>);

    /// Binds consecutive shader views starting at `start_slot`; `None` unbinds.
    fn bind_shader_views(
        &mut self,
        stage: ShaderStage,
        start_slot: u32,
        views: &[Option<ShaderView>],
    );
}

impl<D: RenderDevice + ?Sized> RenderDevice for Box<D> {
    fn create_buffer(&mut self, descriptor: &BufferDescriptor) -> Result<BufferId, RenderError> {
        (**self).create_buffer(descriptor)
    }

    fn destroy_buffer(&mut self, buffer: BufferId) -> Result<(), RenderError> {
        (**self).destroy_buffer(buffer)
    }

    fn write_buffer(
        &mut self,
        buffer: BufferId,
        offset: u64,
        data: &[u8],
    ) -> Result<(), RenderError> {
        (**self).write_buffer(buffer, offset, data)
    }

    fn create_depth_array(
        &mut self,
        descriptor: &DepthArrayDescriptor,
    ) -> Result<DepthArray, RenderError> {
        (**self).create_depth_array(descriptor)
    }

    fn destroy_texture(&mut self, texture: TextureId) -> Result<(), RenderError> {
        (**self).destroy_texture(texture)
    }

    fn clear_depth(&mut self, view: TextureViewId, depth: f32) -> Result<(), RenderError> {
        (**self).clear_depth(view, depth)
    }

    fn bind_constant_buffer(&mut self, stage: ShaderStage, slot: u32, buffer: Option<BufferId>) {
        (**self).bind_constant_buffer(stage, slot, buffer)
    }

    fn bind_shader_views(
        &mut self,
        stage: ShaderStage,
        start_slot: u32,
        views: &[Option<ShaderView>],
    ) {
        (**self).bind_shader_views(stage, start_slot, views)
    }
}
