use std::collections::HashMap;
use std::mem::size_of;

use anyhow::{Context, Result};
use log::info;

use super::{
    BufferDescriptor, BufferId, BufferKind, DepthArray, DepthArrayDescriptor, DepthArrayKind,
    DepthFormat, RenderDevice, RenderError, ShaderStage, ShaderView, TextureId, TextureViewId,
    LIGHT_PASS_VIEW_COUNT, SLOT_CBUFFER_CAMERA, SLOT_CBUFFER_LIGHTING, SLOT_SRV_LIGHTS_START,
    SLOT_SRV_SHADOW_MAPS_START,
};
use crate::camera::CameraBuffer;
use crate::lighting::{LightingConstants, ShadowMapConfig};

/// [`RenderDevice`] backed by a headless wgpu device.
///
/// wgpu has no per-slot binding API, so binds are recorded into a slot table
/// per stage and turned into a bind group on demand by [`Self::bind_group`].
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    next_id: u64,
    buffers: HashMap<BufferId, wgpu::Buffer>,
    textures: HashMap<TextureId, GpuDepthArray>,
    views: HashMap<TextureViewId, wgpu::TextureView>,
    constant_buffers: HashMap<(ShaderStage, u32), BufferId>,
    shader_views: HashMap<(ShaderStage, u32), ShaderView>,
    lighting_layout: wgpu::BindGroupLayout,
}

struct GpuDepthArray {
    _texture: wgpu::Texture,
    views: Vec<TextureViewId>,
}

impl WgpuDevice {
    /// Acquires an adapter without a surface and creates a device on it.
    pub async fn new() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: Default::default(),
            backend_options: Default::default(),
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("failed to acquire GPU adapter")?;
        info!("using adapter {}", adapter.get_info().name);

        let device_descriptor = wgpu::DeviceDescriptor {
            label: Some("umbra-device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            experimental_features: Default::default(),
            memory_hints: Default::default(),
            trace: Default::default(),
        };
        let (device, queue) = adapter
            .request_device(&device_descriptor)
            .await
            .context("failed to create GPU device")?;

        Ok(Self::from_parts(device, queue))
    }

    /// Wraps an existing device and queue.
    pub fn from_parts(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let lighting_layout = lighting_bind_group_layout(&device);
        Self {
            device,
            queue,
            next_id: 0,
            buffers: HashMap::new(),
            textures: HashMap::new(),
            views: HashMap::new(),
            constant_buffers: HashMap::new(),
            shader_views: HashMap::new(),
            lighting_layout,
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn lighting_layout(&self) -> &wgpu::BindGroupLayout {
        &self.lighting_layout
    }

    pub fn texture_view(&self, view: TextureViewId) -> Option<&wgpu::TextureView> {
        self.views.get(&view)
    }

    /// Builds the lighting bind group from what is currently bound to `stage`.
    pub fn bind_group(&self, stage: ShaderStage) -> Result<wgpu::BindGroup, RenderError> {
        let mut entries = Vec::with_capacity(2 + LIGHT_PASS_VIEW_COUNT as usize);
        for slot in [SLOT_CBUFFER_CAMERA, SLOT_CBUFFER_LIGHTING] {
            let id = self
                .constant_buffers
                .get(&(stage, slot))
                .ok_or(RenderError::MissingBinding { stage, slot })?;
            let buffer = self.buffers.get(id).ok_or(RenderError::UnknownBuffer(*id))?;
            entries.push(wgpu::BindGroupEntry {
                binding: slot,
                resource: buffer.as_entire_binding(),
            });
        }
        for slot in SLOT_SRV_LIGHTS_START..SLOT_SRV_LIGHTS_START + LIGHT_PASS_VIEW_COUNT {
            let view = self
                .shader_views
                .get(&(stage, slot))
                .ok_or(RenderError::MissingBinding { stage, slot })?;
            let resource = match view {
                ShaderView::Buffer(id) => self
                    .buffers
                    .get(id)
                    .ok_or(RenderError::UnknownBuffer(*id))?
                    .as_entire_binding(),
                ShaderView::Texture(id) => wgpu::BindingResource::TextureView(
                    self.views.get(id).ok_or(RenderError::UnknownView(*id))?,
                ),
            };
            entries.push(wgpu::BindGroupEntry {
                binding: slot,
                resource,
            });
        }
        Ok(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lighting-bind-group"),
            layout: &self.lighting_layout,
            entries: &entries,
        }))
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Runs `create` inside out-of-memory and validation error scopes.
    fn allocate<T>(
        &self,
        label: &str,
        create: impl FnOnce(&wgpu::Device) -> T,
    ) -> Result<T, RenderError> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = create(&self.device);
        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        match validation.or(out_of_memory) {
            Some(err) => Err(RenderError::Allocation {
                label: label.to_string(),
                reason: err.to_string(),
            }),
            None => Ok(value),
        }
    }
}

fn check_buffer_limits(
    limits: &wgpu::Limits,
    descriptor: &BufferDescriptor,
) -> Result<(), RenderError> {
    let binding_limit = match descriptor.kind {
        BufferKind::Uniform => u64::from(limits.max_uniform_buffer_binding_size),
        BufferKind::Storage => u64::from(limits.max_storage_buffer_binding_size),
    };
    let limit = binding_limit.min(limits.max_buffer_size);
    if descriptor.size > limit {
        return Err(RenderError::Allocation {
            label: descriptor.label.clone(),
            reason: format!(
                "{} bytes exceed the device limit of {limit} bytes",
                descriptor.size
            ),
        });
    }
    Ok(())
}

fn check_depth_array_limits(
    limits: &wgpu::Limits,
    descriptor: &DepthArrayDescriptor,
) -> Result<(), RenderError> {
    let max_dimension = limits.max_texture_dimension_2d;
    let reason = if descriptor.width > max_dimension || descriptor.height > max_dimension {
        format!(
            "{}x{} exceeds the device limit of {max_dimension} texels",
            descriptor.width, descriptor.height
        )
    } else if descriptor.layer_count() > limits.max_texture_array_layers {
        format!(
            "{} layers exceed the device limit of {}",
            descriptor.layer_count(),
            limits.max_texture_array_layers
        )
    } else {
        return Ok(());
    };
    Err(RenderError::Allocation {
        label: descriptor.label.clone(),
        reason,
    })
}

impl RenderDevice for WgpuDevice {
    fn create_buffer(&mut self, descriptor: &BufferDescriptor) -> Result<BufferId, RenderError> {
        let usage = match descriptor.kind {
            BufferKind::Uniform => wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            BufferKind::Storage => wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        };
        check_buffer_limits(&self.device.limits(), descriptor)?;
        let buffer = self.allocate(&descriptor.label, |device| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&descriptor.label),
                size: descriptor.size,
                usage,
                mapped_at_creation: false,
            })
        })?;
        let id = BufferId(self.next_id());
        self.buffers.insert(id, buffer);
        Ok(id)
    }

    fn destroy_buffer(&mut self, buffer: BufferId) -> Result<(), RenderError> {
        let removed = self
            .buffers
            .remove(&buffer)
            .ok_or(RenderError::UnknownBuffer(buffer))?;
        removed.destroy();
        Ok(())
    }

    fn write_buffer(
        &mut self,
        buffer: BufferId,
        offset: u64,
        data: &[u8],
    ) -> Result<(), RenderError> {
        let target = self
            .buffers
            .get(&buffer)
            .ok_or(RenderError::UnknownBuffer(buffer))?;
        let len = data.len() as u64;
        if offset + len > target.size() {
            return Err(RenderError::BufferOverflow {
                buffer,
                offset,
                len,
                size: target.size(),
            });
        }
        self.queue.write_buffer(target, offset, data);
        Ok(())
    }

    fn create_depth_array(
        &mut self,
        descriptor: &DepthArrayDescriptor,
    ) -> Result<DepthArray, RenderError> {
        check_depth_array_limits(&self.device.limits(), descriptor)?;
        let layers = descriptor.layer_count();
        let texture = self.allocate(&descriptor.label, |device| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(&descriptor.label),
                size: wgpu::Extent3d {
                    width: descriptor.width.max(1),
                    height: descriptor.height.max(1),
                    depth_or_array_layers: layers.max(1),
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: depth_texture_format(descriptor.format),
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            })
        })?;

        let mut depth_views = Vec::with_capacity(layers as usize);
        for layer in 0..layers {
            let view = texture.create_view(&wgpu::TextureViewDescriptor {
                label: Some(&format!("{}-layer-{layer}", descriptor.label)),
                dimension: Some(wgpu::TextureViewDimension::D2),
                base_array_layer: layer,
                array_layer_count: Some(1),
                ..Default::default()
            });
            let id = TextureViewId(self.next_id());
            self.views.insert(id, view);
            depth_views.push(id);
        }

        let dimension = match descriptor.kind {
            DepthArrayKind::Flat => wgpu::TextureViewDimension::D2Array,
            DepthArrayKind::Cube => wgpu::TextureViewDimension::CubeArray,
        };
        let shader_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(&format!("{}-srv", descriptor.label)),
            dimension: Some(dimension),
            ..Default::default()
        });
        let shader_view_id = TextureViewId(self.next_id());
        self.views.insert(shader_view_id, shader_view);

        let texture_id = TextureId(self.next_id());
        let mut views = depth_views.clone();
        views.push(shader_view_id);
        self.textures.insert(
            texture_id,
            GpuDepthArray {
                _texture: texture,
                views,
            },
        );

        Ok(DepthArray {
            texture: texture_id,
            depth_views,
            shader_view: shader_view_id,
        })
    }

    fn destroy_texture(&mut self, texture: TextureId) -> Result<(), RenderError> {
        let removed = self
            .textures
            .remove(&texture)
            .ok_or(RenderError::UnknownTexture(texture))?;
        for view in &removed.views {
            self.views.remove(view);
        }
        removed._texture.destroy();
        Ok(())
    }

    fn clear_depth(&mut self, view: TextureViewId, depth: f32) -> Result<(), RenderError> {
        let target = self.views.get(&view).ok_or(RenderError::UnknownView(view))?;
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("shadow-map-clear"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("shadow-map-clear-pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: target,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(depth),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn bind_constant_buffer(&mut self, stage: ShaderStage, slot: u32, buffer: Option<BufferId>) {
        match buffer {
            Some(buffer) => {
                self.constant_buffers.insert((stage, slot), buffer);
            }
            None => {
                self.constant_buffers.remove(&(stage, slot));
            }
        }
    }

    fn bind_shader_views(
        &mut self,
        stage: ShaderStage,
        start_slot: u32,
        views: &[Option<ShaderView>],
    ) {
        for (slot, view) in (start_slot..).zip(views) {
            match view {
                Some(view) => {
                    self.shader_views.insert((stage, slot), *view);
                }
                None => {
                    self.shader_views.remove(&(stage, slot));
                }
            }
        }
    }
}

pub fn depth_texture_format(format: DepthFormat) -> wgpu::TextureFormat {
    match format {
        DepthFormat::D16 => wgpu::TextureFormat::Depth16Unorm,
        DepthFormat::D32 => wgpu::TextureFormat::Depth32Float,
    }
}

/// Rasterizer depth bias for rendering into shadow maps.
pub fn depth_bias_state(config: &ShadowMapConfig) -> wgpu::DepthBiasState {
    wgpu::DepthBiasState {
        constant: config.depth_bias,
        slope_scale: config.slope_scaled_depth_bias,
        clamp: config.depth_bias_clamp,
    }
}

/// Layout shared by fragment and compute shaders reading lighting data.
pub fn lighting_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let visibility = wgpu::ShaderStages::FRAGMENT | wgpu::ShaderStages::COMPUTE;
    let uniform = |binding: u32, size: usize| wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: wgpu::BufferSize::new(size as u64),
        },
        count: None,
    };
    let storage = |binding: u32| wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    };
    let depth = |binding: u32, view_dimension: wgpu::TextureViewDimension| {
        wgpu::BindGroupLayoutEntry {
            binding,
            visibility,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Depth,
                view_dimension,
                multisampled: false,
            },
            count: None,
        }
    };

    let mut entries = vec![
        uniform(SLOT_CBUFFER_CAMERA, size_of::<CameraBuffer>()),
        uniform(SLOT_CBUFFER_LIGHTING, size_of::<LightingConstants>()),
    ];
    entries.extend((SLOT_SRV_LIGHTS_START..SLOT_SRV_SHADOW_MAPS_START).map(storage));
    entries.push(depth(
        SLOT_SRV_SHADOW_MAPS_START,
        wgpu::TextureViewDimension::D2Array,
    ));
    entries.push(depth(
        SLOT_SRV_SHADOW_MAPS_START + 1,
        wgpu::TextureViewDimension::CubeArray,
    ));
    entries.push(depth(
        SLOT_SRV_SHADOW_MAPS_START + 2,
        wgpu::TextureViewDimension::D2Array,
    ));

    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("lighting-bind-layout"),
        entries: &entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_formats_map_to_wgpu_formats() {
        assert_eq!(
            depth_texture_format(DepthFormat::D16),
            wgpu::TextureFormat::Depth16Unorm
        );
        assert_eq!(
            depth_texture_format(DepthFormat::D32),
            wgpu::TextureFormat::Depth32Float
        );
    }

    fn omni_maps(maps: u32) -> DepthArrayDescriptor {
        DepthArrayDescriptor {
            label: "omni-shadow-maps".to_string(),
            width: 512,
            height: 512,
            maps,
            format: DepthFormat::D16,
            kind: DepthArrayKind::Cube,
        }
    }

    #[test]
    fn depth_arrays_beyond_the_layer_limit_are_rejected() {
        let limits = wgpu::Limits::default();
        let fits = limits.max_texture_array_layers / 6;
        assert!(check_depth_array_limits(&limits, &omni_maps(fits)).is_ok());

        let err = check_depth_array_limits(&limits, &omni_maps(fits + 1)).unwrap_err();
        match err {
            RenderError::Allocation { label, reason } => {
                assert_eq!(label, "omni-shadow-maps");
                assert!(reason.contains("layers"), "{reason}");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(check_depth_array_limits(&limits, &omni_maps(u32::MAX)).is_err());
    }

    #[test]
    fn oversized_depth_maps_are_rejected() {
        let limits = wgpu::Limits::default();
        let mut descriptor = omni_maps(1);
        descriptor.width = limits.max_texture_dimension_2d + 1;
        assert!(matches!(
            check_depth_array_limits(&limits, &descriptor),
            Err(RenderError::Allocation { .. })
        ));
    }

    #[test]
    fn buffers_beyond_the_binding_limit_are_rejected() {
        let limits = wgpu::Limits::default();
        let storage_limit = u64::from(limits.max_storage_buffer_binding_size);
        let mut descriptor = BufferDescriptor {
            label: "sm-omni-lights".to_string(),
            size: storage_limit,
            kind: BufferKind::Storage,
        };
        assert!(check_buffer_limits(&limits, &descriptor).is_ok());

        descriptor.size = storage_limit + 1;
        assert!(matches!(
            check_buffer_limits(&limits, &descriptor),
            Err(RenderError::Allocation { label, .. }) if label == "sm-omni-lights"
        ));

        descriptor.kind = BufferKind::Uniform;
        descriptor.size = u64::from(limits.max_uniform_buffer_binding_size) + 1;
        assert!(check_buffer_limits(&limits, &descriptor).is_err());
    }

    #[test]
    fn default_shadow_bias_matches_config() {
        let bias = depth_bias_state(&ShadowMapConfig::default());
        assert_eq!(bias.constant, 100);
        assert_eq!(bias.slope_scale, 1.0);
        assert_eq!(bias.clamp, 0.0);
    }
}
