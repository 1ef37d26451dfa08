use std::collections::HashMap;

use super::{
    BufferDescriptor, BufferId, BufferKind, DepthArray, DepthArrayDescriptor, RenderDevice,
    RenderError, ShaderStage, ShaderView, TextureId, TextureViewId,
};

/// One call made against a [`RecordingDevice`], in submission order.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    CreateBuffer {
        buffer: BufferId,
        label: String,
        size: u64,
    },
    DestroyBuffer(BufferId),
    WriteBuffer {
        buffer: BufferId,
        offset: u64,
        len: u64,
    },
    CreateDepthArray {
        texture: TextureId,
        label: String,
        layers: u32,
    },
    DestroyTexture(TextureId),
    ClearDepth(TextureViewId),
    BindConstantBuffer {
        stage: ShaderStage,
        slot: u32,
        buffer: Option<BufferId>,
    },
    BindShaderViews {
        stage: ShaderStage,
        start_slot: u32,
        views: Vec<Option<ShaderView>>,
    },
}

#[derive(Debug)]
struct RecordedBuffer {
    kind: BufferKind,
    data: Vec<u8>,
}

#[derive(Debug)]
struct RecordedTexture {
    descriptor: DepthArrayDescriptor,
    views: Vec<TextureViewId>,
}

/// In-memory [`RenderDevice`] that keeps buffer contents and binding tables
/// on the CPU.
///
/// Used for headless frames and to observe what the light pass uploads.
/// Calls are logged only when the device is created with
/// [`RecordingDevice::with_command_log`].
#[derive(Debug, Default)]
pub struct RecordingDevice {
    next_id: u64,
    buffers: HashMap<BufferId, RecordedBuffer>,
    textures: HashMap<TextureId, RecordedTexture>,
    views: HashMap<TextureViewId, TextureId>,
    depth_values: HashMap<TextureViewId, f32>,
    constant_buffers: HashMap<(ShaderStage, u32), BufferId>,
    shader_views: HashMap<(ShaderStage, u32), ShaderView>,
    commands: Vec<DeviceCommand>,
    log_commands: bool,
    allocations_left: Option<usize>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Device that logs every call, readable through [`Self::commands`].
    pub fn with_command_log() -> Self {
        Self {
            log_commands: true,
            ..Self::default()
        }
    }

    /// Makes every allocation after the first `allocations` ones fail.
    pub fn with_allocation_limit(allocations: usize) -> Self {
        Self {
            allocations_left: Some(allocations),
            ..Self::default()
        }
    }

    pub fn buffer_contents(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|b| b.data.as_slice())
    }

    pub fn buffer_kind(&self, buffer: BufferId) -> Option<BufferKind> {
        self.buffers.get(&buffer).map(|b| b.kind)
    }

    pub fn bound_constant_buffer(&self, stage: ShaderStage, slot: u32) -> Option<BufferId> {
        self.constant_buffers.get(&(stage, slot)).copied()
    }

    pub fn bound_view(&self, stage: ShaderStage, slot: u32) -> Option<ShaderView> {
        self.shader_views.get(&(stage, slot)).copied()
    }

    /// Layer count of a live depth array.
    pub fn texture_layers(&self, texture: TextureId) -> Option<u32> {
        self.textures
            .get(&texture)
            .map(|t| t.descriptor.layer_count())
    }

    pub fn texture_descriptor(&self, texture: TextureId) -> Option<&DepthArrayDescriptor> {
        self.textures.get(&texture).map(|t| &t.descriptor)
    }

    /// Texture a live view belongs to.
    pub fn view_texture(&self, view: TextureViewId) -> Option<TextureId> {
        self.views.get(&view).copied()
    }

    /// Depth a view was last cleared to.
    pub fn depth_value(&self, view: TextureViewId) -> Option<f32> {
        self.depth_values.get(&view).copied()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// Total bytes held by live buffers and depth arrays.
    pub fn resident_bytes(&self) -> u64 {
        let buffers: u64 = self.buffers.values().map(|b| b.data.len() as u64).sum();
        let textures: u64 = self
            .textures
            .values()
            .map(|t| {
                let d = &t.descriptor;
                u64::from(d.width)
                    * u64::from(d.height)
                    * u64::from(d.layer_count())
                    * d.format.bytes_per_texel()
            })
            .sum();
        buffers + textures
    }

    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DeviceCommand> {
        std::mem::take(&mut self.commands)
    }

    fn record(&mut self, command: DeviceCommand) {
        if self.log_commands {
            self.record(command);
        }
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn reserve_allocation(&mut self, label: &str) -> Result<(), RenderError> {
        match self.allocations_left.as_mut() {
            Some(0) => Err(RenderError::Allocation {
                label: label.to_string(),
                reason: "allocation limit reached".to_string(),
            }),
            Some(left) => {
                *left -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl RenderDevice for RecordingDevice {
    fn create_buffer(&mut self, descriptor: &BufferDescriptor) -> Result<BufferId, RenderError> {
        self.reserve_allocation(&descriptor.label)?;
        let buffer = BufferId(self.next_id());
        self.buffers.insert(
            buffer,
            RecordedBuffer {
                kind: descriptor.kind,
                data: vec![0; descriptor.size as usize],
            },
        );
        self.record(DeviceCommand::CreateBuffer {
            buffer,
            label: descriptor.label.clone(),
            size: descriptor.size,
        });
        Ok(buffer)
    }

    fn destroy_buffer(&mut self, buffer: BufferId) -> Result<(), RenderError> {
        self.buffers
            .remove(&buffer)
            .ok_or(RenderError::UnknownBuffer(buffer))?;
        self.record(DeviceCommand::DestroyBuffer(buffer));
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
            .get_mut(&buffer)
            .ok_or(RenderError::UnknownBuffer(buffer))?;
        let size = target.data.len() as u64;
        let len = data.len() as u64;
        if offset + len > size {
            return Err(RenderError::BufferOverflow {
                buffer,
                offset,
                len,
                size,
            });
        }
        let start = offset as usize;
        target.data[start..start + data.len()].copy_from_slice(data);
        self.record(DeviceCommand::WriteBuffer {
            buffer,
            offset,
            len,
        });
        Ok(())
    }

    fn create_depth_array(
        &mut self,
        descriptor: &DepthArrayDescriptor,
    ) -> Result<DepthArray, RenderError> {
        self.reserve_allocation(&descriptor.label)?;
        let texture = TextureId(self.next_id());
        let depth_views: Vec<TextureViewId> = (0..descriptor.layer_count())
            .map(|_| TextureViewId(self.next_id()))
            .collect();
        let shader_view = TextureViewId(self.next_id());

        let mut views = depth_views.clone();
        views.push(shader_view);
        for view in &views {
            self.views.insert(*view, texture);
        }
        self.textures.insert(
            texture,
            RecordedTexture {
                descriptor: descriptor.clone(),
                views,
            },
        );
        self.record(DeviceCommand::CreateDepthArray {
            texture,
            label: descriptor.label.clone(),
            layers: descriptor.layer_count(),
        });
        Ok(DepthArray {
            texture,
            depth_views,
            shader_view,
        })
    }

    fn destroy_texture(&mut self, texture: TextureId) -> Result<(), RenderError> {
        let recorded = self
            .textures
            .remove(&texture)
            .ok_or(RenderError::UnknownTexture(texture))?;
        for view in recorded.views {
            self.views.remove(&view);
            self.depth_values.remove(&view);
        }
        self.record(DeviceCommand::DestroyTexture(texture));
        Ok(())
    }

    fn clear_depth(&mut self, view: TextureViewId, depth: f32) -> Result<(), RenderError> {
        if !self.views.contains_key(&view) {
            return Err(RenderError::UnknownView(view));
        }
        self.depth_values.insert(view, depth);
        self.record(DeviceCommand::ClearDepth(view));
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
        self.record(DeviceCommand::BindConstantBuffer {
            stage,
            slot,
            buffer,
        });
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
        self.record(DeviceCommand::BindShaderViews {
            stage,
            start_slot,
            views: views.to_vec(),
        });
    }
}
