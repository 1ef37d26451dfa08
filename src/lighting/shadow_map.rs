use log::debug;
use serde::{Deserialize, Serialize};

use crate::render::{
    DepthArray, DepthArrayDescriptor, DepthArrayKind, DepthFormat, RenderDevice, RenderError,
    TextureViewId,
};

pub const DEFAULT_SHADOW_MAP_RESOLUTION: u32 = 512;

/// Size, format and rasterizer bias of the shadow maps in a pool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShadowMapConfig {
    pub resolution: u32,
    pub format: DepthFormat,
    pub depth_bias: i32,
    pub slope_scaled_depth_bias: f32,
    pub depth_bias_clamp: f32,
}

impl Default for ShadowMapConfig {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_SHADOW_MAP_RESOLUTION,
            format: DepthFormat::D16,
            depth_bias: 100,
            slope_scaled_depth_bias: 1.0,
            depth_bias_clamp: 0.0,
        }
    }
}

/// Refers to one shadow map of a pool as long as the pool is not reallocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShadowMapHandle {
    generation: u64,
    index: u32,
}

impl ShadowMapHandle {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Depth texture array holding the shadow maps of one light type.
///
/// Flat pools hold one layer per map; cube pools hold six. Capacity is counted
/// in maps and only ever grows.
#[derive(Debug)]
pub struct ShadowMapPool {
    label: String,
    kind: DepthArrayKind,
    config: ShadowMapConfig,
    array: DepthArray,
    capacity: u32,
    generation: u64,
}

impl ShadowMapPool {
    /// Creates a pool with room for a single map.
    pub fn new<D: RenderDevice + ?Sized>(
        device: &mut D,
        label: &str,
        kind: DepthArrayKind,
        config: ShadowMapConfig,
    ) -> Result<Self, RenderError> {
        let array = allocate(device, label, kind, &config, 1)?;
        Ok(Self {
            label: label.to_string(),
            kind,
            config,
            array,
            capacity: 1,
            generation: 0,
        })
    }

    pub fn flat<D: RenderDevice + ?Sized>(
        device: &mut D,
        label: &str,
        config: ShadowMapConfig,
    ) -> Result<Self, RenderError> {
        Self::new(device, label, DepthArrayKind::Flat, config)
    }

    pub fn cube<D: RenderDevice + ?Sized>(
        device: &mut D,
        label: &str,
        config: ShadowMapConfig,
    ) -> Result<Self, RenderError> {
        Self::new(device, label, DepthArrayKind::Cube, config)
    }

    /// Makes room for `requested` maps.
    ///
    /// A pool that is too small is replaced by one sized exactly to
    /// `requested`, invalidating every handle and view obtained before.
    /// Returns whether that happened.
    pub fn ensure_capacity<D: RenderDevice + ?Sized>(
        &mut self,
        device: &mut D,
        requested: usize,
    ) -> Result<bool, RenderError> {
        if requested <= self.capacity as usize {
            return Ok(false);
        }
        let requested = u32::try_from(requested).map_err(|_| RenderError::Allocation {
            label: self.label.clone(),
            reason: format!("{requested} shadow maps exceed the addressable range"),
        })?;
        debug!(
            "reallocating {} from {} to {} maps",
            self.label, self.capacity, requested
        );
        let array = allocate(device, &self.label, self.kind, &self.config, requested)?;
        let old = std::mem::replace(&mut self.array, array);
        device.destroy_texture(old.texture)?;
        self.capacity = requested;
        self.generation += 1;
        Ok(true)
    }

    /// Clears every map to the far plane.
    pub fn clear<D: RenderDevice + ?Sized>(&self, device: &mut D) -> Result<(), RenderError> {
        for view in &self.array.depth_views {
            device.clear_depth(*view, 1.0)?;
        }
        Ok(())
    }

    pub fn handle(&self, index: u32) -> Option<ShadowMapHandle> {
        (index < self.capacity).then_some(ShadowMapHandle {
            generation: self.generation,
            index,
        })
    }

    /// Depth-attachment views of a map: one for flat pools, six cube faces
    /// for cube pools. `None` once the handle has gone stale.
    pub fn depth_views(&self, handle: ShadowMapHandle) -> Option<&[TextureViewId]> {
        if handle.generation != self.generation || handle.index >= self.capacity {
            return None;
        }
        let per_map = self.kind.layers_per_map() as usize;
        let start = handle.index as usize * per_map;
        self.array.depth_views.get(start..start + per_map)
    }

    /// Shader view over the whole array.
    pub fn shader_view(&self) -> TextureViewId {
        self.array.shader_view
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn kind(&self) -> DepthArrayKind {
        self.kind
    }

    pub fn config(&self) -> &ShadowMapConfig {
        &self.config
    }

    pub fn depth_array(&self) -> &DepthArray {
        &self.array
    }
}

fn allocate<D: RenderDevice + ?Sized>(
    device: &mut D,
    label: &str,
    kind: DepthArrayKind,
    config: &ShadowMapConfig,
    maps: u32,
) -> Result<DepthArray, RenderError> {
    device.create_depth_array(&DepthArrayDescriptor {
        label: label.to_string(),
        width: config.resolution,
        height: config.resolution,
        maps,
        format: config.format,
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RecordingDevice;

    fn config() -> ShadowMapConfig {
        ShadowMapConfig {
            resolution: 16,
            ..ShadowMapConfig::default()
        }
    }

    #[test]
    fn smaller_requests_keep_the_pool() {
        let mut device = RecordingDevice::new();
        let mut pool = ShadowMapPool::flat(&mut device, "spot", config()).unwrap();
        pool.ensure_capacity(&mut device, 3).unwrap();
        let handle = pool.handle(2).unwrap();
        let texture = pool.depth_array().texture;

        assert!(!pool.ensure_capacity(&mut device, 2).unwrap());
        assert!(!pool.ensure_capacity(&mut device, 3).unwrap());
        assert_eq!(pool.depth_array().texture, texture);
        assert_eq!(pool.depth_views(handle).map(<[_]>::len), Some(1));
    }

    #[test]
    fn growth_reallocates_to_exact_size() {
        let mut device = RecordingDevice::new();
        let mut pool = ShadowMapPool::flat(&mut device, "directional", config()).unwrap();
        let old_texture = pool.depth_array().texture;
        let handle = pool.handle(0).unwrap();

        assert!(pool.ensure_capacity(&mut device, 4).unwrap());
        assert_eq!(pool.capacity(), 4);
        assert_eq!(pool.generation(), 1);
        assert_eq!(device.texture_layers(pool.depth_array().texture), Some(4));
        assert!(device.texture_layers(old_texture).is_none());
        assert!(pool.depth_views(handle).is_none());
        assert!(pool.depth_views(pool.handle(0).unwrap()).is_some());
        assert!(pool.handle(4).is_none());
    }

    #[test]
    fn cube_pools_count_in_cubes() {
        let mut device = RecordingDevice::new();
        let mut pool = ShadowMapPool::cube(&mut device, "omni", config()).unwrap();
        pool.ensure_capacity(&mut device, 2).unwrap();
        assert_eq!(device.texture_layers(pool.depth_array().texture), Some(12));
        let faces = pool.depth_views(pool.handle(1).unwrap()).unwrap();
        assert_eq!(faces, &pool.depth_array().depth_views[6..12]);
    }

    #[test]
    fn clear_resets_every_layer() {
        let mut device = RecordingDevice::new();
        let pool = ShadowMapPool::cube(&mut device, "omni", config()).unwrap();
        pool.clear(&mut device).unwrap();
        for view in &pool.depth_array().depth_views {
            assert_eq!(device.depth_value(*view), Some(1.0));
        }
    }

    #[test]
    fn failed_growth_keeps_the_old_pool() {
        let mut device = RecordingDevice::with_allocation_limit(1);
        let mut pool = ShadowMapPool::flat(&mut device, "spot", config()).unwrap();
        let err = pool.ensure_capacity(&mut device, 2).unwrap_err();
        assert!(matches!(err, RenderError::Allocation { .. }));
        assert_eq!(pool.capacity(), 1);
        assert_eq!(device.live_textures(), 1);
    }
}
