use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Render mode selected for a camera. The light pass itself runs the same
/// way in every mode; the mode is carried for the shading passes and
/// reported per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RenderMode {
    None,
    #[default]
    Forward,
    Deferred,
    Solid,
    VoxelGrid,
    FalseColor,
}

impl RenderMode {
    pub const ALL: [RenderMode; 6] = [
        RenderMode::None,
        RenderMode::Forward,
        RenderMode::Deferred,
        RenderMode::Solid,
        RenderMode::VoxelGrid,
        RenderMode::FalseColor,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RenderMode::None => "none",
            RenderMode::Forward => "forward",
            RenderMode::Deferred => "deferred",
            RenderMode::Solid => "solid",
            RenderMode::VoxelGrid => "voxel-grid",
            RenderMode::FalseColor => "false-color",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        Self::ALL.into_iter().find(|mode| mode.name() == name)
    }
}

/// Reflectance model selected for a camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Brdf {
    #[default]
    Unknown,
    Lambertian,
    BlinnPhong,
    CookTorrance,
}

impl Brdf {
    pub const ALL: [Brdf; 4] = [
        Brdf::Unknown,
        Brdf::Lambertian,
        Brdf::BlinnPhong,
        Brdf::CookTorrance,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Brdf::Unknown => "unknown",
            Brdf::Lambertian => "lambertian",
            Brdf::BlinnPhong => "blinn-phong",
            Brdf::CookTorrance => "cook-torrance",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        Self::ALL.into_iter().find(|brdf| brdf.name() == name)
    }
}

/// Debug overlay requested for a camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum RenderLayer {
    Wireframe = 1 << 0,
    Aabb = 1 << 1,
}

impl RenderLayer {
    pub const ALL: [RenderLayer; 2] = [RenderLayer::Wireframe, RenderLayer::Aabb];

    pub fn name(self) -> &'static str {
        match self {
            RenderLayer::Wireframe => "wireframe",
            RenderLayer::Aabb => "aabb",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        Self::ALL.into_iter().find(|layer| layer.name() == name)
    }
}

/// Set of [`RenderLayer`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RenderLayers(u32);

impl RenderLayers {
    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn has(self, layer: RenderLayer) -> bool {
        self.0 & layer as u32 != 0
    }

    pub fn add(&mut self, layer: RenderLayer) {
        self.0 |= layer as u32;
    }

    pub fn remove(&mut self, layer: RenderLayer) {
        self.0 &= !(layer as u32);
    }

    pub fn toggle(&mut self, layer: RenderLayer) {
        self.0 ^= layer as u32;
    }

    pub fn reset(&mut self) {
        self.0 = 0;
    }
    /// Names of the layers in the set, in declaration order.
    pub fn names(self) -> Vec<&'static str> {
        RenderLayer::ALL
            .into_iter()
            .filter(|layer| self.has(*layer))
            .map(RenderLayer::name)
            .collect()
    }
}

/// Distance fog seen by the camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FogSettings {
    pub base_color: Vec3,
    pub density: f32,
}

impl Default for FogSettings {
    fn default() -> Self {
        Self {
            base_color: Vec3::splat(0.5),
            density: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkySettings {
    /// Vertical scale of the sky dome.
    pub scale_z: f32,
}

impl Default for SkySettings {
    fn default() -> Self {
        Self { scale_z: 1.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoxelConeTracingSettings {
    pub nb_cones: u32,
    pub cone_step_multiplier: f32,
    pub max_cone_distance: f32,
}

impl Default for VoxelConeTracingSettings {
    fn default() -> Self {
        Self {
            nb_cones: 8,
            cone_step_multiplier: 0.2,
            max_cone_distance: 1.0,
        }
    }
}

/// Per-camera rendering options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    pub render_mode: RenderMode,
    pub brdf: Brdf,
    pub render_layers: RenderLayers,
    pub fog: FogSettings,
    pub sky: SkySettings,
    pub vct: VoxelConeTracingSettings,
    pub gamma: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            render_mode: RenderMode::default(),
            brdf: Brdf::default(),
            render_layers: RenderLayers::default(),
            fog: FogSettings::default(),
            sky: SkySettings::default(),
            vct: VoxelConeTracingSettings::default(),
            gamma: 2.2,
        }
    }
}

impl CameraSettings {
    /// Restores render mode, BRDF and render layers.
    pub fn reset(&mut self) {
        self.render_mode = RenderMode::default();
        self.brdf = Brdf::default();
        self.render_layers.reset();
    }
}
