use glam::UVec2;
use serde::{Deserialize, Serialize};

/// Anti-aliasing technique used for the final image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AntiAliasing {
    #[default]
    None,
    Aa,
    Fxaa,
    Msaa2x,
    Msaa4x,
    Msaa8x,
    Ssaa2x,
    Ssaa3x,
    Ssaa4x,
}

impl AntiAliasing {
    pub const ALL: [AntiAliasing; 9] = [
        AntiAliasing::None,
        AntiAliasing::Aa,
        AntiAliasing::Fxaa,
        AntiAliasing::Msaa2x,
        AntiAliasing::Msaa4x,
        AntiAliasing::Msaa8x,
        AntiAliasing::Ssaa2x,
        AntiAliasing::Ssaa3x,
        AntiAliasing::Ssaa4x,
    ];

    /// Factor by which supersampling scales the render resolution.
    pub fn resolution_multiplier(self) -> u32 {
        match self {
            AntiAliasing::Ssaa2x => 2,
            AntiAliasing::Ssaa3x => 3,
            AntiAliasing::Ssaa4x => 4,
            _ => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AntiAliasing::None => "none",
            AntiAliasing::Aa => "aa",
            AntiAliasing::Fxaa => "fxaa",
            AntiAliasing::Msaa2x => "msaa2x",
            AntiAliasing::Msaa4x => "msaa4x",
            AntiAliasing::Msaa8x => "msaa8x",
            AntiAliasing::Ssaa2x => "ssaa2x",
            AntiAliasing::Ssaa3x => "ssaa3x",
            AntiAliasing::Ssaa4x => "ssaa4x",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        Self::ALL.into_iter().find(|aa| aa.name() == name)
    }
}

/// Rectangle of the render target a camera draws into, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub top_left: UVec2,
    pub size: UVec2,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            top_left: UVec2::ZERO,
            size: UVec2::new(width, height),
        }
    }

    /// Same viewport on a target supersampled by `aa`, saturating at
    /// `u32::MAX` per axis.
    pub fn supersampled(&self, aa: AntiAliasing) -> Self {
        let multiplier = UVec2::splat(aa.resolution_multiplier());
        Self {
            top_left: self.top_left.saturating_mul(multiplier),
            size: self.size.saturating_mul(multiplier),
        }
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.size.y == 0 {
            1.0
        } else {
            self.size.x as f32 / self.size.y as f32
        }
    }

    /// `1 / (size - 1)` per axis, mapping pixel indices to `[0, 1]`.
    pub fn inv_resolution_minus1(&self) -> [f32; 2] {
        [
            1.0 / (self.size.x as f32 - 1.0),
            1.0 / (self.size.y as f32 - 1.0),
        ]
    }
}
