use std::path::Path;

use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::camera::{AntiAliasing, VoxelizationSettings};
use crate::lighting::ShadowMapConfig;
use crate::render::DepthFormat;
use crate::script::{Value, VariableScript};

const DISPLAY_WIDTH: &str = "display_width";
const DISPLAY_HEIGHT: &str = "display_height";
const ANTI_ALIASING: &str = "anti_aliasing";
const SHADOW_MAP_RESOLUTION: &str = "shadow_map_resolution";
const SHADOW_MAP_FORMAT: &str = "shadow_map_format";
const VOXEL_GRID_CENTER: &str = "voxel_grid_center";
const VOXEL_GRID_RESOLUTION: &str = "voxel_grid_resolution";
const VOXEL_SIZE: &str = "voxel_size";
const GAMMA: &str = "gamma";

/// Engine-wide settings persisted as a variable script.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    pub display_width: u32,
    pub display_height: u32,
    pub anti_aliasing: AntiAliasing,
    pub shadow_maps: ShadowMapConfig,
    pub voxelization: VoxelizationSettings,
    pub gamma: f32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            display_width: 1280,
            display_height: 720,
            anti_aliasing: AntiAliasing::None,
            shadow_maps: ShadowMapConfig::default(),
            voxelization: VoxelizationSettings::default(),
            gamma: 2.2,
        }
    }
}

impl EngineSettings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let script = VariableScript::load(path)
            .with_context(|| format!("failed to read settings {}", path.display()))?;
        Self::from_script(&script)
            .with_context(|| format!("invalid settings in {}", path.display()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.to_script()
            .save(path)
            .with_context(|| format!("failed to write settings {}", path.display()))
    }

    /// Reads the known variables; missing ones keep their defaults.
    pub fn from_script(script: &VariableScript) -> Result<Self> {
        let mut settings = Self::default();
        if let Some(width) = read(script, DISPLAY_WIDTH, Value::as_int)? {
            settings.display_width = non_negative(DISPLAY_WIDTH, width)?;
        }
        if let Some(height) = read(script, DISPLAY_HEIGHT, Value::as_int)? {
            settings.display_height = non_negative(DISPLAY_HEIGHT, height)?;
        }
        if let Some(name) = read(script, ANTI_ALIASING, |v| v.as_str().map(str::to_string))? {
            settings.anti_aliasing = AntiAliasing::from_name(&name)
                .ok_or_else(|| anyhow!("unknown anti-aliasing mode {name:?}"))?;
        }
        if let Some(resolution) = read(script, SHADOW_MAP_RESOLUTION, Value::as_int)? {
            settings.shadow_maps.resolution = non_negative(SHADOW_MAP_RESOLUTION, resolution)?;
        }
        if let Some(name) = read(script, SHADOW_MAP_FORMAT, |v| v.as_str().map(str::to_string))? {
            settings.shadow_maps.format = DepthFormat::from_name(&name)
                .ok_or_else(|| anyhow!("unknown depth format {name:?}"))?;
        }
        if let Some(center) = read(script, VOXEL_GRID_CENTER, Value::as_float3)? {
            settings.voxelization.grid_center = center;
        }
        if let Some(resolution) = read(script, VOXEL_GRID_RESOLUTION, Value::as_int)? {
            settings.voxelization.grid_resolution =
                non_negative(VOXEL_GRID_RESOLUTION, resolution)?;
        }
        if let Some(size) = read(script, VOXEL_SIZE, Value::as_float)? {
            settings.voxelization.voxel_size = size;
        }
        if let Some(gamma) = read(script, GAMMA, Value::as_float)? {
            settings.gamma = gamma;
        }

        let known = [
            DISPLAY_WIDTH,
            DISPLAY_HEIGHT,
            ANTI_ALIASING,
            SHADOW_MAP_RESOLUTION,
            SHADOW_MAP_FORMAT,
            VOXEL_GRID_CENTER,
            VOXEL_GRID_RESOLUTION,
            VOXEL_SIZE,
            GAMMA,
        ];
        for variable in script.iter() {
            if !known.contains(&variable.name.as_str()) {
                warn!("ignoring unknown setting {}", variable.name);
            }
        }
        Ok(settings)
    }

    pub fn to_script(&self) -> VariableScript {
        let mut script = VariableScript::new();
        script.set(DISPLAY_WIDTH, clamp_to_int(self.display_width));
        script.set(DISPLAY_HEIGHT, clamp_to_int(self.display_height));
        script.set(ANTI_ALIASING, self.anti_aliasing.name());
        script.set(
            SHADOW_MAP_RESOLUTION,
            clamp_to_int(self.shadow_maps.resolution),
        );
        script.set(SHADOW_MAP_FORMAT, self.shadow_maps.format.name());
        script.set(VOXEL_GRID_CENTER, self.voxelization.grid_center);
        script.set(
            VOXEL_GRID_RESOLUTION,
            clamp_to_int(self.voxelization.grid_resolution),
        );
        script.set(VOXEL_SIZE, self.voxelization.voxel_size);
        script.set(GAMMA, self.gamma);
        script
    }
}

fn read<T>(
    script: &VariableScript,
    name: &str,
    convert: impl FnOnce(&Value) -> Option<T>,
) -> Result<Option<T>> {
    let Some(value) = script.get(name) else {
        return Ok(None);
    };
    convert(value)
        .map(Some)
        .ok_or_else(|| anyhow!("{name} has type {}", value.type_name()))
}

fn non_negative(name: &str, value: i32) -> Result<u32> {
    u32::try_from(value).map_err(|_| anyhow!("{name} must not be negative, got {value}"))
}

fn clamp_to_int(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use tempfile::tempdir;

    #[test]
    fn missing_variables_keep_defaults() {
        let script = VariableScript::parse("#begin\ndisplay_width int 1920\n#end").unwrap();
        let settings = EngineSettings::from_script(&script).unwrap();
        assert_eq!(settings.display_width, 1920);
        assert_eq!(settings.display_height, 720);
        assert_eq!(settings.voxelization, VoxelizationSettings::default());
    }

    #[test]
    fn wrong_types_are_rejected() {
        let script = VariableScript::parse("#begin\ngamma string \"high\"\n#end").unwrap();
        assert!(EngineSettings::from_script(&script).is_err());
        let script = VariableScript::parse("#begin\ndisplay_width int -1\n#end").unwrap();
        assert!(EngineSettings::from_script(&script).is_err());
    }

    #[test]
    fn settings_survive_a_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("engine.var");
        let settings = EngineSettings {
            display_width: 800,
            anti_aliasing: AntiAliasing::Ssaa2x,
            shadow_maps: ShadowMapConfig {
                resolution: 1024,
                format: DepthFormat::D32,
                ..ShadowMapConfig::default()
            },
            voxelization: VoxelizationSettings {
                grid_center: Vec3::new(0.0, 2.0, 0.0),
                grid_resolution: 256,
                voxel_size: 0.05,
            },
            ..EngineSettings::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(EngineSettings::load(&path).unwrap(), settings);
    }
}
