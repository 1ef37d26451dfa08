use anyhow::{Context, Result};
use log::{debug, info};

use crate::camera::{Camera, CameraBuffer, CameraSettings, Viewport};
use crate::lighting::{LBufferPass, LightingConstants, ViewTransforms};
use crate::render::{ConstantBuffer, RenderDevice};
use crate::scene::{CameraNode, PassScene};
use crate::settings::EngineSettings;

/// Summary of one rendered frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    pub camera: String,
    pub camera_settings: CameraSettings,
    pub constants: LightingConstants,
    pub directional_shadow_maps: u32,
    pub omni_shadow_maps: u32,
    pub spot_shadow_maps: u32,
    pub shadow_cameras: usize,
}

/// Drives the light pass and the camera buffer once per frame.
#[derive(Debug)]
pub struct FrameRenderer<D: RenderDevice> {
    device: D,
    settings: EngineSettings,
    pass: LBufferPass,
    camera_buffer: ConstantBuffer<CameraBuffer>,
    frames: u64,
}

impl<D: RenderDevice> FrameRenderer<D> {
    pub fn new(mut device: D, settings: EngineSettings) -> Result<Self> {
        let pass = LBufferPass::new(&mut device, settings.shadow_maps)
            .context("failed to create the light pass")?;
        let camera_buffer = ConstantBuffer::new(&mut device, "camera")
            .context("failed to create the camera buffer")?;
        Ok(Self {
            device,
            settings,
            pass,
            camera_buffer,
            frames: 0,
        })
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn pass(&self) -> &LBufferPass {
        &self.pass
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Renders `scene` from its camera, or from a default camera sized to
    /// the display when the scene has none.
    pub fn render_frame(&mut self, scene: &PassScene) -> Result<FrameReport> {
        let camera = scene
            .camera
            .clone()
            .unwrap_or_else(|| self.default_camera());
        let view = ViewTransforms::new(
            camera.camera.camera_to_projection(),
            camera.transform.world_to_object(),
        );

        self.pass
            .render(&mut self.device, scene, &view)
            .with_context(|| format!("light pass failed on frame {}", self.frames))?;
        self.pass
            .clear_shadow_maps(&mut self.device)
            .context("failed to clear shadow maps")?;
        camera
            .camera
            .update_buffer(
                &mut self.device,
                &self.camera_buffer,
                &camera.transform,
                self.settings.anti_aliasing,
                &self.settings.voxelization,
            )
            .context("failed to update the camera buffer")?;

        let report = FrameReport {
            frame: self.frames,
            camera: camera.name,
            camera_settings: camera.camera.settings,
            constants: *self.pass.constants(),
            directional_shadow_maps: self.pass.directional_shadow_maps().capacity(),
            omni_shadow_maps: self.pass.omni_shadow_maps().capacity(),
            spot_shadow_maps: self.pass.spot_shadow_maps().capacity(),
            shadow_cameras: self.pass.directional_cameras().len()
                + self.pass.omni_cameras().len()
                + self.pass.spot_cameras().len(),
        };
        debug!("rendered frame {} from {}", report.frame, report.camera);
        self.frames += 1;
        Ok(report)
    }

    fn default_camera(&self) -> CameraNode {
        info!("scene has no camera; using the default camera");
        let mut camera = Camera {
            viewport: Viewport::new(self.settings.display_width, self.settings.display_height),
            ..Camera::default()
        };
        camera.settings.gamma = self.settings.gamma;
        CameraNode {
            name: "default".to_string(),
            camera,
            ..CameraNode::default()
        }
    }
}

pub fn print_report(report: &FrameReport) {
    let constants = &report.constants;
    println!("Frame {} (camera {}):", report.frame, report.camera);
    let settings = &report.camera_settings;
    let layers = settings.render_layers.names();
    println!(
        " - render mode: {}, brdf: {}, layers: {}",
        settings.render_mode.name(),
        settings.brdf.name(),
        if layers.is_empty() {
            "none".to_string()
        } else {
            layers.join(" ")
        }
    );
    println!(
        " - lights: {} directional, {} omni, {} spot",
        constants.nb_directional_lights, constants.nb_omni_lights, constants.nb_spot_lights
    );
    println!(
        " - shadowed lights: {} directional, {} omni, {} spot",
        constants.nb_sm_directional_lights,
        constants.nb_sm_omni_lights,
        constants.nb_sm_spot_lights
    );
    println!(
        " - shadow maps: {} directional, {} omni, {} spot ({} shadow cameras)",
        report.directional_shadow_maps,
        report.omni_shadow_maps,
        report.spot_shadow_maps,
        report.shadow_cameras
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::RenderMode;
    use crate::light::OmniLight;
    use crate::render::{RecordingDevice, ShaderStage, SLOT_CBUFFER_CAMERA};
    use crate::scene::LightNode;
    use crate::transform::Transform;
    use glam::Vec3;

    #[test]
    fn frames_without_camera_use_the_display_size() {
        let settings = EngineSettings {
            display_width: 640,
            display_height: 480,
            ..EngineSettings::default()
        };
        let mut renderer = FrameRenderer::new(RecordingDevice::new(), settings).unwrap();
        let report = renderer.render_frame(&PassScene::default()).unwrap();
        assert_eq!(report.camera, "default");
        assert_eq!(report.frame, 0);

        let buffer = renderer
            .device()
            .bound_constant_buffer(ShaderStage::Fragment, SLOT_CBUFFER_CAMERA)
            .unwrap();
        let contents = renderer.device().buffer_contents(buffer).unwrap();
        let data: CameraBuffer = bytemuck::pod_read_unaligned(contents);
        assert_eq!(data.viewport_inv_resolution_minus1, [1.0 / 639.0, 1.0 / 479.0]);
    }

    #[test]
    fn oversized_supersampled_display_renders() {
        let script = crate::script::VariableScript::parse(
            "#begin\ndisplay_width int 2000000000\nanti_aliasing string \"ssaa4x\"\n#end",
        )
        .unwrap();
        let settings = EngineSettings::from_script(&script).unwrap();
        let mut renderer = FrameRenderer::new(RecordingDevice::new(), settings).unwrap();
        renderer.render_frame(&PassScene::default()).unwrap();

        let buffer = renderer
            .device()
            .bound_constant_buffer(ShaderStage::Fragment, SLOT_CBUFFER_CAMERA)
            .unwrap();
        let contents = renderer.device().buffer_contents(buffer).unwrap();
        let data: CameraBuffer = bytemuck::pod_read_unaligned(contents);
        assert_eq!(data.ss_viewport_resolution, [u32::MAX, 2880]);
    }

    #[test]
    fn headless_frames_do_not_accumulate_a_command_log() {
        let mut renderer =
            FrameRenderer::new(RecordingDevice::new(), EngineSettings::default()).unwrap();
        for _ in 0..100 {
            renderer.render_frame(&PassScene::default()).unwrap();
        }
        assert!(renderer.device().commands().is_empty());
    }

    #[test]
    fn report_carries_the_camera_render_options() {
        let scene = PassScene::from_xml(
            "<scene><object>\
                <name>Eye</name><type>camera</type>\
                <render-mode>voxel-grid</render-mode><layers>aabb</layers>\
            </object></scene>",
        )
        .unwrap();
        let mut renderer =
            FrameRenderer::new(RecordingDevice::new(), EngineSettings::default()).unwrap();
        let report = renderer.render_frame(&scene).unwrap();
        assert_eq!(report.camera, "Eye");
        assert_eq!(report.camera_settings.render_mode, RenderMode::VoxelGrid);
        assert_eq!(report.camera_settings.render_layers.names(), vec!["aabb"]);

        let report = renderer.render_frame(&PassScene::default()).unwrap();
        assert_eq!(report.camera_settings.render_mode, RenderMode::Forward);
        assert!(report.camera_settings.render_layers.is_empty());
    }

    #[test]
    fn report_counts_shadowed_lights() {
        let mut renderer =
            FrameRenderer::new(RecordingDevice::new(), EngineSettings::default()).unwrap();
        let scene = PassScene {
            sm_omni_lights: vec![LightNode::new(
                "bulb",
                Transform::from_translation(Vec3::new(0.0, 0.0, 5.0)),
                OmniLight::default(),
            )],
            ..PassScene::default()
        };
        renderer.render_frame(&scene).unwrap();
        let report = renderer.render_frame(&scene).unwrap();
        assert_eq!(report.frame, 1);
        assert_eq!(report.constants.nb_sm_omni_lights, 1);
        assert_eq!(report.omni_shadow_maps, 1);
        assert_eq!(report.shadow_cameras, 6);
    }
}
