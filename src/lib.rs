//! Light-buffer pass of a deferred renderer.
//!
//! Each frame the pass culls the scene's lights against the camera
//! frustum, packs the survivors into GPU records, sizes the shadow-map
//! pools and binds everything for the lighting shaders. The GPU sits
//! behind [`RenderDevice`] so the whole pass runs headless as well.

pub mod app;
pub mod camera;
pub mod culling;
pub mod data_model;
pub mod light;
pub mod lighting;
pub mod render;
pub mod scene;
pub mod script;
pub mod settings;
pub mod transform;

pub use camera::{AntiAliasing, Camera, CameraBuffer, Viewport, VoxelizationSettings};
pub use culling::{Aabb, BoundingSphere, ViewFrustum};
pub use data_model::SceneStore;
pub use light::{DirectionalLight, OmniLight, SpotLight};
pub use lighting::{LBufferPass, ShadowMapConfig, ShadowMapPool, ViewTransforms};
pub use render::{RecordingDevice, RenderDevice, RenderError, WgpuDevice};
pub use scene::{CameraNode, LightNode, PassScene};
pub use script::{Value, VariableScript};
pub use settings::EngineSettings;
pub use transform::Transform;
