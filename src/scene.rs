use anyhow::{anyhow, bail, Context, Result};
use glam::{UVec2, Vec3};
use log::debug;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::camera::{
    Brdf, Camera, ClippingPlanes, Lens, Projection, RenderLayer, RenderMode, Viewport,
};
use crate::light::{DirectionalLight, DistanceFalloff, OmniLight, OrthographicExtent, SpotLight};
use crate::transform::Transform;

/// A light placed in the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightNode<L> {
    pub name: String,
    pub transform: Transform,
    pub light: L,
}

impl<L> LightNode<L> {
    pub fn new(name: impl Into<String>, transform: Transform, light: L) -> Self {
        Self {
            name: name.into(),
            transform,
            light,
        }
    }
}

/// A camera placed in the world.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CameraNode {
    pub name: String,
    pub transform: Transform,
    pub camera: Camera,
}

/// Scene-wide distance fog used by the lighting shaders.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fog {
    pub color: Vec3,
    pub falloff: DistanceFalloff,
}

impl Default for Fog {
    fn default() -> Self {
        Self {
            color: Vec3::splat(0.5),
            falloff: DistanceFalloff::new(0.0, 100.0),
        }
    }
}

/// Everything the light pass reads for one frame.
///
/// Lights are split by type and by whether they cast shadows.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PassScene {
    pub directional_lights: Vec<LightNode<DirectionalLight>>,
    pub omni_lights: Vec<LightNode<OmniLight>>,
    pub spot_lights: Vec<LightNode<SpotLight>>,
    pub sm_directional_lights: Vec<LightNode<DirectionalLight>>,
    pub sm_omni_lights: Vec<LightNode<OmniLight>>,
    pub sm_spot_lights: Vec<LightNode<SpotLight>>,
    pub ambient: Vec3,
    pub fog: Fog,
    pub camera: Option<CameraNode>,
}

impl PassScene {
    /// Parses a scene description.
    ///
    /// The root holds optional `<ambient>` and `<fog>` elements and a list
    /// of `<object>`s of type `camera`, `directional`, `omni` or `spot`.
    /// Objects of any other type are skipped.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid scene XML")?;
        let root = document.root_element();
        let mut scene = PassScene {
            ambient: parse_color(optional_text(&root, "ambient"), Vec3::ZERO)?,
            ..PassScene::default()
        };
        if let Some(fog) = root.children().find(|child| child.has_tag_name("fog")) {
            scene.fog = parse_fog(&fog)?;
        }

        for node in root.children().filter(|n| n.has_tag_name("object")) {
            let name = required_text(&node, "name")?;
            let object_type = optional_text(&node, "type").unwrap_or_default();
            let transform = parse_transform(&node)
                .with_context(|| format!("invalid transform for {name}"))?;
            let shadows = parse_bool(optional_text(&node, "shadows"), false)?;
            match object_type.as_str() {
                "camera" => {
                    if scene.camera.is_some() {
                        bail!("scene has more than one camera ({name})");
                    }
                    let camera =
                        parse_camera(&node).with_context(|| format!("invalid camera {name}"))?;
                    scene.camera = Some(CameraNode {
                        name,
                        transform,
                        camera,
                    });
                }
                "directional" => {
                    let light = parse_directional(&node)
                        .with_context(|| format!("invalid directional light {name}"))?;
                    let node = LightNode::new(name, transform, light);
                    if shadows {
                        scene.sm_directional_lights.push(node);
                    } else {
                        scene.directional_lights.push(node);
                    }
                }
                "omni" => {
                    let light = parse_omni(&node)
                        .with_context(|| format!("invalid omni light {name}"))?;
                    let node = LightNode::new(name, transform, light);
                    if shadows {
                        scene.sm_omni_lights.push(node);
                    } else {
                        scene.omni_lights.push(node);
                    }
                }
                "spot" => {
                    let light = parse_spot(&node)
                        .with_context(|| format!("invalid spot light {name}"))?;
                    let node = LightNode::new(name, transform, light);
                    if shadows {
                        scene.sm_spot_lights.push(node);
                    } else {
                        scene.spot_lights.push(node);
                    }
                }
                other => debug!("skipping {name} of type {other:?}"),
            }
        }

        Ok(scene)
    }

    /// Number of lights of every type, shadow-mapped or not.
    pub fn light_count(&self) -> usize {
        self.directional_lights.len()
            + self.omni_lights.len()
            + self.spot_lights.len()
            + self.sm_directional_lights.len()
            + self.sm_omni_lights.len()
            + self.sm_spot_lights.len()
    }
}

fn parse_transform(node: &Node<'_, '_>) -> Result<Transform> {
    let position = parse_vec3(optional_text(node, "position"), Vec3::ZERO)?;
    let rotation = parse_vec3(optional_text(node, "rotation"), Vec3::ZERO)?;
    let scale = parse_vec3(optional_text(node, "scale"), Vec3::ONE)?;
    Ok(Transform::from_euler_degrees(position, rotation, scale))
}

fn parse_intensity(node: &Node<'_, '_>) -> Result<Vec3> {
    let color = parse_color(optional_text(node, "color"), Vec3::ONE)?;
    let intensity = parse_f32(optional_text(node, "intensity"), 1.0)?;
    Ok(color * intensity)
}

fn parse_falloff(node: &Node<'_, '_>) -> Result<DistanceFalloff> {
    let default = DistanceFalloff::default();
    Ok(DistanceFalloff::new(
        parse_f32(optional_text(node, "falloff-start"), default.start)?,
        parse_f32(optional_text(node, "falloff-end"), default.end)?,
    ))
}

fn parse_fog(node: &Node<'_, '_>) -> Result<Fog> {
    let default = Fog::default();
    Ok(Fog {
        color: parse_color(optional_text(node, "color"), default.color)?,
        falloff: DistanceFalloff::new(
            parse_f32(optional_text(node, "start"), default.falloff.start)?,
            parse_f32(optional_text(node, "end"), default.falloff.end)?,
        ),
    })
}

fn parse_directional(node: &Node<'_, '_>) -> Result<DirectionalLight> {
    let mut light = DirectionalLight::new(parse_intensity(node)?);
    if let Some(extent) = optional_text(node, "extent") {
        let [width, height, near, far] = parse_floats::<4>(&extent)?;
        light.shadow_extent = OrthographicExtent {
            width,
            height,
            near,
            far,
        };
    }
    Ok(light)
}

fn parse_omni(node: &Node<'_, '_>) -> Result<OmniLight> {
    Ok(OmniLight::new(parse_intensity(node)?, parse_falloff(node)?))
}

fn parse_spot(node: &Node<'_, '_>) -> Result<SpotLight> {
    let penumbra = parse_f32(optional_text(node, "penumbra"), 22.5)?;
    let umbra = parse_f32(optional_text(node, "umbra"), 45.0)?;
    Ok(SpotLight::new(
        parse_intensity(node)?,
        parse_f32(optional_text(node, "exponent"), 1.0)?,
        parse_falloff(node)?,
        penumbra.to_radians(),
        umbra.to_radians(),
    ))
}

fn parse_camera(node: &Node<'_, '_>) -> Result<Camera> {
    let mut camera = Camera::default();
    camera.projection = match optional_text(node, "ortho-size") {
        Some(size) => {
            let [width, height] = parse_floats::<2>(&size)?;
            Projection::Orthographic { width, height }
        }
        None => Projection::Perspective {
            fov_y: parse_f32(optional_text(node, "fov"), 45.0)?.to_radians(),
        },
    };
    let defaults = ClippingPlanes::default();
    camera.clipping_planes = ClippingPlanes {
        near: parse_f32(optional_text(node, "near"), defaults.near)?,
        far: parse_f32(optional_text(node, "far"), defaults.far)?,
    };
    if let Some(size) = optional_text(node, "viewport") {
        let [width, height] = parse_floats::<2>(&size)?;
        camera.viewport = Viewport {
            top_left: UVec2::ZERO,
            size: UVec2::new(width as u32, height as u32),
        };
    }
    if let Some(lens) = optional_text(node, "lens") {
        let [radius, focal_length, max_coc_radius] = parse_floats::<3>(&lens)?;
        camera.lens = Lens {
            radius,
            focal_length,
            max_coc_radius,
        };
    }
    let settings = &mut camera.settings;
    settings.fog.base_color =
        parse_color(optional_text(node, "fog-color"), settings.fog.base_color)?;
    settings.fog.density = parse_f32(optional_text(node, "fog-density"), settings.fog.density)?;
    settings.sky.scale_z =
        parse_f32(optional_text(node, "sky-scale-z"), settings.sky.scale_z)?;
    settings.gamma = parse_f32(optional_text(node, "gamma"), settings.gamma)?;
    if let Some(name) = optional_text(node, "render-mode") {
        settings.render_mode = RenderMode::from_name(&name)
            .ok_or_else(|| anyhow!("unknown render mode {name:?}"))?;
    }
    if let Some(name) = optional_text(node, "brdf") {
        settings.brdf =
            Brdf::from_name(&name).ok_or_else(|| anyhow!("unknown BRDF {name:?}"))?;
    }
    if let Some(names) = optional_text(node, "layers") {
        for name in names.split_whitespace() {
            let layer = RenderLayer::from_name(name)
                .ok_or_else(|| anyhow!("unknown render layer {name:?}"))?;
            settings.render_layers.add(layer);
        }
    }
    Ok(camera)
}

fn required_text(node: &Node<'_, '_>, tag: &str) -> Result<String> {
    optional_text(node, tag).ok_or_else(|| anyhow!("<{tag}> tag is missing"))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    node.children()
        .find(|child| child.has_tag_name(tag))
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_floats<const N: usize>(value: &str) -> Result<[f32; N]> {
    let numbers = value
        .split_whitespace()
        .map(|component| {
            component
                .parse::<f32>()
                .map_err(|err| anyhow!("failed to parse float {component:?}: {err}"))
        })
        .collect::<Result<Vec<_>>>()?;
    let count = numbers.len();
    numbers
        .try_into()
        .map_err(|_| anyhow!("expected {N} components, found {count}"))
}

fn parse_vec3(value: Option<String>, default: Vec3) -> Result<Vec3> {
    let Some(value) = value else {
        return Ok(default);
    };
    let components = parse_floats::<3>(&value).context("vector is malformed")?;
    Ok(Vec3::from_array(components))
}

fn parse_color(value: Option<String>, default: Vec3) -> Result<Vec3> {
    let Some(value) = value else {
        return Ok(default);
    };
    let components = parse_floats::<3>(&value).context("color is malformed")?;
    Ok(Vec3::from_array(components) / 255.0)
}

fn parse_f32(value: Option<String>, default: f32) -> Result<f32> {
    match value {
        Some(value) => value
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse float: {err}")),
        None => Ok(default),
    }
}

fn parse_bool(value: Option<String>, default: bool) -> Result<bool> {
    match value.as_deref() {
        Some("true") | Some("1") => Ok(true),
        Some("false") | Some("0") => Ok(false),
        Some(other) => Err(anyhow!("failed to parse bool: {other:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
    <scene>
        <ambient>51 51 51</ambient>
        <fog>
            <color>255 255 255</color>
            <start>5</start>
            <end>25</end>
        </fog>
        <object>
            <name>Camera</name>
            <type>camera</type>
            <fov>90</fov>
            <viewport>1920 1080</viewport>
        </object>
        <object>
            <name>Bulb</name>
            <type>omni</type>
            <intensity>2.5</intensity>
            <position>0 5 0</position>
            <color>255 128 0</color>
            <falloff-start>1</falloff-start>
            <falloff-end>6</falloff-end>
        </object>
        <object>
            <name>Torch</name>
            <type>spot</type>
            <shadows>true</shadows>
            <umbra>30</umbra>
        </object>
        <object>
            <name>Crate</name>
            <type>mesh</type>
        </object>
    </scene>
    "#;

    #[test]
    fn parse_scene_sorts_lights_by_type_and_shadows() {
        let scene = PassScene::from_xml(SAMPLE).unwrap();
        assert_eq!(scene.light_count(), 2);
        assert_eq!(scene.omni_lights.len(), 1);
        assert_eq!(scene.sm_spot_lights.len(), 1);
        assert!((scene.ambient.x - 0.2).abs() < 1e-6);
        assert_eq!(scene.fog.falloff, DistanceFalloff::new(5.0, 25.0));

        let bulb = &scene.omni_lights[0];
        assert_eq!(bulb.transform.world_eye(), Vec3::new(0.0, 5.0, 0.0));
        assert!(bulb
            .light
            .intensity
            .abs_diff_eq(Vec3::new(2.5, 2.5 * 128.0 / 255.0, 0.0), 1e-6));
        assert_eq!(bulb.light.bounding_sphere().radius, 6.0);

        let torch = &scene.sm_spot_lights[0];
        assert!((torch.light.umbra_angle() - 30f32.to_radians()).abs() < 1e-5);

        let camera = scene.camera.unwrap();
        assert_eq!(camera.camera.viewport.size, UVec2::new(1920, 1080));
    }

    #[test]
    fn missing_name_is_an_error() {
        let bad = "<scene><object><type>omni</type></object></scene>";
        assert!(PassScene::from_xml(bad).is_err());
    }

    #[test]
    fn malformed_vectors_are_rejected() {
        let bad = "<scene><object>\
            <name>A</name><type>omni</type><position>1 2</position>\
        </object></scene>";
        assert!(PassScene::from_xml(bad).is_err());
    }

    #[test]
    fn camera_render_options_are_parsed() {
        let xml = "<scene><object>\
            <name>Eye</name><type>camera</type>\
            <render-mode>deferred</render-mode>\
            <brdf>cook-torrance</brdf>\
            <layers>wireframe aabb</layers>\
        </object></scene>";
        let scene = PassScene::from_xml(xml).unwrap();
        let settings = scene.camera.unwrap().camera.settings;
        assert_eq!(settings.render_mode, RenderMode::Deferred);
        assert_eq!(settings.brdf, Brdf::CookTorrance);
        assert!(settings.render_layers.has(RenderLayer::Wireframe));
        assert!(settings.render_layers.has(RenderLayer::Aabb));

        let bad = "<scene><object>\
            <name>Eye</name><type>camera</type><brdf>phong</brdf>\
        </object></scene>";
        assert!(PassScene::from_xml(bad).is_err());
    }

    #[test]
    fn second_camera_is_rejected() {
        let bad = "<scene>\
            <object><name>A</name><type>camera</type></object>\
            <object><name>B</name><type>camera</type></object>\
        </scene>";
        assert!(PassScene::from_xml(bad).is_err());
    }
}
