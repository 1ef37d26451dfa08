//! Culls scene lights and converts them to camera-view-space records.
//!
//! Packing is pure: the light pass uploads the returned records.

use glam::{Mat4, Vec3};

use super::light_camera::{omni_face_cameras, LightCamera};
use super::records::{
    matrix, DirectionalLightRecord, DirectionalShadowLightRecord, OmniLightRecord,
    OmniShadowLightRecord, SpotLightRecord, SpotShadowLightRecord,
};
use super::ViewTransforms;
use crate::culling::ViewFrustum;
use crate::light::{DirectionalLight, OmniLight, SpotLight};
use crate::scene::LightNode;
use crate::transform::Transform;

/// Records of shadow-casting lights with the cameras of their shadow maps.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShadowPacking<R> {
    pub records: Vec<R>,
    /// One camera per directional or spot record, six per omni record.
    pub cameras: Vec<LightCamera>,
}

pub fn pack_directional_lights(
    lights: &[LightNode<DirectionalLight>],
    view: &ViewTransforms,
) -> Vec<DirectionalLightRecord> {
    lights
        .iter()
        .map(|node| directional_record(node, view))
        .collect()
}

pub fn pack_omni_lights(
    lights: &[LightNode<OmniLight>],
    view: &ViewTransforms,
) -> Vec<OmniLightRecord> {
    lights
        .iter()
        .filter(|node| !omni_culled(node, view))
        .map(|node| omni_record(node, view))
        .collect()
}

pub fn pack_spot_lights(
    lights: &[LightNode<SpotLight>],
    view: &ViewTransforms,
) -> Vec<SpotLightRecord> {
    lights
        .iter()
        .filter(|node| !spot_culled(node, view))
        .map(|node| spot_record(node, view))
        .collect()
}

/// Directional lights are never culled.
pub fn pack_directional_shadow_lights(
    lights: &[LightNode<DirectionalLight>],
    view: &ViewTransforms,
) -> ShadowPacking<DirectionalShadowLightRecord> {
    let mut packing = ShadowPacking {
        records: Vec::with_capacity(lights.len()),
        cameras: Vec::with_capacity(lights.len()),
    };
    for node in lights {
        let camera = LightCamera::new(
            node.transform.world_to_object(),
            node.light.view_to_projection(),
        );
        let cview_to_lprojection = camera.world_to_lprojection * view.view_to_world;
        packing.records.push(DirectionalShadowLightRecord {
            light: directional_record(node, view),
            cview_to_lprojection: matrix(&cview_to_lprojection),
        });
        packing.cameras.push(camera);
    }
    packing
}

pub fn pack_omni_shadow_lights(
    lights: &[LightNode<OmniLight>],
    view: &ViewTransforms,
) -> ShadowPacking<OmniShadowLightRecord> {
    let mut packing = ShadowPacking {
        records: Vec::with_capacity(lights.len()),
        cameras: Vec::with_capacity(6 * lights.len()),
    };
    for node in lights.iter().filter(|node| !omni_culled(node, view)) {
        let world_to_lview = node.transform.world_to_object();
        packing.cameras.extend(omni_face_cameras(
            world_to_lview,
            node.light.view_to_projection(),
        ));
        let cview_to_lview = world_to_lview * view.view_to_world;
        packing.records.push(OmniShadowLightRecord {
            light: omni_record(node, view),
            cview_to_lview: matrix(&cview_to_lview),
        });
    }
    packing
}

pub fn pack_spot_shadow_lights(
    lights: &[LightNode<SpotLight>],
    view: &ViewTransforms,
) -> ShadowPacking<SpotShadowLightRecord> {
    let mut packing = ShadowPacking {
        records: Vec::with_capacity(lights.len()),
        cameras: Vec::with_capacity(lights.len()),
    };
    for node in lights.iter().filter(|node| !spot_culled(node, view)) {
        let camera = LightCamera::new(
            node.transform.world_to_object(),
            node.light.view_to_projection(),
        );
        let cview_to_lprojection = camera.world_to_lprojection * view.view_to_world;
        packing.records.push(SpotShadowLightRecord {
            light: spot_record(node, view),
            cview_to_lprojection: matrix(&cview_to_lprojection),
        });
        packing.cameras.push(camera);
    }
    packing
}

fn object_to_projection(transform: &Transform, view: &ViewTransforms) -> Mat4 {
    view.world_to_projection * transform.object_to_world()
}

fn omni_culled(node: &LightNode<OmniLight>, view: &ViewTransforms) -> bool {
    ViewFrustum::from_matrix(&object_to_projection(&node.transform, view))
        .cull_sphere(&node.light.bounding_sphere())
}

fn spot_culled(node: &LightNode<SpotLight>, view: &ViewTransforms) -> bool {
    ViewFrustum::from_matrix(&object_to_projection(&node.transform, view))
        .cull_aabb(&node.light.aabb())
}

fn view_position(transform: &Transform, world_to_view: &Mat4) -> Vec3 {
    world_to_view.transform_point3(transform.world_eye())
}

fn view_direction(transform: &Transform, world_to_view: &Mat4) -> Vec3 {
    world_to_view
        .transform_vector3(transform.world_forward())
        .normalize()
}

fn directional_record(
    node: &LightNode<DirectionalLight>,
    view: &ViewTransforms,
) -> DirectionalLightRecord {
    let d = view_direction(&node.transform, &view.world_to_view);
    DirectionalLightRecord::new(-d, node.light.intensity)
}

fn omni_record(node: &LightNode<OmniLight>, view: &ViewTransforms) -> OmniLightRecord {
    let light = &node.light;
    OmniLightRecord {
        p: view_position(&node.transform, &view.world_to_view).to_array(),
        distance_falloff_end: light.falloff.end,
        intensity: light.intensity.to_array(),
        distance_falloff_inv_range: 1.0 / light.falloff.range(),
    }
}

fn spot_record(node: &LightNode<SpotLight>, view: &ViewTransforms) -> SpotLightRecord {
    let light = &node.light;
    let d = view_direction(&node.transform, &view.world_to_view);
    SpotLightRecord {
        p: view_position(&node.transform, &view.world_to_view).to_array(),
        exponent_property: light.exponent_property,
        neg_d: (-d).to_array(),
        distance_falloff_end: light.falloff.end,
        intensity: light.intensity.to_array(),
        distance_falloff_inv_range: 1.0 / light.falloff.range(),
        cos_umbra: light.cos_umbra,
        cos_inv_range: 1.0 / light.angular_range(),
        _pad: [0.0; 2],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::DistanceFalloff;

    fn view() -> ViewTransforms {
        let projection = Mat4::perspective_lh(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0);
        ViewTransforms::new(projection, Mat4::IDENTITY)
    }

    fn omni_at(position: Vec3) -> LightNode<OmniLight> {
        LightNode::new(
            "omni",
            Transform::from_translation(position),
            OmniLight::new(Vec3::ONE, DistanceFalloff::new(1.0, 3.0)),
        )
    }

    #[test]
    fn directional_record_stores_negated_view_direction() {
        let node = LightNode::new(
            "sun",
            Transform::looking_to(Vec3::ZERO, Vec3::X),
            DirectionalLight::new(Vec3::ONE),
        );
        let records = pack_directional_lights(&[node], &view());
        assert_eq!(records.len(), 1);
        let neg_d = Vec3::from_array(records[0].neg_d);
        assert!(neg_d.abs_diff_eq(Vec3::NEG_X, 1e-5));
    }

    #[test]
    fn culled_omni_lights_are_skipped() {
        let lights = [
            omni_at(Vec3::new(0.0, 0.0, -50.0)),
            omni_at(Vec3::new(0.0, 0.0, 10.0)),
        ];
        let records = pack_omni_lights(&lights, &view());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].p, [0.0, 0.0, 10.0]);
        assert_eq!(records[0].distance_falloff_inv_range, 0.5);
    }

    #[test]
    fn spot_scalars_are_written_directly() {
        let light = SpotLight::new(
            Vec3::new(1.0, 0.5, 0.25),
            2.0,
            DistanceFalloff::new(0.0, 4.0),
            0.2,
            0.4,
        );
        let node = LightNode::new("spot", Transform::from_translation(Vec3::Z), light);
        let records = pack_spot_lights(&[node], &view());
        let record = records[0];
        assert_eq!(record.exponent_property, 2.0);
        assert_eq!(record.cos_umbra, light.cos_umbra);
        assert_eq!(record.cos_inv_range, 1.0 / (light.cos_penumbra - light.cos_umbra));
        assert_eq!(record.distance_falloff_inv_range, 0.25);
        assert_eq!(record.neg_d, [0.0, 0.0, -1.0]);
    }

    #[test]
    fn omni_shadow_packing_emits_six_cameras_per_light() {
        let lights = [
            omni_at(Vec3::new(0.0, 0.0, 10.0)),
            omni_at(Vec3::new(0.0, 0.0, -50.0)),
            omni_at(Vec3::new(1.0, 0.0, 10.0)),
        ];
        let packing = pack_omni_shadow_lights(&lights, &view());
        assert_eq!(packing.records.len(), 2);
        assert_eq!(packing.cameras.len(), 12);
    }

    #[test]
    fn shadow_matrix_maps_camera_view_to_light_space() {
        let world_to_view = Mat4::from_translation(Vec3::new(0.0, 0.0, 2.0));
        let projection = Mat4::perspective_lh(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0);
        let view = ViewTransforms::new(projection, world_to_view);
        let node = LightNode::new(
            "spot",
            Transform::from_translation(Vec3::new(0.0, 0.0, 5.0)),
            SpotLight::default(),
        );
        let packing = pack_spot_shadow_lights(&[node], &view);
        let cview_to_lprojection =
            Mat4::from_cols_array_2d(&packing.records[0].cview_to_lprojection);
        let camera = packing.cameras[0];
        let point = Vec3::new(0.5, 0.25, 8.0);
        let expected = camera.world_to_lprojection.project_point3(point);
        let actual = cview_to_lprojection.project_point3(world_to_view.transform_point3(point));
        assert!(actual.abs_diff_eq(expected, 1e-4));
    }
}
