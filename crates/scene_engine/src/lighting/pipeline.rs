//! Per-frame view-space light snapshot

use super::{DirectionalLight, LightCapacity, NodeLight, PointLight, SceneLights, SpotLight};
use crate::foundation::math::{Mat4, Vec3};
use crate::gpu::GpuContext;
use crate::shader::{ShaderError, ShaderProgram};

/// Register the light uniforms a lit program writes every frame
///
/// Fails with [`ShaderError::UniformNotFound`] when the program's light arrays
/// are smaller than `capacity`.
pub fn register_light_uniforms(
    program: &mut ShaderProgram,
    gpu: &GpuContext,
    capacity: LightCapacity,
) -> Result<(), ShaderError> {
    program.add_uniform(gpu, "ambientLight")?;
    program.add_uniform(gpu, "specularPower")?;
    program.add_uniform_struct("directionalLight")?;

    let id = program.id()?;
    for (array, len, field) in [
        ("pointLights", capacity.point, "color"),
        ("spotLights", capacity.spot, "pl.color"),
    ] {
        if len > 0 {
            let last = format!("{array}[{}].{field}", len - 1);
            if gpu.backend().uniform_location(id, &last).is_none() {
                return Err(ShaderError::UniformNotFound {
                    program: program.name().to_string(),
                    name: last,
                });
            }
        }
        program.add_uniform_array(array, len)?;
    }
    Ok(())
}

/// Lights of one frame, transformed into camera space
///
/// Built from copies: the [`SceneLights`] and node lights it was built from
/// are never modified. Active lights take consecutive slots, scene lights
/// first and node lights after them; lights past the capacity are dropped and
/// counted.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSpaceLights {
    /// Ambient color
    pub ambient: Vec3,
    /// Specular exponent
    pub specular_power: f32,
    /// Point lights in slot order
    pub point_lights: Vec<PointLight>,
    /// Spot lights in slot order
    pub spot_lights: Vec<SpotLight>,
    /// Sun, zero intensity when the scene has none
    pub directional: DirectionalLight,
    /// Slot counts the upload fills
    pub capacity: LightCapacity,
    /// Active point lights that did not fit
    pub truncated_point: usize,
    /// Active spot lights that did not fit
    pub truncated_spot: usize,
}

impl ViewSpaceLights {
    /// Transform every active light by `view`
    ///
    /// `node_lights` must already be in world space.
    pub fn build(
        view: &Mat4,
        scene: &SceneLights,
        node_lights: &[NodeLight],
        capacity: LightCapacity,
    ) -> Self {
        let mut points = scene
            .point_lights
            .iter()
            .filter(|light| light.enabled)
            .chain(node_lights.iter().filter_map(|light| match light {
                NodeLight::Point(point) if point.enabled => Some(point),
                _ => None,
            }));
        let mut spots = scene
            .spot_lights
            .iter()
            .filter(|light| light.enabled())
            .chain(node_lights.iter().filter_map(|light| match light {
                NodeLight::Spot(spot) if spot.enabled() => Some(spot),
                _ => None,
            }));

        let point_lights: Vec<PointLight> = points
            .by_ref()
            .take(capacity.point)
            .map(|light| light.transformed(view))
            .collect();
        let truncated_point = points.count();

        let spot_lights: Vec<SpotLight> = spots
            .by_ref()
            .take(capacity.spot)
            .map(|light| light.transformed(view))
            .collect();
        let truncated_spot = spots.count();

        let directional = scene
            .directional
            .as_ref()
            .map_or_else(DirectionalLight::off, |sun| sun.transformed(view));

        Self {
            ambient: scene.ambient,
            specular_power: scene.specular_power,
            point_lights,
            spot_lights,
            directional,
            capacity,
            truncated_point,
            truncated_spot,
        }
    }

    /// Whether any active light was dropped
    pub fn is_truncated(&self) -> bool {
        self.truncated_point > 0 || self.truncated_spot > 0
    }

    /// Write every light uniform of a bound, registered program
    ///
    /// Fills every slot up to the capacity, padding with zero-intensity
    /// lights so slots used in an earlier frame stop shading.
    pub fn upload(&self, program: &mut ShaderProgram, gpu: &mut GpuContext) -> Result<(), ShaderError> {
        program.set_uniform(gpu, "ambientLight", self.ambient)?;
        program.set_uniform(gpu, "specularPower", self.specular_power)?;

        let unused_point = PointLight::off();
        for slot in 0..self.capacity.point {
            let light = self.point_lights.get(slot).unwrap_or(&unused_point);
            program.set_uniform_element(gpu, "pointLights", slot, light)?;
        }

        let unused_spot = SpotLight::off();
        for slot in 0..self.capacity.spot {
            let light = self.spot_lights.get(slot).unwrap_or(&unused_spot);
            program.set_uniform_element(gpu, "spotLights", slot, light)?;
        }

        program.set_uniform_struct(gpu, "directionalLight", &self.directional)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{GpuCommand, HeadlessBackend, UniformValue};
    use crate::shader::{BuiltinShader, ShaderSource};
    use approx::assert_relative_eq;

    fn white_point(x: f32) -> PointLight {
        PointLight::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(x, 0.0, 0.0), 1.0)
    }

    #[test]
    fn test_slots_are_compacted_and_scene_lights_come_first() {
        let mut scene = SceneLights::new();
        let mut disabled = white_point(1.0);
        disabled.enabled = false;
        scene.add_point_light(disabled).add_point_light(white_point(2.0));
        let nodes = [NodeLight::Point(white_point(3.0))];

        let lights = ViewSpaceLights::build(&Mat4::identity(), &scene, &nodes, LightCapacity::default());
        assert_eq!(lights.point_lights.len(), 2);
        assert_relative_eq!(lights.point_lights[0].position.x, 2.0);
        assert_relative_eq!(lights.point_lights[1].position.x, 3.0);
        assert!(!lights.is_truncated());
    }

    #[test]
    fn test_excess_lights_are_counted() {
        let mut scene = SceneLights::new();
        for i in 0..7 {
            scene.add_point_light(white_point(i as f32));
        }
        let lights = ViewSpaceLights::build(&Mat4::identity(), &scene, &[], LightCapacity::default());
        assert_eq!(lights.point_lights.len(), 5);
        assert_eq!(lights.truncated_point, 2);
        assert_eq!(lights.truncated_spot, 0);
    }

    #[test]
    fn test_directional_only_rotates() {
        let mut scene = SceneLights::new();
        scene.set_directional(DirectionalLight::new(
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(0.0, 1.0, 0.0),
            0.8,
        ));
        let view = Mat4::new_translation(&Vec3::new(3.0, 3.0, 3.0));

        let lights = ViewSpaceLights::build(&view, &scene, &[], LightCapacity::default());
        assert_relative_eq!(lights.directional.direction, Vec3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(lights.directional.intensity, 0.8);
    }

    #[test]
    fn test_upload_pads_unused_slots_with_dark_lights() {
        let mut gpu = GpuContext::new(HeadlessBackend::new());
        let mut program = ShaderSource::builtin(BuiltinShader::Phong).build(&mut gpu).unwrap();
        register_light_uniforms(&mut program, &gpu, LightCapacity::default()).unwrap();

        let mut scene = SceneLights::new();
        scene.add_point_light(white_point(1.0));
        let lights = ViewSpaceLights::build(&Mat4::identity(), &scene, &[], LightCapacity::default());

        program.bind(&mut gpu).unwrap();
        lights.upload(&mut program, &mut gpu).unwrap();
        program.unbind(&mut gpu).unwrap();

        let headless = gpu.backend_as::<HeadlessBackend>().unwrap();
        let id = program.id().unwrap();
        assert_eq!(
            headless.last_uniform(id, "pointLights[0].intensity"),
            Some(&UniformValue::Float(1.0))
        );
        assert_eq!(
            headless.last_uniform(id, "pointLights[4].intensity"),
            Some(&UniformValue::Float(0.0))
        );
        assert_eq!(
            headless.last_uniform(id, "spotLights[4].pl.intensity"),
            Some(&UniformValue::Float(0.0))
        );
        let writes = headless
            .commands()
            .iter()
            .filter(|c| matches!(c, GpuCommand::SetUniform { .. }))
            .count();
        // ambient + specular + 5 * 6 point + 5 * 8 spot + 3 directional
        assert_eq!(writes, 2 + 30 + 40 + 3);
    }

    #[test]
    fn test_capacity_larger_than_shader_arrays_is_rejected() {
        let mut gpu = GpuContext::new(HeadlessBackend::new());
        let mut program = ShaderSource::builtin(BuiltinShader::Phong).build(&mut gpu).unwrap();
        let capacity = LightCapacity { point: 6, spot: 5 };

        assert!(matches!(
            register_light_uniforms(&mut program, &gpu, capacity),
            Err(ShaderError::UniformNotFound { .. })
        ));
    }
}
