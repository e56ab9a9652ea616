//! World-space light types

use serde::{Deserialize, Serialize};

use crate::foundation::math::{transform_direction, transform_point, Mat4, Vec3};
use crate::gpu::UniformValue;
use crate::shader::UniformStruct;

/// Distance falloff: `1 / (constant + linear * d + exponent * d^2)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attenuation {
    /// Constant term
    pub constant: f32,
    /// Linear term
    pub linear: f32,
    /// Quadratic term
    pub exponent: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Self {
            constant: 1.0,
            linear: 0.0,
            exponent: 0.0,
        }
    }
}

/// Omnidirectional light at a position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointLight {
    /// Light color
    pub color: Vec3,
    /// Position in world space (or node space inside a light module)
    pub position: Vec3,
    /// Brightness multiplier
    pub intensity: f32,
    /// Distance falloff
    pub attenuation: Attenuation,
    /// Disabled lights do not occupy a shader slot
    pub enabled: bool,
}

impl PointLight {
    /// White-ish light at `position` with no falloff
    pub fn new(color: Vec3, position: Vec3, intensity: f32) -> Self {
        Self {
            color,
            position,
            intensity,
            attenuation: Attenuation::default(),
            enabled: true,
        }
    }

    /// Builder-style attenuation
    pub fn with_attenuation(mut self, attenuation: Attenuation) -> Self {
        self.attenuation = attenuation;
        self
    }

    /// Zero-intensity light written to unused shader slots
    pub fn off() -> Self {
        Self {
            color: Vec3::zeros(),
            position: Vec3::zeros(),
            intensity: 0.0,
            attenuation: Attenuation::default(),
            enabled: false,
        }
    }

    /// Copy with the position moved by `matrix` as a point
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let mut copy = self.clone();
        copy.position = transform_point(matrix, &self.position);
        copy
    }
}

/// GLSL member names of a `PointLight` struct, in field order
const POINT_FIELDS: [&str; 6] = [
    "color",
    "position",
    "intensity",
    "att.constant",
    "att.linear",
    "att.exponent",
];

/// The same members reached through the `pl` member of a `SpotLight` struct
const SPOT_POINT_FIELDS: [&str; 6] = [
    "pl.color",
    "pl.position",
    "pl.intensity",
    "pl.att.constant",
    "pl.att.linear",
    "pl.att.exponent",
];

impl PointLight {
    fn field_values(&self) -> [UniformValue; 6] {
        [
            self.color.into(),
            self.position.into(),
            self.intensity.into(),
            self.attenuation.constant.into(),
            self.attenuation.linear.into(),
            self.attenuation.exponent.into(),
        ]
    }

    fn named_fields(&self, names: [&'static str; 6]) -> Vec<(&'static str, UniformValue)> {
        names.into_iter().zip(self.field_values()).collect()
    }
}

impl UniformStruct for PointLight {
    fn uniform_fields(&self) -> Vec<(&'static str, UniformValue)> {
        self.named_fields(POINT_FIELDS)
    }
}

/// Point light restricted to a cone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotLight {
    /// Emitter
    pub point: PointLight,
    /// Cone axis, pointing away from the light
    pub cone_direction: Vec3,
    /// Cosine of the cone half-angle
    pub cutoff: f32,
}

impl SpotLight {
    /// Spot light with a cone half-angle in degrees
    pub fn new(point: PointLight, cone_direction: Vec3, cutoff_degrees: f32) -> Self {
        Self {
            point,
            cone_direction,
            cutoff: cutoff_degrees.to_radians().cos(),
        }
    }

    /// Whether the light occupies a shader slot
    pub fn enabled(&self) -> bool {
        self.point.enabled
    }

    /// Zero-intensity spot written to unused shader slots
    pub fn off() -> Self {
        Self {
            point: PointLight::off(),
            cone_direction: Vec3::new(0.0, 0.0, -1.0),
            cutoff: 1.0,
        }
    }

    /// Copy with the position moved as a point and the cone as a direction
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        Self {
            point: self.point.transformed(matrix),
            cone_direction: transform_direction(matrix, &self.cone_direction),
            cutoff: self.cutoff,
        }
    }
}

impl UniformStruct for SpotLight {
    fn uniform_fields(&self) -> Vec<(&'static str, UniformValue)> {
        let mut fields = self.point.named_fields(SPOT_POINT_FIELDS);
        fields.push(("conedir", self.cone_direction.into()));
        fields.push(("cutoff", self.cutoff.into()));
        fields
    }
}

/// Infinitely distant light such as the sun
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLight {
    /// Light color
    pub color: Vec3,
    /// Direction towards the light in world space
    pub direction: Vec3,
    /// Brightness multiplier
    pub intensity: f32,
}

impl DirectionalLight {
    /// Create a directional light
    pub fn new(color: Vec3, direction: Vec3, intensity: f32) -> Self {
        Self {
            color,
            direction,
            intensity,
        }
    }

    /// Zero-intensity light used when the scene has no sun
    pub fn off() -> Self {
        Self::new(Vec3::zeros(), Vec3::new(0.0, 1.0, 0.0), 0.0)
    }

    /// Copy with only the direction transformed
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        Self {
            direction: transform_direction(matrix, &self.direction),
            ..self.clone()
        }
    }
}

impl UniformStruct for DirectionalLight {
    fn uniform_fields(&self) -> Vec<(&'static str, UniformValue)> {
        vec![
            ("color", self.color.into()),
            ("direction", self.direction.into()),
            ("intensity", self.intensity.into()),
        ]
    }
}

/// Scene-level light state, owned by the application
///
/// Stored in world space. Rendering only ever reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneLights {
    /// Ambient light color
    pub ambient: Vec3,
    /// Specular exponent shared by all lit materials
    pub specular_power: f32,
    /// Point lights, in slot order
    pub point_lights: Vec<PointLight>,
    /// Spot lights, in slot order
    pub spot_lights: Vec<SpotLight>,
    /// Optional sun
    pub directional: Option<DirectionalLight>,
}

impl Default for SceneLights {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneLights {
    /// Dim ambient light and nothing else
    pub fn new() -> Self {
        Self {
            ambient: Vec3::new(0.3, 0.3, 0.3),
            specular_power: 10.0,
            point_lights: Vec::new(),
            spot_lights: Vec::new(),
            directional: None,
        }
    }

    /// Add a point light
    pub fn add_point_light(&mut self, light: PointLight) -> &mut Self {
        self.point_lights.push(light);
        self
    }

    /// Add a spot light
    pub fn add_spot_light(&mut self, light: SpotLight) -> &mut Self {
        self.spot_lights.push(light);
        self
    }

    /// Set or replace the sun
    pub fn set_directional(&mut self, light: DirectionalLight) -> &mut Self {
        self.directional = Some(light);
        self
    }
}

/// A light carried by a scene node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeLight {
    /// Point light
    Point(PointLight),
    /// Spot light
    Spot(SpotLight),
}

impl NodeLight {
    /// Whether the light occupies a shader slot
    pub fn enabled(&self) -> bool {
        match self {
            Self::Point(light) => light.enabled,
            Self::Spot(light) => light.enabled(),
        }
    }

    /// Copy moved by `matrix`
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        match self {
            Self::Point(light) => Self::Point(light.transformed(matrix)),
            Self::Spot(light) => Self::Spot(light.transformed(matrix)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_point_light_copy_leaves_original_untouched() {
        let light = PointLight::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(1.0, 2.0, 3.0), 1.0);
        let view = Mat4::new_translation(&Vec3::new(0.0, 0.0, -10.0));

        let moved = light.transformed(&view);
        assert_relative_eq!(moved.position, Vec3::new(1.0, 2.0, -7.0));
        assert_relative_eq!(light.position, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_spot_cone_is_a_direction() {
        let spot = SpotLight::new(
            PointLight::new(Vec3::new(1.0, 1.0, 1.0), Vec3::zeros(), 1.0),
            Vec3::new(0.0, -1.0, 0.0),
            30.0,
        );
        let view = Mat4::new_translation(&Vec3::new(4.0, 4.0, 4.0));

        let moved = spot.transformed(&view);
        assert_relative_eq!(moved.cone_direction, Vec3::new(0.0, -1.0, 0.0));
        assert_relative_eq!(moved.point.position, Vec3::new(4.0, 4.0, 4.0));
        assert_relative_eq!(moved.cutoff, 30.0_f32.to_radians().cos());
    }

    #[test]
    fn test_spot_fields_nest_the_point_light() {
        let names: Vec<&str> = SpotLight::off().uniform_fields().into_iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            vec![
                "pl.color",
                "pl.position",
                "pl.intensity",
                "pl.att.constant",
                "pl.att.linear",
                "pl.att.exponent",
                "conedir",
                "cutoff"
            ]
        );
    }

    #[test]
    fn test_spot_fields_carry_matching_point_values() {
        let point = PointLight::new(Vec3::new(0.1, 0.2, 0.3), Vec3::new(1.0, 2.0, 3.0), 4.0).with_attenuation(
            Attenuation {
                constant: 5.0,
                linear: 6.0,
                exponent: 7.0,
            },
        );
        let spot = SpotLight::new(point.clone(), Vec3::new(0.0, 0.0, -1.0), 45.0);

        let spot_fields = spot.uniform_fields();
        for (name, value) in point.uniform_fields() {
            let nested = format!("pl.{name}");
            let found = spot_fields.iter().find(|(field, _)| *field == nested);
            assert_eq!(found.map(|(_, v)| v), Some(&value), "{nested} does not match {name}");
        }
        assert_eq!(
            spot_fields.iter().find(|(field, _)| *field == "pl.att.exponent").map(|(_, v)| v),
            Some(&UniformValue::Float(7.0))
        );
    }
}
