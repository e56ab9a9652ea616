//! Scene lighting
//!
//! Lights are stored in world space, either in the application-owned
//! [`SceneLights`] or in [`LightModule`](crate::scene::LightModule)s attached to
//! nodes. Once per frame the renderer copies every active light into a
//! [`ViewSpaceLights`] snapshot (positions as points, cone and sun directions
//! as directions) and uploads it to each lit program before its first draw.

mod lights;
mod pipeline;

pub use lights::{Attenuation, DirectionalLight, NodeLight, PointLight, SceneLights, SpotLight};
pub use pipeline::{register_light_uniforms, ViewSpaceLights};

use serde::{Deserialize, Serialize};

/// Size of the `pointLights` array in the built-in lit shader
pub const MAX_POINT_LIGHT: usize = 5;

/// Size of the `spotLights` array in the built-in lit shader
pub const MAX_SPOT_LIGHT: usize = 5;

/// Number of light slots uploaded per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightCapacity {
    /// Point light slots
    pub point: usize,
    /// Spot light slots
    pub spot: usize,
}

impl Default for LightCapacity {
    fn default() -> Self {
        Self {
            point: MAX_POINT_LIGHT,
            spot: MAX_SPOT_LIGHT,
        }
    }
}
