//! Built-in rendering techniques

use super::{ShaderError, ShaderProgram, ShaderSource, ShaderTechnique, UniformScope};
use crate::foundation::math::{Vec2, Vec4};
use crate::gpu::{GpuContext, ImageAccess, TextureHandle};
use crate::lighting::{self, LightCapacity};
use crate::render::RenderError;
use crate::scene::{MaterialModule, ModuleKind};

/// Texture unit the albedo map is bound to
pub const ALBEDO_UNIT: u32 = 0;

/// Image unit of the scene color target in the overlay blend
pub const SCENE_IMAGE_UNIT: u32 = 0;

/// Image unit of the overlay color target in the overlay blend
pub const OVERLAY_IMAGE_UNIT: u32 = 1;

fn register_camera_uniforms(program: &mut ShaderProgram, gpu: &GpuContext) -> Result<(), ShaderError> {
    program.add_uniform(gpu, "modelViewMatrix")?;
    program.add_uniform(gpu, "projectionMatrix")
}

fn write_camera_uniforms(
    program: &ShaderProgram,
    gpu: &mut GpuContext,
    scope: &UniformScope<'_>,
) -> Result<(), RenderError> {
    program.set_uniform(gpu, "projectionMatrix", scope.projection)?;
    program.set_uniform(gpu, "modelViewMatrix", scope.model_view()?)?;
    Ok(())
}

/// Albedo-textured technique
///
/// Every node drawn with it must carry a [`MaterialModule`]; a node without
/// one aborts the frame with [`RenderError::MissingModule`].
#[derive(Debug)]
pub struct PbrTechnique {
    program: ShaderProgram,
}

impl PbrTechnique {
    /// Build the program and register its uniforms
    pub fn new(gpu: &mut GpuContext, source: &ShaderSource) -> Result<Self, ShaderError> {
        let mut program = source.build(gpu)?;
        program.add_uniform(gpu, "albedoMap")?;
        register_camera_uniforms(&mut program, gpu)?;
        Ok(Self { program })
    }
}

impl ShaderTechnique for PbrTechnique {
    fn program(&self) -> &ShaderProgram {
        &self.program
    }

    fn program_mut(&mut self) -> &mut ShaderProgram {
        &mut self.program
    }

    fn update_uniforms(
        &mut self,
        gpu: &mut GpuContext,
        scope: &UniformScope<'_>,
    ) -> Result<(), RenderError> {
        let material = scope.require_module::<MaterialModule>(ModuleKind::Material)?;
        match material.albedo() {
            Some(texture) => self.program.set_texture(gpu, "albedoMap", ALBEDO_UNIT, texture)?,
            None => self.program.set_uniform(gpu, "albedoMap", ALBEDO_UNIT as i32)?,
        }
        write_camera_uniforms(&self.program, gpu, scope)
    }
}

/// Phong-lit technique reading the frame's view-space lights
///
/// The material module is optional here; nodes without one render with the
/// default material.
#[derive(Debug)]
pub struct PhongTechnique {
    program: ShaderProgram,
    default_material: MaterialModule,
}

impl PhongTechnique {
    /// Build the program and register camera, material and light uniforms
    pub fn new(
        gpu: &mut GpuContext,
        source: &ShaderSource,
        capacity: LightCapacity,
    ) -> Result<Self, ShaderError> {
        let mut program = source.build(gpu)?;
        register_camera_uniforms(&mut program, gpu)?;
        program.add_uniform(gpu, "albedoMap")?;
        program.add_uniform_struct("material")?;
        lighting::register_light_uniforms(&mut program, gpu, capacity)?;
        Ok(Self {
            program,
            default_material: MaterialModule::default(),
        })
    }
}

impl ShaderTechnique for PhongTechnique {
    fn program(&self) -> &ShaderProgram {
        &self.program
    }

    fn program_mut(&mut self) -> &mut ShaderProgram {
        &mut self.program
    }

    fn uses_lighting(&self) -> bool {
        true
    }

    fn update_uniforms(
        &mut self,
        gpu: &mut GpuContext,
        scope: &UniformScope<'_>,
    ) -> Result<(), RenderError> {
        let material = scope
            .optional_module::<MaterialModule>(ModuleKind::Material)
            .unwrap_or(&self.default_material);
        if let Some(texture) = material.albedo() {
            self.program.set_texture(gpu, "albedoMap", ALBEDO_UNIT, texture)?;
        }
        self.program.set_uniform_struct(gpu, "material", material)?;
        write_camera_uniforms(&self.program, gpu, scope)
    }
}

/// Flat-colored outline shell drawn over selected nodes
#[derive(Debug)]
pub struct HighlightTechnique {
    program: ShaderProgram,
    color: Vec4,
    width: f32,
}

impl HighlightTechnique {
    /// Build the program with an orange outline
    pub fn new(gpu: &mut GpuContext, source: &ShaderSource) -> Result<Self, ShaderError> {
        let mut program = source.build(gpu)?;
        register_camera_uniforms(&mut program, gpu)?;
        program.add_uniform(gpu, "highlightColor")?;
        program.add_uniform(gpu, "outlineWidth")?;
        Ok(Self {
            program,
            color: Vec4::new(1.0, 0.6, 0.1, 1.0),
            width: 0.03,
        })
    }

    /// Outline color
    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }

    /// Shell thickness in model units
    pub fn with_width(mut self, width: f32) -> Self {
        self.width = width;
        self
    }
}

impl ShaderTechnique for HighlightTechnique {
    fn program(&self) -> &ShaderProgram {
        &self.program
    }

    fn program_mut(&mut self) -> &mut ShaderProgram {
        &mut self.program
    }

    fn update_uniforms(
        &mut self,
        gpu: &mut GpuContext,
        scope: &UniformScope<'_>,
    ) -> Result<(), RenderError> {
        self.program.set_uniform(gpu, "highlightColor", self.color)?;
        self.program.set_uniform(gpu, "outlineWidth", self.width)?;
        write_camera_uniforms(&self.program, gpu, scope)
    }
}

/// Compute pass that composites the overlay target onto the scene target
///
/// The scene image is bound read-write and the overlay image read-only; one
/// invocation covers one pixel.
#[derive(Debug)]
pub struct OverlayBlendTechnique {
    program: ShaderProgram,
    local_size: [u32; 2],
}

impl OverlayBlendTechnique {
    /// Build the compute program
    pub fn new(gpu: &mut GpuContext, source: &ShaderSource) -> Result<Self, ShaderError> {
        let mut program = source.build(gpu)?;
        program.add_uniform(gpu, "resolution")?;
        Ok(Self {
            program,
            local_size: [16, 16],
        })
    }

    /// The compute program
    pub fn program(&self) -> &ShaderProgram {
        &self.program
    }

    /// Blend `overlay` into `scene` over a `width` x `height` target,
    /// returning the dispatched group counts
    pub fn blend(
        &self,
        gpu: &mut GpuContext,
        scene: TextureHandle,
        overlay: TextureHandle,
        resolution: (u32, u32),
    ) -> Result<[u32; 3], ShaderError> {
        self.program.bind(gpu)?;
        self.program.set_image(gpu, SCENE_IMAGE_UNIT, scene, ImageAccess::ReadWrite)?;
        self.program.set_image(gpu, OVERLAY_IMAGE_UNIT, overlay, ImageAccess::ReadOnly)?;
        self.program.set_uniform(
            gpu,
            "resolution",
            Vec2::new(resolution.0 as f32, resolution.1 as f32),
        )?;
        let groups = self.program.dispatch(gpu, self.local_size, resolution)?;
        self.program.unbind(gpu)?;
        Ok(groups)
    }

    /// Delete the program
    pub fn destroy(&mut self, gpu: &mut GpuContext) {
        self.program.destroy(gpu);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{GpuCommand, HeadlessBackend};
    use crate::shader::BuiltinShader;

    #[test]
    fn test_overlay_blend_binds_both_images_and_covers_target() {
        let mut gpu = GpuContext::new(HeadlessBackend::new());
        let blend =
            OverlayBlendTechnique::new(&mut gpu, &ShaderSource::builtin(BuiltinShader::OverlayBlend)).unwrap();
        let (scene, overlay) = (TextureHandle(1), TextureHandle(2));

        let groups = blend.blend(&mut gpu, scene, overlay, (1280, 720)).unwrap();

        assert_eq!(groups, [80, 45, 1]);
        assert_eq!(gpu.bound_program(), None);
        let headless = gpu.backend_as::<HeadlessBackend>().unwrap();
        let commands = headless.commands();
        assert!(commands.contains(&GpuCommand::BindImage {
            unit: SCENE_IMAGE_UNIT,
            image: Some(scene),
            access: ImageAccess::ReadWrite
        }));
        assert!(commands.contains(&GpuCommand::BindImage {
            unit: OVERLAY_IMAGE_UNIT,
            image: Some(overlay),
            access: ImageAccess::ReadOnly
        }));
        assert_eq!(
            headless.uniform_writes("resolution"),
            vec![&crate::gpu::UniformValue::Vec2(Vec2::new(1280.0, 720.0))]
        );
        assert_eq!(headless.dispatches().len(), 1);
    }
}
