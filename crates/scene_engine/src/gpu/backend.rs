//! Backend abstraction trait for the rendering system
//!
//! This module defines the trait that graphics backends must implement to
//! provide a consistent interface for the scene renderer. The contract mirrors
//! a classic OpenGL-style API: uniform writes, draws and dispatches apply to
//! the currently used program, texture bindings apply to numbered texture
//! units and image bindings to numbered image units.

use super::{
    BackendError, ClearTargets, GpuResource, ImageAccess, MeshData, MeshHandle, ProgramId,
    StageId, StageKind, TextureData, TextureHandle, UniformLocation, UniformValue,
};

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Main graphics backend trait
pub trait GraphicsBackend {
    /// Human readable backend name for logging
    fn name(&self) -> &str;

    /// Compile one shader stage from source text
    ///
    /// On failure the error carries the compiler diagnostic.
    fn compile_stage(&mut self, kind: StageKind, source: &str) -> BackendResult<StageId>;

    /// Link compiled stages into a program
    fn link_program(&mut self, stages: &[StageId]) -> BackendResult<ProgramId>;

    /// Look up the location of a uniform in a linked program
    ///
    /// Returns `None` when the program does not declare the uniform.
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;

    /// Make `program` the active program, or clear the active program
    fn use_program(&mut self, program: Option<ProgramId>);

    /// Write a value to a uniform location of the active program
    fn write_uniform(&mut self, location: UniformLocation, value: &UniformValue);

    /// Bind a texture to a texture unit, or clear the unit
    fn bind_texture(&mut self, unit: u32, texture: Option<TextureHandle>);

    /// Bind a texture to an image unit for compute load/store, or clear the unit
    fn bind_image(&mut self, unit: u32, image: Option<TextureHandle>, access: ImageAccess);

    /// Upload mesh geometry
    fn create_mesh(&mut self, mesh: &MeshData) -> BackendResult<MeshHandle>;

    /// Upload an RGBA8 texture
    fn create_texture(&mut self, texture: &TextureData) -> BackendResult<TextureHandle>;

    /// Draw a mesh with the active program
    fn draw_mesh(&mut self, mesh: MeshHandle) -> BackendResult<()>;

    /// Run the active compute program over `groups` work groups
    fn dispatch_compute(&mut self, groups: [u32; 3]) -> BackendResult<()>;

    /// Clear framebuffer targets
    fn clear(&mut self, targets: ClearTargets, color: [f32; 4]);

    /// Set the viewport to the given framebuffer size
    fn set_viewport(&mut self, width: u32, height: u32);

    /// Release a mesh or texture
    fn release(&mut self, resource: GpuResource);

    /// Delete a linked program
    fn delete_program(&mut self, program: ProgramId);

    /// Present the finished frame
    fn present(&mut self);

    /// Downcast to concrete backend type for inspection
    fn as_any(&self) -> &dyn std::any::Any;

    /// Downcast to mutable concrete backend type for inspection
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}
