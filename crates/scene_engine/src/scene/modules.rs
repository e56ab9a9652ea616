//! Built-in node modules

use std::any::Any;
use std::collections::HashMap;

use super::module::{Module, ModuleKind, ReleaseQueue};
use super::NodeId;
use crate::foundation::math::{Mat4, Vec4};
use crate::gpu::{GpuResource, MeshHandle, TextureHandle, UniformValue};
use crate::lighting::NodeLight;
use crate::render::RenderPass;
use crate::shader::{ShaderKey, UniformStruct};

macro_rules! impl_module_plumbing {
    () => {
        fn owner(&self) -> Option<NodeId> {
            self.owner
        }

        fn set_owner(&mut self, owner: Option<NodeId>) {
            self.owner = owner;
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    };
}

/// Makes a node drawable: one mesh and the technique that draws it
///
/// A mesh built with [`RenderModule::new`] is shared: any number of modules
/// may draw it and none of them frees it. [`RenderModule::owned`] hands the
/// mesh to the module, which releases it on cleanup. Cloning always yields a
/// shared module. The technique lives in the engine's registry and outlives
/// the module.
#[derive(Debug)]
pub struct RenderModule {
    owner: Option<NodeId>,
    mesh: MeshHandle,
    owns_mesh: bool,
    shader: ShaderKey,
    pass_shaders: HashMap<RenderPass, ShaderKey>,
    visible: bool,
}

impl Clone for RenderModule {
    fn clone(&self) -> Self {
        Self {
            owner: None,
            mesh: self.mesh,
            owns_mesh: false,
            shader: self.shader,
            pass_shaders: self.pass_shaders.clone(),
            visible: self.visible,
        }
    }
}

impl RenderModule {
    /// Draw a shared `mesh` with `shader` in the opaque pass
    pub fn new(mesh: MeshHandle, shader: ShaderKey) -> Self {
        Self {
            owner: None,
            mesh,
            owns_mesh: false,
            shader,
            pass_shaders: HashMap::new(),
            visible: true,
        }
    }

    /// Draw `mesh` with `shader`, releasing the mesh with the module
    pub fn owned(mesh: MeshHandle, shader: ShaderKey) -> Self {
        Self {
            owns_mesh: true,
            ..Self::new(mesh, shader)
        }
    }

    /// Use `shader` instead of the engine default for `pass`
    pub fn with_pass_shader(mut self, pass: RenderPass, shader: ShaderKey) -> Self {
        self.pass_shaders.insert(pass, shader);
        self
    }

    /// Mesh handle
    pub fn mesh(&self) -> MeshHandle {
        self.mesh
    }

    /// Whether cleanup releases the mesh
    pub fn owns_mesh(&self) -> bool {
        self.owns_mesh
    }

    /// Technique used by the opaque pass
    pub fn shader(&self) -> ShaderKey {
        self.shader
    }

    /// Change the opaque-pass technique
    pub fn set_shader(&mut self, shader: ShaderKey) {
        self.shader = shader;
    }

    /// Per-pass override, if any
    pub fn pass_shader(&self, pass: RenderPass) -> Option<ShaderKey> {
        self.pass_shaders.get(&pass).copied()
    }

    /// Hidden modules are skipped by every pass
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Show or hide the node
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}

impl Module for RenderModule {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Render
    }

    fn cleanup(&mut self, releases: &mut ReleaseQueue) {
        if self.owns_mesh {
            releases.release(GpuResource::Mesh(self.mesh));
        }
    }

    impl_module_plumbing!();
}

/// Surface description read by the material-aware techniques
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialModule {
    owner: Option<NodeId>,
    albedo: Option<TextureHandle>,
    owns_albedo: bool,
    /// Diffuse color used when there is no albedo texture
    pub diffuse: Vec4,
    /// Specular color
    pub specular: Vec4,
    /// Specular strength
    pub reflectance: f32,
}

impl Default for MaterialModule {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterialModule {
    /// Untextured light grey material
    pub fn new() -> Self {
        Self {
            owner: None,
            albedo: None,
            owns_albedo: false,
            diffuse: Vec4::new(0.8, 0.8, 0.8, 1.0),
            specular: Vec4::new(1.0, 1.0, 1.0, 1.0),
            reflectance: 0.5,
        }
    }

    /// Material sampling `albedo`, released with the module
    pub fn with_albedo(albedo: TextureHandle) -> Self {
        Self {
            albedo: Some(albedo),
            owns_albedo: true,
            ..Self::new()
        }
    }

    /// Material sampling a texture owned elsewhere
    pub fn with_shared_albedo(albedo: TextureHandle) -> Self {
        Self {
            albedo: Some(albedo),
            ..Self::new()
        }
    }

    /// Builder-style diffuse color
    pub fn with_diffuse(mut self, diffuse: Vec4) -> Self {
        self.diffuse = diffuse;
        self
    }

    /// Albedo texture
    pub fn albedo(&self) -> Option<TextureHandle> {
        self.albedo
    }
}

impl Module for MaterialModule {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Material
    }

    fn cleanup(&mut self, releases: &mut ReleaseQueue) {
        if let (Some(texture), true) = (self.albedo, self.owns_albedo) {
            releases.release(GpuResource::Texture(texture));
        }
    }

    impl_module_plumbing!();
}

impl UniformStruct for MaterialModule {
    fn uniform_fields(&self) -> Vec<(&'static str, UniformValue)> {
        vec![
            ("diffuse", self.diffuse.into()),
            ("specular", self.specular.into()),
            ("reflectance", self.reflectance.into()),
            ("hasTexture", i32::from(self.albedo.is_some()).into()),
        ]
    }
}

/// A light that moves with its node
///
/// The light is stored in node space. Each frame the renderer places a copy
/// in world space with the node's world transform; the stored light is never
/// modified by rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct LightModule {
    owner: Option<NodeId>,
    light: NodeLight,
}

impl LightModule {
    /// Wrap a node-space light
    pub fn new(light: NodeLight) -> Self {
        Self { owner: None, light }
    }

    /// Node-space light
    pub fn light(&self) -> &NodeLight {
        &self.light
    }

    /// Mutable node-space light
    pub fn light_mut(&mut self) -> &mut NodeLight {
        &mut self.light
    }

    /// Copy of the light placed by the owner's world transform
    pub fn world_light(&self, world: &Mat4) -> NodeLight {
        self.light.transformed(world)
    }
}

impl Module for LightModule {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Light
    }

    fn cleanup(&mut self, _releases: &mut ReleaseQueue) {}

    impl_module_plumbing!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Transform, Vec3};
    use crate::lighting::PointLight;
    use crate::scene::SceneGraph;
    use approx::assert_relative_eq;

    fn shader_key() -> ShaderKey {
        ShaderKey::default()
    }

    #[test]
    fn test_render_module_releases_mesh_only() {
        let mut graph = SceneGraph::new();
        let node = graph.create_node("node");
        graph
            .attach_module(node, RenderModule::owned(MeshHandle(3), shader_key()))
            .unwrap();
        graph
            .attach_module(node, MaterialModule::with_shared_albedo(TextureHandle(4)))
            .unwrap();

        graph.remove_node(node).unwrap();
        assert_eq!(graph.take_releases(), vec![GpuResource::Mesh(MeshHandle(3))]);
    }

    #[test]
    fn test_shared_mesh_is_not_released() {
        let mut graph = SceneGraph::new();
        let a = graph.create_node("a");
        let b = graph.create_node("b");
        let shared = RenderModule::new(MeshHandle(6), shader_key());
        graph.attach_module(a, shared.clone()).unwrap();
        graph.attach_module(b, shared).unwrap();

        graph.remove_node(a).unwrap();
        assert!(graph.pending_releases().is_empty());
        assert_eq!(
            graph.module_as::<RenderModule>(b, ModuleKind::Render).map(RenderModule::mesh),
            Some(MeshHandle(6))
        );
    }

    #[test]
    fn test_clone_of_owned_module_is_shared() {
        let owned = RenderModule::owned(MeshHandle(7), shader_key());
        let copy = owned.clone();
        assert!(owned.owns_mesh());
        assert!(!copy.owns_mesh());

        let mut releases = ReleaseQueue::default();
        copy.clone().cleanup(&mut releases);
        assert!(releases.pending().is_empty());
    }

    #[test]
    fn test_owned_albedo_is_released() {
        let mut releases = ReleaseQueue::default();
        MaterialModule::with_albedo(TextureHandle(8)).cleanup(&mut releases);
        assert_eq!(releases.drain(), vec![GpuResource::Texture(TextureHandle(8))]);
    }

    #[test]
    fn test_light_module_follows_node() {
        let mut graph = SceneGraph::new();
        let lamp = graph.create_node_with("lamp", Transform::from_position(Vec3::new(0.0, 4.0, 0.0)));
        let light = PointLight::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(1.0, 0.0, 0.0), 2.0);
        graph.attach_module(lamp, LightModule::new(NodeLight::Point(light.clone()))).unwrap();

        let world = graph.world_transform(lamp).unwrap();
        let module = graph.module_as::<LightModule>(lamp, ModuleKind::Light).unwrap();
        match module.world_light(&world) {
            NodeLight::Point(placed) => assert_relative_eq!(placed.position, Vec3::new(1.0, 4.0, 0.0)),
            NodeLight::Spot(_) => panic!("expected a point light"),
        }
        assert_eq!(module.light(), &NodeLight::Point(light));
    }

    #[test]
    fn test_detach_and_reattach_keeps_lookups() {
        let mut graph = SceneGraph::new();
        let node = graph.create_node_with("node", Transform::from_position(Vec3::new(2.0, 0.0, 0.0)));
        graph.attach_module(node, RenderModule::new(MeshHandle(5), shader_key())).unwrap();
        let before = graph.world_transform(node).unwrap();

        let module = graph.detach_module(node, ModuleKind::Render).unwrap().unwrap();
        assert_eq!(module.owner(), None);
        assert!(graph.module(node, ModuleKind::Render).is_none());

        graph.attach_boxed(node, module).unwrap();
        let render = graph.module_as::<RenderModule>(node, ModuleKind::Render).unwrap();
        assert_eq!(render.mesh(), MeshHandle(5));
        assert_eq!(render.owner(), Some(node));
        assert_eq!(graph.world_transform(node).unwrap(), before);
        assert!(graph.pending_releases().is_empty());
    }
}
