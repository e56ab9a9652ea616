//! The render engine

use std::collections::HashMap;

use super::frame::FrameState;
use super::{CameraView, FramePhase, FrameStats, RenderError, RenderPass, SurfaceState};
use crate::config::{Config, RendererConfig};
use crate::gpu::{ClearTargets, GpuContext, GraphicsBackend, MeshData, MeshHandle, TextureData, TextureHandle};
use crate::lighting::{NodeLight, SceneLights, ViewSpaceLights};
use crate::scene::{LightModule, ModuleKind, NodeId, RenderModule, SceneGraph};
use crate::selection::SelectionManager;
use crate::shader::techniques::{
    HighlightTechnique, OverlayBlendTechnique, PbrTechnique, PhongTechnique,
};
use crate::shader::{
    BuiltinShader, ShaderKey, ShaderSource, ShaderTechnique, TechniqueRegistry, UniformScope,
};

/// Keys of the techniques registered by
/// [`RenderEngine::register_builtin_techniques`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinTechniques {
    /// Albedo-textured technique
    pub pbr: ShaderKey,
    /// Phong-lit technique
    pub phong: ShaderKey,
    /// Selection outline technique, also the highlight pass default
    pub highlight: ShaderKey,
}

/// Compute blend of the overlay target onto the scene target
#[derive(Debug)]
struct OverlayBlend {
    technique: OverlayBlendTechnique,
    scene: TextureHandle,
    overlay: TextureHandle,
}

/// Owns the GPU context and the shared techniques, and draws scenes
///
/// There is exactly one engine per GPU context; it replaces any notion of a
/// global renderer. Techniques live as long as the engine and are destroyed by
/// [`shutdown`](Self::shutdown).
#[derive(Debug)]
pub struct RenderEngine {
    gpu: GpuContext,
    techniques: TechniqueRegistry,
    pass_defaults: HashMap<RenderPass, ShaderKey>,
    overlay_blend: Option<OverlayBlend>,
    config: RendererConfig,
    surface: SurfaceState,
    frame: Option<FrameState>,
    last_stats: FrameStats,
    frame_index: u64,
    reported_truncation: (usize, usize),
}

impl RenderEngine {
    /// Create an engine on `backend`
    pub fn new(backend: impl GraphicsBackend + 'static, config: RendererConfig) -> Result<Self, RenderError> {
        Self::with_context(GpuContext::new(backend), config)
    }

    /// Create an engine on an existing context
    pub fn with_context(gpu: GpuContext, config: RendererConfig) -> Result<Self, RenderError> {
        config.validate()?;
        log::info!(
            "Render engine on '{}' backend, surface {}x{}",
            gpu.backend().name(),
            config.surface.width,
            config.surface.height
        );
        Ok(Self {
            gpu,
            techniques: TechniqueRegistry::new(),
            pass_defaults: HashMap::new(),
            overlay_blend: None,
            surface: SurfaceState::from_settings(&config.surface),
            config,
            frame: None,
            last_stats: FrameStats::default(),
            frame_index: 0,
            reported_truncation: (0, 0),
        })
    }

    /// Build the shipped techniques and make the outline the highlight default
    ///
    /// Sources come from the configured shader directory when it has them.
    pub fn register_builtin_techniques(&mut self) -> Result<BuiltinTechniques, RenderError> {
        let dir = self.config.shaders.directory.clone();
        let source = |shader| ShaderSource::resolve(dir.as_deref(), shader);

        let pbr = PbrTechnique::new(&mut self.gpu, &source(BuiltinShader::Pbr)?)?;
        let phong = PhongTechnique::new(
            &mut self.gpu,
            &source(BuiltinShader::Phong)?,
            self.config.lighting.capacity(),
        )?;
        let highlight = HighlightTechnique::new(&mut self.gpu, &source(BuiltinShader::Highlight)?)?;

        let keys = BuiltinTechniques {
            pbr: self.register_technique(pbr),
            phong: self.register_technique(phong),
            highlight: self.register_technique(highlight),
        };
        self.set_pass_technique(RenderPass::Highlight, keys.highlight)?;
        Ok(keys)
    }

    /// Add a technique to the shared registry
    pub fn register_technique(&mut self, technique: impl ShaderTechnique + 'static) -> ShaderKey {
        self.techniques.insert(Box::new(technique))
    }

    /// Technique used for `pass` when a render module has no override
    pub fn set_pass_technique(&mut self, pass: RenderPass, key: ShaderKey) -> Result<(), RenderError> {
        if !self.techniques.contains(key) {
            return Err(RenderError::UnknownTechnique(key));
        }
        self.pass_defaults.insert(pass, key);
        Ok(())
    }

    /// Remove the default technique of `pass`
    pub fn clear_pass_technique(&mut self, pass: RenderPass) {
        self.pass_defaults.remove(&pass);
    }

    /// Composite `overlay` onto `scene` with a compute pass once per frame
    ///
    /// The blend runs in [`render_frame`](Self::render_frame) after the
    /// overlay pass and covers the current surface size. Calling this again
    /// only retargets the blend.
    pub fn enable_overlay_blend(&mut self, scene: TextureHandle, overlay: TextureHandle) -> Result<(), RenderError> {
        if let Some(blend) = &mut self.overlay_blend {
            blend.scene = scene;
            blend.overlay = overlay;
            return Ok(());
        }
        let source = ShaderSource::resolve(self.config.shaders.directory.as_deref(), BuiltinShader::OverlayBlend)?;
        let technique = OverlayBlendTechnique::new(&mut self.gpu, &source)?;
        log::debug!("Overlay blend enabled for {:?} onto {:?}", overlay, scene);
        self.overlay_blend = Some(OverlayBlend {
            technique,
            scene,
            overlay,
        });
        Ok(())
    }

    /// Stop blending the overlay and delete the compute program
    pub fn disable_overlay_blend(&mut self) {
        if let Some(mut blend) = self.overlay_blend.take() {
            blend.technique.destroy(&mut self.gpu);
        }
    }

    /// Whether a compute overlay blend runs each frame
    pub fn overlay_blend_enabled(&self) -> bool {
        self.overlay_blend.is_some()
    }

    /// Registered technique
    pub fn technique(&self, key: ShaderKey) -> Option<&dyn ShaderTechnique> {
        self.techniques.get(key)
    }

    /// The GPU context
    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    /// Mutable GPU context, for building custom techniques
    pub fn gpu_mut(&mut self) -> &mut GpuContext {
        &mut self.gpu
    }

    /// Active configuration
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Surface state
    pub fn surface(&self) -> &SurfaceState {
        &self.surface
    }

    /// Record a new surface size; applied at the next `begin_frame`
    pub fn resize(&mut self, width: u32, height: u32) {
        self.surface.resize(width, height);
    }

    /// Current frame phase
    pub fn phase(&self) -> FramePhase {
        if self.frame.is_some() {
            FramePhase::Recording
        } else {
            FramePhase::Idle
        }
    }

    /// Statistics of the current frame, or of the last finished one
    pub fn stats(&self) -> &FrameStats {
        self.frame.as_ref().map_or(&self.last_stats, |frame| &frame.stats)
    }

    /// Upload mesh geometry
    pub fn create_mesh(&mut self, mesh: &MeshData) -> Result<MeshHandle, RenderError> {
        Ok(self.gpu.backend_mut().create_mesh(mesh)?)
    }

    /// Upload an RGBA8 texture
    pub fn create_texture(&mut self, texture: &TextureData) -> Result<TextureHandle, RenderError> {
        Ok(self.gpu.backend_mut().create_texture(texture)?)
    }

    /// Start a frame
    ///
    /// Frees resources the scene released since the last frame, applies a
    /// pending resize, clears, and snapshots camera and lights. Scene lights
    /// and light modules are only read.
    pub fn begin_frame(
        &mut self,
        graph: &mut SceneGraph,
        camera: &dyn CameraView,
        lights: &SceneLights,
    ) -> Result<(), RenderError> {
        self.expect_phase(FramePhase::Idle)?;

        let released = graph.take_releases();
        for resource in &released {
            self.gpu.backend_mut().release(*resource);
        }
        if !released.is_empty() {
            log::debug!("Released {} GPU resources", released.len());
        }

        if let Some((width, height)) = self.surface.take_viewport() {
            self.gpu.backend_mut().set_viewport(width, height);
        }
        self.gpu
            .backend_mut()
            .clear(ClearTargets::COLOR | ClearTargets::DEPTH, self.config.clear_color);

        let view = camera.view_matrix();
        let projection = camera.projection_matrix();

        let mut node_lights = Vec::new();
        for id in graph.depth_first() {
            if let Some(module) = graph.module_as::<LightModule>(id, ModuleKind::Light) {
                node_lights.push(module.world_light(&graph.world_transform(id)?));
            }
        }
        let view_lights = ViewSpaceLights::build(&view, lights, &node_lights, self.config.lighting.capacity());
        self.report_truncation(&view_lights, &node_lights);

        let stats = FrameStats {
            frame_index: self.frame_index,
            resources_released: released.len(),
            truncated_point_lights: view_lights.truncated_point,
            truncated_spot_lights: view_lights.truncated_spot,
            ..FrameStats::default()
        };
        log::trace!("Begin frame {}", self.frame_index);
        self.frame = Some(FrameState::new(view, projection, view_lights, stats));
        Ok(())
    }

    /// Walk every tree depth-first and draw each node for `pass`
    ///
    /// An error aborts the frame; the engine returns to [`FramePhase::Idle`].
    pub fn render_pass(&mut self, graph: &SceneGraph, pass: RenderPass) -> Result<(), RenderError> {
        self.expect_phase(FramePhase::Recording)?;
        for id in graph.depth_first() {
            self.render_node(graph, id, pass)?;
        }
        Ok(())
    }

    /// Draw a single node for `pass`, returning whether it was drawn
    ///
    /// Nodes without a render module, hidden nodes and nodes without a
    /// technique for the pass are skipped. A rejected draw is logged and
    /// counted. Any other error aborts the frame.
    pub fn render_node(&mut self, graph: &SceneGraph, id: NodeId, pass: RenderPass) -> Result<bool, RenderError> {
        self.expect_phase(FramePhase::Recording)?;
        let result = self.draw_node(graph, id, pass);
        if let Err(err) = &result {
            log::error!("Aborting frame {}: {}", self.frame_index, err);
            self.abort_frame();
        }
        result
    }

    /// Run the overlay blend, returning whether it was dispatched
    ///
    /// Does nothing when no blend is enabled or the surface has zero size. An
    /// error aborts the frame.
    pub fn blend_overlay(&mut self) -> Result<bool, RenderError> {
        self.expect_phase(FramePhase::Recording)?;
        let Some(blend) = &self.overlay_blend else {
            return Ok(false);
        };
        let resolution = (self.surface.width(), self.surface.height());
        if resolution.0 == 0 || resolution.1 == 0 {
            log::trace!("Skipping overlay blend on an empty surface");
            return Ok(false);
        }

        match blend.technique.blend(&mut self.gpu, blend.scene, blend.overlay, resolution) {
            Ok(groups) => {
                log::trace!("Overlay blend dispatched {:?} groups", groups);
                if let Some(frame) = &mut self.frame {
                    frame.stats.compute_dispatches += 1;
                }
                Ok(true)
            }
            Err(err) => {
                log::error!("Aborting frame {}: {}", self.frame_index, err);
                self.abort_frame();
                Err(err.into())
            }
        }
    }

    /// Present and finish the frame
    pub fn end_frame(&mut self) -> Result<FrameStats, RenderError> {
        self.expect_phase(FramePhase::Recording)?;
        self.gpu.backend_mut().present();

        let stats = self
            .frame
            .take()
            .map(|frame| frame.stats)
            .unwrap_or_default();
        log::trace!(
            "End frame {}: {} drawn, {} skipped, {} failed",
            stats.frame_index,
            stats.nodes_drawn,
            stats.nodes_skipped,
            stats.draw_failures
        );
        self.last_stats = stats.clone();
        self.frame_index += 1;
        Ok(stats)
    }

    /// Run a whole frame: opaque pass, selection highlight, overlay, overlay
    /// blend, present
    pub fn render_frame(
        &mut self,
        graph: &mut SceneGraph,
        camera: &dyn CameraView,
        lights: &SceneLights,
        selection: Option<&SelectionManager>,
    ) -> Result<FrameStats, RenderError> {
        self.begin_frame(graph, camera, lights)?;
        let graph: &SceneGraph = graph;
        self.render_pass(graph, RenderPass::Opaque)?;
        if let Some(selection) = selection {
            selection.render_selected(self, graph, RenderPass::Highlight)?;
        }
        if self.pass_defaults.contains_key(&RenderPass::Overlay) {
            self.render_pass(graph, RenderPass::Overlay)?;
        }
        self.blend_overlay()?;
        self.end_frame()
    }

    /// Drop any frame in progress and destroy every technique
    pub fn shutdown(&mut self) {
        if self.frame.is_some() {
            log::warn!("Shutting down in the middle of frame {}", self.frame_index);
            self.abort_frame();
        }
        self.pass_defaults.clear();
        self.disable_overlay_blend();
        self.techniques.destroy_all(&mut self.gpu);
        log::info!("Render engine shut down after {} frames", self.frame_index);
    }

    fn expect_phase(&self, expected: FramePhase) -> Result<(), RenderError> {
        let actual = self.phase();
        if actual == expected {
            Ok(())
        } else {
            Err(RenderError::FrameState { expected, actual })
        }
    }

    fn abort_frame(&mut self) {
        if let Some(program) = self.gpu.bound_program() {
            let _ = self.gpu.unbind_program(program);
        }
        if let Some(frame) = self.frame.take() {
            self.last_stats = frame.stats;
        }
    }

    fn report_truncation(&mut self, lights: &ViewSpaceLights, node_lights: &[NodeLight]) {
        let truncated = (lights.truncated_point, lights.truncated_spot);
        if truncated != self.reported_truncation && self.config.lighting.warn_on_truncation {
            if truncated == (0, 0) {
                log::info!("All active lights fit the shader light slots again");
            } else {
                log::warn!(
                    "Dropping {} point and {} spot lights beyond capacity {:?} ({} node lights)",
                    truncated.0,
                    truncated.1,
                    lights.capacity,
                    node_lights.len()
                );
            }
        }
        self.reported_truncation = truncated;
    }

    fn resolve_technique(&self, module: &RenderModule, pass: RenderPass) -> Option<ShaderKey> {
        module
            .pass_shader(pass)
            .or_else(|| self.pass_defaults.get(&pass).copied())
            .or_else(|| (pass == RenderPass::Opaque).then_some(module.shader()))
    }

    fn draw_node(&mut self, graph: &SceneGraph, id: NodeId, pass: RenderPass) -> Result<bool, RenderError> {
        graph.node(id)?;
        let module = graph.module_as::<RenderModule>(id, ModuleKind::Render);
        let key = module
            .filter(|module| module.is_visible())
            .and_then(|module| self.resolve_technique(module, pass));

        let Self { gpu, techniques, frame, .. } = self;
        let frame = frame.as_mut().ok_or(RenderError::FrameState {
            expected: FramePhase::Recording,
            actual: FramePhase::Idle,
        })?;
        frame.stats.nodes_visited += 1;

        let (Some(module), Some(key)) = (module, key) else {
            frame.stats.nodes_skipped += 1;
            return Ok(false);
        };
        let technique = techniques.get_mut(key).ok_or(RenderError::UnknownTechnique(key))?;
        let program = technique.program().id()?;

        technique.program().bind(gpu)?;
        if technique.uses_lighting() && frame.lit_programs.insert(program) {
            frame.lights.upload(technique.program_mut(), gpu)?;
            frame.stats.light_uploads += 1;
        }

        let scope = UniformScope {
            graph,
            node: id,
            view: frame.view,
            projection: frame.projection,
        };
        technique.update_uniforms(gpu, &scope)?;

        let drawn = match gpu.backend_mut().draw_mesh(module.mesh()) {
            Ok(()) => {
                frame.stats.nodes_drawn += 1;
                true
            }
            Err(err) => {
                log::warn!(
                    "Draw of node '{}' in {} pass failed: {}",
                    graph.name(id).unwrap_or_default(),
                    pass,
                    err
                );
                frame.stats.draw_failures += 1;
                false
            }
        };
        technique.program().unbind(gpu)?;
        Ok(drawn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{GpuCommand, GpuResource, HeadlessBackend, ImageAccess};
    use crate::render::Camera;
    use crate::scene::MaterialModule;

    fn engine() -> (RenderEngine, BuiltinTechniques) {
        let mut engine = RenderEngine::new(HeadlessBackend::new(), RendererConfig::default()).unwrap();
        let builtins = engine.register_builtin_techniques().unwrap();
        (engine, builtins)
    }

    fn headless(engine: &RenderEngine) -> &HeadlessBackend {
        engine.gpu().backend_as::<HeadlessBackend>().unwrap()
    }

    fn textured_node(engine: &mut RenderEngine, graph: &mut SceneGraph, shader: ShaderKey) -> (NodeId, MeshHandle) {
        let mesh = engine.create_mesh(&MeshData::cube()).unwrap();
        let node = graph.create_node("cube");
        graph.attach_module(node, RenderModule::owned(mesh, shader)).unwrap();
        graph.attach_module(node, MaterialModule::new()).unwrap();
        (node, mesh)
    }

    #[test]
    fn test_frame_calls_out_of_order_are_rejected() {
        let (mut engine, _) = engine();
        let mut graph = SceneGraph::new();
        let camera = Camera::default();
        let lights = SceneLights::default();

        assert!(matches!(
            engine.render_pass(&graph, RenderPass::Opaque),
            Err(RenderError::FrameState { expected: FramePhase::Recording, .. })
        ));
        assert!(matches!(engine.end_frame(), Err(RenderError::FrameState { .. })));

        engine.begin_frame(&mut graph, &camera, &lights).unwrap();
        assert!(matches!(
            engine.begin_frame(&mut graph, &camera, &lights),
            Err(RenderError::FrameState { expected: FramePhase::Idle, actual: FramePhase::Recording })
        ));
        engine.end_frame().unwrap();
        assert_eq!(engine.phase(), FramePhase::Idle);
    }

    #[test]
    fn test_opaque_pass_draws_each_render_node() {
        let (mut engine, builtins) = engine();
        let mut graph = SceneGraph::new();
        let (_, mesh) = textured_node(&mut engine, &mut graph, builtins.pbr);
        graph.create_node("empty");

        let stats = engine
            .render_frame(&mut graph, &Camera::default(), &SceneLights::default(), None)
            .unwrap();

        assert_eq!(stats.nodes_drawn, 1);
        assert_eq!(stats.nodes_skipped, 1);
        assert_eq!(headless(&engine).draws(), vec![mesh]);
        assert_eq!(headless(&engine).frames_presented(), 1);
        assert_eq!(engine.gpu().bound_program(), None);
    }

    #[test]
    fn test_missing_material_aborts_frame() {
        let (mut engine, builtins) = engine();
        let mut graph = SceneGraph::new();
        let mesh = engine.create_mesh(&MeshData::quad()).unwrap();
        let node = graph.create_node("bare");
        graph.attach_module(node, RenderModule::new(mesh, builtins.pbr)).unwrap();

        let result = engine.render_frame(&mut graph, &Camera::default(), &SceneLights::default(), None);

        assert!(matches!(
            result,
            Err(RenderError::MissingModule { kind: ModuleKind::Material, .. })
        ));
        assert_eq!(engine.phase(), FramePhase::Idle);
        assert_eq!(engine.gpu().bound_program(), None);
        assert!(headless(&engine).draws().is_empty());
    }

    #[test]
    fn test_draw_failure_is_counted_and_frame_continues() {
        let (mut engine, builtins) = engine();
        let mut graph = SceneGraph::new();
        let (_, broken) = textured_node(&mut engine, &mut graph, builtins.pbr);
        let (_, fine) = textured_node(&mut engine, &mut graph, builtins.pbr);
        engine.gpu_mut().backend_as_mut::<HeadlessBackend>().unwrap().fail_draws_for(broken);

        let stats = engine
            .render_frame(&mut graph, &Camera::default(), &SceneLights::default(), None)
            .unwrap();

        assert_eq!(stats.draw_failures, 1);
        assert_eq!(stats.nodes_drawn, 1);
        assert_eq!(headless(&engine).draws(), vec![fine]);
    }

    #[test]
    fn test_lights_upload_once_per_lit_program() {
        let (mut engine, builtins) = engine();
        let mut graph = SceneGraph::new();
        textured_node(&mut engine, &mut graph, builtins.phong);
        textured_node(&mut engine, &mut graph, builtins.phong);
        textured_node(&mut engine, &mut graph, builtins.pbr);

        let stats = engine
            .render_frame(&mut graph, &Camera::default(), &SceneLights::default(), None)
            .unwrap();

        assert_eq!(stats.nodes_drawn, 3);
        assert_eq!(stats.light_uploads, 1);
        assert_eq!(headless(&engine).uniform_writes("ambientLight").len(), 1);
    }

    #[test]
    fn test_released_resources_freed_next_frame() {
        let (mut engine, builtins) = engine();
        let mut graph = SceneGraph::new();
        let (node, mesh) = textured_node(&mut engine, &mut graph, builtins.pbr);
        let camera = Camera::default();
        let lights = SceneLights::default();

        graph.remove_node(node).unwrap();
        assert!(headless(&engine).is_live(GpuResource::Mesh(mesh)));

        let stats = engine.render_frame(&mut graph, &camera, &lights, None).unwrap();
        assert_eq!(stats.resources_released, 1);
        assert!(!headless(&engine).is_live(GpuResource::Mesh(mesh)));
        assert!(graph.pending_releases().is_empty());
    }

    #[test]
    fn test_unknown_pass_technique_is_rejected() {
        let (mut engine, _) = engine();
        let bogus = ShaderKey::default();
        assert!(matches!(
            engine.set_pass_technique(RenderPass::Overlay, bogus),
            Err(RenderError::UnknownTechnique(_))
        ));
    }

    #[test]
    fn test_shutdown_deletes_programs() {
        let (mut engine, _) = engine();
        assert_eq!(headless(&engine).program_count(), 3);
        engine.shutdown();
        assert_eq!(headless(&engine).program_count(), 0);
    }

    #[test]
    fn test_overlay_blend_dispatches_once_per_frame_over_surface() {
        let (mut engine, builtins) = engine();
        let mut graph = SceneGraph::new();
        textured_node(&mut engine, &mut graph, builtins.pbr);
        let scene = engine.create_texture(&TextureData::filled(4, 4, [0, 0, 0, 255])).unwrap();
        let overlay = engine.create_texture(&TextureData::filled(4, 4, [0, 0, 0, 0])).unwrap();
        engine.enable_overlay_blend(scene, overlay).unwrap();
        let camera = Camera::default();
        let lights = SceneLights::default();

        let stats = engine.render_frame(&mut graph, &camera, &lights, None).unwrap();
        assert_eq!(stats.compute_dispatches, 1);

        engine.resize(100, 50);
        engine.render_frame(&mut graph, &camera, &lights, None).unwrap();

        let backend = headless(&engine);
        let groups: Vec<[u32; 3]> = backend.dispatches().into_iter().map(|(_, groups)| groups).collect();
        assert_eq!(groups, vec![[80, 45, 1], [7, 4, 1]]);

        let commands = backend.commands();
        let dispatch = commands
            .iter()
            .position(|command| matches!(command, GpuCommand::Dispatch { .. }))
            .unwrap();
        let first_draw = commands
            .iter()
            .position(|command| matches!(command, GpuCommand::Draw { .. }))
            .unwrap();
        let present = commands.iter().position(|command| *command == GpuCommand::Present).unwrap();
        assert!(first_draw < dispatch && dispatch < present);
        assert!(commands[..dispatch].contains(&GpuCommand::BindImage {
            unit: 0,
            image: Some(scene),
            access: ImageAccess::ReadWrite
        }));
        assert!(commands[..dispatch].contains(&GpuCommand::BindImage {
            unit: 1,
            image: Some(overlay),
            access: ImageAccess::ReadOnly
        }));
        assert_eq!(engine.gpu().bound_image(0), None);
        assert_eq!(engine.gpu().bound_program(), None);
    }

    #[test]
    fn test_overlay_blend_is_off_by_default_and_destroyed_on_disable() {
        let (mut engine, _) = engine();
        let mut graph = SceneGraph::new();
        let stats = engine
            .render_frame(&mut graph, &Camera::default(), &SceneLights::default(), None)
            .unwrap();
        assert_eq!(stats.compute_dispatches, 0);
        assert!(headless(&engine).dispatches().is_empty());

        let target = engine.create_texture(&TextureData::solid([0, 0, 0, 0])).unwrap();
        engine.enable_overlay_blend(target, target).unwrap();
        engine.enable_overlay_blend(target, target).unwrap();
        assert_eq!(headless(&engine).program_count(), 4);

        engine.disable_overlay_blend();
        assert!(!engine.overlay_blend_enabled());
        assert_eq!(headless(&engine).program_count(), 3);
    }
}
