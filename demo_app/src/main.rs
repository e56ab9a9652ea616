//! Scene demo application
//!
//! Builds a small lit scene (a floor, a spinning rig of cubes and a lamp),
//! selects one cube and renders a fixed number of frames on the headless
//! backend, logging per-frame statistics.
//!
//! Usage: `scene_demo [config.toml|config.ron] [frames]`

use scene_engine::foundation::logging;
use scene_engine::foundation::math::utils;
use scene_engine::gpu::GpuCommand;
use scene_engine::prelude::*;
use thiserror::Error;

const DEFAULT_FRAMES: u32 = 120;

#[derive(Error, Debug)]
enum DemoError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error("Invalid frame count '{0}'")]
    FrameCount(String),
}

struct DemoScene {
    graph: SceneGraph,
    lights: SceneLights,
    selection: SelectionManager,
    rig: NodeId,
}

impl DemoScene {
    fn build(engine: &mut RenderEngine, techniques: BuiltinTechniques) -> Result<Self, DemoError> {
        let mut graph = SceneGraph::new();
        let cube = engine.create_mesh(&MeshData::cube())?;
        let quad = engine.create_mesh(&MeshData::quad())?;
        let checker = engine.create_texture(&TextureData::solid([200, 200, 200, 255]))?;

        let floor = graph.create_node_with(
            "floor",
            Transform::from_position_rotation(
                Vec3::new(0.0, -1.0, 0.0),
                Quat::from_axis_angle(&Vec3::x_axis(), utils::deg_to_rad(-90.0)),
            )
            .with_uniform_scale(10.0),
        );
        graph.attach_module(floor, RenderModule::owned(quad, techniques.pbr))?;
        graph.attach_module(floor, MaterialModule::with_albedo(checker))?;

        let rig = graph.create_node("rig");
        let mut picked = None;
        for i in 0..4 {
            let angle = utils::deg_to_rad(90.0 * i as f32);
            let offset = Vec3::new(2.0 * angle.cos(), 0.0, 2.0 * angle.sin());
            let node = graph.create_child(rig, format!("cube_{i}"), Transform::from_position(offset).with_uniform_scale(0.5))?;
            graph.attach_module(node, RenderModule::new(cube, techniques.phong))?;
            graph.attach_module(
                node,
                MaterialModule::new().with_diffuse(Vec4::new(0.25 * i as f32, 0.5, 1.0 - 0.25 * i as f32, 1.0)),
            )?;
            if i == 1 {
                picked = Some(node);
            }
        }

        let lamp = graph.create_child(rig, "lamp", Transform::from_position(Vec3::new(0.0, 2.0, 0.0)))?;
        graph.attach_module(
            lamp,
            LightModule::new(NodeLight::Point(PointLight::new(Vec3::new(1.0, 0.8, 0.6), Vec3::zeros(), 1.5))),
        )?;

        let lighting = &engine.config().lighting;
        let mut lights = SceneLights::new();
        lights.ambient = lighting.ambient_color();
        lights.specular_power = lighting.specular_power;
        lights.set_directional(DirectionalLight::new(
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(-0.7, 1.0, 0.3).normalize(),
            0.6,
        ));

        let mut selection = SelectionManager::new();
        if let Some(node) = picked {
            selection.add_selection(&mut graph, node)?;
        }

        log::info!("Scene built with {} nodes", graph.len());
        Ok(Self {
            graph,
            lights,
            selection,
            rig,
        })
    }

    fn update(&mut self, frame: u32) -> Result<(), DemoError> {
        let angle = utils::deg_to_rad(frame as f32 * 3.0);
        let spin = Quat::from_axis_angle(&Vec3::y_axis(), angle);
        self.graph
            .set_local_transform(self.rig, Transform::from_position_rotation(Vec3::zeros(), spin))?;
        Ok(())
    }
}

fn load_config(path: Option<&String>) -> Result<RendererConfig, DemoError> {
    match path {
        Some(path) => Ok(RendererConfig::load_from_file(path)?),
        None => Ok(RendererConfig::default()),
    }
}

fn run() -> Result<(), DemoError> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = load_config(args.first())?;
    let frames = match args.get(1) {
        Some(count) => count
            .parse::<u32>()
            .map_err(|_| DemoError::FrameCount(count.clone()))?,
        None => DEFAULT_FRAMES,
    };

    logging::init(&config.log_level);
    log::info!("Starting scene demo for {} frames", frames);

    let mut camera = Camera::perspective(
        Vec3::new(0.0, 4.0, 8.0),
        45.0,
        config.surface.width as f32 / config.surface.height as f32,
        0.1,
        100.0,
    );
    camera.look_at(Vec3::zeros(), Vec3::new(0.0, 1.0, 0.0));

    let mut engine = RenderEngine::new(HeadlessBackend::new(), config)?;
    let techniques = engine.register_builtin_techniques()?;
    let (width, height) = (engine.surface().width(), engine.surface().height());
    let scene_target = engine.create_texture(&TextureData::filled(width, height, [0, 0, 0, 255]))?;
    let overlay_target = engine.create_texture(&TextureData::filled(width, height, [0, 0, 0, 0]))?;
    engine.enable_overlay_blend(scene_target, overlay_target)?;
    let mut scene = DemoScene::build(&mut engine, techniques)?;

    let mut total_drawn = 0;
    for frame in 0..frames {
        scene.update(frame)?;
        let stats = engine.render_frame(&mut scene.graph, &camera, &scene.lights, Some(&scene.selection))?;
        total_drawn += stats.nodes_drawn;
        log::debug!(
            "Frame {}: {} drawn, {} skipped, {} light uploads, {} dispatches",
            stats.frame_index,
            stats.nodes_drawn,
            stats.nodes_skipped,
            stats.light_uploads,
            stats.compute_dispatches
        );

        if let Some(headless) = engine.gpu_mut().backend_as_mut::<HeadlessBackend>() {
            let commands = headless.take_commands();
            let draws = commands
                .iter()
                .filter(|command| matches!(command, GpuCommand::Draw { .. }))
                .count();
            log::trace!("Frame {} recorded {} commands, {} draws", frame, commands.len(), draws);
        }
    }

    scene.selection.clear(&mut scene.graph);
    scene.graph.clear();
    engine.shutdown();
    log::info!("Rendered {} frames, {} draws in total", frames, total_drawn);
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        log::error!("Scene demo failed: {}", err);
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
