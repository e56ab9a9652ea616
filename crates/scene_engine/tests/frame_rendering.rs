//! End-to-end frames on the headless backend

use approx::assert_relative_eq;
use scene_engine::gpu::{GpuCommand, UniformValue};
use scene_engine::prelude::*;

/// Camera at the origin with identity matrices, so view space equals world space
struct IdentityCamera;

impl CameraView for IdentityCamera {
    fn view_matrix(&self) -> Mat4 {
        Mat4::identity()
    }

    fn projection_matrix(&self) -> Mat4 {
        Mat4::identity()
    }
}

fn setup() -> (RenderEngine, BuiltinTechniques, SceneGraph) {
    let mut engine = RenderEngine::new(HeadlessBackend::new(), RendererConfig::default()).unwrap();
    let techniques = engine.register_builtin_techniques().unwrap();
    (engine, techniques, SceneGraph::new())
}

fn headless(engine: &RenderEngine) -> &HeadlessBackend {
    engine.gpu().backend_as::<HeadlessBackend>().unwrap()
}

fn lit_cube(engine: &mut RenderEngine, graph: &mut SceneGraph, shader: ShaderKey, name: &str) -> NodeId {
    let mesh = engine.create_mesh(&MeshData::cube()).unwrap();
    let node = graph.create_node(name);
    graph.attach_module(node, RenderModule::owned(mesh, shader)).unwrap();
    graph.attach_module(node, MaterialModule::new()).unwrap();
    node
}

fn written_names(engine: &RenderEngine) -> Vec<String> {
    headless(engine)
        .commands()
        .iter()
        .filter_map(|command| match command {
            GpuCommand::SetUniform { name, .. } => Some(name.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_extra_point_lights_are_dropped_without_error() {
    let (mut engine, techniques, mut graph) = setup();
    lit_cube(&mut engine, &mut graph, techniques.phong, "lit");

    let mut lights = SceneLights::new();
    for i in 0..7 {
        lights.add_point_light(PointLight::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(i as f32, 0.0, 0.0), 1.0));
    }

    let stats = engine.render_frame(&mut graph, &IdentityCamera, &lights, None).unwrap();

    assert_eq!(stats.truncated_point_lights, 2);
    assert_eq!(stats.nodes_drawn, 1);

    let names = written_names(&engine);
    for slot in 0..5 {
        let field = format!("pointLights[{slot}].intensity");
        assert!(names.contains(&field), "slot {slot} was not written");
    }
    assert!(!names.iter().any(|name| name.starts_with("pointLights[5]")));
    assert!(!names.iter().any(|name| name.starts_with("pointLights[6]")));

    match headless(&engine).uniform_writes("pointLights[4].position").last() {
        Some(UniformValue::Vec3(position)) => assert_relative_eq!(position.x, 4.0),
        other => panic!("unexpected position write {other:?}"),
    }
}

#[test]
fn test_rendering_does_not_mutate_lights() {
    let (mut engine, techniques, mut graph) = setup();
    lit_cube(&mut engine, &mut graph, techniques.phong, "lit");

    let lamp = graph.create_node_with("lamp", Transform::from_position(Vec3::new(0.0, 2.0, 0.0)));
    let bulb = NodeLight::Point(PointLight::new(Vec3::new(1.0, 0.9, 0.8), Vec3::zeros(), 2.0));
    graph.attach_module(lamp, LightModule::new(bulb.clone())).unwrap();

    let mut lights = SceneLights::new();
    lights
        .add_point_light(PointLight::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(3.0, 0.0, 0.0), 1.0))
        .add_spot_light(SpotLight::new(
            PointLight::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(0.0, 5.0, 0.0), 1.0),
            Vec3::new(0.0, -1.0, 0.0),
            30.0,
        ))
        .set_directional(DirectionalLight::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(0.0, 1.0, 0.0), 0.5));
    let before = lights.clone();

    let camera = Camera::default();
    engine.render_frame(&mut graph, &camera, &lights, None).unwrap();
    engine.render_frame(&mut graph, &camera, &lights, None).unwrap();

    assert_eq!(lights, before);
    let module = graph.module_as::<LightModule>(lamp, ModuleKind::Light).unwrap();
    assert_eq!(module.light(), &bulb);
}

#[test]
fn test_node_light_follows_its_node() {
    let (mut engine, techniques, mut graph) = setup();
    lit_cube(&mut engine, &mut graph, techniques.phong, "lit");

    let rig = graph.create_node_with("rig", Transform::from_position(Vec3::new(10.0, 0.0, 0.0)));
    let lamp = graph
        .create_child(rig, "lamp", Transform::from_position(Vec3::new(0.0, 2.0, 0.0)))
        .unwrap();
    let bulb = NodeLight::Point(PointLight::new(Vec3::new(1.0, 1.0, 1.0), Vec3::zeros(), 1.0));
    graph.attach_module(lamp, LightModule::new(bulb)).unwrap();

    engine
        .render_frame(&mut graph, &IdentityCamera, &SceneLights::new(), None)
        .unwrap();

    match headless(&engine).uniform_writes("pointLights[0].position").last() {
        Some(UniformValue::Vec3(position)) => {
            assert_relative_eq!(position.x, 10.0);
            assert_relative_eq!(position.y, 2.0);
        }
        other => panic!("unexpected position write {other:?}"),
    }
}

#[test]
fn test_selection_is_outlined_after_opaque_pass() {
    let (mut engine, techniques, mut graph) = setup();
    let picked = lit_cube(&mut engine, &mut graph, techniques.pbr, "picked");
    lit_cube(&mut engine, &mut graph, techniques.pbr, "other");

    let mut selection = SelectionManager::new();
    selection.add_selection(&mut graph, picked).unwrap();

    let stats = engine
        .render_frame(&mut graph, &Camera::default(), &SceneLights::new(), Some(&selection))
        .unwrap();

    assert_eq!(stats.nodes_drawn, 3);
    assert_eq!(headless(&engine).draws().len(), 3);
    assert_eq!(headless(&engine).uniform_writes("highlightColor").len(), 1);
}

#[test]
fn test_cleared_selection_draws_no_outline() {
    let (mut engine, techniques, mut graph) = setup();
    let picked = lit_cube(&mut engine, &mut graph, techniques.pbr, "picked");

    let mut selection = SelectionManager::new();
    selection.add_selection(&mut graph, picked).unwrap();
    selection.clear(&mut graph);

    assert!(!graph.is_selected(picked));
    assert_eq!(selection.iter().count(), 0);

    let stats = engine
        .render_frame(&mut graph, &Camera::default(), &SceneLights::new(), Some(&selection))
        .unwrap();
    assert_eq!(stats.nodes_drawn, 1);
    assert!(headless(&engine).uniform_writes("highlightColor").is_empty());
}

#[test]
fn test_stale_selection_is_skipped() {
    let (mut engine, techniques, mut graph) = setup();
    let picked = lit_cube(&mut engine, &mut graph, techniques.pbr, "picked");
    let mut selection = SelectionManager::new();
    selection.add_selection(&mut graph, picked).unwrap();

    graph.remove_node(picked).unwrap();

    let stats = engine
        .render_frame(&mut graph, &Camera::default(), &SceneLights::new(), Some(&selection))
        .unwrap();
    assert_eq!(stats.nodes_drawn, 0);
    assert_eq!(stats.resources_released, 1);
}

#[test]
fn test_missing_material_aborts_and_next_frame_recovers() {
    let (mut engine, techniques, mut graph) = setup();
    let mesh = engine.create_mesh(&MeshData::quad()).unwrap();
    let bare = graph.create_node("bare");
    graph.attach_module(bare, RenderModule::new(mesh, techniques.pbr)).unwrap();

    let err = engine
        .render_frame(&mut graph, &Camera::default(), &SceneLights::new(), None)
        .unwrap_err();
    assert!(matches!(err, RenderError::MissingModule { kind: ModuleKind::Material, .. }));
    assert_eq!(headless(&engine).frames_presented(), 0);

    graph.attach_module(bare, MaterialModule::new()).unwrap();
    let stats = engine
        .render_frame(&mut graph, &Camera::default(), &SceneLights::new(), None)
        .unwrap();
    assert_eq!(stats.nodes_drawn, 1);
    assert_eq!(headless(&engine).frames_presented(), 1);
}

#[test]
fn test_resize_sets_viewport_on_next_frame() {
    let (mut engine, techniques, mut graph) = setup();
    lit_cube(&mut engine, &mut graph, techniques.pbr, "cube");
    let camera = Camera::default();
    let lights = SceneLights::new();

    engine.render_frame(&mut graph, &camera, &lights, None).unwrap();
    engine.resize(640, 480);
    engine.render_frame(&mut graph, &camera, &lights, None).unwrap();

    let viewports: Vec<(u32, u32)> = headless(&engine)
        .commands()
        .iter()
        .filter_map(|command| match command {
            GpuCommand::Viewport { width, height } => Some((*width, *height)),
            _ => None,
        })
        .collect();
    assert_eq!(viewports, vec![(1280, 720), (640, 480)]);
}

#[test]
fn test_extra_spot_lights_are_dropped_after_node_lights_fill_slots() {
    let (mut engine, techniques, mut graph) = setup();
    lit_cube(&mut engine, &mut graph, techniques.phong, "lit");

    let mut lights = SceneLights::new();
    for i in 0..4 {
        lights.add_spot_light(SpotLight::new(
            PointLight::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(i as f32, 0.0, 0.0), 1.0),
            Vec3::new(0.0, -1.0, 0.0),
            25.0,
        ));
    }
    for i in 0..3 {
        let lamp = graph.create_node_with("lamp", Transform::from_position(Vec3::new(0.0, 7.0 + i as f32, 0.0)));
        let cone = SpotLight::new(
            PointLight::new(Vec3::new(1.0, 1.0, 1.0), Vec3::zeros(), 1.0),
            Vec3::new(0.0, -1.0, 0.0),
            25.0,
        );
        graph.attach_module(lamp, LightModule::new(NodeLight::Spot(cone))).unwrap();
    }

    let stats = engine.render_frame(&mut graph, &IdentityCamera, &lights, None).unwrap();

    assert_eq!(stats.truncated_spot_lights, 2);
    assert_eq!(stats.truncated_point_lights, 0);
    assert_eq!(stats.nodes_drawn, 1);

    let names = written_names(&engine);
    for slot in 0..5 {
        for field in ["pl.intensity", "conedir", "cutoff"] {
            let name = format!("spotLights[{slot}].{field}");
            assert!(names.contains(&name), "{name} was not written");
        }
    }
    assert!(!names.iter().any(|name| name.starts_with("spotLights[5]")));

    match headless(&engine).uniform_writes("spotLights[4].pl.position").last() {
        Some(UniformValue::Vec3(position)) => assert_relative_eq!(position.y, 7.0),
        other => panic!("unexpected position write {other:?}"),
    }
}

#[test]
fn test_shared_mesh_survives_sibling_removal() {
    let (mut engine, techniques, mut graph) = setup();
    let cube = engine.create_mesh(&MeshData::cube()).unwrap();
    let mut nodes = Vec::new();
    for name in ["left", "right"] {
        let node = graph.create_node(name);
        graph.attach_module(node, RenderModule::new(cube, techniques.pbr)).unwrap();
        graph.attach_module(node, MaterialModule::new()).unwrap();
        nodes.push(node);
    }

    graph.remove_node(nodes[0]).unwrap();
    let stats = engine
        .render_frame(&mut graph, &Camera::default(), &SceneLights::new(), None)
        .unwrap();

    assert_eq!(stats.resources_released, 0);
    assert_eq!(stats.nodes_drawn, 1);
    assert_eq!(stats.draw_failures, 0);
    assert_eq!(headless(&engine).draws(), vec![cube]);
    assert!(headless(&engine).is_live(scene_engine::gpu::GpuResource::Mesh(cube)));
}

#[test]
fn test_replacing_render_module_keeps_shared_mesh() {
    let (mut engine, techniques, mut graph) = setup();
    let cube = engine.create_mesh(&MeshData::cube()).unwrap();
    let node = graph.create_node("swapped");
    graph.attach_module(node, RenderModule::new(cube, techniques.phong)).unwrap();
    graph.attach_module(node, MaterialModule::new()).unwrap();

    graph.attach_module(node, RenderModule::new(cube, techniques.highlight)).unwrap();
    let stats = engine
        .render_frame(&mut graph, &Camera::default(), &SceneLights::new(), None)
        .unwrap();

    assert_eq!(stats.resources_released, 0);
    assert_eq!(stats.draw_failures, 0);
    assert_eq!(stats.nodes_drawn, 1);
    assert_eq!(headless(&engine).draws(), vec![cube]);
}
