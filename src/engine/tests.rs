use std::sync::Arc;

use approx::assert_abs_diff_eq;

use super::*;
use crate::gfx::{
    geometry::primitives,
    rendering::{
        backend::{BufferKind, DrawMode},
        recording::RecordingBackend,
    },
    resources::bitmap::{Bitmap, TextureKey},
};

fn engine() -> Engine<RecordingBackend> {
    Engine::new(RecordingBackend::default(), EngineConfig::default())
}

fn run_ticks(engine: &mut Engine<RecordingBackend>, from: u32, to: u32) {
    for tick in from..=to {
        engine.frame(tick as f64);
    }
}

fn translation_x(engine: &Engine<RecordingBackend>, name: &str) -> f32 {
    engine.world_matrix(name).map(|m| m.w.x).unwrap()
}

#[test]
fn starts_with_default_camera_and_light() {
    let engine = engine();
    assert!(engine.is_running());
    assert_eq!(engine.entity_names(), &["light", "camera"]);
    assert_eq!(engine.entity(LIGHT).unwrap().transform.y, -1.0);
    assert_eq!(engine.entity(CAMERA).unwrap().fov, Some(30.0));
    assert_eq!(engine.backend().program_count(), 1);
    assert!(engine.backend().current_program().is_some());
}

#[test]
fn cube_gets_defaults_and_auto_name() {
    let mut engine = engine();
    let name = engine.cube(Props::new()).unwrap();

    let state = engine.entity(&name).unwrap();
    assert!(name.starts_with('o'));
    assert_eq!(state.kind, EntityKind::Cube);
    assert_eq!(state.transform, crate::gfx::scene::Transform::default());
    assert_eq!(state.color, "888");
    assert_eq!(state.mode, DrawMode::Triangles);
    assert_eq!(state.group, None);
}

#[test]
fn transition_reaches_half_way_and_end() {
    let mut engine = engine();
    engine.camera(Props::new().z(-10.0), None).unwrap();
    engine.cube(Props::named("c")).unwrap();
    engine
        .move_entity(Props::named("c").x(5.0).with_duration(30.0), None)
        .unwrap();

    run_ticks(&mut engine, 1, 15);
    assert_abs_diff_eq!(translation_x(&engine, "c"), 2.5, epsilon = 1e-5);

    run_ticks(&mut engine, 16, 30);
    assert_abs_diff_eq!(translation_x(&engine, "c"), 5.0, epsilon = 1e-5);

    run_ticks(&mut engine, 31, 40);
    assert_abs_diff_eq!(translation_x(&engine, "c"), 5.0, epsilon = 1e-5);
}

#[test]
fn update_restarts_whole_transition() {
    let mut engine = engine();
    engine.cube(Props::named("c").y(3.0)).unwrap();
    engine
        .move_entity(Props::named("c").y(7.0).with_duration(10.0), None)
        .unwrap();
    run_ticks(&mut engine, 1, 4);

    engine.move_entity(Props::named("c").x(1.0), None).unwrap();

    assert_eq!(engine.previous("c").unwrap().transform.y, 7.0);
    assert_eq!(engine.entity("c").unwrap().elapsed, 0.0);
}

#[test]
fn transparent_entities_draw_back_to_front_after_opaque() {
    let mut engine = engine();
    engine.cube(Props::named("near").z(5.0).with_color("f008")).unwrap();
    engine.cube(Props::named("solid").z(20.0)).unwrap();
    engine.cube(Props::named("far").z(50.0).with_color("f008")).unwrap();
    engine.cube(Props::named("mid").z(10.0).with_color("0f08")).unwrap();

    let stats = engine.frame(1.0);
    assert_eq!(stats.opaque, 1);
    assert_eq!(stats.transparent, 3);

    let frame = engine.backend().last_frame().unwrap();
    assert_eq!(frame.draw_order(), vec!["solid", "far", "mid", "near"]);
    assert!(frame.finished);
    assert_eq!(frame.draws[0].blend, BlendMode::Opaque);
    assert!(frame.draws[1..].iter().all(|d| d.blend == BlendMode::Alpha));
}

#[test]
fn translucent_planes_skip_depth_writes() {
    let mut engine = engine();
    engine.plane(Props::named("glass").with_color("fff8")).unwrap();
    engine.cube(Props::named("ghost").with_color("fff8")).unwrap();
    engine.frame(1.0);

    let frame = engine.backend().last_frame().unwrap();
    let glass = frame.draws.iter().find(|d| d.entity == "glass").unwrap();
    let ghost = frame.draws.iter().find(|d| d.entity == "ghost").unwrap();
    assert!(!glass.depth_write);
    assert!(ghost.depth_write);
}

#[test]
fn groups_compose_and_stay_invisible() {
    let mut engine = engine();
    engine.cube(Props::named("child").x(1.0).with_group("g")).unwrap();
    engine.group(Props::named("g").x(10.0)).unwrap();
    engine.frame(1.0);

    assert_abs_diff_eq!(translation_x(&engine, "child"), 11.0, epsilon = 1e-5);
    let frame = engine.backend().last_frame().unwrap();
    assert_eq!(frame.draw_order(), vec!["child"]);
}

#[test]
fn matrix_override_is_drawn_as_given() {
    let mut engine = engine();
    let fixed = Matrix4::from_translation(Vector3::new(3.0, 0.0, -2.0)) * Matrix4::from_scale(2.0);
    engine
        .cube(Props::named("c").x(50.0).with_matrix(fixed))
        .unwrap();
    engine.frame(1.0);

    assert_eq!(engine.world_matrix("c"), Some(fixed));
    let draw = &engine.backend().last_frame().unwrap().draws[0];
    assert_eq!(draw.model, fixed);
}

#[test]
fn malformed_color_draws_grey() {
    let mut engine = engine();
    engine.cube(Props::named("c").with_color("nope")).unwrap();
    engine.frame(1.0);
    engine.frame(2.0);

    assert_eq!(engine.entity("c").unwrap().color, "888");
    let draw = &engine.backend().last_frame().unwrap().draws[0];
    assert_eq!(draw.color, Rgba::GREY);
}

#[test]
fn deferred_commands_apply_at_due_frame_in_order() {
    let mut engine = engine();
    engine.cube(Props::named("c")).unwrap();
    engine
        .move_entity(Props::named("c").x(2.0), Some(5.0))
        .unwrap();
    engine
        .move_entity(Props::named("c").x(9.0), Some(5.0))
        .unwrap();
    engine.delete("c", Some(8.0)).unwrap();
    assert_eq!(engine.pending_commands(), 3);

    engine.frame(4.0);
    assert_eq!(engine.entity("c").unwrap().transform.x, 0.0);

    let stats = engine.frame(5.0);
    assert_eq!(stats.commands, 2);
    assert_eq!(engine.entity("c").unwrap().transform.x, 9.0);
    assert_eq!(engine.previous("c").unwrap().transform.x, 2.0);

    engine.frame(8.0);
    assert!(engine.entity("c").is_none());
    assert_eq!(engine.pending_commands(), 0);
}

#[test]
fn long_sessions_keep_millisecond_steps() {
    let mut engine = engine();
    let start = 16_777_216.0;
    engine.frame(start);
    engine.cube(Props::named("c")).unwrap();
    engine
        .move_entity(Props::named("c").x(10.0).with_duration(10.0), None)
        .unwrap();

    for step in 1..=5 {
        let stats = engine.frame(start + step as f64);
        assert_eq!(stats.dt, 1.0);
    }
    assert_eq!(engine.lerp("c", Property::X), Some(5.0));
}

#[test]
fn move_of_unknown_entity_is_an_error() {
    let mut engine = engine();
    let result = engine.move_entity(Props::named("ghost").x(1.0), None);
    assert!(matches!(
        result,
        Err(EngineError::Scene(SceneError::UnknownEntity(name))) if name == "ghost"
    ));
    assert!(engine.delete("ghost", None).is_err());
}

#[test]
fn stop_halts_the_loop() {
    let mut engine = engine();
    engine.frame(1.0);
    engine.stop();

    let stats = engine.frame(2.0);
    assert!(!stats.rendered);
    assert!(!engine.is_running());
    assert_eq!(engine.backend().frames.len(), 1);
}

#[test]
fn negative_dt_is_clamped() {
    let mut engine = engine();
    engine
        .cube(Props::named("c").x(4.0).with_duration(10.0))
        .unwrap();
    engine.frame(6.0);
    let stats = engine.frame(3.0);

    assert_eq!(stats.dt, 0.0);
    assert_eq!(engine.entity("c").unwrap().elapsed, 6.0);
}

#[test]
fn missing_camera_and_light_fall_back() {
    let mut engine = engine();
    engine.delete(CAMERA, None).unwrap();
    engine.delete(LIGHT, None).unwrap();
    engine.cube(Props::named("c")).unwrap();

    let stats = engine.frame(1.0);
    assert_eq!(stats.opaque, 1);
    let globals = engine.backend().last_frame().unwrap().globals;
    assert_eq!(globals.eye, Matrix4::identity());
    assert_eq!(globals.light_direction, Vector3::zero());
}

#[test]
fn unknown_model_skips_draw_but_keeps_matrix() {
    let mut engine = engine();
    engine.cube(Props::named("c").x(3.0)).unwrap();
    // a custom kind whose model was never registered
    engine
        .store
        .set_state(
            &Props::named("teapot").x(2.0),
            Some(EntityKind::Custom("teapot".into())),
        )
        .unwrap();

    let stats = engine.frame(1.0);
    assert_eq!(stats.skipped, 1);
    assert_abs_diff_eq!(translation_x(&engine, "teapot"), 2.0, epsilon = 1e-6);
    assert!(matches!(
        engine.instance("teapot", Props::new()),
        Err(EngineError::UnknownModel(_))
    ));
}

#[test]
fn custom_models_are_declared_through_instance() {
    let mut engine = engine();
    engine.add("tri", primitives::pyramid()).unwrap();
    let name = engine.instance("tri", Props::named("t")).unwrap();
    engine.frame(1.0);

    assert_eq!(name, "t");
    assert_eq!(
        engine.entity("t").unwrap().kind,
        EntityKind::Custom("tri".into())
    );
    assert_eq!(engine.backend().last_frame().unwrap().draw_order(), vec!["t"]);
}

#[test]
fn buffers_upload_once_per_model() {
    let mut engine = engine();
    engine.cube(Props::named("a")).unwrap();
    engine.cube(Props::named("b")).unwrap();
    run_ticks(&mut engine, 1, 3);

    assert_eq!(engine.backend().buffer_uploads(BufferKind::Positions), 1);
}

#[test]
fn smooth_shading_uploads_averaged_normals() {
    let mut engine = engine();
    engine.sphere(Props::named("s").with_smooth(true)).unwrap();
    engine.frame(1.0);

    let draw = &engine.backend().last_frame().unwrap().draws[0];
    assert!(draw.buffers.normals.is_some());
    assert!(draw.shading.smooth);
    assert_eq!(engine.backend().buffer_uploads(BufferKind::Normals), 1);
}

#[test]
fn textures_upload_on_first_sight_only() {
    let mut engine = engine();
    let bitmap = Arc::new(
        Bitmap::from_rgba8(TextureKey(7), 1, 2, vec![255, 0, 0, 255, 0, 0, 255, 128]).unwrap(),
    );
    engine
        .plane(Props::named("a").with_texture(bitmap.clone()))
        .unwrap();
    engine
        .cube(Props::named("b").with_texture(bitmap))
        .unwrap();

    let uploads = &engine.backend().textures;
    assert_eq!(uploads.len(), 1);
    // bottom row first, alpha premultiplied
    assert_eq!(&uploads[0].pixels[..4], &[0, 0, 128, 128]);
    assert_eq!(engine.entity("a").unwrap().mix, 0.0);

    engine.frame(1.0);
    let frame = engine.backend().last_frame().unwrap();
    assert_eq!(frame.draws.len(), 2);
    assert!(frame.draws.iter().all(|d| d.texture.is_some()));
}

#[test]
fn custom_renderer_replaces_default_draw() {
    let mut engine = engine();
    engine.register_renderer("wire", |backend: &mut RecordingBackend, call: &DrawCall| {
        let mut call = call.clone();
        call.mode = DrawMode::Lines;
        backend.draw(&call);
    });
    engine
        .cube(Props::named("c").with_renderer("wire"))
        .unwrap();
    engine.frame(1.0);

    let draw = &engine.backend().last_frame().unwrap().draws[0];
    assert_eq!(draw.mode, DrawMode::Lines);
}

#[test]
fn unlit_and_line_modes_are_not_shaded() {
    let mut engine = engine();
    engine.cube(Props::named("flat").with_unlit(true)).unwrap();
    engine
        .cube(Props::named("wire").with_mode(DrawMode::Lines))
        .unwrap();
    engine.cube(Props::named("lit")).unwrap();
    engine.frame(1.0);

    let draws = &engine.backend().last_frame().unwrap().draws;
    assert!(!draws[0].shading.shaded);
    assert!(!draws[1].shading.shaded);
    assert!(draws[2].shading.shaded);
    assert_eq!(draws[2].shading.ambient, 0.2);
}

#[test]
fn shader_diagnostics_do_not_stop_the_engine() {
    let mut backend = RecordingBackend::default();
    backend.program_log = Some("warning: unused variable".into());
    let mut engine = Engine::new(backend, EngineConfig::default());

    engine.cube(Props::named("c")).unwrap();
    assert!(engine.frame(1.0).rendered);
}

#[test]
fn camera_fov_and_resize_update_projection() {
    let mut engine = engine();
    let before = engine.projection();

    engine.camera(Props::new().with_fov(45.0), None).unwrap();
    assert_ne!(engine.projection(), before);
    assert_abs_diff_eq!(engine.projection().y.y, 1.0, epsilon = 1e-5);

    engine.resize(400, 400);
    assert_abs_diff_eq!(engine.projection().x.x, 1.0, epsilon = 1e-5);
}

#[test]
fn billboards_face_the_camera() {
    let mut engine = engine();
    engine.camera(Props::new().ry(90.0), None).unwrap();
    engine
        .billboard(Props::named("b").with_position(1.0, 2.0, 3.0).w(2.0))
        .unwrap();
    engine.frame(1.0);

    let draw = &engine.backend().last_frame().unwrap().draws[0];
    let eye = engine.world_matrix(CAMERA).unwrap();
    assert_abs_diff_eq!(draw.model.x.x, eye.x.x * 2.0, epsilon = 1e-5);
    assert_abs_diff_eq!(draw.model.x.z, eye.x.z * 2.0, epsilon = 1e-5);
    assert_eq!(draw.model.w, cgmath::Vector4::new(1.0, 2.0, 3.0, 1.0));
}

#[test]
fn reset_clears_the_scene_but_keeps_models() {
    let mut engine = engine();
    engine.add("tri", primitives::pyramid()).unwrap();
    engine.cube(Props::named("c")).unwrap();
    engine.move_entity(Props::named("c").x(1.0), Some(10.0)).unwrap();
    engine.frame(1.0);

    engine.reset(RecordingBackend::default());
    assert_eq!(engine.entity_names(), &["light", "camera"]);
    assert_eq!(engine.pending_commands(), 0);
    assert!(engine.cache().has_model("tri"));
    assert!(engine.backend().frames.is_empty());
}

#[test]
fn clear_color_rejects_malformed_hex() {
    let mut engine = engine();
    assert!(engine.clear_color("12").is_err());
    engine.clear_color("000").unwrap();
    engine.frame(1.0);
    assert_eq!(
        engine.backend().last_frame().unwrap().globals.clear_color,
        Rgba::new(0.0, 0.0, 0.0, 1.0)
    );
}
