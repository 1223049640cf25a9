//! A small choreographed scene
//!
//! Run with `cargo run --bin vista-demo [model.obj]`. Cubes drift to random
//! spots, a group of pyramids spins around the origin, and a textured billboard
//! hovers above it all. Press Escape to quit.

use std::sync::Arc;

use anyhow::Context;
use rand::Rng;
use vista::prelude::*;

const GRID: i32 = 3;
const SHUFFLE_EVERY_MS: f64 = 2000.0;

fn checkerboard(size: u32) -> anyhow::Result<Bitmap> {
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let texel: [u8; 4] = if (x / 8 + y / 8) % 2 == 0 {
                [255, 136, 0, 255]
            } else {
                [255, 255, 255, 96]
            };
            pixels.extend_from_slice(&texel);
        }
    }
    Ok(Bitmap::from_rgba8(TextureKey(1), size, size, pixels)?)
}

fn random_color(rng: &mut impl Rng) -> String {
    let mut digit = || rng.random_range(4..16u8);
    format!("{:x}{:x}{:x}", digit(), digit(), digit())
}

fn build_scene(engine: &mut Engine<WgpuBackend>, obj_path: Option<String>) -> anyhow::Result<()> {
    let mut rng = rand::rng();

    engine.clear_color("223")?;
    engine.ambient(0.3);
    engine.camera(Props::new().with_position(0.0, 4.0, 18.0).rx(-12.0), None)?;
    engine.light(Props::new().with_position(0.5, -1.0, -0.6), None)?;

    engine.plane(
        Props::named("floor")
            .with_position(0.0, -2.0, 0.0)
            .rx(-90.0)
            .with_size(30.0)
            .with_color("445"),
    )?;

    for i in -GRID..=GRID {
        engine.cube(
            Props::named(format!("cube{}", i))
                .with_position(i as f32 * 2.0, -1.0, 0.0)
                .with_color(random_color(&mut rng)),
        )?;
    }

    engine.group(Props::named("carousel").with_position(0.0, 1.5, -4.0))?;
    for (i, color) in ["f80c", "08fc", "8f0c"].into_iter().enumerate() {
        let angle = i as f32 * 120.0_f32.to_radians();
        engine.pyramid(
            Props::named(format!("pyramid{}", i))
                .with_group("carousel")
                .with_position(angle.cos() * 3.0, 0.0, angle.sin() * 3.0)
                .with_color(color),
        )?;
    }
    engine.move_entity(
        Props::named("carousel").ry(360.0).with_duration(8000.0),
        None,
    )?;

    engine.sphere(
        Props::named("ball")
            .with_position(-6.0, 2.0, -2.0)
            .with_size(1.5)
            .with_color("e44")
            .with_smooth(true),
    )?;

    engine.billboard(
        Props::named("sign")
            .with_position(6.0, 3.0, -2.0)
            .with_scale(3.0, 3.0, 1.0)
            .with_texture(Arc::new(checkerboard(64)?))
            .with_mix(0.2),
    )?;

    if let Some(path) = obj_path {
        let models = Model::load_obj(&path).with_context(|| format!("loading {}", path))?;
        for (name, model) in models {
            engine.add(&name, model)?;
            engine.instance(&name, Props::named(&name).with_position(0.0, 4.0, 0.0))?;
        }
    }

    Ok(())
}

fn shuffle_cubes(engine: &mut Engine<WgpuBackend>, rng: &mut impl Rng) {
    for i in -GRID..=GRID {
        let props = Props::named(format!("cube{}", i))
            .with_position(
                rng.random_range(-8.0..8.0),
                rng.random_range(-1.0..5.0),
                rng.random_range(-6.0..3.0),
            )
            .with_rotation(0.0, rng.random_range(0.0..360.0), 0.0)
            .with_duration(1500.0);
        // staggered so the cubes leave one after another
        let delay = (i + GRID) as f32 * 100.0;
        if let Err(e) = engine.move_entity(props, Some(delay)) {
            log::warn!("{}", e);
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let obj_path = std::env::args().nth(1);
    let mut app = VistaApp::new(AppConfig {
        title: "vista demo".to_string(),
        ..AppConfig::default()
    })?;

    app.on_setup(move |engine| build_scene(engine, obj_path));

    let mut rng = rand::rng();
    let mut next_shuffle = SHUFFLE_EVERY_MS;
    app.on_frame(move |engine, now| {
        if now >= next_shuffle {
            shuffle_cubes(engine, &mut rng);
            next_shuffle = now + SHUFFLE_EVERY_MS;
        }
    });

    app.run()
}
