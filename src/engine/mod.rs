//! # Scene engine
//!
//! [`Engine`] owns one scene: the entity store, the uploaded resources, the
//! deferred command queue and the backend everything is drawn with. Callers
//! declare entities with [`Engine::cube`] and friends, change them with
//! [`Engine::move_entity`], and call [`Engine::frame`] once per display frame.
//!
//! Every update restarts the entity's transition from wherever it was at that
//! moment, so choreography is a matter of issuing updates, optionally with a
//! delay:
//!
//! ```
//! use vista::prelude::*;
//!
//! let mut engine = Engine::new(RecordingBackend::default(), EngineConfig::default());
//! engine.cube(Props::named("box")).unwrap();
//! engine
//!     .move_entity(Props::named("box").x(5.0).with_duration(30.0), None)
//!     .unwrap();
//!
//! for tick in 1..=15 {
//!     engine.frame(tick as f64);
//! }
//! assert_eq!(engine.lerp("box", Property::X), Some(2.5));
//! ```

pub mod commands;
pub mod config;

#[cfg(test)]
mod tests;

use std::collections::{HashMap, HashSet};

use cgmath::{Matrix, Matrix4, SquareMatrix, Vector3, Zero};

pub use commands::{Command, CommandQueue};
pub use config::EngineConfig;

use crate::{
    error::{EngineError, Result},
    gfx::{
        geometry::Model,
        rendering::{
            backend::{
                BlendMode, DrawCall, FrameGlobals, GraphicsBackend, ProgramHandle, ShadingOptions,
            },
            wgpu_backend::{SCENE_FRAGMENT_SHADER, SCENE_VERTEX_SHADER},
        },
        resources::ResourceCache,
        scene::{
            color::parse_hex_color,
            helpers::{billboard_matrix, distance_sq, perspective},
            interpolation::{lerp, lerp_transform},
            transform::compose_world_matrices,
            EntityKind, EntityState, Property, Props, Rgba, SceneError, SceneStore, CAMERA,
            LIGHT,
        },
    },
};

/// Custom draw routine, called instead of [`GraphicsBackend::draw`] for
/// entities whose `renderer` names it
pub type Renderer<B> = Box<dyn FnMut(&mut B, &DrawCall)>;

/// What one call to [`Engine::frame`] did
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameStats {
    /// False when the engine was stopped and nothing happened
    pub rendered: bool,
    pub dt: f32,
    /// Deferred commands applied at the top of the frame
    pub commands: usize,
    pub opaque: usize,
    pub transparent: usize,
    /// Visible entities that couldn't be drawn, e.g. unknown model
    pub skipped: usize,
}

pub struct Engine<B: GraphicsBackend> {
    backend: B,
    config: EngineConfig,
    store: SceneStore,
    cache: ResourceCache,
    commands: CommandQueue,
    renderers: HashMap<String, Renderer<B>>,
    program: ProgramHandle,
    projection: Matrix4<f32>,
    clear_color: Rgba,
    ambient: f32,
    last_frame: f64,
    running: bool,
    unknown_models: HashSet<String>,
}

impl<B: GraphicsBackend> Engine<B> {
    /// Initializes a scene on `backend` with a default light and camera
    pub fn new(backend: B, config: EngineConfig) -> Self {
        let mut engine = Self {
            backend,
            config,
            store: SceneStore::new(),
            cache: ResourceCache::with_builtins(),
            commands: CommandQueue::new(),
            renderers: HashMap::new(),
            program: ProgramHandle(0),
            projection: Matrix4::identity(),
            clear_color: Rgba::WHITE,
            ambient: 0.0,
            last_frame: 0.0,
            running: false,
            unknown_models: HashSet::new(),
        };
        engine.initialize();
        engine
    }

    /// Starts over on a new surface
    ///
    /// Entities, pending commands and uploads are dropped. Registered models
    /// and renderers are kept.
    pub fn reset(&mut self, backend: B) {
        self.backend = backend;
        self.initialize();
    }

    fn initialize(&mut self) {
        self.program = self
            .backend
            .compile_program(SCENE_VERTEX_SHADER, SCENE_FRAGMENT_SHADER);
        match self.backend.program_log(self.program) {
            Some(log) => log::warn!("Scene program diagnostics: {}", log),
            None if self.config.debug => log::debug!("Scene program compiled cleanly"),
            None => {}
        }
        self.backend.use_program(self.program);

        self.store.clear();
        self.cache.clear_uploads();
        self.commands.clear();
        self.unknown_models.clear();

        self.clear_color = parse_hex_color(&self.config.clear_color).unwrap_or_else(|e| {
            log::warn!("Bad clear color '{}': {}", self.config.clear_color, e);
            Rgba::WHITE
        });
        self.ambient = self.config.ambient.clamp(0.0, 1.0);
        self.last_frame = 0.0;

        let light = Props::named(LIGHT).y(-1.0);
        let camera = Props::named(CAMERA).with_fov(self.config.fov);
        self.apply_update(&light, Some(EntityKind::Light)).ok();
        self.apply_update(&camera, Some(EntityKind::Camera)).ok();
        self.update_projection();

        self.running = true;
        log::debug!("Engine initialized");
    }

    pub fn plane(&mut self, props: Props) -> Result<String> {
        self.declare(props, EntityKind::Plane)
    }

    pub fn billboard(&mut self, props: Props) -> Result<String> {
        self.declare(props, EntityKind::Billboard)
    }

    pub fn cube(&mut self, props: Props) -> Result<String> {
        self.declare(props, EntityKind::Cube)
    }

    pub fn pyramid(&mut self, props: Props) -> Result<String> {
        self.declare(props, EntityKind::Pyramid)
    }

    pub fn sphere(&mut self, props: Props) -> Result<String> {
        self.declare(props, EntityKind::Sphere)
    }

    /// Declares an invisible entity other entities can be grouped under
    pub fn group(&mut self, props: Props) -> Result<String> {
        self.declare(props, EntityKind::Group)
    }

    /// Registers a custom model type, replacing any model of the same name
    pub fn add(&mut self, name: &str, model: Model) -> Result<()> {
        self.cache.register_model(name, model)?;
        self.unknown_models.remove(name);
        log::debug!("Registered model '{}'", name);
        Ok(())
    }

    /// Declares or updates an entity of a registered model
    pub fn instance(&mut self, model: &str, props: Props) -> Result<String> {
        if !self.cache.has_model(model) {
            return Err(EngineError::UnknownModel(model.to_string()));
        }
        self.declare(props, EntityKind::from_name(model))
    }

    fn declare(&mut self, props: Props, kind: EntityKind) -> Result<String> {
        self.apply_update(&props, Some(kind))
    }

    /// Updates an existing entity, now or `delay` after the last frame
    pub fn move_entity(&mut self, props: Props, delay: Option<f32>) -> Result<()> {
        self.update_or_schedule(props, None, delay)
    }

    /// Removes an entity, now or `delay` after the last frame
    pub fn delete(&mut self, name: &str, delay: Option<f32>) -> Result<()> {
        if let Some(due) = self.due_time(delay) {
            self.commands.push(due, Command::Delete(name.to_string()));
            return Ok(());
        }
        self.remove_entity(name)
    }

    pub fn camera(&mut self, props: Props, delay: Option<f32>) -> Result<()> {
        self.update_or_schedule(props.with_name(CAMERA), Some(EntityKind::Camera), delay)
    }

    pub fn light(&mut self, props: Props, delay: Option<f32>) -> Result<()> {
        self.update_or_schedule(props.with_name(LIGHT), Some(EntityKind::Light), delay)
    }

    /// Sets the ambient light level, clamped to `0.0..=1.0`
    pub fn ambient(&mut self, level: f32) {
        self.ambient = level.clamp(0.0, 1.0);
    }

    pub fn clear_color(&mut self, hex: &str) -> Result<()> {
        self.clear_color = parse_hex_color(hex)?;
        Ok(())
    }

    /// Registers a draw routine entities can opt into with `Props::with_renderer`
    pub fn register_renderer(
        &mut self,
        name: impl Into<String>,
        renderer: impl FnMut(&mut B, &DrawCall) + 'static,
    ) {
        self.renderers.insert(name.into(), Box::new(renderer));
    }

    /// Resizes the surface and recomputes the projection for its new aspect
    pub fn resize(&mut self, width: u32, height: u32) {
        self.backend.resize(width, height);
        self.update_projection();
    }

    /// Stops the loop; later calls to [`Engine::frame`] do nothing
    pub fn stop(&mut self) {
        log::debug!("Engine stopped");
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn due_time(&self, delay: Option<f32>) -> Option<f64> {
        delay.filter(|d| *d > 0.0).map(|d| self.last_frame + d as f64)
    }

    fn update_or_schedule(
        &mut self,
        props: Props,
        kind: Option<EntityKind>,
        delay: Option<f32>,
    ) -> Result<()> {
        if let Some(due) = self.due_time(delay) {
            self.commands.push(due, Command::Update { props, kind });
            return Ok(());
        }
        self.apply_update(&props, kind).map(|_| ())
    }

    /// Merges an update into the store and uploads anything it needs first seen
    fn apply_update(&mut self, props: &Props, kind: Option<EntityKind>) -> Result<String> {
        let name = self.store.set_state(props, kind).map_err(|e| {
            log::warn!("{}", e);
            e
        })?;

        if let Some(bitmap) = props.texture() {
            self.cache.ensure_texture(&mut self.backend, bitmap);
        }

        if let Some(record) = self.store.get(&name) {
            let state = &record.next;
            if !state.kind.is_invisible() {
                let model = state.kind.model_name();
                let uploaded = if state.smooth {
                    self.cache
                        .ensure_smooth_normals(&mut self.backend, model)
                        .is_some()
                } else {
                    self.cache.ensure_buffers(&mut self.backend, model).is_some()
                };
                if !uploaded && self.unknown_models.insert(model.to_string()) {
                    log::warn!("'{}' uses unknown model '{}', it won't be drawn", name, model);
                }
            }
        }

        if name == CAMERA && props.fov.is_some() {
            self.update_projection();
        }
        Ok(name)
    }

    fn remove_entity(&mut self, name: &str) -> Result<()> {
        match self.store.remove(name) {
            Some(_) => {
                log::debug!("Deleted '{}'", name);
                Ok(())
            }
            None => {
                log::warn!("Can't delete unknown entity '{}'", name);
                Err(SceneError::UnknownEntity(name.to_string()).into())
            }
        }
    }

    fn apply_command(&mut self, command: Command) {
        // failures are already logged
        let _ = match command {
            Command::Update { props, kind } => self.apply_update(&props, kind).map(|_| ()),
            Command::Delete(name) => self.remove_entity(&name),
        };
    }

    fn update_projection(&mut self) {
        let (width, height) = self.backend.surface_size();
        let aspect = if height > 0 {
            width as f32 / height as f32
        } else {
            1.0
        };
        let fov = self
            .store
            .get(CAMERA)
            .and_then(|c| c.next.fov)
            .unwrap_or(self.config.fov);
        self.projection = perspective(fov, aspect, self.config.near, self.config.far);
    }

    /// Renders one frame at timestamp `now`, in milliseconds
    ///
    /// Timestamps stay in `f64` so long sessions keep millisecond steps; only
    /// the per-frame delta is narrowed to `f32`.
    ///
    /// Applies due commands, advances transitions by the time since the last
    /// frame, composes every world matrix, then draws opaque entities in
    /// declaration order followed by transparent ones back to front.
    pub fn frame(&mut self, now: f64) -> FrameStats {
        if !self.running {
            return FrameStats::default();
        }

        let dt = (now - self.last_frame).max(0.0) as f32;
        self.last_frame = now;
        let mut stats = FrameStats {
            rendered: true,
            dt,
            ..Default::default()
        };

        for command in self.commands.drain_due(now) {
            self.apply_command(command);
            stats.commands += 1;
        }

        self.store.advance_timers(dt);
        compose_world_matrices(&mut self.store);

        let eye = self
            .store
            .get(CAMERA)
            .and_then(|c| c.world)
            .unwrap_or_else(Matrix4::identity);
        let view = eye.invert().unwrap_or_else(Matrix4::identity);
        let light_direction = self
            .store
            .get(LIGHT)
            .map(|l| {
                let t = lerp_transform(l);
                Vector3::new(t.x, t.y, t.z)
            })
            .unwrap_or_else(Vector3::zero);

        let globals = FrameGlobals {
            clear_color: self.clear_color,
            eye,
            projection_view: self.projection * view,
            light_direction,
        };
        self.backend.use_program(self.program);
        self.backend.begin_frame(&globals);

        let mut opaque = Vec::new();
        let mut transparent = Vec::new();
        for record in self.store.iter() {
            let state = &record.next;
            if state.kind.is_invisible() {
                continue;
            }
            if state.is_transparent() {
                let world = record.world.unwrap_or_else(Matrix4::identity);
                transparent.push((state.name.clone(), distance_sq(&world, &eye)));
            } else {
                opaque.push(state.name.clone());
            }
        }
        // stable, so equal distances keep declaration order
        transparent.sort_by(|a, b| b.1.total_cmp(&a.1));

        for name in &opaque {
            if self.draw_entity(name, &eye, false) {
                stats.opaque += 1;
            } else {
                stats.skipped += 1;
            }
        }
        for (name, _) in &transparent {
            if self.draw_entity(name, &eye, true) {
                stats.transparent += 1;
            } else {
                stats.skipped += 1;
            }
        }

        self.backend.end_frame();

        if self.config.debug {
            log::trace!("{:?}", stats);
        }
        stats
    }

    fn draw_entity(&mut self, name: &str, eye: &Matrix4<f32>, transparent: bool) -> bool {
        let Some(record) = self.store.get(name) else {
            return false;
        };
        let state = &record.next;
        let model = state.kind.model_name();

        let Some(mut buffers) = self.cache.ensure_buffers(&mut self.backend, model) else {
            return false;
        };
        if state.smooth && !buffers.custom_normals {
            buffers.normals = self.cache.ensure_smooth_normals(&mut self.backend, model);
        }

        let world = record.world.unwrap_or_else(Matrix4::identity);
        let model_matrix = if state.kind == EntityKind::Billboard {
            let t = lerp_transform(record);
            billboard_matrix(&world, eye, t.w, t.h)
        } else {
            world
        };
        let normal_matrix = model_matrix
            .invert()
            .map(|m| m.transpose())
            .unwrap_or_else(Matrix4::identity);

        let call = DrawCall {
            entity: state.name.clone(),
            buffers,
            model: model_matrix,
            normal_matrix,
            color: state.rgba(),
            texture: state.texture.and_then(|key| self.cache.texture(key)),
            shading: ShadingOptions {
                smooth: state.smooth || buffers.custom_normals,
                shaded: state.mode.is_shaded() && !state.unlit,
                ambient: self.ambient,
                mix: state.mix,
            },
            mode: state.mode,
            blend: if transparent {
                BlendMode::Alpha
            } else {
                BlendMode::Opaque
            },
            depth_write: !(transparent && state.kind.is_flat()),
        };

        match state.renderer.as_ref() {
            Some(renderer) => match self.renderers.get_mut(renderer) {
                Some(draw) => draw(&mut self.backend, &call),
                None => {
                    log::trace!("Renderer '{}' not registered, using default", renderer);
                    self.backend.draw(&call);
                }
            },
            None => self.backend.draw(&call),
        }
        true
    }

    /// Target state of an entity
    pub fn entity(&self, name: &str) -> Option<&EntityState> {
        self.store.get(name).map(|r| &r.next)
    }

    /// State at the start of an entity's current transition
    pub fn previous(&self, name: &str) -> Option<&EntityState> {
        self.store.get(name).map(|r| &r.previous)
    }

    /// World matrix composed for an entity on the last frame
    pub fn world_matrix(&self, name: &str) -> Option<Matrix4<f32>> {
        self.store.get(name).and_then(|r| r.world)
    }

    /// Current interpolated value of one property
    pub fn lerp(&self, name: &str, property: Property) -> Option<f32> {
        self.store.get(name).map(|r| lerp(r, property))
    }

    /// Entity names in declaration order
    pub fn entity_names(&self) -> &[String] {
        self.store.names()
    }

    pub fn projection(&self) -> Matrix4<f32> {
        self.projection
    }

    pub fn ambient_level(&self) -> f32 {
        self.ambient
    }

    pub fn pending_commands(&self) -> usize {
        self.commands.len()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }
}
