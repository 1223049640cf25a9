//! Windowed driver
//!
//! [`VistaApp`] opens a window, builds an [`Engine`] on a [`WgpuBackend`] once
//! the window exists, and calls [`Engine::frame`] on every redraw with the
//! milliseconds elapsed since start-up. With vsync the redraws follow the
//! display; without it they are paced at a fixed 16 ms.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Context;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes},
};

use crate::{
    engine::{Engine, EngineConfig},
    error::EngineError,
    gfx::rendering::wgpu_backend::{SurfaceOptions, WgpuBackend},
};

/// Frame interval used when vsync is off
pub const FALLBACK_FRAME_INTERVAL: Duration = Duration::from_millis(16);

pub type SetupCallback = Box<dyn FnOnce(&mut Engine<WgpuBackend>) -> anyhow::Result<()>>;
pub type FrameCallback = Box<dyn FnMut(&mut Engine<WgpuBackend>, f64)>;

/// Window and engine settings
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub engine: EngineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "vista".to_string(),
            width: 1200,
            height: 800,
            engine: EngineConfig::from_env(),
        }
    }
}

pub struct VistaApp {
    event_loop: Option<EventLoop<()>>,
    state: AppState,
}

struct AppState {
    config: AppConfig,
    window: Option<Arc<Window>>,
    engine: Option<Engine<WgpuBackend>>,
    setup: Option<SetupCallback>,
    on_frame: Option<FrameCallback>,
    started: Instant,
    next_frame: Instant,
    error: Option<anyhow::Error>,
}

impl VistaApp {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let event_loop = EventLoop::new().context("failed to create event loop")?;
        let now = Instant::now();

        Ok(Self {
            event_loop: Some(event_loop),
            state: AppState {
                config,
                window: None,
                engine: None,
                setup: None,
                on_frame: None,
                started: now,
                next_frame: now,
                error: None,
            },
        })
    }

    /// Called once with the freshly created engine, before the first frame
    pub fn on_setup<F>(&mut self, setup: F)
    where
        F: FnOnce(&mut Engine<WgpuBackend>) -> anyhow::Result<()> + 'static,
    {
        self.state.setup = Some(Box::new(setup));
    }

    /// Called before every frame with the frame's timestamp in milliseconds
    pub fn on_frame<F>(&mut self, on_frame: F)
    where
        F: FnMut(&mut Engine<WgpuBackend>, f64) + 'static,
    {
        self.state.on_frame = Some(Box::new(on_frame));
    }

    /// The engine, once the window has been created
    pub fn engine_mut(&mut self) -> Result<&mut Engine<WgpuBackend>, EngineError> {
        self.state.engine_mut()
    }

    /// Runs the event loop until the window closes or the engine stops
    pub fn run(mut self) -> anyhow::Result<()> {
        let _ = env_logger::try_init();

        let event_loop = self
            .event_loop
            .take()
            .context("event loop already consumed")?;
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop
            .run_app(&mut self.state)
            .context("event loop failed")?;

        match self.state.error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl AppState {
    fn engine_mut(&mut self) -> Result<&mut Engine<WgpuBackend>, EngineError> {
        self.engine.as_mut().ok_or(EngineError::NotInitialized)
    }

    fn create_engine(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window = event_loop
            .create_window(
                WindowAttributes::default()
                    .with_title(self.config.title.clone())
                    .with_inner_size(winit::dpi::LogicalSize::new(
                        self.config.width,
                        self.config.height,
                    )),
            )
            .context("failed to create window")?;
        let window = Arc::new(window);
        self.window = Some(window.clone());

        let (width, height) = window.inner_size().into();
        let options = SurfaceOptions {
            vsync: self.config.engine.vsync,
            cull_back_faces: self.config.engine.cull_back_faces,
        };
        let backend = pollster::block_on(WgpuBackend::new(window, width, height, options))?;

        let mut engine = Engine::new(backend, self.config.engine.clone());
        if let Some(setup) = self.setup.take() {
            setup(&mut engine).context("scene setup failed")?;
        }

        self.started = Instant::now();
        self.next_frame = self.started;
        self.engine = Some(engine);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.error = Some(error);
        event_loop.exit();
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(error) = self.create_engine(event_loop) {
            self.fail(event_loop, error);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let now = self.started.elapsed().as_secs_f64() * 1000.0;
        let Some(engine) = self.engine.as_mut() else {
            return;
        };

        match event {
            WindowEvent::KeyboardInput {
                event:
                    winit::event::KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            }
            | WindowEvent::CloseRequested => {
                engine.stop();
                event_loop.exit();
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                engine.resize(width, height);
            }
            WindowEvent::RedrawRequested => {
                if let Some(on_frame) = self.on_frame.as_mut() {
                    on_frame(engine, now);
                }
                engine.frame(now);
                if !engine.is_running() {
                    event_loop.exit();
                }
            }
            _ => (),
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(window) = self.window.as_ref() else {
            return;
        };

        if self.config.engine.vsync {
            window.request_redraw();
            return;
        }

        let now = Instant::now();
        if now >= self.next_frame {
            window.request_redraw();
            self.next_frame = now + FALLBACK_FRAME_INTERVAL;
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame));
    }
}
