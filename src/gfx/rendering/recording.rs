//! Headless backend that records what the engine asks of the GPU
//!
//! Nothing is drawn. Programs, uploads and draw calls are kept in memory so a
//! scene can be driven without a window, and so tests can check exactly what
//! reached the graphics API.

use super::backend::{
    BufferData, BufferHandle, BufferKind, DrawCall, FrameGlobals, GraphicsBackend, ProgramHandle,
    TextureHandle, TextureImage,
};

/// One buffer upload
#[derive(Debug, Clone, PartialEq)]
pub struct BufferUpload {
    pub handle: BufferHandle,
    pub kind: BufferKind,
    pub len: usize,
}

/// One texture upload, pixels as received
#[derive(Debug, Clone, PartialEq)]
pub struct TextureUpload {
    pub handle: TextureHandle,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Everything submitted between `begin_frame` and `end_frame`
#[derive(Debug, Clone, Default)]
pub struct RecordedFrame {
    pub globals: FrameGlobals,
    pub draws: Vec<DrawCall>,
    pub finished: bool,
}

impl RecordedFrame {
    /// Entity names in draw order
    pub fn draw_order(&self) -> Vec<&str> {
        self.draws.iter().map(|d| d.entity.as_str()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct RecordingBackend {
    width: u32,
    height: u32,
    programs: Vec<(String, String)>,
    current_program: Option<ProgramHandle>,
    /// Diagnostics returned for every program, for exercising error paths
    pub program_log: Option<String>,
    pub buffers: Vec<BufferUpload>,
    pub textures: Vec<TextureUpload>,
    /// Recorded frames, oldest first
    pub frames: Vec<RecordedFrame>,
    /// Frames kept before the oldest are dropped, unbounded when `None`
    frame_limit: Option<usize>,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

impl RecordingBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            programs: Vec::new(),
            current_program: None,
            program_log: None,
            buffers: Vec::new(),
            textures: Vec::new(),
            frames: Vec::new(),
            frame_limit: None,
        }
    }

    /// Keeps at most `limit` frames, for long headless runs
    pub fn with_frame_limit(mut self, limit: usize) -> Self {
        self.frame_limit = Some(limit.max(1));
        self
    }

    /// Removes and returns every frame recorded so far
    pub fn take_frames(&mut self) -> Vec<RecordedFrame> {
        std::mem::take(&mut self.frames)
    }

    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    pub fn current_program(&self) -> Option<ProgramHandle> {
        self.current_program
    }

    pub fn last_frame(&self) -> Option<&RecordedFrame> {
        self.frames.last()
    }

    pub fn buffer_uploads(&self, kind: BufferKind) -> usize {
        self.buffers.iter().filter(|b| b.kind == kind).count()
    }
}

impl GraphicsBackend for RecordingBackend {
    fn compile_program(&mut self, vertex_source: &str, fragment_source: &str) -> ProgramHandle {
        self.programs
            .push((vertex_source.to_string(), fragment_source.to_string()));
        ProgramHandle(self.programs.len() as u32 - 1)
    }

    fn program_log(&self, _program: ProgramHandle) -> Option<String> {
        self.program_log.clone()
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.current_program = Some(program);
    }

    fn create_buffer(&mut self, kind: BufferKind, data: BufferData<'_>) -> BufferHandle {
        let handle = BufferHandle(self.buffers.len() as u32);
        self.buffers.push(BufferUpload {
            handle,
            kind,
            len: data.len(),
        });
        handle
    }

    fn create_texture(&mut self, image: TextureImage<'_>) -> TextureHandle {
        let handle = TextureHandle(self.textures.len() as u32);
        self.textures.push(TextureUpload {
            handle,
            width: image.width,
            height: image.height,
            pixels: image.pixels.to_vec(),
        });
        handle
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn surface_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn begin_frame(&mut self, globals: &FrameGlobals) {
        if let Some(limit) = self.frame_limit {
            let excess = (self.frames.len() + 1).saturating_sub(limit);
            self.frames.drain(..excess);
        }
        self.frames.push(RecordedFrame {
            globals: *globals,
            draws: Vec::new(),
            finished: false,
        });
    }

    fn draw(&mut self, call: &DrawCall) {
        match self.frames.last_mut() {
            Some(frame) if !frame.finished => frame.draws.push(call.clone()),
            _ => log::warn!("Draw of '{}' outside a frame ignored", call.entity),
        }
    }

    fn end_frame(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.finished = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_frames(backend: &mut RecordingBackend, count: usize) {
        for i in 0..count {
            let globals = FrameGlobals {
                light_direction: cgmath::Vector3::new(i as f32, -1.0, 0.0),
                ..Default::default()
            };
            backend.begin_frame(&globals);
            backend.end_frame();
        }
    }

    #[test]
    fn frame_limit_drops_oldest_frames() {
        let mut backend = RecordingBackend::default().with_frame_limit(3);
        record_frames(&mut backend, 5);
        assert_eq!(backend.frames.len(), 3);
        assert_eq!(backend.frames[0].globals.light_direction.x, 2.0);
        assert_eq!(backend.last_frame().unwrap().globals.light_direction.x, 4.0);
    }

    #[test]
    fn take_frames_empties_the_log() {
        let mut backend = RecordingBackend::default();
        record_frames(&mut backend, 2);
        let taken = backend.take_frames();
        assert_eq!(taken.len(), 2);
        assert!(taken.iter().all(|f| f.finished));
        assert!(backend.frames.is_empty());

        record_frames(&mut backend, 1);
        assert_eq!(backend.frames.len(), 1);
    }
}
