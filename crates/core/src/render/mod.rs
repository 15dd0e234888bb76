use std::collections::HashMap;

use serde::Serialize;

use crate::{Result, SpectrumError};

/// Position of a single tessellated vertex, relative to the bar's top-left
/// corner with y pointing down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
}

impl Vertex {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Handle to a vertex buffer owned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexBufferId(pub u64);

/// Opaque per-draw context handed through from the host. Geometry never
/// inspects it.
#[derive(Debug, Clone, Copy, Default)]
pub struct EffectContext;

/// Immediate-mode drawing surface provided by the host.
pub trait RenderBackend {
    fn push_matrix(&mut self);
    fn translate(&mut self, x: f32, y: f32, z: f32);
    fn pop_matrix(&mut self);

    /// Draws a solid `width` x `height` quad at the current origin.
    fn draw_sprite(&mut self, width: u32, height: u32) -> Result<()>;

    fn create_vertex_buffer(&mut self, vertices: &[Vertex]) -> Result<VertexBufferId>;

    /// Draws `count` vertices of `buffer` as a triangle strip.
    fn draw_strip(&mut self, buffer: VertexBufferId, count: usize) -> Result<()>;

    fn destroy_vertex_buffer(&mut self, buffer: VertexBufferId);
}

/// Pushes the transform stack on creation and pops it on drop.
pub struct MatrixScope<'a, B: RenderBackend + ?Sized> {
    backend: &'a mut B,
}

impl<'a, B: RenderBackend + ?Sized> MatrixScope<'a, B> {
    pub fn new(backend: &'a mut B) -> Self {
        backend.push_matrix();
        Self { backend }
    }

    pub fn backend(&mut self) -> &mut B {
        &mut *self.backend
    }
}

impl<B: RenderBackend + ?Sized> Drop for MatrixScope<'_, B> {
    fn drop(&mut self) {
        self.backend.pop_matrix();
    }
}

/// Vertex buffer that lives for a single draw and is destroyed on drop,
/// whether or not the draw succeeded.
pub struct TransientVertexBuffer<'a, B: RenderBackend + ?Sized> {
    backend: &'a mut B,
    id: VertexBufferId,
    len: usize,
}

impl<'a, B: RenderBackend + ?Sized> TransientVertexBuffer<'a, B> {
    pub fn create(backend: &'a mut B, vertices: &[Vertex]) -> Result<Self> {
        let id = backend.create_vertex_buffer(vertices)?;
        Ok(Self {
            backend,
            id,
            len: vertices.len(),
        })
    }

    pub fn id(&self) -> VertexBufferId {
        self.id
    }

    pub fn backend(&mut self) -> &mut B {
        &mut *self.backend
    }

    /// Draws the whole buffer as a triangle strip at `(x, y)`.
    pub fn draw_at(&mut self, x: f32, y: f32) -> Result<()> {
        let (id, len) = (self.id, self.len);
        let mut scope = MatrixScope::new(&mut *self.backend);
        scope.backend().translate(x, y, 0.0);
        scope.backend().draw_strip(id, len)
    }
}

impl<B: RenderBackend + ?Sized> Drop for TransientVertexBuffer<'_, B> {
    fn drop(&mut self) {
        self.backend.destroy_vertex_buffer(self.id);
    }
}

/// A command captured by [`CommandRecorder`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DrawCommand {
    Push,
    Translate { x: f32, y: f32 },
    Pop,
    Sprite { width: u32, height: u32 },
    CreateBuffer { id: u64, vertices: usize },
    Strip {
        id: u64,
        count: usize,
        width: f32,
        height: f32,
    },
    DestroyBuffer { id: u64 },
}

/// Backend that records every command instead of drawing. Used for
/// previews and tests.
#[derive(Debug, Default)]
pub struct CommandRecorder {
    commands: Vec<DrawCommand>,
    // Bounding box of each buffer that has not been destroyed yet.
    live: HashMap<VertexBufferId, (f32, f32)>,
    next_buffer: u64,
    depth: usize,
    fail_draws: bool,
}

impl CommandRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorder whose draw calls all fail, for exercising cleanup paths.
    pub fn failing() -> Self {
        Self {
            fail_draws: true,
            ..Self::default()
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Current transform stack depth. Zero after a balanced frame.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Buffers created but not yet destroyed.
    pub fn live_buffers(&self) -> usize {
        self.live.len()
    }

    /// Every translate that was followed by a draw, paired with the drawn
    /// size; strips report the bounding box of their vertices.
    pub fn placed_rects(&self) -> Vec<PlacedRect> {
        let mut rects = Vec::new();
        let mut origin = (0.0, 0.0);
        for command in &self.commands {
            match *command {
                DrawCommand::Translate { x, y } => origin = (x, y),
                DrawCommand::Sprite { width, height } => rects.push(PlacedRect {
                    x: origin.0,
                    y: origin.1,
                    width: width as f32,
                    height: height as f32,
                }),
                DrawCommand::Strip { width, height, .. } => rects.push(PlacedRect {
                    x: origin.0,
                    y: origin.1,
                    width,
                    height,
                }),
                _ => {}
            }
        }
        rects
    }
}

/// Axis-aligned rectangle reconstructed from recorded commands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlacedRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl RenderBackend for CommandRecorder {
    fn push_matrix(&mut self) {
        self.depth += 1;
        self.commands.push(DrawCommand::Push);
    }

    fn translate(&mut self, x: f32, y: f32, _z: f32) {
        self.commands.push(DrawCommand::Translate { x, y });
    }

    fn pop_matrix(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.commands.push(DrawCommand::Pop);
    }

    fn draw_sprite(&mut self, width: u32, height: u32) -> Result<()> {
        if self.fail_draws {
            return Err(SpectrumError::render("sprite rejected"));
        }
        self.commands.push(DrawCommand::Sprite { width, height });
        Ok(())
    }

    fn create_vertex_buffer(&mut self, vertices: &[Vertex]) -> Result<VertexBufferId> {
        let id = VertexBufferId(self.next_buffer);
        self.next_buffer += 1;
        let width = vertices.iter().map(|v| v.x).fold(0.0, f32::max);
        let height = vertices.iter().map(|v| v.y).fold(0.0, f32::max);
        self.live.insert(id, (width, height));
        self.commands.push(DrawCommand::CreateBuffer {
            id: id.0,
            vertices: vertices.len(),
        });
        Ok(id)
    }

    fn draw_strip(&mut self, buffer: VertexBufferId, count: usize) -> Result<()> {
        if self.fail_draws {
            return Err(SpectrumError::render("strip rejected"));
        }
        let Some(&(width, height)) = self.live.get(&buffer) else {
            return Err(SpectrumError::render(format!(
                "vertex buffer {} does not exist",
                buffer.0
            )));
        };
        self.commands.push(DrawCommand::Strip {
            id: buffer.0,
            count,
            width,
            height,
        });
        Ok(())
    }

    fn destroy_vertex_buffer(&mut self, buffer: VertexBufferId) {
        self.live.remove(&buffer);
        self.commands.push(DrawCommand::DestroyBuffer { id: buffer.0 });
    }
}
