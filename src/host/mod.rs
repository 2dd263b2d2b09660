//! Contracts between the engine and the display host.

pub mod winit;

use std::time::Duration;

use anyhow::Result;

use crate::buffer::BufferId;

/// Pointer input in logical surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Enter { x: f64, y: f64 },
    Leave,
    Motion { x: f64, y: f64 },
    Button { pressed: bool, serial: u32 },
    /// Vertical scroll; negative values scroll up.
    Axis { delta: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostEvent {
    Configure { width: u32, height: u32, serial: u32 },
    Closed,
    OutputRemoved,
    ScaleChanged(i32),
    BufferReleased(BufferId),
    Pointer(PointerEvent),
}

/// A finished frame handed to the host.
pub struct Frame<'a> {
    pub buffer: BufferId,
    pub pixels: &'a [u32],
    /// Device pixels.
    pub width: u32,
    pub height: u32,
    pub scale: i32,
}

/// Requests the engine makes of the host surface.
pub trait SurfaceProtocol {
    /// `width == 0` lets the host choose the width.
    fn request_size(&mut self, width: u32, height: u32);
    fn request_exclusive_zone(&mut self, height: u32);
    fn ack_configure(&mut self, serial: u32);
    /// Shows `frame`. The host answers with [`HostEvent::BufferReleased`]
    /// once it no longer reads the buffer.
    fn present(&mut self, frame: Frame<'_>) -> Result<()>;
}

pub trait EventSource {
    /// Blocks until events arrive or `timeout` elapses (`None` waits
    /// indefinitely). An empty batch means the timeout fired.
    fn wait(&mut self, timeout: Option<Duration>) -> Result<Vec<HostEvent>>;
}
