//! Two pixel buffers shared with the host, double-buffered.

use thiserror::Error;
use tracing::debug;

pub const POOL_SIZE: usize = 2;

/// Index of a buffer inside the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub usize);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BufferError {
    /// Both buffers are still held by the host.
    #[error("all buffers are busy")]
    AllBusy,
    /// The requested size is empty or could not be allocated.
    #[error("failed to allocate a {width}x{height} buffer")]
    Allocation { width: u32, height: u32 },
}

#[derive(Debug, Default)]
struct PooledBuffer {
    pixels: Vec<u32>,
    width: u32,
    height: u32,
    busy: bool,
    generation: u64,
}

/// A buffer handed out by [`BufferPool::acquire`].
pub struct AcquiredBuffer<'a> {
    pub id: BufferId,
    pub width: u32,
    pub height: u32,
    pub pixels: &'a mut [u32],
}

#[derive(Debug, Default)]
pub struct BufferPool {
    buffers: [PooledBuffer; POOL_SIZE],
    allocations: u64,
}

impl BufferPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the first free buffer sized `width × height`, reallocating it
    /// when its dimensions differ, and marks it busy.
    pub fn acquire(&mut self, width: u32, height: u32) -> Result<AcquiredBuffer<'_>, BufferError> {
        let index = self
            .buffers
            .iter()
            .position(|buffer| !buffer.busy)
            .ok_or(BufferError::AllBusy)?;

        let buffer = &mut self.buffers[index];
        if buffer.pixels.is_empty() || buffer.width != width || buffer.height != height {
            let len = (width as usize)
                .checked_mul(height as usize)
                .filter(|len| *len > 0)
                .ok_or(BufferError::Allocation { width, height })?;
            let mut pixels = Vec::new();
            pixels
                .try_reserve_exact(len)
                .map_err(|_| BufferError::Allocation { width, height })?;
            pixels.resize(len, 0);
            self.allocations += 1;
            debug!(index, width, height, "allocated pool buffer");
            *buffer = PooledBuffer {
                pixels,
                width,
                height,
                busy: false,
                generation: self.allocations,
            };
        }

        buffer.busy = true;
        Ok(AcquiredBuffer {
            id: BufferId(index),
            width,
            height,
            pixels: &mut buffer.pixels,
        })
    }

    /// Hands a buffer back after the host is done reading it.
    pub fn release(&mut self, id: BufferId) {
        if let Some(buffer) = self.buffers.get_mut(id.0) {
            buffer.busy = false;
        }
    }

    pub fn is_busy(&self, id: BufferId) -> bool {
        self.buffers.get(id.0).is_some_and(|buffer| buffer.busy)
    }

    /// Allocation counter value when buffer `id` was last (re)allocated.
    pub fn generation(&self, id: BufferId) -> Option<u64> {
        self.buffers
            .get(id.0)
            .filter(|buffer| !buffer.pixels.is_empty())
            .map(|buffer| buffer.generation)
    }

    pub fn dimensions(&self, id: BufferId) -> Option<(u32, u32)> {
        self.buffers
            .get(id.0)
            .filter(|buffer| !buffer.pixels.is_empty())
            .map(|buffer| (buffer.width, buffer.height))
    }

    pub fn pixels(&self, id: BufferId) -> Option<&[u32]> {
        self.buffers.get(id.0).map(|buffer| buffer.pixels.as_slice())
    }
}
