//! Deterministic stand-ins for the font stack, the display host and the
//! command runner. Used by unit and integration tests.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use anyhow::{Result, bail};
use style_model::{Color, FontDescriptor};

use crate::buffer::BufferId;
use crate::exec::ActionExecutor;
use crate::geometry::Rect;
use crate::host::{EventSource, Frame, HostEvent, SurfaceProtocol};
use crate::render::canvas::Canvas;
use crate::text::{LayoutLine, LineBox, StyledText, TextEngine, TextLayout, compose_layout};

/// Every character is `char_width` wide and every line `line_height` tall.
/// Exact strings can be given a fixed single-line size.
#[derive(Debug, Clone)]
pub struct MonospaceEngine {
    char_width: i32,
    line_height: i32,
    sizes: HashMap<String, (i32, i32)>,
}

impl MonospaceEngine {
    pub fn new(char_width: i32, line_height: i32) -> Self {
        Self {
            char_width,
            line_height,
            sizes: HashMap::new(),
        }
    }

    pub fn with_size(mut self, text: &str, width: i32, height: i32) -> Self {
        self.sizes.insert(text.to_string(), (width, height));
        self
    }

    pub fn line_height(&self) -> i32 {
        self.line_height
    }
}

impl TextEngine for MonospaceEngine {
    fn advances(&self, _font: &FontDescriptor, text: &StyledText, _scale: i32) -> Vec<f32> {
        text.text.chars().map(|_| self.char_width as f32).collect()
    }

    fn line_box(
        &self,
        _font: &FontDescriptor,
        _text: &StyledText,
        _start: usize,
        _end: usize,
        _scale: i32,
    ) -> LineBox {
        LineBox {
            ascent: self.line_height * 3 / 4,
            height: self.line_height,
        }
    }

    fn ellipsis_width(&self, _font: &FontDescriptor, _scale: i32) -> f32 {
        self.char_width as f32
    }

    fn shape(
        &self,
        font: &FontDescriptor,
        text: StyledText,
        scale: i32,
        wrap_width: Option<i32>,
        max_height: Option<i32>,
    ) -> TextLayout {
        let Some(&(width, height)) = self.sizes.get(&text.text) else {
            return compose_layout(self, font, text, scale, wrap_width, max_height);
        };
        let line = LayoutLine {
            start: 0,
            end: text.text.len(),
            top: 0,
            width,
            ascent: height * 3 / 4,
            height,
            ellipsized: false,
        };
        TextLayout {
            text,
            lines: vec![line],
            width,
            height,
            baseline: height * 3 / 4,
        }
    }

    /// Fills one solid box per line.
    fn draw(
        &self,
        _font: &FontDescriptor,
        layout: &TextLayout,
        canvas: &mut Canvas<'_>,
        origin: (i32, i32),
        color: Color,
        scale: i32,
    ) {
        for line in &layout.lines {
            canvas.fill_rect(
                Rect::new(
                    origin.0,
                    origin.1 + line.top * scale,
                    line.width * scale,
                    line.height * scale,
                ),
                color,
            );
        }
    }
}

/// A frame the engine handed to [`ScriptedHost::present`].
#[derive(Debug, Clone, PartialEq)]
pub struct PresentedFrame {
    pub buffer: BufferId,
    pub width: u32,
    pub height: u32,
    pub scale: i32,
    pub pixels: Vec<u32>,
}

/// Host that replays queued event batches and records every request.
#[derive(Debug)]
pub struct ScriptedHost {
    batches: VecDeque<Vec<HostEvent>>,
    releases: Vec<HostEvent>,
    auto_release: bool,
    fail_present: bool,
    idle_waits: usize,
    max_idle_waits: usize,
    pub size_requests: Vec<(u32, u32)>,
    pub exclusive_zones: Vec<u32>,
    pub acks: Vec<u32>,
    pub presented: Vec<PresentedFrame>,
    pub waits: usize,
}

impl Default for ScriptedHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedHost {
    pub fn new() -> Self {
        Self {
            batches: VecDeque::new(),
            releases: Vec::new(),
            auto_release: true,
            fail_present: false,
            idle_waits: 0,
            max_idle_waits: 200,
            size_requests: Vec::new(),
            exclusive_zones: Vec::new(),
            acks: Vec::new(),
            presented: Vec::new(),
            waits: 0,
        }
    }

    /// Queues one batch returned by a single `wait`.
    pub fn push(&mut self, batch: Vec<HostEvent>) -> &mut Self {
        self.batches.push_back(batch);
        self
    }

    /// Keeps presented buffers busy until the script releases them.
    pub fn hold_buffers(mut self) -> Self {
        self.auto_release = false;
        self
    }

    pub fn failing_present(mut self) -> Self {
        self.fail_present = true;
        self
    }

    /// Takes the releases a `wait` would deliver, for tests that feed
    /// events to the engine directly.
    pub fn drain_releases(&mut self) -> Vec<HostEvent> {
        self.releases.drain(..).collect()
    }

    pub fn last_request(&self) -> Option<(u32, u32)> {
        self.size_requests.last().copied()
    }

    pub fn last_frame(&self) -> Option<&PresentedFrame> {
        self.presented.last()
    }
}

impl SurfaceProtocol for ScriptedHost {
    fn request_size(&mut self, width: u32, height: u32) {
        self.size_requests.push((width, height));
    }

    fn request_exclusive_zone(&mut self, height: u32) {
        self.exclusive_zones.push(height);
    }

    fn ack_configure(&mut self, serial: u32) {
        self.acks.push(serial);
    }

    fn present(&mut self, frame: Frame<'_>) -> Result<()> {
        if self.fail_present {
            bail!("presentation refused");
        }
        self.presented.push(PresentedFrame {
            buffer: frame.buffer,
            width: frame.width,
            height: frame.height,
            scale: frame.scale,
            pixels: frame.pixels.to_vec(),
        });
        if self.auto_release {
            self.releases.push(HostEvent::BufferReleased(frame.buffer));
        }
        Ok(())
    }
}

impl EventSource for ScriptedHost {
    /// Returns pending releases plus the next batch. Once the script runs
    /// dry it idles for at most a few milliseconds per call and eventually
    /// reports the surface as closed.
    fn wait(&mut self, timeout: Option<Duration>) -> Result<Vec<HostEvent>> {
        self.waits += 1;
        let mut events: Vec<HostEvent> = self.releases.drain(..).collect();
        match self.batches.pop_front() {
            Some(batch) => events.extend(batch),
            None if events.is_empty() => {
                self.idle_waits += 1;
                if self.idle_waits > self.max_idle_waits {
                    return Ok(vec![HostEvent::Closed]);
                }
                let nap = timeout.unwrap_or(Duration::ZERO).min(Duration::from_millis(5));
                std::thread::sleep(nap);
            }
            None => {}
        }
        Ok(events)
    }
}

/// Records commands instead of running them.
#[derive(Debug, Clone)]
pub struct RecordingExecutor {
    pub calls: Vec<(String, bool)>,
    pub succeed: bool,
}

impl Default for RecordingExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            succeed: true,
        }
    }

    pub fn failing() -> Self {
        Self {
            succeed: false,
            ..Self::new()
        }
    }
}

impl ActionExecutor for RecordingExecutor {
    fn execute(&mut self, command: &str, run_in_terminal: bool) -> bool {
        self.calls.push((command.to_string(), run_in_terminal));
        self.succeed
    }
}
