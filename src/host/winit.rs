//! Desktop host: an undecorated `winit` window spanning one monitor edge,
//! presented through `softbuffer`.
//!
//! Window sizes are reported to the engine in logical pixels using an integer
//! scale (the monitor scale factor, rounded). Exclusive zones have no window
//! system equivalent here and are only logged. Window placement is best
//! effort: compositors that ignore client positioning keep their own.

use std::collections::VecDeque;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use softbuffer::{Context as SoftContext, Surface};
use style_model::{Edge, Layer, Placement};
use tracing::{debug, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::monitor::MonitorHandle;
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowId, WindowLevel};

use super::{EventSource, Frame, HostEvent, PointerEvent, SurfaceProtocol};
use crate::error::Error;

type WindowHandle = Arc<Window>;

pub struct WinitHost {
    app: HostApp,
    event_loop: EventLoop<()>,
}

impl WinitHost {
    /// Opens the window on the requested output. Fails before any UI is shown
    /// when the display, the output or the presentation surface is missing.
    pub fn new(placement: Placement) -> Result<Self, Error> {
        let mut event_loop = EventLoop::new().map_err(|err| Error::Setup(err.into()))?;
        let mut app = HostApp::new(placement);
        if let PumpStatus::Exit(code) =
            event_loop.pump_app_events(Some(Duration::from_millis(100)), &mut app)
        {
            return Err(Error::Setup(anyhow!("event loop exited during setup ({code})")));
        }
        if let Some(err) = app.setup_error.take() {
            return Err(err);
        }
        if app.window.is_none() {
            return Err(Error::Setup(anyhow!("window was not created")));
        }
        Ok(Self { app, event_loop })
    }
}

impl SurfaceProtocol for WinitHost {
    fn request_size(&mut self, width: u32, height: u32) {
        self.app.request_size(width, height);
    }

    fn request_exclusive_zone(&mut self, height: u32) {
        debug!(height, "exclusive zone is not supported by this host");
    }

    fn ack_configure(&mut self, serial: u32) {
        debug!(serial, "configure acknowledged");
    }

    fn present(&mut self, frame: Frame<'_>) -> Result<()> {
        let result = self.app.present(&frame);
        self.app.queue.push_back(HostEvent::BufferReleased(frame.buffer));
        result
    }
}

impl EventSource for WinitHost {
    fn wait(&mut self, timeout: Option<Duration>) -> Result<Vec<HostEvent>> {
        if self.app.queue.is_empty() {
            if let PumpStatus::Exit(code) = self.event_loop.pump_app_events(timeout, &mut self.app) {
                debug!(code, "event loop exited");
                self.app.queue.push_back(HostEvent::Closed);
            }
        }
        Ok(self.app.queue.drain(..).collect())
    }
}

struct HostApp {
    surface: Option<Surface<WindowHandle, WindowHandle>>,
    context: Option<SoftContext<WindowHandle>>,
    window: Option<WindowHandle>,
    monitor: Option<MonitorHandle>,
    placement: Placement,
    queue: VecDeque<HostEvent>,
    setup_error: Option<Error>,
    serial: u32,
    pointer_serial: u32,
    scale: i32,
    last_size: Option<PhysicalSize<u32>>,
}

impl HostApp {
    fn new(placement: Placement) -> Self {
        Self {
            surface: None,
            context: None,
            window: None,
            monitor: None,
            placement,
            queue: VecDeque::new(),
            setup_error: None,
            serial: 0,
            pointer_serial: 0,
            scale: 1,
            last_size: None,
        }
    }

    fn pick_monitor(&self, event_loop: &ActiveEventLoop) -> Result<MonitorHandle, Error> {
        match &self.placement.output {
            Some(name) => event_loop
                .available_monitors()
                .find(|monitor| monitor.name().as_deref() == Some(name.as_str()))
                .ok_or_else(|| Error::OutputNotFound(name.clone())),
            None => event_loop
                .primary_monitor()
                .or_else(|| event_loop.available_monitors().next())
                .ok_or_else(|| Error::Setup(anyhow!("no monitors available"))),
        }
    }

    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<(), Error> {
        let monitor = self.pick_monitor(event_loop)?;
        self.scale = scale_from(monitor.scale_factor());
        let level = match self.placement.layer {
            Layer::Overlay | Layer::Top => WindowLevel::AlwaysOnTop,
            Layer::Bottom | Layer::Background => WindowLevel::AlwaysOnBottom,
        };
        let initial = PhysicalSize::new(monitor.size().width.max(1), self.scale as u32);
        let attrs = Window::default_attributes()
            .with_title("labnag")
            .with_decorations(false)
            .with_resizable(false)
            .with_window_level(level)
            .with_inner_size(initial)
            .with_position(self.anchor(&monitor, initial.height));
        let window = event_loop
            .create_window(attrs)
            .map_err(|err| Error::Setup(anyhow!("failed to create window: {err}")))?;
        let window = WindowHandle::new(window);

        let context = SoftContext::new(window.clone())
            .map_err(|err| Error::Setup(anyhow!("failed to create softbuffer context: {err}")))?;
        let surface = Surface::new(&context, window.clone())
            .map_err(|err| Error::Setup(anyhow!("failed to create softbuffer surface: {err}")))?;

        info!(
            monitor = monitor.name().unwrap_or_default(),
            edge = %self.placement.edge,
            layer = %self.placement.layer,
            scale = self.scale,
            "window created"
        );
        self.context = Some(context);
        self.surface = Some(surface);
        self.monitor = Some(monitor);
        let size = window.inner_size();
        self.window = Some(window);
        self.configure(size);
        Ok(())
    }

    fn anchor(&self, monitor: &MonitorHandle, height: u32) -> PhysicalPosition<i32> {
        let origin = monitor.position();
        match self.placement.edge {
            Edge::Top => origin,
            Edge::Bottom => PhysicalPosition::new(
                origin.x,
                origin.y + monitor.size().height as i32 - height as i32,
            ),
        }
    }

    fn configure(&mut self, size: PhysicalSize<u32>) {
        self.last_size = Some(size);
        self.serial = self.serial.wrapping_add(1);
        let scale = self.scale as u32;
        self.queue.push_back(HostEvent::Configure {
            width: size.width / scale,
            height: size.height / scale,
            serial: self.serial,
        });
    }

    fn request_size(&mut self, width: u32, height: u32) {
        let (Some(window), Some(monitor)) = (self.window.clone(), self.monitor.clone()) else {
            return;
        };
        let scale = self.scale as u32;
        let width = if width == 0 {
            monitor.size().width
        } else {
            width * scale
        };
        let target = PhysicalSize::new(width.max(1), (height * scale).max(1));
        window.set_outer_position(self.anchor(&monitor, target.height));
        match window.request_inner_size(target) {
            Some(applied) => self.configure(applied),
            None if self.last_size == Some(target) => self.configure(target),
            None => debug!(width = target.width, height = target.height, "resize requested"),
        }
    }

    fn present(&mut self, frame: &Frame<'_>) -> Result<()> {
        let surface = self
            .surface
            .as_mut()
            .ok_or_else(|| anyhow!("presentation surface is gone"))?;
        let (Some(width), Some(height)) = (NonZeroU32::new(frame.width), NonZeroU32::new(frame.height))
        else {
            return Err(anyhow!("cannot present an empty frame"));
        };
        surface
            .resize(width, height)
            .map_err(|err| anyhow!("failed to resize surface: {err}"))?;
        let mut buffer = surface
            .buffer_mut()
            .map_err(|err| anyhow!("failed to map surface buffer: {err}"))?;
        for (dst, src) in buffer.iter_mut().zip(frame.pixels) {
            *dst = src & 0x00FF_FFFF;
        }
        buffer
            .present()
            .map_err(|err| anyhow!("failed to present frame: {err}"))
    }

    fn pointer(&mut self, event: PointerEvent) {
        self.queue.push_back(HostEvent::Pointer(event));
    }
}

fn scale_from(factor: f64) -> i32 {
    (factor.round() as i32).max(1)
}

impl ApplicationHandler for HostApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.setup_error.is_some() {
            return;
        }
        if let Err(err) = self.create_window(event_loop) {
            self.setup_error = Some(err);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        if window.id() != window_id {
            return;
        }
        let scale = f64::from(self.scale);
        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                self.queue.push_back(HostEvent::Closed);
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if self.last_size != Some(size) {
                    self.configure(size);
                }
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                let scale = scale_from(scale_factor);
                if scale != self.scale {
                    self.scale = scale;
                    self.queue.push_back(HostEvent::ScaleChanged(scale));
                }
            }
            WindowEvent::CursorMoved { position, .. } => self.pointer(PointerEvent::Motion {
                x: position.x / scale,
                y: position.y / scale,
            }),
            WindowEvent::CursorLeft { .. } => self.pointer(PointerEvent::Leave),
            WindowEvent::MouseInput { state, .. } => {
                self.pointer_serial = self.pointer_serial.wrapping_add(1);
                self.pointer(PointerEvent::Button {
                    pressed: state == ElementState::Pressed,
                    serial: self.pointer_serial,
                });
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let delta = match delta {
                    MouseScrollDelta::LineDelta(_, y) => -f64::from(y),
                    MouseScrollDelta::PixelDelta(position) => -position.y,
                };
                if delta != 0.0 {
                    self.pointer(PointerEvent::Axis { delta });
                }
            }
            WindowEvent::RedrawRequested => {}
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            warn!("window system shut down");
        }
    }
}
