//! The notification strip: content, negotiated size, buffers and input,
//! driven one host event at a time.

use style_model::StyleConfig;
use tracing::{debug, info, warn};

use crate::buffer::BufferPool;
use crate::content::{ActionKind, ContentModel};
use crate::exec::ActionExecutor;
use crate::host::{Frame, HostEvent, SurfaceProtocol};
use crate::input::{InputAction, InputRouter};
use crate::layout::{FrameLayout, LayoutEngine};
use crate::negotiate::{SizeDecision, SizeNegotiator};
use crate::render::canvas::Canvas;
use crate::render::{FrameRenderer, Recording};
use crate::text::{TextEngine, TextMetrics};

/// How the bar ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Index of the last activated button.
    Selected(usize),
    /// Closed by the host or the timer before any button was used.
    NoSelection,
    /// Interrupted by a signal.
    Failed,
}

impl Outcome {
    pub fn exit_code(self) -> u8 {
        match self {
            Outcome::Selected(index) => u8::try_from(index).unwrap_or(u8::MAX),
            Outcome::NoSelection => 0,
            Outcome::Failed => u8::MAX,
        }
    }
}

pub struct Nagbar {
    style: StyleConfig,
    content: ContentModel,
    engine: Box<dyn TextEngine>,
    negotiator: SizeNegotiator,
    pool: BufferPool,
    router: InputRouter,
    exclusive_zone: bool,
    running: bool,
    selected: Option<usize>,
    frames_presented: usize,
}

impl Nagbar {
    pub fn new(
        style: StyleConfig,
        content: ContentModel,
        engine: Box<dyn TextEngine>,
        exclusive_zone: bool,
    ) -> Self {
        Self {
            style,
            content,
            engine,
            negotiator: SizeNegotiator::new(),
            pool: BufferPool::new(),
            router: InputRouter::new(),
            exclusive_zone,
            running: true,
            selected: None,
            frames_presented: 0,
        }
    }

    pub fn style(&self) -> &StyleConfig {
        &self.style
    }

    pub fn content(&self) -> &ContentModel {
        &self.content
    }

    pub fn content_mut(&mut self) -> &mut ContentModel {
        &mut self.content
    }

    pub fn negotiator(&self) -> &SizeNegotiator {
        &self.negotiator
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    pub fn frames_presented(&self) -> usize {
        self.frames_presented
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn dismiss(&mut self) {
        self.running = false;
    }

    pub fn outcome(&self) -> Outcome {
        self.selected.map_or(Outcome::NoSelection, Outcome::Selected)
    }

    /// Lays out the content at the granted size without touching the host.
    pub fn layout(&mut self) -> FrameLayout {
        let (width, height) = self.negotiator.granted();
        let metrics = TextMetrics::new(self.engine.as_ref(), &self.style.font, self.negotiator.scale());
        LayoutEngine::new(&self.style, metrics).compute(&mut self.content, width as i32, height as i32)
    }

    /// Runs a layout pass and either asks the host for a new height or
    /// paints at the current grant.
    pub fn render_frame(&mut self, surface: &mut dyn SurfaceProtocol) {
        let frame = self.layout();
        let required = frame.required_height.max(0) as u32;
        match self.negotiator.decide(required) {
            SizeDecision::Request { height } => {
                debug!(height, "requesting surface height");
                surface.request_size(0, height);
                if self.exclusive_zone {
                    surface.request_exclusive_zone(height);
                }
            }
            SizeDecision::Wait => debug!(required, "height request outstanding"),
            SizeDecision::Paint {
                width,
                height,
                scale,
            } => {
                let recording = FrameRenderer::new(&self.style).record(&frame);
                self.paint(surface, &recording, width, height, scale);
            }
        }
    }

    fn paint(
        &mut self,
        surface: &mut dyn SurfaceProtocol,
        recording: &Recording,
        width: u32,
        height: u32,
        scale: i32,
    ) {
        let device_width = width.saturating_mul(scale as u32);
        let device_height = height.saturating_mul(scale as u32);
        let buffer = match self.pool.acquire(device_width, device_height) {
            Ok(buffer) => buffer,
            Err(err) => {
                warn!(error = %err, width = device_width, height = device_height, "skipping frame");
                return;
            }
        };
        let id = buffer.id;
        let painted = match Canvas::new(buffer.pixels, device_width, device_height) {
            Some(mut canvas) => {
                recording.replay(&mut canvas, self.engine.as_ref(), &self.style.font, scale);
                true
            }
            None => false,
        };
        if !painted {
            warn!(width = device_width, height = device_height, "buffer too small, skipping frame");
            self.pool.release(id);
            return;
        }

        let Some(pixels) = self.pool.pixels(id) else {
            return;
        };
        let frame = Frame {
            buffer: id,
            pixels,
            width: device_width,
            height: device_height,
            scale,
        };
        match surface.present(frame) {
            Ok(()) => {
                self.frames_presented += 1;
                debug!(buffer = id.0, width, height, scale, "frame presented");
            }
            Err(err) => {
                warn!(error = ?err, "failed to present frame");
                self.pool.release(id);
            }
        }
    }

    pub fn handle_event(
        &mut self,
        event: HostEvent,
        surface: &mut dyn SurfaceProtocol,
        executor: &mut dyn ActionExecutor,
    ) {
        match event {
            HostEvent::Configure {
                width,
                height,
                serial,
            } => {
                self.negotiator.on_configure(width, height, serial);
                surface.ack_configure(serial);
                self.render_frame(surface);
            }
            HostEvent::Closed => {
                info!("surface closed by the host");
                self.running = false;
            }
            HostEvent::OutputRemoved => {
                info!("output removed");
                self.running = false;
            }
            HostEvent::ScaleChanged(scale) => {
                if self.negotiator.on_scale(scale) {
                    debug!(scale, "output scale changed");
                    self.render_frame(surface);
                }
            }
            HostEvent::BufferReleased(id) => self.pool.release(id),
            HostEvent::Pointer(pointer) => match self.router.handle(&pointer, &mut self.content) {
                InputAction::None => {}
                InputAction::Scrolled => self.render_frame(surface),
                InputAction::Activate(index) => self.activate(index, surface, executor),
            },
        }
    }

    /// Performs the action of the button at `index`.
    pub fn activate(
        &mut self,
        index: usize,
        surface: &mut dyn SurfaceProtocol,
        executor: &mut dyn ActionExecutor,
    ) {
        let Some(button) = self.content.buttons.get(index) else {
            return;
        };
        debug!(index, label = %button.label, kind = ?button.kind, "button activated");
        self.selected = Some(index);
        match button.kind {
            ActionKind::Dismiss => self.dismiss(),
            ActionKind::ToggleDetails => {
                self.content.toggle_details();
                self.render_frame(surface);
            }
            ActionKind::RunCommand => {
                let dismiss = button.dismiss_on_activate;
                if let Some(command) = button.command.clone() {
                    if !executor.execute(&command, button.run_in_terminal) {
                        warn!(index, command, "button command did not start");
                    }
                }
                if dismiss {
                    self.dismiss();
                }
            }
            ActionKind::ScrollUp | ActionKind::ScrollDown => {
                let delta = if button.kind == ActionKind::ScrollUp { -1 } else { 1 };
                if let Some(panel) = self.content.details.as_mut() {
                    if panel.scroll_by(delta) {
                        self.render_frame(surface);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Button;
    use crate::host::PointerEvent;
    use crate::testkit::{MonospaceEngine, RecordingExecutor, ScriptedHost};

    fn nagbar(extra: Vec<Button>) -> Nagbar {
        let content = ContentModel::new("Hello", "X", extra, Some(("More".into(), "a\nb\nc".into())));
        Nagbar::new(
            StyleConfig::default(),
            content,
            Box::new(MonospaceEngine::new(10, 16)),
            true,
        )
    }

    fn click(nagbar: &mut Nagbar, index: usize, host: &mut ScriptedHost, exec: &mut RecordingExecutor) {
        let bounds = nagbar.content().buttons[index].bounds;
        let at = PointerEvent::Motion {
            x: f64::from(bounds.x) + 1.0,
            y: f64::from(bounds.y) + 1.0,
        };
        nagbar.handle_event(HostEvent::Pointer(at), host, exec);
        let press = PointerEvent::Button {
            pressed: true,
            serial: 9,
        };
        nagbar.handle_event(HostEvent::Pointer(press), host, exec);
    }

    /// Answers height requests until the bar paints.
    fn settle(nagbar: &mut Nagbar, host: &mut ScriptedHost, exec: &mut RecordingExecutor) {
        nagbar.render_frame(host);
        let mut serial = 0;
        while let Some((_, height)) = host.last_request() {
            if nagbar.negotiator().granted().1 == height {
                break;
            }
            serial += 1;
            for event in host.drain_releases() {
                nagbar.handle_event(event, host, exec);
            }
            nagbar.handle_event(
                HostEvent::Configure {
                    width: 800,
                    height,
                    serial,
                },
                host,
                exec,
            );
        }
    }

    #[test]
    fn first_render_requests_then_paints_after_configure() {
        let mut bar = nagbar(Vec::new());
        let mut host = ScriptedHost::new();
        let mut exec = RecordingExecutor::new();

        bar.render_frame(&mut host);
        assert!(host.presented.is_empty());
        let (width, height) = host.last_request().unwrap();
        assert_eq!(width, 0);
        assert_eq!(host.exclusive_zones, vec![height]);

        settle(&mut bar, &mut host, &mut exec);
        assert_eq!(host.acks.first(), Some(&1));
        let granted = bar.negotiator().granted();
        let frame = host.last_frame().unwrap();
        assert_eq!((frame.width, frame.height), granted);
        assert_eq!(bar.frames_presented(), 1);
    }

    #[test]
    fn toggling_details_grows_the_bar() {
        let mut bar = nagbar(Vec::new());
        let mut host = ScriptedHost::new();
        let mut exec = RecordingExecutor::new();
        settle(&mut bar, &mut host, &mut exec);
        let (_, collapsed) = host.last_request().unwrap();

        let toggle = bar.content().buttons.len() - 1;
        click(&mut bar, toggle, &mut host, &mut exec);
        assert!(bar.content().details_visible());
        let (_, expanded) = host.last_request().unwrap();
        assert!(expanded > collapsed);
        assert!(bar.is_running());
        assert_eq!(bar.outcome(), Outcome::Selected(toggle));
    }

    #[test]
    fn dismiss_button_stops_the_bar() {
        let mut bar = nagbar(Vec::new());
        let mut host = ScriptedHost::new();
        let mut exec = RecordingExecutor::new();
        settle(&mut bar, &mut host, &mut exec);

        click(&mut bar, 0, &mut host, &mut exec);
        assert!(!bar.is_running());
        assert_eq!(bar.outcome().exit_code(), 0);
    }

    #[test]
    fn command_buttons_run_and_optionally_dismiss() {
        let mut bar = nagbar(vec![
            Button::command("Keep", "echo keep", true, false),
            Button::command("Go", "echo go", false, true),
        ]);
        let mut host = ScriptedHost::new();
        let mut exec = RecordingExecutor::failing();
        settle(&mut bar, &mut host, &mut exec);

        click(&mut bar, 1, &mut host, &mut exec);
        assert!(bar.is_running());
        click(&mut bar, 2, &mut host, &mut exec);
        assert!(!bar.is_running());
        assert_eq!(
            exec.calls,
            vec![("echo keep".to_string(), true), ("echo go".to_string(), false)]
        );
        assert_eq!(bar.outcome(), Outcome::Selected(2));
        assert_eq!(bar.outcome().exit_code(), 2);
    }

    #[test]
    fn busy_buffers_skip_frames() {
        let mut bar = nagbar(Vec::new());
        let mut host = ScriptedHost::new().hold_buffers();
        let mut exec = RecordingExecutor::new();
        settle(&mut bar, &mut host, &mut exec);
        bar.render_frame(&mut host);
        bar.render_frame(&mut host);
        assert_eq!(host.presented.len(), 2);

        let released = host.presented[0].buffer;
        bar.handle_event(HostEvent::BufferReleased(released), &mut host, &mut exec);
        bar.render_frame(&mut host);
        assert_eq!(host.presented.len(), 3);
        assert_eq!(host.presented[2].buffer, released);
    }

    #[test]
    fn scale_change_repaints_at_device_size() {
        let mut bar = nagbar(Vec::new());
        let mut host = ScriptedHost::new();
        let mut exec = RecordingExecutor::new();
        settle(&mut bar, &mut host, &mut exec);
        let (_, height) = host.last_request().unwrap();

        bar.handle_event(HostEvent::ScaleChanged(2), &mut host, &mut exec);
        let frame = host.last_frame().unwrap();
        assert_eq!((frame.width, frame.height, frame.scale), (1600, height * 2, 2));
    }

    #[test]
    fn failed_present_returns_the_buffer() {
        let mut bar = nagbar(Vec::new());
        let mut host = ScriptedHost::new().failing_present();
        let mut exec = RecordingExecutor::new();
        settle(&mut bar, &mut host, &mut exec);
        assert_eq!(bar.frames_presented(), 0);
        assert!(!bar.pool().is_busy(crate::buffer::BufferId(0)));
    }

    #[test]
    fn exit_codes() {
        assert_eq!(Outcome::Selected(3).exit_code(), 3);
        assert_eq!(Outcome::Selected(700).exit_code(), 255);
        assert_eq!(Outcome::NoSelection.exit_code(), 0);
        assert_eq!(Outcome::Failed.exit_code(), 255);
    }
}
