use labnag::content::ContentModel;
use labnag::host::{HostEvent, PointerEvent};
use labnag::layout::{LayoutEngine, MAX_SURFACE_HEIGHT};
use labnag::testkit::{MonospaceEngine, RecordingExecutor, ScriptedHost};
use labnag::text::TextMetrics;
use labnag::{Nagbar, Outcome};
use style_model::{FontDescriptor, StyleConfig};

const WIDTH: u32 = 800;

/// Fifty short lines at 40 px each; ten of them fit under the height cap.
fn fifty_line_nagbar() -> Nagbar {
    let text = (1..=50)
        .map(|i| format!("entry {i}"))
        .collect::<Vec<_>>()
        .join("\n");
    let mut content = ContentModel::new("msg", "X", Vec::new(), Some(("More".into(), text)));
    content.toggle_details();
    Nagbar::new(
        StyleConfig::default(),
        content,
        Box::new(MonospaceEngine::new(10, 40)),
        false,
    )
}

fn release_buffers(bar: &mut Nagbar, host: &mut ScriptedHost, exec: &mut RecordingExecutor) {
    for event in host.drain_releases() {
        bar.handle_event(event, host, exec);
    }
}

fn configure(bar: &mut Nagbar, host: &mut ScriptedHost, exec: &mut RecordingExecutor) {
    bar.render_frame(host);
    let mut serial = 1;
    while let Some((_, height)) = host.last_request() {
        if bar.negotiator().granted() == (WIDTH, height) {
            break;
        }
        release_buffers(bar, host, exec);
        bar.handle_event(
            HostEvent::Configure {
                width: WIDTH,
                height,
                serial,
            },
            host,
            exec,
        );
        serial += 1;
    }
}

fn point(bar: &mut Nagbar, host: &mut ScriptedHost, exec: &mut RecordingExecutor, x: i32, y: i32) {
    release_buffers(bar, host, exec);
    let motion = PointerEvent::Motion {
        x: f64::from(x),
        y: f64::from(y),
    };
    bar.handle_event(HostEvent::Pointer(motion), host, exec);
}

fn press(bar: &mut Nagbar, host: &mut ScriptedHost, exec: &mut RecordingExecutor) {
    release_buffers(bar, host, exec);
    let press = PointerEvent::Button {
        pressed: true,
        serial: 1,
    };
    bar.handle_event(HostEvent::Pointer(press), host, exec);
}

#[test]
fn fifty_lines_page_ten_at_a_time() {
    let mut bar = fifty_line_nagbar();
    let mut host = ScriptedHost::new();
    let mut exec = RecordingExecutor::new();
    configure(&mut bar, &mut host, &mut exec);

    let panel = bar.content().details.clone().unwrap();
    assert_eq!(panel.total_lines, 50);
    assert_eq!(panel.visible_lines, 10);
    assert_eq!(panel.offset, 0);
    assert!(bar.negotiator().granted().1 <= MAX_SURFACE_HEIGHT as u32 + 2);

    let style = StyleConfig::default();
    let engine = MonospaceEngine::new(10, 40);
    let font = FontDescriptor::default();
    let column = LayoutEngine::new(&style, TextMetrics::new(&engine, &font, 1)).scroll_column_width();
    let decor = style.message_padding + style.details_border_thickness;
    assert_eq!(panel.bounds.width, WIDTH as i32 - decor * 2 - column);
}

#[test]
fn scroll_down_button_advances_one_line() {
    let mut bar = fifty_line_nagbar();
    let mut host = ScriptedHost::new();
    let mut exec = RecordingExecutor::new();
    configure(&mut bar, &mut host, &mut exec);
    let frames = host.presented.len();

    let down = bar.content().details.as_ref().unwrap().scroll_down.bounds;
    assert!(!down.is_empty());
    point(&mut bar, &mut host, &mut exec, down.x + 1, down.y + 1);
    press(&mut bar, &mut host, &mut exec);

    let panel = bar.content().details.as_ref().unwrap();
    assert_eq!(panel.offset, 1);
    assert!(panel.scrollable);
    assert_eq!(panel.total_lines, 50);
    assert!(panel.can_scroll_up());
    assert_eq!(host.presented.len(), frames + 1);
    assert!(exec.calls.is_empty());
    assert_eq!(bar.outcome(), Outcome::NoSelection);
}

#[test]
fn wheel_scrolls_only_over_the_panel() {
    let mut bar = fifty_line_nagbar();
    let mut host = ScriptedHost::new();
    let mut exec = RecordingExecutor::new();
    configure(&mut bar, &mut host, &mut exec);
    let bounds = bar.content().details.as_ref().unwrap().bounds;

    point(&mut bar, &mut host, &mut exec, 2, 2);
    bar.handle_event(HostEvent::Pointer(PointerEvent::Axis { delta: 15.0 }), &mut host, &mut exec);
    assert_eq!(bar.content().details.as_ref().unwrap().offset, 0);

    point(&mut bar, &mut host, &mut exec, bounds.x + 5, bounds.y + 5);
    for _ in 0..100 {
        bar.handle_event(HostEvent::Pointer(PointerEvent::Axis { delta: 15.0 }), &mut host, &mut exec);
    }
    assert_eq!(bar.content().details.as_ref().unwrap().offset, 40);

    bar.handle_event(HostEvent::Pointer(PointerEvent::Axis { delta: -15.0 }), &mut host, &mut exec);
    assert_eq!(bar.content().details.as_ref().unwrap().offset, 39);
}

#[test]
fn toggle_button_hides_details_and_keeps_offset() {
    let mut bar = fifty_line_nagbar();
    let mut host = ScriptedHost::new();
    let mut exec = RecordingExecutor::new();
    configure(&mut bar, &mut host, &mut exec);
    let bounds = bar.content().details.as_ref().unwrap().bounds;
    point(&mut bar, &mut host, &mut exec, bounds.x + 5, bounds.y + 5);
    for _ in 0..3 {
        bar.handle_event(HostEvent::Pointer(PointerEvent::Axis { delta: 1.0 }), &mut host, &mut exec);
    }

    let toggle = bar.content().buttons.len() - 1;
    let at = bar.content().buttons[toggle].bounds;
    point(&mut bar, &mut host, &mut exec, at.x + 1, at.y + 1);
    press(&mut bar, &mut host, &mut exec);
    assert!(!bar.content().details_visible());
    assert_eq!(bar.content().details.as_ref().unwrap().offset, 3);
    assert_eq!(bar.outcome(), Outcome::Selected(toggle));
}
