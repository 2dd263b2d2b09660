use labnag::buffer::{BufferError, BufferPool};
use labnag::content::ContentModel;
use labnag::host::HostEvent;
use labnag::testkit::{MonospaceEngine, RecordingExecutor, ScriptedHost};
use labnag::Nagbar;
use style_model::StyleConfig;

fn wrapping_nagbar() -> Nagbar {
    let details = vec!["word"; 100].join(" ");
    let mut content = ContentModel::new("msg", "X", Vec::new(), Some(("More".into(), details)));
    content.toggle_details();
    Nagbar::new(
        StyleConfig::default(),
        content,
        Box::new(MonospaceEngine::new(10, 16)),
        false,
    )
}

/// Hands buffers the host is done with back to the pool.
fn release_buffers(bar: &mut Nagbar, host: &mut ScriptedHost, exec: &mut RecordingExecutor) {
    for event in host.drain_releases() {
        bar.handle_event(event, host, exec);
    }
}

/// Grants every height request at `width` until the bar paints without
/// asking again. Returns the next free serial.
fn settle(
    bar: &mut Nagbar,
    host: &mut ScriptedHost,
    exec: &mut RecordingExecutor,
    width: u32,
    mut serial: u32,
) -> u32 {
    while let Some((_, height)) = host.last_request() {
        if bar.negotiator().granted() == (width, height) {
            break;
        }
        release_buffers(bar, host, exec);
        bar.handle_event(
            HostEvent::Configure {
                width,
                height,
                serial,
            },
            host,
            exec,
        );
        serial += 1;
    }
    serial
}

#[test]
fn narrower_grant_relayouts_before_painting() {
    let mut bar = wrapping_nagbar();
    let mut host = ScriptedHost::new();
    let mut exec = RecordingExecutor::new();

    bar.render_frame(&mut host);
    let serial = settle(&mut bar, &mut host, &mut exec, 800, 1);
    let wide = bar.negotiator().granted();
    let painted = host.presented.len();
    assert!(painted >= 1);
    assert_eq!(
        (host.presented[painted - 1].width, host.presented[painted - 1].height),
        wide
    );

    release_buffers(&mut bar, &mut host, &mut exec);
    bar.handle_event(
        HostEvent::Configure {
            width: 300,
            height: wide.1,
            serial,
        },
        &mut host,
        &mut exec,
    );
    assert_eq!(host.presented.len(), painted, "painted at a stale height");
    let (_, requested) = host.last_request().unwrap();
    assert!(requested > wide.1);

    settle(&mut bar, &mut host, &mut exec, 300, serial + 1);
    let narrow = bar.negotiator().granted();
    let frame = host.last_frame().unwrap();
    assert_eq!((frame.width, frame.height), narrow);
    assert!(narrow.1 > wide.1);
    for frame in &host.presented {
        assert!(
            (frame.width, frame.height) == wide || (frame.width, frame.height) == narrow,
            "unexpected frame {}x{}",
            frame.width,
            frame.height
        );
    }
}

#[test]
fn repeated_renders_do_not_repeat_requests() {
    let mut bar = wrapping_nagbar();
    let mut host = ScriptedHost::new();

    bar.render_frame(&mut host);
    bar.render_frame(&mut host);
    bar.render_frame(&mut host);
    assert_eq!(host.size_requests.len(), 1);
    assert!(host.presented.is_empty());
}

#[test]
fn every_commit_matches_the_acknowledged_grant() {
    let mut bar = wrapping_nagbar();
    let mut host = ScriptedHost::new();
    let mut exec = RecordingExecutor::new();
    bar.render_frame(&mut host);

    let mut serial = 1;
    for width in [800, 640, 1024, 300, 300, 1200] {
        if let Some((_, height)) = host.last_request() {
            release_buffers(&mut bar, &mut host, &mut exec);
            let before = host.presented.len();
            bar.handle_event(
                HostEvent::Configure {
                    width,
                    height,
                    serial,
                },
                &mut host,
                &mut exec,
            );
            serial += 1;
            if host.presented.len() > before {
                let frame = host.last_frame().unwrap();
                assert_eq!((frame.width, frame.height), (width, height));
            }
        }
        serial = settle(&mut bar, &mut host, &mut exec, width, serial);
        let frame = host.last_frame().unwrap();
        assert_eq!((frame.width, frame.height), bar.negotiator().granted());
    }
    assert_eq!(host.acks.len() as u32, serial - 1);
    assert!(host.presented.len() >= 6);
}

#[test]
fn held_buffers_skip_the_paint_for_a_new_grant() {
    let mut bar = wrapping_nagbar();
    let mut host = ScriptedHost::new().hold_buffers();
    let mut exec = RecordingExecutor::new();
    bar.render_frame(&mut host);
    let mut serial = settle(&mut bar, &mut host, &mut exec, 800, 1);
    bar.render_frame(&mut host);
    assert_eq!(host.presented.len(), 2);

    let (_, height) = host.last_request().unwrap();
    bar.handle_event(
        HostEvent::Configure {
            width: 800,
            height,
            serial,
        },
        &mut host,
        &mut exec,
    );
    serial += 1;
    assert_eq!(host.presented.len(), 2);
    assert_eq!(host.acks.len() as u32, serial - 1);

    let first = host.presented[0].buffer;
    bar.handle_event(HostEvent::BufferReleased(first), &mut host, &mut exec);
    bar.render_frame(&mut host);
    assert_eq!(host.presented.len(), 3);
    assert_eq!(host.last_frame().unwrap().buffer, first);
}

#[test]
fn same_size_reuses_and_new_size_reallocates() {
    let mut pool = BufferPool::new();
    let first = pool.acquire(64, 8).unwrap().id;
    let generation = pool.generation(first);
    pool.release(first);

    let again = pool.acquire(64, 8).unwrap().id;
    assert_eq!(again, first);
    assert_eq!(pool.generation(again), generation);
    pool.release(again);

    let resized = pool.acquire(32, 8).unwrap().id;
    assert!(pool.generation(resized) > generation);
    assert_eq!(pool.dimensions(resized), Some((32, 8)));

    let other = pool.acquire(32, 8).unwrap().id;
    assert_ne!(other, resized);
    assert!(matches!(pool.acquire(32, 8), Err(BufferError::AllBusy)));
}
