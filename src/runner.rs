//! Event loop: one blocking wait on the host, the auto-dismiss deadline and
//! the termination flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use nix::libc::c_int;
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use tracing::{debug, info};

use crate::exec::ActionExecutor;
use crate::host::{EventSource, SurfaceProtocol};
use crate::nag::{Nagbar, Outcome};

/// Longest single wait, so a termination signal is noticed promptly.
pub const SIGNAL_POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// `None` keeps the bar until it is dismissed.
    pub close_timeout: Option<Duration>,
    /// Disarm the timer on the first host event of any kind.
    pub close_timeout_cancel: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            close_timeout: Some(Duration::from_secs(5)),
            close_timeout_cancel: true,
        }
    }
}

/// Drives `nagbar` until it is dismissed, the host goes away, the timer
/// fires or `terminate` is raised.
pub fn run<H>(
    nagbar: &mut Nagbar,
    host: &mut H,
    executor: &mut dyn ActionExecutor,
    options: &RunOptions,
    terminate: &AtomicBool,
) -> Result<Outcome>
where
    H: SurfaceProtocol + EventSource,
{
    let mut deadline = options.close_timeout.map(|timeout| Instant::now() + timeout);
    nagbar.render_frame(host);

    while nagbar.is_running() {
        if terminate.load(Ordering::SeqCst) {
            info!("termination requested");
            return Ok(Outcome::Failed);
        }
        executor.reap();

        let now = Instant::now();
        let wait = match deadline {
            Some(at) if at <= now => {
                info!("close timeout expired");
                nagbar.dismiss();
                break;
            }
            Some(at) => (at - now).min(SIGNAL_POLL_INTERVAL),
            None => SIGNAL_POLL_INTERVAL,
        };

        let events = host.wait(Some(wait)).context("failed to read host events")?;
        for event in events {
            if options.close_timeout_cancel && deadline.is_some() {
                debug!(?event, "host activity, close timeout cancelled");
                deadline = None;
            }
            nagbar.handle_event(event, host, executor);
            if !nagbar.is_running() {
                break;
            }
        }
    }

    if terminate.load(Ordering::SeqCst) {
        return Ok(Outcome::Failed);
    }
    Ok(nagbar.outcome())
}

static TERMINATE: AtomicBool = AtomicBool::new(false);

extern "C" fn on_terminate(_signal: c_int) {
    TERMINATE.store(true, Ordering::SeqCst);
}

/// Routes SIGTERM and SIGINT to a flag the run loop polls.
pub fn install_termination_handler() -> Result<&'static AtomicBool> {
    let action = SigAction::new(
        SigHandler::Handler(on_terminate),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    for signal in [Signal::SIGTERM, Signal::SIGINT] {
        // SAFETY: the handler only stores to an atomic.
        unsafe { sigaction(signal, &action) }
            .with_context(|| format!("failed to install {signal:?} handler"))?;
    }
    Ok(&TERMINATE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentModel;
    use crate::host::{HostEvent, PointerEvent};
    use crate::testkit::{MonospaceEngine, RecordingExecutor, ScriptedHost};
    use style_model::StyleConfig;

    fn nagbar() -> Nagbar {
        Nagbar::new(
            StyleConfig::default(),
            ContentModel::new("Hello", "X", Vec::new(), None),
            Box::new(MonospaceEngine::new(10, 16)),
            false,
        )
    }

    fn no_timeout() -> RunOptions {
        RunOptions {
            close_timeout: None,
            close_timeout_cancel: true,
        }
    }

    #[test]
    fn host_close_ends_without_selection() {
        let mut bar = nagbar();
        let mut host = ScriptedHost::new();
        host.push(vec![HostEvent::Configure {
            width: 640,
            height: 40,
            serial: 1,
        }])
        .push(vec![HostEvent::Closed]);
        let mut exec = RecordingExecutor::new();
        let flag = AtomicBool::new(false);

        let outcome = run(&mut bar, &mut host, &mut exec, &no_timeout(), &flag).unwrap();
        assert_eq!(outcome, Outcome::NoSelection);
        assert_eq!(host.acks, vec![1]);
    }

    #[test]
    fn raised_flag_fails_the_run() {
        let mut bar = nagbar();
        let mut host = ScriptedHost::new();
        let mut exec = RecordingExecutor::new();
        let flag = AtomicBool::new(true);

        let outcome = run(&mut bar, &mut host, &mut exec, &no_timeout(), &flag).unwrap();
        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(outcome.exit_code(), 255);
    }

    #[test]
    fn timer_dismisses_the_bar() {
        let mut bar = nagbar();
        let mut host = ScriptedHost::new();
        let mut exec = RecordingExecutor::new();
        let flag = AtomicBool::new(false);
        let options = RunOptions {
            close_timeout: Some(Duration::from_millis(30)),
            close_timeout_cancel: true,
        };

        let started = Instant::now();
        let outcome = run(&mut bar, &mut host, &mut exec, &options, &flag).unwrap();
        assert_eq!(outcome, Outcome::NoSelection);
        assert!(started.elapsed() >= Duration::from_millis(30));
        assert!(!bar.is_running());
    }

    #[test]
    fn pointer_activity_cancels_the_timer() {
        let mut bar = nagbar();
        let mut host = ScriptedHost::new();
        host.push(vec![HostEvent::Pointer(PointerEvent::Enter { x: 1.0, y: 1.0 })]);
        let mut exec = RecordingExecutor::new();
        let flag = AtomicBool::new(false);
        let options = RunOptions {
            close_timeout: Some(Duration::from_millis(50)),
            close_timeout_cancel: true,
        };

        let outcome = run(&mut bar, &mut host, &mut exec, &options, &flag).unwrap();
        assert_eq!(outcome, Outcome::NoSelection);
        // Only the idle limit of the scripted host ends the run.
        assert!(host.waits > 100);
    }

    #[test]
    fn configure_cancels_the_timer() {
        let mut bar = nagbar();
        let mut host = ScriptedHost::new();
        host.push(vec![HostEvent::Configure {
            width: 640,
            height: 40,
            serial: 1,
        }]);
        let mut exec = RecordingExecutor::new();
        let flag = AtomicBool::new(false);
        let options = RunOptions {
            close_timeout: Some(Duration::from_millis(20)),
            close_timeout_cancel: true,
        };

        let outcome = run(&mut bar, &mut host, &mut exec, &options, &flag).unwrap();
        assert_eq!(outcome, Outcome::NoSelection);
        assert_eq!(host.acks, vec![1]);
        assert!(host.waits > 100, "timer fired after {} waits", host.waits);
    }

    #[test]
    fn timer_survives_events_when_cancel_is_off() {
        let mut bar = nagbar();
        let mut host = ScriptedHost::new();
        host.push(vec![HostEvent::Configure {
            width: 640,
            height: 40,
            serial: 1,
        }])
        .push(vec![HostEvent::Pointer(PointerEvent::Enter { x: 1.0, y: 1.0 })]);
        let mut exec = RecordingExecutor::new();
        let flag = AtomicBool::new(false);
        let options = RunOptions {
            close_timeout: Some(Duration::from_millis(20)),
            close_timeout_cancel: false,
        };

        run(&mut bar, &mut host, &mut exec, &options, &flag).unwrap();
        assert!(host.waits < 100);
        assert!(!bar.is_running());
    }
}
