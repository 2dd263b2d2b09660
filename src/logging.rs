use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("labnag={level},winit=warn,softbuffer=warn"))
    })
}

/// Installs the global subscriber. Later calls are ignored.
///
/// `RUST_LOG` wins over `debug`; without it the crate logs at `info`, or at
/// `debug` when requested on the command line.
pub fn init(debug: bool) {
    INIT.call_once(|| {
        let filter = filter_for(if debug { "debug" } else { "info" });
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_level(true)
            .with_writer(std::io::stderr)
            .init();
    });
}
