//! Binary entrypoint for labnag.
//!
//! Delegates all logic to the library crate; no local modules here.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{CommandFactory, FromArgMatches};
use labnag::cli::Cli;
use labnag::exec::ShellExecutor;
use labnag::host::winit::WinitHost;
use labnag::text::glyph::GlyphEngine;
use labnag::{Nagbar, Outcome, logging, runner};
use tracing::{error, info};

const FAILURE: u8 = 255;

fn main() -> ExitCode {
    let matches = match Cli::command().try_get_matches() {
        Ok(matches) => matches,
        Err(err) => {
            let code = if err.use_stderr() { FAILURE } else { 0 };
            let _ = err.print();
            return ExitCode::from(code);
        }
    };
    let cli = match Cli::from_arg_matches(&matches) {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return ExitCode::from(FAILURE);
        }
    };
    logging::init(cli.debug);

    match try_main(cli, &matches) {
        Ok(outcome) => {
            info!(?outcome, "labnag finished");
            ExitCode::from(outcome.exit_code())
        }
        Err(err) => {
            error!(error = ?err, "labnag failed");
            ExitCode::from(FAILURE)
        }
    }
}

fn try_main(cli: Cli, matches: &clap::ArgMatches) -> Result<Outcome> {
    let options = cli
        .into_options(matches, std::io::stdin().lock())
        .context("invalid arguments")?;
    let terminate = runner::install_termination_handler()?;

    let engine = GlyphEngine::load(&options.style.font).context("loading font")?;
    let mut host = WinitHost::new(options.placement.clone()).context("opening the bar")?;
    let mut nagbar = Nagbar::new(
        options.style,
        options.content,
        Box::new(engine),
        options.exclusive_zone,
    );
    let mut executor = ShellExecutor::from_env();

    runner::run(&mut nagbar, &mut host, &mut executor, &options.run, terminate)
}
