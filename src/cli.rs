//! Command-line surface.

use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, ArgMatches, Parser};
use style_model::{
    Color, DEFAULT_TYPE, Edge, FontDescriptor, Layer, Placement, StyleConfig, StyleOverrides,
};

use crate::config::FileConfig;
use crate::content::{Button, ContentModel, DEFAULT_DETAILS_LABEL, DEFAULT_DISMISS_LABEL};
use crate::error::Error;
use crate::runner::RunOptions;

const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Parser)]
#[command(name = "labnag", version, about = "Show a message bar with buttons")]
pub struct Cli {
    /// Message text (Pango-style markup allowed)
    #[arg(short = 'm', long, value_name = "TEXT")]
    pub message: Option<String>,

    /// Button that runs ACTION in a terminal
    #[arg(short = 'b', long, num_args = 2, value_names = ["TEXT", "ACTION"], action = ArgAction::Append)]
    pub button: Vec<String>,

    /// Like --button, without the terminal
    #[arg(short = 'B', long, num_args = 2, value_names = ["TEXT", "ACTION"], action = ArgAction::Append)]
    pub button_no_terminal: Vec<String>,

    /// Button that runs ACTION in a terminal and closes the bar
    #[arg(short = 'z', long, num_args = 2, value_names = ["TEXT", "ACTION"], action = ArgAction::Append)]
    pub button_dismiss: Vec<String>,

    /// Like --button-dismiss, without the terminal
    #[arg(short = 'Z', long, num_args = 2, value_names = ["TEXT", "ACTION"], action = ArgAction::Append)]
    pub button_dismiss_no_terminal: Vec<String>,

    /// Read a detailed message from stdin
    #[arg(short = 'l', long)]
    pub detailed_message: bool,

    /// Label of the details toggle
    #[arg(short = 'L', long, value_name = "TEXT")]
    pub detailed_button: Option<String>,

    /// Label of the dismiss button
    #[arg(short = 's', long, value_name = "TEXT")]
    pub dismiss_button: Option<String>,

    /// Screen edge: top or bottom
    #[arg(short = 'e', long)]
    pub edge: Option<Edge>,

    /// Stacking layer: overlay, top, bottom or background
    #[arg(short = 'y', long)]
    pub layer: Option<Layer>,

    /// Font as "Family Size"
    #[arg(short = 'f', long)]
    pub font: Option<FontDescriptor>,

    /// Output (monitor) name
    #[arg(short = 'o', long)]
    pub output: Option<String>,

    /// Close after this long: seconds or a duration like "1m 30s"; 0 disables
    #[arg(short = 't', long, value_name = "DURATION", value_parser = parse_timeout)]
    pub timeout: Option<Duration>,

    /// Reserve screen space for the bar
    #[arg(short = 'x', long)]
    pub exclusive_zone: bool,

    /// Message type: error, warning or one defined in the config file
    #[arg(long = "type", value_name = "TYPE")]
    pub message_type: Option<String>,

    /// Enable debug logging
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// YAML config file
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[arg(long, value_name = "RRGGBB[AA]")]
    pub background: Option<Color>,
    #[arg(long, value_name = "RRGGBB[AA]")]
    pub border: Option<Color>,
    #[arg(long, value_name = "RRGGBB[AA]")]
    pub border_bottom: Option<Color>,
    #[arg(long, value_name = "RRGGBB[AA]")]
    pub button_background: Option<Color>,
    #[arg(long, value_name = "RRGGBB[AA]")]
    pub text: Option<Color>,
    #[arg(long, value_name = "RRGGBB[AA]")]
    pub button_text: Option<Color>,
    #[arg(long, value_name = "RRGGBB[AA]")]
    pub details_background: Option<Color>,

    #[arg(long, value_name = "SIZE")]
    pub border_bottom_size: Option<i32>,
    #[arg(long, value_name = "PADDING")]
    pub message_padding: Option<i32>,
    #[arg(long, value_name = "SIZE")]
    pub details_border_size: Option<i32>,
    #[arg(long, value_name = "SIZE")]
    pub button_border_size: Option<i32>,
    #[arg(long, value_name = "GAP")]
    pub button_gap: Option<i32>,
    #[arg(long, value_name = "GAP")]
    pub button_dismiss_gap: Option<i32>,
    #[arg(long, value_name = "MARGIN")]
    pub button_margin_right: Option<i32>,
    #[arg(long, value_name = "PADDING")]
    pub button_padding: Option<i32>,
}

fn parse_timeout(raw: &str) -> Result<Duration, String> {
    if let Ok(seconds) = raw.trim().parse::<u64>() {
        return Ok(Duration::from_secs(seconds));
    }
    humantime::parse_duration(raw).map_err(|err| err.to_string())
}

/// Everything needed to bring up the bar.
#[derive(Debug, Clone)]
pub struct Options {
    pub content: ContentModel,
    pub style: StyleConfig,
    pub placement: Placement,
    pub run: RunOptions,
    pub exclusive_zone: bool,
}

impl Cli {
    fn style_overrides(&self) -> StyleOverrides {
        StyleOverrides {
            font: self.font.clone(),
            output: self.output.clone(),
            edge: self.edge,
            layer: self.layer,
            background: self.background,
            text: self.text,
            border: self.border,
            border_bottom: self.border_bottom,
            button_background: self.button_background,
            button_text: self.button_text,
            details_background: self.details_background,
            border_bottom_size: self.border_bottom_size,
            message_padding: self.message_padding,
            details_border_size: self.details_border_size,
            button_border_size: self.button_border_size,
            button_gap: self.button_gap,
            button_dismiss_gap: self.button_dismiss_gap,
            button_margin_right: self.button_margin_right,
            button_padding: self.button_padding,
        }
    }

    /// Resolves the parsed arguments against the config file. `matches` must
    /// come from the same parse; it supplies the relative order of buttons.
    /// `stdin` is only read for `--detailed-message`.
    pub fn into_options(self, matches: &ArgMatches, stdin: impl Read) -> Result<Options, Error> {
        let message = self.message.clone().ok_or(Error::MissingMessage)?;
        let file = match &self.config {
            Some(path) => FileConfig::from_yaml_file(path)?,
            None => FileConfig::default(),
        };
        let type_name = self.message_type.as_deref().unwrap_or(DEFAULT_TYPE);
        let (style, placement) = file.resolve_style(type_name, &self.style_overrides())?;

        let details = if self.detailed_message {
            let label = self
                .detailed_button
                .clone()
                .unwrap_or_else(|| DEFAULT_DETAILS_LABEL.to_string());
            Some((label, read_details(stdin)?))
        } else {
            None
        };
        let dismiss_label = self
            .dismiss_button
            .clone()
            .unwrap_or_else(|| DEFAULT_DISMISS_LABEL.to_string());
        let content = ContentModel::new(message, dismiss_label, ordered_buttons(matches)?, details);

        let close_timeout = self
            .timeout
            .or(file.close_timeout)
            .unwrap_or(DEFAULT_CLOSE_TIMEOUT);
        let run = RunOptions {
            close_timeout: (!close_timeout.is_zero()).then_some(close_timeout),
            close_timeout_cancel: file.close_timeout_cancel.unwrap_or(true),
        };

        Ok(Options {
            content,
            style,
            placement,
            run,
            exclusive_zone: self.exclusive_zone || file.exclusive_zone.unwrap_or(false),
        })
    }
}

fn read_details(mut stdin: impl Read) -> Result<String, Error> {
    let mut text = String::new();
    stdin.read_to_string(&mut text)?;
    Ok(text.trim_end_matches(['\n', '\r']).to_string())
}

/// Command buttons in the order their flags appeared, whichever of the four
/// flags introduced them.
fn ordered_buttons(matches: &ArgMatches) -> Result<Vec<Button>, Error> {
    const KINDS: [(&str, bool, bool); 4] = [
        ("button", true, false),
        ("button_no_terminal", false, false),
        ("button_dismiss", true, true),
        ("button_dismiss_no_terminal", false, true),
    ];
    let mut found = Vec::new();
    for (id, run_in_terminal, dismiss) in KINDS {
        let (Some(values), Some(indices)) = (matches.get_many::<String>(id), matches.indices_of(id))
        else {
            continue;
        };
        let values: Vec<&String> = values.collect();
        let indices: Vec<usize> = indices.collect();
        for (pair, index) in values.chunks(2).zip(indices.chunks(2)) {
            let [label, action] = pair else {
                return Err(Error::invalid(id, "expected TEXT ACTION"));
            };
            found.push((
                index[0],
                Button::command(label.as_str(), action.as_str(), run_in_terminal, dismiss),
            ));
        }
    }
    found.sort_by_key(|(index, _)| *index);
    Ok(found.into_iter().map(|(_, button)| button).collect())
}
