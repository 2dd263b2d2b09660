//! Parser for the Pango markup subset accepted in messages and button labels.
//!
//! Supported tags: `b`, `i`, `u`, `s`, `tt`, `big`, `small`, `sub`, `sup` and
//! `span` with `weight`/`font_weight`, `style`/`font_style`, `underline`,
//! `strikethrough`, `foreground`/`fgcolor`/`color`, `font_family`/`face`,
//! `size` and `background` (accepted, not rendered). Character references:
//! the five XML entities plus `&#N;` and `&#xH;`.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use style_model::Color;
use thiserror::Error;

use super::{StyleRun, StyledText, TextStyle};

const SIZE_STEP: f32 = 1.2;
const SCRIPT_FACTOR: f32 = 0.8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarkupError {
    #[error("malformed markup at byte {position}: {message}")]
    Syntax { position: u64, message: String },
    #[error("unknown tag <{0}>")]
    UnknownTag(String),
    #[error("closing tag </{found}> does not match the open tag")]
    UnexpectedClose { found: String },
    #[error("tag <{0}> is never closed")]
    Unclosed(String),
    #[error("invalid character reference: {0}")]
    BadEntity(String),
    #[error("attribute '{name}' is not allowed on <{tag}>")]
    BadAttribute { tag: String, name: String },
    #[error("invalid value '{value}' for attribute '{name}'")]
    BadValue { name: String, value: String },
}

/// Parses `source` into plain text plus style runs.
pub fn parse(source: &str) -> Result<StyledText, MarkupError> {
    let mut reader = Reader::from_str(source);
    // Mismatched closing tags are reported as `UnexpectedClose` below.
    reader.config_mut().check_end_names = false;

    let mut parser = Parser {
        out: StyledText::default(),
        stack: Vec::new(),
        base: TextStyle::default(),
    };
    loop {
        match reader.read_event() {
            Ok(Event::Start(tag)) => parser.open(&tag)?,
            Ok(Event::Empty(tag)) => {
                parser.open(&tag)?;
                parser.stack.pop();
            }
            Ok(Event::End(tag)) => parser.close(&String::from_utf8_lossy(tag.name().as_ref()))?,
            Ok(Event::Text(text)) => {
                let text = text
                    .unescape()
                    .map_err(|err| MarkupError::BadEntity(err.to_string()))?;
                parser.push_text(&text);
            }
            Ok(Event::CData(data)) => parser.push_text(&String::from_utf8_lossy(&data)),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(MarkupError::Syntax {
                    position: reader.error_position(),
                    message: err.to_string(),
                });
            }
        }
    }

    if let Some((name, _)) = parser.stack.pop() {
        return Err(MarkupError::Unclosed(name));
    }
    Ok(parser.out)
}

struct Parser {
    out: StyledText,
    stack: Vec<(String, TextStyle)>,
    base: TextStyle,
}

impl Parser {
    fn current(&self) -> &TextStyle {
        self.stack.last().map(|(_, style)| style).unwrap_or(&self.base)
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let style = self.current().clone();
        let start = self.out.text.len();
        self.out.text.push_str(text);
        let end = self.out.text.len();
        match self.out.runs.last_mut() {
            Some(last) if last.style == style && last.end == start => last.end = end,
            _ => self.out.runs.push(StyleRun { start, end, style }),
        }
    }

    fn open(&mut self, tag: &BytesStart<'_>) -> Result<(), MarkupError> {
        let name = String::from_utf8_lossy(tag.name().as_ref()).into_owned();
        let mut style = self.current().clone();
        match name.as_str() {
            "b" => style.bold = true,
            "i" => style.italic = true,
            "u" => style.underline = true,
            "s" => style.strikethrough = true,
            "tt" => style.monospace = true,
            "big" => style.size_factor *= SIZE_STEP,
            "small" => style.size_factor /= SIZE_STEP,
            "sub" | "sup" => style.size_factor *= SCRIPT_FACTOR,
            "span" => {}
            _ => return Err(MarkupError::UnknownTag(name)),
        }

        for attr in tag.attributes() {
            let attr = attr.map_err(|err| MarkupError::BadAttribute {
                tag: name.clone(),
                name: err.to_string(),
            })?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            if name != "span" {
                return Err(MarkupError::BadAttribute { tag: name, name: key });
            }
            let value = attr.unescape_value().map_err(|_| MarkupError::BadValue {
                name: key.clone(),
                value: String::from_utf8_lossy(&attr.value).into_owned(),
            })?;
            apply_span_attribute(&mut style, &key, &value)?;
        }
        self.stack.push((name, style));
        Ok(())
    }

    fn close(&mut self, name: &str) -> Result<(), MarkupError> {
        match self.stack.pop() {
            Some((open, _)) if open == name => Ok(()),
            _ => Err(MarkupError::UnexpectedClose {
                found: name.to_string(),
            }),
        }
    }
}

fn apply_span_attribute(style: &mut TextStyle, key: &str, value: &str) -> Result<(), MarkupError> {
    let bad_value = || MarkupError::BadValue {
        name: key.to_string(),
        value: value.to_string(),
    };
    match key {
        "weight" | "font_weight" => {
            style.bold = match value {
                "bold" | "ultrabold" | "heavy" | "semibold" | "ultraheavy" => true,
                "normal" | "light" | "ultralight" | "thin" | "book" | "medium" => false,
                numeric => numeric.parse::<u16>().map_err(|_| bad_value())? >= 600,
            };
        }
        "style" | "font_style" => {
            style.italic = match value {
                "italic" | "oblique" => true,
                "normal" => false,
                _ => return Err(bad_value()),
            };
        }
        "underline" => {
            style.underline = match value {
                "none" => false,
                "single" | "double" | "low" | "error" => true,
                _ => return Err(bad_value()),
            };
        }
        "strikethrough" => {
            style.strikethrough = match value {
                "true" => true,
                "false" => false,
                _ => return Err(bad_value()),
            };
        }
        "foreground" | "fgcolor" | "color" => {
            style.foreground = Some(value.parse::<Color>().map_err(|_| bad_value())?);
        }
        "font_family" | "face" => {
            style.monospace = matches!(value, "monospace" | "mono" | "Monospace");
        }
        "size" => {
            style.size_factor *= match value {
                "xx-small" => SIZE_STEP.powi(-3),
                "x-small" => SIZE_STEP.powi(-2),
                "small" | "smaller" => SIZE_STEP.recip(),
                "medium" => 1.0,
                "large" | "larger" => SIZE_STEP,
                "x-large" => SIZE_STEP.powi(2),
                "xx-large" => SIZE_STEP.powi(3),
                _ => return Err(bad_value()),
            };
        }
        "background" | "bgcolor" => {
            value.parse::<Color>().map_err(|_| bad_value())?;
        }
        _ => {
            return Err(MarkupError::BadAttribute {
                tag: "span".to_string(),
                name: key.to_string(),
            });
        }
    }
    Ok(())
}
