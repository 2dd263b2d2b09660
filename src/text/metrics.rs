//! Measurement front end used by layout and rendering. Falls back to
//! literal text when markup does not parse.

use style_model::FontDescriptor;
use tracing::warn;

use super::{StyledText, TextEngine, TextLayout, markup};

/// What to shape and under which constraints.
#[derive(Debug, Clone, Copy)]
pub struct LayoutRequest<'a> {
    pub text: &'a str,
    pub markup: bool,
    pub wrap_width: Option<i32>,
    pub max_height: Option<i32>,
}

impl<'a> LayoutRequest<'a> {
    pub fn single_line(text: &'a str, markup: bool) -> Self {
        Self {
            text,
            markup,
            wrap_width: None,
            max_height: None,
        }
    }

    pub fn wrapped(text: &'a str, wrap_width: i32) -> Self {
        Self {
            text,
            markup: false,
            wrap_width: Some(wrap_width),
            max_height: None,
        }
    }

    pub fn with_max_height(mut self, max_height: i32) -> Self {
        self.max_height = Some(max_height);
        self
    }
}

/// Binds a [`TextEngine`] to the configured font and output scale.
#[derive(Clone, Copy)]
pub struct TextMetrics<'a> {
    engine: &'a dyn TextEngine,
    font: &'a FontDescriptor,
    scale: i32,
}

impl<'a> TextMetrics<'a> {
    pub fn new(engine: &'a dyn TextEngine, font: &'a FontDescriptor, scale: i32) -> Self {
        Self {
            engine,
            font,
            scale: scale.max(1),
        }
    }

    /// Shapes `request`. Markup that fails to parse is shaped as literal text.
    pub fn layout(&self, request: LayoutRequest<'_>) -> TextLayout {
        let styled = if request.markup {
            match markup::parse(request.text) {
                Ok(styled) => styled,
                Err(err) => {
                    warn!(error = %err, text = request.text, "invalid markup, using literal text");
                    StyledText::plain(request.text)
                }
            }
        } else {
            StyledText::plain(request.text)
        };
        self.engine.shape(
            self.font,
            styled,
            self.scale,
            request.wrap_width,
            request.max_height,
        )
    }

    /// Unwrapped layout of `text`.
    pub fn measure(&self, text: &str, markup: bool) -> TextLayout {
        self.layout(LayoutRequest::single_line(text, markup))
    }
}
