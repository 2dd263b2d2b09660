//! Text shaping contract and the line breaker shared by every engine.
//!
//! Engines only report per-character advances and per-line vertical metrics;
//! wrapping (word first, then character), ellipsis truncation under a height
//! budget and line slicing are done here so that every engine breaks lines
//! the same way.

pub mod glyph;
pub mod markup;
pub mod metrics;

use style_model::{Color, FontDescriptor};

use crate::render::canvas::Canvas;

pub use metrics::{LayoutRequest, TextMetrics};

/// Marker appended to a line cut short by a height budget.
pub const ELLIPSIS: char = '\u{2026}';

/// Attributes carried by a run of styled text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub monospace: bool,
    pub size_factor: f32,
    pub foreground: Option<Color>,
}

impl TextStyle {
    pub const PLAIN: TextStyle = TextStyle {
        bold: false,
        italic: false,
        underline: false,
        strikethrough: false,
        monospace: false,
        size_factor: 1.0,
        foreground: None,
    };
}

impl Default for TextStyle {
    fn default() -> Self {
        Self::PLAIN
    }
}

/// Byte range of [`StyledText::text`] sharing one style.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRun {
    pub start: usize,
    pub end: usize,
    pub style: TextStyle,
}

/// Plain text plus contiguous style runs covering all of it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyledText {
    pub text: String,
    pub runs: Vec<StyleRun>,
}

impl StyledText {
    pub fn plain(text: &str) -> Self {
        let runs = if text.is_empty() {
            Vec::new()
        } else {
            vec![StyleRun {
                start: 0,
                end: text.len(),
                style: TextStyle::PLAIN,
            }]
        };
        Self {
            text: text.to_string(),
            runs,
        }
    }

    pub fn style_at(&self, byte: usize) -> &TextStyle {
        self.runs
            .iter()
            .find(|run| byte >= run.start && byte < run.end)
            .map(|run| &run.style)
            .unwrap_or(&TextStyle::PLAIN)
    }

    /// Runs intersecting `start..end`, clipped to that range.
    pub fn runs_in(&self, start: usize, end: usize) -> impl Iterator<Item = StyleRun> + '_ {
        self.runs
            .iter()
            .filter(move |run| run.start < end && run.end > start)
            .map(move |run| StyleRun {
                start: run.start.max(start),
                end: run.end.min(end),
                style: run.style.clone(),
            })
    }
}

/// Vertical extent of one laid out line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineBox {
    pub ascent: i32,
    pub height: i32,
}

/// One line of a [`TextLayout`]. Offsets index the layout's text.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutLine {
    /// First byte of the line.
    pub start: usize,
    /// End of the visible content, trailing whitespace excluded.
    pub end: usize,
    pub top: i32,
    pub width: i32,
    pub ascent: i32,
    pub height: i32,
    pub ellipsized: bool,
}

/// Result of shaping a piece of text. All sizes are logical pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub text: StyledText,
    pub lines: Vec<LayoutLine>,
    pub width: i32,
    pub height: i32,
    pub baseline: i32,
}

impl TextLayout {
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Byte offset where line `index` begins, or the end of the text when the
    /// index is past the last line.
    pub fn line_start(&self, index: usize) -> usize {
        self.lines
            .get(index)
            .map(|line| line.start)
            .unwrap_or(self.text.text.len())
    }

    pub fn is_ellipsized(&self) -> bool {
        self.lines.last().is_some_and(|line| line.ellipsized)
    }
}

/// The external shaping primitive.
pub trait TextEngine {
    /// Horizontal advance of every `char` of `text`, in logical pixels.
    fn advances(&self, font: &FontDescriptor, text: &StyledText, scale: i32) -> Vec<f32>;

    /// Ascent and height of the line covering `start..end` of `text`.
    fn line_box(
        &self,
        font: &FontDescriptor,
        text: &StyledText,
        start: usize,
        end: usize,
        scale: i32,
    ) -> LineBox;

    /// Advance of [`ELLIPSIS`] in the base style.
    fn ellipsis_width(&self, font: &FontDescriptor, scale: i32) -> f32;

    /// Breaks `text` into lines no wider than `wrap_width` and, when
    /// `max_height` is set, drops the lines past it and ellipsizes the last
    /// kept one.
    fn shape(
        &self,
        font: &FontDescriptor,
        text: StyledText,
        scale: i32,
        wrap_width: Option<i32>,
        max_height: Option<i32>,
    ) -> TextLayout {
        compose_layout(self, font, text, scale, wrap_width, max_height)
    }

    /// Rasterizes `layout` with its top-left corner at `origin`, given in
    /// device pixels. `scale` maps logical sizes to device pixels.
    fn draw(
        &self,
        font: &FontDescriptor,
        layout: &TextLayout,
        canvas: &mut Canvas<'_>,
        origin: (i32, i32),
        color: Color,
        scale: i32,
    );
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct LineSpan {
    start: usize,
    end: usize,
}

/// Default [`TextEngine::shape`] implementation.
pub fn compose_layout<E: TextEngine + ?Sized>(
    engine: &E,
    font: &FontDescriptor,
    text: StyledText,
    scale: i32,
    wrap_width: Option<i32>,
    max_height: Option<i32>,
) -> TextLayout {
    let chars: Vec<(usize, char)> = text.text.char_indices().collect();
    let mut advances = engine.advances(font, &text, scale);
    advances.resize(chars.len(), 0.0);

    let mut prefix = Vec::with_capacity(chars.len() + 1);
    prefix.push(0.0f32);
    for advance in &advances {
        let last = prefix.last().copied().unwrap_or(0.0);
        prefix.push(last + advance);
    }
    let byte_at = |idx: usize| chars.get(idx).map(|(b, _)| *b).unwrap_or(text.text.len());

    let spans = break_lines(&chars, &prefix, wrap_width.map(|w| w.max(1) as f32));

    let mut lines = Vec::with_capacity(spans.len());
    let mut top = 0;
    for span in &spans {
        let line_box = engine.line_box(font, &text, byte_at(span.start), byte_at(span.end), scale);
        lines.push(LayoutLine {
            start: byte_at(span.start),
            end: byte_at(span.end),
            top,
            width: (prefix[span.end] - prefix[span.start]).ceil() as i32,
            ascent: line_box.ascent,
            height: line_box.height,
            ellipsized: false,
        });
        top += line_box.height;
    }

    if let Some(budget) = max_height {
        let fit = lines
            .iter()
            .take_while(|line| line.top + line.height <= budget)
            .count()
            .max(1);
        if fit < lines.len() {
            lines.truncate(fit);
            let ellipsis = engine.ellipsis_width(font, scale);
            let limit = wrap_width.map(|w| w.max(1) as f32).unwrap_or(f32::INFINITY);
            let span = spans[fit - 1];
            let mut keep = span.start;
            while keep < span.end && prefix[keep + 1] - prefix[span.start] + ellipsis <= limit {
                keep += 1;
            }
            if let Some(last) = lines.last_mut() {
                last.end = byte_at(keep);
                last.width = (prefix[keep] - prefix[span.start] + ellipsis).ceil() as i32;
                last.ellipsized = true;
            }
        }
    }

    let width = lines.iter().map(|line| line.width).max().unwrap_or(0);
    let height = lines.iter().map(|line| line.height).sum();
    let baseline = lines.first().map(|line| line.ascent).unwrap_or(0);
    TextLayout {
        text,
        lines,
        width,
        height,
        baseline,
    }
}

/// Greedy word-then-character breaking over char indices. Hard newlines
/// always end a line; trailing whitespace hangs past the wrap width.
fn break_lines(chars: &[(usize, char)], prefix: &[f32], wrap: Option<f32>) -> Vec<LineSpan> {
    let width = |a: usize, b: usize| prefix[b] - prefix[a];
    let visible_end = |start: usize, mut end: usize| {
        while end > start && chars[end - 1].1.is_whitespace() {
            end -= 1;
        }
        end
    };

    let mut spans = Vec::new();
    let mut paragraph_start = 0;
    loop {
        let paragraph_end = chars[paragraph_start..]
            .iter()
            .position(|(_, c)| *c == '\n')
            .map(|pos| paragraph_start + pos);
        let end = paragraph_end.unwrap_or(chars.len());

        match wrap {
            None => spans.push(LineSpan {
                start: paragraph_start,
                end: visible_end(paragraph_start, end),
            }),
            Some(limit) => {
                let mut line_start = paragraph_start;
                let mut break_at: Option<usize> = None;
                let mut i = paragraph_start;
                while i < end {
                    if chars[i].1.is_whitespace() {
                        i += 1;
                        break_at = Some(i);
                        continue;
                    }
                    if i > line_start && width(line_start, i + 1) > limit {
                        let next = break_at.filter(|b| *b > line_start).unwrap_or(i);
                        spans.push(LineSpan {
                            start: line_start,
                            end: visible_end(line_start, next),
                        });
                        line_start = next;
                        break_at = None;
                        continue;
                    }
                    i += 1;
                }
                spans.push(LineSpan {
                    start: line_start,
                    end: visible_end(line_start, end),
                });
            }
        }

        match paragraph_end {
            Some(newline) => paragraph_start = newline + 1,
            None => break,
        }
    }
    spans
}
