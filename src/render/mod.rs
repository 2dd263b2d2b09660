//! Paints a [`FrameLayout`] into a display list, replayed later into a pooled
//! buffer once the size has been confirmed.

pub mod canvas;

use style_model::{Color, FontDescriptor, StyleConfig};

use crate::geometry::Rect;
use crate::layout::{FrameLayout, PlacedText};
use crate::text::{TextEngine, TextLayout};
use canvas::Canvas;

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// Overwrites the whole surface.
    Clear(Color),
    /// Overwrites the pixels under `rect`.
    FillRect { rect: Rect, color: Color },
    /// Composites shaped text with its top-left corner at `origin`.
    Text {
        origin: (i32, i32),
        layout: TextLayout,
        color: Color,
    },
}

/// Off-screen frame in logical coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    pub width: i32,
    pub height: i32,
    ops: Vec<DrawOp>,
}

impl Recording {
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Clears `canvas` and plays every operation into it at `scale`.
    pub fn replay(
        &self,
        canvas: &mut Canvas<'_>,
        engine: &dyn TextEngine,
        font: &FontDescriptor,
        scale: i32,
    ) {
        let scale = scale.max(1);
        canvas.clear(Color::from_rgba(0));
        for op in &self.ops {
            match op {
                DrawOp::Clear(color) => canvas.clear(*color),
                DrawOp::FillRect { rect, color } => canvas.fill_rect(
                    Rect::new(
                        rect.x * scale,
                        rect.y * scale,
                        rect.width * scale,
                        rect.height * scale,
                    ),
                    *color,
                ),
                DrawOp::Text {
                    origin,
                    layout,
                    color,
                } => engine.draw(
                    font,
                    layout,
                    canvas,
                    (origin.0 * scale, origin.1 * scale),
                    *color,
                    scale,
                ),
            }
        }
    }
}

pub struct FrameRenderer<'a> {
    style: &'a StyleConfig,
}

impl<'a> FrameRenderer<'a> {
    pub fn new(style: &'a StyleConfig) -> Self {
        Self { style }
    }

    pub fn record(&self, frame: &FrameLayout) -> Recording {
        let style = self.style;
        let mut ops = vec![DrawOp::Clear(style.background)];

        if let Some(message) = &frame.message {
            ops.push(text(message, style.text));
        }

        for button in &frame.buttons {
            ops.push(DrawOp::FillRect {
                rect: button.outer(),
                color: style.border,
            });
            ops.push(DrawOp::FillRect {
                rect: button.fill,
                color: style.button_background,
            });
            ops.push(text(&button.label, style.button_text));
        }

        if let Some(details) = &frame.details {
            ops.push(DrawOp::FillRect {
                rect: details.panel,
                color: style.details_background,
            });
            ops.push(text(&details.text, style.text));
            if let Some(scroll) = &details.scroll {
                for (rect, label) in [(scroll.up, &scroll.up_label), (scroll.down, &scroll.down_label)] {
                    ops.push(DrawOp::FillRect {
                        rect,
                        color: style.details_background,
                    });
                    ops.push(DrawOp::FillRect {
                        rect: rect.inflate(-scroll.border),
                        color: style.button_background,
                    });
                    ops.push(text(label, style.button_text));
                }
            }
        }

        let border = style.bar_border_thickness;
        ops.push(DrawOp::FillRect {
            rect: Rect::new(0, frame.height - border, frame.width, border),
            color: style.border_bottom,
        });

        Recording {
            width: frame.width,
            height: frame.height,
            ops,
        }
    }
}

fn text(placed: &PlacedText, color: Color) -> DrawOp {
    DrawOp::Text {
        origin: placed.origin,
        layout: placed.layout.clone(),
        color,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentModel;
    use crate::layout::LayoutEngine;
    use crate::testkit::MonospaceEngine;
    use crate::text::TextMetrics;

    #[test]
    fn paint_order_matches_stacking() {
        let style = StyleConfig {
            button_text: Color::from_rgba(0x00FF00FF),
            details_background: Color::from_rgba(0x0000FFFF),
            ..StyleConfig::default()
        };
        let engine = MonospaceEngine::new(10, 16);
        let font = FontDescriptor::default();
        let metrics = TextMetrics::new(&engine, &font, 1);
        let mut content = ContentModel::new("hi", "X", Vec::new(), Some(("D".into(), "body".into())));
        content.toggle_details();
        let frame = LayoutEngine::new(&style, metrics).compute(&mut content, 400, 200);

        let recording = FrameRenderer::new(&style).record(&frame);
        let ops = recording.ops();
        assert_eq!(ops.first(), Some(&DrawOp::Clear(style.background)));
        assert!(matches!(ops[1], DrawOp::Text { color, .. } if color == style.text));
        assert!(matches!(ops[2], DrawOp::FillRect { color, .. } if color == style.border));
        assert_eq!(
            ops.last(),
            Some(&DrawOp::FillRect {
                rect: Rect::new(0, 200 - style.bar_border_thickness, 400, style.bar_border_thickness),
                color: style.border_bottom,
            })
        );
        let details_fill = ops
            .iter()
            .position(|op| matches!(op, DrawOp::FillRect { color, .. } if *color == style.details_background));
        let last_button_label = ops
            .iter()
            .rposition(|op| matches!(op, DrawOp::Text { color, .. } if *color == style.button_text));
        assert!(details_fill > last_button_label);
    }

    #[test]
    fn replay_scales_rectangles() {
        let style = StyleConfig::default();
        let engine = MonospaceEngine::new(10, 16);
        let font = FontDescriptor::default();
        let recording = Recording {
            width: 4,
            height: 2,
            ops: vec![
                DrawOp::Clear(Color::from_rgba(0x000000FF)),
                DrawOp::FillRect {
                    rect: Rect::new(1, 0, 1, 1),
                    color: style.border_bottom,
                },
            ],
        };
        let mut pixels = vec![0u32; 8 * 4];
        let mut canvas = Canvas::new(&mut pixels, 8, 4).unwrap();
        recording.replay(&mut canvas, &engine, &font, 2);
        assert_eq!(canvas.pixel(1, 0), Some(0xFF000000));
        assert_eq!(canvas.pixel(2, 0), Some(style.border_bottom.argb()));
        assert_eq!(canvas.pixel(3, 1), Some(style.border_bottom.argb()));
        assert_eq!(canvas.pixel(4, 0), Some(0xFF000000));
    }
}
