//! Geometry for the message row, the button row and the details panel.

use style_model::StyleConfig;
use tracing::debug;

use crate::content::{Button, ContentModel, DetailsPanel, SCROLL_DOWN_LABEL, SCROLL_UP_LABEL};
use crate::geometry::Rect;
use crate::text::{LayoutRequest, TextLayout, TextMetrics};

/// Tallest surface the bar ever asks for, in logical pixels.
pub const MAX_SURFACE_HEIGHT: i32 = 500;

const CONVERGENCE_ATTEMPTS: usize = 4;

/// Shaped text and where its top-left corner goes.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedText {
    pub origin: (i32, i32),
    pub layout: TextLayout,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ButtonGeometry {
    pub index: usize,
    pub fill: Rect,
    pub border: i32,
    pub label: PlacedText,
}

impl ButtonGeometry {
    pub fn outer(&self) -> Rect {
        self.fill.inflate(self.border)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScrollGeometry {
    pub up: Rect,
    pub down: Rect,
    pub up_label: PlacedText,
    pub down_label: PlacedText,
    pub border: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailsGeometry {
    pub panel: Rect,
    pub text: PlacedText,
    pub scroll: Option<ScrollGeometry>,
}

/// One layout pass. Rows whose ideal height did not fit the granted height
/// are absent; their heights still count towards `required_height`.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameLayout {
    pub width: i32,
    pub height: i32,
    pub message_height: i32,
    pub content_height: i32,
    pub required_height: i32,
    pub message: Option<PlacedText>,
    pub buttons: Vec<ButtonGeometry>,
    pub details: Option<DetailsGeometry>,
}

pub struct LayoutEngine<'a> {
    style: &'a StyleConfig,
    metrics: TextMetrics<'a>,
}

impl<'a> LayoutEngine<'a> {
    pub fn new(style: &'a StyleConfig, metrics: TextMetrics<'a>) -> Self {
        Self { style, metrics }
    }

    /// Lays out `content` for a `width × height` grant and stores the computed
    /// boxes and line counts back into it.
    pub fn compute(&self, content: &mut ContentModel, width: i32, height: i32) -> FrameLayout {
        let (message_height, message) = self.layout_message(&content.message, height);
        let (buttons_height, buttons) = self.layout_buttons(&mut content.buttons, width, height);
        let band = message_height.max(buttons_height);

        let mut content_height = band;
        let mut details = None;
        if let Some(panel) = content.details.as_mut() {
            if panel.visible {
                let (bottom, geometry) = self.layout_details(panel, band, width);
                content_height = content_height.max(bottom);
                details = Some(geometry);
            } else {
                clear_details(panel);
            }
        }

        let required_height = if content_height > height {
            content_height + self.style.bar_border_thickness
        } else {
            content_height
        };

        FrameLayout {
            width,
            height,
            message_height,
            content_height,
            required_height,
            message,
            buttons,
            details,
        }
    }

    fn layout_message(&self, message: &str, height: i32) -> (i32, Option<PlacedText>) {
        let padding = self.style.message_padding;
        let layout = self.metrics.measure(message, true);
        let ideal = layout.height + padding * 2;
        if height < ideal {
            return (ideal, None);
        }
        let origin = (padding, (ideal - layout.height) / 2);
        (ideal, Some(PlacedText { origin, layout }))
    }

    fn layout_buttons(
        &self,
        buttons: &mut [Button],
        width: i32,
        height: i32,
    ) -> (i32, Vec<ButtonGeometry>) {
        let border = self.style.button_border_thickness;
        let padding = self.style.button_padding;
        let mut cursor = width - self.style.button_margin_right - self.style.button_gap_close;
        let mut tallest = 0;
        let mut placed = Vec::with_capacity(buttons.len());

        for (index, button) in buttons.iter_mut().enumerate() {
            let label = self.metrics.measure(&button.label, true);
            let ideal = label.height + padding * 2 + border * 2;
            tallest = tallest.max(ideal);
            if height < ideal {
                button.bounds = Rect::default();
                cursor -= self.style.button_gap;
                continue;
            }

            let fill = Rect::new(
                cursor - border - label.width - padding * 2 + 1,
                border + 1,
                label.width + padding * 2,
                label.height + padding * 2,
            );
            button.bounds = fill;
            placed.push(ButtonGeometry {
                index,
                fill,
                border,
                label: PlacedText {
                    origin: (fill.x + padding, fill.y + padding),
                    layout: label,
                },
            });
            cursor = fill.x - border - self.style.button_gap;
        }
        (tallest, placed)
    }

    /// Width of the column holding the two scroll buttons.
    pub fn scroll_column_width(&self) -> i32 {
        let up = self.metrics.measure(SCROLL_UP_LABEL, true).width;
        let down = self.metrics.measure(SCROLL_DOWN_LABEL, true).width;
        up.max(down) + self.style.button_border_thickness * 2 + self.style.button_padding * 2
    }

    fn layout_details(
        &self,
        panel: &mut DetailsPanel,
        band_top: i32,
        width: i32,
    ) -> (i32, DetailsGeometry) {
        let mut outcome = self.paginate(panel, band_top, width);
        if panel.clamp_offset() {
            debug!(offset = panel.offset, "details offset clamped, paginating again");
            outcome = self.paginate(panel, band_top, width);
            panel.clamp_offset();
        }
        outcome
    }

    fn paginate(&self, panel: &mut DetailsPanel, band_top: i32, width: i32) -> (i32, DetailsGeometry) {
        let padding = self.style.message_padding;
        let decor = padding + self.style.details_border_thickness;
        let x = decor;
        let y = band_top + decor;
        let full_width = (width - decor * 2).max(0);
        let column = self.scroll_column_width();

        let mut reserved = panel.offset > 0;
        let (available, wrap, start, mut ideal) = loop {
            let available = (full_width - if reserved { column } else { 0 }).max(0);
            let wrap = (available - padding * 2).max(1);
            let full = self.metrics.layout(LayoutRequest::wrapped(&panel.text, wrap));
            panel.total_lines = full.line_count();
            let start = full.line_start(panel.offset);
            let rest = self
                .metrics
                .layout(LayoutRequest::wrapped(&panel.text[start..], wrap));

            let ideal = y + rest.height + decor + padding * 2;
            if ideal > MAX_SURFACE_HEIGHT {
                if !reserved {
                    reserved = true;
                    continue;
                }
                break (available, wrap, start, MAX_SURFACE_HEIGHT);
            }
            break (available, wrap, start, ideal);
        };

        let remaining = &panel.text[start..];
        let mut panel_height = ideal - y - decor;
        let mut attempts = 0;
        let fitted = loop {
            let budget = (panel_height - padding * 2).max(0);
            let fitted = self
                .metrics
                .layout(LayoutRequest::wrapped(remaining, wrap).with_max_height(budget));
            attempts += 1;
            if fitted.height == budget {
                break fitted;
            }
            if attempts >= CONVERGENCE_ATTEMPTS {
                debug!(
                    budget,
                    measured = fitted.height,
                    "details height did not converge, keeping last measurement"
                );
                break fitted;
            }
            ideal = (y + fitted.height + decor + padding * 2).min(MAX_SURFACE_HEIGHT);
            panel_height = ideal - y - decor;
        };

        panel.visible_lines = fitted.line_count();
        panel.bounds = Rect::new(x, y, available, panel_height);
        panel.scrollable = reserved;

        let scroll = if reserved {
            let half = panel_height / 2;
            let up = Rect::new(x + available, y, column, half);
            let down = Rect::new(x + available, y + half, column, half);
            panel.scroll_up.bounds = up;
            panel.scroll_down.bounds = down;
            Some(ScrollGeometry {
                up,
                down,
                up_label: self.place_scroll_label(&panel.scroll_up.label, up),
                down_label: self.place_scroll_label(&panel.scroll_down.label, down),
                border: self.style.button_border_thickness,
            })
        } else {
            panel.scroll_up.bounds = Rect::default();
            panel.scroll_down.bounds = Rect::default();
            None
        };

        let geometry = DetailsGeometry {
            panel: panel.bounds,
            text: PlacedText {
                origin: (x + padding, y + padding),
                layout: fitted,
            },
            scroll,
        };
        (ideal, geometry)
    }

    fn place_scroll_label(&self, label: &str, rect: Rect) -> PlacedText {
        let layout = self.metrics.measure(label, true);
        let border = self.style.button_border_thickness;
        PlacedText {
            origin: (
                rect.x + border + self.style.button_padding,
                rect.y + border + (rect.height - layout.height) / 2,
            ),
            layout,
        }
    }
}

fn clear_details(panel: &mut DetailsPanel) {
    panel.bounds = Rect::default();
    panel.scrollable = false;
    panel.scroll_up.bounds = Rect::default();
    panel.scroll_down.bounds = Rect::default();
}
