//! `ab_glyph` text engine backed by the system font database.

use std::fs;

use ab_glyph::{Font, FontArc, GlyphId, PxScale, ScaleFont, point};
use anyhow::{Context, Result};
use fontdb::{Database, Family, Query, Source};
use once_cell::sync::Lazy;
use style_model::{Color, FontDescriptor};
use tracing::debug;

use super::{ELLIPSIS, LineBox, StyledText, TextEngine, TextLayout, TextStyle};
use crate::error::Error;
use crate::render::canvas::Canvas;

static SYSTEM_FONTS: Lazy<Database> = Lazy::new(|| {
    let mut db = Database::new();
    db.load_system_fonts();
    debug!(faces = db.len(), "loaded system font database");
    db
});

/// Shapes and rasterizes with outline fonts. Bold is synthesized by
/// overstriking; `tt` spans use the system monospace face when present.
pub struct GlyphEngine {
    regular: FontArc,
    monospace: Option<FontArc>,
}

impl GlyphEngine {
    /// Resolves `font.family` in the system database, falling back to the
    /// generic sans-serif family.
    pub fn load(font: &FontDescriptor) -> Result<Self, Error> {
        let db = &*SYSTEM_FONTS;
        let regular = [Family::Name(font.family.as_str()), Family::SansSerif]
            .into_iter()
            .find_map(|family| query_face(db, family))
            .or_else(|| db.faces().find_map(|face| load_face(db, face.id).ok()))
            .ok_or_else(|| Error::NoFont(font.family.clone()))?;
        let monospace = query_face(db, Family::Monospace);
        debug!(family = %font.family, monospace = monospace.is_some(), "font resolved");
        Ok(Self { regular, monospace })
    }

    pub fn from_fonts(regular: FontArc, monospace: Option<FontArc>) -> Self {
        Self { regular, monospace }
    }

    fn face(&self, style: &TextStyle) -> &FontArc {
        if style.monospace {
            self.monospace.as_ref().unwrap_or(&self.regular)
        } else {
            &self.regular
        }
    }

    fn px_scale(font: &FontDescriptor, style: &TextStyle, scale: i32) -> PxScale {
        PxScale::from(font.pixel_size() * style.size_factor * scale as f32)
    }
}

fn query_face(db: &Database, family: Family<'_>) -> Option<FontArc> {
    let id = db.query(&Query {
        families: &[family],
        ..Default::default()
    })?;
    match load_face(db, id) {
        Ok(font) => Some(font),
        Err(err) => {
            debug!(error = ?err, "skipping unreadable font face");
            None
        }
    }
}

fn load_face(db: &Database, id: fontdb::ID) -> Result<FontArc> {
    let face = db.face(id).context("missing font face in database")?;
    let data = match &face.source {
        Source::Binary(data) => data.as_ref().as_ref().to_vec(),
        Source::File(path) => fs::read(path)
            .with_context(|| format!("failed to read font at {}", path.display()))?,
        Source::SharedFile(_, data) => data.as_ref().as_ref().to_vec(),
    };
    let font = match face.index {
        0 => FontArc::try_from_vec(data),
        index => ab_glyph::FontVec::try_from_vec_and_index(data, index).map(FontArc::new),
    };
    font.context("failed to decode font face")
}

fn to_logical(device: f32, scale: i32) -> f32 {
    device / scale.max(1) as f32
}

impl TextEngine for GlyphEngine {
    fn advances(&self, font: &FontDescriptor, text: &StyledText, scale: i32) -> Vec<f32> {
        let mut out = Vec::with_capacity(text.text.len());
        let mut previous: Option<(GlyphId, usize)> = None;
        for (byte, ch) in text.text.char_indices() {
            let style = text.style_at(byte);
            let face = self.face(style);
            let scaled = face.as_scaled(Self::px_scale(font, style, scale));
            if ch == '\n' {
                out.push(0.0);
                previous = None;
                continue;
            }
            let glyph = scaled.glyph_id(ch);
            let run_start = text
                .runs
                .iter()
                .find(|run| byte >= run.start && byte < run.end)
                .map(|run| run.start);
            let mut advance = scaled.h_advance(glyph);
            if let Some((prev, prev_run)) = previous {
                if Some(prev_run) == run_start {
                    advance += scaled.kern(prev, glyph);
                }
            }
            if style.bold {
                advance += 1.0;
            }
            out.push(to_logical(advance, scale));
            previous = run_start.map(|start| (glyph, start));
        }
        out
    }

    fn line_box(
        &self,
        font: &FontDescriptor,
        text: &StyledText,
        start: usize,
        end: usize,
        scale: i32,
    ) -> LineBox {
        let measure = |style: &TextStyle| {
            let scaled = self.face(style).as_scaled(Self::px_scale(font, style, scale));
            let ascent = scaled.ascent();
            (ascent, ascent - scaled.descent() + scaled.line_gap())
        };
        let (ascent, height) = text
            .runs_in(start, end)
            .map(|run| measure(&run.style))
            .fold(measure(text.style_at(start)), |acc, next| {
                (acc.0.max(next.0), acc.1.max(next.1))
            });
        LineBox {
            ascent: to_logical(ascent, scale).ceil() as i32,
            height: to_logical(height, scale).ceil() as i32,
        }
    }

    fn ellipsis_width(&self, font: &FontDescriptor, scale: i32) -> f32 {
        let scaled = self
            .regular
            .as_scaled(Self::px_scale(font, &TextStyle::PLAIN, scale));
        to_logical(scaled.h_advance(scaled.glyph_id(ELLIPSIS)), scale)
    }

    fn draw(
        &self,
        font: &FontDescriptor,
        layout: &TextLayout,
        canvas: &mut Canvas<'_>,
        origin: (i32, i32),
        color: Color,
        scale: i32,
    ) {
        let scale = scale.max(1);
        let advances = self.advances(font, &layout.text, scale);
        let char_index: Vec<usize> = layout.text.text.char_indices().map(|(b, _)| b).collect();
        let advance_at = |byte: usize| {
            char_index
                .binary_search(&byte)
                .ok()
                .and_then(|idx| advances.get(idx))
                .map(|adv| adv * scale as f32)
                .unwrap_or(0.0)
        };

        for line in &layout.lines {
            let baseline = (origin.1 + (line.top + line.ascent) * scale) as f32;
            let mut cursor = origin.0 as f32;
            for run in layout.text.runs_in(line.start, line.end) {
                let ink = run.style.foreground.unwrap_or(color);
                let face = self.face(&run.style);
                let scaled = face.as_scaled(Self::px_scale(font, &run.style, scale));
                let run_left = cursor;
                for (offset, ch) in layout.text.text[run.start..run.end].char_indices() {
                    if !ch.is_control() {
                        draw_glyph(canvas, face, scaled.scaled_glyph(ch), cursor, baseline, ink);
                        if run.style.bold {
                            draw_glyph(canvas, face, scaled.scaled_glyph(ch), cursor + 1.0, baseline, ink);
                        }
                    }
                    cursor += advance_at(run.start + offset);
                }
                let thickness = scale;
                if run.style.underline {
                    let y = baseline as i32 + (-scaled.descent() / 2.0).ceil() as i32;
                    blend_span(canvas, run_left, cursor, y, thickness, ink);
                }
                if run.style.strikethrough {
                    let y = baseline as i32 - (scaled.ascent() * 0.3).round() as i32;
                    blend_span(canvas, run_left, cursor, y, thickness, ink);
                }
            }
            if line.ellipsized {
                let style = layout.text.style_at(line.end.saturating_sub(1));
                let ink = style.foreground.unwrap_or(color);
                let scaled = self.regular.as_scaled(Self::px_scale(font, &TextStyle::PLAIN, scale));
                draw_glyph(canvas, &self.regular, scaled.scaled_glyph(ELLIPSIS), cursor, baseline, ink);
            }
        }
    }
}

fn draw_glyph(
    canvas: &mut Canvas<'_>,
    face: &FontArc,
    mut glyph: ab_glyph::Glyph,
    x: f32,
    baseline: f32,
    color: Color,
) {
    glyph.position = point(x, baseline);
    if let Some(outline) = face.outline_glyph(glyph) {
        let bounds = outline.px_bounds();
        outline.draw(|gx, gy, coverage| {
            canvas.blend_pixel(
                (bounds.min.x + gx as f32).floor() as i32,
                (bounds.min.y + gy as f32).floor() as i32,
                color,
                coverage,
            );
        });
    }
}

fn blend_span(canvas: &mut Canvas<'_>, left: f32, right: f32, y: i32, thickness: i32, color: Color) {
    for row in y..y + thickness {
        for x in left.floor() as i32..right.ceil() as i32 {
            canvas.blend_pixel(x, row, color, 1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::markup;

    // Hosts without any installed font cannot exercise the engine.
    fn engine() -> Option<GlyphEngine> {
        GlyphEngine::load(&FontDescriptor::default()).ok()
    }

    #[test]
    fn bold_text_is_wider() {
        let Some(engine) = engine() else { return };
        let font = FontDescriptor::default();
        let plain: f32 = engine.advances(&font, &StyledText::plain("Hello"), 1).iter().sum();
        let bold: f32 = engine
            .advances(&font, &markup::parse("<b>Hello</b>").unwrap(), 1)
            .iter()
            .sum();
        assert!(plain > 0.0);
        assert!((bold - plain - 5.0).abs() < 0.01);
    }

    #[test]
    fn scale_keeps_logical_metrics_close() {
        let Some(engine) = engine() else { return };
        let font = FontDescriptor::default();
        let text = StyledText::plain("Notification");
        let one = engine.shape(&font, text.clone(), 1, None, None);
        let two = engine.shape(&font, text, 2, None, None);
        assert!((one.width - two.width).abs() <= 2);
        assert!((one.height - two.height).abs() <= 1);
    }

    #[test]
    fn drawing_inks_the_canvas() {
        let Some(engine) = engine() else { return };
        let font = FontDescriptor::default();
        let layout = engine.shape(&font, StyledText::plain("Hi"), 1, None, None);
        let (width, height) = (layout.width as u32 + 4, layout.height as u32 + 4);
        let mut pixels = vec![0u32; (width * height) as usize];
        let mut canvas = Canvas::new(&mut pixels, width, height).unwrap();
        engine.draw(&font, &layout, &mut canvas, (2, 2), Color::from_rgba(0xFFFFFFFF), 1);
        assert!(pixels.iter().any(|pixel| *pixel != 0));
    }
}
