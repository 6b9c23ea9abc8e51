//! Fonts the renderers draw with
//!
//! Outline fonts are loaded from TTF files at runtime. When a font is not configured or
//! fails to load, the built-in ProFont bitmap font takes its place.

use std::fmt;
use std::fs;
use std::path::Path;

use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::{Point, Size};
use embedded_graphics::text::{Baseline, Text};
use embedded_graphics::Drawable;
use log::{info, warn};

use super::canvas::Canvas;
use super::text_styles::{builtin_font, BuiltinFont};
use crate::config::FontSettings;

/// The font can't draw this character, the draw call was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no glyph for {0:?}")]
pub struct GlyphError(pub char);

pub enum FontFace {
    Outline(Box<fontdue::Font>),
    Builtin,
}

impl fmt::Debug for FontFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Outline(_) => f.write_str("FontFace::Outline"),
            Self::Builtin => f.write_str("FontFace::Builtin"),
        }
    }
}

impl FontFace {
    /// Load a TTF, falling back to the built-in font with a warning
    pub fn load(path: Option<&Path>, role: &str) -> Self {
        let Some(path) = path else {
            info!("No {role} font configured, using the built-in font");
            return Self::Builtin;
        };
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Cannot read {role} font {}: {e}", path.display());
                return Self::Builtin;
            }
        };
        match fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default()) {
            Ok(font) => {
                info!("Loaded {role} font {}", path.display());
                Self::Outline(Box::new(font))
            }
            Err(e) => {
                warn!("Cannot parse {role} font {}: {e}", path.display());
                Self::Builtin
            }
        }
    }

    pub fn at(&self, px: f32) -> Typeface<'_> {
        Typeface { face: self, px }
    }
}

/// A face at one pixel size
#[derive(Debug, Clone, Copy)]
pub struct Typeface<'a> {
    face: &'a FontFace,
    px: f32,
}

impl Typeface<'_> {
    fn builtin(&self) -> BuiltinFont {
        builtin_font(self.px)
    }

    fn ascent(&self, font: &fontdue::Font) -> f32 {
        font.horizontal_line_metrics(self.px)
            .map(|m| m.ascent)
            .unwrap_or(self.px)
    }

    pub fn has_glyph(&self, c: char) -> bool {
        if c.is_whitespace() {
            return true;
        }
        match self.face {
            FontFace::Outline(font) => font.lookup_glyph_index(c) != 0,
            FontFace::Builtin => c.is_ascii_graphic(),
        }
    }

    /// First character this face can't draw
    pub fn check(&self, text: &str) -> Result<(), GlyphError> {
        match text.chars().find(|&c| !self.has_glyph(c)) {
            Some(c) => Err(GlyphError(c)),
            None => Ok(()),
        }
    }

    /// Horizontal pen advance of one character
    pub fn advance(&self, c: char) -> i32 {
        match self.face {
            FontFace::Outline(font) => font.metrics(c, self.px).advance_width.round() as i32,
            FontFace::Builtin => {
                let font = self.builtin();
                (font.character_size.width + font.character_spacing) as i32
            }
        }
    }

    /// Advance width and inked height of `text`
    pub fn measure(&self, text: &str) -> Size {
        let width: i32 = text.chars().map(|c| self.advance(c)).sum();
        let height = match self.face {
            FontFace::Outline(font) => {
                let ascent = self.ascent(font);
                let mut top = f32::MAX;
                let mut bottom = f32::MIN;
                for c in text.chars() {
                    let m = font.metrics(c, self.px);
                    if m.height == 0 {
                        continue;
                    }
                    top = top.min(ascent - (m.ymin + m.height as i32) as f32);
                    bottom = bottom.max(ascent - m.ymin as f32);
                }
                if bottom > top {
                    (bottom - top).ceil() as u32
                } else {
                    0
                }
            }
            FontFace::Builtin => {
                if text.is_empty() {
                    0
                } else {
                    self.builtin().character_size.height
                }
            }
        };
        Size::new(width.max(0) as u32, height)
    }

    /// Draw `text` with its top-left corner at `top_left`, returning the advance width.
    ///
    /// Nothing is drawn when any character is missing from the face.
    pub fn draw(
        &self,
        canvas: &mut Canvas,
        text: &str,
        top_left: Point,
        color: Rgb888,
    ) -> Result<i32, GlyphError> {
        self.check(text)?;

        match self.face {
            FontFace::Outline(font) => {
                let baseline = (top_left.y as f32 + self.ascent(font)).round() as i32;
                let mut pen = top_left.x as f32;
                for c in text.chars() {
                    let (m, coverage) = font.rasterize(c, self.px);
                    let gx = pen.round() as i32 + m.xmin;
                    let gy = baseline - m.ymin - m.height as i32;
                    for (idx, &alpha) in coverage.iter().enumerate() {
                        let col = (idx % m.width.max(1)) as i32;
                        let row = (idx / m.width.max(1)) as i32;
                        canvas.blend(Point::new(gx + col, gy + row), color, alpha);
                    }
                    pen += m.advance_width;
                }
                Ok((pen - top_left.x as f32).round() as i32)
            }
            FontFace::Builtin => {
                let style = MonoTextStyle::new(self.builtin(), color);
                if let Err(never) = Text::with_baseline(text, top_left, style, Baseline::Top).draw(canvas) {
                    match never {}
                }
                Ok(self.measure(text).width as i32)
            }
        }
    }
}

/// The two faces every renderer needs
#[derive(Debug)]
pub struct FontSet {
    pub text: FontFace,
    pub icons: FontFace,
}

impl FontSet {
    pub fn load(settings: &FontSettings) -> Self {
        Self {
            text: FontFace::load(settings.text.as_deref(), "text"),
            icons: FontFace::load(settings.icons.as_deref(), "icon"),
        }
    }

    pub const fn builtin() -> Self {
        Self {
            text: FontFace::Builtin,
            icons: FontFace::Builtin,
        }
    }

    pub fn text(&self, px: f32) -> Typeface<'_> {
        self.text.at(px)
    }

    pub fn icons(&self, px: f32) -> Typeface<'_> {
        self.icons.at(px)
    }
}
