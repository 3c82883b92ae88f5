//! Label widths for tight bounding boxes and label boxes.
//!
//! Faces are looked up through the system font database once per family
//! list and cached for the life of the process. When no face resolves,
//! widths fall back to a fixed fraction of the font size.

use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use ttf_parser::Face;

/// Advance of a glyph the font does not cover, as a fraction of the size.
const FALLBACK_ADVANCE: f64 = 0.6;

static TEXT_MEASURER: Lazy<Mutex<TextMeasurer>> = Lazy::new(|| Mutex::new(TextMeasurer::new()));

/// Width in points of `text` set in the first available face of
/// `font_family` (a CSS-style comma-separated list).
pub fn measure_text_width(text: &str, font_size: f64, font_family: &str) -> f64 {
    if text.is_empty() || font_size <= 0.0 {
        return 0.0;
    }
    let measured = TEXT_MEASURER
        .lock()
        .ok()
        .and_then(|mut guard| guard.measure(text, font_size, font_family));
    measured.unwrap_or_else(|| fallback_width(text, font_size))
}

fn fallback_width(text: &str, font_size: f64) -> f64 {
    text.lines()
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0) as f64
        * FALLBACK_ADVANCE
        * font_size
}

struct TextMeasurer {
    db: Database,
    loaded_system_fonts: bool,
    cache: HashMap<String, Option<FontFace>>,
}

impl TextMeasurer {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            cache: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font_size: f64, font_family: &str) -> Option<f64> {
        let key = font_family.trim().to_string();
        if !self.cache.contains_key(&key) {
            let face = self.load_face(font_family);
            self.cache.insert(key.clone(), face);
        }
        let face = self.cache.get(&key)?.as_ref()?;
        text.lines()
            .map(|line| face.measure_width(&line.replace('\t', "    "), font_size))
            .try_fold(0.0f64, |widest, width| width.map(|w| widest.max(w)))
    }

    fn load_face(&mut self, font_family: &str) -> Option<FontFace> {
        let names: Vec<&str> = font_family
            .split(',')
            .map(|part| part.trim().trim_matches('"').trim_matches('\''))
            .filter(|part| !part.is_empty())
            .collect();
        let mut families: Vec<Family<'_>> = names
            .iter()
            .map(|&name| match name.to_ascii_lowercase().as_str() {
                "serif" => Family::Serif,
                "sans-serif" => Family::SansSerif,
                "monospace" => Family::Monospace,
                "cursive" => Family::Cursive,
                "fantasy" => Family::Fantasy,
                _ => Family::Name(name),
            })
            .collect();
        if families.is_empty() {
            families.push(Family::SansSerif);
        }

        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
        }

        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        self.db
            .with_face_data(id, |data, index| FontFace::parse(data.to_vec(), index))
            .flatten()
    }
}

/// Raw font bytes plus the advances needed for plain ASCII labels, which
/// are the common case and never need a reparse.
struct FontFace {
    data: Vec<u8>,
    index: u32,
    units_per_em: u16,
    ascii_advances: [u16; 128],
}

impl FontFace {
    fn parse(data: Vec<u8>, index: u32) -> Option<Self> {
        let face = Face::parse(&data, index).ok()?;
        let units_per_em = face.units_per_em().max(1);
        let mut ascii_advances = [0u16; 128];
        for byte in 0u8..=127 {
            if let Some(glyph) = face.glyph_index(byte as char) {
                ascii_advances[byte as usize] = face.glyph_hor_advance(glyph).unwrap_or(0);
            }
        }
        Some(Self {
            data,
            index,
            units_per_em,
            ascii_advances,
        })
    }

    fn measure_width(&self, text: &str, font_size: f64) -> Option<f64> {
        let scale = font_size / self.units_per_em as f64;
        let fallback = font_size * FALLBACK_ADVANCE;
        let advance = |units: u16| {
            if units == 0 {
                fallback
            } else {
                units as f64 * scale
            }
        };

        if text.is_ascii() {
            return Some(
                text.bytes()
                    .map(|byte| advance(self.ascii_advances[byte as usize]))
                    .sum(),
            );
        }

        let face = Face::parse(&self.data, self.index).ok()?;
        Some(
            text.chars()
                .map(|ch| {
                    face.glyph_index(ch)
                        .and_then(|glyph| face.glyph_hor_advance(glyph))
                        .map_or(fallback, advance)
                })
                .sum(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_has_no_width() {
        assert_eq!(measure_text_width("", 10.0, "sans-serif"), 0.0);
        assert_eq!(measure_text_width("abc", 0.0, "sans-serif"), 0.0);
    }

    #[test]
    fn width_grows_with_text_and_size() {
        let short = measure_text_width("ab", 10.0, "sans-serif");
        let long = measure_text_width("abcdef", 10.0, "sans-serif");
        let large = measure_text_width("abcdef", 20.0, "sans-serif");
        assert!(short > 0.0);
        assert!(long > short);
        assert!(large > long);
    }

    #[test]
    fn fallback_uses_the_widest_line() {
        assert!((fallback_width("ab\nabcd", 10.0) - 24.0).abs() < 1e-9);
    }
}
