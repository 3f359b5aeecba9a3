use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use ttf_parser::Face;

/// Average advance of a sans-serif glyph relative to the font size.
const FALLBACK_ADVANCE: f32 = 0.56;

static TEXT_MEASURER: Lazy<Mutex<TextMeasurer>> = Lazy::new(|| Mutex::new(TextMeasurer::new()));

/// Width of a single line of text. Uses a system font matching `font_family`
/// when one is available, otherwise an average-advance estimate.
pub fn measure_text_width(text: &str, font_size: f32, font_family: &str) -> f32 {
    if text.is_empty() || font_size <= 0.0 {
        return 0.0;
    }
    let measured = TEXT_MEASURER
        .lock()
        .ok()
        .and_then(|mut guard| guard.measure(text, font_size, font_family));
    measured.unwrap_or_else(|| estimate_width(text, font_size))
}

pub fn estimate_width(text: &str, font_size: f32) -> f32 {
    text.chars().filter(|ch| *ch != '\n').count() as f32 * font_size * FALLBACK_ADVANCE
}

struct TextMeasurer {
    db: Database,
    loaded_system_fonts: bool,
    faces: HashMap<String, Option<FontFace>>,
}

impl TextMeasurer {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            faces: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font_size: f32, font_family: &str) -> Option<f32> {
        let key = font_family.trim().to_string();
        if !self.faces.contains_key(&key) {
            let face = self.load_face(font_family);
            if face.is_none() {
                tracing::debug!(family = font_family, "no system font matched, estimating text widths");
            }
            self.faces.insert(key.clone(), face);
        }
        self.faces.get_mut(&key)?.as_mut()?.measure_width(text, font_size)
    }

    fn load_face(&mut self, font_family: &str) -> Option<FontFace> {
        let names: Vec<String> = font_family
            .split(',')
            .map(|part| part.trim().trim_matches('"').trim_matches('\'').to_string())
            .filter(|name| !name.is_empty())
            .collect();
        let mut families: Vec<Family<'_>> = names
            .iter()
            .map(|name| match name.to_ascii_lowercase().as_str() {
                "serif" => Family::Serif,
                "sans-serif" | "system-ui" | "-apple-system" => Family::SansSerif,
                "monospace" => Family::Monospace,
                _ => Family::Name(name.as_str()),
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
            .with_face_data(id, |data, index| FontFace::parse(data, index))
            .flatten()
    }
}

/// Horizontal advances of one face, in font units, keyed by character.
struct FontFace {
    units_per_em: f32,
    advances: HashMap<char, Option<u16>>,
    data: Vec<u8>,
    index: u32,
}

impl FontFace {
    fn parse(data: &[u8], index: u32) -> Option<Self> {
        let face = Face::parse(data, index).ok()?;
        let mut advances = HashMap::new();
        for byte in 0x20u8..0x7f {
            let ch = byte as char;
            let advance = face.glyph_index(ch).and_then(|glyph| face.glyph_hor_advance(glyph));
            advances.insert(ch, advance);
        }
        Some(Self {
            units_per_em: face.units_per_em().max(1) as f32,
            advances,
            data: data.to_vec(),
            index,
        })
    }

    fn measure_width(&mut self, text: &str, font_size: f32) -> Option<f32> {
        let scale = font_size / self.units_per_em;
        let fallback = font_size * FALLBACK_ADVANCE;
        let mut width = 0.0f32;
        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            let advance = match self.advances.get(&ch) {
                Some(advance) => *advance,
                None => {
                    let face = Face::parse(&self.data, self.index).ok()?;
                    let advance = face.glyph_index(ch).and_then(|glyph| face.glyph_hor_advance(glyph));
                    self.advances.insert(ch, advance);
                    advance
                }
            };
            width += match advance {
                Some(units) if units > 0 => units as f32 * scale,
                _ => fallback,
            };
        }
        Some(width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_has_no_width() {
        assert_eq!(measure_text_width("", 13.0, "sans-serif"), 0.0);
        assert_eq!(measure_text_width("abc", 0.0, "sans-serif"), 0.0);
    }

    #[test]
    fn longer_text_is_wider() {
        let short = measure_text_width("S3", 13.0, "Sans-Serif");
        let long = measure_text_width("S3 Ingestion Layer", 13.0, "Sans-Serif");
        assert!(short > 0.0);
        assert!(long > short);
    }

    #[test]
    fn estimate_scales_with_font_size() {
        assert_eq!(estimate_width("abcd", 10.0), 4.0 * 10.0 * FALLBACK_ADVANCE);
        assert!(estimate_width("abcd", 20.0) > estimate_width("abcd", 10.0));
    }
}
