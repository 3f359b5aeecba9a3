use crate::error::{DiagramError, Result};
use crate::ir::{BuiltinIcon, Icon};
use std::path::{Path, PathBuf};

/// Side of the box the built-in glyph bodies are drawn in.
pub const GLYPH_VIEWBOX: f32 = 80.0;

/// An icon ready to be placed on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedIcon {
    Glyph(BuiltinIcon),
    Image(PathBuf),
}

pub fn resolve_icon(icon: &Icon, assets_dir: &Path) -> Result<ResolvedIcon> {
    match icon {
        Icon::Builtin(builtin) => Ok(ResolvedIcon::Glyph(*builtin)),
        Icon::Custom(path) => {
            let full = if path.is_absolute() {
                path.clone()
            } else {
                assets_dir.join(path)
            };
            if !full.is_file() {
                return Err(DiagramError::MissingIcon(full));
            }
            // Hrefs are absolute so no renderer re-resolves them against its own base.
            let full = std::path::absolute(&full).map_err(|_| DiagramError::MissingIcon(full.clone()))?;
            Ok(ResolvedIcon::Image(full))
        }
    }
}

/// SVG body of a built-in glyph in a `GLYPH_VIEWBOX` square.
pub fn glyph_body(icon: BuiltinIcon) -> &'static str {
    match icon {
        BuiltinIcon::Bash => {
            r##"<g><rect x="4" y="4" width="72" height="72" rx="10" ry="10" fill="#293137"/><rect x="4" y="4" width="72" height="14" rx="10" ry="10" fill="#4eaa25"/><rect x="4" y="12" width="72" height="6" fill="#4eaa25"/><path d="M18 34 L32 44 L18 54" fill="none" stroke="#ffffff" stroke-width="5" stroke-linecap="round" stroke-linejoin="round"/><line x1="38" y1="56" x2="60" y2="56" stroke="#ffffff" stroke-width="5" stroke-linecap="round"/></g>"##
        }
        BuiltinIcon::S3 => {
            r##"<g><path d="M12 18 L68 18 L60 70 C60 74 20 74 20 70 Z" fill="#e05243"/><ellipse cx="40" cy="18" rx="28" ry="8" fill="#8c3123"/><ellipse cx="40" cy="18" rx="22" ry="5" fill="#f58536"/><path d="M16 40 C30 46 50 46 64 40" fill="none" stroke="#ffffff" stroke-width="3"/><path d="M18 54 C32 60 48 60 62 54" fill="none" stroke="#ffffff" stroke-width="3"/></g>"##
        }
    }
}
