use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    /// Node label size.
    pub font_size: f32,
    /// Title size; diagrams may override it through `fontsize`.
    pub title_font_size: f32,
    pub cluster_font_size: f32,
    pub text_color: String,
    pub line_color: String,
    pub cluster_background: String,
    pub cluster_border: String,
    /// `transparent` leaves the canvas unpainted.
    pub background: String,
}

impl Theme {
    /// Palette of the Python `diagrams` package (Graphviz defaults it sets).
    pub fn diagrams_default() -> Self {
        Self {
            font_family: "Sans-Serif, Helvetica, Arial, sans-serif".to_string(),
            font_size: 13.0,
            title_font_size: 15.0,
            cluster_font_size: 12.0,
            text_color: "#2D3436".to_string(),
            line_color: "#7B8894".to_string(),
            cluster_background: "#E5F5FD".to_string(),
            cluster_border: "#AEB6BE".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn plain() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            title_font_size: 16.0,
            cluster_font_size: 12.0,
            text_color: "#1C2430".to_string(),
            line_color: "#333333".to_string(),
            cluster_background: "#F7FAFF".to_string(),
            cluster_border: "#D7E0F0".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn is_transparent(&self) -> bool {
        let bg = self.background.trim();
        bg.is_empty() || bg.eq_ignore_ascii_case("transparent") || bg.eq_ignore_ascii_case("none")
    }
}
