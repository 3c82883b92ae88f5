use serde::{Deserialize, Serialize};

/// Typography and page colours used when a diagram is written out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Theme {
    pub font_family: String,
    /// Default label size in points.
    pub font_size: f64,
    pub text_color: String,
    pub background: String,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            font_family: "DejaVu Sans, Bitstream Vera Sans, Arial, sans-serif".to_string(),
            font_size: 10.0,
            text_color: "#000000".to_string(),
            background: "#ffffff".to_string(),
        }
    }

    pub fn serif() -> Self {
        Self {
            font_family: "DejaVu Serif, Times New Roman, serif".to_string(),
            font_size: 12.0,
            ..Self::classic()
        }
    }

    /// Looks a theme up by name; unknown names yield `None`.
    pub fn named(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "classic" | "default" => Some(Self::classic()),
            "serif" => Some(Self::serif()),
            _ => None,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::classic()
    }
}
