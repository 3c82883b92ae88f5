use crate::error::Result;
use crate::geometry::Point;
use crate::style::{DecorationStyle, Params};
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Construction-time settings of a diagram.
///
/// Every field has a default, so a config file only needs the keys it
/// changes. Lengths are centimetres unless noted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiagramConfig {
    /// Canvas size in grid units; inferred from content when unset.
    pub shape: Option<[f64; 2]>,
    /// Model coordinate of the lower-left canvas corner; inferred when unset.
    pub origin: Option<[f64; 2]>,
    pub grid_unit: f64,
    /// Default node diameter.
    pub node_unit: f64,
    pub observed_style: String,
    pub alternate_style: String,
    pub line_width: f64,
    pub node_ec: String,
    pub node_fc: String,
    pub plate_fc: String,
    pub directed: bool,
    pub aspect: f64,
    pub label_params: Params,
    pub dpi: Option<u32>,
    /// Margin left around inferred extents, in grid units.
    pub padding: f64,
    /// Either a theme name (`"classic"`, `"serif"`) or a full theme object.
    #[serde(deserialize_with = "deserialize_theme")]
    pub theme: Theme,
}

fn deserialize_theme<'de, D>(deserializer: D) -> std::result::Result<Theme, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(name) => {
            Theme::named(&name).ok_or_else(|| D::Error::custom(format!("unknown theme `{name}`")))
        }
        other => Theme::deserialize(other).map_err(D::Error::custom),
    }
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            shape: None,
            origin: None,
            grid_unit: 2.0,
            node_unit: 1.0,
            observed_style: "shaded".to_string(),
            alternate_style: "inner".to_string(),
            line_width: 1.0,
            node_ec: "k".to_string(),
            node_fc: "w".to_string(),
            plate_fc: "w".to_string(),
            directed: true,
            aspect: 1.0,
            label_params: Params::default(),
            dpi: None,
            padding: 0.1,
            theme: Theme::default(),
        }
    }
}

impl DiagramConfig {
    pub fn with_shape(mut self, width: f64, height: f64) -> Self {
        self.shape = Some([width, height]);
        self
    }

    pub fn with_origin(mut self, x: f64, y: f64) -> Self {
        self.origin = Some([x, y]);
        self
    }

    /// Checks every enumerated or numeric setting and produces the
    /// immutable style the renderer works from.
    pub fn validate(&self) -> Result<Style> {
        use crate::error::DiagramError;
        use crate::style::normalize_color;

        let observed_style = DecorationStyle::parse("observed", &self.observed_style)?;
        let alternate_style = DecorationStyle::parse("alternate", &self.alternate_style)?;
        for (key, value) in [
            ("gridUnit", self.grid_unit),
            ("nodeUnit", self.node_unit),
            ("aspect", self.aspect),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(DiagramError::invalid(key, format!("must be positive, got {value}")));
            }
        }
        if !(self.line_width.is_finite() && self.line_width >= 0.0) {
            return Err(DiagramError::invalid("lineWidth", "must be non-negative"));
        }
        if let Some([w, h]) = self.shape
            && !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0)
        {
            return Err(DiagramError::invalid("shape", "both dimensions must be positive"));
        }
        if let Some([x, y]) = self.origin
            && !(x.is_finite() && y.is_finite())
        {
            return Err(DiagramError::invalid("origin", "both coordinates must be finite"));
        }
        if !(self.padding.is_finite() && self.padding >= 0.0) {
            return Err(DiagramError::invalid("padding", "must be non-negative"));
        }
        let mut theme = self.theme.clone();
        theme.text_color = normalize_color(&theme.text_color)?;
        theme.background = normalize_color(&theme.background)?;

        Ok(Style {
            grid_unit: self.grid_unit,
            node_unit: self.node_unit,
            observed_style,
            alternate_style,
            line_width: self.line_width,
            node_ec: normalize_color(&self.node_ec)?,
            node_fc: normalize_color(&self.node_fc)?,
            plate_fc: normalize_color(&self.plate_fc)?,
            directed: self.directed,
            aspect: self.aspect,
            label_params: self.label_params.clone(),
            padding: self.padding,
            theme,
        })
    }

    pub fn fixed_shape(&self) -> Option<Point> {
        self.shape.map(Point::from)
    }

    pub fn fixed_origin(&self) -> Option<Point> {
        self.origin.map(Point::from)
    }
}

/// Validated, immutable defaults shared by every element of a diagram.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub grid_unit: f64,
    pub node_unit: f64,
    pub observed_style: DecorationStyle,
    pub alternate_style: DecorationStyle,
    pub line_width: f64,
    pub node_ec: String,
    pub node_fc: String,
    pub plate_fc: String,
    pub directed: bool,
    pub aspect: f64,
    pub label_params: Params,
    pub padding: f64,
    pub theme: Theme,
}

/// Loads a config file. JSON5 is accepted, which covers plain JSON.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<DiagramConfig> {
    let Some(path) = path else {
        return Ok(DiagramConfig::default());
    };
    let contents = std::fs::read_to_string(path)?;
    let config: DiagramConfig = json5::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}
