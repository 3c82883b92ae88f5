use crate::error::{DiagramError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Free-form style overrides, keyed the way plotting libraries usually
/// spell them (`fc`/`facecolor`, `lw`/`linewidth`, ...).
///
/// Overrides are never mutated while rendering; lookups go through
/// [`Params::resolve`], which copies the value out and fails when more than
/// one spelling of the same setting is present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, Value>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// True when any spelling in `aliases` is present.
    pub fn has_any(&self, aliases: &[&str]) -> bool {
        aliases.iter().any(|key| self.0.contains_key(*key))
    }

    /// Looks up one setting that may be spelled several ways.
    ///
    /// Returns `None` when no alias is present and
    /// [`DiagramError::DuplicateAlias`] when more than one is.
    pub fn resolve(&self, aliases: &[&str]) -> Result<Option<&Value>> {
        let found: Vec<(&str, &Value)> = aliases
            .iter()
            .filter_map(|key| self.0.get(*key).map(|value| (*key, value)))
            .collect();
        match found.as_slice() {
            [] => Ok(None),
            [(_, value)] => Ok(Some(value)),
            _ => Err(DiagramError::DuplicateAlias {
                keys: found
                    .iter()
                    .map(|(key, _)| *key)
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    pub fn string_or(&self, aliases: &[&str], default: &str) -> Result<String> {
        match self.resolve(aliases)? {
            None => Ok(default.to_string()),
            Some(Value::String(value)) => Ok(value.clone()),
            Some(Value::Number(value)) => Ok(value.to_string()),
            Some(Value::Null) => Ok("none".to_string()),
            Some(other) => Err(DiagramError::invalid(aliases[0], format!("expected a string, got {other}"))),
        }
    }

    pub fn number_or(&self, aliases: &[&str], default: f64) -> Result<f64> {
        match self.resolve(aliases)? {
            None => Ok(default),
            Some(Value::Number(value)) => value
                .as_f64()
                .ok_or_else(|| DiagramError::invalid(aliases[0], "number out of range")),
            Some(Value::String(value)) => value
                .trim()
                .parse::<f64>()
                .map_err(|_| DiagramError::invalid(aliases[0], format!("expected a number, got {value:?}"))),
            Some(other) => Err(DiagramError::invalid(aliases[0], format!("expected a number, got {other}"))),
        }
    }

    pub fn color_or(&self, aliases: &[&str], default: &str) -> Result<String> {
        normalize_color(&self.string_or(aliases, default)?)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// How observed and alternate nodes are decorated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecorationStyle {
    /// Background shape filled at 70% grey.
    Shaded,
    /// Second outline 10% smaller than the node.
    Inner,
    /// Second outline 10% larger than the node.
    Outer,
}

impl DecorationStyle {
    pub fn parse(kind: &'static str, value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "shaded" => Ok(Self::Shaded),
            "inner" => Ok(Self::Inner),
            "outer" => Ok(Self::Outer),
            _ => Err(DiagramError::UnknownDecorationStyle {
                kind,
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
    DashDot,
}

impl LineStyle {
    pub fn dasharray(&self, line_width: f64) -> Option<String> {
        let w = line_width.max(0.5);
        match self {
            Self::Solid => None,
            Self::Dashed => Some(format!("{:.2} {:.2}", 3.7 * w, 1.6 * w)),
            Self::Dotted => Some(format!("{:.2} {:.2}", w, 1.65 * w)),
            Self::DashDot => Some(format!(
                "{:.2} {:.2} {:.2} {:.2}",
                6.4 * w,
                1.6 * w,
                w,
                1.6 * w
            )),
        }
    }
}

impl FromStr for LineStyle {
    type Err = DiagramError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim() {
            "-" | "solid" => Ok(Self::Solid),
            "--" | "dashed" => Ok(Self::Dashed),
            ":" | "dotted" => Ok(Self::Dotted),
            "-." | "dashdot" => Ok(Self::DashDot),
            other => Err(DiagramError::invalid("linestyle", format!("unknown line style {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HAlign {
    Left,
    #[default]
    Center,
    Right,
}

impl FromStr for HAlign {
    type Err = DiagramError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim() {
            "left" => Ok(Self::Left),
            "center" | "centre" => Ok(Self::Center),
            "right" => Ok(Self::Right),
            other => Err(DiagramError::invalid("ha", format!("unknown alignment {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VAlign {
    Top,
    #[default]
    Center,
    Bottom,
    Baseline,
}

impl FromStr for VAlign {
    type Err = DiagramError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim() {
            "top" => Ok(Self::Top),
            "center" | "centre" => Ok(Self::Center),
            "bottom" => Ok(Self::Bottom),
            "baseline" => Ok(Self::Baseline),
            other => Err(DiagramError::invalid("va", format!("unknown alignment {other:?}"))),
        }
    }
}

/// Normalises plotting-style colour shorthands into something SVG accepts.
///
/// Single-letter names and grey levels (`"0.7"`) are expanded to hex;
/// `none`, hex and CSS colour names pass through.
pub fn normalize_color(raw: &str) -> Result<String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(DiagramError::invalid("color", "empty colour"));
    }
    if value.eq_ignore_ascii_case("none") {
        return Ok("none".to_string());
    }
    let short = match value {
        "k" => Some("#000000"),
        "w" => Some("#ffffff"),
        "r" => Some("#ff0000"),
        "g" => Some("#008000"),
        "b" => Some("#0000ff"),
        "c" => Some("#00bfbf"),
        "m" => Some("#bf00bf"),
        "y" => Some("#bfbf00"),
        _ => None,
    };
    if let Some(hex) = short {
        return Ok(hex.to_string());
    }
    if value.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        let level: f64 = value
            .parse()
            .map_err(|_| DiagramError::invalid("color", format!("invalid grey level {value:?}")))?;
        if !(0.0..=1.0).contains(&level) {
            return Err(DiagramError::invalid("color", format!("grey level {level} outside [0, 1]")));
        }
        let channel = (level * 255.0).round() as u8;
        return Ok(format!("#{channel:02x}{channel:02x}{channel:02x}"));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || "#(),.% ".contains(c);
    if !value.chars().all(allowed) {
        return Err(DiagramError::invalid("color", format!("malformed colour {value:?}")));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_rejects_duplicate_aliases() {
        let params = Params::new().with("ec", "none").with("edgecolor", "none");
        let err = params.resolve(&["ec", "edgecolor"]).unwrap_err();
        assert!(matches!(err, DiagramError::DuplicateAlias { ref keys } if keys == "ec, edgecolor"));
    }

    #[test]
    fn resolve_falls_back_to_default() {
        let params = Params::new().with("lw", 2.5);
        assert_eq!(params.number_or(&["lw", "linewidth"], 1.0).unwrap(), 2.5);
        assert_eq!(params.number_or(&["alpha"], 1.0).unwrap(), 1.0);
        assert_eq!(params.string_or(&["fc", "facecolor"], "w").unwrap(), "w");
    }

    #[test]
    fn resolve_does_not_consume_values() {
        let params = Params::new().with("facecolor", "red");
        assert_eq!(params.color_or(&["fc", "facecolor"], "w").unwrap(), "red");
        assert_eq!(params.color_or(&["fc", "facecolor"], "w").unwrap(), "red");
    }

    #[test]
    fn decoration_style_is_case_insensitive_and_strict() {
        assert_eq!(DecorationStyle::parse("observed", "Inner").unwrap(), DecorationStyle::Inner);
        let err = DecorationStyle::parse("alternate", "dotted").unwrap_err();
        assert!(matches!(err, DiagramError::UnknownDecorationStyle { kind: "alternate", .. }));
    }

    #[test]
    fn colors_expand_shorthands() {
        assert_eq!(normalize_color("k").unwrap(), "#000000");
        assert_eq!(normalize_color("0.7").unwrap(), "#b3b3b3");
        assert_eq!(normalize_color("None").unwrap(), "none");
        assert_eq!(normalize_color("#123abc").unwrap(), "#123abc");
        assert_eq!(normalize_color("steelblue").unwrap(), "steelblue");
        assert!(normalize_color("1.5").is_err());
        assert_eq!(normalize_color("rgb(10%, 20%, 30%)").unwrap(), "rgb(10%, 20%, 30%)");
    }

    #[test]
    fn colors_with_markup_are_rejected() {
        for bad in ["red\" onload=\"x", "<b>", "blue;", "red'"] {
            assert!(
                matches!(normalize_color(bad), Err(DiagramError::InvalidParam { ref key, .. }) if key == "color"),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn line_styles_parse_shorthand() {
        assert_eq!("--".parse::<LineStyle>().unwrap(), LineStyle::Dashed);
        assert_eq!("-".parse::<LineStyle>().unwrap(), LineStyle::Solid);
        assert!(LineStyle::Solid.dasharray(1.0).is_none());
        assert!("~".parse::<LineStyle>().is_err());
    }
}
