//! Declarative style for the neighbourhood source and its two layers.
//!
//! Expressions are emitted in the Mapbox GL style-spec JSON form. The ramps
//! can also be evaluated locally, mirroring what the engine computes.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

pub const SOURCE_ID: &str = "neighbourhoods";
pub const FILL_LAYER_ID: &str = "neighbourhoods-layer";
pub const OUTLINE_LAYER_ID: &str = "neighbourhoods-outline";

/// Feature-state key toggled by the hover tracker.
pub const HOVER_STATE: &str = "hover";

#[derive(Debug, Error, PartialEq)]
pub enum StyleError {
    #[error("colour ramp needs at least one step")]
    EmptyRamp,
    #[error("ramp threshold {next} does not follow {prev}")]
    UnorderedThreshold { prev: f64, next: f64 },
    #[error("ramp threshold is not finite")]
    NonFiniteThreshold,
    #[error("empty colour in ramp")]
    EmptyColor,
    #[error("opacity ramp needs at least one zoom stop")]
    EmptyOpacity,
    #[error("opacity zoom stop is not finite")]
    NonFiniteZoom,
    #[error("opacity zoom stop {next} does not follow {prev}")]
    UnorderedZoom { prev: f64, next: f64 },
    #[error("opacity at zoom {zoom} must be within 0..=1 and lower when hovered")]
    InvalidOpacity { zoom: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RampStep {
    pub threshold: f64,
    pub color: String,
}

impl RampStep {
    pub fn new(threshold: f64, color: &str) -> Self {
        Self { threshold, color: color.to_string() }
    }
}

/// Stepped colour ramp: `base` below the first threshold, then the colour of
/// the highest threshold not above the value.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorRamp {
    base: String,
    steps: Vec<RampStep>,
}

impl ColorRamp {
    pub fn new(base: String, steps: Vec<RampStep>) -> Result<Self, StyleError> {
        if steps.is_empty() {
            return Err(StyleError::EmptyRamp);
        }
        if base.trim().is_empty() || steps.iter().any(|s| s.color.trim().is_empty()) {
            return Err(StyleError::EmptyColor);
        }
        if steps.iter().any(|s| !s.threshold.is_finite()) {
            return Err(StyleError::NonFiniteThreshold);
        }
        for pair in steps.windows(2) {
            if pair[1].threshold <= pair[0].threshold {
                return Err(StyleError::UnorderedThreshold {
                    prev: pair[0].threshold,
                    next: pair[1].threshold,
                });
            }
        }
        Ok(Self { base, steps })
    }

    /// All colours in ramp order, base first.
    pub fn colors(&self) -> Vec<&str> {
        std::iter::once(self.base.as_str())
            .chain(self.steps.iter().map(|s| s.color.as_str()))
            .collect()
    }

    pub fn color_for(&self, value: f64) -> &str {
        self.steps
            .iter()
            .rev()
            .find(|s| value >= s.threshold)
            .map(|s| s.color.as_str())
            .unwrap_or(self.base.as_str())
    }

    /// `["step", ["get", property], base, t1, c1, ...]`
    pub fn expression(&self, property: &str) -> Value {
        let mut expr = vec![json!("step"), json!(["get", property]), json!(self.base)];
        for step in &self.steps {
            expr.push(json!(step.threshold));
            expr.push(json!(step.color));
        }
        Value::Array(expr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpacityStop {
    pub zoom: f64,
    pub hovered: f64,
    pub unhovered: f64,
}

impl OpacityStop {
    pub const fn new(zoom: f64, hovered: f64, unhovered: f64) -> Self {
        Self { zoom, hovered, unhovered }
    }

    fn pick(&self, hovered: bool) -> f64 {
        if hovered { self.hovered } else { self.unhovered }
    }
}

/// Fill opacity as a function of zoom crossed with hover state.
#[derive(Debug, Clone, PartialEq)]
pub struct OpacityRamp {
    stops: Vec<OpacityStop>,
}

impl OpacityRamp {
    pub fn new(stops: Vec<OpacityStop>) -> Result<Self, StyleError> {
        if stops.is_empty() {
            return Err(StyleError::EmptyOpacity);
        }
        if stops.iter().any(|s| !s.zoom.is_finite()) {
            return Err(StyleError::NonFiniteZoom);
        }
        for pair in stops.windows(2) {
            if pair[1].zoom <= pair[0].zoom {
                return Err(StyleError::UnorderedZoom { prev: pair[0].zoom, next: pair[1].zoom });
            }
        }
        let in_range = |v: f64| (0.0..=1.0).contains(&v);
        if let Some(bad) = stops
            .iter()
            .find(|s| !in_range(s.hovered) || !in_range(s.unhovered) || s.hovered >= s.unhovered)
        {
            return Err(StyleError::InvalidOpacity { zoom: bad.zoom });
        }
        Ok(Self { stops })
    }

    pub fn opacity_at(&self, zoom: f64, hovered: bool) -> f64 {
        let first = &self.stops[0];
        let last = &self.stops[self.stops.len() - 1];
        if zoom <= first.zoom {
            return first.pick(hovered);
        }
        if zoom >= last.zoom {
            return last.pick(hovered);
        }
        for pair in self.stops.windows(2) {
            let (lo, hi) = (&pair[0], &pair[1]);
            if zoom <= hi.zoom {
                let t = (zoom - lo.zoom) / (hi.zoom - lo.zoom);
                return lo.pick(hovered) + t * (hi.pick(hovered) - lo.pick(hovered));
            }
        }
        last.pick(hovered)
    }

    /// `["interpolate", ["linear"], ["zoom"], z, ["case", hover, a, b], ...]`
    pub fn expression(&self) -> Value {
        let mut expr = vec![json!("interpolate"), json!(["linear"]), json!(["zoom"])];
        for stop in &self.stops {
            expr.push(json!(stop.zoom));
            expr.push(json!([
                "case",
                ["boolean", ["feature-state", HOVER_STATE], false],
                stop.hovered,
                stop.unhovered
            ]));
        }
        Value::Array(expr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Fill,
    Line,
}

/// One style layer, serialized as a style-spec layer object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: LayerKind,
    pub source: String,
    pub layout: Map<String, Value>,
    pub paint: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
}

impl LayerSpec {
    fn new(id: &str, kind: LayerKind, paint: Map<String, Value>) -> Self {
        Self {
            id: id.to_string(),
            kind,
            source: SOURCE_ID.to_string(),
            layout: Map::new(),
            paint,
            filter: None,
        }
    }
}

/// Style parameters for the neighbourhood layers, validated once at startup.
#[derive(Debug, Clone)]
pub struct NeighbourhoodStyle {
    pub value_property: String,
    pub ramp: ColorRamp,
    pub opacity: OpacityRamp,
    pub outline_color: String,
    pub outline_width: f64,
}

impl NeighbourhoodStyle {
    pub fn fill_layer(&self) -> LayerSpec {
        let mut paint = Map::new();
        paint.insert("fill-color".into(), self.ramp.expression(&self.value_property));
        paint.insert("fill-opacity".into(), self.opacity.expression());
        LayerSpec::new(FILL_LAYER_ID, LayerKind::Fill, paint)
    }

    pub fn outline_layer(&self) -> LayerSpec {
        let mut paint = Map::new();
        paint.insert("line-color".into(), json!(self.outline_color));
        paint.insert("line-width".into(), json!(self.outline_width));
        LayerSpec::new(OUTLINE_LAYER_ID, LayerKind::Line, paint)
    }

    /// Layers in draw order: fill below outline.
    pub fn layers(&self) -> [LayerSpec; 2] {
        [self.fill_layer(), self.outline_layer()]
    }
}

/// `["==", ["get", property], value]`
pub fn name_filter(property: &str, value: &str) -> Value {
    json!(["==", ["get", property], value])
}
