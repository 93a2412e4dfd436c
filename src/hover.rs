use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::map::{MapError, MapSurface};
use crate::style::SOURCE_ID;
use crate::types::{CentroidValue, FeatureId, LngLat};

/// A feature reported under the pointer, as delivered by the map's event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PointedFeature {
    pub id: FeatureId,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// Property names the hover popup reads.
#[derive(Debug, Clone)]
pub struct HoverProperties {
    pub name: String,
    pub centroid: String,
}

/// Owns the id of the neighbourhood under the pointer.
///
/// The map owns the boolean `hover` feature-state derived from it; at most
/// one feature carries it at any time.
#[derive(Debug, Default)]
pub struct HoverTracker {
    hovered: Option<FeatureId>,
}

impl HoverTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hovered(&self) -> Option<FeatureId> {
        self.hovered
    }

    pub fn on_pointer_move<M: MapSurface>(
        &mut self,
        map: &mut M,
        props: &HoverProperties,
        features: &[PointedFeature],
        pointer: LngLat,
    ) -> Result<(), MapError> {
        let Some(feature) = features.first() else {
            return Ok(());
        };

        if let Some(previous) = self.hovered.take() {
            map.set_feature_state(SOURCE_ID, previous, false)?;
        }
        map.set_feature_state(SOURCE_ID, feature.id, true)?;
        self.hovered = Some(feature.id);

        let at = feature
            .properties
            .get(&props.centroid)
            .and_then(CentroidValue::from_json)
            .and_then(|c| c.normalize())
            .unwrap_or_else(|| {
                debug!(id = feature.id, "centroid unavailable, using pointer location");
                pointer
            });
        let name = feature
            .properties
            .get(&props.name)
            .map(display_name)
            .unwrap_or_default();
        map.show_popup(at, &format!("<strong>{}</strong>", escape_html(&name)));
        Ok(())
    }

    pub fn on_pointer_leave<M: MapSurface>(&mut self, map: &mut M) -> Result<(), MapError> {
        if let Some(previous) = self.hovered.take() {
            map.set_feature_state(SOURCE_ID, previous, false)?;
        }
        map.remove_popup();
        Ok(())
    }
}

fn display_name(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Escapes the name before it goes into the popup's HTML, so names are shown
/// as text rather than interpreted as markup.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
