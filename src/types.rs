use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Session-local feature key, the position of the feature in the loaded collection.
pub type FeatureId = u64;

/// A map location as `[lng, lat]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

impl From<[f64; 2]> for LngLat {
    fn from([lng, lat]: [f64; 2]) -> Self {
        Self { lng, lat }
    }
}

impl From<LngLat> for [f64; 2] {
    fn from(value: LngLat) -> Self {
        [value.lng, value.lat]
    }
}

/// Centroid property as it arrives in pointer event payloads.
///
/// The rendering engine stringifies array properties inside event handlers,
/// so the same property may show up either as `[-79.4, 43.7]` or as the
/// string `"[-79.4,43.7]"`. Both forms accept whatever the map takes as a
/// location: `[lng, lat]`, `[lng, lat, alt]`, or `{lng|lon, lat}`.
#[derive(Debug, Clone, PartialEq)]
pub enum CentroidValue {
    Structured(LngLat),
    Raw(String),
}

impl CentroidValue {
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(raw) => Some(CentroidValue::Raw(raw.clone())),
            other => lng_lat_from_json(other).map(CentroidValue::Structured),
        }
    }

    /// Resolves the centroid to a location, `None` when it cannot be parsed.
    pub fn normalize(&self) -> Option<LngLat> {
        match self {
            CentroidValue::Structured(at) => Some(*at),
            CentroidValue::Raw(raw) => serde_json::from_str::<Value>(raw.trim())
                .ok()
                .as_ref()
                .and_then(lng_lat_from_json),
        }
    }
}

fn lng_lat_from_json(value: &Value) -> Option<LngLat> {
    match value {
        Value::Array(items) if items.len() == 2 || items.len() == 3 => {
            Some(LngLat::new(items[0].as_f64()?, items[1].as_f64()?))
        }
        Value::Object(fields) => {
            let lng = fields.get("lng").or_else(|| fields.get("lon"))?.as_f64()?;
            let lat = fields.get("lat")?.as_f64()?;
            Some(LngLat::new(lng, lat))
        }
        _ => None,
    }
}
