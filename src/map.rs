//! The slice of the map library the page drives, plus an in-memory map.
//!
//! `MapSurface` covers source registration, layers, feature-state, filters,
//! layout properties, the camera and the hover popup. `MapDocument` keeps all
//! of that as plain data so it can be served to the browser and inspected in
//! tests.

use std::collections::{BTreeMap, BTreeSet};

use geojson::FeatureCollection;
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::style::LayerSpec;
use crate::types::{FeatureId, LngLat};

#[derive(Debug, Error, PartialEq)]
pub enum MapError {
    #[error("source '{0}' already exists")]
    DuplicateSource(String),
    #[error("source '{0}' does not exist")]
    UnknownSource(String),
    #[error("layer '{0}' already exists")]
    DuplicateLayer(String),
    #[error("layer '{0}' does not exist")]
    UnknownLayer(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Camera {
    pub center: LngLat,
    pub zoom: f64,
}

/// Camera move request; `essential` animations run even with reduced motion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FlyTo {
    pub center: LngLat,
    pub zoom: f64,
    pub essential: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Popup {
    pub at: LngLat,
    pub html: String,
}

pub trait MapSurface {
    fn add_source(&mut self, id: &str, data: &FeatureCollection) -> Result<(), MapError>;
    fn add_layer(&mut self, layer: LayerSpec) -> Result<(), MapError>;
    fn set_feature_state(&mut self, source: &str, id: FeatureId, hover: bool) -> Result<(), MapError>;
    fn set_filter(&mut self, layer: &str, filter: Option<Value>) -> Result<(), MapError>;
    fn set_layout_property(&mut self, layer: &str, name: &str, value: Value) -> Result<(), MapError>;
    fn fly_to(&mut self, target: FlyTo);
    /// Shows the popup, replacing any content it already had.
    fn show_popup(&mut self, at: LngLat, html: &str);
    fn remove_popup(&mut self);
}

#[derive(Debug, Clone)]
pub struct MapDocument {
    sources: BTreeMap<String, FeatureCollection>,
    layers: Vec<LayerSpec>,
    hovered: BTreeMap<String, BTreeSet<FeatureId>>,
    camera: Camera,
    popup: Option<Popup>,
}

impl MapDocument {
    pub fn new(camera: Camera) -> Self {
        Self {
            sources: BTreeMap::new(),
            layers: Vec::new(),
            hovered: BTreeMap::new(),
            camera,
            popup: None,
        }
    }

    pub fn camera(&self) -> Camera {
        self.camera
    }

    pub fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }

    pub fn layer(&self, id: &str) -> Option<&LayerSpec> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn layers(&self) -> &[LayerSpec] {
        &self.layers
    }

    pub fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    /// Feature ids of `source` whose hover flag is currently true.
    pub fn hovered(&self, source: &str) -> Vec<FeatureId> {
        self.hovered
            .get(source)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn hover_state(&self, source: &str, id: FeatureId) -> bool {
        self.hovered.get(source).is_some_and(|ids| ids.contains(&id))
    }

    /// Style-spec JSON for the registered sources and layers.
    pub fn style(&self) -> Value {
        let sources: Map<String, Value> = self
            .sources
            .iter()
            .map(|(id, data)| (id.clone(), json!({ "type": "geojson", "data": data })))
            .collect();
        json!({
            "version": 8,
            "sources": sources,
            "layers": self.layers,
        })
    }

    fn layer_mut(&mut self, id: &str) -> Result<&mut LayerSpec, MapError> {
        self.layers
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| MapError::UnknownLayer(id.to_string()))
    }
}

impl MapSurface for MapDocument {
    fn add_source(&mut self, id: &str, data: &FeatureCollection) -> Result<(), MapError> {
        if self.sources.contains_key(id) {
            return Err(MapError::DuplicateSource(id.to_string()));
        }
        self.sources.insert(id.to_string(), data.clone());
        Ok(())
    }

    fn add_layer(&mut self, layer: LayerSpec) -> Result<(), MapError> {
        if !self.sources.contains_key(&layer.source) {
            return Err(MapError::UnknownSource(layer.source));
        }
        if self.layer(&layer.id).is_some() {
            return Err(MapError::DuplicateLayer(layer.id));
        }
        self.layers.push(layer);
        Ok(())
    }

    fn set_feature_state(&mut self, source: &str, id: FeatureId, hover: bool) -> Result<(), MapError> {
        if !self.sources.contains_key(source) {
            return Err(MapError::UnknownSource(source.to_string()));
        }
        let ids = self.hovered.entry(source.to_string()).or_default();
        if hover {
            ids.insert(id);
        } else {
            ids.remove(&id);
        }
        Ok(())
    }

    fn set_filter(&mut self, layer: &str, filter: Option<Value>) -> Result<(), MapError> {
        self.layer_mut(layer)?.filter = filter;
        Ok(())
    }

    fn set_layout_property(&mut self, layer: &str, name: &str, value: Value) -> Result<(), MapError> {
        self.layer_mut(layer)?.layout.insert(name.to_string(), value);
        Ok(())
    }

    fn fly_to(&mut self, target: FlyTo) {
        self.camera = Camera { center: target.center, zoom: target.zoom };
    }

    fn show_popup(&mut self, at: LngLat, html: &str) {
        self.popup = Some(Popup { at, html: html.to_string() });
    }

    fn remove_popup(&mut self) {
        self.popup = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StyleConfig;
    use crate::style::{FILL_LAYER_ID, SOURCE_ID};

    fn empty_collection() -> FeatureCollection {
        FeatureCollection { bbox: None, features: vec![], foreign_members: None }
    }

    fn map() -> MapDocument {
        MapDocument::new(Camera { center: LngLat::new(0.0, 0.0), zoom: 1.0 })
    }

    #[test]
    fn layers_need_their_source() {
        let style = StyleConfig::default().neighbourhood_style("CapPerc").unwrap();
        let mut map = map();
        assert_eq!(
            map.add_layer(style.fill_layer()),
            Err(MapError::UnknownSource(SOURCE_ID.to_string()))
        );
        map.add_source(SOURCE_ID, &empty_collection()).unwrap();
        map.add_layer(style.fill_layer()).unwrap();
        assert_eq!(
            map.add_layer(style.fill_layer()),
            Err(MapError::DuplicateLayer(FILL_LAYER_ID.to_string()))
        );
        assert_eq!(map.style()["layers"].as_array().unwrap().len(), 1);
        assert_eq!(map.style()["sources"][SOURCE_ID]["type"], json!("geojson"));
    }

    #[test]
    fn filters_and_layout_on_unknown_layer_fail() {
        let mut map = map();
        assert!(map.set_filter("nope", None).is_err());
        assert!(map.set_layout_property("nope", "visibility", json!("none")).is_err());
        assert!(map.set_feature_state("nope", 0, true).is_err());
    }

    #[test]
    fn popup_content_is_replaced() {
        let mut map = map();
        map.show_popup(LngLat::new(1.0, 2.0), "<strong>A</strong>");
        map.show_popup(LngLat::new(3.0, 4.0), "<strong>B</strong>");
        assert_eq!(
            map.popup(),
            Some(&Popup { at: LngLat::new(3.0, 4.0), html: "<strong>B</strong>".to_string() })
        );
        map.remove_popup();
        assert!(map.popup().is_none());
    }
}
