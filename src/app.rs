use std::future::Future;

use anyhow::Result;
use geojson::FeatureCollection;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::controls::{self, UiEvent};
use crate::dropdown::build_options;
use crate::hover::{HoverProperties, HoverTracker};
use crate::map::MapSurface;
use crate::page::PageSurface;
use crate::pick::NeighbourhoodIndex;
use crate::style::SOURCE_ID;
use crate::types::FeatureId;

/// One page session: the map, the page, and the hover state that links them.
pub struct Session<M, P> {
    pub map: M,
    pub page: P,
    config: AppConfig,
    hover: HoverTracker,
    hover_props: HoverProperties,
    index: Option<NeighbourhoodIndex>,
}

impl<M: MapSurface, P: PageSurface> Session<M, P> {
    /// Waits for both the data load and the map to be ready, then builds the
    /// dropdown, legend and (when data loaded) the neighbourhood layers.
    pub async fn start<L, R>(config: AppConfig, mut map: M, mut page: P, load: L, map_ready: R) -> Result<Self>
    where
        L: Future<Output = Option<FeatureCollection>>,
        R: Future<Output = ()>,
    {
        let style = config.style.neighbourhood_style(&config.input.value_property)?;
        let legend = config.style.legend()?;
        legend.render(&mut page);

        let (collection, ()) = tokio::join!(load, map_ready);

        build_options(collection.as_ref(), &config.input.name_property, config.dropdown.dedupe)
            .apply(&mut page);

        let index = match &collection {
            Some(collection) => {
                map.add_source(SOURCE_ID, collection)?;
                for layer in style.layers() {
                    map.add_layer(layer)?;
                }
                let index = NeighbourhoodIndex::build(collection);
                info!(indexed = index.len(), "Neighbourhood layers added");
                Some(index)
            }
            None => {
                warn!("No neighbourhood data; skipping layers");
                None
            }
        };

        let hover_props = HoverProperties {
            name: config.input.name_property.clone(),
            centroid: config.input.centroid_property.clone(),
        };
        Ok(Self { map, page, config, hover: HoverTracker::new(), hover_props, index })
    }

    pub fn has_data(&self) -> bool {
        self.index.is_some()
    }

    pub fn hovered(&self) -> Option<FeatureId> {
        self.hover.hovered()
    }

    pub fn index(&self) -> Option<&NeighbourhoodIndex> {
        self.index.as_ref()
    }

    pub fn handle(&mut self, event: UiEvent) -> Result<()> {
        match event {
            UiEvent::PointerMove { lng_lat, features } => {
                if self.index.is_none() {
                    return Ok(());
                }
                let features = match features {
                    Some(features) => features,
                    None => self.index.as_ref().map(|i| i.features_at(lng_lat)).unwrap_or_default(),
                };
                self.hover.on_pointer_move(&mut self.map, &self.hover_props, &features, lng_lat)?;
            }
            UiEvent::PointerLeave => {
                if self.index.is_some() {
                    self.hover.on_pointer_leave(&mut self.map)?;
                }
            }
            UiEvent::ResetView => {
                controls::reset_view(&mut self.map, self.config.view.center, self.config.view.zoom);
            }
            UiEvent::LegendToggled { checked } => controls::toggle_legend(&mut self.page, checked),
            // layer controls have nothing to act on when the data never loaded
            UiEvent::LayerToggled { .. } | UiEvent::NeighbourhoodSelected { .. } if self.index.is_none() => {}
            UiEvent::LayerToggled { checked } => controls::toggle_layers(&mut self.map, checked)?,
            UiEvent::NeighbourhoodSelected { value } => {
                controls::select_neighbourhood(&mut self.map, &self.config.input.name_property, &value)?
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::NEIGHBOURHOOD_LAYERS;
    use crate::data::assign_feature_ids;
    use crate::map::{Camera, MapDocument};
    use crate::page::PageDocument;
    use crate::types::LngLat;
    use serde_json::json;

    fn collection() -> FeatureCollection {
        let square = |x0: f64, name: &str, centroid: serde_json::Value| {
            json!({
                "type": "Feature",
                "properties": { "AREA_NA7": name, "CapPerc": 2.0, "centroid": centroid },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[x0, 43.6], [x0 + 0.1, 43.6], [x0 + 0.1, 43.7], [x0, 43.7], [x0, 43.6]]]
                }
            })
        };
        let mut fc: FeatureCollection = serde_json::from_value(json!({
            "type": "FeatureCollection",
            "features": [
                square(-79.5, "West Hill", json!([-79.45, 43.65])),
                square(-79.4, "Annex", json!("[-79.35,43.65]")),
            ]
        }))
        .unwrap();
        assign_feature_ids(&mut fc);
        fc
    }

    async fn session(data: Option<FeatureCollection>) -> Session<MapDocument, PageDocument> {
        let config = AppConfig::default();
        let map = MapDocument::new(Camera { center: config.view.center, zoom: config.view.zoom });
        Session::start(config, map, PageDocument::new(), async move { data }, async {})
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn failed_load_hides_dropdown_and_skips_layers() {
        let session = session(None).await;
        assert!(!session.page.dropdown_visible);
        assert!(session.map.layers().is_empty());
        assert!(!session.map.has_source(SOURCE_ID));
        assert_eq!(session.page.legend_rows.len(), 4);
        assert!(!session.has_data());
    }

    #[tokio::test]
    async fn successful_load_builds_everything() {
        let session = session(Some(collection())).await;
        assert!(session.page.dropdown_visible);
        assert_eq!(session.page.options, vec!["All", "Annex", "West Hill"]);
        let ids: Vec<_> = session.map.layers().iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, NEIGHBOURHOOD_LAYERS.to_vec());
        assert_eq!(session.index().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn pointer_moves_resolve_through_index() {
        let mut session = session(Some(collection())).await;
        session
            .handle(UiEvent::PointerMove { lng_lat: LngLat::new(-79.45, 43.62), features: None })
            .unwrap();
        assert_eq!(session.map.hovered(SOURCE_ID), vec![0]);
        assert_eq!(session.map.popup().unwrap().at, LngLat::new(-79.45, 43.65));

        session
            .handle(UiEvent::PointerMove { lng_lat: LngLat::new(-79.32, 43.62), features: None })
            .unwrap();
        assert_eq!(session.map.hovered(SOURCE_ID), vec![1]);
        assert_eq!(session.map.popup().unwrap().at, LngLat::new(-79.35, 43.65));
        assert_eq!(session.map.popup().unwrap().html, "<strong>Annex</strong>");

        // off every polygon: no features under the pointer, nothing changes
        session
            .handle(UiEvent::PointerMove { lng_lat: LngLat::new(-80.0, 44.0), features: None })
            .unwrap();
        assert_eq!(session.hovered(), Some(1));

        session.handle(UiEvent::PointerLeave).unwrap();
        assert!(session.map.hovered(SOURCE_ID).is_empty());
        assert!(session.map.popup().is_none());
    }

    #[tokio::test]
    async fn controls_route_to_map_and_page() {
        let mut session = session(Some(collection())).await;
        session.handle(UiEvent::NeighbourhoodSelected { value: "Annex".into() }).unwrap();
        session.handle(UiEvent::NeighbourhoodSelected { value: "All".into() }).unwrap();
        for layer in NEIGHBOURHOOD_LAYERS {
            assert_eq!(session.map.layer(layer).unwrap().filter, None);
        }

        session.handle(UiEvent::LayerToggled { checked: false }).unwrap();
        session.handle(UiEvent::LegendToggled { checked: false }).unwrap();
        assert!(!session.page.legend_visible);

        session.map.fly_to(crate::map::FlyTo { center: LngLat::new(0.0, 0.0), zoom: 3.0, essential: true });
        session.handle(UiEvent::ResetView).unwrap();
        assert_eq!(session.map.camera(), Camera { center: LngLat::new(-79.35, 43.7), zoom: 11.0 });
    }

    #[tokio::test]
    async fn hover_is_a_no_op_without_data() {
        let mut session = session(None).await;
        session
            .handle(UiEvent::PointerMove { lng_lat: LngLat::new(-79.45, 43.62), features: None })
            .unwrap();
        session.handle(UiEvent::PointerLeave).unwrap();
        assert!(session.map.popup().is_none());
        session.handle(UiEvent::LayerToggled { checked: false }).unwrap();
        session.handle(UiEvent::NeighbourhoodSelected { value: "Annex".into() }).unwrap();
    }
}
