//! UI event -> map/page call translations.

use serde::Deserialize;
use serde_json::json;

use crate::hover::PointedFeature;
use crate::map::{FlyTo, MapError, MapSurface};
use crate::page::{PageSurface, ALL_NEIGHBOURHOODS};
use crate::style::{name_filter, FILL_LAYER_ID, OUTLINE_LAYER_ID};
use crate::types::LngLat;

/// Both neighbourhood layers; filters and visibility always apply to the pair.
pub const NEIGHBOURHOOD_LAYERS: [&str; 2] = [FILL_LAYER_ID, OUTLINE_LAYER_ID];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiEvent {
    /// `features` is what the map reported under the pointer; when absent the
    /// session resolves it from its own index.
    PointerMove {
        lng_lat: LngLat,
        #[serde(default)]
        features: Option<Vec<PointedFeature>>,
    },
    PointerLeave,
    ResetView,
    LegendToggled { checked: bool },
    LayerToggled { checked: bool },
    NeighbourhoodSelected { value: String },
}

pub fn reset_view<M: MapSurface>(map: &mut M, center: LngLat, zoom: f64) {
    map.fly_to(FlyTo { center, zoom, essential: true });
}

pub fn toggle_legend<P: PageSurface>(page: &mut P, checked: bool) {
    page.set_legend_visible(checked);
}

pub fn toggle_layers<M: MapSurface>(map: &mut M, checked: bool) -> Result<(), MapError> {
    let visibility = if checked { "visible" } else { "none" };
    for layer in NEIGHBOURHOOD_LAYERS {
        map.set_layout_property(layer, "visibility", json!(visibility))?;
    }
    Ok(())
}

pub fn select_neighbourhood<M: MapSurface>(
    map: &mut M,
    name_property: &str,
    value: &str,
) -> Result<(), MapError> {
    let filter = if value == ALL_NEIGHBOURHOODS {
        None
    } else {
        Some(name_filter(name_property, value))
    };
    for layer in NEIGHBOURHOOD_LAYERS {
        map.set_filter(layer, filter.clone())?;
    }
    Ok(())
}
