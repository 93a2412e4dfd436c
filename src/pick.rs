use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::contains::Contains;
use geo::{MultiPolygon, Point};
use geojson::feature::Id;
use geojson::FeatureCollection;
use rstar::{RTree, RTreeObject, AABB};
use tracing::warn;

use crate::hover::PointedFeature;
use crate::types::{FeatureId, LngLat};

struct AreaIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for AreaIndex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

struct Area {
    id: FeatureId,
    geometry: MultiPolygon<f64>,
    properties: serde_json::Map<String, serde_json::Value>,
}

/// Answers "which neighbourhoods are under this point".
pub struct NeighbourhoodIndex {
    areas: Vec<Area>,
    tree: RTree<AreaIndex>,
}

impl NeighbourhoodIndex {
    /// Indexes polygonal features that carry a numeric id; others are skipped.
    pub fn build(collection: &FeatureCollection) -> Self {
        let mut areas = Vec::new();
        for feature in &collection.features {
            let id = match &feature.id {
                Some(Id::Number(n)) => match n.as_u64() {
                    Some(id) => id,
                    None => continue,
                },
                _ => continue,
            };
            let Some(geometry) = &feature.geometry else { continue };
            let geometry: geo::Geometry<f64> = match geometry.value.clone().try_into() {
                Ok(g) => g,
                Err(e) => {
                    warn!(id, error = ?e, "Skipping feature with unconvertible geometry");
                    continue;
                }
            };
            let geometry = match geometry {
                geo::Geometry::MultiPolygon(mp) => mp,
                geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                _ => continue,
            };
            areas.push(Area {
                id,
                geometry,
                properties: feature.properties.clone().unwrap_or_default(),
            });
        }

        let tree_items = areas
            .iter()
            .enumerate()
            .filter_map(|(i, area)| {
                let rect = area.geometry.bounding_rect()?;
                Some(AreaIndex {
                    index: i,
                    aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
                })
            })
            .collect();

        Self { areas, tree: RTree::bulk_load(tree_items) }
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    /// Features containing `at`, in collection order.
    pub fn features_at(&self, at: LngLat) -> Vec<PointedFeature> {
        let point = Point::new(at.lng, at.lat);
        let envelope = AABB::from_point([at.lng, at.lat]);
        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|candidate| candidate.index)
            .filter(|&i| self.areas[i].geometry.contains(&point))
            .collect();
        hits.sort_unstable();
        hits.into_iter()
            .map(|i| PointedFeature {
                id: self.areas[i].id,
                properties: self.areas[i].properties.clone(),
            })
            .collect()
    }
}
