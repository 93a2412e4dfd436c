use anyhow::{anyhow, Context, Result};
use geojson::feature::Id;
use geojson::{FeatureCollection, GeoJson};
use std::path::PathBuf;
use tracing::{error, info};

/// Where the neighbourhood boundaries come from.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Url(String),
    File(PathBuf),
}

impl DataSource {
    pub fn parse(source: &str) -> Self {
        if source.starts_with("http://") || source.starts_with("https://") {
            DataSource::Url(source.to_string())
        } else {
            DataSource::File(PathBuf::from(source))
        }
    }
}

/// Loads the neighbourhood collection once.
///
/// Any failure is logged and turned into `None` so the page can degrade
/// instead of failing. There is no timeout and no retry.
pub async fn load_neighbourhoods(client: &reqwest::Client, source: &DataSource) -> Option<FeatureCollection> {
    match fetch_collection(client, source).await {
        Ok(collection) => {
            info!(features = collection.features.len(), ?source, "Loaded neighbourhoods");
            Some(collection)
        }
        Err(e) => {
            error!(error = ?e, ?source, "Error loading neighbourhoods");
            None
        }
    }
}

async fn fetch_collection(client: &reqwest::Client, source: &DataSource) -> Result<FeatureCollection> {
    let body = match source {
        DataSource::Url(url) => {
            let response = client
                .get(url)
                .send()
                .await
                .with_context(|| format!("Failed to fetch {}", url))?;
            let status = response.status();
            if !status.is_success() {
                return Err(anyhow!("Response was not ok loading json data: {}", status));
            }
            response.text().await.context("Failed to read response body")?
        }
        DataSource::File(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to open GeoJSON file: {:?}", path))?,
    };

    let mut collection = parse_collection(&body)?;
    assign_feature_ids(&mut collection);
    Ok(collection)
}

fn parse_collection(body: &str) -> Result<FeatureCollection> {
    let geojson: GeoJson = body.parse().context("Failed to parse GeoJSON")?;
    match geojson {
        GeoJson::FeatureCollection(fc) => Ok(fc),
        _ => Err(anyhow!("GeoJSON must be a FeatureCollection")),
    }
}

/// Numbers features by position so the map can track per-feature state.
pub fn assign_feature_ids(collection: &mut FeatureCollection) {
    for (index, feature) in collection.features.iter_mut().enumerate() {
        feature.id = Some(Id::Number((index as u64).into()));
    }
}
