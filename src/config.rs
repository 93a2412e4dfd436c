use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{Context, Result};

use crate::legend::Legend;
use crate::style::{ColorRamp, NeighbourhoodStyle, OpacityRamp, OpacityStop, RampStep};
use crate::types::LngLat;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub view: ViewConfig,
    pub geocoder: GeocoderConfig,
    pub style: StyleConfig,
    pub dropdown: DropdownConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    /// HTTP(S) URL or local path of the neighbourhood FeatureCollection.
    pub source: String,
    pub name_property: String,
    pub value_property: String,
    pub centroid_property: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            source: "https://jfrench12.github.io/GGR472-Lab3/NeighbourhoodsWithCentroids.geojson".to_string(),
            name_property: "AREA_NA7".to_string(),
            value_property: "CapPerc".to_string(),
            centroid_property: "centroid".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ViewConfig {
    pub center: LngLat,
    pub zoom: f64,
    pub style_url: String,
    pub access_token: Option<String>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            center: LngLat::new(-79.35, 43.7),
            zoom: 11.0,
            style_url: "mapbox://styles/jfrench5/cm6vcs0z1002m01s3cfz02880".to_string(),
            access_token: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeocoderConfig {
    pub countries: String,
    /// [min_lng, min_lat, max_lng, max_lat]
    pub bbox: [f64; 4],
    pub proximity: LngLat,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            countries: "ca".to_string(),
            bbox: [-79.6393, 43.6511, -79.1166, 43.8554],
            proximity: LngLat::new(-79.3832, 43.6532),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StyleConfig {
    pub base_color: String,
    pub steps: Vec<RampStep>,
    pub opacity: Vec<OpacityStop>,
    pub outline_color: String,
    pub outline_width: f64,
    pub legend_labels: Vec<String>,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            base_color: "#deecfb".to_string(),
            steps: vec![
                RampStep::new(0.0001, "#bedaf7"),
                RampStep::new(1.540001, "#7ab3ef"),
                RampStep::new(3.990001, "#368ce7"),
            ],
            opacity: vec![
                OpacityStop::new(10.0, 0.5, 0.7),
                OpacityStop::new(12.0, 0.3, 0.5),
                OpacityStop::new(14.0, 0.1, 0.2),
                OpacityStop::new(16.0, 0.05, 0.1),
            ],
            outline_color: "#000000".to_string(),
            outline_width: 1.0,
            legend_labels: ["0", "0-1.54", "1.55-3.99", "4-24.66"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl StyleConfig {
    pub fn color_ramp(&self) -> Result<ColorRamp> {
        ColorRamp::new(self.base_color.clone(), self.steps.clone())
            .context("Invalid fill colour ramp")
    }

    pub fn opacity_ramp(&self) -> Result<OpacityRamp> {
        OpacityRamp::new(self.opacity.clone()).context("Invalid fill opacity stops")
    }

    pub fn neighbourhood_style(&self, value_property: &str) -> Result<NeighbourhoodStyle> {
        Ok(NeighbourhoodStyle {
            value_property: value_property.to_string(),
            ramp: self.color_ramp()?,
            opacity: self.opacity_ramp()?,
            outline_color: self.outline_color.clone(),
            outline_width: self.outline_width,
        })
    }

    pub fn legend(&self) -> Result<Legend> {
        let ramp = self.color_ramp()?;
        Legend::new(&self.legend_labels, &ramp).context("Invalid legend labels")
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct DropdownConfig {
    /// Drop repeated neighbourhood names from the options.
    pub dedupe: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            static_dir: PathBuf::from("static"),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` when given, otherwise falls back to the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.style.opacity_ramp()?;
        // legend() validates the colour ramp as well
        self.style.legend()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.view.center, LngLat::new(-79.35, 43.7));
        assert_eq!(config.view.zoom, 11.0);
        assert_eq!(config.input.name_property, "AREA_NA7");
    }

    #[test]
    fn default_static_dir_ships_the_page() {
        let config = AppConfig::default();
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join(&config.server.static_dir);
        assert!(dir.join("index.html").is_file());
        assert!(dir.join("app.js").is_file());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r##"
            [input]
            source = "data/neighbourhoods.geojson"

            [server]
            port = 8080
            "##,
        )
        .unwrap();
        assert_eq!(config.input.source, "data/neighbourhoods.geojson");
        assert_eq!(config.input.value_property, "CapPerc");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.style.steps.len(), 3);
        config.validate().unwrap();
    }

    #[test]
    fn rejects_legend_length_mismatch() {
        let mut config = AppConfig::default();
        config.style.legend_labels.pop();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_unordered_steps() {
        let config: AppConfig = toml::from_str(
            r##"
            [style]
            steps = [
                { threshold = 2.0, color = "#111111" },
                { threshold = 1.0, color = "#222222" },
            ]
            legend_labels = ["a", "b", "c"]
            "##,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[view]\nzoom = 12.5\n").unwrap();
        let config = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(config.view.zoom, 12.5);
        assert!(AppConfig::load_from_file(&dir.path().join("missing.toml")).is_err());
    }
}
