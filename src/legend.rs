use serde::Serialize;
use thiserror::Error;

use crate::page::PageSurface;
use crate::style::ColorRamp;

#[derive(Debug, Error, PartialEq)]
#[error("legend has {labels} labels but the colour ramp has {colors} colours")]
pub struct LegendError {
    pub labels: usize,
    pub colors: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: String,
}

/// Static colour key, one entry per ramp colour in ramp order.
#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    entries: Vec<LegendEntry>,
}

impl Legend {
    pub fn new(labels: &[String], ramp: &ColorRamp) -> Result<Self, LegendError> {
        let colors = ramp.colors();
        if labels.len() != colors.len() {
            return Err(LegendError { labels: labels.len(), colors: colors.len() });
        }
        let entries = labels
            .iter()
            .zip(colors)
            .map(|(label, color)| LegendEntry { label: label.clone(), color: color.to_string() })
            .collect();
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[LegendEntry] {
        &self.entries
    }

    /// Appends one swatch + label row per entry. Called once at startup.
    pub fn render<P: PageSurface>(&self, page: &mut P) {
        for entry in &self.entries {
            page.append_legend_row(entry);
        }
    }
}
