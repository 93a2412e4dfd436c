//! The DOM surface the map page exposes: the neighbourhood dropdown and the legend.

use serde::Serialize;

use crate::legend::LegendEntry;

/// Value of the dropdown option that clears the neighbourhood filter.
pub const ALL_NEIGHBOURHOODS: &str = "All";

pub trait PageSurface {
    fn set_dropdown_visible(&mut self, visible: bool);
    fn append_option(&mut self, value: &str);
    fn append_legend_row(&mut self, entry: &LegendEntry);
    fn set_legend_visible(&mut self, visible: bool);
}

/// In-memory page state, mirrored by the browser through the HTTP API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageDocument {
    pub dropdown_visible: bool,
    pub options: Vec<String>,
    pub legend_visible: bool,
    pub legend_rows: Vec<LegendEntry>,
}

impl PageDocument {
    pub fn new() -> Self {
        Self {
            dropdown_visible: true,
            options: vec![ALL_NEIGHBOURHOODS.to_string()],
            legend_visible: true,
            legend_rows: Vec::new(),
        }
    }
}

impl Default for PageDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl PageSurface for PageDocument {
    fn set_dropdown_visible(&mut self, visible: bool) {
        self.dropdown_visible = visible;
    }

    fn append_option(&mut self, value: &str) {
        self.options.push(value.to_string());
    }

    fn append_legend_row(&mut self, entry: &LegendEntry) {
        self.legend_rows.push(entry.clone());
    }

    fn set_legend_visible(&mut self, visible: bool) {
        self.legend_visible = visible;
    }
}
