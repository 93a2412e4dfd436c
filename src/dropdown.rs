use geojson::FeatureCollection;
use serde_json::Value;

use crate::page::PageSurface;

#[derive(Debug, Clone, PartialEq)]
pub enum DropdownOptions {
    /// No data; the dropdown container is hidden.
    Hidden,
    Names(Vec<String>),
}

/// Builds the neighbourhood options from the loaded collection.
///
/// Features without a usable name are skipped. Names are sorted by raw
/// UTF-16 code units with no locale handling; repeated names stay unless
/// `dedupe` is set.
pub fn build_options(
    collection: Option<&FeatureCollection>,
    name_property: &str,
    dedupe: bool,
) -> DropdownOptions {
    let collection = match collection {
        Some(fc) if !fc.features.is_empty() => fc,
        _ => return DropdownOptions::Hidden,
    };

    let mut names: Vec<String> = collection
        .features
        .iter()
        .filter_map(|feature| feature.property(name_property))
        .filter_map(option_label)
        .collect();
    // UTF-16 code unit order, as the browser sorts strings
    names.sort_by(|a, b| a.encode_utf16().cmp(b.encode_utf16()));
    if dedupe {
        names.dedup();
    }
    DropdownOptions::Names(names)
}

fn option_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

impl DropdownOptions {
    pub fn apply<P: PageSurface>(&self, page: &mut P) {
        match self {
            DropdownOptions::Hidden => page.set_dropdown_visible(false),
            DropdownOptions::Names(names) => {
                for name in names {
                    page.append_option(name);
                }
            }
        }
    }
}
