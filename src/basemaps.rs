//! Background base layers offered to map viewers.
//!
//! The list is built once from configuration when the runtime is
//! assembled and never mutated afterwards; a config reload produces a new
//! list alongside the new runtime.

use serde::Serialize;

use crate::config::{BasemapConfig, MapTypeConfig};

/// Viewer plugin type for Google layers.
pub const GOOGLE_SOURCE_PTYPE: &str = "gxp_googlesource";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerSource {
    pub ptype: String,
    #[serde(rename = "apiKey")]
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BaseLayer {
    pub source: LayerSource,
    pub name: String,
    pub fixed: bool,
    pub visibility: bool,
    pub group: String,
}

/// Google layers for every enabled map type, in a fixed order.
///
/// Without an API key there are no Google layers.
pub fn google_base_layers(config: &BasemapConfig) -> Vec<BaseLayer> {
    let Some(api_key) = config.google_api_key.as_deref().filter(|k| !k.is_empty()) else {
        return Vec::new();
    };

    let maps: [(&str, MapTypeConfig); 4] = [
        ("HYBRID", config.google.hybrid),
        ("ROADMAP", config.google.roadmap),
        ("SATELLITE", config.google.satellite),
        ("TERRAIN", config.google.terrain),
    ];

    maps.into_iter()
        .filter(|(_, map)| map.enabled)
        .map(|(name, map)| BaseLayer {
            source: LayerSource {
                ptype: GOOGLE_SOURCE_PTYPE.to_string(),
                api_key: api_key.to_string(),
            },
            name: name.to_string(),
            fixed: true,
            visibility: map.visibility,
            group: "background".to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key() -> BasemapConfig {
        BasemapConfig {
            google_api_key: Some("abc123".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_all_map_types_enabled_by_default() {
        let names: Vec<_> = google_base_layers(&config_with_key())
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, vec!["HYBRID", "ROADMAP", "SATELLITE", "TERRAIN"]);
    }

    #[test]
    fn test_disabled_map_types_are_skipped() {
        let mut config = config_with_key();
        config.google.satellite.enabled = false;
        config.google.roadmap.visibility = true;

        let layers = google_base_layers(&config);
        assert_eq!(layers.len(), 3);
        assert!(layers.iter().all(|l| l.name != "SATELLITE"));
        assert!(layers.iter().find(|l| l.name == "ROADMAP").unwrap().visibility);
    }

    #[test]
    fn test_no_key_no_layers() {
        assert!(google_base_layers(&BasemapConfig::default()).is_empty());
    }

    #[test]
    fn test_serialized_shape() {
        let layer = google_base_layers(&config_with_key()).remove(0);
        let json = serde_json::to_value(&layer).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "source": {"ptype": "gxp_googlesource", "apiKey": "abc123"},
                "name": "HYBRID",
                "fixed": true,
                "visibility": false,
                "group": "background"
            })
        );
    }
}
