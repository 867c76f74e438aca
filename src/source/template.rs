use serde::{Deserialize, Serialize};
use std::fmt;

use crate::coord::TileIndex;

/// Placeholders every tile URL template has to carry.
pub const PLACEHOLDERS: [&str; 3] = ["{x}", "{y}", "{z}"];

/// Tile server URL with `{x}`, `{y}` and `{z}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UrlTemplate(String);

impl UrlTemplate {
    /// Hybrid satellite layer of the public Google tile endpoint.
    pub const DEFAULT: &'static str = "https://mts1.google.com/vt/lyrs=y&x={x}&y={y}&z={z}";

    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Substitute the tile index and zoom level into the template.
    pub fn render(&self, index: TileIndex, zoom: u32) -> String {
        self.0
            .replace("{x}", &index.x.to_string())
            .replace("{y}", &index.y.to_string())
            .replace("{z}", &zoom.to_string())
    }

    pub fn missing_placeholders(&self) -> Vec<&'static str> {
        PLACEHOLDERS
            .into_iter()
            .filter(|placeholder| !self.0.contains(placeholder))
            .collect()
    }

    pub fn has_http_scheme(&self) -> bool {
        self.0.starts_with("http://") || self.0.starts_with("https://")
    }
}

impl Default for UrlTemplate {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}

impl fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_default_template() {
        let url = UrlTemplate::default().render(TileIndex::new(836443, 542547), 20);
        assert_eq!(
            url,
            "https://mts1.google.com/vt/lyrs=y&x=836443&y=542547&z=20"
        );
    }

    #[test]
    fn test_render_path_style_template() {
        let template = UrlTemplate::new("http://127.0.0.1:9000/{z}/{x}/{y}.png");
        assert_eq!(
            template.render(TileIndex::new(3, 4), 5),
            "http://127.0.0.1:9000/5/3/4.png"
        );
    }

    #[test]
    fn test_missing_placeholders() {
        assert!(UrlTemplate::default().missing_placeholders().is_empty());

        let template = UrlTemplate::new("https://tiles.example.com/{z}/{x}.png");
        assert_eq!(template.missing_placeholders(), vec!["{y}"]);
    }

    #[test]
    fn test_scheme_detection() {
        assert!(UrlTemplate::default().has_http_scheme());
        assert!(!UrlTemplate::new("ftp://tiles/{x}/{y}/{z}").has_http_scheme());
    }
}
