//! Session configuration.
//!
//! ```json
//! { "canvas": { "width": 4000, "height": 2500 }, "export_timeout_ms": 5000 }
//! ```
//!
//! Every field is optional; missing ones take their defaults.

use crate::viewport::ViewportSize;
use mm_core::layout::LayoutConfig;
use mm_core::model::Canvas;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub canvas: Canvas,
    pub viewport_size: ViewportSize,
    pub layout: LayoutConfig,
    pub export_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            canvas: Canvas::default(),
            viewport_size: ViewportSize::default(),
            layout: LayoutConfig::default(),
            export_timeout_ms: 10_000,
        }
    }
}

impl SessionConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn export_timeout(&self) -> Duration {
        Duration::from_millis(self.export_timeout_ms)
    }
}
