//! Internal constants for diagram rendering.

use std::time::Duration;

/// Default HTTP timeout for Kroki requests (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Public Kroki instance used when no server is configured.
pub const DEFAULT_KROKI_URL: &str = "https://kroki.io";

/// Directory name for raster diagrams, relative to the document.
pub const DEFAULT_DIAGRAMS_DIR: &str = "diagrams";
