//! Kroki diagram rendering over HTTP.
//!
//! Each request is a blocking `POST {server}/{endpoint}/svg` with the
//! diagram source as a plain-text body. Kroki only draws nomnoml as SVG,
//! so raster requests are rasterized locally onto the request canvas.
//! The agent is shared across the rayon pool, so one connection pool
//! serves all diagrams of an export.

use std::time::Duration;

use ureq::Agent;

use crate::canvas::Canvas;
use crate::consts::{DEFAULT_KROKI_URL, DEFAULT_TIMEOUT};
use crate::dialect::DiagramFormat;
use crate::raster::rasterize_svg;
use crate::renderer::{DiagramError, DiagramErrorKind, DiagramRenderer, DiagramRequest};

/// Create HTTP agent with the specified timeout.
///
/// Status codes are not turned into errors so the response body can be
/// read for Kroki's error message.
pub fn create_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// [`DiagramRenderer`] backed by a Kroki server.
pub struct KrokiRenderer {
    server_url: String,
    agent: Agent,
}

impl Default for KrokiRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_KROKI_URL)
    }
}

impl KrokiRenderer {
    /// Create a renderer for the given Kroki server URL.
    #[must_use]
    pub fn new(server_url: impl Into<String>) -> Self {
        let server_url: String = server_url.into();
        Self {
            server_url: server_url.trim_end_matches('/').to_owned(),
            agent: create_agent(DEFAULT_TIMEOUT),
        }
    }

    /// Set HTTP timeout for Kroki requests.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.agent = create_agent(timeout);
        self
    }

    /// Server URL without trailing slash.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn endpoint_url(&self, request: &DiagramRequest) -> String {
        format!(
            "{}/{}/{}",
            self.server_url,
            request.dialect.kroki_endpoint(),
            DiagramFormat::Svg.as_str()
        )
    }

    fn fetch_svg(&self, request: &DiagramRequest) -> Result<Vec<u8>, DiagramError> {
        let url = self.endpoint_url(request);
        let response = self
            .agent
            .post(&url)
            .header("Content-Type", "text/plain")
            .send(request.source.as_bytes())
            .map_err(|e| DiagramError::new(request.index, DiagramErrorKind::Http(e.to_string())))?;

        let status = response.status().as_u16();
        let mut body = response.into_body();

        if status >= 400 {
            let error_body = body
                .read_to_string()
                .unwrap_or_else(|_| String::from("(unable to read error body)"));
            return Err(DiagramError::new(
                request.index,
                DiagramErrorKind::Http(format!("HTTP {status}: {}", error_body.trim())),
            ));
        }

        body.read_to_vec()
            .map_err(|e| DiagramError::new(request.index, DiagramErrorKind::Io(e.to_string())))
    }
}

impl DiagramRenderer for KrokiRenderer {
    fn render(&self, request: &DiagramRequest) -> Result<Vec<u8>, DiagramError> {
        let svg = self.fetch_svg(request)?;
        match request.format {
            DiagramFormat::Svg => Ok(svg),
            DiagramFormat::Png => {
                let canvas = request
                    .canvas
                    .unwrap_or_else(|| Canvas::for_source(&request.source));
                tracing::debug!(
                    index = request.index,
                    width = canvas.width,
                    height = canvas.height,
                    "Rasterizing diagram"
                );
                rasterize_svg(&svg, canvas).map_err(|kind| DiagramError::new(request.index, kind))
            }
        }
    }
}
