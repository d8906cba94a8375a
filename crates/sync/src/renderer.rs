//! Sky-map rendering capability.
//!
//! The map widget is provided by the host and initialises asynchronously,
//! so [`SkyRenderer::init`] resolves to whether it is usable. Drawing is
//! skipped entirely when it is not. [`SceneRecorder`] is a headless
//! implementation that keeps every draw call as data.

use std::future::Future;

use serde::Serialize;
use slitmask_core::geometry::Vertex;

pub const DEFAULT_SURVEY: &str = "P/DSS2/color";
/// Field of view in degrees.
pub const DEFAULT_FOV: f64 = 0.1;

/// Initial view of the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewOptions {
    pub survey: String,
    pub fov: f64,
    /// `"{ra} {dec}"` of the field centre.
    pub target: String,
}

impl ViewOptions {
    /// Default survey and field of view centred on `ra`/`dec`.
    pub fn centred_on(ra: &str, dec: &str) -> Self {
        Self {
            survey: DEFAULT_SURVEY.to_string(),
            fov: DEFAULT_FOV,
            target: format!("{ra} {dec}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayStyle {
    pub color: String,
    pub line_width: f64,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            color: "#ee2345".into(),
            line_width: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolygonStyle {
    pub stroke_color: String,
    pub fill_color: String,
    pub line_width: f64,
}

impl Default for PolygonStyle {
    fn default() -> Self {
        Self {
            stroke_color: "blue".into(),
            fill_color: "rgba(0,0,255,0.2)".into(),
            line_width: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelStyle {
    pub font_size: u32,
    pub color: String,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            font_size: 10,
            color: "#fff".into(),
        }
    }
}

/// Host-provided sky map.
pub trait SkyRenderer: Send {
    /// Wait for the widget to load. `false` means it is unavailable and no
    /// further calls should be made.
    fn init(&mut self) -> impl Future<Output = bool> + Send;

    fn create_view(&mut self, container: &str, options: &ViewOptions);

    /// Start the overlay that subsequent polygons are drawn on.
    fn add_overlay(&mut self, style: &OverlayStyle);

    fn add_polygon(&mut self, vertices: &[Vertex], style: &PolygonStyle);

    fn add_label(&mut self, ra: f64, dec: f64, text: &str, style: &LabelStyle);
}

/// One recorded renderer call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum DrawCall {
    Init,
    CreateView {
        container: String,
        options: ViewOptions,
    },
    AddOverlay {
        style: OverlayStyle,
    },
    AddPolygon {
        vertices: Vec<Vertex>,
        style: PolygonStyle,
    },
    AddLabel {
        ra: f64,
        dec: f64,
        text: String,
        style: LabelStyle,
    },
}

/// Renderer that records calls instead of drawing.
#[derive(Debug, Clone)]
pub struct SceneRecorder {
    available: bool,
    calls: Vec<DrawCall>,
}

impl SceneRecorder {
    pub fn new() -> Self {
        Self {
            available: true,
            calls: Vec::new(),
        }
    }

    /// A recorder whose `init` reports the widget as unavailable.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            calls: Vec::new(),
        }
    }

    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }
}

impl Default for SceneRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl SkyRenderer for SceneRecorder {
    async fn init(&mut self) -> bool {
        self.calls.push(DrawCall::Init);
        self.available
    }

    fn create_view(&mut self, container: &str, options: &ViewOptions) {
        self.calls.push(DrawCall::CreateView {
            container: container.to_string(),
            options: options.clone(),
        });
    }

    fn add_overlay(&mut self, style: &OverlayStyle) {
        self.calls.push(DrawCall::AddOverlay {
            style: style.clone(),
        });
    }

    fn add_polygon(&mut self, vertices: &[Vertex], style: &PolygonStyle) {
        self.calls.push(DrawCall::AddPolygon {
            vertices: vertices.to_vec(),
            style: style.clone(),
        });
    }

    fn add_label(&mut self, ra: f64, dec: f64, text: &str, style: &LabelStyle) {
        self.calls.push(DrawCall::AddLabel {
            ra,
            dec,
            text: text.to_string(),
            style: style.clone(),
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
