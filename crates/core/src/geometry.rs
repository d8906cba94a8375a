//! Slit footprint geometry for sky overlays.
//!
//! Footprints are built on a flat tangent plane centred on the slit: the
//! rectangle is rotated in degree space and translated to the slit centre.
//! RA is not compressed by `cos(dec)`, so shapes are only faithful close
//! to the mask centre.

use serde::Serialize;

use crate::coords::{arcmin_to_deg, parse_dec, parse_ra};
use crate::mask::SlitFeature;

/// A polygon vertex in sky coordinates (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Vertex {
    pub ra: f64,
    pub dec: f64,
}

impl Vertex {
    pub fn is_finite(&self) -> bool {
        self.ra.is_finite() && self.dec.is_finite()
    }
}

/// Text anchored at a sky position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelAnchor {
    pub ra: f64,
    pub dec: f64,
    pub text: String,
}

/// Renderable description of one slit: its rotated rectangle plus an id
/// label at the slit centre.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlitFootprint {
    pub id: String,
    pub vertices: [Vertex; 4],
    pub label: LabelAnchor,
}

impl SlitFootprint {
    /// `false` if any coordinate came out `NaN` or infinite, which happens
    /// when the slit's sexagesimal strings were malformed.
    pub fn is_finite(&self) -> bool {
        self.vertices.iter().all(Vertex::is_finite)
            && self.label.ra.is_finite()
            && self.label.dec.is_finite()
    }
}

/// Build the four corners of a rotated rectangle centred at
/// `(center_ra, center_dec)`.
///
/// Corners are emitted bottom-left, bottom-right, top-right, top-left
/// (before rotation). `angle_deg` rotates counter-clockwise in the
/// (ra, dec) plane.
pub fn build_rectangle(
    center_ra: f64,
    center_dec: f64,
    width_deg: f64,
    height_deg: f64,
    angle_deg: f64,
) -> [Vertex; 4] {
    let (sin, cos) = angle_deg.to_radians().sin_cos();
    let w2 = width_deg / 2.0;
    let h2 = height_deg / 2.0;

    [(-w2, -h2), (w2, -h2), (w2, h2), (-w2, h2)].map(|(x, y)| Vertex {
        ra: center_ra + (x * cos - y * sin),
        dec: center_dec + (x * sin + y * cos),
    })
}

/// Build the footprint of a slit feature.
///
/// Width comes from `slit.width` and height from `slit.a_len`, both in
/// arcminutes. `b_len` is deliberately not used.
pub fn build_footprint(slit: &SlitFeature) -> SlitFootprint {
    let ra = parse_ra(&slit.ra);
    let dec = parse_dec(&slit.dec);
    let vertices = build_rectangle(
        ra,
        dec,
        arcmin_to_deg(slit.width),
        arcmin_to_deg(slit.a_len),
        slit.angle,
    );

    SlitFootprint {
        id: slit.id.clone(),
        vertices,
        label: LabelAnchor {
            ra,
            dec,
            text: slit.id.clone(),
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
