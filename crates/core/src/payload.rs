//! Mask-generation parameters and assembly of the outbound generation
//! request.
//!
//! [`MaskParameterSet`] mirrors the editable form: every field is optional
//! because the user may not have touched it. [`assemble`] turns it into a
//! [`GenerationRequest`] in which required fields always carry a value
//! (the user's, or the documented default) and the optional tuning fields
//! are present only when set.
//!
//! The same wire names are used in both directions, so a mask's stored
//! `instrument_setup` deserializes straight back into a parameter set.
//! Stored values that cannot be used read as unset.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::catalog::CellValue;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

pub const TELESCOPE: &str = "Magellan";
pub const DEFAULT_PROJECT_NAME: &str = "untitled";
pub const DEFAULT_TITLE: &str = "untitled";
pub const DEFAULT_OBSERVER: &str = "anonymous";
pub const DEFAULT_INSTRUMENT: &str = "IMACS_sc";
pub const DEFAULT_DISPERSER: &str = "IMACS_grism_400";
pub const DEFAULT_EQUINOX: f64 = 2000.0;
pub const DEFAULT_POSITION_ANGLE: f64 = 0.0;
pub const DEFAULT_DREF: i64 = 1;
pub const DEFAULT_HOUR_ANGLE: f64 = 1.0;
pub const DEFAULT_WLIMIT_LOW: f64 = 3000.0;
pub const DEFAULT_WLIMIT_HIGH: f64 = 5000.0;
pub const DEFAULT_WAVELENGTH: f64 = 4731.46;
pub const DEFAULT_PDECIDE: i64 = 1;
pub const DEFAULT_SLIT_WIDTH: f64 = 1.0;
pub const DEFAULT_SLIT_LENGTH: f64 = 3.0;
pub const DEFAULT_REFHOLE_WIDTH: f64 = 5.0;
pub const DEFAULT_REFHOLE_SHAPE: i64 = 1;
pub const DEFAULT_REFHOLE_LENGTH: f64 = 2.5;
pub const DEFAULT_OVERLAP: f64 = -2.0;
pub const DEFAULT_EXORDER: i64 = 0;

/// Placeholder guide stars the editor form starts with: name, RA, Dec, id.
const FORM_GUIDE_STARS: [(&str, &str, &str, &str); 2] = [
    ("GS1", "10.002168", "2.61311", "GS101"),
    ("GS2", "10.002909", "2.10239", "GS102"),
];

// ---------------------------------------------------------------------------
// Parameter set
// ---------------------------------------------------------------------------

/// A guide star attached to the mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuideStar {
    #[serde(default, deserialize_with = "crate::lenient::string")]
    pub name: String,
    #[serde(default)]
    pub ra: CellValue,
    #[serde(default)]
    pub dec: CellValue,
    #[serde(default)]
    pub equinox: CellValue,
    #[serde(default, deserialize_with = "crate::lenient::string")]
    pub id: String,
}

/// Optional mask-design tuning knobs. Each one is sent only when set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TuningOptions {
    #[serde(
        rename = "SLEXTEND",
        default,
        deserialize_with = "crate::lenient::option_i64",
        skip_serializing_if = "Option::is_none"
    )]
    pub extend_slits: Option<i64>,
    #[serde(
        rename = "UNCUTLEFT",
        default,
        deserialize_with = "crate::lenient::option_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub uncut_left: Option<f64>,
    #[serde(
        rename = "UNCUTRIGHT",
        default,
        deserialize_with = "crate::lenient::option_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub uncut_right: Option<f64>,
    #[serde(
        rename = "MUSTHAVE",
        default,
        deserialize_with = "crate::lenient::option_i64",
        skip_serializing_if = "Option::is_none"
    )]
    pub must_have: Option<i64>,
    #[serde(
        rename = "EXPRI",
        default,
        deserialize_with = "crate::lenient::option_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub priority_suppression: Option<f64>,
    #[serde(
        rename = "REPOBJ",
        default,
        deserialize_with = "crate::lenient::option_i64",
        skip_serializing_if = "Option::is_none"
    )]
    pub repeat_object: Option<i64>,
    #[serde(
        rename = "REPREF",
        default,
        deserialize_with = "crate::lenient::option_i64",
        skip_serializing_if = "Option::is_none"
    )]
    pub reference_count: Option<i64>,
    #[serde(
        rename = "REFLIMIT",
        default,
        deserialize_with = "crate::lenient::option_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub reference_limit: Option<f64>,
}

impl TuningOptions {
    /// Wire names of the options that are currently set, in wire order.
    pub fn present_keys(&self) -> Vec<&'static str> {
        [
            ("SLEXTEND", self.extend_slits.is_some()),
            ("UNCUTLEFT", self.uncut_left.is_some()),
            ("UNCUTRIGHT", self.uncut_right.is_some()),
            ("MUSTHAVE", self.must_have.is_some()),
            ("EXPRI", self.priority_suppression.is_some()),
            ("REPOBJ", self.repeat_object.is_some()),
            ("REPREF", self.reference_count.is_some()),
            ("REFLIMIT", self.reference_limit.is_some()),
        ]
        .into_iter()
        .filter_map(|(key, present)| present.then_some(key))
        .collect()
    }
}

/// Everything the operator can set for a mask-generation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaskParameterSet {
    #[serde(default, deserialize_with = "crate::lenient::option_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "crate::lenient::option_string")]
    pub filename: Option<String>,
    #[serde(default, deserialize_with = "crate::lenient::option_string")]
    pub observer: Option<String>,
    #[serde(default, deserialize_with = "crate::lenient::option_string")]
    pub center_ra: Option<String>,
    #[serde(default, deserialize_with = "crate::lenient::option_string")]
    pub center_dec: Option<String>,
    #[serde(default, deserialize_with = "crate::lenient::option_f64")]
    pub equinox: Option<f64>,
    /// Slit position angle in degrees.
    #[serde(default, deserialize_with = "crate::lenient::option_f64")]
    pub position: Option<f64>,
    /// Differential refraction flag (0 or 1).
    #[serde(default, deserialize_with = "crate::lenient::option_i64")]
    pub dref: Option<i64>,
    #[serde(default, deserialize_with = "crate::lenient::option_f64")]
    pub hangle: Option<f64>,
    #[serde(default, deserialize_with = "crate::lenient::list")]
    pub guide_stars: Vec<GuideStar>,
    #[serde(default, deserialize_with = "crate::lenient::option_string")]
    pub instrument: Option<String>,
    #[serde(default, deserialize_with = "crate::lenient::option_string")]
    pub disperser: Option<String>,
    #[serde(default, deserialize_with = "crate::lenient::option_f64")]
    pub wlimit_low: Option<f64>,
    #[serde(default, deserialize_with = "crate::lenient::option_f64")]
    pub wlimit_high: Option<f64>,
    #[serde(default, deserialize_with = "crate::lenient::option_f64")]
    pub wavelength: Option<f64>,
    #[serde(default, deserialize_with = "crate::lenient::option_i64")]
    pub pdecide: Option<i64>,
    #[serde(default, deserialize_with = "crate::lenient::option_f64")]
    pub slit_width: Option<f64>,
    #[serde(default, deserialize_with = "crate::lenient::option_f64")]
    pub a_len: Option<f64>,
    #[serde(default, deserialize_with = "crate::lenient::option_f64")]
    pub b_len: Option<f64>,
    /// Alignment-hole size.
    #[serde(default, deserialize_with = "crate::lenient::option_f64")]
    pub refhole_width: Option<f64>,
    #[serde(default, deserialize_with = "crate::lenient::option_i64")]
    pub refhole_shape: Option<i64>,
    #[serde(default, deserialize_with = "crate::lenient::option_f64")]
    pub overlap: Option<f64>,
    #[serde(default, deserialize_with = "crate::lenient::option_i64")]
    pub exorder: Option<i64>,
    #[serde(flatten)]
    pub tuning: TuningOptions,
}

impl MaskParameterSet {
    /// The editor form's starting values: refraction correction off, the
    /// tuning knobs at zero (uncut margins unset) and two placeholder guide
    /// stars. [`Default`] is the empty set, where every field falls back
    /// at assembly time.
    pub fn form_defaults() -> Self {
        let guide_stars = FORM_GUIDE_STARS
            .into_iter()
            .map(|(name, ra, dec, id)| GuideStar {
                name: name.to_string(),
                ra: ra.into(),
                dec: dec.into(),
                equinox: DEFAULT_EQUINOX.into(),
                id: id.to_string(),
            })
            .collect();

        Self {
            dref: Some(0),
            guide_stars,
            tuning: TuningOptions {
                extend_slits: Some(0),
                must_have: Some(0),
                priority_suppression: Some(0.0),
                repeat_object: Some(0),
                reference_count: Some(0),
                reference_limit: Some(0.0),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Generation request
// ---------------------------------------------------------------------------

/// Request-scoped values that are not part of the parameter form.
#[derive(Debug, Clone)]
pub struct AssemblyContext {
    pub user_id: String,
    pub project_name: Option<String>,
    /// Catalog list the mask is designed from.
    pub objects: Option<String>,
    pub today: NaiveDate,
}

/// Body of `POST /masks/generate/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub user_id: String,
    pub project_name: String,
    #[serde(rename = "override")]
    pub override_existing: bool,
    pub filename: String,
    pub edit_date: String,
    pub observer: String,
    pub title: String,
    pub center_ra: String,
    pub center_dec: String,
    pub equinox: f64,
    pub position: f64,
    pub dref: i64,
    pub hangle: f64,
    pub guide_stars: Vec<GuideStar>,
    pub telescope: String,
    pub instrument: String,
    pub disperser: String,
    pub wlimit_low: f64,
    pub wlimit_high: f64,
    pub wavelength: f64,
    pub pdecide: i64,
    pub slit_width: f64,
    pub a_len: f64,
    pub b_len: f64,
    pub slit_tilt: f64,
    pub refhole_width: f64,
    pub refhole_shape: i64,
    pub refhole_a_len: f64,
    pub refhole_b_len: f64,
    pub refhole_orient_deg: f64,
    pub overlap: f64,
    pub exorder: i64,
    pub date: String,
    pub objects: Option<String>,
    #[serde(flatten)]
    pub tuning: TuningOptions,
}

impl GenerationRequest {
    /// Default artifact name for the generated mask file.
    pub fn artifact_name(&self) -> String {
        let stem = if self.filename.is_empty() {
            "mask"
        } else {
            self.filename.as_str()
        };
        format!("{stem}.smf")
    }
}

/// Non-empty string or the fallback.
fn or_default(value: &Option<String>, fallback: &str) -> String {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// Build the generation request from the current parameters.
///
/// The alignment-hole lengths follow the slit lengths when those are set
/// and fall back to their own default otherwise.
pub fn assemble(params: &MaskParameterSet, ctx: &AssemblyContext) -> GenerationRequest {
    let today = ctx.today.format("%Y-%m-%d").to_string();

    GenerationRequest {
        user_id: ctx.user_id.clone(),
        project_name: or_default(&ctx.project_name, DEFAULT_PROJECT_NAME),
        override_existing: true,
        filename: params.title.clone().unwrap_or_default(),
        edit_date: today.clone(),
        observer: or_default(&params.observer, DEFAULT_OBSERVER),
        title: or_default(&params.title, DEFAULT_TITLE),
        center_ra: params.center_ra.clone().unwrap_or_default(),
        center_dec: params.center_dec.clone().unwrap_or_default(),
        equinox: params.equinox.unwrap_or(DEFAULT_EQUINOX),
        position: params.position.unwrap_or(DEFAULT_POSITION_ANGLE),
        dref: params.dref.unwrap_or(DEFAULT_DREF),
        hangle: params.hangle.unwrap_or(DEFAULT_HOUR_ANGLE),
        guide_stars: params.guide_stars.clone(),
        telescope: TELESCOPE.to_string(),
        instrument: or_default(&params.instrument, DEFAULT_INSTRUMENT),
        disperser: or_default(&params.disperser, DEFAULT_DISPERSER),
        wlimit_low: params.wlimit_low.unwrap_or(DEFAULT_WLIMIT_LOW),
        wlimit_high: params.wlimit_high.unwrap_or(DEFAULT_WLIMIT_HIGH),
        wavelength: params.wavelength.unwrap_or(DEFAULT_WAVELENGTH),
        pdecide: params.pdecide.unwrap_or(DEFAULT_PDECIDE),
        slit_width: params.slit_width.unwrap_or(DEFAULT_SLIT_WIDTH),
        a_len: params.a_len.unwrap_or(DEFAULT_SLIT_LENGTH),
        b_len: params.b_len.unwrap_or(DEFAULT_SLIT_LENGTH),
        slit_tilt: 0.0,
        refhole_width: params.refhole_width.unwrap_or(DEFAULT_REFHOLE_WIDTH),
        refhole_shape: params.refhole_shape.unwrap_or(DEFAULT_REFHOLE_SHAPE),
        refhole_a_len: params.a_len.unwrap_or(DEFAULT_REFHOLE_LENGTH),
        refhole_b_len: params.b_len.unwrap_or(DEFAULT_REFHOLE_LENGTH),
        refhole_orient_deg: 0.0,
        overlap: params.overlap.unwrap_or(DEFAULT_OVERLAP),
        exorder: params.exorder.unwrap_or(DEFAULT_EXORDER),
        date: today,
        objects: ctx.objects.clone(),
        tuning: params.tuning.clone(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
