//! Mask records as fetched from the remote store.

use serde::{Deserialize, Serialize};

use crate::catalog::ObjectRecord;
use crate::payload::MaskParameterSet;

/// Field centre used when neither the mask nor its setup names one.
pub const DEFAULT_CENTER_RA: &str = "10 00 00";
pub const DEFAULT_CENTER_DEC: &str = "+02 23 00";

/// One cut feature on a generated mask.
///
/// `ra`/`dec` are sexagesimal strings. `x`/`y` are display-space
/// positions and do not feed the overlay geometry, nor does `b_len`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlitFeature {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub id: String,
    pub ra: String,
    pub dec: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    /// Slit width in arcminutes.
    pub width: f64,
    /// Length in arcminutes.
    pub a_len: f64,
    #[serde(default)]
    pub b_len: f64,
    /// Position angle of the long axis in degrees.
    #[serde(default)]
    pub angle: f64,
}

/// A mask together with its included and excluded catalog objects.
///
/// Both list spellings the store has used are accepted. The stored setup
/// is kept as raw JSON so a setup written by another client never stops
/// the features and lists from loading; see [`MaskDocument::parameters`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MaskDocument {
    #[serde(default, deserialize_with = "crate::lenient::option_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "crate::lenient::option_string")]
    pub status: Option<String>,
    #[serde(default)]
    pub features: Vec<SlitFeature>,
    #[serde(default, alias = "objects_list")]
    pub obj_list: Vec<ObjectRecord>,
    #[serde(default, alias = "excluded_objects")]
    pub excluded_obj_list: Vec<ObjectRecord>,
    #[serde(default, deserialize_with = "crate::lenient::option_string")]
    pub center_ra: Option<String>,
    #[serde(default, deserialize_with = "crate::lenient::option_string")]
    pub center_dec: Option<String>,
    #[serde(default)]
    pub instrument_setup: Option<serde_json::Value>,
}

impl MaskDocument {
    /// The stored setup as a parameter set. Unusable fields read as unset;
    /// only a setup that is not a JSON object at all is an error.
    ///
    /// A setup without `dref` or `SLEXTEND` loads them as 0, matching the
    /// editor form.
    pub fn parameters(&self) -> Result<Option<MaskParameterSet>, serde_json::Error> {
        let setup = match &self.instrument_setup {
            None | Some(serde_json::Value::Null) => return Ok(None),
            Some(setup) => setup,
        };
        let mut params = MaskParameterSet::deserialize(setup)?;
        params.dref.get_or_insert(0);
        params.tuning.extend_slits.get_or_insert(0);
        Ok(Some(params))
    }

    fn setup_str(&self, key: &str) -> Option<&str> {
        self.instrument_setup.as_ref()?.get(key)?.as_str()
    }

    /// Field centre RA: the mask's own value, then its setup's, then the
    /// built-in default.
    pub fn center_ra(&self) -> &str {
        self.center_ra
            .as_deref()
            .or_else(|| self.setup_str("center_ra"))
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_CENTER_RA)
    }

    pub fn center_dec(&self) -> &str {
        self.center_dec
            .as_deref()
            .or_else(|| self.setup_str("center_dec"))
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_CENTER_DEC)
    }

    /// Flatten nested `aux` columns on every object in both lists.
    pub fn flatten_aux(&mut self) {
        for record in self
            .obj_list
            .iter_mut()
            .chain(self.excluded_obj_list.iter_mut())
        {
            record.flatten_aux();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
