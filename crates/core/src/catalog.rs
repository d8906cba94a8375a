//! Catalog object rows and the numeric coercion rules used when comparing
//! edited rows against their baseline.
//!
//! Catalog cells arrive from the store as numbers or free-form strings
//! (coordinates in particular may be either), so every numeric column is
//! held as a [`CellValue`] rather than a plain `f64`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CellValue
// ---------------------------------------------------------------------------

/// A single catalog cell: absent, numeric, or raw text.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Null,
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Convert a loosely-typed JSON value. Booleans, arrays and objects are
    /// kept as their JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
            serde_json::Value::String(s) => Self::Text(s.clone()),
            other => Self::Text(other.to_string()),
        }
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        Self::Number(v as f64)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// Largest magnitude at which every integer is exactly representable.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            // Integral values go out as JSON integers so `priority: 5` is
            // not sent as `5.0`.
            Self::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => {
                serializer.serialize_i64(*n as i64)
            }
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(CellValueVisitor)
    }
}

struct CellValueVisitor;

impl<'de> Visitor<'de> for CellValueVisitor {
    type Value = CellValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number, a string, or null")
    }

    fn visit_unit<E: de::Error>(self) -> Result<CellValue, E> {
        Ok(CellValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<CellValue, E> {
        Ok(CellValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<CellValue, D::Error> {
        d.deserialize_any(self)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<CellValue, E> {
        Ok(CellValue::Text(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<CellValue, E> {
        Ok(CellValue::Number(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<CellValue, E> {
        Ok(CellValue::Number(v as f64))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<CellValue, E> {
        Ok(CellValue::Number(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<CellValue, E> {
        Ok(CellValue::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<CellValue, E> {
        Ok(CellValue::Text(v))
    }
}

// ---------------------------------------------------------------------------
// Numeric columns
// ---------------------------------------------------------------------------

/// Catalog columns tracked for numeric edit detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericColumn {
    ALen,
    BLen,
    Declination,
    RightAscension,
    Priority,
}

impl NumericColumn {
    pub const ALL: [NumericColumn; 5] = [
        Self::ALen,
        Self::BLen,
        Self::Declination,
        Self::RightAscension,
        Self::Priority,
    ];

    /// Wire / column name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ALen => "a_len",
            Self::BLen => "b_len",
            Self::Declination => "declination",
            Self::RightAscension => "right_ascension",
            Self::Priority => "priority",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }

    /// Whether text in this column is parsed as an integer.
    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Priority)
    }
}

impl fmt::Display for NumericColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Coercion
// ---------------------------------------------------------------------------

/// Coerce a cell for comparison in `column`.
///
/// Numbers pass through. Text is trimmed and parsed from its leading
/// numeric prefix (integer prefix for `priority`, decimal for everything
/// else). Empty text, unparsable text and non-finite results keep the raw
/// value unchanged.
pub fn coerce_for_column(column: NumericColumn, value: &CellValue) -> CellValue {
    let CellValue::Text(raw) = value else {
        return value.clone();
    };
    let t = raw.trim();
    if t.is_empty() {
        return value.clone();
    }
    let parsed = if column.is_integer() {
        parse_int_prefix(t)
    } else {
        parse_float_prefix(t)
    };
    match parsed {
        Some(n) if n.is_finite() => CellValue::Number(n),
        _ => value.clone(),
    }
}

/// Leading decimal integer.
const INT_PREFIX_PATTERN: &str = r"^[+-]?[0-9]+";

/// Leading decimal number with optional fraction and exponent.
const FLOAT_PREFIX_PATTERN: &str = r"^[+-]?([0-9]+\.?[0-9]*|\.[0-9]+)([eE][+-]?[0-9]+)?";

static INT_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(INT_PREFIX_PATTERN).expect("valid regex"));

static FLOAT_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(FLOAT_PREFIX_PATTERN).expect("valid regex"));

fn parse_int_prefix(t: &str) -> Option<f64> {
    INT_PREFIX_RE.find(t)?.as_str().parse().ok()
}

fn parse_float_prefix(t: &str) -> Option<f64> {
    FLOAT_PREFIX_RE.find(t)?.as_str().parse().ok()
}

// ---------------------------------------------------------------------------
// ObjectRecord
// ---------------------------------------------------------------------------

/// One row of a named catalog list.
///
/// Rows are addressed by `name` for updates; `id` is informational.
/// Columns the store adds beyond the standard set are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    #[serde(default, skip_serializing_if = "CellValue::is_null")]
    pub id: CellValue,
    #[serde(default, deserialize_with = "crate::lenient::string")]
    pub name: String,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "crate::lenient::option_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<String>,
    #[serde(default)]
    pub a_len: CellValue,
    #[serde(default)]
    pub b_len: CellValue,
    #[serde(default)]
    pub declination: CellValue,
    #[serde(default)]
    pub right_ascension: CellValue,
    #[serde(default)]
    pub priority: CellValue,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ObjectRecord {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn value(&self, column: NumericColumn) -> &CellValue {
        match column {
            NumericColumn::ALen => &self.a_len,
            NumericColumn::BLen => &self.b_len,
            NumericColumn::Declination => &self.declination,
            NumericColumn::RightAscension => &self.right_ascension,
            NumericColumn::Priority => &self.priority,
        }
    }

    pub fn value_mut(&mut self, column: NumericColumn) -> &mut CellValue {
        match column {
            NumericColumn::ALen => &mut self.a_len,
            NumericColumn::BLen => &mut self.b_len,
            NumericColumn::Declination => &mut self.declination,
            NumericColumn::RightAscension => &mut self.right_ascension,
            NumericColumn::Priority => &mut self.priority,
        }
    }

    pub fn with(mut self, column: NumericColumn, value: impl Into<CellValue>) -> Self {
        *self.value_mut(column) = value.into();
        self
    }

    /// Copy of this row with every numeric column coerced.
    pub fn coerced(&self) -> Self {
        let mut row = self.clone();
        for column in NumericColumn::ALL {
            let value = coerce_for_column(column, row.value(column));
            *row.value_mut(column) = value;
        }
        row
    }

    /// Lift a nested `aux` object into the row. Aux entries win over the
    /// base columns because the store records column edits there.
    pub fn flatten_aux(&mut self) {
        let Some(serde_json::Value::Object(aux)) = self.extra.remove("aux") else {
            return;
        };
        for (key, value) in aux {
            if let Some(column) = NumericColumn::from_name(&key) {
                *self.value_mut(column) = CellValue::from_json(&value);
                continue;
            }
            match (key.as_str(), &value) {
                ("name", serde_json::Value::String(s)) => self.name = s.clone(),
                ("type", serde_json::Value::String(s)) => self.kind = Some(s.clone()),
                ("id", v) => self.id = CellValue::from_json(v),
                _ => {
                    self.extra.insert(key, value);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_pass_through_unchanged() {
        let v = CellValue::Number(2.5);
        assert_eq!(coerce_for_column(NumericColumn::ALen, &v), v);
    }

    #[test]
    fn text_is_trimmed_and_parsed() {
        let v = CellValue::from(" 12.5 ");
        assert_eq!(
            coerce_for_column(NumericColumn::Declination, &v),
            CellValue::Number(12.5)
        );
    }

    #[test]
    fn priority_uses_integer_parsing() {
        assert_eq!(
            coerce_for_column(NumericColumn::Priority, &"5.9".into()),
            CellValue::Number(5.0)
        );
        assert_eq!(
            coerce_for_column(NumericColumn::ALen, &"5.9".into()),
            CellValue::Number(5.9)
        );
    }

    #[test]
    fn leading_numeric_prefix_is_used() {
        assert_eq!(
            coerce_for_column(NumericColumn::BLen, &"3.5arcsec".into()),
            CellValue::Number(3.5)
        );
        assert_eq!(
            coerce_for_column(NumericColumn::BLen, &"1e3".into()),
            CellValue::Number(1000.0)
        );
        assert_eq!(
            coerce_for_column(NumericColumn::BLen, &"2e".into()),
            CellValue::Number(2.0)
        );
        assert_eq!(
            coerce_for_column(NumericColumn::Priority, &"-7 high".into()),
            CellValue::Number(-7.0)
        );
    }

    #[test]
    fn fraction_only_and_signed_exponent_prefixes() {
        let cases = [
            (".5", 0.5),
            ("+3e-2x", 0.03),
            ("7.", 7.0),
            ("-0.25 deg", -0.25),
        ];
        for (raw, expected) in cases {
            assert_eq!(
                coerce_for_column(NumericColumn::ALen, &raw.into()),
                CellValue::Number(expected),
                "input {raw:?}"
            );
        }
        // Integer parsing stops at the decimal point.
        assert_eq!(
            coerce_for_column(NumericColumn::Priority, &".5".into()),
            CellValue::from(".5")
        );
    }

    #[test]
    fn unparsable_and_empty_text_stay_raw() {
        for raw in ["", "   ", "abc", ".", "-", "10:00:00x"] {
            let v = CellValue::from(raw);
            let out = coerce_for_column(NumericColumn::RightAscension, &v);
            if raw == "10:00:00x" {
                // prefix "10" parses
                assert_eq!(out, CellValue::Number(10.0));
            } else {
                assert_eq!(out, v, "input {raw:?}");
            }
        }
    }

    #[test]
    fn null_stays_null() {
        assert_eq!(
            coerce_for_column(NumericColumn::Priority, &CellValue::Null),
            CellValue::Null
        );
    }

    #[test]
    fn integral_numbers_serialize_as_integers() {
        assert_eq!(serde_json::to_string(&CellValue::Number(5.0)).unwrap(), "5");
        assert_eq!(serde_json::to_string(&CellValue::Number(5.5)).unwrap(), "5.5");
        assert_eq!(serde_json::to_string(&CellValue::Null).unwrap(), "null");
        assert_eq!(serde_json::to_string(&CellValue::from("x")).unwrap(), "\"x\"");
    }

    #[test]
    fn record_accepts_mixed_cell_types_and_extra_columns() {
        let json = serde_json::json!({
            "id": 7,
            "name": "obj1",
            "type": "galaxy",
            "a_len": 3.0,
            "declination": "+02:23:00",
            "right_ascension": 150.25,
            "priority": "3",
            "magnitude": 21.4
        });
        let row: ObjectRecord = serde_json::from_value(json).unwrap();

        assert_eq!(row.id, CellValue::Number(7.0));
        assert_eq!(row.kind.as_deref(), Some("galaxy"));
        assert_eq!(row.declination, CellValue::from("+02:23:00"));
        assert_eq!(row.priority, CellValue::from("3"));
        assert_eq!(row.b_len, CellValue::Null);
        assert_eq!(row.extra["magnitude"], serde_json::json!(21.4));
    }

    #[test]
    fn record_with_null_or_numeric_name_still_loads() {
        let rows: Vec<ObjectRecord> = serde_json::from_value(serde_json::json!([
            {"name": null, "priority": 2},
            {"name": 42, "type": 7}
        ]))
        .unwrap();

        assert_eq!(rows[0].name, "");
        assert_eq!(rows[0].priority, CellValue::Number(2.0));
        assert_eq!(rows[1].name, "42");
        assert_eq!(rows[1].kind.as_deref(), Some("7"));
    }

    #[test]
    fn coerced_row_converts_every_numeric_column() {
        let row = ObjectRecord::named("obj1")
            .with(NumericColumn::Priority, "4")
            .with(NumericColumn::ALen, " 2.5")
            .with(NumericColumn::Declination, "+02:23:00");
        let coerced = row.coerced();

        assert_eq!(coerced.priority, CellValue::Number(4.0));
        assert_eq!(coerced.a_len, CellValue::Number(2.5));
        // "+02" prefix
        assert_eq!(coerced.declination, CellValue::Number(2.0));
        assert_eq!(coerced.name, "obj1");
    }

    #[test]
    fn aux_columns_are_flattened_and_override_base() {
        let json = serde_json::json!({
            "name": "obj1",
            "a_len": 1.0,
            "aux": {"a_len": 4.5, "slit_pa": 30, "type": "star"}
        });
        let mut row: ObjectRecord = serde_json::from_value(json).unwrap();
        row.flatten_aux();

        assert_eq!(row.a_len, CellValue::Number(4.5));
        assert_eq!(row.kind.as_deref(), Some("star"));
        assert_eq!(row.extra["slit_pa"], serde_json::json!(30));
        assert!(!row.extra.contains_key("aux"));
    }

    #[test]
    fn column_names_round_trip() {
        for column in NumericColumn::ALL {
            assert_eq!(NumericColumn::from_name(column.as_str()), Some(column));
        }
        assert_eq!(NumericColumn::from_name("name"), None);
    }
}
