//! Feature encoding for hepatitis risk prediction.
//!
//! Turns a loosely-typed clinical payload into the fixed 21-element vector
//! every predictor consumes. The field order is part of a trained
//! classifier's contract and must not change.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{HepatitisError, HepatitisResult};

/// Number of features in a [`FeatureVector`].
pub const FEATURE_COUNT: usize = 21;

/// Feature names in vector order.
pub const FIELD_ORDER: [&str; FEATURE_COUNT] = [
    "Age",
    "Sex",
    "Estado_Civil",
    "Ciudad",
    "Steroid",
    "Antivirals",
    "Fatigue",
    "Malaise",
    "Anorexia",
    "Liver_Big",
    "Liver_Firm",
    "Spleen_Palpable",
    "Spiders",
    "Ascites",
    "Varices",
    "Bilirubin",
    "Alk_Phosphate",
    "Sgot",
    "Albumin",
    "Protime",
    "Histology",
];

/// How a single request field is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Numeric,
    Sex,
    MaritalStatus,
    Flag,
}

/// Request key and decoding rule for each slot, in vector order.
const REQUEST_FIELDS: [(&str, FieldKind); FEATURE_COUNT] = [
    ("age", FieldKind::Numeric),
    ("sex", FieldKind::Sex),
    ("estado_civil", FieldKind::MaritalStatus),
    ("ciudad_code", FieldKind::Numeric),
    ("steroid", FieldKind::Flag),
    ("antivirals", FieldKind::Flag),
    ("fatigue", FieldKind::Flag),
    ("malaise", FieldKind::Flag),
    ("anorexia", FieldKind::Flag),
    ("liver_big", FieldKind::Flag),
    ("liver_firm", FieldKind::Flag),
    ("spleen_palpable", FieldKind::Flag),
    ("spiders", FieldKind::Flag),
    ("ascites", FieldKind::Flag),
    ("varices", FieldKind::Flag),
    ("bilirubin", FieldKind::Numeric),
    ("alk_phosphate", FieldKind::Numeric),
    ("sgot", FieldKind::Numeric),
    ("albumin", FieldKind::Numeric),
    ("protime", FieldKind::Numeric),
    ("histology", FieldKind::Flag),
];

/// Lowercase request keys accepted by the encoder, in vector order.
pub fn request_keys() -> impl Iterator<Item = &'static str> {
    REQUEST_FIELDS.iter().map(|(key, _)| *key)
}

/// Fallback values for numeric fields missing from a payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureDefaults {
    pub age: f64,
    pub ciudad_code: f64,
    pub bilirubin: f64,
    pub alk_phosphate: f64,
    pub sgot: f64,
    pub albumin: f64,
    pub protime: f64,
}

impl Default for FeatureDefaults {
    fn default() -> Self {
        Self {
            age: 0.0,
            ciudad_code: 1.0,
            bilirubin: 0.5,
            alk_phosphate: 50.0,
            sgot: 25.0,
            albumin: 4.0,
            protime: 12.0,
        }
    }
}

impl FeatureDefaults {
    fn numeric(&self, key: &str) -> f64 {
        match key {
            "age" => self.age,
            "ciudad_code" => self.ciudad_code,
            "bilirubin" => self.bilirubin,
            "alk_phosphate" => self.alk_phosphate,
            "sgot" => self.sgot,
            "albumin" => self.albumin,
            "protime" => self.protime,
            _ => 0.0,
        }
    }

    /// Reject defaults that would poison every prediction.
    pub fn validate(&self) -> HepatitisResult<()> {
        for (key, kind) in REQUEST_FIELDS.iter() {
            if *kind == FieldKind::Numeric && !self.numeric(key).is_finite() {
                return Err(HepatitisError::config(format!(
                    "default for '{key}' must be a finite number"
                )));
            }
        }
        Ok(())
    }
}

/// Sex code: "Masculino" is 1, anything else 0.
pub fn encode_sex(value: Option<&str>) -> f64 {
    match value {
        Some("Masculino") => 1.0,
        _ => 0.0,
    }
}

/// Marital status code. Unknown or absent values fall back to Soltero (0).
pub fn encode_marital_status(value: Option<&str>) -> f64 {
    match value {
        Some("Soltero") => 0.0,
        Some("Casado") => 1.0,
        Some("Divorciado") => 2.0,
        Some("Viudo") => 3.0,
        _ => 0.0,
    }
}

/// Yes/no clinical flag: "Si" or "Sí" is 1, anything else 0.
pub fn encode_flag(value: Option<&str>) -> f64 {
    match value {
        Some("Si") | Some("Sí") => 1.0,
        _ => 0.0,
    }
}

fn parse_numeric(field: &str, value: Option<&Value>, default: f64) -> HepatitisResult<f64> {
    let parsed = match value {
        None | Some(Value::Null) => return Ok(default),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| HepatitisError::invalid_input(field, format!("unrepresentable number {n}")))?,
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(default);
            }
            trimmed.parse::<f64>().map_err(|_| {
                HepatitisError::invalid_input(field, format!("could not convert string to float: '{s}'"))
            })?
        }
        Some(other) => {
            return Err(HepatitisError::invalid_input(
                field,
                format!("expected a number, got {other}"),
            ))
        }
    };

    if !parsed.is_finite() {
        return Err(HepatitisError::invalid_input(field, "value must be finite"));
    }
    Ok(parsed)
}

/// Fixed-order numeric encoding of one clinical record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Value of a feature by its schema name (e.g. `"Bilirubin"`).
    pub fn get(&self, name: &str) -> Option<f64> {
        FIELD_ORDER
            .iter()
            .position(|field| *field == name)
            .map(|idx| self.0[idx])
    }

    /// `(name, value)` pairs in vector order.
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FIELD_ORDER.iter().copied().zip(self.0.iter().copied())
    }
}

/// Encode a request payload.
///
/// Missing and `null` fields take their defaults; unrecognized categorical
/// values take the table default. Only an unparseable numeric field is an
/// error.
pub fn encode(payload: &Map<String, Value>, defaults: &FeatureDefaults) -> HepatitisResult<FeatureVector> {
    let mut values = [0.0; FEATURE_COUNT];

    for (slot, (key, kind)) in values.iter_mut().zip(REQUEST_FIELDS.iter()) {
        let raw = payload.get(*key);
        let text = raw.and_then(Value::as_str);
        *slot = match kind {
            FieldKind::Numeric => parse_numeric(key, raw, defaults.numeric(key))?,
            FieldKind::Sex => encode_sex(text),
            FieldKind::MaritalStatus => encode_marital_status(text),
            FieldKind::Flag => encode_flag(text),
        };
    }

    Ok(FeatureVector(values))
}
