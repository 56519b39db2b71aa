//! Static description of every Fit State field: kind, default and limits.
//!
//! All writes into the state go through [`FieldSpec::coerce`], which is where
//! the fixed-length array invariant and scalar ranges are enforced.

use serde_json::{Number, Value};

use crate::bands::SWEPT_LEVEL_LEN;
use crate::error::{CallerError, Result};

const N9: usize = 9;
const N19: usize = 19;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Text(&'static str),
    Int {
        default: i64,
        range: Option<(i64, i64)>,
    },
    Float(f64),
    /// Fixed-length numeric array filled with `fill`.
    Array {
        len: usize,
        fill: f64,
        integral: bool,
    },
    /// Fixed-length float array with explicit defaults.
    Preset(&'static [f64]),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn text(name: &'static str, default: &'static str) -> FieldSpec {
    FieldSpec { name, kind: FieldKind::Text(default) }
}

const fn int(name: &'static str, default: i64) -> FieldSpec {
    FieldSpec { name, kind: FieldKind::Int { default, range: None } }
}

const fn ranged(name: &'static str, default: i64, min: i64, max: i64) -> FieldSpec {
    FieldSpec { name, kind: FieldKind::Int { default, range: Some((min, max)) } }
}

const fn float(name: &'static str) -> FieldSpec {
    FieldSpec { name, kind: FieldKind::Float(0.0) }
}

const fn zeros(name: &'static str, len: usize) -> FieldSpec {
    FieldSpec { name, kind: FieldKind::Array { len, fill: 0.0, integral: false } }
}

const fn int_array(name: &'static str, len: usize, fill: f64) -> FieldSpec {
    FieldSpec { name, kind: FieldKind::Array { len, fill, integral: true } }
}

const fn preset(name: &'static str, values: &'static [f64]) -> FieldSpec {
    FieldSpec { name, kind: FieldKind::Preset(values) }
}

/// Field order here is the key order of the persisted document.
pub const FIELDS: &[FieldSpec] = &[
    // server
    text("server_ip", "192.168.0.100"),
    ranged("server_port", 8080, 1, 65535),
    text("server_path", "/api/nal2/process"),
    // client profile
    ranged("adultChild", 0, 0, 2),
    int("dateOfBirth", 19810101),
    ranged("experience", 0, 0, 1),
    ranged("compSpeed", 1, 0, 2),
    ranged("tonal", 0, 0, 1),
    ranged("gender", 1, 0, 2),
    // thresholds, 9-point audiometric grid
    preset("AC", &[45.0, 40.0, 40.0, 999.0, 65.0, 999.0, 70.0, 70.0, 55.0]),
    preset("BC", &[45.0, 40.0, 40.0, 999.0, 65.0, 999.0, 70.0, 999.0, 999.0]),
    preset("ACother", &[45.0, 45.0, 45.0, 999.0, 65.0, 999.0, 70.0, 65.0, 55.0]),
    // shared device parameters
    ranged("channels", 18, 1, 18),
    ranged("bandWidth", 0, 0, 1),
    ranged("selection", 1, 0, 3),
    int("WBCT", 52),
    ranged("aidType", 3, 0, 3),
    ranged("direction", 0, 0, 1),
    ranged("mic", 1, 0, 1),
    ranged("limiting", 0, 0, 2),
    ranged("noOfAids", 1, 0, 1),
    int_array("calcCh", N19, 1.0),
    // coupling
    ranged("tubing", 3, 0, 5),
    ranged("vent", 0, 0, 6),
    ranged("coupler", 0, 0, 1),
    ranged("fittingDepth", 0, 0, 2),
    ranged("earpiece", 0, 0, 1),
    ranged("RECDmeasType", 0, 0, 1),
    ranged("REDD_defValues", 0, 0, 1),
    ranged("REUR_defValues", 0, 0, 1),
    // gain and curve requests
    ranged("L", 65, 0, 120),
    ranged("target", 1, 0, 1),
    ranged("targetType", 1, 0, 3),
    ranged("freqRequired", 9, 0, 18),
    ranged("type", 1, 0, 1),
    ranged("graphFreq", 9, 0, 18),
    int("startLevel", 40),
    int("finishLevel", 90),
    int("s", 2),
    ranged("dbOption", 0, 0, 1),
    // band splitting
    zeros("CFArray", N19),
    int_array("FreqInCh", N19, 0.0),
    int_array("centerF", N19, 0.0),
    // compression
    zeros("CT", N19),
    zeros("CR", N19),
    // real-ear corrections
    zeros("RECDh", N19),
    zeros("RECDh9", N9),
    zeros("RECDt", N19),
    zeros("RECDt9", N9),
    zeros("REDD", N19),
    zeros("REDD9", N9),
    zeros("REUR", N19),
    zeros("REUR9", N9),
    // gains
    zeros("REIG", N19),
    zeros("REAG", N19),
    zeros("TccCG", N19),
    zeros("ESG", N19),
    int_array("lineType19", N19, 0.0),
    zeros("MPO", N19),
    float("gainAt_value"),
    // input/output curves
    zeros("REIO", SWEPT_LEVEL_LEN),
    zeros("REIOunl", SWEPT_LEVEL_LEN),
    zeros("TccIO", SWEPT_LEVEL_LEN),
    zeros("TccIOunl", SWEPT_LEVEL_LEN),
    zeros("ESIO", SWEPT_LEVEL_LEN),
    zeros("ESIOunl", SWEPT_LEVEL_LEN),
    int_array("lineType100", SWEPT_LEVEL_LEN, 0.0),
    // speech
    zeros("Speech_rms", N19),
    zeros("Speech_max", N19),
    zeros("Speech_min", N19),
    zeros("Speech_thresh", N19),
    zeros("Limit", N19),
    float("SI_value"),
    float("SII_value"),
    zeros("AT", N19),
    // reference data
    zeros("MLE", N19),
    zeros("MAF", N19),
    zeros("BWC", N19),
    zeros("ESCD", N19),
    zeros("Tubing", N19),
    zeros("Tubing9", N9),
    zeros("Ventout", N19),
    zeros("Ventout9", N9),
    int("dll_major", 0),
    int("dll_minor", 0),
    // derived curves
    text("curveFunction", ""),
    zeros("Gain50", N19),
    zeros("Gain65", N19),
    zeros("Gain80", N19),
    zeros("Resp50", N19),
    zeros("Resp65", N19),
    zeros("Resp80", N19),
    zeros("GainAt", N19),
    zeros("GainAtResp", N19),
];

pub fn lookup(name: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|f| f.name == name)
}

/// Spec for `name`, or a validation error naming the unknown field.
pub fn require(name: &str) -> Result<&'static FieldSpec> {
    lookup(name).ok_or_else(|| CallerError::Validation(format!("Unknown state field '{}'", name)))
}

fn float_value(x: f64, field: &str) -> Result<Value> {
    Number::from_f64(x)
        .map(Value::Number)
        .ok_or_else(|| CallerError::Validation(format!("Non-finite value {} for '{}'", x, field)))
}

impl FieldSpec {
    pub fn array_len(&self) -> Option<usize> {
        match self.kind {
            FieldKind::Array { len, .. } => Some(len),
            FieldKind::Preset(values) => Some(values.len()),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        self.array_len().is_some()
    }

    fn integral(&self) -> bool {
        matches!(self.kind, FieldKind::Array { integral: true, .. } | FieldKind::Int { .. })
    }

    pub fn default_value(&self) -> Value {
        match self.kind {
            FieldKind::Text(s) => Value::String(s.to_string()),
            FieldKind::Int { default, .. } => Value::from(default),
            FieldKind::Float(x) => Value::from(x),
            FieldKind::Array { len, fill, integral } => {
                let item = if integral { Value::from(fill as i64) } else { Value::from(fill) };
                Value::Array(vec![item; len])
            }
            FieldKind::Preset(values) => Value::Array(values.iter().map(|&x| Value::from(x)).collect()),
        }
    }

    /// Normalize `value` to this field's stored representation.
    ///
    /// Integral fields accept floats and truncate; float fields store floats.
    /// Arrays must have exactly the declared length.
    pub fn coerce(&self, value: &Value) -> Result<Value> {
        let name = self.name;
        match self.kind {
            FieldKind::Text(_) => value
                .as_str()
                .map(|s| Value::String(s.to_string()))
                .ok_or_else(|| CallerError::Validation(format!("'{}' expects a string", name))),
            FieldKind::Int { range, .. } => {
                let n = as_integral(value)
                    .ok_or_else(|| CallerError::Validation(format!("'{}' expects an integer", name)))?;
                if let Some((min, max)) = range {
                    if n < min || n > max {
                        return Err(CallerError::Validation(format!(
                            "'{}' = {} is outside {}..={}",
                            name, n, min, max
                        )));
                    }
                }
                Ok(Value::from(n))
            }
            FieldKind::Float(_) => {
                let x = value
                    .as_f64()
                    .ok_or_else(|| CallerError::Validation(format!("'{}' expects a number", name)))?;
                float_value(x, name)
            }
            FieldKind::Array { .. } | FieldKind::Preset(_) => {
                let expected = self.array_len().unwrap_or_default();
                let items = value
                    .as_array()
                    .ok_or_else(|| CallerError::Validation(format!("'{}' expects an array", name)))?;
                if items.len() != expected {
                    return Err(CallerError::Validation(format!(
                        "'{}' expects {} values, got {}",
                        name,
                        expected,
                        items.len()
                    )));
                }
                let integral = self.integral();
                items
                    .iter()
                    .map(|item| {
                        if integral {
                            as_integral(item).map(Value::from).ok_or_else(|| {
                                CallerError::Validation(format!("'{}' holds a non-numeric item", name))
                            })
                        } else {
                            let x = item.as_f64().ok_or_else(|| {
                                CallerError::Validation(format!("'{}' holds a non-numeric item", name))
                            })?;
                            float_value(x, name)
                        }
                    })
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Array)
            }
        }
    }
}

fn as_integral(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|x| x.is_finite()).map(|x| x.trunc() as i64))
}
