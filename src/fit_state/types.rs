use serde_json::{Map, Value};
use tracing::warn;

use super::compact::compact_numeric_arrays;
use super::schema::{self, FIELDS};
use crate::error::{CallerError, Result};

/// The clinical inputs and outputs of one open configuration.
///
/// Wraps a raw JSON `Map` keyed by field name, like the document on disk.
/// Every mutation is checked against the schema, so each array keeps its
/// declared length for the lifetime of the record.
#[derive(Debug, Clone, PartialEq)]
pub struct FitState {
    data: Map<String, Value>,
}

impl Default for FitState {
    fn default() -> Self {
        let data = FIELDS
            .iter()
            .map(|f| (f.name.to_string(), f.default_value()))
            .collect();
        Self { data }
    }
}

impl FitState {
    /// Build from a parsed document: known keys overwrite defaults, unknown keys
    /// are ignored, invalid values keep their default. `channels` is clamped to 1..=18.
    pub fn from_map(doc: &Map<String, Value>) -> Self {
        let mut state = FitState::default();
        for (key, value) in doc {
            let Some(spec) = schema::lookup(key) else {
                continue;
            };
            if key == "channels" {
                if let Some(ch) = value.as_f64() {
                    let clamped = (ch.trunc() as i64).clamp(1, 18);
                    state.data.insert(key.clone(), Value::from(clamped));
                    continue;
                }
            }
            match spec.coerce(value) {
                Ok(v) => {
                    state.data.insert(key.clone(), v);
                }
                Err(e) => warn!("Ignoring stored value for '{}': {}", key, e),
            }
        }
        state
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let doc: Map<String, Value> = serde_json::from_str(json)
            .map_err(|e| CallerError::Storage(format!("State document is not a JSON object: {}", e)))?;
        Ok(Self::from_map(&doc))
    }

    /// Two-space pretty JSON with purely numeric arrays folded onto one line.
    pub fn to_json(&self) -> Result<String> {
        let pretty = serde_json::to_string_pretty(&self.data)
            .map_err(|e| CallerError::Storage(format!("Failed to serialize state: {}", e)))?;
        let mut s = compact_numeric_arrays(&pretty);
        if !s.ends_with('\n') {
            s.push('\n');
        }
        Ok(s)
    }

    // --- Typed accessors ---

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.data.get(name)?.as_i64()
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        self.data.get(name)?.as_f64()
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.data.get(name)?.as_str()
    }

    /// Numeric array as floats. `None` if absent or not all numbers.
    pub fn array(&self, name: &str) -> Option<Vec<f64>> {
        self.data
            .get(name)?
            .as_array()?
            .iter()
            .map(|v| v.as_f64())
            .collect()
    }

    /// Current input level in dB.
    pub fn level(&self) -> i64 {
        self.int("L").unwrap_or(65)
    }

    pub fn channels(&self) -> i64 {
        self.int("channels").unwrap_or(18).clamp(1, 18)
    }

    /// True when an array exists and every entry is exactly zero.
    pub fn is_all_zero(&self, name: &str) -> bool {
        self.array(name)
            .map(|values| values.iter().all(|&x| x == 0.0))
            .unwrap_or(true)
    }

    // --- Mutators (all schema-checked) ---

    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        let spec = schema::require(name)?;
        let stored = spec.coerce(&value)?;
        self.data.insert(name.to_string(), stored);
        Ok(())
    }

    pub fn set_array(&mut self, name: &str, values: &[f64]) -> Result<()> {
        self.set(name, Value::from(values.to_vec()))
    }

    /// Overwrite one entry of an array, keeping the others.
    pub fn set_band(&mut self, name: &str, index: usize, value: f64) -> Result<()> {
        let mut values = self
            .array(name)
            .ok_or_else(|| CallerError::Validation(format!("'{}' is not an array field", name)))?;
        let len = values.len();
        let slot = values.get_mut(index).ok_or_else(|| {
            CallerError::Validation(format!("Index {} out of range for '{}' (len {})", index, name, len))
        })?;
        *slot = value;
        self.set_array(name, &values)
    }

    /// Reset an array to all zeros.
    pub fn clear(&mut self, name: &str) -> Result<()> {
        let spec = schema::require(name)?;
        let len = spec
            .array_len()
            .ok_or_else(|| CallerError::Validation(format!("'{}' is not an array field", name)))?;
        self.set(name, Value::from(vec![0.0; len]))
    }

    // --- Raw access ---

    pub fn raw(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Unchecked access that bypasses the schema, including array lengths.
    /// Consumers re-validate before sending.
    #[doc(hidden)]
    pub fn raw_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.data
    }

    pub fn field_count(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_cover_schema() {
        let state = FitState::default();
        assert_eq!(state.field_count(), FIELDS.len());
        assert_eq!(state.level(), 65);
        assert_eq!(state.channels(), 18);
        assert_eq!(state.array("AC").unwrap()[3], 999.0);
        assert_eq!(state.array("calcCh").unwrap(), vec![1.0; 19]);
        assert!(state.is_all_zero("MPO"));
    }

    #[test]
    fn test_set_band_keeps_other_entries() {
        let mut state = FitState::default();
        state.set_band("GainAt", 4, 12.5).unwrap();
        let g = state.array("GainAt").unwrap();
        assert_eq!(g[4], 12.5);
        assert_eq!(g.iter().filter(|&&x| x == 0.0).count(), 18);
        assert!(state.set_band("GainAt", 19, 1.0).unwrap_err().is_validation());
    }

    #[test]
    fn test_set_rejects_bad_length_and_keeps_value() {
        let mut state = FitState::default();
        state.set_array("REUR", &[3.0; 19]).unwrap();
        let err = state.set_array("REUR", &[1.0; 9]).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(state.array("REUR").unwrap(), vec![3.0; 19]);
    }

    #[test]
    fn test_clear_resets_to_zero() {
        let mut state = FitState::default();
        state.set_array("CT", &[50.0; 19]).unwrap();
        state.clear("CT").unwrap();
        assert!(state.is_all_zero("CT"));
        assert!(state.clear("L").unwrap_err().is_validation());
    }

    #[test]
    fn test_from_map_ignores_unknown_and_clamps_channels() {
        let doc = json!({
            "channels": 40,
            "unknownKey": [1, 2, 3],
            "AC": [10, 20, 30, 999, 40, 999, 50, 60, 70],
            "REAG": [1, 2, 3]
        });
        let state = FitState::from_map(doc.as_object().unwrap());
        assert_eq!(state.channels(), 18);
        assert_eq!(state.int("channels"), Some(18));
        assert!(state.get("unknownKey").is_none());
        assert_eq!(state.array("AC").unwrap()[0], 10.0);
        // wrong length keeps the default
        assert_eq!(state.array("REAG").unwrap(), vec![0.0; 19]);

        let low = FitState::from_map(json!({"channels": -3}).as_object().unwrap());
        assert_eq!(low.channels(), 1);
    }
}
