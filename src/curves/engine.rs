use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::math::{as_f64_array, mpo_ceiling, response_curve};
use super::sweep::{AtomicSweep, PartialCommitSweep, SweepReport};
use crate::bands::FREQS_19;
use crate::catalog::CatalogHandle;
use crate::error::{CallerError, Result};
use crate::events::{emit, UiEvent};
use crate::fit_state::FitStore;
use crate::mapper::{resolve_with, ReconcileOutcome, Reconciler};
use crate::session::{ResponseEnvelope, SessionClient};

const GAIN_AT_FUNCTION: &str = "GainAt_NL2";
const BANDS: usize = FREQS_19.len();

/// Remote functions that return a 19-band gain at one input level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GainFunction {
    RealEarInsertion,
    RealEarAided,
    TccCoupler,
    EarSimulator,
}

impl GainFunction {
    pub const ALL: [GainFunction; 4] = [
        GainFunction::RealEarInsertion,
        GainFunction::RealEarAided,
        GainFunction::TccCoupler,
        GainFunction::EarSimulator,
    ];

    pub fn function(self) -> &'static str {
        match self {
            GainFunction::RealEarInsertion => "RealEarInsertionGain_NL2",
            GainFunction::RealEarAided => "RealEarAidedGain_NL2",
            GainFunction::TccCoupler => "TccCouplerGain_NL2",
            GainFunction::EarSimulator => "EarSimulatorGain_NL2",
        }
    }

    /// State field the gain array reconciles into.
    pub fn field(self) -> &'static str {
        match self {
            GainFunction::RealEarInsertion => "REIG",
            GainFunction::RealEarAided => "REAG",
            GainFunction::TccCoupler => "TccCG",
            GainFunction::EarSimulator => "ESG",
        }
    }

    pub fn from_function(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.function() == name)
    }
}

/// Storage for the gain/response pair at one standard level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelSlot {
    pub level: i64,
    pub gain_field: &'static str,
    pub resp_field: &'static str,
}

impl LevelSlot {
    pub const ALL: [LevelSlot; 3] = [
        LevelSlot { level: 50, gain_field: "Gain50", resp_field: "Resp50" },
        LevelSlot { level: 65, gain_field: "Gain65", resp_field: "Resp65" },
        LevelSlot { level: 80, gain_field: "Gain80", resp_field: "Resp80" },
    ];

    pub fn for_level(level: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.level == level)
    }
}

/// Gain and clamped response at one level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelCurve {
    pub level: i64,
    pub gain: Vec<f64>,
    pub response: Vec<f64>,
}

/// Orchestrates remote calls against the shared store.
///
/// Every call is logged to the event channel and followed by a sequence update,
/// whether it succeeded or not.
pub struct CurveEngine {
    client: Arc<SessionClient>,
    store: Arc<FitStore>,
    catalog: Arc<CatalogHandle>,
    reconciler: Arc<Reconciler>,
}

impl CurveEngine {
    pub fn new(
        client: Arc<SessionClient>,
        store: Arc<FitStore>,
        catalog: Arc<CatalogHandle>,
        reconciler: Arc<Reconciler>,
    ) -> Self {
        Self {
            client,
            store,
            catalog,
            reconciler,
        }
    }

    pub fn client(&self) -> &Arc<SessionClient> {
        &self.client
    }

    pub fn store(&self) -> &Arc<FitStore> {
        &self.store
    }

    pub fn catalog(&self) -> &Arc<CatalogHandle> {
        &self.catalog
    }

    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    /// Send one request, reporting the exchange and the next sequence number.
    pub async fn exchange(&self, function: &str, params: Map<String, Value>) -> Result<ResponseEnvelope> {
        let result = self.client.call(function, params).await;
        let events = self.store.events();
        if let Ok(exchange) = &result {
            emit(events, UiEvent::Log(exchange.log_entry()));
        }
        emit(events, UiEvent::SequenceUpdated(self.client.sequence()));
        result.map(|ex| ex.response)
    }

    /// Parameters for `function` from the catalog and the current state.
    pub fn params_for(&self, function: &str, overrides: &Map<String, Value>) -> Result<Map<String, Value>> {
        let descriptor = self.catalog.descriptor_or_default(function)?;
        Ok(self.store.read(|state| resolve_with(&descriptor, state, overrides)))
    }

    /// Resolve, send and reconcile one catalog function.
    pub async fn invoke(&self, function: &str) -> Result<ReconcileOutcome> {
        self.invoke_with(function, &Map::new()).await
    }

    pub async fn invoke_with(&self, function: &str, overrides: &Map<String, Value>) -> Result<ReconcileOutcome> {
        let params = self.params_for(function, overrides)?;
        let response = self.exchange(function, params).await?;
        self.reconciler.apply(&self.store, function, &response)
    }

    /// One call of `gain` at `level`; the 19-band gain it returned.
    async fn gain_at_level(&self, gain: GainFunction, level: i64) -> Result<Vec<f64>> {
        let mut overrides = Map::new();
        overrides.insert("L".to_string(), Value::from(level));
        let params = self.params_for(gain.function(), &overrides)?;
        let response = self.exchange(gain.function(), params).await?;

        let value = self
            .reconciler
            .extract(gain.function(), gain.field(), &response)
            .ok_or_else(|| {
                CallerError::Protocol(format!("{} at {} dB returned no usable gain array", gain.function(), level))
            })?;
        as_f64_array(&value)
            .filter(|g| g.len() == BANDS)
            .ok_or_else(|| CallerError::Protocol(format!("{} returned a malformed gain array", gain.function())))
    }

    fn level_updates(&self, curve: &LevelCurve) -> Result<Vec<(String, Value)>> {
        let slot = LevelSlot::for_level(curve.level)
            .ok_or_else(|| CallerError::Validation(format!("No curve slot for {} dB", curve.level)))?;
        Ok(vec![
            (slot.gain_field.to_string(), Value::from(curve.gain.clone())),
            (slot.resp_field.to_string(), Value::from(curve.response.clone())),
        ])
    }

    fn curve(&self, level: i64, gain: Vec<f64>) -> LevelCurve {
        let mpo = self.store.read(|s| mpo_ceiling(s, BANDS));
        let response = response_curve(&gain, level as f64, Some(&mpo));
        LevelCurve { level, gain, response }
    }

    /// Single-gain fetch at the current input level.
    ///
    /// Stores the raw gain field, the level slot pair and `curveFunction` in
    /// one commit. A level with no slot is rejected before any call.
    pub async fn fetch_gain(&self, gain: GainFunction) -> Result<LevelCurve> {
        let level = self.store.read(|s| s.level());
        if LevelSlot::for_level(level).is_none() {
            return Err(CallerError::Validation(format!(
                "Input level {} dB has no curve slot (expected 50, 65 or 80)",
                level
            )));
        }

        let values = self.gain_at_level(gain, level).await?;
        let curve = self.curve(level, values);
        let mut updates = vec![(gain.field().to_string(), Value::from(curve.gain.clone()))];
        updates.extend(self.level_updates(&curve)?);
        updates.push(("curveFunction".to_string(), Value::from(gain.function())));
        self.store.commit(updates)?;
        info!("{} at {} dB stored", gain.function(), level);
        Ok(curve)
    }

    /// Standard sweep at 50/65/80 dB. All three slots are written together or
    /// not at all.
    pub async fn standard_sweep(&self, gain: GainFunction) -> Result<Vec<LevelCurve>> {
        let engine = self;
        let fetched = AtomicSweep::default()
            .run(move |level| async move { engine.gain_at_level(gain, level).await })
            .await?;

        let curves: Vec<LevelCurve> = fetched
            .into_iter()
            .map(|(level, values)| self.curve(level, values))
            .collect();
        let mut updates = Vec::new();
        for curve in &curves {
            updates.extend(self.level_updates(curve)?);
        }
        updates.push(("curveFunction".to_string(), Value::from(gain.function())));
        self.store.commit(updates)?;
        Ok(curves)
    }

    async fn gain_at_band(&self, index: usize, level: i64) -> Result<f64> {
        let mut overrides = Map::new();
        overrides.insert("freqRequired".to_string(), Value::from(index));
        overrides.insert("L".to_string(), Value::from(level));
        let params = self.params_for(GAIN_AT_FUNCTION, &overrides)?;
        let response = self.exchange(GAIN_AT_FUNCTION, params).await?;
        self.reconciler
            .extract(GAIN_AT_FUNCTION, "gainAt_value", &response)
            .and_then(|v| v.as_f64())
            .ok_or_else(|| CallerError::Protocol(format!("GainAt_NL2 returned no gain for band {}", index)))
    }

    /// Per-band sweep over `0..=min(18, channels)`, best effort.
    ///
    /// Filled bands overwrite `GainAt`/`GainAtResp`; skipped bands keep their
    /// prior values.
    pub async fn gain_at_sweep(&self) -> Result<SweepReport> {
        let (level, channels) = self.store.read(|s| (s.level(), s.channels()));
        let last = (channels.max(0) as usize).min(BANDS - 1);
        let engine = self;
        let (results, report) = PartialCommitSweep::new(0..=last)
            .run(move |index| async move { engine.gain_at_band(index, level).await })
            .await;

        if !results.is_empty() {
            self.store_gain_at(&results, level, None)?;
        }
        Ok(report)
    }

    /// One band of the per-band sweep; also stores and surfaces the scalar.
    pub async fn gain_at_single(&self, index: usize) -> Result<f64> {
        if index >= BANDS {
            return Err(CallerError::Validation(format!("Band index {} is outside 0..={}", index, BANDS - 1)));
        }
        let level = self.store.read(|s| s.level());
        let value = self.gain_at_band(index, level).await?;
        self.store_gain_at(&[(index, value)], level, Some(value))?;
        emit(self.store.events(), UiEvent::GainAtValue { index, value });
        Ok(value)
    }

    fn store_gain_at(&self, results: &[(usize, f64)], level: i64, scalar: Option<f64>) -> Result<()> {
        self.store.edit(|state| {
            let mpo = mpo_ceiling(state, BANDS);
            let mut gains = state.array("GainAt").unwrap_or_else(|| vec![0.0; BANDS]);
            let mut resps = state.array("GainAtResp").unwrap_or_else(|| vec![0.0; BANDS]);
            for &(index, g) in results {
                let ceiling = mpo.get(index).copied().unwrap_or(f64::INFINITY);
                if index >= gains.len() || index >= resps.len() {
                    return Err(CallerError::Validation(format!(
                        "GainAt/GainAtResp have no band {} (lengths {} and {})",
                        index,
                        gains.len(),
                        resps.len()
                    )));
                }
                gains[index] = g;
                resps[index] = (g + level as f64).min(ceiling);
            }
            state.set_array("GainAt", &gains)?;
            state.set_array("GainAtResp", &resps)?;
            if let Some(value) = scalar {
                state.set("gainAt_value", Value::from(value))?;
            }
            debug!("GainAt updated at {:?}", results.iter().map(|(i, _)| i).collect::<Vec<_>>());
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gain_function_lookup() {
        assert_eq!(GainFunction::from_function("RealEarAidedGain_NL2"), Some(GainFunction::RealEarAided));
        assert_eq!(GainFunction::TccCoupler.field(), "TccCG");
        assert!(GainFunction::from_function("GainAt_NL2").is_none());
    }

    #[test]
    fn test_level_slots() {
        assert_eq!(LevelSlot::for_level(65).unwrap().gain_field, "Gain65");
        assert_eq!(LevelSlot::for_level(80).unwrap().resp_field, "Resp80");
        assert!(LevelSlot::for_level(70).is_none());
    }
}
