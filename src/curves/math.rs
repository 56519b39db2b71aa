use crate::fit_state::FitState;

/// Per-band output ceiling. An all-zero stored MPO counts as not yet fetched
/// and yields `+inf` in every band.
pub fn mpo_ceiling(state: &FitState, len: usize) -> Vec<f64> {
    match state.array("MPO") {
        Some(mpo) if !state.is_all_zero("MPO") && mpo.len() == len => mpo,
        _ => vec![f64::INFINITY; len],
    }
}

/// `r[i] = min(mpo[i], gain[i] + level)`, or `gain[i] + level` without an MPO.
pub fn response_curve(gain: &[f64], level: f64, mpo: Option<&[f64]>) -> Vec<f64> {
    gain.iter()
        .enumerate()
        .map(|(i, g)| {
            let out = g + level;
            match mpo.and_then(|m| m.get(i)) {
                Some(&ceiling) => out.min(ceiling),
                None => out,
            }
        })
        .collect()
}

/// Pull a numeric array out of a JSON value, if it is one.
pub fn as_f64_array(value: &serde_json::Value) -> Option<Vec<f64>> {
    value.as_array()?.iter().map(|v| v.as_f64()).collect()
}
