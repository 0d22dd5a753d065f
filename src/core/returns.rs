use super::types::RawReturn;

pub const MIN_RETURN: f64 = -0.90;
pub const MAX_RETURN: f64 = 2.00;
const PERCENT_CUTOFF: f64 = 1.5;

/// Values above 1.5 are read as percentages (30 -> 0.30). The result is always
/// inside [-0.90, 2.00]; missing or non-finite input yields 0.0.
pub fn normalize_return(raw: Option<f64>) -> f64 {
    let Some(value) = raw.filter(|v| v.is_finite()) else {
        return 0.0;
    };
    let value = if value > PERCENT_CUTOFF {
        value / 100.0
    } else {
        value
    };
    value.clamp(MIN_RETURN, MAX_RETURN)
}

pub fn normalize_raw_return(raw: Option<&RawReturn>) -> f64 {
    normalize_return(raw.and_then(RawReturn::value))
}
