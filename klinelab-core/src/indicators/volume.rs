//! Volume indicators: OBV, accumulation/distribution, money flow index,
//! VWAP and force index.

use super::output::IndicatorOutput;
use super::params::{inputs, period, IndicatorConfig, IndicatorError};
use super::registry::{IndicatorCategory, IndicatorDescriptor};
use super::smoothing::ema;
use crate::domain::InputRole;

const CV: &[InputRole] = &[InputRole::Close, InputRole::Volume];
const HLCV: &[InputRole] = &[InputRole::High, InputRole::Low, InputRole::Close, InputRole::Volume];

pub(crate) fn descriptors() -> Vec<IndicatorDescriptor> {
    let vol = IndicatorCategory::Volume;
    vec![
        IndicatorDescriptor::new("OBV", "On-Balance Volume", vol, CV, IndicatorConfig::EMPTY, compute_obv),
        IndicatorDescriptor::new("ADL", "Accumulation/Distribution Line", vol, HLCV, IndicatorConfig::EMPTY, compute_adl),
        IndicatorDescriptor::new("MFI", "Money Flow Index", vol, HLCV, IndicatorConfig::with_period(14), compute_mfi),
        IndicatorDescriptor::new("VWAP", "Volume Weighted Average Price", vol, HLCV, IndicatorConfig::EMPTY, compute_vwap),
        IndicatorDescriptor::new("FI", "Force Index", vol, CV, IndicatorConfig::with_period(13), compute_fi),
    ]
}

fn compute_obv(series: &[&[f64]], _config: Option<&IndicatorConfig>) -> Result<IndicatorOutput, IndicatorError> {
    let [close, volume] = inputs::<2>(series)?;
    Ok(IndicatorOutput::Single(obv(close, volume)))
}

fn compute_adl(series: &[&[f64]], _config: Option<&IndicatorConfig>) -> Result<IndicatorOutput, IndicatorError> {
    let [high, low, close, volume] = inputs::<4>(series)?;
    Ok(IndicatorOutput::Single(adl(high, low, close, volume)))
}

fn compute_mfi(series: &[&[f64]], config: Option<&IndicatorConfig>) -> Result<IndicatorOutput, IndicatorError> {
    let [high, low, close, volume] = inputs::<4>(series)?;
    Ok(IndicatorOutput::Single(mfi(high, low, close, volume, period(config)?)))
}

fn compute_vwap(series: &[&[f64]], _config: Option<&IndicatorConfig>) -> Result<IndicatorOutput, IndicatorError> {
    let [high, low, close, volume] = inputs::<4>(series)?;
    Ok(IndicatorOutput::Single(vwap(high, low, close, volume)))
}

fn compute_fi(series: &[&[f64]], config: Option<&IndicatorConfig>) -> Result<IndicatorOutput, IndicatorError> {
    let [close, volume] = inputs::<2>(series)?;
    Ok(IndicatorOutput::Single(force_index(close, volume, period(config)?)))
}

fn typical_price(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    (0..close.len())
        .map(|i| (high[i] + low[i] + close[i]) / 3.0)
        .collect()
}

/// Running volume total, signed by the close-to-close direction. Starts at 0.
pub fn obv(close: &[f64], volume: &[f64]) -> Vec<f64> {
    let n = close.len();
    let mut out = vec![f64::NAN; n];
    if n == 0 {
        return out;
    }
    let mut total = 0.0;
    out[0] = total;
    for i in 1..n {
        let (prev, curr, v) = (close[i - 1], close[i], volume[i]);
        if prev.is_nan() || curr.is_nan() || v.is_nan() {
            break;
        }
        if curr > prev {
            total += v;
        } else if curr < prev {
            total -= v;
        }
        out[i] = total;
    }
    out
}

/// Accumulation/distribution line. A bar with no range adds nothing.
pub fn adl(high: &[f64], low: &[f64], close: &[f64], volume: &[f64]) -> Vec<f64> {
    let n = close.len();
    let mut out = vec![f64::NAN; n];
    let mut total = 0.0;
    for i in 0..n {
        let (h, l, c, v) = (high[i], low[i], close[i], volume[i]);
        if h.is_nan() || l.is_nan() || c.is_nan() || v.is_nan() {
            break;
        }
        if h != l {
            total += ((c - l) - (h - c)) / (h - l) * v;
        }
        out[i] = total;
    }
    out
}

/// Money flow index: a volume-weighted RSI over typical prices.
pub fn mfi(high: &[f64], low: &[f64], close: &[f64], volume: &[f64], period: usize) -> Vec<f64> {
    let n = close.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period + 1 {
        return out;
    }
    let tp = typical_price(high, low, close);

    // Signed raw money flow per row, by typical-price direction.
    let mut flow = vec![f64::NAN; n];
    for i in 1..n {
        let raw = tp[i] * volume[i];
        if tp[i].is_nan() || tp[i - 1].is_nan() || raw.is_nan() {
            continue;
        }
        flow[i] = if tp[i] > tp[i - 1] {
            raw
        } else if tp[i] < tp[i - 1] {
            -raw
        } else {
            0.0
        };
    }

    for i in period..n {
        let window = &flow[i + 1 - period..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        let positive: f64 = window.iter().filter(|v| **v > 0.0).sum();
        let negative: f64 = -window.iter().filter(|v| **v < 0.0).sum::<f64>();
        out[i] = if negative == 0.0 && positive == 0.0 {
            50.0
        } else if negative == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + positive / negative)
        };
    }
    out
}

/// Cumulative volume-weighted typical price from the first row.
pub fn vwap(high: &[f64], low: &[f64], close: &[f64], volume: &[f64]) -> Vec<f64> {
    let tp = typical_price(high, low, close);
    let mut out = vec![f64::NAN; tp.len()];
    let mut pv = 0.0;
    let mut vol = 0.0;
    for i in 0..tp.len() {
        if tp[i].is_nan() || volume[i].is_nan() {
            break;
        }
        pv += tp[i] * volume[i];
        vol += volume[i];
        if vol > 0.0 {
            out[i] = pv / vol;
        }
    }
    out
}

/// EMA of `(close - previous close) * volume`.
pub fn force_index(close: &[f64], volume: &[f64], period: usize) -> Vec<f64> {
    let n = close.len();
    let mut raw = vec![f64::NAN; n];
    for i in 1..n {
        raw[i] = (close[i] - close[i - 1]) * volume[i];
    }
    ema(&raw, period)
}
