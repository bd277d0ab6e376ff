//! Volatility indicators: Bollinger Bands, ATR, true range, Keltner and
//! Donchian channels.

use super::output::IndicatorOutput;
use super::params::{factor, inputs, period, IndicatorConfig, IndicatorError};
use super::registry::{IndicatorCategory, IndicatorDescriptor};
use super::smoothing::{ema, rolling_max, rolling_min, rolling_std, sma, wilder, zip_with};
use crate::domain::InputRole;

const ANY: &[InputRole] = &[InputRole::Any];
const HLC: &[InputRole] = &[InputRole::High, InputRole::Low, InputRole::Close];
const HL: &[InputRole] = &[InputRole::High, InputRole::Low];

const BAND_20_2: IndicatorConfig = IndicatorConfig {
    period: Some(20),
    multiplier: Some(2.0),
    ..IndicatorConfig::EMPTY
};

pub(crate) fn descriptors() -> Vec<IndicatorDescriptor> {
    let vol = IndicatorCategory::Volatility;
    vec![
        IndicatorDescriptor::new("BB", "Bollinger Bands", vol, ANY, BAND_20_2, compute_bb),
        IndicatorDescriptor::new("ATR", "Average True Range", vol, HLC, IndicatorConfig::with_period(14), compute_atr),
        IndicatorDescriptor::new("TR", "True Range", vol, HLC, IndicatorConfig::EMPTY, compute_tr),
        IndicatorDescriptor::new("KC", "Keltner Channels", vol, HLC, BAND_20_2, compute_kc),
        IndicatorDescriptor::new("DC", "Donchian Channels", vol, HL, IndicatorConfig::with_period(20), compute_dc),
    ]
}

fn compute_bb(series: &[&[f64]], config: Option<&IndicatorConfig>) -> Result<IndicatorOutput, IndicatorError> {
    let [close] = inputs::<1>(series)?;
    let multiplier = factor(config, "multiplier", |c| c.multiplier)?;
    let (upper, middle, lower) = bollinger(close, period(config)?, multiplier);
    Ok(IndicatorOutput::multi([("upper", upper), ("middle", middle), ("lower", lower)]))
}

fn compute_atr(series: &[&[f64]], config: Option<&IndicatorConfig>) -> Result<IndicatorOutput, IndicatorError> {
    let [high, low, close] = inputs::<3>(series)?;
    Ok(IndicatorOutput::Single(atr(high, low, close, period(config)?)))
}

fn compute_tr(series: &[&[f64]], _config: Option<&IndicatorConfig>) -> Result<IndicatorOutput, IndicatorError> {
    let [high, low, close] = inputs::<3>(series)?;
    Ok(IndicatorOutput::Single(true_range(high, low, close)))
}

fn compute_kc(series: &[&[f64]], config: Option<&IndicatorConfig>) -> Result<IndicatorOutput, IndicatorError> {
    let [high, low, close] = inputs::<3>(series)?;
    let multiplier = factor(config, "multiplier", |c| c.multiplier)?;
    let (upper, middle, lower) = keltner(high, low, close, period(config)?, multiplier);
    Ok(IndicatorOutput::multi([("upper", upper), ("middle", middle), ("lower", lower)]))
}

fn compute_dc(series: &[&[f64]], config: Option<&IndicatorConfig>) -> Result<IndicatorOutput, IndicatorError> {
    let [high, low] = inputs::<2>(series)?;
    let (upper, middle, lower) = donchian(high, low, period(config)?);
    Ok(IndicatorOutput::multi([("upper", upper), ("middle", middle), ("lower", lower)]))
}

/// True range. The first row has no previous close and uses `high - low`.
pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    let n = high.len();
    let mut tr = vec![f64::NAN; n];
    if n == 0 {
        return tr;
    }
    if !high[0].is_nan() && !low[0].is_nan() {
        tr[0] = high[0] - low[0];
    }
    for i in 1..n {
        let (h, l, pc) = (high[i], low[i], close[i - 1]);
        if h.is_nan() || l.is_nan() || pc.is_nan() {
            continue;
        }
        tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
    }
    tr
}

/// Wilder-smoothed true range.
pub fn atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    wilder(&true_range(high, low, close), period)
}

/// SMA middle band with population-stddev bands.
pub fn bollinger(close: &[f64], period: usize, multiplier: f64) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let middle = sma(close, period);
    let std = rolling_std(close, period);
    let upper = zip_with(&middle, &std, |m, s| m + multiplier * s);
    let lower = zip_with(&middle, &std, |m, s| m - multiplier * s);
    (upper, middle, lower)
}

/// EMA middle band with ATR bands of the same period.
pub fn keltner(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    period: usize,
    multiplier: f64,
) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let middle = ema(close, period);
    let range = atr(high, low, close, period);
    let upper = zip_with(&middle, &range, |m, r| m + multiplier * r);
    let lower = zip_with(&middle, &range, |m, r| m - multiplier * r);
    (upper, middle, lower)
}

/// Highest high, lowest low and their midpoint.
pub fn donchian(high: &[f64], low: &[f64], period: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let upper = rolling_max(high, period);
    let lower = rolling_min(low, period);
    let middle = zip_with(&upper, &lower, |u, l| (u + l) / 2.0);
    (upper, middle, lower)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn true_range_uses_previous_close() {
        let high = [10.0, 12.0, 11.0];
        let low = [9.0, 11.5, 8.0];
        let close = [9.5, 11.8, 9.0];
        let tr = true_range(&high, &low, &close);
        assert_approx(tr[0], 1.0, DEFAULT_EPSILON);
        // gap up: |12 - 9.5|
        assert_approx(tr[1], 2.5, DEFAULT_EPSILON);
        // |8 - 11.8|
        assert_approx(tr[2], 3.8, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_of_constant_range() {
        let high = [11.0; 10];
        let low = [9.0; 10];
        let close = [10.0; 10];
        let out = atr(&high, &low, &close, 3);
        assert!(out[1].is_nan());
        assert_approx(out[2], 2.0, DEFAULT_EPSILON);
        assert_approx(out[9], 2.0, DEFAULT_EPSILON);
    }

    #[test]
    fn bollinger_collapses_on_constant() {
        let (upper, middle, lower) = bollinger(&[5.0; 6], 3, 2.0);
        assert!(middle[1].is_nan());
        assert_approx(upper[5], 5.0, DEFAULT_EPSILON);
        assert_approx(lower[5], 5.0, DEFAULT_EPSILON);
    }

    #[test]
    fn bollinger_band_width() {
        // mean 2, population std sqrt(2/3)
        let (upper, middle, lower) = bollinger(&[1.0, 2.0, 3.0], 3, 1.0);
        let std = (2.0f64 / 3.0).sqrt();
        assert_approx(middle[2], 2.0, DEFAULT_EPSILON);
        assert_approx(upper[2], 2.0 + std, DEFAULT_EPSILON);
        assert_approx(lower[2], 2.0 - std, DEFAULT_EPSILON);
    }

    #[test]
    fn keltner_bands_around_ema() {
        let high = [11.0; 8];
        let low = [9.0; 8];
        let close = [10.0; 8];
        let (upper, middle, lower) = keltner(&high, &low, &close, 3, 2.0);
        assert_approx(middle[7], 10.0, DEFAULT_EPSILON);
        assert_approx(upper[7], 14.0, DEFAULT_EPSILON);
        assert_approx(lower[7], 6.0, DEFAULT_EPSILON);
    }

    #[test]
    fn donchian_extremes() {
        let high = [5.0, 7.0, 6.0, 4.0];
        let low = [3.0, 4.0, 2.0, 3.5];
        let (upper, middle, lower) = donchian(&high, &low, 3);
        assert!(upper[1].is_nan());
        assert_approx(upper[2], 7.0, DEFAULT_EPSILON);
        assert_approx(lower[3], 2.0, DEFAULT_EPSILON);
        assert_approx(middle[3], 4.5, DEFAULT_EPSILON);
    }

    #[test]
    fn tr_ignores_config() {
        let h = [2.0];
        let l = [1.0];
        let c = [1.5];
        let out = compute_tr(&[&h, &l, &c], None).unwrap();
        assert_eq!(out, IndicatorOutput::Single(vec![1.0]));
    }
}
