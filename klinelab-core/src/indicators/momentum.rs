//! Momentum oscillators: RSI, rate of change, momentum, stochastic,
//! Williams %R, CCI and the Awesome Oscillator.

use super::output::IndicatorOutput;
use super::params::{inputs, period, window, IndicatorConfig, IndicatorError};
use super::registry::{IndicatorCategory, IndicatorDescriptor};
use super::smoothing::{rolling_max, rolling_mean_deviation, rolling_min, sma, zip_with};
use crate::domain::InputRole;

const ANY: &[InputRole] = &[InputRole::Any];
const HLC: &[InputRole] = &[InputRole::High, InputRole::Low, InputRole::Close];
const HL: &[InputRole] = &[InputRole::High, InputRole::Low];

pub(crate) fn descriptors() -> Vec<IndicatorDescriptor> {
    let mom = IndicatorCategory::Momentum;
    vec![
        IndicatorDescriptor::new("RSI", "Relative Strength Index", mom, ANY, IndicatorConfig::with_period(14), compute_rsi),
        IndicatorDescriptor::new("ROC", "Rate of Change", mom, ANY, IndicatorConfig::with_period(12), compute_roc),
        IndicatorDescriptor::new("MOM", "Momentum", mom, ANY, IndicatorConfig::with_period(10), compute_mom),
        IndicatorDescriptor::new(
            "STOCH",
            "Stochastic Oscillator",
            mom,
            HLC,
            IndicatorConfig {
                period: Some(14),
                smoothing: Some(3),
                ..IndicatorConfig::EMPTY
            },
            compute_stoch,
        ),
        IndicatorDescriptor::new("WILLIAMSR", "Williams %R", mom, HLC, IndicatorConfig::with_period(14), compute_williams_r),
        IndicatorDescriptor::new("CCI", "Commodity Channel Index", mom, HLC, IndicatorConfig::with_period(20), compute_cci),
        IndicatorDescriptor::new(
            "AO",
            "Awesome Oscillator",
            mom,
            HL,
            IndicatorConfig {
                period: Some(5),
                slow_period: Some(34),
                ..IndicatorConfig::EMPTY
            },
            compute_ao,
        ),
    ]
}

fn compute_rsi(series: &[&[f64]], config: Option<&IndicatorConfig>) -> Result<IndicatorOutput, IndicatorError> {
    let [close] = inputs::<1>(series)?;
    Ok(IndicatorOutput::Single(rsi(close, period(config)?)))
}

fn compute_roc(series: &[&[f64]], config: Option<&IndicatorConfig>) -> Result<IndicatorOutput, IndicatorError> {
    let [close] = inputs::<1>(series)?;
    Ok(IndicatorOutput::Single(roc(close, period(config)?)))
}

fn compute_mom(series: &[&[f64]], config: Option<&IndicatorConfig>) -> Result<IndicatorOutput, IndicatorError> {
    let [close] = inputs::<1>(series)?;
    Ok(IndicatorOutput::Single(momentum(close, period(config)?)))
}

fn compute_stoch(series: &[&[f64]], config: Option<&IndicatorConfig>) -> Result<IndicatorOutput, IndicatorError> {
    let [high, low, close] = inputs::<3>(series)?;
    let smoothing = window(config, "smoothing", |c| c.smoothing)?;
    let (k, d) = stochastic(high, low, close, period(config)?, smoothing);
    Ok(IndicatorOutput::multi([("k", k), ("d", d)]))
}

fn compute_williams_r(series: &[&[f64]], config: Option<&IndicatorConfig>) -> Result<IndicatorOutput, IndicatorError> {
    let [high, low, close] = inputs::<3>(series)?;
    Ok(IndicatorOutput::Single(williams_r(high, low, close, period(config)?)))
}

fn compute_cci(series: &[&[f64]], config: Option<&IndicatorConfig>) -> Result<IndicatorOutput, IndicatorError> {
    let [high, low, close] = inputs::<3>(series)?;
    Ok(IndicatorOutput::Single(cci(high, low, close, period(config)?)))
}

fn compute_ao(series: &[&[f64]], config: Option<&IndicatorConfig>) -> Result<IndicatorOutput, IndicatorError> {
    let [high, low] = inputs::<2>(series)?;
    let fast = period(config)?;
    let slow = window(config, "slow_period", |c| c.slow_period)?;
    if fast >= slow {
        return Err(IndicatorError::InvalidParameter {
            name: "slow_period",
            reason: format!("{slow} must exceed the fast period {fast}"),
        });
    }
    Ok(IndicatorOutput::Single(awesome_oscillator(high, low, fast, slow)))
}

/// Relative Strength Index with Wilder-smoothed gains and losses.
///
/// First value at index `period`. No movement at all reads 50.
pub fn rsi(close: &[f64], period: usize) -> Vec<f64> {
    let n = close.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period + 1 {
        return out;
    }

    let changes: Vec<f64> = (0..n)
        .map(|i| if i == 0 { f64::NAN } else { close[i] - close[i - 1] })
        .collect();

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for &ch in &changes[1..=period] {
        if ch.is_nan() {
            return out;
        }
        if ch > 0.0 {
            avg_gain += ch;
        } else {
            avg_loss -= ch;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    out[period] = rsi_value(avg_gain, avg_loss);

    let alpha = 1.0 / period as f64;
    for i in (period + 1)..n {
        let ch = changes[i];
        if ch.is_nan() {
            break;
        }
        avg_gain = alpha * ch.max(0.0) + (1.0 - alpha) * avg_gain;
        avg_loss = alpha * (-ch).max(0.0) + (1.0 - alpha) * avg_loss;
        out[i] = rsi_value(avg_gain, avg_loss);
    }
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

/// Percent change over `period` rows. Undefined when the base is zero.
pub fn roc(close: &[f64], period: usize) -> Vec<f64> {
    lagged(close, period, |prev, curr| {
        if prev == 0.0 {
            f64::NAN
        } else {
            (curr - prev) / prev * 100.0
        }
    })
}

/// Absolute change over `period` rows.
pub fn momentum(close: &[f64], period: usize) -> Vec<f64> {
    lagged(close, period, |prev, curr| curr - prev)
}

fn lagged(values: &[f64], period: usize, f: impl Fn(f64, f64) -> f64) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    for i in period..n {
        let (prev, curr) = (values[i - period], values[i]);
        if !prev.is_nan() && !curr.is_nan() {
            out[i] = f(prev, curr);
        }
    }
    out
}

/// Stochastic %K over `period` rows and its `smoothing`-row SMA %D.
/// A flat window reads 50.
pub fn stochastic(high: &[f64], low: &[f64], close: &[f64], period: usize, smoothing: usize) -> (Vec<f64>, Vec<f64>) {
    let hh = rolling_max(high, period);
    let ll = rolling_min(low, period);
    let k: Vec<f64> = (0..close.len())
        .map(|i| {
            let (h, l, c) = (hh[i], ll[i], close[i]);
            if h.is_nan() || l.is_nan() || c.is_nan() {
                f64::NAN
            } else if h == l {
                50.0
            } else {
                100.0 * (c - l) / (h - l)
            }
        })
        .collect();
    let d = sma(&k, smoothing);
    (k, d)
}

/// Williams %R, from 0 (at the high) to -100 (at the low).
pub fn williams_r(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    let hh = rolling_max(high, period);
    let ll = rolling_min(low, period);
    (0..close.len())
        .map(|i| {
            let (h, l, c) = (hh[i], ll[i], close[i]);
            if h.is_nan() || l.is_nan() || c.is_nan() {
                f64::NAN
            } else if h == l {
                -50.0
            } else {
                -100.0 * (h - c) / (h - l)
            }
        })
        .collect()
}

/// Commodity Channel Index over the typical price.
pub fn cci(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    let typical: Vec<f64> = (0..close.len())
        .map(|i| (high[i] + low[i] + close[i]) / 3.0)
        .collect();
    let mean = sma(&typical, period);
    let deviation = rolling_mean_deviation(&typical, period);
    let spread = zip_with(&typical, &mean, |tp, m| tp - m);
    zip_with(&spread, &deviation, |s, md| if md == 0.0 { 0.0 } else { s / (0.015 * md) })
}

/// Fast minus slow SMA of the bar midpoint.
pub fn awesome_oscillator(high: &[f64], low: &[f64], fast: usize, slow: usize) -> Vec<f64> {
    let median = zip_with(high, low, |h, l| (h + l) / 2.0);
    zip_with(&sma(&median, fast), &sma(&median, slow), |f, s| f - s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn rsi_extremes() {
        let up: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let out = rsi(&up, 3);
        assert!(out[2].is_nan());
        assert_approx(out[3], 100.0, DEFAULT_EPSILON);

        let flat = rsi(&[5.0; 6], 3);
        assert_approx(flat[5], 50.0, DEFAULT_EPSILON);

        let down: Vec<f64> = (0..10).map(|i| 10.0 - i as f64).collect();
        assert_approx(rsi(&down, 3)[9], 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rsi_known_seed() {
        // changes +1, -1, +2 → avg gain 1, avg loss 1/3
        let out = rsi(&[10.0, 11.0, 10.0, 12.0], 3);
        assert_approx(out[3], 75.0, DEFAULT_EPSILON);
    }

    #[test]
    fn roc_and_momentum() {
        let close = [100.0, 105.0, 110.0, 0.0, 120.0];
        let r = roc(&close, 2);
        assert!(r[1].is_nan());
        assert_approx(r[2], 10.0, DEFAULT_EPSILON);
        let m = momentum(&close, 2);
        assert_approx(m[4], 10.0, DEFAULT_EPSILON);
        // base of zero
        let r = roc(&[0.0, 1.0], 1);
        assert!(r[1].is_nan());
    }

    #[test]
    fn stochastic_at_top_of_range() {
        let high = [10.0, 12.0, 14.0, 16.0];
        let low = [8.0, 9.0, 10.0, 11.0];
        let close = [9.0, 12.0, 14.0, 16.0];
        let (k, d) = stochastic(&high, &low, &close, 3, 2);
        assert!(k[1].is_nan());
        assert_approx(k[2], 100.0, DEFAULT_EPSILON);
        assert_approx(k[3], 100.0, DEFAULT_EPSILON);
        assert!(d[2].is_nan());
        assert_approx(d[3], 100.0, DEFAULT_EPSILON);
    }

    #[test]
    fn williams_r_at_low() {
        let high = [10.0, 10.0];
        let low = [5.0, 5.0];
        let close = [7.0, 5.0];
        let out = williams_r(&high, &low, &close, 2);
        assert_approx(out[1], -100.0, DEFAULT_EPSILON);
    }

    #[test]
    fn cci_flat_is_zero() {
        let out = cci(&[2.0; 5], &[1.0; 5], &[1.5; 5], 3);
        assert!(out[1].is_nan());
        assert_approx(out[4], 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn cci_known_value() {
        // typical prices 1, 2, 3: mean 2, mean deviation 2/3
        let out = cci(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], 3);
        assert_approx(out[2], 1.0 / (0.015 * 2.0 / 3.0), 1e-9);
    }

    #[test]
    fn ao_requires_fast_below_slow() {
        let h = [1.0; 3];
        let cfg = IndicatorConfig {
            period: Some(5),
            slow_period: Some(5),
            ..IndicatorConfig::EMPTY
        };
        assert!(compute_ao(&[&h, &h], Some(&cfg)).is_err());
    }

    #[test]
    fn ao_of_flat_market() {
        let out = awesome_oscillator(&[11.0; 40], &[9.0; 40], 5, 34);
        assert!(out[32].is_nan());
        assert_approx(out[33], 0.0, DEFAULT_EPSILON);
    }
}
