//! Trend indicators: moving averages, MACD, ADX, Parabolic SAR, Aroon,
//! Supertrend and TRIX.

use super::output::IndicatorOutput;
use super::params::{factor, inputs, period, window, IndicatorConfig, IndicatorError};
use super::registry::{IndicatorCategory, IndicatorDescriptor};
use super::smoothing::{ema, sma, wilder, wma, zip_with};
use super::volatility::true_range;
use crate::domain::InputRole;

const ANY: &[InputRole] = &[InputRole::Any];
const HLC: &[InputRole] = &[InputRole::High, InputRole::Low, InputRole::Close];
const HL: &[InputRole] = &[InputRole::High, InputRole::Low];

pub(crate) fn descriptors() -> Vec<IndicatorDescriptor> {
    let trend = IndicatorCategory::Trend;
    vec![
        IndicatorDescriptor::new("SMA", "Simple Moving Average", trend, ANY, IndicatorConfig::with_period(20), compute_sma),
        IndicatorDescriptor::new("EMA", "Exponential Moving Average", trend, ANY, IndicatorConfig::with_period(20), compute_ema),
        IndicatorDescriptor::new("WMA", "Weighted Moving Average", trend, ANY, IndicatorConfig::with_period(20), compute_wma),
        IndicatorDescriptor::new("WEMA", "Wilder's Smoothing Average", trend, ANY, IndicatorConfig::with_period(14), compute_wema),
        IndicatorDescriptor::new(
            "MACD",
            "Moving Average Convergence Divergence",
            trend,
            ANY,
            IndicatorConfig {
                period: Some(12),
                slow_period: Some(26),
                smoothing: Some(9),
                ..IndicatorConfig::EMPTY
            },
            compute_macd,
        ),
        IndicatorDescriptor::new("ADX", "Average Directional Index", trend, HLC, IndicatorConfig::with_period(14), compute_adx),
        IndicatorDescriptor::new(
            "PSAR",
            "Parabolic SAR",
            trend,
            HLC,
            IndicatorConfig {
                start: Some(0.02),
                step: Some(0.02),
                max: Some(0.2),
                ..IndicatorConfig::EMPTY
            },
            compute_psar,
        ),
        IndicatorDescriptor::new("AROON", "Aroon", trend, HL, IndicatorConfig::with_period(25), compute_aroon),
        IndicatorDescriptor::new(
            "SUPERTREND",
            "Supertrend",
            trend,
            HLC,
            IndicatorConfig {
                period: Some(10),
                multiplier: Some(3.0),
                ..IndicatorConfig::EMPTY
            },
            compute_supertrend,
        ),
        IndicatorDescriptor::new("TRIX", "Triple Exponential Average", trend, ANY, IndicatorConfig::with_period(15), compute_trix),
    ]
}

fn compute_sma(series: &[&[f64]], config: Option<&IndicatorConfig>) -> Result<IndicatorOutput, IndicatorError> {
    let [values] = inputs::<1>(series)?;
    Ok(IndicatorOutput::Single(sma(values, period(config)?)))
}

fn compute_ema(series: &[&[f64]], config: Option<&IndicatorConfig>) -> Result<IndicatorOutput, IndicatorError> {
    let [values] = inputs::<1>(series)?;
    Ok(IndicatorOutput::Single(ema(values, period(config)?)))
}

fn compute_wma(series: &[&[f64]], config: Option<&IndicatorConfig>) -> Result<IndicatorOutput, IndicatorError> {
    let [values] = inputs::<1>(series)?;
    Ok(IndicatorOutput::Single(wma(values, period(config)?)))
}

fn compute_wema(series: &[&[f64]], config: Option<&IndicatorConfig>) -> Result<IndicatorOutput, IndicatorError> {
    let [values] = inputs::<1>(series)?;
    Ok(IndicatorOutput::Single(wilder(values, period(config)?)))
}

fn compute_macd(series: &[&[f64]], config: Option<&IndicatorConfig>) -> Result<IndicatorOutput, IndicatorError> {
    let [close] = inputs::<1>(series)?;
    let fast = period(config)?;
    let slow = window(config, "slow_period", |c| c.slow_period)?;
    let signal = window(config, "smoothing", |c| c.smoothing)?;
    if fast >= slow {
        return Err(IndicatorError::InvalidParameter {
            name: "slow_period",
            reason: format!("{slow} must exceed the fast period {fast}"),
        });
    }
    let (line, signal, histogram) = macd(close, fast, slow, signal);
    Ok(IndicatorOutput::multi([
        ("macd", line),
        ("signal", signal),
        ("histogram", histogram),
    ]))
}

fn compute_adx(series: &[&[f64]], config: Option<&IndicatorConfig>) -> Result<IndicatorOutput, IndicatorError> {
    let [high, low, close] = inputs::<3>(series)?;
    let (adx, pdi, mdi) = adx(high, low, close, period(config)?);
    Ok(IndicatorOutput::multi([("adx", adx), ("pdi", pdi), ("mdi", mdi)]))
}

fn compute_psar(series: &[&[f64]], config: Option<&IndicatorConfig>) -> Result<IndicatorOutput, IndicatorError> {
    let [high, low, close] = inputs::<3>(series)?;
    let start = factor(config, "start", |c| c.start)?;
    let step = factor(config, "step", |c| c.step)?;
    let max = factor(config, "max", |c| c.max)?;
    if max < start {
        return Err(IndicatorError::InvalidParameter {
            name: "max",
            reason: format!("{max} is below the start factor {start}"),
        });
    }
    Ok(IndicatorOutput::Single(parabolic_sar(high, low, close, start, step, max)))
}

fn compute_aroon(series: &[&[f64]], config: Option<&IndicatorConfig>) -> Result<IndicatorOutput, IndicatorError> {
    let [high, low] = inputs::<2>(series)?;
    let (up, down) = aroon(high, low, period(config)?);
    Ok(IndicatorOutput::multi([("up", up), ("down", down)]))
}

fn compute_supertrend(series: &[&[f64]], config: Option<&IndicatorConfig>) -> Result<IndicatorOutput, IndicatorError> {
    let [high, low, close] = inputs::<3>(series)?;
    let multiplier = factor(config, "multiplier", |c| c.multiplier)?;
    Ok(IndicatorOutput::Single(supertrend(high, low, close, period(config)?, multiplier)))
}

fn compute_trix(series: &[&[f64]], config: Option<&IndicatorConfig>) -> Result<IndicatorOutput, IndicatorError> {
    let [values] = inputs::<1>(series)?;
    Ok(IndicatorOutput::Single(trix(values, period(config)?)))
}

/// MACD line, signal line and histogram.
pub fn macd(close: &[f64], fast: usize, slow: usize, signal: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let line = zip_with(&ema(close, fast), &ema(close, slow), |f, s| f - s);
    let signal_line = ema(&line, signal);
    let histogram = zip_with(&line, &signal_line, |m, s| m - s);
    (line, signal_line, histogram)
}

/// Average Directional Index (Wilder) with its +DI and -DI lines.
///
/// +DM/-DM and true range are Wilder-smoothed; DX is Wilder-smoothed again
/// into ADX, so ADX needs roughly `2 * period` rows of history.
pub fn adx(high: &[f64], low: &[f64], close: &[f64], period: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let n = high.len();
    let mut plus_dm = vec![f64::NAN; n];
    let mut minus_dm = vec![f64::NAN; n];

    for i in 1..n {
        if high[i].is_nan() || low[i].is_nan() || high[i - 1].is_nan() || low[i - 1].is_nan() {
            continue;
        }
        let up = high[i] - high[i - 1];
        let down = low[i - 1] - low[i];
        plus_dm[i] = if up > down && up > 0.0 { up } else { 0.0 };
        minus_dm[i] = if down > up && down > 0.0 { down } else { 0.0 };
    }

    let smooth_tr = wilder(&true_range(high, low, close), period);
    let smooth_plus = wilder(&plus_dm, period);
    let smooth_minus = wilder(&minus_dm, period);

    let mut pdi = vec![f64::NAN; n];
    let mut mdi = vec![f64::NAN; n];
    let mut dx = vec![f64::NAN; n];
    for i in 0..n {
        let tr = smooth_tr[i];
        if tr.is_nan() || smooth_plus[i].is_nan() || smooth_minus[i].is_nan() || tr == 0.0 {
            continue;
        }
        pdi[i] = 100.0 * smooth_plus[i] / tr;
        mdi[i] = 100.0 * smooth_minus[i] / tr;
        let sum = pdi[i] + mdi[i];
        dx[i] = if sum == 0.0 {
            0.0
        } else {
            100.0 * (pdi[i] - mdi[i]).abs() / sum
        };
    }

    (wilder(&dx, period), pdi, mdi)
}

/// Parabolic SAR. The first row has no value; direction starts from the
/// first two closes.
pub fn parabolic_sar(high: &[f64], low: &[f64], close: &[f64], af_start: f64, af_step: f64, af_max: f64) -> Vec<f64> {
    let n = high.len();
    let mut out = vec![f64::NAN; n];
    if n < 2 || high[0].is_nan() || low[0].is_nan() || high[1].is_nan() || low[1].is_nan() {
        return out;
    }

    let mut is_long = close[1] >= close[0];
    let mut af = af_start;
    let (mut sar, mut ep) = if is_long {
        (low[0], high[1])
    } else {
        (high[0], low[1])
    };
    out[1] = sar;

    for i in 2..n {
        if high[i].is_nan() || low[i].is_nan() || close[i].is_nan() {
            continue;
        }
        let mut next = sar + af * (ep - sar);
        if is_long {
            for prev in [low[i - 1], low[i - 2]] {
                if !prev.is_nan() {
                    next = next.min(prev);
                }
            }
            if low[i] < next {
                is_long = false;
                next = ep;
                ep = low[i];
                af = af_start;
            } else if high[i] > ep {
                ep = high[i];
                af = (af + af_step).min(af_max);
            }
        } else {
            for prev in [high[i - 1], high[i - 2]] {
                if !prev.is_nan() {
                    next = next.max(prev);
                }
            }
            if high[i] > next {
                is_long = true;
                next = ep;
                ep = high[i];
                af = af_start;
            } else if low[i] < ep {
                ep = low[i];
                af = (af + af_step).min(af_max);
            }
        }
        sar = next;
        out[i] = sar;
    }
    out
}

/// Aroon up and down: `100 * (period - rows since extreme) / period` over a
/// window of `period + 1` rows. Ties favour the most recent row.
pub fn aroon(high: &[f64], low: &[f64], period: usize) -> (Vec<f64>, Vec<f64>) {
    let n = high.len();
    let mut up = vec![f64::NAN; n];
    let mut down = vec![f64::NAN; n];
    if n <= period {
        return (up, down);
    }

    let score = |offset: usize| 100.0 * offset as f64 / period as f64;
    for i in period..n {
        let start = i - period;
        let highs = &high[start..=i];
        if !highs.iter().any(|v| v.is_nan()) {
            let mut best = 0;
            for (j, v) in highs.iter().enumerate() {
                if *v >= highs[best] {
                    best = j;
                }
            }
            up[i] = score(best);
        }
        let lows = &low[start..=i];
        if !lows.iter().any(|v| v.is_nan()) {
            let mut best = 0;
            for (j, v) in lows.iter().enumerate() {
                if *v <= lows[best] {
                    best = j;
                }
            }
            down[i] = score(best);
        }
    }
    (up, down)
}

/// Supertrend: the active ATR band, support while trending up and
/// resistance while trending down.
pub fn supertrend(high: &[f64], low: &[f64], close: &[f64], period: usize, multiplier: f64) -> Vec<f64> {
    let n = high.len();
    let mut out = vec![f64::NAN; n];
    let atr = wilder(&true_range(high, low, close), period);

    let Some(start) = atr.iter().position(|v| !v.is_nan()) else {
        return out;
    };

    let hl2 = (high[start] + low[start]) / 2.0;
    let mut upper = hl2 + multiplier * atr[start];
    let mut lower = hl2 - multiplier * atr[start];
    let mut trending_up = true;
    out[start] = lower;

    for i in (start + 1)..n {
        if atr[i].is_nan() || close[i].is_nan() || high[i].is_nan() || low[i].is_nan() {
            continue;
        }
        let hl2 = (high[i] + low[i]) / 2.0;
        let basic_upper = hl2 + multiplier * atr[i];
        let basic_lower = hl2 - multiplier * atr[i];

        let prev_close = close[i - 1];
        // Bands only tighten while price stays inside them.
        upper = if !prev_close.is_nan() && prev_close <= upper {
            basic_upper.min(upper)
        } else {
            basic_upper
        };
        lower = if !prev_close.is_nan() && prev_close >= lower {
            basic_lower.max(lower)
        } else {
            basic_lower
        };

        if trending_up && close[i] < lower {
            trending_up = false;
        } else if !trending_up && close[i] > upper {
            trending_up = true;
        }
        out[i] = if trending_up { lower } else { upper };
    }
    out
}

/// One-row percent change of a triple-smoothed EMA.
pub fn trix(values: &[f64], period: usize) -> Vec<f64> {
    let triple = ema(&ema(&ema(values, period), period), period);
    let mut out = vec![f64::NAN; values.len()];
    for i in 1..triple.len() {
        let (prev, curr) = (triple[i - 1], triple[i]);
        if !prev.is_nan() && !curr.is_nan() && prev != 0.0 {
            out[i] = (curr - prev) / prev * 100.0;
        }
    }
    out
}
