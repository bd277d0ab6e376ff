//! Moving-window building blocks shared by the indicator modules.
//!
//! Every function returns a series of the input's length. Positions without
//! enough history are NaN; a NaN inside a window makes that window NaN.

/// Simple moving average. First value at index `period - 1`.
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period {
        return out;
    }

    let mut sum = 0.0;
    let mut nans = 0usize;
    for i in 0..n {
        let entering = values[i];
        if entering.is_nan() {
            nans += 1;
        } else {
            sum += entering;
        }
        if i >= period {
            let leaving = values[i - period];
            if leaving.is_nan() {
                nans -= 1;
            } else {
                sum -= leaving;
            }
        }
        if i + 1 >= period && nans == 0 {
            out[i] = sum / period as f64;
        }
    }
    out
}

/// Exponential moving average, alpha = 2 / (period + 1).
///
/// Seeded with the SMA of the first `period` consecutive valid values, so a
/// series with a NaN warm-up (such as another indicator's output) can be
/// smoothed directly. A NaN after the seed ends the series.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    recursive(values, period, 2.0 / (period as f64 + 1.0))
}

/// Wilder smoothing, alpha = 1 / period. Same seeding as [`ema`].
pub fn wilder(values: &[f64], period: usize) -> Vec<f64> {
    recursive(values, period, 1.0 / period as f64)
}

fn recursive(values: &[f64], period: usize, alpha: f64) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 {
        return out;
    }
    let Some(seed_start) = first_valid_run(values, period) else {
        return out;
    };

    let seed_end = seed_start + period;
    let mut prev = values[seed_start..seed_end].iter().sum::<f64>() / period as f64;
    out[seed_end - 1] = prev;

    for i in seed_end..n {
        let v = values[i];
        if v.is_nan() {
            break;
        }
        prev = alpha * v + (1.0 - alpha) * prev;
        out[i] = prev;
    }
    out
}

/// Start of the first run of `len` consecutive non-NaN values.
fn first_valid_run(values: &[f64], len: usize) -> Option<usize> {
    let mut run = 0;
    for (i, v) in values.iter().enumerate() {
        if v.is_nan() {
            run = 0;
        } else {
            run += 1;
            if run == len {
                return Some(i + 1 - len);
            }
        }
    }
    None
}

/// Linearly weighted moving average; the newest value has weight `period`.
pub fn wma(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period {
        return out;
    }
    let denom = (period * (period + 1) / 2) as f64;
    for i in (period - 1)..n {
        let window = &values[i + 1 - period..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        let weighted: f64 = window
            .iter()
            .enumerate()
            .map(|(j, v)| (j + 1) as f64 * v)
            .sum();
        out[i] = weighted / denom;
    }
    out
}

/// Highest value over the trailing window.
pub fn rolling_max(values: &[f64], period: usize) -> Vec<f64> {
    rolling(values, period, |w| w.iter().copied().fold(f64::NEG_INFINITY, f64::max))
}

/// Lowest value over the trailing window.
pub fn rolling_min(values: &[f64], period: usize) -> Vec<f64> {
    rolling(values, period, |w| w.iter().copied().fold(f64::INFINITY, f64::min))
}

/// Population standard deviation over the trailing window.
pub fn rolling_std(values: &[f64], period: usize) -> Vec<f64> {
    rolling(values, period, |w| {
        let mean = w.iter().sum::<f64>() / w.len() as f64;
        let var = w.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / w.len() as f64;
        var.sqrt()
    })
}

/// Mean absolute deviation from the window mean.
pub fn rolling_mean_deviation(values: &[f64], period: usize) -> Vec<f64> {
    rolling(values, period, |w| {
        let mean = w.iter().sum::<f64>() / w.len() as f64;
        w.iter().map(|v| (v - mean).abs()).sum::<f64>() / w.len() as f64
    })
}

fn rolling(values: &[f64], period: usize, reduce: impl Fn(&[f64]) -> f64) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period {
        return out;
    }
    for i in (period - 1)..n {
        let window = &values[i + 1 - period..=i];
        if !window.iter().any(|v| v.is_nan()) {
            out[i] = reduce(window);
        }
    }
    out
}

/// Element-wise `f(a, b)`, NaN where either side is NaN.
pub fn zip_with(a: &[f64], b: &[f64], f: impl Fn(f64, f64) -> f64) -> Vec<f64> {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| if x.is_nan() || y.is_nan() { f64::NAN } else { f(x, y) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn sma_basic() {
        let out = sma(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0], 5);
        assert!(out[..4].iter().all(|v| v.is_nan()));
        assert_approx(out[4], 12.0, DEFAULT_EPSILON);
        assert_approx(out[6], 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_nan_window() {
        let out = sma(&[10.0, 11.0, f64::NAN, 13.0, 14.0, 15.0], 3);
        assert!(out[2].is_nan());
        assert!(out[3].is_nan());
        assert!(out[4].is_nan());
        assert_approx(out[5], 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn sma_too_short() {
        assert!(sma(&[1.0, 2.0], 5).iter().all(|v| v.is_nan()));
        assert!(sma(&[1.0, 2.0], 0).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn ema_known_values() {
        // alpha 0.5, seed SMA(10,11,12) = 11
        let out = ema(&[10.0, 11.0, 12.0, 13.0, 14.0], 3);
        assert!(out[1].is_nan());
        assert_approx(out[2], 11.0, DEFAULT_EPSILON);
        assert_approx(out[3], 12.0, DEFAULT_EPSILON);
        assert_approx(out[4], 13.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_skips_leading_warmup() {
        let out = ema(&[f64::NAN, f64::NAN, 10.0, 11.0, 12.0, 13.0], 3);
        assert!(out[3].is_nan());
        assert_approx(out[4], 11.0, DEFAULT_EPSILON);
        assert_approx(out[5], 12.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_nan_after_seed_ends_series() {
        let out = ema(&[10.0, 11.0, 12.0, f64::NAN, 14.0], 3);
        assert_approx(out[2], 11.0, DEFAULT_EPSILON);
        assert!(out[3].is_nan());
        assert!(out[4].is_nan());
    }

    #[test]
    fn wilder_alpha() {
        // seed 2.0, alpha 1/2: 0.5*4 + 0.5*2 = 3
        let out = wilder(&[1.0, 3.0, 4.0], 2);
        assert_approx(out[1], 2.0, DEFAULT_EPSILON);
        assert_approx(out[2], 3.0, DEFAULT_EPSILON);
    }

    #[test]
    fn wma_weights_recent() {
        // (1*1 + 2*2 + 3*3) / 6
        let out = wma(&[1.0, 2.0, 3.0], 3);
        assert_approx(out[2], 14.0 / 6.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rolling_extremes() {
        let v = [3.0, 1.0, 4.0, 1.0, 5.0];
        let hi = rolling_max(&v, 3);
        let lo = rolling_min(&v, 3);
        assert_approx(hi[2], 4.0, DEFAULT_EPSILON);
        assert_approx(hi[4], 5.0, DEFAULT_EPSILON);
        assert_approx(lo[4], 1.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rolling_std_population() {
        let out = rolling_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], 8);
        assert_approx(out[7], 2.0, DEFAULT_EPSILON);
    }

    #[test]
    fn zip_propagates_nan() {
        let out = zip_with(&[1.0, f64::NAN], &[2.0, 2.0], |a, b| a + b);
        assert_approx(out[0], 3.0, DEFAULT_EPSILON);
        assert!(out[1].is_nan());
    }
}
