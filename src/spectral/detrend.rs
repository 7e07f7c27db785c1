//! Least-squares linear detrending.
//!
//! Matches `scipy.signal.detrend(x, type='linear')`: the best-fit line
//! `a + b·t` over `t = 0..n` is subtracted from the signal.

/// Remove the least-squares line from `x`.
///
/// A single sample is reduced to zero; an empty slice gives an empty vector.
pub fn detrend_linear(x: &[f64]) -> Vec<f64> {
    let n = x.len();
    if n == 0 {
        return vec![];
    }
    let nf = n as f64;
    let t_mean = (nf - 1.0) / 2.0;
    let x_mean = x.iter().sum::<f64>() / nf;

    let (mut sxy, mut sxx) = (0.0_f64, 0.0_f64);
    for (i, &v) in x.iter().enumerate() {
        let dt = i as f64 - t_mean;
        sxy += dt * (v - x_mean);
        sxx += dt * dt;
    }
    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };

    x.iter()
        .enumerate()
        .map(|(i, &v)| v - (x_mean + slope * (i as f64 - t_mean)))
        .collect()
}
