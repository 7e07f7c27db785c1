//! Spectral windows for Welch segments.
//!
//! Windows are generated in their periodic ("DFT-even") form, which is what
//! `scipy.signal.get_window` returns for spectral analysis: the symmetric
//! window of length `n + 1` with its last sample dropped.
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use crate::error::{MeaError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Window {
    /// Rectangular window (all ones).
    #[default]
    Boxcar,
    Hann,
    Hamming,
    Blackman,
}

impl Window {
    /// Periodic window coefficients of length `n`.
    ///
    /// A single-sample window is `[1.0]` for every kind.
    pub fn coefficients(self, n: usize) -> Vec<f64> {
        if n <= 1 {
            return vec![1.0; n];
        }
        let nf = n as f64;
        (0..n)
            .map(|i| {
                let x = 2.0 * PI * i as f64 / nf;
                match self {
                    Window::Boxcar => 1.0,
                    Window::Hann => 0.5 - 0.5 * x.cos(),
                    Window::Hamming => 0.54 - 0.46 * x.cos(),
                    Window::Blackman => 0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos(),
                }
            })
            .collect()
    }
}

impl FromStr for Window {
    type Err = MeaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "boxcar" | "box" | "ones" | "rect" | "rectangular" => Ok(Window::Boxcar),
            "hann" | "hanning" => Ok(Window::Hann),
            "hamming" => Ok(Window::Hamming),
            "blackman" => Ok(Window::Blackman),
            _ => Err(MeaError::InvalidKernel(s.to_string())),
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Window::Boxcar => "boxcar",
            Window::Hann => "hann",
            Window::Hamming => "hamming",
            Window::Blackman => "blackman",
        };
        f.write_str(name)
    }
}
